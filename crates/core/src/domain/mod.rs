pub mod booking;
pub mod employee;
pub mod payment;
pub mod user;
