pub mod bookings;
pub mod employees;
pub mod payments;

pub use bookings::BookingService;
pub use employees::EmployeeService;
pub use payments::PaymentService;
