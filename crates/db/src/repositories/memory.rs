//! In-memory repositories backing service unit tests. Filtering defers to the
//! pure `matches` predicates so SQL and in-memory search share one semantics.

use std::cmp::Ordering;
use std::collections::HashMap;

use tokio::sync::RwLock;

use stayline_core::chrono::{DateTime, Utc};
use stayline_core::domain::booking::{Booking, BookingId, BookingStatus};
use stayline_core::domain::employee::{Employee, EmployeeId};
use stayline_core::domain::payment::{Payment, PaymentId};
use stayline_core::domain::user::{User, UserId};
use stayline_core::search::{BookingSearch, EmployeeSearch, Page, PageRequest, SortDirection};

use super::booking::BookingRepository;
use super::employee::EmployeeRepository;
use super::payment::PaymentRepository;
use super::user::UserRepository;
use super::RepositoryError;

fn paginate<T>(mut items: Vec<T>, page: &PageRequest) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let offset = page.offset() as usize;
    let size = page.size.max(1) as usize;
    let items = if offset >= items.len() {
        Vec::new()
    } else {
        items.drain(offset..items.len().min(offset + size)).collect()
    };
    (items, total)
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: RwLock<HashMap<BookingId, Booking>>,
}

fn booking_ordering(a: &Booking, b: &Booking, column: &str) -> Ordering {
    match column {
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        "check_in_date" => a.check_in_date.cmp(&b.check_in_date),
        "check_out_date" => a.check_out_date.cmp(&b.check_out_date),
        "total_amount" => a.total_amount.cmp(&b.total_amount),
        "price_per_night" => a.price_per_night.cmp(&b.price_per_night),
        "number_of_nights" => a.number_of_nights.cmp(&b.number_of_nights),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "region" => a.region.cmp(&b.region),
        "country" => a.country.cmp(&b.country),
        "name" => a.name.cmp(&b.name),
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.get(id).cloned())
    }

    async fn insert(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn update(&self, booking: &Booking) -> Result<(), RepositoryError> {
        let mut bookings = self.bookings.write().await;
        bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn delete(&self, id: &BookingId) -> Result<bool, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        Ok(bookings.remove(id).is_some())
    }

    async fn list_by_status(
        &self,
        status: BookingStatus,
    ) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> =
            bookings.values().filter(|b| b.status == status).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> =
            bookings.values().filter(|b| b.user_id == *user_id).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_all(&self) -> Result<Vec<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut all: Vec<Booking> = bookings.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.len() as u64)
    }

    async fn search(
        &self,
        criteria: &BookingSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Booking>, RepositoryError> {
        let bookings = self.bookings.read().await;
        let mut matched: Vec<Booking> =
            bookings.values().filter(|b| criteria.matches(b)).cloned().collect();
        matched.sort_by(|a, b| {
            directed(booking_ordering(a, b, sort_column), page.direction)
                .then_with(|| b.id.to_string().cmp(&a.id.to_string()))
        });
        let (items, total) = paginate(matched, page);
        Ok(Page::new(items, page, total))
    }

    async fn mark_approved(
        &self,
        id: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(id) {
            Some(booking) if booking.status == BookingStatus::Pending => {
                booking.status = BookingStatus::Approved;
                booking.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_rejected(
        &self,
        id: &BookingId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut bookings = self.bookings.write().await;
        match bookings.get_mut(id) {
            Some(booking) if booking.status == BookingStatus::Pending => {
                booking.status = BookingStatus::Rejected;
                booking.is_cancelled = true;
                booking.cancelled_at = Some(now);
                booking.cancellation_reason = Some(reason.to_owned());
                booking.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

#[async_trait::async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.get(id).cloned())
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.values().find(|p| p.reference == reference).cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        let mut matched: Vec<Payment> =
            payments.values().filter(|p| p.user_id == *user_id).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_by_booking(
        &self,
        booking_id: &BookingId,
    ) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        let mut matched: Vec<Payment> =
            payments.values().filter(|p| p.booking_id == *booking_id).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    async fn list_all(&self) -> Result<Vec<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        let mut all: Vec<Payment> = payments.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.len() as u64)
    }

    async fn exists_for_booking(&self, booking_id: &BookingId) -> Result<bool, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.values().any(|p| p.booking_id == *booking_id))
    }

    async fn insert(&self, payment: &Payment) -> Result<(), RepositoryError> {
        let mut payments = self.payments.write().await;
        if payments.values().any(|p| p.booking_id == payment.booking_id) {
            return Err(RepositoryError::Conflict(format!(
                "payment already exists for booking {}",
                payment.booking_id
            )));
        }
        payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn update_versioned(&self, payment: &Payment) -> Result<Payment, RepositoryError> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(stored) if stored.version == payment.version => {
                let mut updated = payment.clone();
                updated.version += 1;
                *stored = updated.clone();
                Ok(updated)
            }
            Some(_) => Err(RepositoryError::Conflict(format!(
                "payment {} was modified concurrently",
                payment.id
            ))),
            None => Err(RepositoryError::Conflict(format!("payment {} not found", payment.id))),
        }
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<UserId, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(format!(
                "user email already registered: {}",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<EmployeeId, Employee>>,
}

fn employee_ordering(a: &Employee, b: &Employee, column: &str) -> Ordering {
    match column {
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        "hire_date" => a.hire_date.cmp(&b.hire_date),
        "salary" => a.salary.cmp(&b.salary),
        "first_name" => a.first_name.cmp(&b.first_name),
        "last_name" => a.last_name.cmp(&b.last_name),
        "email" => a.email.cmp(&b.email),
        "department" => a.department.cmp(&b.department),
        "job_title" => a.job_title.cmp(&b.job_title),
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.values().find(|e| e.email == email).cloned())
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        if employees.values().any(|e| e.email == employee.email) {
            return Err(RepositoryError::Conflict(format!(
                "employee email already registered: {}",
                employee.email
            )));
        }
        employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn update(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(employee.id, employee.clone());
        Ok(())
    }

    async fn delete(&self, id: &EmployeeId) -> Result<bool, RepositoryError> {
        let mut employees = self.employees.write().await;
        Ok(employees.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.len() as u64)
    }

    async fn search(
        &self,
        criteria: &EmployeeSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Employee>, RepositoryError> {
        let employees = self.employees.read().await;
        let mut matched: Vec<Employee> =
            employees.values().filter(|e| criteria.matches(e)).cloned().collect();
        matched.sort_by(|a, b| {
            directed(employee_ordering(a, b, sort_column), page.direction)
                .then_with(|| b.id.to_string().cmp(&a.id.to_string()))
        });
        let (items, total) = paginate(matched, page);
        Ok(Page::new(items, page, total))
    }
}
