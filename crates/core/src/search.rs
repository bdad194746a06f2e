//! Dynamic search criteria: every field is optional, and a search is the
//! conjunction of exactly the fields that are present. Blank strings count as
//! absent. The SQL repositories translate these criteria into parameterized
//! queries; the pure `matches` predicates here are the reference semantics and
//! back the in-memory repositories.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{Booking, BookingStatus, PaymentMethod};
use crate::domain::employee::Employee;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Pagination and ordering, applied after filtering.
#[derive(Clone, Debug, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort_by: String,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            sort_by: "created_at".to_owned(),
            direction: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    pub fn offset(&self) -> u32 {
        self.page * self.size
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = request.size.max(1);
        let total_pages = ((total_elements + u64::from(size) - 1) / u64::from(size)) as u32;
        Self { items, page: request.page, size, total_elements, total_pages }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BookingSearch {
    pub status: Option<BookingStatus>,
    pub is_cancelled: Option<bool>,
    pub is_paid: Option<bool>,
    pub payment_method: Option<PaymentMethod>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub check_in_from: Option<DateTime<Utc>>,
    pub check_in_to: Option<DateTime<Utc>>,
    pub check_out_from: Option<DateTime<Utc>>,
    pub check_out_to: Option<DateTime<Utc>>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub user_id: Option<UserId>,
    pub booking_reference: Option<String>,
}

impl BookingSearch {
    /// Columns a caller may sort bookings by. Anything else is a caller error.
    pub fn sort_column(sort_by: &str) -> Option<&'static str> {
        match sort_by.trim() {
            "createdAt" | "created_at" => Some("created_at"),
            "updatedAt" | "updated_at" => Some("updated_at"),
            "checkInDate" | "check_in_date" => Some("check_in_date"),
            "checkOutDate" | "check_out_date" => Some("check_out_date"),
            "totalAmount" | "total_amount" => Some("total_amount"),
            "pricePerNight" | "price_per_night" => Some("price_per_night"),
            "numberOfNights" | "number_of_nights" => Some("number_of_nights"),
            "status" => Some("status"),
            "region" => Some("region"),
            "country" => Some("country"),
            "name" => Some("name"),
            _ => None,
        }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        if let Some(is_cancelled) = self.is_cancelled {
            if booking.is_cancelled != is_cancelled {
                return false;
            }
        }
        if let Some(is_paid) = self.is_paid {
            if booking.is_paid != is_paid {
                return false;
            }
        }
        if let Some(method) = self.payment_method {
            if booking.payment_method != method {
                return false;
            }
        }
        if let Some(region) = present(&self.region) {
            if !contains_ci(&booking.region, region) {
                return false;
            }
        }
        if let Some(country) = present(&self.country) {
            if !contains_ci(&booking.country, country) {
                return false;
            }
        }
        if let Some(min_price) = self.min_price {
            if booking.total_amount < min_price {
                return false;
            }
        }
        if let Some(max_price) = self.max_price {
            if booking.total_amount > max_price {
                return false;
            }
        }
        if let Some(from) = self.check_in_from {
            if booking.check_in_date < from {
                return false;
            }
        }
        if let Some(to) = self.check_in_to {
            if booking.check_in_date > to {
                return false;
            }
        }
        if let Some(from) = self.check_out_from {
            if booking.check_out_date < from {
                return false;
            }
        }
        if let Some(to) = self.check_out_to {
            if booking.check_out_date > to {
                return false;
            }
        }
        if let Some(from) = self.created_from {
            if booking.created_at < from {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if booking.created_at > to {
                return false;
            }
        }
        if let Some(user_id) = self.user_id {
            if booking.user_id != user_id {
                return false;
            }
        }
        if let Some(reference) = present(&self.booking_reference) {
            if booking.payment_reference.as_deref() != Some(reference) {
                return false;
            }
        }
        true
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeeSearch {
    pub keyword: Option<String>,
    pub department: Option<String>,
    pub job_title: Option<String>,
    pub active: Option<bool>,
    pub can_access_system: Option<bool>,
    pub is_on_duty: Option<bool>,
    pub is_verified: Option<bool>,
    pub salary_type: Option<String>,
    pub hire_date_from: Option<NaiveDate>,
    pub hire_date_to: Option<NaiveDate>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
}

impl EmployeeSearch {
    pub fn sort_column(sort_by: &str) -> Option<&'static str> {
        match sort_by.trim() {
            "createdAt" | "created_at" => Some("created_at"),
            "updatedAt" | "updated_at" => Some("updated_at"),
            "hireDate" | "hire_date" => Some("hire_date"),
            "salary" => Some("salary"),
            "firstName" | "first_name" => Some("first_name"),
            "lastName" | "last_name" => Some("last_name"),
            "email" => Some("email"),
            "department" => Some("department"),
            "jobTitle" | "job_title" => Some("job_title"),
            _ => None,
        }
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(keyword) = present(&self.keyword) {
            let hit = contains_ci(&employee.first_name, keyword)
                || contains_ci(&employee.last_name, keyword)
                || contains_ci(&employee.email, keyword)
                || employee
                    .phone_number
                    .as_deref()
                    .is_some_and(|phone| contains_ci(phone, keyword))
                || contains_ci(&employee.job_title, keyword)
                || contains_ci(&employee.department, keyword);
            if !hit {
                return false;
            }
        }
        if let Some(department) = present(&self.department) {
            if employee.department != department {
                return false;
            }
        }
        if let Some(job_title) = present(&self.job_title) {
            if employee.job_title != job_title {
                return false;
            }
        }
        if let Some(active) = self.active {
            if employee.active != active {
                return false;
            }
        }
        if let Some(can_access_system) = self.can_access_system {
            if employee.can_access_system != can_access_system {
                return false;
            }
        }
        if let Some(is_on_duty) = self.is_on_duty {
            if employee.is_on_duty != is_on_duty {
                return false;
            }
        }
        if let Some(is_verified) = self.is_verified {
            if employee.is_verified != is_verified {
                return false;
            }
        }
        if let Some(salary_type) = present(&self.salary_type) {
            if employee.salary_type.as_deref() != Some(salary_type) {
                return false;
            }
        }
        if let Some(from) = self.hire_date_from {
            if employee.hire_date < from {
                return false;
            }
        }
        if let Some(to) = self.hire_date_to {
            if employee.hire_date > to {
                return false;
            }
        }
        if let Some(salary_min) = self.salary_min {
            if employee.salary < salary_min {
                return false;
            }
        }
        if let Some(salary_max) = self.salary_max {
            if employee.salary > salary_max {
                return false;
            }
        }
        true
    }
}
