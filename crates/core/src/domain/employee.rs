use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub Uuid);

impl EmployeeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EmployeeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Staff record. Plain CRUD entity; its search surface is the second consumer
/// of the dynamic filter builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub job_title: String,
    pub department: String,
    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub active: bool,
    pub salary: Decimal,
    pub salary_type: Option<String>,
    pub can_access_system: bool,
    pub is_on_duty: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn from_request(request: NewEmployee, now: DateTime<Utc>) -> Self {
        Self {
            id: EmployeeId::new(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone_number: request.phone_number,
            job_title: request.job_title,
            department: request.department,
            hire_date: request.hire_date,
            termination_date: None,
            active: request.active.unwrap_or(true),
            salary: request.salary,
            salary_type: request.salary_type,
            can_access_system: request.can_access_system.unwrap_or(false),
            is_on_duty: request.is_on_duty.unwrap_or(false),
            is_verified: request.is_verified.unwrap_or(false),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_update(&mut self, update: EmployeeUpdate, now: DateTime<Utc>) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = Some(phone_number);
        }
        if let Some(job_title) = update.job_title {
            self.job_title = job_title;
        }
        if let Some(department) = update.department {
            self.department = department;
        }
        if let Some(termination_date) = update.termination_date {
            self.termination_date = Some(termination_date);
        }
        if let Some(active) = update.active {
            self.active = active;
        }
        if let Some(salary) = update.salary {
            self.salary = salary;
        }
        if let Some(salary_type) = update.salary_type {
            self.salary_type = Some(salary_type);
        }
        if let Some(can_access_system) = update.can_access_system {
            self.can_access_system = can_access_system;
        }
        if let Some(is_on_duty) = update.is_on_duty {
            self.is_on_duty = is_on_duty;
        }
        if let Some(is_verified) = update.is_verified {
            self.is_verified = is_verified;
        }
        self.updated_at = now;
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub job_title: String,
    pub department: String,
    pub hire_date: NaiveDate,
    pub salary: Decimal,
    pub salary_type: Option<String>,
    pub active: Option<bool>,
    pub can_access_system: Option<bool>,
    pub is_on_duty: Option<bool>,
    pub is_verified: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub termination_date: Option<NaiveDate>,
    pub active: Option<bool>,
    pub salary: Option<Decimal>,
    pub salary_type: Option<String>,
    pub can_access_system: Option<bool>,
    pub is_on_duty: Option<bool>,
    pub is_verified: Option<bool>,
}
