//! Staff CRUD plus the second consumer of the dynamic search builder.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use stayline_core::{
    Employee, EmployeeId, EmployeeSearch, EmployeeUpdate, NewEmployee, Page, PageRequest,
    ServiceError,
};
use stayline_db::repositories::EmployeeRepository;

pub struct EmployeeService {
    employees: Arc<dyn EmployeeRepository>,
}

impl EmployeeService {
    pub fn new(employees: Arc<dyn EmployeeRepository>) -> Self {
        Self { employees }
    }

    pub async fn create(&self, request: NewEmployee) -> Result<Employee, ServiceError> {
        if request.email.trim().is_empty() {
            return Err(ServiceError::BadRequest("email must not be blank".to_owned()));
        }
        if self.employees.find_by_email(&request.email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "an employee with email {} already exists",
                request.email
            )));
        }

        let employee = Employee::from_request(request, Utc::now());
        self.employees.insert(&employee).await?;
        info!(event_name = "employee.created", employee_id = %employee.id, "employee created");
        Ok(employee)
    }

    pub async fn get(&self, id: &EmployeeId) -> Result<Employee, ServiceError> {
        self.require(id).await
    }

    pub async fn update(
        &self,
        id: &EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, ServiceError> {
        let mut employee = self.require(id).await?;
        employee.apply_update(update, Utc::now());
        self.employees.update(&employee).await?;
        Ok(employee)
    }

    pub async fn delete(&self, id: &EmployeeId) -> Result<(), ServiceError> {
        if !self.employees.delete(id).await? {
            return Err(ServiceError::NotFound(format!("employee {id} not found")));
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(self.employees.count().await?)
    }

    pub async fn search(
        &self,
        criteria: EmployeeSearch,
        page: PageRequest,
    ) -> Result<Page<Employee>, ServiceError> {
        let column = EmployeeSearch::sort_column(&page.sort_by).ok_or_else(|| {
            ServiceError::BadRequest(format!("unsupported sort field `{}`", page.sort_by))
        })?;
        Ok(self.employees.search(&criteria, &page, column).await?)
    }

    async fn require(&self, id: &EmployeeId) -> Result<Employee, ServiceError> {
        self.employees
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("employee {id} not found")))
    }
}
