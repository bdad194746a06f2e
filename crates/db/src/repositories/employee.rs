use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use stayline_core::domain::employee::{Employee, EmployeeId};
use stayline_core::search::{EmployeeSearch, Page, PageRequest};

use super::{parse_date, parse_decimal, parse_rfc3339, parse_uuid, RepositoryError};
use crate::DbPool;

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError>;
    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError>;
    async fn update(&self, employee: &Employee) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &EmployeeId) -> Result<bool, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;

    /// Keyword OR-search plus exact filters, paged. `sort_column` must already
    /// have passed the `EmployeeSearch::sort_column` whitelist.
    async fn search(
        &self,
        criteria: &EmployeeSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Employee>, RepositoryError>;
}

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const EMPLOYEE_COLUMNS: &str = "\
    id, first_name, last_name, email, phone_number, job_title, department, \
    hire_date, termination_date, active, salary, salary_type, \
    can_access_system, is_on_duty, is_verified, created_at, updated_at";

#[async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| employee_from_row(&value)).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|value| employee_from_row(&value)).transpose()
    }

    async fn insert(&self, employee: &Employee) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO employees (
                id, first_name, last_name, email, phone_number, job_title,
                department, hire_date, termination_date, active, salary,
                salary_type, can_access_system, is_on_duty, is_verified,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(employee.id.to_string())
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(employee.phone_number.as_deref())
        .bind(&employee.job_title)
        .bind(&employee.department)
        .bind(employee.hire_date.to_string())
        .bind(employee.termination_date.map(|date| date.to_string()))
        .bind(employee.active)
        .bind(employee.salary.to_string())
        .bind(employee.salary_type.as_deref())
        .bind(employee.can_access_system)
        .bind(employee.is_on_duty)
        .bind(employee.is_verified)
        .bind(employee.created_at.to_rfc3339())
        .bind(employee.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::Conflict(format!(
                    "employee email already registered: {}",
                    employee.email
                )))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, employee: &Employee) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE employees SET
                first_name = ?, last_name = ?, email = ?, phone_number = ?,
                job_title = ?, department = ?, hire_date = ?, termination_date = ?,
                active = ?, salary = ?, salary_type = ?, can_access_system = ?,
                is_on_duty = ?, is_verified = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(employee.phone_number.as_deref())
        .bind(&employee.job_title)
        .bind(&employee.department)
        .bind(employee.hire_date.to_string())
        .bind(employee.termination_date.map(|date| date.to_string()))
        .bind(employee.active)
        .bind(employee.salary.to_string())
        .bind(employee.salary_type.as_deref())
        .bind(employee.can_access_system)
        .bind(employee.is_on_duty)
        .bind(employee.is_verified)
        .bind(employee.updated_at.to_rfc3339())
        .bind(employee.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &EmployeeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn search(
        &self,
        criteria: &EmployeeSearch,
        page: &PageRequest,
        sort_column: &str,
    ) -> Result<Page<Employee>, RepositoryError> {
        let mut count_builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM employees WHERE 1=1");
        push_filters(&mut count_builder, criteria);
        let total: i64 = count_builder.build_query_scalar().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE 1=1"));
        push_filters(&mut builder, criteria);
        builder.push(format!(
            " ORDER BY {} {}, id DESC",
            order_expr(sort_column),
            page.direction.as_sql()
        ));
        builder.push(" LIMIT ").push_bind(i64::from(page.size.max(1)));
        builder.push(" OFFSET ").push_bind(i64::from(page.offset()));

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(employee_from_row).collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, page, total as u64))
    }
}

fn order_expr(sort_column: &str) -> String {
    match sort_column {
        "salary" => "CAST(salary AS REAL)".to_string(),
        other => other.to_string(),
    }
}

fn push_filters<'a>(builder: &mut QueryBuilder<'a, Sqlite>, criteria: &'a EmployeeSearch) {
    if let Some(keyword) = trimmed(&criteria.keyword) {
        let pattern = format!("%{}%", keyword.to_lowercase());
        builder
            .push(" AND (lower(first_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(last_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(email) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(coalesce(phone_number, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(job_title) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(department) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(department) = trimmed(&criteria.department) {
        builder.push(" AND department = ").push_bind(department.to_string());
    }
    if let Some(job_title) = trimmed(&criteria.job_title) {
        builder.push(" AND job_title = ").push_bind(job_title.to_string());
    }
    if let Some(active) = criteria.active {
        builder.push(" AND active = ").push_bind(active);
    }
    if let Some(can_access_system) = criteria.can_access_system {
        builder.push(" AND can_access_system = ").push_bind(can_access_system);
    }
    if let Some(is_on_duty) = criteria.is_on_duty {
        builder.push(" AND is_on_duty = ").push_bind(is_on_duty);
    }
    if let Some(is_verified) = criteria.is_verified {
        builder.push(" AND is_verified = ").push_bind(is_verified);
    }
    if let Some(salary_type) = trimmed(&criteria.salary_type) {
        builder.push(" AND salary_type = ").push_bind(salary_type.to_string());
    }
    if let Some(from) = criteria.hire_date_from {
        builder.push(" AND hire_date >= ").push_bind(from.to_string());
    }
    if let Some(to) = criteria.hire_date_to {
        builder.push(" AND hire_date <= ").push_bind(to.to_string());
    }
    if let Some(salary_min) = criteria.salary_min {
        builder
            .push(" AND CAST(salary AS REAL) >= CAST(")
            .push_bind(salary_min.to_string())
            .push(" AS REAL)");
    }
    if let Some(salary_max) = criteria.salary_max {
        builder
            .push(" AND CAST(salary AS REAL) <= CAST(")
            .push_bind(salary_max.to_string())
            .push(" AS REAL)");
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee, RepositoryError> {
    let termination_date = row
        .try_get::<Option<String>, _>("termination_date")?
        .as_deref()
        .map(|raw| parse_date("employee termination_date", raw))
        .transpose()?;

    Ok(Employee {
        id: EmployeeId(parse_uuid("employee", &row.try_get::<String, _>("id")?)?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        job_title: row.try_get("job_title")?,
        department: row.try_get("department")?,
        hire_date: parse_date("employee hire_date", &row.try_get::<String, _>("hire_date")?)?,
        termination_date,
        active: row.try_get("active")?,
        salary: parse_decimal("employee salary", &row.try_get::<String, _>("salary")?)?,
        salary_type: row.try_get("salary_type")?,
        can_access_system: row.try_get("can_access_system")?,
        is_on_duty: row.try_get("is_on_duty")?,
        is_verified: row.try_get("is_verified")?,
        created_at: parse_rfc3339(
            "employee created_at",
            &row.try_get::<String, _>("created_at")?,
        )?,
        updated_at: parse_rfc3339(
            "employee updated_at",
            &row.try_get::<String, _>("updated_at")?,
        )?,
    })
}
