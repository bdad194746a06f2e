use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use stayline_core::{Employee, EmployeeId, EmployeeSearch, EmployeeUpdate, NewEmployee, Page};

use crate::http::{ApiError, ApiMessage, RequestMeta};
use crate::routes::{page_request, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-employee", post(create_employee))
        .route("/fetch-employee/{id}", get(fetch_employee))
        .route("/update-employee/{id}", put(update_employee))
        .route("/delete-employee/{id}", delete(delete_employee))
        .route("/search-employees", post(search_employees))
        .route("/total-employees", get(total_employees))
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(flatten)]
    criteria: EmployeeSearch,
    page: Option<u32>,
    size: Option<u32>,
    sort_by: Option<String>,
    direction: Option<String>,
}

async fn create_employee(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(request): Json<NewEmployee>,
) -> Result<ApiMessage<Employee>, ApiError> {
    let employee = state.employees.create(request).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::created("Employee created successfully", employee))
}

async fn fetch_employee(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<Employee>, ApiError> {
    let employee = state.employees.get(&EmployeeId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Employee retrieved successfully", employee))
}

async fn update_employee(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(update): Json<EmployeeUpdate>,
) -> Result<ApiMessage<Employee>, ApiError> {
    let employee =
        state.employees.update(&EmployeeId(id), update).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Employee updated successfully", employee))
}

async fn delete_employee(
    State(state): State<AppState>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<ApiMessage<()>, ApiError> {
    state.employees.delete(&EmployeeId(id)).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Employee deleted successfully", ()))
}

async fn search_employees(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(body): Json<SearchBody>,
) -> Result<ApiMessage<Page<Employee>>, ApiError> {
    let page = page_request(body.page, body.size, body.sort_by, body.direction);
    let results =
        state.employees.search(body.criteria, page).await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Employees retrieved successfully", results))
}

async fn total_employees(
    State(state): State<AppState>,
    meta: RequestMeta,
) -> Result<ApiMessage<u64>, ApiError> {
    let total = state.employees.count().await.map_err(|e| meta.fail(e))?;
    Ok(ApiMessage::ok("Total employees retrieved successfully", total))
}
