//! Response envelopes shared by every route. Successes wrap their payload in
//! [`ApiMessage`]; failures render the flat [`ApiFailure`] shape with the
//! request's method and path echoed back.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use stayline_core::{AuthenticatedUser, ServiceError};

#[derive(Clone, Debug, Serialize)]
pub struct ApiMessage<T> {
    pub message: String,
    pub status_code: u16,
    pub data: T,
}

impl<T> ApiMessage<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), status_code: 200, data }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), status_code: 201, data }
    }
}

impl<T: Serialize> IntoResponse for ApiMessage<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ApiFailure {
    pub timestamp: String,
    pub message: String,
    pub error_code: &'static str,
    pub path: String,
    pub method: String,
    pub status_code: u16,
}

/// Method and path of the in-flight request, captured up front so failure
/// payloads can echo them without threading the request through the services.
#[derive(Clone, Debug)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
}

impl RequestMeta {
    pub fn fail(&self, error: ServiceError) -> ApiError {
        ApiError { meta: self.clone(), error }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self { method: parts.method.to_string(), path: parts.uri.path().to_owned() })
    }
}

/// Caller identity taken from the `x-user-email` header. A missing or blank
/// header yields the anonymous marker rather than a rejection; the services
/// decide which operations require a known caller.
#[derive(Clone, Debug)]
pub struct Caller(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        Ok(Self(match email {
            Some(email) => AuthenticatedUser::known(email),
            None => AuthenticatedUser::anonymous(),
        }))
    }
}

/// A [`ServiceError`] bound to the request it failed. Renders the failure
/// envelope with the status and code the error taxonomy dictates.
#[derive(Debug)]
pub struct ApiError {
    meta: RequestMeta,
    error: ServiceError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.error.status_code();
        let status =
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                event_name = "http.request.failed",
                method = %self.meta.method,
                path = %self.meta.path,
                error_code = self.error.error_code(),
                error = %self.error,
                "request failed"
            );
        }

        let failure = ApiFailure {
            timestamp: Utc::now().to_rfc3339(),
            message: self.error.to_string(),
            error_code: self.error.error_code(),
            path: self.meta.path,
            method: self.meta.method,
            status_code,
        };

        (status, Json(failure)).into_response()
    }
}
