//! HTTP request handlers for all API endpoints.
//!
//! Each handler validates the request shape, delegates to the storage or generation adapter held
//! in [`crate::AppState`], and serializes the result as JSON. Failures are returned as
//! [`crate::errors::Error`], which maps to the status code and a `{"detail": ...}` body.
//!
//! - [`health`]: Liveness check
//! - [`uploads`]: Image upload to object storage
//! - [`generation`]: Generation task creation and status polling

pub mod generation;
pub mod health;
pub mod uploads;
