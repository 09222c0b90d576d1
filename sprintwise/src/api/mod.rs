//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! - **Health** (`/health`): Liveness check
//! - **Uploads** (`/upload`): Store an image in the upload bucket and return its URL
//! - **Generation** (`/api/kie/*`): Create poster generation tasks and poll their status
//!
//! All endpoints are documented with `utoipa`; the document is served at `/api-docs/openapi.json`
//! and browsable at `/docs`.

pub mod handlers;
pub mod models;
