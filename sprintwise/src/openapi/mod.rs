//! OpenAPI documentation for the public API.
//!
//! The generated document is served at `/api-docs/openapi.json` and rendered with Scalar at
//! `/docs`.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sprintwise API",
        description = "Upload images to object storage and generate calendar posters from them."
    ),
    paths(
        api::handlers::health::health,
        api::handlers::uploads::upload_file,
        api::handlers::generation::create_task,
        api::handlers::generation::task_status,
    ),
    components(
        schemas(
            api::models::health::HealthResponse,
            api::models::uploads::UploadResponse,
            api::models::generation::CreateTaskPayload,
            api::models::generation::CreateTaskResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness check."),
        (name = "uploads", description = "Store images under a generated name and get back a public URL.

Uploaded files are written to the configured bucket under the `uploads/` prefix. The returned URL is the one to pass to the generation endpoints."),
        (name = "generation", description = "Poster generation jobs.

Generation is asynchronous: create a task with a calendar template URL and the user's photo URL, then poll its status with the returned `taskId` until the provider reports a final state."),
    )
)]
pub struct ApiDoc;
