use crate::AppState;
use crate::api::models::generation::{CreateTaskPayload, CreateTaskResponse, TaskStatusQuery};
use crate::errors::{Error, Result};
use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/api/kie/create-task",
    tag = "generation",
    summary = "Create generation task",
    description = "Submit a poster generation job that combines a calendar template with the user's photo.",
    request_body = CreateTaskPayload,
    responses(
        (status = 200, description = "Task created", body = CreateTaskResponse),
        (status = 400, description = "templateUrl or userImageUrl missing"),
        (status = 422, description = "Body is not valid JSON"),
        (status = 500, description = "API key not configured or provider response without a task id"),
        (status = "default", description = "Provider error, status and body passed through")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_task(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateTaskPayload>, JsonRejection>,
) -> Result<Json<CreateTaskResponse>> {
    let Json(payload) = payload.map_err(|rejection| Error::Unprocessable {
        message: rejection.body_text(),
    })?;

    let template_url = payload.template_url.unwrap_or_default();
    let user_image_url = payload.user_image_url.unwrap_or_default();
    let task_id = state.generator.create_task(&template_url, &user_image_url).await?;

    Ok(Json(CreateTaskResponse { task_id }))
}

#[utoipa::path(
    get,
    path = "/api/kie/status",
    tag = "generation",
    summary = "Get task status",
    description = "Return the provider's record for a task exactly as the provider sent it.",
    params(TaskStatusQuery),
    responses(
        (status = 200, description = "Provider status record", body = serde_json::Value),
        (status = 422, description = "taskId missing"),
        (status = 500, description = "API key not configured"),
        (status = "default", description = "Provider error, status and body passed through")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn task_status(
    State(state): State<AppState>,
    query: std::result::Result<Query<TaskStatusQuery>, QueryRejection>,
) -> Result<Json<Value>> {
    let Query(query) = query.map_err(|rejection| Error::Unprocessable {
        message: rejection.body_text(),
    })?;
    // A missing taskId is a 422 regardless of provider configuration
    let task_id = query.task_id.ok_or_else(|| Error::Unprocessable {
        message: "taskId is required".to_string(),
    })?;

    let status = state.generator.task_status(&task_id).await?;
    Ok(Json(status))
}
