use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Request to start a poster generation task.
///
/// Both fields are optional on the wire; a missing or empty value is answered with a 400.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    /// URL of the calendar template image
    pub template_url: Option<String>,
    /// URL of the user's photo
    pub user_image_url: Option<String>,
}

/// Response for a created task
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    /// Opaque identifier issued by the provider; pass it back to the status endpoint
    pub task_id: String,
}

/// Query parameters for polling a task
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskStatusQuery {
    /// Task identifier returned by create-task
    pub task_id: Option<String>,
}
