//! Generation provider adapter for the kie.ai job API.
//!
//! Generation is asynchronous on the provider side: [`GenerationProvider::create_task`] submits
//! a job and returns its opaque task id, and callers poll [`GenerationProvider::task_status`]
//! with that id. Nothing is stored locally between the two calls.

mod client;

pub use client::KieClient;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Aspect ratio requested for every generated image.
pub const ASPECT_RATIO: &str = "4:3";
/// Resolution tier requested for every generated image.
pub const RESOLUTION: &str = "1K";
/// Output format requested for every generated image.
pub const OUTPUT_FORMAT: &str = "png";

/// A remote image generation service tracking jobs by task id.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Submit a job combining the template image and the user's photo; returns the task id.
    async fn create_task(&self, template_url: &str, user_image_url: &str) -> Result<String>;

    /// Fetch the provider's status record for a task, unmodified.
    async fn task_status(&self, task_id: &str) -> Result<Value>;
}

/// Body of a `createTask` call.
#[derive(Debug, Serialize)]
pub struct CreateTaskRequest<'a> {
    pub model: &'a str,
    pub input: TaskInput<'a>,
}

/// Generation parameters of a task. `image_input` order matters: template first, then user.
#[derive(Debug, Serialize)]
pub struct TaskInput<'a> {
    pub prompt: &'a str,
    pub image_input: [&'a str; 2],
    pub aspect_ratio: &'static str,
    pub resolution: &'static str,
    pub output_format: &'static str,
}

impl<'a> CreateTaskRequest<'a> {
    pub fn new(model: &'a str, prompt: &'a str, template_url: &'a str, user_image_url: &'a str) -> Self {
        Self {
            model,
            input: TaskInput {
                prompt,
                image_input: [template_url, user_image_url],
                aspect_ratio: ASPECT_RATIO,
                resolution: RESOLUTION,
                output_format: OUTPUT_FORMAT,
            },
        }
    }
}

/// Extract `data.taskId` from a `createTask` response.
pub fn task_id_from_response(body: &Value) -> Option<&str> {
    body.pointer("/data/taskId").and_then(Value::as_str).filter(|id| !id.is_empty())
}
