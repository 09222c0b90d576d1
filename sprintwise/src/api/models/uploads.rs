use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Public URL of the stored object
    pub url: String,
    /// Generated filename (random token plus extension), also the last segment of `url`
    pub filename: String,
}
