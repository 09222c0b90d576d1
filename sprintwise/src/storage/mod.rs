//! Object store adapter: persists uploaded bytes in a bucket and hands back a public URL.
//!
//! The [`ObjectStore`] trait is the seam the HTTP layer depends on. [`S3ObjectStore`] is the
//! production implementation; tests substitute a recording fake.

mod s3;

pub use s3::S3ObjectStore;

use crate::config::StorageConfig;
use crate::errors::Result;
use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

/// Extension used when the client's filename has none.
pub const DEFAULT_EXTENSION: &str = ".png";

/// Content type used when the client didn't send one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Trait for object storage backends
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local_path` under `key`, tagged with `content_type`.
    ///
    /// Returns the URL the object can be fetched from. Creates or overwrites the remote object;
    /// the local file is only read.
    async fn store(&self, local_path: &Path, content_type: &str, key: &str) -> Result<String>;
}

/// Generate the stored filename for an upload: a random 128-bit token in lowercase hex, followed
/// by the extension of the client's filename (or [`DEFAULT_EXTENSION`]).
pub fn upload_filename(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    format!("{}{}", Uuid::new_v4().simple(), extension)
}

/// Key an uploaded file is stored under: `<prefix>/<filename>`.
pub fn object_key(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_matches('/'), filename)
}

/// URL an object is reachable at once stored.
///
/// Uses the configured public base when there is one, otherwise the virtual-hosted S3 URL of the
/// bucket.
pub fn public_url(config: &StorageConfig, bucket: &str, key: &str) -> String {
    match config.public_file_base.as_deref() {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, config.region, key),
    }
}
