//! Test utilities: an in-memory object store and a fully wired application backed by a mock
//! generation provider.

use crate::config::{Config, KieConfig, StorageConfig};
use crate::errors::{Error, Result};
use crate::kie::KieClient;
use crate::storage::{ObjectStore, public_url};
use crate::{AppState, Application, install_crypto_provider};
use async_trait::async_trait;
use axum_test::TestServer;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::MockServer;

pub fn create_test_kie_config(base_url: &str) -> KieConfig {
    KieConfig {
        base_url: base_url.parse().expect("Invalid mock server URL"),
        api_key: Some("test-key".to_string()),
        model: "nano-banana-pro".to_string(),
        prompt: "test prompt".to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

/// A single call made to [`RecordingStore::store`].
#[derive(Debug, Clone)]
pub struct StoreCall {
    pub path: PathBuf,
    pub content_type: String,
    pub key: String,
    /// Contents of `path` at the time of the call, `None` if it didn't exist
    pub contents: Option<Vec<u8>>,
}

/// Object store that records every call instead of talking to S3.
#[derive(Debug)]
pub struct RecordingStore {
    config: Config,
    calls: Mutex<Vec<StoreCall>>,
    failing: AtomicBool,
}

impl RecordingStore {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            calls: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every subsequent upload fail after it has been recorded.
    pub fn fail_uploads(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn store(&self, local_path: &Path, content_type: &str, key: &str) -> Result<String> {
        let contents = tokio::fs::read(local_path).await.ok();
        self.calls.lock().unwrap().push(StoreCall {
            path: local_path.to_path_buf(),
            content_type: content_type.to_string(),
            key: key.to_string(),
            contents,
        });

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Other(anyhow::anyhow!("simulated storage failure")));
        }

        let bucket = self.config.storage.require_bucket()?;
        Ok(public_url(&self.config.storage, bucket, key))
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<RecordingStore>,
    /// Stands in for the generation provider; mount mocks on it
    pub provider: MockServer,
    /// Upload buffer directory, removed when the app is dropped
    pub temp_dir: TempDir,
}

pub fn create_test_config(provider: &MockServer, temp_dir: &TempDir) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        kie: create_test_kie_config(&provider.uri()),
        storage: StorageConfig {
            bucket: Some("test-bucket".to_string()),
            temp_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Build a test app, letting the caller adjust the configuration first.
pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    install_crypto_provider();

    let provider = MockServer::start().await;
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&provider, &temp_dir);
    configure(&mut config);

    let store = Arc::new(RecordingStore::new(config.clone()));
    let generator = KieClient::new(config.kie.clone()).expect("Failed to create generation client");
    let state = AppState::builder()
        .config(Arc::new(config))
        .storage(store.clone())
        .generator(Arc::new(generator))
        .build();

    let server = Application::with_state(state)
        .expect("Failed to create application")
        .into_test_server();

    TestApp {
        server,
        store,
        provider,
        temp_dir,
    }
}
