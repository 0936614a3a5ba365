//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires a [`VideoPipeline`] to mock
//! resolver/engine collaborators over a temp directory pair. The
//! [`with_server`](TestHarness::with_server) constructor starts Axum on a
//! random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use retrotube::config::Config;
use retrotube::engine::{LiveStream, TranscodeEngine, TranscodeParams};
use retrotube::pipeline::error::{PipelineError, Result as PipelineResult};
use retrotube::pipeline::quality::QualitySpec;
use retrotube::pipeline::VideoPipeline;
use retrotube::resolver::SourceResolver;
use retrotube::server::{create_router, AppContext};
use retrotube::storage::{StorageLayout, VideoId};

pub const RAW_PAYLOAD: &[u8] = b"raw-mp4-payload";
pub const CACHE_PAYLOAD: &[u8] = b"webm-transcode-payload";
pub const LIVE_PAYLOAD: &[u8] = b"flv-live-stream-payload";
pub const DIRECT_URL: &str = "https://cdn.example.test/media/stream.mp4";

/// Mock source resolver writing a fixed payload.
///
/// `hold()` turns on a two-semaphore gate: `fetch_to_file` signals
/// `started` on entry and then waits for a `release` permit, letting
/// tests observe a production mid-flight without sleeping.
pub struct MockResolver {
    pub fetch_calls: AtomicUsize,
    pub url_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub started: Arc<Semaphore>,
    pub release: Arc<Semaphore>,
    gated: AtomicBool,
}

impl Default for MockResolver {
    fn default() -> Self {
        Self {
            fetch_calls: AtomicUsize::new(0),
            url_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            started: Arc::new(Semaphore::new(0)),
            release: Arc::new(Semaphore::new(0)),
            gated: AtomicBool::new(false),
        }
    }
}

impl MockResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let resolver = Self::default();
        resolver.fail.store(true, Ordering::SeqCst);
        Arc::new(resolver)
    }

    /// Gate `fetch_to_file` on the `release` semaphore.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn url_count(&self) -> usize {
        self.url_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceResolver for MockResolver {
    async fn fetch_to_file(
        &self,
        _url: &str,
        _quality: QualitySpec,
        dest: &Path,
    ) -> PipelineResult<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.gated.load(Ordering::SeqCst) {
            self.started.add_permits(1);
            let permit = self.release.acquire().await.unwrap();
            permit.forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::resolution("mock: video unavailable"));
        }
        std::fs::write(dest, RAW_PAYLOAD)?;
        Ok(())
    }

    async fn resolve_direct_url(&self, _url: &str, _quality: QualitySpec) -> PipelineResult<String> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::resolution("mock: no matching format"));
        }
        Ok(DIRECT_URL.to_string())
    }
}

/// Mock transcoding engine writing a fixed payload, recording every
/// parameter set it is invoked with.
pub struct MockEngine {
    pub convert_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub fail: AtomicBool,
    pub recorded: Mutex<Vec<TranscodeParams>>,
    pub stream_inputs: Mutex<Vec<String>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            convert_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            recorded: Mutex::new(Vec::new()),
            stream_inputs: Mutex::new(Vec::new()),
        }
    }
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let engine = Self::default();
        engine.fail.store(true, Ordering::SeqCst);
        Arc::new(engine)
    }

    pub fn convert_count(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }

    pub fn stream_count(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<TranscodeParams> {
        self.recorded.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl TranscodeEngine for MockEngine {
    async fn convert_file(
        &self,
        input: &Path,
        output: &Path,
        params: &TranscodeParams,
    ) -> PipelineResult<()> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push(params.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::transcode("mock: ffmpeg exited with 1"));
        }
        assert!(input.is_file(), "engine input must exist: {input:?}");
        std::fs::write(output, CACHE_PAYLOAD)?;
        Ok(())
    }

    async fn convert_to_stream(
        &self,
        input_url: &str,
        params: &TranscodeParams,
    ) -> PipelineResult<LiveStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().unwrap().push(params.clone());
        self.stream_inputs.lock().unwrap().push(input_url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::transcode("mock: ffmpeg exited with 1"));
        }
        Ok(LiveStream::from_reader(std::io::Cursor::new(
            LIVE_PAYLOAD.to_vec(),
        )))
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`] backed by
/// mock collaborators and temp artifact directories.
pub struct TestHarness {
    pub ctx: AppContext,
    pub resolver: Arc<MockResolver>,
    pub engine: Arc<MockEngine>,
    pub download_dir: PathBuf,
    pub cache_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new harness with default mocks.
    pub fn new() -> Self {
        Self::with_mocks(MockResolver::new(), MockEngine::new())
    }

    /// Create a new harness with custom mock collaborators.
    pub fn with_mocks(resolver: Arc<MockResolver>, engine: Arc<MockEngine>) -> Self {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let download_dir = tmp.path().join("downloads");
        let cache_dir = tmp.path().join("cache");

        let storage = StorageLayout::new(&download_dir, &cache_dir)
            .expect("failed to prepare storage directories");
        let pipeline = VideoPipeline::new(
            storage,
            resolver.clone(),
            engine.clone(),
            QualitySpec::new(360),
            "https://videos.example.test/watch?v={id}".to_string(),
        );

        let ctx = AppContext {
            pipeline: Arc::new(pipeline),
            config: Arc::new(Config::default()),
        };

        Self {
            ctx,
            resolver,
            engine,
            download_dir,
            cache_dir,
            _tmp: tmp,
        }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_and_mocks(MockResolver::new(), MockEngine::new()).await
    }

    /// Start an Axum server with custom mocks on a random port.
    pub async fn with_server_and_mocks(
        resolver: Arc<MockResolver>,
        engine: Arc<MockEngine>,
    ) -> (Self, SocketAddr) {
        let harness = Self::with_mocks(resolver, engine);
        let app = create_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    pub fn video_id(&self, raw: &str) -> VideoId {
        VideoId::new(raw).unwrap()
    }

    /// Path the raw artifact for `raw_id` would occupy.
    pub fn raw_path(&self, raw_id: &str) -> PathBuf {
        self.download_dir.join(format!("{raw_id}.mp4"))
    }

    /// Path the cached artifact for `raw_id` would occupy.
    pub fn cache_path(&self, raw_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{raw_id}.webm"))
    }

    /// Non-temporary file names currently present in an artifact dir.
    pub fn artifact_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
