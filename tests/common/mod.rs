//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which assembles a full `AppContext`, either
//! from real clients pointed at wiremock upstreams or from in-process
//! doubles for the resolver and byte source, and serves it over axum on
//! a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;

use tunerelay::catalog::{CatalogClient, CredentialLease};
use tunerelay::config::Config;
use tunerelay::error::{Error, Result};
use tunerelay::relay::{ByteRange, ByteSource, ByteStream, HttpByteSource};
use tunerelay::resolver::{AudioQuality, Encoding, MediaId, MediaInfo, Resolver, UpstreamResolver};
use tunerelay::search::SearchClient;
use tunerelay::server::{create_router, AppContext};

/// A well-formed media id for tests.
pub const TEST_ID: &str = "dQw4w9WgXcQ";

/// Chunk size used by the stream doubles.
const CHUNK: usize = 64;

/// Test harness wrapping a fully-constructed `AppContext`.
pub struct TestHarness {
    pub ctx: AppContext,
}

impl TestHarness {
    /// Build the context from real clients against the given config
    /// (point the base URLs at wiremock servers).
    pub fn with_config(config: Config) -> Self {
        let lease = Arc::new(CredentialLease::new(&config.catalog));
        let catalog = Arc::new(CatalogClient::new(&config.catalog, Arc::clone(&lease)));
        let search = Arc::new(SearchClient::new(&config.search.base_url));
        let resolver: Arc<dyn Resolver> = Arc::new(UpstreamResolver::new(&config.resolver.base_url));
        let source: Arc<dyn ByteSource> = Arc::new(HttpByteSource::new());

        let ctx = AppContext {
            config: Arc::new(config),
            lease,
            catalog,
            search,
            resolver,
            source,
        };

        Self { ctx }
    }

    /// Build the context with doubles for the resolver and byte source;
    /// the catalog and search clients point nowhere and must not be hit.
    pub fn with_doubles(resolver: Arc<dyn Resolver>, source: Arc<dyn ByteSource>) -> Self {
        let config = Config::default();
        let lease = Arc::new(CredentialLease::new(&config.catalog));
        let catalog = Arc::new(CatalogClient::new(&config.catalog, Arc::clone(&lease)));
        let search = Arc::new(SearchClient::new(&config.search.base_url));

        let ctx = AppContext {
            config: Arc::new(config),
            lease,
            catalog,
            search,
            resolver,
            source,
        };

        Self { ctx }
    }

    /// Serve the context on a random port and return the bound address.
    pub async fn serve(&self) -> SocketAddr {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        addr
    }
}

/// A `MediaInfo` with a single audio encoding of the given length.
pub fn audio_media_info(total_length: u64) -> MediaInfo {
    let id = MediaId::parse(TEST_ID).expect("test id is valid");
    MediaInfo::from_encodings(
        &id,
        vec![Encoding {
            itag: 251,
            mime_type: "audio/webm; codecs=\"opus\"".to_string(),
            quality: AudioQuality::Medium,
            bitrate: 130_000,
            content_length: Some(total_length),
            url: "http://byte-host.invalid/s/251".to_string(),
        }],
    )
    .expect("test encoding resolves")
}

// ---------------------------------------------------------------------------
// Resolver double
// ---------------------------------------------------------------------------

/// What a [`StubResolver`] answers.
pub enum StubOutcome {
    Info(MediaInfo),
    NoAudio,
    Unavailable,
}

/// Resolver double that counts calls, so tests can assert the handler
/// short-circuits before resolution.
pub struct StubResolver {
    outcome: StubOutcome,
    calls: Arc<AtomicUsize>,
}

impl StubResolver {
    pub fn new(outcome: StubOutcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl Resolver for StubResolver {
    async fn resolve(&self, id: &MediaId) -> Result<MediaInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            StubOutcome::Info(info) => Ok(info.clone()),
            StubOutcome::NoAudio => Err(Error::NoAudioEncoding(id.to_string())),
            StubOutcome::Unavailable => Err(Error::upstream("stub upstream down")),
        }
    }
}

// ---------------------------------------------------------------------------
// Byte source double
// ---------------------------------------------------------------------------

/// How a [`TrackingSource`] serves the requested span.
pub enum SourceMode {
    /// Serve the span out of the buffer, chunked.
    Full,
    /// Serve only the first `n` bytes of the span, then end the stream.
    Truncated(usize),
    /// Never finish: trickle zero-filled chunks until dropped.
    Endless,
}

/// Byte source double that tracks how many opened streams are still alive.
/// The count drops the moment a stream is dropped, which is how tests
/// observe upstream handle release on client disconnect.
pub struct TrackingSource {
    data: Vec<u8>,
    mode: SourceMode,
    open_handles: Arc<AtomicUsize>,
}

impl TrackingSource {
    pub fn new(data: Vec<u8>, mode: SourceMode) -> Self {
        Self {
            data,
            mode,
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn handles(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.open_handles)
    }
}

#[async_trait::async_trait]
impl ByteSource for TrackingSource {
    async fn open(&self, _encoding: &Encoding, range: ByteRange) -> Result<ByteStream> {
        let guard = HandleGuard::new(Arc::clone(&self.open_handles));

        let inner: ByteStream = match self.mode {
            SourceMode::Full => {
                let span = self.data[range.start as usize..=range.end as usize].to_vec();
                chunked(span)
            }
            SourceMode::Truncated(n) => {
                let start = range.start as usize;
                let span = self.data[start..start + n].to_vec();
                chunked(span)
            }
            SourceMode::Endless => {
                static ZEROES: [u8; CHUNK] = [0; CHUNK];
                Box::pin(futures::stream::unfold((), |()| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Some((Ok(Bytes::from_static(&ZEROES)), ()))
                }))
            }
        };

        Ok(Box::pin(GuardedStream {
            inner,
            _guard: guard,
        }))
    }
}

fn chunked(data: Vec<u8>) -> ByteStream {
    let chunks: Vec<Result<Bytes>> = data
        .chunks(CHUNK)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(futures::stream::iter(chunks))
}

struct HandleGuard {
    counter: Arc<AtomicUsize>,
}

impl HandleGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Forwards to the inner stream while keeping the handle guard alive.
struct GuardedStream {
    inner: ByteStream,
    _guard: HandleGuard,
}

impl Stream for GuardedStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}
