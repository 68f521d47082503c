//! Byte-level relay of a resolved audio URL.
//!
//! The upstream body is forwarded in fixed-size chunks as it arrives; nothing
//! is buffered beyond one chunk. Dropping the returned stream (caller hung up)
//! drops the upstream response and releases its connection.

use crate::{
    error::{AppError, Result},
    metrics,
    server::url_validation::validate_relay_url,
};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};
use reqwest::{Client, redirect};
use std::io;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Default relay chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default bound on a single upstream read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Content type advertised for relayed audio.
pub const AUDIO_CONTENT_TYPE: &str = "audio/webm";

const MAX_REDIRECTS: usize = 10;

pub type RelayStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Build the client used for relay fetches.
///
/// Every redirect hop goes through [`validate_relay_url`] with the same
/// `allow_private` setting as the caller's URL; a rejected hop ends the chain
/// with an error instead of fetching it.
pub fn relay_client(allow_private: bool) -> std::result::Result<Client, reqwest::Error> {
    let policy = redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        match validate_relay_url(attempt.url().as_str(), allow_private) {
            Ok(_) => attempt.follow(),
            Err(e) => {
                warn!("Relay redirect refused: {}", e);
                attempt.error(e)
            }
        }
    });

    Client::builder()
        .redirect(policy)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

#[derive(Clone, Debug)]
pub struct RelayService {
    client: Client,
    chunk_size: usize,
    read_timeout: Duration,
}

impl RelayService {
    pub fn new(client: Client, chunk_size: usize, read_timeout: Duration) -> Self {
        Self {
            client,
            chunk_size: chunk_size.max(1),
            read_timeout,
        }
    }

    /// Open `url` and return its body as a chunked byte stream.
    ///
    /// # Errors
    /// [`AppError::RelayUpstream`] if the connection fails, the headers don't
    /// arrive within the read timeout, or upstream answers non-2xx.
    pub async fn open(&self, url: &str) -> Result<RelayStream> {
        // Header phase only; body reads are bounded individually below.
        let response = tokio::time::timeout(self.read_timeout, self.client.get(url).send())
            .await
            .map_err(|_| {
                AppError::RelayUpstream(format!("no response within {:?}", self.read_timeout))
            })?
            .map_err(|e| AppError::RelayUpstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Relay upstream returned {} for {}", status, url);
            return Err(AppError::RelayUpstream(format!(
                "upstream returned status {}",
                status.as_u16()
            )));
        }

        info!("Relay started for {}", url);

        let upstream = Box::pin(response.bytes_stream().map(|item| {
            item.map_err(|e| io::Error::from(AppError::RelayInterrupted(e.to_string())))
        }));
        let timed = Box::pin(with_read_timeout(upstream, self.read_timeout));
        let mut log = RelayLog::new(url);

        Ok(Box::pin(rechunk(timed, self.chunk_size).map(move |item| {
            log.observe(&item);
            item
        })))
    }
}

/// Logs the end of a relay when the stream is dropped, however it ended.
struct RelayLog {
    url: String,
    bytes: u64,
    error: Option<String>,
    started: Instant,
}

impl RelayLog {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            bytes: 0,
            error: None,
            started: Instant::now(),
        }
    }

    fn observe(&mut self, item: &io::Result<Bytes>) {
        match item {
            Ok(chunk) => self.bytes += chunk.len() as u64,
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

impl Drop for RelayLog {
    fn drop(&mut self) {
        metrics::record_relay_bytes(self.bytes);
        match &self.error {
            Some(e) => warn!(
                "Relay interrupted for {} after {} bytes: {}",
                self.url, self.bytes, e
            ),
            None => info!(
                "Relay ended for {}: {} bytes in {:?}",
                self.url,
                self.bytes,
                self.started.elapsed()
            ),
        }
    }
}

/// Bound every upstream read by `timeout`. The stream ends after the first
/// error or timeout.
fn with_read_timeout<S>(upstream: S, timeout: Duration) -> impl Stream<Item = io::Result<Bytes>>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    stream::unfold(Some(upstream), move |state| async move {
        let mut upstream = state?;
        match tokio::time::timeout(timeout, upstream.next()).await {
            Ok(Some(Ok(bytes))) => Some((Ok(bytes), Some(upstream))),
            Ok(Some(Err(e))) => Some((Err(e), None)),
            Ok(None) => None,
            Err(_) => Some((
                Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    AppError::RelayInterrupted(format!("no data for {:?}", timeout)).to_string(),
                )),
                None,
            )),
        }
    })
}

struct Rechunk<S> {
    upstream: S,
    buf: BytesMut,
    finished: bool,
    pending_error: Option<io::Error>,
}

/// Re-frame `upstream` into chunks of exactly `chunk_size` bytes; the final
/// chunk carries the remainder. Buffered bytes are flushed before an upstream
/// error is passed on, and nothing follows the error.
pub fn rechunk<S>(upstream: S, chunk_size: usize) -> impl Stream<Item = io::Result<Bytes>>
where
    S: Stream<Item = io::Result<Bytes>> + Unpin,
{
    let chunk_size = chunk_size.max(1);
    let state = Rechunk {
        upstream,
        buf: BytesMut::with_capacity(chunk_size),
        finished: false,
        pending_error: None,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if state.buf.len() >= chunk_size {
                let chunk = state.buf.split_to(chunk_size).freeze();
                return Some((Ok(chunk), state));
            }
            if state.finished {
                if !state.buf.is_empty() {
                    let chunk = state.buf.split().freeze();
                    return Some((Ok(chunk), state));
                }
                return state.pending_error.take().map(|e| (Err(e), state));
            }
            match state.upstream.next().await {
                Some(Ok(bytes)) => state.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.pending_error = Some(e);
                    state.finished = true;
                }
                None => state.finished = true,
            }
        }
    })
}
