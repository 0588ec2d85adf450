//! Request/response channel to the renderer.
//!
//! Every request carries a correlation id. Replies are routed back to the
//! waiting caller by id, and a caller gives up after the configured timeout.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mapstyle_model::Patch;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::RendererConfig;
use crate::error::{Result, RuntimeError};

/// Renderer-side override access.
pub trait Renderer: Send + Sync + 'static {
    /// Override currently applied to `dataset_id`, if any.
    fn fetch_override(&self, dataset_id: &str) -> impl Future<Output = Result<Option<Patch>>> + Send;

    /// Apply a composed patch to `dataset_id`.
    fn apply_override(&self, dataset_id: &str, patch: Patch) -> impl Future<Output = Result<()>> + Send;
}

/// Messages sent to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RendererRequest {
    #[serde(rename_all = "camelCase")]
    FetchOverride { request_id: u64, dataset_id: String },
    #[serde(rename_all = "camelCase")]
    ApplyOverride {
        request_id: u64,
        dataset_id: String,
        patch: Patch,
    },
}

impl RendererRequest {
    pub fn request_id(&self) -> u64 {
        match self {
            Self::FetchOverride { request_id, .. } | Self::ApplyOverride { request_id, .. } => {
                *request_id
            }
        }
    }
}

/// Messages received from the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RendererReply {
    #[serde(rename_all = "camelCase")]
    Override {
        request_id: u64,
        #[serde(default)]
        patch: Option<Patch>,
    },
    #[serde(rename_all = "camelCase")]
    Applied { request_id: u64 },
    #[serde(rename_all = "camelCase")]
    Error { request_id: u64, message: String },
}

impl RendererReply {
    pub fn request_id(&self) -> u64 {
        match self {
            Self::Override { request_id, .. }
            | Self::Applied { request_id }
            | Self::Error { request_id, .. } => *request_id,
        }
    }
}

type PendingReplies = Mutex<HashMap<u64, oneshot::Sender<RendererReply>>>;

struct ChannelInner {
    outgoing: mpsc::UnboundedSender<RendererRequest>,
    pending: PendingReplies,
    next_id: AtomicU64,
    timeout: Duration,
}

/// Client half of the renderer channel.
///
/// Cloning shares the correlation counter and pending-reply map.
#[derive(Clone)]
pub struct RendererChannel {
    inner: Arc<ChannelInner>,
}

impl std::fmt::Debug for RendererChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererChannel")
            .field("timeout", &self.inner.timeout)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl RendererChannel {
    /// Create a channel and the receiver the renderer reads requests from.
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<RendererRequest>) {
        let (outgoing, requests) = mpsc::unbounded_channel();
        let channel = Self {
            inner: Arc::new(ChannelInner {
                outgoing,
                pending: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                timeout,
            }),
        };
        (channel, requests)
    }

    /// Create a channel using the configured reply timeout.
    pub fn from_config(config: &RendererConfig) -> (Self, mpsc::UnboundedReceiver<RendererRequest>) {
        Self::new(config.timeout())
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<RendererReply>>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }

    /// Route a reply to its waiting request.
    ///
    /// Returns `false` when no request with that id is waiting, which
    /// happens for late replies after a timeout.
    pub fn resolve(&self, reply: RendererReply) -> bool {
        let request_id = reply.request_id();
        let Some(waiter) = self.pending().remove(&request_id) else {
            tracing::debug!(request_id, "Dropping reply with no pending request");
            return false;
        };
        waiter.send(reply).is_ok()
    }

    async fn request(&self, build: impl FnOnce(u64) -> RendererRequest) -> Result<RendererReply> {
        let request_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending().insert(request_id, reply_tx);

        if self.inner.outgoing.send(build(request_id)).is_err() {
            self.pending().remove(&request_id);
            return Err(RuntimeError::ChannelClosed);
        }

        match tokio::time::timeout(self.inner.timeout, reply_rx).await {
            Ok(Ok(RendererReply::Error { message, .. })) => {
                Err(RuntimeError::Renderer { request_id, message })
            }
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(RuntimeError::ChannelClosed),
            Err(_) => {
                self.pending().remove(&request_id);
                let timeout_ms = u64::try_from(self.inner.timeout.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!(request_id, timeout_ms, "Renderer request timed out");
                Err(RuntimeError::Timeout {
                    request_id,
                    timeout_ms,
                })
            }
        }
    }
}

impl Renderer for RendererChannel {
    async fn fetch_override(&self, dataset_id: &str) -> Result<Option<Patch>> {
        let dataset_id = dataset_id.to_string();
        match self
            .request(|request_id| RendererRequest::FetchOverride {
                request_id,
                dataset_id,
            })
            .await?
        {
            RendererReply::Override { patch, .. } => Ok(patch),
            other => Err(RuntimeError::UnexpectedReply {
                request_id: other.request_id(),
            }),
        }
    }

    async fn apply_override(&self, dataset_id: &str, patch: Patch) -> Result<()> {
        let dataset_id = dataset_id.to_string();
        match self
            .request(|request_id| RendererRequest::ApplyOverride {
                request_id,
                dataset_id,
                patch,
            })
            .await?
        {
            RendererReply::Applied { .. } => Ok(()),
            other => Err(RuntimeError::UnexpectedReply {
                request_id: other.request_id(),
            }),
        }
    }
}
