//! Async runtime around the composition engine.
//!
//! - `DatasetSession` / `SessionRegistry` - one serialized composition task per dataset
//! - `RendererChannel` - correlated request/response channel with timeouts
//! - `DebounceTracker` / `GenerationCounter` - debounced, stale-safe metadata fetches
//! - `RuntimeConfig` - TOML configuration with defaults

mod channel;
mod config;
mod debounce;
mod error;
mod generation;
mod metadata;
mod session;

pub use channel::{Renderer, RendererChannel, RendererReply, RendererRequest};
pub use config::{RendererConfig, RuntimeConfig, TemplatesConfig};
pub use debounce::{DebounceConfig, DebounceTracker};
pub use error::{Result, RuntimeError};
pub use generation::{GenerationCounter, RequestToken};
pub use metadata::{FileMetadata, MetadataSource, StaticMetadata, parse_attribute_domains};
pub use session::{DatasetSession, SessionCommand, SessionHandle, SessionRegistry};
