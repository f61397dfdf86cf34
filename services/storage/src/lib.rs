//! LPR Image Store
//!
//! Image persistence for license plate recognition camera events. Each event
//! may carry an image inline (base64), as a reference to an object already
//! uploaded to S3, or not at all. The store turns that into a file handle:
//!
//! - **Local files** for inline and missing images, written under a
//!   date/camera/direction layout so downstream reporting can open them
//! - **Remote files** for `AWS_S3` references, validated and addressed as
//!   `bucket/object` without any object store I/O
//!
//! ## Flow
//!
//! ```text
//! CameraEvent.image
//!        │
//!        ▼
//! ┌──────────────┐   Absent / Raw / unknown service   ┌──────────────┐
//! │ Image Store  │───────────────────────────────────▶│ LocalFile    │
//! │ Selector     │                                    └──────────────┘
//! └──────────────┘   AWS_S3 reference                 ┌──────────────┐
//!        │──────────────────────────────────────────▶│ RemoteFile   │
//!        │                                            └──────────────┘
//!        ▼
//!  InvalidReference (object_id / bucket_id missing)
//! ```

pub mod camera_event;
pub mod config;
pub mod error;
pub mod file_handle;
pub mod image_store;

pub use camera_event::{CameraEvent, Direction, EventImage, ObjectStoreService, RemoteImageReference};
pub use config::StoreConfig;
pub use error::{ReferenceField, Result, StoreError};
pub use file_handle::{FileHandle, LocalFile, RemoteFile};
pub use image_store::{FsSink, ImageSink, ImageStoreSelector, ImageStoreSelectorBuilder, StorageDecision};

use anyhow::Context;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging for an embedding application.
///
/// `RUST_LOG` takes precedence over `log_level`.
pub fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .try_init()
        .context("Failed to install tracing subscriber")
}
