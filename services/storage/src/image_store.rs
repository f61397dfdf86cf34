use crate::camera_event::{CameraEvent, EventImage, ObjectStoreService, RemoteImageReference};
use crate::config::StoreConfig;
use crate::error::{ReferenceField, Result, StoreError};
use crate::file_handle::{FileHandle, LocalFile, RemoteFile};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{NaiveDateTime, Utc};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Decision on how an event image is represented
#[derive(Debug, Clone, PartialEq)]
pub enum StorageDecision {
    /// Write the payload to a local file
    Local { payload: Vec<u8>, reason: String },
    /// Reference the object already held by the remote store
    Remote { reference: RemoteFile },
}

/// Destination for local image bytes
#[cfg_attr(test, mockall::automock)]
pub trait ImageSink {
    /// Write `bytes` to a new file at `path`
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Writes images to the local filesystem
pub struct FsSink;

impl ImageSink for FsSink {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let written = file.write_all(bytes).and_then(|_| file.sync_all());

        if written.is_err() {
            // Leave nothing half-written behind
            let _ = fs::remove_file(path);
        }
        written
    }
}

/// Selects the storage representation for camera event images
///
/// - absent or inline base64 images become local files
/// - `AWS_S3` references become remote file handles after validation
/// - references to unrecognized services fall back to local files
pub struct ImageStoreSelector {
    config: StoreConfig,
    sink: Box<dyn ImageSink>,
}

impl ImageStoreSelector {
    /// Create a new selector writing to the local filesystem
    pub fn new(config: StoreConfig) -> Self {
        Self::with_sink(config, Box::new(FsSink))
    }

    pub fn with_sink(config: StoreConfig, sink: Box<dyn ImageSink>) -> Self {
        Self { config, sink }
    }

    /// Store the image carried by `event`
    pub fn store_image(&self, event: &CameraEvent) -> Result<FileHandle> {
        self.resolve(&event.image, event)
    }

    /// Resolve `image` into a file handle.
    ///
    /// `event` supplies the metadata that places a local file on disk.
    #[instrument(skip(self, image, event), fields(camera_id = ?event.camera_id))]
    pub fn resolve(&self, image: &EventImage, event: &CameraEvent) -> Result<FileHandle> {
        match self.classify(image)? {
            StorageDecision::Local { payload, reason } => {
                let file = self.write_local(&payload, event)?;
                info!(
                    path = %file.path().display(),
                    size_bytes = file.len(),
                    reason = %reason,
                    "Event image stored locally"
                );
                Ok(FileHandle::Local(file))
            }
            StorageDecision::Remote { reference } => {
                metrics::counter!("image_store.remote.referenced").increment(1);
                info!(resource = %reference.resource(), "Event image referenced in object store");
                Ok(FileHandle::Remote(reference))
            }
        }
    }

    /// Decide how `image` is represented without touching the filesystem
    pub fn classify(&self, image: &EventImage) -> Result<StorageDecision> {
        match image {
            EventImage::Absent => Ok(StorageDecision::Local {
                payload: Vec::new(),
                reason: "No image attached".to_string(),
            }),
            EventImage::Raw(encoded) => Ok(decode_payload(encoded)),
            EventImage::Remote(reference) => self.classify_reference(reference),
        }
    }

    fn classify_reference(&self, reference: &RemoteImageReference) -> Result<StorageDecision> {
        match &reference.service_name {
            Some(ObjectStoreService::AwsS3) => {
                let object_id = required(&reference.object_id, ReferenceField::ObjectId)?;
                let bucket_id = required(&reference.bucket_id, ReferenceField::BucketId)?;

                Ok(StorageDecision::Remote {
                    reference: RemoteFile::new(object_id.to_string(), bucket_id.to_string()),
                })
            }
            other => {
                let service = other.as_ref().map(|s| s.as_str()).unwrap_or("<none>");

                if !self.config.remote.fallback_to_local {
                    return Err(StoreError::UnsupportedService {
                        service: service.to_string(),
                    });
                }

                warn!(
                    service = %service,
                    object_id = ?reference.object_id,
                    "Unrecognized object store service, falling back to local file"
                );
                Ok(StorageDecision::Local {
                    payload: Vec::new(),
                    reason: format!("Unrecognized object store service: {}", service),
                })
            }
        }
    }

    fn write_local(&self, payload: &[u8], event: &CameraEvent) -> Result<LocalFile> {
        let path = self.local_path(event);

        debug!(
            path = %path.display(),
            size_bytes = payload.len(),
            "Writing event image"
        );

        self.sink.write(&path, payload)?;

        metrics::counter!("image_store.local.stored").increment(1);
        metrics::counter!("image_store.bytes.written").increment(payload.len() as u64);

        Ok(LocalFile::new(
            path,
            payload.len() as u64,
            self.config.local.keep_files,
        ))
    }

    /// Local file path for an event image
    /// Format: {root}/{date}/{camera_id}/{direction}/{time}_{uuid}.{ext}
    ///
    /// Date and time come from the capture time, then the processing time,
    /// then the current time. The uuid keeps repeated events apart.
    pub fn local_path(&self, event: &CameraEvent) -> PathBuf {
        let timestamp = event_timestamp(event);
        let camera = event
            .camera_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown-camera".to_string());
        let direction = event.direction.map(|d| d.as_str()).unwrap_or("unknown");

        let file_name = format!(
            "{time}_{id}.{ext}",
            time = timestamp.format("%H%M%S%3f"),
            id = Uuid::new_v4().simple(),
            ext = sanitize_path_component(&self.config.local.file_extension.to_lowercase()),
        );

        self.config
            .local
            .root_dir
            .join(timestamp.format("%Y-%m-%d").to_string())
            .join(sanitize_path_component(&camera))
            .join(direction)
            .join(file_name)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

/// Cameras wrap long payloads and do not always pad them
const INLINE_IMAGE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode an inline image. Undecodable data is stored as an empty file.
fn decode_payload(encoded: &str) -> StorageDecision {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match INLINE_IMAGE.decode(compact) {
        Ok(payload) => StorageDecision::Local {
            reason: format!("Inline image ({} bytes)", payload.len()),
            payload,
        },
        Err(e) => {
            warn!(error = %e, "Inline image is not valid base64, storing empty file");
            StorageDecision::Local {
                payload: Vec::new(),
                reason: format!("Undecodable inline image: {}", e),
            }
        }
    }
}

fn required(value: &Option<String>, field: ReferenceField) -> Result<&str> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => {
            metrics::counter!("image_store.references.invalid").increment(1);
            warn!(field = %field, "Object store reference is missing a field");
            Err(StoreError::InvalidReference { field })
        }
    }
}

fn event_timestamp(event: &CameraEvent) -> NaiveDateTime {
    event
        .capture_time
        .or_else(|| event.processing_time.map(|t| t.naive_local()))
        .unwrap_or_else(|| Utc::now().naive_utc())
}

/// Sanitize a path component to prevent path traversal
fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Builder for creating ImageStoreSelector with custom settings
pub struct ImageStoreSelectorBuilder {
    config: StoreConfig,
    sink: Option<Box<dyn ImageSink>>,
}

impl ImageStoreSelectorBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            sink: None,
        }
    }

    pub fn root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.config.local.root_dir = root_dir.into();
        self
    }

    pub fn file_extension(mut self, extension: &str) -> Self {
        self.config.local.file_extension = extension.to_string();
        self
    }

    pub fn keep_files(mut self, keep: bool) -> Self {
        self.config.local.keep_files = keep;
        self
    }

    pub fn fallback_to_local(mut self, enabled: bool) -> Self {
        self.config.remote.fallback_to_local = enabled;
        self
    }

    pub fn sink(mut self, sink: Box<dyn ImageSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn build(self) -> ImageStoreSelector {
        match self.sink {
            Some(sink) => ImageStoreSelector::with_sink(self.config, sink),
            None => ImageStoreSelector::new(self.config),
        }
    }
}

impl Default for ImageStoreSelectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
