use thiserror::Error;

/// Result alias for image store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Field of a remote image reference that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceField {
    ObjectId,
    BucketId,
}

impl ReferenceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceField::ObjectId => "object_id",
            ReferenceField::BucketId => "bucket_id",
        }
    }
}

impl std::fmt::Display for ReferenceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while resolving a camera event image
#[derive(Debug, Error)]
pub enum StoreError {
    /// A recognized remote reference is missing a required field
    #[error("{}", invalid_reference_message(*field))]
    InvalidReference { field: ReferenceField },

    /// The reference names an object store this component does not handle
    /// and local fallback is disabled
    #[error("Unsupported object store service: {service}")]
    UnsupportedService { service: String },

    /// Writing the local image file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn invalid_reference_message(field: ReferenceField) -> &'static str {
    match field {
        ReferenceField::ObjectId => "AWS S3 resource info (object_id) missing!",
        ReferenceField::BucketId => "AWS S3 bucket info (bucket_id) missing!",
    }
}

impl StoreError {
    /// Name of the missing field for `InvalidReference` errors
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            StoreError::InvalidReference { field } => Some(field.as_str()),
            _ => None,
        }
    }

    /// Only a failed disk write is worth retrying; a bad reference stays bad.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
