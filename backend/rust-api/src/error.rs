/// Failures raised by the store collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stale write for {key}: expected version {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    #[error("Failed to (de)serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Errors surfaced by the learning services to the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LearningError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => LearningError::Conflict(err.to_string()),
            other => LearningError::Store(other),
        }
    }
}

impl From<validator::ValidationErrors> for LearningError {
    fn from(err: validator::ValidationErrors) -> Self {
        LearningError::Validation(err.to_string())
    }
}

impl LearningError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        LearningError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
