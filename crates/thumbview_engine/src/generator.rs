use std::marker::PhantomData;

use thumbview_core::FailureKind;

use crate::archive::ExtractError;

/// Why a generator produced no thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct GenerateError {
    pub kind: FailureKind,
    pub message: String,
}

impl GenerateError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(uid: &str) -> Self {
        Self::new(FailureKind::NotFound, uid)
    }
}

impl From<ExtractError> for GenerateError {
    fn from(err: ExtractError) -> Self {
        let kind = match err {
            ExtractError::NotFound(_) => FailureKind::NotFound,
            _ => FailureKind::Corrupted,
        };
        Self::new(kind, err.to_string())
    }
}

/// Produces the thumbnail for one item. Called from worker threads, possibly
/// concurrently for distinct ids, and allowed to block.
pub trait ThumbnailGenerator: Send + Sync + 'static {
    type Thumbnail: Send + 'static;

    fn generate(&self, uid: &str) -> Result<Self::Thumbnail, GenerateError>;
}

/// Adapts a closure into a [`ThumbnailGenerator`].
pub struct FnGenerator<F, T> {
    f: F,
    _thumbnail: PhantomData<fn() -> T>,
}

impl<F, T> FnGenerator<F, T>
where
    F: Fn(&str) -> Result<T, GenerateError> + Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _thumbnail: PhantomData,
        }
    }
}

impl<F, T> ThumbnailGenerator for FnGenerator<F, T>
where
    F: Fn(&str) -> Result<T, GenerateError> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Thumbnail = T;

    fn generate(&self, uid: &str) -> Result<T, GenerateError> {
        (self.f)(uid)
    }
}
