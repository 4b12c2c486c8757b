//! Document service contract.

use thiserror::Error;

use ghostwriter_core::{DocumentId, UserId};

/// Confirmation returned by a successful insert.
///
/// `revision_id` is the service's monotonically advancing revision token; an
/// empty token is treated as failure by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertReceipt {
    pub revision_id: String,
}

/// Classified error raised by a document service implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentServiceError {
    /// 401/403-class: the upstream credential is gone. Never transient.
    #[error("upstream credential revoked")]
    AuthRevoked,

    /// 429-class: back off and retry later.
    #[error("rate limited by document service")]
    RateLimited,

    /// Anything else; treated as transient.
    #[error("document service unavailable: {0}")]
    Unavailable(String),
}

/// Append-only external document API.
///
/// The target document may be extended by anyone at any time (including a
/// previous partially-retried call), so callers must fetch the append
/// position immediately before inserting rather than remembering an offset.
pub trait DocumentService: Send + Sync {
    /// Current end-of-document position, in chars.
    fn append_position(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<usize, DocumentServiceError>;

    /// Insert `text` at `position` (expected to be the current end).
    fn insert_text(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        position: usize,
        text: &str,
    ) -> Result<InsertReceipt, DocumentServiceError>;
}

impl<S: DocumentService + ?Sized> DocumentService for &S {
    fn append_position(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<usize, DocumentServiceError> {
        (**self).append_position(user_id, document_id)
    }

    fn insert_text(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        position: usize,
        text: &str,
    ) -> Result<InsertReceipt, DocumentServiceError> {
        (**self).insert_text(user_id, document_id, position, text)
    }
}

impl<S: DocumentService + ?Sized> DocumentService for std::sync::Arc<S> {
    fn append_position(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<usize, DocumentServiceError> {
        (**self).append_position(user_id, document_id)
    }

    fn insert_text(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        position: usize,
        text: &str,
    ) -> Result<InsertReceipt, DocumentServiceError> {
        (**self).insert_text(user_id, document_id, position, text)
    }
}
