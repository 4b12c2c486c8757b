//! Delivery adapter: position fetch, insert, classification.

use tracing::{debug, warn};

use ghostwriter_core::{DocumentId, TypingBatch, UserId};

use crate::service::{DocumentService, DocumentServiceError};

/// Classified result of one delivery attempt.
///
/// This is the only error shape the runner ever sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Batch landed; the service confirmed with a revision token.
    Delivered {
        revision_id: String,
        inserted_chars: usize,
    },
    /// Permanent: upstream credential revoked.
    AuthRevoked,
    /// Transient: back off and retry.
    RateLimited,
    /// Transient: anything else.
    Failed(String),
}

/// Wraps a [`DocumentService`] and classifies its results.
#[derive(Debug, Clone)]
pub struct DeliveryAdapter<S: DocumentService> {
    service: S,
}

impl<S: DocumentService> DeliveryAdapter<S> {
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Deliver one batch.
    ///
    /// The append position is fetched immediately before the insert: the
    /// document is append-only and may have been extended by a previous
    /// partially-retried call, so a remembered offset is never trusted.
    pub fn deliver(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        batch: &TypingBatch,
    ) -> DeliveryOutcome {
        let position = match self.service.append_position(user_id, document_id) {
            Ok(p) => p,
            Err(e) => return classify(e),
        };

        match self.service.insert_text(user_id, document_id, position, &batch.text) {
            Ok(receipt) if receipt.revision_id.is_empty() => {
                // A success without a revision token may mean the write was
                // silently dropped or partially applied; treat as failure.
                warn!(
                    document_id = %document_id,
                    start_index = batch.start_index,
                    "insert returned no revision token"
                );
                DeliveryOutcome::Failed("insert confirmed without a revision token".to_string())
            }
            Ok(receipt) => {
                debug!(
                    document_id = %document_id,
                    revision_id = %receipt.revision_id,
                    chars = batch.char_len(),
                    "batch delivered"
                );
                DeliveryOutcome::Delivered {
                    revision_id: receipt.revision_id,
                    inserted_chars: batch.char_len(),
                }
            }
            Err(e) => classify(e),
        }
    }
}

fn classify(error: DocumentServiceError) -> DeliveryOutcome {
    match error {
        DocumentServiceError::AuthRevoked => DeliveryOutcome::AuthRevoked,
        DocumentServiceError::RateLimited => DeliveryOutcome::RateLimited,
        DocumentServiceError::Unavailable(msg) => DeliveryOutcome::Failed(msg),
    }
}
