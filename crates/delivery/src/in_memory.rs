//! In-memory document service for tests/dev.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use ghostwriter_core::{DocumentId, UserId};

use crate::service::{DocumentService, DocumentServiceError, InsertReceipt};

/// Failure to inject on the next insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    AuthRevoked,
    RateLimited,
    Transient,
    /// Insert succeeds and mutates the document, but the receipt carries an
    /// empty revision token. Exercises the adapter's silent-partial guard.
    EmptyRevision,
}

#[derive(Debug, Default)]
struct DocumentState {
    content: String,
    revision: u64,
}

/// Append-only in-memory document store with a scriptable failure queue.
///
/// Not optimized; intended for tests and the simulate binary.
#[derive(Debug, Default)]
pub struct InMemoryDocumentService {
    docs: RwLock<HashMap<(UserId, DocumentId), DocumentState>>,
    failures: Mutex<VecDeque<FailureMode>>,
}

impl InMemoryDocumentService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self::new())
    }

    /// Queue a failure for the next insert (FIFO across calls).
    pub fn fail_next(&self, mode: FailureMode) {
        self.failures.lock().unwrap().push_back(mode);
    }

    /// Current document text, if any was written.
    pub fn content(&self, user_id: UserId, document_id: DocumentId) -> Option<String> {
        self.docs
            .read()
            .unwrap()
            .get(&(user_id, document_id))
            .map(|d| d.content.clone())
    }

    /// Current revision counter (0 before the first insert).
    pub fn revision(&self, user_id: UserId, document_id: DocumentId) -> u64 {
        self.docs
            .read()
            .unwrap()
            .get(&(user_id, document_id))
            .map(|d| d.revision)
            .unwrap_or(0)
    }
}

impl DocumentService for InMemoryDocumentService {
    fn append_position(
        &self,
        user_id: UserId,
        document_id: DocumentId,
    ) -> Result<usize, DocumentServiceError> {
        let docs = self.docs.read().unwrap();
        Ok(docs
            .get(&(user_id, document_id))
            .map(|d| d.content.chars().count())
            .unwrap_or(0))
    }

    fn insert_text(
        &self,
        user_id: UserId,
        document_id: DocumentId,
        position: usize,
        text: &str,
    ) -> Result<InsertReceipt, DocumentServiceError> {
        let injected = self.failures.lock().unwrap().pop_front();
        match injected {
            Some(FailureMode::AuthRevoked) => return Err(DocumentServiceError::AuthRevoked),
            Some(FailureMode::RateLimited) => return Err(DocumentServiceError::RateLimited),
            Some(FailureMode::Transient) => {
                return Err(DocumentServiceError::Unavailable(
                    "injected transient failure".to_string(),
                ));
            }
            Some(FailureMode::EmptyRevision) | None => {}
        }

        let mut docs = self.docs.write().unwrap();
        let doc = docs.entry((user_id, document_id)).or_default();

        let char_len = doc.content.chars().count();
        if position > char_len {
            return Err(DocumentServiceError::Unavailable(format!(
                "insert position {position} past end of document ({char_len})"
            )));
        }

        let byte_offset = doc
            .content
            .char_indices()
            .nth(position)
            .map(|(i, _)| i)
            .unwrap_or(doc.content.len());
        doc.content.insert_str(byte_offset, text);
        doc.revision += 1;

        let revision_id = if injected == Some(FailureMode::EmptyRevision) {
            String::new()
        } else {
            format!("rev-{}", doc.revision)
        };
        Ok(InsertReceipt { revision_id })
    }
}
