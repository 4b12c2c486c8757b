//! `ghostwriter-delivery` — the boundary to the external document service.
//!
//! Upstream error shapes stop here: the adapter classifies every result into
//! the three-way taxonomy (permanent / throttled / transient) and nothing
//! above this crate ever sees a raw service error.

pub mod adapter;
pub mod in_memory;
pub mod service;
pub mod throttle;

pub use adapter::{DeliveryAdapter, DeliveryOutcome};
pub use in_memory::{FailureMode, InMemoryDocumentService};
pub use service::{DocumentService, DocumentServiceError, InsertReceipt};
pub use throttle::ThrottleController;
