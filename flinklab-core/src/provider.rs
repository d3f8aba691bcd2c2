//! Provider - Trait abstracting record operations
//!
//! A Provider turns Effects into control-plane API calls. All lifecycle
//! orchestration (polling, eventual consistency, retries) lives behind this
//! seam.

use std::future::Future;
use std::pin::Pin;

use crate::record::{Record, RecordId, RemoteState};

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    pub record_id: Option<RecordId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.record_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            record_id: None,
            cause: None,
        }
    }

    pub fn for_record(mut self, id: RecordId) -> Self {
        self.record_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Main Provider trait
///
/// All operations are async and involve side effects against the target
/// environment's control plane.
pub trait Provider: Send + Sync {
    /// Name of this Provider (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Get the current state of a record.
    ///
    /// Without an identifier the record is treated as not yet materialized
    /// and `RemoteState::not_found` is returned.
    fn read(
        &self,
        id: &RecordId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<RemoteState>>;

    /// Create a record.
    ///
    /// Returns RemoteState with the provider-assigned identifier set.
    fn create(&self, record: &Record) -> BoxFuture<'_, ProviderResult<RemoteState>>;

    /// Update a record in place, identified by its provider-assigned id
    fn update(
        &self,
        id: &RecordId,
        identifier: &str,
        to: &Record,
    ) -> BoxFuture<'_, ProviderResult<RemoteState>>;

    /// Delete a record, identified by its provider-assigned id
    fn delete(&self, id: &RecordId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    // Mock Provider for testing the trait surface
    struct MockProvider;

    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn read(
            &self,
            id: &RecordId,
            identifier: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<RemoteState>> {
            let id = id.clone();
            let found = identifier.is_some();
            Box::pin(async move {
                if found {
                    Ok(RemoteState::existing(id, Default::default()))
                } else {
                    Ok(RemoteState::not_found(id))
                }
            })
        }

        fn create(&self, record: &Record) -> BoxFuture<'_, ProviderResult<RemoteState>> {
            let id = record.id.clone();
            let attrs = record.attributes.clone();
            Box::pin(async move {
                Ok(RemoteState::existing(id, attrs).with_identifier("mock-id-123"))
            })
        }

        fn update(
            &self,
            id: &RecordId,
            _identifier: &str,
            to: &Record,
        ) -> BoxFuture<'_, ProviderResult<RemoteState>> {
            let id = id.clone();
            let attrs = to.attributes.clone();
            Box::pin(async move { Ok(RemoteState::existing(id, attrs)) })
        }

        fn delete(&self, _id: &RecordId, _identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn mock_provider_read_without_identifier_is_not_found() {
        let provider = MockProvider;
        let id = RecordId::new("vpc", "net");
        let state = provider.read(&id, None).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn mock_provider_create_returns_identifier() {
        let provider = MockProvider;
        let record = Record::new("vpc", "net", "vpc");
        let state = provider.create(&record).await.unwrap();
        assert!(state.exists);
        assert_eq!(state.identifier, Some("mock-id-123".to_string()));
    }

    #[test]
    fn provider_error_display_includes_record() {
        let err = ProviderError::new("creation rejected").for_record(RecordId::new("vpc", "net"));
        assert_eq!(err.to_string(), "[vpc.net] creation rejected");
    }
}
