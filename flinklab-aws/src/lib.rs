//! flinklab AWS Provider
//!
//! Materializes the lab's records through the AWS Cloud Control API, which
//! owns all create/update/delete orchestration and operation polling.
//!
//! ## Module Structure
//!
//! - `provider` - AwsProvider implementation (Cloud Control plumbing)
//! - `resources` - Record kind configurations (CloudFormation mappings)
//! - `schemas` - Per-kind attribute schemas
//! - `lookup` - Region context and machine-image queries
//! - `validation` - Cross-attribute checks
//! - `utils` - Value helpers (user data encoding)

pub mod lookup;
pub mod provider;
pub mod resources;
pub mod schemas;
pub mod utils;
pub mod validation;

// Re-export main types
pub use lookup::{ImageQuery, ResolvedImage};
pub use provider::AwsProvider;

use flinklab_core::provider::{BoxFuture, Provider, ProviderResult};
use flinklab_core::record::{Record, RecordId, RemoteState};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for AwsProvider {
    fn name(&self) -> &'static str {
        "aws"
    }

    fn read(
        &self,
        id: &RecordId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<RemoteState>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_record(&id, identifier.as_deref()).await })
    }

    fn create(&self, record: &Record) -> BoxFuture<'_, ProviderResult<RemoteState>> {
        let record = record.clone();
        Box::pin(async move { self.create_record(record).await })
    }

    fn update(
        &self,
        id: &RecordId,
        identifier: &str,
        to: &Record,
    ) -> BoxFuture<'_, ProviderResult<RemoteState>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let to = to.clone();
        Box::pin(async move { self.update_record(id, &identifier, to).await })
    }

    fn delete(&self, id: &RecordId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move { self.delete_record(&id, &identifier).await })
    }
}
