//! Point-in-time lookups against the provider catalog
//!
//! The machine image is an external fact, not a managed record: re-running
//! the lookup later may resolve to a different image if the catalog changed.

use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_ec2::types::Filter;
use flinklab_core::provider::{ProviderError, ProviderResult};

/// Filtered machine-image query
#[derive(Debug, Clone)]
pub struct ImageQuery {
    /// Name pattern (e.g., "al2023-ami-2023*-kernel-6.12-x86_64")
    pub name_pattern: String,
    /// Virtualization type filter (e.g., "hvm")
    pub virtualization_type: String,
    /// Architecture filter (e.g., "x86_64")
    pub architecture: String,
    /// Image owner filter (e.g., "amazon")
    pub owner: String,
}

/// A resolved machine image
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub image_id: String,
    pub name: Option<String>,
    pub creation_date: Option<String>,
}

/// Resolve the most recent image matching the query.
///
/// Zero matches is fatal: the instance declaration cannot proceed without an
/// image, and there is no fallback.
pub async fn resolve_image(ec2: &Ec2Client, query: &ImageQuery) -> ProviderResult<ResolvedImage> {
    let response = ec2
        .describe_images()
        .owners(&query.owner)
        .filters(
            Filter::builder()
                .name("name")
                .values(&query.name_pattern)
                .build(),
        )
        .filters(
            Filter::builder()
                .name("virtualization-type")
                .values(&query.virtualization_type)
                .build(),
        )
        .filters(
            Filter::builder()
                .name("architecture")
                .values(&query.architecture)
                .build(),
        )
        .send()
        .await
        .map_err(|e| ProviderError::new(format!("Failed to query machine images: {:?}", e)))?;

    let mut images = response.images().to_vec();

    // Most recent first; creation dates are ISO 8601, so string order works
    images.sort_by(|a, b| b.creation_date().cmp(&a.creation_date()));

    let newest = images.into_iter().next().ok_or_else(|| {
        ProviderError::new(format!(
            "No machine image matches name '{}' (owner {}, {} {})",
            query.name_pattern, query.owner, query.virtualization_type, query.architecture
        ))
    })?;

    let image_id = newest
        .image_id()
        .ok_or_else(|| ProviderError::new("Machine image lookup returned no image id"))?
        .to_string();

    Ok(ResolvedImage {
        image_id,
        name: newest.name().map(|s| s.to_string()),
        creation_date: newest.creation_date().map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_query_holds_all_four_filters() {
        let query = ImageQuery {
            name_pattern: "al2023-ami-2023*-kernel-6.12-x86_64".to_string(),
            virtualization_type: "hvm".to_string(),
            architecture: "x86_64".to_string(),
            owner: "amazon".to_string(),
        };

        assert!(query.name_pattern.contains("al2023"));
        assert_eq!(query.virtualization_type, "hvm");
        assert_eq!(query.architecture, "x86_64");
        assert_eq!(query.owner, "amazon");
    }

    #[test]
    fn creation_dates_order_lexicographically() {
        // The sort in resolve_image relies on this
        let older = Some("2025-01-12T08:00:00.000Z");
        let newer = Some("2025-11-03T08:00:00.000Z");
        assert!(newer.cmp(&older).is_gt());
    }
}
