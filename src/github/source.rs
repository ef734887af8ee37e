//! The remote operations the pipeline depends on.

use crate::error::ApiError;
use crate::models::{Delivery, DeliveryDetail, Hook};
use async_trait::async_trait;

/// Read access to repositories, their hooks and hook deliveries.
///
/// Implementations handle authentication and pagination; callers see
/// complete lists.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Full names (`OWNER/REPO`) of every repository in an organization.
    async fn list_repositories(&self, org: &str) -> Result<Vec<String>, ApiError>;

    /// Webhooks registered on a repository.
    async fn list_hooks(&self, repo: &str) -> Result<Vec<Hook>, ApiError>;

    /// Recent deliveries for one hook, `per_page` records per request.
    ///
    /// Returned deliveries are not yet stamped with `repo`/`hook_id`.
    async fn list_deliveries(
        &self,
        repo: &str,
        hook_id: u64,
        per_page: u32,
    ) -> Result<Vec<Delivery>, ApiError>;

    /// Full record for one delivery, including its target URL.
    async fn get_delivery_detail(
        &self,
        repo: &str,
        hook_id: u64,
        delivery_id: u64,
    ) -> Result<DeliveryDetail, ApiError>;
}
