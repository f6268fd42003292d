pub mod memory;

use crate::error::Result;
use crate::job::JobRecord;
use async_trait::async_trait;

/// Primary document store for canonical job records.
///
/// `upsert` carries merge semantics: an existing record with the same id
/// absorbs the incoming one via `JobRecord::merge_from`. The orchestration
/// layer never deletes records; `delete_by_id` exists for the maintenance
/// layer sitting above this crate.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn upsert(&self, record: JobRecord) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<JobRecord>>;
    async fn find_by_url(&self, url: &str) -> Result<Option<JobRecord>>;
    async fn find_by_title_company(
        &self,
        title: &str,
        company: &str,
    ) -> Result<Option<JobRecord>>;
    async fn delete_by_id(&self, id: &str) -> Result<()>;
    async fn list(&self, page: usize, limit: usize) -> Result<Vec<JobRecord>>;
    async fn count(&self) -> Result<usize>;
}
