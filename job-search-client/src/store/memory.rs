use super::JobStore;
use crate::error::Result;
use crate::job::JobRecord;
use async_trait::async_trait;
use dashmap::DashMap;

fn identity_key(title: &str, company: &str) -> String {
    format!(
        "{}|{}",
        title.trim().to_lowercase(),
        company.trim().to_lowercase()
    )
}

/// In-memory job store over a concurrent map, used by tests and local
/// runs.
#[derive(Default)]
pub struct InMemoryStore {
    records: DashMap<String, JobRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn upsert(&self, record: JobRecord) -> Result<()> {
        match self.records.get_mut(&record.id) {
            Some(mut existing) => existing.merge_from(record),
            None => {
                self.records.insert(record.id.clone(), record);
            }
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<JobRecord>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<JobRecord>> {
        let url = url.trim().to_lowercase();
        if url.is_empty() {
            return Ok(None);
        }
        Ok(self
            .records
            .iter()
            .find(|r| r.url.trim().to_lowercase() == url)
            .map(|r| r.clone()))
    }

    async fn find_by_title_company(
        &self,
        title: &str,
        company: &str,
    ) -> Result<Option<JobRecord>> {
        let key = identity_key(title, company);
        Ok(self
            .records
            .iter()
            .find(|r| identity_key(&r.title, &r.company) == key)
            .map(|r| r.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.records.remove(id);
        Ok(())
    }

    async fn list(&self, page: usize, limit: usize) -> Result<Vec<JobRecord>> {
        let limit = limit.max(1);
        let mut records: Vec<JobRecord> = self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records.into_iter().skip(page * limit).take(limit).collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }
}
