use super::{IndexPage, IndexQuery, IndexedJob, SearchIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory stand-in for the managed index, used by tests and local
/// runs. Matching is token containment over the text fields; the filter
/// grammar is evaluated literally for the numeric/boolean fields the
/// orchestrator emits.
#[derive(Default)]
pub struct InMemoryIndex {
    objects: DashMap<String, IndexedJob>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn matches_text(object: &IndexedJob, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        let haystack = format!(
            "{} {} {} {} {} {}",
            object.job.title,
            object.job.location,
            object.job.long_location,
            object.job.country,
            object.job.description,
            object.job.tags.join(" "),
        )
        .to_lowercase();

        query
            .split_whitespace()
            .all(|token| haystack.contains(token))
    }

    fn matches_filters(object: &IndexedJob, filters: &str) -> bool {
        filters
            .split(" AND ")
            .all(|clause| Self::matches_clause(object, clause.trim()))
    }

    fn matches_clause(object: &IndexedJob, clause: &str) -> bool {
        let parts: Vec<&str> = clause.split_whitespace().collect();
        if parts.len() != 3 {
            return false;
        }
        let (field, op, value) = (parts[0], parts[1], parts[2]);

        match field {
            "remote" => {
                let expected = value == "true";
                op == "=" && object.job.remote == expected
            }
            "salaryMin" | "salaryMax" => {
                let actual = if field == "salaryMin" {
                    object.job.salary_min
                } else {
                    object.job.salary_max
                };
                let (Some(actual), Ok(expected)) = (actual, value.parse::<i64>()) else {
                    return false;
                };
                Self::compare(actual as i64, op, expected)
            }
            "ingested_at" => {
                let Ok(expected) = value.parse::<i64>() else {
                    return false;
                };
                Self::compare(object.ingested_at, op, expected)
            }
            _ => false,
        }
    }

    fn compare(actual: i64, op: &str, expected: i64) -> bool {
        match op {
            ">=" => actual >= expected,
            "<=" => actual <= expected,
            "=" => actual == expected,
            _ => false,
        }
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    async fn search(&self, query: &IndexQuery) -> Result<IndexPage> {
        let mut hits: Vec<IndexedJob> = self
            .objects
            .iter()
            .filter(|entry| Self::matches_text(entry.value(), &query.query))
            .filter(|entry| {
                query
                    .filters
                    .as_deref()
                    .map_or(true, |filters| Self::matches_filters(entry.value(), filters))
            })
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first, so paging is deterministic.
        hits.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));

        let nb_hits = hits.len();
        let per_page = query.hits_per_page.max(1);
        let start = query.page * per_page;
        let hits = if start >= hits.len() {
            vec![]
        } else {
            hits.into_iter().skip(start).take(per_page).collect()
        };

        Ok(IndexPage { hits, nb_hits })
    }

    async fn save_objects(&self, objects: &[IndexedJob]) -> Result<()> {
        for object in objects {
            if object.job.id.is_empty() {
                return Err(Error::Index("object id must not be empty".to_string()));
            }
            self.objects.insert(object.job.id.clone(), object.clone());
        }
        Ok(())
    }

    async fn delete_objects(&self, object_ids: &[String]) -> Result<()> {
        for id in object_ids {
            self.objects.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobRecord;

    fn indexed(id: &str, title: &str, location: &str, ingested_at: i64) -> IndexedJob {
        IndexedJob {
            job: JobRecord {
                id: id.to_string(),
                title: title.to_string(),
                location: location.to_string(),
                date_posted: "2026-08-01".to_string(),
                ..Default::default()
            },
            ingested_at,
        }
    }

    #[tokio::test]
    async fn test_token_containment_matching() {
        let index = InMemoryIndex::new();
        index
            .save_objects(&[
                indexed("a", "Software Engineer", "Remote", 10),
                indexed("b", "Chef", "Paris", 20),
            ])
            .await
            .unwrap();

        let page = index
            .search(&IndexQuery {
                query: "software engineer remote".to_string(),
                hits_per_page: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.nb_hits, 1);
        assert_eq!(page.hits[0].job.id, "a");
    }

    #[tokio::test]
    async fn test_ingested_at_filter() {
        let index = InMemoryIndex::new();
        index
            .save_objects(&[
                indexed("old", "Engineer", "Remote", 100),
                indexed("new", "Engineer", "Remote", 900),
            ])
            .await
            .unwrap();

        let page = index
            .search(&IndexQuery {
                query: "engineer".to_string(),
                filters: Some("ingested_at >= 500".to_string()),
                hits_per_page: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.nb_hits, 1);
        assert_eq!(page.hits[0].job.id, "new");
    }

    #[tokio::test]
    async fn test_salary_filter_excludes_missing_salary() {
        let index = InMemoryIndex::new();
        let mut with_salary = indexed("a", "Engineer", "Remote", 10);
        with_salary.job.salary_min = Some(120_000);
        let without_salary = indexed("b", "Engineer", "Remote", 20);
        index
            .save_objects(&[with_salary, without_salary])
            .await
            .unwrap();

        let page = index
            .search(&IndexQuery {
                query: "engineer".to_string(),
                filters: Some("salaryMin >= 100000".to_string()),
                hits_per_page: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.nb_hits, 1);
        assert_eq!(page.hits[0].job.id, "a");
    }

    #[tokio::test]
    async fn test_save_is_id_keyed_upsert() {
        let index = InMemoryIndex::new();
        index
            .save_objects(&[indexed("a", "Engineer", "Remote", 10)])
            .await
            .unwrap();
        index
            .save_objects(&[indexed("a", "Senior Engineer", "Remote", 20)])
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
    }
}
