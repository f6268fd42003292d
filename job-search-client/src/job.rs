use chrono::DateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Canonical job posting as persisted to the store and index.
///
/// Field names follow the wire schema the sanitization prompt demands, so
/// a well-behaved generation response deserializes directly into this
/// shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub long_location: String,
    pub description: String,
    pub short_description: String,
    /// ISO-8601; kept as text because it arrives from generation output
    /// and is validated rather than parsed eagerly.
    pub date_posted: String,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub country: String,
    pub industry: String,
    pub tags: Vec<String>,
    pub employment_statuses: Vec<String>,
    pub url: String,
    pub final_url: String,
    pub remote: bool,
    pub source: String,
}

impl JobRecord {
    /// Schema check applied after sanitization: required identity fields
    /// present and the posting date parseable.
    pub fn is_valid(&self) -> bool {
        if self.id.trim().is_empty() || self.title.trim().is_empty() {
            return false;
        }
        if self.date_posted.trim().is_empty() {
            return false;
        }
        parse_iso_date(&self.date_posted)
    }

    /// Merge semantics for upserts: incoming non-empty fields win, present
    /// fields are never clobbered by empty ones.
    pub fn merge_from(&mut self, incoming: JobRecord) {
        merge_string(&mut self.title, incoming.title);
        merge_string(&mut self.company, incoming.company);
        merge_string(&mut self.location, incoming.location);
        merge_string(&mut self.long_location, incoming.long_location);
        merge_string(&mut self.description, incoming.description);
        merge_string(&mut self.short_description, incoming.short_description);
        merge_string(&mut self.date_posted, incoming.date_posted);
        merge_string(&mut self.country, incoming.country);
        merge_string(&mut self.industry, incoming.industry);
        merge_string(&mut self.url, incoming.url);
        merge_string(&mut self.final_url, incoming.final_url);
        merge_string(&mut self.source, incoming.source);
        if incoming.salary_min.is_some() {
            self.salary_min = incoming.salary_min;
        }
        if incoming.salary_max.is_some() {
            self.salary_max = incoming.salary_max;
        }
        if !incoming.tags.is_empty() {
            self.tags = incoming.tags;
        }
        if !incoming.employment_statuses.is_empty() {
            self.employment_statuses = incoming.employment_statuses;
        }
        self.remote = self.remote || incoming.remote;
    }
}

fn merge_string(current: &mut String, incoming: String) {
    if !incoming.trim().is_empty() {
        *current = incoming;
    }
}

fn parse_iso_date(value: &str) -> bool {
    DateTime::parse_from_rfc3339(value).is_ok()
        || chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Stable record id derived from the posting's identity fields. The URL
/// dominates when present so re-ingesting the same posting converges on
/// the same id.
pub fn derive_job_id(url: &str, title: &str, company: &str) -> String {
    let mut hasher = Sha256::new();
    if !url.trim().is_empty() {
        hasher.update(url.trim().to_lowercase().as_bytes());
    } else {
        hasher.update(title.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(company.trim().to_lowercase().as_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    format!("job_{}", &digest[..16])
}
