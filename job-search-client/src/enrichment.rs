use crate::cache::TtlCache;
use crate::generation::TextGenerator;
use crate::job::JobRecord;
use crate::sanitize::parse_json_with_repairs;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// AI-derived fields layered onto a record. All optional so a record can
/// be enriched field-by-field across calls.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentFields {
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub country: Option<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
}

/// A record needs enrichment when salary is missing or any of
/// country/industry/tags is missing.
pub fn needs_enrichment(job: &JobRecord) -> bool {
    job.salary_min.is_none()
        || job.country.trim().is_empty()
        || job.industry.trim().is_empty()
        || job.tags.is_empty()
}

fn build_enrich_prompt(job: &JobRecord) -> String {
    format!(
        "Estimate the missing attributes of this job posting.\n\
         Return ONLY a JSON object with these fields (null/empty when you cannot tell): \
         salaryMin (number), salaryMax (number), country (string), industry (string), \
         tags (array of up to 5 short lowercase strings).\n\
         Title: {}\nCompany: {}\nLocation: {}\nDescription: {}",
        job.title,
        job.company,
        job.long_location,
        job.short_description,
    )
}

/// Applies AI-derived fields to records, behind a long-TTL cache keyed by
/// job id so a job is never re-derived while the cache holds it.
pub struct Enricher {
    generator: Arc<dyn TextGenerator>,
    cache: Arc<TtlCache<EnrichmentFields>>,
    /// Hard cap on generation calls per processing pass, bounding cost per
    /// request.
    max_per_pass: usize,
}

impl Enricher {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        cache: Arc<TtlCache<EnrichmentFields>>,
        max_per_pass: usize,
    ) -> Self {
        Self {
            generator,
            cache,
            max_per_pass,
        }
    }

    /// Enrich the records that need it, newest first as given, spending at
    /// most `max_per_pass` generation calls. Cached payloads are free and
    /// do not count against the cap. Returns how many records changed.
    pub async fn enrich_batch(&self, jobs: &mut [JobRecord]) -> usize {
        let mut enriched = 0;
        let mut calls_spent = 0;

        for job in jobs.iter_mut().filter(|job| needs_enrichment(job)) {
            if let Some(fields) = self.cache.get(&job.id) {
                if apply_fields(job, &fields) {
                    enriched += 1;
                }
                continue;
            }

            if calls_spent >= self.max_per_pass {
                log::debug!("enrichment cap reached for this pass");
                break;
            }
            calls_spent += 1;

            let prompt = build_enrich_prompt(job);
            let fields = match self.generator.generate(&prompt).await {
                Ok(text) => match parse_json_with_repairs::<EnrichmentFields>(&text) {
                    Some(fields) => fields,
                    None => {
                        log::warn!("enrichment output unparseable for job {}", job.id);
                        continue;
                    }
                },
                Err(err) => {
                    log::warn!("enrichment generation failed for job {}: {}", job.id, err);
                    continue;
                }
            };

            self.cache.set(job.id.clone(), fields.clone());
            if apply_fields(job, &fields) {
                enriched += 1;
            }
        }

        enriched
    }
}

/// Field-by-field application: only missing fields are filled, present
/// ones are never overwritten.
fn apply_fields(job: &mut JobRecord, fields: &EnrichmentFields) -> bool {
    let mut changed = false;

    if job.salary_min.is_none() && fields.salary_min.is_some() {
        job.salary_min = fields.salary_min;
        changed = true;
    }
    if job.salary_max.is_none() && fields.salary_max.is_some() {
        job.salary_max = fields.salary_max;
        changed = true;
    }
    if job.country.trim().is_empty() {
        if let Some(country) = fields.country.as_deref().filter(|c| !c.trim().is_empty()) {
            job.country = country.to_string();
            changed = true;
        }
    }
    if job.industry.trim().is_empty() {
        if let Some(industry) = fields.industry.as_deref().filter(|i| !i.trim().is_empty()) {
            job.industry = industry.to_string();
            changed = true;
        }
    }
    if job.tags.is_empty() && !fields.tags.is_empty() {
        job.tags = fields.tags.clone();
        changed = true;
    }

    changed
}
