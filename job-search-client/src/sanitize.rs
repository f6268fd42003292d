use crate::client::RawJob;
use crate::generation::TextGenerator;
use crate::job::{derive_job_id, JobRecord};
use crate::r#static::{COMPANY_PATTERN, INDUSTRY_KEYWORDS, LOCATION_PATTERN};
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

const SHORT_DESCRIPTION_LEN: usize = 160;

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?").unwrap();
    static ref LINE_COMMENT: Regex = Regex::new(r"(?m)^\s*//[^\n]*$").unwrap();
    static ref BLOCK_COMMENT: Regex = Regex::new(r"/\*[\s\S]*?\*/").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",\s*([}\]])").unwrap();
}

/// One pure text→text repair step.
pub type RepairPass = fn(&str) -> String;

/// Ordered repair ladder, cheapest first. Each pass is applied on top of
/// the previous ones, and parsing is retried after every step.
pub const REPAIR_PASSES: &[(&str, RepairPass)] = &[
    ("strip_code_fences", strip_code_fences),
    ("strip_comments", strip_comments),
    ("strip_control_chars", strip_control_chars),
    ("collapse_whitespace", collapse_whitespace),
    ("remove_trailing_commas", remove_trailing_commas),
    ("extract_outermost_object", extract_outermost_object),
];

pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

pub fn strip_comments(text: &str) -> String {
    let text = BLOCK_COMMENT.replace_all(text, "");
    LINE_COMMENT.replace_all(&text, "").into_owned()
}

pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Slice out the outermost `{...}` span, dropping any prose around it.
pub fn extract_outermost_object(text: &str) -> String {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
        _ => text.to_string(),
    }
}

/// Parse mostly-JSON generation output, repairing progressively until it
/// parses as `T` or the ladder is exhausted.
pub fn parse_json_with_repairs<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str::<T>(text) {
        return Some(value);
    }

    let mut repaired = text.to_string();
    for (name, pass) in REPAIR_PASSES {
        repaired = pass(&repaired);
        match serde_json::from_str::<T>(&repaired) {
            Ok(value) => {
                log::debug!("generation output parsed after repair pass `{}`", name);
                return Some(value);
            }
            Err(_) => continue,
        }
    }

    None
}

pub fn parse_with_repairs(text: &str) -> Option<JobRecord> {
    parse_json_with_repairs(text)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Deterministic manual transform used when generation output is beyond
/// repair. Fills known-shaped defaults, so by construction it always
/// passes validation.
pub fn fallback_record(raw: &RawJob) -> JobRecord {
    let description = raw.description.trim().to_string();

    let company = if !raw.company.trim().is_empty() {
        raw.company.trim().to_string()
    } else {
        COMPANY_PATTERN
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "Unknown Company".to_string())
    };

    let location = if !raw.location.trim().is_empty() {
        raw.location.trim().to_string()
    } else if raw.remote {
        "Remote".to_string()
    } else {
        LOCATION_PATTERN
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| "Unknown Location".to_string())
    };

    let haystack = format!("{} {}", raw.title, description).to_lowercase();
    let industry = INDUSTRY_KEYWORDS
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, industry)| (*industry).to_string())
        .unwrap_or_else(|| "Unknown Industry".to_string());

    let date_posted = if raw.date_posted.trim().is_empty() {
        Utc::now().format("%Y-%m-%d").to_string()
    } else {
        raw.date_posted.trim().to_string()
    };

    let title = if raw.title.trim().is_empty() {
        "Unknown Title".to_string()
    } else {
        raw.title.trim().to_string()
    };

    let mut record = JobRecord {
        id: derive_job_id(&raw.url, &title, &company),
        title,
        company,
        long_location: if raw.long_location.trim().is_empty() {
            location.clone()
        } else {
            raw.long_location.trim().to_string()
        },
        location,
        short_description: truncate_chars(&description, SHORT_DESCRIPTION_LEN),
        description,
        date_posted,
        salary_min: raw.salary_min,
        salary_max: raw.salary_max,
        country: raw.country.trim().to_string(),
        industry,
        tags: vec![],
        employment_statuses: raw.employment_statuses.clone(),
        url: raw.url.trim().to_string(),
        final_url: if raw.final_url.trim().is_empty() {
            raw.url.trim().to_string()
        } else {
            raw.final_url.trim().to_string()
        },
        remote: raw.remote,
        source: raw.source.trim().to_string(),
    };

    // Date strings the provider ships can still be junk; default rather
    // than fail.
    if !record.is_valid() {
        record.date_posted = Utc::now().format("%Y-%m-%d").to_string();
    }
    record
}

/// Prompt carrying strict output-schema instructions for one raw posting.
pub fn build_sanitize_prompt(raw: &RawJob) -> String {
    let raw_json = serde_json::to_string(raw).unwrap_or_default();
    format!(
        "Normalize this job posting into clean JSON.\n\
         Return ONLY a JSON object, no markdown, no commentary, with exactly these fields:\n\
         id (string), title (string), company (string), location (string), \
         longLocation (string), description (string), shortDescription (string, max 160 chars), \
         datePosted (ISO-8601 string), salaryMin (number or null), salaryMax (number or null), \
         country (string), industry (string), tags (array of strings), \
         employmentStatuses (array of strings), url (string), finalUrl (string), \
         remote (boolean), source (string).\n\
         Unknown values become empty strings, nulls, or empty arrays. Never invent salaries.\n\
         Raw posting:\n{}",
        raw_json
    )
}

/// AI-assisted sanitization with the deterministic fallback behind it.
/// Never errors past this boundary: a generation failure, unparseable
/// output, or validation failure all land on the fallback transform.
pub struct Sanitizer {
    generator: Arc<dyn TextGenerator>,
}

impl Sanitizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn sanitize(&self, raw: &RawJob) -> JobRecord {
        let prompt = build_sanitize_prompt(raw);
        let generated = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                log::warn!("generation failed, using fallback transform: {}", err);
                return fallback_record(raw);
            }
        };

        match parse_with_repairs(&generated) {
            Some(mut record) => {
                self.backfill_identity(&mut record, raw);
                if record.is_valid() {
                    record
                } else {
                    log::warn!(
                        "sanitized record failed validation for `{}`, using fallback",
                        raw.title
                    );
                    fallback_record(raw)
                }
            }
            None => {
                log::warn!(
                    "generation output unparseable after all repairs for `{}`, using fallback",
                    raw.title
                );
                fallback_record(raw)
            }
        }
    }

    /// Generation output routinely drops identity fields it was not asked
    /// to invent; restore them from the raw posting.
    fn backfill_identity(&self, record: &mut JobRecord, raw: &RawJob) {
        if record.url.trim().is_empty() {
            record.url = raw.url.trim().to_string();
        }
        if record.final_url.trim().is_empty() {
            record.final_url = record.url.clone();
        }
        if record.id.trim().is_empty() {
            record.id = derive_job_id(&record.url, &record.title, &record.company);
        }
        if record.source.trim().is_empty() {
            record.source = raw.source.trim().to_string();
        }
        if record.date_posted.trim().is_empty() {
            record.date_posted = if raw.date_posted.trim().is_empty() {
                Utc::now().format("%Y-%m-%d").to_string()
            } else {
                raw.date_posted.trim().to_string()
            };
        }
    }
}
