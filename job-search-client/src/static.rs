use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// Abbreviation/alias expansions applied to query location tokens.
    pub static ref LOCATION_ALIASES: HashMap<&'static str, &'static str> = HashMap::from([
        ("ny", "new york"),
        ("nyc", "new york"),
        ("sf", "san francisco"),
        ("la", "los angeles"),
        ("dc", "washington"),
        ("atl", "atlanta"),
        ("philly", "philadelphia"),
        ("vegas", "las vegas"),
        ("uk", "united kingdom"),
        ("usa", "united states"),
        ("us", "united states"),
    ]);

    /// Low-likelihood small-city patterns. Searches scoped to these are
    /// skipped before spending an upstream call unless the role is in
    /// global demand or the search is remote. Product-tuned list; the
    /// entries are a cost policy, not a correctness requirement.
    pub static ref UNLIKELY_CITY_PATTERNS: Vec<&'static str> = vec![
        "township",
        "borough",
        "hamlet",
        "villa rica",
        "pell city",
        "fort payne",
        "sylacauga",
        "talladega",
        "enterprise al",
        "ozark",
        "junction",
        "falls village",
        "mccomb",
        "kosciusko",
    ];

    /// Roles searched everywhere, which override the small-city skip.
    pub static ref HIGH_DEMAND_SKILLS: Vec<&'static str> = vec![
        "software engineer",
        "software developer",
        "developer",
        "data engineer",
        "data scientist",
        "nurse",
        "registered nurse",
        "accountant",
        "teacher",
        "truck driver",
        "driver",
        "sales",
        "customer service",
        "project manager",
    ];

    /// Fallback extraction: "... at <Company> ..." in free text.
    pub static ref COMPANY_PATTERN: Regex =
        Regex::new(r"\bat\s+([A-Z][A-Za-z0-9&.\-' ]{1,40}?)(?:[,.\n]|\s+(?:in|is|are)\b|$)")
            .unwrap();

    /// Fallback extraction: "... in <City[, ST]> ..." in free text.
    pub static ref LOCATION_PATTERN: Regex =
        Regex::new(r"\bin\s+([A-Z][A-Za-z\-' ]{2,30}(?:,\s*[A-Z]{2})?)(?:[,.\n]|$)").unwrap();

    /// Industry keywords for the fallback transform, checked in order.
    pub static ref INDUSTRY_KEYWORDS: Vec<(&'static str, &'static str)> = vec![
        ("software", "Technology"),
        ("engineer", "Technology"),
        ("developer", "Technology"),
        ("nurse", "Healthcare"),
        ("medical", "Healthcare"),
        ("teacher", "Education"),
        ("accountant", "Finance"),
        ("finance", "Finance"),
        ("sales", "Sales"),
        ("driver", "Transportation"),
        ("chef", "Hospitality"),
    ];
}
