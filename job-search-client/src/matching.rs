use crate::client::RawJob;
use crate::r#static::{HIGH_DEMAND_SKILLS, LOCATION_ALIASES, UNLIKELY_CITY_PATTERNS};
use crate::search_options::SearchQuery;

/// Narrow seam for the location heuristic so it can be swapped for a
/// gazetteer or smarter matcher without touching the pipeline.
pub trait LocationMatcher: Send + Sync {
    fn matches(&self, candidate: &RawJob, query_tokens: &[String]) -> bool;
}

/// Case-insensitive substring containment: a candidate matches if any
/// query token (or its alias expansion) appears in any location-bearing
/// field.
#[derive(Default)]
pub struct SubstringMatcher;

impl SubstringMatcher {
    pub fn new() -> Self {
        Self
    }

    fn token_expansions(token: &str) -> Vec<String> {
        let token = token.to_lowercase();
        let mut expansions = vec![token.clone()];
        if let Some(alias) = LOCATION_ALIASES.get(token.as_str()) {
            expansions.push((*alias).to_string());
        }
        expansions
    }
}

impl LocationMatcher for SubstringMatcher {
    fn matches(&self, candidate: &RawJob, query_tokens: &[String]) -> bool {
        if query_tokens.is_empty() {
            return true;
        }

        let fields: Vec<String> = candidate
            .location_fields()
            .iter()
            .filter(|f| !f.trim().is_empty())
            .map(|f| f.to_lowercase())
            .collect();

        for token in query_tokens {
            let expansions = Self::token_expansions(token);

            // "remote" matches the remote flag, not just text fields.
            if candidate.remote && expansions.iter().any(|e| e == "remote") {
                return true;
            }

            for expansion in &expansions {
                if fields.iter().any(|field| field.contains(expansion)) {
                    return true;
                }
            }
        }

        false
    }
}

/// Cost-saving skip: a location matching the low-likelihood small-city
/// patterns is not worth an upstream call, unless the search is remote or
/// the role is in global demand.
pub fn should_skip_location(query: &SearchQuery) -> bool {
    if query.is_remote_search() {
        return false;
    }

    let location = query.location().to_lowercase();
    if location.trim().is_empty() {
        return false;
    }

    let unlikely = UNLIKELY_CITY_PATTERNS
        .iter()
        .any(|pattern| location.contains(pattern));
    if !unlikely {
        return false;
    }

    let what = query.what().to_lowercase();
    let high_demand = HIGH_DEMAND_SKILLS
        .iter()
        .any(|skill| what.contains(skill));

    !high_demand
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(location: &str, city: &str, state: &str) -> RawJob {
        RawJob {
            title: "Engineer".to_string(),
            location: location.to_string(),
            city: city.to_string(),
            state: state.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_any_token_any_field() {
        let matcher = SubstringMatcher::new();
        let raw = candidate("Brooklyn, New York", "Brooklyn", "New York");
        assert!(matcher.matches(&raw, &["york".to_string()]));
        assert!(matcher.matches(&raw, &["brooklyn".to_string(), "zzz".to_string()]));
        assert!(!matcher.matches(&raw, &["chicago".to_string()]));
    }

    #[test]
    fn test_alias_expansion() {
        let matcher = SubstringMatcher::new();
        let raw = candidate("New York City", "New York", "NY");
        assert!(matcher.matches(&raw, &["ny".to_string()]));

        let sf = candidate("San Francisco Bay Area", "San Francisco", "CA");
        assert!(matcher.matches(&sf, &["sf".to_string()]));
    }

    #[test]
    fn test_remote_flag_matches_remote_token() {
        let matcher = SubstringMatcher::new();
        let mut raw = candidate("", "", "");
        raw.remote = true;
        assert!(matcher.matches(&raw, &["remote".to_string()]));
    }

    #[test]
    fn test_empty_tokens_match_everything() {
        let matcher = SubstringMatcher::new();
        assert!(matcher.matches(&candidate("Anywhere", "", ""), &[]));
    }

    #[test]
    fn test_skip_unlikely_small_city() {
        let query = SearchQuery::new("florist", "Pell City, Alabama");
        assert!(should_skip_location(&query));
    }

    #[test]
    fn test_high_demand_skill_overrides_skip() {
        let query = SearchQuery::new("Registered Nurse", "Pell City, Alabama");
        assert!(!should_skip_location(&query));
    }

    #[test]
    fn test_remote_search_never_skipped() {
        let query = SearchQuery::new("florist", "Remote");
        assert!(!should_skip_location(&query));
    }

    #[test]
    fn test_major_city_not_skipped() {
        let query = SearchQuery::new("florist", "Chicago, IL");
        assert!(!should_skip_location(&query));
    }
}
