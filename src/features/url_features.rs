use super::FeatureVector;
use crate::domain_utils::DomainUtils;
use crate::heuristic_config::UrlHeuristics;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const URL_FEATURE_NAMES: [&str; 10] = [
    "url_length",
    "has_ip",
    "has_https",
    "dot_count",
    "hyphen_count",
    "at_count",
    "slash_count",
    "digit_ratio",
    "is_shortened",
    "keyword_count",
];

/// Lexical signals computed from a raw URL string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlFeatures {
    pub url_length: usize,
    pub has_ip: bool,
    pub has_https: bool,
    pub dot_count: usize,
    pub hyphen_count: usize,
    pub at_count: usize,
    pub slash_count: usize,
    pub digit_ratio: f64,
    pub is_shortened: bool,
    pub keyword_count: usize,
}

impl FeatureVector for UrlFeatures {
    fn feature_names() -> &'static [&'static str] {
        &URL_FEATURE_NAMES
    }

    fn to_vector(&self) -> Vec<f64> {
        vec![
            self.url_length as f64,
            flag(self.has_ip),
            flag(self.has_https),
            self.dot_count as f64,
            self.hyphen_count as f64,
            self.at_count as f64,
            self.slash_count as f64,
            self.digit_ratio,
            flag(self.is_shortened),
            self.keyword_count as f64,
        ]
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

pub struct UrlFeatureExtractor {
    ip_regex: Regex,
    shorteners: Vec<String>,
    suspicious_keywords: Vec<String>,
}

impl Default for UrlFeatureExtractor {
    fn default() -> Self {
        Self::from_config(&UrlHeuristics::default())
    }
}

impl UrlFeatureExtractor {
    pub fn from_config(config: &UrlHeuristics) -> Self {
        Self {
            ip_regex: Regex::new(r"[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+").unwrap(),
            shorteners: lowercase_all(&config.shorteners),
            suspicious_keywords: lowercase_all(&config.suspicious_keywords),
        }
    }

    pub fn extract(&self, url: &str) -> UrlFeatures {
        let url_lower = url.to_lowercase();
        let url_length = url.chars().count();
        let digits = url.chars().filter(|c| c.is_ascii_digit()).count();

        let digit_ratio = if url_length > 0 {
            digits as f64 / url_length as f64
        } else {
            0.0
        };

        UrlFeatures {
            url_length,
            has_ip: self.ip_regex.is_match(url),
            has_https: url.starts_with("https"),
            dot_count: url.matches('.').count(),
            hyphen_count: url.matches('-').count(),
            at_count: url.matches('@').count(),
            slash_count: url.matches('/').count(),
            digit_ratio,
            is_shortened: DomainUtils::contains_any(&url_lower, &self.shorteners),
            keyword_count: self.matched_keywords(&url_lower).len(),
        }
    }

    /// Suspicious keywords found in an already lower-cased URL.
    pub fn matched_keywords<'a>(&'a self, url_lower: &str) -> Vec<&'a str> {
        DomainUtils::matching_patterns(url_lower, &self.suspicious_keywords)
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}
