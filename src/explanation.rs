use crate::detection::DetectionKind;
use crate::domain_utils::DomainUtils;
use crate::features::UrlFeatureExtractor;
use serde::{Deserialize, Serialize};

const EXPLAINED_EMAIL_KEYWORDS: [&str; 4] =
    ["verify", "immediately", "urgent", "account suspended"];

const PHISHING_RECOMMENDATIONS: [&str; 4] = [
    "Do not click on any links or download attachments.",
    "Report this to your IT security department.",
    "Delete the email or close the browser tab immediately.",
    "If you entered credentials, change your password immediately.",
];

const SAFE_RECOMMENDATIONS: [&str; 3] = [
    "This appears to be safe, but always remain cautious.",
    "Verify the sender's identity through another channel if unsure.",
    "Check for subtle typos in the domain name.",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub key_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Builds the human-readable account of a verdict from the raw input.
pub struct Explainer {
    url_features: UrlFeatureExtractor,
}

impl Default for Explainer {
    fn default() -> Self {
        Self::new(UrlFeatureExtractor::default())
    }
}

impl Explainer {
    pub fn new(url_features: UrlFeatureExtractor) -> Self {
        Self { url_features }
    }

    pub fn explain(
        &self,
        kind: DetectionKind,
        input: &str,
        is_phishing: bool,
        score: f64,
    ) -> Explanation {
        let summary = format!(
            "The {} was classified as {} with {:.1}% confidence.",
            kind,
            if is_phishing { "PHISHING" } else { "LEGITIMATE" },
            score * 100.0
        );

        let key_factors = match kind {
            DetectionKind::Url => self.url_factors(input),
            DetectionKind::Email => email_factors(input),
        };

        let recommendations: &[&str] = if is_phishing {
            &PHISHING_RECOMMENDATIONS
        } else {
            &SAFE_RECOMMENDATIONS
        };

        Explanation {
            summary,
            key_factors,
            recommendations: recommendations.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn url_factors(&self, url: &str) -> Vec<String> {
        let features = self.url_features.extract(url);
        let mut factors = Vec::new();

        if features.url_length > 50 {
            factors.push("Unusually long URL length.".to_string());
        }
        if features.at_count > 0 {
            factors.push("Presence of '@' symbol used for obfuscation.".to_string());
        }
        if !url.contains("https") {
            factors.push("Lack of HTTPS encryption.".to_string());
        }
        if features.has_ip {
            match DomainUtils::extract_host(url) {
                Some(host) => factors.push(format!("Raw IP address used as host: {host}.")),
                None => factors.push("Raw IP address embedded in the URL.".to_string()),
            }
        }
        if features.is_shortened {
            factors.push("Link shortener hides the real destination.".to_string());
        }
        let url_lower = url.to_lowercase();
        let keywords = self.url_features.matched_keywords(&url_lower);
        if !keywords.is_empty() {
            factors.push(format!("Suspicious keywords: {}.", keywords.join(", ")));
        }
        if factors.is_empty() {
            if let Some(host) = DomainUtils::extract_host(url) {
                factors.push(format!(
                    "No risky patterns found for {}.",
                    DomainUtils::canonicalize_domain(&host)
                ));
            }
        }
        factors
    }
}

fn email_factors(content: &str) -> Vec<String> {
    let content_lower = content.to_lowercase();
    EXPLAINED_EMAIL_KEYWORDS
        .iter()
        .filter(|word| content_lower.contains(*word))
        .map(|word| format!("Urgency keyword detected: '{word}'"))
        .collect()
}
