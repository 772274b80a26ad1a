use serde::{Deserialize, Serialize};

/// Score increments and thresholds for URL heuristic scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlWeights {
    pub base_score: f64,
    pub whitelist_score: f64,
    pub long_url_length: usize,
    pub long_url: f64,
    pub very_long_url_length: usize,
    pub very_long_url: f64,
    pub ip_address: f64,
    pub missing_https: f64,
    pub max_dots: usize,
    pub many_dots: f64,
    pub max_hyphens: usize,
    pub many_hyphens: f64,
    pub at_symbol: f64,
    pub digit_ratio_threshold: f64,
    pub high_digit_ratio: f64,
    pub shortener: f64,
    pub per_keyword: f64,
}

impl Default for UrlWeights {
    fn default() -> Self {
        Self {
            base_score: 0.05,
            whitelist_score: 0.05,
            long_url_length: 50,
            long_url: 0.10,
            very_long_url_length: 100,
            very_long_url: 0.15,
            ip_address: 0.50,
            missing_https: 0.20,
            max_dots: 3,
            many_dots: 0.15,
            max_hyphens: 2,
            many_hyphens: 0.15,
            at_symbol: 0.40,
            digit_ratio_threshold: 0.25,
            high_digit_ratio: 0.20,
            shortener: 0.25,
            per_keyword: 0.20,
        }
    }
}

impl UrlWeights {
    fn scores(&self) -> [(&'static str, f64); 13] {
        [
            ("base_score", self.base_score),
            ("whitelist_score", self.whitelist_score),
            ("long_url", self.long_url),
            ("very_long_url", self.very_long_url),
            ("ip_address", self.ip_address),
            ("missing_https", self.missing_https),
            ("many_dots", self.many_dots),
            ("many_hyphens", self.many_hyphens),
            ("at_symbol", self.at_symbol),
            ("digit_ratio_threshold", self.digit_ratio_threshold),
            ("high_digit_ratio", self.high_digit_ratio),
            ("shortener", self.shortener),
            ("per_keyword", self.per_keyword),
        ]
    }
}

/// Model probabilities strictly inside `(lower, upper)` are treated as
/// inconclusive and handed over to heuristic scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UncertaintyBand {
    pub lower: f64,
    pub upper: f64,
}

impl Default for UncertaintyBand {
    fn default() -> Self {
        Self {
            lower: 0.3,
            upper: 0.7,
        }
    }
}

impl UncertaintyBand {
    pub fn contains(&self, probability: f64) -> bool {
        self.lower < probability && probability < self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlHeuristics {
    pub safe_domains: Vec<String>,
    pub shorteners: Vec<String>,
    pub suspicious_keywords: Vec<String>,
    pub weights: UrlWeights,
    pub uncertainty_band: UncertaintyBand,
}

impl Default for UrlHeuristics {
    fn default() -> Self {
        Self {
            safe_domains: to_strings(&[
                "google.com",
                "facebook.com",
                "apple.com",
                "microsoft.com",
                "amazon.com",
                "github.com",
            ]),
            shorteners: to_strings(&["bit.ly", "goo.gl", "t.co", "tinyurl"]),
            suspicious_keywords: to_strings(&[
                "login", "verify", "account", "bank", "secure", "update", "signin", "wp-",
                "admin",
            ]),
            weights: UrlWeights::default(),
            uncertainty_band: UncertaintyBand::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmailHeuristics {
    pub urgency_phrases: Vec<String>,
    /// Lowest score a model verdict may carry once any urgency phrase matched.
    pub keyword_floor: f64,
    pub high_match_count: usize,
    pub high_score: f64,
    pub match_score: f64,
    pub clean_score: f64,
}

impl Default for EmailHeuristics {
    fn default() -> Self {
        Self {
            urgency_phrases: to_strings(&[
                "verify",
                "immediately",
                "urgent",
                "action required",
                "account suspended",
                "password",
                "security",
                "login",
                "confirm",
                "unusual activity",
                "frozen",
                "locked",
                "limited",
                "unauthorized",
                "click here",
                "billing",
                "update",
                "invoice",
                "winner",
                "prize",
                "gift card",
                "bonus",
                "free",
                "reward",
            ]),
            keyword_floor: 0.6,
            high_match_count: 3,
            high_score: 0.9,
            match_score: 0.7,
            clean_score: 0.1,
        }
    }
}

impl EmailHeuristics {
    fn scores(&self) -> [(&'static str, f64); 4] {
        [
            ("keyword_floor", self.keyword_floor),
            ("high_score", self.high_score),
            ("match_score", self.match_score),
            ("clean_score", self.clean_score),
        ]
    }
}

pub fn validate_url_heuristics(heuristics: &UrlHeuristics) -> anyhow::Result<()> {
    let band = heuristics.uncertainty_band;
    if !(0.0..=1.0).contains(&band.lower) || !(0.0..=1.0).contains(&band.upper) {
        anyhow::bail!(
            "uncertainty band [{}, {}] must lie within [0, 1]",
            band.lower,
            band.upper
        );
    }
    if band.lower >= band.upper {
        anyhow::bail!(
            "uncertainty band lower bound {} must be below upper bound {}",
            band.lower,
            band.upper
        );
    }
    check_unit_interval("url.weights", &heuristics.weights.scores())
}

pub fn validate_email_heuristics(heuristics: &EmailHeuristics) -> anyhow::Result<()> {
    if heuristics.high_match_count == 0 {
        anyhow::bail!("email.high_match_count must be at least 1");
    }
    check_unit_interval("email", &heuristics.scores())
}

fn check_unit_interval(section: &str, values: &[(&'static str, f64)]) -> anyhow::Result<()> {
    for (name, value) in values {
        if !(0.0..=1.0).contains(value) {
            anyhow::bail!("{section}.{name} = {value} is outside [0, 1]");
        }
    }
    Ok(())
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
