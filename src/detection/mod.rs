pub mod email_detector;
pub mod url_detector;

pub use email_detector::EmailDetector;
pub use url_detector::UrlDetector;

use crate::config::Config;
use crate::model::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetectionKind {
    #[serde(rename = "URL")]
    Url,
    Email,
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionKind::Url => write!(f, "URL"),
            DetectionKind::Email => write!(f, "Email"),
        }
    }
}

impl FromStr for DetectionKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "url" => Ok(DetectionKind::Url),
            "email" => Ok(DetectionKind::Email),
            other => anyhow::bail!("Unknown detection kind: {other}"),
        }
    }
}

/// Where a score came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Whitelist,
    Model,
    Heuristic,
}

/// Final verdict for one input. The verdict is always `score > 0.5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_phishing: bool,
    pub score: f64,
    pub matched_phrases: Vec<String>,
    pub source: ScoreSource,
}

impl ClassificationResult {
    pub fn new(score: f64, source: ScoreSource) -> Self {
        let score = clamp_score(score);
        Self {
            is_phishing: score > 0.5,
            score,
            matched_phrases: Vec::new(),
            source,
        }
    }

    pub fn with_phrases(mut self, phrases: Vec<String>) -> Self {
        self.matched_phrases = phrases;
        self
    }
}

/// The pair of detectors an application builds once and shares by reference.
pub struct Detectors {
    pub url: UrlDetector,
    pub email: EmailDetector,
}

impl Detectors {
    pub fn load(config: &Config) -> Self {
        let store = ArtifactStore::new(config.models_dir.clone());
        let detectors = Self {
            url: UrlDetector::from_artifacts(config.url.clone(), &store),
            email: EmailDetector::from_artifacts(config.email.clone(), &store),
        };
        log::info!(
            "Detectors ready (URL model: {}, email model: {})",
            mode(detectors.url.has_model()),
            mode(detectors.email.has_model())
        );
        detectors
    }

    pub fn classify(&self, kind: DetectionKind, input: &str) -> ClassificationResult {
        match kind {
            DetectionKind::Url => self.url.predict(input),
            DetectionKind::Email => self.email.predict(input),
        }
    }
}

fn mode(trained: bool) -> &'static str {
    if trained {
        "trained"
    } else {
        "heuristic only"
    }
}

/// NaN maps to 0 so a broken score can never flag an input.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
