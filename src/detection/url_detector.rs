use super::{ClassificationResult, ScoreSource};
use crate::domain_utils::DomainUtils;
use crate::features::{FeatureVector, UrlFeatureExtractor, UrlFeatures};
use crate::heuristic_config::UrlHeuristics;
use crate::model::{ArtifactStore, ModelState, ProbabilityModel};

pub struct UrlDetector {
    config: UrlHeuristics,
    safe_domains: Vec<String>,
    extractor: UrlFeatureExtractor,
    model: ModelState<Box<dyn ProbabilityModel>>,
}

impl UrlDetector {
    pub fn new(config: UrlHeuristics, model: ModelState<Box<dyn ProbabilityModel>>) -> Self {
        Self {
            safe_domains: config.safe_domains.iter().map(|d| d.to_lowercase()).collect(),
            extractor: UrlFeatureExtractor::from_config(&config),
            config,
            model,
        }
    }

    pub fn heuristic_only(config: UrlHeuristics) -> Self {
        Self::new(config, ModelState::Absent)
    }

    pub fn from_artifacts(config: UrlHeuristics, store: &ArtifactStore) -> Self {
        let model = store
            .load_url_model()
            .map(|m| Box::new(m) as Box<dyn ProbabilityModel>);
        Self::new(config, model.into())
    }

    pub fn has_model(&self) -> bool {
        self.model.is_trained()
    }

    pub fn extract_features(&self, url: &str) -> UrlFeatures {
        self.extractor.extract(url)
    }

    pub fn predict(&self, url: &str) -> ClassificationResult {
        let features = self.extract_features(url);
        log::debug!("URL features for {}: {:?}", url, features);

        if features.has_https && self.is_safe_domain(url) {
            return ClassificationResult::new(
                self.config.weights.whitelist_score,
                ScoreSource::Whitelist,
            );
        }

        if let Some(model) = self.model.as_trained() {
            match model.predict_probability(&features.to_vector()) {
                Ok(probability) if !probability.is_finite() => {
                    log::warn!(
                        "URL model {} returned non-finite probability {}, using heuristics",
                        model.name(),
                        probability
                    );
                }
                Ok(probability) if self.config.uncertainty_band.contains(probability) => {
                    log::debug!(
                        "Model probability {:.3} is inconclusive, using heuristics",
                        probability
                    );
                }
                Ok(probability) => return ClassificationResult::new(probability, ScoreSource::Model),
                Err(e) => {
                    log::warn!("URL model {} failed, using heuristics: {}", model.name(), e);
                }
            }
        }

        ClassificationResult::new(self.heuristic_score(&features), ScoreSource::Heuristic)
    }

    /// Additive rule score, capped at 1.0.
    pub fn heuristic_score(&self, features: &UrlFeatures) -> f64 {
        let w = &self.config.weights;
        let mut score = w.base_score;

        if features.url_length > w.long_url_length {
            score += w.long_url;
        }
        if features.url_length > w.very_long_url_length {
            score += w.very_long_url;
        }
        if features.has_ip {
            score += w.ip_address;
        }
        if !features.has_https {
            score += w.missing_https;
        }
        if features.dot_count > w.max_dots {
            score += w.many_dots;
        }
        if features.hyphen_count > w.max_hyphens {
            score += w.many_hyphens;
        }
        if features.at_count > 0 {
            score += w.at_symbol;
        }
        if features.digit_ratio > w.digit_ratio_threshold {
            score += w.high_digit_ratio;
        }
        if features.is_shortened {
            score += w.shortener;
        }
        score += w.per_keyword * features.keyword_count as f64;

        score.min(1.0)
    }

    fn is_safe_domain(&self, url: &str) -> bool {
        DomainUtils::contains_any(&url.to_lowercase(), &self.safe_domains)
    }
}
