use super::{ClassificationResult, ScoreSource};
use crate::features::UrgencyScanner;
use crate::heuristic_config::EmailHeuristics;
use crate::model::{ArtifactStore, ModelState, TextModel};

pub struct EmailDetector {
    config: EmailHeuristics,
    scanner: UrgencyScanner,
    model: ModelState<TextModel>,
}

impl EmailDetector {
    pub fn new(config: EmailHeuristics, model: ModelState<TextModel>) -> Self {
        Self {
            scanner: UrgencyScanner::from_config(&config),
            config,
            model,
        }
    }

    pub fn heuristic_only(config: EmailHeuristics) -> Self {
        Self::new(config, ModelState::Absent)
    }

    pub fn from_artifacts(config: EmailHeuristics, store: &ArtifactStore) -> Self {
        Self::new(config, store.load_email_model().into())
    }

    pub fn has_model(&self) -> bool {
        self.model.is_trained()
    }

    pub fn predict(&self, content: &str) -> ClassificationResult {
        let matches = self.scanner.scan(content);

        if let Some(model) = self.model.as_trained() {
            match model.predict_probability(content) {
                Ok(probability) if !probability.is_finite() => {
                    log::warn!(
                        "Email model returned non-finite probability {}, using keyword heuristics",
                        probability
                    );
                }
                Ok(probability) => {
                    let score = if matches.is_empty() {
                        probability
                    } else {
                        probability.max(self.config.keyword_floor)
                    };
                    return ClassificationResult::new(score, ScoreSource::Model)
                        .with_phrases(matches);
                }
                Err(e) => {
                    log::warn!("Email model failed, using keyword heuristics: {}", e);
                }
            }
        }

        let score = self.heuristic_score(matches.len());
        log::debug!(
            "Email heuristic: {} urgency phrase(s) -> {:.2}",
            matches.len(),
            score
        );
        ClassificationResult::new(score, ScoreSource::Heuristic).with_phrases(matches)
    }

    pub fn heuristic_score(&self, match_count: usize) -> f64 {
        if match_count >= self.config.high_match_count {
            self.config.high_score
        } else if match_count >= 1 {
            self.config.match_score
        } else {
            self.config.clean_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProbabilityModel, TfIdfVectorizer};
    use anyhow::bail;

    struct FixedModel(f64);

    impl ProbabilityModel for FixedModel {
        fn predict_probability(&self, _features: &[f64]) -> anyhow::Result<f64> {
            Ok(self.0)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct FailingModel;

    impl ProbabilityModel for FailingModel {
        fn predict_probability(&self, _features: &[f64]) -> anyhow::Result<f64> {
            bail!("inference exploded")
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn with_model(classifier: Box<dyn ProbabilityModel>) -> EmailDetector {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer
            .fit(&["verify account".to_string(), "lunch today".to_string()])
            .unwrap();
        EmailDetector::new(
            EmailHeuristics::default(),
            ModelState::Trained(TextModel::new(vectorizer, classifier)),
        )
    }

    fn heuristic() -> EmailDetector {
        EmailDetector::heuristic_only(EmailHeuristics::default())
    }

    #[test]
    fn test_three_or_more_phrases_without_model() {
        let result = heuristic().predict("URGENT: verify your password immediately");
        assert_eq!(result.score, 0.9);
        assert!(result.is_phishing);
        assert_eq!(
            result.matched_phrases,
            vec!["verify", "immediately", "urgent", "password"]
        );
    }

    #[test]
    fn test_one_or_two_phrases_without_model() {
        let detector = heuristic();
        assert_eq!(detector.predict("Your invoice is attached").score, 0.7);
        assert_eq!(
            detector.predict("Your invoice is attached, please confirm").score,
            0.7
        );
    }

    #[test]
    fn test_no_phrases_without_model() {
        let result = heuristic().predict("Hey, are we still meeting for lunch?");
        assert_eq!(result.score, 0.1);
        assert!(!result.is_phishing);
        assert!(result.matched_phrases.is_empty());
        assert_eq!(result.source, ScoreSource::Heuristic);
    }

    #[test]
    fn test_keyword_floor_lifts_model_score() {
        let detector = with_model(Box::new(FixedModel(0.2)));
        let result = detector.predict("Please confirm the meeting");
        assert_eq!(result.score, 0.6);
        assert!(result.is_phishing);
        assert_eq!(result.source, ScoreSource::Model);
        assert_eq!(result.matched_phrases, vec!["confirm"]);
    }

    #[test]
    fn test_keyword_floor_never_lowers_model_score() {
        let detector = with_model(Box::new(FixedModel(0.95)));
        let result = detector.predict("verify now");
        assert_eq!(result.score, 0.95);
    }

    #[test]
    fn test_model_score_without_phrases_is_kept() {
        let detector = with_model(Box::new(FixedModel(0.2)));
        let result = detector.predict("lunch today?");
        assert_eq!(result.score, 0.2);
        assert!(!result.is_phishing);
    }

    #[test]
    fn test_failing_model_falls_back_to_keywords() {
        let detector = with_model(Box::new(FailingModel));
        let result = detector.predict("You are a winner! Claim your prize and bonus");
        assert_eq!(result.score, 0.9);
        assert_eq!(result.source, ScoreSource::Heuristic);
    }

    #[test]
    fn test_non_finite_model_output_falls_back_to_keywords() {
        let detector = with_model(Box::new(FixedModel(f64::NAN)));
        let result = detector.predict("Please confirm the meeting");
        assert_eq!(result.score, 0.7);
        assert_eq!(result.source, ScoreSource::Heuristic);
        assert_eq!(result.matched_phrases, vec!["confirm"]);

        let result = detector.predict("lunch today?");
        assert_eq!(result.score, 0.1);
        assert_eq!(result.source, ScoreSource::Heuristic);
    }

    #[test]
    fn test_dimension_mismatch_falls_back_to_keywords() {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer
            .fit(&["verify account".to_string(), "lunch today".to_string()])
            .unwrap();
        let classifier = crate::model::LogisticRegression {
            feature_names: vec!["only".to_string()],
            weights: vec![1.0],
            bias: 0.0,
            means: vec![0.0],
            scales: vec![1.0],
        };
        let detector = EmailDetector::new(
            EmailHeuristics::default(),
            ModelState::Trained(TextModel::new(vectorizer, Box::new(classifier))),
        );
        assert_eq!(detector.predict("click here").score, 0.7);
    }

    #[test]
    fn test_predict_is_idempotent() {
        let detector = heuristic();
        let text = "Unusual activity detected. Your account is locked.";
        assert_eq!(detector.predict(text), detector.predict(text));
        assert!(!detector.has_model());
    }
}
