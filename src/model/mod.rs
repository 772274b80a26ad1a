pub mod artifacts;
pub mod logistic;
pub mod vectorizer;

pub use artifacts::ArtifactStore;
pub use logistic::{LogisticRegression, TrainingParams};
pub use vectorizer::TfIdfVectorizer;

use anyhow::Result;

/// Anything that can turn a feature vector into a phishing probability.
pub trait ProbabilityModel: Send + Sync {
    fn predict_probability(&self, features: &[f64]) -> Result<f64>;
    fn name(&self) -> &str;
}

/// Whether a detector has a trained model to consult, decided once at construction.
pub enum ModelState<M> {
    Trained(M),
    Absent,
}

impl<M> ModelState<M> {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained(_))
    }

    pub fn as_trained(&self) -> Option<&M> {
        match self {
            ModelState::Trained(model) => Some(model),
            ModelState::Absent => None,
        }
    }
}

impl<M> From<Option<M>> for ModelState<M> {
    fn from(model: Option<M>) -> Self {
        match model {
            Some(model) => ModelState::Trained(model),
            None => ModelState::Absent,
        }
    }
}

/// A text classifier paired with the vectorizer it was trained against.
pub struct TextModel {
    pub vectorizer: TfIdfVectorizer,
    pub classifier: Box<dyn ProbabilityModel>,
}

impl TextModel {
    pub fn new(vectorizer: TfIdfVectorizer, classifier: Box<dyn ProbabilityModel>) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    pub fn predict_probability(&self, text: &str) -> Result<f64> {
        let row = self.vectorizer.transform(text)?;
        self.classifier.predict_probability(&row)
    }
}
