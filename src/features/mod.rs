pub mod url_features;
pub mod urgency;

pub use url_features::{UrlFeatureExtractor, UrlFeatures, URL_FEATURE_NAMES};
pub use urgency::UrgencyScanner;

/// A fixed-schema numeric view of an input, in the order a model expects it.
pub trait FeatureVector {
    fn feature_names() -> &'static [&'static str];
    fn to_vector(&self) -> Vec<f64>;
}
