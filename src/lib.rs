pub mod config;
pub mod detection;
pub mod domain_utils;
pub mod explanation;
pub mod features;
pub mod heuristic_config;
pub mod model;
pub mod report;
pub mod statistics;
pub mod training;

pub use config::Config;
pub use detection::{ClassificationResult, DetectionKind, Detectors, EmailDetector, UrlDetector};
pub use explanation::{Explainer, Explanation};
pub use report::{AnalysisReport, ReportFormat};
pub use statistics::{DetectionLog, DetectionSink, GlobalStats};
