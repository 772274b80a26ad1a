use crate::features::{FeatureVector, UrlFeatures, URL_FEATURE_NAMES};
use crate::model::{ArtifactStore, LogisticRegression, TfIdfVectorizer, TrainingParams};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const URL_DATASET_FILE: &str = "urls.jsonl";
pub const EMAIL_DATASET_FILE: &str = "emails.jsonl";

const SYNTHETIC_URL_SAMPLES: usize = 2000;
const DEMO_CORPUS_REPEAT: usize = 100;
const EMAIL_MAX_FEATURES: usize = 2000;

static DEMO_EMAILS: [(&str, bool); 15] = [
    ("Urgent: Verify your account now!", true),
    ("Your package is ready for pickup.", false),
    ("Security alert: suspicious login detected.", true),
    ("Meeting at 3pm today.", false),
    ("Action Required: Account suspended immediately.", true),
    ("Invoice from Apple Store - Please pay.", true),
    ("Your order #12345 has been shipped.", false),
    ("Claim your $1000 prize now!", true),
    ("Weekly newsletter: Top stories this week.", false),
    ("Warning: Unauthorised access to your bank account.", true),
    ("Hey, are we still meeting for lunch?", false),
    ("Can you send me the report by Friday?", false),
    ("Just checking in on the project status.", false),
    ("Happy birthday! Hope you have a great day.", false),
    ("The weather is nice today.", false),
];

/// One labelled row of `urls.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlSample {
    #[serde(flatten)]
    pub features: UrlFeatures,
    pub label: bool,
}

/// One labelled row of `emails.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSample {
    pub text: String,
    pub label: bool,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub url_samples: usize,
    pub url_accuracy: f64,
    pub url_model_path: PathBuf,
    pub email_samples: usize,
    pub email_accuracy: f64,
    pub email_vocabulary: usize,
    pub email_model_path: PathBuf,
    pub email_vectorizer_path: PathBuf,
}

pub fn train_models(store: &ArtifactStore, data_dir: &Path, seed: u64) -> Result<TrainingSummary> {
    log::info!(
        "Training models with data dir {} into {}",
        data_dir.display(),
        store.dir().display()
    );
    let mut rng = StdRng::seed_from_u64(seed);

    let url_samples = match load_dataset::<UrlSample>(&data_dir.join(URL_DATASET_FILE))? {
        Some(samples) => samples,
        None => {
            log::info!("URL dataset not found, generating synthetic training data");
            synthetic_url_samples(&mut rng, SYNTHETIC_URL_SAMPLES)
        }
    };
    let (url_model, url_accuracy) = train_url_model(&url_samples)?;
    let url_model_path = store.save_url_model(&url_model)?;
    log::info!(
        "URL model trained on {} samples (training accuracy {:.3})",
        url_samples.len(),
        url_accuracy
    );

    let email_samples = match load_dataset::<EmailSample>(&data_dir.join(EMAIL_DATASET_FILE))? {
        Some(samples) => samples,
        None => {
            log::info!("Email dataset not found, using the demo corpus");
            demo_email_samples()
        }
    };
    let (email_model, vectorizer, email_accuracy) = train_email_model(&email_samples)?;
    let (email_model_path, email_vectorizer_path) =
        store.save_email_model(&email_model, &vectorizer)?;
    log::info!(
        "Email model trained on {} samples, {} terms (training accuracy {:.3})",
        email_samples.len(),
        vectorizer.vocabulary_size(),
        email_accuracy
    );

    Ok(TrainingSummary {
        url_samples: url_samples.len(),
        url_accuracy,
        url_model_path,
        email_samples: email_samples.len(),
        email_accuracy,
        email_vocabulary: vectorizer.vocabulary_size(),
        email_model_path,
        email_vectorizer_path,
    })
}

pub fn train_url_model(samples: &[UrlSample]) -> Result<(LogisticRegression, f64)> {
    let rows: Vec<Vec<f64>> = samples.iter().map(|s| s.features.to_vector()).collect();
    let labels: Vec<bool> = samples.iter().map(|s| s.label).collect();
    let names = URL_FEATURE_NAMES.iter().map(|s| s.to_string()).collect();

    let model = LogisticRegression::fit(names, &rows, &labels, TrainingParams::default())?;
    let accuracy = model.accuracy(&rows, &labels)?;
    Ok((model, accuracy))
}

pub fn train_email_model(
    samples: &[EmailSample],
) -> Result<(LogisticRegression, TfIdfVectorizer, f64)> {
    let texts: Vec<String> = samples.iter().map(|s| s.text.clone()).collect();
    let labels: Vec<bool> = samples.iter().map(|s| s.label).collect();

    let mut vectorizer = TfIdfVectorizer::new(EMAIL_MAX_FEATURES, true);
    vectorizer.fit(&texts)?;
    let rows = texts
        .iter()
        .map(|t| vectorizer.transform(t))
        .collect::<Result<Vec<_>>>()?;

    let model = LogisticRegression::fit(
        vectorizer.feature_names(),
        &rows,
        &labels,
        TrainingParams::default(),
    )?;
    let accuracy = model.accuracy(&rows, &labels)?;
    Ok((model, vectorizer, accuracy))
}

/// Random feature rows with label rules layered on top so the model has something to learn.
pub fn synthetic_url_samples(rng: &mut impl Rng, count: usize) -> Vec<UrlSample> {
    (0..count)
        .map(|_| {
            let features = UrlFeatures {
                url_length: rng.gen_range(10..200),
                has_ip: rng.gen_bool(0.1),
                has_https: rng.gen_bool(0.7),
                dot_count: rng.gen_range(1..5),
                hyphen_count: rng.gen_range(0..4),
                at_count: usize::from(rng.gen_bool(0.05)),
                slash_count: rng.gen_range(1..6),
                digit_ratio: rng.gen_range(0.0..0.4),
                is_shortened: rng.gen_bool(0.1),
                keyword_count: rng.gen_range(0..3),
            };
            let mut label = rng.gen_bool(0.5);

            if features.has_ip
                || features.at_count == 1
                || features.keyword_count > 0
                || features.url_length > 150
                || (!features.has_https && features.dot_count > 3)
            {
                label = true;
            }
            if features.has_https && features.url_length < 50 && features.keyword_count == 0 {
                label = false;
            }
            UrlSample { features, label }
        })
        .collect()
}

pub fn demo_email_samples() -> Vec<EmailSample> {
    (0..DEMO_CORPUS_REPEAT)
        .flat_map(|_| DEMO_EMAILS.iter())
        .map(|(text, label)| EmailSample {
            text: text.to_string(),
            label: *label,
        })
        .collect()
}

/// `Ok(None)` when the file does not exist; malformed rows are an error.
fn load_dataset<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    log::info!("Loading dataset from {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    let mut rows = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid row", path.display(), number + 1))?;
        rows.push(row);
    }
    if rows.is_empty() {
        anyhow::bail!("Dataset {} contains no rows", path.display());
    }
    Ok(Some(rows))
}
