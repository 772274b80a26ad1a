use super::{LogisticRegression, TextModel, TfIdfVectorizer};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const URL_MODEL_FILE: &str = "url_model.json";
pub const EMAIL_MODEL_FILE: &str = "email_model.json";
pub const EMAIL_VECTORIZER_FILE: &str = "email_vectorizer.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Artifact<T> {
    kind: String,
    format_version: u32,
    trained_at: DateTime<Utc>,
    payload: T,
}

/// Reads and writes trained models in a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// A missing or unreadable URL model yields `None`; the detector then runs heuristics only.
    pub fn load_url_model(&self) -> Option<LogisticRegression> {
        self.load_optional(URL_MODEL_FILE, "url_model")
    }

    /// Loads the email model only when both it and its vectorizer are usable.
    pub fn load_email_model(&self) -> Option<TextModel> {
        let classifier: LogisticRegression = self.load_optional(EMAIL_MODEL_FILE, "email_model")?;
        let vectorizer: TfIdfVectorizer =
            self.load_optional(EMAIL_VECTORIZER_FILE, "email_vectorizer")?;

        if classifier.dimensions() != vectorizer.vocabulary_size() {
            log::warn!(
                "Email model expects {} features but vectorizer has {} terms, ignoring both",
                classifier.dimensions(),
                vectorizer.vocabulary_size()
            );
            return None;
        }
        Some(TextModel::new(vectorizer, Box::new(classifier)))
    }

    pub fn save_url_model(&self, model: &LogisticRegression) -> Result<PathBuf> {
        self.save(URL_MODEL_FILE, "url_model", model)
    }

    pub fn save_email_model(
        &self,
        model: &LogisticRegression,
        vectorizer: &TfIdfVectorizer,
    ) -> Result<(PathBuf, PathBuf)> {
        let model_path = self.save(EMAIL_MODEL_FILE, "email_model", model)?;
        let vectorizer_path = self.save(EMAIL_VECTORIZER_FILE, "email_vectorizer", vectorizer)?;
        Ok((model_path, vectorizer_path))
    }

    fn load_optional<T: DeserializeOwned>(&self, file: &str, kind: &str) -> Option<T> {
        let path = self.path(file);
        if !path.exists() {
            log::info!("No {} artifact at {}", kind, path.display());
            return None;
        }
        match Self::load(&path, kind) {
            Ok(payload) => {
                log::info!("Loaded {} from {}", kind, path.display());
                Some(payload)
            }
            Err(e) => {
                log::warn!("Ignoring unusable {} artifact: {:#}", kind, e);
                None
            }
        }
    }

    fn load<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact: {}", path.display()))?;
        let artifact: Artifact<T> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact: {}", path.display()))?;
        if artifact.kind != kind {
            bail!(
                "{} holds a {} artifact, expected {}",
                path.display(),
                artifact.kind,
                kind
            );
        }
        if artifact.format_version != FORMAT_VERSION {
            bail!(
                "{} has format version {}, expected {}",
                path.display(),
                artifact.format_version,
                FORMAT_VERSION
            );
        }
        log::debug!("{} trained at {}", kind, artifact.trained_at.to_rfc3339());
        Ok(artifact.payload)
    }

    fn save<T: Serialize>(&self, file: &str, kind: &str, payload: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create models directory: {}", self.dir.display())
        })?;
        let artifact = Artifact {
            kind: kind.to_string(),
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            payload,
        };
        let path = self.path(file);
        let json = serde_json::to_string(&artifact)?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write artifact: {}", path.display()))?;
        Ok(path)
    }
}
