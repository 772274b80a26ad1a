use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// TF-IDF vectorizer with smoothed IDF and L2-normalised rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// term -> column index; ordered so serialized artifacts are stable
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    max_features: usize,
    use_stop_words: bool,
    #[serde(skip, default = "token_regex")]
    token_regex: Regex,
}

fn token_regex() -> Regex {
    Regex::new(r"[a-z0-9]{2,}").unwrap()
}

impl TfIdfVectorizer {
    pub fn new(max_features: usize, use_stop_words: bool) -> Self {
        Self {
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            max_features,
            use_stop_words,
            token_regex: token_regex(),
        }
    }

    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if documents.is_empty() {
            bail!("cannot fit a vectorizer on zero documents");
        }
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut term_frequency: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let tokens = self.tokenize(doc);
            for token in &tokens {
                *term_frequency.entry(token.clone()).or_insert(0) += 1;
            }
            let unique: HashSet<String> = tokens.into_iter().collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        // Keep the most frequent terms; ties broken alphabetically.
        let mut terms: Vec<(String, usize)> = term_frequency.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_features);
        let mut kept: Vec<String> = terms.into_iter().map(|(t, _)| t).collect();
        kept.sort();

        let n = documents.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (idx, term) in kept.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        Ok(())
    }

    pub fn transform(&self, document: &str) -> Result<Vec<f64>> {
        if self.idf.len() != self.vocabulary.len() {
            bail!(
                "corrupt vectorizer: {} terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            );
        }
        let mut row = vec![0.0; self.vocabulary.len()];
        for token in self.tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                match row.get_mut(idx) {
                    Some(cell) => *cell += 1.0,
                    None => bail!("corrupt vectorizer: term index {} out of range", idx),
                }
            }
        }
        for (cell, idf) in row.iter_mut().zip(&self.idf) {
            *cell *= idf;
        }
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for cell in &mut row {
                *cell /= norm;
            }
        }
        Ok(row)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.vocabulary.len()];
        for (term, &idx) in &self.vocabulary {
            if let Some(slot) = names.get_mut(idx) {
                *slot = term.clone();
            }
        }
        names
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.token_regex
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !(self.use_stop_words && ENGLISH_STOP_WORDS.contains(t)))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Urgent: verify your account now".to_string(),
            "Meeting at 3pm today".to_string(),
            "Verify the invoice for your account".to_string(),
        ]
    }

    #[test]
    fn test_fit_drops_stop_words() {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer.fit(&corpus()).unwrap();
        let names = vectorizer.feature_names();
        assert!(names.contains(&"verify".to_string()));
        assert!(!names.contains(&"your".to_string()));
        assert!(!names.contains(&"the".to_string()));
    }

    #[test]
    fn test_transform_is_unit_length() {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer.fit(&corpus()).unwrap();
        let row = vectorizer.transform("please verify your account").unwrap();
        assert_eq!(row.len(), vectorizer.vocabulary_size());
        let norm: f64 = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_text_is_zero_vector() {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer.fit(&corpus()).unwrap();
        let row = vectorizer.transform("zzz qqq").unwrap();
        assert!(row.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_max_features_limits_vocabulary() {
        let mut vectorizer = TfIdfVectorizer::new(2, true);
        vectorizer.fit(&corpus()).unwrap();
        assert_eq!(vectorizer.vocabulary_size(), 2);
        let names = vectorizer.feature_names();
        assert_eq!(names, vec!["account".to_string(), "verify".to_string()]);
    }

    #[test]
    fn test_survives_json_round_trip() {
        let mut vectorizer = TfIdfVectorizer::new(2000, true);
        vectorizer.fit(&corpus()).unwrap();
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: TfIdfVectorizer = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.transform("verify account").unwrap(),
            vectorizer.transform("verify account").unwrap()
        );
    }
}
