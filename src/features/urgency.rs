use crate::domain_utils::DomainUtils;
use crate::heuristic_config::EmailHeuristics;

/// Finds social-engineering pressure phrases in message text.
pub struct UrgencyScanner {
    phrases: Vec<String>,
}

impl Default for UrgencyScanner {
    fn default() -> Self {
        Self::from_config(&EmailHeuristics::default())
    }
}

impl UrgencyScanner {
    pub fn from_config(config: &EmailHeuristics) -> Self {
        Self::with_phrases(&config.urgency_phrases)
    }

    pub fn with_phrases(phrases: &[String]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Matched phrases in list order; each phrase is reported once.
    pub fn scan(&self, content: &str) -> Vec<String> {
        let content_lower = content.to_lowercase();
        DomainUtils::matching_patterns(&content_lower, &self.phrases)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_reports_each_phrase_once() {
        let scanner = UrgencyScanner::default();
        let matches = scanner.scan("URGENT: verify now. Verify again, urgent!");
        assert_eq!(matches, vec!["verify", "urgent"]);
    }

    #[test]
    fn test_scan_multi_word_phrases() {
        let scanner = UrgencyScanner::default();
        let matches = scanner.scan("Your Account Suspended notice. Click Here to restore.");
        assert!(matches.contains(&"account suspended".to_string()));
        assert!(matches.contains(&"click here".to_string()));
    }

    #[test]
    fn test_scan_clean_text() {
        let scanner = UrgencyScanner::default();
        assert!(scanner.scan("Are we still meeting for lunch?").is_empty());
        assert!(scanner.scan("").is_empty());
    }

    #[test]
    fn test_custom_phrases_are_lowercased() {
        let scanner = UrgencyScanner::with_phrases(&["Wire Transfer".to_string()]);
        assert_eq!(scanner.phrases(), &["wire transfer".to_string()]);
        assert_eq!(scanner.scan("please WIRE TRANSFER today"), vec!["wire transfer"]);
    }
}
