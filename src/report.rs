use crate::detection::{ClassificationResult, DetectionKind};
use crate::explanation::Explanation;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Write as _};
use std::str::FromStr;

const REPORT_INPUT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl FromStr for ReportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => bail!("Unsupported report format: {other}. Use text or json"),
        }
    }
}

/// Everything known about a single analysis, ready to hand to a reader.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub kind: DetectionKind,
    pub input: String,
    pub is_phishing: bool,
    pub score: f64,
    pub matched_phrases: Vec<String>,
    pub explanation: Explanation,
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    pub fn new(
        kind: DetectionKind,
        input: &str,
        result: &ClassificationResult,
        explanation: Explanation,
    ) -> Self {
        Self {
            kind,
            input: excerpt(input),
            is_phishing: result.is_phishing,
            score: result.score,
            matched_phrases: result.matched_phrases.clone(),
            explanation,
            generated_at: Utc::now(),
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Text => {
                let mut out = String::new();
                self.write_text(&mut out)?;
                Ok(out)
            }
        }
    }

    fn write_text(&self, out: &mut String) -> fmt::Result {
        let verdict = if self.is_phishing {
            "PHISHING"
        } else {
            "SAFE"
        };

        writeln!(out, "PhishGuard Analysis Report")?;
        writeln!(out, "══════════════════════════")?;
        writeln!(
            out,
            "Generated: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(out, "Type:      {}", self.kind)?;
        writeln!(out, "Verdict:   {verdict}")?;
        writeln!(out, "Score:     {:.1}%", self.score * 100.0)?;
        writeln!(out)?;
        writeln!(out, "Input:")?;
        for line in self.input.lines() {
            writeln!(out, "  {line}")?;
        }
        writeln!(out)?;
        writeln!(out, "Summary: {}", self.explanation.summary)?;

        write_list(out, "Key indicators:", &self.explanation.key_factors)?;
        write_list(out, "Suspicious phrases:", &self.matched_phrases)?;
        write_list(out, "Recommendations:", &self.explanation.recommendations)
    }
}

fn write_list(out: &mut String, title: &str, items: &[String]) -> fmt::Result {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title}")?;
    for item in items {
        writeln!(out, "  - {item}")?;
    }
    Ok(())
}

/// Caps the quoted input so large email bodies do not swamp the report.
fn excerpt(input: &str) -> String {
    if input.chars().count() <= REPORT_INPUT_CHARS {
        input.to_string()
    } else {
        let kept: String = input.chars().take(REPORT_INPUT_CHARS).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ScoreSource;
    use crate::explanation::Explainer;

    fn sample() -> AnalysisReport {
        let input = "Urgent: verify your account";
        let result = ClassificationResult::new(0.9, ScoreSource::Heuristic)
            .with_phrases(vec!["verify".to_string(), "urgent".to_string()]);
        let explanation = Explainer::default().explain(DetectionKind::Email, input, true, 0.9);
        AnalysisReport::new(DetectionKind::Email, input, &result, explanation)
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<ReportFormat>().unwrap(), ReportFormat::Json);
        assert_eq!("text".parse::<ReportFormat>().unwrap(), ReportFormat::Text);
        assert!("pdf".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_text_report_sections() {
        let text = sample().render(ReportFormat::Text).unwrap();
        assert!(text.contains("Verdict:   PHISHING"));
        assert!(text.contains("Score:     90.0%"));
        assert!(text.contains("Suspicious phrases:\n  - verify\n  - urgent\n"));
        assert!(text.contains("Do not click on any links"));
    }

    #[test]
    fn test_long_input_is_capped() {
        let input = "a".repeat(800);
        let result = ClassificationResult::new(0.1, ScoreSource::Heuristic);
        let explanation = Explainer::default().explain(DetectionKind::Email, &input, false, 0.1);
        let report = AnalysisReport::new(DetectionKind::Email, &input, &result, explanation);
        assert_eq!(report.input.chars().count(), 503);
        assert!(report.input.ends_with("a..."));

        let short = AnalysisReport::new(
            DetectionKind::Email,
            "hello",
            &result,
            Explainer::default().explain(DetectionKind::Email, "hello", false, 0.1),
        );
        assert_eq!(short.input, "hello");
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let result = ClassificationResult::new(0.1, ScoreSource::Heuristic);
        let explanation =
            Explainer::default().explain(DetectionKind::Email, "Lunch at noon?", false, 0.1);
        let text = AnalysisReport::new(DetectionKind::Email, "Lunch at noon?", &result, explanation)
            .render(ReportFormat::Text)
            .unwrap();
        assert!(!text.contains("Suspicious phrases:"));
        assert!(!text.contains("Key indicators:"));
        assert!(text.contains("Recommendations:\n  - This appears to be safe"));
    }

    #[test]
    fn test_json_report_fields() {
        let json = sample().render(ReportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "Email");
        assert_eq!(value["is_phishing"], true);
        assert_eq!(value["matched_phrases"][1], "urgent");
        assert_eq!(value["explanation"]["recommendations"].as_array().unwrap().len(), 4);
    }
}
