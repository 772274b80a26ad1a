use url::Url;

/// Minimal URL and domain helpers
pub struct DomainUtils;

impl DomainUtils {
    /// Extract the lower-cased host from a URL, tolerating a missing scheme
    pub fn extract_host(url: &str) -> Option<String> {
        let trimmed = url.trim();
        let parsed = Url::parse(trimmed).or_else(|_| Url::parse(&format!("http://{trimmed}")));
        parsed
            .ok()?
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.to_lowercase())
    }

    /// Return every pattern contained in `text`, in list order.
    /// Both sides are expected to be lower-cased already.
    pub fn matching_patterns<'a>(text: &str, patterns: &'a [String]) -> Vec<&'a str> {
        patterns
            .iter()
            .filter(|pattern| !pattern.is_empty() && text.contains(pattern.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn contains_any(text: &str, patterns: &[String]) -> bool {
        patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && text.contains(pattern.as_str()))
    }

    /// Canonicalize domain (remove www prefix)
    pub fn canonicalize_domain(domain: &str) -> String {
        let domain_lower = domain.to_lowercase();
        if let Some(stripped) = domain_lower.strip_prefix("www.") {
            stripped.to_string()
        } else {
            domain_lower
        }
    }
}
