//! Classify provider failure messages
//!
//! Search SDKs rarely expose typed errors for throttling, so failures are
//! classified from their message text. DuckDuckGo in particular answers
//! blocked clients with an "anomaly" page instead of a 429.

use super::SearchError;
use regex::Regex;
use std::sync::OnceLock;

static RATE_LIMIT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
static TIMEOUT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn rate_limit_patterns() -> &'static [Regex] {
    RATE_LIMIT_PATTERNS.get_or_init(|| {
        [
            // Word boundary so ids containing "429" don't match
            r"(?i)\b429\b",
            r"(?i)too\s+many\s+requests",
            r"(?i)rate[_\-\s]?limit(ed|ing)?",
            r"(?i)quota\s*(exceeded|limit)",
            r"(?i)anomaly[_\-\s]?(modal|detected|page)?",
            r"(?i)\bblocked\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static rate limit pattern"))
        .collect()
    })
}

fn timeout_patterns() -> &'static [Regex] {
    TIMEOUT_PATTERNS.get_or_init(|| {
        [r"(?i)timed?\s*out", r"(?i)deadline\s+(has\s+)?elapsed"]
            .iter()
            .map(|p| Regex::new(p).expect("static timeout pattern"))
            .collect()
    })
}

/// Whether a failure message indicates throttling.
pub fn is_rate_limited(message: &str) -> bool {
    rate_limit_patterns().iter().any(|re| re.is_match(message))
}

/// Map a provider failure message onto the recoverable error taxonomy.
pub fn classify_failure(provider: &str, message: &str) -> SearchError {
    let detail = format!("{}: {}", provider, message);
    if is_rate_limited(message) {
        SearchError::RateLimited(detail)
    } else if timeout_patterns().iter().any(|re| re.is_match(message)) {
        SearchError::Timeout(detail)
    } else {
        SearchError::Transport(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("HTTP status 429 Too Many Requests")]
    #[case("error: rate limit exceeded")]
    #[case("ratelimited by upstream")]
    #[case("DuckDuckGo returned anomaly-modal page")]
    #[case("Quota exceeded for today")]
    fn detects_rate_limits(#[case] message: &str) {
        assert!(is_rate_limited(message));
        assert!(matches!(
            classify_failure("ddg", message),
            SearchError::RateLimited(_)
        ));
    }

    #[rstest]
    #[case("session ses_429f18 closed")]
    #[case("connection refused")]
    fn ignores_non_rate_limits(#[case] message: &str) {
        assert!(!is_rate_limited(message));
    }

    #[test]
    fn classifies_timeouts() {
        assert!(matches!(
            classify_failure("ddg", "operation timed out"),
            SearchError::Timeout(_)
        ));
    }

    #[test]
    fn falls_back_to_transport() {
        let err = classify_failure("ddg", "dns error: no such host");
        assert!(matches!(err, SearchError::Transport(ref m) if m.starts_with("ddg: ")));
    }
}
