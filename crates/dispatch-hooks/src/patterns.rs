//! Pattern matching utilities for transcript classification.

use regex::Regex;
use std::sync::OnceLock;

/// A compiled pattern for matching transcript text.
#[derive(Debug)]
pub struct Pattern {
    /// Human-readable name for this pattern.
    pub name: &'static str,
    /// The regex pattern.
    regex: Regex,
}

impl Pattern {
    /// Creates a new pattern.
    pub fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Checks if the pattern matches the given text.
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Phrases of a finished plan awaiting review.
pub fn plan_ready_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("exit_plan_mode", r"ExitPlanMode"),
            Pattern::new("plan_ready", r"(?i)plan is ready"),
            Pattern::new("ready_for_review", r"(?i)ready for (your )?review"),
            Pattern::new("plan_ready_hook", r"(?i)hook/plan-ready"),
        ]
    })
}

/// Rate and usage limit reports.
pub fn rate_limit_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("rate_limit", r"(?i)rate[ _-]?limit"),
            Pattern::new("usage_limit", r"(?i)usage limit"),
            Pattern::new("too_many_requests", r"(?i)too many requests"),
            Pattern::new("status_429", r"\b429\b"),
        ]
    })
}

/// Context window exhaustion.
pub fn context_exceeded_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("context_length", r"(?i)context[ _](length|window)"),
            Pattern::new("prompt_too_long", r"(?i)prompt is too long"),
            Pattern::new("maximum_context", r"(?i)maximum context"),
        ]
    })
}

/// Generic API failures.
pub fn api_error_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern::new("api_error", r"(?i)api[ _]error"),
            Pattern::new("overloaded", r"(?i)overloaded"),
            Pattern::new("internal_server_error", r"(?i)internal server error"),
            Pattern::new("error", r"(?i)\berror\b"),
        ]
    })
}

/// Returns the first pattern that matches, in list order.
pub fn first_match<'a>(text: &str, patterns: &'a [Pattern]) -> Option<&'a Pattern> {
    patterns.iter().find(|p| p.matches(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matches() {
        let pattern = Pattern::new("test", r"hello\s+world");
        assert!(pattern.matches("hello world"));
        assert!(pattern.matches("hello   world"));
        assert!(!pattern.matches("helloworld"));
    }

    #[test]
    fn test_rate_limit_variants() {
        for text in [
            "Rate limit reached",
            "rate_limit_error",
            "You've hit your usage limit",
            "HTTP 429",
            "Too Many Requests",
        ] {
            assert!(
                first_match(text, rate_limit_patterns()).is_some(),
                "expected rate limit match for {:?}",
                text
            );
        }
        assert!(first_match("error 4290 items", rate_limit_patterns()).is_none());
    }

    #[test]
    fn test_context_patterns() {
        assert!(first_match("context_length_exceeded", context_exceeded_patterns()).is_some());
        assert!(first_match("Prompt is too long", context_exceeded_patterns()).is_some());
        assert!(first_match("all good", context_exceeded_patterns()).is_none());
    }

    #[test]
    fn test_error_requires_word_boundary() {
        assert!(first_match("an Error occurred", api_error_patterns()).is_some());
        assert!(first_match("errorless run", api_error_patterns()).is_none());
    }

    #[test]
    fn test_first_match_respects_order() {
        let m = first_match("API Error: overloaded", api_error_patterns()).unwrap();
        assert_eq!(m.name, "api_error");
    }
}
