// Profanity filter - a deliberately crude, deterministic text gate.
//
// Case-insensitive substring membership against a denylist. False positives
// and negatives are accepted; what matters is that the check is cheap, pure
// and never mutates its input. Anything smarter belongs in a real content
// moderation pipeline, which is out of scope here.

/// Built-in denylist. Extend per deployment via `GatewayConfig::extra_bad_words`.
const DEFAULT_BAD_WORDS: &[&str] = &[
    "fuck", "shit", "bitch", "asshole", "bastard", "cunt", "dick",
];

pub struct ProfanityFilter {
    terms: Vec<String>,
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::with_terms(std::iter::empty::<String>())
    }
}

impl ProfanityFilter {
    /// Build a filter from the default denylist plus any extra terms.
    /// Terms are matched lowercase; empty extras are dropped.
    pub fn with_terms<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<String> = DEFAULT_BAD_WORDS.iter().map(|w| w.to_string()).collect();
        for term in extra {
            let term = term.as_ref().trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        Self { terms }
    }

    /// Does `text` contain any denylisted term? Empty text never does.
    pub fn is_profane(&self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        let low = text.to_lowercase();
        self.terms.iter().any(|term| low.contains(term.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_passes() {
        let filter = ProfanityFilter::default();
        assert!(!filter.is_profane("Hello world"));
        assert!(!filter.is_profane(""));
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let filter = ProfanityFilter::default();
        assert!(filter.is_profane("you fucking idiot"));
        assert!(filter.is_profane("BULLSHIT"));
        assert!(filter.is_profane("mid-sentence sHiT happens"));
    }

    #[test]
    fn extra_terms_extend_the_list() {
        let filter = ProfanityFilter::with_terms(["Heck", "  ", "heck"]);
        assert!(filter.is_profane("what the heck"));
        assert!(!ProfanityFilter::default().is_profane("what the heck"));
    }
}
