use super::strategies::{self, Strategy};

/// Registered source layouts. Adding a source is one row here plus its
/// strategy module; nothing else changes.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("AAPL", strategies::aapl::extract),
    ("MSFT", strategies::msft::extract),
    ("GOOGL", strategies::googl::extract),
];

/// Exact, case-sensitive lookup. Unknown identifiers resolve to the
/// no-op strategy rather than an error.
pub fn resolve(source_id: &str) -> Strategy {
    STRATEGIES
        .iter()
        .find(|(id, _)| *id == source_id)
        .map(|(_, strategy)| *strategy)
        .unwrap_or(strategies::default_empty)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_extracts_nothing() {
        let partial = resolve("ZZZ")("**Key Insights:** - anything");
        assert!(partial.insights.is_empty());
        assert!(partial.recommendations.is_empty());
        assert!(partial.next_steps.is_empty());
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let partial = resolve("aapl")(
            "**Revenue**: Up * **Net Income**: Up * \
             **Asset and Liability Management**: Stable",
        );
        assert!(partial.insights.is_empty());
    }

    #[test]
    fn known_source_uses_its_layout() {
        let partial = resolve("MSFT")("**Key Insights:** - One insight");
        assert_eq!(partial.insights, vec!["One insight"]);
    }
}
