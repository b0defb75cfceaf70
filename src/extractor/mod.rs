pub mod registry;
pub mod segment;
pub mod strategies;

use serde::Serialize;

pub const NO_INSIGHTS: &str = "No insights available.";
pub const NO_RECOMMENDATIONS: &str = "No recommendations available.";
pub const NO_NEXT_STEPS: &str = "No next steps available.";

/// Normalized extraction output. Every list holds at least one entry:
/// either extracted items in source order or the category's placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Extract the categorized lists from a narrative. Total for any input:
/// unknown source identifiers, absent text, and unparseable layouts all
/// degrade to placeholder entries, never an error.
pub fn extract(source_id: &str, narrative: Option<&str>) -> ExtractionResult {
    let strategy = registry::resolve(source_id);
    let partial = strategy(narrative.unwrap_or(""));

    ExtractionResult {
        insights: or_placeholder(partial.insights, NO_INSIGHTS),
        recommendations: or_placeholder(partial.recommendations, NO_RECOMMENDATIONS),
        next_steps: or_placeholder(partial.next_steps, NO_NEXT_STEPS),
    }
}

fn or_placeholder(items: Vec<String>, placeholder: &str) -> Vec<String> {
    if items.is_empty() {
        vec![placeholder.to_string()]
    } else {
        items
    }
}

// ── Tests ──
