pub mod aapl;
pub mod googl;
pub mod msft;

/// Category lists produced by a strategy before placeholder filling.
/// Any list may be empty; the facade decides what that means.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partial {
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub next_steps: Vec<String>,
}

/// A source-specific extraction routine. Pure: same text in, same lists out.
pub type Strategy = fn(&str) -> Partial;

/// Strategy for sources with no registered layout: nothing extracted.
pub fn default_empty(_narrative: &str) -> Partial {
    Partial::default()
}
