use std::sync::LazyLock;

use regex::Regex;

use super::Partial;
use crate::extractor::segment;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Recommendations\*\*").unwrap());
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());
static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\s").unwrap());

/// GOOGL narratives alternate bolded labels with body text before a single
/// "Recommendations" marker, then switch to a numbered list. Each label is
/// paired with the body running up to the next label; text before the first
/// label has no owner and is discarded.
pub fn extract(narrative: &str) -> Partial {
    let mut parts = SECTION_RE.splitn(narrative, 2);
    let insights_part = parts.next().unwrap_or("");
    let recommendations_part = parts.next().unwrap_or("");

    let labels: Vec<(std::ops::Range<usize>, String)> = LABEL_RE
        .captures_iter(insights_part)
        .map(|caps| {
            let whole = caps.get(0).expect("capture 0 always present");
            (whole.range(), caps[1].trim().to_string())
        })
        .collect();

    let mut insights = Vec::new();
    for (i, (span, label)) in labels.iter().enumerate() {
        let body_end = labels
            .get(i + 1)
            .map(|(next, _)| next.start)
            .unwrap_or(insights_part.len());
        let body = insights_part[span.end..body_end]
            .trim()
            .replace([':', '-'], "");
        let item = format!("{}{}", label, body);
        if !item.trim().is_empty() {
            insights.push(item);
        }
    }

    let recommendations = segment::split_and_clean(recommendations_part, &NUMBERED_RE)
        .into_iter()
        .map(|item| item.replace(':', "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    Partial {
        insights,
        recommendations,
        next_steps: Vec::new(),
    }
}

// ── Tests ──
