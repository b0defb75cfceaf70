use std::sync::LazyLock;

use regex::Regex;

use super::Partial;
use crate::extractor::segment;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Recommendations:\*\*|\*\*Next Steps:\*\*").unwrap());
static KEY_INSIGHTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*Key Insights:\*\*(.*)").unwrap());
static DASH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("-").unwrap());
static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\s").unwrap());

/// MSFT narratives use two bolded section markers to cut the text into
/// insights / recommendations / next-steps. Each part is optional and
/// contributes its category independently.
pub fn extract(narrative: &str) -> Partial {
    let parts: Vec<&str> = SECTION_RE.split(narrative).collect();

    let insights = parts
        .first()
        .and_then(|head| KEY_INSIGHTS_RE.captures(head))
        .map(|caps| segment::split_and_clean(&caps[1], &DASH_RE))
        .unwrap_or_default();

    let recommendations = parts
        .get(1)
        .map(|part| segment::split_and_clean(part, &NUMBERED_RE))
        .unwrap_or_default();

    let next_steps = parts
        .get(2)
        .map(|part| segment::split_and_clean(part, &DASH_RE))
        .unwrap_or_default();

    Partial {
        insights,
        recommendations,
        next_steps,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "**Key Insights:** - Grew cloud revenue \
        **Recommendations:** 1. Invest in AI **Next Steps:** - Report next quarter";

    #[test]
    fn full_layout() {
        let p = extract(SAMPLE);
        assert_eq!(p.insights, vec!["Grew cloud revenue"]);
        assert_eq!(p.recommendations, vec!["Invest in AI"]);
        assert_eq!(p.next_steps, vec!["Report next quarter"]);
    }

    #[test]
    fn multiple_items_per_part() {
        let p = extract(
            "**Key Insights:** - Azure up 30% - Office steady \
             **Recommendations:** 1. Expand data centers 2. Bundle Copilot \
             **Next Steps:** - Hire infra teams - Review pricing",
        );
        assert_eq!(p.insights, vec!["Azure up 30%", "Office steady"]);
        assert_eq!(
            p.recommendations,
            vec!["Expand data centers", "Bundle Copilot"]
        );
        assert_eq!(p.next_steps, vec!["Hire infra teams", "Review pricing"]);
    }

    #[test]
    fn missing_next_steps_part() {
        let p = extract("**Key Insights:** - Solid year **Recommendations:** 1. Stay the course");
        assert_eq!(p.insights, vec!["Solid year"]);
        assert_eq!(p.recommendations, vec!["Stay the course"]);
        assert!(p.next_steps.is_empty());
    }

    #[test]
    fn missing_key_insights_label() {
        let p = extract("Some preamble **Recommendations:** 1. Diversify");
        assert!(p.insights.is_empty());
        assert_eq!(p.recommendations, vec!["Diversify"]);
    }

    #[test]
    fn empty_text() {
        assert_eq!(extract(""), Partial::default());
    }
}
