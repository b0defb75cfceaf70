use std::sync::LazyLock;

use regex::Regex;

use super::Partial;
use crate::extractor::segment;

static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\* \*\*Recommendations\*\*:").unwrap());
static METRICS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\*\*Revenue\*\*:(.*?)\* \*\*Net Income\*\*:(.*?)\* \*\*Asset and Liability Management\*\*:(.*)",
    )
    .unwrap()
});
static PLUS_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s\+\s").unwrap());

const METRIC_LABELS: [&str; 3] = ["Revenue", "Net Income", "Asset and Liability Management"];

/// AAPL narratives carry three fixed metric labels in order, then a bolded
/// "Recommendations" marker introducing "+" bullets. The metric match is
/// all-or-nothing: if any label is missing, no insights are produced.
pub fn extract(narrative: &str) -> Partial {
    let mut parts = SECTION_RE.splitn(narrative, 2);
    let metrics_part = parts.next().unwrap_or("");
    let recommendations_part = parts.next().unwrap_or("");

    let mut insights = Vec::new();
    if let Some(caps) = METRICS_RE.captures(metrics_part) {
        for (i, label) in METRIC_LABELS.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                insights.push(format!("{}: {}", label, segment::strip_emphasis(m.as_str())));
            }
        }
    }

    Partial {
        insights,
        recommendations: segment::split_and_clean(recommendations_part, &PLUS_BULLET_RE),
        next_steps: Vec::new(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "**Revenue**: Up 5% * **Net Income**: Up 3% * \
        **Asset and Liability Management**: Stable * **Recommendations**: \
        + Expand margins + Cut costs";

    #[test]
    fn full_layout() {
        let p = extract(SAMPLE);
        assert_eq!(
            p.insights,
            vec![
                "Revenue: Up 5%",
                "Net Income: Up 3%",
                "Asset and Liability Management: Stable",
            ]
        );
        assert_eq!(p.recommendations, vec!["Expand margins", "Cut costs"]);
        assert!(p.next_steps.is_empty());
    }

    #[test]
    fn missing_label_means_no_insights() {
        // "Net Income" absent: the triple-capture must not partially match
        let p = extract(
            "**Revenue**: Up 5% * **Asset and Liability Management**: Stable \
             * **Recommendations**: + Expand margins",
        );
        assert!(p.insights.is_empty());
        assert_eq!(p.recommendations, vec!["Expand margins"]);
    }

    #[test]
    fn emphasis_inside_metric_bodies_stripped() {
        let p = extract(
            "**Revenue**: Up **5%** on services * **Net Income**: **Flat** * \
             **Asset and Liability Management**: Stable",
        );
        assert_eq!(
            p.insights,
            vec![
                "Revenue: Up 5% on services",
                "Net Income: Flat",
                "Asset and Liability Management: Stable",
            ]
        );
    }

    #[test]
    fn no_recommendations_marker() {
        let p = extract(
            "**Revenue**: Up 5% * **Net Income**: Flat * \
             **Asset and Liability Management**: Weak",
        );
        assert_eq!(p.insights.len(), 3);
        assert!(p.recommendations.is_empty());
    }

    #[test]
    fn empty_text() {
        assert_eq!(extract(""), Partial::default());
    }
}
