use std::sync::LazyLock;

use regex::Regex;

static EMPHASIS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*+").unwrap());

/// Split `text` on `delimiter` and clean each piece, dropping pieces that
/// are blank after cleaning. Order of the surviving pieces follows the
/// source text. A delimiter that never matches yields the whole cleaned
/// text as a single item; blank input yields nothing.
pub fn split_and_clean(text: &str, delimiter: &Regex) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    delimiter
        .split(text)
        .map(clean_item)
        .filter(|item| !item.is_empty())
        .collect()
}

/// Strip list and emphasis markers from one segment: remove every run of
/// `*`, then drop a single leading `-` bullet, trimming around each step.
pub fn clean_item(segment: &str) -> String {
    let stripped = strip_emphasis(segment);
    stripped
        .strip_prefix('-')
        .unwrap_or(&stripped)
        .trim()
        .to_string()
}

/// Remove every run of `*` emphasis markers and trim. Removing a marker can
/// expose whitespace (`"* -x"` → `" -x"`), so the result is re-trimmed
/// before any prefix checks.
pub fn strip_emphasis(text: &str) -> String {
    EMPHASIS_RE.replace_all(text.trim(), "").trim().to_string()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn dash() -> Regex {
        Regex::new("-").unwrap()
    }

    #[test]
    fn empty_input() {
        assert!(split_and_clean("", &dash()).is_empty());
        assert!(split_and_clean("   \n ", &dash()).is_empty());
    }

    #[test]
    fn no_match_yields_whole_text() {
        let items = split_and_clean("just one segment", &Regex::new(r"\d+\.\s").unwrap());
        assert_eq!(items, vec!["just one segment"]);
    }

    #[test]
    fn drops_blank_segments() {
        let items = split_and_clean("- first - second -", &dash());
        assert_eq!(items, vec!["first", "second"]);
    }

    #[test]
    fn strips_emphasis_runs_and_leading_dash() {
        assert_eq!(clean_item("  **bold item**  "), "bold item");
        assert_eq!(clean_item("* -starts with dash"), "starts with dash");
        assert_eq!(clean_item("mid **emphasis** kept text"), "mid emphasis kept text");
    }

    #[test]
    fn dash_exposed_by_emphasis_removal_is_still_stripped() {
        // Removing "*" can leave whitespace ahead of the bullet; the dash
        // must still be recognized as a list marker, not content.
        assert_eq!(clean_item("* - item"), "item");
        assert_eq!(clean_item("** -solo"), "solo");
        assert_eq!(clean_item("** - **"), "");
    }

    #[test]
    fn only_markers_becomes_nothing() {
        let items = split_and_clean("** - **", &Regex::new(r"\d+\.\s").unwrap());
        assert!(items.is_empty());
    }

    #[test]
    fn numbered_list_split() {
        let items = split_and_clean(
            "1. Invest in AI 2. Grow cloud 3. Return capital",
            &Regex::new(r"\d+\.\s").unwrap(),
        );
        assert_eq!(items, vec!["Invest in AI", "Grow cloud", "Return capital"]);
    }

    #[test]
    fn order_preserved() {
        let items = split_and_clean("c - b - a", &dash());
        assert_eq!(items, vec!["c", "b", "a"]);
    }
}
