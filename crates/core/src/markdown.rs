//! The constrained markdown slide grammar.
//!
//! Slides are separated by lines consisting of `---`, each segment holding a
//! title line (leading `#` markers and an optional `Slide N:` prefix are
//! stripped) followed by verbatim body lines. Blank lines and empty segments
//! are discarded. The grammar enforces no bullet-count limits; body lines
//! keep their markers and annotation prefixes untouched.

use crate::error::{Error, Result};
use crate::types::{SlidePlan, SlideRecord};
use regex::Regex;
use std::sync::LazyLock;

/// The slide separator token, matched against whole trimmed lines.
const SEPARATOR: &str = "---";

/// Regex matching a `Slide N:` title prefix, case-insensitive.
static SLIDE_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^slide\s*\d+\s*:\s*").unwrap());

/// Parse a markdown string into an ordered slide plan.
///
/// Empty or whitespace-only input is a [`Error::MalformedInput`]; non-blank
/// input that yields no slides (for example, separator lines only) parses to
/// an empty plan. Callers can rely on the distinction.
pub fn parse(markdown: &str) -> Result<SlidePlan> {
    if markdown.trim().is_empty() {
        return Err(Error::MalformedInput(
            "input is empty or whitespace-only".to_string(),
        ));
    }

    let mut plan = SlidePlan::new();

    for segment in split_segments(markdown) {
        if let Some(record) = parse_segment(&segment) {
            plan.add_record(record);
        }
    }

    log::debug!("parsed {} slides from markdown input", plan.len());

    Ok(plan)
}

/// Render a plan back into grammar-conforming markdown.
///
/// Titles get a `#` marker, body lines are emitted verbatim, and slides are
/// joined with the separator. Re-parsing the output yields an equal plan.
pub fn render(plan: &SlidePlan) -> String {
    let mut out = String::new();

    for (i, record) in plan.iter().enumerate() {
        if i > 0 {
            out.push_str("\n---\n");
        }
        out.push_str("# ");
        out.push_str(&record.title);
        out.push('\n');
        for line in &record.body {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

/// Split the input on separator lines, at top level only.
fn split_segments(markdown: &str) -> Vec<Vec<String>> {
    let mut segments = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in markdown.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim() == SEPARATOR {
            segments.push(std::mem::take(&mut current));
        } else {
            current.push(line.to_string());
        }
    }
    segments.push(current);

    segments
}

/// Parse one segment into a record, or `None` if it has no non-blank lines.
fn parse_segment(lines: &[String]) -> Option<SlideRecord> {
    let mut non_blank = lines.iter().filter(|l| !l.trim().is_empty());

    let title_line = non_blank.next()?;
    let mut record = SlideRecord::new(strip_title_markers(title_line));

    for line in non_blank {
        record.add_body_line(line.as_str());
    }

    Some(record)
}

/// Strip leading `#` markers and an optional `Slide N:` prefix from a title
/// line, independent of how many `#` characters are present.
fn strip_title_markers(line: &str) -> String {
    let stripped = line.trim().trim_start_matches('#').trim();
    SLIDE_PREFIX_REGEX.replace(stripped, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_title_markers() {
        assert_eq!(strip_title_markers("# Slide 1: Intro"), "Intro");
        assert_eq!(strip_title_markers("## Slide 12: Deep Dive"), "Deep Dive");
        assert_eq!(strip_title_markers("### Summary"), "Summary");
        assert_eq!(strip_title_markers("Plain Title"), "Plain Title");
        assert_eq!(strip_title_markers("# slide 2:  spaced"), "spaced");
    }

    #[test]
    fn test_parse_segment_count_and_order() {
        let input = "# One\n---\n# Two\n- a\n---\n# Three\n- b";
        let plan = parse(input).unwrap();
        assert_eq!(plan.len(), 3);
        let titles: Vec<&str> = plan.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_parse_two_slide_scenario() {
        let input = "# Slide 1: Intro\n## A subtitle\n---\n# Slide 2: Point One\n- bullet A\n- bullet B\n**Speaker Notes:** talk about A";
        let plan = parse(input).unwrap();
        assert_eq!(plan.len(), 2);

        assert_eq!(plan.slides[0].title, "Intro");
        assert_eq!(plan.slides[0].subtitle(), Some("A subtitle".to_string()));

        assert_eq!(plan.slides[1].title, "Point One");
        assert_eq!(plan.slides[1].bullets(), vec!["bullet A", "bullet B"]);
        assert_eq!(plan.slides[1].notes(), Some("talk about A"));
    }

    #[test]
    fn test_whitespace_only_input_is_malformed() {
        assert!(matches!(parse("   \n  \n"), Err(Error::MalformedInput(_))));
        assert!(matches!(parse(""), Err(Error::MalformedInput(_))));
    }

    #[test]
    fn test_separator_only_input_yields_empty_plan() {
        let plan = parse("---\n---\n").unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_blank_segments_are_dropped() {
        let input = "\n---\n# Only Slide\n- one\n---\n   \n";
        let plan = parse(input).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.slides[0].title, "Only Slide");
    }

    #[test]
    fn test_title_only_segment_has_empty_body() {
        let plan = parse("# Lone Title").unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.slides[0].body.is_empty());
        assert!(plan.slides[0].bullets().is_empty());
    }

    #[test]
    fn test_separator_requires_exact_token() {
        // A dashed line inside text that is not exactly `---` is body text.
        let plan = parse("# Title\n- uses --- inline\n----\n").unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.slides[0].body.len(), 2);
    }

    #[test]
    fn test_render_round_trip_idempotence() {
        let input = "# Slide 1: Intro\n## A subtitle\n---\n# Slide 2: Point One\n- bullet A\n- bullet B\n**Speaker Notes:** talk about A";
        let plan = parse(input).unwrap();
        let rendered = render(&plan);
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(plan, reparsed);
    }

    #[test]
    fn test_body_lines_kept_verbatim() {
        let input = "# T\n- bullet A\n**Visual Suggestion:** a photo";
        let plan = parse(input).unwrap();
        assert_eq!(
            plan.slides[0].body,
            vec!["- bullet A", "**Visual Suggestion:** a photo"]
        );
    }
}
