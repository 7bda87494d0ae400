// Pulls a summary and a numeric score out of free-form model text.
//
// Nothing here fails: missing pieces resolve to defaults (score 50 without
// an emoji, summary from the first suitable paragraph).

use std::sync::LazyLock;

use regex::Regex;

use crate::labels::{alternation, SCORE_LABELS, SUMMARY_LABELS};

/// Score assumed when the reply carries no score line.
pub const DEFAULT_SCORE: f64 = 50.0;

/// Paragraph lengths (exclusive) considered summary-sized.
const SUMMARY_MIN_CHARS: usize = 10;
const SUMMARY_MAX_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub number: f64,
    /// `None` when no score line was found.
    pub emoji: Option<&'static str>,
}

fn build(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

static SCORE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    build(&format!(
        r"(?i){}:\s*(-?[0-9]+\.?[0-9]*)/100",
        alternation(SCORE_LABELS)
    ))
});

/// Labelled forms first (`Summary: ...` up to a blank line), then the
/// colon-less heading form limited to one line. Each label in table order.
static SUMMARY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let labelled = SUMMARY_LABELS
        .iter()
        .map(|l| build(&format!(r"(?si){}:\s*(.*?)(?:\n\n|$)", regex::escape(l))));
    let heading = SUMMARY_LABELS
        .iter()
        .map(|l| build(&format!(r"(?mi)^{}\s+(.*?)(?:\n\n|$)", regex::escape(l))));
    labelled.chain(heading).collect()
});

/// Leading summary paragraph, in either form.
static LEADING_SUMMARY: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let labelled = SUMMARY_LABELS
        .iter()
        .map(|l| build(&format!(r"(?si)\A{}:.*?\n\n", regex::escape(l))));
    let heading = SUMMARY_LABELS
        .iter()
        .map(|l| build(&format!(r"(?si)\A{} .*?\n\n", regex::escape(l))));
    labelled.chain(heading).collect()
});

/// Emoji for a score. Lower bounds are inclusive; negatives are penalties.
pub fn score_emoji(score: f64) -> &'static str {
    match score {
        s if s < 0.0 => "❌",
        s if s >= 90.0 => "🌟",
        s if s >= 80.0 => "✨",
        s if s >= 70.0 => "👌",
        s if s >= 60.0 => "👍",
        s if s >= 50.0 => "🤔",
        s if s >= 30.0 => "👎",
        s if s >= 10.0 => "⚠️",
        _ => "🚫",
    }
}

pub fn parse_score(text: &str) -> Score {
    let number = SCORE_LINE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    match number {
        Some(number) => Score {
            number,
            emoji: Some(score_emoji(number)),
        },
        None => Score {
            number: DEFAULT_SCORE,
            emoji: None,
        },
    }
}

pub fn parse_summary(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    for pattern in SUMMARY_PATTERNS.iter() {
        if let Some(found) = pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .filter(|m| !m.as_str().is_empty())
        {
            return found.as_str().trim().to_string();
        }
    }

    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    paragraphs
        .iter()
        .map(|p| p.trim())
        .find(|p| {
            let len = p.chars().count();
            len > SUMMARY_MIN_CHARS && len < SUMMARY_MAX_CHARS
        })
        .or_else(|| paragraphs.first().map(|p| p.trim()))
        .unwrap_or_default()
        .to_string()
}

/// Remove a leading labelled summary paragraph, so the detailed reply does
/// not repeat what was already sent.
pub fn strip_summary(criticism: &str) -> String {
    let mut rest = criticism.to_string();
    for pattern in LEADING_SUMMARY.iter() {
        rest = pattern.replace(&rest, "").into_owned();
    }
    rest.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges() {
        assert_eq!(score_emoji(90.0), "🌟");
        assert_eq!(score_emoji(100.0), "🌟");
        assert_eq!(score_emoji(89.9), "✨");
        assert_eq!(score_emoji(80.0), "✨");
        assert_eq!(score_emoji(70.0), "👌");
        assert_eq!(score_emoji(60.0), "👍");
        assert_eq!(score_emoji(50.0), "🤔");
        assert_eq!(score_emoji(30.0), "👎");
        assert_eq!(score_emoji(10.0), "⚠️");
        assert_eq!(score_emoji(9.99), "🚫");
        assert_eq!(score_emoji(0.0), "🚫");
        assert_eq!(score_emoji(-0.5), "❌");
        assert_eq!(score_emoji(-40.0), "❌");
    }

    #[test]
    fn score_line_english_and_turkish() {
        let s = parse_score("blah\nBAI Score: 72.5/100\nmore");
        assert_eq!(s.number, 72.5);
        assert_eq!(s.emoji, Some("👌"));

        let s = parse_score("bai puanı:   91/100");
        assert_eq!(s.number, 91.0);
        assert_eq!(s.emoji, Some("🌟"));
    }

    #[test]
    fn negative_score_is_penalty() {
        let s = parse_score("BAI Score: -15/100");
        assert_eq!(s.number, -15.0);
        assert_eq!(s.emoji, Some("❌"));
    }

    #[test]
    fn first_score_line_wins() {
        assert_eq!(parse_score("BAI Score: 20/100 ... BAI Score: 95/100").number, 20.0);
    }

    #[test]
    fn missing_score_defaults_to_fifty_without_emoji() {
        let s = parse_score("No numbers here. Score: 80/100");
        assert_eq!(s.number, 50.0);
        assert_eq!(s.emoji, None);
    }

    #[test]
    fn trailing_dot_parses() {
        assert_eq!(parse_score("BAI Score: 64./100").number, 64.0);
    }

    #[test]
    fn labelled_summary() {
        let text = "Summary: Short take.\n\nBAI Score: 72.5/100\n\n...rest...";
        assert_eq!(parse_summary(text), "Short take.");
    }

    #[test]
    fn labelled_summary_runs_to_blank_line() {
        let text = "Özet: line one\nline two\n\nDetails";
        assert_eq!(parse_summary(text), "line one\nline two");
    }

    #[test]
    fn turkish_label_is_tried_before_english() {
        let text = "Summary: english\n\nÖzet: türkçe\n\nrest";
        assert_eq!(parse_summary(text), "türkçe");
    }

    #[test]
    fn labelled_summary_at_end_of_text() {
        assert_eq!(parse_summary("intro\n\nsummary: the end"), "the end");
    }

    #[test]
    fn heading_form_stops_at_line_end() {
        let text = "Summary\nThe gist is here\nand more\n\nrest";
        assert_eq!(parse_summary(text), "The gist is here");
    }

    #[test]
    fn falls_back_to_first_summary_sized_paragraph() {
        let text = "Hi!\n\nThis paragraph is a reasonable summary.\n\nAnother one here.";
        assert_eq!(parse_summary(text), "This paragraph is a reasonable summary.");
    }

    #[test]
    fn falls_back_to_first_paragraph() {
        let long = "x".repeat(400);
        let text = format!("short\n\n{long}");
        assert_eq!(parse_summary(&text), "short");
    }

    #[test]
    fn empty_criticism_gives_empty_summary() {
        assert_eq!(parse_summary(""), "");
    }

    #[test]
    fn no_score_first_paragraph_summary() {
        let text = "The article argues for X.\n\nIt lacks sources.";
        assert_eq!(parse_summary(text), "The article argues for X.");
        assert_eq!(parse_score(text).emoji, None);
    }

    #[test]
    fn strip_removes_leading_labelled_paragraph() {
        let text = "Summary: Short take.\n\nBAI Score: 72.5/100\n\nDetails.";
        assert_eq!(strip_summary(text), "BAI Score: 72.5/100\n\nDetails.");
    }

    #[test]
    fn strip_leaves_unlabelled_text() {
        let text = "Opening.\n\nSummary: not leading\n\nrest";
        assert_eq!(strip_summary(text), text);
    }

    #[test]
    fn strip_without_blank_line_keeps_everything() {
        assert_eq!(strip_summary("Summary: only line"), "Summary: only line");
    }
}
