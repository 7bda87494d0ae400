// Label tokens the persona prompts ask the model to emit. Adding a locale is
// a matter of adding its tokens here; the parser builds its patterns from
// these tables in order.

/// Heading that introduces the one-paragraph summary.
pub const SUMMARY_LABELS: &[&str] = &["Özet", "Summary"];

/// Prefix of the `<label>: NN/100` score line.
pub const SCORE_LABELS: &[&str] = &["BAI Score", "BAI Puanı"];

/// `(?:a|b|c)` over escaped labels.
pub(crate) fn alternation(labels: &[&str]) -> String {
    let escaped: Vec<String> = labels.iter().map(|l| regex::escape(l)).collect();
    format!("(?:{})", escaped.join("|"))
}
