//! Assistant message formatting.
//!
//! Raw assistant text is turned into a small, safe HTML fragment by a fixed
//! ordered pipeline of rewrite stages — headings, bold spans, bullet lists,
//! deadline highlighting, callout blocks, then line breaks. There is no
//! general markup parser and no recursive re-scanning: the stages run once,
//! in order, over a chunk stream (see [`stages`]) that keeps stage-emitted
//! markup separate from input text. Input text is always HTML-escaped on
//! the way out, so neither user nor assistant content can inject markup.

mod stages;

use stages::{CalloutKind, Chunk};

/// Format assistant (or system) text as a safe HTML fragment.
///
/// Total: unmatched input passes through with only line-break conversion
/// and escaping. Empty input yields an empty fragment with no `<br>`.
pub fn format_assistant(raw: &str) -> String {
    let mut chunks = vec![Chunk::Text(raw.to_string())];
    chunks = stages::heading_stage(chunks, "### ", "<h3>", "</h3>");
    chunks = stages::heading_stage(chunks, "## ", "<h2>", "</h2>");
    chunks = stages::bold_stage(chunks);
    chunks = stages::bullet_stage(chunks);
    chunks = stages::deadline_stage(chunks);
    chunks = stages::callout_stage(chunks, CalloutKind::Info);
    chunks = stages::callout_stage(chunks, CalloutKind::Warning);
    chunks = stages::linebreak_stage(chunks);
    render(&chunks)
}

/// Format user text. No markup interpretation — user input must never be
/// read as structure — only escaping and line-break conversion.
pub fn format_user(raw: &str) -> String {
    let chunks = stages::linebreak_stage(vec![Chunk::Text(raw.to_string())]);
    render(&chunks)
}

fn render(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        match chunk {
            Chunk::Text(text) => out.push_str(&escape(text)),
            Chunk::Markup(markup) => out.push_str(markup),
        }
    }
    out
}

/// Escape the five HTML-significant characters.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_identity_except_linebreaks() {
        assert_eq!(format_assistant("hello there"), "hello there");
        assert_eq!(format_assistant("a\nb"), "a<br>b");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(format_assistant(""), "");
        assert_eq!(format_user(""), "");
    }

    #[test]
    fn level_three_heading() {
        assert_eq!(format_assistant("### Title"), "<h3>Title</h3>");
    }

    #[test]
    fn level_two_heading() {
        assert_eq!(format_assistant("## Title"), "<h2>Title</h2>");
    }

    #[test]
    fn three_marker_line_is_not_a_level_two_heading() {
        assert_eq!(format_assistant("### ## both"), "<h3>## both</h3>");
    }

    #[test]
    fn bold_span() {
        assert_eq!(format_assistant("**bold**"), "<strong>bold</strong>");
    }

    #[test]
    fn adjacent_bold_spans_stay_distinct() {
        assert_eq!(
            format_assistant("**a** and **b**"),
            "<strong>a</strong> and <strong>b</strong>"
        );
    }

    #[test]
    fn unbalanced_bold_marker_kept_literal() {
        assert_eq!(format_assistant("a ** b"), "a ** b");
    }

    #[test]
    fn contiguous_bullets_make_one_list() {
        assert_eq!(
            format_assistant("• x\n• y"),
            "<ul><li>x</li><li>y</li></ul>"
        );
    }

    #[test]
    fn interrupted_bullets_make_two_lists() {
        assert_eq!(
            format_assistant("• x\nplain\n• y"),
            "<ul><li>x</li></ul><br>plain<br><ul><li>y</li></ul>"
        );
    }

    #[test]
    fn deadline_date_is_highlighted_label_plain() {
        let out = format_assistant("It is due: Friday, March 14, 2025 at 11:59 PM sharp");
        assert_eq!(
            out,
            "It is due: <span class=\"message-highlight\">Friday, March 14, 2025 at 11:59 PM</span> sharp"
        );
    }

    #[test]
    fn deadline_label_matches_case_insensitively() {
        let out = format_assistant("Deadline: Monday, June 2, 2025 at 9:00 AM");
        assert!(out.starts_with("Deadline: <span class=\"message-highlight\">"));
    }

    #[test]
    fn unrecognized_date_phrasing_passes_through() {
        assert_eq!(
            format_assistant("due: next Tuesday at noon"),
            "due: next Tuesday at noon"
        );
    }

    #[test]
    fn info_block_spans_lines() {
        assert_eq!(
            format_assistant("[INFO]line one\nline two[/INFO]"),
            "<div class=\"info-card\">line one<br>line two</div>"
        );
    }

    #[test]
    fn warning_block() {
        assert_eq!(
            format_assistant("[WARNING]careful[/WARNING]"),
            "<div class=\"warning-card\">careful</div>"
        );
    }

    #[test]
    fn bold_inside_heading_still_formats() {
        assert_eq!(
            format_assistant("### A **big** day"),
            "<h3>A <strong>big</strong> day</h3>"
        );
    }

    #[test]
    fn assistant_literal_text_is_escaped() {
        assert_eq!(
            format_assistant("<script>alert(1)</script>"),
            "&lt;script&gt;alert(1)&lt;/script&gt;"
        );
    }

    #[test]
    fn escaped_text_is_not_rescanned_by_later_stages() {
        // The escaped ampersand must not leak markup through the pipeline.
        assert_eq!(format_assistant("a & b"), "a &amp; b");
        assert_eq!(format_assistant("**a & b**"), "<strong>a &amp; b</strong>");
    }

    #[test]
    fn user_text_never_becomes_markup() {
        assert_eq!(format_user("### not a heading"), "### not a heading");
        assert_eq!(format_user("**not bold**"), "**not bold**");
        assert_eq!(
            format_user("<script>x</script>"),
            "&lt;script&gt;x&lt;/script&gt;"
        );
        assert_eq!(format_user("a\nb"), "a<br>b");
    }
}
