//! Rewrite stages over a chunk stream.
//!
//! The formatter pipeline works on a flat list of [`Chunk`]s. Input text
//! enters as a single `Text` chunk; each stage may split `Text` chunks and
//! insert `Markup` around them. `Markup` chunks are static tag strings and
//! are invisible to every later stage, so a later pattern cannot re-match
//! markup emitted by an earlier one. Anything still `Text` at the end is
//! HTML-escaped on render.

use regex::Regex;
use std::sync::LazyLock;

/// One piece of the intermediate stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Chunk {
    /// Input-derived text. Later stages may still transform it; it is
    /// escaped when the stream is rendered.
    Text(String),
    /// A markup tag emitted by a stage. Static by construction — a stage
    /// cannot smuggle input text into the markup side of the stream.
    Markup(&'static str),
}

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").unwrap());

static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(due|deadline|by|on|at|date):\s*([A-Za-z]+day,\s+[A-Za-z]+\s+\d{1,2},\s+\d{4}\s+at\s+\d{1,2}:\d{2}\s+[AP]M)",
    )
    .unwrap()
});

static INFO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[INFO\](.*?)\[/INFO\]").unwrap());

static WARNING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[WARNING\](.*?)\[/WARNING\]").unwrap());

// ── Line helpers ────────────────────────────────────────────────

/// Split the stream into lines. `Text` chunks are cut at every `\n`;
/// markup chunks never contain line breaks. A line that begins with a
/// `Markup` chunk was produced by an earlier stage and is not eligible
/// for line-anchored patterns.
fn split_lines(chunks: Vec<Chunk>) -> Vec<Vec<Chunk>> {
    let mut lines: Vec<Vec<Chunk>> = vec![Vec::new()];
    for chunk in chunks {
        match chunk {
            Chunk::Markup(_) => lines.last_mut().unwrap().push(chunk),
            Chunk::Text(text) => {
                for (i, piece) in text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    if !piece.is_empty() {
                        lines.last_mut().unwrap().push(Chunk::Text(piece.to_string()));
                    }
                }
            }
        }
    }
    lines
}

/// Rejoin lines with `\n` text separators and merge adjacent `Text` chunks
/// so inline patterns see contiguous text again.
fn join_lines(lines: Vec<Vec<Chunk>>) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 {
            chunks.push(Chunk::Text("\n".to_string()));
        }
        chunks.extend(line);
    }
    coalesce(chunks)
}

fn coalesce(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match (out.last_mut(), chunk) {
            (Some(Chunk::Text(tail)), Chunk::Text(text)) => tail.push_str(&text),
            (_, chunk) => out.push(chunk),
        }
    }
    out
}

/// Apply `f` to every `Text` chunk, leaving markup untouched.
fn map_text<F>(chunks: Vec<Chunk>, f: F) -> Vec<Chunk>
where
    F: Fn(&str) -> Vec<Chunk>,
{
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        match chunk {
            Chunk::Text(text) => out.extend(f(&text)),
            Chunk::Markup(_) => out.push(chunk),
        }
    }
    out
}

/// If the line's leading chunk is text starting with `marker`, strip the
/// marker and return true. "Exactly N markers" falls out of the space in
/// the marker string: a `#### ` line fails the `### ` prefix test.
fn strip_line_marker(line: &mut Vec<Chunk>, marker: &str) -> bool {
    let rest = match line.first() {
        Some(Chunk::Text(text)) => text.strip_prefix(marker).map(str::to_owned),
        _ => None,
    };
    match rest {
        Some(rest) if rest.is_empty() => {
            line.remove(0);
            true
        }
        Some(rest) => {
            line[0] = Chunk::Text(rest);
            true
        }
        None => false,
    }
}

// ── Stages, in pipeline order ───────────────────────────────────

/// Lines beginning with `marker` become an element wrapped in `open`/`close`.
/// Runs once for `### `/`<h3>` and once for `## `/`<h2>`; the three-marker
/// pass must come first so its lines are already markup-led when the
/// two-marker pass looks for line starts.
pub(super) fn heading_stage(
    chunks: Vec<Chunk>,
    marker: &str,
    open: &'static str,
    close: &'static str,
) -> Vec<Chunk> {
    let mut lines = split_lines(chunks);
    for line in &mut lines {
        if strip_line_marker(line, marker) {
            line.insert(0, Chunk::Markup(open));
            line.push(Chunk::Markup(close));
        }
    }
    join_lines(lines)
}

/// `**…**` becomes `<strong>…</strong>`. Non-greedy, so adjacent spans on
/// one line stay distinct. An unpaired `**` matches nothing and stays
/// literal text.
pub(super) fn bold_stage(chunks: Vec<Chunk>) -> Vec<Chunk> {
    map_text(chunks, |text| {
        let mut out = Vec::new();
        let mut last = 0;
        for caps in BOLD_RE.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            if whole.start() > last {
                out.push(Chunk::Text(text[last..whole.start()].to_string()));
            }
            out.push(Chunk::Markup("<strong>"));
            out.push(Chunk::Text(caps[1].to_string()));
            out.push(Chunk::Markup("</strong>"));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Chunk::Text(text[last..].to_string()));
        }
        out
    })
}

/// Lines beginning with `• ` become `<li>` items, and each contiguous run
/// of item lines is collapsed into a single `<ul>` element. The line
/// breaks separating items are absorbed into the list; a non-bullet line
/// ends the run, so two runs produce two separate lists.
pub(super) fn bullet_stage(chunks: Vec<Chunk>) -> Vec<Chunk> {
    let lines = split_lines(chunks);
    let mut out: Vec<Vec<Chunk>> = Vec::with_capacity(lines.len());
    let mut run: Vec<Chunk> = Vec::new();
    for mut line in lines {
        if strip_line_marker(&mut line, "• ") {
            if run.is_empty() {
                run.push(Chunk::Markup("<ul>"));
            }
            run.push(Chunk::Markup("<li>"));
            run.extend(line);
            run.push(Chunk::Markup("</li>"));
        } else {
            if !run.is_empty() {
                run.push(Chunk::Markup("</ul>"));
                out.push(std::mem::take(&mut run));
            }
            out.push(line);
        }
    }
    if !run.is_empty() {
        run.push(Chunk::Markup("</ul>"));
        out.push(run);
    }
    join_lines(out)
}

/// `due:`/`deadline:`/`by:`/`on:`/`at:`/`date:` followed by a long-form
/// date-time phrase gets the date highlighted; the label stays plain.
/// Any other date phrasing is left untouched.
pub(super) fn deadline_stage(chunks: Vec<Chunk>) -> Vec<Chunk> {
    map_text(chunks, |text| {
        let mut out = Vec::new();
        let mut last = 0;
        for caps in DEADLINE_RE.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            if whole.start() > last {
                out.push(Chunk::Text(text[last..whole.start()].to_string()));
            }
            out.push(Chunk::Text(format!("{}: ", &caps[1])));
            out.push(Chunk::Markup("<span class=\"message-highlight\">"));
            out.push(Chunk::Text(caps[2].to_string()));
            out.push(Chunk::Markup("</span>"));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Chunk::Text(text[last..].to_string()));
        }
        out
    })
}

/// `[INFO]…[/INFO]` and `[WARNING]…[/WARNING]` become callout blocks.
/// The span may contain newlines; those are converted by the final
/// line-break stage, inside the block.
pub(super) fn callout_stage(chunks: Vec<Chunk>, kind: CalloutKind) -> Vec<Chunk> {
    let (re, open) = match kind {
        CalloutKind::Info => (&*INFO_RE, "<div class=\"info-card\">"),
        CalloutKind::Warning => (&*WARNING_RE, "<div class=\"warning-card\">"),
    };
    map_text(chunks, |text| {
        let mut out = Vec::new();
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let whole = caps.get(0).unwrap();
            if whole.start() > last {
                out.push(Chunk::Text(text[last..whole.start()].to_string()));
            }
            out.push(Chunk::Markup(open));
            out.push(Chunk::Text(caps[1].to_string()));
            out.push(Chunk::Markup("</div>"));
            last = whole.end();
        }
        if last < text.len() {
            out.push(Chunk::Text(text[last..].to_string()));
        }
        out
    })
}

#[derive(Debug, Clone, Copy)]
pub(super) enum CalloutKind {
    Info,
    Warning,
}

/// Every `\n` still in the text becomes `<br>`.
pub(super) fn linebreak_stage(chunks: Vec<Chunk>) -> Vec<Chunk> {
    map_text(chunks, |text| {
        let mut out = Vec::new();
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                out.push(Chunk::Markup("<br>"));
            }
            if !piece.is_empty() {
                out.push(Chunk::Text(piece.to_string()));
            }
        }
        out
    })
}
