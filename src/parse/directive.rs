// src/parse/directive.rs

use tracing::debug;

/// Marks the start of a directive inside a SQL comment.
pub const LEAD_IN: &str = "--/";

/// A single `--/<tag> <value>` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    /// Always uppercase.
    pub tag: char,
    pub value: &'a str,
}

/// Split the comment region of `line` into directives.
///
/// Everything before the first `--/` is SQL (or a plain comment) and is
/// ignored. A segment whose tag is not a single letter is dropped with a
/// debug event; unknown letters are kept for the caller to ignore.
pub fn tokenize(line: &str) -> Vec<Directive<'_>> {
    let Some(start) = line.find(LEAD_IN) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for segment in line[start..].split(LEAD_IN).skip(1) {
        let mut chars = segment.chars();
        let tag = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => {
                debug!(segment = %segment, "skipping directive without a tag letter");
                continue;
            }
        };
        let rest = chars.as_str();
        // `--/Dfoo` is not a `D` directive.
        if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
            debug!(segment = %segment, "skipping directive with a multi-letter tag");
            continue;
        }
        out.push(Directive {
            tag,
            value: rest.trim(),
        });
    }
    out
}
