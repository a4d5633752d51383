//! Statement normalization: arity suffixes and ID-wrapper presence.
//!
//! Both operations are computed as `(span, replacement)` edits against an
//! immutable input buffer and applied in a single pass, so later spans are
//! never invalidated by earlier replacements.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::grammar::{self, StampVariant};
use crate::infra::transcript::Transcript;

/// One replacement of a byte span. An insertion has an empty span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Range<usize>,
    pub text: String,
}

/// Applies non-overlapping edits, sorted by span start, in one pass.
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len() + 16 * edits.len());
    let mut last = 0;
    for e in edits {
        debug_assert!(e.span.start >= last);
        out.push_str(&text[last..e.span.start]);
        out.push_str(&e.text);
        last = e.span.end;
    }
    out.push_str(&text[last..]);
    out
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Append `_N` parameter-count suffixes to bare macro names.
    pub extend_names: bool,
    /// Wrapper case variant for newly inserted `(0)` wrappers.
    pub default_variant: StampVariant,
}

/// A parameter count above this is a parse anomaly, reported and ignored.
const MAX_PARAM_COUNT: usize = 98;

// A `%` not preceded by another `%`, optional `[0-9.#]` modifiers, one
// terminal letter out of the fixed set. `%%` escapes are thereby skipped.
static SPECIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^%])(%[0-9.#]*[bcdefgEFGhilLnoOpqtuxX])").expect("specifier pattern")
});

/// Counts printf-style conversion specifiers in a format string.
pub fn specifier_count(s: &str) -> usize {
    let mut count = 0;
    let mut rest = s;
    while let Some(m) = SPECIFIER.find(rest) {
        count += 1;
        rest = &rest[m.end()..];
    }
    count
}

/// Normalizes every call site of `text` carrying a format string: bare macro
/// names gain a `_N` arity suffix (when enabled), statements without an ID
/// wrapper gain a `(0)` wrapper in the configured case variant. Sites with no
/// format string are left untouched.
///
/// Returns the rewritten text and whether anything changed. Reports each
/// old→new form on the verbose transcript; arity anomalies are warned about
/// and left unchanged (the native compiler owns real type checking).
pub fn normalize_text(
    text: &str,
    opts: &NormalizeOptions,
    transcript: &Transcript,
) -> (String, bool) {
    let mut edits: Vec<Edit> = Vec::new();

    for site in grammar::call_sites(text) {
        // A site without a format string is an incomplete parse (a macro
        // definition, say); the resolve pass reports it, nothing here may
        // touch it.
        let Some(format) = &site.format else { continue };

        if opts.extend_names && grammar::is_bare_name(&site.type_name) {
            let n = specifier_count(&format.text);
            if (1..=MAX_PARAM_COUNT).contains(&n) {
                let extended = format!("{}_{n}", site.type_name);
                transcript.detail(format_args!("{} -> {extended}", site.type_name));
                edits.push(Edit {
                    span: site.name_span.clone(),
                    text: extended,
                });
            } else if n != 0 {
                transcript.line(format_args!(
                    "Parse error: {n} % format specifier found inside {}",
                    site.excerpt(text)
                ));
            }
        }

        if site.id.is_none() {
            let variant = StampVariant::for_insertion(&site.type_name, opts.default_variant);
            let inserted = format!(" {}(0),", variant.token());
            transcript.detail(format_args!(
                "{}( -> {}({inserted}",
                site.type_name, site.type_name
            ));
            edits.push(Edit {
                span: site.args_start..site.args_start,
                text: inserted,
            });
        }
    }

    let modified = !edits.is_empty();
    (apply_edits(text, &edits), modified)
}
