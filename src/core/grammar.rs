//! Call-site scanner for the TRICE macro family.
//!
//! A hand-rolled byte-level scanner instead of a regex chain: the grammar
//! must tolerate nested parentheses in trailing arguments, multi-line format
//! strings, and escaped quotes, and a lazy `.*)` regex stops at the first
//! `)` it sees inside an argument expression. The scanner tracks string and
//! char literal state and balances parentheses to the true closing call.
//!
//! Recognized family names (case-insensitive): `TRICE`, `TRICE0`, `TRICE_0`,
//! widths `TRICE8|16|32|64`, underscore suffix groups over `[0-9SNBF_]`
//! (e.g. `TRICE8_1`, `TRICE_S`), and `TRICEAssertTrue` / `TRICEAssertFalse`.

use std::ops::Range;

use memchr::{memchr, memchr2};

use crate::core::catalog::TraceId;

/// Timestamp width encoded in the letter casing of the ID-wrapper token.
///
/// The casing is semantically meaningful at decode time, so the variant is
/// carried explicitly instead of re-deriving it from strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StampVariant {
    /// `id` - no timestamp
    Stamp0,
    /// `Id` - 16-bit timestamp
    Stamp16,
    /// `ID` - 32-bit timestamp
    Stamp32,
    /// `iD` - reserved for the short lower-case macro families
    Other,
}

impl StampVariant {
    /// The literal wrapper token for this variant.
    pub fn token(self) -> &'static str {
        match self {
            StampVariant::Stamp0 => "id",
            StampVariant::Stamp16 => "Id",
            StampVariant::Stamp32 => "ID",
            StampVariant::Other => "iD",
        }
    }

    /// Inverse of [`token`](Self::token). Exact case match on the two letters.
    pub fn from_token(tok: &str) -> Option<Self> {
        match tok {
            "id" => Some(StampVariant::Stamp0),
            "Id" => Some(StampVariant::Stamp16),
            "ID" => Some(StampVariant::Stamp32),
            "iD" => Some(StampVariant::Other),
            _ => None,
        }
    }

    /// Default variant for newly inserted wrappers, from the configured
    /// stamp size in bits.
    pub fn from_stamp_size(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(StampVariant::Stamp0),
            16 => Some(StampVariant::Stamp16),
            32 => Some(StampVariant::Stamp32),
            _ => None,
        }
    }

    /// Variant to insert into a statement that carries no wrapper yet.
    ///
    /// Macro families spelled with lower-case "ice" (`trice`, `Trice`) take
    /// the reserved `iD` form; the generic upper-case family takes the
    /// configured default.
    pub fn for_insertion(type_name: &str, default: StampVariant) -> StampVariant {
        if type_name.contains("ice") {
            StampVariant::Other
        } else {
            default
        }
    }
}

/// The ID-wrapper token of a call site, e.g. `Id( 1002)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdToken {
    /// Byte span of the whole wrapper, first letter through its `)`.
    pub span: Range<usize>,
    /// Case variant of the two-letter token.
    pub variant: StampVariant,
    /// The numeric value inside the wrapper. 0 means unassigned.
    pub value: TraceId,
}

/// The first quoted string of a call site, escapes preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpan {
    /// Byte span including both quotes.
    pub span: Range<usize>,
    /// Contents between the quotes, escape sequences kept textual.
    pub text: String,
}

/// One textual occurrence of a trace macro invocation.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Macro name through the matching closing parenthesis.
    pub span: Range<usize>,
    /// Byte span of the macro name.
    pub name_span: Range<usize>,
    /// Macro name exactly as written (case preserved).
    pub type_name: String,
    /// Byte offset just after the opening `(` of the invocation.
    pub args_start: usize,
    /// ID wrapper, if the statement carries one.
    pub id: Option<IdToken>,
    /// First quoted string, if any.
    pub format: Option<FormatSpan>,
}

impl CallSite {
    /// Short single-line excerpt of the invocation for diagnostics.
    pub fn excerpt<'a>(&self, text: &'a str) -> &'a str {
        let s = &text[self.span.clone()];
        let cut = s.len().min(60);
        let cut = memchr(b'\n', s.as_bytes()).map_or(cut, |nl| nl.min(cut));
        // back off to a char boundary
        let mut cut = cut;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        &s[..cut]
    }
}

/// Lazy, restartable iterator over the call sites of a text buffer.
pub fn call_sites(text: &str) -> CallSites<'_> {
    CallSites { text, pos: 0 }
}

pub struct CallSites<'a> {
    text: &'a str,
    pos: usize,
}

impl Iterator for CallSites<'_> {
    type Item = CallSite;

    fn next(&mut self) -> Option<CallSite> {
        let bytes = self.text.as_bytes();

        while self.pos < bytes.len() {
            // Candidate: 't' or 'T' at a word boundary.
            let rel = memchr2(b't', b'T', &bytes[self.pos..])?;
            let start = self.pos + rel;

            if start > 0 && is_ident_byte(bytes[start - 1]) {
                self.pos = start + 1;
                continue;
            }
            if !starts_with_trice(&bytes[start..]) {
                self.pos = start + 1;
                continue;
            }

            // Consume the rest of the identifier and validate the family suffix.
            let mut name_end = start + 5;
            while name_end < bytes.len() && is_ident_byte(bytes[name_end]) {
                name_end += 1;
            }
            let name = &self.text[start..name_end];
            if !family_suffix_ok(&name[5..]) {
                self.pos = name_end;
                continue;
            }

            // The invocation's opening parenthesis.
            let mut open = name_end;
            while open < bytes.len() && bytes[open].is_ascii_whitespace() {
                open += 1;
            }
            if open >= bytes.len() || bytes[open] != b'(' {
                self.pos = name_end;
                continue;
            }

            // Balance parentheses to the true closing call, skipping over
            // string and char literals.
            let Some(close) = matching_paren(bytes, open) else {
                // Unterminated call; do not rescan this name.
                self.pos = name_end;
                continue;
            };

            let args_start = open + 1;
            let format = first_string(self.text, args_start, close);
            // The wrapper precedes the format string by construction.
            let id_limit = format.as_ref().map_or(close, |f| f.span.start);
            let id = find_id_token(self.text, args_start, id_limit);

            self.pos = close + 1;
            return Some(CallSite {
                span: start..close + 1,
                name_span: start..name_end,
                type_name: name.to_string(),
                args_start,
                id,
                format,
            });
        }
        None
    }
}

/// True for macro names lacking an explicit `_N` arity suffix, i.e. exactly
/// `TRICE` or `TRICE8|16|32|64` in any casing. Only these are candidates for
/// arity extension.
pub fn is_bare_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "trice" | "trice8" | "trice16" | "trice32" | "trice64"
    )
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn starts_with_trice(bytes: &[u8]) -> bool {
    bytes.len() >= 5 && bytes[..5].eq_ignore_ascii_case(b"trice")
}

/// Validates the identifier tail after the `trice` prefix: empty, `0`, `_0`,
/// `AssertTrue`/`AssertFalse`, or an optional width followed by underscore
/// groups over `[0-9SNBF_]`.
fn family_suffix_ok(rest: &str) -> bool {
    if rest.is_empty() {
        return true;
    }
    let lower = rest.to_ascii_lowercase();
    if matches!(lower.as_str(), "0" | "_0" | "asserttrue" | "assertfalse") {
        return true;
    }
    let tail = ["64", "32", "16", "8"]
        .iter()
        .find_map(|w| lower.strip_prefix(w))
        .unwrap_or(&lower);
    if tail.is_empty() {
        return true;
    }
    tail.starts_with('_')
        && tail
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'_' | b's' | b'n' | b'b' | b'f'))
}

/// Index of the `)` matching the `(` at `open`, honoring literals.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    debug_assert_eq!(bytes[open], b'(');
    let mut depth = 1usize;
    let mut i = open + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i)?;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the index of the closing quote of the literal starting at `i`.
fn skip_literal(bytes: &[u8], i: usize) -> Option<usize> {
    let quote = bytes[i];
    let mut j = i + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b if b == quote => return Some(j),
            _ => j += 1,
        }
    }
    None
}

/// First double-quoted string inside `from..to`, escapes preserved.
fn first_string(text: &str, from: usize, to: usize) -> Option<FormatSpan> {
    let bytes = text.as_bytes();
    let open = from + memchr(b'"', &bytes[from..to])?;
    let close = skip_literal(bytes, open)?;
    Some(FormatSpan {
        span: open..close + 1,
        text: text[open + 1..close].to_string(),
    })
}

/// First well-formed `id(n)` wrapper (any case variant) inside `from..to`.
fn find_id_token(text: &str, from: usize, to: usize) -> Option<IdToken> {
    let bytes = text.as_bytes();
    let mut i = from;

    while i + 1 < to {
        let b0 = bytes[i];
        if !matches!(b0, b'i' | b'I') {
            i += 1;
            continue;
        }
        let b1 = bytes[i + 1];
        let boundary_before = i == 0 || !is_ident_byte(bytes[i - 1]);
        let boundary_after = i + 2 >= bytes.len() || !is_ident_byte(bytes[i + 2]);
        if !matches!(b1, b'd' | b'D') || !boundary_before || !boundary_after {
            i += 1;
            continue;
        }

        // `id` token found; expect `( <digits> )` with optional whitespace.
        let Some(parsed) = parse_wrapper_tail(bytes, i + 2) else {
            i += 2;
            continue;
        };
        let (end, digits) = parsed;
        // A numeral overflowing the ID domain is out of any valid range;
        // treat it as unassigned so the wrapper is rewritten, not doubled.
        let value = text[digits.clone()].parse::<TraceId>().unwrap_or(0);
        let tok = &text[i..i + 2];
        return Some(IdToken {
            span: i..end,
            variant: StampVariant::from_token(tok)?,
            value,
        });
    }
    None
}

/// Parses `\s*(\s*\d+\s*)` starting at `at`; returns (one past the `)`,
/// span of the digits).
fn parse_wrapper_tail(bytes: &[u8], at: usize) -> Option<(usize, Range<usize>)> {
    let mut i = at;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b'(' {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let digits_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    let digits_end = i;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i >= bytes.len() || bytes[i] != b')' {
        return None;
    }
    Some((i + 1, digits_start..digits_end))
}
