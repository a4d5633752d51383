//! Tree scrubbing: `zero` resets every wrapper numeral to 0, `clean` removes
//! the wrappers entirely. Neither touches the catalog artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::cli::{AppContext, ScrubArgs};
use crate::core::grammar;
use crate::core::normalize::{Edit, apply_edits};
use crate::infra::config;
use crate::infra::transcript::Transcript;
use crate::infra::walk::SourceWalker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Zero,
    Clean,
}

#[derive(Debug, Clone)]
pub struct ScrubOptions {
    pub roots: Vec<PathBuf>,
    pub ignore_patterns: Vec<String>,
    pub dry_run: bool,
}

/// Rewrites every non-zero wrapper numeral to 0, keeping the case variant.
pub fn zero(opts: &ScrubOptions, transcript: &Transcript) -> Result<usize> {
    scrub(opts, Mode::Zero, transcript)
}

/// Removes every ID wrapper (and its trailing comma) from the tree.
pub fn clean(opts: &ScrubOptions, transcript: &Transcript) -> Result<usize> {
    scrub(opts, Mode::Clean, transcript)
}

fn scrub(opts: &ScrubOptions, mode: Mode, transcript: &Transcript) -> Result<usize> {
    let files = SourceWalker::new(&opts.ignore_patterns)?.source_files(&opts.roots)?;

    let modified: Vec<bool> = files
        .par_iter()
        .map(|path| scrub_file(path, mode, opts.dry_run, transcript))
        .collect::<Result<_>>()?;

    Ok(modified.iter().filter(|&&m| m).count())
}

fn scrub_file(path: &Path, mode: Mode, dry_run: bool, transcript: &Transcript) -> Result<bool> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut edits: Vec<Edit> = Vec::new();
    for site in grammar::call_sites(&text) {
        let Some(id_tok) = &site.id else { continue };
        match mode {
            Mode::Zero => {
                if id_tok.value != 0 {
                    let replacement = format!("{}(0)", id_tok.variant.token());
                    transcript.detail(format_args!(
                        "{} -> {replacement}",
                        &text[id_tok.span.clone()]
                    ));
                    edits.push(Edit {
                        span: id_tok.span.clone(),
                        text: replacement,
                    });
                }
            }
            Mode::Clean => {
                let span = id_tok.span.start..wrapper_removal_end(&text, id_tok.span.end);
                transcript.detail(format_args!("{} -> removed", &text[id_tok.span.clone()]));
                edits.push(Edit {
                    span,
                    text: String::new(),
                });
            }
        }
    }

    let modified = !edits.is_empty();
    if modified && !dry_run {
        fs::write(path, apply_edits(&text, &edits))
            .with_context(|| format!("failed to change {}", path.display()))?;
        transcript.detail(format_args!("Changed: {}", path.display()));
    }
    Ok(modified)
}

/// Extends the removal span past the comma separating the wrapper from the
/// format string, plus any whitespace after it.
fn wrapper_removal_end(text: &str, wrapper_end: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = wrapper_end;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b',' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    } else {
        wrapper_end
    }
}

/// CLI entry point for the `zero` subcommand.
pub fn run_zero(args: ScrubArgs, ctx: &AppContext) -> Result<()> {
    run(args, ctx, Mode::Zero)
}

/// CLI entry point for the `clean` subcommand.
pub fn run_clean(args: ScrubArgs, ctx: &AppContext) -> Result<()> {
    run(args, ctx, Mode::Clean)
}

fn run(args: ScrubArgs, ctx: &AppContext, mode: Mode) -> Result<()> {
    let cfg = config::load_config()?;
    let mut ignore_patterns = cfg.ignore_patterns;
    ignore_patterns.extend(args.ignore);
    let opts = ScrubOptions {
        roots: args.src,
        ignore_patterns,
        dry_run: ctx.dry_run,
    };

    let transcript = Transcript::stdout(ctx.verbose && !ctx.quiet);
    let modified = match mode {
        Mode::Zero => zero(&opts, &transcript)?,
        Mode::Clean => clean(&opts, &transcript)?,
    };
    if !ctx.quiet {
        let suffix = if ctx.dry_run { " (dry run, nothing written)" } else { "" };
        transcript.line(format_args!("{modified} file(s) modified{suffix}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrub_text(text: &str, mode: Mode) -> String {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.c");
        fs::write(&path, text).unwrap();
        let (transcript, _buf) = Transcript::memory(false);
        scrub_file(&path, mode, false, &transcript).unwrap();
        fs::read_to_string(&path).unwrap()
    }

    #[test]
    fn zero_resets_numeral_and_keeps_variant() {
        let out = scrub_text(
            r#"break; case __LINE__: trice( iD(999), "msg:value=%d\n", -1  );"#,
            Mode::Zero,
        );
        assert_eq!(
            out,
            r#"break; case __LINE__: trice( iD(0), "msg:value=%d\n", -1  );"#
        );
    }

    #[test]
    fn zero_leaves_already_zero_sites() {
        let src = r#"TRICE8_1( Id(0), "v=%d\n", v );"#;
        assert_eq!(scrub_text(src, Mode::Zero), src);
    }

    #[test]
    fn clean_removes_wrapper_and_comma() {
        let out = scrub_text(
            r#"break; case __LINE__: trice( iD(999), "msg:value=%d\n", -1  );"#,
            Mode::Clean,
        );
        assert_eq!(
            out,
            r#"break; case __LINE__: trice( "msg:value=%d\n", -1  );"#
        );
    }

    #[test]
    fn clean_handles_padded_wrappers() {
        let out = scrub_text(r#"TRICE16_1( ID( 1004), "v=%u\n", v );"#, Mode::Clean);
        assert_eq!(out, r#"TRICE16_1( "v=%u\n", v );"#);
    }
}
