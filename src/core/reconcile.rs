//! Tree walker / reconciler: brings source files and catalogs into a
//! consistent state.
//!
//! Two terminal passes exist. `refresh` is a read-only walk that seeds the
//! catalogs from an already-tagged tree. `update` is the read-write walk:
//! per file it (a) normalizes arity and ID presence, (b) resolves every call
//! site's ID against the catalog store, rewriting stale or zero wrapper
//! numerals, and (c) re-scans the final text so location entries reflect the
//! rewritten line numbers. Files are processed in parallel; the catalog
//! store is the only shared mutable state. One unreadable file aborts the
//! whole walk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use memchr::memchr_iter;
use rayon::prelude::*;
use tracing::debug;

use crate::cli::{AppContext, RefreshArgs, UpdateArgs};
use crate::core::alloc::Strategy;
use crate::core::catalog::{CatalogStore, TraceFormat, TraceId, TraceLocation};
use crate::core::grammar::{self, StampVariant};
use crate::core::normalize::{self, Edit, NormalizeOptions};
use crate::infra::transcript::Transcript;
use crate::infra::walk::SourceWalker;
use crate::infra::{config, persist};

/// Immutable configuration of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub roots: Vec<PathBuf>,
    pub format_catalog: PathBuf,
    pub location_catalog: PathBuf,
    pub id_min: TraceId,
    pub id_max: TraceId,
    pub strategy: Strategy,
    pub default_variant: StampVariant,
    pub extend_names: bool,
    pub ignore_patterns: Vec<String>,
    pub dry_run: bool,
}

/// What a completed pass did.
#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub files_scanned: usize,
    pub files_modified: usize,
    pub catalog_len: usize,
    pub catalogs_modified: bool,
}

/// Read-only pass: seed the catalogs from every well-formed call site that
/// already carries a non-zero ID. Never rewrites files, never allocates.
pub fn refresh(opts: &ReconcileOptions, transcript: &Transcript) -> Result<Summary> {
    let store = load_store(opts)?;
    let files = SourceWalker::new(&opts.ignore_patterns)?.source_files(&opts.roots)?;
    debug!(files = files.len(), "refresh pass");

    files.par_iter().try_for_each(|path| -> Result<()> {
        let text = read_source(path)?;
        transcript.detail(path.display());
        scan_into_catalogs(&text, &base_name(path), &store, transcript);
        Ok(())
    })?;

    let summary = Summary {
        files_scanned: files.len(),
        files_modified: 0,
        catalog_len: store.len(),
        catalogs_modified: store.catalogs_modified(),
    };
    persist_catalogs(opts, &store)?;
    Ok(summary)
}

/// Read-write pass: normalize, resolve, rewrite, and refresh locations.
pub fn update(opts: &ReconcileOptions, transcript: &Transcript) -> Result<Summary> {
    let store = load_store(opts)?;
    let files = SourceWalker::new(&opts.ignore_patterns)?.source_files(&opts.roots)?;
    debug!(files = files.len(), dry_run = opts.dry_run, "update pass");

    let modified: Vec<bool> = files
        .par_iter()
        .map(|path| update_file(path, opts, &store, transcript))
        .collect::<Result<_>>()?;

    let summary = Summary {
        files_scanned: files.len(),
        files_modified: modified.iter().filter(|&&m| m).count(),
        catalog_len: store.len(),
        catalogs_modified: store.catalogs_modified(),
    };
    persist_catalogs(opts, &store)?;
    Ok(summary)
}

fn update_file(
    path: &Path,
    opts: &ReconcileOptions,
    store: &CatalogStore,
    transcript: &Transcript,
) -> Result<bool> {
    let text = read_source(path)?;
    transcript.detail(path.display());

    // (a) arity and ID-presence normalization over the raw text.
    let norm_opts = NormalizeOptions {
        extend_names: opts.extend_names,
        default_variant: opts.default_variant,
    };
    let (normalized, norm_modified) = normalize::normalize_text(&text, &norm_opts, transcript);

    // (b) resolve every call site of the once-normalized text.
    let mut edits: Vec<Edit> = Vec::new();
    for site in grammar::call_sites(&normalized) {
        let Some(format) = &site.format else {
            transcript.line(format_args!(
                "no format string found inside {}",
                site.excerpt(&normalized)
            ));
            continue;
        };
        let Some(id_tok) = &site.id else {
            transcript.line(format_args!(
                "no ID wrapper found inside {}",
                site.excerpt(&normalized)
            ));
            continue;
        };

        let tf = TraceFormat {
            type_name: site.type_name.clone(),
            format_string: format.text.clone(),
        };
        let resolved = store.resolve(id_tok.value, &tf)?;
        if resolved.fresh && id_tok.value > 0 {
            transcript.line(format_args!(
                "ID {} already used differently, replacing with {}.",
                id_tok.value, resolved.id
            ));
        }
        if resolved.id != id_tok.value {
            // Case variant kept, numeral right-aligned to width 5.
            let replacement = format!("{}({:>5})", id_tok.variant.token(), resolved.id);
            transcript.detail(format_args!(
                "{} -> {replacement}",
                &normalized[id_tok.span.clone()]
            ));
            edits.push(Edit {
                span: id_tok.span.clone(),
                text: replacement,
            });
        }
    }
    let resolve_modified = !edits.is_empty();
    let final_text = normalize::apply_edits(&normalized, &edits);

    // (c) line numbers shifted during (a)/(b); rebuild locations from the
    // final text.
    scan_into_catalogs(&final_text, &base_name(path), store, transcript);

    let modified = norm_modified || resolve_modified;
    if modified && !opts.dry_run {
        fs::write(path, &final_text)
            .with_context(|| format!("failed to change {}", path.display()))?;
        transcript.detail(format_args!("Changed: {}", path.display()));
    } else if modified {
        transcript.detail(format_args!("Would change: {}", path.display()));
    }
    Ok(modified)
}

/// Scan-only extraction: registers every call site carrying a non-zero ID
/// together with its current location. Shared by the refresh pass and by the
/// post-rewrite location rebuild.
fn scan_into_catalogs(text: &str, file: &str, store: &CatalogStore, transcript: &Transcript) {
    let bytes = text.as_bytes();
    let mut line: u32 = 1;
    let mut counted_to = 0;

    for site in grammar::call_sites(text) {
        line += memchr_iter(b'\n', &bytes[counted_to..site.span.start]).count() as u32;
        counted_to = site.span.start;

        let (Some(id_tok), Some(format)) = (&site.id, &site.format) else {
            continue;
        };
        if id_tok.value == 0 {
            continue;
        }
        let tf = TraceFormat {
            type_name: site.type_name.clone(),
            format_string: format.text.clone(),
        };
        let location = TraceLocation {
            file: file.to_string(),
            line,
        };
        store.observe(id_tok.value, &tf, location, transcript);
    }
}

fn load_store(opts: &ReconcileOptions) -> Result<CatalogStore> {
    let formats = persist::load_formats(&opts.format_catalog)?;
    // The location catalog is a pure cache of the current tree: it is read
    // for validation but rebuilt from scratch, dropping stale entries.
    let _ = persist::load_locations(&opts.location_catalog)?;
    Ok(CatalogStore::new(
        formats,
        opts.id_min,
        opts.id_max,
        opts.strategy,
    ))
}

fn persist_catalogs(opts: &ReconcileOptions, store: &CatalogStore) -> Result<()> {
    if opts.dry_run {
        return Ok(());
    }
    persist::save_formats(&opts.format_catalog, &store.formats())?;
    persist::save_locations(&opts.location_catalog, &store.locations())?;
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// CLI entry point for the `update` subcommand.
pub fn run_update(args: UpdateArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config::load_config()?;
    let opts = ReconcileOptions {
        roots: args.src,
        format_catalog: args.til.unwrap_or(cfg.format_catalog),
        location_catalog: args.li.unwrap_or(cfg.location_catalog),
        id_min: args.id_min.unwrap_or(cfg.id_min),
        id_max: args.id_max.unwrap_or(cfg.id_max),
        strategy: args.strategy.unwrap_or(cfg.strategy),
        default_variant: stamp_variant(args.stamp_size.unwrap_or(cfg.stamp_size))?,
        extend_names: args.extend_names.unwrap_or(cfg.extend_names),
        ignore_patterns: merged_ignores(cfg.ignore_patterns, args.ignore),
        dry_run: ctx.dry_run,
    };
    anyhow::ensure!(
        opts.id_min > 0 && opts.id_min <= opts.id_max,
        "invalid ID range [{}, {}]",
        opts.id_min,
        opts.id_max
    );

    let transcript = Transcript::stdout(ctx.verbose && !ctx.quiet);
    let summary = update(&opts, &transcript)?;
    report(&summary, &opts, ctx, &transcript);
    Ok(())
}

/// CLI entry point for the `refresh` subcommand.
pub fn run_refresh(args: RefreshArgs, ctx: &AppContext) -> Result<()> {
    let cfg = config::load_config()?;
    let opts = ReconcileOptions {
        roots: args.src,
        format_catalog: args.til.unwrap_or(cfg.format_catalog),
        location_catalog: args.li.unwrap_or(cfg.location_catalog),
        id_min: cfg.id_min,
        id_max: cfg.id_max,
        strategy: cfg.strategy,
        default_variant: stamp_variant(cfg.stamp_size)?,
        extend_names: false,
        ignore_patterns: merged_ignores(cfg.ignore_patterns, args.ignore),
        dry_run: ctx.dry_run,
    };

    let transcript = Transcript::stdout(ctx.verbose && !ctx.quiet);
    let summary = refresh(&opts, &transcript)?;
    report(&summary, &opts, ctx, &transcript);
    Ok(())
}

fn report(summary: &Summary, opts: &ReconcileOptions, ctx: &AppContext, transcript: &Transcript) {
    if ctx.quiet {
        return;
    }
    let suffix = if opts.dry_run { " (dry run, nothing written)" } else { "" };
    transcript.line(format_args!(
        "{} file(s) modified, {} IDs in {}{suffix}",
        summary.files_modified,
        summary.catalog_len,
        opts.format_catalog.display()
    ));
}

fn stamp_variant(bits: u32) -> Result<StampVariant> {
    StampVariant::from_stamp_size(bits)
        .with_context(|| format!("stamp size must be 0, 16 or 32, got {bits}"))
}

fn merged_ignores(mut from_config: Vec<String>, from_cli: Vec<String>) -> Vec<String> {
    from_config.extend(from_cli);
    from_config
}
