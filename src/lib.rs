//! **tracetag** - Trace-ID reconciliation for embedded C/C++ source trees
//!
//! Scans a tree for TRICE-family logging macro call sites, assigns each
//! invocation a globally unique numeric ID, rewrites the placeholder in
//! place, and keeps two persistent catalogs in sync: ID→format (the decode
//! contract) and ID→location (diagnostics). Re-running on unchanged input
//! changes nothing.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Reconciliation engine - scanning, normalization, allocation, rewriting
pub mod core {
    /// Call-site scanner for the TRICE macro family and the ID-wrapper
    /// stamp variants
    pub mod grammar;
    pub use grammar::{CallSite, StampVariant, call_sites};

    /// Arity-suffix and ID-presence normalization as span edits
    pub mod normalize;

    /// Shared catalog store (ID→format, format→ID, ID→location)
    pub mod catalog;
    pub use catalog::{CatalogStore, TraceFormat, TraceId, TraceLocation};

    /// Fresh-ID allocation inside a bounded range
    pub mod alloc;
    pub use alloc::Strategy;

    /// Tree walker / reconciler: refresh and update passes
    pub mod reconcile;
    pub use reconcile::{run_refresh as refresh_run, run_update as update_run};

    /// `zero` and `clean` tree operations
    pub mod scrub;
    pub use scrub::{run_clean as clean_run, run_zero as zero_run};
}

/// Infrastructure - configuration, walking, persistence, observability
pub mod infra {
    /// Configuration management with TOML support
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Gitignore-aware C/C++ source walking
    pub mod walk;
    pub use walk::SourceWalker;

    /// Canonical catalog artifact serialization
    pub mod persist;

    /// Rewrite/conflict transcript sink
    pub mod transcript;
    pub use transcript::Transcript;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{CatalogStore, Strategy, TraceFormat, TraceId, TraceLocation};
pub use crate::infra::{Config, SourceWalker, Transcript, load_config};
