use anyhow::Result;
use clap::Parser;
use tracetag::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics go to stderr; the rewrite transcript owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Update(args) => tracetag::core::update_run(args, &ctx),
        Commands::Refresh(args) => tracetag::core::refresh_run(args, &ctx),
        Commands::Zero(args) => tracetag::core::zero_run(args, &ctx),
        Commands::Clean(args) => tracetag::core::clean_run(args, &ctx),
        Commands::Init(args) => tracetag::infra::config::init(args, &ctx),
        Commands::Completions(args) => tracetag::completion::run(args),
    }
}
