use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{AppContext, InitArgs};
use crate::core::alloc::Strategy;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Format catalog artifact (ID → macro family + format string)
    pub format_catalog: PathBuf,

    /// Location catalog artifact (ID → file + line, rebuilt every run)
    pub location_catalog: PathBuf,

    /// Smallest ID handed out by the allocator
    pub id_min: i32,

    /// Largest ID handed out by the allocator
    pub id_max: i32,

    /// Search strategy for fresh IDs
    pub strategy: Strategy,

    /// Timestamp width (bits) selecting the wrapper case for new insertions
    pub stamp_size: u32,

    /// Append `_N` parameter-count suffixes to bare macro names
    pub extend_names: bool,

    /// Default ignore patterns (in addition to .gitignore)
    pub ignore_patterns: Vec<String>,
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            format_catalog: PathBuf::from("til.json"),
            location_catalog: PathBuf::from("li.json"),
            id_min: 1000,
            id_max: 65535,
            strategy: Strategy::Random,
            stamp_size: 32,
            extend_names: true,
            ignore_patterns: vec![
                "**/build/**".to_string(),
                "**/cmake-build-*/**".to_string(),
                "**/third_party/**".to_string(),
            ],
        }
    }
}

pub fn load_config() -> Result<Config>
{
    let mut builder = config::Config::builder();

    // Load from config files in priority order
    let config_paths = ["tracetag.toml", ".tracetag.toml"];

    for path in &config_paths
    {
        if Path::new(path).exists()
        {
            builder = builder.add_source(config::File::with_name(path));
            break;
        }
    }

    // Add environment variables with TRACETAG_ prefix
    builder = builder.add_source(config::Environment::with_prefix("TRACETAG"));

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join("tracetag.toml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let config = Config::default();
    let toml_string =
        toml::to_string_pretty(&config).context("Failed to serialize default config")?;

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
