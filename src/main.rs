use anyhow::{Context, Result};
use clap::Parser;
use std::{fs, path::PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tapdigest::{
    config::{DEFAULT_RA, DEFAULT_SCHEMA},
    digest,
    schema::{merge_tap_json, render_create_table, write_mapping_json, write_tap_json},
    Catalog, Config, Diagnostic,
};

/// Build TAP metadata and a FITS column mapping from an annotated SDSS SQL file.
#[derive(Parser, Debug)]
#[command(name = "sdss2tap", version, about, long_about = None)]
struct Args {
    /// FITS binary table (or a JSON object of column name → TFORM code)
    fits: PathBuf,

    /// Annotated SQL table definition
    sql: PathBuf,

    /// TAP schema name
    #[arg(short = 's', long, default_value = DEFAULT_SCHEMA)]
    schema: String,

    /// Table name; defaults to the name on the CREATE TABLE line
    #[arg(short = 't', long)]
    table: Option<String>,

    /// Right ascension column the derived positional columns are computed from
    #[arg(short = 'r', long, value_name = "COLUMN", default_value = DEFAULT_RA)]
    ra: String,

    /// Schema description
    #[arg(short = 'd', long, default_value = "")]
    description: String,

    /// Write annotated DDL here
    #[arg(short = 'o', long)]
    output_sql: Option<PathBuf>,

    /// Write the TAP record as JSON here
    #[arg(short = 'j', long)]
    output_json: Option<PathBuf>,

    /// Merge the TAP record into this existing JSON document
    #[arg(short = 'm', long)]
    merge_json: Option<PathBuf>,

    /// Write the final column mapping as JSON here
    #[arg(short = 'M', long)]
    output_mapping: Option<PathBuf>,

    /// Print debug messages
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Config {
        let mut cfg = Config::new(&self.schema)
            .with_description(&self.description)
            .with_ra(&self.ra);
        if let Some(t) = &self.table {
            cfg = cfg.with_table(t);
        }
        cfg
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    info!(fits = %args.fits.display(), sql = %args.sql.display(), "startup");

    let catalog = Catalog::from_path(&args.fits)
        .with_context(|| format!("reading catalog columns from {}", args.fits.display()))?;
    info!("{} columns in {}", catalog.len(), args.fits.display());

    let sql = fs::read_to_string(&args.sql)
        .with_context(|| format!("reading {}", args.sql.display()))?;
    let result = digest(args.config(), &sql, &catalog)
        .with_context(|| format!("processing {}", args.sql.display()))?;

    let dropped = result
        .diagnostics
        .iter()
        .filter(|d| matches!(d, Diagnostic::Dropped { .. }))
        .count();
    if dropped > 0 {
        warn!("{} FITS columns will not be loaded", dropped);
    }

    if let Some(path) = &args.output_sql {
        fs::write(path, render_create_table(&result.schema, &result.mapping))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.output_json {
        write_tap_json(path, &result.schema)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = &args.merge_json {
        merge_tap_json(path, &result.schema)
            .with_context(|| format!("merging into {}", path.display()))?;
        info!("merged into {}", path.display());
    }
    if let Some(path) = &args.output_mapping {
        write_mapping_json(path, &result.mapping)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
