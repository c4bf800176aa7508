//! Command line interface.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;

use crate::app::site::{SiteGenerator, SiteOptions, SiteReport, open_analyzer};
use crate::infra::config::{AnalyzerKind, Config, ErrorPolicy};

#[derive(Debug, Parser)]
#[command(
    name = "crossdoc",
    author,
    version,
    about = "Generate side-by-side documentation pages with cross-linked, highlighted source",
    long_about = None
)]
pub struct Cli {
    /// Project directory to document
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Output directory, relative to DIR
    #[arg(long, value_name = "DIR")]
    pub out: Option<String>,

    /// Where definitions, references and doc comments come from
    #[arg(long, value_enum)]
    pub analyzer: Option<AnalyzerKind>,

    /// Analysis dump read by the dump analyzer; implies `--analyzer dump`
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,

    /// Skip files that fail instead of stopping
    #[arg(long)]
    pub keep_going: bool,

    /// Extra config file layered over the user and project config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Layer command line flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(out) = &self.out {
            config.site.out_dir = out.clone();
        }
        if let Some(dump) = &self.dump {
            config.analyzer.dump = Some(
                std::path::absolute(dump)
                    .with_context(|| format!("invalid dump path {}", dump.display()))?,
            );
            config.analyzer.kind = AnalyzerKind::Dump;
        }
        if let Some(kind) = self.analyzer {
            config.analyzer.kind = kind;
        }
        if self.keep_going {
            config.site.on_error = ErrorPolicy::Skip;
        }
        Ok(())
    }
}

/// Generate the site described by `cli`.
pub fn run(cli: &Cli) -> Result<SiteReport> {
    let root = project_root(&cli.dir)?;
    let mut config = Config::load(&root, cli.config.as_deref())?;
    cli.apply(&mut config)?;
    tracing::debug!(root = %root.display(), analyzer = config.analyzer.kind.as_str(), "configured");

    let analyzer = open_analyzer(&root, &config)?;
    let options = SiteOptions::from_config(&root, &config)?;
    SiteGenerator::new(analyzer.as_ref(), options).generate()
}

fn project_root(dir: &Path) -> Result<PathBuf> {
    let root = dir
        .canonicalize()
        .with_context(|| format!("project directory does not exist: {}", dir.display()))?;
    ensure!(root.is_dir(), "not a directory: {}", root.display());
    Ok(root)
}
