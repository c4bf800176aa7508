//! Configuration management utilities.

use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static PROJECT_CONFIG_PATH: &str = ".crossdoc/config.toml";

/// Layered configuration loaded from defaults, user, project, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub site: Site,
    #[serde(default)]
    pub analyzer: Analyzer,
    #[serde(default)]
    pub highlight: Highlight,
    #[serde(default)]
    pub ignore: Ignore,
}

/// What to do with a file whose pages cannot be composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop the run at the first failing file.
    #[default]
    Abort,
    /// Log the failure and leave the page out.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default = "Site::default_out_dir")]
    pub out_dir: String,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Path to a page template replacing the built-in one.
    #[serde(default)]
    pub template: Option<String>,
}

impl Site {
    fn default_out_dir() -> String {
        "docs".into()
    }
}

impl Default for Site {
    fn default() -> Self {
        Self {
            out_dir: Self::default_out_dir(),
            on_error: ErrorPolicy::default(),
            template: None,
        }
    }
}

/// Source of definitions, references, and doc comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum AnalyzerKind {
    /// Run the srclib `src` command line tool.
    #[default]
    Srclib,
    /// Read a pre-computed analysis dump.
    Dump,
    /// No analysis; highlighted source only.
    Plain,
}

impl AnalyzerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Srclib => "srclib",
            AnalyzerKind::Dump => "dump",
            AnalyzerKind::Plain => "plain",
        }
    }
}

impl FromStr for AnalyzerKind {
    type Err = AnalyzerKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "srclib" | "src" => Ok(AnalyzerKind::Srclib),
            "dump" | "json" => Ok(AnalyzerKind::Dump),
            "plain" | "none" => Ok(AnalyzerKind::Plain),
            other => Err(AnalyzerKindParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Error returned when parsing an [`AnalyzerKind`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AnalyzerKindParseError {
    #[error("unknown analyzer '{0}'")]
    UnknownKind(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    #[serde(default)]
    pub kind: AnalyzerKind,
    #[serde(default = "Analyzer::default_program")]
    pub program: String,
    /// Analysis dump used by the `dump` analyzer.
    #[serde(default)]
    pub dump: Option<PathBuf>,
}

impl Analyzer {
    fn default_program() -> String {
        "src".into()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            kind: AnalyzerKind::default(),
            program: Self::default_program(),
            dump: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Highlight {
    /// CSS class overrides keyed by token category; an empty class hides the category.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ignore {
    #[serde(default)]
    pub globs: Vec<String>,
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    out_dir: Option<String>,
    analyzer: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            out_dir: env::var("CROSSDOC_OUT_DIR").ok(),
            analyzer: env::var("CROSSDOC_ANALYZER").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(out_dir: &str, analyzer: &str) -> Self {
        Self {
            out_dir: Some(out_dir.to_owned()),
            analyzer: Some(analyzer.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration for the project at `root`: defaults, user config, the
    /// project's `.crossdoc/config.toml`, an optional explicit file, then env overrides.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let project = Some(root.join(PROJECT_CONFIG_PATH));
        Self::load_with_layers(global, project, explicit, env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        project: Option<PathBuf>,
        explicit: Option<&Path>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            tracing::debug!(path = %global_path.display(), "loading user config");
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(project_path) = project.filter(|path| path.exists()) {
            tracing::debug!(path = %project_path.display(), "loading project config");
            layers.push(Self::from_file(&project_path)?);
        }

        if let Some(path) = explicit {
            layers.push(Self::from_file(path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            site: merge_site(self.site, other.site),
            analyzer: merge_analyzer(self.analyzer, other.analyzer),
            highlight: merge_highlight(self.highlight, other.highlight),
            ignore: merge_ignore(self.ignore, other.ignore),
        }
    }
}

fn merge_site(base: Site, overlay: Site) -> Site {
    Site {
        out_dir: if overlay.out_dir != Site::default_out_dir() {
            overlay.out_dir
        } else {
            base.out_dir
        },
        on_error: if overlay.on_error != ErrorPolicy::default() {
            overlay.on_error
        } else {
            base.on_error
        },
        template: overlay.template.or(base.template),
    }
}

fn merge_analyzer(base: Analyzer, overlay: Analyzer) -> Analyzer {
    Analyzer {
        kind: if overlay.kind != AnalyzerKind::default() {
            overlay.kind
        } else {
            base.kind
        },
        program: if overlay.program != Analyzer::default_program() {
            overlay.program
        } else {
            base.program
        },
        dump: overlay.dump.or(base.dump),
    }
}

fn merge_highlight(mut base: Highlight, overlay: Highlight) -> Highlight {
    base.classes.extend(overlay.classes);
    base
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        globs: globs.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("crossdoc/config.toml"))
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(out_dir) = env.out_dir {
        config.site.out_dir = out_dir;
    }
    if let Some(analyzer) = env.analyzer {
        config.analyzer.kind = analyzer
            .parse()
            .context("invalid CROSSDOC_ANALYZER value")?;
    }
    Ok(config)
}
