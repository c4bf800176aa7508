//! Analyzer backed by the srclib `src` command line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::model::Definition;
use crate::infra::analyzer::{Analyzer, FileAnalysis, null_as_empty};

/// A `src` invocation that exited unsuccessfully.
#[derive(Debug, thiserror::Error)]
#[error("command {argv:?} failed ({status}): {stdout}{stderr}")]
pub struct CommandError {
    pub argv: Vec<String>,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

/// srclib produced no files, which almost always means no language toolchains are installed.
#[derive(Debug, thiserror::Error)]
#[error(
    "srclib could not find any files for {root}; have you installed any language toolchains? \
     If not, run 'src toolchain install-std'"
)]
pub struct NoFilesFound {
    pub root: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceUnit {
    #[serde(default, deserialize_with = "null_as_empty")]
    files: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DefList {
    #[serde(default, deserialize_with = "null_as_empty")]
    defs: Vec<Definition>,
}

#[derive(Debug, Clone)]
pub struct SrclibAnalyzer {
    program: String,
    root: PathBuf,
}

impl SrclibAnalyzer {
    /// Check that `program` runs and bind it to the project at `root`.
    pub fn new(program: impl Into<String>, root: &Path) -> Result<Self> {
        let analyzer = Self {
            program: program.into(),
            root: root.to_path_buf(),
        };
        let version = analyzer
            .run(vec!["version".into()])
            .with_context(|| format!("srclib ('{}') is not usable", analyzer.program))?;
        tracing::debug!(version = %String::from_utf8_lossy(&version).trim(), "found srclib");
        Ok(analyzer)
    }

    fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>> {
        let argv: Vec<String> = std::iter::once(self.program.clone())
            .chain(args.iter().map(|arg| arg.to_string_lossy().into_owned()))
            .collect();
        tracing::debug!(?argv, "running");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("failed to spawn {argv:?}"))?;

        if !output.status.success() {
            return Err(CommandError {
                argv,
                status: output.status.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(output.stdout)
    }

    fn run_json<T: DeserializeOwned>(&self, args: Vec<OsString>) -> Result<T> {
        let describe = format!("{} {:?}", self.program, args);
        let stdout = self.run(args)?;
        serde_json::from_slice(&stdout).with_context(|| format!("unexpected output from {describe}"))
    }

    fn list_args(&self, file: &str, filters: &[&str]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["api".into(), "list".into(), "--file".into()];
        args.push(self.root.join(file).into_os_string());
        args.extend(filters.iter().map(OsString::from));
        args
    }
}

impl Analyzer for SrclibAnalyzer {
    fn name(&self) -> &'static str {
        "srclib"
    }

    fn files(&self) -> Result<Vec<String>> {
        let args = vec!["api".into(), "units".into(), self.root.clone().into_os_string()];
        let stdout = self.run(args)?;
        if stdout.iter().all(u8::is_ascii_whitespace) {
            anyhow::bail!("src api units produced no output for {}", self.root.display());
        }
        let units: Vec<SourceUnit> =
            serde_json::from_slice(&stdout).context("unexpected output from src api units")?;

        let files: Vec<String> = units.into_iter().flat_map(|unit| unit.files).collect();
        if files.is_empty() {
            return Err(NoFilesFound {
                root: self.root.display().to_string(),
            }
            .into());
        }
        tracing::debug!(files = files.len(), "srclib listed files");
        Ok(files)
    }

    fn definitions(&self, file: &str) -> Result<Vec<Definition>> {
        let list: DefList = self.run_json(self.list_args(file, &["--no-refs", "--no-docs"]))?;
        Ok(list.defs)
    }

    fn file_analysis(&self, file: &str) -> Result<FileAnalysis> {
        self.run_json(self.list_args(file, &["--no-defs"]))
    }
}
