//! Sources of cross-reference data.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::domain::model::{Definition, DocComment, Reference};

/// References and doc comments found in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileAnalysis {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub refs: Vec<Reference>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub docs: Vec<DocComment>,
}

/// Lists encoded by Go tools come out as `null` when empty.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Definitions, references, and doc comments for a project.
///
/// File names are relative to the project root. Implementations are shared
/// across the per-file worker threads.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Every file in the project, in the analyzer's order.
    fn files(&self) -> Result<Vec<String>>;

    /// Definitions declared in `file`.
    fn definitions(&self, file: &str) -> Result<Vec<Definition>>;

    /// References and doc comments in `file`.
    fn file_analysis(&self, file: &str) -> Result<FileAnalysis>;
}

/// One document holding the analysis of a whole project.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnalysisDump {
    #[serde(default, deserialize_with = "null_as_empty")]
    files: Vec<DumpFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DumpFile {
    path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    defs: Vec<Definition>,
    #[serde(default, deserialize_with = "null_as_empty")]
    refs: Vec<Reference>,
    #[serde(default, deserialize_with = "null_as_empty")]
    docs: Vec<DocComment>,
}

/// Reads analysis produced ahead of time, e.g. by a CI job.
#[derive(Debug, Clone, Default)]
pub struct DumpAnalyzer {
    files: Vec<DumpFile>,
    by_path: HashMap<String, usize>,
}

impl DumpAnalyzer {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read analysis dump: {}", path.display()))?;
        Self::from_json(&data)
            .with_context(|| format!("invalid analysis dump: {}", path.display()))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let dump: AnalysisDump = serde_json::from_str(data).context("failed to parse analysis JSON")?;
        let by_path = dump
            .files
            .iter()
            .enumerate()
            .map(|(idx, file)| (file.path.clone(), idx))
            .collect();
        tracing::debug!(files = dump.files.len(), "loaded analysis dump");
        Ok(Self {
            files: dump.files,
            by_path,
        })
    }

    fn file(&self, path: &str) -> Option<&DumpFile> {
        self.by_path.get(path).map(|&idx| &self.files[idx])
    }
}

impl Analyzer for DumpAnalyzer {
    fn name(&self) -> &'static str {
        "dump"
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.files.iter().map(|file| file.path.clone()).collect())
    }

    fn definitions(&self, file: &str) -> Result<Vec<Definition>> {
        Ok(self.file(file).map(|f| f.defs.clone()).unwrap_or_default())
    }

    fn file_analysis(&self, file: &str) -> Result<FileAnalysis> {
        Ok(self
            .file(file)
            .map(|f| FileAnalysis {
                refs: f.refs.clone(),
                docs: f.docs.clone(),
            })
            .unwrap_or_default())
    }
}

/// No cross-reference data; pages show highlighted source only.
#[derive(Debug, Clone, Default)]
pub struct PlainAnalyzer {
    files: Vec<String>,
}

impl PlainAnalyzer {
    pub fn new(files: Vec<String>) -> Self {
        Self { files }
    }
}

impl Analyzer for PlainAnalyzer {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn files(&self) -> Result<Vec<String>> {
        Ok(self.files.clone())
    }

    fn definitions(&self, _file: &str) -> Result<Vec<Definition>> {
        Ok(Vec::new())
    }

    fn file_analysis(&self, _file: &str) -> Result<FileAnalysis> {
        Ok(FileAnalysis::default())
    }
}
