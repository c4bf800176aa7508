//! Source file discovery.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder, WalkState};

use crate::infra::config::Config;

const CROSSDOC_IGNORE: &str = ".crossdocignore";

/// Reason a discovered file gets no page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    LargeFile,
    BinaryFile,
}

/// Files found under a project root, as `/`-separated paths relative to it.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub files: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
    pub root: PathBuf,
}

/// Configuration inputs for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    /// Directories below the root that are never descended into, such as the output directory.
    pub exclude: Vec<PathBuf>,
    pub config: Config,
}

impl ScannerConfig {
    pub fn from_root(root: PathBuf, config: Config) -> Self {
        Self {
            root,
            max_file_size: 1024 * 1024,
            exclude: Vec::new(),
            config,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }
}

/// Walks a project respecting `.gitignore`, hidden files and configured ignore globs.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, cfg: &ScannerConfig) -> Result<ScanResult> {
        let matcher = Arc::new(IgnoreMatcher::for_project(&cfg.root, &cfg.config)?);
        let mut builder = WalkBuilder::new(&cfg.root);
        builder.git_ignore(true).hidden(true);

        let root = cfg.root.clone();
        let exclude: Vec<PathBuf> = cfg.exclude.iter().map(|dir| root.join(dir)).collect();
        builder.filter_entry({
            let matcher = matcher.clone();
            move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if exclude.iter().any(|dir| entry.path().starts_with(dir)) {
                    return false;
                }
                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                !matcher.should_skip(rel)
            }
        });

        let found = Mutex::new(Vec::new());
        let cfg_ref = Arc::new(cfg.clone());

        builder.build_parallel().run(|| {
            let found = &found;
            let cfg = cfg_ref.clone();
            Box::new(move |result| match result {
                Ok(entry) => {
                    if let Some(file) = process_entry(&entry, &cfg)
                        && let Ok(mut guard) = found.lock()
                    {
                        guard.push(file);
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    tracing::warn!(error = %err, "scanner error");
                    WalkState::Continue
                }
            })
        });

        let mut found = found.into_inner().unwrap_or_default();
        found.sort_by(|a, b| a.0.cmp(&b.0));

        let mut result = ScanResult {
            root: cfg.root.clone(),
            ..ScanResult::default()
        };
        for (path, skipped) in found {
            match skipped {
                Some(reason) => {
                    tracing::debug!(file = %path, ?reason, "skipping file");
                    result.skipped.push((path, reason));
                }
                None => result.files.push(path),
            }
        }
        Ok(result)
    }
}

fn process_entry(entry: &DirEntry, cfg: &ScannerConfig) -> Option<(String, Option<SkipReason>)> {
    let path = entry.path();
    let metadata = entry.metadata().ok()?;
    if !metadata.is_file() {
        return None;
    }

    let skipped = if metadata.len() > cfg.max_file_size {
        Some(SkipReason::LargeFile)
    } else if is_probably_binary(path) {
        Some(SkipReason::BinaryFile)
    } else {
        None
    };

    Some((to_display_path(&cfg.root, path), skipped))
}

/// Relative path with `/` separators on every platform.
fn to_display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_probably_binary(path: &Path) -> bool {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut buf = [0u8; 1024];
    match file.read(&mut buf) {
        Ok(0) => false,
        Ok(n) => buf[..n].contains(&0),
        Err(_) => false,
    }
}

/// Matches project-relative paths against the configured ignore globs and `.crossdocignore`.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    globs: GlobSet,
}

impl IgnoreMatcher {
    pub fn for_project(root: &Path, config: &Config) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for glob in &config.ignore.globs {
            let glob = Glob::new(glob).with_context(|| format!("invalid ignore glob '{glob}'"))?;
            builder.add(glob);
        }

        for pattern in load_crossdocignore(root)? {
            for expanded in expand_dir_pattern(&pattern) {
                let glob = Glob::new(&expanded)
                    .with_context(|| format!("invalid {CROSSDOC_IGNORE} pattern '{pattern}'"))?;
                builder.add(glob);
            }
        }

        builder.add(Glob::new(CROSSDOC_IGNORE)?);

        let globs = builder.build().context("failed to build ignore matcher")?;
        Ok(Self { globs })
    }

    pub fn should_skip(&self, rel: impl AsRef<Path>) -> bool {
        self.globs.is_match(rel.as_ref())
    }

    /// Drop ignored entries from an analyzer's file list, keeping order.
    pub fn retain(&self, files: Vec<String>) -> Vec<String> {
        files
            .into_iter()
            .filter(|file| {
                let rel = file.strip_prefix("./").unwrap_or(file);
                let skip = self.should_skip(rel);
                if skip {
                    tracing::debug!(file = %file, "ignored by config");
                }
                !skip
            })
            .collect()
    }
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

fn load_crossdocignore(root: &Path) -> Result<Vec<String>> {
    let path = root.join(CROSSDOC_IGNORE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        patterns.push(trimmed.to_owned());
    }
    Ok(patterns)
}
