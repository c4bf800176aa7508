//! Site generation: one page per source file plus the shared static assets.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use minijinja::Environment;
use rayon::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::annotate::{AnnotationMerger, ClassMap};
use crate::app::defs::{DefinitionTable, toc_definitions};
use crate::app::scan::{IgnoreMatcher, Scanner, ScannerConfig};
use crate::app::segments::{compose, html_docs};
use crate::app::toc::{definitions_toc, files_toc};
use crate::domain::html::{page_path, resource_prefix};
use crate::domain::model::Segment;
use crate::infra::analyzer::{Analyzer, DumpAnalyzer, PlainAnalyzer};
use crate::infra::assets;
use crate::infra::config::{AnalyzerKind, Config, ErrorPolicy};
use crate::infra::highlight::Highlighter;
use crate::infra::srclib::SrclibAnalyzer;

const PAGE_TEMPLATE: &str = "view.html";

/// Inputs for a generation run.
#[derive(Debug, Clone)]
pub struct SiteOptions {
    pub root: PathBuf,
    pub out_dir: PathBuf,
    pub on_error: ErrorPolicy,
    pub template: Option<PathBuf>,
    pub classes: ClassMap,
    pub ignore: IgnoreMatcher,
}

impl SiteOptions {
    /// Resolve output and template paths against `root`.
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            out_dir: root.join(&config.site.out_dir),
            on_error: config.site.on_error,
            template: config.site.template.as_ref().map(|path| root.join(path)),
            classes: ClassMap::with_overrides(&config.highlight.classes),
            ignore: IgnoreMatcher::for_project(root, config)?,
        })
    }
}

/// A file left out of the site under [`ErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default)]
pub struct SiteReport {
    /// Written pages, relative to the output directory.
    pub pages: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
    pub out_dir: PathBuf,
}

#[derive(Debug, Serialize)]
struct PageContext<'a> {
    title: &'a str,
    resource_prefix: String,
    language: String,
    file_toc: &'a str,
    definition_toc: &'a str,
    segments: Vec<Segment>,
    /// Generation timestamp, RFC 3339.
    time: &'a str,
}

/// Shared, read-only state of the per-file passes.
struct SiteIndex {
    definitions: DefinitionTable,
    definition_tocs: HashMap<String, String>,
    /// File tables of contents keyed by resource prefix.
    file_tocs: HashMap<String, String>,
    /// Files already skipped during indexing.
    failed: HashSet<String>,
    generated_at: String,
}

/// Open the analyzer selected by `config` for the project at `root`.
pub fn open_analyzer(root: &Path, config: &Config) -> Result<Box<dyn Analyzer>> {
    match config.analyzer.kind {
        AnalyzerKind::Srclib => Ok(Box::new(SrclibAnalyzer::new(
            config.analyzer.program.clone(),
            root,
        )?)),
        AnalyzerKind::Dump => {
            let path = config
                .analyzer
                .dump
                .as_ref()
                .ok_or_else(|| anyhow!("the dump analyzer needs a dump file (--dump or analyzer.dump)"))?;
            Ok(Box::new(DumpAnalyzer::load(&root.join(path))?))
        }
        AnalyzerKind::Plain => {
            let scan_cfg = ScannerConfig::from_root(root.to_path_buf(), config.clone())
                .excluding(&config.site.out_dir);
            let scan = Scanner::new().scan(&scan_cfg)?;
            Ok(Box::new(PlainAnalyzer::new(scan.files)))
        }
    }
}

pub struct SiteGenerator<'a> {
    analyzer: &'a dyn Analyzer,
    highlighter: Highlighter,
    options: SiteOptions,
}

impl<'a> SiteGenerator<'a> {
    pub fn new(analyzer: &'a dyn Analyzer, options: SiteOptions) -> Self {
        Self {
            analyzer,
            highlighter: Highlighter::new(),
            options,
        }
    }

    pub fn generate(&self) -> Result<SiteReport> {
        let template = self.load_template()?;
        let env = page_environment(&template)?;

        let out_dir = &self.options.out_dir;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

        let files = self.options.ignore.retain(self.analyzer.files()?);
        tracing::info!(analyzer = self.analyzer.name(), files = files.len(), "generating site");

        let mut report = SiteReport {
            out_dir: out_dir.clone(),
            ..SiteReport::default()
        };
        let index = self.index(&files, &mut report)?;

        let rendered: Vec<(&String, Result<String>)> = files
            .par_iter()
            .filter(|file| !index.failed.contains(*file))
            .map(|file| (file, self.render_page(&env, &index, file)))
            .collect();

        for (file, page) in rendered {
            let html = match page {
                Ok(html) => html,
                Err(err) => {
                    self.handle_failure(file, err, &mut report)?;
                    continue;
                }
            };
            let relative = PathBuf::from(page_path(file));
            let path = out_dir.join(&relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory: {}", parent.display()))?;
            }
            fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(file = %file, page = %path.display(), "wrote page");
            report.pages.push(relative);
        }

        assets::write_static(out_dir)?;
        tracing::info!(
            pages = report.pages.len(),
            skipped = report.skipped.len(),
            out_dir = %out_dir.display(),
            "site generated"
        );
        Ok(report)
    }

    fn load_template(&self) -> Result<String> {
        match &self.options.template {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to load template from path {}", path.display())),
            None => Ok(assets::VIEW_TEMPLATE.to_owned()),
        }
    }

    /// Collect every definition and precompute the tables of contents.
    fn index(&self, files: &[String], report: &mut SiteReport) -> Result<SiteIndex> {
        let mut definitions = DefinitionTable::new();
        let mut definition_tocs = HashMap::new();
        let mut failed = HashSet::new();

        for file in files {
            let defs = match self.analyzer.definitions(file) {
                Ok(defs) => defs,
                Err(err) => {
                    self.handle_failure(file, err.context("failed to list definitions"), report)?;
                    failed.insert(file.clone());
                    continue;
                }
            };
            tracing::debug!(file = %file, definitions = defs.len(), "collected definitions");
            definition_tocs.insert(file.clone(), definitions_toc(file, &toc_definitions(&defs))?);
            definitions.extend(defs);
        }

        let mut file_tocs = HashMap::new();
        for file in files {
            let prefix = resource_prefix(file);
            if !file_tocs.contains_key(&prefix) {
                file_tocs.insert(prefix, files_toc(file, files)?);
            }
        }

        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .context("failed to format generation timestamp")?;

        Ok(SiteIndex {
            definitions,
            definition_tocs,
            file_tocs,
            failed,
            generated_at,
        })
    }

    fn render_page(&self, env: &Environment<'_>, index: &SiteIndex, file: &str) -> Result<String> {
        let path = self.options.root.join(file);
        let source =
            fs::read(&path).with_context(|| format!("failed to read source file {}", path.display()))?;

        let tokens = self.highlighter.tokens(Path::new(file), &source);
        let analysis = self.analyzer.file_analysis(file)?;
        let mut refs = analysis.refs;
        refs.sort_by_key(|reference| reference.start);
        let docs = html_docs(analysis.docs);

        let annotations = AnnotationMerger::new(&index.definitions, &self.options.classes)
            .merge(file, &tokens, &refs)
            .with_context(|| format!("failed to annotate {file}"))?;
        let segments = compose(&source, &annotations, &docs)
            .with_context(|| format!("failed to compose {file}"))?;
        tracing::debug!(
            file = %file,
            tokens = tokens.len(),
            refs = refs.len(),
            docs = docs.len(),
            segments = segments.len(),
            "composed page"
        );

        let resource_prefix = resource_prefix(file);
        let context = PageContext {
            title: file,
            language: self
                .highlighter
                .language(Path::new(file), &String::from_utf8_lossy(&source)),
            file_toc: index.file_tocs.get(&resource_prefix).map_or("", String::as_str),
            definition_toc: index.definition_tocs.get(file).map_or("", String::as_str),
            resource_prefix,
            segments,
            time: &index.generated_at,
        };

        env.get_template(PAGE_TEMPLATE)
            .and_then(|template| template.render(&context))
            .map_err(|err| anyhow!("failed to render page for {file}: {err}"))
    }

    fn handle_failure(&self, file: &str, err: anyhow::Error, report: &mut SiteReport) -> Result<()> {
        match self.options.on_error {
            ErrorPolicy::Abort => Err(err.context(format!("failed to generate page for {file}"))),
            ErrorPolicy::Skip => {
                let reason = format!("{err:#}");
                tracing::warn!(file = %file, error = %reason, "skipping file");
                report.skipped.push(SkippedFile {
                    file: file.to_owned(),
                    reason,
                });
                Ok(())
            }
        }
    }
}

fn page_environment(template: &str) -> Result<Environment<'_>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template(PAGE_TEMPLATE, template)
        .map_err(|err| anyhow!("invalid page template: {err}"))?;
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "package main\n\n// Greet says hi.\nfunc Greet() {}\n";

    fn options(root: &Path) -> Result<SiteOptions> {
        let mut config = Config::default();
        config.site.out_dir = "site".into();
        SiteOptions::from_config(root, &config)
    }

    fn dump(doc_start: usize, def_start: usize) -> String {
        format!(
            r#"{{"Files": [{{
                "Path": "main.go",
                "Defs": [{{"Unit": "example", "Path": "Greet", "Name": "Greet", "File": "main.go",
                           "DefStart": {def_start}, "TreePath": "Greet"}}],
                "Refs": [{{"DefUnit": "example", "DefPath": "Greet", "File": "main.go", "Start": {def_start}}}],
                "Docs": [{{"Format": "text/html", "Data": "<p>Greet says hi.</p>", "Start": {doc_start}, "End": {}}}]
            }}]}}"#,
            doc_start + 17
        )
    }

    #[test]
    fn writes_pages_and_assets() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("main.go"), SOURCE)?;
        let doc_start = SOURCE.find("//").expect("comment");
        let def_start = SOURCE.find("Greet()").expect("definition");
        let analyzer = DumpAnalyzer::from_json(&dump(doc_start, def_start))?;

        let report = SiteGenerator::new(&analyzer, options(temp.path())?).generate()?;

        assert_eq!(report.pages, vec![PathBuf::from("main.go.html")]);
        assert!(report.skipped.is_empty());
        let page = fs::read_to_string(temp.path().join("site/main.go.html"))?;
        assert!(page.contains("<title>main.go</title>"));
        assert!(page.contains(r#"<div class="doc"><p>Greet says hi.</p></div>"#));
        assert!(page.contains(r#"<span class="def" id="example/Greet"></span>"#));
        assert!(page.contains(r##"<a href="#example/Greet">Greet</a>"##));
        assert!(page.contains(r#"<a class="def node-path" href="main.go.html#example/Greet">Greet</a>"#));
        assert!(temp.path().join("site/crossdoc.css").exists());
        assert!(temp.path().join("site/crossdoc.js").exists());
        Ok(())
    }

    #[test]
    fn skip_policy_omits_failing_pages() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("main.go"), SOURCE)?;
        fs::write(temp.path().join("ok.go"), "package ok\n")?;
        // The doc comment runs past the end of the file.
        let json = r#"{"Files": [
            {"Path": "main.go", "Docs": [{"Format": "text/html", "Data": "x", "Start": 10, "End": 999}]},
            {"Path": "ok.go"}
        ]}"#;
        let analyzer = DumpAnalyzer::from_json(json)?;

        let mut opts = options(temp.path())?;
        opts.on_error = ErrorPolicy::Skip;
        let report = SiteGenerator::new(&analyzer, opts).generate()?;

        assert_eq!(report.pages, vec![PathBuf::from("ok.go.html")]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].file, "main.go");
        assert!(!temp.path().join("site/main.go.html").exists());

        let abort = SiteGenerator::new(&analyzer, options(temp.path())?).generate();
        assert!(abort.is_err());
        Ok(())
    }

    #[test]
    fn nested_pages_use_relative_links() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::create_dir_all(temp.path().join("pkg/util"))?;
        fs::write(temp.path().join("main.go"), "package main\n")?;
        fs::write(temp.path().join("pkg/util/util.go"), "package util\n")?;
        let analyzer = PlainAnalyzer::new(vec!["main.go".into(), "pkg/util/util.go".into()]);

        SiteGenerator::new(&analyzer, options(temp.path())?).generate()?;

        let nested = fs::read_to_string(temp.path().join("site/pkg/util/util.go.html"))?;
        assert!(nested.contains(r#"href="../../crossdoc.css""#));
        assert!(nested.contains(r#"<a class="file node-path" href="../../main.go.html">main.go</a>"#));
        let top = fs::read_to_string(temp.path().join("site/main.go.html"))?;
        assert!(top.contains(r#"<a class="file node-path" href="pkg/util/util.go.html">util.go</a>"#));
        Ok(())
    }

    #[test]
    fn custom_template_is_used() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("a.txt"), "hello <world>\n")?;
        fs::write(
            temp.path().join("page.html"),
            "{{ title }}|{{ time }}|{% for s in segments %}{{ s.code_html | safe }}{% endfor %}",
        )?;
        let analyzer = PlainAnalyzer::new(vec!["a.txt".into()]);

        let mut opts = options(temp.path())?;
        opts.template = Some(temp.path().join("page.html"));
        SiteGenerator::new(&analyzer, opts).generate()?;

        let page = fs::read_to_string(temp.path().join("site/a.txt.html"))?;
        assert!(page.starts_with("a.txt|"));
        let stamp = page.split('|').nth(1).unwrap_or_default();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok(), "bad timestamp {stamp:?}");
        assert!(page.contains("&lt;"));
        assert!(!page.contains("<world>"));
        Ok(())
    }

    #[test]
    fn ignore_globs_filter_analyzer_files() -> Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("keep.go"), "package keep\n")?;
        let analyzer = PlainAnalyzer::new(vec!["keep.go".into(), "vendor/dep.go".into()]);

        let mut config = Config::default();
        config.site.out_dir = "site".into();
        config.ignore.globs = vec!["vendor/**".into()];
        let report =
            SiteGenerator::new(&analyzer, SiteOptions::from_config(temp.path(), &config)?).generate()?;

        assert_eq!(report.pages, vec![PathBuf::from("keep.go.html")]);
        Ok(())
    }
}
