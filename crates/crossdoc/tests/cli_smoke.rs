use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn crossdoc(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("crossdoc").expect("binary exists");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("CROSSDOC_OUT_DIR")
        .env_remove("CROSSDOC_ANALYZER");
    cmd
}

#[test]
fn help_displays_usage() {
    let home = tempfile::tempdir().expect("tempdir");
    crossdoc(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--analyzer"));
}

#[test]
fn plain_analyzer_renders_discovered_files() -> anyhow::Result<()> {
    let home = tempfile::tempdir()?;
    let project = tempfile::tempdir()?;
    fs::create_dir_all(project.path().join("src"))?;
    fs::write(project.path().join("main.rs"), "fn main() {}\n")?;
    fs::write(project.path().join("src/lib.rs"), "pub fn answer() -> u32 { 42 }\n")?;

    for _ in 0..2 {
        crossdoc(home.path())
            .args(["--analyzer", "plain"])
            .arg(project.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("wrote 2 pages"));
    }

    let page = fs::read_to_string(project.path().join("docs/src/lib.rs.html"))?;
    assert!(page.contains(r#"href="../crossdoc.css""#));
    assert!(page.contains(r#"<span class="dec">42</span>"#));
    assert!(project.path().join("docs/main.rs.html").exists());
    assert!(project.path().join("docs/crossdoc.js").exists());
    Ok(())
}

#[test]
fn dump_analyzer_links_across_files() -> anyhow::Result<()> {
    let home = tempfile::tempdir()?;
    let project = tempfile::tempdir()?;
    fs::create_dir_all(project.path().join("lib"))?;
    let main = "package main\n\nfunc main() { Hello() }\n";
    let lib = "package lib\n\nfunc Hello() {}\n";
    fs::write(project.path().join("main.go"), main)?;
    fs::write(project.path().join("lib/lib.go"), lib)?;

    let call = main.find("Hello").expect("call site");
    let def = lib.find("Hello").expect("definition");
    let dump = project.path().join("analysis.json");
    fs::write(
        &dump,
        format!(
            r#"{{"Files": [
                {{"Path": "main.go",
                  "Refs": [{{"DefUnit": "ex/lib", "DefPath": "Hello", "File": "main.go", "Start": {call}}}]}},
                {{"Path": "lib/lib.go",
                  "Defs": [{{"Unit": "ex/lib", "Path": "Hello", "Name": "Hello", "File": "lib/lib.go",
                             "DefStart": {def}, "TreePath": "Hello"}}]}}
            ]}}"#
        ),
    )?;

    crossdoc(home.path())
        .arg("--dump")
        .arg(&dump)
        .args(["--out", "site"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote 2 pages"));

    let page = fs::read_to_string(project.path().join("site/main.go.html"))?;
    assert!(page.contains(r#"<a href="lib/lib.go.html#ex/lib/Hello">Hello</a>"#));
    let target = fs::read_to_string(project.path().join("site/lib/lib.go.html"))?;
    assert!(target.contains(r#"id="ex/lib/Hello""#));
    Ok(())
}

#[test]
fn missing_directory_fails() {
    let home = tempfile::tempdir().expect("tempdir");
    crossdoc(home.path())
        .args(["--analyzer", "plain", "/definitely/not/a/project"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project directory does not exist"));
}

#[test]
fn env_selects_analyzer() -> anyhow::Result<()> {
    let home = tempfile::tempdir()?;
    let project = tempfile::tempdir()?;
    fs::write(project.path().join("notes.txt"), "hello\n")?;

    crossdoc(home.path())
        .env("CROSSDOC_ANALYZER", "plain")
        .env("CROSSDOC_OUT_DIR", "out")
        .arg(project.path())
        .assert()
        .success();

    assert!(project.path().join("out/notes.txt.html").exists());
    Ok(())
}

#[test]
fn verbose_flag_enables_debug_logs() -> anyhow::Result<()> {
    let home = tempfile::tempdir()?;
    let project = tempfile::tempdir()?;
    fs::write(project.path().join("notes.txt"), "hello\n")?;

    crossdoc(home.path())
        .args(["--analyzer", "plain"])
        .arg(project.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("site generated"))
        .stderr(predicate::str::contains("wrote page").not());

    crossdoc(home.path())
        .args(["--analyzer", "plain", "-v"])
        .arg(project.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("wrote page"));
    Ok(())
}
