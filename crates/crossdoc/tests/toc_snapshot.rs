use crossdoc::app::defs::toc_definitions;
use crossdoc::app::toc::{definitions_toc, files_toc};
use crossdoc::domain::model::{DefKey, Definition};

fn definition(unit: &str, path: &str, tree_path: &str) -> Definition {
    Definition {
        key: DefKey::new(unit, path),
        name: path.rsplit('/').next().unwrap_or(path).to_owned(),
        file: "pkg/shapes.go".into(),
        def_start: 0,
        def_end: 0,
        tree_path: tree_path.into(),
    }
}

#[test]
fn file_toc_nests_directories() {
    let html = files_toc("index", &["a/b/c", "a/d"]).expect("homogeneous leaves");
    insta::assert_snapshot!(html, @r#"<div class="node" level="0"><div class="node-title">/</div><div class="node-body"><div class="node" level="1"><div class="node-title">a</div><div class="node-body"><div class="node" level="2"><div class="node-title">b</div><div class="node-body"><a class="file node-path" href="a/b/c.html">c</a></div></div><a class="file node-path" href="a/d.html">d</a></div></div></div></div>"#);
}

#[test]
fn definition_toc_groups_methods_under_types() {
    let defs = vec![
        definition("ex/pkg", "Shape/Area", "./Shape/Area"),
        definition("ex/pkg", "Shape", "./Shape"),
        definition("ex/pkg", "Shape", "./Shape"),
    ];
    let html = definitions_toc("pkg/shapes.go", &toc_definitions(&defs)).expect("homogeneous leaves");
    insta::assert_snapshot!(html, @r#"<div class="node" level="0"><div class="node-title">/</div><div class="node-body"><div class="node" level="1"><div class="node-title">Shape</div><div class="node-body"><a class="def node-path" href="../pkg/shapes.go.html#ex/pkg/Shape/Area">Area</a></div></div><a class="def node-path" href="../pkg/shapes.go.html#ex/pkg/Shape">Shape</a></div></div>"#);
}
