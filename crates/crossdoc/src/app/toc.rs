//! Table-of-contents trees built from slash-delimited paths.

use std::collections::HashMap;

use crate::domain::errors::DomainError;
use crate::domain::html::{base_name, escape, page_href};
use crate::domain::model::Definition;

/// An item placed in a table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocLeaf<'a> {
    /// Grouped by tree path, linking to the definition's anchor.
    Definition(&'a Definition),
    /// Grouped by file path, linking to the file's page.
    File(&'a str),
}

impl<'a> TocLeaf<'a> {
    pub fn path(&self) -> &'a str {
        match *self {
            TocLeaf::Definition(def) => &def.tree_path,
            TocLeaf::File(file) => file,
        }
    }

    fn kind(&self) -> LeafKind {
        match self {
            TocLeaf::Definition(_) => LeafKind::Definition,
            TocLeaf::File(_) => LeafKind::File,
        }
    }

    fn render(&self, page: &str) -> String {
        match *self {
            TocLeaf::Definition(def) => format!(
                r#"<a class="def node-path" href="{}#{}">{}</a>"#,
                escape(&page_href(page, &def.file)),
                escape(&def.key.anchor_id()),
                escape(&def.name)
            ),
            TocLeaf::File(file) => format!(
                r#"<a class="file node-path" href="{}">{}</a>"#,
                escape(&page_href(page, file)),
                escape(base_name(file))
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafKind {
    Definition,
    File,
}

/// A directory-like grouping in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    pub name: String,
    /// Indices of child nodes, in first-seen order.
    pub children: Vec<usize>,
    /// Indices into the builder's input leaves, in input order.
    pub leaves: Vec<usize>,
}

impl TocNode {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            children: Vec::new(),
            leaves: Vec::new(),
        }
    }
}

/// Nested tree over a homogeneous set of leaves.
#[derive(Debug, Clone)]
pub struct TocTree<'a> {
    nodes: Vec<TocNode>,
    leaves: Vec<TocLeaf<'a>>,
}

const ROOT: usize = 0;

impl<'a> TocTree<'a> {
    /// Group `leaves` by path prefix.
    ///
    /// For the path `a/b/c/d` the nodes `a`, `a/b`, and `a/b/c` are created as
    /// needed and the leaf is attached to `a/b/c`.
    pub fn build(leaves: Vec<TocLeaf<'a>>) -> Result<Self, DomainError> {
        let kind = leaves.first().map(TocLeaf::kind);
        if leaves.iter().any(|leaf| Some(leaf.kind()) != kind) {
            return Err(DomainError::MixedTocLeaves);
        }

        let mut nodes = vec![TocNode::named("/")];
        let mut by_prefix: HashMap<String, usize> = HashMap::new();

        for (leaf_idx, leaf) in leaves.iter().enumerate() {
            let parts: Vec<&str> = leaf.path().split('/').filter(|p| !p.is_empty()).collect();
            let mut parent = ROOT;
            for depth in 0..parts.len().saturating_sub(1) {
                let prefix = parts[..=depth].join("/");
                parent = match by_prefix.get(&prefix) {
                    Some(&idx) => idx,
                    None => {
                        let idx = nodes.len();
                        nodes.push(TocNode::named(parts[depth]));
                        nodes[parent].children.push(idx);
                        by_prefix.insert(prefix, idx);
                        idx
                    }
                };
            }
            nodes[parent].leaves.push(leaf_idx);
        }

        Ok(Self { nodes, leaves })
    }

    pub fn root(&self) -> &TocNode {
        &self.nodes[ROOT]
    }

    pub fn node(&self, idx: usize) -> Option<&TocNode> {
        self.nodes.get(idx)
    }

    pub fn leaf(&self, idx: usize) -> Option<&TocLeaf<'a>> {
        self.leaves.get(idx)
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Render the tree for embedding in the page of `page`.
    pub fn render(&self, page: &str) -> String {
        let mut out = String::new();
        self.render_node(ROOT, 0, page, &mut out);
        out
    }

    fn render_node(&self, idx: usize, level: usize, page: &str, out: &mut String) {
        let node = &self.nodes[idx];
        out.push_str(&format!(
            r#"<div class="node" level="{level}"><div class="node-title">{}</div><div class="node-body">"#,
            escape(&node.name)
        ));
        for &child in &node.children {
            self.render_node(child, level + 1, page, out);
        }
        for &leaf in &node.leaves {
            out.push_str(&self.leaves[leaf].render(page));
        }
        out.push_str("</div></div>");
    }
}

/// Render the definitions of `page` grouped by tree path.
pub fn definitions_toc(page: &str, defs: &[Definition]) -> Result<String, DomainError> {
    let tree = TocTree::build(defs.iter().map(TocLeaf::Definition).collect())?;
    Ok(tree.render(page))
}

/// Render the project's files grouped by directory.
pub fn files_toc<S: AsRef<str>>(page: &str, files: &[S]) -> Result<String, DomainError> {
    let tree = TocTree::build(files.iter().map(|f| TocLeaf::File(f.as_ref())).collect())?;
    Ok(tree.render(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DefKey;

    fn definition(path: &str, file: &str) -> Definition {
        Definition {
            key: DefKey::new("u", path),
            name: path.rsplit('/').next().unwrap_or(path).to_owned(),
            file: file.to_owned(),
            def_start: 0,
            def_end: 0,
            tree_path: path.to_owned(),
        }
    }

    fn child<'t>(tree: &'t TocTree<'_>, node: &TocNode, name: &str) -> &'t TocNode {
        node.children
            .iter()
            .filter_map(|&idx| tree.node(idx))
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("missing child {name}"))
    }

    #[test]
    fn groups_paths_by_prefix() -> Result<(), DomainError> {
        let tree = TocTree::build(vec![TocLeaf::File("a/b/c"), TocLeaf::File("a/d")])?;

        let root = tree.root();
        assert_eq!(root.name, "/");
        assert_eq!(root.children.len(), 1);
        assert!(root.leaves.is_empty());

        let a = child(&tree, root, "a");
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.leaves, vec![1]);

        let b = child(&tree, a, "b");
        assert!(b.children.is_empty());
        assert_eq!(b.leaves, vec![0]);
        assert_eq!(tree.leaf(0).map(TocLeaf::path), Some("a/b/c"));
        assert_eq!(tree.node_count(), 3);
        Ok(())
    }

    #[test]
    fn every_leaf_appears_once_and_prefixes_once() -> Result<(), DomainError> {
        let paths = ["x/y/z.go", "x/y/w.go", "x/v.go", "top.go", "q/r/s/t.go"];
        let tree = TocTree::build(paths.iter().map(|p| TocLeaf::File(p)).collect())?;

        let mut seen = vec![0; paths.len()];
        for idx in 0..tree.node_count() {
            for &leaf in &tree.node(idx).expect("node").leaves {
                seen[leaf] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
        // root, x, x/y, q, q/r, q/r/s
        assert_eq!(tree.node_count(), 6);
        Ok(())
    }

    #[test]
    fn mixed_leaves_are_rejected() {
        let def = definition("T/m", "a.go");
        let err = TocTree::build(vec![TocLeaf::File("a.go"), TocLeaf::Definition(&def)]).unwrap_err();
        assert_eq!(err, DomainError::MixedTocLeaves);
    }

    #[test]
    fn renders_children_before_leaves() -> Result<(), DomainError> {
        let html = files_toc("main.go", &["main.go", "pkg/util.go"])?;
        assert_eq!(
            html,
            concat!(
                r#"<div class="node" level="0"><div class="node-title">/</div><div class="node-body">"#,
                r#"<div class="node" level="1"><div class="node-title">pkg</div><div class="node-body">"#,
                r#"<a class="file node-path" href="pkg/util.go.html">util.go</a>"#,
                r#"</div></div>"#,
                r#"<a class="file node-path" href="main.go.html">main.go</a>"#,
                r#"</div></div>"#,
            )
        );
        Ok(())
    }

    #[test]
    fn definition_leaves_link_to_anchors() -> Result<(), DomainError> {
        let defs = vec![definition("T/Method", "pkg/t.go")];
        let html = definitions_toc("pkg/t.go", &defs)?;
        assert!(html.contains(r#"<div class="node-title">T</div>"#));
        assert!(html.contains(r#"<a class="def node-path" href="../pkg/t.go.html#u/T/Method">Method</a>"#));
        Ok(())
    }

    #[test]
    fn empty_input_renders_bare_root() -> Result<(), DomainError> {
        let html = files_toc::<&str>("main.go", &[])?;
        assert_eq!(
            html,
            r#"<div class="node" level="0"><div class="node-title">/</div><div class="node-body"></div></div>"#
        );
        Ok(())
    }
}
