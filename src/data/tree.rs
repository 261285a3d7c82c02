use std::collections::{BTreeMap, BTreeSet};

use hdf5::Group;
use serde::Serialize;

use super::model::{Node, DATA, DESCRIPTION};
use super::navigator::{read_attribute, segments, try_resolve, walk};

// ---------------------------------------------------------------------------
// TreeNode – one row of the group tree a viewer displays
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Absolute group path (`/` for the root).
    pub path: String,
    /// Path of the group's `data` dataset, if it has one.
    pub data_path: Option<String>,
    /// The group's `Description` attribute, shown as a tooltip.
    pub description: Option<String>,
    /// Open by default: the node has few enough children.
    pub expanded: bool,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Node at the absolute group `path` within this subtree.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        let mut node = self;
        for segment in segments(path) {
            node = node.children.iter().find(|c| c.name == segment)?;
        }
        Some(node)
    }

    /// Indented text rendering, four spaces per level; groups holding data are
    /// marked with `*`.
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            let marker = if node.data_path.is_some() { " *" } else { "" };
            lines.push(format!("{}{}{marker}", "    ".repeat(depth), node.name));
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
        lines
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Trie {
    children: BTreeMap<String, Trie>,
}

impl Trie {
    fn insert<'a>(&mut self, path: impl IntoIterator<Item = &'a str>) {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Build the tree shown for one file from a set of matched paths.
///
/// Every match contributes its chain of ancestors plus its complete group
/// subtree. A match on a `data` dataset stands for the group holding it.
/// Children are sorted by name; a node is `expanded` when it has at most
/// `expand_threshold` children.
pub fn build_tree(
    root: &Group,
    label: &str,
    matches: &BTreeSet<String>,
    expand_threshold: usize,
) -> TreeNode {
    let mut trie = Trie::default();
    for path in matches {
        let mut chain: Vec<&str> = segments(path).collect();
        if chain.last() == Some(&DATA) {
            chain.pop();
        }
        let group_path = format!("/{}", chain.join("/"));
        let group = match try_resolve(root, &group_path) {
            Ok(Node::Group(group)) => group,
            Ok(Node::Dataset(_)) => continue,
            Err(e) => {
                log::debug!("skipping match {path}: {e}");
                continue;
            }
        };
        trie.insert(chain.iter().copied());
        for entry in walk(&group).skip(1) {
            trie.insert(segments(&entry.path));
        }
    }
    to_node(root, label.to_string(), "/".to_string(), &trie, expand_threshold)
}

fn to_node(root: &Group, name: String, path: String, trie: &Trie, threshold: usize) -> TreeNode {
    let group = match try_resolve(root, &path) {
        Ok(Node::Group(group)) => Some(group),
        _ => None,
    };
    let data_path = group
        .as_ref()
        .filter(|g| g.link_exists(DATA))
        .map(|_| child_path(&path, DATA));
    let description = group
        .as_ref()
        .and_then(|g| read_attribute(g, DESCRIPTION))
        .map(|v| v.to_string());
    let children: Vec<TreeNode> = trie
        .children
        .iter()
        .map(|(child, sub)| to_node(root, child.clone(), child_path(&path, child), sub, threshold))
        .collect();
    TreeNode {
        name,
        expanded: children.len() <= threshold,
        path,
        data_path,
        description,
        children,
    }
}
