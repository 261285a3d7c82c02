use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Dataset, File, Group, Location, LocationToken};
use ndarray::{Array1, Array2};
use regex::Regex;

use super::model::{AttributeValue, Node, WalkEntry, COLUMN_LABEL, DATA};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Navigator – a read-only open file
// ---------------------------------------------------------------------------

/// A read-only HDF5 series file.
///
/// Every lookup exists twice: as a method resolving from the file root, and as
/// a free function of this module taking an explicit root group. Lookups are
/// best effort: a path that does not resolve is logged and yields `None`.
#[derive(Debug)]
pub struct Navigator {
    file: File,
    path: PathBuf,
}

impl Navigator {
    /// Open `path` read-only. The file is closed when the navigator is dropped.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::info!("opened {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's root group.
    pub fn root(&self) -> &Group {
        &self.file
    }

    pub fn resolve_group(&self, path: &str) -> Option<Node> {
        resolve_group(self.root(), path)
    }

    pub fn try_resolve(&self, path: &str) -> Result<Node> {
        try_resolve(self.root(), path)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        contains_path(self.root(), path)
    }

    pub fn walk(&self) -> Walk {
        walk(self.root())
    }

    pub fn find_groups_matching(&self, pattern: &Regex) -> BTreeSet<String> {
        find_groups_matching(self.root(), pattern)
    }

    pub fn attribute(&self, name: &str, path: &str) -> Option<AttributeValue> {
        attribute(self.root(), name, path)
    }

    pub fn attributes(&self, path: &str) -> Option<BTreeMap<String, AttributeValue>> {
        attributes(self.root(), path)
    }

    pub fn column_labels(&self, path: &str) -> Option<Vec<String>> {
        column_labels(self.root(), path)
    }

    pub fn data(&self, path: &str) -> Option<Array2<f64>> {
        data(self.root(), path)
    }

    pub fn column_vector(&self, identifier: &str, path: &str) -> Option<Array1<f64>> {
        column_vector(self.root(), identifier, path)
    }

    pub fn column_count(&self, path: &str) -> Option<usize> {
        column_count(self.root(), path)
    }

    pub fn row_count(&self, path: &str) -> Option<usize> {
        row_count(self.root(), path)
    }

    pub fn outline(&self) -> Vec<String> {
        outline(self.root())
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

/// Segments of a slash-separated path. A leading `/` and empty segments are ignored.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .filter(|s| !s.is_empty())
}

/// Resolve `path` below `root`, failing with [`Error::NotFound`] on the first
/// missing segment.
pub fn try_resolve(root: &Group, path: &str) -> Result<Node> {
    let mut node = Node::Group(root.clone());
    for segment in segments(path) {
        let not_found = || Error::NotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        };
        let group = node.as_group().ok_or_else(not_found)?;
        if !group.link_exists(segment) {
            return Err(not_found());
        }
        node = if let Ok(child) = group.group(segment) {
            Node::Group(child)
        } else if let Ok(dataset) = group.dataset(segment) {
            Node::Dataset(dataset)
        } else {
            return Err(not_found());
        };
    }
    Ok(node)
}

/// Resolve `path` below `root`; a missing segment is logged and yields `None`.
pub fn resolve_group(root: &Group, path: &str) -> Option<Node> {
    match try_resolve(root, path) {
        Ok(node) => Some(node),
        Err(Error::NotFound { segment, .. }) => {
            log::warn!("No group named {segment}");
            None
        }
        Err(e) => {
            log::warn!("resolving {path:?}: {e}");
            None
        }
    }
}

/// Whether every segment of `path` exists below `root`. Never logs.
pub fn contains_path(root: &Group, path: &str) -> bool {
    try_resolve(root, path).is_ok()
}

fn last_segment(path: &str) -> Option<&str> {
    segments(path).last()
}

/// The `data` dataset a path designates: the path's own leaf when it is the
/// `data` dataset, else the `data` child of the resolved group.
fn data_of(root: &Group, path: &str) -> Option<Dataset> {
    match resolve_group(root, path)? {
        Node::Dataset(d) if last_segment(path) == Some(DATA) => Some(d),
        Node::Dataset(d) => {
            log::debug!("{} is a dataset but not a data series", d.name());
            None
        }
        node @ Node::Group(_) => node.data(),
    }
}

/// Trailing-slash form of a group's name (`/` for the root).
fn group_path(group: &Group) -> String {
    let name = group.name();
    if name.ends_with('/') {
        name
    } else {
        format!("{name}/")
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Depth-first, pre-order traversal of the groups below a root.
///
/// Children named `data` are listed but never entered. Built on an explicit
/// stack, so nesting depth is not bounded by the call stack. A group reached a
/// second time (a hard link back to an ancestor, or a second link to the same
/// object) is listed by its parent but not entered again.
pub struct Walk {
    stack: Vec<(String, Group)>,
    seen: Vec<(u64, LocationToken)>,
    revisits: usize,
}

/// Start a fresh traversal of `root`. Each call observes the file as it is now.
pub fn walk(root: &Group) -> Walk {
    let mut walk = Walk {
        stack: Vec::new(),
        seen: Vec::new(),
        revisits: 0,
    };
    walk.enter(group_path(root), root.clone());
    walk
}

impl Walk {
    /// Groups skipped so far because they had already been entered.
    pub fn revisits(&self) -> usize {
        self.revisits
    }

    fn enter(&mut self, path: String, group: Group) {
        match group.loc_info() {
            Ok(info) => {
                let id = (info.fileno, info.token);
                if self.seen.contains(&id) {
                    log::warn!("{path} links back to a group already visited, not descending");
                    self.revisits += 1;
                    return;
                }
                self.seen.push(id);
            }
            Err(e) => log::debug!("no object info for {path}: {e}"),
        }
        self.stack.push((path, group));
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<WalkEntry> {
        while let Some((path, group)) = self.stack.pop() {
            let children = match group.member_names() {
                Ok(children) => children,
                Err(e) => {
                    log::warn!("cannot list {path}: {e}");
                    continue;
                }
            };
            for child in children.iter().rev() {
                if child == DATA {
                    continue;
                }
                match group.group(child) {
                    Ok(sub) => self.enter(format!("{path}{child}/"), sub),
                    Err(_) => log::debug!("{path}{child} is not a group, not descending"),
                }
            }
            return Some(WalkEntry { path, children });
        }
        None
    }
}

/// Absolute paths of every member below `root` whose name contains a match for
/// `pattern`. An empty pattern matches every member.
///
/// The search stops once the traversal meets a group it has already visited.
pub fn find_groups_matching(root: &Group, pattern: &Regex) -> BTreeSet<String> {
    find_members(root, |name| pattern.is_match(name))
}

/// Absolute paths of every member below `root` whose name satisfies `accept`.
pub fn find_members(root: &Group, accept: impl Fn(&str) -> bool) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut walk = walk(root);
    while let Some(entry) = walk.next() {
        for child in &entry.children {
            if accept(child) {
                found.insert(format!("{}{child}", entry.path));
            }
        }
        if walk.revisits() > 0 {
            log::warn!("cycle below {}, stopping search", entry.path);
            break;
        }
    }
    found
}

/// Indented listing of the group tree: one line per group, and one `-label`
/// line per column of each `data` child, four spaces per level.
pub fn outline(root: &Group) -> Vec<String> {
    enum Item {
        Group(Group, String, usize),
        Labels(Dataset, usize),
    }

    fn members(group: &Group, depth: usize) -> Vec<Item> {
        let names = group.member_names().unwrap_or_else(|e| {
            log::warn!("cannot list {}: {e}", group.name());
            Vec::new()
        });
        names
            .into_iter()
            .filter_map(|name| {
                if name == DATA {
                    group.dataset(DATA).ok().map(|d| Item::Labels(d, depth))
                } else {
                    group.group(&name).ok().map(|g| Item::Group(g, name, depth))
                }
            })
            .collect()
    }

    let mut lines = Vec::new();
    let mut stack: Vec<Item> = members(root, 0);
    stack.reverse();
    while let Some(item) = stack.pop() {
        match item {
            Item::Group(group, name, depth) => {
                lines.push(format!("{}{name}", "    ".repeat(depth)));
                let mut children = members(&group, depth + 1);
                children.reverse();
                stack.extend(children);
            }
            Item::Labels(dataset, depth) => {
                let labels = read_attribute(&dataset, COLUMN_LABEL)
                    .map(AttributeValue::into_list)
                    .unwrap_or_default();
                for label in labels {
                    lines.push(format!("{}-{label}", "    ".repeat(depth)));
                }
            }
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Attribute `name` of the group or dataset at `path`.
pub fn attribute(root: &Group, name: &str, path: &str) -> Option<AttributeValue> {
    let node = resolve_group(root, path)?;
    read_attribute(node.location(), name)
}

/// Every readable attribute of the group or dataset at `path`.
pub fn attributes(root: &Group, path: &str) -> Option<BTreeMap<String, AttributeValue>> {
    let node = resolve_group(root, path)?;
    let location = node.location();
    let names = match location.attr_names() {
        Ok(names) => names,
        Err(e) => {
            log::warn!("cannot list attributes of {}: {e}", node.name());
            return None;
        }
    };
    Some(
        names
            .into_iter()
            .filter_map(|name| read_attribute(location, &name).map(|v| (name, v)))
            .collect(),
    )
}

/// Column labels of the series at `path`. A group without its own
/// `Column Label` answers with its `data` child's labels.
pub fn column_labels(root: &Group, path: &str) -> Option<Vec<String>> {
    let node = resolve_group(root, path)?;
    if let Some(labels) = read_attribute(node.location(), COLUMN_LABEL) {
        return Some(labels.into_list());
    }
    let dataset = node.as_group().and_then(|_| node.data())?;
    read_attribute(&dataset, COLUMN_LABEL).map(AttributeValue::into_list)
}

/// Read attribute `name` of `location`, or `None` if it is absent or unreadable.
pub fn read_attribute(location: &Location, name: &str) -> Option<AttributeValue> {
    match location.attr_names() {
        Ok(names) if names.iter().any(|n| n == name) => {}
        Ok(_) => return None,
        Err(e) => {
            log::warn!("cannot list attributes of {}: {e}", location.name());
            return None;
        }
    }
    match location.attr(name).and_then(|attr| attribute_value(&attr)) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("cannot read attribute {name:?} of {}: {e}", location.name());
            None
        }
    }
}

fn attribute_value(attr: &Attribute) -> hdf5::Result<AttributeValue> {
    let values = attribute_strings(attr)?;
    if attr.ndim() == 0 {
        Ok(AttributeValue::Text(values.into_iter().next().unwrap_or_default()))
    } else {
        Ok(AttributeValue::List(values))
    }
}

/// Fixed-length strings are converted into buffers of this many bytes; the
/// NUL padding is dropped on read.
const FIXED_STRING_CAPACITY: usize = 1024;

fn warn_truncated(attr: &Attribute, size: usize) {
    if size > FIXED_STRING_CAPACITY {
        log::warn!(
            "{}: {size}-byte strings truncated to {FIXED_STRING_CAPACITY}",
            attr.name()
        );
    }
}

fn attribute_strings(attr: &Attribute) -> hdf5::Result<Vec<String>> {
    fn render<T: ToString>(values: Vec<T>) -> Vec<String> {
        values
            .iter()
            .map(|v| v.to_string().trim_end_matches('\0').to_string())
            .collect()
    }

    Ok(match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenAscii => render(attr.read_raw::<VarLenAscii>()?),
        TypeDescriptor::FixedAscii(size) => {
            warn_truncated(attr, size);
            render(attr.read_raw::<FixedAscii<FIXED_STRING_CAPACITY>>()?)
        }
        TypeDescriptor::FixedUnicode(size) => {
            warn_truncated(attr, size);
            render(attr.read_raw::<FixedUnicode<FIXED_STRING_CAPACITY>>()?)
        }
        TypeDescriptor::Integer(_) => render(attr.read_raw::<i64>()?),
        TypeDescriptor::Unsigned(_) => render(attr.read_raw::<u64>()?),
        TypeDescriptor::Float(_) => render(attr.read_raw::<f64>()?),
        TypeDescriptor::Boolean => render(attr.read_raw::<bool>()?),
        _ => render(attr.read_raw::<VarLenUnicode>()?),
    })
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// Full contents of the series at `path` (the `data` dataset itself, or the
/// `data` child of a group).
pub fn data(root: &Group, path: &str) -> Option<Array2<f64>> {
    let dataset = data_of(root, path)?;
    match read_matrix(&dataset) {
        Ok(matrix) => Some(matrix),
        Err(e) => {
            log::warn!("cannot read {}: {e}", dataset.name());
            None
        }
    }
}

/// The column labelled `identifier` of the series at `path`.
pub fn column_vector(root: &Group, identifier: &str, path: &str) -> Option<Array1<f64>> {
    let dataset = data_of(root, path)?;
    let labels = read_attribute(&dataset, COLUMN_LABEL)?.into_list();
    let index = labels.iter().position(|label| label == identifier)?;
    let matrix = read_matrix(&dataset)
        .map_err(|e| log::warn!("cannot read {}: {e}", dataset.name()))
        .ok()?;
    if index >= matrix.ncols() {
        log::warn!(
            "{}: label {identifier:?} has no column ({} columns)",
            dataset.name(),
            matrix.ncols()
        );
        return None;
    }
    Some(matrix.column(index).to_owned())
}

/// Number of columns of the series at `path`.
pub fn column_count(root: &Group, path: &str) -> Option<usize> {
    matrix_shape(&data_of(root, path)?).map(|(_, cols)| cols)
}

/// Number of rows (samples) of the series at `path`.
pub fn row_count(root: &Group, path: &str) -> Option<usize> {
    matrix_shape(&data_of(root, path)?).map(|(rows, _)| rows)
}

fn matrix_shape(dataset: &Dataset) -> Option<(usize, usize)> {
    match dataset.shape().as_slice() {
        [rows, cols] => Some((*rows, *cols)),
        [rows] => Some((*rows, 1)),
        _ => None,
    }
}

/// Read a dataset as a rows x columns matrix. One-dimensional datasets read as
/// a single column.
pub fn read_matrix(dataset: &Dataset) -> Result<Array2<f64>> {
    let shape = matrix_shape(dataset).ok_or_else(|| Error::Dimensions {
        path: dataset.name(),
        ndim: dataset.ndim(),
    })?;
    let values = dataset.read_raw::<f64>()?;
    Ok(Array2::from_shape_vec(shape, values)?)
}
