use std::fmt;

use hdf5::{Dataset, Group, Location};
use serde::Serialize;

/// Name of the dataset child that carries a group's series.
pub const DATA: &str = "data";
/// Attribute naming each column of a `data` dataset.
pub const COLUMN_LABEL: &str = "Column Label";
/// Free-text attribute on groups and datasets.
pub const DESCRIPTION: &str = "Description";

// ---------------------------------------------------------------------------
// AttributeValue – a string or string-vector attribute
// ---------------------------------------------------------------------------

/// Attribute payload as stored by the authoring helpers.
///
/// Numeric attributes written by other tools are rendered to text when read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    /// The value as a list: a scalar becomes a one-element list.
    pub fn into_list(self) -> Vec<String> {
        match self {
            AttributeValue::Text(s) => vec![s],
            AttributeValue::List(v) => v,
        }
    }

    /// The scalar text, if this is a scalar attribute.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::List(_) => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => write!(f, "{s}"),
            AttributeValue::List(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Text(s)
    }
}

impl<S: AsRef<str>> From<&[S]> for AttributeValue {
    fn from(v: &[S]) -> Self {
        AttributeValue::List(v.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(v: Vec<String>) -> Self {
        AttributeValue::List(v)
    }
}

// ---------------------------------------------------------------------------
// Node – what a path resolves to
// ---------------------------------------------------------------------------

/// A resolved path: either a group or the `data` leaf below one.
#[derive(Debug, Clone)]
pub enum Node {
    Group(Group),
    Dataset(Dataset),
}

impl Node {
    /// Absolute HDF5 name of the node, e.g. `/model/body/data`.
    pub fn name(&self) -> String {
        match self {
            Node::Group(g) => g.name(),
            Node::Dataset(d) => d.name(),
        }
    }

    /// The node as an attribute holder.
    pub fn location(&self) -> &Location {
        match self {
            Node::Group(g) => g,
            Node::Dataset(d) => d,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Dataset(_) => None,
        }
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Node::Group(_) => None,
            Node::Dataset(d) => Some(d),
        }
    }

    /// The dataset holding this node's series: itself, or its `data` child.
    pub fn data(&self) -> Option<Dataset> {
        match self {
            Node::Dataset(d) => Some(d.clone()),
            Node::Group(g) => {
                if g.link_exists(DATA) {
                    g.dataset(DATA).ok()
                } else {
                    None
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// WalkEntry – one step of a group traversal
// ---------------------------------------------------------------------------

/// A visited group and the names of its direct members.
///
/// `path` always ends in `/`, so `path + child` is the child's absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkEntry {
    pub path: String,
    pub children: Vec<String>,
}

// ---------------------------------------------------------------------------
// PlotSeries – one (x, y) curve ready for a plotting backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub x_label: String,
    pub y_label: String,
    /// `"<y label> vs. <x label>"`.
    pub headline: String,
    /// MATLAB snippet reading the x column from the file.
    pub x_snippet: String,
    /// MATLAB snippet reading the y column from the file.
    pub y_snippet: String,
}

impl PlotSeries {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// MATLAB `h5read` call reading one column (0-based `column`) of `rows` samples.
pub fn h5read_snippet(var: &str, file: &str, path: &str, column: usize, rows: usize) -> String {
    format!(
        "{var} = h5read('{file}','{path}',[{},1], [1,{rows}]);",
        column + 1
    )
}
