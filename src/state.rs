use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::SessionConfig;
use crate::data::model::{h5read_snippet, AttributeValue, PlotSeries, DATA};
use crate::data::navigator::{find_members, segments, Navigator};
use crate::data::tree::{build_tree, TreeNode};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// A series chosen in the tree: file plus path inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub file: PathBuf,
    pub path: String,
}

/// The tree shown for one open file.
#[derive(Debug, Clone)]
pub struct FileTree {
    pub file: PathBuf,
    pub tree: TreeNode,
}

/// Everything a viewer needs between user actions, independent of rendering.
pub struct Session {
    config: SessionConfig,

    /// Open files by absolute path.
    files: BTreeMap<PathBuf, Navigator>,

    /// Current search; `None` matches every member.
    pattern: Option<Regex>,

    /// Selected series and its column labels.
    selection: Option<Selection>,
    labels: Vec<String>,

    /// Columns plotted on the x and y axes.
    x_index: usize,
    y_index: usize,

    /// Last error worth showing to the user.
    pub status_message: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            x_index: config.x_index,
            y_index: config.y_index,
            config,
            files: BTreeMap::new(),
            pattern: None,
            selection: None,
            labels: Vec::new(),
            status_message: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -- file lifecycle --

    /// Open `path` and add it to the session.
    ///
    /// Returns `Ok(false)` when the file is already open.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = std::fs::canonicalize(path.as_ref())?;
        if !self.config.accepts(&path) {
            return Err(Error::UnsupportedExtension(path));
        }
        if self.files.contains_key(&path) {
            log::debug!("{} is already open", path.display());
            return Ok(false);
        }
        let nav = Navigator::open(&path)?;
        self.files.insert(path, nav);
        Ok(true)
    }

    /// Open every path, logging failures. Returns how many files were added.
    pub fn open_all<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut opened = 0;
        for path in paths {
            let path = path.as_ref();
            match self.open(path) {
                Ok(true) => opened += 1,
                Ok(false) => {}
                Err(e) => {
                    log::error!("Failed to open {}: {e}", path.display());
                    self.status_message = Some(format!("Error: {}: {e}", path.display()));
                }
            }
        }
        opened
    }

    /// Remove `path` from the session, closing its file.
    pub fn close(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.files.remove(&key).is_none() {
            return false;
        }
        log::info!("closed {}", key.display());
        if self.selection.as_ref().is_some_and(|s| s.file == key) {
            self.clear_selection();
        }
        true
    }

    pub fn close_all(&mut self) {
        self.files.clear();
        self.clear_selection();
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn navigator(&self, path: impl AsRef<Path>) -> Option<&Navigator> {
        let path = path.as_ref();
        self.files.get(path).or_else(|| {
            let key = std::fs::canonicalize(path).ok()?;
            self.files.get(&key)
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    // -- search --

    /// Replace the search pattern. An invalid pattern leaves the previous one
    /// in place.
    pub fn set_search(&mut self, pattern: &str) -> Result<()> {
        self.pattern = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(())
    }

    pub fn search_pattern(&self) -> &str {
        self.pattern.as_ref().map_or("", Regex::as_str)
    }

    /// Paths matching the current search, per open file.
    pub fn search(&self) -> Vec<(PathBuf, BTreeSet<String>)> {
        self.files
            .iter()
            .map(|(file, nav)| {
                let matches = match &self.pattern {
                    Some(pattern) => nav.find_groups_matching(pattern),
                    None => find_members(nav.root(), |_| true),
                };
                (file.clone(), matches)
            })
            .collect()
    }

    /// The group tree of every open file under the current search.
    pub fn tree(&self) -> Vec<FileTree> {
        self.search()
            .into_iter()
            .filter_map(|(file, matches)| {
                let nav = self.files.get(&file)?;
                let label = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                let tree = build_tree(nav.root(), &label, &matches, self.config.expand_threshold);
                Some(FileTree { file, tree })
            })
            .collect()
    }

    // -- selection --

    /// Select `path` in `file`. When the path names a `data` dataset, its
    /// column labels become the selectable columns and the x axis resets.
    pub fn select(&mut self, file: impl AsRef<Path>, path: &str) -> Option<&[String]> {
        let nav = self.navigator(file)?;
        let selection = Selection {
            file: nav.path().to_path_buf(),
            path: path.to_string(),
        };
        let labels = if segments(path).last() == Some(DATA) {
            nav.column_labels(path)
        } else {
            None
        };

        self.selection = Some(selection);
        match labels {
            Some(labels) => {
                self.labels = labels;
                self.x_index = self.config.x_index;
                Some(&self.labels)
            }
            None => {
                self.labels.clear();
                None
            }
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Column labels of the selected series.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.labels.clear();
    }

    pub fn x_index(&self) -> usize {
        self.x_index
    }

    pub fn y_index(&self) -> usize {
        self.y_index
    }

    /// Use column `index` for the x axis. Ignored if out of range.
    pub fn set_x_index(&mut self, index: usize) -> bool {
        let valid = index < self.labels.len();
        if valid {
            self.x_index = index;
        }
        valid
    }

    /// Use column `index` for the y axis. Ignored if out of range.
    pub fn set_y_index(&mut self, index: usize) -> bool {
        let valid = index < self.labels.len();
        if valid {
            self.y_index = index;
        }
        valid
    }

    /// Attributes of `path` in `file`.
    pub fn attributes(
        &self,
        file: impl AsRef<Path>,
        path: &str,
    ) -> Option<BTreeMap<String, AttributeValue>> {
        self.navigator(file)?.attributes(path)
    }

    /// The curve for the current selection and x/y columns.
    pub fn plot_series(&self) -> Option<PlotSeries> {
        let selection = self.selection.as_ref()?;
        let nav = self.files.get(&selection.file)?;
        let data = nav.data(&selection.path)?;
        let (xi, yi) = (self.x_index, self.y_index);
        if xi >= data.ncols() || yi >= data.ncols() {
            log::warn!(
                "{}: columns {xi}/{yi} out of range ({} columns)",
                selection.path,
                data.ncols()
            );
            return None;
        }

        let label = |i: usize| {
            self.labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("column {}", i + 1))
        };
        let (x_label, y_label) = (label(xi), label(yi));
        let file = selection.file.display().to_string();
        let rows = data.nrows();
        Some(PlotSeries {
            x: data.column(xi).to_vec(),
            y: data.column(yi).to_vec(),
            headline: format!("{y_label} vs. {x_label}"),
            x_snippet: h5read_snippet("x", &file, &selection.path, xi, rows),
            y_snippet: h5read_snippet("y", &file, &selection.path, yi, rows),
            x_label,
            y_label,
        })
    }
}
