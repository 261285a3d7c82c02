use std::path::{Path, PathBuf};

use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Group, Location};
use ndarray::Array2;

use super::model::{AttributeValue, COLUMN_LABEL, DATA, DESCRIPTION};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// SerieWriter – a file opened for authoring
// ---------------------------------------------------------------------------

/// A series file opened for writing.
pub struct SerieWriter {
    file: File,
    path: PathBuf,
}

impl SerieWriter {
    /// Create `path`, truncating any existing file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing file for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open_rw(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Group {
        &self.file
    }

    /// Flush buffered writes to disk.
    pub fn flush(&self) -> Result<()> {
        Ok(self.file.flush()?)
    }
}

// ---------------------------------------------------------------------------
// Authoring helpers
// ---------------------------------------------------------------------------

/// Create group `name` below `parent`.
///
/// An existing member of that name is an [`Error::AlreadyExists`] unless
/// `overwrite` is set, in which case it is unlinked first.
pub fn add_group(
    parent: &Group,
    name: &str,
    description: Option<&str>,
    overwrite: bool,
) -> Result<Group> {
    if parent.link_exists(name) {
        if !overwrite {
            return Err(Error::AlreadyExists(member_path(parent, name)));
        }
        log::debug!("replacing {}", member_path(parent, name));
        parent.unlink(name)?;
    }
    let group = parent.create_group(name)?;
    if let Some(text) = description {
        add_attribute(&group, DESCRIPTION, text)?;
    }
    Ok(group)
}

/// Attach the `data` dataset to `parent`, labelled column by column.
///
/// There is no overwrite path: an existing `data` child is an
/// [`Error::AlreadyExists`]. `labels` must have one entry per column.
pub fn add_data<S: AsRef<str>>(
    parent: &Group,
    labels: &[S],
    data: &Array2<f64>,
    description: Option<&str>,
) -> Result<Dataset> {
    if parent.link_exists(DATA) {
        return Err(Error::AlreadyExists(member_path(parent, DATA)));
    }
    if labels.len() != data.ncols() {
        return Err(Error::ShapeMismatch {
            labels: labels.len(),
            columns: data.ncols(),
        });
    }

    let dataset = parent
        .new_dataset::<f64>()
        .shape((data.nrows(), data.ncols()))
        .create(DATA)?;
    if !data.is_empty() {
        let values: Vec<f64> = data.iter().copied().collect();
        dataset.write_raw(&values)?;
    }

    add_attribute(&dataset, COLUMN_LABEL, labels)?;
    if let Some(text) = description {
        add_attribute(&dataset, DESCRIPTION, text)?;
    }
    Ok(dataset)
}

/// Create group `name` below `parent` and attach its `data` in one step.
pub fn add_group_with_data<S: AsRef<str>>(
    parent: &Group,
    name: &str,
    labels: &[S],
    data: &Array2<f64>,
) -> Result<Group> {
    let group = add_group(parent, name, None, false)?;
    add_data(&group, labels, data, None)?;
    Ok(group)
}

/// Store `value` as a variable-length UTF-8 string attribute: a scalar for
/// text, a one-dimensional attribute for a list. An existing attribute of
/// the same name is replaced.
pub fn add_attribute(
    location: &Location,
    name: &str,
    value: impl Into<AttributeValue>,
) -> Result<()> {
    if location.attr_names()?.iter().any(|n| n == name) {
        log::debug!("replacing attribute {}@{name}", location.name());
        location.delete_attr(name)?;
    }
    match value.into() {
        AttributeValue::Text(text) => {
            let value = to_var_len_unicode(&text)?;
            location
                .new_attr::<VarLenUnicode>()
                .create(name)?
                .write_scalar(&value)?;
        }
        AttributeValue::List(items) => {
            let values = items
                .iter()
                .map(|s| to_var_len_unicode(s))
                .collect::<Result<Vec<_>>>()?;
            location
                .new_attr::<VarLenUnicode>()
                .shape(values.len())
                .create(name)?
                .write_raw(&values)?;
        }
    }
    Ok(())
}

fn to_var_len_unicode(text: &str) -> Result<VarLenUnicode> {
    text.parse::<VarLenUnicode>()
        .map_err(|_| Error::InvalidText(text.to_string()))
}

fn member_path(parent: &Group, name: &str) -> String {
    let parent_name = parent.name();
    if parent_name.ends_with('/') {
        format!("{parent_name}{name}")
    } else {
        format!("{parent_name}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::navigator::Navigator;
    use ndarray::array;

    fn scratch() -> (tempfile::TempDir, SerieWriter) {
        let dir = tempfile::tempdir().unwrap();
        let writer = SerieWriter::create(dir.path().join("authoring.mbsh5")).unwrap();
        (dir, writer)
    }

    #[test]
    fn group_and_data_round_trip() {
        let (_dir, writer) = scratch();
        let group = add_group(writer.root(), "body", Some("rigid body"), false).unwrap();
        let values = array![[0.0, 1.5], [0.1, 2.5]];
        add_data(&group, &["a", "b"], &values, Some("positions")).unwrap();
        let path = writer.path().to_path_buf();
        drop(group);
        drop(writer);

        let nav = Navigator::open(&path).unwrap();
        assert_eq!(nav.data("/body").unwrap(), values);
        assert_eq!(nav.column_labels("/body").unwrap(), vec!["a", "b"]);
        assert_eq!(
            nav.attribute("Description", "/body"),
            Some(AttributeValue::Text("rigid body".into()))
        );
        assert_eq!(
            nav.attribute("Description", "/body/data"),
            Some(AttributeValue::Text("positions".into()))
        );
    }

    #[test]
    fn label_count_must_match_columns() {
        let (_dir, writer) = scratch();
        let group = add_group(writer.root(), "g", None, false).unwrap();
        let err = add_data(&group, &["a", "b", "c"], &array![[1.0, 2.0]], None).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                labels: 3,
                columns: 2
            }
        ));
        assert!(!group.link_exists(DATA));
    }

    #[test]
    fn data_is_never_overwritten() {
        let (_dir, writer) = scratch();
        let group = add_group(writer.root(), "g", None, false).unwrap();
        add_data(&group, &["a"], &array![[1.0]], None).unwrap();
        let err = add_data(&group, &["a"], &array![[2.0]], None).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref p) if p == "/g/data"));
    }

    #[test]
    fn group_collision_and_overwrite() {
        let (_dir, writer) = scratch();
        let first = add_group(writer.root(), "g", Some("first"), false).unwrap();
        add_data(&first, &["a"], &array![[1.0]], None).unwrap();

        let err = add_group(writer.root(), "g", None, false).unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(ref p) if p == "/g"));

        let second = add_group(writer.root(), "g", Some("second"), true).unwrap();
        assert!(!second.link_exists(DATA));
        add_data(&second, &["b", "c"], &array![[3.0, 4.0]], None).unwrap();
        let path = writer.path().to_path_buf();
        drop((first, second, writer));

        let nav = Navigator::open(&path).unwrap();
        assert_eq!(nav.column_labels("/g").unwrap(), vec!["b", "c"]);
        assert_eq!(
            nav.attribute("Description", "/g"),
            Some(AttributeValue::Text("second".into()))
        );
    }

    #[test]
    fn attribute_scalar_vector_and_replace() {
        let (_dir, writer) = scratch();
        let group = add_group(writer.root(), "g", None, false).unwrap();
        add_attribute(&group, "Unit", "m/s").unwrap();
        add_attribute(&group, "Axes", &["x", "y", "z"][..]).unwrap();
        add_attribute(&group, "Unit", "km/h").unwrap();
        // a list may replace a scalar
        add_attribute(&group, "Axes", "x").unwrap();
        add_attribute(&group, "Axes", &["u", "v"][..]).unwrap();
        let path = writer.path().to_path_buf();
        drop((group, writer));

        let nav = Navigator::open(&path).unwrap();
        assert_eq!(
            nav.attribute("Unit", "g"),
            Some(AttributeValue::Text("km/h".into()))
        );
        assert_eq!(
            nav.attribute("Axes", "g"),
            Some(AttributeValue::List(vec!["u".into(), "v".into()]))
        );
        assert_eq!(nav.attributes("g").unwrap().len(), 2);
    }

    #[test]
    fn group_with_data_in_one_step() {
        let (_dir, writer) = scratch();
        let group =
            add_group_with_data(writer.root(), "sensor", &["t", "v"], &array![[0.0, 1.0]]).unwrap();
        assert!(group.link_exists(DATA));
        assert!(add_group_with_data(writer.root(), "sensor", &["t"], &array![[0.0]]).is_err());
    }

    #[test]
    fn reopen_appends() {
        let (_dir, writer) = scratch();
        add_group(writer.root(), "first", None, false).unwrap();
        let path = writer.path().to_path_buf();
        drop(writer);

        let writer = SerieWriter::open(&path).unwrap();
        add_group(writer.root(), "second", None, false).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let nav = Navigator::open(&path).unwrap();
        assert!(nav.contains_path("/first"));
        assert!(nav.contains_path("/second"));
    }
}
