use std::io::Write;

use ndarray::Array2;

use super::model::{PlotSeries, DATA, DESCRIPTION};
use super::navigator::{segments, Navigator};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Dump options
// ---------------------------------------------------------------------------

/// Layout of an ASCII table dump.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Prefix of header lines.
    pub comment: String,
    pub delimiter: u8,
    /// Text written for NaN and for rows past the end of a shorter source.
    pub nan: String,
    /// Write the commented header describing every source and column.
    pub header: bool,
    /// Significant digits after the point in scientific notation; `None`
    /// writes the shortest exact decimal form instead.
    pub precision: Option<usize>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            comment: "#".to_string(),
            delimiter: b' ',
            nan: "nan".to_string(),
            header: true,
            precision: Some(f64::DIGITS as usize + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// DumpSource – selected columns of one series
// ---------------------------------------------------------------------------

/// One series to dump, with the (0-based) columns to write in order.
#[derive(Debug, Clone)]
pub struct DumpSource {
    pub file: String,
    /// Path of the `data` dataset itself.
    pub path: String,
    pub description: Option<String>,
    /// `None` when the dataset carries no `Column Label`.
    pub labels: Option<Vec<String>>,
    pub data: Array2<f64>,
    pub columns: Vec<usize>,
}

impl DumpSource {
    /// Load the series at `path` and select `columns` (see [`parse_columns`]).
    pub fn load(nav: &Navigator, path: &str, columns: &str) -> Result<Self> {
        nav.try_resolve(path)?;
        let data = nav
            .data(path)
            .ok_or_else(|| Error::NoData(path.to_string()))?;
        let trimmed = path.trim_end_matches('/');
        let (group_path, data_path) = if segments(path).last() == Some(DATA) {
            let parent = trimmed.strip_suffix(DATA).unwrap_or(trimmed);
            (parent.trim_end_matches('/'), trimmed.to_string())
        } else {
            (trimmed, format!("{trimmed}/{DATA}"))
        };
        let description = nav
            .attribute(DESCRIPTION, &data_path)
            .or_else(|| nav.attribute(DESCRIPTION, group_path))
            .map(|v| v.to_string());
        let columns = parse_columns(columns, data.ncols())?;
        Ok(Self {
            file: nav.path().display().to_string(),
            labels: nav.column_labels(&data_path),
            path: data_path,
            description,
            data,
            columns,
        })
    }
}

/// Parse a 1-based column selection into 0-based indices.
///
/// Comma-separated items, each a column number or a range `a-b`; an omitted
/// bound means the first or last column, and a descending range is written
/// in reverse. An empty selection (or `-`) selects every column.
pub fn parse_columns(selection: &str, columns: usize) -> Result<Vec<usize>> {
    enum Item {
        One(usize),
        Range(Option<usize>, Option<usize>),
    }

    let invalid = || Error::InvalidColumns(selection.to_string());
    let bound = |s: &str| -> Result<Option<usize>> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(None);
        }
        s.parse().map(Some).map_err(|_| invalid())
    };
    let check = |n: usize| -> Result<usize> {
        if n == 0 || n > columns {
            return Err(Error::ColumnOutOfRange { index: n, columns });
        }
        Ok(n)
    };

    let selection = if selection.trim().is_empty() { "-" } else { selection };
    let items = selection
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| match item.split_once('-') {
            None => bound(item)?.map(Item::One).ok_or_else(invalid),
            Some((begin, end)) => Ok(Item::Range(bound(begin)?, bound(end)?)),
        })
        .collect::<Result<Vec<_>>>()?;
    if items.is_empty() {
        return Err(invalid());
    }

    let mut selected = Vec::new();
    for item in items {
        match item {
            Item::One(n) => selected.push(check(n)? - 1),
            Item::Range(None, None) if columns == 0 => {}
            Item::Range(begin, end) => {
                let begin = begin.map(check).transpose()?.unwrap_or(1);
                let end = end.map(check).transpose()?.unwrap_or(columns);
                if end >= begin {
                    selected.extend((begin..=end).map(|c| c - 1));
                } else {
                    selected.extend((end..=begin).rev().map(|c| c - 1));
                }
            }
        }
    }
    Ok(selected)
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write `sources` side by side as a delimited table. Sources shorter than the
/// longest one are padded with `options.nan`.
pub fn write_dump<W: Write>(mut out: W, sources: &[DumpSource], options: &DumpOptions) -> Result<()> {
    if options.header {
        let c = &options.comment;
        let mut number = 1;
        for source in sources {
            writeln!(out, "{c} File/DataSet: {}{}", source.file, source.path)?;
            if let Some(desc) = source.description.as_deref().filter(|d| !d.is_empty()) {
                writeln!(out, "{c}   Description: {desc}")?;
            }
            match &source.labels {
                Some(labels) => {
                    writeln!(out, "{c}   Column Label:")?;
                    for &col in &source.columns {
                        let label = labels.get(col).map(String::as_str).unwrap_or("");
                        writeln!(out, "{c}     {number:04}: {label}")?;
                        number += 1;
                    }
                }
                None => writeln!(out, "{c}   Column labels are not available.")?,
            }
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    let rows = sources.iter().map(|s| s.data.nrows()).max().unwrap_or(0);
    for row in 0..rows {
        let mut record = Vec::new();
        for source in sources {
            for &col in &source.columns {
                let value = if row < source.data.nrows() {
                    source.data[[row, col]]
                } else {
                    f64::NAN
                };
                record.push(format_value(value, options));
            }
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a plot series as a two-column table headed by its axis labels.
pub fn write_series<W: Write>(mut out: W, series: &PlotSeries, options: &DumpOptions) -> Result<()> {
    if options.header {
        writeln!(out, "{} {}", options.comment, series.headline)?;
        writeln!(out, "{} {}", options.comment, series.x_snippet)?;
        writeln!(out, "{} {}", options.comment, series.y_snippet)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    for (&x, &y) in series.x.iter().zip(&series.y) {
        writer.write_record([format_value(x, options), format_value(y, options)])?;
    }
    writer.flush()?;
    Ok(())
}

fn format_value(value: f64, options: &DumpOptions) -> String {
    if value.is_nan() {
        return options.nan.clone();
    }
    match options.precision {
        Some(precision) => scientific(value, precision),
        None => value.to_string(),
    }
}

/// `1.5000e+00` style: signed exponent of at least two digits.
fn scientific(value: f64, precision: usize) -> String {
    let formatted = format!("{value:.precision$e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        // inf
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testutil::sample_file;
    use crate::data::writer::{add_data, add_group, SerieWriter};
    use ndarray::array;

    #[test]
    fn column_selection() {
        assert_eq!(parse_columns("", 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_columns("-", 3).unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_columns("1,3", 3).unwrap(), vec![0, 2]);
        assert_eq!(parse_columns("2-", 4).unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_columns("-2", 4).unwrap(), vec![0, 1]);
        assert_eq!(parse_columns("3-1", 3).unwrap(), vec![2, 1, 0]);
        assert!(matches!(
            parse_columns("4", 3),
            Err(Error::ColumnOutOfRange { index: 4, columns: 3 })
        ));
        assert!(matches!(parse_columns("0", 3), Err(Error::ColumnOutOfRange { .. })));
        assert!(matches!(parse_columns("a", 3), Err(Error::InvalidColumns(_))));
        assert!(matches!(parse_columns(",", 3), Err(Error::InvalidColumns(_))));
        assert!(matches!(parse_columns("1-2-3", 3), Err(Error::InvalidColumns(_))));
    }

    #[test]
    fn column_selection_without_columns() {
        assert_eq!(parse_columns("", 0).unwrap(), Vec::<usize>::new());
        assert_eq!(parse_columns("-", 0).unwrap(), Vec::<usize>::new());
        assert!(matches!(parse_columns("abc", 0), Err(Error::InvalidColumns(_))));
        assert!(matches!(
            parse_columns("1", 0),
            Err(Error::ColumnOutOfRange { index: 1, columns: 0 })
        ));
        assert!(matches!(parse_columns("2-", 0), Err(Error::ColumnOutOfRange { .. })));
    }

    #[test]
    fn scientific_like_printf() {
        assert_eq!(scientific(1.0, 16), "1.0000000000000000e+00");
        assert_eq!(scientific(-0.00125, 3), "-1.250e-03");
        assert_eq!(scientific(6.02e23, 2), "6.02e+23");
        assert_eq!(scientific(1e-300, 1), "1.0e-300");
        assert_eq!(scientific(f64::INFINITY, 4), "inf");
    }

    fn source(path: &str, data: Array2<f64>, columns: Vec<usize>) -> DumpSource {
        DumpSource {
            file: "f.mbsh5".into(),
            path: path.into(),
            description: None,
            labels: Some((0..data.ncols()).map(|i| format!("c{i}")).collect()),
            data,
            columns,
        }
    }

    #[test]
    fn dump_pads_short_sources() {
        let a = source("/a/data", array![[1.0, 2.0], [3.0, 4.0]], vec![1, 0]);
        let b = source("/b/data", array![[f64::NAN]], vec![0]);
        let options = DumpOptions {
            precision: None,
            ..DumpOptions::default()
        };
        let mut out = Vec::new();
        write_dump(&mut out, &[a, b], &options).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "# File/DataSet: f.mbsh5/a/data",
                "#   Column Label:",
                "#     0001: c1",
                "#     0002: c0",
                "# File/DataSet: f.mbsh5/b/data",
                "#   Column Label:",
                "#     0003: c0",
                "2 1 nan",
                "4 3 nan",
            ]
        );
    }

    #[test]
    fn dump_without_header_and_custom_delimiter() {
        let a = source("/a/data", array![[0.5, 1.0]], vec![0, 1]);
        let options = DumpOptions {
            header: false,
            delimiter: b',',
            precision: None,
            ..DumpOptions::default()
        };
        let mut out = Vec::new();
        write_dump(&mut out, &[a.clone()], &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0.5,1\n");

        let options = DumpOptions {
            precision: Some(2),
            ..options
        };
        let mut out = Vec::new();
        write_dump(&mut out, &[a], &options).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "5.00e-01,1.00e+00\n");
    }

    #[test]
    fn dump_notes_missing_labels() {
        let mut a = source("/a/data", array![[1.0, 2.0]], vec![0, 1]);
        a.labels = None;
        let b = source("/b/data", array![[3.0]], vec![0]);
        let mut out = Vec::new();
        write_dump(&mut out, &[a, b], &DumpOptions::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let header: Vec<&str> = text.lines().take(5).collect();
        assert_eq!(
            header,
            vec![
                "# File/DataSet: f.mbsh5/a/data",
                "#   Column labels are not available.",
                "# File/DataSet: f.mbsh5/b/data",
                "#   Column Label:",
                "#     0001: c0",
            ]
        );
    }

    #[test]
    fn load_from_navigator() {
        let dir = tempfile::tempdir().unwrap();
        let nav = Navigator::open(sample_file(dir.path())).unwrap();
        let source = DumpSource::load(&nav, "/model/body1", "3,1").unwrap();
        assert_eq!(source.columns, vec![2, 0]);
        assert_eq!(source.path, "/model/body1/data");
        assert_eq!(source.description.as_deref(), Some("body1 position"));
        let mut out = Vec::new();
        write_dump(&mut out, &[source], &DumpOptions::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("#     0001: y\n#     0002: Time\n"));
        assert!(text.ends_with(
            "2.0000000000000000e+00 0.0000000000000000e+00\n\
             4.0000000000000000e+00 1.0000000000000000e+00\n\
             6.0000000000000000e+00 2.0000000000000000e+00\n"
        ));

        // the dataset path works as well; a group description is the fallback
        let joint = DumpSource::load(&nav, "/model/joints/joint1/data/", "").unwrap();
        assert_eq!(joint.path, "/model/joints/joint1/data");
        assert_eq!(joint.description.as_deref(), Some("revolute"));

        assert!(matches!(
            DumpSource::load(&nav, "/model/joints", ""),
            Err(Error::NoData(_))
        ));
        assert!(matches!(
            DumpSource::load(&nav, "/nowhere", ""),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn dataset_description_wins_over_group() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("described.h5");
        {
            let writer = SerieWriter::create(&path).unwrap();
            let group = add_group(writer.root(), "g", Some("group text"), false).unwrap();
            add_data(&group, &["t"], &array![[0.0]], Some("dataset text")).unwrap();
        }
        let nav = Navigator::open(&path).unwrap();
        let source = DumpSource::load(&nav, "/g", "").unwrap();
        assert_eq!(source.description.as_deref(), Some("dataset text"));
    }

    #[test]
    fn series_table() {
        let series = PlotSeries {
            x: vec![0.0, 1.0],
            y: vec![2.0, 3.0],
            x_label: "Time".into(),
            y_label: "x".into(),
            headline: "x vs. Time".into(),
            x_snippet: "x = ...".into(),
            y_snippet: "y = ...".into(),
        };
        let options = DumpOptions {
            precision: None,
            ..DumpOptions::default()
        };
        let mut out = Vec::new();
        write_series(&mut out, &series, &options).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# x vs. Time\n# x = ...\n# y = ...\n0 2\n1 3\n"
        );
    }
}
