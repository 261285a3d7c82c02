use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use h5plotserie::data::export::{write_dump, write_series, DumpOptions, DumpSource};
use h5plotserie::data::model::DATA;
use h5plotserie::data::navigator::segments;
use h5plotserie::data::tree::TreeNode;
use h5plotserie::{Navigator, Session, SessionConfig};

/// Browse HDF5 simulation-result series: group tree, search, labels and columns.
#[derive(Parser, Debug)]
#[command(name = "h5plotserie", version)]
struct Cli {
    /// JSON session config (accepted extensions, default columns, delimiter).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the group tree of each file.
    Tree {
        files: Vec<PathBuf>,
        /// Only show groups whose name matches this regex.
        #[arg(long, default_value = "")]
        search: String,
        /// List every group with the column labels of its data.
        #[arg(long, conflicts_with = "json")]
        labels: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print the paths of all members whose name matches a regex.
    Search { pattern: String, files: Vec<PathBuf> },
    /// Print the column labels of a series.
    Labels { file: PathBuf, path: String },
    /// Print the attributes of a group or dataset.
    Attrs {
        file: PathBuf,
        path: String,
        #[arg(long)]
        json: bool,
    },
    /// Dump series as an ASCII table. Each source is `PATH[:COLUMNS]`, with
    /// 1-based columns such as `1,3-5` or `2-`.
    Dump {
        file: PathBuf,
        #[arg(required = true)]
        sources: Vec<String>,
        #[arg(short, long)]
        delimiter: Option<char>,
        #[arg(short, long, default_value = "#")]
        comment: String,
        #[arg(short, long, default_value = "nan")]
        nan: String,
        /// Omit the commented header.
        #[arg(short, long)]
        silent: bool,
        /// Digits after the point in scientific notation.
        #[arg(short, long, default_value_t = f64::DIGITS as usize + 1)]
        precision: usize,
        /// Write values in their shortest exact decimal form instead.
        #[arg(long, conflicts_with = "precision")]
        plain: bool,
    },
    /// Print one column against another, as a plotting backend would get it.
    Plot {
        file: PathBuf,
        path: String,
        /// 1-based x column (default from config).
        #[arg(long)]
        x: Option<usize>,
        /// 1-based y column (default from config).
        #[arg(long)]
        y: Option<usize>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let mut session = Session::new(config);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Tree {
            files,
            search,
            labels,
            json,
        } => {
            preload(&mut session, &files)?;
            session.set_search(&search)?;
            if labels {
                for file in session.files() {
                    writeln!(out, "{}", file.display())?;
                    let nav = session.navigator(file).context("file vanished from session")?;
                    for line in nav.outline() {
                        writeln!(out, "    {line}")?;
                    }
                }
            } else if json {
                #[derive(Serialize)]
                struct JsonTree<'a> {
                    file: &'a Path,
                    tree: &'a TreeNode,
                }
                let trees = session.tree();
                let view: Vec<JsonTree> = trees
                    .iter()
                    .map(|t| JsonTree {
                        file: &t.file,
                        tree: &t.tree,
                    })
                    .collect();
                serde_json::to_writer_pretty(&mut out, &view)?;
                writeln!(out)?;
            } else {
                for file_tree in session.tree() {
                    for line in file_tree.tree.render() {
                        writeln!(out, "{line}")?;
                    }
                }
            }
        }
        Command::Search { pattern, files } => {
            preload(&mut session, &files)?;
            session.set_search(&pattern)?;
            for (file, matches) in session.search() {
                writeln!(out, "{}:", file.display())?;
                for path in matches {
                    writeln!(out, "    {path}")?;
                }
            }
        }
        Command::Labels { file, path } => {
            let nav = open_one(&mut session, &file)?;
            let labels = nav
                .column_labels(&path)
                .with_context(|| format!("no column labels at {path}"))?;
            for (i, label) in labels.iter().enumerate() {
                writeln!(out, "{:4}: {label}", i + 1)?;
            }
        }
        Command::Attrs { file, path, json } => {
            let nav = open_one(&mut session, &file)?;
            let attrs = nav
                .attributes(&path)
                .with_context(|| format!("cannot read attributes of {path}"))?;
            if json {
                serde_json::to_writer_pretty(&mut out, &attrs)?;
                writeln!(out)?;
            } else {
                for (name, value) in attrs {
                    writeln!(out, "{name}\n  {value}\n")?;
                }
            }
        }
        Command::Dump {
            file,
            sources,
            delimiter,
            comment,
            nan,
            silent,
            precision,
            plain,
        } => {
            let delimiter = delimiter.unwrap_or(session.config().delimiter);
            if !delimiter.is_ascii() {
                bail!("delimiter must be a single ASCII character, got {delimiter:?}");
            }
            let nav = open_one(&mut session, &file)?;
            let sources = sources
                .iter()
                .map(|source| {
                    let (path, columns) = source.split_once(':').unwrap_or((source.as_str(), ""));
                    DumpSource::load(nav, path, columns).with_context(|| format!("reading {source}"))
                })
                .collect::<Result<Vec<_>>>()?;
            let options = DumpOptions {
                comment,
                delimiter: delimiter as u8,
                nan,
                header: !silent,
                precision: (!plain).then_some(precision),
            };
            write_dump(&mut out, &sources, &options)?;
        }
        Command::Plot {
            file,
            path,
            x,
            y,
            json,
        } => {
            open_one(&mut session, &file)?;
            let labels = session
                .select(&file, &data_path(&path))
                .with_context(|| format!("{path} holds no labelled data"))?
                .len();
            for (axis, column) in [("x", x), ("y", y)] {
                let Some(column) = column else { continue };
                let index = column.checked_sub(1).filter(|&i| i < labels).with_context(|| {
                    format!("{axis} column {column} out of range (1..={labels})")
                })?;
                if axis == "x" {
                    session.set_x_index(index);
                } else {
                    session.set_y_index(index);
                }
            }
            let series = session
                .plot_series()
                .context("selected columns are not available")?;
            if json {
                serde_json::to_writer_pretty(&mut out, &series)?;
                writeln!(out)?;
            } else {
                let options = DumpOptions {
                    delimiter: session.config().delimiter as u8,
                    ..DumpOptions::default()
                };
                write_series(&mut out, &series, &options)?;
            }
        }
    }
    Ok(())
}

/// Path of the `data` dataset for a group path or a dataset path.
fn data_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if segments(trimmed).last() == Some(DATA) {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{DATA}")
    }
}

/// Pre-load files into the session; failing to open any of them is an error
/// only when nothing could be opened.
fn preload(session: &mut Session, files: &[PathBuf]) -> Result<()> {
    session.open_all(files);
    if session.is_empty() {
        match session.status_message.take() {
            Some(msg) => bail!("no file could be opened ({msg})"),
            None => bail!("no files given"),
        }
    }
    Ok(())
}

fn open_one<'a>(session: &'a mut Session, file: &Path) -> Result<&'a Navigator> {
    session
        .open(file)
        .with_context(|| format!("opening {}", file.display()))?;
    session
        .navigator(file)
        .context("file vanished from session")
}
