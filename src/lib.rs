//! Browse HDF5 simulation-result series.
//!
//! A series file nests groups arbitrarily; any group may hold one 2-D dataset
//! named `data` whose `Column Label` attribute names its columns. The
//! [`Navigator`] resolves paths, walks and searches the group tree and
//! extracts labelled columns; [`Session`] keeps the open files, search and
//! selection a viewer works with; [`data::writer`] authors new files.

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::SessionConfig;
pub use data::model::{AttributeValue, Node, PlotSeries, WalkEntry};
pub use data::navigator::Navigator;
pub use error::{Error, Result};
pub use state::Session;
