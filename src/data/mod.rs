/// Data layer: HDF5 series files, read and written.
///
/// Architecture:
/// ```text
///   .mbsh5 / .h5
///        │
///        ▼
///   ┌────────────┐
///   │ navigator  │  resolve paths, walk groups, search, labels, data
///   └────────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │   tree   │   │  export  │  matches → viewer tree / ASCII tables
///   └──────────┘   └──────────┘
///
///   ┌──────────┐
///   │  writer  │  author groups, `data` datasets and attributes
///   └──────────┘
/// ```

pub mod export;
pub mod model;
pub mod navigator;
pub mod tree;
pub mod writer;

#[cfg(test)]
pub(crate) mod testutil;
