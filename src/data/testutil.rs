use std::path::{Path, PathBuf};

use ndarray::array;

use super::writer::{add_data, add_group, SerieWriter};

/// Write the shared fixture to `dir/sample.mbsh5`:
///
/// ```text
/// /model            Description = "Multibody model"
///   body1/data      Time x y        (3 rows)
///   body2/data      Time phi        (2 rows)
///   joints/joint1/data  Time F      (2 rows)
/// /results/data     Time Energy     (2 rows)
/// ```
pub fn sample_file(dir: &Path) -> PathBuf {
    let path = dir.join("sample.mbsh5");
    let writer = SerieWriter::create(&path).unwrap();
    let root = writer.root();

    let model = add_group(root, "model", Some("Multibody model"), false).unwrap();
    let body1 = add_group(&model, "body1", None, false).unwrap();
    add_data(
        &body1,
        &["Time", "x", "y"],
        &array![[0.0, 1.0, 2.0], [1.0, 3.0, 4.0], [2.0, 5.0, 6.0]],
        Some("body1 position"),
    )
    .unwrap();
    let body2 = add_group(&model, "body2", None, false).unwrap();
    add_data(&body2, &["Time", "phi"], &array![[0.0, 0.1], [1.0, 0.2]], None).unwrap();
    let joints = add_group(&model, "joints", None, false).unwrap();
    let joint1 = add_group(&joints, "joint1", Some("revolute"), false).unwrap();
    add_data(&joint1, &["Time", "F"], &array![[0.0, -9.81], [1.0, -9.5]], None).unwrap();

    let results = add_group(root, "results", None, false).unwrap();
    add_data(&results, &["Time", "Energy"], &array![[0.0, 10.0], [1.0, 9.0]], None).unwrap();

    path
}
