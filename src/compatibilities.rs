use crate::data_loader::{load_flat, reshape_vectors};
use crate::errors::Error;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Layout of the compatibility tables and the vertex to inspect
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompatibilitySettings {
    #[serde(default = "CompatibilitySettings::default_n_vertices")]
    pub n_vertices: usize,
    #[serde(default = "CompatibilitySettings::default_n_tracks_per_vertex")]
    pub n_tracks_per_vertex: usize,
    #[serde(default = "CompatibilitySettings::default_vertex_index")]
    pub vertex_index: usize,
    /// Tracks truly produced at `vertex_index`; looked up from `vertex_index` when not set
    #[serde(default)]
    pub correct_track_indices: Option<Vec<usize>>,
}

impl CompatibilitySettings {
    fn default_n_vertices() -> usize {
        5
    }
    fn default_n_tracks_per_vertex() -> usize {
        4
    }
    fn default_vertex_index() -> usize {
        1
    }
    pub fn n_tracks(&self) -> usize {
        return self.n_vertices * self.n_tracks_per_vertex;
    }

    /// Tracks truly produced at `vertex_index`
    ///
    /// An explicit list wins. Otherwise the list is taken from the known layout of the
    /// compatibility tables, which only covers vertices 0 and 1.
    pub fn true_track_indices(&self) -> Result<Vec<usize>, Error> {
        if let Some(indices) = &self.correct_track_indices {
            return Ok(indices.clone());
        }
        let indices: Vec<usize> = match self.vertex_index {
            0 => vec![1, 5, 12, 13],
            1 => vec![0, 10, 17, 18],
            vertex_index => return Err(Error::UnknownTrueTracks { vertex_index }),
        };
        return Ok(indices);
    }
}

impl Default for CompatibilitySettings {
    fn default() -> Self {
        Self {
            n_vertices: Self::default_n_vertices(),
            n_tracks_per_vertex: Self::default_n_tracks_per_vertex(),
            vertex_index: Self::default_vertex_index(),
            correct_track_indices: None,
        }
    }
}

/// One vertex's compatibilities with and without time, each scaled to a maximum of 1
#[derive(Clone, Debug)]
pub struct CompatibilityComparison {
    pub with_time: Array1<f64>,
    pub without_time: Array1<f64>,
    pub correct_track_indices: Vec<usize>,
}

/// Load a (n_vertices, n_tracks) compatibility matrix
pub fn load_compatibilities(path: &Path, n_tracks: usize) -> Result<Array2<f64>, Error> {
    let flat: Array1<f64> = load_flat(path)?;
    return reshape_vectors(flat, n_tracks);
}

/// Divide a row by its maximum
pub fn normalise_by_max(row: ArrayView1<f64>) -> Result<Array1<f64>, Error> {
    let max: f64 = *row.max_skipnan();
    if row.is_empty() || max.is_nan() {
        return Err(Error::EmptyInput {
            what: "compatibility row has no finite values".to_string(),
        });
    }
    return Ok(row.mapv(|x: f64| x / max));
}

/// Pick `vertex_index` from both matrices and normalise each row to its maximum
pub fn compare_compatibilities(with_time: &Array2<f64>, without_time: &Array2<f64>, settings: &CompatibilitySettings) -> Result<CompatibilityComparison, Error> {
    let i_vertex: usize = settings.vertex_index;
    if i_vertex >= with_time.nrows() || i_vertex >= without_time.nrows() || with_time.ncols() != without_time.ncols() {
        return Err(Error::ShapeMismatch {
            left: with_time.shape().to_vec(),
            right: without_time.shape().to_vec(),
        });
    }

    return Ok(CompatibilityComparison {
        with_time: normalise_by_max(with_time.row(i_vertex))?,
        without_time: normalise_by_max(without_time.row(i_vertex))?,
        correct_track_indices: settings.true_track_indices()?,
    });
}

#[test]
fn test_compare_compatibilities() {
    use approx::assert_abs_diff_eq;

    let settings: CompatibilitySettings = CompatibilitySettings {
        n_vertices: 2,
        n_tracks_per_vertex: 2,
        vertex_index: 1,
        correct_track_indices: Some(vec![2]),
    };
    let with_time: Array2<f64> = Array2::from_shape_vec((2, 4), vec![1.0, 1.0, 1.0, 1.0, 2.0, 4.0, 8.0, 0.0]).unwrap();
    let without_time: Array2<f64> = Array2::from_shape_vec((2, 4), vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 0.25]).unwrap();

    let comparison: CompatibilityComparison = compare_compatibilities(&with_time, &without_time, &settings).unwrap();
    assert_abs_diff_eq!(comparison.with_time, Array1::from(vec![0.25, 0.5, 1.0, 0.0]), epsilon = 1e-12);
    assert_abs_diff_eq!(comparison.without_time, Array1::from(vec![0.5, 0.5, 1.0, 0.25]), epsilon = 1e-12);
    assert_eq!(comparison.correct_track_indices, vec![2]);

    let out_of_range: CompatibilitySettings = CompatibilitySettings { vertex_index: 2, ..settings };
    assert!(compare_compatibilities(&with_time, &without_time, &out_of_range).is_err());
}

#[test]
fn test_true_track_indices_follow_vertex_index() {
    let vertex_1: CompatibilitySettings = CompatibilitySettings::default();
    assert_eq!(vertex_1.true_track_indices().unwrap(), vec![0, 10, 17, 18]);

    let vertex_0: CompatibilitySettings = CompatibilitySettings { vertex_index: 0, ..Default::default() };
    assert_eq!(vertex_0.true_track_indices().unwrap(), vec![1, 5, 12, 13]);

    let vertex_3: CompatibilitySettings = CompatibilitySettings { vertex_index: 3, ..Default::default() };
    assert!(matches!(vertex_3.true_track_indices(), Err(Error::UnknownTrueTracks { vertex_index: 3 })));

    // An explicit list is used for any vertex
    let explicit: CompatibilitySettings = CompatibilitySettings {
        vertex_index: 3,
        correct_track_indices: Some(vec![4, 7]),
        ..Default::default()
    };
    assert_eq!(explicit.true_track_indices().unwrap(), vec![4, 7]);
}

#[test]
fn test_load_compatibilities_reshapes_by_track_count() {
    use std::io::Write;

    let settings: CompatibilitySettings = CompatibilitySettings::default();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for i_vertex in 0..settings.n_vertices {
        let row: Vec<String> = (0..settings.n_tracks()).map(|i_track| format!("{}", i_vertex * 100 + i_track)).collect();
        writeln!(file, "{}", row.join(" ")).unwrap();
    }

    let compatibilities: Array2<f64> = load_compatibilities(file.path(), settings.n_tracks()).unwrap();
    assert_eq!(compatibilities.dim(), (5, 20));
    assert_eq!(compatibilities[(1, 19)], 119.0);

    // A table with a different number of tracks cannot be reshaped
    assert!(matches!(load_compatibilities(file.path(), 3), Err(Error::Reshape { .. })));
}
