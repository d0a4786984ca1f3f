use crate::errors::Error;
use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use std::fs;
use std::path::Path;

/// Read a whitespace-delimited numeric table
///
/// Blank lines and anything after a `#` are ignored. Every remaining row must have
/// the same number of columns.
///
/// # Arguments
/// * `path` - text file with one record per row
///
/// # Returns
/// * `table[(i_row, i_column)]`
///
pub fn load_table(path: &Path) -> Result<Array2<f64>, Error> {
    let contents: String = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;

    let mut values: Vec<f64> = Vec::new();
    let mut n_columns: Option<usize> = None;
    let mut n_rows: usize = 0;
    for (i_line, line) in contents.lines().enumerate() {
        let data: &str = match line.find('#') {
            Some(i_comment) => &line[..i_comment],
            None => line,
        };
        let tokens: Vec<&str> = data.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let expected: usize = *n_columns.get_or_insert(tokens.len());
        if tokens.len() != expected {
            return Err(Error::RaggedTable {
                path: path.to_path_buf(),
                line: i_line + 1,
                expected,
                found: tokens.len(),
            });
        }

        for token in tokens {
            let value: f64 = token.parse::<f64>().map_err(|_| Error::Parse {
                path: path.to_path_buf(),
                line: i_line + 1,
                token: token.to_string(),
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    let n_columns: usize = n_columns.unwrap_or(0);
    debug!("loaded {} ({} x {})", path.display(), n_rows, n_columns);

    // Row count and column count are consistent by construction
    let table: Array2<f64> = Array2::from_shape_vec((n_rows, n_columns), values).map_err(|_| Error::Reshape {
        n_elements: n_rows * n_columns,
        record_size: n_columns,
    })?;
    return Ok(table);
}

/// Read a table and flatten it row-major
pub fn load_flat(path: &Path) -> Result<Array1<f64>, Error> {
    let table: Array2<f64> = load_table(path)?;
    let flat: Array1<f64> = table.iter().cloned().collect();
    return Ok(flat);
}

/// Reshape a flat array into `(-1, record_shape...)`
///
/// The number of elements must be an exact multiple of the record size; the tail is
/// never silently dropped.
pub fn reshape_records(flat: Array1<f64>, record_shape: &[usize]) -> Result<ArrayD<f64>, Error> {
    let n_elements: usize = flat.len();
    let record_size: usize = record_shape.iter().product();

    if record_size == 0 || n_elements % record_size != 0 {
        return Err(Error::Reshape { n_elements, record_size });
    }

    let mut shape: Vec<usize> = Vec::with_capacity(record_shape.len() + 1);
    shape.push(n_elements / record_size);
    shape.extend_from_slice(record_shape);

    let reshaped: ArrayD<f64> = flat
        .into_shape_with_order(IxDyn(&shape))
        .map_err(|_| Error::Reshape { n_elements, record_size })?;
    return Ok(reshaped);
}

/// Load a file as `n_records` vectors of length `n`, shape = (n_records, n)
pub fn load_vectors(path: &Path, n: usize) -> Result<Array2<f64>, Error> {
    let flat: Array1<f64> = load_flat(path)?;
    let vectors: Array2<f64> = reshape_vectors(flat, n)?;
    return Ok(vectors);
}

/// Load a file as `n_records` matrices, shape = (n_records, n_rows, n_cols)
pub fn load_matrices(path: &Path, n_rows: usize, n_cols: usize) -> Result<Array3<f64>, Error> {
    let flat: Array1<f64> = load_flat(path)?;
    let matrices: Array3<f64> = reshape_matrices(flat, n_rows, n_cols)?;
    return Ok(matrices);
}

pub fn reshape_vectors(flat: Array1<f64>, n: usize) -> Result<Array2<f64>, Error> {
    let n_elements: usize = flat.len();
    let reshaped: ArrayD<f64> = reshape_records(flat, &[n])?;
    return reshaped
        .into_dimensionality()
        .map_err(|_| Error::Reshape { n_elements, record_size: n });
}

pub fn reshape_matrices(flat: Array1<f64>, n_rows: usize, n_cols: usize) -> Result<Array3<f64>, Error> {
    let n_elements: usize = flat.len();
    let reshaped: ArrayD<f64> = reshape_records(flat, &[n_rows, n_cols])?;
    return reshaped.into_dimensionality().map_err(|_| Error::Reshape {
        n_elements,
        record_size: n_rows * n_cols,
    });
}

#[test]
fn test_reshape_rejects_partial_record() {
    // 10 elements cannot be split into records of 3
    let flat: Array1<f64> = Array1::linspace(0.0, 9.0, 10);
    let result: Result<Array2<f64>, Error> = reshape_vectors(flat, 3);

    match result {
        Err(Error::Reshape { n_elements, record_size }) => {
            assert_eq!(n_elements, 10);
            assert_eq!(record_size, 3);
        }
        other => panic!("expected a reshape error, got {:?}", other),
    }
}

#[test]
fn test_reshape_matrices_row_major() {
    let flat: Array1<f64> = Array1::linspace(0.0, 17.0, 18);
    let matrices: Array3<f64> = reshape_matrices(flat, 3, 3).unwrap();

    assert_eq!(matrices.shape(), &[2, 3, 3]);
    assert_eq!(matrices[(0, 0, 2)], 2.0);
    assert_eq!(matrices[(0, 1, 0)], 3.0);
    assert_eq!(matrices[(1, 2, 2)], 17.0);
}

#[test]
fn test_load_table_skips_comments_and_blank_lines() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# d0 z0 t").unwrap();
    writeln!(file, "0.1  0.2 0.3").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "1e-3 -2.5 4 # trailing comment").unwrap();

    let table: Array2<f64> = load_table(file.path()).unwrap();
    assert_eq!(table.shape(), &[2, 3]);
    assert_eq!(table[(1, 0)], 1e-3);
    assert_eq!(table[(1, 1)], -2.5);

    // The same file read as flat records of three
    let vectors: Array2<f64> = load_vectors(file.path(), 3).unwrap();
    assert_eq!(vectors, table);
}

#[test]
fn test_load_table_errors() {
    use std::io::Write;

    let mut ragged = tempfile::NamedTempFile::new().unwrap();
    writeln!(ragged, "1 2 3").unwrap();
    writeln!(ragged, "4 5").unwrap();
    assert!(matches!(load_table(ragged.path()), Err(Error::RaggedTable { line: 2, expected: 3, found: 2, .. })));

    let mut garbage = tempfile::NamedTempFile::new().unwrap();
    writeln!(garbage, "1 two 3").unwrap();
    assert!(matches!(load_table(garbage.path()), Err(Error::Parse { line: 1, .. })));

    let missing: &Path = Path::new("/nonexistent/trackParams.txt");
    assert!(matches!(load_table(missing), Err(Error::Io { .. })));
}
