use super::event_data::{Particle, TrackParameters};
use super::vertexing_generics::{ParticleSource, TrackSource};
use crate::data_loader::load_table;
use crate::errors::Error;
use log::info;
use ndarray::{Array2, ArrayView1};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// `event particle vertex charge px py pz vx vy vz t`
pub const N_PARTICLE_COLUMNS: usize = 11;
/// `event particle d0 z0 phi theta qop t`
pub const N_TRACK_COLUMNS: usize = 8;

/// Reads particles or tracks exported as whitespace-delimited text, one row per object
///
/// Ids are stored as floating point numbers, the same as every other column.
#[derive(Clone, Debug)]
pub struct TextTableReader {
    pub path: PathBuf,
}

impl TextTableReader {
    pub fn new(path: &Path) -> Self {
        return TextTableReader { path: path.to_path_buf() };
    }

    fn read_rows(&self, n_columns: usize) -> Result<Array2<f64>, Error> {
        let table: Array2<f64> = load_table(&self.path)?;
        if table.nrows() > 0 && table.ncols() != n_columns {
            return Err(Error::ShapeMismatch {
                left: table.shape().to_vec(),
                right: vec![table.nrows(), n_columns],
            });
        }
        return Ok(table);
    }
}

impl ParticleSource for TextTableReader {
    fn particle_path(&self) -> &Path {
        return &self.path;
    }

    fn read_particles(&self) -> Result<BTreeMap<u64, Vec<Particle>>, Error> {
        let table: Array2<f64> = self.read_rows(N_PARTICLE_COLUMNS)?;

        let mut events: BTreeMap<u64, Vec<Particle>> = BTreeMap::new();
        for row in table.rows() {
            let particle: Particle = particle_from_row(row);
            events.entry(particle.event_id).or_default().push(particle);
        }
        info!("read {} particles in {} events from {}", table.nrows(), events.len(), self.path.display());
        return Ok(events);
    }
}

impl TrackSource for TextTableReader {
    fn track_path(&self) -> &Path {
        return &self.path;
    }

    fn read_tracks(&self) -> Result<BTreeMap<u64, Vec<TrackParameters>>, Error> {
        let table: Array2<f64> = self.read_rows(N_TRACK_COLUMNS)?;

        let mut events: BTreeMap<u64, Vec<TrackParameters>> = BTreeMap::new();
        for row in table.rows() {
            let track: TrackParameters = track_from_row(row);
            events.entry(track.event_id).or_default().push(track);
        }
        info!("read {} tracks in {} events from {}", table.nrows(), events.len(), self.path.display());
        return Ok(events);
    }
}

fn particle_from_row(row: ArrayView1<f64>) -> Particle {
    return Particle {
        event_id: row[0] as u64,
        particle_id: row[1] as u64,
        vertex_id: row[2] as u64,
        charge: row[3],
        momentum: [row[4], row[5], row[6]],
        production: [row[7], row[8], row[9], row[10]],
    };
}

fn track_from_row(row: ArrayView1<f64>) -> TrackParameters {
    return TrackParameters {
        event_id: row[0] as u64,
        particle_id: row[1] as u64,
        d0: row[2],
        z0: row[3],
        phi: row[4],
        theta: row[5],
        qop: row[6],
        time: row[7],
    };
}

#[test]
fn test_read_particles_and_tracks() {
    use std::io::Write;

    let mut particles_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(particles_file, "# event particle vertex charge px py pz vx vy vz t").unwrap();
    writeln!(particles_file, "0 1 5 1 1.0 0.0 0.5 0.0 0.0 1.0 0.0").unwrap();
    writeln!(particles_file, "0 2 5 -1 0.5 0.5 0.0 0.0 0.0 1.0 0.0").unwrap();
    writeln!(particles_file, "2 1 7 0 1.0 0.0 0.0 0.0 0.0 -3.0 4.0").unwrap();

    let reader: TextTableReader = TextTableReader::new(particles_file.path());
    let particles: BTreeMap<u64, Vec<Particle>> = reader.read_particles().unwrap();
    assert_eq!(particles.keys().cloned().collect::<Vec<u64>>(), vec![0, 2]);
    assert_eq!(particles[&0].len(), 2);
    assert_eq!(particles[&2][0].vertex_id, 7);
    assert_eq!(particles[&2][0].production, [0.0, 0.0, -3.0, 4.0]);

    // The same file does not have the track layout
    assert!(matches!(reader.read_tracks(), Err(Error::ShapeMismatch { .. })));

    let mut tracks_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(tracks_file, "0 1 0.01 1.0 0.1 1.2 0.5 0.0").unwrap();
    let tracks: BTreeMap<u64, Vec<TrackParameters>> = TextTableReader::new(tracks_file.path()).read_tracks().unwrap();
    assert_eq!(tracks[&0][0].particle_id, 1);
    assert_eq!(tracks[&0][0].qop, 0.5);
}

#[test]
fn test_empty_table_has_no_events() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let tracks: BTreeMap<u64, Vec<TrackParameters>> = TextTableReader::new(file.path()).read_tracks().unwrap();
    assert!(tracks.is_empty());
}
