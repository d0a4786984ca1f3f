use super::event_data::{ConstantBField, FittedVertex, Particle, TrackParameters, VertexingEvent};
use super::selectors::{ParticleSelector, TrackParameterSelector};
use super::sequencer::Sequencer;
use super::vertexing_generics::{ParticleSource, TrackSource, VertexFinder, VertexFinderKind};
use crate::errors::Error;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const VERTEX_OUTPUT_FILE: &str = "vertices.txt";

/// Settings of one vertex-fitting run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexFittingConfig {
    /// Truth particle table, relative to the input directory
    #[serde(default = "VertexFittingConfig::default_particles")]
    pub particles: PathBuf,
    /// Track summary table, relative to the input directory
    #[serde(default = "VertexFittingConfig::default_tracks")]
    pub tracks: PathBuf,
    #[serde(default = "VertexFittingConfig::default_vertex_finder")]
    pub vertex_finder: VertexFinderKind,
    #[serde(default = "VertexFittingConfig::default_write_output")]
    pub write_output: bool,
    #[serde(default)]
    pub field: ConstantBField,
    #[serde(default)]
    pub sequencer: Sequencer,
    #[serde(default)]
    pub particle_selection: ParticleSelector,
    #[serde(default)]
    pub track_selection: TrackParameterSelector,
}

impl VertexFittingConfig {
    fn default_particles() -> PathBuf {
        PathBuf::from("particles.txt")
    }
    fn default_tracks() -> PathBuf {
        PathBuf::from("tracksummary.txt")
    }
    fn default_vertex_finder() -> VertexFinderKind {
        VertexFinderKind::Truth
    }
    fn default_write_output() -> bool {
        true
    }
}

impl Default for VertexFittingConfig {
    fn default() -> Self {
        Self {
            particles: Self::default_particles(),
            tracks: Self::default_tracks(),
            vertex_finder: Self::default_vertex_finder(),
            write_output: Self::default_write_output(),
            field: ConstantBField::default(),
            sequencer: Sequencer::default(),
            particle_selection: ParticleSelector::default(),
            track_selection: TrackParameterSelector::default(),
        }
    }
}

/// Select particles and tracks, then find vertices event by event
///
/// # Arguments
/// * `config` - selections, vertex finder, field and sequencer settings
/// * `output_dir` - where `vertices.txt` is written when `config.write_output` is set
/// * `particle_source`, `track_source` - event inputs; both must exist on disk
/// * `finder` - backend providing `config.vertex_finder`
///
/// # Returns
/// * every fitted vertex, ordered by event
///
/// Nothing is read or run if an input is missing.
pub fn run_vertex_fitting(
    config: &VertexFittingConfig,
    output_dir: &Path,
    particle_source: &dyn ParticleSource,
    track_source: &dyn TrackSource,
    finder: &dyn VertexFinder,
) -> Result<Vec<FittedVertex>, Error> {
    check_input_exists("particle", particle_source.particle_path())?;
    check_input_exists("track summary", track_source.track_path())?;

    let kind: VertexFinderKind = config.vertex_finder;
    if !finder.supports(kind) {
        error!("vertex finder {} is not available", kind);
        return Err(Error::UnsupportedVertexFinder(kind.to_string()));
    }

    info!("reading particles from {}", particle_source.particle_path().display());
    let particles: BTreeMap<u64, Vec<Particle>> = particle_source.read_particles()?;
    info!("reading track summary from {}", track_source.track_path().display());
    let tracks: BTreeMap<u64, Vec<TrackParameters>> = track_source.read_tracks()?;

    let events: Vec<VertexingEvent> = build_events(particles, tracks, &config.particle_selection, &config.track_selection);
    info!("using vertex finder: {}", kind);

    let field: ConstantBField = config.field;
    let per_event: Vec<Vec<FittedVertex>> = config.sequencer.run(&events, |event| finder.find_vertices(kind, event, &field))?;
    let vertices: Vec<FittedVertex> = per_event.into_iter().flatten().collect();
    info!("found {} vertices", vertices.len());

    if config.write_output {
        write_vertices(&output_dir.join(VERTEX_OUTPUT_FILE), &vertices)?;
    }
    return Ok(vertices);
}

fn check_input_exists(what: &str, path: &Path) -> Result<(), Error> {
    if !path.exists() {
        error!("Fatal: input {} path does not exist: {}", what, path.display());
        return Err(Error::MissingInput {
            what: what.to_string(),
            path: path.to_path_buf(),
        });
    }
    return Ok(());
}

/// Apply the selections and pair particles with tracks by event id
pub fn build_events(
    mut particles: BTreeMap<u64, Vec<Particle>>,
    mut tracks: BTreeMap<u64, Vec<TrackParameters>>,
    particle_selection: &ParticleSelector,
    track_selection: &TrackParameterSelector,
) -> Vec<VertexingEvent> {
    let event_ids: BTreeSet<u64> = particles.keys().chain(tracks.keys()).cloned().collect();

    let mut events: Vec<VertexingEvent> = Vec::with_capacity(event_ids.len());
    let mut n_particles_selected: usize = 0;
    let mut n_tracks_selected: usize = 0;
    for event_id in event_ids {
        let associated_particles: Vec<Particle> = particles.remove(&event_id).unwrap_or_default();
        let event_particles: Vec<Particle> = particle_selection.select(associated_particles.clone());
        let event_tracks: Vec<TrackParameters> = track_selection.select(tracks.remove(&event_id).unwrap_or_default());
        n_particles_selected += event_particles.len();
        n_tracks_selected += event_tracks.len();
        events.push(VertexingEvent {
            event_id,
            particles: event_particles,
            associated_particles,
            tracks: event_tracks,
        });
    }
    info!("selected {} particles and {} tracks in {} events", n_particles_selected, n_tracks_selected, events.len());

    return events;
}

/// One row per vertex: `event vertex x y z t n_tracks`
pub fn write_vertices(path: &Path, vertices: &[FittedVertex]) -> Result<(), Error> {
    let mut contents: String = String::from("# event vertex x y z t n_tracks\n");
    for vertex in vertices {
        let [x, y, z, t] = vertex.position;
        contents += &format!("{} {} {:.6e} {:.6e} {:.6e} {:.6e} {}\n", vertex.event_id, vertex.vertex_id, x, y, z, t, vertex.n_tracks);
    }
    fs::write(path, contents).map_err(|source| Error::io(path, source))?;
    info!("wrote {}", path.display());
    return Ok(());
}

#[cfg(test)]
struct CountingFinder {
    kind: VertexFinderKind,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl VertexFinder for CountingFinder {
    fn supports(&self, kind: VertexFinderKind) -> bool {
        return kind == self.kind;
    }

    fn find_vertices(&self, _kind: VertexFinderKind, event: &VertexingEvent, field: &ConstantBField) -> Result<Vec<FittedVertex>, Error> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        return Ok(vec![FittedVertex {
            event_id: event.event_id,
            vertex_id: 0,
            position: [field.bz, 0.0, 0.0, 0.0],
            n_tracks: event.tracks.len(),
        }]);
    }
}

#[cfg(test)]
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let particles_path: PathBuf = dir.join("particles.txt");
    let tracks_path: PathBuf = dir.join("tracksummary.txt");
    fs::write(
        &particles_path,
        "0 1 1 1 1.0 0.0 0.0 0.0 0.0 1.0 0.0\n0 2 1 0 1.0 0.0 0.0 0.0 0.0 1.0 0.0\n1 1 1 1 1.0 0.0 0.0 0.0 0.0 -2.0 0.0\n",
    )
    .unwrap();
    // The second track of event 0 fails the default d0 cut
    fs::write(&tracks_path, "0 1 0.0 1.0 0.0 1.5 1.0 0.0\n0 2 2000.0 1.0 0.0 1.5 1.0 0.0\n1 1 0.0 -2.0 0.0 1.5 1.0 0.0\n").unwrap();
    return (particles_path, tracks_path);
}

#[test]
fn test_run_vertex_fitting_with_custom_finder() {
    use super::text_table_reader::TextTableReader;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempfile::tempdir().unwrap();
    let (particles_path, tracks_path) = write_inputs(dir.path());
    let finder: CountingFinder = CountingFinder {
        kind: VertexFinderKind::Amvf,
        calls: AtomicUsize::new(0),
    };
    let config: VertexFittingConfig = VertexFittingConfig {
        vertex_finder: VertexFinderKind::Amvf,
        field: ConstantBField::new(0.0, 0.0, 2.0),
        ..Default::default()
    };

    let vertices: Vec<FittedVertex> = run_vertex_fitting(
        &config,
        dir.path(),
        &TextTableReader::new(&particles_path),
        &TextTableReader::new(&tracks_path),
        &finder,
    )
    .unwrap();

    assert_eq!(finder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(vertices.len(), 2);
    assert_eq!((vertices[0].event_id, vertices[0].n_tracks), (0, 1));
    assert_eq!(vertices[1].event_id, 1);
    assert_eq!(vertices[0].position[0], 2.0);

    let written: String = fs::read_to_string(dir.path().join(VERTEX_OUTPUT_FILE)).unwrap();
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn test_missing_input_exits_before_running() {
    use super::text_table_reader::TextTableReader;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let dir = tempfile::tempdir().unwrap();
    let (particles_path, _) = write_inputs(dir.path());
    let finder: CountingFinder = CountingFinder {
        kind: VertexFinderKind::Truth,
        calls: AtomicUsize::new(0),
    };

    let result = run_vertex_fitting(
        &VertexFittingConfig::default(),
        dir.path(),
        &TextTableReader::new(&particles_path),
        &TextTableReader::new(&dir.path().join("missing.txt")),
        &finder,
    );
    assert!(matches!(result, Err(Error::MissingInput { .. })));
    assert_eq!(finder.calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join(VERTEX_OUTPUT_FILE).exists());
}

#[test]
fn test_unsupported_vertex_finder() {
    use super::text_table_reader::TextTableReader;
    use super::truth_vertex_finder::TruthVertexFinder;

    let dir = tempfile::tempdir().unwrap();
    let (particles_path, tracks_path) = write_inputs(dir.path());
    let config: VertexFittingConfig = VertexFittingConfig {
        vertex_finder: VertexFinderKind::Iterative,
        ..Default::default()
    };
    let result = run_vertex_fitting(
        &config,
        dir.path(),
        &TextTableReader::new(&particles_path),
        &TextTableReader::new(&tracks_path),
        &TruthVertexFinder,
    );
    assert!(matches!(result, Err(Error::UnsupportedVertexFinder(_))));
}

#[test]
fn test_truth_vertex_fitting_end_to_end() {
    use super::text_table_reader::TextTableReader;
    use super::truth_vertex_finder::TruthVertexFinder;

    let dir = tempfile::tempdir().unwrap();
    let (particles_path, tracks_path) = write_inputs(dir.path());
    let config: VertexFittingConfig = VertexFittingConfig {
        write_output: false,
        ..Default::default()
    };
    let vertices: Vec<FittedVertex> = run_vertex_fitting(
        &config,
        dir.path(),
        &TextTableReader::new(&particles_path),
        &TextTableReader::new(&tracks_path),
        &TruthVertexFinder,
    )
    .unwrap();

    // Particle 2 of event 0 is neutral and removed, and its track fails the d0 cut
    assert_eq!(vertices.len(), 2);
    assert_eq!(vertices[0].position[2], 1.0);
    assert_eq!(vertices[1].position[2], -2.0);
    assert!(!dir.path().join(VERTEX_OUTPUT_FILE).exists());
}

#[test]
fn test_build_events_keeps_unselected_particles_for_association() {
    use super::truth_vertex_finder::TruthVertexFinder;

    let neutral: Particle = Particle {
        event_id: 4,
        particle_id: 1,
        vertex_id: 5,
        charge: 0.0,
        momentum: [1.0, 0.0, 0.0],
        production: [0.0, 0.0, 3.0, 0.0],
    };
    let track: TrackParameters = TrackParameters {
        event_id: 4,
        particle_id: 1,
        d0: 0.0,
        z0: 3.0,
        phi: 0.0,
        theta: 1.5,
        qop: 1.0,
        time: 0.0,
    };
    let events: Vec<VertexingEvent> = build_events(
        BTreeMap::from([(4, vec![neutral])]),
        BTreeMap::from([(4, vec![track])]),
        &ParticleSelector::default(),
        &TrackParameterSelector::default(),
    );

    assert_eq!(events.len(), 1);
    assert!(events[0].particles.is_empty());
    assert_eq!(events[0].associated_particles.len(), 1);
    assert_eq!(events[0].tracks.len(), 1);

    let vertices: Vec<FittedVertex> = TruthVertexFinder
        .find_vertices(VertexFinderKind::Truth, &events[0], &ConstantBField::default())
        .unwrap();
    assert_eq!(vertices.len(), 1);
    assert_eq!(vertices[0].vertex_id, 5);
    assert_eq!(vertices[0].position[2], 3.0);
}
