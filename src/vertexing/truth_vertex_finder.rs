use super::event_data::{ConstantBField, FittedVertex, Particle, VertexingEvent};
use super::vertexing_generics::{VertexFinder, VertexFinderKind};
use crate::errors::Error;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// Groups tracks by the production vertex of their truth particle
///
/// Tracks are matched against all particles of the event, not only the selected
/// ones, so a track whose particle fails the particle cuts still joins its truth
/// vertex. Tracks without a particle are not assigned. The vertex position is the mean production point of
/// the assigned tracks' particles. The field is not used.
#[derive(Clone, Copy, Debug, Default)]
pub struct TruthVertexFinder;

impl VertexFinder for TruthVertexFinder {
    fn supports(&self, kind: VertexFinderKind) -> bool {
        return kind == VertexFinderKind::Truth;
    }

    fn find_vertices(&self, kind: VertexFinderKind, event: &VertexingEvent, _field: &ConstantBField) -> Result<Vec<FittedVertex>, Error> {
        if !self.supports(kind) {
            return Err(Error::UnsupportedVertexFinder(kind.to_string()));
        }

        let particles: HashMap<u64, &Particle> = event.associated_particles.iter().map(|particle| (particle.particle_id, particle)).collect();

        // vertex_id -> (sum of production points, n_tracks)
        let mut sums: BTreeMap<u64, ([f64; 4], usize)> = BTreeMap::new();
        let mut n_unmatched: usize = 0;
        for track in &event.tracks {
            let Some(particle) = particles.get(&track.particle_id) else {
                n_unmatched += 1;
                continue;
            };
            let (sum, n_tracks) = sums.entry(particle.vertex_id).or_insert(([0.0; 4], 0));
            for i_coord in 0..4 {
                sum[i_coord] += particle.production[i_coord];
            }
            *n_tracks += 1;
        }
        if n_unmatched > 0 {
            debug!("event {}: {} tracks without a truth particle", event.event_id, n_unmatched);
        }

        let vertices: Vec<FittedVertex> = sums
            .into_iter()
            .map(|(vertex_id, (sum, n_tracks))| FittedVertex {
                event_id: event.event_id,
                vertex_id,
                position: sum.map(|coord| coord / n_tracks as f64),
                n_tracks,
            })
            .collect();
        return Ok(vertices);
    }
}

#[test]
fn test_truth_vertex_finder_groups_by_production_vertex() {
    use super::event_data::TrackParameters;
    use approx::assert_abs_diff_eq;

    let particle = |particle_id: u64, vertex_id: u64, z: f64| Particle {
        event_id: 3,
        particle_id,
        vertex_id,
        charge: 1.0,
        momentum: [1.0, 0.0, 0.0],
        production: [0.0, 0.0, z, 10.0],
    };
    let track = |particle_id: u64| TrackParameters {
        event_id: 3,
        particle_id,
        d0: 0.0,
        z0: 0.0,
        phi: 0.0,
        theta: 1.0,
        qop: 1.0,
        time: 0.0,
    };
    let event: VertexingEvent = VertexingEvent {
        event_id: 3,
        particles: Vec::new(),
        associated_particles: vec![particle(1, 20, 1.0), particle(2, 20, 3.0), particle(3, 10, -5.0)],
        tracks: vec![track(1), track(2), track(3), track(99)],
    };

    let vertices: Vec<FittedVertex> = TruthVertexFinder
        .find_vertices(VertexFinderKind::Truth, &event, &ConstantBField::default())
        .unwrap();

    assert_eq!(vertices.len(), 2);
    assert_eq!((vertices[0].vertex_id, vertices[0].n_tracks), (10, 1));
    assert_abs_diff_eq!(vertices[0].position[2], -5.0, epsilon = 1e-12);
    assert_eq!((vertices[1].vertex_id, vertices[1].n_tracks), (20, 2));
    assert_abs_diff_eq!(vertices[1].position[2], 2.0, epsilon = 1e-12);
    assert_abs_diff_eq!(vertices[1].position[3], 10.0, epsilon = 1e-12);
    assert!(vertices.iter().all(|vertex| vertex.event_id == 3));
}

#[test]
fn test_truth_vertex_finder_keeps_tracks_of_unselected_particles() {
    use super::event_data::TrackParameters;
    use super::selectors::ParticleSelector;

    let neutral: Particle = Particle {
        event_id: 0,
        particle_id: 1,
        vertex_id: 5,
        charge: 0.0,
        momentum: [1.0, 0.0, 0.0],
        production: [0.0, 0.0, 2.0, 0.0],
    };
    let track: TrackParameters = TrackParameters {
        event_id: 0,
        particle_id: 1,
        d0: 0.0,
        z0: 2.0,
        phi: 0.0,
        theta: 1.0,
        qop: 1.0,
        time: 0.0,
    };
    let event: VertexingEvent = VertexingEvent {
        event_id: 0,
        particles: ParticleSelector::default().select(vec![neutral.clone()]),
        associated_particles: vec![neutral],
        tracks: vec![track],
    };
    assert!(event.particles.is_empty());

    let vertices: Vec<FittedVertex> = TruthVertexFinder
        .find_vertices(VertexFinderKind::Truth, &event, &ConstantBField::default())
        .unwrap();

    assert_eq!(vertices.len(), 1);
    assert_eq!((vertices[0].vertex_id, vertices[0].n_tracks), (5, 1));
    assert_eq!(vertices[0].position[2], 2.0);
}

#[test]
fn test_truth_vertex_finder_rejects_other_kinds() {
    let event: VertexingEvent = VertexingEvent::default();
    let result = TruthVertexFinder.find_vertices(VertexFinderKind::Amvf, &event, &ConstantBField::default());
    assert!(matches!(result, Err(Error::UnsupportedVertexFinder(name)) if name == "AMVF"));
}
