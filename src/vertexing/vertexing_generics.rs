use super::event_data::{ConstantBField, FittedVertex, Particle, TrackParameters, VertexingEvent};
use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Vertex finding algorithms a backend may provide
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VertexFinderKind {
    /// Adaptive multi-vertex finder
    Amvf,
    Iterative,
    /// Tracks grouped by their truth production vertex
    Truth,
}

impl FromStr for VertexFinderKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "amvf" => Ok(VertexFinderKind::Amvf),
            "iterative" => Ok(VertexFinderKind::Iterative),
            "truth" => Ok(VertexFinderKind::Truth),
            _ => Err(format!("unknown vertex finder {:?}, expected AMVF, Iterative or Truth", name)),
        }
    }
}

impl TryFrom<String> for VertexFinderKind {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        return name.parse();
    }
}

impl From<VertexFinderKind> for String {
    fn from(kind: VertexFinderKind) -> Self {
        return kind.to_string();
    }
}

impl fmt::Display for VertexFinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            VertexFinderKind::Amvf => "AMVF",
            VertexFinderKind::Iterative => "Iterative",
            VertexFinderKind::Truth => "Truth",
        };
        return write!(f, "{}", name);
    }
}

/// Truth particles, grouped by event
pub trait ParticleSource {
    fn particle_path(&self) -> &Path;
    fn read_particles(&self) -> Result<BTreeMap<u64, Vec<Particle>>, Error>;
}

/// Fitted track parameters, grouped by event
pub trait TrackSource {
    fn track_path(&self) -> &Path;
    fn read_tracks(&self) -> Result<BTreeMap<u64, Vec<TrackParameters>>, Error>;
}

/// Reconstruction backend that turns one event's tracks into vertices
///
/// Events are handed out from several threads at once.
pub trait VertexFinder: Sync {
    fn supports(&self, kind: VertexFinderKind) -> bool;
    fn find_vertices(&self, kind: VertexFinderKind, event: &VertexingEvent, field: &ConstantBField) -> Result<Vec<FittedVertex>, Error>;
}

#[test]
fn test_vertex_finder_kind_parsing() {
    assert_eq!("AMVF".parse::<VertexFinderKind>(), Ok(VertexFinderKind::Amvf));
    assert_eq!("amvf".parse::<VertexFinderKind>(), Ok(VertexFinderKind::Amvf));
    assert_eq!("Iterative".parse::<VertexFinderKind>(), Ok(VertexFinderKind::Iterative));
    assert_eq!("TRUTH".parse::<VertexFinderKind>(), Ok(VertexFinderKind::Truth));
    assert!("adaptive".parse::<VertexFinderKind>().is_err());

    assert_eq!(VertexFinderKind::Amvf.to_string(), "AMVF");
    assert_eq!(VertexFinderKind::Iterative.to_string().parse::<VertexFinderKind>(), Ok(VertexFinderKind::Iterative));
}
