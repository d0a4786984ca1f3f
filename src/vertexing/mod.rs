// Load modules
mod event_data;
mod selectors;
mod sequencer;
mod text_table_reader;
mod truth_vertex_finder;
mod vertex_fitting;
mod vertexing_generics;

// Expose functions to public
pub use event_data::{ConstantBField, FittedVertex, Particle, TrackParameters, VertexingEvent};
pub use selectors::{ParticleSelector, TrackParameterSelector};
pub use sequencer::Sequencer;
pub use text_table_reader::{N_PARTICLE_COLUMNS, N_TRACK_COLUMNS, TextTableReader};
pub use truth_vertex_finder::TruthVertexFinder;
pub use vertex_fitting::{VERTEX_OUTPUT_FILE, VertexFittingConfig, build_events, run_vertex_fitting, write_vertices};
pub use vertexing_generics::{ParticleSource, TrackSource, VertexFinder, VertexFinderKind};
