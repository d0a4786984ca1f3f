use serde::{Deserialize, Serialize};

/// Uniform magnetic field, in tesla
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantBField {
    #[serde(default)]
    pub bx: f64,
    #[serde(default)]
    pub by: f64,
    #[serde(default)]
    pub bz: f64,
}

impl ConstantBField {
    pub fn new(bx: f64, by: f64, bz: f64) -> Self {
        return ConstantBField { bx, by, bz };
    }

    pub fn magnitude(&self) -> f64 {
        return (self.bx.powi(2) + self.by.powi(2) + self.bz.powi(2)).sqrt();
    }
}

/// Generated particle, momentum in GeV and positions in mm
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub event_id: u64,
    pub particle_id: u64,
    pub vertex_id: u64,
    pub charge: f64,
    pub momentum: [f64; 3],
    /// (vx, vy, vz, t)
    pub production: [f64; 4],
}

impl Particle {
    pub fn pt(&self) -> f64 {
        return self.momentum[0].hypot(self.momentum[1]);
    }

    pub fn eta(&self) -> f64 {
        let theta: f64 = self.pt().atan2(self.momentum[2]);
        return pseudorapidity(theta);
    }

    /// Transverse distance of the production point from the beam line
    pub fn rho(&self) -> f64 {
        return self.production[0].hypot(self.production[1]);
    }
}

/// Fitted track parameters at the perigee
#[derive(Clone, Debug, PartialEq)]
pub struct TrackParameters {
    pub event_id: u64,
    /// Truth particle the track was matched to
    pub particle_id: u64,
    pub d0: f64,
    pub z0: f64,
    pub phi: f64,
    pub theta: f64,
    /// charge over momentum
    pub qop: f64,
    pub time: f64,
}

impl TrackParameters {
    pub fn eta(&self) -> f64 {
        return pseudorapidity(self.theta);
    }

    pub fn pt(&self) -> f64 {
        return (1.0 / self.qop).abs() * self.theta.sin();
    }
}

/// Everything the vertex finder sees for one event
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexingEvent {
    pub event_id: u64,
    /// Particles passing the particle selection
    pub particles: Vec<Particle>,
    /// All particles of the event, used for truth association
    pub associated_particles: Vec<Particle>,
    pub tracks: Vec<TrackParameters>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FittedVertex {
    pub event_id: u64,
    pub vertex_id: u64,
    /// (x, y, z, t)
    pub position: [f64; 4],
    pub n_tracks: usize,
}

pub(crate) fn pseudorapidity(theta: f64) -> f64 {
    return -(theta / 2.0).tan().ln();
}

#[test]
fn test_track_kinematics() {
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    let track: TrackParameters = TrackParameters {
        event_id: 0,
        particle_id: 1,
        d0: 0.0,
        z0: 0.0,
        phi: 0.0,
        theta: PI / 2.0,
        qop: -0.5,
        time: 0.0,
    };
    assert_abs_diff_eq!(track.eta(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(track.pt(), 2.0, epsilon = 1e-12);

    let forward: TrackParameters = TrackParameters { theta: 2.0 * (-1.0_f64).exp().atan(), ..track };
    assert_abs_diff_eq!(forward.eta(), 1.0, epsilon = 1e-12);
}

#[test]
fn test_particle_kinematics() {
    use approx::assert_abs_diff_eq;

    let particle: Particle = Particle {
        event_id: 0,
        particle_id: 7,
        vertex_id: 1,
        charge: 1.0,
        momentum: [3.0, 4.0, 0.0],
        production: [0.3, 0.4, 10.0, 1.0],
    };
    assert_abs_diff_eq!(particle.pt(), 5.0, epsilon = 1e-12);
    assert_abs_diff_eq!(particle.eta(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(particle.rho(), 0.5, epsilon = 1e-12);
}
