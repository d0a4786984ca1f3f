use super::event_data::{Particle, TrackParameters};
use serde::{Deserialize, Serialize};

/// Cuts on truth particles, lengths in mm and momenta in MeV
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleSelector {
    #[serde(default = "ParticleSelector::default_remove_neutral")]
    pub remove_neutral: bool,
    #[serde(default = "ParticleSelector::default_abs_eta_max")]
    pub abs_eta_max: f64,
    #[serde(default = "ParticleSelector::default_rho_max")]
    pub rho_max: f64,
    #[serde(default)]
    pub pt_min: f64,
}

impl ParticleSelector {
    fn default_remove_neutral() -> bool {
        true
    }
    fn default_abs_eta_max() -> f64 {
        2.5
    }
    fn default_rho_max() -> f64 {
        999999.0
    }

    pub fn accepts(&self, particle: &Particle) -> bool {
        if self.remove_neutral && particle.charge == 0.0 {
            return false;
        }
        // Momenta are stored in GeV
        let pt_mev: f64 = particle.pt() * 1000.0;
        return particle.eta().abs() < self.abs_eta_max && particle.rho() < self.rho_max && pt_mev >= self.pt_min;
    }

    pub fn select(&self, particles: Vec<Particle>) -> Vec<Particle> {
        return particles.into_iter().filter(|particle| self.accepts(particle)).collect();
    }
}

impl Default for ParticleSelector {
    fn default() -> Self {
        Self {
            remove_neutral: Self::default_remove_neutral(),
            abs_eta_max: Self::default_abs_eta_max(),
            rho_max: Self::default_rho_max(),
            pt_min: 0.0,
        }
    }
}

/// Cuts on fitted track parameters, lengths in mm and momenta in MeV
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackParameterSelector {
    #[serde(default = "TrackParameterSelector::default_abs_eta_max")]
    pub abs_eta_max: f64,
    /// Maximum |d0|
    #[serde(default = "TrackParameterSelector::default_loc0_max")]
    pub loc0_max: f64,
    #[serde(default)]
    pub pt_min: f64,
}

impl TrackParameterSelector {
    fn default_abs_eta_max() -> f64 {
        100.0
    }
    fn default_loc0_max() -> f64 {
        1000.0
    }

    pub fn accepts(&self, track: &TrackParameters) -> bool {
        let pt_mev: f64 = track.pt() * 1000.0;
        return track.eta().abs() < self.abs_eta_max && track.d0.abs() < self.loc0_max && pt_mev >= self.pt_min;
    }

    pub fn select(&self, tracks: Vec<TrackParameters>) -> Vec<TrackParameters> {
        return tracks.into_iter().filter(|track| self.accepts(track)).collect();
    }
}

impl Default for TrackParameterSelector {
    fn default() -> Self {
        Self {
            abs_eta_max: Self::default_abs_eta_max(),
            loc0_max: Self::default_loc0_max(),
            pt_min: 0.0,
        }
    }
}

#[cfg(test)]
fn test_particle(charge: f64, momentum: [f64; 3], production: [f64; 4]) -> Particle {
    return Particle {
        event_id: 0,
        particle_id: 1,
        vertex_id: 1,
        charge,
        momentum,
        production,
    };
}

#[test]
fn test_particle_selector_defaults() {
    let selector: ParticleSelector = ParticleSelector::default();

    assert!(selector.accepts(&test_particle(1.0, [1.0, 0.0, 0.5], [0.0, 0.0, 0.0, 0.0])));
    // Neutral
    assert!(!selector.accepts(&test_particle(0.0, [1.0, 0.0, 0.5], [0.0, 0.0, 0.0, 0.0])));
    // Too forward, eta ~ 4.6
    assert!(!selector.accepts(&test_particle(-1.0, [0.1, 0.0, 10.0], [0.0, 0.0, 0.0, 0.0])));
    // Produced far from the beam line
    assert!(!selector.accepts(&test_particle(1.0, [1.0, 0.0, 0.5], [1.0e6, 0.0, 0.0, 0.0])));

    let keep_neutral: ParticleSelector = ParticleSelector {
        remove_neutral: false,
        pt_min: 500.0,
        ..Default::default()
    };
    assert!(keep_neutral.accepts(&test_particle(0.0, [1.0, 0.0, 0.5], [0.0, 0.0, 0.0, 0.0])));
    assert!(!keep_neutral.accepts(&test_particle(0.0, [0.4, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0])));
}

#[test]
fn test_track_selector() {
    use std::f64::consts::PI;

    let track: TrackParameters = TrackParameters {
        event_id: 0,
        particle_id: 1,
        d0: 0.1,
        z0: 3.0,
        phi: 0.2,
        theta: PI / 3.0,
        qop: 1.0,
        time: 0.0,
    };
    let selector: TrackParameterSelector = TrackParameterSelector::default();
    assert!(selector.accepts(&track));

    let far: TrackParameters = TrackParameters { d0: -1500.0, ..track.clone() };
    assert!(!selector.accepts(&far));

    let tight: TrackParameterSelector = TrackParameterSelector {
        abs_eta_max: 0.5,
        ..Default::default()
    };
    // eta(pi / 3) ~ 0.55
    assert!(!tight.accepts(&track));

    let selected: Vec<TrackParameters> = selector.select(vec![track.clone(), far, track]);
    assert_eq!(selected.len(), 2);
}
