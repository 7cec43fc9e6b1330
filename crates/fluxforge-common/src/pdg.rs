//! Particle Data Group code utilities.
//!
//! Flux entries carry their species as a signed PDG code. Beam simulations
//! emit neutrinos almost exclusively, so only the lepton sector gets a
//! human-readable name; anything else is rendered numerically.

/// Neutrino flavor codes produced by beamline simulations.
pub const NU_E: i32 = 12;
pub const NU_MU: i32 = 14;
pub const NU_TAU: i32 = 16;

/// Human-readable name for a PDG code, if it is one fluxforge expects to see.
pub fn name(pdg: i32) -> Option<&'static str> {
    match pdg {
        12 => Some("nu_e"),
        -12 => Some("nu_e_bar"),
        14 => Some("nu_mu"),
        -14 => Some("nu_mu_bar"),
        16 => Some("nu_tau"),
        -16 => Some("nu_tau_bar"),
        11 => Some("e-"),
        -11 => Some("e+"),
        13 => Some("mu-"),
        -13 => Some("mu+"),
        _ => None,
    }
}

/// Render a PDG code for display: the name when known, the raw code otherwise.
pub fn label(pdg: i32) -> String {
    match name(pdg) {
        Some(n) => n.to_string(),
        None => pdg.to_string(),
    }
}

/// True if the code is one of the three neutrino flavors or their conjugates.
pub fn is_neutrino(pdg: i32) -> bool {
    matches!(pdg.abs(), NU_E | NU_MU | NU_TAU)
}
