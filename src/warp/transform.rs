//! Warp transform callbacks.
//!
//! A warp is the user-supplied mutation applied to each entry before it is
//! written out. Implementations may change kinematics, weight, and species
//! code, but must leave `metakey` alone and must keep energy and momentum
//! consistent: if the energy moves, the momentum magnitude has to be rescaled
//! to match, preserving direction. The rewriter checks the mass invariant
//! after every callback.

use fluxforge_container::{AuxRecord, BeamRecord, EntryRecord, MetaRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-record and per-segment transform hooks.
pub trait Warp {
    /// Mutate one entry and its companion records.
    fn warp_entry(
        &mut self,
        entry: &mut EntryRecord,
        aux: Option<&mut AuxRecord>,
        beam: Option<&mut BeamRecord>,
    );

    /// Annotate a segment's metadata record as it is finalized.
    fn warp_meta(&self, meta: &mut MetaRecord, input_name: &str);
}

/// Identity transform: entries pass through untouched.
pub struct NoWarp;

impl Warp for NoWarp {
    fn warp_entry(
        &mut self,
        _entry: &mut EntryRecord,
        _aux: Option<&mut AuxRecord>,
        _beam: Option<&mut BeamRecord>,
    ) {
    }

    fn warp_meta(&self, meta: &mut MetaRecord, input_name: &str) {
        meta.input_files.push("REWRITTEN FLUX FROM:".to_string());
        meta.input_files.push(input_name.to_string());
        meta.input_files.push("NO ACTUAL WARP APPLIED".to_string());
    }
}

/// Resamples each entry's energy from a 1/E distribution and rescales the
/// momentum to keep the same direction and mass invariant.
pub struct EnergyWarp {
    e_min: f64,
    e_max: f64,
    rng: StdRng,
}

impl EnergyWarp {
    /// Warp resampling energies on `[e_min, e_max]` GeV.
    ///
    /// `e_min` must be positive: the 1/E shape diverges at zero.
    pub fn new(e_min: f64, e_max: f64) -> Self {
        Self {
            e_min,
            e_max,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic variant for tests.
    pub fn with_seed(e_min: f64, e_max: f64, seed: u64) -> Self {
        Self {
            e_min,
            e_max,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sample from the 1/E shape between `e_min` and `e_max`.
    fn pick_energy(&mut self) -> f64 {
        let c = self.e_min.ln();
        let a = 1.0 / (self.e_max.ln() - c);
        let r: f64 = self.rng.gen();
        (r / a + c).exp()
    }
}

impl Warp for EnergyWarp {
    fn warp_entry(
        &mut self,
        entry: &mut EntryRecord,
        _aux: Option<&mut AuxRecord>,
        _beam: Option<&mut BeamRecord>,
    ) {
        let e_old = entry.energy;
        let p2 = entry.p2();
        if p2 <= 0.0 {
            // degenerate ray, nothing to point the new momentum along
            return;
        }
        entry.energy = self.pick_energy();
        // scale momentum so the new momentum keeps the old direction but
        // obeys the energy-momentum relation
        let k = (1.0 + (entry.energy * entry.energy - e_old * e_old) / p2).sqrt();
        entry.px *= k;
        entry.py *= k;
        entry.pz *= k;
    }

    fn warp_meta(&self, meta: &mut MetaRecord, input_name: &str) {
        meta.input_files.push("REWRITTEN FLUX FROM:".to_string());
        meta.input_files.push(input_name.to_string());
        meta.input_files.push(format!(
            "ENERGY RESAMPLED FROM 1/E ON [{}, {}] GEV",
            self.e_min, self.e_max
        ));
    }
}
