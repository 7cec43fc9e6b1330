//! Record types stored in an SFLX container.
//!
//! An SFLX file carries two streams: a primary stream of per-particle rows
//! (entry record plus optional companion records) and a secondary stream of
//! per-segment metadata records. Field sets follow the beam-simulation
//! convention: kinematics in GeV, positions in the beam coordinate system.

use fluxforge_common::pdg;
use std::fmt;

/// One simulated flux sample.
///
/// `vtxx`/`vtxy`/`vtxz` and `dist` are driver bookkeeping carried through the
/// rewrite untouched. `metakey` names the segment the entry belongs to.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryRecord {
    /// Statistical weight of the sample.
    pub wgt: f64,
    /// Ray origin on the flux window.
    pub vtxx: f64,
    pub vtxy: f64,
    pub vtxz: f64,
    /// Distance from the decay point to the window.
    pub dist: f64,
    /// Momentum 3-vector in GeV.
    pub px: f64,
    pub py: f64,
    pub pz: f64,
    /// Total energy in GeV.
    pub energy: f64,
    /// PDG species code.
    pub pdg: i32,
    /// Owning segment key.
    pub metakey: u32,
}

impl EntryRecord {
    /// Squared magnitude of the momentum 3-vector.
    pub fn p2(&self) -> f64 {
        self.px * self.px + self.py * self.py + self.pz * self.pz
    }

    /// Invariant mass squared, `E^2 - |p|^2`.
    pub fn mass2(&self) -> f64 {
        self.energy * self.energy - self.p2()
    }
}

impl fmt::Display for EntryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry: {} E={:.4} p=({:.4},{:.4},{:.4}) wgt={:.4} key={}",
            pdg::label(self.pdg),
            self.energy,
            self.px,
            self.py,
            self.pz,
            self.wgt,
            self.metakey
        )
    }
}

/// Free-form companion record sharing the entry's ordinal position.
///
/// Never iterated independently; the names of the slots live in the owning
/// segment's metadata record.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AuxRecord {
    pub aux_int: Vec<i32>,
    pub aux_dbl: Vec<f64>,
}

impl fmt::Display for AuxRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aux: int={:?} dbl={:?}", self.aux_int, self.aux_dbl)
    }
}

/// Beamline bookkeeping companion record.
///
/// Identifies the upstream simulation event that produced the entry; the
/// rewrite core never touches these fields.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BeamRecord {
    pub run: i32,
    pub evtno: i32,
    pub entryno: i32,
    /// Parent momentum at the target exit.
    pub tpx: f64,
    pub tpy: f64,
    pub tpz: f64,
    /// Decay vertex.
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    /// Parent species code.
    pub ptype: i32,
    pub ppmedium: i32,
    /// Importance weight from the beam simulation.
    pub nimpwt: f64,
}

impl fmt::Display for BeamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "beam: run={} evt={} entry={} parent={} nimpwt={:.4}",
            self.run,
            self.evtno,
            self.entryno,
            pdg::label(self.ptype),
            self.nimpwt
        )
    }
}

/// Per-segment metadata record.
///
/// `input_files` is an append-only provenance list. The aggregate fields
/// (`min_wgt`, `max_wgt`, `max_energy`, `pdg_list`) describe exactly the
/// entries belonging to the segment; `pdg_list` holds each species code once,
/// in first-seen order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MetaRecord {
    /// Segment key, unique per segment.
    pub metakey: u32,
    /// Protons-on-target represented by the segment.
    pub pots: f64,
    pub min_wgt: f64,
    pub max_wgt: f64,
    pub max_energy: f64,
    /// Distinct species codes seen in the segment, first-seen order.
    pub pdg_list: Vec<i32>,
    /// Flux window origin and spanning vectors.
    pub window_base: [f64; 3],
    pub window_dir1: [f64; 3],
    pub window_dir2: [f64; 3],
    /// Names of the aux record slots.
    pub aux_int_names: Vec<String>,
    pub aux_dbl_names: Vec<String>,
    /// Provenance: source files and rewrite annotations.
    pub input_files: Vec<String>,
    /// Seed of the upstream simulation.
    pub seed: i32,
}

impl fmt::Display for MetaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flavors: Vec<String> = self.pdg_list.iter().map(|&p| pdg::label(p)).collect();
        writeln!(
            f,
            "meta key={} pots={:.6e} wgt=[{:.4},{:.4}] maxE={:.4} flavors=[{}] seed={}",
            self.metakey,
            self.pots,
            self.min_wgt,
            self.max_wgt,
            self.max_energy,
            flavors.join(","),
            self.seed
        )?;
        for file in &self.input_files {
            writeln!(f, "  {}", file)?;
        }
        Ok(())
    }
}

/// One row of the primary stream: the entry plus its companions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub entry: EntryRecord,
    pub aux: Option<AuxRecord>,
    pub beam: Option<BeamRecord>,
}
