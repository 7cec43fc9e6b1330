//! The record-and-metadata co-streaming rewrite engine.
//!
//! Walks the input entry stream in order, applies the warp to each row, and
//! keeps the per-segment metadata bookkeeping exact: whenever the segment key
//! changes, the previous segment's metadata record is finalized with the
//! aggregated post-transform statistics and flushed exactly once, and the new
//! segment's record is seeded from the keyed metadata lookup. The final
//! in-flight segment is flushed after the loop.

use crate::warp::aggregator::SegmentAggregator;
use crate::warp::transform::Warp;
use fluxforge_common::{Error, Result};
use fluxforge_container::{ContainerReader, ContainerWriter, MetaIndex, MetaRecord};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Tolerance on the mass invariant `E^2 - |p|^2` across a warp callback.
///
/// A callback that moves the invariant further than this produced a
/// non-physical energy/momentum pair; the rewrite aborts rather than writing
/// the record.
const MASS2_TOLERANCE: f64 = 1e-6;

/// Totals reported after a completed rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RewriteSummary {
    /// Entry rows copied to the output.
    pub entries: u64,
    /// Metadata records flushed.
    pub segments: u64,
    /// Sum of protons-on-target over all flushed segments.
    pub total_pots: f64,
}

/// Streaming rewriter applying a warp transform to a flux container.
pub struct Rewriter<W: Warp> {
    warp: W,
}

impl<W: Warp> Rewriter<W> {
    pub fn new(warp: W) -> Self {
        Self { warp }
    }

    /// Rewrite `input` into a fresh `output` container.
    ///
    /// Entries are emitted in arrival order; metadata records in
    /// segment-first-seen order, each exactly once, after the last entry of
    /// their segment. Any error aborts immediately and leaves the partial
    /// output file behind with no completeness guarantee.
    pub fn process(&mut self, input: &Path, output: &Path) -> Result<RewriteSummary> {
        let input_name = input.display().to_string();

        let mut reader = ContainerReader::open(input)?;
        let index = MetaIndex::build(reader.read_meta()?);
        tracing::info!(
            entries = reader.entry_count(),
            segments = index.len(),
            input = %input_name,
            "indexed input container"
        );

        let mut writer = ContainerWriter::create(output, reader.flags())?;

        // Tri-state segment bookkeeping: `open` is the output segment being
        // accumulated (None before the first row), `resolved` the metadata
        // record fetched for the most recent source key. Key 0 carries no
        // special meaning.
        let mut open: Option<MetaRecord> = None;
        let mut resolved: Option<&MetaRecord> = None;
        let mut aggregator = SegmentAggregator::new();
        let mut summary = RewriteSummary::default();

        for (ordinal, row) in reader.rows()?.enumerate() {
            // decoding into a fresh row resets all per-record buffers
            let mut row = row?;
            let ordinal = ordinal as u64;
            let source_key = row.entry.metakey;

            // keyed fetch from the secondary store, only when the key moves
            let source_meta = match resolved {
                Some(meta) if meta.metakey == source_key => meta,
                _ => {
                    let meta = index.lookup(source_key)?;
                    tracing::debug!(entry = ordinal, key = source_key, "fetched metadata");
                    resolved = Some(meta);
                    meta
                }
            };

            let mass2_before = row.entry.mass2();
            self.warp
                .warp_entry(&mut row.entry, row.aux.as_mut(), row.beam.as_mut());
            let mass2_after = row.entry.mass2();
            // written so a NaN from a misbehaving callback also fails
            if !((mass2_after - mass2_before).abs() <= MASS2_TOLERANCE) {
                return Err(Error::transform(
                    ordinal,
                    format!(
                        "mass invariant moved from {} to {}",
                        mass2_before, mass2_after
                    ),
                ));
            }

            // segment transition: flush the open segment, then seed the new
            // one from the freshly resolved source record
            if open.as_ref().map(|meta| meta.metakey) != Some(source_meta.metakey) {
                if let Some(closed) = open.take() {
                    tracing::debug!(
                        closed = closed.metakey,
                        next = source_meta.metakey,
                        "segment transition"
                    );
                    self.flush_segment(closed, &aggregator, &mut writer, &input_name, &mut summary)?;
                    aggregator.reset();
                }
                open = Some(source_meta.clone());
            }

            // aggregates reflect the transformed values of the open segment
            aggregator.observe(row.entry.wgt, row.entry.energy, row.entry.pdg);

            writer.append_row(&row)?;
            summary.entries += 1;
        }

        // mandatory end-of-stream flush of the final in-flight segment
        if let Some(closed) = open.take() {
            tracing::debug!(closed = closed.metakey, "final segment flush");
            self.flush_segment(closed, &aggregator, &mut writer, &input_name, &mut summary)?;
            aggregator.reset();
        }

        let (entries, segments) = writer.finish()?;
        tracing::info!(
            entries,
            segments,
            pots = summary.total_pots,
            output = %output.display(),
            "rewrite complete"
        );
        Ok(summary)
    }

    /// Finalize one segment: provenance annotation, sealed aggregates, append.
    fn flush_segment(
        &self,
        mut meta: MetaRecord,
        aggregator: &SegmentAggregator,
        writer: &mut ContainerWriter<BufWriter<File>>,
        input_name: &str,
        summary: &mut RewriteSummary,
    ) -> Result<()> {
        self.warp.warp_meta(&mut meta, input_name);
        let stats = aggregator.seal();
        meta.min_wgt = stats.min_wgt;
        meta.max_wgt = stats.max_wgt;
        meta.max_energy = stats.max_energy;
        meta.pdg_list = stats.pdg_list;

        tracing::info!(key = meta.metakey, pots = meta.pots, "flushing segment metadata");
        writer.append_meta(&meta)?;
        summary.segments += 1;
        summary.total_pots += meta.pots;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::transform::NoWarp;
    use fluxforge_container::{EntryRecord, Row, StreamFlags};
    use tempfile::TempDir;

    fn entry(metakey: u32, pdg: i32, energy: f64, wgt: f64) -> Row {
        Row {
            entry: EntryRecord {
                wgt,
                px: 0.0,
                py: 0.0,
                pz: energy,
                energy,
                pdg,
                metakey,
                ..Default::default()
            },
            aux: None,
            beam: None,
        }
    }

    fn meta(metakey: u32, pots: f64) -> MetaRecord {
        MetaRecord {
            metakey,
            pots,
            ..Default::default()
        }
    }

    fn write_input(dir: &TempDir, rows: &[Row], metas: &[MetaRecord]) -> std::path::PathBuf {
        let path = dir.path().join("input.sflx");
        let mut writer = ContainerWriter::create(&path, StreamFlags::default()).unwrap();
        for row in rows {
            writer.append_row(row).unwrap();
        }
        for meta in metas {
            writer.append_meta(meta).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    #[test]
    fn test_single_segment_flushes_once_at_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![entry(3, 14, 2.0, 1.0), entry(3, 14, 4.0, 0.5)];
        let input = write_input(&dir, &rows, &[meta(3, 1e17)]);
        let output = dir.path().join("out.sflx");

        let summary = Rewriter::new(NoWarp).process(&input, &output).unwrap();
        assert_eq!(summary.entries, 2);
        assert_eq!(summary.segments, 1);

        let mut reader = ContainerReader::open(&output).unwrap();
        let metas = reader.read_meta().unwrap();
        assert_eq!(metas.len(), 1);
        assert_eq!(metas[0].metakey, 3);
        assert_eq!(metas[0].min_wgt, 0.5);
        assert_eq!(metas[0].max_wgt, 1.0);
        assert_eq!(metas[0].max_energy, 4.0);
        assert_eq!(metas[0].pdg_list, vec![14]);
    }

    #[test]
    fn test_segment_count_and_first_seen_order() {
        let dir = tempfile::tempdir().unwrap();
        // keys grouped but not contiguous, out of order in the meta section
        let rows = vec![
            entry(20, 14, 1.0, 1.0),
            entry(20, -14, 2.0, 1.0),
            entry(5, 12, 3.0, 1.0),
            entry(40, 14, 4.0, 1.0),
        ];
        let metas = vec![meta(40, 3.0), meta(5, 2.0), meta(20, 1.0)];
        let input = write_input(&dir, &rows, &metas);
        let output = dir.path().join("out.sflx");

        let summary = Rewriter::new(NoWarp).process(&input, &output).unwrap();
        assert_eq!(summary.segments, 3);
        assert_eq!(summary.total_pots, 6.0);

        let mut reader = ContainerReader::open(&output).unwrap();
        let out_metas = reader.read_meta().unwrap();
        let keys: Vec<u32> = out_metas.iter().map(|m| m.metakey).collect();
        assert_eq!(keys, vec![20, 5, 40]);
    }

    #[test]
    fn test_zero_is_a_valid_segment_key() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![entry(0, 14, 1.0, 1.0), entry(1, 14, 2.0, 1.0)];
        let input = write_input(&dir, &rows, &[meta(0, 1.0), meta(1, 1.0)]);
        let output = dir.path().join("out.sflx");

        let summary = Rewriter::new(NoWarp).process(&input, &output).unwrap();
        assert_eq!(summary.segments, 2);

        let mut reader = ContainerReader::open(&output).unwrap();
        let keys: Vec<u32> = reader
            .read_meta()
            .unwrap()
            .iter()
            .map(|m| m.metakey)
            .collect();
        assert_eq!(keys, vec![0, 1]);
    }

    #[test]
    fn test_missing_metadata_aborts_with_no_flush_for_key() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![entry(1, 14, 1.0, 1.0), entry(2, 14, 2.0, 1.0)];
        // key 2 has no metadata record
        let input = write_input(&dir, &rows, &[meta(1, 1.0)]);
        let output = dir.path().join("out.sflx");

        let err = Rewriter::new(NoWarp).process(&input, &output).unwrap_err();
        assert!(matches!(err, Error::MetaNotFound { key: 2 }));
    }

    #[test]
    fn test_aggregates_split_exactly_at_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            entry(1, 14, 1.0, 10.0),
            entry(1, 14, 9.0, 0.1),
            entry(2, 16, 5.0, 2.0),
        ];
        let input = write_input(&dir, &rows, &[meta(1, 0.0), meta(2, 0.0)]);
        let output = dir.path().join("out.sflx");

        Rewriter::new(NoWarp).process(&input, &output).unwrap();

        let mut reader = ContainerReader::open(&output).unwrap();
        let metas = reader.read_meta().unwrap();
        // first entry of segment 2 must not leak into segment 1
        assert_eq!(metas[0].max_energy, 9.0);
        assert_eq!(metas[0].min_wgt, 0.1);
        assert_eq!(metas[0].max_wgt, 10.0);
        assert_eq!(metas[0].pdg_list, vec![14]);
        assert_eq!(metas[1].max_energy, 5.0);
        assert_eq!(metas[1].min_wgt, 2.0);
        assert_eq!(metas[1].pdg_list, vec![16]);
    }

    struct BreakInvariant;

    impl Warp for BreakInvariant {
        fn warp_entry(
            &mut self,
            entry: &mut EntryRecord,
            _aux: Option<&mut fluxforge_container::AuxRecord>,
            _beam: Option<&mut fluxforge_container::BeamRecord>,
        ) {
            // raises energy without rescaling momentum
            entry.energy += 1.0;
        }

        fn warp_meta(&self, _meta: &mut MetaRecord, _input_name: &str) {}
    }

    #[test]
    fn test_contract_violating_warp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![entry(1, 14, 2.0, 1.0)];
        let input = write_input(&dir, &rows, &[meta(1, 0.0)]);
        let output = dir.path().join("out.sflx");

        let err = Rewriter::new(BreakInvariant)
            .process(&input, &output)
            .unwrap_err();
        assert!(matches!(err, Error::Transform { entry: 0, .. }));
    }
}
