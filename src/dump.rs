//! Sequential inspection tools.
//!
//! Plain printers over the two container streams, with no aggregation and no
//! shared state with the rewrite engine beyond the read contract. `dump` used
//! on a rewritten file shows the annotated provenance and sealed aggregates.

use fluxforge_common::{Error, Result};
use fluxforge_container::{ContainerReader, MetaIndex};
use std::io::Write;
use std::path::Path;

/// Print rows in stream order, echoing the owning metadata record whenever
/// the carried segment key changes.
pub fn dump_entries(path: &Path, limit: Option<u64>, out: &mut impl Write) -> Result<()> {
    let mut reader = ContainerReader::open(path)?;
    let index = MetaIndex::build(reader.read_meta()?);
    let total = reader.entry_count();
    let count = limit.map_or(total, |n| n.min(total));

    let mut last_key: Option<u32> = None;
    let mut pots = 0.0;
    let mut shown: u64 = 0;
    for row in reader.rows()? {
        if shown == count {
            break;
        }
        let row = row?;
        writeln!(out, "{}", row.entry)?;
        if let Some(aux) = &row.aux {
            writeln!(out, "{}", aux)?;
        }
        if let Some(beam) = &row.beam {
            writeln!(out, "{}", beam)?;
        }
        if last_key != Some(row.entry.metakey) {
            let meta = index.lookup(row.entry.metakey)?;
            write!(out, "{}", meta)?;
            pots += meta.pots;
            last_key = Some(row.entry.metakey);
        }
        shown += 1;
    }

    writeln!(out, "=========================== Complete")?;
    writeln!(
        out,
        "Dumped {} of {} entries, {:.6e} POTs in segments seen",
        shown, total, pots
    )?;
    Ok(())
}

/// Print every metadata record, in stored order.
pub fn dump_meta(path: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let mut reader = ContainerReader::open(path)?;
    let metas = reader.read_meta()?;

    if json {
        let text =
            serde_json::to_string_pretty(&metas).map_err(|e| Error::internal(e.to_string()))?;
        writeln!(out, "{}", text)?;
    } else {
        let mut pots = 0.0;
        for meta in &metas {
            write!(out, "{}", meta)?;
            pots += meta.pots;
        }
        writeln!(out, "{} segments, {:.6e} POTs total", metas.len(), pots)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxforge_container::{ContainerWriter, EntryRecord, MetaRecord, Row, StreamFlags};

    fn write_sample(path: &Path) {
        let mut writer = ContainerWriter::create(path, StreamFlags::default()).unwrap();
        for (key, pdg, energy) in [(1u32, 14, 2.0), (1, -14, 3.0), (2, 12, 1.0)] {
            writer
                .append_row(&Row {
                    entry: EntryRecord {
                        wgt: 1.0,
                        pz: energy,
                        energy,
                        pdg,
                        metakey: key,
                        ..Default::default()
                    },
                    aux: None,
                    beam: None,
                })
                .unwrap();
        }
        for key in [1u32, 2] {
            writer
                .append_meta(&MetaRecord {
                    metakey: key,
                    pots: 2.5e16,
                    ..Default::default()
                })
                .unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_dump_prints_meta_on_key_change_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sflx");
        write_sample(&path);

        let mut out = Vec::new();
        dump_entries(&path, None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.matches("entry:").count(), 3);
        // two segments, two meta echoes
        assert_eq!(text.matches("meta key=").count(), 2);
        assert!(text.contains("Dumped 3 of 3 entries"));
        assert!(text.contains("5.000000e16 POTs"));
    }

    #[test]
    fn test_dump_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sflx");
        write_sample(&path);

        let mut out = Vec::new();
        dump_entries(&path, Some(1), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.matches("entry:").count(), 1);
        assert_eq!(text.matches("meta key=").count(), 1);
        assert!(text.contains("Dumped 1 of 3 entries"));
    }

    #[test]
    fn test_dump_meta_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dump.sflx");
        write_sample(&path);

        let mut out = Vec::new();
        dump_meta(&path, true, &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 2);
        assert_eq!(parsed[0]["metakey"], 1);
    }
}
