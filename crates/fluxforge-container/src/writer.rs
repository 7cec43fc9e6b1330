//! SFLX container writer.
//!
//! Entry rows are encoded and written as they arrive. Meta records are
//! buffered in encoded form and written as one section by `finish`, followed
//! by the footer. The output is always a fresh file; appending to an existing
//! container is not supported.

use crate::format::{StreamFlags, FOOTER_LEN, HEADER_LEN, MAGIC, TRAILER_MAGIC, VERSION};
use crate::records::{AuxRecord, BeamRecord, EntryRecord, MetaRecord, Row};
use bytes::{BufMut, BytesMut};
use fluxforge_common::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// SFLX container writer.
pub struct ContainerWriter<W: Write> {
    writer: W,
    flags: StreamFlags,
    row_buf: BytesMut,
    entry_bytes: u64,
    entry_count: u64,
    meta_buf: BytesMut,
    meta_count: u64,
}

impl ContainerWriter<BufWriter<File>> {
    /// Create a fresh container file.
    pub fn create<P: AsRef<Path>>(path: P, flags: StreamFlags) -> Result<Self> {
        let file = File::create(path)?;
        Self::with_writer(BufWriter::new(file), flags)
    }
}

impl<W: Write> ContainerWriter<W> {
    /// Start a container on an arbitrary writer; writes the header.
    pub fn with_writer(mut writer: W, flags: StreamFlags) -> Result<Self> {
        let mut header = BytesMut::with_capacity(HEADER_LEN);
        header.put_slice(MAGIC);
        header.put_u16(VERSION);
        header.put_u16(flags.to_bits());
        header.put_u32(0); // reserved
        writer.write_all(&header)?;

        Ok(Self {
            writer,
            flags,
            row_buf: BytesMut::with_capacity(256),
            entry_bytes: 0,
            entry_count: 0,
            meta_buf: BytesMut::with_capacity(1024),
            meta_count: 0,
        })
    }

    /// Number of rows appended so far.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of meta records appended so far.
    pub fn meta_count(&self) -> u64 {
        self.meta_count
    }

    /// Append one row to the entry stream.
    ///
    /// The row must carry exactly the companion records the header flags
    /// declare; companions present in the row but not flagged are dropped.
    pub fn append_row(&mut self, row: &Row) -> Result<()> {
        self.row_buf.clear();
        encode_entry(&mut self.row_buf, &row.entry);
        if self.flags.has_aux {
            let aux = row
                .aux
                .as_ref()
                .ok_or_else(|| Error::internal("row missing aux record declared by flags"))?;
            encode_aux(&mut self.row_buf, aux)?;
        }
        if self.flags.has_beam {
            let beam = row
                .beam
                .as_ref()
                .ok_or_else(|| Error::internal("row missing beam record declared by flags"))?;
            encode_beam(&mut self.row_buf, beam);
        }
        self.writer.write_all(&self.row_buf)?;
        self.entry_bytes += self.row_buf.len() as u64;
        self.entry_count += 1;
        Ok(())
    }

    /// Append one finalized record to the meta stream.
    ///
    /// The record is encoded whole before any bytes are retained, so a failed
    /// append leaves the meta section unchanged.
    pub fn append_meta(&mut self, meta: &MetaRecord) -> Result<()> {
        let mut buf = BytesMut::with_capacity(256);
        encode_meta(&mut buf, meta)?;
        self.meta_buf.extend_from_slice(&buf);
        self.meta_count += 1;
        Ok(())
    }

    /// Write the meta section and footer, then flush.
    ///
    /// Returns `(entry_count, meta_count)`.
    pub fn finish(mut self) -> Result<(u64, u64)> {
        let meta_offset = HEADER_LEN as u64 + self.entry_bytes;
        self.writer.write_all(&self.meta_buf)?;

        let mut footer = BytesMut::with_capacity(FOOTER_LEN);
        footer.put_u64(HEADER_LEN as u64);
        footer.put_u64(self.entry_count);
        footer.put_u64(meta_offset);
        footer.put_u64(self.meta_count);
        footer.put_u32(0); // reserved
        footer.put_slice(TRAILER_MAGIC);
        self.writer.write_all(&footer)?;
        self.writer.flush()?;

        Ok((self.entry_count, self.meta_count))
    }
}

fn encode_entry(buf: &mut BytesMut, entry: &EntryRecord) {
    buf.put_f64(entry.wgt);
    buf.put_f64(entry.vtxx);
    buf.put_f64(entry.vtxy);
    buf.put_f64(entry.vtxz);
    buf.put_f64(entry.dist);
    buf.put_f64(entry.px);
    buf.put_f64(entry.py);
    buf.put_f64(entry.pz);
    buf.put_f64(entry.energy);
    buf.put_i32(entry.pdg);
    buf.put_u32(entry.metakey);
}

fn encode_aux(buf: &mut BytesMut, aux: &AuxRecord) -> Result<()> {
    put_count(buf, aux.aux_int.len(), "aux_int")?;
    for &v in &aux.aux_int {
        buf.put_i32(v);
    }
    put_count(buf, aux.aux_dbl.len(), "aux_dbl")?;
    for &v in &aux.aux_dbl {
        buf.put_f64(v);
    }
    Ok(())
}

fn encode_beam(buf: &mut BytesMut, beam: &BeamRecord) {
    buf.put_i32(beam.run);
    buf.put_i32(beam.evtno);
    buf.put_i32(beam.entryno);
    buf.put_f64(beam.tpx);
    buf.put_f64(beam.tpy);
    buf.put_f64(beam.tpz);
    buf.put_f64(beam.vx);
    buf.put_f64(beam.vy);
    buf.put_f64(beam.vz);
    buf.put_i32(beam.ptype);
    buf.put_i32(beam.ppmedium);
    buf.put_f64(beam.nimpwt);
}

fn encode_meta(buf: &mut BytesMut, meta: &MetaRecord) -> Result<()> {
    buf.put_u32(meta.metakey);
    buf.put_f64(meta.pots);
    buf.put_f64(meta.min_wgt);
    buf.put_f64(meta.max_wgt);
    buf.put_f64(meta.max_energy);
    put_count(buf, meta.pdg_list.len(), "pdg_list")?;
    for &pdg in &meta.pdg_list {
        buf.put_i32(pdg);
    }
    put_vec3(buf, &meta.window_base);
    put_vec3(buf, &meta.window_dir1);
    put_vec3(buf, &meta.window_dir2);
    put_string_list(buf, &meta.aux_int_names, "aux_int_names")?;
    put_string_list(buf, &meta.aux_dbl_names, "aux_dbl_names")?;
    put_string_list(buf, &meta.input_files, "input_files")?;
    buf.put_i32(meta.seed);
    Ok(())
}

fn put_vec3(buf: &mut BytesMut, v: &[f64; 3]) {
    buf.put_f64(v[0]);
    buf.put_f64(v[1]);
    buf.put_f64(v[2]);
}

fn put_count(buf: &mut BytesMut, len: usize, what: &str) -> Result<u16> {
    let count = u16::try_from(len)
        .map_err(|_| Error::internal(format!("{} list exceeds {} items", what, u16::MAX)))?;
    buf.put_u16(count);
    Ok(count)
}

fn put_string(buf: &mut BytesMut, s: &str, what: &str) -> Result<()> {
    put_count(buf, s.len(), what)?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_string_list(buf: &mut BytesMut, list: &[String], what: &str) -> Result<()> {
    put_count(buf, list.len(), what)?;
    for s in list {
        put_string(buf, s, what)?;
    }
    Ok(())
}
