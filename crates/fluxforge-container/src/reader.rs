//! SFLX container reader.
//!
//! The entry stream is decoded sequentially; the meta section is read in one
//! pass. No random access into the entry stream is offered.

use crate::format::{StreamFlags, FOOTER_LEN, HEADER_LEN, MAGIC, TRAILER_MAGIC, VERSION};
use crate::records::{AuxRecord, BeamRecord, EntryRecord, MetaRecord, Row};
use fluxforge_common::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// SFLX container reader.
#[derive(Debug)]
pub struct ContainerReader<R> {
    reader: R,
    flags: StreamFlags,
    entry_offset: u64,
    entry_count: u64,
    meta_offset: u64,
    meta_count: u64,
}

impl ContainerReader<BufReader<File>> {
    /// Open a container file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ContainerReader<R> {
    /// Parse the header and footer of a container.
    pub fn new(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        let min_size = (HEADER_LEN + FOOTER_LEN) as u64;
        if file_size < min_size {
            return Err(Error::UnexpectedEof {
                need: min_size as usize,
                have: file_size as usize,
            });
        }

        reader.seek(SeekFrom::Start(0))?;
        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(Error::invalid_container("bad magic"));
        }
        let version = u16::from_be_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Error::invalid_container(format!(
                "unsupported version {}",
                version
            )));
        }
        let flags = StreamFlags::from_bits(u16::from_be_bytes([header[6], header[7]]));

        reader.seek(SeekFrom::Start(file_size - FOOTER_LEN as u64))?;
        let mut footer = [0u8; FOOTER_LEN];
        reader.read_exact(&mut footer)?;

        if &footer[36..40] != TRAILER_MAGIC {
            return Err(Error::invalid_container("bad trailer magic"));
        }
        let entry_offset = read_u64_at(&footer, 0);
        let entry_count = read_u64_at(&footer, 8);
        let meta_offset = read_u64_at(&footer, 16);
        let meta_count = read_u64_at(&footer, 24);

        if entry_offset != HEADER_LEN as u64
            || meta_offset < entry_offset
            || meta_offset > file_size - FOOTER_LEN as u64
        {
            return Err(Error::invalid_container("inconsistent section offsets"));
        }

        Ok(Self {
            reader,
            flags,
            entry_offset,
            entry_count,
            meta_offset,
            meta_count,
        })
    }

    /// Companion-record flags declared by the header.
    pub fn flags(&self) -> StreamFlags {
        self.flags
    }

    /// Number of rows in the entry stream.
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Number of records in the meta section.
    pub fn meta_count(&self) -> u64 {
        self.meta_count
    }

    /// Sequential iterator over the entry stream, from the beginning.
    pub fn rows(&mut self) -> Result<RowIter<'_, R>> {
        self.reader.seek(SeekFrom::Start(self.entry_offset))?;
        Ok(RowIter {
            reader: &mut self.reader,
            flags: self.flags,
            remaining: self.entry_count,
        })
    }

    /// Read the whole meta section, in stored order.
    pub fn read_meta(&mut self) -> Result<Vec<MetaRecord>> {
        self.reader.seek(SeekFrom::Start(self.meta_offset))?;
        let mut records = Vec::with_capacity(self.meta_count.min(1024) as usize);
        for _ in 0..self.meta_count {
            records.push(decode_meta(&mut self.reader)?);
        }
        Ok(records)
    }
}

/// Iterator over entry rows.
pub struct RowIter<'a, R> {
    reader: &'a mut R,
    flags: StreamFlags,
    remaining: u64,
}

impl<R: Read> Iterator for RowIter<'_, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(decode_row(self.reader, self.flags))
    }
}

fn decode_row<R: Read>(reader: &mut R, flags: StreamFlags) -> Result<Row> {
    let entry = decode_entry(reader)?;
    let aux = if flags.has_aux {
        Some(decode_aux(reader)?)
    } else {
        None
    };
    let beam = if flags.has_beam {
        Some(decode_beam(reader)?)
    } else {
        None
    };
    Ok(Row { entry, aux, beam })
}

fn decode_entry<R: Read>(reader: &mut R) -> Result<EntryRecord> {
    Ok(EntryRecord {
        wgt: read_f64(reader)?,
        vtxx: read_f64(reader)?,
        vtxy: read_f64(reader)?,
        vtxz: read_f64(reader)?,
        dist: read_f64(reader)?,
        px: read_f64(reader)?,
        py: read_f64(reader)?,
        pz: read_f64(reader)?,
        energy: read_f64(reader)?,
        pdg: read_i32(reader)?,
        metakey: read_u32(reader)?,
    })
}

fn decode_aux<R: Read>(reader: &mut R) -> Result<AuxRecord> {
    let n_int = read_u16(reader)? as usize;
    let mut aux_int = Vec::with_capacity(n_int);
    for _ in 0..n_int {
        aux_int.push(read_i32(reader)?);
    }
    let n_dbl = read_u16(reader)? as usize;
    let mut aux_dbl = Vec::with_capacity(n_dbl);
    for _ in 0..n_dbl {
        aux_dbl.push(read_f64(reader)?);
    }
    Ok(AuxRecord { aux_int, aux_dbl })
}

fn decode_beam<R: Read>(reader: &mut R) -> Result<BeamRecord> {
    Ok(BeamRecord {
        run: read_i32(reader)?,
        evtno: read_i32(reader)?,
        entryno: read_i32(reader)?,
        tpx: read_f64(reader)?,
        tpy: read_f64(reader)?,
        tpz: read_f64(reader)?,
        vx: read_f64(reader)?,
        vy: read_f64(reader)?,
        vz: read_f64(reader)?,
        ptype: read_i32(reader)?,
        ppmedium: read_i32(reader)?,
        nimpwt: read_f64(reader)?,
    })
}

fn decode_meta<R: Read>(reader: &mut R) -> Result<MetaRecord> {
    Ok(MetaRecord {
        metakey: read_u32(reader)?,
        pots: read_f64(reader)?,
        min_wgt: read_f64(reader)?,
        max_wgt: read_f64(reader)?,
        max_energy: read_f64(reader)?,
        pdg_list: read_i32_list(reader)?,
        window_base: read_vec3(reader)?,
        window_dir1: read_vec3(reader)?,
        window_dir2: read_vec3(reader)?,
        aux_int_names: read_string_list(reader)?,
        aux_dbl_names: read_string_list(reader)?,
        input_files: read_string_list(reader)?,
        seed: read_i32(reader)?,
    })
}

fn read_u64_at(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
        buf[offset + 4],
        buf[offset + 5],
        buf[offset + 6],
        buf[offset + 7],
    ])
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_be_bytes(buf))
}

fn read_vec3<R: Read>(reader: &mut R) -> Result<[f64; 3]> {
    Ok([read_f64(reader)?, read_f64(reader)?, read_f64(reader)?])
}

fn read_i32_list<R: Read>(reader: &mut R) -> Result<Vec<i32>> {
    let n = read_u16(reader)? as usize;
    let mut list = Vec::with_capacity(n);
    for _ in 0..n {
        list.push(read_i32(reader)?);
    }
    Ok(list)
}

fn read_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = read_u16(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::invalid_container("non-UTF8 string"))
}

fn read_string_list<R: Read>(reader: &mut R) -> Result<Vec<String>> {
    let n = read_u16(reader)? as usize;
    let mut list = Vec::with_capacity(n);
    for _ in 0..n {
        list.push(read_string(reader)?);
    }
    Ok(list)
}
