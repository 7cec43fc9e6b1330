//! Fluxforge-Container: SFLX flux-container reading, writing, and metadata lookup
//!
//! This crate provides the container layer for fluxforge. An SFLX file holds
//! a primary stream of flux rows (entry record plus optional aux and beam
//! companions) and a secondary stream of per-segment metadata records.
//!
//! # Modules
//!
//! - `records` - Record types stored in a container
//! - `reader` - Sequential entry decoding and meta-section reading
//! - `writer` - Fresh-file writing with buffered meta section
//! - `index` - Keyed point lookup over metadata records
//!
//! # Architecture
//!
//! The access patterns are exactly the two the rewrite pipeline needs:
//!
//! 1. Sequential scan over the entry stream (`ContainerReader::rows`)
//! 2. Point lookup of metadata by segment key (`MetaIndex::lookup`),
//!    with the index built once from `ContainerReader::read_meta`
//!
//! Output containers are always created fresh; rows and metadata are appended
//! independently and the footer is sealed by `ContainerWriter::finish`.

pub mod format;
pub mod index;
pub mod reader;
pub mod records;
pub mod writer;

pub use format::StreamFlags;
pub use index::MetaIndex;
pub use reader::ContainerReader;
pub use records::{AuxRecord, BeamRecord, EntryRecord, MetaRecord, Row};
pub use writer::ContainerWriter;
