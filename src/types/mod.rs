//! Core types shared by the parser, classifier and ingestion loop.
//!
//! ## Architecture
//!
//! - [`Datagram`] is a raw payload stamped with its gateway arrival time
//! - [`PacketRecord`] is a datagram that passed the packet parser
//! - [`Classification`] holds the derived timing/sequence fields and flags
//! - [`AnomalyFlags`] is the five-bit flag set
//!
//! Derived fields are `Option`s in memory. They only become the `-1`
//! [`SENTINEL`] when written to an output format.

mod classification;
mod flags;
mod packet;

pub use classification::{Classification, SENTINEL};
pub use flags::AnomalyFlags;
pub use packet::{Datagram, PacketRecord, unix_now};
