//! Read, write, convert and merge Pcap and PcapNg captures.
//!
//! Both formats share a common [`CaptureReader`] and [`CaptureWriter`] contract,
//! and every packet can be inspected through the [`Packet`] trait whatever its on-disk form.
//!
//! # Examples
//!
//! ```no_run
//! use std::fs::File;
//!
//! use pcapng_utils::pcapng::PcapNgWriter;
//! use pcapng_utils::{open_path, CaptureHeaders, CaptureReader, CaptureWriter};
//!
//! let reader = open_path("test.pcap").expect("Error opening file");
//!
//! let file_out = File::create("out.pcapng").expect("Error creating file");
//! let writer = PcapNgWriter::with_header_groups(file_out, reader.pcapng_header().unwrap()).unwrap();
//!
//! // Convert test.pcap to out.pcapng
//! while !reader.end_of_stream().unwrap() {
//!     let packet = reader.read().unwrap();
//!     writer.write_packet(&packet).unwrap();
//! }
//!
//! writer.close().unwrap();
//! ```

pub(crate) mod common;
pub use common::*;

pub mod errors;
pub use errors::{ErrorSink, PcapError, PcapResult};

pub(crate) mod timestamp;
pub use timestamp::Timestamp;

pub(crate) mod packet;
pub use packet::{CapturedPacket, Packet, PacketKind};

pub(crate) mod reader;
pub use reader::{AnyReader, CaptureReader};

pub(crate) mod writer;
pub use writer::CaptureWriter;

pub(crate) mod detect;
pub use detect::{detect_format, open_path, open_reader, CaptureFormat, DetectedFormat};

pub(crate) mod convert;
pub use convert::{merge_header_groups, CaptureHeaders};

pub mod merge;
pub mod pcap;
pub mod pcapng;
