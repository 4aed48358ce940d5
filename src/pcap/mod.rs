//! Contains the Pcap header, packet, reader and writer

mod header;
mod packet;
mod reader;
mod writer;

pub use header::*;
pub use packet::PcapPacket;
pub use reader::*;
pub use writer::*;
