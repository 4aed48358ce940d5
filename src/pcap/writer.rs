use std::io::Write;
use std::sync::Mutex;

use byteorder_slice::byteorder::{BigEndian, LittleEndian};
use log::debug;

use super::packet::encode_record;
use crate::errors::{PcapError, PcapResult};
use crate::packet::Packet;
use crate::pcap::PcapHeader;
use crate::reader::lock;
use crate::writer::CaptureWriter;
use crate::{Endianness, TsResolution};

/// Writes a pcap to a writer.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
///
/// use pcapng_utils::pcap::{PcapReader, PcapWriter};
/// use pcapng_utils::{CaptureReader, CaptureWriter};
///
/// let file_in = File::open("test.pcap").expect("Error opening file");
/// let pcap_reader = PcapReader::new(file_in).unwrap();
///
/// let file_out = File::create("out.pcap").expect("Error creating file out");
/// let pcap_writer = PcapWriter::with_header(file_out, pcap_reader.header()).unwrap();
///
/// // Read test.pcap
/// while !pcap_reader.end_of_stream().unwrap() {
///     let pkt = pcap_reader.read().unwrap();
///
///     //Write each packet of test.pcap in out.pcap
///     pcap_writer.write_packet(&pkt).unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct PcapWriter<W: Write> {
    header: PcapHeader,
    sink: Mutex<W>,
}

impl<W: Write> PcapWriter<W> {
    /// Creates a new `PcapWriter` from an existing writer.
    ///
    /// Automatically writes a default global pcap header with the given resolution and endianness.
    pub fn new(writer: W, ts_resolution: TsResolution, endianness: Endianness) -> PcapResult<PcapWriter<W>> {
        Self::with_header(writer, PcapHeader::create_empty(ts_resolution, endianness))
    }

    /// Creates a new `PcapWriter` from an existing writer with a user defined [`PcapHeader`].
    ///
    /// The header is written immediately, packets are then written in its endianness and resolution.
    pub fn with_header(mut writer: W, header: PcapHeader) -> PcapResult<PcapWriter<W>> {
        header.write_to(&mut writer)?;

        debug!("Pcap writer started: {:?} endian, {:?} timestamps", header.endianness, header.ts_resolution);

        Ok(PcapWriter { header, sink: Mutex::new(writer) })
    }

    /// Returns the header written at the start of the pcap
    pub fn header(&self) -> PcapHeader {
        self.header
    }
}

impl<W: Write> CaptureWriter for PcapWriter<W> {
    type Sink = W;

    /// Writes a 16B record header followed by the packet data.
    ///
    /// Fails with [`PcapError::PacketTooLong`] if the record is longer than the snaplen of the header.
    fn write_packet(&self, packet: &dyn Packet) -> PcapResult<usize> {
        let record = match self.header.endianness {
            Endianness::Big => encode_record::<BigEndian>(packet, self.header.ts_resolution)?,
            Endianness::Little => encode_record::<LittleEndian>(packet, self.header.ts_resolution)?,
        };

        if record.len() > self.header.snaplen as usize {
            return Err(PcapError::PacketTooLong { len: record.len(), snaplen: self.header.snaplen });
        }

        lock(&self.sink)?.write_all(&record).map_err(PcapError::WriteFailed)?;

        Ok(record.len())
    }

    fn flush(&self) -> PcapResult<()> {
        lock(&self.sink)?.flush().map_err(PcapError::WriteFailed)
    }

    fn close(self) -> PcapResult<W> {
        let mut sink = self.sink.into_inner().map_err(|_| PcapError::LockPoisoned)?;
        sink.flush().map_err(PcapError::WriteFailed)?;

        Ok(sink)
    }
}
