use std::io::{Read, Seek, SeekFrom};
use std::sync::Mutex;

use byteorder_slice::byteorder::{BigEndian, LittleEndian};
use log::debug;

use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::{CapturedPacket, PacketKind};
use crate::pcap::{PcapHeader, PcapPacket};
use crate::reader::{lock, stream_len, CaptureReader};
use crate::Endianness;

/// Reads a pcap from a seekable stream.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::sync::atomic::AtomicBool;
///
/// use pcapng_utils::pcap::PcapReader;
/// use pcapng_utils::CaptureReader;
///
/// let file_in = File::open("test.pcap").expect("Error opening file");
/// let pcap_reader = PcapReader::new(file_in).unwrap();
///
/// pcap_reader.read_all(
///     &AtomicBool::new(false),
///     |packet| println!("{:?}", packet.position),
///     |err| eprintln!("{err}"),
/// );
/// ```
#[derive(Debug)]
pub struct PcapReader<R: Read + Seek> {
    header: PcapHeader,
    data_start: u64,
    stream: Mutex<R>,
}

impl<R: Read + Seek> PcapReader<R> {
    /// Create a new PcapReader from an existing stream.
    /// This function reads the global pcap header of the stream to verify its integrity.
    ///
    /// The underlying stream must point to a valid pcap file/stream.
    ///
    /// # Errors
    /// Return an error if the data stream is not in a valid pcap file format,
    /// or if the underlying data are not readable.
    pub fn new(mut stream: R) -> PcapResult<PcapReader<R>> {
        let start = stream.stream_position()?;
        let header = PcapHeader::from_reader(&mut stream)?;

        debug!("Pcap reader started: {:?} endian, {:?} timestamps", header.endianness, header.ts_resolution);

        Ok(PcapReader { header, data_start: start + 24, stream: Mutex::new(stream) })
    }

    /// Returns the global header of the pcap
    pub fn header(&self) -> PcapHeader {
        self.header
    }
}

impl<R: Read + Seek> CaptureReader for PcapReader<R> {
    type Stream = R;

    /// A failed read leaves the position at the start of the record.
    fn read(&self) -> PcapResult<CapturedPacket<'static>> {
        let mut stream = lock(&self.stream)?;

        let position = stream.stream_position()?;
        let remaining = stream_len(&mut *stream)?.saturating_sub(position);

        let res = match self.header.endianness {
            Endianness::Big => PcapPacket::from_reader::<_, BigEndian>(&mut *stream, self.header.ts_resolution, remaining),
            Endianness::Little => PcapPacket::from_reader::<_, LittleEndian>(&mut *stream, self.header.ts_resolution, remaining),
        };

        match res {
            Ok(packet) => Ok(CapturedPacket::new(Some(position), PacketKind::Pcap(packet))),
            Err(err) => {
                stream.seek(SeekFrom::Start(position))?;
                Err(err)
            },
        }
    }

    /// Pcap records have no faults that spare the packet, so `sink` is never used.
    fn read_with(&self, _sink: &mut ErrorSink) -> PcapResult<Option<CapturedPacket<'static>>> {
        self.read().map(Some)
    }

    fn seek(&self, position: u64) -> PcapResult<()> {
        lock(&self.stream)?.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn rewind(&self) -> PcapResult<()> {
        self.seek(self.data_start)
    }

    fn position(&self) -> PcapResult<u64> {
        Ok(lock(&self.stream)?.stream_position()?)
    }

    fn end_of_stream(&self) -> PcapResult<bool> {
        let mut stream = lock(&self.stream)?;
        let position = stream.stream_position()?;

        Ok(position >= stream_len(&mut *stream)?)
    }

    fn close(self) -> PcapResult<R> {
        self.stream.into_inner().map_err(|_| PcapError::LockPoisoned)
    }
}
