use std::borrow::Cow;
use std::io::{Read, Write};
use std::time::Duration;

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use crate::errors::{PcapError, PcapResult};
use crate::packet::Packet;
use crate::TsResolution;

/// Pcap packet with its header and data.
///
/// The payload can be owned or borrowed.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct PcapPacket<'a> {
    /// Timestamp EPOCH of the packet with a nanosecond resolution
    pub timestamp: Duration,
    /// Original length of the packet when captured on the wire
    pub orig_len: u32,
    /// Payload, owned or borrowed, of the packet
    pub data: Cow<'a, [u8]>,
}

impl<'a> PcapPacket<'a> {
    /// Create a new borrowed `PcapPacket` with the given parameters.
    pub fn new(timestamp: Duration, orig_len: u32, data: &'a [u8]) -> PcapPacket<'a> {
        PcapPacket { timestamp, orig_len, data: Cow::Borrowed(data) }
    }

    /// Create a new owned `PcapPacket` with the given parameters.
    pub fn new_owned(timestamp: Duration, orig_len: u32, data: Vec<u8>) -> PcapPacket<'static> {
        PcapPacket { timestamp, orig_len, data: Cow::Owned(data) }
    }

    /// Parse a new borrowed `PcapPacket` from a slice.
    pub fn from_slice<B: ByteOrder>(slice: &'a [u8], ts_resolution: TsResolution) -> PcapResult<(&'a [u8], PcapPacket<'a>)> {
        if slice.len() < 16 {
            return Err(PcapError::IncompleteBuffer(16, slice.len()));
        }

        let header = PacketHeader::from_bytes::<B>(&slice[..16], ts_resolution)?;
        let slice = &slice[16..];
        let len = header.incl_len as usize;

        if slice.len() < len {
            return Err(PcapError::IncompleteBuffer(len, slice.len()));
        }

        let packet = PcapPacket { timestamp: header.timestamp, orig_len: header.orig_len, data: Cow::Borrowed(&slice[..len]) };

        Ok((&slice[len..], packet))
    }

    /// Write a `PcapPacket` to a writer: the 16B record header followed by the data.
    ///
    /// The sub-second part of the timestamp is written in `ts_resolution`.
    pub fn write_to<W: Write, B: ByteOrder>(&self, writer: &mut W, ts_resolution: TsResolution) -> PcapResult<usize> {
        let record = encode_record::<B>(self, ts_resolution)?;
        writer.write_all(&record).map_err(PcapError::WriteFailed)?;

        Ok(record.len())
    }
}

impl PcapPacket<'static> {
    /// Reads an owned `PcapPacket` from a reader.
    ///
    /// `remaining` is the number of bytes left in the stream, record header included.
    /// A captured length greater than what follows the header gives [`PcapError::UnexpectedEndOfStream`] without reading the data.
    pub(crate) fn from_reader<R: Read, B: ByteOrder>(reader: &mut R, ts_resolution: TsResolution, remaining: u64) -> PcapResult<Self> {
        let mut bytes = [0_u8; 16];
        reader.read_exact(&mut bytes)?;

        let header = PacketHeader::from_bytes::<B>(&bytes, ts_resolution)?;
        if header.incl_len as u64 > remaining.saturating_sub(16) {
            return Err(PcapError::UnexpectedEndOfStream);
        }

        let mut data = vec![0_u8; header.incl_len as usize];
        reader.read_exact(&mut data)?;

        Ok(PcapPacket::new_owned(header.timestamp, header.orig_len, data))
    }
}

/// Encodes the record header and the data of any packet.
pub(crate) fn encode_record<B: ByteOrder>(packet: &dyn Packet, ts_resolution: TsResolution) -> PcapResult<Vec<u8>> {
    let ts_sec = u32::try_from(packet.seconds()).map_err(|_| PcapError::InvalidField("PcapPacket: timestamp_secs > u32::MAX"))?;
    let ts_frac = match ts_resolution {
        TsResolution::MicroSecond => packet.microseconds(),
        TsResolution::NanoSecond => packet.nanoseconds(),
    };

    let data = packet.data();
    let mut out = Vec::with_capacity(16 + data.len());

    out.write_u32::<B>(ts_sec)?;
    out.write_u32::<B>(ts_frac as u32)?;
    out.write_u32::<B>(data.len() as u32)?;
    out.write_u32::<B>(packet.original_len())?;
    out.extend_from_slice(data);

    Ok(out)
}

impl Packet for PcapPacket<'_> {
    fn seconds(&self) -> u64 {
        self.timestamp.as_secs()
    }

    fn microseconds(&self) -> u64 {
        self.timestamp.subsec_micros() as u64
    }

    fn nanoseconds(&self) -> u64 {
        self.timestamp.subsec_nanos() as u64
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn original_len(&self) -> u32 {
        self.orig_len
    }
}

/// Pcap packet header
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
struct PacketHeader {
    /// Timestamp with a nanosecond resolution
    timestamp: Duration,
    /// Number of octets of the packet saved in file
    incl_len: u32,
    /// Original length of the packet on the wire
    orig_len: u32,
}

impl PacketHeader {
    fn from_bytes<B: ByteOrder>(mut slice: &[u8], ts_resolution: TsResolution) -> PcapResult<PacketHeader> {
        let ts_sec = slice.read_u32::<B>()?;
        let ts_frac = slice.read_u32::<B>()?;
        let incl_len = slice.read_u32::<B>()?;
        let orig_len = slice.read_u32::<B>()?;

        // A sub-second field of one second or more is carried over, as other tools do
        let nanos = ts_frac as u64 * (1000 / ts_resolution.units_per_micro()) as u64;
        let timestamp = Duration::from_secs(ts_sec as u64) + Duration::from_nanos(nanos);

        Ok(PacketHeader { timestamp, incl_len, orig_len })
    }
}
