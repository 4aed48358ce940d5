//! Format sniffing and the reader factory.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::errors::{PcapError, PcapResult};
use crate::pcap::PcapReader;
use crate::pcapng::blocks::SECTION_HEADER_BLOCK;
use crate::pcapng::PcapNgReader;
use crate::reader::{stream_len, AnyReader};
use crate::Endianness;

/// Format of a capture stream
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CaptureFormat {
    /// Classic pcap with microsecond timestamps
    PcapMicro,
    /// Classic pcap with nanosecond timestamps
    PcapNano,
    /// PcapNg
    PcapNg,
}

impl CaptureFormat {
    /// True for both classic pcap formats
    pub fn is_pcap(self) -> bool {
        matches!(self, CaptureFormat::PcapMicro | CaptureFormat::PcapNano)
    }
}

/// Result of [`detect_format`]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DetectedFormat {
    /// Format of the stream
    pub format: CaptureFormat,
    /// Byte order of the global header, or of the first section for PcapNg
    pub endianness: Endianness,
}

/// Sniffs the format and byte order of a capture stream from its first bytes.
///
/// The position of the stream is restored before returning, on success and on error.
///
/// # Errors
/// - [`PcapError::StreamTooShort`] if fewer than 12 bytes are left
/// - [`PcapError::NotACaptureStream`] if the magic number is unknown
pub fn detect_format<R: Read + Seek>(stream: &mut R) -> PcapResult<DetectedFormat> {
    let start = stream.stream_position()?;
    let res = sniff(stream, start);
    stream.seek(SeekFrom::Start(start))?;

    res
}

fn sniff<R: Read + Seek>(stream: &mut R, start: u64) -> PcapResult<DetectedFormat> {
    let available = stream_len(stream)?.saturating_sub(start);
    if available < 12 {
        return Err(PcapError::StreamTooShort(available));
    }

    let mut head = [0_u8; 12];
    stream.read_exact(&mut head)?;

    let mut magic = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    if magic == SECTION_HEADER_BLOCK {
        // The byte-order magic follows the block type and length
        magic = u32::from_be_bytes([head[8], head[9], head[10], head[11]]);
    }

    let (format, endianness) = match magic {
        0xA1B2C3D4 => (CaptureFormat::PcapMicro, Endianness::Big),
        0xD4C3B2A1 => (CaptureFormat::PcapMicro, Endianness::Little),
        0xA1B23C4D => (CaptureFormat::PcapNano, Endianness::Big),
        0x4D3CB2A1 => (CaptureFormat::PcapNano, Endianness::Little),
        0x1A2B3C4D => (CaptureFormat::PcapNg, Endianness::Big),
        0x4D3C2B1A => (CaptureFormat::PcapNg, Endianness::Little),
        _ => return Err(PcapError::NotACaptureStream(magic)),
    };

    debug!("Detected {format:?} stream in {endianness:?} endian");

    Ok(DetectedFormat { format, endianness })
}

/// Opens the right reader for `stream` after sniffing its format.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
///
/// use pcapng_utils::{open_reader, CaptureHeaders, CaptureReader};
///
/// let file_in = File::open("test.pcapng").expect("Error opening file");
/// let reader = open_reader(file_in).unwrap();
///
/// println!("{:?}", reader.header_format());
/// while !reader.end_of_stream().unwrap() {
///     let packet = reader.read().unwrap();
/// }
/// ```
pub fn open_reader<R: Read + Seek>(mut stream: R) -> PcapResult<AnyReader<R>> {
    let detected = detect_format(&mut stream)?;

    let reader = match detected.format {
        CaptureFormat::PcapMicro | CaptureFormat::PcapNano => AnyReader::Pcap(PcapReader::new(stream)?),
        CaptureFormat::PcapNg => AnyReader::PcapNg(PcapNgReader::new(stream)?),
    };

    Ok(reader)
}

/// Opens the file at `path` with [`open_reader`].
pub fn open_path<P: AsRef<Path>>(path: P) -> PcapResult<AnyReader<File>> {
    let file = File::open(path)?;
    open_reader(file)
}
