use std::io::{Read, Write};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::errors::{PcapError, PcapResult};
use crate::{DataLink, Endianness, TsResolution};

const MAGIC_MICRO: u32 = 0xA1B2C3D4;
const MAGIC_NANO: u32 = 0xA1B23C4D;

/// Pcap Global Header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PcapHeader {
    /// Major version number
    pub version_major: u16,

    /// Minor version number
    pub version_minor: u16,

    /// GMT to local timezone correction, should always be 0
    pub ts_correction: i32,

    /// Timestamp accuracy, should always be 0
    pub ts_accuracy: u32,

    /// Max length of captured packet, typically 65535
    pub snaplen: u32,

    /// DataLink type (first layer in the packet)
    pub datalink: DataLink,

    /// Timestamp resolution of the pcap (microsecond or nanosecond)
    pub ts_resolution: TsResolution,

    /// Endianness of the pcap (excluding the packet data)
    pub endianness: Endianness,
}

impl PcapHeader {
    /// Creates a header with the default fields and the given resolution and byte order.
    pub fn create_empty(ts_resolution: TsResolution, endianness: Endianness) -> Self {
        PcapHeader { ts_resolution, endianness, ..Default::default() }
    }

    /// Creates a new [`PcapHeader`] from a reader.
    ///
    /// The magic number gives both the endianness and the timestamp resolution.
    pub fn from_reader<R: Read>(reader: &mut R) -> PcapResult<PcapHeader> {
        let magic_number = reader.read_u32::<BigEndian>()?;

        return match magic_number {
            MAGIC_MICRO => init_pcap_header::<_, BigEndian>(reader, TsResolution::MicroSecond, Endianness::Big),
            0xD4C3B2A1 => init_pcap_header::<_, LittleEndian>(reader, TsResolution::MicroSecond, Endianness::Little),
            MAGIC_NANO => init_pcap_header::<_, BigEndian>(reader, TsResolution::NanoSecond, Endianness::Big),
            0x4D3CB2A1 => init_pcap_header::<_, LittleEndian>(reader, TsResolution::NanoSecond, Endianness::Little),
            _ => Err(PcapError::InvalidMagicNumber(magic_number)),
        };

        // Inner function used for the initialisation of the PcapHeader
        fn init_pcap_header<R: Read, B: ByteOrder>(reader: &mut R, ts_resolution: TsResolution, endianness: Endianness) -> PcapResult<PcapHeader> {
            let version_major = reader.read_u16::<B>()?;
            let version_minor = reader.read_u16::<B>()?;
            let ts_correction = reader.read_i32::<B>()?;
            let ts_accuracy = reader.read_u32::<B>()?;
            let snaplen = reader.read_u32::<B>()?;
            let datalink = DataLink::from(reader.read_u32::<B>()?);

            let header = PcapHeader {
                version_major,
                version_minor,
                ts_correction,
                ts_accuracy,
                snaplen,
                datalink,
                ts_resolution,
                endianness,
            };

            Ok(header)
        }
    }

    /// Creates a new [`PcapHeader`] from a slice.
    pub fn from_slice(mut slice: &[u8]) -> PcapResult<(&[u8], PcapHeader)> {
        // Check header length
        if slice.len() < 24 {
            return Err(PcapError::IncompleteBuffer(24, slice.len()));
        }

        let header = PcapHeader::from_reader(&mut slice)?;

        Ok((slice, header))
    }

    /// Writes a [`PcapHeader`] to a writer, in its own endianness.
    ///
    /// Writes 24B in the writer on success.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> PcapResult<usize> {
        return match self.endianness {
            Endianness::Big => write_header::<_, BigEndian>(self, writer),
            Endianness::Little => write_header::<_, LittleEndian>(self, writer),
        };

        fn write_header<W: Write, B: ByteOrder>(header: &PcapHeader, writer: &mut W) -> PcapResult<usize> {
            let magic_number = match header.ts_resolution {
                TsResolution::MicroSecond => MAGIC_MICRO,
                TsResolution::NanoSecond => MAGIC_NANO,
            };

            let mut out = [0_u8; 24];
            let mut buf = &mut out[..];

            buf.write_u32::<B>(magic_number)?;
            buf.write_u16::<B>(header.version_major)?;
            buf.write_u16::<B>(header.version_minor)?;
            buf.write_i32::<B>(header.ts_correction)?;
            buf.write_u32::<B>(header.ts_accuracy)?;
            buf.write_u32::<B>(header.snaplen)?;
            buf.write_u32::<B>(header.datalink.into())?;

            writer.write_all(&out).map_err(PcapError::WriteFailed)?;

            Ok(24)
        }
    }

    /// Magic number as written on disk, read in big endian
    pub fn magic_number(&self) -> u32 {
        let magic = match self.ts_resolution {
            TsResolution::MicroSecond => MAGIC_MICRO,
            TsResolution::NanoSecond => MAGIC_NANO,
        };

        match self.endianness {
            Endianness::Big => magic,
            Endianness::Little => magic.swap_bytes(),
        }
    }
}

/// Creates a new [`PcapHeader`] with these parameters:
///
/// ```rust,ignore
/// PcapHeader {
///     version_major: 2,
///     version_minor: 4,
///     ts_correction: 0,
///     ts_accuracy: 0,
///     snaplen: 65535,
///     datalink: DataLink::ETHERNET,
///     ts_resolution: TsResolution::MicroSecond,
///     endianness: Endianness::native(),
/// };
/// ```
impl Default for PcapHeader {
    fn default() -> Self {
        PcapHeader {
            version_major: 2,
            version_minor: 4,
            ts_correction: 0,
            ts_accuracy: 0,
            snaplen: 65535,
            datalink: DataLink::ETHERNET,
            ts_resolution: TsResolution::MicroSecond,
            endianness: Endianness::native(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_numbers() {
        let cases = [
            (TsResolution::MicroSecond, Endianness::Big, [0xA1, 0xB2, 0xC3, 0xD4]),
            (TsResolution::MicroSecond, Endianness::Little, [0xD4, 0xC3, 0xB2, 0xA1]),
            (TsResolution::NanoSecond, Endianness::Big, [0xA1, 0xB2, 0x3C, 0x4D]),
            (TsResolution::NanoSecond, Endianness::Little, [0x4D, 0x3C, 0xB2, 0xA1]),
        ];

        for (ts_resolution, endianness, magic) in cases {
            let header = PcapHeader::create_empty(ts_resolution, endianness);

            let mut out = Vec::new();
            assert_eq!(header.write_to(&mut out).unwrap(), 24);
            assert_eq!(&out[..4], &magic);
            assert_eq!(header.magic_number(), u32::from_be_bytes(magic));

            let (rem, parsed) = PcapHeader::from_slice(&out).unwrap();
            assert!(rem.is_empty());
            assert_eq!(parsed, header);
        }
    }

    #[test]
    fn little_endian_fields() {
        let data = [212, 195, 178, 161, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 255, 0, 0, 1, 0, 0, 0];
        let (_, header) = PcapHeader::from_slice(&data).unwrap();

        assert_eq!(header, PcapHeader::create_empty(TsResolution::MicroSecond, Endianness::Little));
    }

    #[test]
    fn invalid_magic() {
        let data = [0_u8; 24];
        assert!(matches!(PcapHeader::from_slice(&data), Err(PcapError::InvalidMagicNumber(0))));
        assert!(matches!(PcapHeader::from_slice(&data[..20]), Err(PcapError::IncompleteBuffer(24, 20))));
    }
}
