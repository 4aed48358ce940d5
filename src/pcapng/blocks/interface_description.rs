//! Interface Description Block (IDB).

use std::borrow::Cow;
use std::fmt;
use std::io::{Result as IoResult, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use super::opt_common::{
    opt_array, opt_str, opt_u32, opt_u64, opt_u8, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT,
};
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::DataLink;

//   0                   1                   2                   3
//   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//  +---------------------------------------------------------------+
//  |           LinkType            |           Reserved            |
//  +---------------------------------------------------------------+
//  |                            SnapLen                            |
//  +---------------------------------------------------------------+
//  /                                                               /
//  /                      Options (variable)                       /
//  /                                                               /
//  +---------------------------------------------------------------+
/// An Interface Description Block (IDB) is the container for information describing an interface
/// on which packet data is captured.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct InterfaceDescriptionBlock<'a> {
    /// A value that defines the link layer type of this interface.
    ///
    /// The list of Standardized Link Layer Type codes is available in the
    /// [tcpdump.org link-layer header types registry.](http://www.tcpdump.org/linktypes.html).
    pub linktype: DataLink,

    /// Not used - MUST be filled with 0 by pcap file writers, and MUST be ignored by pcapng file readers.
    pub reserved: u16,

    /// Maximum number of octets captured from each packet.
    ///
    /// The portion of each packet that exceeds this value will not be stored in the file.
    /// A value of zero indicates no limit.
    pub snaplen: u32,

    /// Options
    pub options: InterfaceDescriptionOption<'a>,
}

impl InterfaceDescriptionBlock<'static> {
    /// Creates a new `InterfaceDescriptionBlock` without options.
    pub fn new(linktype: DataLink, snaplen: u32) -> Self {
        InterfaceDescriptionBlock { linktype, reserved: 0, snaplen, options: InterfaceDescriptionOption::default() }
    }
}

impl<'a> InterfaceDescriptionBlock<'a> {
    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for InterfaceDescriptionBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 8 {
            return Err(PcapError::IncompleteBuffer(8, slice.len()));
        }

        let linktype = (slice.read_u16::<B>()? as u32).into();
        let reserved = slice.read_u16::<B>()?;
        let snaplen = slice.read_u32::<B>()?;
        let (slice, options) = parse_options::<B, InterfaceDescriptionOption>(slice, sink)?;

        let block = InterfaceDescriptionBlock { linktype, reserved, snaplen, options };

        Ok((slice, block))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let linktype = u16::try_from(u32::from(self.linktype))
            .map_err(|_| PcapError::InvalidField("InterfaceDescriptionBlock: linktype > 0xFFFF").into_io())?;

        writer.write_u16::<B>(linktype)?;
        writer.write_u16::<B>(self.reserved)?;
        writer.write_u32::<B>(self.snaplen)?;

        let opt_len = self.options.write_to::<B, _>(writer)?;

        Ok(8 + opt_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::InterfaceDescription(self)
    }
}

const NAME: u16 = 2;
const DESCRIPTION: u16 = 3;
const IPV4_ADDR: u16 = 4;
const IPV6_ADDR: u16 = 5;
const MAC_ADDR: u16 = 6;
const EUI_ADDR: u16 = 7;
const SPEED: u16 = 8;
const TS_RESOL: u16 = 9;
const TZONE: u16 = 10;
const FILTER: u16 = 11;
const OS: u16 = 12;
const FCS_LEN: u16 = 13;
const TS_OFFSET: u16 = 14;

/// Options of an [`InterfaceDescriptionBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct InterfaceDescriptionOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// The if_name option is a UTF-8 string containing the name of the device used to capture data.
    pub name: Option<Cow<'a, str>>,

    /// The if_description option is a UTF-8 string containing the description of the device used to capture data.
    pub description: Option<Cow<'a, str>>,

    /// The if_IPv4addr option is an IPv4 network address and corresponding netmask for the interface.
    pub ipv4_address: Option<InterfaceIpv4>,

    /// The if_IPv6addr option is an IPv6 network address and corresponding prefix length for the interface.
    pub ipv6_address: Option<InterfaceIpv6>,

    /// The if_MACaddr option is the Interface Hardware MAC address (48 bits), if available.
    pub mac_address: Option<[u8; 6]>,

    /// The if_EUIaddr option is the Interface Hardware EUI address (64 bits), if available.
    pub eui_address: Option<[u8; 8]>,

    /// The if_speed option is a 64-bit number for the Interface speed (in bits per second).
    pub speed: Option<u64>,

    /// The if_tsresol option identifies the resolution of timestamps.
    pub ts_resolution: Option<u8>,

    /// The if_tzone option identifies the time zone for GMT support.
    pub time_zone: Option<u32>,

    /// The if_filter option identifies the filter (e.g. "capture only TCP traffic") used to capture traffic.
    pub filter: Option<Cow<'a, [u8]>>,

    /// The if_os option is a UTF-8 string containing the name of the operating system
    /// of the machine in which this interface is installed.
    pub os: Option<Cow<'a, str>>,

    /// The if_fcslen option is an 8-bit unsigned integer value that specifies
    /// the length of the Frame Check Sequence (in bits) for this interface.
    pub fcs_length: Option<u8>,

    /// The if_tsoffset option is a 64-bit integer value that specifies an offset (in seconds)
    /// that must be added to the timestamp of each packet to obtain the absolute timestamp of a packet.
    pub ts_offset: Option<u64>,
}

impl<'a> OptionSchema<'a> for InterfaceDescriptionOption<'a> {
    const NAME: &'static str = "InterfaceDescriptionOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            NAME => self.name = Some(opt_str(value)?),
            DESCRIPTION => self.description = Some(opt_str(value)?),
            IPV4_ADDR => self.ipv4_address = Some(InterfaceIpv4::from_bytes(opt_array(code, value)?)),
            IPV6_ADDR => self.ipv6_address = Some(InterfaceIpv6::from_bytes(opt_array(code, value)?)),
            MAC_ADDR => self.mac_address = Some(opt_array(code, value)?),
            EUI_ADDR => self.eui_address = Some(opt_array(code, value)?),
            SPEED => self.speed = Some(opt_u64::<B>(code, value)?),
            TS_RESOL => self.ts_resolution = Some(opt_u8(code, value)?),
            TZONE => self.time_zone = Some(opt_u32::<B>(code, value)?),
            FILTER => self.filter = Some(Cow::Borrowed(value)),
            OS => self.os = Some(opt_str(value)?),
            FCS_LEN => self.fcs_length = Some(opt_u8(code, value)?),
            TS_OFFSET => self.ts_offset = Some(opt_u64::<B>(code, value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

impl<'a> InterfaceDescriptionOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let ipv4 = self.ipv4_address.map(|addr| addr.to_bytes());
        let ipv6 = self.ipv6_address.map(|addr| addr.to_bytes());

        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, str>(writer, NAME, self.name.as_deref())?;
        len += write_opt::<B, _, str>(writer, DESCRIPTION, self.description.as_deref())?;
        len += write_opt::<B, _, [u8]>(writer, IPV4_ADDR, ipv4.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, [u8]>(writer, IPV6_ADDR, ipv6.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, [u8]>(writer, MAC_ADDR, self.mac_address.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, [u8]>(writer, EUI_ADDR, self.eui_address.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, u64>(writer, SPEED, self.speed.as_ref())?;
        len += write_opt::<B, _, u8>(writer, TS_RESOL, self.ts_resolution.as_ref())?;
        len += write_opt::<B, _, u32>(writer, TZONE, self.time_zone.as_ref())?;
        len += write_opt::<B, _, [u8]>(writer, FILTER, self.filter.as_deref())?;
        len += write_opt::<B, _, str>(writer, OS, self.os.as_deref())?;
        len += write_opt::<B, _, u8>(writer, FCS_LEN, self.fcs_length.as_ref())?;
        len += write_opt::<B, _, u64>(writer, TS_OFFSET, self.ts_offset.as_ref())?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}

/// IPv4 address and netmask of an interface
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InterfaceIpv4 {
    /// Address of the interface
    pub address: Ipv4Addr,
    /// Netmask of the interface
    pub netmask: Ipv4Addr,
}

impl InterfaceIpv4 {
    /// Creates a new `InterfaceIpv4`.
    ///
    /// Returns an error if `address` or `netmask` isn't an IPv4 address.
    pub fn new(address: IpAddr, netmask: IpAddr) -> PcapResult<Self> {
        match (address, netmask) {
            (IpAddr::V4(address), IpAddr::V4(netmask)) => Ok(InterfaceIpv4 { address, netmask }),
            _ => Err(PcapError::WrongAddressFamily("InterfaceIpv4")),
        }
    }

    /// Decodes the 4 address bytes followed by the 4 netmask bytes.
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        InterfaceIpv4 {
            address: Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
            netmask: Ipv4Addr::new(bytes[4], bytes[5], bytes[6], bytes[7]),
        }
    }

    /// Encodes the address followed by the netmask.
    pub fn to_bytes(&self) -> [u8; 8] {
        let mut bytes = [0_u8; 8];
        bytes[..4].copy_from_slice(&self.address.octets());
        bytes[4..].copy_from_slice(&self.netmask.octets());
        bytes
    }
}

impl fmt::Display for InterfaceIpv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.address, self.netmask)
    }
}

/// IPv6 address and prefix length of an interface
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct InterfaceIpv6 {
    /// Address of the interface
    pub address: Ipv6Addr,
    /// Length of the network prefix
    pub prefix_length: u8,
}

impl InterfaceIpv6 {
    /// Creates a new `InterfaceIpv6`.
    ///
    /// Returns an error if `address` isn't an IPv6 address.
    pub fn new(address: IpAddr, prefix_length: u8) -> PcapResult<Self> {
        match address {
            IpAddr::V6(address) => Ok(InterfaceIpv6 { address, prefix_length }),
            IpAddr::V4(_) => Err(PcapError::WrongAddressFamily("InterfaceIpv6")),
        }
    }

    /// Decodes the 16 address bytes followed by the prefix length.
    pub fn from_bytes(bytes: [u8; 17]) -> Self {
        let mut octets = [0_u8; 16];
        octets.copy_from_slice(&bytes[..16]);

        InterfaceIpv6 { address: Ipv6Addr::from(octets), prefix_length: bytes[16] }
    }

    /// Encodes the address followed by the prefix length.
    pub fn to_bytes(&self) -> [u8; 17] {
        let mut bytes = [0_u8; 17];
        bytes[..16].copy_from_slice(&self.address.octets());
        bytes[16] = self.prefix_length;
        bytes
    }
}

/// Full form, every group zero-padded: `2001:0db8:85a3:08d3:1319:8a2e:0370:7344/64`
impl fmt::Display for InterfaceIpv6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments = self.address.segments();
        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{segment:04x}")?;
        }

        write!(f, "/{}", self.prefix_length)
    }
}

#[cfg(test)]
mod tests {
    use byteorder_slice::byteorder::{BigEndian, LittleEndian};

    use super::*;

    fn decode<B: ByteOrder>(data: &[u8]) -> InterfaceDescriptionOption<'_> {
        parse_options::<B, InterfaceDescriptionOption>(data, &mut ErrorSink::raise()).unwrap().1
    }

    #[test]
    fn ipv4_display() {
        let addr = InterfaceIpv4::from_bytes([192, 168, 0, 1, 255, 255, 255, 0]);

        assert_eq!(addr.address.to_string(), "192.168.0.1");
        assert_eq!(addr.to_string(), "192.168.0.1 255.255.255.0");
    }

    #[test]
    fn ipv6_display() {
        let bytes = [0x20, 0x01, 0x0d, 0xb8, 0x85, 0xa3, 0x08, 0xd3, 0x13, 0x19, 0x8a, 0x2e, 0x03, 0x70, 0x73, 0x44, 64];
        let addr = InterfaceIpv6::from_bytes(bytes);

        assert_eq!(addr.to_string(), "2001:0db8:85a3:08d3:1319:8a2e:0370:7344/64");
        assert_eq!(addr.to_bytes(), bytes);
    }

    #[test]
    fn wrong_address_family() {
        let v4: IpAddr = Ipv4Addr::LOCALHOST.into();
        let v6: IpAddr = Ipv6Addr::LOCALHOST.into();

        assert!(matches!(InterfaceIpv4::new(v4, v6), Err(PcapError::WrongAddressFamily(_))));
        assert!(matches!(InterfaceIpv6::new(v4, 64), Err(PcapError::WrongAddressFamily(_))));
        assert!(InterfaceIpv4::new(v4, v4).is_ok());
        assert!(InterfaceIpv6::new(v6, 128).is_ok());
    }

    #[test]
    fn options_round_trip() {
        let filter = [5_u8, 6, 7, 8];
        let options = InterfaceDescriptionOption {
            comment: Some("Test Comment".into()),
            name: Some("Test Name".into()),
            description: Some("Test Description".into()),
            ipv4_address: Some(InterfaceIpv4::from_bytes([127, 0, 0, 1, 255, 255, 255, 0])),
            ipv6_address: Some(InterfaceIpv6::from_bytes([
                0x20, 0x01, 0x0d, 0xdb, 0, 0, 0, 0, 0, 0, 0, 0, 0x14, 0x28, 0x57, 0xab, 0x40,
            ])),
            mac_address: Some([0x00, 0x0A, 0xE6, 0x3E, 0xFD, 0xE1]),
            eui_address: Some([0x00, 0x0A, 0xE6, 0xFF, 0xFE, 0x3E, 0xFD, 0xE1]),
            speed: Some(12345678),
            ts_resolution: Some(6),
            time_zone: Some(1),
            filter: Some(Cow::Borrowed(&filter[..])),
            os: Some("Test OS".into()),
            fcs_length: Some(255),
            ts_offset: Some(1234),
        };

        let mut be = Vec::new();
        options.write_to::<BigEndian, _>(&mut be).unwrap();
        assert_eq!(decode::<BigEndian>(&be), options);

        let mut le = Vec::new();
        options.write_to::<LittleEndian, _>(&mut le).unwrap();
        assert_eq!(decode::<LittleEndian>(&le), options);
    }

    #[test]
    fn linktype_fits_16_bits() {
        let mut out = Vec::new();
        assert_eq!(InterfaceDescriptionBlock::new(DataLink::Unknown(0xFFFF), 0).write_to::<BigEndian, _>(&mut out).unwrap(), 12);
        assert_eq!(out[..2], [0xFF, 0xFF]);

        let err = InterfaceDescriptionBlock::new(DataLink::Unknown(0x1_0000), 0).write_to::<BigEndian, _>(&mut Vec::new()).unwrap_err();
        assert!(matches!(PcapError::from(err), PcapError::InvalidField(_)));
    }

    #[test]
    fn wrong_length_is_reported_per_option() {
        // MAC address of 5 bytes, then a valid speed
        let data = [6, 0, 5, 0, 1, 2, 3, 4, 5, 0, 0, 0, 8, 0, 8, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];

        let mut faults = Vec::new();
        let mut handler = |err: PcapError| faults.push(err);
        let (_, opts) = parse_options::<LittleEndian, InterfaceDescriptionOption>(&data, &mut ErrorSink::report(&mut handler)).unwrap();

        assert_eq!(opts.mac_address, None);
        assert_eq!(opts.speed, Some(1));
        assert_eq!(faults.len(), 1);
        assert!(matches!(faults[0], PcapError::InvalidOption { code: 6, .. }));
    }
}
