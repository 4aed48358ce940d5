//! Name Resolution Block (NRB).

use std::borrow::Cow;
use std::io::{Result as IoResult, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;
use log::warn;

use super::block_common::{Block, PcapNgBlock};
use super::opt_common::{opt_array, opt_str, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT};
use crate::errors::{ErrorSink, PcapError, PcapResult};

const RECORD_END: u16 = 0;
const RECORD_IPV4: u16 = 1;
const RECORD_IPV6: u16 = 2;

/// The Name Resolution Block (NRB) is used to support the correlation of numeric addresses
/// (present in the captured packets) and their corresponding canonical names and it is optional.
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct NameResolutionBlock<'a> {
    /// Records
    pub records: Vec<NameRecord<'a>>,

    /// Options
    pub options: NameResolutionOption<'a>,
}

impl<'a> NameResolutionBlock<'a> {
    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for NameResolutionBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        let mut records = Vec::new();

        loop {
            if slice.len() < 4 {
                return Err(PcapError::IncompleteBuffer(4, slice.len()));
            }

            let type_ = slice.read_u16::<B>()?;
            let length = slice.read_u16::<B>()? as usize;

            if type_ == RECORD_END {
                break;
            }

            if slice.len() < length {
                return Err(PcapError::IncompleteBuffer(length, slice.len()));
            }

            let value = &slice[..length];
            let pad_len = ((4 - length % 4) % 4).min(slice.len() - length);
            slice = &slice[length + pad_len..];

            match NameRecord::from_value(type_, value) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => warn!("NameResolutionBlock: skipping record of unknown type {type_}"),
                Err(err) => sink.fault(err)?,
            }
        }

        let (slice, options) = parse_options::<B, NameResolutionOption>(slice, sink)?;

        Ok((slice, NameResolutionBlock { records, options }))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let mut len = 0;

        for record in &self.records {
            len += record.write_to::<B, _>(writer)?;
        }

        writer.write_u16::<B>(RECORD_END)?;
        writer.write_u16::<B>(0)?;
        len += 4;

        len += self.options.write_to::<B, _>(writer)?;

        Ok(len)
    }

    fn into_block(self) -> Block<'a> {
        Block::NameResolution(self)
    }
}

/// One address-to-name association of a [`NameResolutionBlock`]
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct NameRecord<'a> {
    /// Resolved address
    pub address: IpAddr,
    /// Name of the address
    pub name: Cow<'a, str>,
}

impl<'a> NameRecord<'a> {
    /// Creates a new borrowed `NameRecord`
    pub fn new(address: IpAddr, name: &'a str) -> Self {
        NameRecord { address, name: Cow::Borrowed(name) }
    }

    /// Decodes the value of a record, `None` if the record type is unknown.
    ///
    /// The name stops at the first NUL byte, further names are ignored.
    fn from_value(type_: u16, value: &'a [u8]) -> PcapResult<Option<Self>> {
        let addr_len = match type_ {
            RECORD_IPV4 => 4,
            RECORD_IPV6 => 16,
            _ => return Ok(None),
        };

        if value.len() < addr_len {
            return Err(PcapError::InvalidField("NameRecord: value shorter than its address"));
        }

        let (addr, names) = value.split_at(addr_len);
        let address = match <[u8; 16]>::try_from(addr) {
            Ok(octets) => IpAddr::V6(Ipv6Addr::from(octets)),
            Err(_) => IpAddr::V4(Ipv4Addr::new(addr[0], addr[1], addr[2], addr[3])),
        };

        let name_end = names.iter().position(|&b| b == 0).unwrap_or(names.len());
        let name = std::str::from_utf8(&names[..name_end])?;

        Ok(Some(NameRecord { address, name: Cow::Borrowed(name) }))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let (type_, addr) = match self.address {
            IpAddr::V4(addr) => (RECORD_IPV4, addr.octets().to_vec()),
            IpAddr::V6(addr) => (RECORD_IPV6, addr.octets().to_vec()),
        };

        let value_len = addr.len() + self.name.len() + 1;
        let len_field = u16::try_from(value_len).map_err(|_| PcapError::InvalidField("NameRecord: value longer than 65535 bytes").into_io())?;
        let pad_len = (4 - value_len % 4) % 4;

        writer.write_u16::<B>(type_)?;
        writer.write_u16::<B>(len_field)?;
        writer.write_all(&addr)?;
        writer.write_all(self.name.as_bytes())?;
        writer.write_u8(0)?;
        writer.write_all(&[0_u8; 3][..pad_len])?;

        Ok(4 + value_len + pad_len)
    }
}

const DNS_NAME: u16 = 2;
const DNS_IPV4: u16 = 3;
const DNS_IPV6: u16 = 4;

/// Options of a [`NameResolutionBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct NameResolutionOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// Name of the machine (DNS server) used to perform the name resolution.
    pub dns_name: Option<Cow<'a, str>>,

    /// IPv4 address of the DNS server.
    pub dns_ipv4: Option<Ipv4Addr>,

    /// IPv6 address of the DNS server.
    pub dns_ipv6: Option<Ipv6Addr>,
}

impl NameResolutionOption<'_> {
    /// Sets the IPv4 address of the DNS server.
    ///
    /// Fails with [`PcapError::WrongAddressFamily`] for an IPv6 address.
    pub fn with_dns_ipv4(mut self, address: IpAddr) -> PcapResult<Self> {
        match address {
            IpAddr::V4(addr) => {
                self.dns_ipv4 = Some(addr);
                Ok(self)
            },
            IpAddr::V6(_) => Err(PcapError::WrongAddressFamily("dns_ipv4")),
        }
    }

    /// Sets the IPv6 address of the DNS server.
    ///
    /// Fails with [`PcapError::WrongAddressFamily`] for an IPv4 address.
    pub fn with_dns_ipv6(mut self, address: IpAddr) -> PcapResult<Self> {
        match address {
            IpAddr::V6(addr) => {
                self.dns_ipv6 = Some(addr);
                Ok(self)
            },
            IpAddr::V4(_) => Err(PcapError::WrongAddressFamily("dns_ipv6")),
        }
    }
}

impl<'a> OptionSchema<'a> for NameResolutionOption<'a> {
    const NAME: &'static str = "NameResolutionOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            DNS_NAME => self.dns_name = Some(opt_str(value)?),
            DNS_IPV4 => self.dns_ipv4 = Some(Ipv4Addr::from(opt_array::<4>(code, value)?)),
            DNS_IPV6 => self.dns_ipv6 = Some(Ipv6Addr::from(opt_array::<16>(code, value)?)),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

impl<'a> NameResolutionOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let dns_ipv4 = self.dns_ipv4.map(|addr| addr.octets());
        let dns_ipv6 = self.dns_ipv6.map(|addr| addr.octets());

        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, str>(writer, DNS_NAME, self.dns_name.as_deref())?;
        len += write_opt::<B, _, [u8]>(writer, DNS_IPV4, dns_ipv4.as_ref().map(|octets| &octets[..]))?;
        len += write_opt::<B, _, [u8]>(writer, DNS_IPV6, dns_ipv6.as_ref().map(|octets| &octets[..]))?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use byteorder_slice::byteorder::{BigEndian, LittleEndian};

    use super::*;

    fn records() -> Vec<NameRecord<'static>> {
        vec![
            NameRecord::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), "localhost"),
            NameRecord::new(
                IpAddr::V6(Ipv6Addr::from([0x20, 0x01, 0x0d, 0xdb, 0, 0, 0, 0, 0, 0, 0, 0, 0x14, 0x28, 0x57, 0xab])),
                "test addr",
            ),
        ]
    }

    #[test]
    fn records_round_trip() {
        let block = NameResolutionBlock { records: records(), options: Default::default() };

        let mut be = Vec::new();
        let len = block.write_to::<BigEndian, _>(&mut be).unwrap();
        assert_eq!(len, be.len());
        assert_eq!(len % 4, 0);
        let (rem, decoded) = NameResolutionBlock::from_slice::<BigEndian>(&be, &mut ErrorSink::raise()).unwrap();
        assert!(rem.is_empty());
        assert_eq!(decoded, block);

        let mut le = Vec::new();
        block.write_to::<LittleEndian, _>(&mut le).unwrap();
        let (_, decoded) = NameResolutionBlock::from_slice::<LittleEndian>(&le, &mut ErrorSink::raise()).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn unknown_record_is_skipped() {
        let data = [
            9, 0, 2, 0, 0xAA, 0xBB, 0, 0, // unknown record
            1, 0, 6, 0, 10, 0, 0, 1, b'g', 0, 0, 0, // 10.0.0.1 "g"
            0, 0, 0, 0, // end of records
        ];

        let (_, block) = NameResolutionBlock::from_slice::<LittleEndian>(&data, &mut ErrorSink::raise()).unwrap();
        assert_eq!(block.records, vec![NameRecord::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), "g")]);
    }

    #[test]
    fn options_round_trip() {
        let options = NameResolutionOption { comment: Some("Test Comment".into()), dns_name: Some("Dns Name".into()), ..Default::default() }
            .with_dns_ipv4("127.0.0.1".parse().unwrap())
            .unwrap()
            .with_dns_ipv6("2001:0db8:85a3:08d3:1319:8a2e:0370:7344".parse().unwrap())
            .unwrap();

        let mut out = Vec::new();
        options.write_to::<BigEndian, _>(&mut out).unwrap();
        let (_, decoded) = parse_options::<BigEndian, NameResolutionOption>(&out, &mut ErrorSink::raise()).unwrap();

        assert_eq!(decoded, options);
    }

    #[test]
    fn wrong_address_family() {
        let v6: IpAddr = "::1".parse().unwrap();
        let v4: IpAddr = "127.0.0.1".parse().unwrap();

        assert!(matches!(NameResolutionOption::default().with_dns_ipv4(v6), Err(PcapError::WrongAddressFamily(_))));
        assert!(matches!(NameResolutionOption::default().with_dns_ipv6(v4), Err(PcapError::WrongAddressFamily(_))));
    }

    #[test]
    fn record_length_bound() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);

        // 4B address + name + NUL fills the 16 bits length
        let longest = "a".repeat(u16::MAX as usize - 5);
        let mut out = Vec::new();
        assert_eq!(NameRecord::new(localhost, &longest).write_to::<LittleEndian, _>(&mut out).unwrap(), 4 + 65535 + 1);
        assert_eq!(out[2..4], [0xFF, 0xFF]);

        let too_long = "a".repeat(u16::MAX as usize - 4);
        let block = NameResolutionBlock { records: vec![NameRecord::new(localhost, &too_long)], options: Default::default() };
        let err = block.into_block().write_to::<LittleEndian, _>(&mut Vec::new()).unwrap_err();
        assert!(matches!(PcapError::from(err), PcapError::InvalidField(_)));
    }

    #[test]
    fn wrong_dns_address_length() {
        let data = [3, 0, 3, 0, 1, 2, 3, 0, 0, 0, 0, 0];
        assert!(parse_options::<LittleEndian, NameResolutionOption>(&data, &mut ErrorSink::raise()).is_err());
    }
}
