use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use super::hash::HashBlock;
use super::opt_common::{opt_str, opt_u32, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT};
use super::packet_flags::PacketBlockFlags;
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::Packet;
use crate::timestamp::Timestamp;

/// The Packet Block is obsolete, and MUST NOT be used in new files.
/// Use the Enhanced Packet Block or Simple Packet Block instead.
///
/// It is still decoded and encoded so that old files round-trip.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct PacketBlock<'a> {
    /// It specifies the interface this packet comes from.
    pub interface_id: u16,

    /// Local drop counter.
    /// It specifies the number of packets lost (by the interface and the operating system)
    /// between this packet and the preceding one.
    pub drop_count: u16,

    /// Time elapsed since 1970-01-01 00:00:00 UTC.
    pub timestamp: Timestamp,

    /// Actual length of the packet when it was transmitted on the network.
    pub original_len: u32,

    /// The data coming from the network, including link-layer headers.
    pub data: Cow<'a, [u8]>,

    /// Options
    pub options: PacketOption<'a>,
}

impl<'a> PacketBlock<'a> {
    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for PacketBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 20 {
            return Err(PcapError::IncompleteBuffer(20, slice.len()));
        }

        let interface_id = slice.read_u16::<B>()?;
        let drop_count = slice.read_u16::<B>()?;
        let (rem, timestamp) = Timestamp::from_slice::<B>(slice)?;
        slice = rem;
        let captured_len = slice.read_u32::<B>()? as usize;
        let original_len = slice.read_u32::<B>()?;

        if slice.len() < captured_len {
            return Err(PcapError::IncompleteBuffer(captured_len, slice.len()));
        }

        let data = &slice[..captured_len];
        let pad_len = ((4 - captured_len % 4) % 4).min(slice.len() - captured_len);
        slice = &slice[captured_len + pad_len..];

        let (slice, options) = parse_options::<B, PacketOption>(slice, sink)?;

        let block = PacketBlock {
            interface_id,
            drop_count,
            timestamp,
            original_len,
            data: Cow::Borrowed(data),
            options,
        };

        Ok((slice, block))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let pad_len = (4 - self.data.len() % 4) % 4;

        writer.write_u16::<B>(self.interface_id)?;
        writer.write_u16::<B>(self.drop_count)?;
        self.timestamp.write_to::<B, _>(writer)?;
        writer.write_u32::<B>(self.data.len() as u32)?;
        writer.write_u32::<B>(self.original_len)?;
        writer.write_all(&self.data)?;
        writer.write_all(&[0_u8; 3][..pad_len])?;

        let opt_len = self.options.write_to::<B, _>(writer)?;

        Ok(20 + self.data.len() + pad_len + opt_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::Packet(self)
    }
}

impl Packet for PacketBlock<'_> {
    fn seconds(&self) -> u64 {
        self.timestamp.seconds()
    }

    fn microseconds(&self) -> u64 {
        self.timestamp.microseconds() as u64
    }

    fn nanoseconds(&self) -> u64 {
        self.timestamp.nanoseconds()
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn original_len(&self) -> u32 {
        self.original_len
    }

    fn interface_id(&self) -> Option<u32> {
        Some(self.interface_id as u32)
    }

    fn as_block(&self) -> Option<Block<'_>> {
        let block = PacketBlock { data: Cow::Borrowed(&self.data), options: self.options.clone(), ..*self };
        Some(block.into_block())
    }
}

const FLAGS: u16 = 2;
const HASH: u16 = 3;

/// Options of a [`PacketBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct PacketOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// 32-bit flags word containing link-layer information.
    pub flags: Option<PacketBlockFlags>,

    /// Contains a hash of the packet.
    pub hash: Option<HashBlock<'a>>,
}

impl<'a> OptionSchema<'a> for PacketOption<'a> {
    const NAME: &'static str = "PacketOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            FLAGS => self.flags = Some(opt_u32::<B>(code, value)?.into()),
            HASH => self.hash = Some(HashBlock::from_slice(value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

impl<'a> PacketOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let flags = self.flags.map(|flags| flags.bits());
        let hash = self.hash.as_ref().map(|hash| hash.to_vec());

        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, u32>(writer, FLAGS, flags.as_ref())?;
        len += write_opt::<B, _, [u8]>(writer, HASH, hash.as_deref())?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use byteorder_slice::byteorder::{BigEndian, LittleEndian};

    use super::*;
    use crate::pcapng::blocks::hash::HashAlgorithm;

    #[test]
    fn round_trip() {
        let data = [0xDE_u8, 0xAD, 0xBE, 0xEF, 0x01];
        let block = PacketBlock {
            interface_id: 2,
            drop_count: 7,
            timestamp: Timestamp::new(1_400_000_000, 42).unwrap(),
            original_len: 60,
            data: Cow::Borrowed(&data),
            options: PacketOption {
                comment: Some("legacy".into()),
                flags: Some(PacketBlockFlags(0x1)),
                hash: Some(HashBlock::new(HashAlgorithm::Crc32, &[1, 2, 3, 4])),
            },
        };

        let mut be = Vec::new();
        let len = block.write_to::<BigEndian, _>(&mut be).unwrap();
        assert_eq!(len, be.len());
        assert_eq!(len % 4, 0);

        let (rem, decoded) = PacketBlock::from_slice::<BigEndian>(&be, &mut ErrorSink::raise()).unwrap();
        assert!(rem.is_empty());
        assert_eq!(decoded, block);

        let mut le = Vec::new();
        block.write_to::<LittleEndian, _>(&mut le).unwrap();
        let (_, decoded) = PacketBlock::from_slice::<LittleEndian>(&le, &mut ErrorSink::raise()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.interface_id(), Some(2));
    }

    #[test]
    fn truncated_data() {
        let mut body = vec![0_u8; 20];
        LittleEndian::write_u32(&mut body[12..16], 100);

        let res = PacketBlock::from_slice::<LittleEndian>(&body, &mut ErrorSink::raise());
        assert!(matches!(res, Err(PcapError::IncompleteBuffer(100, 0))));
    }
}
