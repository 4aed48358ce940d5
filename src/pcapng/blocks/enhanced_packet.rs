//! Enhanced Packet Block (EPB).

use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use super::hash::HashBlock;
use super::opt_common::{opt_str, opt_u32, opt_u64, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT};
use super::packet_flags::PacketBlockFlags;
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::Packet;
use crate::timestamp::Timestamp;

//   0                   1                   2                   3
//   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//  +---------------------------------------------------------------+
//  |                         Interface ID                          |
//  +---------------------------------------------------------------+
//  |                        Timestamp (High)                       |
//  +---------------------------------------------------------------+
//  |                        Timestamp (Low)                        |
//  +---------------------------------------------------------------+
//  |                    Captured Packet Length                     |
//  +---------------------------------------------------------------+
//  |                    Original Packet Length                     |
//  +---------------------------------------------------------------+
//  /                                                               /
//  /                          Packet Data                          /
//  /              variable length, padded to 32 bits               /
//  /                                                               /
//  +---------------------------------------------------------------+
//  /                                                               /
//  /                      Options (variable)                       /
//  /                                                               /
//  +---------------------------------------------------------------+
/// An Enhanced Packet Block (EPB) is the standard container for storing the packets coming from the network.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct EnhancedPacketBlock<'a> {
    /// It specifies the interface this packet comes from.
    ///
    /// The correct interface will be the one whose Interface Description Block
    /// (within the current Section of the file) is identified by the same number of this field.
    pub interface_id: u32,

    /// Time elapsed since 1970-01-01 00:00:00 UTC.
    pub timestamp: Timestamp,

    /// Actual length of the packet when it was transmitted on the network.
    pub original_len: u32,

    /// The data coming from the network, including link-layer headers.
    ///
    /// Its length is the captured length of the packet.
    pub data: Cow<'a, [u8]>,

    /// Options
    pub options: EnhancedPacketOption<'a>,
}

impl<'a> EnhancedPacketBlock<'a> {
    /// Creates a new borrowed `EnhancedPacketBlock` without options.
    pub fn new(interface_id: u32, timestamp: Timestamp, original_len: u32, data: &'a [u8]) -> Self {
        EnhancedPacketBlock {
            interface_id,
            timestamp,
            original_len,
            data: Cow::Borrowed(data),
            options: EnhancedPacketOption::default(),
        }
    }

    /// Creates an `EnhancedPacketBlock` from any packet, borrowing its data.
    pub fn from_packet<P: Packet + ?Sized>(packet: &'a P, interface_id: u32) -> PcapResult<Self> {
        let timestamp = Timestamp::new(packet.seconds(), packet.microseconds() as u32)?;

        Ok(Self::new(interface_id, timestamp, packet.original_len(), packet.data()))
    }

    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for EnhancedPacketBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 20 {
            return Err(PcapError::IncompleteBuffer(20, slice.len()));
        }

        let interface_id = slice.read_u32::<B>()?;
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

        let (slice, options) = parse_options::<B, EnhancedPacketOption>(slice, sink)?;

        let block = EnhancedPacketBlock { interface_id, timestamp, original_len, data: Cow::Borrowed(data), options };

        Ok((slice, block))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let pad_len = (4 - self.data.len() % 4) % 4;

        writer.write_u32::<B>(self.interface_id)?;
        self.timestamp.write_to::<B, _>(writer)?;
        writer.write_u32::<B>(self.data.len() as u32)?;
        writer.write_u32::<B>(self.original_len)?;
        writer.write_all(&self.data)?;
        writer.write_all(&[0_u8; 3][..pad_len])?;

        let opt_len = self.options.write_to::<B, _>(writer)?;

        Ok(20 + self.data.len() + pad_len + opt_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::EnhancedPacket(self)
    }
}

impl Packet for EnhancedPacketBlock<'_> {
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
        Some(self.interface_id)
    }

    fn as_block(&self) -> Option<Block<'_>> {
        let block = EnhancedPacketBlock { data: Cow::Borrowed(&self.data), options: self.options.clone(), ..*self };
        Some(block.into_block())
    }
}

const FLAGS: u16 = 2;
const HASH: u16 = 3;
const DROP_COUNT: u16 = 4;

/// Options of an [`EnhancedPacketBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct EnhancedPacketOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// 32-bit flags word containing link-layer information.
    pub flags: Option<PacketBlockFlags>,

    /// Contains a hash of the packet.
    pub hash: Option<HashBlock<'a>>,

    /// 64-bit integer value specifying the number of packets lost
    /// (by the interface and the operating system) between this packet and the preceding one for
    /// the same interface or, for the first packet for an interface, between this packet
    /// and the start of the capture process.
    pub drop_count: Option<u64>,
}

impl<'a> OptionSchema<'a> for EnhancedPacketOption<'a> {
    const NAME: &'static str = "EnhancedPacketOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            FLAGS => self.flags = Some(opt_u32::<B>(code, value)?.into()),
            HASH => self.hash = Some(HashBlock::from_slice(value)?),
            DROP_COUNT => self.drop_count = Some(opt_u64::<B>(code, value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

impl<'a> EnhancedPacketOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let flags = self.flags.map(|flags| flags.bits());
        let hash = self.hash.as_ref().map(|hash| hash.to_vec());

        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, u32>(writer, FLAGS, flags.as_ref())?;
        len += write_opt::<B, _, [u8]>(writer, HASH, hash.as_deref())?;
        len += write_opt::<B, _, u64>(writer, DROP_COUNT, self.drop_count.as_ref())?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}
