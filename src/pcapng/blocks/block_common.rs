use std::borrow::Cow;
use std::io::{Read, Result as IoResult, Write};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;
use log::warn;

use super::enhanced_packet::EnhancedPacketBlock;
use super::interface_description::InterfaceDescriptionBlock;
use super::interface_statistics::InterfaceStatisticsBlock;
use super::name_resolution::NameResolutionBlock;
use super::packet::PacketBlock;
use super::section_header::{SectionHeaderBlock, BYTE_ORDER_MAGIC};
use super::simple_packet::SimplePacketBlock;
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::{Endianness, ReverseByteOrder};

/// Section Header Block type code
pub const SECTION_HEADER_BLOCK: u32 = 0x0A0D0D0A;
/// Interface Description Block type code
pub const INTERFACE_DESCRIPTION_BLOCK: u32 = 0x00000001;
/// Packet Block type code
pub const PACKET_BLOCK: u32 = 0x00000002;
/// Simple Packet Block type code
pub const SIMPLE_PACKET_BLOCK: u32 = 0x00000003;
/// Name Resolution Block type code
pub const NAME_RESOLUTION_BLOCK: u32 = 0x00000004;
/// Interface Statistics Block type code
pub const INTERFACE_STATISTIC_BLOCK: u32 = 0x00000005;
/// Enhanced Packet Block type code
pub const ENHANCED_PACKET_BLOCK: u32 = 0x00000006;

/// Type of a known PcapNg block
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BlockType {
    SectionHeader,
    InterfaceDescription,
    Packet,
    SimplePacket,
    NameResolution,
    InterfaceStatistics,
    EnhancedPacket,
}

impl BlockType {
    /// On-disk type code
    pub fn code(self) -> u32 {
        match self {
            BlockType::SectionHeader => SECTION_HEADER_BLOCK,
            BlockType::InterfaceDescription => INTERFACE_DESCRIPTION_BLOCK,
            BlockType::Packet => PACKET_BLOCK,
            BlockType::SimplePacket => SIMPLE_PACKET_BLOCK,
            BlockType::NameResolution => NAME_RESOLUTION_BLOCK,
            BlockType::InterfaceStatistics => INTERFACE_STATISTIC_BLOCK,
            BlockType::EnhancedPacket => ENHANCED_PACKET_BLOCK,
        }
    }

    /// True for the blocks carrying a packet
    pub fn is_packet(self) -> bool {
        matches!(self, BlockType::Packet | BlockType::SimplePacket | BlockType::EnhancedPacket)
    }
}

impl TryFrom<u32> for BlockType {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            SECTION_HEADER_BLOCK => Ok(BlockType::SectionHeader),
            INTERFACE_DESCRIPTION_BLOCK => Ok(BlockType::InterfaceDescription),
            PACKET_BLOCK => Ok(BlockType::Packet),
            SIMPLE_PACKET_BLOCK => Ok(BlockType::SimplePacket),
            NAME_RESOLUTION_BLOCK => Ok(BlockType::NameResolution),
            INTERFACE_STATISTIC_BLOCK => Ok(BlockType::InterfaceStatistics),
            ENHANCED_PACKET_BLOCK => Ok(BlockType::EnhancedPacket),
            _ => Err(code),
        }
    }
}

//   0               1               2               3
//   0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                          Block Type                           |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                      Block Total Length                       |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  /                          Block Body                           /
//  /          /* variable length, aligned to 32 bits */            /
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                      Block Total Length                       |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// PcapNg block with an undecoded body
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct RawBlock<'a> {
    /// Type field
    pub type_: u32,
    /// Initial length field
    pub initial_len: u32,
    /// Body of the block, padding included
    pub body: Cow<'a, [u8]>,
    /// Trailer length field
    pub trailer_len: u32,
}

impl<'a> RawBlock<'a> {
    /// Create a "borrowed" `RawBlock` from a slice.
    ///
    /// The length fields of a Section Header are read in the byte order given by its magic, `B` is used for every other block.
    pub fn from_slice<B: ByteOrder>(mut slice: &'a [u8]) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 12 {
            return Err(PcapError::IncompleteBuffer(12, slice.len()));
        }

        let type_ = slice.read_u32::<B>()?;
        let len_bytes = [slice[0], slice[1], slice[2], slice[3]];
        slice = &slice[4..];

        let endianness = block_endianness::<B>(type_, slice)?;
        let initial_len = read_len(len_bytes, endianness);
        let body_len = body_len(initial_len)?;

        //Check if there is enough data for the body and the trailer_len
        if slice.len() < body_len + 4 {
            return Err(PcapError::IncompleteBuffer(body_len + 4, slice.len()));
        }

        let body = &slice[..body_len];
        let rem = &slice[body_len..];
        let trailer_len = read_len([rem[0], rem[1], rem[2], rem[3]], endianness);

        if initial_len != trailer_len {
            return Err(PcapError::BlockLengthMismatch(initial_len, trailer_len));
        }

        let block = RawBlock { type_, initial_len, body: Cow::Borrowed(body), trailer_len };

        Ok((&rem[4..], block))
    }
}

impl RawBlock<'static> {
    /// Reads an owned `RawBlock` from a reader.
    ///
    /// A stream ending inside the block gives [`PcapError::UnexpectedEndOfStream`].
    pub fn from_reader<R: Read, B: ByteOrder>(reader: &mut R) -> PcapResult<Self> {
        let mut head = [0_u8; 8];
        reader.read_exact(&mut head)?;

        let type_ = B::read_u32(&head[..4]);
        let len_bytes = [head[4], head[5], head[6], head[7]];

        // The magic of a Section Header gives the byte order of the lengths
        let mut magic = [0_u8; 4];
        let endianness = if type_ == SECTION_HEADER_BLOCK {
            reader.read_exact(&mut magic)?;
            block_endianness::<B>(type_, &magic)?
        }
        else {
            endianness_of::<B>()
        };

        let initial_len = read_len(len_bytes, endianness);
        let body_len = body_len(initial_len)?;

        let mut body = Vec::new();
        if type_ == SECTION_HEADER_BLOCK {
            if body_len < 4 {
                return Err(PcapError::InvalidField("SectionHeaderBlock: initial_len < 16"));
            }
            body.extend_from_slice(&magic);
        }

        // Grows with the data actually read, a bogus length can't trigger a huge allocation
        let wanted = (body_len + 4 - body.len()) as u64;
        Read::take(&mut *reader, wanted).read_to_end(&mut body)?;
        if body.len() < body_len + 4 {
            return Err(PcapError::UnexpectedEndOfStream);
        }

        let trailer = body.split_off(body_len);
        let trailer_len = read_len([trailer[0], trailer[1], trailer[2], trailer[3]], endianness);

        if initial_len != trailer_len {
            return Err(PcapError::BlockLengthMismatch(initial_len, trailer_len));
        }

        Ok(RawBlock { type_, initial_len, body: Cow::Owned(body), trailer_len })
    }
}

impl RawBlock<'_> {
    /// Byte order of the section opened by this block, `None` if it isn't a valid Section Header.
    pub fn section_endianness(&self) -> Option<Endianness> {
        if self.type_ != SECTION_HEADER_BLOCK || self.body.len() < 4 {
            return None;
        }

        match BigEndian::read_u32(&self.body[..4]) {
            BYTE_ORDER_MAGIC => Some(Endianness::Big),
            magic if magic.swap_bytes() == BYTE_ORDER_MAGIC => Some(Endianness::Little),
            _ => None,
        }
    }
}

fn endianness_of<B: ByteOrder>() -> Endianness {
    if B::read_u16(&[0, 1]) == 1 {
        Endianness::Big
    }
    else {
        Endianness::Little
    }
}

/// Byte order of the length fields of a block whose body starts with `body`.
fn block_endianness<B: ByteOrder>(type_: u32, body: &[u8]) -> PcapResult<Endianness> {
    if type_ != SECTION_HEADER_BLOCK {
        return Ok(endianness_of::<B>());
    }

    if body.len() < 4 {
        return Err(PcapError::IncompleteBuffer(4, body.len()));
    }

    match BigEndian::read_u32(&body[..4]) {
        0x1A2B3C4D => Ok(Endianness::Big),
        0x4D3C2B1A => Ok(Endianness::Little),
        magic => Err(PcapError::InvalidMagicNumber(magic)),
    }
}

fn read_len(bytes: [u8; 4], endianness: Endianness) -> u32 {
    u32::from_be_bytes(bytes).reverse_byte_order(endianness.is_little())
}

/// Length of the padded body of a block of `total_len` bytes.
///
/// A total length which isn't a multiple of 4 is rounded up.
fn body_len(total_len: u32) -> PcapResult<usize> {
    if total_len < 12 {
        return Err(PcapError::InvalidField("Block: initial_len < 12"));
    }

    let padded = (total_len as usize + 3) & !3;

    Ok(padded - 12)
}

/// PcapNg parsed blocks
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub enum Block<'a> {
    /// Section Header block
    SectionHeader(SectionHeaderBlock<'a>),
    /// Interface Description block
    InterfaceDescription(InterfaceDescriptionBlock<'a>),
    /// Packet block
    Packet(PacketBlock<'a>),
    /// Simple packet block
    SimplePacket(SimplePacketBlock<'a>),
    /// Name Resolution block
    NameResolution(NameResolutionBlock<'a>),
    /// Interface statistics block
    InterfaceStatistics(InterfaceStatisticsBlock<'a>),
    /// Enhanced packet block
    EnhancedPacket(EnhancedPacketBlock<'a>),
}

impl<'a> Block<'a> {
    /// Create a `Block` from a slice, faults on options are returned as errors.
    ///
    /// The block is `None` if its type is unknown, the remaining slice is still past it.
    pub fn from_slice<B: ByteOrder>(slice: &'a [u8]) -> PcapResult<(&'a [u8], Option<Self>)> {
        Self::from_slice_with::<B>(slice, &mut ErrorSink::raise())
    }

    /// Create a `Block` from a slice, faults on options are handed to `sink`.
    pub fn from_slice_with<B: ByteOrder>(slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Option<Self>)> {
        let (rem, raw_block) = RawBlock::from_slice::<B>(slice)?;

        // The body always starts after the type and length fields
        let body = &slice[8..8 + raw_block.body.len()];
        let block = Self::from_body::<B>(raw_block.type_, body, sink)?;

        Ok((rem, block))
    }

    /// Decodes the body of a [`RawBlock`].
    pub fn from_raw<B: ByteOrder>(raw_block: &'a RawBlock<'_>, sink: &mut ErrorSink) -> PcapResult<Option<Self>> {
        Self::from_body::<B>(raw_block.type_, &raw_block.body, sink)
    }

    fn from_body<B: ByteOrder>(type_: u32, body: &'a [u8], sink: &mut ErrorSink) -> PcapResult<Option<Self>> {
        let Ok(block_type) = BlockType::try_from(type_)
        else {
            warn!("Skipping block of unknown type {type_:#010X}");
            return Ok(None);
        };

        let block = match block_type {
            BlockType::SectionHeader => SectionHeaderBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::InterfaceDescription => InterfaceDescriptionBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::Packet => PacketBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::SimplePacket => SimplePacketBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::NameResolution => NameResolutionBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::InterfaceStatistics => InterfaceStatisticsBlock::from_slice::<B>(body, sink)?.1.into_block(),
            BlockType::EnhancedPacket => EnhancedPacketBlock::from_slice::<B>(body, sink)?.1.into_block(),
        };

        Ok(Some(block))
    }

    /// Writes the `Block` to a writer, framing included.
    ///
    /// Returns the total length of the block.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        return match self {
            Self::SectionHeader(b) => inner_write_to::<B, _, W>(b, SECTION_HEADER_BLOCK, writer),
            Self::InterfaceDescription(b) => inner_write_to::<B, _, W>(b, INTERFACE_DESCRIPTION_BLOCK, writer),
            Self::Packet(b) => inner_write_to::<B, _, W>(b, PACKET_BLOCK, writer),
            Self::SimplePacket(b) => inner_write_to::<B, _, W>(b, SIMPLE_PACKET_BLOCK, writer),
            Self::NameResolution(b) => inner_write_to::<B, _, W>(b, NAME_RESOLUTION_BLOCK, writer),
            Self::InterfaceStatistics(b) => inner_write_to::<B, _, W>(b, INTERFACE_STATISTIC_BLOCK, writer),
            Self::EnhancedPacket(b) => inner_write_to::<B, _, W>(b, ENHANCED_PACKET_BLOCK, writer),
        };

        fn inner_write_to<'a, B: ByteOrder, BL: PcapNgBlock<'a>, W: Write>(block: &BL, block_code: u32, writer: &mut W) -> IoResult<usize> {
            let data_len = block.write_to::<B, _>(&mut std::io::sink())?;
            let pad_len = (4 - (data_len % 4)) % 4;

            let block_len = data_len + pad_len + 12;

            writer.write_u32::<B>(block_code)?;
            writer.write_u32::<B>(block_len as u32)?;
            block.write_to::<B, _>(writer)?;
            writer.write_all(&[0_u8; 3][..pad_len])?;
            writer.write_u32::<B>(block_len as u32)?;

            Ok(block_len)
        }
    }

    /// Returns the type of the block
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::SectionHeader(_) => BlockType::SectionHeader,
            Self::InterfaceDescription(_) => BlockType::InterfaceDescription,
            Self::Packet(_) => BlockType::Packet,
            Self::SimplePacket(_) => BlockType::SimplePacket,
            Self::NameResolution(_) => BlockType::NameResolution,
            Self::InterfaceStatistics(_) => BlockType::InterfaceStatistics,
            Self::EnhancedPacket(_) => BlockType::EnhancedPacket,
        }
    }

    /// Downcast the current block into an [`EnhancedPacketBlock`], if possible
    pub fn into_enhanced_packet(self) -> Option<EnhancedPacketBlock<'a>> {
        match self {
            Block::EnhancedPacket(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into an [`InterfaceDescriptionBlock`], if possible
    pub fn into_interface_description(self) -> Option<InterfaceDescriptionBlock<'a>> {
        match self {
            Block::InterfaceDescription(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into an [`InterfaceStatisticsBlock`], if possible
    pub fn into_interface_statistics(self) -> Option<InterfaceStatisticsBlock<'a>> {
        match self {
            Block::InterfaceStatistics(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into a [`NameResolutionBlock`], if possible
    pub fn into_name_resolution(self) -> Option<NameResolutionBlock<'a>> {
        match self {
            Block::NameResolution(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into a [`PacketBlock`], if possible
    pub fn into_packet(self) -> Option<PacketBlock<'a>> {
        match self {
            Block::Packet(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into a [`SectionHeaderBlock`], if possible
    pub fn into_section_header(self) -> Option<SectionHeaderBlock<'a>> {
        match self {
            Block::SectionHeader(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast the current block into a [`SimplePacketBlock`], if possible
    pub fn into_simple_packet(self) -> Option<SimplePacketBlock<'a>> {
        match self {
            Block::SimplePacket(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_enhanced_packet(&self) -> Option<&EnhancedPacketBlock<'a>> {
        match self {
            Block::EnhancedPacket(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_interface_description(&self) -> Option<&InterfaceDescriptionBlock<'a>> {
        match self {
            Block::InterfaceDescription(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_section_header(&self) -> Option<&SectionHeaderBlock<'a>> {
        match self {
            Block::SectionHeader(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_interface_statistics(&self) -> Option<&InterfaceStatisticsBlock<'a>> {
        match self {
            Block::InterfaceStatistics(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_name_resolution(&self) -> Option<&NameResolutionBlock<'a>> {
        match self {
            Block::NameResolution(a) => Some(a),
            _ => None,
        }
    }
}

/// Common interface for the PcapNg blocks
pub trait PcapNgBlock<'a> {
    /// Parse a new block from its body.
    ///
    /// Faults on single options are handed to `sink`.
    fn from_slice<B: ByteOrder>(slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)>
    where
        Self: std::marker::Sized;

    /// Write the body of a block into a writer, padding of the packet data included.
    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize>;

    /// Convert a block into the [`Block`] enumeration
    fn into_block(self) -> Block<'a>;
}
