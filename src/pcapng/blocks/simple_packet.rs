use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::Packet;

/// The Simple Packet Block (SPB) is a lightweight container for storing the packets coming from the network.
/// Its presence is optional.
///
/// It carries no timestamp, no interface id and no options.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct SimplePacketBlock<'a> {
    /// Actual length of the packet when it was transmitted on the network.
    pub original_len: u32,

    /// The data coming from the network, including link-layer headers.
    pub data: Cow<'a, [u8]>,
}

impl<'a> PcapNgBlock<'a> for SimplePacketBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], _sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 4 {
            return Err(PcapError::IncompleteBuffer(4, slice.len()));
        }

        let original_len = slice.read_u32::<B>()?;

        // The captured length is implied: whatever fits in the body, up to the original length
        let captured_len = (original_len as usize).min(slice.len());
        let data = &slice[..captured_len];

        let pad_len = ((4 - captured_len % 4) % 4).min(slice.len() - captured_len);
        let rem = &slice[captured_len + pad_len..];

        let packet = SimplePacketBlock { original_len, data: Cow::Borrowed(data) };

        Ok((rem, packet))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let pad_len = (4 - self.data.len() % 4) % 4;

        writer.write_u32::<B>(self.original_len)?;
        writer.write_all(&self.data)?;
        writer.write_all(&[0_u8; 3][..pad_len])?;

        Ok(4 + self.data.len() + pad_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::SimplePacket(self)
    }
}

impl Packet for SimplePacketBlock<'_> {
    fn seconds(&self) -> u64 {
        0
    }

    fn microseconds(&self) -> u64 {
        0
    }

    fn nanoseconds(&self) -> u64 {
        0
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn original_len(&self) -> u32 {
        self.original_len
    }

    fn as_block(&self) -> Option<Block<'_>> {
        let block = SimplePacketBlock { original_len: self.original_len, data: Cow::Borrowed(&self.data) };
        Some(block.into_block())
    }
}
