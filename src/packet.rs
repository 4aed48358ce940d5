//! Uniform read-only view over the packets of both formats.

use std::borrow::Cow;

use derive_into_owned::IntoOwned;

use crate::errors::{PcapError, PcapResult};
use crate::pcap::PcapPacket;
use crate::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use crate::pcapng::blocks::Block;
use crate::pcapng::blocks::packet::PacketBlock;
use crate::pcapng::blocks::simple_packet::SimplePacketBlock;

/// Common view of a captured packet, whatever its on-disk form.
pub trait Packet {
    /// Whole seconds of the timestamp
    fn seconds(&self) -> u64;

    /// Sub-second part of the timestamp, in microseconds
    fn microseconds(&self) -> u64;

    /// Sub-second part of the timestamp, in nanoseconds
    fn nanoseconds(&self) -> u64;

    /// Captured bytes
    fn data(&self) -> &[u8];

    /// Length of the packet on the wire
    fn original_len(&self) -> u32 {
        self.data().len() as u32
    }

    /// Interface the packet was captured on, PcapNg only
    fn interface_id(&self) -> Option<u32> {
        None
    }

    /// Offset of the packet in its stream, if it was read from one
    fn position(&self) -> Option<u64> {
        None
    }

    /// The packet as a PcapNg block borrowing its data, `None` if it isn't one
    fn as_block(&self) -> Option<Block<'_>> {
        None
    }
}

/// On-disk form of a [`CapturedPacket`]
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub enum PacketKind<'a> {
    /// Classic pcap record
    Pcap(PcapPacket<'a>),
    /// Enhanced Packet Block
    Enhanced(EnhancedPacketBlock<'a>),
    /// Obsolete Packet Block
    Legacy(PacketBlock<'a>),
    /// Simple Packet Block
    Simple(SimplePacketBlock<'a>),
}

/// A packet returned by a reader, tagged with the offset it was read at.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct CapturedPacket<'a> {
    /// Stream offset of the record or block, `None` for packets built in memory
    pub position: Option<u64>,
    /// Decoded packet
    pub kind: PacketKind<'a>,
}

impl<'a> CapturedPacket<'a> {
    /// Creates a `CapturedPacket` read at `position`.
    pub fn new(position: Option<u64>, kind: PacketKind<'a>) -> Self {
        CapturedPacket { position, kind }
    }

    /// Attaches a comment to the packet.
    ///
    /// Fails with [`PcapError::Unsupported`] for the forms without options (classic pcap records and simple packets).
    pub fn with_comment(self, comment: impl Into<Cow<'a, str>>) -> PcapResult<Self> {
        let kind = match self.kind {
            PacketKind::Enhanced(epb) => PacketKind::Enhanced(epb.with_comment(comment)),
            PacketKind::Legacy(pb) => PacketKind::Legacy(pb.with_comment(comment)),
            PacketKind::Pcap(_) => return Err(PcapError::Unsupported("comment on a classic pcap packet")),
            PacketKind::Simple(_) => return Err(PcapError::Unsupported("comment on a simple packet block")),
        };

        Ok(CapturedPacket { kind, ..self })
    }

    /// Converts the packet into an [`EnhancedPacketBlock`] on `interface_id`.
    ///
    /// Enhanced packets keep their options, the other forms get none.
    pub fn into_enhanced_packet(self, interface_id: u32) -> PcapResult<EnhancedPacketBlock<'static>> {
        if let PacketKind::Enhanced(mut epb) = self.kind {
            epb.interface_id = interface_id;
            return Ok(epb.into_owned());
        }

        let epb = EnhancedPacketBlock::from_packet(self.inner(), interface_id)?.into_owned();
        Ok(epb)
    }

    fn inner(&self) -> &dyn Packet {
        match &self.kind {
            PacketKind::Pcap(p) => p,
            PacketKind::Enhanced(p) => p,
            PacketKind::Legacy(p) => p,
            PacketKind::Simple(p) => p,
        }
    }
}

impl Packet for CapturedPacket<'_> {
    fn seconds(&self) -> u64 {
        self.inner().seconds()
    }

    fn microseconds(&self) -> u64 {
        self.inner().microseconds()
    }

    fn nanoseconds(&self) -> u64 {
        self.inner().nanoseconds()
    }

    fn data(&self) -> &[u8] {
        self.inner().data()
    }

    fn original_len(&self) -> u32 {
        self.inner().original_len()
    }

    fn interface_id(&self) -> Option<u32> {
        self.inner().interface_id()
    }

    fn position(&self) -> Option<u64> {
        self.position
    }

    fn as_block(&self) -> Option<Block<'_>> {
        self.inner().as_block()
    }
}
