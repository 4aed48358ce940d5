use std::io::Write;
use std::sync::Mutex;

use byteorder_slice::byteorder::{BigEndian, LittleEndian};
use log::debug;

use super::blocks::enhanced_packet::EnhancedPacketBlock;
use super::blocks::{Block, PcapNgBlock};
use super::HeaderGroup;
use crate::errors::{PcapError, PcapResult};
use crate::packet::Packet;
use crate::reader::lock;
use crate::writer::CaptureWriter;
use crate::Endianness;

/// Writes a PcapNg to a writer.
///
/// Packets are written in the byte order of the last header group and refer to its interfaces.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
///
/// use pcapng_utils::pcapng::{PcapNgReader, PcapNgWriter};
/// use pcapng_utils::{CaptureReader, CaptureWriter};
///
/// let file_in = File::open("test.pcapng").expect("Error opening file");
/// let pcapng_reader = PcapNgReader::new(file_in).unwrap();
///
/// let file_out = File::create("out.pcapng").expect("Error creating file out");
/// let pcapng_writer = PcapNgWriter::with_header_groups(file_out, pcapng_reader.header_groups().to_vec()).unwrap();
///
/// // Copy the packets of test.pcapng
/// while !pcapng_reader.end_of_stream().unwrap() {
///     let packet = pcapng_reader.read().unwrap();
///     pcapng_writer.write_packet(&packet).unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct PcapNgWriter<W: Write> {
    state: Mutex<WriterState<W>>,
}

#[derive(Debug)]
struct WriterState<W> {
    writer: W,
    groups: Vec<HeaderGroup<'static>>,
}

impl<W: Write> PcapNgWriter<W> {
    /// Creates a new `PcapNgWriter` from an existing writer.
    ///
    /// Writes a native Section Header with a single Ethernet interface, see [`HeaderGroup::default`].
    pub fn new(writer: W) -> PcapResult<Self> {
        Self::with_header_groups(writer, vec![HeaderGroup::default()])
    }

    /// Creates a new `PcapNgWriter` and writes every group of `groups`.
    ///
    /// Fails with [`PcapError::MissingSectionHeader`] if `groups` is empty.
    pub fn with_header_groups(mut writer: W, groups: Vec<HeaderGroup<'static>>) -> PcapResult<Self> {
        if groups.is_empty() {
            return Err(PcapError::MissingSectionHeader);
        }

        for group in &groups {
            group.write_to(&mut writer)?;
        }

        debug!("PcapNg writer started with {} header group(s)", groups.len());

        Ok(PcapNgWriter { state: Mutex::new(WriterState { writer, groups }) })
    }

    /// Returns a copy of the header groups written so far
    pub fn header_groups(&self) -> PcapResult<Vec<HeaderGroup<'static>>> {
        Ok(lock(&self.state)?.groups.clone())
    }

    /// Starts a new section with `group`, the following packets refer to its interfaces.
    pub fn write_header_group(&self, group: &HeaderGroup) -> PcapResult<usize> {
        let mut state = lock(&self.state)?;

        let len = group.write_to(&mut state.writer)?;
        state.groups.push(group.clone().into_owned());

        Ok(len)
    }

    /// Writes a `Block`.
    ///
    /// A Section Header opens a new group and an Interface Description is appended to the last one.
    /// Packet and statistics blocks are checked against the interfaces of the last group.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use std::fs::File;
    ///
    /// use pcapng_utils::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
    /// use pcapng_utils::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
    /// use pcapng_utils::pcapng::blocks::PcapNgBlock;
    /// use pcapng_utils::pcapng::PcapNgWriter;
    /// use pcapng_utils::{DataLink, Timestamp};
    ///
    /// let data = [0u8; 10];
    ///
    /// let interface = InterfaceDescriptionBlock::new(DataLink::ETHERNET, 0xFFFF);
    /// let packet = EnhancedPacketBlock::new(1, Timestamp::from_units(0), data.len() as u32, &data);
    ///
    /// let file = File::create("out.pcapng").expect("Error creating file");
    /// let pcapng_writer = PcapNgWriter::new(file).unwrap();
    ///
    /// pcapng_writer.write_block(&interface.into_block()).unwrap();
    /// pcapng_writer.write_block(&packet.into_block()).unwrap();
    /// ```
    pub fn write_block(&self, block: &Block) -> PcapResult<usize> {
        let mut state = lock(&self.state)?;

        let len = match block {
            Block::SectionHeader(section) => {
                let group = HeaderGroup::new(section.clone().into_owned());
                let len = state.commit(block, section.endianness)?;
                state.groups.push(group);
                len
            },
            Block::InterfaceDescription(interface) => {
                let endianness = state.last_group()?.endianness();
                let len = state.commit(block, endianness)?;
                state.last_group_mut()?.interfaces.push(interface.clone().into_owned());
                len
            },
            _ => state.write_checked(block)?,
        };

        Ok(len)
    }
}

impl<W: Write> WriterState<W> {
    fn last_group(&self) -> PcapResult<&HeaderGroup<'static>> {
        self.groups.last().ok_or(PcapError::MissingSectionHeader)
    }

    fn last_group_mut(&mut self) -> PcapResult<&mut HeaderGroup<'static>> {
        self.groups.last_mut().ok_or(PcapError::MissingSectionHeader)
    }

    /// Validates a non-header block against the last group, then writes it.
    fn write_checked(&mut self, block: &Block) -> PcapResult<usize> {
        let group = self.last_group()?;
        let endianness = group.endianness();

        // A Simple Packet belongs to the first interface of the section
        let interface_id = match block {
            Block::EnhancedPacket(epb) => Some(epb.interface_id),
            Block::Packet(pb) => Some(pb.interface_id as u32),
            Block::SimplePacket(_) => Some(0),
            Block::InterfaceStatistics(isb) => Some(isb.interface_id),
            _ => None,
        };

        let snaplen = match interface_id {
            Some(id) => match group.interfaces.get(id as usize) {
                Some(interface) => interface.snaplen,
                None => return Err(PcapError::InvalidInterfaceId(id)),
            },
            None => 0,
        };

        let out = encode(block, endianness)?;

        if block.block_type().is_packet() && snaplen != 0 && out.len() > snaplen as usize {
            return Err(PcapError::PacketTooLong { len: out.len(), snaplen });
        }

        self.writer.write_all(&out).map_err(PcapError::WriteFailed)?;

        Ok(out.len())
    }

    fn commit(&mut self, block: &Block, endianness: Endianness) -> PcapResult<usize> {
        let out = encode(block, endianness)?;
        self.writer.write_all(&out).map_err(PcapError::WriteFailed)?;

        Ok(out.len())
    }
}

/// Encodes the whole block in memory so that a failed write never leaves half a block.
fn encode(block: &Block, endianness: Endianness) -> PcapResult<Vec<u8>> {
    let mut out = Vec::new();

    match endianness {
        Endianness::Big => block.write_to::<BigEndian, _>(&mut out)?,
        Endianness::Little => block.write_to::<LittleEndian, _>(&mut out)?,
    };

    Ok(out)
}

impl<W: Write> CaptureWriter for PcapNgWriter<W> {
    type Sink = W;

    /// Writes a packet block.
    ///
    /// Packets which aren't PcapNg blocks are converted to an [`EnhancedPacketBlock`] on interface 0.
    ///
    /// # Errors
    /// - [`PcapError::InvalidInterfaceId`] if the last header group has no such interface
    /// - [`PcapError::PacketTooLong`] if the block is longer than the nonzero snaplen of its interface
    fn write_packet(&self, packet: &dyn Packet) -> PcapResult<usize> {
        let block = match packet.as_block() {
            Some(block) => block,
            None => EnhancedPacketBlock::from_packet(packet, 0)?.into_block(),
        };

        lock(&self.state)?.write_checked(&block)
    }

    fn flush(&self) -> PcapResult<()> {
        lock(&self.state)?.writer.flush().map_err(PcapError::WriteFailed)
    }

    fn close(self) -> PcapResult<W> {
        let mut state = self.state.into_inner().map_err(|_| PcapError::LockPoisoned)?;
        state.writer.flush().map_err(PcapError::WriteFailed)?;

        Ok(state.writer)
    }
}
