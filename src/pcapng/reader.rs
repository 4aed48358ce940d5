use std::io::{Read, Seek, SeekFrom};
use std::sync::Mutex;

use byteorder_slice::byteorder::{BigEndian, LittleEndian};
use log::{debug, trace};

use super::blocks::{Block, RawBlock, INTERFACE_DESCRIPTION_BLOCK, SECTION_HEADER_BLOCK};
use super::HeaderGroup;
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::{CapturedPacket, PacketKind};
use crate::reader::{lock, stream_len, CaptureReader};
use crate::Endianness;

/// Reads a PcapNg from a seekable stream.
///
/// The header groups (each Section Header with its Interface Descriptions) are read on creation,
/// [`CaptureReader::read`] then returns one packet block at a time.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
///
/// use pcapng_utils::pcapng::PcapNgReader;
/// use pcapng_utils::CaptureReader;
///
/// let file_in = File::open("test.pcapng").expect("Error opening file");
/// let pcapng_reader = PcapNgReader::new(file_in).unwrap();
///
/// // Read test.pcapng
/// while !pcapng_reader.end_of_stream().unwrap() {
///     //Check if there is no error
///     let packet = pcapng_reader.read().unwrap();
///
///     //Do something
/// }
/// ```
#[derive(Debug)]
pub struct PcapNgReader<R: Read + Seek> {
    header_groups: Vec<HeaderGroup<'static>>,
    data_start: u64,
    state: Mutex<ReaderState<R>>,
}

#[derive(Debug)]
struct ReaderState<R> {
    stream: R,
    /// Byte order of the current section
    endianness: Endianness,
    /// Offset and byte order of every Section Header seen so far, by offset
    sections: Vec<(u64, Endianness)>,
}

impl<R> ReaderState<R> {
    fn enter_section(&mut self, position: u64, endianness: Endianness) {
        self.endianness = endianness;
        if self.sections.last().map_or(true, |&(last, _)| position > last) {
            self.sections.push((position, endianness));
        }
    }

    /// Byte order of the section containing `position`
    fn section_at(&self, position: u64) -> Endianness {
        self.sections
            .iter()
            .rev()
            .find(|&&(start, _)| start <= position)
            .map_or(self.endianness, |&(_, endianness)| endianness)
    }
}

impl<R: Read + Seek> PcapNgReader<R> {
    /// Creates a new [`PcapNgReader`] from a seekable stream.
    ///
    /// Parses the leading Section Header and Interface Description blocks,
    /// then stops before the first block of another type.
    ///
    /// # Errors
    /// - [`PcapError::MissingSectionHeader`] if the stream doesn't start with a Section Header
    /// - [`PcapError::OrphanInterfaceDescription`] if it starts with an Interface Description
    /// - [`PcapError::MissingInterfaceDescription`] if no section has any interface
    pub fn new(mut stream: R) -> PcapResult<PcapNgReader<R>> {
        let len = stream_len(&mut stream)?;
        let start = stream.stream_position()?;

        if len.saturating_sub(start) < 4 {
            return Err(PcapError::MissingSectionHeader);
        }

        let mut type_ = [0_u8; 4];
        stream.read_exact(&mut type_)?;
        stream.seek(SeekFrom::Start(start))?;

        match u32::from_be_bytes(type_) {
            SECTION_HEADER_BLOCK => {},
            code if code == INTERFACE_DESCRIPTION_BLOCK || code.swap_bytes() == INTERFACE_DESCRIPTION_BLOCK => {
                return Err(PcapError::OrphanInterfaceDescription)
            },
            _ => return Err(PcapError::MissingSectionHeader),
        }

        let mut groups: Vec<HeaderGroup<'static>> = Vec::new();
        let mut sections = Vec::new();
        let mut endianness = Endianness::Big;

        loop {
            let position = stream.stream_position()?;
            if position >= len {
                break;
            }

            let raw = read_raw(&mut stream, endianness)?;
            if let Some(section_endianness) = raw.section_endianness() {
                endianness = section_endianness;
                sections.push((position, endianness));
            }

            match parse_raw(&raw, endianness, &mut ErrorSink::raise())? {
                Some(Block::SectionHeader(section)) => groups.push(HeaderGroup::new(section.into_owned())),
                Some(Block::InterfaceDescription(interface)) => match groups.last_mut() {
                    Some(group) => group.interfaces.push(interface.into_owned()),
                    None => return Err(PcapError::OrphanInterfaceDescription),
                },
                _ => {
                    stream.seek(SeekFrom::Start(position))?;
                    break;
                },
            }
        }

        groups.retain(|group| {
            if group.interfaces.is_empty() {
                debug!("Dropping a section without interface description");
            }
            !group.interfaces.is_empty()
        });

        if groups.is_empty() {
            return Err(PcapError::MissingInterfaceDescription);
        }

        let data_start = stream.stream_position()?;
        debug!("PcapNg reader started with {} header group(s), data at {data_start}", groups.len());

        let state = ReaderState { stream, endianness, sections };

        Ok(PcapNgReader { header_groups: groups, data_start, state: Mutex::new(state) })
    }

    /// Returns the header groups read on creation
    pub fn header_groups(&self) -> &[HeaderGroup<'static>] {
        &self.header_groups
    }

    /// Returns the next known block, whatever its type.
    ///
    /// Unknown blocks are skipped. A Section Header switches the byte order of the following blocks.
    /// A stream ending inside a block gives [`PcapError::UnexpectedEndOfStream`] and leaves the position at the start of that block.
    pub fn read_block(&self) -> PcapResult<(u64, Block<'static>)> {
        self.read_block_with(&mut ErrorSink::raise())
    }

    /// Same as [`PcapNgReader::read_block`], with the faults on single options and records handed to `sink`.
    ///
    /// A reporting `sink` gets the faults once the stream is unlocked.
    pub fn read_block_with(&self, sink: &mut ErrorSink) -> PcapResult<(u64, Block<'static>)> {
        if !sink.is_reporting() {
            return self.next_block(&mut ErrorSink::raise());
        }

        let mut faults: Vec<PcapError> = Vec::new();
        let mut collect = |err: PcapError| faults.push(err);
        let res = self.next_block(&mut ErrorSink::report(&mut collect));

        for fault in faults {
            sink.fault(fault)?;
        }

        res
    }

    fn next_block(&self, sink: &mut ErrorSink) -> PcapResult<(u64, Block<'static>)> {
        let mut guard = lock(&self.state)?;
        let state = &mut *guard;
        let len = stream_len(&mut state.stream)?;

        loop {
            let position = state.stream.stream_position()?;
            if position >= len {
                return Err(PcapError::UnexpectedEndOfStream);
            }

            let raw = match read_raw(&mut state.stream, state.endianness) {
                Ok(raw) => raw,
                Err(err) => {
                    state.stream.seek(SeekFrom::Start(position))?;
                    return Err(err);
                },
            };

            if let Some(endianness) = raw.section_endianness() {
                state.enter_section(position, endianness);
            }

            if let Some(block) = parse_raw(&raw, state.endianness, sink)? {
                trace!("Read {:?} block at {position}", block.block_type());
                return Ok((position, block.into_owned()));
            }
        }
    }
}

impl<R: Read + Seek> CaptureReader for PcapNgReader<R> {
    type Stream = R;

    /// Fails with [`PcapError::NotAPacket`] on a block which doesn't carry a packet, the block is consumed.
    fn read(&self) -> PcapResult<CapturedPacket<'static>> {
        let (position, block) = self.read_block()?;
        into_packet(position, block).map_err(|other| PcapError::NotAPacket(other.block_type().code()))
    }

    /// Non-packet blocks are consumed and give `Ok(None)`.
    fn read_with(&self, sink: &mut ErrorSink) -> PcapResult<Option<CapturedPacket<'static>>> {
        let (position, block) = self.read_block_with(sink)?;
        Ok(into_packet(position, block).ok())
    }

    /// The byte order is set back to the one of the section containing `position`.
    fn seek(&self, position: u64) -> PcapResult<()> {
        let mut state = lock(&self.state)?;

        state.stream.seek(SeekFrom::Start(position))?;
        let endianness = state.section_at(position);
        state.endianness = endianness;

        Ok(())
    }

    fn rewind(&self) -> PcapResult<()> {
        self.seek(self.data_start)
    }

    fn position(&self) -> PcapResult<u64> {
        Ok(lock(&self.state)?.stream.stream_position()?)
    }

    fn end_of_stream(&self) -> PcapResult<bool> {
        let mut state = lock(&self.state)?;
        let position = state.stream.stream_position()?;

        Ok(position >= stream_len(&mut state.stream)?)
    }

    fn close(self) -> PcapResult<R> {
        let state = self.state.into_inner().map_err(|_| PcapError::LockPoisoned)?;
        Ok(state.stream)
    }
}

/// The packet carried by `block`, or the block back if it carries none.
fn into_packet(position: u64, block: Block<'static>) -> Result<CapturedPacket<'static>, Block<'static>> {
    let kind = match block {
        Block::EnhancedPacket(epb) => PacketKind::Enhanced(epb),
        Block::Packet(pb) => PacketKind::Legacy(pb),
        Block::SimplePacket(spb) => PacketKind::Simple(spb),
        other => return Err(other),
    };

    Ok(CapturedPacket::new(Some(position), kind))
}

fn read_raw<R: Read>(stream: &mut R, endianness: Endianness) -> PcapResult<RawBlock<'static>> {
    match endianness {
        Endianness::Big => RawBlock::from_reader::<_, BigEndian>(stream),
        Endianness::Little => RawBlock::from_reader::<_, LittleEndian>(stream),
    }
}

fn parse_raw<'a>(raw: &'a RawBlock<'_>, endianness: Endianness, sink: &mut ErrorSink) -> PcapResult<Option<Block<'a>>> {
    match endianness {
        Endianness::Big => Block::from_raw::<BigEndian>(raw, sink),
        Endianness::Little => Block::from_raw::<LittleEndian>(raw, sink),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
    use crate::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
    use crate::pcapng::blocks::name_resolution::NameResolutionBlock;
    use crate::pcapng::blocks::section_header::SectionHeaderBlock;
    use crate::pcapng::blocks::PcapNgBlock;
    use crate::packet::Packet;
    use crate::timestamp::Timestamp;
    use crate::DataLink;

    fn write_blocks(blocks: &[Block]) -> Vec<u8> {
        let mut out = Vec::new();
        for block in blocks {
            block.write_to::<LittleEndian, _>(&mut out).unwrap();
        }
        out
    }

    fn shb() -> Block<'static> {
        SectionHeaderBlock::empty(Endianness::Little).into_block()
    }

    fn idb() -> Block<'static> {
        InterfaceDescriptionBlock::new(DataLink::ETHERNET, 0).into_block()
    }

    #[test]
    fn header_errors() {
        let res = PcapNgReader::new(Cursor::new(Vec::new()));
        assert!(matches!(res, Err(PcapError::MissingSectionHeader)));

        let res = PcapNgReader::new(Cursor::new(write_blocks(&[idb()])));
        assert!(matches!(res, Err(PcapError::OrphanInterfaceDescription)));

        let res = PcapNgReader::new(Cursor::new(write_blocks(&[shb()])));
        assert!(matches!(res, Err(PcapError::MissingInterfaceDescription)));
    }

    #[test]
    fn empty_sections_are_dropped() {
        let data = write_blocks(&[shb(), shb(), idb(), idb()]);
        let reader = PcapNgReader::new(Cursor::new(data)).unwrap();

        assert_eq!(reader.header_groups().len(), 1);
        assert_eq!(reader.header_groups()[0].interfaces.len(), 2);
        assert!(reader.end_of_stream().unwrap());
    }

    #[test]
    fn packets_and_other_blocks() {
        let payload = [0xAB_u8; 5];
        let epb = EnhancedPacketBlock::new(1, Timestamp::from_units(7), 5, &payload).into_block();
        let nrb = NameResolutionBlock::default().into_block();

        let data = write_blocks(&[shb(), idb(), idb(), nrb, epb.clone()]);
        let reader = PcapNgReader::new(Cursor::new(data)).unwrap();
        let nrb_position = reader.position().unwrap();

        assert!(matches!(reader.read(), Err(PcapError::NotAPacket(4))));

        reader.seek(nrb_position).unwrap();
        assert!(reader.read_with(&mut ErrorSink::raise()).unwrap().is_none());

        let packet = reader.read().unwrap();
        assert!(packet.position().unwrap() > nrb_position);
        assert_eq!(packet.kind, PacketKind::Enhanced(epb.into_enhanced_packet().unwrap()));
        assert!(reader.end_of_stream().unwrap());

        reader.rewind().unwrap();
        assert_eq!(reader.position().unwrap(), nrb_position);
    }

    #[test]
    fn faults_are_reported_unlocked() {
        let payload = [0_u8; 4];
        let epb = EnhancedPacketBlock::new(0, Timestamp::from_units(1), 4, &payload).with_comment("abc").into_block();

        let mut data = write_blocks(&[shb(), idb(), epb]);
        let comment = data.windows(7).position(|w| w == [1, 0, 3, 0, b'a', b'b', b'c']).unwrap();
        data[comment] = 2;
        let len = data.len() as u64;

        let reader = PcapNgReader::new(Cursor::new(data)).unwrap();

        // The handler can use the reader, the stream isn't locked anymore
        let mut positions = Vec::new();
        let mut handler = |err: PcapError| {
            assert!(matches!(err, PcapError::InvalidOption { code: 2, .. }));
            positions.push(reader.position().unwrap());
        };
        let (_, block) = reader.read_block_with(&mut ErrorSink::report(&mut handler)).unwrap();

        assert!(block.into_enhanced_packet().is_some_and(|epb| epb.options.flags.is_none()));
        assert_eq!(positions, vec![len]);
    }

    #[test]
    fn truncated_block() {
        let payload = [0_u8; 16];
        let epb = EnhancedPacketBlock::new(0, Timestamp::from_units(7), 16, &payload).into_block();

        let mut data = write_blocks(&[shb(), idb(), epb]);
        data.truncate(data.len() - 10);

        let reader = PcapNgReader::new(Cursor::new(data)).unwrap();
        let position = reader.position().unwrap();

        assert!(matches!(reader.read(), Err(PcapError::UnexpectedEndOfStream)));
        assert_eq!(reader.position().unwrap(), position);
    }
}
