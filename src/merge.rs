//! Timestamp-ordered merge of several pcaps into one PcapNg.

use std::io::{Read, Seek, Write};

use log::debug;

use crate::convert::{merge_header_groups, CaptureHeaders};
use crate::errors::{PcapError, PcapResult};
use crate::packet::Packet;
use crate::pcap::PcapReader;
use crate::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use crate::pcapng::PcapNgWriter;
use crate::reader::CaptureReader;
use crate::writer::CaptureWriter;

/// Merges pcaps into a single PcapNg section, ordered by timestamp.
///
/// Source `i` gets interface `i` in the output. Packets with equal timestamps are taken from the lowest source first.
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
///
/// use pcapng_utils::merge::PcapMerger;
/// use pcapng_utils::pcap::PcapReader;
///
/// let sources = vec![
///     PcapReader::new(File::open("a.pcap").unwrap()).unwrap(),
///     PcapReader::new(File::open("b.pcap").unwrap()).unwrap(),
/// ];
///
/// let out = File::create("merged.pcapng").unwrap();
/// let merger = PcapMerger::new(out, sources).unwrap();
/// merger.merge().unwrap();
/// ```
#[derive(Debug)]
pub struct PcapMerger<R: Read + Seek, W: Write> {
    selectors: Vec<Selector<R>>,
    writer: PcapNgWriter<W>,
}

impl<R: Read + Seek, W: Write> PcapMerger<R, W> {
    /// Creates a merger writing to `output`.
    ///
    /// The merged header group, one interface per source, is written immediately.
    ///
    /// Fails with [`PcapError::NoMergeSource`] if `sources` is empty.
    pub fn new(output: W, sources: Vec<PcapReader<R>>) -> PcapResult<Self> {
        if sources.is_empty() {
            return Err(PcapError::NoMergeSource);
        }

        let mut groups = Vec::with_capacity(sources.len());
        for source in &sources {
            groups.extend(source.pcapng_header()?);
        }

        let header = merge_header_groups(&groups)?;
        let writer = PcapNgWriter::with_header_groups(output, vec![header])?;

        let selectors = sources.into_iter().enumerate().map(|(index, reader)| Selector::new(reader, index as u32)).collect();

        Ok(PcapMerger { selectors, writer })
    }

    /// Writes the earliest pending packet.
    ///
    /// Returns `false`, without writing, once every source is exhausted.
    pub fn merge_next(&mut self) -> PcapResult<bool> {
        let mut earliest: Option<(usize, (u64, u64))> = None;

        for (i, selector) in self.selectors.iter_mut().enumerate() {
            let Some(packet) = selector.peek()?
            else {
                continue;
            };

            let key = (packet.seconds(), packet.nanoseconds());
            if earliest.map_or(true, |(_, min)| key < min) {
                earliest = Some((i, key));
            }
        }

        let Some((i, _)) = earliest
        else {
            return Ok(false);
        };

        if let Some(packet) = self.selectors[i].take()? {
            self.writer.write_packet(&packet)?;
        }

        Ok(true)
    }

    /// Merges every remaining packet, then returns the output.
    pub fn merge(mut self) -> PcapResult<W> {
        while self.merge_next()? {}

        debug!("Merged {} packets from {} sources", self.count(), self.selectors.len());

        self.writer.close()
    }

    /// Number of packets read from the sources so far
    pub fn count(&self) -> usize {
        self.selectors.iter().map(|selector| selector.count).sum()
    }
}

/// Source of a merge, holding back the next packet until it is taken.
#[derive(Debug)]
struct Selector<R: Read + Seek> {
    reader: PcapReader<R>,
    index: u32,
    stash: Option<EnhancedPacketBlock<'static>>,
    count: usize,
}

impl<R: Read + Seek> Selector<R> {
    fn new(reader: PcapReader<R>, index: u32) -> Self {
        Selector { reader, index, stash: None, count: 0 }
    }

    /// Next packet of the source as an Enhanced Packet on the interface of the source, `None` at the end.
    fn peek(&mut self) -> PcapResult<Option<&EnhancedPacketBlock<'static>>> {
        if self.stash.is_none() && !self.reader.end_of_stream()? {
            let packet = self.reader.read()?;
            self.count += 1;
            self.stash = Some(packet.into_enhanced_packet(self.index)?);
        }

        Ok(self.stash.as_ref())
    }

    fn take(&mut self) -> PcapResult<Option<EnhancedPacketBlock<'static>>> {
        self.peek()?;
        Ok(self.stash.take())
    }
}
