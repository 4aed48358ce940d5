use std::io::Write;

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian};
use derive_into_owned::IntoOwned;

use crate::errors::{PcapError, PcapResult};
use crate::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
use crate::pcapng::blocks::section_header::SectionHeaderBlock;
use crate::pcapng::blocks::PcapNgBlock;
use crate::{DataLink, Endianness};

/// A Section Header Block with the Interface Description Blocks that follow it.
///
/// Packets of the section refer to the interfaces by their index in `interfaces`.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct HeaderGroup<'a> {
    /// Section Header Block of the group
    pub section: SectionHeaderBlock<'a>,
    /// Interface Description Blocks of the section
    pub interfaces: Vec<InterfaceDescriptionBlock<'a>>,
}

impl<'a> HeaderGroup<'a> {
    /// Creates a group without interfaces.
    pub fn new(section: SectionHeaderBlock<'a>) -> Self {
        HeaderGroup { section, interfaces: Vec::new() }
    }

    /// Returns the group with `interface` appended.
    pub fn with_interface(mut self, interface: InterfaceDescriptionBlock<'a>) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Byte order of the section
    pub fn endianness(&self) -> Endianness {
        self.section.endianness
    }

    /// Writes the section header then every interface description, in the byte order of the section.
    ///
    /// Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> PcapResult<usize> {
        let mut out = Vec::new();

        match self.endianness() {
            Endianness::Big => self.encode::<BigEndian>(&mut out)?,
            Endianness::Little => self.encode::<LittleEndian>(&mut out)?,
        };

        writer.write_all(&out).map_err(PcapError::WriteFailed)?;

        Ok(out.len())
    }

    fn encode<B: ByteOrder>(&self, out: &mut Vec<u8>) -> PcapResult<usize> {
        let mut len = self.section.clone().into_block().write_to::<B, _>(out)?;

        for interface in &self.interfaces {
            len += interface.clone().into_block().write_to::<B, _>(out)?;
        }

        Ok(len)
    }
}

/// An empty native section with one Ethernet interface without snaplen.
impl Default for HeaderGroup<'static> {
    fn default() -> Self {
        HeaderGroup::new(SectionHeaderBlock::default()).with_interface(InterfaceDescriptionBlock::new(DataLink::ETHERNET, 0))
    }
}
