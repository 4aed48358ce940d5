//! Conversions between the pcap global header and PcapNg header groups.

use std::io::{Read, Seek};

use crate::errors::{PcapError, PcapResult};
use crate::pcap::{PcapHeader, PcapReader};
use crate::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
use crate::pcapng::blocks::section_header::SectionHeaderBlock;
use crate::pcapng::{HeaderGroup, PcapNgReader};
use crate::{CaptureFormat, TsResolution};

/// Headers of a capture, viewed in either format.
pub trait CaptureHeaders {
    /// The headers as a pcap global header.
    fn pcap_header(&self) -> PcapResult<PcapHeader>;

    /// The headers as PcapNg header groups.
    fn pcapng_header(&self) -> PcapResult<Vec<HeaderGroup<'static>>>;

    /// Format the headers were read from
    fn header_format(&self) -> CaptureFormat;
}

impl<R: Read + Seek> CaptureHeaders for PcapReader<R> {
    fn pcap_header(&self) -> PcapResult<PcapHeader> {
        Ok(self.header())
    }

    /// A native Section Header with a single interface carrying the link type and snaplen of the pcap.
    fn pcapng_header(&self) -> PcapResult<Vec<HeaderGroup<'static>>> {
        let header = self.header();
        let interface = InterfaceDescriptionBlock::new(header.datalink, header.snaplen);

        Ok(vec![HeaderGroup::new(SectionHeaderBlock::default()).with_interface(interface)])
    }

    fn header_format(&self) -> CaptureFormat {
        match self.header().ts_resolution {
            TsResolution::MicroSecond => CaptureFormat::PcapMicro,
            TsResolution::NanoSecond => CaptureFormat::PcapNano,
        }
    }
}

impl<R: Read + Seek> CaptureHeaders for PcapNgReader<R> {
    /// Only a PcapNg with exactly one section and one interface has a pcap equivalent.
    ///
    /// The header gets nanosecond timestamps, the byte order of the section and the link type and snaplen of the interface.
    fn pcap_header(&self) -> PcapResult<PcapHeader> {
        let [group] = self.header_groups()
        else {
            return Err(PcapError::HeaderConversion("pcap needs exactly one section"));
        };

        let [interface] = group.interfaces.as_slice()
        else {
            return Err(PcapError::HeaderConversion("pcap needs exactly one interface"));
        };

        let header = PcapHeader {
            snaplen: interface.snaplen,
            datalink: interface.linktype,
            ..PcapHeader::create_empty(TsResolution::NanoSecond, group.endianness())
        };

        Ok(header)
    }

    fn pcapng_header(&self) -> PcapResult<Vec<HeaderGroup<'static>>> {
        Ok(self.header_groups().to_vec())
    }

    fn header_format(&self) -> CaptureFormat {
        CaptureFormat::PcapNg
    }
}

/// Puts every interface of `groups`, in order, under the Section Header of the first group.
///
/// The interface ids of the merged group are the positions of the interfaces in this concatenation.
pub fn merge_header_groups(groups: &[HeaderGroup]) -> PcapResult<HeaderGroup<'static>> {
    let Some(first) = groups.first()
    else {
        return Err(PcapError::HeaderConversion("no header group to merge"));
    };

    let mut merged = HeaderGroup::new(first.section.clone().into_owned());
    for group in groups {
        merged.interfaces.extend(group.interfaces.iter().map(|interface| interface.clone().into_owned()));
    }

    Ok(merged)
}
