//! Section Header Block (SHB).

use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use super::opt_common::{opt_str, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT};
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::Endianness;

/// Byte-order magic of a section written in big endian
pub(crate) const BYTE_ORDER_MAGIC: u32 = 0x1A2B3C4D;

//   0                   1                   2                   3
//   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//  +---------------------------------------------------------------+
//  |                      Byte-Order Magic                         |
//  +---------------------------------------------------------------+
//  |          Major Version        |         Minor Version         |
//  +---------------------------------------------------------------+
//  |                                                               |
//  |                          Section Length                       |
//  |                                                               |
//  +---------------------------------------------------------------+
//  /                                                               /
//  /                      Options (variable)                       /
//  /                                                               /
//  +---------------------------------------------------------------+
/// Section Header Block: it defines the most important characteristics of the capture file.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct SectionHeaderBlock<'a> {
    /// Endianness of the section, given by its byte-order magic.
    pub endianness: Endianness,

    /// Major version of the format.
    /// Current value is 1.
    pub major_version: u16,

    /// Minor version of the format.
    /// Current value is 0.
    pub minor_version: u16,

    /// Length in bytes of the following section excluding this block.
    ///
    /// This block can be used to skip the section for faster navigation in
    /// large files. Length of -1i64 means that the length is unspecified.
    pub section_length: i64,

    /// Options
    pub options: SectionHeaderOption<'a>,
}

impl SectionHeaderBlock<'static> {
    /// Creates a `SectionHeaderBlock` without options, with an unspecified section length.
    pub fn empty(endianness: Endianness) -> Self {
        SectionHeaderBlock { endianness, ..Default::default() }
    }
}

impl<'a> SectionHeaderBlock<'a> {
    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for SectionHeaderBlock<'a> {
    /// The byte order is read from the block itself, `B` is ignored.
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 16 {
            return Err(PcapError::IncompleteBuffer(16, slice.len()));
        }

        let magic = slice.read_u32::<BigEndian>()?;
        let endianness = match magic {
            0x1A2B3C4D => Endianness::Big,
            0x4D3C2B1A => Endianness::Little,
            _ => return Err(PcapError::InvalidMagicNumber(magic)),
        };

        return match endianness {
            Endianness::Big => parse_inner::<BigEndian>(slice, endianness, sink),
            Endianness::Little => parse_inner::<LittleEndian>(slice, endianness, sink),
        };

        fn parse_inner<'a, B: ByteOrder>(
            mut slice: &'a [u8],
            endianness: Endianness,
            sink: &mut ErrorSink,
        ) -> PcapResult<(&'a [u8], SectionHeaderBlock<'a>)> {
            let major_version = slice.read_u16::<B>()?;
            let minor_version = slice.read_u16::<B>()?;
            let section_length = slice.read_i64::<B>()?;
            let (rem, options) = parse_options::<B, SectionHeaderOption>(slice, sink)?;

            let block = SectionHeaderBlock { endianness, major_version, minor_version, section_length, options };

            Ok((rem, block))
        }
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        writer.write_u32::<B>(BYTE_ORDER_MAGIC)?;
        writer.write_u16::<B>(self.major_version)?;
        writer.write_u16::<B>(self.minor_version)?;
        writer.write_i64::<B>(self.section_length)?;

        let opt_len = self.options.write_to::<B, _>(writer)?;

        Ok(16 + opt_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::SectionHeader(self)
    }
}

impl Default for SectionHeaderBlock<'static> {
    fn default() -> Self {
        SectionHeaderBlock {
            endianness: Endianness::native(),
            major_version: 1,
            minor_version: 0,
            section_length: -1,
            options: SectionHeaderOption::default(),
        }
    }
}

const HARDWARE: u16 = 2;
const OS: u16 = 3;
const USER_APPLICATION: u16 = 4;

/// Options of a [`SectionHeaderBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct SectionHeaderOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// Description of the hardware used to create this section
    pub hardware: Option<Cow<'a, str>>,

    /// Name of the operating system used to create this section
    pub os: Option<Cow<'a, str>>,

    /// Name of the application used to create this section
    pub user_application: Option<Cow<'a, str>>,
}

impl<'a> OptionSchema<'a> for SectionHeaderOption<'a> {
    const NAME: &'static str = "SectionHeaderOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            HARDWARE => self.hardware = Some(opt_str(value)?),
            OS => self.os = Some(opt_str(value)?),
            USER_APPLICATION => self.user_application = Some(opt_str(value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

impl<'a> SectionHeaderOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, str>(writer, HARDWARE, self.hardware.as_deref())?;
        len += write_opt::<B, _, str>(writer, OS, self.os.as_deref())?;
        len += write_opt::<B, _, str>(writer, USER_APPLICATION, self.user_application.as_deref())?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_round_trip() {
        let options = SectionHeaderOption {
            comment: Some("Test Comment".into()),
            hardware: Some("x86 Personal Computer".into()),
            os: Some("Windows 7".into()),
            user_application: Some("PcapngUtils".into()),
        };

        for reorder in [false, true] {
            let mut out = Vec::new();
            let decoded = if reorder {
                options.write_to::<BigEndian, _>(&mut out).unwrap();
                parse_options::<BigEndian, SectionHeaderOption>(&out, &mut ErrorSink::raise()).unwrap().1
            }
            else {
                options.write_to::<LittleEndian, _>(&mut out).unwrap();
                parse_options::<LittleEndian, SectionHeaderOption>(&out, &mut ErrorSink::raise()).unwrap().1
            };

            assert_eq!(decoded, options);
        }
    }

    #[test]
    fn last_duplicate_wins() {
        let data = [1, 0, 1, 0, b'a', 0, 0, 0, 1, 0, 1, 0, b'b', 0, 0, 0, 0, 0, 0, 0];
        let (_, opts) = parse_options::<LittleEndian, SectionHeaderOption>(&data, &mut ErrorSink::raise()).unwrap();

        assert_eq!(opts.comment.as_deref(), Some("b"));
    }

    #[test]
    fn oversized_string_is_skipped() {
        let options = SectionHeaderOption { comment: Some("x".repeat(70_000).into()), ..Default::default() };

        let mut out = Vec::new();
        assert_eq!(options.write_to::<LittleEndian, _>(&mut out).unwrap(), 4);
        assert_eq!(out, [0, 0, 0, 0]);
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let data = [3, 0, 1, 0, 0xFF, 0, 0, 0, 4, 0, 2, 0, b'o', b'k', 0, 0, 0, 0, 0, 0];

        let mut faults = 0;
        let mut handler = |_: PcapError| faults += 1;
        let (_, opts) = parse_options::<LittleEndian, SectionHeaderOption>(&data, &mut ErrorSink::report(&mut handler)).unwrap();

        assert_eq!(opts.os, None);
        assert_eq!(opts.user_application.as_deref(), Some("ok"));
        assert_eq!(faults, 1);

        assert!(parse_options::<LittleEndian, SectionHeaderOption>(&data, &mut ErrorSink::raise()).is_err());
    }
}
