//! Generic TLV codec shared by every option schema.

use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use log::warn;

use crate::errors::{ErrorSink, PcapError, PcapResult};

/// Code of the end-of-options marker
pub(crate) const END_OF_OPTIONS: u16 = 0;
/// Code of the comment option, shared by every schema
pub(crate) const COMMENT: u16 = 1;

//   0                   1                   2                   3
//   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |      Option Code              |         Option Length         |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  /                       Option Value                            /
//  /              variable length, padded to 32 bits               /
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// One undecoded option
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct RawOption<'a> {
    pub(crate) code: u16,
    pub(crate) value: &'a [u8],
}

/// Splits an option chain into raw options.
///
/// Stops at the end-of-options marker or when the slice is exhausted, a missing marker is tolerated.
/// Padding is skipped, even when the chain ends before the padding does.
pub(crate) fn opts_from_slice<B: ByteOrder>(mut slice: &[u8]) -> PcapResult<(&[u8], Vec<RawOption<'_>>)> {
    let mut options = vec![];

    while !slice.is_empty() {
        if slice.len() < 4 {
            return Err(PcapError::IncompleteBuffer(4, slice.len()));
        }

        let code = slice.read_u16::<B>()?;
        let length = slice.read_u16::<B>()? as usize;

        if code == END_OF_OPTIONS {
            return Ok((slice, options));
        }

        if slice.len() < length {
            return Err(PcapError::IncompleteBuffer(length, slice.len()));
        }

        let value = &slice[..length];
        let pad_len = ((4 - length % 4) % 4).min(slice.len() - length);
        slice = &slice[length + pad_len..];

        options.push(RawOption { code, value });
    }

    Ok((slice, options))
}

/// A closed set of options recognized by one block type.
pub(crate) trait OptionSchema<'a>: Default {
    /// Name used in logs
    const NAME: &'static str;

    /// Stores one option in `self`.
    ///
    /// Returns `Ok(false)` if the code isn't part of the schema.
    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool>;
}

/// Decodes an option chain with the schema `O`.
///
/// A later duplicate of a code replaces the earlier one. Unknown codes are dropped.
/// Faults on single options are handed to `sink`, so a reporting sink keeps the remaining options.
pub(crate) fn parse_options<'a, B: ByteOrder, O: OptionSchema<'a>>(slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], O)> {
    let (rem, raw_options) = opts_from_slice::<B>(slice)?;

    let mut options = O::default();
    for raw in raw_options {
        match options.apply::<B>(raw.code, raw.value) {
            Ok(true) => {},
            Ok(false) => warn!("{}: dropping unknown option code {}", O::NAME, raw.code),
            Err(err) => sink.fault(err)?,
        }
    }

    Ok((rem, options))
}

/* ----- Value decoding ----- */

pub(crate) fn opt_str(value: &[u8]) -> PcapResult<Cow<'_, str>> {
    Ok(Cow::Borrowed(std::str::from_utf8(value)?))
}

pub(crate) fn opt_array<const N: usize>(code: u16, value: &[u8]) -> PcapResult<[u8; N]> {
    value
        .try_into()
        .map_err(|_| PcapError::InvalidOption { code, reason: "unexpected value length" })
}

pub(crate) fn opt_u8(code: u16, value: &[u8]) -> PcapResult<u8> {
    let [v] = opt_array::<1>(code, value)?;
    Ok(v)
}

pub(crate) fn opt_u32<B: ByteOrder>(code: u16, value: &[u8]) -> PcapResult<u32> {
    Ok(B::read_u32(&opt_array::<4>(code, value)?))
}

pub(crate) fn opt_u64<B: ByteOrder>(code: u16, value: &[u8]) -> PcapResult<u64> {
    Ok(B::read_u64(&opt_array::<8>(code, value)?))
}

/* ----- Value encoding ----- */

/// Encoding of one option value
pub(crate) trait WriteOptTo {
    /// Writes the option `code` with `self` as value.
    ///
    /// Returns the number of bytes written, 0 if the value is longer than 65535 bytes.
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize>;
}

impl WriteOptTo for [u8] {
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize> {
        let len = self.len();
        if len > u16::MAX as usize {
            return Ok(0);
        }

        let pad_len = (4 - len % 4) % 4;

        writer.write_u16::<B>(code)?;
        writer.write_u16::<B>(len as u16)?;
        writer.write_all(self)?;
        writer.write_all(&[0_u8; 3][..pad_len])?;

        Ok(4 + len + pad_len)
    }
}

impl WriteOptTo for str {
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize> {
        self.as_bytes().write_opt_to::<B, W>(code, writer)
    }
}

impl WriteOptTo for u8 {
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize> {
        [*self][..].write_opt_to::<B, W>(code, writer)
    }
}

impl WriteOptTo for u32 {
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize> {
        let mut buf = [0_u8; 4];
        B::write_u32(&mut buf, *self);
        buf[..].write_opt_to::<B, W>(code, writer)
    }
}

impl WriteOptTo for u64 {
    fn write_opt_to<B: ByteOrder, W: Write>(&self, code: u16, writer: &mut W) -> IoResult<usize> {
        let mut buf = [0_u8; 8];
        B::write_u64(&mut buf, *self);
        buf[..].write_opt_to::<B, W>(code, writer)
    }
}

/// Writes the option `code` if `value` is set.
pub(crate) fn write_opt<B: ByteOrder, W: Write, T: WriteOptTo + ?Sized>(writer: &mut W, code: u16, value: Option<&T>) -> IoResult<usize> {
    match value {
        Some(value) => value.write_opt_to::<B, W>(code, writer),
        None => Ok(0),
    }
}

/// Writes the end-of-options marker.
pub(crate) fn write_end_of_options<B: ByteOrder, W: Write>(writer: &mut W) -> IoResult<usize> {
    writer.write_u16::<B>(END_OF_OPTIONS)?;
    writer.write_u16::<B>(0)?;

    Ok(4)
}
