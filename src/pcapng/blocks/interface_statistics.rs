use std::borrow::Cow;
use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use derive_into_owned::IntoOwned;

use super::block_common::{Block, PcapNgBlock};
use super::opt_common::{opt_array, opt_str, opt_u64, parse_options, write_end_of_options, write_opt, OptionSchema, COMMENT};
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::timestamp::Timestamp;

/// The Interface Statistics Block contains the capture statistics for a given interface and it is optional.
#[derive(Clone, Debug, IntoOwned, Eq, PartialEq)]
pub struct InterfaceStatisticsBlock<'a> {
    /// Specifies the interface these statistics refers to.
    ///
    /// The correct interface will be the one whose Interface Description Block (within the current Section of the file)
    /// is identified by same number of this field.
    pub interface_id: u32,

    /// Time this statistic refers to.
    pub timestamp: Timestamp,

    /// Options
    pub options: InterfaceStatisticsOption<'a>,
}

impl<'a> InterfaceStatisticsBlock<'a> {
    /// Creates a new `InterfaceStatisticsBlock` without options.
    pub fn new(interface_id: u32, timestamp: Timestamp) -> Self {
        InterfaceStatisticsBlock { interface_id, timestamp, options: InterfaceStatisticsOption::default() }
    }

    /// Returns the block with its comment replaced.
    pub fn with_comment(mut self, comment: impl Into<Cow<'a, str>>) -> Self {
        self.options.comment = Some(comment.into());
        self
    }
}

impl<'a> PcapNgBlock<'a> for InterfaceStatisticsBlock<'a> {
    fn from_slice<B: ByteOrder>(mut slice: &'a [u8], sink: &mut ErrorSink) -> PcapResult<(&'a [u8], Self)> {
        if slice.len() < 12 {
            return Err(PcapError::IncompleteBuffer(12, slice.len()));
        }

        let interface_id = slice.read_u32::<B>()?;
        let (slice, timestamp) = Timestamp::from_slice::<B>(slice)?;
        let (slice, options) = parse_options::<B, InterfaceStatisticsOption>(slice, sink)?;

        let block = InterfaceStatisticsBlock { interface_id, timestamp, options };

        Ok((slice, block))
    }

    fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        writer.write_u32::<B>(self.interface_id)?;
        self.timestamp.write_to::<B, _>(writer)?;

        let opt_len = self.options.write_to::<B, _>(writer)?;

        Ok(12 + opt_len)
    }

    fn into_block(self) -> Block<'a> {
        Block::InterfaceStatistics(self)
    }
}

const START_TIME: u16 = 2;
const END_TIME: u16 = 3;
const IF_RECEIVED: u16 = 4;
const IF_DROPPED: u16 = 5;
const FILTER_ACCEPT: u16 = 6;
const OS_DROPPED: u16 = 7;
const DELIVERED_TO_USER: u16 = 8;

/// Options of an [`InterfaceStatisticsBlock`]
#[derive(Clone, Debug, Default, IntoOwned, Eq, PartialEq)]
pub struct InterfaceStatisticsOption<'a> {
    /// Comment associated with the current block
    pub comment: Option<Cow<'a, str>>,

    /// Time in which the capture started.
    pub start_time: Option<Timestamp>,

    /// Time in which the capture ended.
    pub end_time: Option<Timestamp>,

    /// Number of packets received from the physical interface
    /// starting from the beginning of the capture.
    pub if_received: Option<u64>,

    /// Number of packets dropped by the interface
    /// due to lack of resources starting from the beginning of the capture.
    pub if_dropped: Option<u64>,

    /// Number of packets accepted by filter starting from the beginning of the capture.
    pub filter_accept: Option<u64>,

    /// Number of packets dropped by the operating system starting from the beginning of the capture.
    pub os_dropped: Option<u64>,

    /// Number of packets delivered to the user starting from the beginning of the capture.
    pub delivered_to_user: Option<u64>,
}

impl<'a> OptionSchema<'a> for InterfaceStatisticsOption<'a> {
    const NAME: &'static str = "InterfaceStatisticsOption";

    fn apply<B: ByteOrder>(&mut self, code: u16, value: &'a [u8]) -> PcapResult<bool> {
        match code {
            COMMENT => self.comment = Some(opt_str(value)?),
            START_TIME => self.start_time = Some(opt_timestamp::<B>(code, value)?),
            END_TIME => self.end_time = Some(opt_timestamp::<B>(code, value)?),
            IF_RECEIVED => self.if_received = Some(opt_u64::<B>(code, value)?),
            IF_DROPPED => self.if_dropped = Some(opt_u64::<B>(code, value)?),
            FILTER_ACCEPT => self.filter_accept = Some(opt_u64::<B>(code, value)?),
            OS_DROPPED => self.os_dropped = Some(opt_u64::<B>(code, value)?),
            DELIVERED_TO_USER => self.delivered_to_user = Some(opt_u64::<B>(code, value)?),
            _ => return Ok(false),
        }

        Ok(true)
    }
}

fn opt_timestamp<B: ByteOrder>(code: u16, value: &[u8]) -> PcapResult<Timestamp> {
    let bytes = opt_array::<8>(code, value)?;
    let (_, ts) = Timestamp::from_slice::<B>(&bytes)?;
    Ok(ts)
}

impl<'a> InterfaceStatisticsOption<'a> {
    /// Writes the set options followed by the end-of-options marker.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        let start_time = self.start_time.map(|ts| ts.to_bytes::<B>());
        let end_time = self.end_time.map(|ts| ts.to_bytes::<B>());

        let mut len = 0;

        len += write_opt::<B, _, str>(writer, COMMENT, self.comment.as_deref())?;
        len += write_opt::<B, _, [u8]>(writer, START_TIME, start_time.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, [u8]>(writer, END_TIME, end_time.as_ref().map(|b| &b[..]))?;
        len += write_opt::<B, _, u64>(writer, IF_RECEIVED, self.if_received.as_ref())?;
        len += write_opt::<B, _, u64>(writer, IF_DROPPED, self.if_dropped.as_ref())?;
        len += write_opt::<B, _, u64>(writer, FILTER_ACCEPT, self.filter_accept.as_ref())?;
        len += write_opt::<B, _, u64>(writer, OS_DROPPED, self.os_dropped.as_ref())?;
        len += write_opt::<B, _, u64>(writer, DELIVERED_TO_USER, self.delivered_to_user.as_ref())?;
        len += write_end_of_options::<B, _>(writer)?;

        Ok(len)
    }
}
