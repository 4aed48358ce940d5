//! PcapNg 64-bit timestamps.

use std::io::{Result as IoResult, Write};

use byteorder_slice::byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};

use crate::errors::{PcapError, PcapResult};

const MICROS_PER_SEC: u64 = 1_000_000;

//   0                   1                   2                   3
//   0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                        Timestamp (High)                       |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//  |                        Timestamp (Low)                        |
//  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// Number of microseconds elapsed since 1970-01-01 00:00:00 UTC, split into seconds and microseconds.
///
/// `seconds * 1_000_000 + microseconds` always equals the 64-bit unit count `high << 32 | low`.
/// Equality and ordering are those of the (seconds, microseconds) pair.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp {
    seconds: u64,
    microseconds: u32,
}

impl Timestamp {
    /// Creates a new `Timestamp` from a number of seconds and microseconds.
    ///
    /// Returns an error if `microseconds >= 1_000_000` or if the total doesn't fit in 64 bits.
    pub fn new(seconds: u64, microseconds: u32) -> PcapResult<Self> {
        if microseconds as u64 >= MICROS_PER_SEC {
            return Err(PcapError::InvalidField("Timestamp: microseconds >= 1_000_000"));
        }

        seconds
            .checked_mul(MICROS_PER_SEC)
            .and_then(|units| units.checked_add(microseconds as u64))
            .ok_or(PcapError::InvalidField("Timestamp: doesn't fit in 64 bits"))?;

        Ok(Timestamp { seconds, microseconds })
    }

    /// Creates a new `Timestamp` from a number of microseconds.
    pub fn from_units(units: u64) -> Self {
        Timestamp {
            seconds: units / MICROS_PER_SEC,
            microseconds: (units % MICROS_PER_SEC) as u32,
        }
    }

    /// Creates a new `Timestamp` from its two on-disk halves.
    pub fn from_halves(high: u32, low: u32) -> Self {
        Self::from_units(((high as u64) << 32) | low as u64)
    }

    /// Parses a `Timestamp` from a slice, each half being read in the `B` byte order.
    pub fn from_slice<B: ByteOrder>(mut slice: &[u8]) -> PcapResult<(&[u8], Self)> {
        if slice.len() < 8 {
            return Err(PcapError::IncompleteBuffer(8, slice.len()));
        }

        let high = slice.read_u32::<B>()?;
        let low = slice.read_u32::<B>()?;

        Ok((slice, Self::from_halves(high, low)))
    }

    /// Whole seconds
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    /// Microseconds elapsed since the last whole second
    pub fn microseconds(&self) -> u32 {
        self.microseconds
    }

    /// Nanoseconds elapsed since the last whole second
    pub fn nanoseconds(&self) -> u64 {
        self.microseconds as u64 * 1000
    }

    /// Total number of microseconds
    pub fn units(&self) -> u64 {
        self.seconds * MICROS_PER_SEC + self.microseconds as u64
    }

    /// Upper 32 bits of the unit count
    pub fn high(&self) -> u32 {
        (self.units() >> 32) as u32
    }

    /// Lower 32 bits of the unit count
    pub fn low(&self) -> u32 {
        self.units() as u32
    }

    /// Writes the two halves of the `Timestamp` to a writer.
    ///
    /// Writes 8B in the writer on success.
    pub fn write_to<B: ByteOrder, W: Write>(&self, writer: &mut W) -> IoResult<usize> {
        writer.write_u32::<B>(self.high())?;
        writer.write_u32::<B>(self.low())?;

        Ok(8)
    }

    /// Returns the 8 on-disk bytes of the `Timestamp`.
    pub fn to_bytes<B: ByteOrder>(&self) -> [u8; 8] {
        let mut bytes = [0_u8; 8];
        B::write_u32(&mut bytes[..4], self.high());
        B::write_u32(&mut bytes[4..], self.low());
        bytes
    }

    /// Returns the calendar time of the `Timestamp`.
    ///
    /// Returns `None` if the date can't be represented.
    pub fn to_calendar_time(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.seconds).ok()?;
        DateTime::from_timestamp(secs, self.microseconds * 1000)
    }
}
