//! Format-independent writing contract.

use crate::errors::PcapResult;
use crate::packet::Packet;

/// Writes packets to a capture, whatever its format.
///
/// A packet is either written whole or not at all.
pub trait CaptureWriter {
    /// Wrapped sink
    type Sink;

    /// Encodes and writes one packet, returning the number of bytes written.
    fn write_packet(&self, packet: &dyn Packet) -> PcapResult<usize>;

    /// Flushes the wrapped sink.
    fn flush(&self) -> PcapResult<()>;

    /// Flushes and consumes the writer, returning the wrapped sink.
    fn close(self) -> PcapResult<Self::Sink>
    where
        Self: Sized;
}
