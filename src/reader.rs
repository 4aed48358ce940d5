//! Format-independent reading contract.

use std::io::{Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::warn;

use crate::convert::CaptureHeaders;
use crate::errors::{ErrorSink, PcapError, PcapResult};
use crate::packet::CapturedPacket;
use crate::pcap::{PcapHeader, PcapReader};
use crate::pcapng::{HeaderGroup, PcapNgReader};
use crate::CaptureFormat;

/// Reads the packets of a capture, whatever its format.
///
/// Every method locks the stream for the duration of the call only,
/// so a reader can be shared between threads but callbacks never run under the lock.
pub trait CaptureReader {
    /// Wrapped stream
    type Stream;

    /// Decodes the packet at the current position and moves past it.
    fn read(&self) -> PcapResult<CapturedPacket<'static>>;

    /// Decodes the record at the current position and moves past it.
    ///
    /// Faults on single options or records are handed to `sink`, the packet is still returned when `sink` reports.
    /// Returns `Ok(None)` for a record which doesn't carry a packet.
    fn read_with(&self, sink: &mut ErrorSink) -> PcapResult<Option<CapturedPacket<'static>>>;

    /// Moves to an absolute offset.
    ///
    /// The offset must be one returned by [`CaptureReader::position`] or a [`CapturedPacket::position`].
    fn seek(&self, position: u64) -> PcapResult<()>;

    /// Moves back to the first packet.
    fn rewind(&self) -> PcapResult<()>;

    /// Current offset in the stream
    fn position(&self) -> PcapResult<u64>;

    /// True once the position reaches the end of the stream.
    fn end_of_stream(&self) -> PcapResult<bool>;

    /// Consumes the reader, returning the wrapped stream.
    fn close(self) -> PcapResult<Self::Stream>
    where
        Self: Sized;

    /// Reads packets until the end of the stream or until `cancel` is set.
    ///
    /// Records without a packet are skipped silently.
    /// Each error is handed to `on_error`, including the faults on single options of a packet which is still delivered.
    /// Reading goes on after a failed read only if it moved the position forward.
    fn read_all<P, E>(&self, cancel: &AtomicBool, mut on_packet: P, mut on_error: E)
    where
        P: FnMut(CapturedPacket<'static>),
        E: FnMut(PcapError),
    {
        while !cancel.load(Ordering::Relaxed) {
            match self.end_of_stream() {
                Ok(true) => break,
                Ok(false) => {},
                Err(err) => {
                    on_error(err);
                    break;
                },
            }

            let before = match self.position() {
                Ok(position) => position,
                Err(err) => {
                    on_error(err);
                    break;
                },
            };

            let res = self.read_with(&mut ErrorSink::report(&mut on_error));

            match res {
                Ok(Some(packet)) => on_packet(packet),
                Ok(None) => {},
                Err(err) => {
                    on_error(err);

                    match self.position() {
                        Ok(after) if after > before => {},
                        _ => {
                            warn!("Stopped reading at offset {before}: no progress after an error");
                            break;
                        },
                    }
                },
            }
        }
    }
}

/// Reader of either format, as returned by [`crate::open_reader`].
#[derive(Debug)]
pub enum AnyReader<R: Read + Seek> {
    /// Classic pcap
    Pcap(PcapReader<R>),
    /// PcapNg
    PcapNg(PcapNgReader<R>),
}

impl<R: Read + Seek> CaptureReader for AnyReader<R> {
    type Stream = R;

    fn read(&self) -> PcapResult<CapturedPacket<'static>> {
        match self {
            AnyReader::Pcap(reader) => reader.read(),
            AnyReader::PcapNg(reader) => reader.read(),
        }
    }

    fn read_with(&self, sink: &mut ErrorSink) -> PcapResult<Option<CapturedPacket<'static>>> {
        match self {
            AnyReader::Pcap(reader) => reader.read_with(sink),
            AnyReader::PcapNg(reader) => reader.read_with(sink),
        }
    }

    fn seek(&self, position: u64) -> PcapResult<()> {
        match self {
            AnyReader::Pcap(reader) => reader.seek(position),
            AnyReader::PcapNg(reader) => reader.seek(position),
        }
    }

    fn rewind(&self) -> PcapResult<()> {
        match self {
            AnyReader::Pcap(reader) => reader.rewind(),
            AnyReader::PcapNg(reader) => reader.rewind(),
        }
    }

    fn position(&self) -> PcapResult<u64> {
        match self {
            AnyReader::Pcap(reader) => reader.position(),
            AnyReader::PcapNg(reader) => reader.position(),
        }
    }

    fn end_of_stream(&self) -> PcapResult<bool> {
        match self {
            AnyReader::Pcap(reader) => reader.end_of_stream(),
            AnyReader::PcapNg(reader) => reader.end_of_stream(),
        }
    }

    fn close(self) -> PcapResult<R> {
        match self {
            AnyReader::Pcap(reader) => reader.close(),
            AnyReader::PcapNg(reader) => reader.close(),
        }
    }
}

impl<R: Read + Seek> CaptureHeaders for AnyReader<R> {
    fn pcap_header(&self) -> PcapResult<PcapHeader> {
        match self {
            AnyReader::Pcap(reader) => reader.pcap_header(),
            AnyReader::PcapNg(reader) => reader.pcap_header(),
        }
    }

    fn pcapng_header(&self) -> PcapResult<Vec<HeaderGroup<'static>>> {
        match self {
            AnyReader::Pcap(reader) => reader.pcapng_header(),
            AnyReader::PcapNg(reader) => reader.pcapng_header(),
        }
    }

    fn header_format(&self) -> CaptureFormat {
        match self {
            AnyReader::Pcap(reader) => reader.header_format(),
            AnyReader::PcapNg(reader) => reader.header_format(),
        }
    }
}

/// Locks the state of a reader or a writer.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> PcapResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| PcapError::LockPoisoned)
}

/// Total length of a stream, its position is left unchanged.
pub(crate) fn stream_len<S: Seek>(stream: &mut S) -> PcapResult<u64> {
    let position = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(position))?;

    Ok(len)
}
