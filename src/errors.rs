use std::io::ErrorKind;

use thiserror::Error;

/// Result type for the Pcap and PcapNg codecs
pub type PcapResult<T> = Result<T, PcapError>;

/* ----- enum PcapError ----- */

/// Errors that can occur while reading, writing, converting or merging captures.
#[derive(Debug, Error)]
pub enum PcapError {
    /// The buffer is too small to parse the expected data.
    /// # Fields
    /// - 0: needed size to parse the data
    /// - 1: actual size of the buffer
    #[error("The buffer too small: need {0}B, got {1}B")]
    IncompleteBuffer(usize, usize),
    /// The stream ended in the middle of a header, a record or a block.
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,
    /// An I/O error occurred while reading the stream.
    #[error("I/O error while reading the stream")]
    ReadFailed(#[source] std::io::Error),
    /// An I/O error occurred while writing the stream.
    #[error("I/O error while writing the stream")]
    WriteFailed(#[source] std::io::Error),
    /// A field of a header, record or block is invalid.
    #[error("Invalid field: {0}")]
    InvalidField(&'static str),
    /// The magic number of a header is invalid.
    #[error("Invalid magic number: {0:#X}")]
    InvalidMagicNumber(u32),
    /// The first bytes of the stream match no known capture format.
    #[error("Not a PCAP/PCAPNG stream: unknown magic number {0:#X}")]
    NotACaptureStream(u32),
    /// The stream is too short for its format to be detected.
    #[error("Stream too short to detect its format: {0}B < 12B")]
    StreamTooShort(u64),
    /// The leading and trailing lengths of a block differ.
    #[error("Block length mismatch: initial_len {0} != trailer_len {1}")]
    BlockLengthMismatch(u32, u32),
    /// An option value could not be decoded.
    #[error("Invalid option {code}: {reason}")]
    InvalidOption {
        /// Code of the option
        code: u16,
        /// What is wrong with its value
        reason: &'static str,
    },
    /// A string field is not valid UTF-8.
    #[error("Invalid UTF-8 string")]
    Utf8(#[from] std::str::Utf8Error),
    /// The PcapNg stream has no Section Header Block.
    #[error("No section header block found")]
    MissingSectionHeader,
    /// The PcapNg stream has no Interface Description Block.
    #[error("No interface description block found")]
    MissingInterfaceDescription,
    /// An Interface Description Block appeared before any Section Header Block.
    #[error("Interface description block found before any section header block")]
    OrphanInterfaceDescription,
    /// A packet refers to an interface that was not described.
    #[error("No corresponding interface id: {0}")]
    InvalidInterfaceId(u32),
    /// The encoded packet is bigger than the maximum capture length.
    #[error("Packet too long: {len}B > snaplen {snaplen}B")]
    PacketTooLong {
        /// Encoded length of the packet
        len: usize,
        /// Maximum capture length
        snaplen: u32,
    },
    /// The next block of the stream does not carry a packet.
    #[error("Failed to read next packet: block type {0:#010X} is not a packet")]
    NotAPacket(u32),
    /// The operation is not supported by this packet or block kind.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    /// An address of the wrong family was given.
    #[error("Wrong address family for {0}")]
    WrongAddressFamily(&'static str),
    /// The headers can't be converted to the requested format.
    #[error("Header conversion failed: {0}")]
    HeaderConversion(&'static str),
    /// A merge was requested without any source.
    #[error("No source to merge")]
    NoMergeSource,
    /// A thread panicked while holding the lock of a reader or a writer.
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl PcapError {
    /// Wraps the error for the encoders returning an `io::Result`, `From<io::Error>` unwraps it back.
    pub(crate) fn into_io(self) -> std::io::Error {
        std::io::Error::new(ErrorKind::InvalidInput, self)
    }
}

impl From<std::io::Error> for PcapError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof => PcapError::UnexpectedEndOfStream,
            _ => err.downcast::<PcapError>().unwrap_or_else(PcapError::ReadFailed),
        }
    }
}

/* ----- struct ErrorSink ----- */

/// Destination of the recoverable faults met while decoding.
///
/// A raising sink turns every fault into an `Err`, which is what one-shot calls use.
/// A reporting sink hands the fault to a handler and lets decoding go on, which is what bulk loops use.
pub struct ErrorSink<'s> {
    handler: Option<&'s mut dyn FnMut(PcapError)>,
}

impl<'s> ErrorSink<'s> {
    /// Creates a sink that returns every fault to the caller.
    pub fn raise() -> Self {
        ErrorSink { handler: None }
    }

    /// Creates a sink that reports every fault to `handler`.
    pub fn report(handler: &'s mut dyn FnMut(PcapError)) -> Self {
        ErrorSink { handler: Some(handler) }
    }

    /// True if faults are reported instead of returned.
    pub fn is_reporting(&self) -> bool {
        self.handler.is_some()
    }

    /// Hands `err` to the handler, or returns it if there is none.
    pub(crate) fn fault(&mut self, err: PcapError) -> PcapResult<()> {
        match self.handler.as_mut() {
            Some(handler) => {
                handler(err);
                Ok(())
            },
            None => Err(err),
        }
    }
}

impl Default for ErrorSink<'_> {
    fn default() -> Self {
        ErrorSink::raise()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_end_of_stream() {
        let err: PcapError = std::io::Error::from(ErrorKind::UnexpectedEof).into();
        assert!(matches!(err, PcapError::UnexpectedEndOfStream));

        let err: PcapError = std::io::Error::from(ErrorKind::PermissionDenied).into();
        assert!(matches!(err, PcapError::ReadFailed(_)));
    }

    #[test]
    fn encoding_faults_survive_io() {
        let err: PcapError = PcapError::InvalidField("test").into_io().into();
        assert!(matches!(err, PcapError::InvalidField("test")));

        let err: PcapError = std::io::Error::new(ErrorKind::InvalidInput, "other").into();
        assert!(matches!(err, PcapError::ReadFailed(_)));
    }

    #[test]
    fn sink_modes() {
        let mut raise = ErrorSink::raise();
        assert!(raise.fault(PcapError::InvalidField("test")).is_err());

        let mut faults = Vec::new();
        let mut handler = |err: PcapError| faults.push(err.to_string());
        let mut report = ErrorSink::report(&mut handler);
        assert!(report.fault(PcapError::InvalidField("test")).is_ok());
        assert!(report.is_reporting());
        drop(report);

        assert_eq!(faults, vec!["Invalid field: test".to_string()]);
    }
}
