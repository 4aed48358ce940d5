//! Types shared by the Pcap and PcapNg codecs.

/// Byte order of a capture stream.
///
/// Resolved once from the magic number of the stream and never renegotiated afterwards.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Endianness {
    /// Big endian
    Big,
    /// Little endian
    Little,
}

impl Endianness {
    /// Returns the endianness of the current processor.
    pub fn native() -> Self {
        #[cfg(target_endian = "big")]
        let endianness = Endianness::Big;

        #[cfg(target_endian = "little")]
        let endianness = Endianness::Little;

        endianness
    }

    /// True if big endian
    pub fn is_big(self) -> bool {
        self == Endianness::Big
    }

    /// True if little endian
    pub fn is_little(self) -> bool {
        self == Endianness::Little
    }

    /// Returns the opposite endianness
    pub fn swapped(self) -> Self {
        match self {
            Endianness::Big => Endianness::Little,
            Endianness::Little => Endianness::Big,
        }
    }

    /// True if values stored in this endianness must be byte-swapped on the current processor.
    pub fn is_swapped(self) -> bool {
        self != Endianness::native()
    }
}

/// Conditional byte swapping of fixed size integers.
///
/// `reverse_byte_order(true)` swaps the bytes, `reverse_byte_order(false)` is the identity,
/// so applying it twice with the same flag always gives back the original value.
pub trait ReverseByteOrder: Sized {
    /// Swap the bytes of `self` if `reverse` is true.
    fn reverse_byte_order(self, reverse: bool) -> Self;
}

macro_rules! impl_reverse_byte_order {
    ($($t:ty),*) => {
        $(
            impl ReverseByteOrder for $t {
                fn reverse_byte_order(self, reverse: bool) -> Self {
                    if reverse {
                        self.swap_bytes()
                    }
                    else {
                        self
                    }
                }
            }
        )*
    };
}

impl_reverse_byte_order!(u16, u32, u64, i16, i32, i64);

/// Timestamp resolution of a classic pcap file.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TsResolution {
    /// Microsecond resolution
    MicroSecond,
    /// Nanosecond resolution
    NanoSecond,
}

impl TsResolution {
    /// Number of sub-second units in one microsecond.
    pub(crate) fn units_per_micro(self) -> u32 {
        match self {
            TsResolution::MicroSecond => 1,
            TsResolution::NanoSecond => 1000,
        }
    }
}

/// Data link type
///
/// The link-layer protocol of the packets of an interface.
///
/// See [http://www.tcpdump.org/linktypes.html](http://www.tcpdump.org/linktypes.html)
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DataLink {
    NULL,
    ETHERNET,
    AX25,
    IEEE802_5,
    ARCNET_BSD,
    SLIP,
    PPP,
    FDDI,
    PPP_HDLC,
    PPP_ETHER,
    ATM_RFC1483,
    RAW,
    C_HDLC,
    IEEE802_11,
    LOOP,
    LINUX_SLL,
    IEEE802_11_RADIOTAP,
    BLUETOOTH_HCI_H4_WITH_PHDR,
    IPV4,
    IPV6,
    LINUX_SLL2,

    Unknown(u32),
}

impl From<u32> for DataLink {
    fn from(n: u32) -> DataLink {
        match n {
            0 => DataLink::NULL,
            1 => DataLink::ETHERNET,
            3 => DataLink::AX25,
            6 => DataLink::IEEE802_5,
            7 => DataLink::ARCNET_BSD,
            8 => DataLink::SLIP,
            9 => DataLink::PPP,
            10 => DataLink::FDDI,
            50 => DataLink::PPP_HDLC,
            51 => DataLink::PPP_ETHER,
            100 => DataLink::ATM_RFC1483,
            101 => DataLink::RAW,
            104 => DataLink::C_HDLC,
            105 => DataLink::IEEE802_11,
            108 => DataLink::LOOP,
            113 => DataLink::LINUX_SLL,
            127 => DataLink::IEEE802_11_RADIOTAP,
            201 => DataLink::BLUETOOTH_HCI_H4_WITH_PHDR,
            228 => DataLink::IPV4,
            229 => DataLink::IPV6,
            276 => DataLink::LINUX_SLL2,

            _ => DataLink::Unknown(n),
        }
    }
}

impl From<DataLink> for u32 {
    fn from(link: DataLink) -> u32 {
        match link {
            DataLink::NULL => 0,
            DataLink::ETHERNET => 1,
            DataLink::AX25 => 3,
            DataLink::IEEE802_5 => 6,
            DataLink::ARCNET_BSD => 7,
            DataLink::SLIP => 8,
            DataLink::PPP => 9,
            DataLink::FDDI => 10,
            DataLink::PPP_HDLC => 50,
            DataLink::PPP_ETHER => 51,
            DataLink::ATM_RFC1483 => 100,
            DataLink::RAW => 101,
            DataLink::C_HDLC => 104,
            DataLink::IEEE802_11 => 105,
            DataLink::LOOP => 108,
            DataLink::LINUX_SLL => 113,
            DataLink::IEEE802_11_RADIOTAP => 127,
            DataLink::BLUETOOTH_HCI_H4_WITH_PHDR => 201,
            DataLink::IPV4 => 228,
            DataLink::IPV6 => 229,
            DataLink::LINUX_SLL2 => 276,

            DataLink::Unknown(n) => n,
        }
    }
}
