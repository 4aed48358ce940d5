/// The 32-bit flags word of the Enhanced Packet and Packet blocks.
///
/// Each predicate is true when every bit of its mask is set.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct PacketBlockFlags(pub u32);

impl PacketBlockFlags {
    const INBOUND: u32 = 0x0000_0001;
    const OUTBOUND: u32 = 0x0000_0002;
    const UNICAST: u32 = 0x0000_0004;
    const MULTICAST: u32 = 0x0000_0008;
    const BROADCAST: u32 = 0x0000_000C;
    const PROMISCUOUS: u32 = 0x0000_0010;
    const FCS_LENGTH: u32 = 0x0000_01E0;

    const CRC_ERROR: u32 = 0x0100_0000;
    const PACKET_TOO_LONG_ERROR: u32 = 0x0200_0000;
    const PACKET_TOO_SHORT_ERROR: u32 = 0x0400_0000;
    const WRONG_INTER_FRAME_GAP_ERROR: u32 = 0x0800_0000;
    const UNALIGNED_FRAME_ERROR: u32 = 0x1000_0000;
    const START_FRAME_DELIMITER_ERROR: u32 = 0x2000_0000;
    const PREAMBLE_ERROR: u32 = 0x4000_0000;
    const SYMBOL_ERROR: u32 = 0x8000_0000;

    /// Raw flags word
    pub fn bits(&self) -> u32 {
        self.0
    }

    fn has(&self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub fn inbound(&self) -> bool {
        self.has(Self::INBOUND)
    }

    pub fn outbound(&self) -> bool {
        self.has(Self::OUTBOUND)
    }

    pub fn unicast(&self) -> bool {
        self.has(Self::UNICAST)
    }

    pub fn multicast(&self) -> bool {
        self.has(Self::MULTICAST)
    }

    pub fn broadcast(&self) -> bool {
        self.has(Self::BROADCAST)
    }

    pub fn promiscuous(&self) -> bool {
        self.has(Self::PROMISCUOUS)
    }

    pub fn fcs_length(&self) -> bool {
        self.has(Self::FCS_LENGTH)
    }

    pub fn crc_error(&self) -> bool {
        self.has(Self::CRC_ERROR)
    }

    pub fn packet_too_long_error(&self) -> bool {
        self.has(Self::PACKET_TOO_LONG_ERROR)
    }

    pub fn packet_too_short_error(&self) -> bool {
        self.has(Self::PACKET_TOO_SHORT_ERROR)
    }

    pub fn wrong_inter_frame_gap_error(&self) -> bool {
        self.has(Self::WRONG_INTER_FRAME_GAP_ERROR)
    }

    pub fn unaligned_frame_error(&self) -> bool {
        self.has(Self::UNALIGNED_FRAME_ERROR)
    }

    pub fn start_frame_delimiter_error(&self) -> bool {
        self.has(Self::START_FRAME_DELIMITER_ERROR)
    }

    pub fn preamble_error(&self) -> bool {
        self.has(Self::PREAMBLE_ERROR)
    }

    pub fn symbol_error(&self) -> bool {
        self.has(Self::SYMBOL_ERROR)
    }
}

impl From<u32> for PacketBlockFlags {
    fn from(bits: u32) -> Self {
        PacketBlockFlags(bits)
    }
}
