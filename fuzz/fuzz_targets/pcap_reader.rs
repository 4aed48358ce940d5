#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use pcapng_utils::pcap::PcapReader;
use pcapng_utils::CaptureReader;

fuzz_target!(|data: &[u8]| {
    if let Ok(pcap_reader) = PcapReader::new(Cursor::new(data)) {
        pcap_reader.read_all(&Default::default(), |_| {}, |_| {});
    }
});
