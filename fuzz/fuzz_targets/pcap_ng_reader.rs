#![no_main]
use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use pcapng_utils::pcapng::PcapNgReader;
use pcapng_utils::CaptureReader;

fuzz_target!(|data: &[u8]| {
    if let Ok(pcapng_reader) = PcapNgReader::new(Cursor::new(data)) {
        pcapng_reader.read_all(&Default::default(), |_| {}, |_| {});
    }
});
