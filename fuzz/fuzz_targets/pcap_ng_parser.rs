#![no_main]
use byteorder_slice::byteorder::LittleEndian;
use libfuzzer_sys::fuzz_target;
use pcapng_utils::pcapng::Block;

fuzz_target!(|data: &[u8]| {
    let mut src = data;

    while !src.is_empty() {
        let _ = Block::from_slice::<LittleEndian>(src);
        src = &src[1..];
    }
});
