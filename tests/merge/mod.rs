use std::fs::File;
use std::io::Cursor;
use std::time::Duration;

use pcapng_utils::merge::PcapMerger;
use pcapng_utils::pcap::{PcapPacket, PcapReader, PcapWriter};
use pcapng_utils::pcapng::PcapNgReader;
use pcapng_utils::{CaptureReader, CaptureWriter, DataLink, Endianness, Packet, PcapError, TsResolution};

fn pcap(times: &[(u64, u32)], tag: u8) -> PcapReader<Cursor<Vec<u8>>> {
    let pcap_writer = PcapWriter::new(Vec::new(), TsResolution::MicroSecond, Endianness::Big).unwrap();
    for &(secs, micros) in times {
        let data = [tag, 0];
        let packet = PcapPacket::new(Duration::new(secs, micros * 1000), 2, &data);
        pcap_writer.write_packet(&packet).unwrap();
    }

    PcapReader::new(Cursor::new(pcap_writer.close().unwrap())).unwrap()
}

fn merged(sources: Vec<PcapReader<Cursor<Vec<u8>>>>) -> Vec<(u64, u64, u32, u8)> {
    let merger = PcapMerger::new(Vec::new(), sources).unwrap();
    let out = merger.merge().unwrap();

    let pcapng_reader = PcapNgReader::new(Cursor::new(out)).unwrap();
    let mut packets = Vec::new();
    pcapng_reader.read_all(
        &Default::default(),
        |packet| packets.push((packet.seconds(), packet.microseconds(), packet.interface_id().unwrap(), packet.data()[0])),
        |err| panic!("{err}"),
    );

    packets
}

#[test]
fn ordered_by_timestamp() {
    let sources = vec![pcap(&[(1, 0), (3, 5), (3, 6)], 0xA), pcap(&[(2, 0), (3, 5)], 0xB), pcap(&[(0, 999_999)], 0xC)];

    let expected = vec![
        (0, 999_999, 2, 0xC),
        (1, 0, 0, 0xA),
        (2, 0, 1, 0xB),
        // Ties go to the first source
        (3, 5, 0, 0xA),
        (3, 5, 1, 0xB),
        (3, 6, 0, 0xA),
    ];

    assert_eq!(merged(sources), expected);
}

#[test]
fn one_interface_per_source() {
    let sources = vec![pcap(&[], 0), pcap(&[(5, 0)], 1), pcap(&[], 2)];
    let merger = PcapMerger::new(Vec::new(), sources).unwrap();
    let out = merger.merge().unwrap();

    let pcapng_reader = PcapNgReader::new(Cursor::new(out)).unwrap();
    let groups = pcapng_reader.header_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].interfaces.len(), 3);

    let packet = pcapng_reader.read().unwrap();
    assert_eq!(packet.interface_id(), Some(1));
    assert!(pcapng_reader.end_of_stream().unwrap());
}

#[test]
fn no_source() {
    let res = PcapMerger::<Cursor<Vec<u8>>, _>::new(Vec::new(), Vec::new());
    assert!(matches!(res, Err(PcapError::NoMergeSource)));
}

#[test]
fn merge_fixtures() {
    let sources = vec![
        PcapReader::new(File::open("tests/pcap/little_endian.pcap").unwrap()).unwrap(),
        PcapReader::new(File::open("tests/pcap/big_endian_nano.pcap").unwrap()).unwrap(),
    ];

    let mut merger = PcapMerger::new(Vec::new(), sources).unwrap();
    while merger.merge_next().unwrap() {}
    assert_eq!(merger.count(), 5);

    let out = merger.merge().unwrap();
    let pcapng_reader = PcapNgReader::new(Cursor::new(out)).unwrap();

    let linktypes: Vec<_> = pcapng_reader.header_groups()[0].interfaces.iter().map(|interface| interface.linktype).collect();
    assert_eq!(linktypes, vec![DataLink::ETHERNET, DataLink::ETHERNET]);

    let mut keys = Vec::new();
    pcapng_reader.read_all(&Default::default(), |packet| keys.push((packet.seconds(), packet.nanoseconds())), |err| panic!("{err}"));

    assert_eq!(keys.len(), 5);
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
}
