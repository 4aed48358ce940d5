use std::io::Cursor;
use std::sync::atomic::AtomicBool;

use pcapng_utils::pcap::{PcapHeader, PcapReader, PcapWriter};
use pcapng_utils::{CaptureReader, CaptureWriter, DataLink, Endianness, Packet, PcapError, TsResolution};

static DATA: &[u8; 195] = include_bytes!("little_endian.pcap");

// A 124B packet followed by the start of another one
static TRUNCATED: [u8; 200] = [
    212, 195, 178, 161, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 255, 255, 0, 0, 1, 0, 0, 0, 89, 92, 28, 85,
    58, 246, 7, 0, 124, 0, 0, 0, 124, 0, 0, 0, 68, 109, 87, 125, 40, 18, 192, 74, 0, 154, 76, 44, 8, 0, 69, 0,
    0, 110, 100, 55, 0, 0, 117, 17, 76, 144, 37, 157, 173, 13, 192, 168, 1, 101, 130, 165, 130, 165, 0, 90, 107, 107, 0, 25,
    137, 153, 119, 253, 219, 183, 207, 74, 89, 213, 110, 239, 3, 75, 110, 227, 57, 128, 86, 105, 94, 91, 40, 2, 126, 2, 227, 250,
    106, 221, 113, 98, 211, 229, 10, 134, 44, 193, 245, 77, 75, 238, 69, 78, 16, 195, 254, 113, 224, 43, 130, 205, 115, 131, 90, 245,
    238, 164, 68, 27, 45, 26, 73, 234, 87, 155, 38, 207, 55, 185, 252, 116, 214, 9, 21, 191, 90, 47, 72, 237, 89, 92, 28, 85,
    238, 252, 7, 0, 124, 0, 0, 0, 124, 0, 0, 0, 192, 74, 0, 154, 76, 44, 68, 109, 87, 125, 40, 18, 8, 0, 69, 0,
    0, 110, 86, 139,
];

#[test]
fn read() {
    let pcap_reader = PcapReader::new(Cursor::new(&DATA[..])).unwrap();

    //Global header len
    let mut data_len = 24;
    while !pcap_reader.end_of_stream().unwrap() {
        let pkt = pcap_reader.read().unwrap();

        //Packet header len
        data_len += 16;
        data_len += pkt.data().len();
    }

    assert_eq!(data_len, DATA.len());
}

#[test]
fn read_write() {
    let pcap_reader = PcapReader::new(Cursor::new(&DATA[..])).unwrap();
    let pcap_writer = PcapWriter::with_header(Vec::new(), pcap_reader.header()).unwrap();

    while !pcap_reader.end_of_stream().unwrap() {
        pcap_writer.write_packet(&pcap_reader.read().unwrap()).unwrap();
    }

    let out = pcap_writer.close().unwrap();

    assert_eq!(&DATA[..], &out[..]);
}

#[test]
fn big_endian_nano() {
    let data = include_bytes!("big_endian_nano.pcap");

    //Global header test
    let pcap_reader = PcapReader::new(Cursor::new(&data[..])).unwrap();
    let header = PcapHeader {
        version_major: 2,
        version_minor: 4,
        ts_correction: 0,
        ts_accuracy: 0,
        snaplen: 0xffff,
        datalink: DataLink::ETHERNET,
        ts_resolution: TsResolution::NanoSecond,
        endianness: Endianness::Big,
    };
    assert_eq!(pcap_reader.header(), header);
    assert_eq!(header.magic_number(), 0xA1B23C4D);

    //Packet header test
    let first = pcap_reader.read().unwrap();
    assert_eq!((first.seconds(), first.nanoseconds(), first.microseconds()), (1_700_000_000, 500, 0));
    assert_eq!(first.data().len(), 40);
    assert_eq!(first.original_len(), 44);

    let second = pcap_reader.read().unwrap();
    assert_eq!((second.seconds(), second.nanoseconds(), second.microseconds()), (1_700_000_002, 999_999_999, 999_999));
    assert!(pcap_reader.end_of_stream().unwrap());
}

#[test]
fn micro_to_nano() {
    let pcap_reader = PcapReader::new(Cursor::new(&DATA[..])).unwrap();
    let pcap_writer = PcapWriter::new(Vec::new(), TsResolution::NanoSecond, Endianness::Big).unwrap();

    let mut expected = Vec::new();
    while !pcap_reader.end_of_stream().unwrap() {
        let packet = pcap_reader.read().unwrap();
        pcap_writer.write_packet(&packet).unwrap();
        expected.push((packet.seconds(), packet.nanoseconds(), packet.data().to_vec()));
    }

    let nano_reader = PcapReader::new(Cursor::new(pcap_writer.close().unwrap())).unwrap();
    assert_eq!(nano_reader.header().ts_resolution, TsResolution::NanoSecond);

    let mut actual = Vec::new();
    nano_reader.read_all(
        &AtomicBool::new(false),
        |packet| actual.push((packet.seconds(), packet.nanoseconds(), packet.data().to_vec())),
        |err| panic!("{err}"),
    );

    assert_eq!(actual, expected);
}

#[test]
fn truncated_stream() {
    for len in [20, 170, 200] {
        let res = PcapReader::new(Cursor::new(&TRUNCATED[..len]));
        let pcap_reader = match res {
            Ok(pcap_reader) => pcap_reader,
            Err(err) => {
                assert!(len < 24);
                assert!(matches!(err, PcapError::UnexpectedEndOfStream));
                continue;
            },
        };

        let mut packets = 0;
        let mut errors = Vec::new();
        pcap_reader.read_all(&AtomicBool::new(false), |_| packets += 1, |err| errors.push(err));

        assert_eq!(packets, 1, "Wrong packet count for length {len}");
        assert_eq!(errors.len(), 1, "Wrong error count for length {len}");
        assert!(matches!(errors[0], PcapError::UnexpectedEndOfStream));

        // The failed record is left unread
        assert_eq!(pcap_reader.position().unwrap(), 164);
    }
}

#[test]
fn cancelled_read_all() {
    let pcap_reader = PcapReader::new(Cursor::new(&DATA[..])).unwrap();

    let mut packets = 0;
    pcap_reader.read_all(&AtomicBool::new(true), |_| packets += 1, |err| panic!("{err}"));

    assert_eq!(packets, 0);
    assert_eq!(pcap_reader.position().unwrap(), 24);
}
