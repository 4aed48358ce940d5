use std::fs::File;
use std::io::Cursor;

use byteorder_slice::byteorder::{BigEndian, LittleEndian};
use glob::glob;
use pcapng_utils::pcapng::blocks::enhanced_packet::EnhancedPacketBlock;
use pcapng_utils::pcapng::blocks::interface_description::InterfaceDescriptionBlock;
use pcapng_utils::pcapng::blocks::section_header::SectionHeaderBlock;
use pcapng_utils::pcapng::blocks::PcapNgBlock;
use pcapng_utils::pcapng::{Block, BlockType, HeaderGroup, PcapNgReader, PcapNgWriter};
use pcapng_utils::{CaptureReader, CaptureWriter, DataLink, Endianness, Packet, PacketKind, PcapError, Timestamp};

// Interface description with a name, a timestamp resolution and an os option
const INTERFACE_DESCRIPTION: &str = "010000008800000001000000ffff0000020032005c4465766963655c4e50465f\
                                     7b44413346384137362d373137452d344541372d394544352d30333938444445\
                                     39433137457d000009000100060000000c002b0036342d6269742057696e646f\
                                     777320372053657276696365205061636b20312c206275696c64203736303100\
                                     0000000088000000";

fn read_blocks<R: std::io::Read + std::io::Seek>(reader: &PcapNgReader<R>) -> Vec<Block<'static>> {
    let mut blocks = Vec::new();
    while !reader.end_of_stream().unwrap() {
        let (_, block) = reader.read_block().unwrap_or_else(|err| panic!("Error on block {}: {err}", blocks.len()));
        blocks.push(block);
    }

    blocks
}

#[test]
fn reader() {
    for entry in glob("tests/pcapng/**/*.pcapng").expect("Failed to read glob pattern") {
        let entry = entry.unwrap();

        let file = File::open(&entry).unwrap();
        let pcapng_reader = PcapNgReader::new(file).unwrap();
        assert!(!pcapng_reader.header_groups().is_empty(), "No header group in {entry:?}");

        let blocks = read_blocks(&pcapng_reader);
        assert!(blocks.iter().any(|block| block.block_type().is_packet()), "No packet in {entry:?}");
    }
}

#[test]
fn writer() {
    for entry in glob("tests/pcapng/**/*.pcapng").expect("Failed to read glob pattern") {
        let entry = entry.unwrap();

        let pcapng_in = std::fs::read(&entry).unwrap();
        let pcapng_reader = PcapNgReader::new(Cursor::new(&pcapng_in[..])).unwrap();
        let pcapng_writer = PcapNgWriter::with_header_groups(Vec::new(), pcapng_reader.header_groups().to_vec()).unwrap();

        let expected = read_blocks(&pcapng_reader);
        for (idx, block) in expected.iter().enumerate() {
            pcapng_writer
                .write_block(block)
                .unwrap_or_else(|err| panic!("Error writing block, file: {entry:?}, block n°{idx}, block: {block:?}: {err}"));
        }

        let actual = pcapng_writer.close().unwrap();
        let actual_reader = PcapNgReader::new(Cursor::new(&actual[..])).unwrap();

        assert_eq!(actual_reader.header_groups(), pcapng_reader.header_groups(), "Header groups differ, file: {entry:?}");
        assert_eq!(read_blocks(&actual_reader), expected, "Pcapng written != pcapng read, file: {entry:?}");
    }
}

#[test]
fn little_endian_content() {
    let pcapng_reader = PcapNgReader::new(File::open("tests/pcapng/little_endian.pcapng").unwrap()).unwrap();

    let groups = pcapng_reader.header_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].endianness(), Endianness::Little);
    assert_eq!(groups[0].section.options.comment.as_deref(), Some("little endian section"));
    assert_eq!(groups[0].interfaces.len(), 2);
    assert_eq!(groups[0].interfaces[0].options.name.as_deref(), Some("eth0"));
    assert_eq!(groups[0].interfaces[0].options.ts_resolution, Some(6));
    assert_eq!(groups[0].interfaces[1].linktype, DataLink::RAW);

    let types: Vec<_> = read_blocks(&pcapng_reader).iter().map(Block::block_type).collect();
    assert_eq!(
        types,
        vec![
            BlockType::EnhancedPacket,
            BlockType::NameResolution,
            BlockType::SimplePacket,
            BlockType::Packet,
            BlockType::EnhancedPacket,
            BlockType::InterfaceStatistics,
            BlockType::SectionHeader,
            BlockType::InterfaceDescription,
            BlockType::EnhancedPacket,
        ]
    );
}

#[test]
fn packets_of_every_kind() {
    let pcapng_reader = PcapNgReader::new(File::open("tests/pcapng/little_endian.pcapng").unwrap()).unwrap();

    let first = pcapng_reader.read().unwrap();
    let PacketKind::Enhanced(epb) = &first.kind
    else {
        panic!("First packet should be an enhanced packet")
    };
    assert_eq!(epb.options.comment.as_deref(), Some("first"));
    assert!(epb.options.flags.unwrap().inbound());
    assert_eq!((first.seconds(), first.microseconds()), (1_700_000_000, 1));
    assert_eq!(first.interface_id(), Some(0));
    assert_eq!(first.data().len(), 60);

    assert!(matches!(pcapng_reader.read(), Err(PcapError::NotAPacket(4))));

    let simple = pcapng_reader.read().unwrap();
    assert!(matches!(simple.kind, PacketKind::Simple(_)));
    assert_eq!(simple.data().len(), 10);
    assert_eq!(simple.interface_id(), None);
    assert!(simple.clone().with_comment("no options").is_err());

    let legacy = pcapng_reader.read().unwrap();
    assert!(matches!(legacy.kind, PacketKind::Legacy(_)));
    assert_eq!(legacy.interface_id(), Some(1));
    let commented = legacy.with_comment("legacy").unwrap();
    assert!(matches!(&commented.kind, PacketKind::Legacy(pb) if pb.options.comment.as_deref() == Some("legacy")));

    let snapped = pcapng_reader.read().unwrap();
    assert_eq!((snapped.data().len(), snapped.original_len()), (33, 1500));

    assert!(matches!(pcapng_reader.read(), Err(PcapError::NotAPacket(5))));
    assert!(matches!(pcapng_reader.read(), Err(PcapError::NotAPacket(0x0A0D0D0A))));
    assert!(matches!(pcapng_reader.read(), Err(PcapError::NotAPacket(1))));

    // Last packet is in the big endian section
    let last = pcapng_reader.read().unwrap();
    let PacketKind::Enhanced(epb) = &last.kind
    else {
        panic!("Last packet should be an enhanced packet")
    };
    assert_eq!(epb.options.drop_count, Some(7));
    assert_eq!(last.microseconds(), 5);

    assert!(pcapng_reader.end_of_stream().unwrap());
    assert!(matches!(pcapng_reader.read(), Err(PcapError::UnexpectedEndOfStream)));

    // Seeking back to a packet reads it again
    pcapng_reader.seek(first.position().unwrap()).unwrap();
    assert_eq!(pcapng_reader.read().unwrap(), first);
}

#[test]
fn read_all_skips_other_blocks() {
    let pcapng_reader = PcapNgReader::new(File::open("tests/pcapng/little_endian.pcapng").unwrap()).unwrap();

    let mut kinds = Vec::new();
    let mut errors = Vec::new();
    pcapng_reader.read_all(
        &Default::default(),
        |packet| kinds.push(std::mem::discriminant(&packet.kind)),
        |err| errors.push(err),
    );

    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(kinds.len(), 5);
    assert!(pcapng_reader.end_of_stream().unwrap());
}

#[test]
fn malformed_option_is_reported() {
    let shb = SectionHeaderBlock::empty(Endianness::Little).into_block();
    let idb = InterfaceDescriptionBlock::new(DataLink::ETHERNET, 0).into_block();
    let packet = |fill: u8| EnhancedPacketBlock::new(0, Timestamp::from_units(fill as u64), 4, &[fill; 4]).into_owned();

    let mut data = Vec::new();
    for block in [shb, idb, packet(1).into_block(), packet(2).with_comment("abc").into_block(), packet(3).into_block()] {
        block.write_to::<LittleEndian, _>(&mut data).unwrap();
    }

    // Turn the 3 bytes comment into a flags option, which needs 4 bytes
    let comment = data.windows(7).position(|w| w == [1, 0, 3, 0, b'a', b'b', b'c']).unwrap();
    data[comment] = 2;

    let pcapng_reader = PcapNgReader::new(Cursor::new(data)).unwrap();

    let mut packets = Vec::new();
    let mut errors = Vec::new();
    pcapng_reader.read_all(&Default::default(), |packet| packets.push(packet), |err| errors.push(err));

    let fills: Vec<_> = packets.iter().map(|packet| packet.data()[0]).collect();
    assert_eq!(fills, vec![1, 2, 3]);
    assert!(matches!(&packets[1].kind, PacketKind::Enhanced(epb) if epb.options.flags.is_none() && epb.options.comment.is_none()));

    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0], PcapError::InvalidOption { code: 2, .. }));

    // A one-shot read raises the same fault
    pcapng_reader.rewind().unwrap();
    assert_eq!(pcapng_reader.read().unwrap().data(), &[1; 4]);
    assert!(matches!(pcapng_reader.read(), Err(PcapError::InvalidOption { code: 2, .. })));
    assert_eq!(pcapng_reader.read().unwrap().data(), &[3; 4]);
}

#[test]
fn interface_description_round_trip() {
    let data = hex::decode(INTERFACE_DESCRIPTION).unwrap();

    let (rem, block) = Block::from_slice::<LittleEndian>(&data).unwrap();
    assert!(rem.is_empty());

    let idb = block.unwrap().into_interface_description().unwrap();
    assert_eq!(idb.linktype, DataLink::ETHERNET);
    assert_eq!(idb.snaplen, 0xFFFF);
    assert_eq!(idb.options.name.as_deref(), Some("\\Device\\NPF_{DA3F8A76-717E-4EA7-9ED5-0398DDE9C17E}"));
    assert_eq!(idb.options.ts_resolution, Some(6));
    assert_eq!(idb.options.os.as_deref(), Some("64-bit Windows 7 Service Pack 1, build 7601"));
    assert_eq!(idb.options.comment, None);

    let mut le = Vec::new();
    idb.clone().into_block().write_to::<LittleEndian, _>(&mut le).unwrap();
    assert_eq!(le, data);

    let mut be = Vec::new();
    idb.clone().into_block().write_to::<BigEndian, _>(&mut be).unwrap();
    let (_, block) = Block::from_slice::<BigEndian>(&be).unwrap();
    assert_eq!(block.unwrap().into_interface_description(), Some(idb));
}

#[test]
fn snaplen_bound() {
    let group = HeaderGroup::default().with_interface(InterfaceDescriptionBlock::new(DataLink::ETHERNET, 64));
    let pcapng_writer = PcapNgWriter::with_header_groups(Vec::new(), vec![group]).unwrap();

    let data = [0_u8; 40];
    let fits = EnhancedPacketBlock::new(1, Timestamp::from_units(0), 40, &data[..20]);
    let too_long = EnhancedPacketBlock::new(1, Timestamp::from_units(0), 40, &data);

    assert_eq!(pcapng_writer.write_packet(&fits).unwrap(), 56);
    assert!(matches!(pcapng_writer.write_packet(&too_long), Err(PcapError::PacketTooLong { len: 76, snaplen: 64 })));

    // Interface 0 has no snaplen
    let unbounded = EnhancedPacketBlock::new(0, Timestamp::from_units(0), 40, &data);
    assert_eq!(pcapng_writer.write_packet(&unbounded).unwrap(), 76);

    let out = pcapng_writer.close().unwrap();
    let pcapng_reader = PcapNgReader::new(Cursor::new(out)).unwrap();

    let mut count = 0;
    pcapng_reader.read_all(&Default::default(), |_| count += 1, |err| panic!("{err}"));
    assert_eq!(count, 2);
}
