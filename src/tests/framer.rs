use super::*;
use crate::protocol::checksum;

fn acceleration_packet(x: i16, y: i16, z: i16, temp: i16) -> Vec<u8> {
    let mut bytes = vec![0x55, 0x51];
    bytes.extend_from_slice(&x.to_le_bytes());
    bytes.extend_from_slice(&y.to_le_bytes());
    bytes.extend_from_slice(&z.to_le_bytes());
    bytes.extend_from_slice(&temp.to_le_bytes());
    let cs = checksum(&bytes);
    bytes.push(cs);
    bytes
}

#[test]
fn resync_across_leading_and_trailing_garbage() {
    let pkt1 = acceleration_packet(1, 2, 3, 2500);
    let pkt2 = acceleration_packet(4, 5, 6, 2600);

    let mut framer = PacketFramer::new();
    let mut stream = vec![0xAA];
    stream.extend_from_slice(&pkt1);
    stream.push(0x00);
    stream.extend_from_slice(&pkt2);
    framer.push_bytes(&stream);

    let first = framer.next_packet();
    assert!(matches!(first, Some(FrameEvent::Packet(_))));
    let second = framer.next_packet();
    assert!(matches!(second, Some(FrameEvent::Packet(_))));
    assert!(framer.next_packet().is_none());

    if let Some(FrameEvent::Packet(p)) = first {
        assert_eq!(p.type_byte, 0x51);
    }
}

#[test]
fn checksum_rejection_drops_only_the_bad_packet() {
    let mut bad = acceleration_packet(1, 2, 3, 2500);
    let last = bad.len() - 1;
    bad[last] = bad[last].wrapping_add(1);
    let good = acceleration_packet(7, 8, 9, 2700);

    let mut framer = PacketFramer::new();
    framer.push_bytes(&bad);
    framer.push_bytes(&good);

    let event = framer.next_packet();
    assert!(matches!(event, Some(FrameEvent::Packet(_))));
    assert!(framer.next_packet().is_none());
}

#[test]
fn insufficient_data_returns_none() {
    let mut framer = PacketFramer::new();
    framer.push_bytes(&[0x55, 0x51, 1, 2, 3]);
    assert!(framer.next_packet().is_none());
}

#[test]
fn large_garbage_prefix_reports_drop_event() {
    let mut framer = PacketFramer::new();
    framer.push_bytes(&vec![0xAAu8; 100]);
    let event = framer.next_packet();
    assert!(matches!(
        event,
        Some(FrameEvent::Drop(DropEvent::SuspectedBaudrateMismatch { .. }))
    ));
}

#[test]
fn decode_dispatches_on_type_byte() {
    let pkt = acceleration_packet(16384, 0, 0, 2500);
    let mut framer = PacketFramer::new();
    framer.push_bytes(&pkt);
    let Some(FrameEvent::Packet(validated)) = framer.next_packet() else {
        panic!("expected a packet");
    };
    let raw = PacketFramer::decode(validated).unwrap();
    match raw {
        RawPacket::Acceleration(a) => assert_eq!(a.x, 16384),
        _ => panic!("wrong variant"),
    }
}
