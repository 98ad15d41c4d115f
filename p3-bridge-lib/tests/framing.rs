//! Framer behaviour across chunk boundaries.

use p3_bridge_lib::protocol::wire::{frame, DLE, EOT, SOH};
use p3_bridge_lib::protocol::Framer;

fn payloads() -> Vec<Vec<u8>> {
    vec![
        vec![0x04, 0x01, 0x00, 0x00, 0x00, 0xBB, 0x00],
        // Reserved bytes in field data force escaping.
        vec![0x04, 0x02, 0x00, 0x00, 0x00, 0x01, 0x04, 0x10, 0x99, 0x00],
        vec![0x05, 0xFF, 0xFF, 0x10, 0x20, 0x42, 0x42],
    ]
}

fn stream() -> Vec<u8> {
    payloads().iter().flat_map(|p| frame(p)).collect()
}

#[test]
fn whole_stream_and_byte_at_a_time_agree() {
    let stream = stream();

    let mut whole = Framer::default();
    let all_at_once: Vec<_> = whole.push(&stream);

    let mut dribble = Framer::default();
    let mut one_by_one = Vec::new();
    for byte in &stream {
        one_by_one.extend(dribble.push(std::slice::from_ref(byte)));
    }

    assert_eq!(all_at_once, payloads());
    assert_eq!(one_by_one, payloads());
}

#[test]
fn arbitrary_split_points_agree() {
    let stream = stream();
    for split in 1..stream.len() {
        let mut framer = Framer::default();
        let mut frames = framer.push(&stream[..split]);
        frames.extend(framer.push(&stream[split..]));
        assert_eq!(frames, payloads(), "split at {split}");
    }
}

#[test]
fn escape_round_trips_reserved_bytes() {
    // Field data containing SOH, EOT, and DLE survives framing.
    let payload = vec![0x04, 0x01, 0x00, 0x00, 0x00, SOH, EOT, DLE];
    let mut framer = Framer::default();
    let frames = framer.push(&frame(&payload));
    assert_eq!(frames, vec![payload]);
}

#[test]
fn junk_between_frames_is_skipped() {
    let mut input = vec![0xDE, 0xAD, 0xBE, 0xEF];
    input.extend(frame(&[0x01, 0x02, 0x03]));
    input.extend([0x00, 0x00]);
    input.extend(frame(&[0x04, 0x05, 0x06]));

    let mut framer = Framer::default();
    let frames = framer.push(&input);
    assert_eq!(frames, vec![vec![0x01, 0x02, 0x03], vec![0x04, 0x05, 0x06]]);
}
