//! Pipeline-level behaviour: suppression, counters, UDP feed.

mod support;

use std::time::Duration;

use p3_bridge_lib::bridge::Pipeline;
use p3_bridge_lib::config::Config;
use p3_bridge_lib::stats::BridgeStats;
use p3_bridge_lib::transport::run_udp;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use support::build_frame;

async fn pipeline(suppress_status: bool) -> (Pipeline, Arc<BridgeStats>) {
    let mut cfg = Config::default();
    cfg.logging.suppress_status = suppress_status;
    let stats = Arc::new(BridgeStats::default());
    let pipeline = Pipeline::new(&cfg, stats.clone()).await.unwrap();
    (pipeline, stats)
}

#[tokio::test]
async fn status_records_are_suppressed_when_configured() {
    let (mut pipeline, stats) = pipeline(true).await;

    let mut input = build_frame(4, 0x0002, 0, &[0x01, 0x02, 0x00, 0x10, 0x00]);
    input.extend(build_frame(4, 0x0001, 0, &[0x01, 0x01, 0x00, 0x01]));
    pipeline.process_chunk(&input).await;

    let snap = stats.snapshot();
    assert_eq!(snap.msg_total, 2);
    assert_eq!(snap.msg_suppressed, 1);
    assert_eq!(snap.parse_errors, 0);
}

#[tokio::test]
async fn status_records_pass_when_not_suppressed() {
    let (mut pipeline, stats) = pipeline(false).await;
    pipeline
        .process_chunk(&build_frame(4, 0x0002, 0, &[0x01, 0x02, 0x00, 0x10, 0x00]))
        .await;
    assert_eq!(stats.snapshot().msg_suppressed, 0);
}

#[tokio::test]
async fn crc_mismatch_is_counted_not_dropped() {
    let (mut pipeline, stats) = pipeline(false).await;

    let payload = support::build_payload(4, 0x0001, 0, &[0x01, 0x01, 0x00, 0x01]);
    let mut bad = payload.clone();
    let n = bad.len();
    bad[n - 2] ^= 0xFF;
    pipeline.process_chunk(&p3_bridge_lib::protocol::wire::frame(&bad)).await;

    let snap = stats.snapshot();
    assert_eq!(snap.msg_total, 1);
    assert_eq!(snap.crc_errors, 1);
}

#[tokio::test]
async fn framing_diagnostics_reach_the_counters() {
    let (mut pipeline, stats) = pipeline(false).await;

    // Noise before the frame start forces a resync.
    let mut input = vec![0xDE, 0xAD, 0xBE, 0xEF];
    input.extend(build_frame(4, 0x0001, 0, &[0x01, 0x01, 0x00, 0x01]));
    pipeline.process_chunk(&input).await;

    let snap = stats.snapshot();
    assert_eq!(snap.frame_resyncs, 1);
    assert_eq!(snap.frame_oversize, 0);
    assert_eq!(snap.msg_total, 1);
}

#[tokio::test]
async fn unparseable_frames_are_counted() {
    let (mut pipeline, stats) = pipeline(false).await;
    // A three-byte payload cannot hold the P3 header.
    pipeline
        .process_chunk(&p3_bridge_lib::protocol::wire::frame(&[0x04, 0x01, 0x00]))
        .await;
    let snap = stats.snapshot();
    assert_eq!(snap.parse_errors, 1);
    assert_eq!(snap.msg_ok, 0);
}

fn pick_free_udp_port() -> u16 {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").expect("bind ephemeral");
    let port = socket.local_addr().unwrap().port();
    drop(socket);
    port
}

#[tokio::test]
async fn udp_datagrams_reach_the_channel() {
    let port = pick_free_udp_port();
    let (chunk_tx, mut chunk_rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = tokio::spawn(async move {
        run_udp("127.0.0.1", port, chunk_tx, shutdown_rx).await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let datagram = build_frame(4, 0x0001, 0, &[0x01, 0x01, 0x00, 0x01]);
    sender.send_to(&datagram, ("127.0.0.1", port)).unwrap();

    let chunk = timeout(Duration::from_secs(5), chunk_rx.recv())
        .await
        .expect("datagram timeout")
        .expect("channel open");
    assert_eq!(chunk, datagram);
    listener.abort();
}

#[tokio::test]
async fn udp_bind_failure_is_fatal() {
    // TEST-NET address that no local interface carries.
    let (chunk_tx, _chunk_rx) = mpsc::channel(8);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let result = run_udp("203.0.113.1", 5303, chunk_tx, shutdown_rx).await;
    assert!(result.is_err());
}
