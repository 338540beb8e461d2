//! End-to-end exercises of the muxer pipeline, the decode context and the
//! repackager.

use bytes::Bytes;
use pretty_assertions::assert_eq;
use tokio::io::AsyncReadExt;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tsmux::mux::{Muxer, MuxerConfig, StreamMeta, StreamPacket, INPUT_QUEUE_CAPACITY, NO_PTS};
use tsmux::repack::Repacker;
use tsmux::ts::timestamp::decode_pcr;
use tsmux::ts::{Container, Payload, TS_PACKET_SIZE};
use tsmux::TsError;

const VIDEO_PID: u16 = 256;
const AUDIO_PID: u16 = 257;
const PMT_PID: u16 = 4096;

fn video_stream() -> StreamMeta {
    StreamMeta {
        pid: VIDEO_PID,
        stream_id: 0xE0,
        stream_type_id: 0x1B,
    }
}

fn audio_stream() -> StreamMeta {
    StreamMeta {
        pid: AUDIO_PID,
        stream_id: 0xC0,
        stream_type_id: 0x0F,
    }
}

fn unit(pid: u16, pts: i64, is_head: bool, data: Vec<u8>) -> StreamPacket {
    StreamPacket {
        pid,
        pts,
        is_head,
        data: Bytes::from(data),
    }
}

/// Runs the pipeline over the given units and returns the emitted bytes.
fn mux(streams: Vec<StreamMeta>, pcr_pid: u16, units: Vec<StreamPacket>) -> Vec<u8> {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let (sink, mut tap) = tokio::io::duplex(1 << 20);
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);

        let config = MuxerConfig {
            pmt_pid: PMT_PID,
            pcr_pid,
            psi_interval: None,
        };
        let done = Muxer::run(CancellationToken::new(), sink, config, streams, rx)
            .await
            .unwrap();

        for u in units {
            tx.send(u).await.unwrap();
        }
        drop(tx);
        done.await.unwrap().unwrap();

        let mut out = Vec::new();
        tap.read_to_end(&mut out).await.unwrap();
        out
    })
}

fn assert_framing(stream: &[u8]) {
    assert_eq!(stream.len() % TS_PACKET_SIZE, 0, "length not packet aligned");
    for frame in stream.chunks(TS_PACKET_SIZE) {
        assert_eq!(frame[0], 0x47, "frame does not start with sync byte");
    }
}

fn pid_of(frame: &[u8]) -> u16 {
    (((frame[1] & 0x1F) as u16) << 8) | frame[2] as u16
}

fn cc_of(frame: &[u8]) -> u8 {
    frame[3] & 0x0F
}

#[test]
fn test_single_video_access_unit() {
    let payload = (0..160u32).map(|i| i as u8).collect::<Vec<_>>();
    let out = mux(
        vec![video_stream()],
        VIDEO_PID,
        vec![unit(VIDEO_PID, 9000, true, payload.clone())],
    );

    assert_framing(&out);
    assert_eq!(out.len(), 3 * TS_PACKET_SIZE);

    let frames: Vec<_> = out.chunks(TS_PACKET_SIZE).collect();
    assert_eq!(pid_of(frames[0]), 0);
    assert_eq!(pid_of(frames[1]), PMT_PID);
    assert_eq!(pid_of(frames[2]), VIDEO_PID);

    // the PAT packet is bit-exact down to its CRC
    assert_eq!(
        &frames[0][..21],
        &[
            0x47, 0x40, 0x00, 0x10, 0x00, // header + pointer field
            0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, // section header
            0x00, 0x01, 0xF0, 0x00, // program 1 -> PID 0x1000
            0x2A, 0xB1, 0x04, 0xB2, // CRC32
        ]
    );

    let mut container = Container::new();
    for frame in &frames {
        container.decode_packet(frame).unwrap();
    }
    assert!(container.pmt_pids().contains(&PMT_PID));
    assert!(container.video_stream_pids().contains(&VIDEO_PID));

    // re-decode the start packet now that the PIDs are known
    let mut container = Container::new();
    container.decode_packet(frames[0]).unwrap();
    container.decode_packet(frames[1]).unwrap();
    let head = container.decode_packet(frames[2]).unwrap();

    assert!(head.header.payload_unit_start);
    assert_eq!(head.header.adaptation_field_control, 0b11);
    let pcr = head.adaptation.as_ref().unwrap().pcr.unwrap();
    assert_eq!(decode_pcr(&pcr), (9000 - 50) << 9);

    match head.payload {
        Some(Payload::PES(pes)) => {
            assert_eq!(pes.stream_id, 0xE0);
            assert_eq!(pes.header.as_ref().unwrap().pts, Some(9000));
            assert_eq!(pes.data, payload);
        }
        other => panic!("expected PES start, got {other:?}"),
    }
}

#[test]
fn test_two_audio_access_units() {
    let au1 = vec![0x11u8; 300];
    let au2 = vec![0x22u8; 100];
    let out = mux(
        vec![audio_stream()],
        AUDIO_PID,
        vec![
            unit(AUDIO_PID, 0, true, au1.clone()),
            unit(AUDIO_PID, 1000, true, au2.clone()),
        ],
    );

    assert_framing(&out);
    // PAT, PMT, head + continuation, head
    assert_eq!(out.len(), 5 * TS_PACKET_SIZE);

    let mut container = Container::new();
    let mut audio_frames = Vec::new();
    for frame in out.chunks(TS_PACKET_SIZE) {
        let packet = container.decode_packet(frame).unwrap();
        if packet.header.pid == AUDIO_PID {
            audio_frames.push((cc_of(frame), packet));
        }
    }

    let ccs: Vec<_> = audio_frames.iter().map(|(cc, _)| *cc).collect();
    assert_eq!(ccs, vec![0, 1, 2]);

    // first access unit reassembles across head + continuation
    let (_, head1) = &audio_frames[0];
    let pcr = head1.adaptation.as_ref().unwrap().pcr.unwrap();
    assert_eq!(decode_pcr(&pcr), 0, "PTS 0 clamps the PCR to zero");
    let mut reassembled = match &head1.payload {
        Some(Payload::PES(pes)) => {
            assert_eq!(pes.header.as_ref().unwrap().pts, Some(0));
            pes.data.clone()
        }
        other => panic!("expected PES start, got {other:?}"),
    };
    match &audio_frames[1].1.payload {
        Some(Payload::Raw(raw)) => reassembled.extend_from_slice(&raw.data),
        other => panic!("expected raw continuation, got {other:?}"),
    }
    assert_eq!(reassembled, au1);

    let (_, head2) = &audio_frames[2];
    let pcr = head2.adaptation.as_ref().unwrap().pcr.unwrap();
    assert_eq!(decode_pcr(&pcr), (1000 - 50) << 9);
    match &head2.payload {
        Some(Payload::PES(pes)) => assert_eq!(pes.data, au2),
        other => panic!("expected PES start, got {other:?}"),
    }
}

#[test]
fn test_continuity_counter_wraps() {
    let units = (0..17)
        .map(|i| unit(VIDEO_PID, i * 3000, true, vec![0xCC; 100]))
        .collect();
    let out = mux(vec![video_stream()], VIDEO_PID, units);

    assert_framing(&out);
    let ccs: Vec<_> = out
        .chunks(TS_PACKET_SIZE)
        .filter(|f| pid_of(f) == VIDEO_PID)
        .map(cc_of)
        .collect();

    let mut expected: Vec<u8> = (0..16u8).collect();
    expected.push(0);
    assert_eq!(ccs, expected);
}

#[test]
fn test_non_head_unit_boundaries() {
    // 184 bytes: exactly one full continuation packet
    let out = mux(
        vec![video_stream()],
        VIDEO_PID,
        vec![unit(VIDEO_PID, NO_PTS, false, vec![0xAB; 184])],
    );
    assert_eq!(out.len(), 3 * TS_PACKET_SIZE);
    let frame = &out[2 * TS_PACKET_SIZE..];
    assert_eq!(frame[3] >> 4 & 0x03, 0b01, "full packet carries payload only");

    // 185 bytes: one full packet plus a heavily stuffed one-byte packet
    let out = mux(
        vec![video_stream()],
        VIDEO_PID,
        vec![unit(VIDEO_PID, NO_PTS, false, vec![0xAB; 185])],
    );
    assert_eq!(out.len(), 4 * TS_PACKET_SIZE);
    let last = &out[3 * TS_PACKET_SIZE..];
    assert_eq!(last[3] >> 4 & 0x03, 0b11);
    assert_eq!(last[4], 182, "adaptation field fills all but one byte");
    assert_eq!(last[TS_PACKET_SIZE - 1], 0xAB);
}

#[test]
fn test_duplicate_pid_rejected_at_startup() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let (sink, _tap) = tokio::io::duplex(1 << 16);
        let (_tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);

        let config = MuxerConfig {
            pmt_pid: PMT_PID,
            pcr_pid: VIDEO_PID,
            psi_interval: None,
        };
        let err = Muxer::run(
            CancellationToken::new(),
            sink,
            config,
            vec![video_stream(), video_stream()],
            rx,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, TsError::InvalidPid(pid) if pid == VIDEO_PID));
    });
}

#[test]
fn test_cancellation_stops_consumer() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let (sink, mut tap) = tokio::io::duplex(1 << 16);
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);

        let cancel = CancellationToken::new();
        let config = MuxerConfig {
            pmt_pid: PMT_PID,
            pcr_pid: VIDEO_PID,
            psi_interval: None,
        };
        let done = Muxer::run(cancel.clone(), sink, config, vec![video_stream()], rx)
            .await
            .unwrap();

        cancel.cancel();
        assert!(done.await.unwrap().is_ok());
        drop(tx);

        // only the startup PAT and PMT made it out
        let mut out = Vec::new();
        tap.read_to_end(&mut out).await.unwrap();
        assert_eq!(out.len(), 2 * TS_PACKET_SIZE);
    });
}

#[test]
fn test_periodic_psi_reemission() {
    let rt = Runtime::new().unwrap();
    let out = rt.block_on(async {
        let (sink, mut tap) = tokio::io::duplex(1 << 20);
        let (tx, rx) = mpsc::channel(INPUT_QUEUE_CAPACITY);

        let config = MuxerConfig {
            pmt_pid: PMT_PID,
            pcr_pid: VIDEO_PID,
            // 100ms of 90kHz ticks
            psi_interval: Some(std::time::Duration::from_millis(100)),
        };
        let done = Muxer::run(
            CancellationToken::new(),
            sink,
            config,
            vec![video_stream()],
            rx,
        )
        .await
        .unwrap();

        for pts in [0, 4500, 9000] {
            tx.send(unit(VIDEO_PID, pts, true, vec![0xDD; 50]))
                .await
                .unwrap();
        }
        drop(tx);
        done.await.unwrap().unwrap();

        let mut out = Vec::new();
        tap.read_to_end(&mut out).await.unwrap();
        out
    });

    assert_framing(&out);
    let frames: Vec<_> = out.chunks(TS_PACKET_SIZE).collect();
    let pids: Vec<_> = frames.iter().map(|f| pid_of(f)).collect();

    // tables again once the head-unit timestamps advanced a full interval
    assert_eq!(
        pids,
        vec![0, PMT_PID, VIDEO_PID, VIDEO_PID, 0, PMT_PID, VIDEO_PID]
    );

    // table counters advance, stream counters are untouched by re-emission
    assert_eq!(cc_of(frames[0]), 0);
    assert_eq!(cc_of(frames[4]), 1);
    assert_eq!(cc_of(frames[1]), 0);
    assert_eq!(cc_of(frames[5]), 1);
    let video_ccs: Vec<_> = frames
        .iter()
        .filter(|f| pid_of(f) == VIDEO_PID)
        .map(|f| cc_of(f))
        .collect();
    assert_eq!(video_ccs, vec![0, 1, 2]);
}

#[test]
fn test_repack_is_byte_exact() {
    let units = vec![
        unit(VIDEO_PID, 9000, true, vec![0x5A; 400]),
        unit(AUDIO_PID, 9300, true, vec![0xA5; 90]),
        unit(VIDEO_PID, 12000, true, vec![0x5B; 184]),
    ];
    let original = mux(
        vec![video_stream(), audio_stream()],
        VIDEO_PID,
        units,
    );
    assert_framing(&original);

    let rt = Runtime::new().unwrap();
    let mut repacked = Vec::new();
    rt.block_on(async {
        let mut repacker = Repacker::new(
            original.as_slice(),
            std::io::Cursor::new(&mut repacked),
        );
        repacker.run(CancellationToken::new()).await.unwrap();

        assert!(repacker.container().pmt_pids().contains(&PMT_PID));
        assert!(repacker.container().video_stream_pids().contains(&VIDEO_PID));
        assert!(repacker.container().audio_stream_pids().contains(&AUDIO_PID));
    });

    assert_eq!(repacked, original);
}

#[test]
fn test_invalid_sync_byte_detected() {
    let out = mux(
        vec![video_stream()],
        VIDEO_PID,
        vec![unit(VIDEO_PID, 9000, true, vec![0u8; 32])],
    );

    let mut corrupted = out.clone();
    corrupted[2 * TS_PACKET_SIZE] = 0x00;

    let mut container = Container::new();
    container.decode_packet(&corrupted[..TS_PACKET_SIZE]).unwrap();
    container
        .decode_packet(&corrupted[TS_PACKET_SIZE..2 * TS_PACKET_SIZE])
        .unwrap();
    let err = container
        .decode_packet(&corrupted[2 * TS_PACKET_SIZE..])
        .unwrap_err();
    assert!(matches!(err, TsError::InvalidSyncByte(0x00)));
}
