// Frame source policy, Y4M parsing and the threaded decode hand-off.

use instant::Instant;
use panosphere_core::testing::ScriptedDecoder;
use panosphere_core::video::{TestPattern, ThreadedDecoder, Y4mReader};
use panosphere_core::{DecodeError, DecodePoll, FrameDecoder, FrameReader, VideoFrameSource};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Far enough apart that every pull passes the throttle at 60 fps.
fn ticks(start: Instant) -> impl Iterator<Item = Instant> {
    (0u64..).map(move |i| start + Duration::from_millis(i * 100))
}

#[test]
fn nothing_is_pulled_before_start() {
    let decoder = ScriptedDecoder::solid(3, 8, 8);
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 60, true);
    assert!(!source.is_playing());
    assert!(source.pull_current_frame(Instant::now()).is_none());
    assert_eq!(probe.polls(), 0);
}

#[test]
fn pending_decoder_yields_none() {
    let decoder = ScriptedDecoder::solid(1, 8, 8).with_pending(2);
    let mut source = VideoFrameSource::new(decoder, 60, true);
    source.start();
    let mut t = ticks(Instant::now());
    assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    let frame = source.pull_current_frame(t.next().unwrap()).unwrap();
    assert_eq!((frame.width, frame.height), (8, 8));
}

#[test]
fn polls_are_throttled_to_frame_rate() {
    let decoder = ScriptedDecoder::solid(10, 8, 8);
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 10, true);
    source.start();
    let start = Instant::now();
    assert!(source.pull_current_frame(start).is_some());
    // 10 fps means one poll per 100 ms.
    assert!(source
        .pull_current_frame(start + Duration::from_millis(40))
        .is_none());
    assert!(source
        .pull_current_frame(start + Duration::from_millis(90))
        .is_none());
    assert_eq!(probe.polls(), 1);
    assert!(source
        .pull_current_frame(start + Duration::from_millis(100))
        .is_some());
    assert_eq!(probe.polls(), 2);
}

#[test]
fn looping_rewinds_within_the_same_pull() {
    let decoder = ScriptedDecoder::solid(2, 8, 8);
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 60, true);
    source.start();
    let mut t = ticks(Instant::now());

    let lumas: Vec<u8> = (0..5)
        .map(|_| source.pull_current_frame(t.next().unwrap()).unwrap().luma.data[0])
        .collect();
    assert_eq!(lumas, vec![0, 1, 0, 1, 0]);
    assert_eq!(probe.rewinds(), 2);
    assert!(source.is_playing());
    assert!(!source.is_finished());
}

#[test]
fn no_loop_finishes_once_and_stops_polling() {
    let decoder = ScriptedDecoder::solid(2, 8, 8);
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 60, false);
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    source.on_finished(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    source.start();
    let mut t = ticks(Instant::now());

    assert!(source.pull_current_frame(t.next().unwrap()).is_some());
    assert!(source.pull_current_frame(t.next().unwrap()).is_some());
    assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    assert!(source.is_finished());
    assert!(!source.is_playing());
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    let polls = probe.polls();
    for _ in 0..3 {
        assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    }
    assert_eq!(probe.polls(), polls);
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(probe.rewinds(), 0);
    // The last frame stays readable.
    assert_eq!(source.current_frame().unwrap().luma.data[0], 1);
}

#[test]
fn failed_loop_rewind_finishes_playback() {
    let decoder = ScriptedDecoder::solid(1, 8, 8).with_failing_rewind();
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 60, true);
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    source.on_finished(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    source.start();
    let mut t = ticks(Instant::now());

    assert!(source.pull_current_frame(t.next().unwrap()).is_some());
    assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    assert!(source.is_finished());
    assert!(!source.is_playing());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    assert_eq!(probe.rewinds(), 1);

    let polls = probe.polls();
    for _ in 0..3 {
        assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    }
    assert_eq!(probe.polls(), polls);
    assert_eq!(probe.rewinds(), 1);
}

#[test]
fn restart_after_finish_rewinds() {
    let decoder = ScriptedDecoder::solid(1, 8, 8);
    let probe = decoder.probe();
    let mut source = VideoFrameSource::new(decoder, 60, false);
    source.start();
    let mut t = ticks(Instant::now());
    source.pull_current_frame(t.next().unwrap());
    source.pull_current_frame(t.next().unwrap());
    assert!(source.is_finished());

    source.start();
    assert!(!source.is_finished());
    assert_eq!(probe.rewinds(), 1);
    assert!(source.pull_current_frame(t.next().unwrap()).is_some());
}

#[test]
fn pause_keeps_frame_and_stop_drops_decoder() {
    let mut source = VideoFrameSource::new(ScriptedDecoder::solid(3, 8, 8), 60, true);
    source.start();
    let mut t = ticks(Instant::now());
    source.pull_current_frame(t.next().unwrap());

    source.pause();
    assert!(source.pull_current_frame(t.next().unwrap()).is_none());
    assert!(source.current_frame().is_some());

    source.stop();
    assert!(source.is_stopped());
    assert!(source.current_frame().is_none());
    source.start();
    assert!(!source.is_playing());
}

fn y4m_bytes(width: u32, height: u32, frames: u8, header_extra: &str) -> Vec<u8> {
    let mut out = format!("YUV4MPEG2 W{width} H{height} F30:1 Ip A1:1 {header_extra}\n").into_bytes();
    let cw = width.div_ceil(2) as usize;
    let ch = height.div_ceil(2) as usize;
    for f in 0..frames {
        out.extend_from_slice(b"FRAME\n");
        out.extend(std::iter::repeat(f).take(width as usize * height as usize));
        out.extend((0..cw * ch).map(|i| 100 + i as u8));
        out.extend((0..cw * ch).map(|i| 200 + i as u8));
    }
    out
}

#[test]
fn y4m_converts_i420_to_nv12() {
    let mut reader = Y4mReader::new(Cursor::new(y4m_bytes(4, 2, 2, "C420jpeg"))).unwrap();
    assert_eq!(reader.frame_rate(), 30.0);

    let first = reader.next_frame().unwrap().unwrap();
    assert_eq!((first.width, first.height, first.sequence), (4, 2, 0));
    assert_eq!(first.luma, vec![0; 8]);
    assert_eq!(first.chroma, vec![100, 200, 101, 201]);

    let second = reader.next_frame().unwrap().unwrap();
    assert_eq!(second.luma, vec![1; 8]);
    assert_eq!(second.sequence, 1);
    assert!(reader.next_frame().unwrap().is_none());

    reader.rewind().unwrap();
    assert_eq!(reader.next_frame().unwrap().unwrap().luma, vec![0; 8]);
}

#[test]
fn y4m_odd_sizes_drop_last_chroma_column() {
    // 5x3 stores 3x2 chroma samples; NV12 keeps 2x1.
    let mut reader = Y4mReader::new(Cursor::new(y4m_bytes(5, 3, 1, ""))).unwrap();
    let frame = reader.next_frame().unwrap().unwrap();
    assert_eq!(frame.luma.len(), 15);
    assert_eq!(frame.chroma, vec![100, 200, 101, 201]);
}

#[test]
fn y4m_rejects_truncated_frames_and_bad_headers() {
    let mut bytes = y4m_bytes(4, 2, 1, "");
    bytes.truncate(bytes.len() - 1);
    let mut reader = Y4mReader::new(Cursor::new(bytes)).unwrap();
    assert!(matches!(reader.next_frame(), Err(DecodeError::Format(_))));

    assert!(matches!(
        Y4mReader::new(Cursor::new(y4m_bytes(4, 2, 1, "C422"))),
        Err(DecodeError::Unsupported(_))
    ));
    assert!(Y4mReader::new(Cursor::new(Vec::new())).is_err());
}

#[test]
fn y4m_rejects_frame_sizes_too_large_to_buffer() {
    for header in [
        "YUV4MPEG2 W4294967295 H4294967295 F30:1\n",
        "YUV4MPEG2 W16385 H16 F30:1\n",
    ] {
        assert!(matches!(
            Y4mReader::new(Cursor::new(header.as_bytes().to_vec())),
            Err(DecodeError::Unsupported(_))
        ));
    }
}

fn poll_until_frame(decoder: &mut ThreadedDecoder) -> Result<DecodePoll, DecodeError> {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        match decoder.poll_frame()? {
            DecodePoll::Pending if std::time::Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(1))
            }
            other => return Ok(other),
        }
    }
}

#[test]
fn threaded_decoder_delivers_frames_in_order() {
    let pattern = TestPattern::new(16, 8, 1000.0).with_length(3);
    let mut decoder = ThreadedDecoder::spawn(pattern).unwrap();
    for expected in 0..3 {
        match poll_until_frame(&mut decoder).unwrap() {
            DecodePoll::Frame(f) => assert_eq!(f.sequence, expected),
            other => panic!("expected frame {expected}, got {other:?}"),
        }
    }
    assert!(matches!(
        poll_until_frame(&mut decoder).unwrap(),
        DecodePoll::EndOfStream
    ));
}

#[test]
fn threaded_decoder_rewind_discards_stale_frames() {
    let pattern = TestPattern::new(16, 8, 1000.0).with_length(50);
    let mut decoder = ThreadedDecoder::spawn(pattern).unwrap();
    assert!(matches!(
        poll_until_frame(&mut decoder).unwrap(),
        DecodePoll::Frame(_)
    ));
    decoder.rewind().unwrap();
    match poll_until_frame(&mut decoder).unwrap() {
        DecodePoll::Frame(f) => assert_eq!(f.sequence, 0),
        other => panic!("expected first frame after rewind, got {other:?}"),
    }
}

#[test]
fn threaded_decoder_shuts_down_on_drop() {
    // Endless stream with a full queue; drop must still return.
    let decoder = ThreadedDecoder::spawn(TestPattern::new(16, 8, 1000.0)).unwrap();
    std::thread::sleep(Duration::from_millis(20));
    drop(decoder);
}
