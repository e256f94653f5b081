// Texture pool and uploader bookkeeping, driven through the recording backend.

use panosphere_core::testing::{Command, RecordingBackend};
use panosphere_core::texture::{PlaneTextureDesc, TexturePool, TextureUploader};
use panosphere_core::{PlaneIndex, TextureError, VideoFrame};

fn frame(width: u32, height: u32) -> VideoFrame {
    VideoFrame::filled(width, height, 80, 100, 150)
}

#[test]
fn three_updates_reuse_two_textures() {
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();

    for _ in 0..3 {
        uploader
            .update(&frame(64, 32).as_planar(), &mut pool, &mut backend)
            .unwrap();
        assert!(uploader.bound().is_some());
    }
    assert_eq!(log.count(|c| matches!(c, Command::Allocate { .. })), 2);
    assert_eq!(log.count(|c| matches!(c, Command::Write { .. })), 6);
    assert_eq!(log.live_textures().len(), 2);

    uploader.release(&mut pool, &mut backend);
    pool.purge(&mut backend);
    assert!(log.live_textures().is_empty());
    let stats = pool.stats();
    assert_eq!((stats.live, stats.idle), (0, 0));
}

#[test]
fn bound_pair_uses_distinct_planes() {
    let mut backend = RecordingBackend::new();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();
    uploader
        .update(&frame(64, 32).as_planar(), &mut pool, &mut backend)
        .unwrap();
    let pair = uploader.bound().unwrap();
    assert_eq!(pair.luma.desc.plane, PlaneIndex::Luma);
    assert_eq!(pair.chroma.desc.plane, PlaneIndex::Chroma);
    assert_ne!(pair.luma.id, pair.chroma.id);
    let (luma, chroma) = uploader.bound_descs().unwrap();
    assert_eq!(luma.row_bytes(), 64);
    assert_eq!(chroma.row_bytes(), 64);
}

#[test]
fn chroma_allocation_failure_releases_luma() {
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();
    backend.fail_allocation(Some(PlaneIndex::Chroma));

    let err = uploader
        .update(&frame(64, 32).as_planar(), &mut pool, &mut backend)
        .unwrap_err();
    assert!(matches!(
        err,
        TextureError::Allocation {
            plane: PlaneIndex::Chroma,
            ..
        }
    ));
    assert!(uploader.bound().is_none());
    assert_eq!(pool.stats().live, 0);
    assert_eq!(pool.stats().idle, 1);

    // Luma parks in the pool and is destroyed after two idle flushes.
    pool.flush(&mut backend);
    assert_eq!(log.live_textures().len(), 1);
    pool.flush(&mut backend);
    assert!(log.live_textures().is_empty());
}

#[test]
fn luma_failure_binds_nothing() {
    let mut backend = RecordingBackend::new();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();
    uploader
        .update(&frame(64, 32).as_planar(), &mut pool, &mut backend)
        .unwrap();

    backend.fail_allocation(Some(PlaneIndex::Luma));
    assert!(uploader
        .update(&frame(32, 32).as_planar(), &mut pool, &mut backend)
        .is_err());
    assert!(uploader.bound().is_none());
    assert_eq!(pool.stats().live, 0);
}

#[test]
fn idle_entries_expire_after_two_flushes() {
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();
    uploader
        .update(&frame(16, 16).as_planar(), &mut pool, &mut backend)
        .unwrap();
    uploader.release(&mut pool, &mut backend);
    assert_eq!(pool.stats().idle, 2);

    pool.flush(&mut backend);
    assert_eq!(pool.stats().idle, 2);
    pool.flush(&mut backend);
    assert_eq!(pool.stats().idle, 0);
    assert_eq!(pool.stats().destroyed_total, 2);
    assert!(log.live_textures().is_empty());
}

#[test]
fn acquire_validates_before_allocating() {
    let mut backend = RecordingBackend::new();
    let log = backend.log();
    let mut pool = TexturePool::new();
    let f = frame(8, 8);
    let planar = f.as_planar();
    let mut desc = PlaneTextureDesc::luma(&planar);
    desc.height = 9;

    let err = pool.acquire(&mut backend, desc, &planar.luma).unwrap_err();
    assert_eq!(
        err,
        TextureError::PlaneTooSmall {
            plane: PlaneIndex::Luma,
            required: 72,
            actual: 64
        }
    );
    assert!(log.commands().is_empty());
}

#[test]
fn odd_frame_dimensions_truncate_chroma_texture() {
    let mut backend = RecordingBackend::new();
    let mut pool = TexturePool::new();
    let mut uploader = TextureUploader::new();
    uploader
        .update(&frame(7, 5).as_planar(), &mut pool, &mut backend)
        .unwrap();
    let (luma, chroma) = uploader.bound_descs().unwrap();
    assert_eq!((luma.width, luma.height), (7, 5));
    assert_eq!((chroma.width, chroma.height), (3, 2));
}
