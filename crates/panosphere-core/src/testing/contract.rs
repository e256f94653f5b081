//! Behaviour every [`GpuBackend`] must show when driven by a
//! [`SphereRenderer`]. Checks only use the renderer's public surface so they
//! run unchanged against the recording backend and real GPU backends.
//!
//! Each check panics on violation, which makes them usable directly from
//! `#[test]` functions.

use crate::constants::CHROMA_TEXTURE_UNIT;
use crate::error::TextureError;
use crate::frame::{PlanarFrame, Plane, PlaneFormat, PlaneIndex, VideoFrame};
use crate::geometry::SphereGeometry;
use crate::renderer::{DrawOutcome, GpuBackend, RendererState, SkipReason, SphereRenderer};
use crate::shaders::BundledShaders;
use crate::video::TestPattern;

const SLICES: u32 = 16;

fn renderer<B: GpuBackend>(backend: B) -> SphereRenderer<B> {
    let geometry = SphereGeometry::generate(SLICES, 1.0);
    match SphereRenderer::new(backend, &geometry, &BundledShaders, 60.0) {
        Ok(r) => r,
        Err(e) => panic!("renderer setup failed: {e}"),
    }
}

fn pattern_frame(width: u32, height: u32) -> VideoFrame {
    TestPattern::new(width, height, 30.0).frame(0)
}

pub fn construction_reaches_ready<B: GpuBackend>(backend: B) {
    let r = renderer(backend);
    assert_eq!(r.state(), RendererState::Ready);
    assert_eq!(r.index_count(), (SLICES / 2) * SLICES * 6);
    assert!(!r.has_textures());
}

pub fn render_without_textures_skips_draw<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let outcome = r.render().expect("clear should succeed");
    assert_eq!(outcome, DrawOutcome::Skipped(SkipReason::NoTextures));
    assert_eq!(r.stats().draws, 0);
    assert_eq!(r.stats().skipped, 1);
    assert_eq!(r.state(), RendererState::Ready);
}

pub fn render_after_update_draws<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let frame = pattern_frame(64, 32);
    r.update_texture(&frame.as_planar()).expect("upload");
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    // Textures stay bound across ticks without a new frame.
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    assert_eq!(r.stats().draws, 2);
}

pub fn repeated_updates_do_not_leak<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let pattern = TestPattern::new(64, 32, 30.0);
    for i in 0..3 {
        r.update_texture(&pattern.frame(i).as_planar()).expect("upload");
        assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    }
    let stats = r.pool_stats();
    assert_eq!(stats.live, 2, "{stats:?}");
    assert_eq!(stats.idle, 0, "{stats:?}");
    assert_eq!(stats.allocated_total, 2, "{stats:?}");
    assert_eq!(stats.reused_total, 4, "{stats:?}");
    assert_eq!(stats.destroyed_total, 0, "{stats:?}");
}

pub fn size_change_reallocates<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");
    r.update_texture(&pattern_frame(32, 16).as_planar()).expect("upload");
    let stats = r.pool_stats();
    assert_eq!(stats.live, 2);
    assert_eq!(stats.allocated_total, 4);
    assert_eq!(stats.destroyed_total, 2);
    let (luma, chroma) = r.bound_textures().expect("bound");
    assert_eq!((luma.width, luma.height), (32, 16));
    assert_eq!((chroma.width, chroma.height), (16, 8));
}

pub fn render_after_size_change_draws<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    // The replaced pair is destroyed while its successor's writes are still queued.
    r.update_texture(&pattern_frame(32, 16).as_planar()).expect("upload");
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    r.update_texture(&pattern_frame(48, 24).as_planar()).expect("upload");
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
    assert_eq!(r.stats().draws, 3);
    assert_eq!(r.pool_stats().live, 2);
}

pub fn invalid_frame_leaves_nothing_bound<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");

    let good = pattern_frame(64, 32);
    let short_chroma = &good.chroma[..good.chroma.len() / 2];
    let bad = PlanarFrame {
        width: 64,
        height: 32,
        luma: good.as_planar().luma,
        chroma: Plane::new(short_chroma, good.chroma_stride()),
    };
    let err = r.update_texture(&bad).expect_err("short chroma must fail");
    assert!(matches!(
        err,
        TextureError::PlaneTooSmall {
            plane: PlaneIndex::Chroma,
            ..
        }
    ));
    assert!(!r.has_textures());
    assert_eq!(r.pool_stats().live, 0);
    assert_eq!(
        r.render().expect("clear"),
        DrawOutcome::Skipped(SkipReason::NoTextures)
    );
    assert_eq!(r.stats().texture_failures, 1);
}

pub fn odd_dimensions_truncate_chroma<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let frame = VideoFrame::filled(33, 17, 100, 90, 200);
    r.update_texture(&frame.as_planar()).expect("upload");
    let (luma, chroma) = r.bound_textures().expect("bound");
    assert_eq!((luma.width, luma.height, luma.format), (33, 17, PlaneFormat::R8));
    assert_eq!(
        (chroma.width, chroma.height, chroma.format),
        (16, 8, PlaneFormat::Rg8)
    );
    assert_eq!(chroma.plane.slot() as u32, CHROMA_TEXTURE_UNIT);
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
}

pub fn one_pixel_frame_is_rejected<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let frame = VideoFrame::filled(1, 1, 16, 128, 128);
    let err = r.update_texture(&frame.as_planar()).expect_err("empty chroma");
    assert!(matches!(
        err,
        TextureError::EmptyPlane {
            plane: PlaneIndex::Chroma,
            ..
        }
    ));
    assert!(!r.has_textures());
    assert_eq!(r.pool_stats().live, 0);
}

pub fn release_returns_everything<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");
    r.release_textures();
    let stats = r.pool_stats();
    assert_eq!((stats.live, stats.idle), (0, 0));
    assert_eq!(stats.destroyed_total, stats.allocated_total);
    assert_eq!(
        r.render().expect("clear"),
        DrawOutcome::Skipped(SkipReason::NoTextures)
    );
    // Mesh and program survive: a new frame draws again.
    r.update_texture(&pattern_frame(64, 32).as_planar()).expect("upload");
    assert_eq!(r.render().expect("draw"), DrawOutcome::Drawn);
}

pub fn viewport_changes_projection<B: GpuBackend>(backend: B) {
    let mut r = renderer(backend);
    let before = r.mvp();
    r.set_viewport_size(0, 480);
    assert_eq!(r.mvp(), before);
    r.set_viewport_size(1920, 1080);
    assert_eq!(r.viewport(), [1920, 1080]);
    assert_ne!(r.mvp(), before);
    r.update_model_view_projection_matrix(0.1, 0.2);
    let expected = crate::math::model_view_projection(60.0, 1920.0 / 1080.0, 0.1, 0.2);
    assert!(r.mvp().abs_diff_eq(expected, 1e-6));
}

/// Run every check, building a fresh backend for each.
pub fn run_all<B, F>(mut make: F)
where
    B: GpuBackend,
    F: FnMut() -> B,
{
    let checks: [(&str, fn(B)); 11] = [
        ("construction_reaches_ready", construction_reaches_ready::<B>),
        ("render_without_textures_skips_draw", render_without_textures_skips_draw::<B>),
        ("render_after_update_draws", render_after_update_draws::<B>),
        ("repeated_updates_do_not_leak", repeated_updates_do_not_leak::<B>),
        ("size_change_reallocates", size_change_reallocates::<B>),
        ("render_after_size_change_draws", render_after_size_change_draws::<B>),
        ("invalid_frame_leaves_nothing_bound", invalid_frame_leaves_nothing_bound::<B>),
        ("odd_dimensions_truncate_chroma", odd_dimensions_truncate_chroma::<B>),
        ("one_pixel_frame_is_rejected", one_pixel_frame_is_rejected::<B>),
        ("release_returns_everything", release_returns_everything::<B>),
        ("viewport_changes_projection", viewport_changes_projection::<B>),
    ];
    for (name, check) in checks {
        let backend = make();
        log::info!("[contract] {} on {}", name, backend.name());
        check(backend);
    }
}
