//! Runs the shared backend contract against wgpu rendering offscreen.
//! Machines without any adapter (including a software one) skip the suite.

use panosphere_core::math::rotation_x;
use panosphere_core::testing::contract;
use panosphere_core::{
    BundledShaders, DrawCall, FrameError, GpuBackend, IndexWidth, PlaneTextureDesc,
    SphereGeometry, SphereRenderer, TextureAllocator, TexturePair, VideoFrame,
};
use panosphere_native::backend::WgpuBackend;

fn headless() -> Option<WgpuBackend> {
    match pollster::block_on(WgpuBackend::headless(320, 240)) {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("skipping wgpu tests: {e}");
            None
        }
    }
}

#[test]
fn wgpu_backend_meets_contract() {
    let Some(first) = headless() else { return };
    let mut first = Some(first);
    contract::run_all(|| {
        first
            .take()
            .or_else(headless)
            .expect("adapter disappeared between checks")
    });
}

#[test]
fn wide_indices_are_drawn() {
    let Some(backend) = headless() else { return };
    // 400 slices produce more than 65536 vertices.
    let geometry = SphereGeometry::generate(400, 1.0);
    let mut renderer =
        SphereRenderer::new(backend, &geometry, &BundledShaders, 60.0).expect("setup");
    let frame = VideoFrame::filled(64, 32, 128, 128, 128);
    renderer.update_texture(&frame.as_planar()).expect("upload");
    assert_eq!(
        renderer.render().expect("draw"),
        panosphere_core::DrawOutcome::Drawn
    );
    assert_eq!(renderer.backend().name(), "wgpu");
}

#[test]
fn large_mesh_uploads_cleanly() {
    let Some(mut backend) = headless() else { return };
    let geometry = SphereGeometry::generate(400, 1.0);
    assert!(backend.upload_mesh(&geometry).is_ok());
    backend.release_mesh();
}

#[test]
fn draw_without_mesh_is_an_error() {
    let Some(mut backend) = headless() else { return };
    backend.build_program(&BundledShaders).expect("program");
    let frame = VideoFrame::filled(64, 32, 128, 128, 128);
    let planar = frame.as_planar();
    let luma = backend
        .allocate_texture(&PlaneTextureDesc::luma(&planar))
        .expect("luma");
    let chroma = backend
        .allocate_texture(&PlaneTextureDesc::chroma(&planar))
        .expect("chroma");
    let mvp = rotation_x(0.0);
    let result = backend.draw(DrawCall {
        mvp: &mvp,
        textures: TexturePair {
            luma: &luma,
            chroma: &chroma,
        },
        index_count: 6,
        index_width: IndexWidth::U16,
    });
    assert!(matches!(result, Err(FrameError::Backend(_))), "{result:?}");
}
