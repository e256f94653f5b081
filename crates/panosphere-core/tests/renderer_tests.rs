// Renderer state machine against the recording backend.

use panosphere_core::constants::DEFAULT_VIEWPORT;
use panosphere_core::math::{aspect_ratio, model_view_projection};
use panosphere_core::renderer::SkipReason;
use panosphere_core::testing::{contract, Command, RecordingBackend};
use panosphere_core::{
    BundledShaders, DrawOutcome, FrameError, IndexWidth, RendererState, SetupError, ShaderDir,
    SphereGeometry, SphereRenderer, VideoFrame,
};

fn setup(backend: RecordingBackend) -> SphereRenderer<RecordingBackend> {
    SphereRenderer::new(
        backend,
        &SphereGeometry::generate(20, 1.0),
        &BundledShaders,
        60.0,
    )
    .unwrap()
}

#[test]
fn recording_backend_meets_contract() {
    contract::run_all(RecordingBackend::new);
}

#[test]
fn construction_uploads_mesh_then_program() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let r = setup(backend);
    let [w, h] = DEFAULT_VIEWPORT;
    assert_eq!(
        log.commands(),
        vec![
            Command::UploadMesh {
                vertices: 11 * 21,
                indices: 10 * 20 * 6,
                index_width: IndexWidth::U16,
            },
            Command::BuildProgram,
            Command::Resize {
                width: w,
                height: h
            },
        ]
    );
    assert_eq!(r.state(), RendererState::Ready);
    let expected = model_view_projection(60.0, aspect_ratio(w as f32, h as f32).unwrap(), 0.0, 0.0);
    assert_eq!(r.mvp(), expected);
}

#[test]
fn empty_geometry_is_rejected() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let result = SphereRenderer::new(
        backend,
        &SphereGeometry::generate(1, 1.0),
        &BundledShaders,
        60.0,
    );
    assert!(matches!(result, Err(SetupError::EmptyGeometry)));
    assert!(log.commands().is_empty());
}

#[test]
fn program_failure_is_fatal_and_releases_mesh() {
    let backend = RecordingBackend::new().with_failing_program();
    let log = backend.log();
    let result = SphereRenderer::new(
        backend,
        &SphereGeometry::generate(8, 1.0),
        &BundledShaders,
        60.0,
    );
    assert!(matches!(result, Err(SetupError::ProgramLink(_))));
    assert_eq!(log.commands().last(), Some(&Command::ReleaseMesh));
}

#[test]
fn missing_shader_directory_is_fatal() {
    let dir = std::env::temp_dir().join("panosphere-no-such-shader-dir");
    let result = SphereRenderer::new(
        RecordingBackend::new(),
        &SphereGeometry::generate(8, 1.0),
        &ShaderDir::new(dir),
        60.0,
    );
    assert!(matches!(result, Err(SetupError::ShaderAsset { .. })));
}

#[test]
fn render_without_textures_only_clears() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = setup(backend);
    assert_eq!(
        r.render().unwrap(),
        DrawOutcome::Skipped(SkipReason::NoTextures)
    );
    assert_eq!(log.draws(), 0);
    assert_eq!(log.clears(), 1);
}

#[test]
fn draw_carries_current_mvp_and_bound_textures() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = setup(backend);
    r.set_viewport_size(300, 200);
    r.update_model_view_projection_matrix(0.1, 0.2);
    r.update_texture(&VideoFrame::filled(64, 32, 90, 128, 128).as_planar())
        .unwrap();
    r.render().unwrap();

    let Some(Command::Draw {
        mvp,
        luma,
        chroma,
        index_count,
        index_width,
    }) = log.last_draw()
    else {
        panic!("no draw recorded");
    };
    assert_eq!(mvp, model_view_projection(60.0, 1.5, 0.1, 0.2));
    assert_eq!((luma, chroma), (1, 2));
    assert_eq!(index_count, 10 * 20 * 6);
    assert_eq!(index_width, IndexWidth::U16);
}

#[test]
fn wide_meshes_draw_with_u32_indices() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = SphereRenderer::new(
        backend,
        &SphereGeometry::generate(400, 1.0),
        &BundledShaders,
        60.0,
    )
    .unwrap();
    r.update_texture(&VideoFrame::filled(8, 8, 90, 128, 128).as_planar())
        .unwrap();
    r.render().unwrap();
    assert!(matches!(
        log.last_draw(),
        Some(Command::Draw {
            index_width: IndexWidth::U32,
            index_count: 480_000,
            ..
        })
    ));
}

#[test]
fn frame_errors_surface_and_state_returns_to_ready() {
    let mut r = setup(RecordingBackend::new());
    r.backend_mut().fail_draw(Some(FrameError::Lost));
    assert_eq!(r.render(), Err(FrameError::Lost));
    assert_eq!(r.state(), RendererState::Ready);
    r.backend_mut().fail_draw(None);
    assert!(r.render().is_ok());
    assert_eq!(r.stats().frames, 2);
}

#[test]
fn drop_destroys_textures_before_mesh() {
    let backend = RecordingBackend::new();
    let log = backend.log();
    let mut r = setup(backend);
    r.update_texture(&VideoFrame::filled(16, 16, 90, 128, 128).as_planar())
        .unwrap();
    drop(r);

    assert!(log.live_textures().is_empty());
    let commands = log.commands();
    assert_eq!(commands.last(), Some(&Command::ReleaseMesh));
    let destroys = commands
        .iter()
        .filter(|c| matches!(c, Command::Destroy { .. }))
        .count();
    assert_eq!(destroys, 2);
}
