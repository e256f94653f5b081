// Bundled shader sources and directory overrides.

use panosphere_core::shaders::{SPHERE_FRAG_GLSL, SPHERE_VERT_GLSL, SPHERE_WGSL};
use panosphere_core::{BundledShaders, SetupError, ShaderAssets, ShaderDir, ShaderStage};
use std::path::PathBuf;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("panosphere-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn bundled_sources_expose_the_shared_interface() {
    let wgsl = BundledShaders.wgsl().unwrap();
    for needle in ["vs_main", "fs_main", "@location(0) position", "@location(1) tex_coord"] {
        assert!(wgsl.contains(needle), "wgsl missing {needle}");
    }
    let vert = BundledShaders.glsl(ShaderStage::Vertex).unwrap();
    assert!(vert.contains("uniform mat4 mvp"));
    assert!(vert.contains("layout(location = 0) in vec3 position"));
    let frag = BundledShaders.glsl(ShaderStage::Fragment).unwrap();
    assert!(frag.contains("luma_tex") && frag.contains("chroma_tex"));
    assert_eq!(SPHERE_VERT_GLSL, vert);
    assert_eq!(SPHERE_FRAG_GLSL, frag);
    assert_eq!(SPHERE_WGSL, wgsl);
}

#[test]
fn shader_dir_reads_overrides() {
    let dir = scratch_dir("shaders-ok");
    std::fs::write(dir.join("sphere.wgsl"), "// custom wgsl").unwrap();
    std::fs::write(dir.join("sphere.vert"), "// custom vert").unwrap();
    std::fs::write(dir.join("sphere.frag"), "// custom frag").unwrap();

    let assets = ShaderDir::new(&dir);
    assert_eq!(assets.root(), dir.as_path());
    assert_eq!(assets.wgsl().unwrap(), "// custom wgsl");
    assert_eq!(assets.glsl(ShaderStage::Vertex).unwrap(), "// custom vert");
    assert_eq!(assets.glsl(ShaderStage::Fragment).unwrap(), "// custom frag");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn shader_dir_reports_missing_files() {
    let dir = scratch_dir("shaders-missing");
    std::fs::write(dir.join("sphere.wgsl"), "// only wgsl").unwrap();
    let assets = ShaderDir::new(&dir);
    assert!(assets.wgsl().is_ok());
    match assets.glsl(ShaderStage::Fragment) {
        Err(SetupError::ShaderAsset { name, .. }) => assert!(name.ends_with("sphere.frag")),
        other => panic!("expected missing asset, got {other:?}"),
    }
    std::fs::remove_dir_all(&dir).unwrap();
}
