// Sphere mesh invariants across the slice counts used in practice.

use panosphere_core::{IndexWidth, SphereGeometry};

const SLICE_COUNTS: [u32; 5] = [4, 10, 50, 200, 400];

#[test]
fn counts_follow_slice_formula() {
    for n in SLICE_COUNTS {
        let g = SphereGeometry::generate(n, 1.0);
        let n = n as usize;
        assert_eq!(g.vertex_count(), (n / 2 + 1) * (n + 1), "n = {n}");
        assert_eq!(g.tex_coords.len(), g.vertex_count(), "n = {n}");
        assert_eq!(g.index_count(), (n / 2) * n * 6, "n = {n}");
    }
}

#[test]
fn every_index_addresses_a_vertex() {
    for n in SLICE_COUNTS {
        let g = SphereGeometry::generate(n, 1.0);
        let vertex_count = g.vertex_count() as u32;
        assert!(g.indices.iter().all(|i| i < vertex_count), "n = {n}");
    }
}

#[test]
fn positions_lie_on_the_radius() {
    for n in SLICE_COUNTS {
        for radius in [1.0f32, 2.5] {
            let g = SphereGeometry::generate(n, radius);
            for p in &g.positions {
                let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
                assert!((len - radius).abs() < 1e-3 * radius, "n = {n}, len = {len}");
            }
        }
    }
}

#[test]
fn tex_coords_stay_in_unit_square() {
    for n in SLICE_COUNTS {
        let g = SphereGeometry::generate(n, 1.0);
        for t in &g.tex_coords {
            assert!((0.0..=1.0).contains(&t[0]) && (0.0..=1.0).contains(&t[1]));
        }
        assert_eq!(g.tex_coords.first(), Some(&[0.0, 0.0]));
        assert_eq!(g.tex_coords.last(), Some(&[1.0, 1.0]));
    }
}

#[test]
fn poles_sit_on_the_y_axis() {
    let g = SphereGeometry::generate(50, 1.0);
    assert!((g.positions[0][1] - 1.0).abs() < 1e-6);
    let south = g.positions[g.vertex_count() - 1];
    assert!((south[1] + 1.0).abs() < 1e-5);
    assert!(south[0].abs() < 1e-5 && south[2].abs() < 1e-5);
}

#[test]
fn generation_is_deterministic() {
    assert_eq!(
        SphereGeometry::generate(50, 1.0),
        SphereGeometry::generate(50, 1.0)
    );
}

#[test]
fn degenerate_slice_counts_yield_empty_mesh() {
    for n in [0, 1] {
        let g = SphereGeometry::generate(n, 1.0);
        assert!(g.is_empty());
        assert_eq!(g.vertex_count(), 0);
        assert_eq!(g.index_count(), 0);
    }
}

#[test]
fn byte_views_match_counts() {
    let g = SphereGeometry::generate(10, 1.0);
    assert_eq!(g.positions_bytes().len(), g.vertex_count() * 12);
    assert_eq!(g.tex_coords_bytes().len(), g.vertex_count() * 8);
    assert_eq!(g.indices.index_width(), IndexWidth::U16);
    assert_eq!(g.indices.as_bytes().len(), g.index_count() * 2);

    let wide = SphereGeometry::generate(400, 1.0);
    assert_eq!(wide.vertex_count(), 201 * 401);
    assert_eq!(wide.indices.as_bytes().len(), wide.index_count() * 4);
}
