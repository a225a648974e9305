//! End-to-end extraction scenarios.

use volsample::*;

/// Hexahedron corners of the NDC cube.
fn cube_points() -> Vec<DVec3> {
    vec![
        DVec3::new(-1.0, -1.0, -1.0),
        DVec3::new(1.0, -1.0, -1.0),
        DVec3::new(1.0, 1.0, -1.0),
        DVec3::new(-1.0, 1.0, -1.0),
        DVec3::new(-1.0, -1.0, 1.0),
        DVec3::new(1.0, -1.0, 1.0),
        DVec3::new(1.0, 1.0, 1.0),
        DVec3::new(-1.0, 1.0, 1.0),
    ]
}

/// `n^3` unit cubes over `[0, n]^3`, each split into six tetrahedra around
/// its main diagonal. Point variable `f = x + y + z`.
fn tet_block(n: usize) -> UnstructuredMesh {
    let m = n + 1;
    let mut points = Vec::with_capacity(m * m * m);
    for k in 0..m {
        for j in 0..m {
            for i in 0..m {
                points.push(DVec3::new(i as f64, j as f64, k as f64));
            }
        }
    }
    let id = |i: usize, j: usize, k: usize| i + m * (j + m * k);
    let mut cells = Vec::new();
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let c = [
                    id(i, j, k),
                    id(i + 1, j, k),
                    id(i + 1, j + 1, k),
                    id(i, j + 1, k),
                    id(i, j, k + 1),
                    id(i + 1, j, k + 1),
                    id(i + 1, j + 1, k + 1),
                    id(i, j + 1, k + 1),
                ];
                for [a, b] in [[1, 2], [2, 3], [3, 7], [7, 4], [4, 5], [5, 1]] {
                    cells.push(CellConnectivity::new(
                        CellType::Tetrahedron,
                        &[c[0], c[a], c[b], c[6]],
                    ));
                }
            }
        }
    }
    let f = points.iter().map(|p| p.x + p.y + p.z).collect();
    let mut mesh = UnstructuredMesh::new(points, cells).unwrap();
    mesh.add_variable(Variable::scalar("f", Centering::Point, f)).unwrap();
    mesh
}

#[test]
fn test_unit_cube_end_to_end() {
    let cells = vec![CellConnectivity::new(CellType::Hexahedron, &[0, 1, 2, 3, 4, 5, 6, 7])];
    let mut mesh = UnstructuredMesh::new(cube_points(), cells).unwrap();
    mesh.add_variable(Variable::scalar("v", Centering::Point, vec![1.0; 8])).unwrap();
    let map = OpacityMap::linear_ramp(Vec3::ONE, 0.0, 2.0);
    let options = RenderOptions::default()
        .with_resolution(UVec3::splat(4))
        .with_variable("v")
        .with_opacity_map(map.clone());

    let (volume, stats) = ExtractionPass::new(&mesh, ViewTransform::identity(), &options)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(stats.samples_written, 64);
    assert_eq!(volume.num_samples(), 64);
    for (_, sample) in volume.samples() {
        assert!((sample.values[0] - 1.0).abs() < 1e-12);
        assert!((sample.opacity - map.opacity(1.0)).abs() < 1e-9);
        assert_eq!(sample.hits, 1);
    }
}

#[test]
fn test_cell_beyond_far_plane_leaves_volume_unchanged() {
    let pts: [DVec3; 8] = std::array::from_fn(|p| cube_points()[p] + DVec3::new(0.0, 0.0, 6.0));
    let cell = HexahedronCell::uniform(pts, &[1.0]);
    let mut volume = Volume::new(UVec3::splat(4), 1).unwrap();
    let written = Extractor::default().extract(&CameraCell::Hexahedron(cell), CellRef::default(), &mut volume);
    assert_eq!(written, 0);
    assert_eq!(volume.num_samples(), 0);
}

#[test]
fn test_dominant_opacity_wins_in_any_order() {
    let options = RenderOptions::default()
        .with_resolution(UVec3::splat(2))
        .with_variable("v")
        .with_arbitrator(ArbitratorOptions::OpacityMap {
            variable: 0,
            map: OpacityMap::linear_ramp(Vec3::ONE, 0.0, 1.0),
        });
    let contributions = [(0, 0.3), (1, 0.8), (2, 0.1)];
    let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    for order in orders {
        let mut volume = Volume::from_options(&options).unwrap();
        for &slot in &order {
            let (cell, value) = contributions[slot];
            volume.accumulate(5, &[value], 1.0, CellRef::new(cell, 0));
        }
        let sample = volume.sample(5).unwrap();
        assert_eq!(sample.source.cell, 1, "order {order:?}");
        assert_eq!(sample.values[0], 0.8);
        assert_eq!(sample.hits, 3);
    }
}

#[test]
fn test_tetrahedra_interpolate_linear_field() {
    let mesh = tet_block(2);
    let view = ViewTransform::fit_bounds(&mesh.bounds());
    let options = RenderOptions::default()
        .with_resolution(UVec3::splat(6))
        .with_variable("f");
    let (volume, stats) = ExtractionPass::new(&mesh, view, &options).unwrap().run().unwrap();
    assert_eq!(stats.cells_visited, 48);
    assert_eq!(volume.num_samples(), 216);
    for (index, sample) in volume.samples() {
        let [i, j, k] = volume.ijk(index);
        // The view maps [0, 2] onto [-1, 1] on every axis.
        let object = volume.center(i, j, k) + DVec3::ONE;
        assert!((sample.values[0] - (object.x + object.y + object.z)).abs() < 1e-9);
        assert_eq!(sample.hits, 1);
    }
}

#[test]
fn test_parallel_matches_serial() {
    let mesh = tet_block(3);
    let view = ViewTransform::fit_bounds(&mesh.bounds());
    let options = RenderOptions::default()
        .with_resolution(UVec3::new(9, 7, 11))
        .with_variable("f")
        .with_record_candidates(true);
    let (serial, serial_stats) = ExtractionPass::new(&mesh, view, &options).unwrap().run().unwrap();
    for slabs in [2, 4, 11, 32] {
        let parallel_options = options.clone().with_parallel_slabs(slabs);
        let (parallel, stats) = ExtractionPass::new(&mesh, view, &parallel_options)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(stats, serial_stats);
        assert_eq!(parallel.bins(), serial.bins());
        let (a, b) = (serial.cell_list().unwrap(), parallel.cell_list().unwrap());
        assert_eq!(a.len(), b.len());
        for bin in 0..serial.num_bins() {
            assert!(a.candidates(bin).eq(b.candidates(bin)));
        }
    }
}

#[test]
fn test_point_cloud_splats() {
    let points = vec![DVec3::new(-0.5, 0.0, 0.0), DVec3::new(0.5, 0.0, 0.0), DVec3::new(0.0, 0.5, 0.2)];
    let cells = (0..points.len())
        .map(|p| CellConnectivity::new(CellType::Vertex, &[p]))
        .collect();
    let mut mesh = UnstructuredMesh::new(points, cells).unwrap();
    mesh.add_variable(Variable::scalar("mass", Centering::Cell, vec![1.0, 2.0, 3.0])).unwrap();
    let options = RenderOptions::default()
        .with_resolution(UVec3::splat(16))
        .with_variable("mass")
        .with_point_kernel(PointKernelOptions {
            radius: 0.2,
            ..PointKernelOptions::default()
        })
        .with_arbitrator(ArbitratorOptions::RawMinMax {
            variable: 0,
            mode: MinMax::Max,
        });
    let (volume, stats) = ExtractionPass::new(&mesh, ViewTransform::identity(), &options)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(stats.degenerate_skipped, 0);
    assert!(volume.num_samples() > 3);
    for (_, sample) in volume.samples() {
        assert!(sample.weight > 0.0 && sample.weight <= 1.0);
        assert!([1.0, 2.0, 3.0].contains(&sample.values[0]));
    }
}

#[test]
fn test_cancellation_stops_parallel_pass() {
    let mesh = tet_block(2);
    let token = CancelToken::new();
    let options = RenderOptions::default()
        .with_resolution(UVec3::splat(8))
        .with_variable("f")
        .with_parallel_slabs(4);
    let pass = ExtractionPass::new(&mesh, ViewTransform::fit_bounds(&mesh.bounds()), &options)
        .unwrap()
        .with_cancel_token(token.clone());
    assert!(pass.run().is_ok());
    token.cancel();
    assert!(matches!(pass.run(), Err(VolSampleError::Cancelled { .. })));
}

#[test]
fn test_render_produces_image() {
    init_logging();
    let mesh = tet_block(2);
    let options = RenderOptions::default()
        .with_resolution(UVec3::new(12, 10, 8))
        .with_variable("f")
        .with_opacity_map(OpacityMap::viridis_ramp(0.0, 6.0));
    let view = ViewTransform::fit_bounds(&mesh.bounds());
    let (image, stats) = render(&mesh, view, &options, &RayFunction::default()).unwrap();
    assert_eq!((image.width(), image.height()), (12, 10));
    assert!(stats.samples_written > 0);
    let centre = image.pixel(6, 5);
    assert!(centre.w > 0.0 && centre.w <= 1.0);
    assert!(centre.x <= centre.w + 1e-6);

    let flat = RayFunction::new(LightingModel::flat());
    let (unlit, _) = render(&mesh, view, &options, &flat).unwrap();
    assert_eq!(unlit.pixel(6, 5).w, centre.w);
}

#[test]
fn test_options_round_trip_through_json() {
    let options = RenderOptions::default()
        .with_resolution(UVec3::new(3, 4, 5))
        .with_variable("f")
        .with_arbitrator(ArbitratorOptions::RelativeValue {
            variable: 0,
            less_than: true,
            range: (0.0, 2.0),
        });
    let json = options.to_json().unwrap();
    assert_eq!(RenderOptions::from_json(&json).unwrap(), options);
    assert!(RenderOptions::from_json("{ not json").is_err());
}
