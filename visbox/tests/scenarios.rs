use std::sync::Arc;

use approx::assert_relative_eq;
use sophus::image::ImageSize;
use synthgen_core::{candidate::Candidate, mesh::Mesh, transform::Transform, PointCoordinates, Real};
use synthgen_sensor::{CameraPose, Projection};
use visbox::{
    estimator::{estimate_with_counts, EstimatorOptions},
    occlusion::{NoOcclusion, OcclusionStrategy, RayCastOcclusion},
    parse_label_line,
    ray_scene::TriangleScene,
    format_records, BoxSource, VisibilityResolverCfg,
};

fn camera_on_z(distance: Real, width: usize, height: usize) -> CameraPose {
    let mut camera = CameraPose::new(Projection::default(), ImageSize::new(width, height))
        .at(PointCoordinates::new(0.0, 0.0, distance));
    camera.look_at(&PointCoordinates::zeros());
    camera
}

fn cube(id: u32, label: &str, center: PointCoordinates, size: Real) -> Candidate {
    Candidate::target(id, label, Arc::new(Mesh::cube(size)), Transform::from_translation(center))
}

fn resolver(occlusion: OcclusionStrategy, visible_threshold: Real) -> visbox::VisibilityResolver {
    VisibilityResolverCfg {
        occlusion,
        visible_threshold,
        ..Default::default()
    }
    .finalize()
    .unwrap()
}

#[test]
fn lone_cube_is_fully_visible() {
    let camera = camera_on_z(10.0, 192, 108);
    let candidates = [cube(1, "cube", PointCoordinates::zeros(), 2.0)];

    for strategy in [OcclusionStrategy::RayCast, OcclusionStrategy::InstanceMask] {
        let records = resolver(strategy, 0.3).resolve_frame(&candidates, &camera);
        assert_eq!(records.len(), 1, "{strategy:?}");
        assert_relative_eq!(records[0].visible_fraction, 1.0, epsilon = 1e-9);
        let (cx, cy) = records[0].bbox.center();
        assert_relative_eq!(cx, 0.5, epsilon = 1e-9);
        assert_relative_eq!(cy, 0.5, epsilon = 1e-9);
    }
}

#[test]
fn enclosing_sphere_hides_the_cube() {
    let camera = camera_on_z(10.0, 192, 108);
    let candidates = [
        cube(1, "cube", PointCoordinates::zeros(), 2.0),
        Candidate::distractor(2, "shell", Arc::new(Mesh::uv_sphere(3.0, 16, 8)), Transform::identity()),
    ];

    for strategy in [OcclusionStrategy::RayCast, OcclusionStrategy::InstanceMask] {
        let resolver = resolver(strategy, 0.3);
        let occlusion = resolver.prepare_occlusion(&candidates, &camera);
        let (estimate, counts) =
            estimate_with_counts(&candidates[0], &camera, &occlusion, resolver.options());
        assert_eq!(counts.visible, 0, "{strategy:?}");
        assert_relative_eq!(estimate.fraction(), 0.0);
        assert!(resolver.resolve(&candidates, &camera, &occlusion).is_empty());
    }
}

#[test]
fn distractors_are_never_labelled() {
    let camera = camera_on_z(10.0, 192, 108);
    let candidates = [
        cube(1, "mug", PointCoordinates::new(-2.0, 0.0, 0.0), 1.0),
        Candidate::distractor(
            2,
            "clutter",
            Arc::new(Mesh::cube(1.0)),
            Transform::from_translation(PointCoordinates::new(2.0, 0.0, 0.0)),
        ),
    ];

    for strategy in [
        OcclusionStrategy::None,
        OcclusionStrategy::RayCast,
        OcclusionStrategy::InstanceMask,
    ] {
        let records = resolver(strategy, 0.3).resolve_frame(&candidates, &camera);
        let labels: Vec<_> = records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["mug"], "{strategy:?}");
    }
}

/// Twelve samples on a 3x2x2 grid, x in {-1, 0, 1}.
fn grid_block(id: u32, center: PointCoordinates) -> Candidate {
    let mut vertices = vec![];
    for x in [-1.0, 0.0, 1.0] {
        for y in [-1.0, 1.0] {
            for z in [-1.0, 1.0] {
                vertices.push(PointCoordinates::new(x, y, z));
            }
        }
    }
    Candidate::target(id, "block", Arc::new(Mesh::new(vertices, vec![])), Transform::from_translation(center))
}

fn orthographic_on_z() -> CameraPose {
    let mut camera = CameraPose::new(Projection::Orthographic { scale: 10.0 }, ImageSize::new(100, 100))
        .at(PointCoordinates::new(0.0, 0.0, 10.0));
    camera.look_at(&PointCoordinates::zeros());
    camera
}

#[test]
fn partly_off_screen_object_keeps_in_frustum_extent() {
    let camera = orthographic_on_z();
    let candidates = [grid_block(1, PointCoordinates::new(4.9, 0.0, 0.0))];

    let records = resolver(OcclusionStrategy::None, 0.3).resolve_frame(&candidates, &camera);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_relative_eq!(record.bbox.min_x, 0.89, epsilon = 1e-9);
    assert_relative_eq!(record.bbox.max_x, 0.99, epsilon = 1e-9);
    assert_relative_eq!(record.bbox.min_y, 0.4, epsilon = 1e-9);
    assert_relative_eq!(record.bbox.max_y, 0.6, epsilon = 1e-9);
    // measured against the unclamped in-front extent [0.89, 1.09]
    assert_relative_eq!(record.visible_fraction, 0.5, epsilon = 1e-9);
}

#[test]
fn mask_pixel_boxes_cover_the_visible_silhouette() {
    let camera = orthographic_on_z();
    // the wall hides every part of the ball right of x = 0.52
    let candidates = [
        Candidate::target(1, "ball", Arc::new(Mesh::uv_sphere(0.97, 16, 8)), Transform::identity()),
        Candidate::distractor(
            2,
            "wall",
            Arc::new(Mesh::cube(3.0)),
            Transform::from_translation(PointCoordinates::new(2.02, 0.0, 3.0)),
        ),
    ];
    let resolve = |box_source| {
        VisibilityResolverCfg {
            box_source,
            mask_sample_radius: 0,
            ..Default::default()
        }
        .finalize()
        .unwrap()
        .resolve_frame(&candidates, &camera)
    };

    let from_vertices = resolve(BoxSource::Vertices);
    let from_pixels = resolve(BoxSource::MaskPixels);
    assert_eq!(from_vertices.len(), 1);
    assert_eq!(from_pixels.len(), 1);
    assert_eq!(from_pixels[0].label, "ball");
    assert_relative_eq!(from_vertices[0].visible_fraction, from_pixels[0].visible_fraction);

    let (vertices, pixels) = (from_vertices[0].bbox, from_pixels[0].bbox);
    // last unblocked pixel column is 54 of 100
    assert_relative_eq!(pixels.max_x, 0.55, epsilon = 1e-9);
    assert!(vertices.max_x < pixels.max_x, "{vertices:?} {pixels:?}");
    assert!(pixels.contains(&vertices), "{vertices:?} {pixels:?}");
}

#[test]
fn threshold_is_strict() {
    let camera = orthographic_on_z();
    let candidates = [grid_block(1, PointCoordinates::new(4.9, 0.0, 0.0))];
    let fraction = resolver(OcclusionStrategy::None, 0.0).resolve_frame(&candidates, &camera)[0].visible_fraction;

    assert!(resolver(OcclusionStrategy::None, fraction)
        .resolve_frame(&candidates, &camera)
        .is_empty());
    assert_eq!(
        resolver(OcclusionStrategy::None, fraction - 1e-6)
            .resolve_frame(&candidates, &camera)
            .len(),
        1
    );
}

#[test]
fn boxes_stay_inside_the_image() {
    let camera = camera_on_z(10.0, 192, 108);
    let resolver = resolver(OcclusionStrategy::None, 0.0);
    for (i, x) in [-4.0, -3.0, -1.0, 0.0, 2.5, 3.5, 4.0].iter().enumerate() {
        let candidates = [cube(i as u32 + 1, "cube", PointCoordinates::new(*x, 1.5, 0.0), 2.0)];
        let occlusion = NoOcclusion;
        let (estimate, _) =
            estimate_with_counts(&candidates[0], &camera, &occlusion, resolver.options());
        assert!((0.0..=1.0).contains(&estimate.fraction()));
        if let Some(bbox) = estimate.bbox() {
            for v in [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y] {
                assert!((0.0..=1.0).contains(&v), "{x}: {bbox:?}");
            }
        }
    }
}

#[test]
fn blocker_removes_vertex_from_visible_set() {
    let camera = camera_on_z(10.0, 192, 108);
    let target = cube(1, "cube", PointCoordinates::zeros(), 2.0);
    let options = EstimatorOptions::default();

    let open = RayCastOcclusion::new(TriangleScene::from_candidates(&[target.clone()]), 0.01);
    let (_, before) = estimate_with_counts(&target, &camera, &open, &options);

    // small box on the segment from the (1, 1, 1) corner to the eye
    let corner = PointCoordinates::new(1.0, 1.0, 1.0);
    let blocker_center = corner + (PointCoordinates::new(0.0, 0.0, 10.0) - corner) * 0.5;
    let blocked = RayCastOcclusion::new(
        TriangleScene::from_candidates(&[target.clone(), cube(2, "blocker", blocker_center, 0.2)]),
        0.01,
    );
    let (_, after) = estimate_with_counts(&target, &camera, &blocked, &options);

    assert_eq!(before.visible, 4);
    assert_eq!(after.visible, 3);
    assert_eq!(after.in_front, before.in_front);
}

#[test]
fn resolved_frame_round_trips_through_label_lines() {
    let camera = camera_on_z(10.0, 192, 108);
    let candidates = [
        cube(1, "mug", PointCoordinates::new(-2.0, 0.5, 0.0), 1.0),
        cube(2, "car", PointCoordinates::new(1.5, -0.5, 0.0), 1.5),
    ];
    let records = resolver(OcclusionStrategy::RayCast, 0.3).resolve_frame(&candidates, &camera);
    let lines = format_records(&records);
    assert_eq!(lines.len(), 2);

    for (record, line) in records.iter().zip(&lines) {
        let parsed = parse_label_line(line).unwrap();
        let yolo = record.bbox.to_yolo();
        assert_eq!(parsed.label, record.label);
        assert!((parsed.bbox.center_x - yolo.center_x).abs() <= 1e-6);
        assert!((parsed.bbox.center_y - yolo.center_y).abs() <= 1e-6);
        assert!((parsed.bbox.width - yolo.width).abs() <= 1e-6);
        assert!((parsed.bbox.height - yolo.height).abs() <= 1e-6);
    }
    // mug sits left of centre and above it, so its image-space center_y is below 0.5
    let mug = parse_label_line(&lines[0]).unwrap();
    assert!(mug.bbox.center_x < 0.5);
    assert!(mug.bbox.center_y < 0.5);
}
