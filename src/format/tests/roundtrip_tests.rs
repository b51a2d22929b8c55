//! Write-then-read tests covering every object variant.

use std::path::{Path, PathBuf};

use crate::format::{GroundTruthCodec, WriteOptions};
use crate::model::{
    AnnotatedObject, CropRecord, FrameGroundTruth, FrameInfo, ObjectAttributes, Occlusion, Rect,
    ScribbleKind, ScribblePoint, SegmentationSource, bitmap_from_rows, foreground_count,
};

fn image_path(dir: &Path) -> PathBuf {
    dir.join("frame_0042.png")
}

/// A frame with one object of each segmentation type.
///
/// Attribute strings are already capitalized so they survive the
/// lower-case/capitalize normalisation unchanged.
fn create_frame() -> FrameGroundTruth {
    let mut frame = FrameGroundTruth::new(FrameInfo {
        illumination: "Daylight".to_string(),
        weather: "Rain".to_string(),
        road_type: "Highway".to_string(),
        road_event: "Roadworks".to_string(),
        country: "Germany".to_string(),
        wipers_visible: true,
        dirt_visible: false,
        image_distorted: true,
    });

    frame.commit(AnnotatedObject::bounding_box(
        Rect::new(10, 20, 30, 40),
        ObjectAttributes::new("Vehicle", "Car", "Sedan").with_occlusion(Occlusion::Quarter),
    ));

    let crop_a = CropRecord::new(Rect::new(100, 100, 2, 2))
        .with_scribbles(vec![
            ScribblePoint::new(0, 0, ScribbleKind::Object),
            ScribblePoint::new(1, 1, ScribbleKind::Background),
        ])
        .with_map(bitmap_from_rows(&[&[1, 0], &[0, 0]]));
    let crop_b = CropRecord::new(Rect::new(101, 101, 2, 2))
        .with_scribbles(vec![
            ScribblePoint::new(1, 1, ScribbleKind::Object),
            ScribblePoint::new(0, 1, ScribbleKind::Erase),
        ])
        .with_map(bitmap_from_rows(&[&[0, 0], &[0, 1]]));
    frame.commit(
        AnnotatedObject::scribble(
            vec![crop_a, crop_b],
            ObjectAttributes::new("Pedestrian", "Adult", "Walking").with_occlusion(Occlusion::Full),
        )
        .with_source(SegmentationSource::Automatic),
    );

    frame.commit(AnnotatedObject::polygon(
        vec![(50, 50), (60, 50), (65, 58), (55, 64), (48, 57)],
        ObjectAttributes::new("Sign", "Traffic", "Stop"),
    ));

    frame
}

fn write_and_read(frame: &FrameGroundTruth, options: WriteOptions) -> FrameGroundTruth {
    let dir = tempfile::tempdir().unwrap();
    let image = image_path(dir.path());
    GroundTruthCodec::with_options(options)
        .write(frame, &image)
        .expect("write should succeed");

    let (loaded, report) = GroundTruthCodec::new()
        .read(&image)
        .expect("read should succeed")
        .expect("ground truth should exist");
    assert!(report.found);
    assert!(!report.has_errors(), "unexpected warnings: {:?}", report.warnings);
    loaded
}

#[test]
fn test_frame_info_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::default());
    assert_eq!(loaded.info, original.info);
}

#[test]
fn test_object_list_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::default());

    assert_eq!(loaded.len(), original.len());
    for (orig, load) in original.objects().iter().zip(loaded.objects()) {
        assert_eq!(orig.object_id, load.object_id);
        assert_eq!(orig.attributes, load.attributes);
        assert_eq!(orig.source, load.source);
        assert_eq!(orig.bounding_rect(), load.bounding_rect());
    }
}

#[test]
fn test_bounding_box_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::default());
    assert_eq!(loaded.object(1), original.object(1));
}

#[test]
fn test_scribble_object_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::default());

    let orig = original.object(2).unwrap();
    let load = loaded.object(2).unwrap();

    // Object maps survive exactly.
    assert_eq!(orig.object_map(), load.object_map());
    assert_eq!(load.bounding_rect(), Some(Rect::new(100, 100, 3, 3)));

    // Crops come back in order with positions and scribbles; their local
    // maps are cut from the object map.
    assert_eq!(orig.crops().len(), load.crops().len());
    for (c_orig, c_load) in orig.crops().iter().zip(load.crops()) {
        assert_eq!(c_orig.position, c_load.position);
        assert_eq!(c_orig.scribbles, c_load.scribbles);
        assert_eq!(c_orig.object_map, c_load.object_map);
    }
}

#[test]
fn test_scribble_object_editable_after_reload() {
    let mut loaded = write_and_read(&create_frame(), WriteOptions::default());
    let object = loaded.object_mut(2).unwrap();
    assert_eq!(object.object_map().map(foreground_count), Some(2));

    let extra = CropRecord::new(Rect::new(110, 110, 1, 1)).with_map(bitmap_from_rows(&[&[1]]));
    assert!(object.push_crop(extra));
    assert_eq!(object.object_map().map(foreground_count), Some(3));
    assert_eq!(object.bounding_rect(), Some(Rect::new(100, 100, 11, 11)));

    assert!(object.remove_crop(2).is_some());
    assert_eq!(object.object_map().map(foreground_count), Some(2));
    assert_eq!(object.bounding_rect(), Some(Rect::new(100, 100, 3, 3)));
}

#[test]
fn test_polygon_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::default());
    assert_eq!(loaded.object(3), original.object(3));
}

#[test]
fn test_second_roundtrip_is_stable() {
    let original = create_frame();
    let once = write_and_read(&original, WriteOptions::default());
    let twice = write_and_read(&once, WriteOptions::default());
    assert_eq!(once, twice);
}

#[test]
fn test_frame_map_roundtrip() {
    let original = create_frame().with_frame_size(128, 96);
    let loaded = write_and_read(&original, WriteOptions::new().export_frame_map(true));

    let expected = original.render_frame_map(128, 96);
    assert_eq!(loaded.frame_size, Some((128, 96)));
    assert_eq!(loaded.frame_map.as_ref(), Some(&expected));
    assert_eq!(expected[[15, 25]], 1);
    assert_eq!(expected[[100, 100]], 2);
    assert_eq!(expected[[102, 102]], 2);
    assert_eq!(expected[[101, 101]], 0);
    assert_eq!(expected[[55, 55]], 3);
}

#[test]
fn test_compact_json_roundtrip() {
    let original = create_frame();
    let loaded = write_and_read(&original, WriteOptions::new().pretty_json(false));
    assert_eq!(loaded.info, original.info);
    assert_eq!(loaded.len(), 3);
}
