//! End-to-end runs of the pipeline against a filesystem store.
//!
//! These tests verify that:
//! 1. Evidence files land in the expected directories with the expected names
//! 2. One record exists per rider without a helmet
//! 3. Recognition failures never abort the run
//! 4. Two runs over the same input produce the same report

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::cell::Cell;
use tempfile::tempdir;

use helmet_watch::detect::SidecarBackend;
use helmet_watch::store::OVERLAY_IMAGE_NAME;
use helmet_watch::{
    ArtifactKind, BoundingBox, FilesystemImageStore, ImageStore, InMemoryImageStore, Pipeline,
    RawDetection, RecognitionError, RecognitionResponse, NO_PLATE, PLATE_NOT_FOUND,
};

fn raw(label: &str, x1: i32, y1: i32, x2: i32, y2: i32) -> RawDetection {
    RawDetection::new(BoundingBox::new(x1, y1, x2, y2), label, 0.9)
}

fn street() -> RgbImage {
    RgbImage::from_fn(640, 640, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 120]))
}

fn street_detections() -> Vec<RawDetection> {
    vec![
        // Rider 0: helmet top-left corner inside.
        raw("rider", 0, 0, 100, 200),
        raw("helmet", 10, 10, 30, 30),
        // Rider 1: no helmet, centroid (250, 100).
        raw("rider", 200, 0, 300, 200),
        // Rider 2: no helmet, centroid (450, 300).
        raw("rider", 400, 200, 500, 400),
        raw("plate", 240, 200, 280, 220),
        raw("plate", 430, 410, 470, 430),
    ]
}

#[test]
fn writes_evidence_into_the_media_layout() -> Result<()> {
    let dir = tempdir()?;
    let mut store = FilesystemImageStore::new(dir.path())?;
    let recognizer = |_: &[u8]| -> Result<RecognitionResponse, RecognitionError> {
        Ok(RecognitionResponse::from_plates(["mh12de1433"]))
    };
    let pipeline = Pipeline::new(&recognizer);

    let out = pipeline.process_detections(&street(), street_detections(), &mut store)?;

    assert_eq!(out.report.len(), 2);
    assert_eq!(out.report.records[0].rider_index, 1);
    assert_eq!(out.report.records[0].plate_index, Some(0));
    assert_eq!(out.report.records[1].rider_index, 2);
    assert_eq!(out.report.records[1].plate_index, Some(1));

    let media = dir.path();
    assert!(media.join(OVERLAY_IMAGE_NAME).is_file());
    assert!(media
        .join("rider_without_helmet/rider_without_helmet_0.jpg")
        .is_file());
    assert!(media
        .join("rider_without_helmet/rider_without_helmet_1.jpg")
        .is_file());
    assert!(media.join("plates/plate_of_rider_0.jpg").is_file());
    assert!(media.join("plates/plate_of_rider_1.jpg").is_file());
    assert!(!media
        .join("rider_without_helmet/rider_without_helmet_2.jpg")
        .exists());

    let rider = image::open(media.join("rider_without_helmet/rider_without_helmet_1.jpg"))?;
    assert_eq!((rider.width(), rider.height()), (100, 200));

    let overlay = image::open(media.join(OVERLAY_IMAGE_NAME))?.to_rgb8();
    assert_eq!(overlay.dimensions(), (640, 640));
    assert_eq!(*overlay.get_pixel(200, 100), Rgb([0, 255, 0]));
    Ok(())
}

#[test]
fn recognition_failure_does_not_stop_later_riders() -> Result<()> {
    let calls = Cell::new(0);
    let recognizer = |_: &[u8]| -> Result<RecognitionResponse, RecognitionError> {
        calls.set(calls.get() + 1);
        if calls.get() == 1 {
            RecognitionResponse::from_json("{not json")
        } else {
            Ok(RecognitionResponse::from_plates(["dl3cab0001"]))
        }
    };
    let pipeline = Pipeline::new(&recognizer);
    let mut store = InMemoryImageStore::new();

    let out = pipeline.process_detections(&street(), street_detections(), &mut store)?;

    assert_eq!(calls.get(), 2);
    assert_eq!(out.report.records[0].plate_text, PLATE_NOT_FOUND);
    assert_eq!(out.report.records[1].plate_text, "DL3CAB0001");
    assert_eq!(store.names(ArtifactKind::PlateCrop).len(), 2);
    Ok(())
}

#[test]
fn shared_plate_and_missing_plates() -> Result<()> {
    let recognizer = helmet_watch::OfflineRecognizer;
    let pipeline = Pipeline::new(&recognizer);

    let mut store = InMemoryImageStore::new();
    let shared = pipeline.process_detections(
        &street(),
        vec![
            raw("rider", 0, 0, 100, 200),
            raw("rider", 120, 0, 220, 200),
            raw("plate", 90, 210, 130, 230),
        ],
        &mut store,
    )?;
    assert_eq!(shared.report.len(), 2);
    assert!(shared.report.iter().all(|r| r.plate_index == Some(0)));
    assert!(shared.report.iter().all(|r| r.plate_text == PLATE_NOT_FOUND));

    let mut store = InMemoryImageStore::new();
    let bare =
        pipeline.process_detections(&street(), vec![raw("rider", 0, 0, 100, 200)], &mut store)?;
    assert_eq!(bare.report.records[0].plate, NO_PLATE);
    assert!(store.names(ArtifactKind::PlateCrop).is_empty());
    Ok(())
}

#[test]
fn repeated_runs_produce_identical_reports() -> Result<()> {
    let recognizer = |_: &[u8]| -> Result<RecognitionResponse, RecognitionError> {
        Ok(RecognitionResponse::from_plates(["ka05mn7788"]))
    };
    let pipeline = Pipeline::new(&recognizer);
    let dir = tempdir()?;
    let mut store = FilesystemImageStore::new(dir.path())?;

    let first = pipeline.process_detections(&street(), street_detections(), &mut store)?;
    let second = pipeline.process_detections(&street(), street_detections(), &mut store)?;

    assert_eq!(first.report, second.report);
    assert_eq!(first.associations, second.associations);
    assert_eq!(first.annotated, second.annotated);
    Ok(())
}

#[test]
fn sidecar_detections_drive_a_full_run() -> Result<()> {
    let dir = tempdir()?;
    let sidecar = dir.path().join("frame.json");
    std::fs::write(
        &sidecar,
        r#"[
            {"bbox": [200.7, 0.2, 300.9, 200.0], "class_id": 2, "confidence": 0.88},
            {"bbox": [240, 200, 280, 220], "label": "plate", "confidence": 0.71},
            {"bbox": [0, 0, 20, 20], "label": "helmet", "confidence": 0.05}
        ]"#,
    )?;
    let mut detector = SidecarBackend::new(&sidecar).with_threshold(0.25);
    let recognizer = helmet_watch::OfflineRecognizer;
    let pipeline = Pipeline::new(&recognizer);
    let mut store = FilesystemImageStore::new(dir.path().join("media"))?;

    let out = pipeline.run(&mut detector, &street(), &mut store)?;

    assert_eq!(out.detections.riders.len(), 1);
    assert!(out.detections.helmets.is_empty());
    assert_eq!(out.report.len(), 1);
    assert_eq!(out.report.records[0].plate, "plate_of_rider_0.jpg");
    let plate = store.get(ArtifactKind::PlateCrop, "plate_of_rider_0.jpg")?;
    let plate = image::load_from_memory(&plate)?;
    assert_eq!((plate.width(), plate.height()), (40, 20));
    Ok(())
}
