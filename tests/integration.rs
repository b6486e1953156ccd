use std::io::{Cursor, Write};

use image::{Rgb, RgbImage};
use watermark_patch::archive::{read_entries, repair_archive, write_archive};
use watermark_patch::batch::REPORT_HEADER;
use watermark_patch::{
    decode, encode_jpeg, BatchProcessor, BoundingBox, Detection, Detector, Error, RepairConfig,
    RepairEngine, RepairFailure, SearchRegion,
};

/// Reports a fixed box when the region's top-left pixel is bright.
struct BrightCornerDetector {
    bbox: BoundingBox,
    confidence: f32,
}

impl Detector for BrightCornerDetector {
    fn detect(
        &self,
        region: &RgbImage,
        threshold: f32,
    ) -> watermark_patch::Result<Vec<Detection>> {
        let bright = region.get_pixel(0, 0)[0] > 100;
        if bright && self.confidence >= threshold {
            Ok(vec![Detection::new(self.bbox, self.confidence)])
        } else {
            Ok(Vec::new())
        }
    }
}

fn detector() -> BrightCornerDetector {
    BrightCornerDetector {
        bbox: BoundingBox::new(10.0, 4.0, 40.0, 12.0),
        confidence: 0.8,
    }
}

fn jpeg(w: u32, h: u32, v: u8) -> Vec<u8> {
    encode_jpeg(&RgbImage::from_pixel(w, h, Rgb([v, v, v])), 95).unwrap()
}

fn zip_of(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    write_archive(
        Cursor::new(Vec::new()),
        entries.iter().map(|(n, d)| (*n, d.as_slice())),
    )
    .unwrap()
    .into_inner()
}

#[test]
fn archive_with_one_failing_pair_yields_partial_output() {
    let input = zip_of(&[
        ("batch/1-wm.jpg", jpeg(96, 64, 230)),
        ("batch/1-orig.jpg", jpeg(48, 32, 20)),
        ("batch/2-wm.jpg", jpeg(96, 64, 0)),
        ("batch/2-orig.jpg", jpeg(48, 32, 20)),
        ("batch/3-wm.png", jpeg(96, 64, 230)),
        ("batch/3-orig.jpg", jpeg(48, 32, 20)),
        ("batch/4-wm.jpg", jpeg(96, 64, 230)),
    ]);
    let processor = BatchProcessor::new(detector(), RepairConfig::default()).unwrap();

    let mut progress = Vec::new();
    let (archive, output) =
        repair_archive(&processor, &input, |p| progress.push(p.to_string())).unwrap();

    let entries = read_entries(&archive).unwrap();
    let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["1-wm.jpg", "3-wm.png"]);
    for (_, data) in &entries {
        assert_eq!(decode(data).unwrap().dimensions(), (96, 64));
    }

    let report = output.report();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(
        lines,
        [
            REPORT_HEADER,
            "  [SUCCESS] 1-wm.jpg - repair succeeded",
            "  [FAILURE] 2-wm.jpg - watermark not located in specified region",
            "  [SUCCESS] 3-wm.png - repair succeeded",
        ]
    );
    assert_eq!(progress.len(), 3);
    assert!(progress[1].contains("2/3"));
}

#[test]
fn archive_without_pairs_is_fatal() {
    let input = zip_of(&[
        ("a.jpg", jpeg(8, 8, 200)),
        ("b-wm.jpg", jpeg(8, 8, 200)),
        ("c-orig.jpg", jpeg(8, 8, 200)),
    ]);
    let processor = BatchProcessor::new(detector(), RepairConfig::default()).unwrap();
    let result = repair_archive(&processor, &input, |_| panic!("no task should start"));
    assert!(matches!(result, Err(Error::NoPairsFound)));
}

#[test]
fn corrupt_image_is_a_task_failure() {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts = zip::write::SimpleFileOptions::default();
    zip.start_file("x-wm.jpg", opts).unwrap();
    zip.write_all(b"garbage").unwrap();
    zip.start_file("x-orig.jpg", opts).unwrap();
    zip.write_all(&jpeg(8, 8, 10)).unwrap();
    let input = zip.finish().unwrap().into_inner();

    let processor = BatchProcessor::new(detector(), RepairConfig::default()).unwrap();
    let (archive, output) = repair_archive(&processor, &input, |_| {}).unwrap();
    assert!(read_entries(&archive).unwrap().is_empty());
    assert_eq!(output.results[0].outcome, Err(RepairFailure::Decode));
    assert!(output.report().ends_with("  [FAILURE] x-wm.jpg - decode failure"));
}

#[test]
fn threshold_above_all_confidences_matches_no_detection() {
    let engine = RepairEngine::new(detector());
    let strict = RepairConfig {
        confidence_threshold: 0.95,
        ..RepairConfig::default()
    };
    let wm = jpeg(96, 64, 230);
    let orig = jpeg(48, 32, 20);
    assert_eq!(
        engine.repair(&wm, &orig, &strict),
        Err(RepairFailure::NotLocated)
    );
}

#[test]
fn pixels_outside_patch_are_untouched() {
    let engine = RepairEngine::new(detector());
    let config = RepairConfig {
        search_region: SearchRegion::new(0.25, 0.5, 1.0, 1.0),
        width_expansion: 0.5,
        height_expansion: 1.0,
        ..RepairConfig::default()
    };
    #[allow(clippy::cast_possible_truncation)]
    let original = RgbImage::from_fn(120, 80, |x, y| {
        if x == 30 && y == 40 {
            Rgb([255, 255, 255])
        } else {
            Rgb([(x * 2) as u8, (y * 3) as u8, 128])
        }
    });
    let mut image = original.clone();
    let reference = RgbImage::from_pixel(60, 40, Rgb([0, 0, 0]));

    let rect = engine.repair_image(&mut image, &reference, &config).unwrap();

    // Search origin (30, 40); box (10,4)-(40,12) -> (40,44)-(70,52),
    // margins 30*0.5/2=7 and 8*1.0/2=4.
    assert_eq!(
        (rect.x_start, rect.y_start, rect.x_end, rect.y_end),
        (33, 40, 77, 56)
    );
    for (x, y, px) in image.enumerate_pixels() {
        let inside =
            (rect.x_start..rect.x_end).contains(&x) && (rect.y_start..rect.y_end).contains(&y);
        if inside {
            assert_eq!(*px, Rgb([0, 0, 0]), "({x},{y})");
        } else {
            assert_eq!(px, original.get_pixel(x, y), "({x},{y})");
        }
    }
}

#[test]
fn expansion_is_clipped_at_image_edges() {
    let engine = RepairEngine::new(BrightCornerDetector {
        bbox: BoundingBox::new(0.0, 20.0, 64.0, 32.0),
        confidence: 0.9,
    });
    let config = RepairConfig {
        search_region: SearchRegion::FULL,
        width_expansion: 4.0,
        height_expansion: 4.0,
        ..RepairConfig::default()
    };
    let mut image = RgbImage::from_pixel(64, 32, Rgb([200, 200, 200]));
    let reference = RgbImage::from_pixel(16, 8, Rgb([0, 0, 0]));
    let rect = engine.repair_image(&mut image, &reference, &config).unwrap();
    assert_eq!(
        (rect.x_start, rect.y_start, rect.x_end, rect.y_end),
        (0, 0, 64, 32)
    );
}
