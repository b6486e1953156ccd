//! Repair one image pair with a watermark box you already know.
//!
//! Usage:
//! ```sh
//! cargo run --example repair_pair -- 42-wm.jpg 42-orig.jpg out.jpg 900 1300 1180 1400
//! ```
//!
//! The box is given in full-image pixels; the search region is the whole
//! image, so no detection model is needed.

use std::env;
use std::process;

use image::RgbImage;
use watermark_patch::{
    BoundingBox, Detection, Detector, RepairConfig, RepairEngine, Result, SearchRegion,
};

/// Always reports the same box.
struct KnownBox(BoundingBox);

impl Detector for KnownBox {
    fn detect(&self, _region: &RgbImage, _threshold: f32) -> Result<Vec<Detection>> {
        Ok(vec![Detection::new(self.0, 1.0)])
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 8 {
        eprintln!(
            "Usage: {} <watermarked> <reference> <output> <x0> <y0> <x1> <y1>",
            args[0]
        );
        process::exit(1);
    }

    let parsed = args[4..8]
        .iter()
        .map(|s| s.parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>();
    let coords = match parsed {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: bad coordinate: {e}");
            process::exit(1);
        }
    };
    let known = BoundingBox::new(coords[0], coords[1], coords[2], coords[3]);

    let read = |path: &str| {
        std::fs::read(path).unwrap_or_else(|e| {
            eprintln!("Error: cannot read {path}: {e}");
            process::exit(1);
        })
    };
    let watermarked = read(&args[1]);
    let reference = read(&args[2]);

    let config = RepairConfig {
        search_region: SearchRegion::FULL,
        ..RepairConfig::default()
    };
    let engine = RepairEngine::new(KnownBox(known));
    match engine.repair(&watermarked, &reference, &config) {
        Ok(jpeg) => {
            if let Err(e) = std::fs::write(&args[3], jpeg) {
                eprintln!("Error: cannot write {}: {e}", args[3]);
                process::exit(1);
            }
            println!("Done: {}", args[3]);
        }
        Err(reason) => {
            eprintln!("Error: {reason}");
            process::exit(1);
        }
    }
}
