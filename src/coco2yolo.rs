use clap::Parser;
use log::{error, info};
use std::error::Error;

use crowd2yolo::coco_to_yolo;
use crowd2yolo::config::CocoToYoloArgs;
use crowd2yolo::io::read_coco_json;

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CocoToYoloArgs::parse();

    if let Err(e) = run(&args) {
        error!("Failed to convert COCO to YOLO: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CocoToYoloArgs) -> Result<(), Box<dyn Error>> {
    let coco = read_coco_json(&args.input)?;
    info!(
        "Read {} images and {} annotations from {}",
        coco.images.len(),
        coco.annotations.len(),
        args.input.display()
    );

    let written = coco_to_yolo(&coco, &args.labels_dir)?;
    info!("YOLO labels written to {} ({written} files)", args.labels_dir.display());
    Ok(())
}
