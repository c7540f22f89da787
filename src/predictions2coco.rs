use clap::Parser;
use log::{error, info};
use std::error::Error;

use crowd2yolo::config::PredictionsArgs;
use crowd2yolo::io::write_coco_json;
use crowd2yolo::{predict_directory, JsonPredictionSource};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = PredictionsArgs::parse();

    if let Err(e) = run(&args) {
        error!("Failed to export predictions: {e}");
        std::process::exit(1);
    }
}

fn run(args: &PredictionsArgs) -> Result<(), Box<dyn Error>> {
    let mut detector = JsonPredictionSource::new(&args.predictions_dir);
    let coco = predict_directory(&mut detector, &args.image_dir, args.min_confidence)?;
    info!(
        "Collected {} detections over {} images",
        coco.annotations.len(),
        coco.images.len()
    );

    write_coco_json(&args.output, &coco)?;
    info!("Saved results to {}", args.output.display());
    Ok(())
}
