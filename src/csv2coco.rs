use clap::Parser;
use log::{error, info};
use std::error::Error;

use crowd2yolo::categories::category_names;
use crowd2yolo::config::CsvToCocoArgs;
use crowd2yolo::io::{create_dataset_yaml, read_csv_records, write_coco_json};
use crowd2yolo::{csv_to_coco, CleanAnnotationRow, DimensionSource, ImageMetaRecord};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CsvToCocoArgs::parse();

    if let Err(e) = run(&args) {
        error!("Failed to convert CSV to COCO: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CsvToCocoArgs) -> Result<(), Box<dyn Error>> {
    let rows: Vec<CleanAnnotationRow> = read_csv_records(&args.input)?;
    info!("Read {} annotation rows from {}", rows.len(), args.input.display());

    let mut dimensions = match &args.image_meta {
        Some(path) => {
            let image_meta: Vec<ImageMetaRecord> = read_csv_records(path)?;
            DimensionSource::from_image_meta(&image_meta)
        }
        None => DimensionSource::new(),
    };
    if let Some((width, height)) = args.fallback_size {
        dimensions = dimensions.with_fallback(width, height);
    }

    let coco = csv_to_coco(&rows, &dimensions)?;
    info!(
        "Built COCO document with {} images and {} annotations",
        coco.images.len(),
        coco.annotations.len()
    );
    write_coco_json(&args.output, &coco)?;
    info!("{} created", args.output.display());

    if let Some(yaml_path) = &args.dataset_yaml {
        create_dataset_yaml(
            yaml_path,
            &args.train_path,
            args.val_path.as_deref(),
            &category_names(),
        )?;
        info!("Dataset descriptor created at {}", yaml_path.display());
    }

    Ok(())
}
