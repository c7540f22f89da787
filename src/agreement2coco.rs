use clap::Parser;
use log::{error, info};
use std::collections::HashMap;
use std::error::Error;

use crowd2yolo::config::AgreementArgs;
use crowd2yolo::io::{read_csv_records, write_coco_json};
use crowd2yolo::{
    csv_to_coco, select_agreed_annotations, to_clean_row, AgreementMatrix, AnnotationRecord,
    CleaningStats, DimensionSource, ImageMetaRecord,
};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = AgreementArgs::parse();

    if let Err(e) = run(&args) {
        error!("Failed to export high-agreement annotations: {e}");
        std::process::exit(1);
    }
}

fn run(args: &AgreementArgs) -> Result<(), Box<dyn Error>> {
    let annotations: Vec<AnnotationRecord> = read_csv_records(&args.annotations)?;
    let matrix = AgreementMatrix::from_csv(&args.matrix)?;
    info!(
        "Read {} annotations and a {}x{} agreement matrix",
        annotations.len(),
        matrix.user_ids().len(),
        matrix.columns().len()
    );

    let agreed = matrix.agreed_regions();
    let selected = select_agreed_annotations(&annotations, &agreed);
    info!("{} annotations back the agreed regions", selected.len());

    let image_meta: Vec<ImageMetaRecord> = match &args.image_meta {
        Some(path) => read_csv_records(path)?,
        None => Vec::new(),
    };
    let meta_by_id: HashMap<i64, &ImageMetaRecord> =
        image_meta.iter().map(|m| (m.image_id, m)).collect();

    let mut stats = CleaningStats::default();
    let rows: Vec<_> = selected
        .iter()
        .map(|record| to_clean_row(record, meta_by_id.get(&record.image_id).copied(), &mut stats))
        .collect();
    if stats.missing_image_meta > 0 || stats.unknown_category > 0 {
        stats.print_summary();
    }

    let mut dimensions = DimensionSource::from_image_meta(&image_meta);
    if let Some((width, height)) = args.fallback_size {
        dimensions = dimensions.with_fallback(width, height);
    }

    let coco = csv_to_coco(&rows, &dimensions)?;
    write_coco_json(&args.output, &coco)?;
    info!("High-agreement COCO JSON created at {}", args.output.display());
    Ok(())
}
