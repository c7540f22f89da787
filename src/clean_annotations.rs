use clap::Parser;
use log::{error, info};
use std::error::Error;

use crowd2yolo::config::CleanArgs;
use crowd2yolo::io::{read_csv_records, write_annotations_csv};
use crowd2yolo::{accepted_users, clean_annotations, CleaningStats};
use crowd2yolo::{AnnotationRecord, ImageMetaRecord, SubmissionRecord, UserScoreRecord};

fn main() {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CleanArgs::parse();

    if let Err(e) = run(&args) {
        error!("Failed to clean annotations: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CleanArgs) -> Result<(), Box<dyn Error>> {
    info!("Loading data...");
    let annotations: Vec<AnnotationRecord> = read_csv_records(&args.annotations)?;
    let submissions: Vec<SubmissionRecord> = read_csv_records(&args.submissions)?;
    let image_meta: Vec<ImageMetaRecord> = read_csv_records(&args.image_meta)?;
    let scores: Vec<UserScoreRecord> = read_csv_records(&args.scores)?;

    info!("Filtering users by score...");
    let accepted = accepted_users(&scores, args.score_threshold);

    info!("Cleaning annotations...");
    let mut stats = CleaningStats::default();
    let rows = clean_annotations(&annotations, &accepted, &submissions, &image_meta, &mut stats);
    stats.print_summary();

    write_annotations_csv(&args.output, &rows)?;
    info!(
        "Wrote {} cleaned annotations to {}",
        rows.len(),
        args.output.display()
    );
    Ok(())
}
