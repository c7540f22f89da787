//! Reading and writing the pipeline's on-disk artifacts: CSV tables, COCO
//! JSON documents and the YOLO dataset descriptor.

use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::coco::CocoFile;
use crate::types::{CleanAnnotationRow, CLEAN_CSV_HEADER};

/// Read a whole CSV table into typed records. A missing or malformed file
/// is fatal; per-row tolerance lives in the record types' serde attributes.
pub fn read_csv_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn Error>> {
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T = result.map_err(|e| format!("malformed row in {}: {e}", path.display()))?;
        records.push(record);
    }
    Ok(records)
}

/// Write the cleaned annotation table. The seven-column header is written
/// explicitly so the schema is fixed even for an empty table.
pub fn write_annotations_csv(path: &Path, rows: &[CleanAnnotationRow]) -> Result<(), Box<dyn Error>> {
    ensure_parent_directory(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
    writer.write_record(CLEAN_CSV_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse a COCO document from a JSON file stream.
pub fn read_coco_json(path: &Path) -> Result<CocoFile, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("failed to parse COCO JSON {}: {e}", path.display()).into())
}

/// Write a COCO document as pretty-printed JSON, creating parent
/// directories as needed.
pub fn write_coco_json(path: &Path, coco: &CocoFile) -> Result<(), Box<dyn Error>> {
    ensure_parent_directory(path)?;
    let mut writer = BufWriter::new(
        File::create(path).map_err(|e| format!("failed to create {}: {e}", path.display()))?,
    );
    serde_json::to_writer_pretty(&mut writer, coco)?;
    writer.flush()?;
    Ok(())
}

/// Create the YOLO dataset descriptor. The names mapping is ordered by
/// class index and must match the category id sort used during CSV to COCO
/// conversion, or class indices silently mismatch at training time.
pub fn create_dataset_yaml(
    path: &Path,
    train: &str,
    val: Option<&str>,
    names: &[&str],
) -> std::io::Result<()> {
    let mut content = format!("train: {train}\n");
    if let Some(val) = val {
        content.push_str(&format!("val: {val}\n"));
    }
    content.push_str(&format!("nc: {}\n", names.len()));
    content.push_str("names:\n");
    for (index, name) in names.iter().enumerate() {
        content.push_str(&format!("    {index}: {name}\n"));
    }

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(content.as_bytes())?;
    writer.flush()
}

fn ensure_parent_directory(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
