//! End-to-end runs over real files in a temporary directory: raw exports
//! through cleaning, COCO conversion, YOLO label generation and the
//! prediction adapter.

use std::fs;
use std::path::Path;

use crowd2yolo::agreement::AgreementMatrix;
use crowd2yolo::categories::category_names;
use crowd2yolo::cleaning::clean_annotations;
use crowd2yolo::conversion::{coco_to_yolo, csv_to_coco, DimensionSource};
use crowd2yolo::detector::{predict_directory, JsonPredictionSource};
use crowd2yolo::io::{
    create_dataset_yaml, read_coco_json, read_csv_records, write_annotations_csv, write_coco_json,
};
use crowd2yolo::quality::accepted_users;
use crowd2yolo::types::{
    AnnotationRecord, CleanAnnotationRow, CleaningStats, ImageMetaRecord, SubmissionRecord,
    UserScoreRecord,
};
use crowd2yolo::{select_agreed_annotations, to_clean_row};

fn write_file(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

// Minimal 24-bit bottom-up BMP; only the header matters for dimension reads.
fn tiny_bmp(width: u32, height: u32) -> Vec<u8> {
    let row_bytes = ((width * 3 + 3) / 4) * 4;
    let data_size = row_bytes * height;
    let file_size = 54 + data_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 4]);
    bytes.extend_from_slice(&54u32.to_le_bytes());
    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&data_size.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 16]);
    bytes.resize(file_size as usize, 0);
    bytes
}

#[test]
fn raw_exports_to_yolo_labels() {
    let dir = tempfile::tempdir().unwrap();

    // Raw exports with pandas-style booleans and a mix of good and bad rows.
    let annotations_csv = dir.path().join("user_annotation.csv");
    write_file(
        &annotations_csv,
        "id,user_id,image_id,baseline_annotation_id,baseline_category_id,x,y,width,height,is_confirmed,is_deleted,is_label_changed,created_at\n\
         1,10,100,,2.0,10,20,40,60,True,False,False,2024-03-01 09:00:00\n\
         2,11,100,,2,10,20,40,60,True,False,False,2024-03-01 09:00:00\n\
         3,10,101,,2,10,20,40,60,True,False,False,2024-03-01 09:00:00\n\
         4,10,100,,99,10,20,40,60,True,False,False,2024-03-01 09:00:00\n\
         5,10,100,,2,10,20,40,60,True,True,False,2024-03-01 09:00:00\n\
         6,10,102,,2,10,20,40,60,True,False,False,2024-03-01 09:00:00\n",
    );

    let submissions_csv = dir.path().join("user_image.csv");
    write_file(
        &submissions_csv,
        "user_id,image_id,is_submitted\n\
         10,100,True\n\
         10,101,False\n\
         10,102,True\n\
         11,100,True\n",
    );

    let image_meta_csv = dir.path().join("image.csv");
    write_file(
        &image_meta_csv,
        "id,image_name,height,width\n\
         100,cam:01.jpg,1080,1920\n\
         101,cam:02.jpg,1080,1920\n",
    );

    // User 10 recovers above the threshold; user 11's latest score is low.
    let scores_csv = dir.path().join("user_progression_score.csv");
    write_file(
        &scores_csv,
        "user_id,ax_percentage_score,created_at\n\
         10,0.6,2024-01-01 10:00:00\n\
         10,0.85,2024-02-01 10:00:00\n\
         11,0.95,2023-01-01 10:00:00\n\
         11,0.5,2024-01-01 10:00:00\n",
    );

    let annotations: Vec<AnnotationRecord> = read_csv_records(&annotations_csv).unwrap();
    let submissions: Vec<SubmissionRecord> = read_csv_records(&submissions_csv).unwrap();
    let image_meta: Vec<ImageMetaRecord> = read_csv_records(&image_meta_csv).unwrap();
    let scores: Vec<UserScoreRecord> = read_csv_records(&scores_csv).unwrap();

    let accepted = accepted_users(&scores, 0.8);
    assert_eq!(accepted.len(), 1);
    assert!(accepted.contains(&10));

    let mut stats = CleaningStats::default();
    let rows = clean_annotations(&annotations, &accepted, &submissions, &image_meta, &mut stats);
    assert_eq!(stats.input_rows, 6);
    assert_eq!(stats.after_state_filter, 5);
    assert_eq!(stats.after_user_filter, 4);
    assert_eq!(stats.after_submission_filter, 3);
    assert_eq!(stats.unknown_category, 1);
    assert_eq!(stats.missing_image_meta, 1);

    // Round-trip the cleaned table through disk.
    let clean_csv = dir.path().join("train_annotations.csv");
    write_annotations_csv(&clean_csv, &rows).unwrap();
    let reread: Vec<CleanAnnotationRow> = read_csv_records(&clean_csv).unwrap();
    assert_eq!(reread, rows);

    // Convert to COCO using the real metadata dimensions.
    let dimensions = DimensionSource::from_image_meta(&image_meta);
    let coco = csv_to_coco(&reread, &dimensions).unwrap();
    assert_eq!(coco.images.len(), 1);
    assert_eq!(coco.images[0].file_name, "cam:01.jpg");
    assert_eq!(coco.annotations.len(), 1);
    assert_eq!(coco.annotations[0].bbox, [10.0, 20.0, 40.0, 60.0]);
    assert_eq!(coco.annotations[0].area, 2400.0);
    assert_eq!(coco.annotations[0].category_id, 2);

    // Through disk again, then expand to YOLO labels.
    let coco_path = dir.path().join("annotations/train.json");
    write_coco_json(&coco_path, &coco).unwrap();
    let reloaded = read_coco_json(&coco_path).unwrap();
    assert_eq!(reloaded, coco);

    let labels_dir = dir.path().join("labels/train");
    let written = coco_to_yolo(&reloaded, &labels_dir).unwrap();
    assert_eq!(written, 1);

    let label = fs::read_to_string(labels_dir.join("cam_01.txt")).unwrap();
    assert_eq!(label, "1 0.015625 0.046296 0.020833 0.055556\n");
}

#[test]
fn empty_clean_table_keeps_the_csv_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("train_annotations.csv");
    write_annotations_csv(&path, &[]).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content.lines().next(),
        Some("image_name,x_min,y_min,x_max,y_max,category_id,class_name")
    );
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn dataset_descriptor_lists_names_in_category_id_order() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_path = dir.path().join("dataset.yaml");
    create_dataset_yaml(&yaml_path, "../images/train", None, &category_names()).unwrap();

    let content = fs::read_to_string(&yaml_path).unwrap();
    assert!(content.contains("train: ../images/train"));
    assert!(!content.contains("val:"));
    assert!(content.contains("nc: 15"));
    assert!(content.contains("    0: Hatchback\n"));
    assert!(content.contains("    1: Sedan\n"));
    assert!(content.contains("    14: Others\n"));

    let with_val = dir.path().join("dataset_val.yaml");
    create_dataset_yaml(&with_val, "images/train", Some("images/val"), &category_names()).unwrap();
    assert!(fs::read_to_string(&with_val)
        .unwrap()
        .contains("val: images/val"));
}

#[test]
fn agreement_matrix_to_coco_export() {
    let dir = tempfile::tempdir().unwrap();

    let matrix_csv = dir.path().join("agreement_matrix.csv");
    write_file(
        &matrix_csv,
        "user_id,bbox=1,bbox=2,bbox=new_4\n\
         10,3,3,2\n\
         11,3,4,-1\n\
         12,-1,4,2\n",
    );

    let annotations_csv = dir.path().join("user_annotation.csv");
    write_file(
        &annotations_csv,
        "id,user_id,image_id,baseline_annotation_id,user_submitted_category_id,x,y,width,height,is_confirmed,is_deleted,is_label_changed,created_at\n\
         7,10,100,1,3,0,0,10,10,True,False,False,\n\
         8,11,100,1,3,1,1,10,10,True,False,False,\n\
         4,12,100,,2,2,2,10,10,True,False,False,\n\
         9,10,100,2,5,3,3,10,10,True,False,False,\n",
    );

    let matrix = AgreementMatrix::from_csv(&matrix_csv).unwrap();
    let agreed = matrix.agreed_regions();
    assert_eq!(agreed.len(), 2); // bbox=1 and bbox=new_4; bbox=2 disagrees

    let annotations: Vec<AnnotationRecord> = read_csv_records(&annotations_csv).unwrap();
    let selected = select_agreed_annotations(&annotations, &agreed);
    let ids: Vec<i64> = selected.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![7, 8, 4]);

    let image_meta = vec![ImageMetaRecord {
        image_id: 100,
        image_name: "cam_03.jpg".to_string(),
        height: 1080,
        width: 1920,
    }];
    let mut stats = CleaningStats::default();
    let rows: Vec<CleanAnnotationRow> = selected
        .iter()
        .map(|record| to_clean_row(record, image_meta.first(), &mut stats))
        .collect();

    let coco = csv_to_coco(&rows, &DimensionSource::from_image_meta(&image_meta)).unwrap();
    assert_eq!(coco.images.len(), 1);
    assert_eq!(coco.annotations.len(), 3);
    assert_eq!(coco.annotations[0].bbox, [0.0, 0.0, 10.0, 10.0]);
}

#[test]
fn prediction_directory_to_coco() {
    let dir = tempfile::tempdir().unwrap();
    let images_dir = dir.path().join("images");
    let predictions_dir = dir.path().join("predictions");
    fs::create_dir_all(&images_dir).unwrap();
    fs::create_dir_all(&predictions_dir).unwrap();

    fs::write(images_dir.join("a.bmp"), tiny_bmp(8, 6)).unwrap();
    fs::write(images_dir.join("b.bmp"), tiny_bmp(4, 4)).unwrap();

    // One confident detection, one below the threshold, one with a class
    // index the table does not know.
    write_file(
        &predictions_dir.join("a_predictions.json"),
        r#"[
            {"corner_box": {"x1": 1.0, "y1": 2.0, "x2": 5.0, "y2": 6.0}, "class_index": 1, "confidence": 0.9},
            {"corner_box": {"x1": 0.0, "y1": 0.0, "x2": 2.0, "y2": 2.0}, "class_index": 0, "confidence": 0.3},
            {"corner_box": {"x1": 0.0, "y1": 0.0, "x2": 1.0, "y2": 1.0}, "class_index": 42, "confidence": 0.8}
        ]"#,
    );

    let mut detector = JsonPredictionSource::new(&predictions_dir);
    let coco = predict_directory(&mut detector, &images_dir, 0.5).unwrap();

    assert_eq!(coco.images.len(), 2);
    assert_eq!(coco.images[0].file_name, "a.bmp");
    assert_eq!(coco.images[0].width, 8);
    assert_eq!(coco.images[0].height, 6);
    assert_eq!(coco.images[1].file_name, "b.bmp");

    assert_eq!(coco.annotations.len(), 2);
    assert_eq!(coco.annotations[0].bbox, [1.0, 2.0, 4.0, 4.0]);
    assert_eq!(coco.annotations[0].area, 16.0);
    assert_eq!(coco.annotations[0].category_id, 2);
    assert_eq!(coco.annotations[1].category_id, 15); // fallback to Others

    let output = dir.path().join("output/predictions.json");
    write_coco_json(&output, &coco).unwrap();
    assert!(output.exists());
}

#[test]
fn missing_input_directory_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut detector = JsonPredictionSource::new(dir.path().join("predictions"));
    let missing = dir.path().join("no_such_dir");
    assert!(predict_directory(&mut detector, &missing, 0.5).is_err());
}
