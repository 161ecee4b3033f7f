//! Checks and decoding applied to an uploaded review file before it is
//! forwarded to the backend as a new batch.

use std::io::{Cursor, Read};

use serde_json::Value;

use crate::backend::{BackendError, NewBatch};

pub const ACCEPTED_EXTENSIONS: [&str; 3] = [".zip", ".xml", ".json"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please select a file to upload")]
    NoFile,
    #[error("Please upload a ZIP, XML, or JSON file")]
    UnsupportedExtension(String),
    #[error("File is too large. The limit is {limit_mb} MB.")]
    TooLarge { limit_mb: usize },
    #[error("Invalid or malformed file. Please try again.")]
    Malformed(String),
    #[error("Invalid or malformed file. Please try again.")]
    Rejected(#[from] BackendError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Zip,
    Xml,
    Json,
}

/// Accepts `.zip`, `.xml` and `.json` names, case-insensitively.
pub fn check_extension(filename: &str) -> Result<FileKind, UploadError> {
    let lower = filename.to_lowercase();
    if lower.ends_with(".zip") {
        Ok(FileKind::Zip)
    } else if lower.ends_with(".xml") {
        Ok(FileKind::Xml)
    } else if lower.ends_with(".json") {
        Ok(FileKind::Json)
    } else {
        Err(UploadError::UnsupportedExtension(filename.to_string()))
    }
}

/// Builds the batch-creation body: the file's `reviews` array under the
/// original filename.
pub fn prepare_batch(filename: &str, kind: FileKind, data: &[u8]) -> Result<NewBatch, UploadError> {
    let text = match kind {
        FileKind::Zip => read_json_member(data)?,
        FileKind::Xml | FileKind::Json => String::from_utf8(data.to_vec())
            .map_err(|e| UploadError::Malformed(format!("not UTF-8 text: {}", e)))?,
    };

    let parsed: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| UploadError::Malformed(format!("invalid JSON: {}", e)))?;

    let reviews = match parsed.get("reviews") {
        Some(Value::Array(reviews)) => reviews.clone(),
        Some(_) => return Err(UploadError::Malformed("`reviews` is not an array".into())),
        None => return Err(UploadError::Malformed("missing `reviews` field".into())),
    };

    Ok(NewBatch {
        batch_name: filename.to_string(),
        reviews,
    })
}

/// Text of the first `.json` entry of a ZIP archive.
fn read_json_member(data: &[u8]) -> Result<String, UploadError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| UploadError::Malformed(format!("unreadable archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| UploadError::Malformed(format!("unreadable archive entry: {}", e)))?;
        if entry.is_dir() || !entry.name().to_lowercase().ends_with(".json") {
            continue;
        }
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| UploadError::Malformed(format!("{}: {}", entry.name(), e)))?;
        return Ok(text);
    }

    Err(UploadError::Malformed("archive holds no .json file".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn zip_with(name: &str, content: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn accepts_each_supported_extension() {
        assert_eq!(check_extension("a.zip").unwrap(), FileKind::Zip);
        assert_eq!(check_extension("A.XML").unwrap(), FileKind::Xml);
        assert_eq!(check_extension("reviews.Json").unwrap(), FileKind::Json);
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["reviews.csv", "reviews.json.txt", "zip", "notes"] {
            assert!(
                matches!(check_extension(name), Err(UploadError::UnsupportedExtension(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn json_file_is_wrapped_with_its_name() {
        let data = json!({ "reviews": [{ "username": "ann", "rating": 5 }] }).to_string();
        let batch = prepare_batch("shop.json", FileKind::Json, data.as_bytes()).unwrap();
        assert_eq!(batch.batch_name, "shop.json");
        assert_eq!(batch.reviews, vec![json!({ "username": "ann", "rating": 5 })]);
    }

    #[test]
    fn missing_reviews_field_is_malformed() {
        let err = prepare_batch("x.json", FileKind::Json, br#"{"items": []}"#).unwrap_err();
        assert!(matches!(err, UploadError::Malformed(_)));
        assert_eq!(err.to_string(), "Invalid or malformed file. Please try again.");
    }

    #[test]
    fn xml_markup_is_malformed() {
        let err = prepare_batch("x.xml", FileKind::Xml, b"<reviews/>").unwrap_err();
        assert!(matches!(err, UploadError::Malformed(_)));
    }

    #[test]
    fn zip_uses_first_json_member() {
        let data = zip_with("data/reviews.json", r#"{"reviews": [{"feedback": "good"}]}"#);
        let batch = prepare_batch("bundle.zip", FileKind::Zip, &data).unwrap();
        assert_eq!(batch.batch_name, "bundle.zip");
        assert_eq!(batch.reviews.len(), 1);
    }

    #[test]
    fn zip_without_json_is_malformed() {
        let data = zip_with("notes.txt", "hello");
        assert!(matches!(
            prepare_batch("bundle.zip", FileKind::Zip, &data),
            Err(UploadError::Malformed(_))
        ));
        assert!(matches!(
            prepare_batch("bundle.zip", FileKind::Zip, b"not a zip"),
            Err(UploadError::Malformed(_))
        ));
    }
}
