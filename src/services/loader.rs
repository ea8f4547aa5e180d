//! Document loading from files and uploaded byte streams.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::DocumentLoadError;
use crate::models::{Document, Page};
use crate::utils::{
    calculate_checksum, display_name, extension_of, is_text_extension, normalize_extracted_text,
};

/// Where a document comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// A file on disk.
    Path(PathBuf),
    /// An uploaded file held in memory. `name` supplies the extension.
    Bytes { name: String, bytes: Vec<u8> },
}

impl DocumentSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => display_name(path),
            Self::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Load a document, one [`Page`] per PDF page.
///
/// Plain-text files become a single page. The checksum covers the raw bytes,
/// so the same upload under a different name keeps its identity.
pub fn load(source: &DocumentSource) -> Result<Document, DocumentLoadError> {
    load_staged_in(source, &std::env::temp_dir())
}

/// Like [`load`], staging uploaded PDFs in `staging_dir`.
pub fn load_staged_in(
    source: &DocumentSource,
    staging_dir: &Path,
) -> Result<Document, DocumentLoadError> {
    match source {
        DocumentSource::Path(path) => load_path(path),
        DocumentSource::Bytes { name, bytes } => load_bytes(name, bytes, staging_dir),
    }
}

fn load_path(path: &Path) -> Result<Document, DocumentLoadError> {
    if !path.exists() {
        return Err(DocumentLoadError::NotFound(path.to_path_buf()));
    }

    let bytes = std::fs::read(path).map_err(|source| DocumentLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = display_name(path);
    let checksum = calculate_checksum(&bytes);

    match extension_of(&name).as_deref() {
        Some("pdf") => {
            let pages = extract_pdf_pages(path, &name)?;
            Ok(Document::new(name, checksum, pages))
        }
        Some(ext) if is_text_extension(ext) => text_document(name, checksum, bytes),
        other => Err(DocumentLoadError::Unsupported(
            other.map_or_else(|| name.clone(), |ext| format!(".{}", ext)),
        )),
    }
}

fn load_bytes(name: &str, bytes: &[u8], staging_dir: &Path) -> Result<Document, DocumentLoadError> {
    let checksum = calculate_checksum(bytes);

    match extension_of(name).as_deref() {
        Some("pdf") => {
            // Dropping the handle deletes the file on every exit path.
            let mut staged = tempfile::Builder::new()
                .prefix("aral-upload-")
                .suffix(".pdf")
                .tempfile_in(staging_dir)
                .map_err(DocumentLoadError::TempFile)?;
            staged
                .write_all(bytes)
                .and_then(|_| staged.flush())
                .map_err(DocumentLoadError::TempFile)?;
            debug!(name, path = %staged.path().display(), "staged upload");

            let pages = extract_pdf_pages(staged.path(), name)?;
            Ok(Document::new(name, checksum, pages))
        }
        Some(ext) if is_text_extension(ext) => text_document(name.to_string(), checksum, bytes.to_vec()),
        other => Err(DocumentLoadError::Unsupported(
            other.map_or_else(|| name.to_string(), |ext| format!(".{}", ext)),
        )),
    }
}

fn text_document(
    name: String,
    checksum: String,
    bytes: Vec<u8>,
) -> Result<Document, DocumentLoadError> {
    let text = String::from_utf8(bytes).map_err(|_| DocumentLoadError::InvalidText {
        name: name.clone(),
    })?;
    let text = text.replace("\r\n", "\n");
    Ok(Document::new(name, checksum, vec![Page { number: 1, text }]))
}

fn extract_pdf_pages(path: &Path, name: &str) -> Result<Vec<Page>, DocumentLoadError> {
    let pdf = lopdf::Document::load(path).map_err(|e| DocumentLoadError::Parse {
        name: name.to_string(),
        message: e.to_string(),
    })?;

    if pdf.is_encrypted() {
        return Err(DocumentLoadError::Encrypted(name.to_string()));
    }

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());

    for number in page_numbers {
        match pdf.extract_text(&[number]) {
            Ok(raw) => pages.push(Page {
                number,
                text: normalize_extracted_text(&raw),
            }),
            Err(e) => {
                warn!(name, page = number, error = %e, "skipping unreadable page");
            }
        }
    }

    debug!(name, pages = pages.len(), "extracted PDF text");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    fn sample_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let result = load(&DocumentSource::path("does/not/exist.pdf"));
        assert!(matches!(result, Err(DocumentLoadError::NotFound(_))));
    }

    #[test]
    fn test_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "Cells divide.\r\nMitosis has phases.").unwrap();

        let doc = load(&DocumentSource::path(&path)).unwrap();
        assert_eq!(doc.name, "notes.md");
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].text, "Cells divide.\nMitosis has phases.");
        assert_eq!(doc.checksum.len(), 64);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load(&DocumentSource::bytes("slides.pptx", vec![1, 2, 3]));
        assert!(matches!(result, Err(DocumentLoadError::Unsupported(_))));
    }

    #[test]
    fn test_invalid_utf8_text() {
        let result = load(&DocumentSource::bytes("notes.txt", vec![0xff, 0xfe, 0x00]));
        assert!(matches!(
            result,
            Err(DocumentLoadError::InvalidText { .. })
        ));
    }

    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let result = load(&DocumentSource::bytes("module.pdf", b"not a pdf".to_vec()));
        assert!(matches!(result, Err(DocumentLoadError::Parse { .. })));
    }

    #[test]
    fn test_pdf_pages_from_bytes() {
        let bytes = sample_pdf(&["Photosynthesis", "Respiration"]);
        let doc = load(&DocumentSource::bytes("module.pdf", bytes.clone())).unwrap();

        assert_eq!(doc.name, "module.pdf");
        assert_eq!(doc.pages.len(), 2);
        assert_eq!(doc.pages[0].number, 1);
        assert!(doc.pages[0].text.contains("Photosynthesis"));
        assert!(doc.pages[1].text.contains("Respiration"));
        assert_eq!(doc.checksum, calculate_checksum(&bytes));
    }

    fn staged_uploads(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("aral-upload-"))
            .count()
    }

    #[test]
    fn test_staged_upload_removed_on_success_and_failure() {
        let staging = tempfile::tempdir().unwrap();

        let garbage = DocumentSource::bytes("broken.pdf", b"%PDF-1.5 truncated".to_vec());
        assert!(load_staged_in(&garbage, staging.path()).is_err());
        assert_eq!(staged_uploads(staging.path()), 0);

        let valid = DocumentSource::bytes("module.pdf", sample_pdf(&["Meiosis"]));
        let doc = load_staged_in(&valid, staging.path()).unwrap();
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(staged_uploads(staging.path()), 0);
    }

    #[test]
    fn test_same_bytes_same_identity_across_sources() {
        let bytes = sample_pdf(&["Osmosis"]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renamed.pdf");
        std::fs::write(&path, &bytes).unwrap();

        let from_path = load(&DocumentSource::path(&path)).unwrap();
        let from_bytes = load(&DocumentSource::bytes("module.pdf", bytes)).unwrap();
        assert!(from_path.identity().same_content(&from_bytes.identity()));
    }
}
