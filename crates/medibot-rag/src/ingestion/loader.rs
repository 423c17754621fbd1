//! Recursive PDF loader producing one document per page

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::types::RawDocument;

/// Loads every PDF under a root directory
pub struct PdfLoader {
    /// Directory scanned recursively
    root: PathBuf,
    /// Abort on the first unreadable file instead of skipping it
    fail_fast: bool,
}

impl PdfLoader {
    /// Create a skip-and-continue loader for `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fail_fast: false,
        }
    }

    /// Fail on the first unreadable PDF
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Load all PDFs under the root, one `RawDocument` per page.
    ///
    /// Files are visited in sorted order so the output is deterministic.
    pub fn load(&self) -> Result<Vec<RawDocument>> {
        let root_display = self.root.display().to_string();
        let meta = std::fs::metadata(&self.root)
            .map_err(|e| Error::load(&root_display, e.to_string()))?;
        if !meta.is_dir() {
            return Err(Error::load(&root_display, "not a directory"));
        }

        let mut documents = Vec::new();
        let mut files = 0usize;

        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // The root itself being unreadable is fatal; nested entries are not.
                    if e.depth() == 0 {
                        return Err(Error::load(&root_display, e.to_string()));
                    }
                    if self.fail_fast {
                        return Err(Error::load(&root_display, e.to_string()));
                    }
                    tracing::warn!("Skipping unreadable entry under {}: {}", root_display, e);
                    continue;
                }
            };

            let path = entry.path();
            if !entry.file_type().is_file() || !is_pdf(path) {
                continue;
            }

            match load_pdf_file(path) {
                Ok(pages) => {
                    tracing::debug!("Loaded {} page(s) from {}", pages.len(), path.display());
                    files += 1;
                    documents.extend(pages);
                }
                Err(e) if self.fail_fast => return Err(e),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        tracing::info!(
            "Loaded {} page document(s) from {} PDF file(s) under {}",
            documents.len(),
            files,
            root_display
        );

        Ok(documents)
    }
}

/// Extension predicate: `.pdf`, case-insensitive
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("pdf"))
}

/// Load one PDF file into per-page documents
pub fn load_pdf_file(path: &Path) -> Result<Vec<RawDocument>> {
    let source = path.to_string_lossy().to_string();
    let data = std::fs::read(path).map_err(|e| Error::load(&source, e.to_string()))?;
    let pages = extract_pages(&data).map_err(|message| Error::load(&source, message))?;

    let total_pages = pages.len() as u32;
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(i, text)| RawDocument::page(text, &source, i as u32, total_pages))
        .collect())
}

/// Extract text page by page.
///
/// Uses lopdf per page; falls back to whole-file extraction as a single page
/// when a page cannot be decoded.
pub fn extract_pages(data: &[u8]) -> std::result::Result<Vec<String>, String> {
    match extract_pages_lopdf(data) {
        Ok(pages) => Ok(pages),
        Err(lopdf_err) => {
            tracing::debug!("Per-page extraction failed ({}), trying whole-file", lopdf_err);
            pdf_extract::extract_text_from_mem(data)
                .map(|text| vec![text])
                .map_err(|e| format!("{}; fallback failed: {}", lopdf_err, e))
        }
    }
}

fn extract_pages_lopdf(data: &[u8]) -> std::result::Result<Vec<String>, String> {
    let doc = lopdf::Document::load_mem(data).map_err(|e| e.to_string())?;
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err("document has no pages".to_string());
    }

    page_numbers
        .into_iter()
        .map(|n| doc.extract_text(&[n]).map_err(|e| format!("page {}: {}", n, e)))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Build an in-memory PDF with one page per entry of `pages`
    pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
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

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(Path::new("data/book.pdf")));
        assert!(is_pdf(Path::new("data/BOOK.PDF")));
        assert!(!is_pdf(Path::new("data/notes.txt")));
        assert!(!is_pdf(Path::new("data/pdf")));
    }

    #[test]
    fn test_missing_directory_is_load_error() {
        let result = PdfLoader::new("/definitely/not/here").load();
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_file_root_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        std::fs::write(&file, b"x").unwrap();
        let result = PdfLoader::new(&file).load();
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_non_pdf_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "A fracture is a break.").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("readme.md"), "# hi").unwrap();

        let docs = PdfLoader::new(dir.path()).load().unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_corrupt_pdf_skipped_or_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"not a pdf at all").unwrap();

        let docs = PdfLoader::new(dir.path()).load().unwrap();
        assert!(docs.is_empty());

        let result = PdfLoader::new(dir.path()).with_fail_fast(true).load();
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_loads_pages_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("volume1");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("encyclopedia.pdf"),
            build_pdf(&["Fracture basics", "Bone healing", "Casts"]),
        )
        .unwrap();

        let docs = PdfLoader::new(dir.path()).load().unwrap();
        assert_eq!(docs.len(), 3);

        let expected_source = nested.join("encyclopedia.pdf").to_string_lossy().to_string();
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.source(), Some(expected_source.as_str()));
            assert_eq!(doc.metadata.get("page"), Some(&serde_json::json!(i)));
            assert_eq!(doc.metadata.get("total_pages"), Some(&serde_json::json!(3)));
        }
        assert!(docs[0].text.contains("Fracture basics"));
        assert!(docs[1].text.contains("Bone healing"));
    }
}
