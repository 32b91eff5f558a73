//! Document loading
//!
//! The engine never parses PDF itself. A [`PdfBackend`] opens the bytes and
//! answers page geometry, rasterization and text queries; the default backend
//! is MuPDF. Each render worker opens its own handle from the shared bytes,
//! because engine handles are not `Send`.

use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, info, warn};

use crate::error::{DocumentLoadError, PageRenderError};

use super::types::{Bitmap, PageSize, TextRun};

/// PDF files start with this marker
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Where the document comes from
#[derive(Clone, Debug)]
pub enum InputSource {
    Bytes(Vec<u8>),
    /// Base64 payload as transported from the host
    Base64(String),
    Path(PathBuf),
    Url(String),
}

impl InputSource {
    /// Resolve the input into raw bytes
    pub fn into_bytes(self) -> Result<Vec<u8>, DocumentLoadError> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Base64(encoded) => BASE64
                .decode(encoded.trim())
                .map_err(|e| DocumentLoadError::malformed(format!("invalid base64 payload: {e}"))),
            Self::Path(path) => std::fs::read(&path).map_err(|e| {
                DocumentLoadError::unsupported(format!("cannot read {}: {e}", path.display()))
            }),
            Self::Url(url) => Err(DocumentLoadError::unsupported(format!(
                "remote sources are not fetched: {url}"
            ))),
        }
    }
}

/// Opens documents. Cloned into every render worker.
pub trait PdfBackend: Clone + Send + 'static {
    type Document: LoadedDocument;

    fn open(&self, bytes: &[u8]) -> Result<Self::Document, DocumentLoadError>;
}

/// An open document handle. Page indices are 0-based here.
pub trait LoadedDocument {
    fn page_count(&self) -> usize;

    /// Intrinsic page size; the scale 1.0 reference
    fn page_size(&self, index: usize) -> Result<PageSize, PageRenderError>;

    /// Rasterize a page so that one document unit maps to `scale` pixels
    fn rasterize(&self, index: usize, scale: f32) -> Result<Bitmap, PageRenderError>;

    /// Text lines with their bounding boxes in document units
    fn text_runs(&self, index: usize) -> Result<Vec<TextRun>, PageRenderError>;
}

/// Geometry of a loaded document
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentInfo {
    /// Intrinsic size of every page, in page order
    pub page_sizes: Vec<PageSize>,
}

impl DocumentInfo {
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_sizes.len()
    }
}

/// A loaded document: the shared bytes, its geometry and the backend to
/// reopen it with
pub struct Document<B: PdfBackend> {
    backend: B,
    bytes: Arc<[u8]>,
    info: DocumentInfo,
}

impl<B: PdfBackend> Document<B> {
    #[must_use]
    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.info.page_count()
    }

    #[must_use]
    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PdfBackend> std::fmt::Debug for Document<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("bytes", &self.bytes.len())
            .field("pages", &self.info.page_count())
            .finish_non_exhaustive()
    }
}

/// Reject bytes that do not start with a PDF header
pub fn check_pdf_header(bytes: &[u8]) -> Result<(), DocumentLoadError> {
    if bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(DocumentLoadError::malformed("missing %PDF- header"))
    }
}

/// Resolves inputs into loaded documents
#[derive(Clone, Debug)]
pub struct DocumentSource<B: PdfBackend> {
    backend: B,
}

impl<B: PdfBackend> DocumentSource<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Load a document from any supported input
    pub fn load_input(&self, input: InputSource) -> Result<Document<B>, DocumentLoadError> {
        self.load(input.into_bytes()?)
    }

    /// Load a document from raw bytes.
    ///
    /// Page sizes are read eagerly. A page whose box cannot be read borrows the
    /// size of the nearest usable page before it, or US Letter when there is
    /// none, so the rest of the document stays usable.
    pub fn load(&self, bytes: Vec<u8>) -> Result<Document<B>, DocumentLoadError> {
        check_pdf_header(&bytes)?;

        let doc = self.backend.open(&bytes)?;
        let page_count = doc.page_count();
        if page_count == 0 {
            return Err(DocumentLoadError::unsupported("document has no pages"));
        }

        let mut page_sizes = Vec::with_capacity(page_count);
        let mut fallback: Option<PageSize> = None;
        for index in 0..page_count {
            match doc.page_size(index) {
                Ok(size) if size.is_usable() => {
                    fallback = Some(size);
                    page_sizes.push(size);
                }
                Ok(size) => {
                    warn!("Page {} has unusable size {size:?}", index + 1);
                    page_sizes.push(fallback.unwrap_or(PageSize::LETTER));
                }
                Err(e) => {
                    warn!("Failed to read size of page {}: {e}", index + 1);
                    page_sizes.push(fallback.unwrap_or(PageSize::LETTER));
                }
            }
        }
        debug!("Page sizes: {page_sizes:?}");
        info!("Loaded document: {page_count} pages, {} bytes", bytes.len());

        Ok(Document {
            backend: self.backend.clone(),
            bytes: Arc::from(bytes),
            info: DocumentInfo { page_sizes },
        })
    }
}

#[cfg(feature = "pdf")]
pub use self::mupdf_backend::{MupdfBackend, MupdfDocument};

#[cfg(feature = "pdf")]
mod mupdf_backend {
    use mupdf::text_page::TextBlockType;
    use mupdf::{Colorspace, Document, Matrix, Pixmap, TextPageFlags};

    use super::{LoadedDocument, PdfBackend};
    use crate::error::{DocumentLoadError, PageRenderError};
    use crate::pdf::types::{Bitmap, PageSize, TextRun};

    /// Backend rasterizing through MuPDF
    #[derive(Clone, Copy, Debug, Default)]
    pub struct MupdfBackend;

    pub struct MupdfDocument {
        doc: Document,
    }

    impl PdfBackend for MupdfBackend {
        type Document = MupdfDocument;

        fn open(&self, bytes: &[u8]) -> Result<MupdfDocument, DocumentLoadError> {
            let doc = Document::from_bytes(bytes, "application/pdf")
                .map_err(|e| DocumentLoadError::malformed(e.to_string()))?;
            if doc
                .needs_password()
                .map_err(|e| DocumentLoadError::malformed(e.to_string()))?
            {
                return Err(DocumentLoadError::unsupported("document is encrypted"));
            }
            Ok(MupdfDocument { doc })
        }
    }

    impl MupdfDocument {
        fn load(&self, index: usize) -> Result<mupdf::Page, PageRenderError> {
            let count = self.page_count();
            if index >= count {
                return Err(PageRenderError::NoSuchPage(index + 1));
            }
            Ok(self.doc.load_page(index as i32)?)
        }
    }

    impl LoadedDocument for MupdfDocument {
        fn page_count(&self) -> usize {
            self.doc.page_count().map_or(0, |n| n.max(0) as usize)
        }

        fn page_size(&self, index: usize) -> Result<PageSize, PageRenderError> {
            let bounds = self.load(index)?.bounds()?;
            Ok(PageSize::new(bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
        }

        fn rasterize(&self, index: usize, scale: f32) -> Result<Bitmap, PageRenderError> {
            let page = self.load(index)?;
            let rgb = Colorspace::device_rgb();
            let pixmap = page.to_pixmap(&Matrix::new_scale(scale, scale), &rgb, false, false)?;
            let pixels = pixmap_to_rgb(&pixmap)?;
            Ok(Bitmap {
                pixels,
                width_px: pixmap.width(),
                height_px: pixmap.height(),
            })
        }

        fn text_runs(&self, index: usize) -> Result<Vec<TextRun>, PageRenderError> {
            let page = self.load(index)?;
            let bounds = page.bounds()?;
            let text_page = page.to_text_page(TextPageFlags::empty())?;

            let mut runs = Vec::new();
            for block in text_page.blocks() {
                if block.r#type() != TextBlockType::Text {
                    continue;
                }
                for line in block.lines() {
                    let bbox = line.bounds();
                    let text: String = line.chars().filter_map(|ch| ch.char()).collect();
                    runs.push(TextRun {
                        text,
                        x: bbox.x0 - bounds.x0,
                        y: bbox.y0 - bounds.y0,
                        width: bbox.x1 - bbox.x0,
                        height: bbox.y1 - bbox.y0,
                    });
                }
            }
            Ok(runs)
        }
    }

    fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, PageRenderError> {
        let n = pixmap.n() as usize;
        if n < 3 {
            return Err(PageRenderError::generic(format!(
                "Unsupported pixmap format: {n} channels"
            )));
        }

        let width = pixmap.width() as usize;
        let height = pixmap.height() as usize;
        let stride = pixmap.stride() as usize;
        let samples = pixmap.samples();
        let row_bytes = width * n;
        let expected_min = stride.saturating_mul(height);
        if samples.len() < expected_min || row_bytes > stride {
            return Err(PageRenderError::generic("Pixmap buffer size mismatch"));
        }

        let mut out = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            let row_start = y * stride;
            let row = &samples[row_start..row_start + row_bytes];
            if n == 3 {
                out.extend_from_slice(row);
            } else {
                for px in row.chunks_exact(n) {
                    out.extend_from_slice(&px[..3]);
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadFailure;
    use crate::test_utils::FakeBackend;

    #[test]
    fn rejects_non_pdf_bytes() {
        let source = DocumentSource::new(FakeBackend::letter(3));
        let err = source.load(b"hello world".to_vec()).unwrap_err();
        assert_eq!(err.reason, LoadFailure::Malformed);
    }

    #[test]
    fn url_inputs_are_unsupported() {
        let source = DocumentSource::new(FakeBackend::letter(3));
        let err = source
            .load_input(InputSource::Url("https://example.com/a.pdf".into()))
            .unwrap_err();
        assert_eq!(err.reason, LoadFailure::Unsupported);
    }

    #[test]
    fn base64_input_round_trips() {
        let source = DocumentSource::new(FakeBackend::letter(2));
        let payload = BASE64.encode(FakeBackend::pdf_bytes());
        let doc = source.load_input(InputSource::Base64(payload)).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.info().page_sizes[1], PageSize::LETTER);

        let err = source
            .load_input(InputSource::Base64("!!not base64!!".into()))
            .unwrap_err();
        assert_eq!(err.reason, LoadFailure::Malformed);
    }

    #[test]
    fn empty_documents_are_unsupported() {
        let source = DocumentSource::new(FakeBackend::letter(0));
        let err = source.load(FakeBackend::pdf_bytes()).unwrap_err();
        assert_eq!(err.reason, LoadFailure::Unsupported);
    }

    #[test]
    fn unreadable_page_size_borrows_previous() {
        let backend = FakeBackend::with_sizes(vec![
            PageSize::new(0.0, 0.0),
            PageSize::new(300.0, 400.0),
            PageSize::new(500.0, 250.0),
            PageSize::new(0.0, 0.0),
        ]);
        let doc = DocumentSource::new(backend).load(FakeBackend::pdf_bytes()).unwrap();
        let sizes = &doc.info().page_sizes;
        // Nothing usable before the first page
        assert_eq!(sizes[0], PageSize::LETTER);
        assert_eq!(sizes[3], PageSize::new(500.0, 250.0));
    }

    #[test]
    fn header_check_accepts_only_pdf_bytes() {
        assert!(check_pdf_header(&FakeBackend::pdf_bytes()).is_ok());
        assert_eq!(
            check_pdf_header(b"<html>").unwrap_err().reason,
            LoadFailure::Malformed
        );
    }
}
