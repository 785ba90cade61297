//! PDF document access backed by `lopdf`.
//!
//! Covers what the batch engine needs from a document library: page counts,
//! extracting a page range into a new document, appending documents, rotating
//! pages and saving either as-is or fully rewritten.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{dictionary, Document, IncrementalDocument, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, trace};

use crate::range::PageRange;

// Page attributes a page may inherit from its page tree ancestors
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Page {page} is out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("No documents to merge")]
    NothingToMerge,
}

impl From<lopdf::Error> for DocumentError {
    fn from(err: lopdf::Error) -> Self {
        DocumentError::Malformed(err.to_string())
    }
}

/// How a document is written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Keep the bytes the document was opened from and append an update
    /// section holding only the changed objects
    Incremental,
    /// Drop unreachable objects, renumber and compress streams
    Compact,
}

/// An open PDF document
#[derive(Clone)]
pub struct PdfDocument {
    inner: Document,
    /// File contents the document was loaded from, if any
    origin: Option<Vec<u8>>,
    /// Objects changed since loading
    modified: BTreeSet<ObjectId>,
}

impl fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfDocument")
            .field("pages", &self.page_count())
            .field("origin_len", &self.origin.as_ref().map(Vec::len))
            .field("modified", &self.modified)
            .finish()
    }
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        debug!(path = ?path, "Opening document");
        let open_error = |source: lopdf::Error| DocumentError::Open {
            path: path.to_path_buf(),
            source,
        };

        let bytes = fs::read(path).map_err(|e| open_error(lopdf::Error::IO(e)))?;
        let inner = Document::load_mem(&bytes).map_err(open_error)?;
        Ok(Self {
            inner,
            origin: Some(bytes),
            modified: BTreeSet::new(),
        })
    }

    fn from_document(inner: Document) -> Self {
        Self {
            inner,
            origin: None,
            modified: BTreeSet::new(),
        }
    }

    /// A document with an empty page tree, used as a merge target
    pub fn empty() -> Self {
        let mut inner = Document::with_version("1.5");
        let pages_id = inner.new_object_id();
        inner.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => Object::Integer(0),
            }),
        );
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);
        Self::from_document(inner)
    }

    pub fn page_count(&self) -> u32 {
        self.inner.get_pages().len() as u32
    }

    /// Copy of this document holding only the pages in `range`
    ///
    /// The range end is clamped to the last page; a start past the end is an error.
    pub fn extract_range(&self, range: PageRange) -> Result<PdfDocument, DocumentError> {
        let count = self.page_count();
        if range.start >= count {
            return Err(DocumentError::PageOutOfRange {
                page: range.start + 1,
                count,
            });
        }
        let range = range.clamp_to(count);

        let outside: Vec<u32> = (1..=count)
            .filter(|n| *n < range.start + 1 || *n > range.end + 1)
            .collect();

        trace!(start = range.start, end = range.end, removed = outside.len(), "Extracting range");

        let mut inner = self.inner.clone();
        inner.delete_pages(&outside);
        inner.prune_objects();
        Ok(PdfDocument::from_document(inner))
    }

    /// Graft every page of `other` onto the end of this document
    pub fn append(&mut self, other: PdfDocument) -> Result<(), DocumentError> {
        let mut other = other.inner;
        other.renumber_objects_with(self.inner.max_id + 1);

        let other_pages: Vec<ObjectId> = other.get_pages().into_values().collect();
        let mut grafted = Vec::with_capacity(other_pages.len());
        for page_id in &other_pages {
            let mut page = other.get_object(*page_id)?.as_dict()?.clone();
            for key in INHERITABLE_KEYS {
                if page.get(key).is_err() {
                    if let Some(value) = inherited_attribute(&other, *page_id, key) {
                        page.set(key.to_vec(), value);
                    }
                }
            }
            grafted.push((*page_id, page));
        }

        let pages_root = self.pages_root()?;
        let max_id = other.max_id;

        for (id, object) in other.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    self.inner.objects.insert(id, object);
                }
            }
        }

        for (id, mut page) in grafted.iter().cloned() {
            page.set("Parent", pages_root);
            self.inner.objects.insert(id, Object::Dictionary(page));
        }

        let pages = self.inner.get_object_mut(pages_root)?.as_dict_mut()?;
        let mut kids = pages
            .get(b"Kids")
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default();
        let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        kids.extend(grafted.iter().map(|(id, _)| Object::Reference(*id)));
        pages.set("Kids", kids);
        pages.set("Count", Object::Integer(count + grafted.len() as i64));

        self.inner.max_id = self.inner.max_id.max(max_id);
        debug!(pages = grafted.len(), "Appended document");
        Ok(())
    }

    /// Rotate one page (0-indexed) clockwise by `degrees`, normalised to a multiple of 90
    pub fn rotate_page(&mut self, page_index: u32, degrees: i64) -> Result<(), DocumentError> {
        let count = self.page_count();
        let page_id = *self
            .inner
            .get_pages()
            .get(&(page_index + 1))
            .ok_or(DocumentError::PageOutOfRange {
                page: page_index + 1,
                count,
            })?;

        let inherited = inherited_attribute(&self.inner, page_id, b"Rotate")
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let page = self.inner.get_object_mut(page_id)?.as_dict_mut()?;
        let current = page.get(b"Rotate").and_then(Object::as_i64).unwrap_or(inherited);
        let quarter_turns = (degrees / 90).rem_euclid(4);
        let rotation = (current + quarter_turns * 90).rem_euclid(360);
        page.set("Rotate", Object::Integer(rotation));
        self.modified.insert(page_id);

        trace!(page = page_index, rotation, "Rotated page");
        Ok(())
    }

    /// Effective `/Rotate` of one page (0-indexed), including inherited values
    pub fn page_rotation(&self, page_index: u32) -> Result<i64, DocumentError> {
        let count = self.page_count();
        let page_id = *self
            .inner
            .get_pages()
            .get(&(page_index + 1))
            .ok_or(DocumentError::PageOutOfRange {
                page: page_index + 1,
                count,
            })?;

        let own = self
            .inner
            .get_object(page_id)?
            .as_dict()?
            .get(b"Rotate")
            .and_then(Object::as_i64)
            .ok();

        Ok(own
            .or_else(|| {
                inherited_attribute(&self.inner, page_id, b"Rotate").and_then(|o| o.as_i64().ok())
            })
            .unwrap_or(0))
    }

    /// Write to `path`, creating its parent directory if needed
    ///
    /// An incremental save of a document that was not loaded from a file
    /// (an extracted range, a merge target) writes the whole document.
    pub fn save(&mut self, path: &Path, mode: SaveMode) -> Result<(), DocumentError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| DocumentError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let save_error = |source: std::io::Error| DocumentError::Save {
            path: path.to_path_buf(),
            source,
        };

        match (mode, &self.origin) {
            (SaveMode::Incremental, Some(origin)) => {
                self.save_incremental(path, origin).map_err(save_error)?;
            }
            (SaveMode::Incremental, None) => {
                self.inner.save(path).map_err(save_error)?;
            }
            (SaveMode::Compact, _) => {
                self.inner.prune_objects();
                self.inner.renumber_objects();
                self.inner.compress();
                self.inner.save(path).map_err(save_error)?;
            }
        }

        // Later incremental saves build on what was just written; a compacted
        // document no longer matches any earlier file layout
        self.origin = match mode {
            SaveMode::Incremental => fs::read(path).ok(),
            SaveMode::Compact => None,
        };
        self.modified.clear();

        debug!(path = ?path, mode = ?mode, "Saved document");
        Ok(())
    }

    fn save_incremental(&self, path: &Path, origin: &[u8]) -> std::io::Result<()> {
        if self.modified.is_empty() {
            return fs::write(path, origin);
        }

        let previous = Document::load_mem(origin)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let mut update = IncrementalDocument::create_from(origin.to_vec(), previous);
        for id in &self.modified {
            if let Ok(object) = self.inner.get_object(*id) {
                update.new_document.objects.insert(*id, object.clone());
            }
        }

        update.save(path)?;
        trace!(objects = self.modified.len(), "Appended update section");
        Ok(())
    }

    /// Text of one page (0-indexed) from the embedded text layer
    pub fn page_text(&self, page_index: u32) -> Result<String, DocumentError> {
        let count = self.page_count();
        if page_index >= count {
            return Err(DocumentError::PageOutOfRange {
                page: page_index + 1,
                count,
            });
        }
        Ok(self.inner.extract_text(&[page_index + 1])?)
    }

    fn pages_root(&self) -> Result<ObjectId, DocumentError> {
        let root = self.inner.trailer.get(b"Root")?.as_reference()?;
        let catalog = self.inner.get_object(root)?.as_dict()?;
        Ok(catalog.get(b"Pages")?.as_reference()?)
    }
}

/// Look `key` up on the page's ancestors
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc
        .get_object(page_id)
        .ok()?
        .as_dict()
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok();

    // Guard against cyclic parent chains in broken files
    let mut depth = 0;
    while let Some(node_id) = current {
        if depth > 64 {
            break;
        }
        let node = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    None
}

/// Append `sources` in order into one document and save it compacted at `output`
pub fn merge_documents(sources: &[PathBuf], output: &Path) -> Result<u32, DocumentError> {
    if sources.is_empty() {
        return Err(DocumentError::NothingToMerge);
    }

    let mut merged = PdfDocument::empty();
    for source in sources {
        merged.append(PdfDocument::open(source)?)?;
    }

    let pages = merged.page_count();
    merged.save(output, SaveMode::Compact)?;
    Ok(pages)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;

    /// Write a PDF with `pages` pages, each showing its 1-based number
    pub fn write_sample_pdf(path: &Path, pages: u32) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("Page {}", n))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages as i64),
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}
