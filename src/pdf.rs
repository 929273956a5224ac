//! PDF merge, split, and image-to-PDF assembly on top of `lopdf`.
//!
//! Merging renumbers every input document into a shared object-id
//! space and rebuilds a single Pages tree, preserving input order.
//! Splitting clones the source once per page and deletes the rest.
//! Assembly embeds each image as a baseline-JPEG XObject on its own
//! page.

use crate::imaging;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// JPEG quality used when embedding images into assembled PDFs.
const EMBED_JPEG_QUALITY: u8 = 90;

/// Errors produced by the PDF operations.
#[derive(Debug, Error)]
pub enum PdfError {
    /// An input could not be parsed as a PDF.
    #[error("could not read PDF {path}: {source}")]
    Load {
        /// Offending input path.
        path: PathBuf,
        /// Parser error.
        source: lopdf::Error,
    },
    /// The combined document ended up without a page tree.
    #[error("no pages found across the input documents")]
    NoPages,
    /// The combined document ended up without a catalog.
    #[error("no catalog found across the input documents")]
    NoCatalog,
    /// An image offered for assembly could not be decoded or encoded.
    #[error(transparent)]
    Image(#[from] imaging::ImagingError),
    /// Writing the output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Any other structural error from the PDF library.
    #[error(transparent)]
    Structure(#[from] lopdf::Error),
}

/// Merge `inputs` into a single document written to `output`,
/// preserving input order. Returns the merged page count.
///
/// # Errors
///
/// Returns a [`PdfError`] if any input fails to parse or the output
/// cannot be written.
pub fn merge_documents(inputs: &[PathBuf], output: &Path) -> Result<usize, PdfError> {
    let mut max_id = 1;
    // Page objects in input order; object ids alone do not encode it.
    let mut pages: Vec<(ObjectId, Object)> = Vec::new();
    let mut objects: Vec<(ObjectId, Object)> = Vec::new();

    for path in inputs {
        let mut doc = Document::load(path).map_err(|source| PdfError::Load {
            path: path.clone(),
            source,
        })?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, object_id) in doc.get_pages() {
            if let Ok(object) = doc.get_object(object_id) {
                pages.push((object_id, object.clone()));
            }
        }
        objects.extend(doc.objects.clone());
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut pages_root: Option<(ObjectId, Dictionary)> = None;

    for (object_id, object) in objects {
        let kind: Vec<u8> = object
            .as_dict()
            .ok()
            .and_then(|dict| dict.get(b"Type").ok())
            .and_then(|t| t.as_name().ok())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        match kind.as_slice() {
            b"Catalog" => {
                let id = catalog.as_ref().map_or(object_id, |(id, _)| *id);
                if let Ok(dict) = object.as_dict() {
                    catalog = Some((id, dict.clone()));
                }
            }
            b"Pages" => {
                if let Ok(dict) = object.as_dict() {
                    let mut dict = dict.clone();
                    let id = match pages_root.take() {
                        Some((id, prior)) => {
                            dict.extend(&prior);
                            id
                        }
                        None => object_id,
                    };
                    pages_root = Some((id, dict));
                }
            }
            // Pages are re-parented below; outlines are dropped since
            // their targets are renumbered away.
            b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, mut pages_dict) = pages_root.ok_or(PdfError::NoPages)?;
    let (catalog_id, mut catalog_dict) = catalog.ok_or(PdfError::NoCatalog)?;

    for (object_id, object) in &pages {
        if let Ok(dict) = object.as_dict() {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*object_id, Object::Dictionary(dict));
        }
    }

    pages_dict.set("Count", pages.len() as i64);
    pages_dict.set(
        "Kids",
        pages
            .iter()
            .map(|(id, _)| Object::Reference(*id))
            .collect::<Vec<_>>(),
    );
    merged.objects.insert(pages_id, Object::Dictionary(pages_dict));

    catalog_dict.set("Pages", pages_id);
    catalog_dict.remove(b"Outlines");
    merged
        .objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();
    merged.save(output)?;

    debug!(pages = pages.len(), inputs = inputs.len(), "merged PDFs");
    Ok(pages.len())
}

/// Split `input` into one single-page document per page, written into
/// `out_dir` as `page_1.pdf`, `page_2.pdf`, ... Returns the paths in
/// page order.
///
/// # Errors
///
/// Returns a [`PdfError`] if the input fails to parse or an output
/// cannot be written.
pub fn split_document(input: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, PdfError> {
    let doc = Document::load(input).map_err(|source| PdfError::Load {
        path: input.to_path_buf(),
        source,
    })?;
    let total = doc.get_pages().len() as u32;
    if total == 0 {
        return Err(PdfError::NoPages);
    }

    let mut outputs = Vec::with_capacity(total as usize);
    for page_no in 1..=total {
        let mut single = doc.clone();
        let others: Vec<u32> = (1..=total).filter(|n| *n != page_no).collect();
        if !others.is_empty() {
            single.delete_pages(&others);
        }
        single.prune_objects();
        let path = out_dir.join(format!("page_{page_no}.pdf"));
        single.save(&path)?;
        outputs.push(path);
    }
    Ok(outputs)
}

/// Number of pages in the PDF held in `bytes`.
///
/// # Errors
///
/// Returns a [`PdfError`] if the bytes fail to parse.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    let doc = Document::load_mem(bytes)?;
    Ok(doc.get_pages().len())
}

/// Build a PDF with one page per image, in the given order. Pages take
/// the pixel dimensions of their image (one pixel per point). Returns
/// the document bytes and the page count.
///
/// # Errors
///
/// Returns a [`PdfError`] if an image cannot be decoded or the
/// document cannot be serialised.
pub fn assemble_images(images: &[PathBuf]) -> Result<(Vec<u8>, usize), PdfError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for path in images {
        let img = image::open(path).map_err(imaging::ImagingError::Decode)?;
        let (width, height) = (img.width(), img.height());
        let jpeg = imaging::encode_jpeg(&img, EMBED_JPEG_QUALITY)?;

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Integer(i64::from(width)),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(i64::from(height)),
                        Object::Integer(0),
                        Object::Integer(0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(i64::from(width)),
                Object::Integer(i64::from(height)),
            ],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Cursor::new(Vec::new());
    doc.save_to(&mut out)?;
    Ok((out.into_inner(), count))
}
