//! PDF page rasterisation via pdfium.
//!
//! pdfium wraps a C++ library with thread-local state; callers must
//! run these functions inside `spawn_blocking` rather than on an async
//! worker thread. The engine does exactly that.

use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Zoom factor used when rendering pages, matching the quality the
/// bot has always produced (4x the page's nominal size).
pub const RENDER_ZOOM: f32 = 4.0;

/// Errors produced while rendering PDF pages.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The input could not be opened as a PDF.
    #[error("could not open PDF for rendering: {0}")]
    Corrupt(String),
    /// A page failed to rasterise.
    #[error("could not render page {page}: {detail}")]
    Page {
        /// 1-based page number.
        page: usize,
        /// Renderer detail.
        detail: String,
    },
    /// PNG serialisation failed.
    #[error("could not encode rendered page: {0}")]
    Encode(image::ImageError),
}

/// Render every page of `input` to PNG bytes at [`RENDER_ZOOM`],
/// in page order.
///
/// Blocking; call from `spawn_blocking`.
///
/// # Errors
///
/// Returns a [`RenderError`] if the document cannot be opened or a
/// page fails to render.
pub fn render_pages(input: &Path, zoom: f32) -> Result<Vec<Vec<u8>>, RenderError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(input, None)
        .map_err(|e| RenderError::Corrupt(format!("{e:?}")))?;

    let pages = document.pages();
    let total = pages.len();
    debug!(pages = total, "rendering PDF pages");

    let mut rendered = Vec::with_capacity(usize::from(total));
    for index in 0..total {
        let page = pages.get(index).map_err(|e| RenderError::Page {
            page: usize::from(index) + 1,
            detail: format!("{e:?}"),
        })?;

        let width = (page.width().value * zoom) as i32;
        let height = (page.height().value * zoom) as i32;
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_maximum_height(height);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| RenderError::Page {
                page: usize::from(index) + 1,
                detail: format!("{e:?}"),
            })?;

        let image = bitmap.as_image();
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(RenderError::Encode)?;
        rendered.push(png.into_inner());
    }

    Ok(rendered)
}
