//! Page rendering: rasterise selected pages to ordered image files.
//!
//! This is the renderer boundary: PDF in, ordered page-image paths out.
//! Everything downstream (orchestrator, transcriber) sees only
//! [`PageImage`] handles and never touches the PDF again.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which uses thread-local
//! state and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto the blocking thread
//! pool so Tokio worker threads don't stall during CPU-heavy rendering.
//!
//! ## Why write files instead of returning bitmaps?
//!
//! The rendered images outlive this stage: sequential mode may re-attach a
//! previous page's image as context, and callers who supply their own image
//! directory keep the renders after the run. File paths are the ownership
//! handle — auto-created directories are deleted with the run, caller-owned
//! ones are not.

use crate::config::ScanConfig;
use crate::error::AutoscanError;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An ordered handle to one rendered page image.
///
/// `number` is the original 1-indexed page number in the document, which is
/// also the order of the final assembled output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub number: usize,
    pub path: PathBuf,
}

/// Rasterise the selected pages of `pdf_path` into `image_dir`.
///
/// Returns page images ordered by page number. Rendering zero pages —
/// whether the document is empty or the page range selects nothing — is a
/// fatal [`AutoscanError::NoPagesRendered`].
pub async fn render_pages(
    pdf_path: &Path,
    image_dir: &Path,
    config: &ScanConfig,
) -> Result<Vec<PageImage>, AutoscanError> {
    let path = pdf_path.to_path_buf();
    let dir = image_dir.to_path_buf();
    let dpi = config.effective_dpi();
    let max_pixels = config.max_rendered_pixels;
    let range = config.pages;

    let pages = tokio::task::spawn_blocking(move || {
        render_pages_blocking(&path, &dir, dpi, max_pixels, range)
    })
    .await
    .map_err(|e| AutoscanError::Internal(format!("Render task panicked: {}", e)))??;

    if pages.is_empty() {
        return Err(AutoscanError::NoPagesRendered {
            path: pdf_path.to_path_buf(),
        });
    }

    info!("Rendered {} page images into {}", pages.len(), image_dir.display());
    Ok(pages)
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    image_dir: &Path,
    dpi: u32,
    max_pixels: u32,
    range: crate::config::PageRange,
) -> Result<Vec<PageImage>, AutoscanError> {
    let pdfium = Pdfium::default();

    let document =
        pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| AutoscanError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    debug!("PDF loaded: {} pages", total_pages);

    let indices = range.to_indices(total_pages);

    let render_config = PdfRenderConfig::new()
        .set_target_width(target_width_pixels(dpi, max_pixels))
        .set_maximum_height(max_pixels as i32);

    let mut results = Vec::with_capacity(indices.len());

    for idx in indices {
        let page = pages
            .get(idx as u16)
            .map_err(|e| AutoscanError::RenderFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?;

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| AutoscanError::RenderFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

        let image = bitmap.as_image();
        let path = image_dir.join(format!("page-{:04}.png", idx + 1));
        image
            .save_with_format(&path, ImageFormat::Png)
            .map_err(|e| AutoscanError::RenderFailed {
                page: idx + 1,
                detail: format!("failed to write page image: {}", e),
            })?;

        debug!(
            "Rendered page {} → {} ({}x{} px)",
            idx + 1,
            path.display(),
            image.width(),
            image.height()
        );

        results.push(PageImage {
            number: idx + 1,
            path,
        });
    }

    Ok(results)
}

/// Target render width in pixels for a given DPI, using an A4 page width
/// (8.27 in) as the baseline and capped at `max_pixels`.
fn target_width_pixels(dpi: u32, max_pixels: u32) -> i32 {
    let target = (dpi as f32 * 8.27).round() as u32;
    target.min(max_pixels) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_width_scales_with_dpi() {
        assert_eq!(target_width_pixels(150, 2000), 1241);
        assert_eq!(target_width_pixels(200, 2000), 1654);
    }

    #[test]
    fn target_width_is_capped() {
        assert_eq!(target_width_pixels(400, 2000), 2000);
    }

    #[test]
    fn page_image_numbers_are_one_indexed() {
        let p = PageImage {
            number: 1,
            path: PathBuf::from("page-0001.png"),
        };
        assert_eq!(p.number, 1);
    }
}
