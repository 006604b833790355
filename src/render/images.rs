//! Image inlining for export.
//!
//! Page rasterization must not depend on network access, so every image on a
//! page is fetched and embedded as a `data:` URI first. When fetching or
//! decoding fails, the image falls back to its remote URL with a cache-busting
//! query and `crossorigin="anonymous"`, and the export carries on degraded.

use std::collections::HashMap;
use std::io::Cursor;

use chrono::Utc;
use image::ImageFormat;

use crate::codec::cell_images;
use crate::error::{Error, Result};
use crate::model::{ImageResource, Page, PlanDocument, PortableContentItem};

/// Fetches image bytes by URL.
pub trait ImageFetcher {
    /// Fetch the raw bytes behind `src`.
    fn fetch(&mut self, src: &str) -> Result<Vec<u8>>;
}

impl<F> ImageFetcher for F
where
    F: FnMut(&str) -> Result<Vec<u8>>,
{
    fn fetch(&mut self, src: &str) -> Result<Vec<u8>> {
        self(src)
    }
}

/// Where a rendered page loads an image from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Self-contained data URI
    Inline {
        /// `data:` URI
        data_uri: String,
    },

    /// Remote fallback after a failed fetch
    Remote {
        /// Original URL with a cache-busting query parameter
        url: String,
    },
}

impl ImageSource {
    /// Value for the `src` attribute.
    pub fn src(&self) -> &str {
        match self {
            ImageSource::Inline { data_uri } => data_uri,
            ImageSource::Remote { url } => url,
        }
    }

    /// Value for the `crossorigin` attribute, if one is needed.
    pub fn cross_origin(&self) -> Option<&'static str> {
        match self {
            ImageSource::Inline { .. } => None,
            ImageSource::Remote { .. } => Some("anonymous"),
        }
    }

    /// Check if the image was embedded.
    pub fn is_inline(&self) -> bool {
        matches!(self, ImageSource::Inline { .. })
    }
}

/// Fetches and embeds images, caching results per source URL.
pub struct ImageInliner<F: ImageFetcher> {
    fetcher: F,
    cache: HashMap<String, ImageSource>,
    fallbacks: usize,
}

impl<F: ImageFetcher> ImageInliner<F> {
    /// Create an inliner over a fetcher.
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: HashMap::new(),
            fallbacks: 0,
        }
    }

    /// Resolve one image source.
    pub fn inline(&mut self, src: &str) -> ImageSource {
        if src.starts_with("data:") {
            return ImageSource::Inline {
                data_uri: src.to_string(),
            };
        }
        if let Some(cached) = self.cache.get(src) {
            return cached.clone();
        }

        let source = match self.fetcher.fetch(src).and_then(|bytes| embed(&bytes)) {
            Ok(data_uri) => ImageSource::Inline { data_uri },
            Err(e) => {
                log::warn!("image {} not inlined, using remote fallback: {}", src, e);
                self.fallbacks += 1;
                ImageSource::Remote {
                    url: cache_bust(src),
                }
            }
        };

        self.cache.insert(src.to_string(), source.clone());
        source
    }

    /// Resolve every image placed on `page`.
    pub fn inline_page(&mut self, doc: &PlanDocument, page: &Page) -> HashMap<String, ImageSource> {
        let mut images = HashMap::new();
        for placed in &page.items {
            match doc.item(placed.section_index, placed.item_index) {
                Some(PortableContentItem::Image { src, .. }) => {
                    let source = self.inline(src);
                    images.insert(src.clone(), source);
                }
                Some(PortableContentItem::Table { columns, rows }) => {
                    for value in columns.iter().chain(rows.iter().flatten()) {
                        for attrs in cell_images(value) {
                            let source = self.inline(&attrs.src);
                            images.insert(attrs.src, source);
                        }
                    }
                }
                _ => {}
            }
        }
        images
    }

    /// Forget cached results and counters.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.fallbacks = 0;
    }

    /// Number of distinct images resolved so far.
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    /// Number of images that fell back to their remote URL.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    /// Consume the inliner and return the fetcher.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }
}

/// Embed raw image bytes as a data URI.
///
/// PNG, JPEG, GIF, WebP and SVG are embedded as they are. Other data is
/// decoded and re-encoded as PNG.
pub fn embed(bytes: &[u8]) -> Result<String> {
    if let Some(resource) = ImageResource::sniff(bytes.to_vec()) {
        if resource.mime_type != "image/bmp" {
            return Ok(resource.to_data_uri());
        }
    }

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| Error::ImageResource(format!("undecodable image data: {}", e)))?;
    let mut png = Vec::new();
    decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(ImageResource::new(png, "image/png").to_data_uri())
}

/// Append a `t=<millis>` query parameter.
pub fn cache_bust(url: &str) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, sep, Utc::now().timestamp_millis())
}
