//! PDF assembly from page rasters.
//!
//! Each raster becomes one page of the configured physical size, drawn as a
//! full-page image XObject. Grayscale and RGB JPEG data is embedded unchanged
//! (`DCTDecode`); anything else is decoded to RGB and stored zlib-compressed
//! (`FlateDecode`).

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{ImageResource, PageSize};

/// Builds a PDF with one full-bleed image per page.
#[derive(Debug, Clone, Default)]
pub struct PdfAssembler {
    page_size: PageSize,
}

impl PdfAssembler {
    /// Create an assembler for the given page size.
    pub fn new(page_size: PageSize) -> Self {
        Self { page_size }
    }

    /// Assemble rasters, in order, into PDF bytes.
    pub fn assemble(&self, rasters: &[ImageResource]) -> Result<Vec<u8>> {
        if rasters.is_empty() {
            return Err(Error::Pdf("no pages to assemble".to_string()));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(rasters.len());
        let (width, height) = (self.page_size.width, self.page_size.height);

        for (index, raster) in rasters.iter().enumerate() {
            let image_stream = image_xobject(raster)?;
            let image_id = doc.add_object(image_stream);
            let name = format!("Im{}", index + 1);

            let content = Content {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            width.into(),
                            0.into(),
                            0.into(),
                            height.into(),
                            0.into(),
                            0.into(),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                "Resources" => dictionary! {
                    "XObject" => dictionary! {
                        name => image_id,
                    },
                },
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => rasters.len() as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        log::debug!("assembled PDF with {} page(s), {} bytes", rasters.len(), bytes.len());
        Ok(bytes)
    }
}

/// Image XObject stream for one raster.
fn image_xobject(raster: &ImageResource) -> Result<Stream> {
    if raster.is_jpeg() {
        let frame = jpeg_frame(&raster.data);
        if let Some((frame, color_space)) = frame.and_then(|f| Some((f, f.color_space()?))) {
            let mut stream = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(frame.width),
                    "Height" => i64::from(frame.height),
                    "ColorSpace" => color_space,
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                raster.data.clone(),
            );
            stream.allows_compression = false;
            return Ok(stream);
        }
        log::debug!(
            "JPEG raster re-encoded as RGB (components: {:?})",
            frame.map(|f| f.components)
        );
    }

    let decoded = image::load_from_memory(&raster.data)?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb.as_raw())?;
    let compressed = encoder.finish()?;

    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        compressed,
    );
    stream.allows_compression = false;
    Ok(stream)
}

/// Size and component count from a JPEG frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegFrame {
    width: u16,
    height: u16,
    components: u8,
}

impl JpegFrame {
    /// PDF colour space for data that can be embedded as is.
    fn color_space(&self) -> Option<&'static str> {
        match self.components {
            1 => Some("DeviceGray"),
            3 => Some("DeviceRGB"),
            _ => None,
        }
    }
}

/// Walk JPEG segments up to the first start-of-frame marker.
fn jpeg_frame(data: &[u8]) -> Option<JpegFrame> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    loop {
        while *data.get(pos)? != 0xFF {
            pos += 1;
        }
        while *data.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            return None;
        }

        let len = usize::from(u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]));
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let frame = data.get(pos + 2..pos + 8)?;
            return Some(JpegFrame {
                height: u16::from_be_bytes([frame[1], frame[2]]),
                width: u16::from_be_bytes([frame[3], frame[4]]),
                components: frame[5],
            });
        }
        pos += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> ImageResource {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([240, 240, 240]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Png)
            .unwrap();
        ImageResource::new(data, "image/png")
    }

    fn jpeg(width: u32, height: u32) -> ImageResource {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Jpeg)
            .unwrap();
        ImageResource::new(data, "image/jpeg")
    }

    #[test]
    fn test_assemble_pages_in_order() {
        let bytes = PdfAssembler::default()
            .assemble(&[png(4, 6), jpeg(4, 6), png(2, 3)])
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let first = doc.get_dictionary(pages[&1]).unwrap();
        let media_box = first.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 595.0);
        assert_eq!(media_box[3].as_float().unwrap(), 842.0);
    }

    #[test]
    fn test_assemble_empty_fails() {
        assert!(matches!(
            PdfAssembler::default().assemble(&[]),
            Err(Error::Pdf(_))
        ));
    }

    #[test]
    fn test_undecodable_raster_fails() {
        let bad = ImageResource::new(b"garbage".to_vec(), "image/png");
        assert!(matches!(
            PdfAssembler::default().assemble(&[bad]),
            Err(Error::Raster(_))
        ));
    }

    fn gray_jpeg(width: u32, height: u32) -> ImageResource {
        let img = image::GrayImage::from_pixel(width, height, image::Luma([128]));
        let mut data = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut data), image::ImageFormat::Jpeg)
            .unwrap();
        ImageResource::new(data, "image/jpeg")
    }

    fn color_space(raster: &ImageResource) -> Vec<u8> {
        let stream = image_xobject(raster).unwrap();
        stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap().to_vec()
    }

    #[test]
    fn test_jpeg_color_space_follows_components() {
        assert_eq!(color_space(&jpeg(4, 6)), b"DeviceRGB".to_vec());
        assert_eq!(color_space(&gray_jpeg(4, 6)), b"DeviceGray".to_vec());

        let frame = jpeg_frame(&gray_jpeg(5, 7).data).unwrap();
        assert_eq!((frame.width, frame.height, frame.components), (5, 7, 1));
    }

    #[test]
    fn test_jpeg_frame_skips_segments() {
        // SOI, APP0 with a 4-byte payload, SOF0 for a 3x2 four-component frame.
        let data = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x06, b'J', b'F', b'I', b'F', 0xFF, 0xC0, 0x00, 0x14,
            0x08, 0x00, 0x02, 0x00, 0x03, 0x04,
        ];
        let frame = jpeg_frame(&data).unwrap();
        assert_eq!((frame.width, frame.height, frame.components), (3, 2, 4));
        assert_eq!(frame.color_space(), None);

        assert_eq!(jpeg_frame(b"not a jpeg"), None);
        assert_eq!(jpeg_frame(&[0xFF, 0xD8, 0xFF, 0xC0, 0x00]), None);
    }

    #[test]
    fn test_unsupported_jpeg_goes_through_flate() {
        let cmyk = ImageResource::new(
            vec![
                0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x02, 0x00, 0x03, 0x04,
            ],
            "image/jpeg",
        );
        assert!(matches!(image_xobject(&cmyk), Err(Error::Raster(_))));
    }
}
