//! Image XObjects for pasted content
//!
//! Currently supports:
//! - JPEG images, embedded as-is with `/DCTDecode`
//! - PNG images, decoded and re-compressed with `/FlateDecode`, alpha carried
//!   as an `/SMask`

use crate::error::PayloadError;
use crate::payload::{ImageFormat, ImagePayload};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// An image ready to be embedded in a PDF
#[derive(Debug, Clone)]
pub struct Image {
    /// Encoded sample data (DCT or Flate)
    data: Vec<u8>,
    format: ImageFormat,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    color_space: ColorSpace,
    bits_per_component: u8,
    /// Flate-compressed 8-bit alpha, present only when some pixel is not opaque
    soft_mask: Option<Vec<u8>>,
}

/// Color spaces for images
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSpace {
    /// Grayscale
    DeviceGray,
    /// RGB color
    DeviceRGB,
    /// CMYK color
    DeviceCMYK,
}

impl ColorSpace {
    fn pdf_name(self) -> &'static [u8] {
        match self {
            ColorSpace::DeviceGray => b"DeviceGray",
            ColorSpace::DeviceRGB => b"DeviceRGB",
            ColorSpace::DeviceCMYK => b"DeviceCMYK",
        }
    }
}

impl Image {
    /// Decode a paste payload with the decoder its declared format selects.
    pub fn from_payload(payload: &ImagePayload) -> Result<Self, PayloadError> {
        match payload.format {
            ImageFormat::Jpeg => Self::from_jpeg_data(payload.bytes.clone()),
            ImageFormat::Png => Self::from_png_data(&payload.bytes),
        }
    }

    /// Create an image from JPEG data
    pub fn from_jpeg_data(data: Vec<u8>) -> Result<Self, PayloadError> {
        let (width, height, color_space, bits_per_component) = parse_jpeg_header(&data)?;

        Ok(Image {
            data,
            format: ImageFormat::Jpeg,
            width,
            height,
            color_space,
            bits_per_component,
            soft_mask: None,
        })
    }

    /// Create an image from PNG data
    pub fn from_png_data(data: &[u8]) -> Result<Self, PayloadError> {
        let decoded = ::image::load_from_memory_with_format(data, ::image::ImageFormat::Png)
            .map_err(|e| PayloadError::Png(e.to_string()))?;
        let (width, height) = (decoded.width(), decoded.height());
        let grayscale = !decoded.color().has_color();

        let rgba = decoded.to_rgba8();
        let channels = if grayscale { 1 } else { 3 };
        let mut samples = Vec::with_capacity(width as usize * height as usize * channels);
        let mut alpha = Vec::with_capacity(width as usize * height as usize);

        for pixel in rgba.pixels() {
            let [r, g, b, a] = pixel.0;
            if grayscale {
                samples.push(r);
            } else {
                samples.extend_from_slice(&[r, g, b]);
            }
            alpha.push(a);
        }

        let soft_mask = if alpha.iter().any(|&a| a != u8::MAX) {
            Some(deflate(&alpha)?)
        } else {
            None
        };

        Ok(Image {
            data: deflate(&samples)?,
            format: ImageFormat::Png,
            width,
            height,
            color_space: if grayscale {
                ColorSpace::DeviceGray
            } else {
                ColorSpace::DeviceRGB
            },
            bits_per_component: 8,
            soft_mask,
        })
    }

    /// Get image width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get image height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn has_soft_mask(&self) -> bool {
        self.soft_mask.is_some()
    }

    /// Add this image (and its soft mask, if any) to `doc` as an image
    /// XObject and return the object id.
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut dict = self.base_dictionary(self.color_space, self.bits_per_component);

        match self.format {
            ImageFormat::Jpeg => {
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
                if self.color_space == ColorSpace::DeviceCMYK {
                    // Adobe CMYK JPEGs are stored inverted.
                    let decode = [1, 0, 1, 0, 1, 0, 1, 0]
                        .into_iter()
                        .map(Object::Integer)
                        .collect();
                    dict.set("Decode", Object::Array(decode));
                }
            }
            ImageFormat::Png => {
                dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            }
        }

        if let Some(alpha) = &self.soft_mask {
            let mut mask_dict = self.base_dictionary(ColorSpace::DeviceGray, 8);
            mask_dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            let mask_id = doc.add_object(Stream::new(mask_dict, alpha.clone()));
            dict.set("SMask", Object::Reference(mask_id));
        }

        doc.add_object(Stream::new(dict, self.data.clone()))
    }

    fn base_dictionary(&self, color_space: ColorSpace, bits_per_component: u8) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set("ColorSpace", Object::Name(color_space.pdf_name().to_vec()));
        dict.set("BitsPerComponent", Object::Integer(bits_per_component as i64));
        dict
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PayloadError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PayloadError::Encode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PayloadError::Encode(e.to_string()))
}

/// Parse JPEG header to extract image information
fn parse_jpeg_header(data: &[u8]) -> Result<(u32, u32, ColorSpace, u8), PayloadError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(PayloadError::Jpeg("missing SOI marker".to_string()));
    }

    let mut pos = 2;
    let mut width = 0;
    let mut height = 0;
    let mut components = 0;
    let mut precision = 8;

    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            return Err(PayloadError::Jpeg("invalid marker".to_string()));
        }

        let marker = data[pos + 1];
        pos += 2;

        // Fill bytes
        if marker == 0xFF {
            pos -= 1;
            continue;
        }

        // SOF0..SOF15, excluding DHT, JPG and DAC
        if (0xC0..=0xCF).contains(&marker) && marker != 0xC4 && marker != 0xC8 && marker != 0xCC
        {
            if pos + 7 >= data.len() {
                return Err(PayloadError::Jpeg("truncated frame header".to_string()));
            }

            // Skip segment length
            pos += 2;
            precision = data[pos];
            pos += 1;
            height = ((data[pos] as u32) << 8) | (data[pos + 1] as u32);
            pos += 2;
            width = ((data[pos] as u32) << 8) | (data[pos + 1] as u32);
            pos += 2;
            components = data[pos];
            break;
        } else if marker == 0xD9 {
            break;
        } else if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            // Standalone markers carry no length field
            continue;
        } else {
            if pos + 1 >= data.len() {
                return Err(PayloadError::Jpeg("truncated segment".to_string()));
            }
            let length = ((data[pos] as usize) << 8) | (data[pos + 1] as usize);
            pos += length;
        }
    }

    if width == 0 || height == 0 {
        return Err(PayloadError::Jpeg(
            "could not find image dimensions".to_string(),
        ));
    }

    let color_space = match components {
        1 => ColorSpace::DeviceGray,
        3 => ColorSpace::DeviceRGB,
        4 => ColorSpace::DeviceCMYK,
        _ => {
            return Err(PayloadError::Jpeg(format!(
                "unsupported number of components: {components}"
            )))
        }
    };

    // DCTDecode only covers baseline 8-bit samples.
    if precision != 8 {
        return Err(PayloadError::Jpeg(format!(
            "unsupported sample precision: {precision} bits"
        )));
    }

    Ok((width, height, color_space, precision))
}
