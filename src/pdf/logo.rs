//! Logo image embedding

use std::path::Path;
use lopdf::{dictionary, Document, ObjectId, Stream};

use crate::error::{Error, Result};

/// Decoded logo, ready to be written as an image XObject
#[derive(Debug, Clone)]
pub struct LogoImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    /// Present only when the source image has transparency
    alpha: Option<Vec<u8>>,
}

impl LogoImage {
    /// Decode a PNG or JPEG image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| Error::Image(format!("Failed to decode logo: {e}")))?
            .to_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::Image("Logo has no pixels".to_string()));
        }

        let pixel_count = (width * height) as usize;
        let mut rgb = Vec::with_capacity(pixel_count * 3);
        let mut alpha = Vec::with_capacity(pixel_count);
        for pixel in img.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let opaque = alpha.iter().all(|&a| a == u8::MAX);

        Ok(Self {
            width,
            height,
            rgb,
            alpha: (!opaque).then_some(alpha),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Pixel dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Height divided by width
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.height) / f64::from(self.width)
    }

    /// Add the image XObject (and its soft mask) to `doc`
    pub fn install(&self, doc: &mut Document) -> ObjectId {
        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(self.width),
            "Height" => i64::from(self.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };

        if let Some(alpha) = &self.alpha {
            let smask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(self.width),
                    "Height" => i64::from(self.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha.clone(),
            ));
            image_dict.set("SMask", smask_id);
        }

        doc.add_object(Stream::new(image_dict, self.rgb.clone()))
    }
}
