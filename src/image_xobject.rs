//! PNG to PDF image XObject conversion.

use crate::error::Error;
use lopdf::{dictionary, Object, ObjectId, Stream};
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRGB,
}

impl ColorSpace {
    fn name(self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRGB => "DeviceRGB",
        }
    }
}

/// Raw 8-bit samples of an image XObject.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub image_data: Vec<u8>,
    /// Soft mask carrying the alpha channel, once it has been added.
    pub s_mask: Option<ObjectId>,
}

impl ImageXObject {
    /// Decode a PNG into a colour image plus an optional alpha mask image.
    pub fn try_from<R: Read>(mut decoder: png::Decoder<R>) -> Result<(Self, Option<Self>), Error> {
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf)?;
        buf.truncate(info.buffer_size());

        let (width, height) = (info.width, info.height);
        let (color, alpha, color_space) = match info.color_type {
            png::ColorType::Grayscale => (buf, None, ColorSpace::DeviceGray),
            png::ColorType::Rgb => (buf, None, ColorSpace::DeviceRGB),
            png::ColorType::GrayscaleAlpha => {
                let (gray, alpha) = split_alpha(&buf, 1);
                (gray, Some(alpha), ColorSpace::DeviceGray)
            }
            png::ColorType::Rgba => {
                let (rgb, alpha) = split_alpha(&buf, 3);
                (rgb, Some(alpha), ColorSpace::DeviceRGB)
            }
            png::ColorType::Indexed => {
                return Err(Error::Other("indexed PNG was not expanded".to_owned()))
            }
        };

        let mask = alpha.map(|image_data| ImageXObject {
            width,
            height,
            color_space: ColorSpace::DeviceGray,
            image_data,
            s_mask: None,
        });
        let image = ImageXObject {
            width,
            height,
            color_space,
            image_data: color,
            s_mask: None,
        };
        Ok((image, mask))
    }
}

/// Split interleaved samples into colour channels and the trailing alpha.
fn split_alpha(samples: &[u8], channels: usize) -> (Vec<u8>, Vec<u8>) {
    let stride = channels + 1;
    let pixels = samples.len() / stride;
    let mut color = Vec::with_capacity(pixels * channels);
    let mut alpha = Vec::with_capacity(pixels);
    for pixel in samples.chunks_exact(stride) {
        color.extend_from_slice(&pixel[..channels]);
        alpha.push(pixel[channels]);
    }
    (color, alpha)
}

impl From<ImageXObject> for Stream {
    fn from(image: ImageXObject) -> Self {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => image.color_space.name(),
            "BitsPerComponent" => 8,
        };
        if let Some(mask) = image.s_mask {
            dict.set("SMask", mask);
        }
        Stream::new(dict, image.image_data)
    }
}

impl From<ImageXObject> for Object {
    fn from(image: ImageXObject) -> Self {
        Object::Stream(image.into())
    }
}
