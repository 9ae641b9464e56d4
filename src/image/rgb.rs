use std::path::Path;

use image::{flat::SampleLayout, RgbImage};
use ndarray::{Array3, ShapeBuilder};

use crate::error::{Error, Result};

/// Trait to convert into ndarray::Array3, this is different than nshare version
/// because it uses the shape [height, width, channels] instead of [channels, height, width].
pub trait IntoArray3 {
    fn into_array3(self) -> Result<Array3<u8>>;
}

impl IntoArray3 for image::RgbImage {
    fn into_array3(self) -> Result<Array3<u8>> {
        let SampleLayout {
            channels,
            channel_stride,
            height,
            height_stride,
            width,
            width_stride,
        } = self.sample_layout();
        let shape = (height as usize, width as usize, channels as usize);
        let strides = (height_stride, width_stride, channel_stride);
        Array3::from_shape_vec(shape.strides(strides), self.into_raw())
            .map_err(|err| Error::format(format!("Unexpected image layout: {err}")))
    }
}

/// Trait to convert objects into image::RgbImage
pub trait IntoImageRgb8 {
    fn into_image_rgb8(self) -> Result<RgbImage>;
}

impl IntoImageRgb8 for Array3<u8> {
    fn into_image_rgb8(self) -> Result<RgbImage> {
        let (height, width, channels) = self.dim();
        if channels != 3 {
            return Err(Error::invalid_parameter(format!(
                "Array3 must have 3 channels, got {channels}"
            )));
        }
        let raw = if self.is_standard_layout() {
            self.into_raw_vec()
        } else {
            self.iter().copied().collect()
        };
        RgbImage::from_raw(width as u32, height as u32, raw)
            .ok_or_else(|| Error::format("Image buffer too small"))
    }
}

/// Loads a color image as RGB, shape `[height, width, 3]`.
pub fn load_rgb<P: AsRef<Path>>(filepath: P) -> Result<Array3<u8>> {
    image::open(filepath)?.into_rgb8().into_array3()
}

/// Saves an RGB array of shape `[height, width, 3]`. The format comes from the extension.
pub fn save_rgb<P: AsRef<Path>>(filepath: P, rgb: &Array3<u8>) -> Result<()> {
    rgb.clone().into_image_rgb8()?.save(filepath)?;
    Ok(())
}
