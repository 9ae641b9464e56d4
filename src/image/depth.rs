use std::path::Path;

use image::{ImageBuffer, Luma};
use ndarray::Array2;
use nshare::ToNdarray2;

use crate::error::{Error, Result};

/// Loads a 16 bits depth image (PGM or PNG) with shape `[height, width]`.
pub fn load_depth<P: AsRef<Path>>(filepath: P) -> Result<Array2<u16>> {
    Ok(image::open(filepath)?.into_luma16().into_ndarray2())
}

/// Saves a 16 bits depth image. The format comes from the extension.
pub fn save_depth<P: AsRef<Path>>(filepath: P, depth: &Array2<u16>) -> Result<()> {
    let (height, width) = depth.dim();
    let image = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(
        width as u32,
        height as u32,
        depth.iter().copied().collect(),
    )
    .ok_or_else(|| Error::format("Depth buffer too small"))?;
    image.save(filepath)?;
    Ok(())
}
