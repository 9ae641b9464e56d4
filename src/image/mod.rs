mod rgb;
pub use rgb::{load_rgb, save_rgb, IntoArray3, IntoImageRgb8};

mod depth;
pub use depth::{load_depth, save_depth};

mod rgbd_image;
pub use rgbd_image::{RgbdFrame, RgbdImage};
