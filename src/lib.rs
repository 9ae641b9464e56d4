pub mod calibration;
pub mod camera;
pub mod colorize;
pub mod dispatcher;
pub mod integration;
pub mod io;
pub mod overlay;
pub mod pinhole;
pub mod pointcloud;
pub mod range_image;
pub mod registration;
pub mod timestamp;
pub mod transform;

pub mod error;
pub mod trajectory;

#[cfg(test)]
mod unit_test;

pub mod image;
pub use crate::image::{RgbdFrame, RgbdImage};
