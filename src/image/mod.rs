pub mod gray;
pub mod io;
pub mod rgb;

pub use self::gray::{luma_of, GrayImage};
pub use self::rgb::{RgbImage, RgbView};
