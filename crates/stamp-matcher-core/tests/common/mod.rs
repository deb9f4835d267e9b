#![allow(dead_code)]

pub mod test_images;
pub use test_images::*;
