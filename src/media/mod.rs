/// Product image storage
///
/// This module handles:
/// - Writing product photos as JPEG into per-product directories
/// - Listing and decoding a product's stored images
/// - Choosing and storing placeholder images from the bundled pool

pub mod defaults;
pub mod images;
