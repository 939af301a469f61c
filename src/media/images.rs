use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::CatalogConfig;
use crate::error::ImageIoError;

/// Extensions `load_images` will try to decode (compared lowercase)
const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// One decoded file from a product's image directory
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub path: PathBuf,
    /// `n` from `image_<n>.jpg`, `None` for files named otherwise
    pub sequence: Option<u32>,
    pub image: DynamicImage,
}

/// Per-product JPEG storage:
/// `<root>/<PRODUCT-UUID>/image_<n>.jpg`
///
/// Directories are created on first write and never removed. A missing
/// directory reads as "no images". Failures are logged, never propagated.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    jpeg_quality: u8,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        ImageStore {
            root: root.into(),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.images_root(), config.effective_jpeg_quality())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a product's images (uppercase hyphenated UUID)
    pub fn product_dir(&self, product_id: Uuid) -> PathBuf {
        let mut buf = Uuid::encode_buffer();
        let name = product_id.hyphenated().encode_upper(&mut buf);
        self.root.join(&*name)
    }

    /// Deterministic file path for a sequence number (0 is treated as 1)
    pub fn image_path(&self, product_id: Uuid, sequence: u32) -> PathBuf {
        self.product_dir(product_id)
            .join(format!("image_{}.jpg", sequence.max(1)))
    }

    /// Decode `bytes` (any supported format), re-encode as JPEG and store it.
    /// Returns the written path, or `None` if anything failed.
    pub fn save_image(&self, bytes: &[u8], product_id: Uuid, sequence: u32) -> Option<PathBuf> {
        let image = match image::load_from_memory(bytes) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(
                    product_id = %product_id,
                    error = %e,
                    "could not decode image for product"
                );
                return None;
            }
        };

        self.save_dynamic_image(&image, product_id, sequence)
    }

    /// Store an already decoded image as JPEG
    pub fn save_dynamic_image(
        &self,
        image: &DynamicImage,
        product_id: Uuid,
        sequence: u32,
    ) -> Option<PathBuf> {
        match self.write_jpeg(image, product_id, sequence) {
            Ok(path) => {
                tracing::info!(
                    product_id = %product_id,
                    path = %path.display(),
                    "📸 saved product image"
                );
                Some(path)
            }
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "error saving image");
                None
            }
        }
    }

    fn write_jpeg(
        &self,
        image: &DynamicImage,
        product_id: Uuid,
        sequence: u32,
    ) -> Result<PathBuf, ImageIoError> {
        // JPEG has no alpha channel
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut data = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut data, self.jpeg_quality))?;

        let dir = self.product_dir(product_id);
        fs::create_dir_all(&dir).map_err(|source| ImageIoError::Io {
            path: dir.clone(),
            source,
        })?;

        // Write beside the target, then rename, so readers never see a partial file
        let path = self.image_path(product_id, sequence);
        let tmp_path = dir.join(format!(".image_{}.jpg.tmp", sequence.max(1)));
        fs::write(&tmp_path, &data).map_err(|source| ImageIoError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        if let Err(source) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(ImageIoError::Io { path, source });
        }

        Ok(path)
    }

    /// One past the highest `image_<n>.jpg` already stored
    pub fn next_sequence(&self, product_id: Uuid) -> u32 {
        self.image_paths(product_id)
            .iter()
            .filter_map(|path| sequence_of(path))
            .max()
            .map_or(1, |highest| highest.saturating_add(1))
    }

    /// JPEG files in the product's directory, ordered by sequence then name.
    /// Nothing is decoded.
    pub fn image_paths(&self, product_id: Uuid) -> Vec<PathBuf> {
        let dir = self.product_dir(product_id);
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "error listing images");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| has_image_extension(path))
            .collect();

        paths.sort_by(|a, b| {
            let key = |p: &Path| {
                (
                    sequence_of(p).unwrap_or(u32::MAX),
                    p.file_name().map(|n| n.to_os_string()),
                )
            };
            key(a.as_path()).cmp(&key(b.as_path()))
        });
        paths
    }

    pub fn has_images(&self, product_id: Uuid) -> bool {
        !self.image_paths(product_id).is_empty()
    }

    /// Decode every stored image for the product.
    /// Files that fail to read or decode are skipped.
    pub fn load_images(&self, product_id: Uuid) -> Vec<LoadedImage> {
        let mut images = Vec::new();

        for path in self.image_paths(product_id) {
            match decode_file(&path) {
                Ok(image) => images.push(LoadedImage {
                    sequence: sequence_of(&path),
                    path,
                    image,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable image");
                }
            }
        }

        tracing::debug!(product_id = %product_id, count = images.len(), "loaded product images");
        images
    }

    /// [`ImageStore::load_images`] on the blocking pool
    pub async fn load_images_async(&self, product_id: Uuid) -> Vec<LoadedImage> {
        let store = self.clone();
        match tokio::task::spawn_blocking(move || store.load_images(product_id)).await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(product_id = %product_id, error = %e, "image load task failed");
                Vec::new()
            }
        }
    }
}

fn decode_file(path: &Path) -> Result<DynamicImage, ImageIoError> {
    let data = fs::read(path).map_err(|source| ImageIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// `n` from a file named `image_<n>.<ext>`
fn sequence_of(path: &Path) -> Option<u32> {
    path.file_stem()?
        .to_str()?
        .strip_prefix("image_")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn store(dir: &Path) -> ImageStore {
        ImageStore::new(dir.join("ProductImages"), 80)
    }

    fn png_bytes(color: [u8; 3]) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb(color)));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn close(a: u8, b: u8) -> bool {
        a.abs_diff(b) <= 8
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        let path = images.save_image(&png_bytes([200, 40, 90]), id, 1).unwrap();
        assert_eq!(path, images.image_path(id, 1));
        assert!(path.ends_with("image_1.jpg"));

        let loaded = images.load_images(id);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].sequence, Some(1));
        assert_eq!(loaded[0].image.dimensions(), (16, 16));
        for pixel in loaded[0].image.to_rgb8().pixels() {
            assert!(close(pixel[0], 200) && close(pixel[1], 40) && close(pixel[2], 90));
        }
    }

    #[test]
    fn test_unknown_product_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        assert!(images.load_images(id).is_empty());
        assert!(!images.has_images(id));
        assert_eq!(images.next_sequence(id), 1);
    }

    #[test]
    fn test_corrupt_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        images.save_image(&png_bytes([10, 10, 10]), id, 1).unwrap();
        images.save_image(&png_bytes([250, 250, 250]), id, 3).unwrap();
        fs::write(images.image_path(id, 2), b"definitely not a jpeg").unwrap();

        let loaded = images.load_images(id);
        let sequences: Vec<_> = loaded.iter().map(|l| l.sequence).collect();
        assert_eq!(sequences, [Some(1), Some(3)]);
    }

    #[test]
    fn test_only_jpeg_extensions_listed() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        images.save_image(&png_bytes([1, 2, 3]), id, 1).unwrap();
        let product_dir = images.product_dir(id);
        fs::write(product_dir.join("notes.txt"), b"hello").unwrap();
        fs::copy(images.image_path(id, 1), product_dir.join("cover.JPEG")).unwrap();

        let names: Vec<String> = images
            .image_paths(id)
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["image_1.jpg", "cover.JPEG"]);
        assert_eq!(images.load_images(id).len(), 2);
    }

    #[test]
    fn test_sequences_and_directory_idempotence() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        images.save_image(&png_bytes([0, 0, 0]), id, 0).unwrap();
        assert!(images.image_path(id, 1).is_file());
        assert_eq!(images.next_sequence(id), 2);

        images.save_image(&png_bytes([0, 0, 0]), id, 2).unwrap();
        images.save_image(&png_bytes([0, 0, 0]), id, 10).unwrap();
        assert_eq!(images.next_sequence(id), 11);
        assert_eq!(images.image_paths(id).len(), 3);
    }

    #[test]
    fn test_alpha_is_dropped_for_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();
        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 128])));

        assert!(images.save_dynamic_image(&rgba, id, 1).is_some());
        assert_eq!(images.load_images(id).len(), 1);
    }

    #[test]
    fn test_undecodable_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();

        assert!(images.save_image(b"garbage", id, 1).is_none());
        assert!(!images.product_dir(id).exists());
    }

    #[test]
    fn test_unwritable_root_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the root directory should be
        let blocker = dir.path().join("ProductImages");
        fs::write(&blocker, b"").unwrap();
        let images = ImageStore::new(&blocker, 80);

        assert!(images.save_image(&png_bytes([5, 5, 5]), Uuid::new_v4(), 1).is_none());
    }

    #[test]
    fn test_product_dir_uses_uppercase_uuid() {
        let images = ImageStore::new("/data/ProductImages", 80);
        let id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(
            images.product_dir(id),
            PathBuf::from("/data/ProductImages/67E55044-10B1-426F-9247-BB680E5FE0C8")
        );
    }

    #[tokio::test]
    async fn test_async_load_matches_sync() {
        let dir = tempfile::tempdir().unwrap();
        let images = store(dir.path());
        let id = Uuid::new_v4();
        images.save_image(&png_bytes([30, 60, 90]), id, 1).unwrap();
        images.save_image(&png_bytes([30, 60, 90]), id, 2).unwrap();

        let loaded = images.load_images_async(id).await;
        assert_eq!(loaded.len(), 2);
        assert!(images.load_images_async(Uuid::new_v4()).await.is_empty());
    }
}
