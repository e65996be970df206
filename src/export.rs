//! Writing rendered images and masks to disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{GrayImage, RgbImage};

use crate::error::{Error, Result};

/// Directory next to the image directory that annotated images default to.
pub const DEFAULT_IMAGES_DIR: &str = "saved_images";

/// Directory next to the image directory that masks default to.
pub const DEFAULT_MASKS_DIR: &str = "saved_masks";

/// Prepended to the image file name to name its mask.
pub const MASK_PREFIX: &str = "mask_";

/// Resolves the directory an export goes to.
///
/// An empty `output_dir` selects `<image_dir>/../<default_name>`.
pub fn output_dir(image_dir: &Path, output_dir: &Path, default_name: &str) -> PathBuf {
    if output_dir.as_os_str().is_empty() {
        image_dir.join("..").join(default_name)
    } else {
        output_dir.to_path_buf()
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Saves the annotated `image` under its original file name.
///
/// The encoding is picked from the extension of `filename`. An existing file
/// is overwritten.
///
/// # Arguments
///
/// * `image_dir` - Directory the image was loaded from.
/// * `output` - Target directory, or an empty path for
///   `<image_dir>/../saved_images`.
/// * `filename` - File name of the source image.
/// * `image` - The annotated image.
///
/// # Returns
///
/// The path written to.
///
/// # Errors
///
/// [`Error::CreateDir`] when the target directory cannot be created and
/// [`Error::Write`] when encoding or writing the file fails.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use dota_render::save_image;
/// use image::RgbImage;
///
/// let image = RgbImage::new(64, 64);
/// let path = save_image(Path::new("DOTA/images"), Path::new(""), "P0001.png", &image)?;
/// assert!(path.ends_with("saved_images/P0001.png"));
/// # Ok::<(), dota_render::Error>(())
/// ```
pub fn save_image(
    image_dir: &Path,
    output: &Path,
    filename: &str,
    image: &RgbImage,
) -> Result<PathBuf> {
    let dir = output_dir(image_dir, output, DEFAULT_IMAGES_DIR);
    create_dir(&dir)?;

    let path = dir.join(filename);
    image.save(&path).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    log::info!("Image {filename} saved to {}", path.display());
    Ok(path)
}

/// Saves `mask` as `mask_<filename>`.
///
/// An empty `output` selects `<image_dir>/../saved_masks`.
///
/// # Errors
///
/// Same as [`save_image`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use dota_render::save_mask;
/// use image::GrayImage;
///
/// let mask = GrayImage::new(64, 64);
/// let path = save_mask(Path::new("DOTA/images"), Path::new("masks"), "P0001.png", &mask)?;
/// assert_eq!(path, Path::new("masks/mask_P0001.png"));
/// # Ok::<(), dota_render::Error>(())
/// ```
pub fn save_mask(
    image_dir: &Path,
    output: &Path,
    filename: &str,
    mask: &GrayImage,
) -> Result<PathBuf> {
    let dir = output_dir(image_dir, output, DEFAULT_MASKS_DIR);
    create_dir(&dir)?;

    let path = dir.join(format!("{MASK_PREFIX}{filename}"));
    mask.save(&path).map_err(|source| Error::Write {
        path: path.clone(),
        source,
    })?;
    log::info!("Mask from {filename} saved to {}", path.display());
    Ok(path)
}
