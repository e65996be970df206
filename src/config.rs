//! Settings for a viewing session.

use std::path::PathBuf;

use crate::colors::ColorScheme;

/// What the rasterizer draws on top of the image.
///
/// The mask is filled for every record no matter what is toggled here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub draw_outlines: bool,
    pub draw_labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            draw_outlines: true,
            draw_labels: true,
        }
    }
}

/// Where a session reads its dataset from and writes its exports to.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub images_dir: PathBuf,
    pub annotations_dir: PathBuf,
    /// Output directory of annotated images. Empty means
    /// `<images_dir>/../saved_images`.
    pub save_images_dir: PathBuf,
    /// Output directory of masks. Empty means `<images_dir>/../saved_masks`.
    pub save_masks_dir: PathBuf,
    /// TrueType/OpenType font used for label text instead of the bundled
    /// DejaVu Sans.
    pub font_path: Option<PathBuf>,
    pub color_scheme: ColorScheme,
    pub render: RenderOptions,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            images_dir: PathBuf::from("./images/"),
            annotations_dir: PathBuf::from("./annotations/"),
            save_images_dir: PathBuf::new(),
            save_masks_dir: PathBuf::new(),
            font_path: None,
            color_scheme: ColorScheme::default(),
            render: RenderOptions::default(),
        }
    }
}

impl ViewerConfig {
    pub fn new(images_dir: impl Into<PathBuf>, annotations_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            annotations_dir: annotations_dir.into(),
            ..Self::default()
        }
    }
}
