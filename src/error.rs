//! Error types shared by every stage of the pipeline.

use std::path::PathBuf;

/// Errors raised while loading, rendering or exporting a dataset.
///
/// Malformed annotation lines are deliberately absent: they are skipped by the
/// parser rather than reported.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Image and annotation counts still disagree after pairing by stem.
    ///
    /// This is fatal for the whole dataset, no partial catalog is produced.
    #[error("{images} image(s) but {annotations} annotation file(s) after pairing by stem")]
    DatasetMismatch { images: usize, annotations: usize },

    /// No image/annotation pair was found.
    #[error("no image has a matching annotation file")]
    EmptyDataset,

    #[error("index {index} is out of range for a dataset of {total} image(s)")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("failed to list directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read annotation file {}", path.display())]
    ReadAnnotation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image could not be opened or decoded.
    #[error("failed to read image {}", path.display())]
    ReadImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to create output directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read font {}", path.display())]
    ReadFont {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a usable TrueType/OpenType font", path.display())]
    InvalidFont {
        path: PathBuf,
        #[source]
        source: ab_glyph::InvalidFont,
    },

    #[error("the bundled label font is not usable")]
    EmbeddedFont(#[source] ab_glyph::InvalidFont),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
