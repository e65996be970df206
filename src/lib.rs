//! Rendering of DOTA oriented-bounding-box annotations.
//!
//! Images and annotation files are paired by file stem, each annotation line
//! is parsed into an [`AnnotationRecord`], and the records are drawn onto the
//! image (outlines and category labels) and filled into a binary mask. The
//! results can be exported next to the dataset.
//!
//! [`Session`] bundles the pipeline behind the commands a viewer needs; the
//! free functions [`load_dataset`], [`render`], [`save_image`] and
//! [`save_mask`] can be used on their own.

pub mod annotation;
pub mod colors;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod render;
pub mod session;

pub use annotation::{AnnotationRecord, parse_annotations, parse_line, read_annotations};
pub use colors::{CategoryColors, ColorScheme};
pub use config::{RenderOptions, ViewerConfig};
pub use dataset::{Catalog, CatalogEntry, load_dataset};
pub use error::{Error, Result};
pub use export::{save_image, save_mask};
pub use render::{
    DisplayMetadata, FrameBuffers, LabelFont, Rasterizer, RenderedFrame, render,
};
pub use session::Session;
