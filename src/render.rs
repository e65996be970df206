//! Rasterization of annotation records onto an image and its mask.
//!
//! Drawing happens in three passes over the records of one image:
//!
//! 1. every polygon is filled into the mask,
//! 2. outlines, when enabled,
//! 3. labels, when enabled.
//!
//! Labels therefore always sit on top of every outline, and within a label
//! the background rectangle is drawn before the text.

use std::{fmt, fs, path::Path};

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::{
    drawing::{
        BresenhamLineIter, draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut,
        draw_polygon_mut, draw_text_mut, text_size,
    },
    point::Point,
    rect::Rect,
};
use rand::Rng;

use crate::annotation::{AnnotationRecord, read_annotations};
use crate::colors::CategoryColors;
use crate::config::RenderOptions;
use crate::dataset::Catalog;
use crate::error::{Error, Result};

/// Stroke width of polygon outlines, in pixels.
pub const OUTLINE_THICKNESS: u32 = 2;

/// Radius of the marker drawn on the first vertex of a labelled polygon.
pub const MARKER_RADIUS: i32 = 5;

pub const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

pub const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Value of covered pixels in the mask. Background stays `0`.
pub const MASK_VALUE: Luma<u8> = Luma([255]);

/// Coordinates are clamped to this magnitude before drawing.
const COORDINATE_LIMIT: i32 = 1 << 16;

/// Pixel height label text is rendered at.
pub const LABEL_SCALE: f32 = 16.0;

/// DejaVu Sans, drawn when no other label font is configured.
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Font used to measure and draw category labels.
#[derive(Clone)]
pub struct LabelFont {
    font: FontArc,
    scale: PxScale,
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelFont")
            .field("scale", &self.scale)
            .finish_non_exhaustive()
    }
}

impl LabelFont {
    /// The font bundled with the crate.
    pub fn embedded() -> Result<Self, ab_glyph::InvalidFont> {
        FontArc::try_from_slice(EMBEDDED_FONT).map(Self::from_font)
    }

    /// Loads a TrueType/OpenType font file.
    ///
    /// # Errors
    ///
    /// [`Error::ReadFont`] when the file cannot be read and
    /// [`Error::InvalidFont`] when its contents are not a font.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::ReadFont {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes).map_err(|source| Error::InvalidFont {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ab_glyph::InvalidFont> {
        FontArc::try_from_vec(bytes).map(Self::from_font)
    }

    fn from_font(font: FontArc) -> Self {
        Self {
            font,
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    fn extent(&self, text: &str) -> TextExtent {
        let (width, _) = text_size(self.scale, &self.font, text);
        let scaled = self.font.as_scaled(self.scale);
        TextExtent {
            width,
            height: scaled.ascent().ceil().max(0.0) as u32,
            baseline: (-scaled.descent()).ceil().max(0.0) as u32,
        }
    }
}

/// Size of a rendered string relative to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextExtent {
    width: u32,
    /// Distance from the baseline up to the top of the text.
    height: u32,
    /// Distance from the baseline down to the bottom of the text.
    baseline: u32,
}

/// The image being displayed and the mask derived from its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffers {
    pub image: RgbImage,
    pub mask: GrayImage,
}

impl FrameBuffers {
    /// Wraps `image` together with an all-zero mask of the same size.
    pub fn new(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image,
            mask: GrayImage::new(width, height),
        }
    }

    /// Decodes the image at `path` into RGB.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|source| Error::ReadImage {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(image.to_rgb8()))
    }
}

/// What the caller shows next to a rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMetadata {
    pub filename: String,
    /// Zero based position in the catalog.
    pub index: usize,
    pub total: usize,
}

impl fmt::Display for DisplayMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Image name: {}, image number: {}/{}",
            self.filename,
            self.index + 1,
            self.total
        )
    }
}

/// Result of rendering one catalog entry.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub frame: FrameBuffers,
    pub records: Vec<AnnotationRecord>,
    pub metadata: DisplayMetadata,
}

/// Draws annotation records onto frame buffers.
#[derive(Debug, Clone)]
pub struct Rasterizer {
    font: LabelFont,
}

impl Rasterizer {
    /// A rasterizer drawing labels with the bundled DejaVu Sans.
    ///
    /// # Errors
    ///
    /// [`Error::EmbeddedFont`] if the bundled font cannot be parsed.
    pub fn new() -> Result<Self> {
        let font = LabelFont::embedded().map_err(Error::EmbeddedFont)?;
        Ok(Self::with_font(font))
    }

    /// A rasterizer drawing labels with `font` instead of the bundled one.
    pub fn with_font(font: LabelFont) -> Self {
        Self { font }
    }

    /// Fills every record into the mask, then draws outlines and labels as
    /// selected by `options`.
    pub fn rasterize(
        &self,
        frame: &mut FrameBuffers,
        records: &[AnnotationRecord],
        options: RenderOptions,
    ) {
        let (width, height) = frame.image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        for record in records {
            fill_mask(&mut frame.mask, &record.polygon);
        }

        if options.draw_outlines {
            for record in records {
                draw_outline(&mut frame.image, &record.polygon, record.color, OUTLINE_THICKNESS);
            }
        }

        if options.draw_labels {
            for record in records {
                self.draw_label(&mut frame.image, record);
            }
        }
    }

    /// Draws the vertex marker, the label background and the category text.
    ///
    /// The background spans from the font ascent above the first vertex to
    /// its descent below it, starting at the vertex and extending right by
    /// the measured text width. The text baseline sits on the vertex.
    pub fn draw_label(&self, image: &mut RgbImage, record: &AnnotationRecord) {
        let anchor = clamp_point(record.polygon[0]);
        draw_filled_circle_mut(image, (anchor.x, anchor.y), MARKER_RADIUS, MARKER_COLOR);

        let extent = self.font.extent(&record.category);
        let top = anchor.y - extent.height.min(COORDINATE_LIMIT as u32) as i32;
        let background = Rect::at(anchor.x, top)
            .of_size(extent.width + 1, extent.height + extent.baseline + 1);
        draw_filled_rect_mut(image, background, record.color);

        draw_text_mut(
            image,
            TEXT_COLOR,
            anchor.x,
            top,
            self.font.scale,
            &self.font.font,
            &record.category,
        );
    }
}

fn clamp_point(point: Point<i32>) -> Point<i32> {
    Point::new(
        point.x.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT),
        point.y.clamp(-COORDINATE_LIMIT, COORDINATE_LIMIT),
    )
}

/// Draws the closed outline of `polygon`, connecting the last vertex back to
/// the first, with a square pen `thickness` pixels wide.
pub fn draw_outline(
    image: &mut RgbImage,
    polygon: &[Point<i32>; 4],
    color: Rgb<u8>,
    thickness: u32,
) {
    let polygon = polygon.map(clamp_point);
    for (start, end) in polygon.iter().zip(polygon.iter().cycle().skip(1)) {
        let line = BresenhamLineIter::new(
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
        );
        for (x, y) in line {
            stamp(image, x, y, thickness, color);
        }
    }
}

/// Paints a `thickness` sized square centred on `(x, y)`, clipped to the image.
fn stamp(image: &mut RgbImage, x: i32, y: i32, thickness: u32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    let low = -(thickness as i32 / 2);
    let high = low + thickness.max(1) as i32;

    for dy in low..high {
        for dx in low..high {
            let (px, py) = (i64::from(x) + i64::from(dx), i64::from(y) + i64::from(dy));
            if (0..i64::from(width)).contains(&px) && (0..i64::from(height)).contains(&py) {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

/// Fills the interior and border of `polygon` with [`MASK_VALUE`].
///
/// Repeated vertices are collapsed first; a polygon reduced to two points is
/// drawn as a segment and one reduced to a single point as a pixel.
pub fn fill_mask(mask: &mut GrayImage, polygon: &[Point<i32>; 4]) {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for point in polygon.map(clamp_point) {
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    match points.as_slice() {
        [] => {}
        [point] => {
            let inside = point.x >= 0 && point.y >= 0;
            if inside && (point.x as u32) < width && (point.y as u32) < height {
                mask.put_pixel(point.x as u32, point.y as u32, MASK_VALUE);
            }
        }
        [start, end] => draw_line_segment_mut(
            mask,
            (start.x as f32, start.y as f32),
            (end.x as f32, end.y as f32),
            MASK_VALUE,
        ),
        _ => draw_polygon_mut(mask, &points, MASK_VALUE),
    }
}

/// Loads, annotates and rasterizes catalog entry `index`.
///
/// Records are parsed from the paired annotation file, with colors from
/// `colors`; categories missing from the registry are added to it. The mask
/// is filled for every record whatever `options` says.
///
/// # Arguments
///
/// * `catalog` - The pairs built by [`load_dataset`](crate::load_dataset).
/// * `index` - Zero based position of the entry in `catalog`.
/// * `colors` - Registry the record colors come from.
/// * `rasterizer` - Draws outlines and labels with its label font.
/// * `options` - Which overlays go onto the image.
///
/// # Returns
///
/// The annotated image and its mask, the parsed records and the
/// [`DisplayMetadata`] a viewer shows next to them.
///
/// # Errors
///
/// [`Error::IndexOutOfRange`] when `index` is past the end of the catalog,
/// [`Error::ReadAnnotation`] when the annotation file exists but cannot be
/// read and [`Error::ReadImage`] when the image cannot be decoded.
///
/// # Examples
///
/// ```no_run
/// use dota_render::{
///     CategoryColors, ColorScheme, Rasterizer, RenderOptions, load_dataset, render,
/// };
///
/// let mut colors = CategoryColors::new(ColorScheme::Spectral);
/// let catalog = load_dataset("images", "annotations", &mut colors)?;
/// let rasterizer = Rasterizer::new()?;
///
/// let rendered = render(&catalog, 0, &mut colors, &rasterizer, RenderOptions::default())?;
/// println!("{}", rendered.metadata);
/// rendered.frame.mask.save("mask.png").ok();
/// # Ok::<(), dota_render::Error>(())
/// ```
pub fn render<R: Rng>(
    catalog: &Catalog,
    index: usize,
    colors: &mut CategoryColors<R>,
    rasterizer: &Rasterizer,
    options: RenderOptions,
) -> Result<RenderedFrame> {
    let image_path = catalog.image_path(index)?;
    let records = read_annotations(&catalog.annotation_path(index)?, colors)?;

    let mut frame = FrameBuffers::open(&image_path)?;
    rasterizer.rasterize(&mut frame, &records, options);

    let metadata = DisplayMetadata {
        filename: catalog.get(index).map(|e| e.image.clone()).unwrap_or_default(),
        index,
        total: catalog.len(),
    };
    log::debug!("rendered {metadata} with {} object(s)", records.len());

    Ok(RenderedFrame {
        frame,
        records,
        metadata,
    })
}
