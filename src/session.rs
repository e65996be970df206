//! Command interface a viewer front end drives.
//!
//! A [`Session`] owns the catalog, the color registry and the frame currently
//! displayed. Every command that changes what is visible re-renders the frame
//! synchronously and hands it back.

use std::path::PathBuf;

use crate::colors::CategoryColors;
use crate::config::{RenderOptions, ViewerConfig};
use crate::dataset::{Catalog, load_dataset};
use crate::error::{Error, Result};
use crate::export::{save_image, save_mask};
use crate::render::{LabelFont, Rasterizer, RenderedFrame, render};

#[derive(Debug)]
pub struct Session {
    config: ViewerConfig,
    catalog: Catalog,
    colors: CategoryColors,
    rasterizer: Rasterizer,
    index: usize,
    current: RenderedFrame,
}

impl Session {
    /// Loads the dataset described by `config` and renders its first image.
    ///
    /// # Errors
    ///
    /// Fails on a bad font, on [`Error::DatasetMismatch`], with
    /// [`Error::EmptyDataset`] when no pair was found, or when the first image
    /// cannot be rendered.
    pub fn open(config: ViewerConfig) -> Result<Self> {
        let rasterizer = match &config.font_path {
            Some(path) => Rasterizer::with_font(LabelFont::open(path)?),
            None => Rasterizer::new()?,
        };
        let mut colors = CategoryColors::new(config.color_scheme);
        let catalog = load_dataset(&config.images_dir, &config.annotations_dir, &mut colors)?;
        if catalog.is_empty() {
            return Err(Error::EmptyDataset);
        }

        let current = render(&catalog, 0, &mut colors, &rasterizer, config.render)?;
        Ok(Self {
            config,
            catalog,
            colors,
            rasterizer,
            index: 0,
            current,
        })
    }

    pub fn current(&self) -> &RenderedFrame {
        &self.current
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    /// Always `false`, a session never opens an empty dataset.
    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn colors(&self) -> &CategoryColors {
        &self.colors
    }

    pub fn options(&self) -> RenderOptions {
        self.config.render
    }

    /// Shows the next image, wrapping to the first after the last.
    pub fn next(&mut self) -> Result<&RenderedFrame> {
        self.go_to((self.index + 1) % self.len())
    }

    /// Shows the previous image, wrapping to the last before the first.
    pub fn previous(&mut self) -> Result<&RenderedFrame> {
        let len = self.len();
        self.go_to((self.index + len - 1) % len)
    }

    /// Shows the image at `index`.
    ///
    /// On failure the previously displayed frame and index are kept.
    pub fn go_to(&mut self, index: usize) -> Result<&RenderedFrame> {
        self.current = render(
            &self.catalog,
            index,
            &mut self.colors,
            &self.rasterizer,
            self.config.render,
        )?;
        self.index = index;
        Ok(&self.current)
    }

    /// Shows or hides category labels and redraws the current image.
    ///
    /// If the redraw fails the previous setting is restored, so
    /// [`options`](Self::options) keeps describing the displayed frame.
    pub fn toggle_labels(&mut self) -> Result<&RenderedFrame> {
        self.redraw_with(|options| options.draw_labels = !options.draw_labels)
    }

    /// Shows or hides polygon outlines and redraws the current image.
    ///
    /// Restores the previous setting on failure, like
    /// [`toggle_labels`](Self::toggle_labels).
    pub fn toggle_outlines(&mut self) -> Result<&RenderedFrame> {
        self.redraw_with(|options| options.draw_outlines = !options.draw_outlines)
    }

    fn redraw_with(&mut self, change: impl FnOnce(&mut RenderOptions)) -> Result<&RenderedFrame> {
        let previous = self.config.render;
        change(&mut self.config.render);

        match render(
            &self.catalog,
            self.index,
            &mut self.colors,
            &self.rasterizer,
            self.config.render,
        ) {
            Ok(rendered) => {
                self.current = rendered;
                Ok(&self.current)
            }
            Err(err) => {
                self.config.render = previous;
                Err(err)
            }
        }
    }

    /// Exports the displayed annotated image.
    pub fn save_image(&self) -> Result<PathBuf> {
        save_image(
            &self.config.images_dir,
            &self.config.save_images_dir,
            &self.current.metadata.filename,
            &self.current.frame.image,
        )
    }

    /// Exports the mask of the displayed image.
    pub fn save_mask(&self) -> Result<PathBuf> {
        save_mask(
            &self.config.images_dir,
            &self.config.save_masks_dir,
            &self.current.metadata.filename,
            &self.current.frame.mask,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::{fs, path::Path};
    use tempfile::TempDir;

    const GRAY: Rgb<u8> = Rgb([128, 128, 128]);

    /// Three images, `a`, `b` and `c`, each with one object.
    fn dataset() -> (TempDir, ViewerConfig) {
        let root = tempfile::tempdir().unwrap();
        let images = root.path().join("images");
        let labels = root.path().join("annotations");
        fs::create_dir(&images).unwrap();
        fs::create_dir(&labels).unwrap();

        for (stem, category) in [("a", "ship"), ("b", "plane"), ("c", "ship")] {
            RgbImage::from_pixel(32, 32, GRAY)
                .save(images.join(format!("{stem}.png")))
                .unwrap();
            fs::write(
                labels.join(format!("{stem}.txt")),
                format!("4 4 20 4 20 20 4 20 {category} 0\n"),
            )
            .unwrap();
        }

        let config = ViewerConfig::new(images, labels);
        (root, config)
    }

    #[test]
    fn open_works() {
        let (_root, config) = dataset();
        let session = Session::open(config).unwrap();

        assert_eq!(session.len(), 3);
        assert_eq!(session.index(), 0);
        assert_eq!(
            session.current().metadata.to_string(),
            "Image name: a.png, image number: 1/3"
        );
    }

    #[test]
    fn next_and_previous_work() {
        let (_root, config) = dataset();
        let mut session = Session::open(config).unwrap();

        assert_eq!(session.previous().unwrap().metadata.filename, "c.png");
        assert_eq!(session.next().unwrap().metadata.filename, "a.png");
        assert_eq!(session.next().unwrap().metadata.filename, "b.png");
        assert_eq!(session.next().unwrap().metadata.filename, "c.png");
        assert_eq!(session.next().unwrap().metadata.filename, "a.png");
    }

    #[test]
    fn test_same_category_same_color_across_files() {
        let (_root, config) = dataset();
        let mut session = Session::open(config).unwrap();

        let first = session.current().records[0].color;
        let third = session.go_to(2).unwrap().records[0].color;
        assert_eq!(first, third);
        assert_eq!(session.colors().get("ship"), Some(first));
        assert_eq!(session.colors().len(), 2);
    }

    #[test]
    fn toggle_outlines_and_labels_work() {
        let (_root, config) = dataset();
        let mut session = Session::open(config).unwrap();
        let mask = session.current().frame.mask.clone();

        let frame = session.toggle_outlines().unwrap();
        assert_eq!(frame.frame.mask, mask);
        let frame = session.toggle_labels().unwrap();
        assert_eq!(frame.frame.mask, mask);
        assert!(frame.frame.image.pixels().all(|p| *p == GRAY));
        assert_eq!(
            session.options(),
            RenderOptions {
                draw_outlines: false,
                draw_labels: false
            }
        );
        assert_eq!(session.index(), 0);
    }

    #[test]
    fn test_failed_toggle_keeps_options() {
        let (_root, config) = dataset();
        let images_dir = config.images_dir.clone();
        let mut session = Session::open(config).unwrap();
        session.next().unwrap();
        let shown = session.current().frame.clone();
        fs::remove_file(images_dir.join("b.png")).unwrap();

        assert!(matches!(session.toggle_labels(), Err(Error::ReadImage { .. })));
        assert!(matches!(session.toggle_outlines(), Err(Error::ReadImage { .. })));
        assert_eq!(session.options(), RenderOptions::default());
        assert_eq!(session.index(), 1);
        assert_eq!(session.current().frame, shown);
    }

    #[test]
    fn test_failed_navigation_keeps_current_frame() {
        let (_root, config) = dataset();
        let mut session = Session::open(config).unwrap();
        session.next().unwrap();

        assert!(matches!(
            session.go_to(7),
            Err(Error::IndexOutOfRange { index: 7, total: 3 })
        ));
        assert_eq!(session.index(), 1);
        assert_eq!(session.current().metadata.filename, "b.png");
    }

    #[test]
    fn save_image_and_mask_work() {
        let (root, config) = dataset();
        let mut session = Session::open(config).unwrap();
        session.next().unwrap();

        let image = session.save_image().unwrap();
        let mask = session.save_mask().unwrap();

        assert!(image.ends_with(Path::new("saved_images/b.png")));
        assert!(mask.ends_with(Path::new("saved_masks/mask_b.png")));
        assert!(root.path().join("saved_images/b.png").is_file());
        assert!(root.path().join("saved_masks/mask_b.png").is_file());
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let err = Session::open(ViewerConfig::new(root.path(), root.path())).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset));
    }

    #[test]
    fn test_mismatched_dataset_is_rejected() {
        let (_root, config) = dataset();
        RgbImage::from_pixel(4, 4, GRAY)
            .save(config.images_dir.join("a.jpg"))
            .unwrap();

        let err = Session::open(config).unwrap_err();
        assert!(matches!(
            err,
            Error::DatasetMismatch {
                images: 4,
                annotations: 3
            }
        ));
    }
}
