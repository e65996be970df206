//! Pairing of image files with their annotation files.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use rand::Rng;

use crate::annotation::{categories, read_annotation_text};
use crate::colors::CategoryColors;
use crate::error::{Error, Result};

/// Extensions recognized as images.
pub const IMAGE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Extension of annotation files.
pub const ANNOTATION_EXTENSION: &str = "txt";

/// An image file and the annotation file sharing its stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub image: String,
    pub annotation: String,
}

/// Ordered list of image/annotation pairs of a dataset.
#[derive(Debug, Clone)]
pub struct Catalog {
    images_dir: PathBuf,
    annotations_dir: PathBuf,
    entries: Vec<CatalogEntry>,
    /// Position of each entry, keyed by the shared stem.
    by_stem: HashMap<String, usize>,
}

impl Catalog {
    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn annotations_dir(&self) -> &Path {
        &self.annotations_dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CatalogEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    /// Looks up the annotation file paired with `image` by stem.
    pub fn annotation_for(&self, image: &str) -> Option<&str> {
        let index = *self.by_stem.get(stem(image)?)?;
        self.entries.get(index).map(|entry| entry.annotation.as_str())
    }

    pub fn image_path(&self, index: usize) -> Result<PathBuf> {
        let entry = self.entry(index)?;
        Ok(self.images_dir.join(&entry.image))
    }

    pub fn annotation_path(&self, index: usize) -> Result<PathBuf> {
        let entry = self.entry(index)?;
        Ok(self.annotations_dir.join(&entry.annotation))
    }

    fn entry(&self, index: usize) -> Result<&CatalogEntry> {
        self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            total: self.entries.len(),
        })
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn stem(file_name: &str) -> Option<&str> {
    Path::new(file_name).file_stem()?.to_str()
}

fn has_extension(file_name: &str, extensions: &[&str]) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}

/// Lists the names of regular files in `dir` whose extension is one of
/// `extensions`, sorted by name.
fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let read_dir_error = |source| Error::ReadDir {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        if entry.path().is_dir() {
            continue;
        }
        // Names that are not valid UTF-8 cannot be matched by stem.
        let Ok(name) = entry.file_name().into_string() else {
            log::debug!("skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if has_extension(&name, extensions) {
            names.push(name);
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Keeps only the images and annotations whose stems appear on both sides,
/// then pairs each image with the annotation of the same stem.
fn pair_by_stem(images: Vec<String>, annotations: Vec<String>) -> Result<Vec<CatalogEntry>> {
    let annotation_by_stem: HashMap<&str, &String> = annotations
        .iter()
        .filter_map(|name| Some((stem(name)?, name)))
        .collect();
    let images: Vec<(&str, &String)> = images
        .iter()
        .filter_map(|name| {
            let image_stem = stem(name)?;
            annotation_by_stem
                .contains_key(image_stem)
                .then_some((image_stem, name))
        })
        .collect();

    let image_stems: HashSet<&str> = images.iter().map(|(image_stem, _)| *image_stem).collect();
    let paired_annotations = annotations
        .iter()
        .filter(|name| stem(name).is_some_and(|s| image_stems.contains(s)))
        .count();

    if images.len() != paired_annotations {
        return Err(Error::DatasetMismatch {
            images: images.len(),
            annotations: paired_annotations,
        });
    }

    Ok(images
        .into_iter()
        .filter_map(|(image_stem, image)| {
            let annotation = annotation_by_stem.get(image_stem)?;
            Some(CatalogEntry {
                image: image.clone(),
                annotation: (*annotation).clone(),
            })
        })
        .collect())
}

/// Scans both directories and builds the catalog of matching pairs.
///
/// Every category of every paired annotation file is registered in `colors`,
/// file by file and line by line, so colors are assigned in a stable order.
///
/// # Arguments
///
/// * `images_dir` - Directory holding the `.jpg`/`.png` images.
/// * `annotations_dir` - Directory holding one `.txt` file per image.
/// * `colors` - Registry that receives every category found.
///
/// # Returns
///
/// A [`Catalog`] of the pairs, sorted by image file name. Files whose stem
/// only appears on one side are left out.
///
/// # Errors
///
/// [`Error::DatasetMismatch`] if the paired counts disagree, [`Error::ReadDir`]
/// if a directory cannot be listed and [`Error::ReadAnnotation`] if a paired
/// annotation file cannot be read.
///
/// # Examples
///
/// ```no_run
/// use dota_render::{CategoryColors, ColorScheme, load_dataset};
///
/// let mut colors = CategoryColors::new(ColorScheme::Random);
/// let catalog = load_dataset("DOTA/images", "DOTA/labelTxt", &mut colors)?;
///
/// for entry in &catalog {
///     println!("{} -> {}", entry.image, entry.annotation);
/// }
/// println!("{} categories", colors.len());
/// # Ok::<(), dota_render::Error>(())
/// ```
pub fn load_dataset<R: Rng>(
    images_dir: impl AsRef<Path>,
    annotations_dir: impl AsRef<Path>,
    colors: &mut CategoryColors<R>,
) -> Result<Catalog> {
    let images_dir = images_dir.as_ref();
    let annotations_dir = annotations_dir.as_ref();

    let images = list_files(images_dir, &IMAGE_EXTENSIONS)?;
    let annotations = list_files(annotations_dir, &[ANNOTATION_EXTENSION])?;
    let (image_count, annotation_count) = (images.len(), annotations.len());

    let entries = pair_by_stem(images, annotations)?;
    log::info!(
        "paired {} of {image_count} image(s) and {annotation_count} annotation file(s)",
        entries.len()
    );

    for entry in &entries {
        let text = read_annotation_text(&annotations_dir.join(&entry.annotation))?;
        colors.register_all(categories(&text));
    }
    log::info!("found {} categories", colors.len());

    let by_stem = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| Some((stem(&entry.image)?.to_owned(), index)))
        .collect();

    Ok(Catalog {
        images_dir: images_dir.to_path_buf(),
        annotations_dir: annotations_dir.to_path_buf(),
        entries,
        by_stem,
    })
}
