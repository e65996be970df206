//! Parsing of DOTA oriented-bounding-box annotation files.
//!
//! Each object is one line of ten space separated tokens:
//!
//! ```text
//! x1 y1 x2 y2 x3 y3 x4 y4 category difficult
//! ```
//!
//! Any line with a different number of tokens (the `imagesource:` and `gsd:`
//! headers of the original dataset, blank lines, ...) is skipped.

use std::{fs, io, path::Path};

use image::Rgb;
use imageproc::point::Point;
use num_traits::ToPrimitive;
use rand::Rng;

use crate::colors::CategoryColors;
use crate::error::{Error, Result};

/// Number of space separated tokens in a record line.
pub const FIELDS_PER_RECORD: usize = 10;

/// One annotated object of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    /// Corners in file order. The polygon is closed, the last corner connects
    /// back to the first.
    pub polygon: [Point<i32>; 4],
    pub category: String,
    /// Kept from the file but never used for drawing.
    pub difficult: bool,
    pub color: Rgb<u8>,
}

/// A record line before a color has been attached to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub polygon: [Point<i32>; 4],
    pub category: &'a str,
    pub difficult: bool,
}

/// Parses a single line, returning `None` for anything that is not a record.
///
/// Coordinates are truncated toward zero, so `10.9` lands on pixel `10` and
/// `-0.5` on pixel `0`.
///
/// # Arguments
///
/// * `line` - One line of an annotation file. A trailing `\n` or `\r\n` is
///   ignored.
///
/// # Returns
///
/// The polygon, category and difficulty flag, or `None` when the line does
/// not have exactly ten space separated tokens or a coordinate is not a
/// number in `i32` range.
///
/// # Examples
///
/// ```
/// use dota_render::parse_line;
///
/// let line = parse_line("10.9 20.2 50.1 20.7 50.5 60.9 10.3 60.0 plane 1").unwrap();
/// assert_eq!(line.category, "plane");
/// assert!(line.difficult);
/// assert_eq!((line.polygon[0].x, line.polygon[0].y), (10, 20));
/// assert_eq!((line.polygon[2].x, line.polygon[2].y), (50, 60));
///
/// assert!(parse_line("imagesource:GoogleEarth").is_none());
/// ```
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let fields: Vec<&str> = line.split(' ').collect();
    if fields.len() != FIELDS_PER_RECORD {
        log::debug!(
            "skipping line with {} field(s), expected {FIELDS_PER_RECORD}: {line:?}",
            fields.len()
        );
        return None;
    }

    let mut coordinates = [0i32; 8];
    for (slot, field) in coordinates.iter_mut().zip(&fields[..8]) {
        match truncate_coordinate(field) {
            Some(value) => *slot = value,
            None => {
                log::warn!("skipping line with invalid coordinate {field:?}: {line:?}");
                return None;
            }
        }
    }

    let [x1, y1, x2, y2, x3, y3, x4, y4] = coordinates;
    Some(ParsedLine {
        polygon: [
            Point::new(x1, y1),
            Point::new(x2, y2),
            Point::new(x3, y3),
            Point::new(x4, y4),
        ],
        category: fields[8],
        difficult: fields[9] != "0",
    })
}

/// Parses a decimal literal and truncates it toward zero.
///
/// Returns `None` for non-numbers, NaN and values outside the `i32` range.
fn truncate_coordinate(field: &str) -> Option<i32> {
    field.parse::<f64>().ok()?.to_i32()
}

/// Iterates the category of every record line of `text`, in line order.
pub fn categories(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter_map(parse_line).map(|line| line.category)
}

/// Parses a whole annotation file's contents, attaching category colors.
///
/// New categories are registered in `colors` as they are met.
pub fn parse_annotations<R: Rng>(
    text: &str,
    colors: &mut CategoryColors<R>,
) -> Vec<AnnotationRecord> {
    text.lines()
        .filter_map(parse_line)
        .map(|line| AnnotationRecord {
            polygon: line.polygon,
            category: line.category.to_owned(),
            difficult: line.difficult,
            color: colors.color_for(line.category),
        })
        .collect()
}

/// Reads the text of an annotation file, treating a missing file as empty.
pub(crate) fn read_annotation_text(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::debug!("annotation file {} not found, no objects", path.display());
            Ok(String::new())
        }
        Err(source) => Err(Error::ReadAnnotation {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads and parses the annotation file at `path`.
///
/// A missing or empty file yields no records.
///
/// # Errors
///
/// [`Error::ReadAnnotation`] when the file exists but cannot be read.
pub fn read_annotations<R: Rng>(
    path: &Path,
    colors: &mut CategoryColors<R>,
) -> Result<Vec<AnnotationRecord>> {
    let text = read_annotation_text(path)?;
    Ok(parse_annotations(&text, colors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::ColorScheme;
    use rand::{SeedableRng, rngs::StdRng};

    fn colors() -> CategoryColors {
        CategoryColors::with_rng(ColorScheme::Random, StdRng::seed_from_u64(42))
    }

    #[test]
    fn parse_line_works() {
        let parsed = parse_line("10.7 20.2 50.9 20.2 50.9 60.8 10.7 60.8 plane 0\n").unwrap();
        assert_eq!(
            parsed.polygon,
            [
                Point::new(10, 20),
                Point::new(50, 20),
                Point::new(50, 60),
                Point::new(10, 60),
            ]
        );
        assert_eq!(parsed.category, "plane");
        assert!(!parsed.difficult);
    }

    #[test]
    fn test_truncation_goes_toward_zero_for_negatives() {
        let parsed = parse_line("-0.5 -3.9 4 0 4 4 0 4 ship 1").unwrap();
        assert_eq!(parsed.polygon[0], Point::new(0, -3));
        assert!(parsed.difficult);
    }

    #[test]
    fn test_wrong_field_count_is_skipped() {
        // Missing difficulty flag.
        assert_eq!(parse_line("1 2 3 4 5 6 7 8 plane"), None);
        // DOTA headers.
        assert_eq!(parse_line("imagesource:GoogleEarth"), None);
        assert_eq!(parse_line("gsd:0.146343590398"), None);
        assert_eq!(parse_line(""), None);
        // A double space produces an empty eleventh field.
        assert_eq!(parse_line("1 2 3 4 5 6 7 8  plane 0"), None);
    }

    #[test]
    fn test_windows_line_ending_is_not_part_of_the_flag() {
        let parsed = parse_line("1 2 3 4 5 6 7 8 plane 0\r\n").unwrap();
        assert!(!parsed.difficult);
    }

    #[test]
    fn test_non_numeric_coordinate_is_skipped() {
        assert_eq!(parse_line("1 2 x 4 5 6 7 8 plane 0"), None);
        assert_eq!(parse_line("NaN 2 3 4 5 6 7 8 plane 0"), None);
        assert_eq!(parse_line("1e12 2 3 4 5 6 7 8 plane 0"), None);
    }

    #[test]
    fn parse_annotations_works() {
        let text = "imagesource:GoogleEarth\n\
                    gsd:0.146\n\
                    0 0 10 0 10 10 0 10 ship 0\n\
                    1 2 3 4 5 6 7 8 plane\n\
                    20 20 30 20 30 30 20 30 plane 1\n\
                    0 0 10 0 10 10 0 10 ship 0\n";
        let mut colors = colors();
        let records = parse_annotations(text, &mut colors);

        let names: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(names, vec!["ship", "plane", "ship"]);
        assert_eq!(records[0], records[2]);
        assert_eq!(records[0].color, colors.get("ship").unwrap());
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let text = "0 0 10 0 10 10 0 10 ship 0\n5.5 5 9 5 9 9 5 9 tennis-court 0\n";
        let mut colors = colors();
        let first = parse_annotations(text, &mut colors);
        let second = parse_annotations(text, &mut colors);
        assert_eq!(first, second);
    }

    #[test]
    fn categories_works() {
        let text = "0 0 1 0 1 1 0 1 b 0\nheader\n0 0 1 0 1 1 0 1 a 0\n";
        assert_eq!(categories(text).collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn test_missing_or_empty_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut colors = colors();

        let missing = dir.path().join("missing.txt");
        assert!(read_annotations(&missing, &mut colors).unwrap().is_empty());

        let empty = dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();
        assert!(read_annotations(&empty, &mut colors).unwrap().is_empty());
    }

    #[test]
    fn read_annotations_works() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P0001.txt");
        fs::write(&path, "10.7 20.2 50.9 20.2 50.9 60.8 10.7 60.8 plane 0\n").unwrap();

        let records = read_annotations(&path, &mut colors()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].polygon[2], Point::new(50, 60));
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        // A directory cannot be read as text.
        let dir = tempfile::tempdir().unwrap();
        let err = read_annotations(dir.path(), &mut colors()).unwrap_err();
        assert!(matches!(err, Error::ReadAnnotation { .. }));
    }
}
