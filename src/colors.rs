//! Per-category color assignment.

use image::Rgb;
use indexmap::IndexMap;
use palette::{FromColor, Hsl, Srgb};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Hue step between consecutive categories of [`ColorScheme::Spectral`].
const GOLDEN_ANGLE_DEGREES: f32 = 137.507_77;

/// How a color is picked for a category seen for the first time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorScheme {
    /// Each channel drawn uniformly and independently from `0..=255`.
    #[default]
    Random,
    /// Saturated hues stepped around the color wheel by the golden angle.
    ///
    /// Deterministic: the n-th category always gets the same color.
    Spectral,
}

/// Registry mapping each category label to the color it is drawn with.
///
/// Categories keep their first-seen order and their color never changes once
/// assigned. The registry is append-only and not synchronized; a host sharing
/// it across threads has to put it behind a `Mutex`, since a lookup miss
/// inserts.
#[derive(Debug, Clone)]
pub struct CategoryColors<R = StdRng> {
    colors: IndexMap<String, Rgb<u8>>,
    scheme: ColorScheme,
    rng: R,
}

impl CategoryColors {
    /// Creates an empty registry seeded from the operating system.
    pub fn new(scheme: ColorScheme) -> Self {
        Self::with_rng(scheme, StdRng::from_os_rng())
    }
}

impl Default for CategoryColors {
    fn default() -> Self {
        Self::new(ColorScheme::default())
    }
}

impl<R: Rng> CategoryColors<R> {
    /// Creates an empty registry drawing random colors from `rng`.
    pub fn with_rng(scheme: ColorScheme, rng: R) -> Self {
        Self {
            colors: IndexMap::new(),
            scheme,
            rng,
        }
    }

    /// Returns the color of `category`, assigning a new one on first sight.
    pub fn color_for(&mut self, category: &str) -> Rgb<u8> {
        if let Some(color) = self.colors.get(category) {
            return *color;
        }

        let color = match self.scheme {
            ColorScheme::Random => Rgb([
                self.rng.random::<u8>(),
                self.rng.random::<u8>(),
                self.rng.random::<u8>(),
            ]),
            ColorScheme::Spectral => spectral_color(self.colors.len()),
        };
        log::trace!("assigned color {:?} to category {category:?}", color.0);
        self.colors.insert(category.to_owned(), color);
        color
    }

    /// Registers every category yielded by `categories`, in order.
    pub fn register_all<'a>(&mut self, categories: impl IntoIterator<Item = &'a str>) {
        for category in categories {
            self.color_for(category);
        }
    }
}

impl<R> CategoryColors<R> {
    /// Looks up a color without assigning one.
    pub fn get(&self, category: &str) -> Option<Rgb<u8>> {
        self.colors.get(category).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Iterates categories in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb<u8>)> {
        self.colors.iter().map(|(name, color)| (name.as_str(), *color))
    }
}

/// Generates the `index`-th color of the spectral scheme.
pub(crate) fn spectral_color(index: usize) -> Rgb<u8> {
    let hue = (index as f32 * GOLDEN_ANGLE_DEGREES) % 360.0;

    let saturation = 0.9;
    let lightness = 0.5;

    let hsl_color = Hsl::new(hue, saturation, lightness);
    let srgb_linear = Srgb::from_color(hsl_color);
    let srgb_u8: Srgb<u8> = srgb_linear.into_format();

    Rgb([srgb_u8.red, srgb_u8.green, srgb_u8.blue])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(scheme: ColorScheme) -> CategoryColors {
        CategoryColors::with_rng(scheme, StdRng::seed_from_u64(0x00d0_7a))
    }

    #[test]
    fn color_for_works() {
        let mut colors = seeded(ColorScheme::Random);
        let ship = colors.color_for("ship");
        colors.color_for("plane");
        colors.color_for("harbor");

        assert_eq!(colors.color_for("ship"), ship);
        assert_eq!(colors.get("ship"), Some(ship));
        assert_eq!(colors.len(), 3);
    }

    #[test]
    fn test_categories_keep_first_seen_order() {
        let mut colors = seeded(ColorScheme::Random);
        colors.register_all(["small-vehicle", "plane", "small-vehicle", "bridge", "plane"]);

        let names: Vec<&str> = colors.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["small-vehicle", "plane", "bridge"]);
    }

    #[test]
    fn test_get_does_not_assign() {
        let colors = seeded(ColorScheme::Random);
        assert_eq!(colors.get("ship"), None);
        assert!(colors.is_empty());
    }

    #[test]
    fn test_same_seed_gives_same_assignment() {
        // Values themselves are not asserted, only reproducibility under a fixed seed.
        let mut a = seeded(ColorScheme::Random);
        let mut b = seeded(ColorScheme::Random);
        for category in ["plane", "ship", "storage-tank"] {
            assert_eq!(a.color_for(category), b.color_for(category));
        }
    }

    #[test]
    fn test_spectral_scheme_is_deterministic() {
        let mut a = seeded(ColorScheme::Spectral);
        let mut b = CategoryColors::with_rng(ColorScheme::Spectral, StdRng::seed_from_u64(1));
        a.register_all(["plane", "ship"]);
        b.register_all(["plane", "ship"]);

        assert_eq!(a.get("plane"), b.get("plane"));
        assert_eq!(a.get("ship"), b.get("ship"));
        assert_eq!(a.get("plane"), Some(spectral_color(0)));
    }

    #[test]
    fn spectral_color_works() {
        // Hue 0 with saturation 0.9 and lightness 0.5 is a saturated red.
        assert_eq!(spectral_color(0), Rgb([242, 13, 13]));
        assert_ne!(spectral_color(0), spectral_color(1));
        assert_ne!(spectral_color(1), spectral_color(2));
    }
}
