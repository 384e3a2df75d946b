use glam::DVec2;
use serde::{Deserialize, Serialize};

/// How the reflection image is tiled around the visible area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReflexStyle {
    /// A single tile.
    Grid1x1,
    /// The main tile surrounded by eight copies.
    #[default]
    Grid3x3,
}

impl ReflexStyle {
    pub fn count(self) -> usize {
        self.row_count() * self.row_count()
    }

    pub fn row_count(self) -> usize {
        match self {
            ReflexStyle::Grid1x1 => 1,
            ReflexStyle::Grid3x3 => 3,
        }
    }
}

/// Reflection layer description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflex {
    /// Gap between neighbouring tiles, in points.
    pub spacing: f64,
    pub style: ReflexStyle,
}

impl Default for Reflex {
    fn default() -> Self {
        Self {
            spacing: 0.0,
            style: ReflexStyle::Grid3x3,
        }
    }
}

impl Reflex {
    pub fn with_spacing(self, spacing: f64) -> Self {
        Self { spacing, ..self }
    }

    pub fn with_style(self, style: ReflexStyle) -> Self {
        Self { style, ..self }
    }

    /// Distance after which the tiled pattern repeats.
    pub fn period(&self, tile: DVec2) -> DVec2 {
        tile + DVec2::splat(self.spacing)
    }

    /// Tile centres relative to the main tile, main tile first.
    ///
    /// The 3x3 ring runs row by row from the top left, skipping the centre.
    /// Y grows downwards.
    pub fn tile_offsets(&self, tile: DVec2) -> Vec<DVec2> {
        let period = self.period(tile);
        let mut offsets = vec![DVec2::ZERO];
        if self.style == ReflexStyle::Grid3x3 {
            for row in -1..=1 {
                for col in -1..=1 {
                    if row == 0 && col == 0 {
                        continue;
                    }
                    offsets.push(DVec2::new(col as f64, row as f64) * period);
                }
            }
        }
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_counts() {
        assert_eq!(ReflexStyle::Grid1x1.count(), 1);
        assert_eq!(ReflexStyle::Grid3x3.count(), 9);
        assert_eq!(ReflexStyle::Grid3x3.row_count(), 3);
    }

    #[test]
    fn single_tile_layout() {
        let reflex = Reflex::default().with_style(ReflexStyle::Grid1x1);
        assert_eq!(reflex.tile_offsets(DVec2::new(100.0, 50.0)), vec![DVec2::ZERO]);
    }

    #[test]
    fn grid_ring_is_separated_by_spacing() {
        let reflex = Reflex::default().with_spacing(10.0);
        let tiles = reflex.tile_offsets(DVec2::new(100.0, 50.0));
        assert_eq!(tiles.len(), ReflexStyle::Grid3x3.count());
        assert_eq!(tiles[0], DVec2::ZERO);
        // Top left.
        assert_eq!(tiles[1], DVec2::new(-110.0, -60.0));
        // Top.
        assert_eq!(tiles[2], DVec2::new(0.0, -60.0));
        // Right.
        assert_eq!(tiles[5], DVec2::new(110.0, 0.0));
        // Bottom right.
        assert_eq!(tiles[8], DVec2::new(110.0, 60.0));
    }
}
