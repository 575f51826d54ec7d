//! Shared helpers for climate computations.

/// Seasonal sine wave for a season expressed as a fraction of the year.
///
/// Returns values in [-1, 1]; 0.25 is the warm peak.
pub fn season_sin(season: f32) -> f32 {
    (std::f32::consts::TAU * season).sin()
}

/// Latitude (radians) of row `y` for a map covering `span` of the pole-to-pole arc.
pub fn row_latitude(y: u32, height: u32, span: f32) -> f32 {
    let v = y as f32 / (height.max(2) - 1) as f32;
    (v - 0.5) * std::f32::consts::PI * span
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_sin_peaks() {
        assert!((season_sin(0.25) - 1.0).abs() < 1e-6);
        assert!((season_sin(0.75) + 1.0).abs() < 1e-6);
        assert!(season_sin(0.0).abs() < 1e-6);
    }

    #[test]
    fn test_row_latitude_is_symmetric() {
        let top = row_latitude(0, 11, 1.0);
        let bottom = row_latitude(10, 11, 1.0);
        assert!((top + bottom).abs() < 1e-6);
        assert!(row_latitude(5, 11, 1.0).abs() < 1e-6);
    }
}
