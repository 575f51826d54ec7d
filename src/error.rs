//! Error types shared by the simulation core.

use thiserror::Error;

use crate::erosion::wgpu::ErosionGpuError;

/// Errors reported synchronously by core operations.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// Two grids that must share dimensions do not.
    #[error("Invalid dimension for {what}: expected {expected} cells, found {found}")]
    InvalidDimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A parameter is outside its valid domain.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    /// A working buffer could not be allocated.
    #[error("Unable to allocate working buffer of {cells} cells")]
    ResourceExhaustion { cells: usize },
    #[error("GPU erosion failed: {0}")]
    Gpu(#[from] ErosionGpuError),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

impl TerrainError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Checks that a per-cell grid has exactly `expected` entries.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(TerrainError::InvalidDimension {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Allocates a zero-filled buffer, reporting allocation failure instead of aborting.
pub(crate) fn try_zeroed(cells: usize) -> Result<Vec<f32>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(cells)
        .map_err(|_| TerrainError::ResourceExhaustion { cells })?;
    buf.resize(cells, 0.0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_len_mismatch() {
        let err = check_len("moisture", 16, 15).unwrap_err();
        assert!(matches!(
            err,
            TerrainError::InvalidDimension { expected: 16, found: 15, .. }
        ));
    }

    #[test]
    fn test_try_zeroed_reports_exhaustion() {
        let err = try_zeroed(usize::MAX / 2).unwrap_err();
        assert!(matches!(err, TerrainError::ResourceExhaustion { .. }));
    }

    #[test]
    fn test_error_messages_name_the_parameter() {
        let err = TerrainError::invalid("resolution", "must be non-zero");
        assert_eq!(err.to_string(), "Invalid parameter 'resolution': must be non-zero");
    }
}
