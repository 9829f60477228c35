use thiserror::Error;

use crate::physics::BodyId;
use crate::scene::MeshId;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when building or driving the scene.
///
/// Degenerate pointer projections are not errors: they yield `None` and the
/// projector keeps its previous point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Geometry with no vertices or with out-of-range indices.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Body parameters outside their valid range (mass, radius, extents).
    #[error("invalid body: {0}")]
    InvalidBody(String),

    #[error("unknown body {0:?}")]
    UnknownBody(BodyId),

    #[error("unknown mesh {0:?}")]
    UnknownMesh(MeshId),

    /// Viewport with a zero dimension.
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_is_informative() {
        let e = Error::InvalidBody("mass must be positive".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid body"));
        assert!(msg.contains("mass"));

        let e = Error::InvalidViewport { width: 0, height: 480 };
        assert_eq!(format!("{e}"), "invalid viewport 0x480");
    }
}
