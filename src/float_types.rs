// Our Real scalar type:
#[cfg(feature = "f32")]
pub type Real = f32;
#[cfg(feature = "f64")]
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Lazily-initialized tolerance used for generic "is this zero" tests.
/// Defaults depend on precision (`f32` vs `f64`), but can be overridden:
///  1) **Build-time**: set env var `PROCMAP_TOLERANCE` (e.g. `PROCMAP_TOLERANCE=1e-6 cargo build`)
///  2) **Runtime**: call [`set_tolerance`] once before compiling anything
static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

#[inline]
const fn default_tolerance() -> Real {
    #[cfg(feature = "f32")]
    {
        1e-4
    }
    #[cfg(feature = "f64")]
    {
        1e-6
    }
}

/// Returns the current tolerance value.
/// If not set yet, it tries `PROCMAP_TOLERANCE` (parsed as the active `Real`) and
/// falls back to a sensible default.
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        if let Some(environment_variable) = option_env!("PROCMAP_TOLERANCE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.max(Real::EPSILON);
            }
        }
        default_tolerance()
    })
}

/// Set the tolerance programmatically once (subsequent calls are ignored).
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Plane and clipping tolerances
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// Per-component tolerance when comparing two plane normals.
pub const NORMAL_EPSILON: Real = 1e-5;

/// Tolerance when comparing two plane distances.
pub const DIST_EPSILON: Real = 1e-4;

/// Points closer than this to a plane are "on" it while clipping brush faces.
pub const CLIP_EPSILON: Real = 0.01;

/// Windings with less area than this are considered clipped away.
pub const MIN_WINDING_AREA: Real = 1e-3;

/// An edge shorter than this does not count towards a winding being "real".
pub const EDGE_LENGTH: Real = 0.2;

/// Grid that vertex positions are snapped to before they are hashed.
pub const VERTEX_SNAP: Real = 1.0 / 32.0;

/// Vertices closer than this are unified during the T-junction pass.
pub const VERTEX_EPSILON: Real = 0.05;

/// A vertex closer than this to an edge is considered to lie on it.
pub const COLINEAR_EPSILON: Real = 0.1;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// World limits
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
pub const MAX_WORLD_COORD: Real = 128.0 * 1024.0;
pub const MIN_WORLD_COORD: Real = -128.0 * 1024.0;
pub const MAX_WORLD_SIZE: Real = MAX_WORLD_COORD - MIN_WORLD_COORD;

/// Gap between the entity bounds and the head-node portals.
pub const SIDESPACE: Real = 8.0;
