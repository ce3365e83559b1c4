//! A **map geometry compiler** for id-Tech style levels.
//!
//! Turns a scene of convex brushes, Bézier patches, entities and lights into a
//! sealed, [BSP](bsp) partitioned and render-optimized compiled map (`.proc`):
//!
//! 1. brushes are clipped into face windings, patches tessellated ([primitive])
//! 2. the world's structural faces build a BSP tree whose leaves are joined by
//!    portals ([bsp])
//! 3. a flood fill from outside finds leaks, a flood from the occupants finds
//!    the areas ([bsp::flood])
//! 4. visible faces are clipped into areas and grouped ([optimize]); each group
//!    gets up to [`light::MAX_GROUP_LIGHTS`] lights ([light])
//! 5. T-junctions are fixed, groups re-triangulated ([optimize::tjunction],
//!    [optimize::island]) and the result written out ([proc_file])
//!
//! [`Compiler`] drives all of it.
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64

#![forbid(unsafe_code)]
#![warn(clippy::approx_constant, clippy::all)]

pub mod aabb;
pub mod bsp;
pub mod compiler;
pub mod errors;
pub mod float_types;
pub mod light;
pub mod material;
pub mod optimize;
pub mod plane;
pub mod primitive;
pub mod proc_file;
pub mod progress;
pub mod scene;
pub mod winding;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use compiler::{CompileOptions, CompileOutput, CompileStats, Compiler};
pub use errors::{CompileError, Diagnostic, ReadError};
pub use material::{DefaultMaterials, MaterialInfo, MaterialLookup};
pub use proc_file::{ProcFile, ProcSummary};
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use scene::{BrushSide, LightShape, MapBrush, MapEntity, MapLight, MapPatch, PatchControl, Scene};
