//! Compile errors and recoverable diagnostics

use crate::float_types::Real;
use nalgebra::Point3;
use std::fmt::Display;
use std::path::PathBuf;

/// Which kind of authored primitive a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Brush,
    Patch,
}

impl Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveKind::Brush => write!(f, "brush"),
            PrimitiveKind::Patch => write!(f, "patch"),
        }
    }
}

/// Problems that are recovered from locally. The compile still produces a
/// usable (possibly leaking or suboptimal) map; these are handed back to the
/// caller alongside it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    /// (DegenerateGeometry) A brush or patch produced no valid faces and was skipped
    DegenerateGeometry {
        entity: usize,
        primitive: usize,
        kind: PrimitiveKind,
    },
    /// (UnsealedMap) The outside flood fill reached an occupied leaf
    UnsealedMap {
        entity: usize,
        occupant: Point3<Real>,
        path_len: usize,
    },
    /// (LightCapExceeded) More lights touch a group than it can store
    LightCapExceeded {
        entity: usize,
        area: usize,
        group: usize,
        count: usize,
    },
    /// (EntityInSolid) An occupant origin sits inside an opaque leaf
    EntityInSolid { entity: usize, origin: Point3<Real> },
    /// (NoOccupants) Nothing marks the playable interior, leak detection is skipped
    NoOccupants { entity: usize },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DegenerateGeometry { entity, primitive, kind } => write!(
                f,
                "(DegenerateGeometry) entity {}, {} {}: no valid faces, skipped",
                entity, kind, primitive
            ),
            Diagnostic::UnsealedMap { entity, occupant, path_len } => write!(
                f,
                "(UnsealedMap) entity {} leaked: occupant at {} is reachable from outside ({} points in leak path)",
                entity, occupant, path_len
            ),
            Diagnostic::LightCapExceeded { entity, area, group, count } => write!(
                f,
                "(LightCapExceeded) entity {}, area {}, group {}: {} lights, keeping the nearest {}",
                entity,
                area,
                group,
                count,
                crate::light::MAX_GROUP_LIGHTS
            ),
            Diagnostic::EntityInSolid { entity, origin } => {
                write!(f, "(EntityInSolid) entity {} origin {} is in solid", entity, origin)
            },
            Diagnostic::NoOccupants { entity } => write!(
                f,
                "(NoOccupants) entity {} has no occupants in empty space, leak test skipped",
                entity
            ),
        }
    }
}

/// Outcomes that abort a compile.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The compiled map could not be written. No partial file is left behind.
    #[error("failed to write {}: {source}", path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The progress callback asked to stop.
    #[error("compile cancelled by caller during {stage}")]
    Cancelled { stage: String },
}

/// Errors raised while reading a compiled map back.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("compiled map version {found} does not match supported version {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("malformed compiled map at token {position}: {message}")]
    Malformed { position: usize, message: String },
}
