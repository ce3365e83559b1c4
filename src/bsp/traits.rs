//! Split plane selection for the face BSP

use crate::bsp::BspFace;
use crate::float_types::{CLIP_EPSILON, Real};
use crate::plane::{BACK, FRONT, PlaneIndex, PlaneSet, SPANNING};

/// Picks the plane a node is split by. Implementations must be
/// deterministic: the same faces in the same order give the same answer.
pub trait SplitPlaneStrategy {
    /// Returns the canonical (even) index of the chosen plane, or `None` when
    /// `faces` is empty.
    fn select_split_plane(&self, faces: &[BspFace], planes: &PlaneSet) -> Option<PlaneIndex>;
}

/// Default strategy: axial planes first, then fewest splits and best balance.
///
/// Candidates are the distinct planes of `faces` in first-seen order. When any
/// candidate is axial only axial candidates are considered. Each candidate is
/// scored `split_weight * splits + balance_weight * |front - back|` and the
/// lowest score wins; ties keep the earliest candidate.
#[derive(Debug, Clone, Copy)]
pub struct AxialBalancedStrategy {
    pub split_weight: Real,
    pub balance_weight: Real,
}

impl Default for AxialBalancedStrategy {
    fn default() -> Self {
        Self {
            split_weight: 5.0,
            balance_weight: 1.0,
        }
    }
}

impl SplitPlaneStrategy for AxialBalancedStrategy {
    fn select_split_plane(&self, faces: &[BspFace], planes: &PlaneSet) -> Option<PlaneIndex> {
        let mut candidates: Vec<PlaneIndex> = Vec::new();
        for face in faces {
            let canonical = PlaneSet::canonical(face.plane_num);
            if !candidates.contains(&canonical) {
                candidates.push(canonical);
            }
        }
        if candidates.iter().any(|&c| planes[c].is_axial()) {
            candidates.retain(|&c| planes[c].is_axial());
        }

        let mut best: Option<(PlaneIndex, Real)> = None;
        for &candidate in &candidates {
            let plane = &planes[candidate];
            let (mut front, mut back, mut splits) = (0usize, 0usize, 0usize);
            for face in faces {
                if PlaneSet::canonical(face.plane_num) == candidate {
                    continue;
                }
                match plane.classify_points(&face.winding.points, CLIP_EPSILON) {
                    FRONT => front += 1,
                    BACK => back += 1,
                    SPANNING => splits += 1,
                    _ => {},
                }
            }
            let score = self.split_weight * splits as Real
                + self.balance_weight * (front as Real - back as Real).abs();
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((candidate, score));
            }
        }
        best.map(|(plane, _)| plane)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::winding::Winding;
    use nalgebra::Vector3;

    fn face(planes: &mut PlaneSet, normal: Vector3<Real>, dist: Real) -> BspFace {
        let plane_num = planes.intern(normal, dist);
        let winding = Winding::base_for_plane(&planes[plane_num], 16.0);
        BspFace { plane_num, winding }
    }

    #[test]
    fn prefers_axial_planes() {
        let mut planes = PlaneSet::new();
        let faces = vec![
            face(&mut planes, Vector3::new(1.0, 1.0, 0.0), 0.0),
            face(&mut planes, Vector3::z(), 64.0),
        ];
        let split = AxialBalancedStrategy::default()
            .select_split_plane(&faces, &planes)
            .expect("faces present");
        assert_eq!(planes[split].normal, Vector3::z());
    }

    #[test]
    fn deterministic_and_canonical() {
        let mut planes = PlaneSet::new();
        let faces = vec![
            face(&mut planes, -Vector3::x(), 8.0),
            face(&mut planes, Vector3::x(), 8.0),
            face(&mut planes, Vector3::y(), 0.0),
        ];
        let strategy = AxialBalancedStrategy::default();
        let a = strategy.select_split_plane(&faces, &planes);
        let b = strategy.select_split_plane(&faces, &planes);
        assert_eq!(a, b);
        assert_eq!(a.map(|p| p % 2), Some(0));
        assert!(strategy.select_split_plane(&[], &planes).is_none());
    }
}
