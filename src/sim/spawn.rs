//! Spawn placement
//!
//! Picks a random anchor, jitters it, and keeps the first point nothing
//! occupies. When the retry budget runs out the first anchor is used as-is;
//! overlapping another body beats failing to spawn.

use glam::Vec2;
use rand::Rng;

use super::spatial::SpatialQuery;
use crate::error::SimFault;
use crate::random_offset;
use crate::tuning::SpawnTuning;

/// Finds free positions near fixed spawn anchors
#[derive(Debug, Clone)]
pub struct SpawnPlacer {
    anchors: Vec<Vec2>,
    attempts: u32,
    jitter: f32,
}

impl SpawnPlacer {
    pub fn new(anchors: Vec<Vec2>, attempts: u32, jitter: f32) -> Self {
        if anchors.is_empty() {
            SimFault::MissingCollaborator {
                what: "spawn anchors",
            }
            .report();
        }
        Self {
            anchors,
            attempts,
            jitter,
        }
    }

    pub fn from_tuning(tuning: &SpawnTuning) -> Self {
        Self::new(tuning.anchors.clone(), tuning.attempts, tuning.jitter)
    }

    pub fn anchors(&self) -> &[Vec2] {
        &self.anchors
    }

    /// Find a spawn position
    ///
    /// Returns `None` only when there are no anchors at all.
    pub fn place<R: Rng, Q: SpatialQuery + ?Sized>(&self, rng: &mut R, space: &Q) -> Option<Vec2> {
        let fallback = *self.anchors.first()?;

        for _ in 0..self.attempts {
            let anchor = self.anchors[rng.random_range(0..self.anchors.len())];
            let candidate = anchor + random_offset(rng, self.jitter);
            if !space.query_occupied(candidate) {
                return Some(candidate);
            }
        }

        SimFault::ExhaustedRetry {
            attempts: self.attempts,
        }
        .report();
        Some(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{AgentKind, AgentRef};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct AlwaysOccupied;

    impl SpatialQuery for AlwaysOccupied {
        fn query_occupied(&self, _point: Vec2) -> bool {
            true
        }

        fn query_nearby(&self, _: Vec2, _: f32, _: Option<AgentKind>) -> Vec<AgentRef> {
            Vec::new()
        }
    }

    struct NeverOccupied;

    impl SpatialQuery for NeverOccupied {
        fn query_occupied(&self, _point: Vec2) -> bool {
            false
        }

        fn query_nearby(&self, _: Vec2, _: f32, _: Option<AgentKind>) -> Vec<AgentRef> {
            Vec::new()
        }
    }

    /// Occupied left of x = 0
    struct LeftHalfOccupied;

    impl SpatialQuery for LeftHalfOccupied {
        fn query_occupied(&self, point: Vec2) -> bool {
            point.x < 0.0
        }

        fn query_nearby(&self, _: Vec2, _: f32, _: Option<AgentKind>) -> Vec<AgentRef> {
            Vec::new()
        }
    }

    fn anchors() -> Vec<Vec2> {
        vec![Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0)]
    }

    #[test]
    fn test_fully_occupied_falls_back_to_first_anchor() {
        let placer = SpawnPlacer::new(anchors(), 10, 24.0);
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(placer.place(&mut rng, &AlwaysOccupied), Some(Vec2::new(-100.0, 0.0)));
        }
    }

    #[test]
    fn test_free_space_stays_within_jitter() {
        let placer = SpawnPlacer::new(anchors(), 10, 24.0);
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..200 {
            let pos = placer.place(&mut rng, &NeverOccupied).unwrap();
            let near_anchor = placer
                .anchors()
                .iter()
                .any(|a| (pos.x - a.x).abs() <= 24.0 && (pos.y - a.y).abs() <= 24.0);
            assert!(near_anchor, "{pos:?} is not within jitter of any anchor");
        }
    }

    #[test]
    fn test_skips_occupied_candidates() {
        let placer = SpawnPlacer::new(anchors(), 10, 24.0);
        let mut rng = Pcg32::seed_from_u64(3);
        // With two anchors and ten tries, landing on the right one is near-certain
        let mut free_hits = 0;
        for _ in 0..100 {
            let pos = placer.place(&mut rng, &LeftHalfOccupied).unwrap();
            if pos.x >= 0.0 {
                free_hits += 1;
            } else {
                assert_eq!(pos, Vec2::new(-100.0, 0.0));
            }
        }
        assert!(free_hits >= 95);
    }

    #[test]
    fn test_no_anchors() {
        let placer = SpawnPlacer::new(Vec::new(), 10, 24.0);
        let mut rng = Pcg32::seed_from_u64(4);
        assert_eq!(placer.place(&mut rng, &NeverOccupied), None);
    }
}
