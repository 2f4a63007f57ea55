//! Server reconciliation of the locally predicted player position.
//!
//! A prediction that drifted further than [`SNAP_DISTANCE`] from the
//! server's position (a teleport, or a collision the client did not see) is
//! replaced outright. Smaller errors are blended away by [`BLEND_FACTOR`] per
//! update so they show up as a smooth correction instead of jitter.

use glam::DVec3;

/// Largest prediction error, in blocks, that is blended instead of snapped.
pub const SNAP_DISTANCE: f64 = 0.5;

/// Fraction of the remaining error removed per authoritative update.
pub const BLEND_FACTOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Prediction matched the server exactly.
    None,
    /// Small error: move part of the way towards the server.
    Blend(DVec3),
    /// Large error: jump to the server position.
    Snap(DVec3),
}

impl Correction {
    /// Position after the correction, given the prediction it was made for.
    pub fn apply(self, predicted: DVec3) -> DVec3 {
        match self {
            Correction::None => predicted,
            Correction::Blend(p) | Correction::Snap(p) => p,
        }
    }

    pub fn is_snap(&self) -> bool {
        matches!(self, Correction::Snap(_))
    }
}

pub fn reconcile(predicted: DVec3, authoritative: DVec3) -> Correction {
    let error = predicted.distance(authoritative);
    if error == 0.0 {
        Correction::None
    } else if error > SNAP_DISTANCE {
        Correction::Snap(authoritative)
    } else {
        Correction::Blend(predicted.lerp(authoritative, BLEND_FACTOR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_prediction_needs_nothing() {
        let p = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(reconcile(p, p), Correction::None);
        assert_eq!(Correction::None.apply(p), p);
    }

    #[test]
    fn small_error_blends_thirty_percent() {
        let predicted = DVec3::new(0.0, 64.0, 0.0);
        let server = DVec3::new(0.4, 64.0, 0.0);
        let corrected = reconcile(predicted, server);
        assert!(!corrected.is_snap());
        let p = corrected.apply(predicted);
        assert!((p.x - 0.12).abs() < 1e-12);
        assert_eq!(p.y, 64.0);
    }

    #[test]
    fn error_at_the_threshold_still_blends() {
        let predicted = DVec3::ZERO;
        let server = DVec3::new(0.0, 0.0, SNAP_DISTANCE);
        assert!(matches!(reconcile(predicted, server), Correction::Blend(_)));
    }

    #[test]
    fn large_error_snaps_exactly() {
        let predicted = DVec3::new(10.0, 65.0, 10.0);
        let server = DVec3::new(10.0, 65.0, 12.0);
        let corrected = reconcile(predicted, server);
        assert!(corrected.is_snap());
        assert_eq!(corrected.apply(predicted), server);
    }
}
