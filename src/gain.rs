//! Time gain compensation along the depth axis.

use alloc::vec::Vec;

use crate::error::SpectraError;
use crate::fft::try_filled;
use crate::num::Float;
use crate::scheduler::{RegionScheduler, WorkerArena};
use crate::volume::{Volume, VolumeSlab};

/// Depth-dependent linear gain along axis 0.
///
/// The gain curve is a list of `(depth, gain)` knots with strictly
/// increasing depths. Gains between knots are interpolated linearly; depths
/// outside the curve take the gain of the nearest end knot. The depth of a
/// sample is its physical position along axis 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGainCompensation {
    knots: Vec<(f64, f64)>,
}

impl Default for TimeGainCompensation {
    /// Unity gain everywhere.
    fn default() -> Self {
        Self {
            knots: alloc::vec![(0.0, 1.0), (1.0, 1.0)],
        }
    }
}

impl TimeGainCompensation {
    pub fn new(knots: Vec<(f64, f64)>) -> Result<Self, SpectraError> {
        if knots.len() < 2 {
            return Err(SpectraError::InvalidConfig(
                "gain curve needs at least two knots",
            ));
        }
        if knots.iter().any(|(d, g)| !d.is_finite() || !g.is_finite()) {
            return Err(SpectraError::InvalidConfig("gain curve must be finite"));
        }
        if knots.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(SpectraError::InvalidConfig(
                "gain curve depths must be strictly increasing",
            ));
        }
        Ok(Self { knots })
    }

    pub fn knots(&self) -> &[(f64, f64)] {
        &self.knots
    }

    pub fn gain_at(&self, depth: f64) -> f64 {
        let upper = self.knots.partition_point(|&(d, _)| d <= depth);
        if upper == 0 {
            return self.knots[0].1;
        }
        if upper == self.knots.len() {
            return self.knots[upper - 1].1;
        }
        let (d0, g0) = self.knots[upper - 1];
        let (d1, g1) = self.knots[upper];
        g0 + (g1 - g0) * (depth - d0) / (d1 - d0)
    }

    /// Scale the lines of `slab` by the gain at each sample's depth in
    /// `input`. The slab must lie inside the input's region.
    pub fn generate_region<T: Float, const D: usize>(
        &self,
        input: &Volume<T, D>,
        slab: &mut VolumeSlab<'_, T, D>,
    ) -> Result<(), SpectraError> {
        let largest = input.region();
        if D == 0 || !largest.contains_region(&slab.region()) {
            return Err(SpectraError::RegionOutsideVolume);
        }
        let region = slab.region();
        let origin = input.origin()[0];
        let spacing = input.spacing()[0];
        let mut gains = try_filled(region.size[0], T::zero())?;
        for (i, g) in gains.iter_mut().enumerate() {
            let index = region.index[0] + i as isize;
            *g = T::from_f64(self.gain_at(origin + index as f64 * spacing));
        }
        for (idx, line) in slab.lines_mut() {
            let src = input.line_at(&idx).ok_or(SpectraError::RegionOutsideVolume)?;
            let offset = (idx[0] - largest.index[0]) as usize;
            for ((out, &x), &g) in line.iter_mut().zip(&src[offset..]).zip(&gains) {
                *out = x * g;
            }
        }
        Ok(())
    }

    /// Apply the gain to a whole volume. The output keeps the input geometry.
    pub fn apply<T: Float, const D: usize>(
        &self,
        input: &Volume<T, D>,
    ) -> Result<Volume<T, D>, SpectraError> {
        let mut output = Volume::from_info(input.info(), T::zero())?;
        let region = output.region();
        let mut slab = output.slab_mut(region)?;
        self.generate_region(input, &mut slab)?;
        Ok(output)
    }

    /// Like [`apply`](Self::apply), dispatched across `scheduler`'s workers.
    pub fn apply_with<T: Float, const D: usize>(
        &self,
        scheduler: &RegionScheduler,
        input: &Volume<T, D>,
    ) -> Result<Volume<T, D>, SpectraError> {
        let mut output = Volume::from_info(input.info(), T::zero())?;
        let mut arena = WorkerArena::new(scheduler.workers(), || ());
        scheduler.dispatch(&mut output, &mut arena, |_, slab| {
            self.generate_region(input, slab)
        })?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Region;
    use alloc::vec;

    #[test]
    fn test_curve_validation() {
        assert!(TimeGainCompensation::new(vec![(0.0, 1.0)]).is_err());
        assert!(TimeGainCompensation::new(vec![(0.0, 1.0), (0.0, 2.0)]).is_err());
        assert!(TimeGainCompensation::new(vec![(0.0, 1.0), (f64::NAN, 2.0)]).is_err());
        assert!(TimeGainCompensation::new(vec![(0.0, 1.0), (1.0, 2.0)]).is_ok());
    }

    #[test]
    fn test_interpolation_and_clamping() {
        let tgc = TimeGainCompensation::new(vec![(1.0, 2.0), (3.0, 6.0), (5.0, 6.0)]).unwrap();
        assert_eq!(tgc.gain_at(0.0), 2.0);
        assert_eq!(tgc.gain_at(1.0), 2.0);
        assert_eq!(tgc.gain_at(2.0), 4.0);
        assert_eq!(tgc.gain_at(4.0), 6.0);
        assert_eq!(tgc.gain_at(9.0), 6.0);
    }

    #[test]
    fn test_apply_uses_physical_depth() {
        let input = Volume::from_vec(Region::from_size([4, 2]), vec![1.0f64; 8])
            .unwrap()
            .with_origin([1.0, 0.0])
            .with_spacing([0.5, 1.0]);
        let tgc = TimeGainCompensation::new(vec![(1.0, 1.0), (3.0, 5.0)]).unwrap();
        let out = tgc.apply(&input).unwrap();
        // Depths 1.0, 1.5, 2.0, 2.5 on both lines.
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out.spacing(), input.spacing());
    }

    #[test]
    fn test_default_is_identity() {
        let input = Volume::from_vec(Region::from_size([3, 1]), vec![1.5f32, -2.0, 0.25]).unwrap();
        let out = TimeGainCompensation::default().apply(&input).unwrap();
        assert_eq!(out.as_slice(), input.as_slice());
    }
}
