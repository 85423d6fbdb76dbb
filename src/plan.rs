//! Transform plans and the per-context plan cache.
//!
//! A [`LinePlan`] is the expensive part of a line transform: twiddle tables,
//! chirp spectra for non-power-of-two lengths and the input/output buffers
//! the lines are staged through. A [`PlanCache`] keeps exactly one plan,
//! keyed by `(length, direction)`, and rebuilds it from scratch whenever a
//! request does not match. Plans are never shared: every execution context
//! owns its own cache.

use alloc::vec::Vec;

use crate::error::SpectraError;
use crate::fft::{try_filled, ComplexFft};
use crate::num::{Complex, Float};
use crate::rfft::{half_spectrum_len, RealFft};

/// Direction of a line transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Real samples to spectrum.
    Forward,
    /// Spectrum to real samples.
    Inverse,
}

/// Storage layout of the complex side of a transform.
///
/// Chosen once per deployment. `HalfMatrix` keeps only the `⌊N/2⌋ + 1`
/// non-redundant bins of a conjugate-symmetric spectrum and is valid only for
/// real-valued signals; `FullMatrix` keeps all `N` bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpectrumLayout {
    #[default]
    HalfMatrix,
    FullMatrix,
}

impl SpectrumLayout {
    pub fn is_full_matrix(self) -> bool {
        matches!(self, SpectrumLayout::FullMatrix)
    }

    /// Number of complex bins stored for a real line of length `n`.
    pub fn spectrum_len(self, n: usize) -> usize {
        match self {
            SpectrumLayout::HalfMatrix => half_spectrum_len(n),
            SpectrumLayout::FullMatrix => n,
        }
    }

    /// Real line length implied by `bins` stored bins when no explicit
    /// length is configured. A half-matrix spectrum is assumed to come from
    /// an even-length signal.
    pub fn default_real_len(self, bins: usize) -> usize {
        match self {
            SpectrumLayout::HalfMatrix => 2 * bins.saturating_sub(1),
            SpectrumLayout::FullMatrix => bins,
        }
    }
}

enum Engine<T: Float> {
    Half(RealFft<T>),
    Full(ComplexFft<T>),
}

/// An execution plan bound to one `(length, direction, layout)` together
/// with the buffers it reads from and writes to.
///
/// For forward plans the real buffer is the input and the spectrum buffer
/// the output; inverse plans swap the roles. Full-matrix inverse plans
/// overwrite their input buffer while executing.
pub struct LinePlan<T: Float> {
    len: usize,
    direction: Direction,
    layout: SpectrumLayout,
    engine: Engine<T>,
    real: Vec<T>,
    spectrum: Vec<Complex<T>>,
}

impl<T: Float> LinePlan<T> {
    /// Build a plan and allocate its buffers. This is the costly step that
    /// [`PlanCache`] amortizes.
    pub fn build(
        len: usize,
        direction: Direction,
        layout: SpectrumLayout,
    ) -> Result<Self, SpectraError> {
        if len == 0 {
            return Err(SpectraError::EmptyTransform);
        }
        let engine = match layout {
            SpectrumLayout::HalfMatrix => Engine::Half(RealFft::new(len)?),
            SpectrumLayout::FullMatrix => Engine::Full(ComplexFft::new(len)?),
        };
        Ok(Self {
            len,
            direction,
            layout,
            engine,
            real: try_filled(len, T::zero())?,
            spectrum: try_filled(layout.spectrum_len(len), Complex::zero())?,
        })
    }

    /// Real line length the plan was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn layout(&self) -> SpectrumLayout {
        self.layout
    }

    /// Number of complex bins on the spectral side.
    pub fn spectrum_len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn real_buffer(&self) -> &[T] {
        &self.real
    }

    pub fn real_buffer_mut(&mut self) -> &mut [T] {
        &mut self.real
    }

    pub fn spectrum_buffer(&self) -> &[Complex<T>] {
        &self.spectrum
    }

    pub fn spectrum_buffer_mut(&mut self) -> &mut [Complex<T>] {
        &mut self.spectrum
    }

    /// Run the plan on its own buffers.
    pub fn execute(&mut self) -> Result<(), SpectraError> {
        match (&mut self.engine, self.direction) {
            (Engine::Half(fft), Direction::Forward) => fft.forward(&self.real, &mut self.spectrum)?,
            (Engine::Half(fft), Direction::Inverse) => fft.inverse(&self.spectrum, &mut self.real)?,
            (Engine::Full(fft), Direction::Forward) => {
                for (c, &x) in self.spectrum.iter_mut().zip(self.real.iter()) {
                    *c = Complex::new(x, T::zero());
                }
                fft.forward(&mut self.spectrum)?;
            }
            (Engine::Full(fft), Direction::Inverse) => {
                fft.inverse(&mut self.spectrum)?;
                for (x, c) in self.real.iter_mut().zip(self.spectrum.iter()) {
                    *x = c.re;
                }
            }
        }
        Ok(())
    }

    /// Transform the first [`len`](LinePlan::len) samples of `line` and
    /// return the spectrum. A line shorter than the plan is rejected before
    /// the transform runs.
    pub fn forward_line(&mut self, line: &[T]) -> Result<&[Complex<T>], SpectraError> {
        if self.direction != Direction::Forward {
            return Err(SpectraError::DirectionMismatch);
        }
        if line.len() < self.len {
            return Err(SpectraError::LineTooShort {
                required: self.len,
                available: line.len(),
            });
        }
        self.real.copy_from_slice(&line[..self.len]);
        self.execute()?;
        Ok(&self.spectrum)
    }

    /// Reconstruct a real line from the first
    /// [`spectrum_len`](LinePlan::spectrum_len) bins of `spectrum`.
    pub fn inverse_line(&mut self, spectrum: &[Complex<T>]) -> Result<&[T], SpectraError> {
        if self.direction != Direction::Inverse {
            return Err(SpectraError::DirectionMismatch);
        }
        let bins = self.spectrum.len();
        if spectrum.len() < bins {
            return Err(SpectraError::LineTooShort {
                required: bins,
                available: spectrum.len(),
            });
        }
        self.spectrum.copy_from_slice(&spectrum[..bins]);
        self.execute()?;
        Ok(&self.real)
    }
}

/// Holds at most one [`LinePlan`] and rebuilds it on demand.
///
/// Not `Clone`: each execution context owns its cache, and the scheduler
/// hands a cache to one slab at a time.
pub struct PlanCache<T: Float> {
    layout: SpectrumLayout,
    plan: Option<LinePlan<T>>,
    builds: usize,
}

impl<T: Float> Default for PlanCache<T> {
    fn default() -> Self {
        Self::new(SpectrumLayout::default())
    }
}

impl<T: Float> PlanCache<T> {
    pub fn new(layout: SpectrumLayout) -> Self {
        Self {
            layout,
            plan: None,
            builds: 0,
        }
    }

    pub fn layout(&self) -> SpectrumLayout {
        self.layout
    }

    /// Return the cached plan if it was built for `(len, direction)`,
    /// otherwise drop it and build a new one.
    pub fn get_or_build(
        &mut self,
        len: usize,
        direction: Direction,
    ) -> Result<&mut LinePlan<T>, SpectraError> {
        if len == 0 {
            return Err(SpectraError::EmptyTransform);
        }
        let stale = match &self.plan {
            Some(plan) => plan.len != len || plan.direction != direction,
            None => true,
        };
        if stale {
            if let Some(old) = self.plan.take() {
                debug_log!(
                    "dropping {:?} plan of length {} for {:?} length {}",
                    old.direction,
                    old.len,
                    direction,
                    len
                );
                drop(old);
            }
            let plan = LinePlan::build(len, direction, self.layout)?;
            self.builds += 1;
            debug_log!(
                "built {:?} {:?} plan of length {} (build #{})",
                self.layout,
                direction,
                len,
                self.builds
            );
            return Ok(self.plan.insert(plan));
        }
        trace_log!("reusing {:?} plan of length {}", direction, len);
        self.plan.as_mut().ok_or(SpectraError::EmptyTransform)
    }

    /// The plan currently held, if any.
    pub fn plan(&self) -> Option<&LinePlan<T>> {
        self.plan.as_ref()
    }

    /// Length of the last plan built, if one is cached.
    pub fn last_len(&self) -> Option<usize> {
        self.plan.as_ref().map(LinePlan::len)
    }

    /// Number of plans built over the lifetime of this cache.
    pub fn builds(&self) -> usize {
        self.builds
    }

    /// Drop the cached plan and its buffers.
    pub fn clear(&mut self) {
        self.plan = None;
    }
}
