//! Complex FFT engine used by the line plans.
//!
//! A [`ComplexFft`] is built once for a fixed length and then executed any
//! number of times without allocating. Power-of-two lengths run a Stockham
//! autosort radix-2 kernel; every other length goes through Bluestein's
//! chirp-z algorithm on top of an inner power-of-two Stockham transform.
//! All twiddle factors, chirp tables and scratch space are computed at
//! construction.

use alloc::boxed::Box;
use alloc::vec::Vec;

pub use crate::num::{Complex, Complex32, Complex64, Float};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FftError {
    EmptyInput,
    MismatchedLengths,
    InvalidValue,
    /// Reserving the given number of elements failed.
    Allocation(usize),
}

/// Allocate a vector of `len` copies of `fill`, reporting allocation failure
/// instead of aborting.
pub(crate) fn try_filled<V: Copy>(len: usize, fill: V) -> Result<Vec<V>, FftError> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|_| FftError::Allocation(len))?;
    out.resize(len, fill);
    Ok(out)
}

/// Twiddle table of `n / 2` entries holding `exp(-2πi·k/n)`.
fn stockham_twiddles<T: Float>(n: usize) -> Result<Vec<Complex<T>>, FftError> {
    let half = n / 2;
    let n_t = T::from_usize(n).ok_or(FftError::InvalidValue)?;
    let two_pi = T::from_f32(2.0) * T::pi();
    let mut table = try_filled(half, Complex::zero())?;
    for (k, w) in table.iter_mut().enumerate() {
        let k_t = T::from_usize(k).ok_or(FftError::InvalidValue)?;
        *w = Complex::expi(-(two_pi * k_t) / n_t);
    }
    Ok(table)
}

/// Radix-2 Stockham FFT. `data.len()` must be a power of two and match
/// `scratch.len()`; `twiddles` comes from [`stockham_twiddles`].
fn stockham<T: Float>(data: &mut [Complex<T>], scratch: &mut [Complex<T>], twiddles: &[Complex<T>]) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());
    debug_assert_eq!(scratch.len(), n);

    // n1 = number of groups, n2 = size of each group in this pass.
    let mut n1 = 1usize;
    let mut n2 = n;
    let mut in_scratch = false;
    while n1 < n {
        n2 >>= 1;
        let (src, dst): (&[Complex<T>], &mut [Complex<T>]) = if in_scratch {
            (&scratch[..], &mut data[..])
        } else {
            (&data[..], &mut scratch[..])
        };
        for k in 0..n1 {
            // exp(-2πi * k / (2*n1)) = table[k * n2]
            let w = twiddles[k * n2];
            let base0 = 2 * k * n2;
            let base1 = base0 + n2;
            for j in 0..n2 {
                let u = src[base0 + j];
                let v = src[base1 + j] * w;
                dst[k * n2 + j] = u + v;
                dst[(k + n1) * n2 + j] = u - v;
            }
        }
        in_scratch = !in_scratch;
        n1 <<= 1;
    }

    if in_scratch {
        data.copy_from_slice(scratch);
    }
}

/// Precomputed state for Bluestein's algorithm at one length.
struct Bluestein<T: Float> {
    /// `exp(-iπ·k²/n)` for `k = 0..n`.
    chirp: Vec<Complex<T>>,
    /// Forward FFT of the conjugate chirp, wrapped to length `m`.
    kernel: Vec<Complex<T>>,
    /// Twiddles for the inner length-`m` transform.
    twiddles: Vec<Complex<T>>,
    work: Vec<Complex<T>>,
    work_scratch: Vec<Complex<T>>,
}

impl<T: Float> Bluestein<T> {
    fn new(n: usize) -> Result<Self, FftError> {
        let m = (2 * n - 1).next_power_of_two();
        let n_t = T::from_usize(n).ok_or(FftError::InvalidValue)?;
        let twiddles = stockham_twiddles::<T>(m)?;

        let mut chirp = try_filled(n, Complex::zero())?;
        // k² mod 2n keeps the angle small for large k.
        let mut q = 0usize;
        for (k, c) in chirp.iter_mut().enumerate() {
            let q_t = T::from_usize(q).ok_or(FftError::InvalidValue)?;
            *c = Complex::expi(-(T::pi() * q_t) / n_t);
            q = (q + 2 * k + 1) % (2 * n);
        }

        let mut kernel = try_filled(m, Complex::zero())?;
        for i in 0..n {
            kernel[i] = chirp[i].conj();
        }
        for i in 1..n {
            kernel[m - i] = kernel[i];
        }
        let mut work_scratch = try_filled(m, Complex::zero())?;
        stockham(&mut kernel, &mut work_scratch, &twiddles);

        Ok(Self {
            chirp,
            kernel,
            twiddles,
            work: try_filled(m, Complex::zero())?,
            work_scratch,
        })
    }

    fn run(&mut self, data: &mut [Complex<T>]) -> Result<(), FftError> {
        let n = self.chirp.len();
        let m = self.kernel.len();
        let scale = T::one() / T::from_usize(m).ok_or(FftError::InvalidValue)?;

        for (w, (&x, &c)) in self.work.iter_mut().zip(data.iter().zip(self.chirp.iter())) {
            *w = x * c;
        }
        for w in self.work[n..].iter_mut() {
            *w = Complex::zero();
        }
        stockham(&mut self.work, &mut self.work_scratch, &self.twiddles);
        for (w, &k) in self.work.iter_mut().zip(self.kernel.iter()) {
            *w = (*w * k).conj();
        }
        stockham(&mut self.work, &mut self.work_scratch, &self.twiddles);
        for (out, (&w, &c)) in data.iter_mut().zip(self.work.iter().zip(self.chirp.iter())) {
            *out = w.conj().scale(scale) * c;
        }
        Ok(())
    }
}

enum Kernel<T: Float> {
    Identity,
    Stockham {
        twiddles: Vec<Complex<T>>,
        scratch: Vec<Complex<T>>,
    },
    Bluestein(Box<Bluestein<T>>),
}

/// A complex FFT bound to one transform length.
///
/// Building the transform computes every table it needs; [`forward`] and
/// [`inverse`] only touch memory owned by the transform and the caller's
/// slice.
///
/// [`forward`]: ComplexFft::forward
/// [`inverse`]: ComplexFft::inverse
pub struct ComplexFft<T: Float> {
    len: usize,
    kernel: Kernel<T>,
}

impl<T: Float> ComplexFft<T> {
    pub fn new(len: usize) -> Result<Self, FftError> {
        let kernel = match len {
            0 => return Err(FftError::EmptyInput),
            1 => Kernel::Identity,
            n if n.is_power_of_two() => Kernel::Stockham {
                twiddles: stockham_twiddles(n)?,
                scratch: try_filled(n, Complex::zero())?,
            },
            n => Kernel::Bluestein(Box::new(Bluestein::new(n)?)),
        };
        Ok(Self { len, kernel })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this length runs through the chirp-z path.
    pub fn uses_bluestein(&self) -> bool {
        matches!(self.kernel, Kernel::Bluestein(_))
    }

    /// Unnormalized forward transform, in place.
    pub fn forward(&mut self, data: &mut [Complex<T>]) -> Result<(), FftError> {
        if data.len() != self.len {
            return Err(FftError::MismatchedLengths);
        }
        match &mut self.kernel {
            Kernel::Identity => Ok(()),
            Kernel::Stockham { twiddles, scratch } => {
                stockham(data, scratch, twiddles);
                Ok(())
            }
            Kernel::Bluestein(b) => b.run(data),
        }
    }

    /// Inverse transform scaled by `1/len`, in place.
    pub fn inverse(&mut self, data: &mut [Complex<T>]) -> Result<(), FftError> {
        if data.len() != self.len {
            return Err(FftError::MismatchedLengths);
        }
        for c in data.iter_mut() {
            c.im = -c.im;
        }
        self.forward(data)?;
        let scale = T::one() / T::from_usize(self.len).ok_or(FftError::InvalidValue)?;
        for c in data.iter_mut() {
            *c = c.conj().scale(scale);
        }
        Ok(())
    }
}
