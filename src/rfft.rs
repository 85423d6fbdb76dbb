//! Real-input FFT built on top of [`ComplexFft`].
//!
//! Even lengths pack pairs of real samples into a half-length complex
//! transform and unpack the result with a table of post-processing
//! twiddles. Odd lengths fall back to a full-length complex transform. In
//! both cases the spectrum holds the `⌊N/2⌋ + 1` non-redundant bins of a
//! conjugate-symmetric signal.

use alloc::vec::Vec;

use crate::fft::{try_filled, ComplexFft, FftError};
use crate::num::{Complex, Float};

/// Number of real samples that make up a complex pair.
pub const STRIDE: usize = 2;

/// Scalar used for halving values during post-processing.
pub const HALF: f32 = 0.5;

/// Number of spectrum bins kept for a real signal of length `n`.
#[inline]
pub const fn half_spectrum_len(n: usize) -> usize {
    n / STRIDE + 1
}

/// Build `m` post-processing twiddles `exp(-iπ·k/m)`.
fn build_pack_twiddles<T: Float>(m: usize) -> Result<Vec<Complex<T>>, FftError> {
    if m == 0 {
        return Err(FftError::InvalidValue);
    }
    let m_t = T::from_usize(m).ok_or(FftError::InvalidValue)?;
    let mut table = try_filled(m, Complex::zero())?;
    for (k, w) in table.iter_mut().enumerate() {
        let k_t = T::from_usize(k).ok_or(FftError::InvalidValue)?;
        *w = Complex::expi(-(T::pi() * k_t) / m_t);
    }
    Ok(table)
}

enum Strategy<T: Float> {
    /// Even lengths: half-size complex FFT plus post-processing.
    Packed {
        half: ComplexFft<T>,
        twiddles: Vec<Complex<T>>,
        work: Vec<Complex<T>>,
    },
    /// Odd lengths: full complex FFT of the zero-imaginary signal.
    Direct {
        full: ComplexFft<T>,
        work: Vec<Complex<T>>,
    },
}

/// Real↔half-spectrum transform bound to one signal length.
pub struct RealFft<T: Float> {
    len: usize,
    strategy: Strategy<T>,
}

impl<T: Float> RealFft<T> {
    pub fn new(len: usize) -> Result<Self, FftError> {
        if len == 0 {
            return Err(FftError::EmptyInput);
        }
        let strategy = if len.is_multiple_of(STRIDE) {
            let m = len / STRIDE;
            Strategy::Packed {
                half: ComplexFft::new(m)?,
                twiddles: build_pack_twiddles(m)?,
                work: try_filled(m, Complex::zero())?,
            }
        } else {
            Strategy::Direct {
                full: ComplexFft::new(len)?,
                work: try_filled(len, Complex::zero())?,
            }
        };
        Ok(Self { len, strategy })
    }

    /// Length of the real signal.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of complex bins produced by [`RealFft::forward`].
    pub fn spectrum_len(&self) -> usize {
        half_spectrum_len(self.len)
    }

    /// Unnormalized forward transform of `input` into the half spectrum.
    pub fn forward(&mut self, input: &[T], output: &mut [Complex<T>]) -> Result<(), FftError> {
        if input.len() != self.len || output.len() != self.spectrum_len() {
            return Err(FftError::MismatchedLengths);
        }
        match &mut self.strategy {
            Strategy::Packed {
                half,
                twiddles,
                work,
            } => {
                let m = work.len();
                for (i, w) in work.iter_mut().enumerate() {
                    *w = Complex::new(input[STRIDE * i], input[STRIDE * i + 1]);
                }
                half.forward(work)?;
                let y0 = work[0];
                output[0] = Complex::new(y0.re + y0.im, T::zero());
                output[m] = Complex::new(y0.re - y0.im, T::zero());
                let half_t = T::from_f32(HALF);
                for k in 1..m {
                    let a = work[k];
                    let b = work[m - k].conj();
                    let sum = a + b;
                    let diff = a - b;
                    let t = twiddles[k] * diff;
                    let temp = sum + Complex::new(t.im, -t.re);
                    output[k] = temp.scale(half_t);
                }
                Ok(())
            }
            Strategy::Direct { full, work } => {
                for (w, &x) in work.iter_mut().zip(input.iter()) {
                    *w = Complex::new(x, T::zero());
                }
                full.forward(work)?;
                let bins = output.len();
                output.copy_from_slice(&work[..bins]);
                Ok(())
            }
        }
    }

    /// Inverse transform of a half spectrum, scaled by `1/len`.
    ///
    /// The imaginary parts of the DC bin (and of the Nyquist bin for even
    /// lengths) are ignored.
    pub fn inverse(&mut self, input: &[Complex<T>], output: &mut [T]) -> Result<(), FftError> {
        if output.len() != self.len || input.len() != self.spectrum_len() {
            return Err(FftError::MismatchedLengths);
        }
        match &mut self.strategy {
            Strategy::Packed {
                half,
                twiddles,
                work,
            } => {
                let m = work.len();
                let half_t = T::from_f32(HALF);
                work[0] = Complex::new(
                    (input[0].re + input[m].re) * half_t,
                    (input[0].re - input[m].re) * half_t,
                );
                for k in 1..m {
                    let a = input[k];
                    let b = input[m - k].conj();
                    let sum = a + b;
                    let diff = a - b;
                    let t = twiddles[k].conj() * diff;
                    let temp = sum - Complex::new(t.im, -t.re);
                    work[k] = temp.scale(half_t);
                }
                half.inverse(work)?;
                for (i, w) in work.iter().enumerate() {
                    output[STRIDE * i] = w.re;
                    output[STRIDE * i + 1] = w.im;
                }
                Ok(())
            }
            Strategy::Direct { full, work } => {
                let n = self.len;
                let bins = input.len();
                work[..bins].copy_from_slice(input);
                for k in bins..n {
                    work[k] = input[n - k].conj();
                }
                full.inverse(work)?;
                for (o, w) in output.iter_mut().zip(work.iter()) {
                    *o = w.re;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Complex64;
    use alloc::vec;

    fn naive_real_dft(input: &[f64]) -> Vec<Complex64> {
        let n = input.len();
        (0..half_spectrum_len(n))
            .map(|k| {
                input.iter().enumerate().fold(Complex64::zero(), |acc, (j, &x)| {
                    let angle = -2.0 * core::f64::consts::PI * ((j * k) % n) as f64 / n as f64;
                    acc + Complex64::expi(angle).scale(x)
                })
            })
            .collect()
    }

    #[test]
    fn test_forward_matches_dft_even_and_odd() {
        for &n in &[1usize, 2, 3, 4, 6, 7, 8, 15, 16, 20, 64] {
            let input: Vec<f64> = (0..n).map(|i| ((i * 7 + 3) % 11) as f64 - 5.0).collect();
            let expected = naive_real_dft(&input);
            let mut fft = RealFft::<f64>::new(n).unwrap();
            let mut out = vec![Complex64::zero(); fft.spectrum_len()];
            fft.forward(&input, &mut out).unwrap();
            for (a, b) in out.iter().zip(expected.iter()) {
                assert!((a.re - b.re).abs() < 1e-9, "n={n}: {a:?} vs {b:?}");
                assert!((a.im - b.im).abs() < 1e-9, "n={n}: {a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_roundtrip_f32() {
        for &n in &[2usize, 5, 8, 9, 32] {
            let input: Vec<f32> = (0..n).map(|i| (i as f32 * 0.37).sin()).collect();
            let mut fft = RealFft::<f32>::new(n).unwrap();
            let mut freq = vec![Complex::zero(); fft.spectrum_len()];
            let mut back = vec![0.0f32; n];
            fft.forward(&input, &mut freq).unwrap();
            fft.inverse(&freq, &mut back).unwrap();
            for (a, b) in input.iter().zip(back.iter()) {
                assert!((a - b).abs() < 1e-5, "n={n}: {a} vs {b}");
            }
        }
    }

    #[test]
    fn test_hermitian_edges_are_real() {
        let input = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let mut fft = RealFft::<f32>::new(input.len()).unwrap();
        let mut freq = vec![Complex::zero(); fft.spectrum_len()];
        fft.forward(&input, &mut freq).unwrap();
        assert!(freq[0].im.abs() < 1e-6);
        assert!(freq[freq.len() - 1].im.abs() < 1e-6);
        assert!((freq[0].re - 36.0).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_mismatched_buffers() {
        let mut fft = RealFft::<f32>::new(8).unwrap();
        let input = [0.0f32; 8];
        let mut wrong = vec![Complex::zero(); 8];
        assert_eq!(
            fft.forward(&input, &mut wrong),
            Err(FftError::MismatchedLengths)
        );
        assert!(matches!(RealFft::<f64>::new(0), Err(FftError::EmptyInput)));
    }
}
