use std::sync::Arc;

use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::channels::ChannelBuffers;
use crate::error::{Error, Result};

/// Forward transform plus magnitude extraction, run on every channel once a
/// frame is complete.
///
/// No window is applied; the transform sees the raw samples.
pub struct SpectralPipeline {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    parallel: bool,
}

impl SpectralPipeline {
    pub fn new(fft_size: usize, parallel: bool) -> Result<Self> {
        if fft_size == 0 || !fft_size.is_power_of_two() {
            return Err(Error::InvalidFftSize(fft_size));
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        Ok(Self {
            fft_size,
            fft,
            parallel,
        })
    }

    /// In-place forward transform of an interleaved complex buffer of `2N` floats.
    ///
    /// # Panics
    ///
    /// If the buffer is not exactly `2N` floats long.
    pub fn transform(&self, buffer: &mut [f32]) {
        assert_eq!(
            buffer.len(),
            2 * self.fft_size,
            "complex buffer must hold 2 * fft_size floats"
        );
        let bins: &mut [Complex<f32>] = bytemuck::cast_slice_mut(buffer);
        self.fft.process(bins);
    }

    /// `output[k] = sqrt(re[k]^2 + im[k]^2)` for every complex sample of `input`.
    ///
    /// # Panics
    ///
    /// If `output` is not exactly half the length of `input`.
    pub fn magnitude(input: &[f32], output: &mut [f32]) {
        assert_eq!(
            input.len(),
            2 * output.len(),
            "magnitude buffer must hold half as many floats as its complex input"
        );
        let bins: &[Complex<f32>] = bytemuck::cast_slice(input);
        for (out, c) in output.iter_mut().zip(bins) {
            *out = c.norm();
        }
    }

    /// Transforms every channel in place and refreshes its magnitude buffer.
    pub fn run(&self, buffers: &mut ChannelBuffers) {
        let pairs: Vec<_> = buffers.pairs_mut().collect();
        if self.parallel {
            pairs
                .into_par_iter()
                .for_each(|(_, complex, magnitude)| self.process_channel(complex, magnitude));
        } else {
            for (_, complex, magnitude) in pairs {
                self.process_channel(complex, magnitude);
            }
        }
    }

    fn process_channel(&self, complex: &mut [f32], magnitude: &mut [f32]) {
        self.transform(complex);
        Self::magnitude(complex, magnitude);
    }
}
