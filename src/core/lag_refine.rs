use crate::types::{CcError, CcResult};
use ndarray::ArrayView1;
use num_traits::Float;

/// Sub-sample lag refinement parameters
#[derive(Debug, Clone)]
pub struct LagRefinerParams {
    /// Coarse correlation sampling interval (seconds)
    pub dt: f64,
    /// dt / dt_fine
    pub fine_ratio: usize,
    /// Profile covers lags -halfwidth..=halfwidth around the coarse peak
    pub halfwidth: usize,
}

impl Default for LagRefinerParams {
    fn default() -> Self {
        Self {
            dt: 0.01,
            fine_ratio: 100, // dt_fine = dt / 100
            halfwidth: 1,    // 3-point quadratic
        }
    }
}

/// Refined lag for one measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinedLag {
    /// Fine-grid correction relative to the coarse peak (seconds)
    pub sub_sample_offset: f64,
    /// coarse_index * dt + sub_sample_offset (seconds)
    pub lag: f64,
}

/// Interpolates a neighbor-score profile onto a fine grid and locates its peak
///
/// The profile samples lags `-h..=h` (coarse units) around the coarse
/// best lag. The interpolating polynomial of degree `2h` through them is
/// evaluated every `dt_fine` and the position of its maximum, relative to
/// the centre, is the sub-sample offset.
#[derive(Debug, Clone)]
pub struct LagRefiner {
    params: LagRefinerParams,
}

impl LagRefiner {
    pub fn new() -> Self {
        Self {
            params: LagRefinerParams::default(),
        }
    }

    pub fn with_params(params: LagRefinerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &LagRefinerParams {
        &self.params
    }

    /// Expected neighbor-profile length
    pub fn profile_len(&self) -> usize {
        2 * self.params.halfwidth + 1
    }

    /// Fine-grid resolution (seconds)
    pub fn dt_fine(&self) -> f64 {
        self.params.dt / self.params.fine_ratio as f64
    }

    /// Number of fine-grid points
    pub fn fine_len(&self) -> usize {
        2 * self.params.halfwidth * self.params.fine_ratio + 1
    }

    /// Full refinement: coarse lag plus sub-sample offset
    pub fn refine(&self, profile: ArrayView1<f32>, coarse_index: i32) -> CcResult<RefinedLag> {
        let sub_sample_offset = self.sub_sample_offset(profile)?;
        Ok(RefinedLag {
            sub_sample_offset,
            lag: coarse_index as f64 * self.params.dt + sub_sample_offset,
        })
    }

    /// Offset of the interpolated peak from the coarse peak (seconds)
    pub fn sub_sample_offset(&self, profile: ArrayView1<f32>) -> CcResult<f64> {
        if profile.len() != self.profile_len() {
            return Err(CcError::Config(format!(
                "neighbor profile has {} samples, refiner expects {} (halfwidth {})",
                profile.len(),
                self.profile_len(),
                self.params.halfwidth
            )));
        }

        let fine = self.interpolate(profile);
        let center = fine.len() / 2;
        let best = argmax_toward(&fine, center).unwrap_or(center);

        Ok((best as f64 - center as f64) * self.dt_fine())
    }

    /// Evaluate the interpolant on the fine grid
    pub fn interpolate(&self, profile: ArrayView1<f32>) -> Vec<f64> {
        let coeffs = forward_differences(profile.iter().map(|&v| v as f64).collect());
        let ratio = self.params.fine_ratio as f64;

        (0..self.fine_len())
            .map(|m| newton_forward(&coeffs, m as f64 / ratio))
            .collect()
    }
}

impl Default for LagRefiner {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading forward differences [y0, Δy0, Δ²y0, ...] of equally spaced samples
fn forward_differences(mut values: Vec<f64>) -> Vec<f64> {
    let n = values.len();
    let mut leading = Vec::with_capacity(n);
    for k in 0..n {
        leading.push(values[0]);
        for i in 0..n - k - 1 {
            values[i] = values[i + 1] - values[i];
        }
    }
    leading
}

/// Newton forward form at node coordinate `s` (nodes at 0, 1, 2, ...)
///
/// A constant profile has all higher differences exactly zero, so the
/// result is exactly the constant.
fn newton_forward(coeffs: &[f64], s: f64) -> f64 {
    let mut value = 0.0;
    let mut basis = 1.0;
    for (k, &c) in coeffs.iter().enumerate() {
        value += c * basis;
        basis *= (s - k as f64) / (k + 1) as f64;
    }
    value
}

/// Index of the maximum; equal maxima resolve to the one nearest `center`.
/// NaN entries never win.
pub fn argmax_toward<T: Float>(values: &[T], center: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        best = match best {
            None => Some(i),
            Some(b) if v > values[b] => Some(i),
            Some(b) if v == values[b] && i.abs_diff(center) < b.abs_diff(center) => Some(i),
            keep => keep,
        };
    }
    best
}

/// Index of the first maximum; the first NaN wins outright, so a block
/// holding NaN yields an index whose score fails any threshold
pub fn argmax_first<T: Float>(values: impl IntoIterator<Item = T>) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if v.is_nan() {
            return Some(i);
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
