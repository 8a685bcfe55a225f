use super::config::ScalingMode;

/// Min-max scaler from raw 8-bit pixels to `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageScaler {
    min: f32,
    max: f32,
    mode: ScalingMode,
    observed: Option<(u8, u8)>,
}

impl ImageScaler {
    pub fn new(min: f32, max: f32, mode: ScalingMode) -> Self {
        Self {
            min,
            max,
            mode,
            observed: None,
        }
    }

    /// Recomputes the observed raw range from `ranges`, discarding any earlier fit.
    pub fn fit<I>(&mut self, ranges: I)
    where
        I: IntoIterator<Item = (u8, u8)>,
    {
        self.observed = ranges
            .into_iter()
            .reduce(|(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)));
    }

    pub fn observed_range(&self) -> Option<(u8, u8)> {
        self.observed
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    fn source_range(&self) -> (f32, f32) {
        match (self.mode, self.observed) {
            (ScalingMode::Observed, Some((lo, hi))) => (lo as f32, hi as f32),
            _ => (0.0, 255.0),
        }
    }

    pub fn transform(&self, raw: u8) -> f32 {
        let (lo, hi) = self.source_range();
        let span = hi - lo;
        let unit = if span > 0.0 { (raw as f32 - lo) / span } else { 0.0 };
        // Not clamp: inverted bounds must not panic.
        (self.min + unit * (self.max - self.min)).max(self.min).min(self.max)
    }

    /// Scales one HWC image into a CHW slice.
    pub fn transform_hwc_into_chw(&self, pixels: &[u8], height: usize, width: usize, channels: usize, out: &mut [f32]) {
        let plane = height * width;
        for (pixel, values) in pixels.chunks_exact(channels).enumerate() {
            for (c, &raw) in values.iter().enumerate() {
                out[c * plane + pixel] = self.transform(raw);
            }
        }
    }
}
