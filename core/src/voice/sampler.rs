/// Reads a mono sample buffer at fractional positions with linear
/// interpolation.
///
/// Past the last sample, the reader continues into the first sample when
/// looping and into silence otherwise.
pub struct LinearSampler<'a> {
    data: &'a [f32],
    looping: bool,
}

impl<'a> LinearSampler<'a> {
    pub fn new(data: &'a [f32], looping: bool) -> Self {
        Self { data, looping }
    }

    #[inline(always)]
    fn get_index(&self, index: usize) -> f32 {
        match self.data.get(index) {
            Some(v) => *v,
            None if self.looping => self.data.first().copied().unwrap_or(0.0),
            None => 0.0,
        }
    }

    #[inline(always)]
    pub fn get(&self, position: f64) -> f32 {
        let index = position as usize;
        let blend = (position - index as f64) as f32;

        let value_first = self.get_index(index);
        let value_second = self.get_index(index + 1);

        value_first * (1.0 - blend) + value_second * blend
    }
}
