//! Five-number summaries, as shown by box plots.

/// Quantiles are interpolated linearly between the closest ranks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// `sorted` must be sorted ascending and non-empty, `p` in 0..=1.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl BoxStats {
    /// None for an empty input.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut vals: Vec<f64> = values.into_iter().collect();
        if vals.is_empty() {
            return None;
        }
        vals.sort_by(f64::total_cmp);
        Some(BoxStats {
            n: vals.len(),
            min: vals[0],
            q1: quantile(&vals, 0.25),
            median: quantile(&vals, 0.5),
            q3: quantile(&vals, 0.75),
            max: vals[vals.len() - 1],
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}
