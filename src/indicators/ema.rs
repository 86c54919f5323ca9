/// Exponential moving average seeded with a simple average
///
/// Nothing is produced for the first `period - 1` observations; the
/// `period`-th value is the mean of the window, after which
/// `value = α·x + (1−α)·prev` with `α = 2/(period+1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    count: usize,
    sum: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            count: 0,
            sum: 0.0,
            value: None,
        }
    }

    /// Feed one observation, return the current average once warm
    pub fn update(&mut self, x: f64) -> Option<f64> {
        self.count += 1;
        self.value = match self.value {
            Some(prev) => Some(self.alpha * x + (1.0 - self.alpha) * prev),
            None => {
                self.sum += x;
                (self.count >= self.period).then(|| self.sum / self.period as f64)
            }
        };
        self.value
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}
