use super::ema::Ema;

/// MACD line and its signal line
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    /// Feed one close, return `(macd, signal)`; the signal warms up after
    /// `signal` MACD values have been produced
    pub fn update(&mut self, close: f64) -> (Option<f64>, Option<f64>) {
        let fast = self.fast.update(close);
        let slow = self.slow.update(close);
        match (fast, slow) {
            (Some(f), Some(s)) => {
                let line = f - s;
                (Some(line), self.signal.update(line))
            }
            _ => (None, None),
        }
    }
}
