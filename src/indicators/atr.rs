/// Average True Range with Wilder smoothing
///
/// The first `period` true ranges are averaged, then
/// `ATR = (prev·(n−1) + TR) / n`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    count: usize,
    sum: f64,
    value: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev_close: None,
            count: 0,
            sum: 0.0,
            value: None,
        }
    }

    /// Feed one bar, return the current ATR once warm
    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tr = match self.prev_close {
            Some(prev) => (high - low)
                .max((high - prev).abs())
                .max((low - prev).abs()),
            None => high - low,
        };
        self.prev_close = Some(close);
        self.count += 1;

        let n = self.period as f64;
        self.value = match self.value {
            Some(prev) => Some((prev * (n - 1.0) + tr) / n),
            None => {
                self.sum += tr;
                (self.count >= self.period).then(|| self.sum / n)
            }
        };
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_warmup_and_smoothing() {
        let mut atr = Atr::new(2);
        // TR = 2
        assert_eq!(atr.update(11.0, 9.0, 10.0), None);
        // TR = max(4, |14-10|, |10-10|) = 4 -> seed (2+4)/2
        assert_eq!(atr.update(14.0, 10.0, 12.0), Some(3.0));
        // TR = max(1, |13-12|, |12-12|) = 1 -> (3*1 + 1)/2
        assert_eq!(atr.update(13.0, 12.0, 12.5), Some(2.0));
    }

    #[test]
    fn test_atr_uses_gap_from_previous_close() {
        let mut atr = Atr::new(1);
        atr.update(10.0, 9.0, 10.0);
        // gap up: high-low = 1 but high - prev close = 6
        assert_eq!(atr.update(16.0, 15.0, 15.5), Some(6.0));
    }
}
