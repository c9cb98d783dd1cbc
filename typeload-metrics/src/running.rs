#[derive(Debug, Default, Clone, Copy)]
pub struct RunningStats {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, x: f64) {
        self.n = self.n.saturating_add(1);
        let n_f = self.n as f64;

        let delta = x - self.mean;
        self.mean += delta / n_f;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;

        if self.n == 1 || x < self.min {
            self.min = x;
        }
        if self.n == 1 || x > self.max {
            self.max = x;
        }
    }

    pub fn count(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn stdev(&self) -> f64 {
        if self.n < 2 {
            return 0.0;
        }
        (self.m2 / (self.n as f64 - 1.0)).sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Result of a single [`RunningLatency::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyEstimate {
    pub mean: f64,
    pub stdev: f64,
    pub count: u64,
    pub min: f64,
    pub max: f64,
}

/// Online latency estimator; keeps no raw samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningLatency {
    stats: RunningStats,
}

impl RunningLatency {
    pub fn update(&mut self, sample_ms: f64) -> LatencyEstimate {
        self.stats.push(sample_ms);
        self.estimate()
    }

    pub fn estimate(&self) -> LatencyEstimate {
        LatencyEstimate {
            mean: self.stats.mean(),
            stdev: self.stats.stdev(),
            count: self.stats.count(),
            min: self.stats.min(),
            max: self.stats.max(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.stats.count() > 0
    }
}
