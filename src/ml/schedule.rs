// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Linear warmup followed by linear decay to zero:
//
//   lr
//   peak ┤     /\
//        │    /   \
//        │   /      \
//        │  /         \
//      0 ┼─┴────────────┴──► step
//        0  warmup      total
//
// Step `s` is the index of the optimiser update (0-based); the rate
// returned for it is the one that update uses. With warmup = 0 the
// first update runs at the peak rate.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    peak:         f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl LinearSchedule {
    pub fn new(peak: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { peak, warmup_steps, total_steps }
    }

    pub fn lr(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.peak * step as f64 / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let span      = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.peak * (remaining / span).max(0.0)
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }
}
