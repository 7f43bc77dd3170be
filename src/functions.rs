//! Time functions scaling concentrated forces and pressure constraints

use serde::{Deserialize, Serialize};

use crate::error::{MpmError, MpmResult};

/// A scalar multiplier evaluated at the current analysis time
///
/// Functions are shared between many nodes as `Arc<dyn TimeFunction>`.
pub trait TimeFunction: Send + Sync {
    fn value(&self, time: f64) -> f64;
}

impl<F> TimeFunction for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn value(&self, time: f64) -> f64 {
        self(time)
    }
}

/// Piecewise-linear function through a table of (x, f(x)) points
///
/// Outside the table the first or last value is held constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearFunction {
    xvalues: Vec<f64>,
    fxvalues: Vec<f64>,
}

impl LinearFunction {
    /// Create a function from matching x and f(x) tables
    ///
    /// `xvalues` must be non-empty and strictly increasing.
    pub fn new(xvalues: Vec<f64>, fxvalues: Vec<f64>) -> MpmResult<Self> {
        if xvalues.is_empty() {
            return Err(MpmError::InvalidFunction("empty table".to_string()));
        }
        if xvalues.len() != fxvalues.len() {
            return Err(MpmError::InvalidFunction(format!(
                "{} x values but {} f(x) values",
                xvalues.len(),
                fxvalues.len()
            )));
        }
        if xvalues.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MpmError::InvalidFunction(
                "x values must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { xvalues, fxvalues })
    }

    /// Linear ramp from 0 at `t = 0` to 1 at `t = duration`, then held at 1
    pub fn ramp(duration: f64) -> MpmResult<Self> {
        Self::new(vec![0.0, duration], vec![0.0, 1.0])
    }
}

impl TimeFunction for LinearFunction {
    fn value(&self, time: f64) -> f64 {
        let last = self.xvalues.len() - 1;
        if time <= self.xvalues[0] {
            return self.fxvalues[0];
        }
        if time >= self.xvalues[last] {
            return self.fxvalues[last];
        }
        // First table entry strictly greater than `time`
        let upper = self.xvalues.partition_point(|&x| x <= time);
        let (x0, x1) = (self.xvalues[upper - 1], self.xvalues[upper]);
        let (f0, f1) = (self.fxvalues[upper - 1], self.fxvalues[upper]);
        f0 + (f1 - f0) * (time - x0) / (x1 - x0)
    }
}
