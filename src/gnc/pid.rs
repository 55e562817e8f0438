// ---------------------------------------------------------------------------
// PID controller (single axis)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Anti-windup: the integral is clamped to +-this value.
    pub integral_limit: f64,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(kp: f64, ki: f64, kd: f64, integral_limit: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral_limit: integral_limit.abs(),
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let limit = self.integral_limit;
        self.integral = (self.integral + error * dt).clamp(-limit, limit);
        let derivative = if dt > 0.0 { (error - self.prev_error) / dt } else { 0.0 };
        self.prev_error = error;
        self.kp * error + self.ki * self.integral + self.kd * derivative
    }

    /// Output for `error` from the stored integral, without accumulating.
    /// The derivative term is left out.
    pub fn hold(&self, error: f64) -> f64 {
        self.kp * error + self.ki * self.integral
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[cfg(test)]
    pub(crate) fn prev_error(&self) -> f64 {
        self.prev_error
    }
}
