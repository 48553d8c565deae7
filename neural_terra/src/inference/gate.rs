/// Drops frames older than a maximum age.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGate {
    max_age: f64,
}

impl Default for FrameGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_AGE)
    }
}

impl FrameGate {
    /// Default maximum age in seconds.
    pub const DEFAULT_MAX_AGE: f64 = 0.2;

    /// Gate with `max_age` seconds.
    pub fn new(max_age: f64) -> Self {
        Self { max_age }
    }

    /// Maximum accepted age.
    pub fn max_age(&self) -> f64 {
        self.max_age
    }

    /// Whether a frame stamped `stamp` is fresh at `now`.
    pub fn accept(&self, stamp: f64, now: f64) -> bool {
        let age = now - stamp;
        if age > self.max_age {
            log::warn!(
                "Stale frame received ({:.3} > {} s), skipping",
                age,
                self.max_age
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate() {
        let gate = FrameGate::default();
        assert!(gate.accept(10.0, 10.1));
        assert!(gate.accept(10.0, 10.2));
        assert!(!gate.accept(10.0, 10.25));
        assert!(FrameGate::new(1.0).accept(10.0, 10.9));
    }
}
