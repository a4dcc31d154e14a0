//! # Parameter Registry Module
//!
//! Host-settable parameters, keyed by a stable identifier instead of a
//! grow-only dispatch switch. Adding a parameter means adding one enum
//! variant plus its default; get/set and enumeration come for free.

/// Stable identifier for each host-automatable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    /// Linear output gain applied by `process_block`.
    Gain,
    /// Non-zero (>= 0.5) routes input straight to output and pauses analysis.
    Bypass,
}

impl ParameterId {
    /// Every registered parameter, in declaration order.
    pub const ALL: [ParameterId; 2] = [ParameterId::Gain, ParameterId::Bypass];

    /// Value a freshly constructed registry reports for this parameter.
    pub fn default_value(self) -> f32 {
        match self {
            ParameterId::Gain => 1.0,
            ParameterId::Bypass => 0.0,
        }
    }

    /// Human-readable identifier for logs and displays.
    pub fn name(self) -> &'static str {
        match self {
            ParameterId::Gain => "gain",
            ParameterId::Bypass => "bypass",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Current values for every registered parameter.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    values: [f32; ParameterId::ALL.len()],
}

impl Default for ParameterSet {
    fn default() -> Self {
        let mut values = [0.0; ParameterId::ALL.len()];
        for id in ParameterId::ALL {
            values[id.index()] = id.default_value();
        }
        Self { values }
    }
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ParameterId) -> f32 {
        self.values[id.index()]
    }

    pub fn set(&mut self, id: ParameterId, value: f32) {
        self.values[id.index()] = value;
    }

    /// Gain as a plain multiplier.
    pub fn gain(&self) -> f32 {
        self.get(ParameterId::Gain)
    }

    /// Bypass treated as a boolean switch with a 0.5 threshold.
    pub fn is_bypassed(&self) -> bool {
        self.get(ParameterId::Bypass) >= 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_registry() {
        let params = ParameterSet::new();
        for id in ParameterId::ALL {
            assert_eq!(params.get(id), id.default_value(), "{}", id.name());
        }
        assert!(!params.is_bypassed());
        assert_eq!(params.gain(), 1.0);
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut params = ParameterSet::new();
        params.set(ParameterId::Gain, 0.25);
        assert_eq!(params.get(ParameterId::Gain), 0.25);

        params.set(ParameterId::Bypass, 1.0);
        assert!(params.is_bypassed());
        params.set(ParameterId::Bypass, 0.4);
        assert!(!params.is_bypassed());
    }
}
