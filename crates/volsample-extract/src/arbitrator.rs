//! Bin arbitration between competing cells.
//!
//! When a second cell lands in an occupied lattice bin, the arbitrator maps
//! each contribution to a comparison key and decides whether the newcomer
//! replaces the occupant. Keys are compared with a strict order: equal keys
//! keep the occupant, so a dominant winner is found regardless of the order
//! cells arrive in.

use volsample_core::{ArbitratorOptions, MinMax, OpacityMap};

/// Closed set of arbitration policies.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePointArbitrator {
    /// Higher opacity wins.
    OpacityMap { variable: usize, map: OpacityMap },
    /// Higher normalized value wins, or lower with `less_than`.
    RelativeValue {
        variable: usize,
        less_than: bool,
        range: (f64, f64),
    },
    /// Larger or smaller raw value wins.
    RawMinMax { variable: usize, mode: MinMax },
}

impl SamplePointArbitrator {
    /// Builds the arbitrator configured by `options`, or `None` when bins are
    /// blended instead of arbitrated.
    pub fn from_options(options: &ArbitratorOptions) -> Option<Self> {
        match options {
            ArbitratorOptions::None => None,
            ArbitratorOptions::OpacityMap { variable, map } => Some(Self::OpacityMap {
                variable: *variable,
                map: map.clone(),
            }),
            ArbitratorOptions::RelativeValue {
                variable,
                less_than,
                range,
            } => Some(Self::RelativeValue {
                variable: *variable,
                less_than: *less_than,
                range: *range,
            }),
            ArbitratorOptions::RawMinMax { variable, mode } => Some(Self::RawMinMax {
                variable: *variable,
                mode: *mode,
            }),
        }
    }

    /// Index of the compared variable.
    pub fn variable(&self) -> usize {
        match self {
            Self::OpacityMap { variable, .. }
            | Self::RelativeValue { variable, .. }
            | Self::RawMinMax { variable, .. } => *variable,
        }
    }

    /// Comparison key of a sample's variable values.
    pub fn key(&self, values: &[f64]) -> f64 {
        let v = values[self.variable()];
        match self {
            Self::OpacityMap { map, .. } => map.opacity(v),
            Self::RelativeValue { range: (lo, hi), .. } => {
                if hi > lo {
                    ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
                } else if v >= *hi {
                    1.0
                } else {
                    0.0
                }
            }
            Self::RawMinMax { .. } => v,
        }
    }

    fn prefers_higher(&self) -> bool {
        match self {
            Self::OpacityMap { .. } => true,
            Self::RelativeValue { less_than, .. } => !less_than,
            Self::RawMinMax { mode, .. } => *mode == MinMax::Max,
        }
    }

    /// Whether a contribution keyed `new` replaces one keyed `old`.
    ///
    /// A NaN key never wins against a number and always loses to one.
    pub fn should_overwrite(&self, old: f64, new: f64) -> bool {
        if new.is_nan() {
            return false;
        }
        if old.is_nan() {
            return true;
        }
        if self.prefers_higher() {
            new > old
        } else {
            new < old
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all() -> Vec<SamplePointArbitrator> {
        vec![
            SamplePointArbitrator::OpacityMap {
                variable: 0,
                map: OpacityMap::default(),
            },
            SamplePointArbitrator::RelativeValue {
                variable: 0,
                less_than: false,
                range: (0.0, 1.0),
            },
            SamplePointArbitrator::RelativeValue {
                variable: 0,
                less_than: true,
                range: (0.0, 1.0),
            },
            SamplePointArbitrator::RawMinMax {
                variable: 0,
                mode: MinMax::Min,
            },
            SamplePointArbitrator::RawMinMax {
                variable: 0,
                mode: MinMax::Max,
            },
        ]
    }

    #[test]
    fn test_from_options() {
        assert!(SamplePointArbitrator::from_options(&ArbitratorOptions::None).is_none());
        let arb = SamplePointArbitrator::from_options(&ArbitratorOptions::RawMinMax {
            variable: 2,
            mode: MinMax::Min,
        })
        .unwrap();
        assert_eq!(arb.variable(), 2);
        assert!(arb.should_overwrite(3.0, 1.0));
    }

    #[test]
    fn test_relative_value_key() {
        let arb = SamplePointArbitrator::RelativeValue {
            variable: 1,
            less_than: false,
            range: (10.0, 20.0),
        };
        assert_eq!(arb.key(&[0.0, 15.0]), 0.5);
        assert_eq!(arb.key(&[0.0, 99.0]), 1.0);
        assert_eq!(arb.key(&[0.0, -5.0]), 0.0);

        let flat = SamplePointArbitrator::RelativeValue {
            variable: 0,
            less_than: false,
            range: (5.0, 5.0),
        };
        assert_eq!(flat.key(&[5.0]), 1.0);
        assert_eq!(flat.key(&[4.0]), 0.0);
    }

    #[test]
    fn test_raw_key_is_unclamped() {
        let arb = SamplePointArbitrator::RawMinMax {
            variable: 0,
            mode: MinMax::Max,
        };
        assert_eq!(arb.key(&[1e6]), 1e6);
        assert!(arb.should_overwrite(1e6, 2e6));
    }

    #[test]
    fn test_ties_keep_occupant() {
        for arb in all() {
            assert!(!arb.should_overwrite(0.5, 0.5));
        }
    }

    #[test]
    fn test_nan_keys() {
        for arb in all() {
            assert!(!arb.should_overwrite(0.5, f64::NAN));
            assert!(arb.should_overwrite(f64::NAN, 0.5));
            assert!(!arb.should_overwrite(f64::NAN, f64::NAN));
        }
    }

    proptest! {
        #[test]
        fn prop_opacity_order(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let arb = &all()[0];
            prop_assert_eq!(arb.should_overwrite(a, b), b > a);
        }

        #[test]
        fn prop_antisymmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            prop_assume!(a != b);
            for arb in all() {
                prop_assert_ne!(arb.should_overwrite(a, b), arb.should_overwrite(b, a));
            }
        }
    }
}
