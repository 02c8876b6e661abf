//! Voltage normalization
//!
//! Trackers report `volt` as a number or numeric string, in millivolts or
//! volts depending on firmware. Everything is converted to volts exactly
//! once, when a position payload is ingested.
//!
//! The unit is guessed from magnitude: readings above [`MILLIVOLT_THRESHOLD`]
//! are taken as millivolts. Supply voltages of these trackers sit well below
//! 100 V while millivolt readings sit well above it, so values close to the
//! threshold are ambiguous and may be misread.

use serde_json::Value;
use tracing::warn;

/// Raw readings strictly above this are millivolts
pub const MILLIVOLT_THRESHOLD: f64 = 100.0;

/// Why no voltage is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// Field absent or `null`
    Missing,
    /// Field present but not a finite number
    Unparseable,
}

/// Normalized voltage reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Voltage {
    Volts(f64),
    Absent(AbsentReason),
}

impl Voltage {
    /// Stored form: volts or nothing
    pub fn volts(self) -> Option<f64> {
        match self {
            Voltage::Volts(v) => Some(v),
            Voltage::Absent(_) => None,
        }
    }

    pub fn is_absent(self) -> bool {
        matches!(self, Voltage::Absent(_))
    }
}

/// Normalize a raw `volt` field to volts
///
/// Never fails: a missing field is silently absent, anything that is not a
/// finite number is absent with a warning naming the raw value.
pub fn normalize(raw: Option<&Value>) -> Voltage {
    let value = match raw {
        None | Some(Value::Null) => return Voltage::Absent(AbsentReason::Missing),
        Some(value) => value,
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number.filter(|v| v.is_finite()) {
        Some(v) if v > MILLIVOLT_THRESHOLD => Voltage::Volts(v / 1000.0),
        Some(v) => Voltage::Volts(v),
        None => {
            warn!("Unparseable voltage value {}", value);
            Voltage::Absent(AbsentReason::Unparseable)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn test_millivolts_converted() {
        assert_eq!(normalize(Some(&json!(12500))), Voltage::Volts(12.5));
        assert_eq!(normalize(Some(&json!("12500"))), Voltage::Volts(12.5));
        assert_eq!(normalize(Some(&json!(" 4100 "))), Voltage::Volts(4.1));
        assert_eq!(normalize(Some(&json!("999999"))), Voltage::Volts(999.999));
    }

    #[test]
    fn test_volts_kept() {
        assert_eq!(normalize(Some(&json!(12.6))), Voltage::Volts(12.6));
        assert_eq!(normalize(Some(&json!("3.7"))), Voltage::Volts(3.7));
        assert_eq!(normalize(Some(&json!(100))), Voltage::Volts(100.0));
        assert_eq!(normalize(Some(&json!(0))), Voltage::Volts(0.0));
    }

    #[test]
    fn test_boundary_just_above_threshold() {
        assert_eq!(normalize(Some(&json!(100.5))), Voltage::Volts(0.1005));
    }

    #[test]
    #[traced_test]
    fn test_missing_is_silent() {
        assert_eq!(normalize(None), Voltage::Absent(AbsentReason::Missing));
        assert_eq!(
            normalize(Some(&Value::Null)),
            Voltage::Absent(AbsentReason::Missing)
        );
        assert!(!logs_contain("Unparseable voltage"));
    }

    #[test]
    #[traced_test]
    fn test_non_numeric_string_warns() {
        assert_eq!(
            normalize(Some(&json!("N/A"))),
            Voltage::Absent(AbsentReason::Unparseable)
        );
        assert!(logs_contain("Unparseable voltage value"));
        assert!(logs_contain("N/A"));
    }

    #[test]
    #[traced_test]
    fn test_incompatible_types_and_non_finite() {
        for raw in [json!(true), json!([12]), json!({"v": 12}), json!("NaN"), json!("inf"), json!("")] {
            assert_eq!(
                normalize(Some(&raw)),
                Voltage::Absent(AbsentReason::Unparseable),
                "raw value {}",
                raw
            );
        }
        assert!(logs_contain("Unparseable voltage value"));
    }

    #[test]
    fn test_volts_accessor() {
        assert_eq!(Voltage::Volts(3.3).volts(), Some(3.3));
        assert_eq!(Voltage::Absent(AbsentReason::Missing).volts(), None);
        assert!(Voltage::Absent(AbsentReason::Unparseable).is_absent());
    }

    proptest! {
        #[test]
        fn prop_above_threshold_is_divided(v in 100.0f64..1.0e9) {
            prop_assume!(v > MILLIVOLT_THRESHOLD);
            prop_assert_eq!(normalize(Some(&json!(v))), Voltage::Volts(v / 1000.0));
        }

        #[test]
        fn prop_up_to_threshold_is_unchanged(v in 0.0f64..=100.0) {
            prop_assert_eq!(normalize(Some(&json!(v))), Voltage::Volts(v));
        }

        #[test]
        fn prop_normalizing_volts_twice_is_stable(v in 0.0f64..=100.0) {
            let once = normalize(Some(&json!(v))).volts();
            let twice = once.and_then(|volts| normalize(Some(&json!(volts))).volts());
            prop_assert_eq!(once, twice);
        }
    }
}
