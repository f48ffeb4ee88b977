//! Channel kinds and the validation rules attached to them.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ChannelValue;
use crate::error::ChannelError;

/// Tolerance used when checking that a number is a multiple of `step`.
///
/// Applied to `value / step`, so it is relative to the step size.
pub const STEP_EPSILON: f64 = 1e-6;

/// The closed set of channel types, with their type-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChannelKind {
    Bool,
    Number { min: f64, max: f64, step: f64 },
    String,
    Choice { options: Vec<String> },
}

/// Bare discriminant of a [`ChannelKind`] or [`ChannelValue`].
///
/// Displays as the type name used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindTag {
    Bool,
    Number,
    String,
    Choice,
}

impl KindTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Choice => "choice",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ChannelKind {
    /// Numeric kind bounded to `[min, max]` in increments of `step`.
    #[must_use]
    pub fn number(min: f64, max: f64, step: f64) -> Self {
        Self::Number { min, max, step }
    }

    /// Choice kind over an ordered list of options.
    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Bool => KindTag::Bool,
            Self::Number { .. } => KindTag::Number,
            Self::String => KindTag::String,
            Self::Choice { .. } => KindTag::Choice,
        }
    }

    /// The value a freshly created channel of this kind holds.
    #[must_use]
    pub fn zero_value(&self) -> ChannelValue {
        match self {
            Self::Bool => ChannelValue::Bool(false),
            Self::Number { .. } => ChannelValue::Number(0.0),
            Self::String => ChannelValue::String(String::new()),
            Self::Choice { .. } => ChannelValue::Choice(None),
        }
    }

    /// Check the kind's own constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidKind`] for non-finite or inverted
    /// bounds, a non-positive step, an empty option list or duplicate
    /// options.
    pub fn validate(&self, name: &str) -> Result<(), ChannelError> {
        let invalid = |reason| ChannelError::InvalidKind {
            name: name.to_string(),
            reason,
        };
        match self {
            Self::Bool | Self::String => Ok(()),
            Self::Number { min, max, step } => {
                if !(min.is_finite() && max.is_finite() && step.is_finite()) {
                    return Err(invalid("bounds must be finite"));
                }
                if min > max {
                    return Err(invalid("min must not exceed max"));
                }
                if *step <= 0.0 {
                    return Err(invalid("step must be positive"));
                }
                Ok(())
            }
            Self::Choice { options } => {
                if options.is_empty() {
                    return Err(invalid("at least one option is required"));
                }
                let mut seen = HashSet::with_capacity(options.len());
                if !options.iter().all(|opt| seen.insert(opt.as_str())) {
                    return Err(invalid("options must be distinct"));
                }
                Ok(())
            }
        }
    }

    /// Check that `value` is acceptable for a channel of this kind.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TypeMismatch`] when the tags differ,
    /// [`ChannelError::OutOfRange`] for a number outside the bounds or off
    /// the step grid, and [`ChannelError::InvalidOption`] for an unknown
    /// choice.
    pub fn check(&self, name: &str, value: &ChannelValue) -> Result<(), ChannelError> {
        match (self, value) {
            (Self::Bool, ChannelValue::Bool(_)) | (Self::String, ChannelValue::String(_)) => {
                Ok(())
            }
            (Self::Number { min, max, step }, ChannelValue::Number(v)) => {
                if number_fits(*v, *min, *max, *step) {
                    Ok(())
                } else {
                    Err(ChannelError::OutOfRange {
                        name: name.to_string(),
                        value: *v,
                    })
                }
            }
            (Self::Choice { .. }, ChannelValue::Choice(None)) => Ok(()),
            (Self::Choice { options }, ChannelValue::Choice(Some(option))) => {
                if options.contains(option) {
                    Ok(())
                } else {
                    Err(ChannelError::InvalidOption {
                        name: name.to_string(),
                        option: option.clone(),
                    })
                }
            }
            _ => Err(ChannelError::TypeMismatch {
                name: name.to_string(),
                expected: self.tag(),
                actual: value.tag(),
            }),
        }
    }

    /// Convert a JSON value received from the backend into a value of this
    /// kind. Range checks are left to [`ChannelKind::check`].
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::TypeMismatch`] when the JSON type cannot
    /// represent this kind.
    pub fn value_from_json(
        &self,
        name: &str,
        json: &serde_json::Value,
    ) -> Result<ChannelValue, ChannelError> {
        use serde_json::Value;

        let converted = match (self, json) {
            (Self::Bool, Value::Bool(b)) => Some(ChannelValue::Bool(*b)),
            (Self::Number { .. }, Value::Number(n)) => n.as_f64().map(ChannelValue::Number),
            (Self::String, Value::String(s)) => Some(ChannelValue::String(s.clone())),
            (Self::Choice { .. }, Value::String(s)) => Some(ChannelValue::Choice(Some(s.clone()))),
            (Self::Choice { .. }, Value::Null) => Some(ChannelValue::Choice(None)),
            _ => None,
        };
        converted.ok_or_else(|| match json_tag(json) {
            Some(actual) => ChannelError::TypeMismatch {
                name: name.to_string(),
                expected: self.tag(),
                actual,
            },
            None => ChannelError::UnsupportedValue(name.to_string()),
        })
    }
}

#[allow(clippy::float_cmp)]
fn number_fits(value: f64, min: f64, max: f64, step: f64) -> bool {
    if !value.is_finite() || value < min || value > max {
        return false;
    }
    if value == min || value == max {
        return true;
    }
    let ratio = value / step;
    (ratio - ratio.round()).abs() <= STEP_EPSILON
}

fn json_tag(json: &serde_json::Value) -> Option<KindTag> {
    match json {
        serde_json::Value::Bool(_) => Some(KindTag::Bool),
        serde_json::Value::Number(_) => Some(KindTag::Number),
        serde_json::Value::String(_) => Some(KindTag::String),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp() -> ChannelKind {
        ChannelKind::number(20.0, 30.0, 0.5)
    }

    #[test]
    fn should_accept_values_at_both_bounds() {
        assert!(temp().check("temp", &ChannelValue::Number(20.0)).is_ok());
        assert!(temp().check("temp", &ChannelValue::Number(30.0)).is_ok());
    }

    #[test]
    fn should_reject_values_outside_bounds() {
        let result = temp().check("temp", &ChannelValue::Number(30.5));
        assert_eq!(
            result,
            Err(ChannelError::OutOfRange {
                name: "temp".to_string(),
                value: 30.5
            })
        );
        assert!(temp().check("temp", &ChannelValue::Number(19.5)).is_err());
    }

    #[test]
    fn should_reject_values_off_the_step_grid() {
        assert!(temp().check("temp", &ChannelValue::Number(22.5)).is_ok());
        assert!(temp().check("temp", &ChannelValue::Number(22.3)).is_err());
    }

    #[test]
    fn should_tolerate_float_noise_on_step_alignment() {
        let kind = ChannelKind::number(0.0, 1.0, 0.1);
        assert!(kind.check("level", &ChannelValue::Number(0.1 + 0.2)).is_ok());
    }

    #[test]
    fn should_reject_nan() {
        assert!(temp().check("temp", &ChannelValue::Number(f64::NAN)).is_err());
    }

    #[test]
    fn should_reject_mismatched_tag() {
        let result = ChannelKind::Bool.check("relay", &ChannelValue::String("on".to_string()));
        assert!(matches!(
            result,
            Err(ChannelError::TypeMismatch {
                expected: KindTag::Bool,
                actual: KindTag::String,
                ..
            })
        ));
    }

    #[test]
    fn should_reject_unknown_choice() {
        let kind = ChannelKind::choice(["cool", "heat"]);
        assert!(kind.check("mode", &ChannelValue::choice("cool")).is_ok());
        assert!(matches!(
            kind.check("mode", &ChannelValue::choice("dry")),
            Err(ChannelError::InvalidOption { .. })
        ));
    }

    #[test]
    fn should_reject_inverted_bounds() {
        let kind = ChannelKind::number(10.0, 0.0, 1.0);
        assert!(matches!(
            kind.validate("x"),
            Err(ChannelError::InvalidKind { .. })
        ));
    }

    #[test]
    fn should_reject_non_positive_step() {
        assert!(ChannelKind::number(0.0, 10.0, 0.0).validate("x").is_err());
        assert!(ChannelKind::number(0.0, 10.0, -1.0).validate("x").is_err());
    }

    #[test]
    fn should_reject_duplicate_and_empty_options() {
        assert!(ChannelKind::choice(["a", "b", "a"]).validate("x").is_err());
        assert!(ChannelKind::choice(Vec::<String>::new()).validate("x").is_err());
        assert!(ChannelKind::choice(["a", "b"]).validate("x").is_ok());
    }

    #[test]
    fn should_convert_json_into_matching_value() {
        let value = temp()
            .value_from_json("temp", &serde_json::json!(28))
            .unwrap();
        assert_eq!(value, ChannelValue::Number(28.0));

        let mode = ChannelKind::choice(["cool"])
            .value_from_json("mode", &serde_json::json!("cool"))
            .unwrap();
        assert_eq!(mode, ChannelValue::choice("cool"));
    }

    #[test]
    fn should_reject_json_of_wrong_type() {
        let result = ChannelKind::Bool.value_from_json("relay", &serde_json::json!(1));
        assert!(matches!(
            result,
            Err(ChannelError::TypeMismatch {
                actual: KindTag::Number,
                ..
            })
        ));
    }

    #[test]
    fn should_reject_structured_json() {
        let result = ChannelKind::String.value_from_json("label", &serde_json::json!({"a": 1}));
        assert_eq!(result, Err(ChannelError::UnsupportedValue("label".to_string())));
    }

    #[test]
    fn should_deserialize_internally_tagged_kind() {
        let kind: ChannelKind =
            serde_json::from_str(r#"{"kind":"number","min":1.0,"max":5.0,"step":1.0}"#).unwrap();
        assert_eq!(kind, ChannelKind::number(1.0, 5.0, 1.0));
    }

    #[test]
    fn should_display_wire_type_names() {
        assert_eq!(KindTag::Bool.to_string(), "boolean");
        assert_eq!(KindTag::Choice.to_string(), "choice");
    }
}
