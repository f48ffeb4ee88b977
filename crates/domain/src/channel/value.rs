//! Typed channel values.

use serde::Serialize;

use super::KindTag;

/// The current value of a channel.
///
/// Serializes untagged so telemetry reads as plain JSON scalars; an unset
/// choice serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Bool(bool),
    Number(f64),
    String(String),
    Choice(Option<String>),
}

impl ChannelValue {
    /// Shorthand for a selected choice.
    pub fn choice(option: impl Into<String>) -> Self {
        Self::Choice(Some(option.into()))
    }

    #[must_use]
    pub fn tag(&self) -> KindTag {
        match self {
            Self::Bool(_) => KindTag::Bool,
            Self::Number(_) => KindTag::Number,
            Self::String(_) => KindTag::String,
            Self::Choice(_) => KindTag::Choice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_number_as_plain_number() {
        let json = serde_json::to_string(&ChannelValue::Number(21.5)).unwrap();
        assert_eq!(json, "21.5");
    }

    #[test]
    fn should_serialize_unset_choice_as_null() {
        let json = serde_json::to_string(&ChannelValue::Choice(None)).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn should_serialize_selected_choice_as_string() {
        let json = serde_json::to_string(&ChannelValue::choice("heat")).unwrap();
        assert_eq!(json, "\"heat\"");
    }

    #[test]
    fn should_report_tag_per_variant() {
        assert_eq!(ChannelValue::Bool(true).tag(), KindTag::Bool);
        assert_eq!(ChannelValue::String(String::new()).tag(), KindTag::String);
    }
}
