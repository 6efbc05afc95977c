//! Access-pattern hints for input streams.

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Initial access-pattern hint for an input stream.
///
/// The policy selects how a stream starts out: how far it prefetches and
/// how it reacts to seeks. A stream may keep its own evolving estimate of
/// the access pattern, but the policy handed to it at open time is fixed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum InputPolicy {
    /// Adaptive: starts sequential and switches to random on the first
    /// backward seek.
    #[default]
    #[strum(to_string = "normal", serialize = "adaptive", serialize = "default")]
    Normal,
    /// Large contiguous GETs; backward seeks within the readahead range are
    /// served without reopening the connection.
    #[strum(to_string = "sequential", serialize = "whole-file")]
    Sequential,
    /// Bounded range GETs with no speculative prefetch; every seek is cheap.
    #[strum(to_string = "random", serialize = "vector")]
    Random,
}

impl InputPolicy {
    /// Whether the stream may switch access pattern as it observes reads.
    pub fn is_adaptive(self) -> bool {
        matches!(self, Self::Normal)
    }

    /// Returns the first recognised policy name in `names`, or `fallback`
    /// when none of them parse.
    ///
    /// Names are trimmed and matched case-insensitively, so an option value
    /// such as `"vector, random, adaptive"` can be split and passed as-is.
    pub fn first_supported<'a, I>(names: I, fallback: Self) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .find_map(|name| name.trim().parse().ok())
            .unwrap_or(fallback)
    }
}

impl TryFrom<String> for InputPolicy {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_lowercase_names() {
        assert_eq!(InputPolicy::Normal.to_string(), "normal");
        assert_eq!(InputPolicy::Sequential.to_string(), "sequential");
        assert_eq!(InputPolicy::Random.as_ref(), "random");
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("SEQUENTIAL".parse::<InputPolicy>(), Ok(InputPolicy::Sequential));
        assert_eq!("adaptive".parse::<InputPolicy>(), Ok(InputPolicy::Normal));
        assert_eq!("default".parse::<InputPolicy>(), Ok(InputPolicy::Normal));
        assert_eq!("whole-file".parse::<InputPolicy>(), Ok(InputPolicy::Sequential));
        assert_eq!("vector".parse::<InputPolicy>(), Ok(InputPolicy::Random));
        assert!("mmap".parse::<InputPolicy>().is_err());
    }

    #[test]
    fn only_normal_is_adaptive() {
        assert!(InputPolicy::Normal.is_adaptive());
        assert!(!InputPolicy::Sequential.is_adaptive());
        assert!(!InputPolicy::Random.is_adaptive());
    }

    #[test]
    fn first_supported_skips_unknown_names() {
        let option = "mmap, Random ,sequential";
        let policy = InputPolicy::first_supported(option.split(','), InputPolicy::Normal);
        assert_eq!(policy, InputPolicy::Random);

        let policy = InputPolicy::first_supported(["hbase", "orc"], InputPolicy::Sequential);
        assert_eq!(policy, InputPolicy::Sequential);
    }

    #[test]
    fn deserializes_aliases() {
        let policy: InputPolicy = serde_json::from_str("\"whole-file\"").unwrap();
        assert_eq!(policy, InputPolicy::Sequential);
        let policy: InputPolicy = serde_json::from_str("\"random\"").unwrap();
        assert_eq!(policy, InputPolicy::Random);
    }

    #[test]
    fn deserializes_names_case_insensitively() {
        let policy: InputPolicy = serde_json::from_str("\"SEQUENTIAL\"").unwrap();
        assert_eq!(policy, InputPolicy::Sequential);
        let policy: InputPolicy = serde_json::from_str("\"Whole-File\"").unwrap();
        assert_eq!(policy, InputPolicy::Sequential);
        assert!(serde_json::from_str::<InputPolicy>("\"mmap\"").is_err());

        let json = serde_json::to_string(&InputPolicy::Random).unwrap();
        assert_eq!(json, "\"random\"");
    }
}
