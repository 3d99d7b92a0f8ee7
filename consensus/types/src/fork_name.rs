use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ForkName {
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
    Electra,
    Fulu,
}

/// A snapshot could not be mapped onto a state layout the engine understands.
///
/// The monitor cannot make progress against a node serving such states, so callers treat this
/// as fatal rather than retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum StateVersionError {
    /// Neither the response header nor the body named a fork.
    MissingVersion,
    /// The fork name is not one this build knows about.
    UnknownFork(String),
    /// The fork is known but its state has no participation flags (pre-Altair).
    UnsupportedFork(ForkName),
}

impl fmt::Display for StateVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl ForkName {
    pub fn list_all() -> Vec<ForkName> {
        vec![
            ForkName::Phase0,
            ForkName::Altair,
            ForkName::Bellatrix,
            ForkName::Capella,
            ForkName::Deneb,
            ForkName::Electra,
            ForkName::Fulu,
        ]
    }

    /// Forks whose states carry epoch participation flags and a sync committee.
    pub fn altair_enabled(self) -> bool {
        self >= ForkName::Altair
    }

    pub fn capella_enabled(self) -> bool {
        self >= ForkName::Capella
    }

    pub fn electra_enabled(self) -> bool {
        self >= ForkName::Electra
    }

    /// Resolve the fork tag attached to a state response.
    ///
    /// A missing tag, an unknown name or a pre-Altair fork are all errors.
    pub fn from_version_tag(tag: Option<&str>) -> Result<ForkName, StateVersionError> {
        let tag = tag.ok_or(StateVersionError::MissingVersion)?;
        let fork_name = ForkName::from_str(tag)
            .map_err(|_| StateVersionError::UnknownFork(tag.to_string()))?;
        if !fork_name.altair_enabled() {
            return Err(StateVersionError::UnsupportedFork(fork_name));
        }
        Ok(fork_name)
    }
}

impl FromStr for ForkName {
    type Err = String;

    fn from_str(fork_name: &str) -> Result<Self, String> {
        Ok(match fork_name.to_lowercase().as_ref() {
            "phase0" | "base" => ForkName::Phase0,
            "altair" => ForkName::Altair,
            "bellatrix" | "merge" => ForkName::Bellatrix,
            "capella" => ForkName::Capella,
            "deneb" => ForkName::Deneb,
            "electra" => ForkName::Electra,
            "fulu" => ForkName::Fulu,
            _ => return Err(format!("unknown fork name: {}", fork_name)),
        })
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkName::Phase0 => "phase0".fmt(f),
            ForkName::Altair => "altair".fmt(f),
            ForkName::Bellatrix => "bellatrix".fmt(f),
            ForkName::Capella => "capella".fmt(f),
            ForkName::Deneb => "deneb".fmt(f),
            ForkName::Electra => "electra".fmt(f),
            ForkName::Fulu => "fulu".fmt(f),
        }
    }
}

impl Serialize for ForkName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ForkName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        ForkName::from_str(&string).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        for fork in ForkName::list_all() {
            assert_eq!(ForkName::from_str(&fork.to_string()), Ok(fork));
        }
    }

    #[test]
    fn header_values_are_case_insensitive() {
        assert_eq!(ForkName::from_str("Deneb"), Ok(ForkName::Deneb));
        assert_eq!(ForkName::from_str("ELECTRA"), Ok(ForkName::Electra));
    }

    #[test]
    fn version_tag_resolution() {
        assert_eq!(
            ForkName::from_version_tag(Some("capella")),
            Ok(ForkName::Capella)
        );
        assert_eq!(
            ForkName::from_version_tag(None),
            Err(StateVersionError::MissingVersion)
        );
        assert_eq!(
            ForkName::from_version_tag(Some("phase0")),
            Err(StateVersionError::UnsupportedFork(ForkName::Phase0))
        );
        assert_eq!(
            ForkName::from_version_tag(Some("gloas")),
            Err(StateVersionError::UnknownFork("gloas".to_string()))
        );
    }
}
