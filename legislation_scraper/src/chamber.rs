//! Legislative chambers, and the more general actors that can do things to a bill.

use serde::{Serialize,Deserialize};
use std::fmt;
use std::str::FromStr;
use anyhow::anyhow;

/// One legislative body within a state.
#[derive(Debug,Clone,Copy,Serialize,Deserialize,Eq,PartialEq,Hash,Ord,PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Chamber {
    /// Senate-like
    Upper,
    /// House or Assembly-like
    Lower,
    Joint,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::Upper => "upper",
            Chamber::Lower => "lower",
            Chamber::Joint => "joint",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Chamber {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upper" => Ok(Chamber::Upper),
            "lower" => Ok(Chamber::Lower),
            "joint" => Ok(Chamber::Joint),
            _ => Err(anyhow!("Unknown chamber {}",s)),
        }
    }
}

/// Who performed an action on a bill. Usually a chamber, but may be
/// something outside the legislature such as the governor.
#[derive(Debug,Clone,Eq,PartialEq,serde_with::SerializeDisplay,serde_with::DeserializeFromStr)]
pub enum Actor {
    Chamber(Chamber),
    Other(String),
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Chamber(chamber) => write!(f, "{}", chamber),
            Actor::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Actor {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match Chamber::from_str(s) {
            Ok(chamber) => Actor::Chamber(chamber),
            Err(_) => Actor::Other(s.trim().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chamber_parse_and_display() {
        assert_eq!(Chamber::Upper,"upper".parse::<Chamber>().unwrap());
        assert_eq!(Chamber::Lower," Lower ".parse::<Chamber>().unwrap());
        assert!("senate".parse::<Chamber>().is_err());
        assert_eq!("joint",Chamber::Joint.to_string());
    }

    #[test]
    fn test_actor_serializes_as_plain_string() {
        assert_eq!("\"upper\"",serde_json::to_string(&Actor::Chamber(Chamber::Upper)).unwrap());
        assert_eq!("\"governor\"",serde_json::to_string(&Actor::Other("governor".to_string())).unwrap());
        let back : Actor = serde_json::from_str("\"lower\"").unwrap();
        assert_eq!(Actor::Chamber(Chamber::Lower),back);
        let back : Actor = serde_json::from_str("\"Secretary of State\"").unwrap();
        assert_eq!(Actor::Other("Secretary of State".to_string()),back);
    }
}
