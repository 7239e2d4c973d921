//! 综合目标网的结构性质 (pure / plain / k-bounded / k-marking / distributed).
use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use num::integer::lcm;
use thiserror::Error;

use crate::synthesis::error::SynthesisError;
use crate::synthesis::utility::RegionUtility;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u8 {
        /// No event both consumes from and produces into the same place.
        const PURE = 1 << 0;
        /// Every arc weight is 0 or 1.
        const PLAIN = 1 << 1;
        /// Consumers of a place share one location.
        const DISTRIBUTED = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyParseError {
    #[error("unknown property `{0}`")]
    UnknownToken(String),
    #[error("invalid number in property `{0}`")]
    InvalidNumber(String),
}

/// Largest accepted `k` for k-bounded and k-marking. Larger values would not
/// fit the integer coefficients of the region equations.
pub const MAX_BOUND: u64 = i32::MAX as u64;

/// Immutable set of constraints a synthesized net has to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PNProperties {
    flags: PropertyFlags,
    k_bounded: Option<u64>,
    k_marking: Option<u64>,
}

impl PNProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(flags: PropertyFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }

    pub fn pure(mut self) -> Self {
        self.flags |= PropertyFlags::PURE;
        self
    }

    pub fn plain(mut self) -> Self {
        self.flags |= PropertyFlags::PLAIN;
        self
    }

    pub fn distributed(mut self) -> Self {
        self.flags |= PropertyFlags::DISTRIBUTED;
        self
    }

    pub fn k_bounded(mut self, k: u64) -> Self {
        self.k_bounded = Some(self.k_bounded.map_or(k, |old| old.min(k)));
        self
    }

    pub fn safe(self) -> Self {
        self.k_bounded(1)
    }

    pub fn k_marking(mut self, k: u64) -> Self {
        self.k_marking = Some(self.k_marking.map_or(k, |old| lcm(old, k)));
        self
    }

    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    pub fn requires(&self, flags: PropertyFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_pure(&self) -> bool {
        self.requires(PropertyFlags::PURE)
    }

    pub fn is_plain(&self) -> bool {
        self.requires(PropertyFlags::PLAIN)
    }

    pub fn is_distributed(&self) -> bool {
        self.requires(PropertyFlags::DISTRIBUTED)
    }

    pub fn is_safe(&self) -> bool {
        self.k_bounded == Some(1)
    }

    pub fn k_bounded_bound(&self) -> Option<u64> {
        self.k_bounded
    }

    pub fn k_marking_divisor(&self) -> Option<u64> {
        self.k_marking
    }

    /// Largest arc weight a region under these properties ever needs.
    ///
    /// Plain nets use 1. In a k-bounded net no live event moves more than
    /// `k` tokens, and a dead event is kept dead by a backward weight of
    /// `k + 1`.
    pub fn weight_bound(&self) -> Option<u64> {
        let plain = self.is_plain().then_some(1);
        let bounded = self.k_bounded.map(|k| k.saturating_add(1));
        match (plain, bounded) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.flags.is_empty() && self.k_bounded.is_none() && self.k_marking.is_none()
    }

    /// Conjunction of both property sets.
    pub fn and(&self, other: &PNProperties) -> PNProperties {
        let mut result = PNProperties::with(self.flags | other.flags);
        result.k_bounded = match (self.k_bounded, other.k_bounded) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        result.k_marking = match (self.k_marking, other.k_marking) {
            (Some(a), Some(b)) => Some(lcm(a, b)),
            (a, b) => a.or(b),
        };
        result
    }

    /// Rejects properties that cannot be evaluated against `utility`.
    pub fn validate(&self, utility: &RegionUtility) -> Result<(), SynthesisError> {
        let bounds = [("k-bounded", self.k_bounded), ("k-marking", self.k_marking)];
        for (property, value) in bounds {
            if let Some(value) = value.filter(|k| !(1..=MAX_BOUND).contains(k)) {
                return Err(SynthesisError::InvalidBound { property, value });
            }
        }
        if self.is_distributed() {
            for event in 0..utility.number_of_events() {
                if utility.event_location(event).is_none() {
                    return Err(SynthesisError::MissingLocation {
                        event: utility.event_label(event).unwrap_or_default().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn parse_prefixed(token: &str, suffix: &str) -> Option<Result<u64, PropertyParseError>> {
    let number = token.strip_suffix(suffix)?;
    Some(
        number
            .parse()
            .map_err(|_| PropertyParseError::InvalidNumber(token.to_string())),
    )
}

/// Comma and/or whitespace separated tokens, e.g. `"pure, 3-bounded"`.
impl FromStr for PNProperties {
    type Err = PropertyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut properties = PNProperties::new();
        for token in s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let token = token.to_ascii_lowercase();
            properties = match token.as_str() {
                "none" => properties,
                "pure" => properties.pure(),
                "plain" => properties.plain(),
                "safe" => properties.safe(),
                "distributed" => properties.distributed(),
                other => {
                    if let Some(k) = parse_prefixed(other, "-bounded") {
                        properties.k_bounded(k?)
                    } else if let Some(k) = parse_prefixed(other, "-marking") {
                        properties.k_marking(k?)
                    } else {
                        return Err(PropertyParseError::UnknownToken(other.to_string()));
                    }
                }
            };
        }
        Ok(properties)
    }
}

impl fmt::Display for PNProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens: Vec<String> = Vec::new();
        if self.is_pure() {
            tokens.push("pure".into());
        }
        if self.is_plain() {
            tokens.push("plain".into());
        }
        if self.is_distributed() {
            tokens.push("distributed".into());
        }
        match self.k_bounded {
            Some(1) => tokens.push("safe".into()),
            Some(k) => tokens.push(format!("{k}-bounded")),
            None => {}
        }
        if let Some(k) = self.k_marking {
            tokens.push(format!("{k}-marking"));
        }
        if tokens.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", tokens.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::TransitionSystem;

    #[test]
    fn builders_and_membership() {
        let props = PNProperties::new().pure().k_bounded(3);
        assert!(props.requires(PropertyFlags::PURE));
        assert!(!props.requires(PropertyFlags::PURE | PropertyFlags::PLAIN));
        assert_eq!(props.k_bounded_bound(), Some(3));
        assert_eq!(props.weight_bound(), Some(4));
        assert!(!props.is_unrestricted());
        assert!(PNProperties::new().is_unrestricted());

        assert!(PNProperties::new().safe().is_safe());
        assert_eq!(PNProperties::new().plain().safe().weight_bound(), Some(1));
        assert_eq!(PNProperties::new().pure().weight_bound(), None);
    }

    #[test]
    fn conjunction_tightens() {
        let a = PNProperties::new().pure().k_bounded(4).k_marking(2);
        let b = PNProperties::new().plain().k_bounded(2).k_marking(3);
        let both = a.and(&b);
        assert!(both.requires(PropertyFlags::PURE | PropertyFlags::PLAIN));
        assert_eq!(both.k_bounded_bound(), Some(2));
        assert_eq!(both.k_marking_divisor(), Some(6));
        assert_eq!(a.and(&PNProperties::new()), a);
    }

    #[test]
    fn text_form_round_trips() {
        let props: PNProperties = "pure, plain 3-bounded,2-marking".parse().unwrap();
        assert_eq!(props.to_string(), "pure, plain, 3-bounded, 2-marking");
        assert_eq!(props.to_string().parse::<PNProperties>().unwrap(), props);

        assert_eq!("none".parse::<PNProperties>().unwrap(), PNProperties::new());
        assert_eq!("SAFE".parse::<PNProperties>().unwrap().to_string(), "safe");
        assert_eq!(
            "cheap".parse::<PNProperties>(),
            Err(PropertyParseError::UnknownToken("cheap".into()))
        );
        assert_eq!(
            "x-bounded".parse::<PNProperties>(),
            Err(PropertyParseError::InvalidNumber("x-bounded".into()))
        );
    }

    #[test]
    fn validation_reports_configuration_errors() {
        let mut ts = TransitionSystem::new();
        let s = ts.add_state("s").unwrap();
        let t = ts.add_state("t").unwrap();
        ts.set_initial(s);
        ts.add_arc(s, t, "a");
        let utility = RegionUtility::new(&ts).unwrap();

        assert!(PNProperties::new().validate(&utility).is_ok());
        assert_eq!(
            PNProperties::new().k_bounded(0).validate(&utility),
            Err(SynthesisError::InvalidBound {
                property: "k-bounded",
                value: 0
            })
        );
        assert!(PNProperties::new().k_bounded(MAX_BOUND).validate(&utility).is_ok());
        assert_eq!(
            PNProperties::new().k_bounded(1 << 62).validate(&utility),
            Err(SynthesisError::InvalidBound {
                property: "k-bounded",
                value: 1 << 62
            })
        );
        let huge: PNProperties = "18446744073709551615-bounded".parse().unwrap();
        let err = huge.validate(&utility).unwrap_err();
        assert!(err.is_configuration_error());
        let err = PNProperties::new()
            .k_marking(MAX_BOUND + 1)
            .validate(&utility)
            .unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidBound { property: "k-marking", .. }));

        let err = PNProperties::new().distributed().validate(&utility).unwrap_err();
        assert_eq!(err, SynthesisError::MissingLocation { event: "a".into() });
        assert!(err.is_configuration_error());

        ts.set_location("a", "l1");
        let located = RegionUtility::new(&ts).unwrap();
        assert!(PNProperties::new().distributed().validate(&located).is_ok());
    }
}
