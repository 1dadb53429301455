//! Security attributes and their ordinal scale
//!
//! Attribute ids index the fixed-size property vectors stored per asset
//! environment, so the discriminants here are part of the storage format.

use serde::{Deserialize, Serialize};

/// Number of security attributes tracked per asset environment
pub const ATTRIBUTE_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SecurityAttribute {
    Confidentiality = 0,
    Integrity = 1,
    Availability = 2,
    Accountability = 3,
    Anonymity = 4,
    Pseudonymity = 5,
    Unlinkability = 6,
    Unobservability = 7,
}

impl SecurityAttribute {
    pub const ALL: [SecurityAttribute; ATTRIBUTE_COUNT] = [
        Self::Confidentiality,
        Self::Integrity,
        Self::Availability,
        Self::Accountability,
        Self::Anonymity,
        Self::Pseudonymity,
        Self::Unlinkability,
        Self::Unobservability,
    ];

    pub fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Confidentiality => "Confidentiality",
            Self::Integrity => "Integrity",
            Self::Availability => "Availability",
            Self::Accountability => "Accountability",
            Self::Anonymity => "Anonymity",
            Self::Pseudonymity => "Pseudonymity",
            Self::Unlinkability => "Unlinkability",
            Self::Unobservability => "Unobservability",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl std::fmt::Display for SecurityAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordinal score of a security attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    #[default]
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl SecurityLevel {
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    pub fn from_ordinal(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Low),
            2 => Some(Self::Medium),
            3 => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "None" => Some(Self::None),
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}
