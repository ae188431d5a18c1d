//! Core data models for the café recommender.
//!
//! This module contains the fundamental records shared across the crate:
//! catalog entries, descriptor rows, reference (display) records, and the
//! ranked output of a recommendation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key column shared by the catalog, descriptor and reference tables.
pub const CAFE_ID_COLUMN: &str = "cafe_id";

/// Identifier of a café across all three data sources.
pub type CafeId = i64;

/// The binary (0/1) attributes every catalog entry carries.
///
/// The declaration order is the fixed order used by the user preference
/// vector, before the two price indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryAttribute {
    /// A table where one can sit and work
    StudySpace,
    /// Reaching the café requires a car
    CarReq,
    /// Non-dairy milk costs extra
    NondairyCharge,
    /// Gluten-free options available
    GlutenFree,
    /// Serves full meals
    FoodMenu,
}

impl BinaryAttribute {
    /// All binary attributes in preference-vector order.
    pub const ALL: [BinaryAttribute; 5] = [
        BinaryAttribute::StudySpace,
        BinaryAttribute::CarReq,
        BinaryAttribute::NondairyCharge,
        BinaryAttribute::GlutenFree,
        BinaryAttribute::FoodMenu,
    ];

    /// Column name in the catalog table and key in the preference map.
    pub fn column(self) -> &'static str {
        match self {
            BinaryAttribute::StudySpace => "study_space",
            BinaryAttribute::CarReq => "car_req",
            BinaryAttribute::NondairyCharge => "nondairy_charge",
            BinaryAttribute::GlutenFree => "gluten_free",
            BinaryAttribute::FoodMenu => "food_menu",
        }
    }

    /// Look up an attribute by its column name.
    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|attr| attr.column() == name)
    }
}

/// Three-level price tier.
///
/// Encoded as the two indicator columns `price_point_mid` and
/// `price_point_high`; the low tier is both indicators at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    #[default]
    Low,
    Mid,
    High,
}

/// Name of the categorical price column in the catalog table.
pub const PRICE_POINT_COLUMN: &str = "price_point";
/// Indicator column for the mid price tier.
pub const PRICE_POINT_MID: &str = "price_point_mid";
/// Indicator column for the high price tier.
pub const PRICE_POINT_HIGH: &str = "price_point_high";
/// Indicator column for the low price tier; dropped from every encoded vector.
pub const PRICE_POINT_LOW: &str = "price_point_low";

impl PriceTier {
    /// All tiers, lowest first.
    pub const ALL: [PriceTier; 3] = [PriceTier::Low, PriceTier::Mid, PriceTier::High];

    /// The `(price_point_mid, price_point_high)` indicator pair.
    pub fn indicators(self) -> (u8, u8) {
        match self {
            PriceTier::Low => (0, 0),
            PriceTier::Mid => (1, 0),
            PriceTier::High => (0, 1),
        }
    }

    /// Rebuild a tier from its indicator pair.
    ///
    /// Returns `None` when both indicators are set.
    pub fn from_indicators(mid: bool, high: bool) -> Option<Self> {
        match (mid, high) {
            (false, false) => Some(PriceTier::Low),
            (true, false) => Some(PriceTier::Mid),
            (false, true) => Some(PriceTier::High),
            (true, true) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriceTier::Low => "low",
            PriceTier::Mid => "mid",
            PriceTier::High => "high",
        }
    }
}

impl fmt::Display for PriceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(PriceTier::Low),
            "mid" => Ok(PriceTier::Mid),
            "high" => Ok(PriceTier::High),
            other => Err(format!("unknown price tier '{}' (expected low, mid or high)", other)),
        }
    }
}

/// A single catalog entry.
///
/// Categorical attributes are data-driven: any catalog column that is not the
/// key, a binary attribute or the price tier ends up in `categorical`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cafe {
    /// Unique key shared with the descriptor and reference tables
    pub cafe_id: CafeId,

    /// Open set of string-valued attributes (column name -> value)
    pub categorical: BTreeMap<String, String>,

    /// Binary attributes, keyed by attribute
    pub binary: BTreeMap<BinaryAttribute, bool>,

    /// Price tier
    pub price_tier: PriceTier,
}

impl Cafe {
    /// Value of a binary attribute; attributes not recorded read as `false`.
    pub fn flag(&self, attr: BinaryAttribute) -> bool {
        self.binary.get(&attr).copied().unwrap_or(false)
    }
}

/// One row of the descriptor table.
///
/// A café has many of these; tags repeat, and only their frequency matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorRecord {
    pub cafe_id: CafeId,

    /// Atmosphere tag (e.g. "cozy"); empty cells deserialize to `None`
    #[serde(default)]
    pub atmosphere_desc: Option<String>,

    /// Specials/flavour tag (e.g. "nutty")
    #[serde(default)]
    pub specials_desc: Option<String>,
}

/// Human-facing record returned for the winning café.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub cafe_id: CafeId,

    /// Display name
    pub cafe_name: String,

    /// The house specialty; also names the display asset
    pub specials: String,

    /// Any further reference columns, carried through for display
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,

    /// Resolved display asset, set when an asset directory is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<PathBuf>,
}

/// A surviving candidate and its similarity to the user vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub cafe_id: CafeId,

    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

/// The single best match for a preference set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Reference record of the winning café
    pub record: ReferenceRecord,

    /// Its cosine similarity to the user vector
    pub score: f32,
}
