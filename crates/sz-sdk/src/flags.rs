//! Engine flag bitmask and the with-info call mode.
//!
//! [`SzFlags`] mirrors the vendor's 64-bit flag constants. The binding never
//! interprets flag bits itself; the one exception is the with-info sentinel,
//! which is modelled separately as [`InfoMode`] and is never forwarded.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

/// 64-bit flag set forwarded unchanged to the native engine.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SzFlags(i64);

impl SzFlags {
    pub const NO_FLAGS: SzFlags = SzFlags(0);

    // Export selection
    pub const EXPORT_INCLUDE_MULTI_RECORD_ENTITIES: SzFlags = SzFlags(1 << 0);
    pub const EXPORT_INCLUDE_POSSIBLY_SAME: SzFlags = SzFlags(1 << 1);
    pub const EXPORT_INCLUDE_POSSIBLY_RELATED: SzFlags = SzFlags(1 << 2);
    pub const EXPORT_INCLUDE_NAME_ONLY: SzFlags = SzFlags(1 << 3);
    pub const EXPORT_INCLUDE_DISCLOSED: SzFlags = SzFlags(1 << 4);
    pub const EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES: SzFlags = SzFlags(1 << 5);
    pub const EXPORT_INCLUDE_ALL_ENTITIES: SzFlags =
        Self::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES.union(Self::EXPORT_INCLUDE_SINGLE_RECORD_ENTITIES);
    pub const EXPORT_INCLUDE_ALL_HAVING_RELATIONSHIPS: SzFlags = Self::EXPORT_INCLUDE_POSSIBLY_SAME
        .union(Self::EXPORT_INCLUDE_POSSIBLY_RELATED)
        .union(Self::EXPORT_INCLUDE_NAME_ONLY)
        .union(Self::EXPORT_INCLUDE_DISCLOSED);

    // Entity detail
    pub const ENTITY_INCLUDE_POSSIBLY_SAME_RELATIONS: SzFlags = SzFlags(1 << 6);
    pub const ENTITY_INCLUDE_POSSIBLY_RELATED_RELATIONS: SzFlags = SzFlags(1 << 7);
    pub const ENTITY_INCLUDE_NAME_ONLY_RELATIONS: SzFlags = SzFlags(1 << 8);
    pub const ENTITY_INCLUDE_DISCLOSED_RELATIONS: SzFlags = SzFlags(1 << 9);
    pub const ENTITY_INCLUDE_ALL_RELATIONS: SzFlags = Self::ENTITY_INCLUDE_POSSIBLY_SAME_RELATIONS
        .union(Self::ENTITY_INCLUDE_POSSIBLY_RELATED_RELATIONS)
        .union(Self::ENTITY_INCLUDE_NAME_ONLY_RELATIONS)
        .union(Self::ENTITY_INCLUDE_DISCLOSED_RELATIONS);
    pub const ENTITY_INCLUDE_ALL_FEATURES: SzFlags = SzFlags(1 << 10);
    pub const ENTITY_INCLUDE_REPRESENTATIVE_FEATURES: SzFlags = SzFlags(1 << 11);
    pub const ENTITY_INCLUDE_ENTITY_NAME: SzFlags = SzFlags(1 << 12);
    pub const ENTITY_INCLUDE_RECORD_SUMMARY: SzFlags = SzFlags(1 << 13);
    pub const ENTITY_INCLUDE_RECORD_DATA: SzFlags = SzFlags(1 << 14);
    pub const ENTITY_INCLUDE_RECORD_MATCHING_INFO: SzFlags = SzFlags(1 << 15);
    pub const ENTITY_INCLUDE_RECORD_JSON_DATA: SzFlags = SzFlags(1 << 16);
    pub const ENTITY_INCLUDE_RECORD_FEATURES: SzFlags = SzFlags(1 << 18);
    pub const ENTITY_INCLUDE_RELATED_ENTITY_NAME: SzFlags = SzFlags(1 << 19);
    pub const ENTITY_INCLUDE_RELATED_MATCHING_INFO: SzFlags = SzFlags(1 << 20);
    pub const ENTITY_INCLUDE_RELATED_RECORD_SUMMARY: SzFlags = SzFlags(1 << 21);
    pub const ENTITY_INCLUDE_RELATED_RECORD_DATA: SzFlags = SzFlags(1 << 22);
    pub const ENTITY_INCLUDE_INTERNAL_FEATURES: SzFlags = SzFlags(1 << 23);
    pub const ENTITY_INCLUDE_FEATURE_STATS: SzFlags = SzFlags(1 << 24);
    pub const ENTITY_INCLUDE_RECORD_TYPES: SzFlags = SzFlags(1 << 28);
    pub const ENTITY_INCLUDE_RELATED_RECORD_TYPES: SzFlags = SzFlags(1 << 29);
    pub const ENTITY_INCLUDE_RECORD_UNMAPPED_DATA: SzFlags = SzFlags(1 << 31);

    // Path, network and search
    pub const FIND_PATH_STRICT_AVOID: SzFlags = SzFlags(1 << 25);
    pub const INCLUDE_FEATURE_SCORES: SzFlags = SzFlags(1 << 26);
    pub const SEARCH_INCLUDE_STATS: SzFlags = SzFlags(1 << 27);
    pub const FIND_PATH_INCLUDE_MATCHING_INFO: SzFlags = SzFlags(1 << 30);
    pub const SEARCH_INCLUDE_ALL_CANDIDATES: SzFlags = SzFlags(1 << 32);
    pub const FIND_NETWORK_INCLUDE_MATCHING_INFO: SzFlags = SzFlags(1 << 33);
    pub const INCLUDE_MATCH_KEY_DETAILS: SzFlags = SzFlags(1 << 34);
    pub const SEARCH_INCLUDE_REQUEST: SzFlags = SzFlags(1 << 37);
    pub const SEARCH_INCLUDE_REQUEST_DETAILS: SzFlags = SzFlags(1 << 38);
    pub const SEARCH_INCLUDE_RESOLVED: SzFlags = Self::EXPORT_INCLUDE_MULTI_RECORD_ENTITIES;
    pub const SEARCH_INCLUDE_POSSIBLY_SAME: SzFlags = Self::EXPORT_INCLUDE_POSSIBLY_SAME;
    pub const SEARCH_INCLUDE_POSSIBLY_RELATED: SzFlags = Self::EXPORT_INCLUDE_POSSIBLY_RELATED;
    pub const SEARCH_INCLUDE_NAME_ONLY: SzFlags = Self::EXPORT_INCLUDE_NAME_ONLY;
    pub const SEARCH_INCLUDE_ALL_ENTITIES: SzFlags = Self::SEARCH_INCLUDE_RESOLVED
        .union(Self::SEARCH_INCLUDE_POSSIBLY_SAME)
        .union(Self::SEARCH_INCLUDE_POSSIBLY_RELATED)
        .union(Self::SEARCH_INCLUDE_NAME_ONLY);

    /// Sentinel selecting the with-info native entry points. Never forwarded.
    pub const WITH_INFO: SzFlags = SzFlags(1 << 62);

    // Defaults
    pub const RECORD_DEFAULT_FLAGS: SzFlags = Self::ENTITY_INCLUDE_RECORD_JSON_DATA;
    pub const ENTITY_CORE_FLAGS: SzFlags = Self::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES
        .union(Self::ENTITY_INCLUDE_ENTITY_NAME)
        .union(Self::ENTITY_INCLUDE_RECORD_SUMMARY)
        .union(Self::ENTITY_INCLUDE_RECORD_DATA)
        .union(Self::ENTITY_INCLUDE_RECORD_MATCHING_INFO);
    pub const ENTITY_DEFAULT_FLAGS: SzFlags = Self::ENTITY_CORE_FLAGS
        .union(Self::ENTITY_INCLUDE_ALL_RELATIONS)
        .union(Self::ENTITY_INCLUDE_RELATED_ENTITY_NAME)
        .union(Self::ENTITY_INCLUDE_RELATED_RECORD_SUMMARY)
        .union(Self::ENTITY_INCLUDE_RELATED_MATCHING_INFO);
    pub const ENTITY_BRIEF_DEFAULT_FLAGS: SzFlags = Self::ENTITY_INCLUDE_RECORD_MATCHING_INFO
        .union(Self::ENTITY_INCLUDE_ALL_RELATIONS)
        .union(Self::ENTITY_INCLUDE_RELATED_MATCHING_INFO);
    pub const EXPORT_DEFAULT_FLAGS: SzFlags = Self::EXPORT_INCLUDE_ALL_ENTITIES.union(Self::ENTITY_DEFAULT_FLAGS);
    pub const FIND_PATH_DEFAULT_FLAGS: SzFlags = Self::FIND_PATH_INCLUDE_MATCHING_INFO
        .union(Self::ENTITY_INCLUDE_ENTITY_NAME)
        .union(Self::ENTITY_INCLUDE_RECORD_SUMMARY);
    pub const FIND_NETWORK_DEFAULT_FLAGS: SzFlags = Self::FIND_NETWORK_INCLUDE_MATCHING_INFO
        .union(Self::ENTITY_INCLUDE_ENTITY_NAME)
        .union(Self::ENTITY_INCLUDE_RECORD_SUMMARY);
    pub const FIND_INTERESTING_ENTITIES_DEFAULT_FLAGS: SzFlags = Self::NO_FLAGS;
    pub const HOW_ENTITY_DEFAULT_FLAGS: SzFlags = Self::INCLUDE_FEATURE_SCORES;
    pub const VIRTUAL_ENTITY_DEFAULT_FLAGS: SzFlags = Self::ENTITY_CORE_FLAGS;
    pub const WHY_ENTITIES_DEFAULT_FLAGS: SzFlags = Self::INCLUDE_FEATURE_SCORES;
    pub const WHY_RECORDS_DEFAULT_FLAGS: SzFlags = Self::INCLUDE_FEATURE_SCORES;
    pub const WHY_RECORD_IN_ENTITY_DEFAULT_FLAGS: SzFlags = Self::INCLUDE_FEATURE_SCORES;
    pub const WHY_SEARCH_DEFAULT_FLAGS: SzFlags = Self::INCLUDE_FEATURE_SCORES
        .union(Self::SEARCH_INCLUDE_REQUEST_DETAILS)
        .union(Self::SEARCH_INCLUDE_STATS);
    pub const SEARCH_BY_ATTRIBUTES_DEFAULT_FLAGS: SzFlags = Self::SEARCH_INCLUDE_ALL_ENTITIES
        .union(Self::ENTITY_INCLUDE_REPRESENTATIVE_FEATURES)
        .union(Self::ENTITY_INCLUDE_ENTITY_NAME)
        .union(Self::ENTITY_INCLUDE_RECORD_SUMMARY)
        .union(Self::INCLUDE_FEATURE_SCORES);
    pub const ADD_RECORD_DEFAULT_FLAGS: SzFlags = Self::NO_FLAGS;
    pub const DELETE_RECORD_DEFAULT_FLAGS: SzFlags = Self::NO_FLAGS;
    pub const REEVALUATE_ENTITY_DEFAULT_FLAGS: SzFlags = Self::NO_FLAGS;
    pub const REEVALUATE_RECORD_DEFAULT_FLAGS: SzFlags = Self::NO_FLAGS;
    pub const RECORD_PREVIEW_DEFAULT_FLAGS: SzFlags = Self::ENTITY_INCLUDE_RECORD_FEATURES;

    pub const fn from_bits(bits: i64) -> Self {
        SzFlags(bits)
    }

    pub const fn bits(self) -> i64 {
        self.0
    }

    pub const fn union(self, other: SzFlags) -> Self {
        SzFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: SzFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the flags with `other` cleared.
    pub const fn without(self, other: SzFlags) -> Self {
        SzFlags(self.0 & !other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for SzFlags {
    type Output = SzFlags;

    fn bitor(self, rhs: SzFlags) -> SzFlags {
        self.union(rhs)
    }
}

impl BitOrAssign for SzFlags {
    fn bitor_assign(&mut self, rhs: SzFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SzFlags {
    type Output = SzFlags;

    fn bitand(self, rhs: SzFlags) -> SzFlags {
        SzFlags(self.0 & rhs.0)
    }
}

impl Not for SzFlags {
    type Output = SzFlags;

    fn not(self) -> SzFlags {
        SzFlags(!self.0)
    }
}

impl From<i64> for SzFlags {
    fn from(bits: i64) -> Self {
        SzFlags(bits)
    }
}

impl From<SzFlags> for i64 {
    fn from(flags: SzFlags) -> Self {
        flags.0
    }
}

impl fmt::Display for SzFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a mutating call should return the affected-entities document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InfoMode {
    /// Plain entry point; the call returns an empty string.
    #[default]
    WithoutInfo,
    /// With-info entry point; the call returns the native JSON document.
    WithInfo,
}

impl InfoMode {
    /// Splits a combined legacy flag value into a mode and the remaining flags.
    pub fn from_flags(flags: SzFlags) -> (InfoMode, SzFlags) {
        let mode = if flags.contains(SzFlags::WITH_INFO) {
            InfoMode::WithInfo
        } else {
            InfoMode::WithoutInfo
        };
        (mode, flags.without(SzFlags::WITH_INFO))
    }

    /// Recombines a mode with flags into a legacy combined value.
    pub fn combine(self, flags: SzFlags) -> SzFlags {
        match self {
            InfoMode::WithInfo => flags | SzFlags::WITH_INFO,
            InfoMode::WithoutInfo => flags.without(SzFlags::WITH_INFO),
        }
    }

    pub fn is_with_info(self) -> bool {
        self == InfoMode::WithInfo
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InfoMode::WithInfo => "with_info",
            InfoMode::WithoutInfo => "without_info",
        }
    }
}

impl fmt::Display for InfoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_composite_flags() {
        assert_eq!(SzFlags::EXPORT_INCLUDE_ALL_ENTITIES.bits(), 0b10_0001);
        assert_eq!(SzFlags::ENTITY_INCLUDE_ALL_RELATIONS.bits(), 0b11_1100_0000);
        assert!(SzFlags::EXPORT_DEFAULT_FLAGS.contains(SzFlags::EXPORT_INCLUDE_ALL_ENTITIES));
        assert!(SzFlags::EXPORT_DEFAULT_FLAGS.contains(SzFlags::ENTITY_INCLUDE_RECORD_DATA));
        assert!(!SzFlags::EXPORT_DEFAULT_FLAGS.contains(SzFlags::WITH_INFO));
    }

    #[test]
    fn test_with_info_is_bit_62() {
        assert_eq!(SzFlags::WITH_INFO.bits(), 4_611_686_018_427_387_904);
    }

    #[test]
    fn test_info_mode_from_flags_strips_sentinel() {
        let combined = SzFlags::WITH_INFO | SzFlags::ENTITY_INCLUDE_ENTITY_NAME;
        let (mode, rest) = InfoMode::from_flags(combined);
        assert_eq!(mode, InfoMode::WithInfo);
        assert_eq!(rest, SzFlags::ENTITY_INCLUDE_ENTITY_NAME);

        let (mode, rest) = InfoMode::from_flags(SzFlags::ENTITY_INCLUDE_ENTITY_NAME);
        assert_eq!(mode, InfoMode::WithoutInfo);
        assert_eq!(rest, SzFlags::ENTITY_INCLUDE_ENTITY_NAME);
    }

    #[test]
    fn test_info_mode_combine() {
        let flags = SzFlags::INCLUDE_FEATURE_SCORES;
        assert!(InfoMode::WithInfo.combine(flags).contains(SzFlags::WITH_INFO));
        assert_eq!(InfoMode::WithoutInfo.combine(flags | SzFlags::WITH_INFO), flags);
    }

    #[test]
    fn test_operators() {
        let mut flags = SzFlags::NO_FLAGS;
        assert!(flags.is_empty());
        flags |= SzFlags::SEARCH_INCLUDE_STATS;
        assert_eq!(flags & SzFlags::SEARCH_INCLUDE_STATS, SzFlags::SEARCH_INCLUDE_STATS);
        assert_eq!((!flags & flags), SzFlags::NO_FLAGS);
        assert_eq!(flags.to_string(), (1i64 << 27).to_string());
    }
}
