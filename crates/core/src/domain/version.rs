// Platform version comparison

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Compare dotted versions component-wise ("6.1.7601" < "6.3").
/// Missing components count as 0, non-numeric ones too.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };
    let (left, right) = (parse(a), parse(b));
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Half-open platform version range `[min, max)`; either bound may be open
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl VersionRange {
    /// Matches every version
    pub fn any() -> Self {
        Self::default()
    }

    pub fn at_least(min: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: None,
        }
    }

    pub fn below(max: impl Into<String>) -> Self {
        Self {
            min: None,
            max: Some(max.into()),
        }
    }

    pub fn between(min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    pub fn contains(&self, version: &str) -> bool {
        let above_min = self
            .min
            .as_deref()
            .map_or(true, |min| compare_versions(version, min) != Ordering::Less);
        let below_max = self
            .max
            .as_deref()
            .map_or(true, |max| compare_versions(version, max) == Ordering::Less);
        above_min && below_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("6.1.7601", "6.3"), Ordering::Less);
        assert_eq!(compare_versions("10.0", "10"), Ordering::Equal);
        assert_eq!(compare_versions("22.04", "20.04"), Ordering::Greater);
        assert_eq!(compare_versions("7.x", "7.0"), Ordering::Equal);
    }

    #[test]
    fn test_range_bounds() {
        let range = VersionRange::between("6.0", "6.2");
        assert!(range.contains("6.0"));
        assert!(range.contains("6.1.7601"));
        assert!(!range.contains("6.2"));
        assert!(!range.contains("5.2"));

        assert!(VersionRange::any().contains("anything"));
        assert!(!VersionRange::any().is_bounded());
        assert!(VersionRange::at_least("10").contains("10.0.19045"));
        assert!(!VersionRange::below("10").contains("10.0"));
    }
}
