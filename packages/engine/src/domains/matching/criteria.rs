//! Filter criteria for the matchmaker's filtered mode.

use serde::{Deserialize, Serialize};

/// Optional pairing filters declared at enqueue time.
///
/// Empty interests and open age bounds mean "no preference".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub interests: Vec<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
}

impl FilterCriteria {
    /// Criteria with no constraints - behaves like random mode.
    pub fn none() -> Self {
        Self::default()
    }

    /// Criteria restricted to a set of interests.
    pub fn interests<I, S>(interests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            interests: interests.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Criteria restricted to an inclusive age range.
    pub fn age_range(age_min: i32, age_max: i32) -> Self {
        Self {
            age_min: Some(age_min),
            age_max: Some(age_max),
            ..Self::default()
        }
    }

    /// Whether two sets of criteria are compatible.
    ///
    /// Symmetric: interests must share at least one element when both
    /// sides declare any, and declared age ranges must intersect. An
    /// undeclared dimension never excludes a candidate.
    pub fn overlaps(&self, other: &FilterCriteria) -> bool {
        self.interests_overlap(other) && self.ages_intersect(other)
    }

    fn interests_overlap(&self, other: &FilterCriteria) -> bool {
        if self.interests.is_empty() || other.interests.is_empty() {
            return true;
        }
        self.interests
            .iter()
            .any(|interest| other.interests.contains(interest))
    }

    fn ages_intersect(&self, other: &FilterCriteria) -> bool {
        // [a_min, a_max] and [b_min, b_max] intersect unless one range
        // ends before the other begins; None is an open endpoint.
        let below = match (self.age_max, other.age_min) {
            (Some(a_max), Some(b_min)) => a_max < b_min,
            _ => false,
        };
        let above = match (self.age_min, other.age_max) {
            (Some(a_min), Some(b_max)) => a_min > b_max,
            _ => false,
        };
        !below && !above
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_criteria_always_overlap() {
        assert!(FilterCriteria::none().overlaps(&FilterCriteria::none()));
    }

    #[test]
    fn shared_interest_overlaps() {
        let a = FilterCriteria::interests(["music", "hiking"]);
        let b = FilterCriteria::interests(["hiking"]);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_interests_do_not_overlap() {
        let a = FilterCriteria::interests(["music"]);
        let b = FilterCriteria::interests(["chess"]);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn one_sided_interests_pass() {
        let a = FilterCriteria::interests(["music"]);
        assert!(a.overlaps(&FilterCriteria::none()));
        assert!(FilterCriteria::none().overlaps(&a));
    }

    #[test]
    fn age_ranges_intersect() {
        let a = FilterCriteria::age_range(18, 25);
        let b = FilterCriteria::age_range(24, 30);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn disjoint_age_ranges_do_not_overlap() {
        let a = FilterCriteria::age_range(18, 25);
        let b = FilterCriteria::age_range(30, 40);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn open_ended_age_range_passes() {
        let a = FilterCriteria {
            age_min: Some(18),
            age_max: None,
            interests: vec![],
        };
        let b = FilterCriteria::age_range(30, 40);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn both_dimensions_must_hold() {
        let a = FilterCriteria {
            interests: vec!["music".into()],
            age_min: Some(18),
            age_max: Some(25),
        };
        let b = FilterCriteria {
            interests: vec!["music".into()],
            age_min: Some(30),
            age_max: Some(40),
        };
        assert!(!a.overlaps(&b));
    }
}
