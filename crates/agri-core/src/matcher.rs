//! Rule matching. Pure read-and-compare: no I/O, no side effects, and a
//! reading that matches nothing is a normal `None`, never an error.

use crate::types::{RuleStatus, SoilReading, SoilRule};

/// Find the best APPROVED rule for a reading.
///
/// Candidates are APPROVED rules whose soil type equals the reading's
/// (exact match via the typed enum). A candidate matches when every one of
/// the five parameters falls inside its window, inclusive on both bounds.
///
/// When several candidates match, the narrowest one wins: smallest sum of
/// window widths across the five parameters, with first-seen order as the
/// final tie-break. See DESIGN.md.
pub fn match_reading<'a>(rules: &'a [SoilRule], reading: &SoilReading) -> Option<&'a SoilRule> {
    rules
        .iter()
        .filter(|r| r.status == RuleStatus::Approved)
        .filter(|r| r.soil_type == reading.soil_type)
        .filter(|r| r.ranges.contains(reading))
        .min_by(|a, b| {
            a.ranges
                .total_span()
                .partial_cmp(&b.ranges.total_span())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParamRanges, Range, SoilType};
    use chrono::Utc;
    use uuid::Uuid;

    fn rule(soil_type: SoilType, status: RuleStatus, spans: [(f64, f64); 5]) -> SoilRule {
        SoilRule {
            rule_id: Uuid::new_v4(),
            soil_type,
            ranges: ParamRanges {
                ph: Range::new(spans[0].0, spans[0].1),
                moisture: Range::new(spans[1].0, spans[1].1),
                nitrogen: Range::new(spans[2].0, spans[2].1),
                phosphorus: Range::new(spans[3].0, spans[3].1),
                potassium: Range::new(spans[4].0, spans[4].1),
            },
            crop_suggestion: "Wheat".to_string(),
            fertilizer_suggestion: "Urea".to_string(),
            irrigation_recommendation: None,
            status,
            created_by: None,
            reviewed_by: None,
            updated_on: Utc::now(),
        }
    }

    fn loamy_rule() -> SoilRule {
        rule(
            SoilType::Loamy,
            RuleStatus::Approved,
            [
                (5.0, 7.0),
                (30.0, 50.0),
                (20.0, 30.0),
                (20.0, 30.0),
                (20.0, 30.0),
            ],
        )
    }

    fn reading(soil_type: SoilType, ph: f64) -> SoilReading {
        SoilReading {
            soil_type,
            ph,
            moisture: 40.0,
            nitrogen: 25.0,
            phosphorus: 25.0,
            potassium: 25.0,
        }
    }

    #[test]
    fn matches_when_all_parameters_inside() {
        let rules = vec![loamy_rule()];
        let hit = match_reading(&rules, &reading(SoilType::Loamy, 6.5));
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().crop_suggestion, "Wheat");
    }

    #[test]
    fn bounds_are_inclusive_on_every_parameter() {
        let rules = vec![loamy_rule()];
        // Exactly at min for every parameter.
        let at_min = SoilReading {
            soil_type: SoilType::Loamy,
            ph: 5.0,
            moisture: 30.0,
            nitrogen: 20.0,
            phosphorus: 20.0,
            potassium: 20.0,
        };
        assert!(match_reading(&rules, &at_min).is_some());
        // Exactly at max for every parameter.
        let at_max = SoilReading {
            soil_type: SoilType::Loamy,
            ph: 7.0,
            moisture: 50.0,
            nitrogen: 30.0,
            phosphorus: 30.0,
            potassium: 30.0,
        };
        assert!(match_reading(&rules, &at_max).is_some());
    }

    #[test]
    fn one_parameter_outside_fails_the_candidate() {
        let rules = vec![loamy_rule()];
        let mut r = reading(SoilType::Loamy, 6.5);
        r.potassium = 30.5;
        assert!(match_reading(&rules, &r).is_none());
    }

    #[test]
    fn soil_type_mismatch_yields_no_match_regardless_of_values() {
        let rules = vec![loamy_rule()];
        assert!(match_reading(&rules, &reading(SoilType::Sandy, 6.5)).is_none());
    }

    #[test]
    fn pending_and_rejected_rules_are_never_candidates() {
        let mut pending = loamy_rule();
        pending.status = RuleStatus::Pending;
        let mut rejected = loamy_rule();
        rejected.status = RuleStatus::Rejected;
        let rules = vec![pending, rejected];
        assert!(match_reading(&rules, &reading(SoilType::Loamy, 6.5)).is_none());
    }

    #[test]
    fn empty_rule_set_yields_no_match() {
        assert!(match_reading(&[], &reading(SoilType::Loamy, 6.5)).is_none());
    }

    #[test]
    fn narrowest_candidate_wins() {
        let broad = rule(
            SoilType::Loamy,
            RuleStatus::Approved,
            [
                (0.0, 14.0),
                (0.0, 100.0),
                (0.0, 100.0),
                (0.0, 100.0),
                (0.0, 100.0),
            ],
        );
        let mut narrow = loamy_rule();
        narrow.crop_suggestion = "Barley".to_string();
        // Broad listed first: span ordering must beat insertion order.
        let rules = vec![broad, narrow];
        let hit = match_reading(&rules, &reading(SoilType::Loamy, 6.5)).unwrap();
        assert_eq!(hit.crop_suggestion, "Barley");
    }

    #[test]
    fn equal_span_falls_back_to_first_seen() {
        let first = loamy_rule();
        let mut second = loamy_rule();
        second.crop_suggestion = "Rice".to_string();
        let first_id = first.rule_id;
        let rules = vec![first, second];
        let hit = match_reading(&rules, &reading(SoilType::Loamy, 6.5)).unwrap();
        assert_eq!(hit.rule_id, first_id);
    }
}
