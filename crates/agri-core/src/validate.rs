//! Boundary validation. Every check runs and all failures are returned
//! together so a form can be corrected in one round trip. Nothing here
//! touches a store.

use serde::Deserialize;

use crate::error::FieldError;
use crate::types::{Range, RuleDraft, SoilReading, SoilType};

/// Raw soil-test submission as it arrives on the wire. The soil type is an
/// untrusted string until validation parses it.
#[derive(Debug, Clone, Deserialize)]
pub struct SoilTestInput {
    #[serde(rename = "soilType")]
    pub soil_type: String,
    #[serde(rename = "pH")]
    pub ph: f64,
    pub moisture: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
}

/// Validate a submission and produce the typed reading.
pub fn validate_reading(input: &SoilTestInput) -> Result<SoilReading, Vec<FieldError>> {
    let mut errors = Vec::new();

    let soil_type = SoilType::parse(&input.soil_type);
    if soil_type.is_none() {
        errors.push(FieldError::new(
            "soilType",
            format!("unknown soil type '{}'", input.soil_type),
        ));
    }

    if !input.ph.is_finite() || !(0.0..=14.0).contains(&input.ph) {
        errors.push(FieldError::new("pH", "must be between 0 and 14"));
    }
    if !input.moisture.is_finite() || input.moisture < 0.0 {
        errors.push(FieldError::new("moisture", "must be >= 0"));
    }
    if !input.nitrogen.is_finite() || input.nitrogen < 0.0 {
        errors.push(FieldError::new("nitrogen", "must be >= 0"));
    }
    if !input.phosphorus.is_finite() || input.phosphorus < 0.0 {
        errors.push(FieldError::new("phosphorus", "must be >= 0"));
    }
    if !input.potassium.is_finite() || input.potassium < 0.0 {
        errors.push(FieldError::new("potassium", "must be >= 0"));
    }

    match (soil_type, errors.is_empty()) {
        (Some(soil_type), true) => Ok(SoilReading {
            soil_type,
            ph: input.ph,
            moisture: input.moisture,
            nitrogen: input.nitrogen,
            phosphorus: input.phosphorus,
            potassium: input.potassium,
        }),
        _ => Err(errors),
    }
}

/// Validate a rule draft and produce the parsed soil type.
pub fn validate_rule_draft(draft: &RuleDraft) -> Result<SoilType, Vec<FieldError>> {
    let mut errors = Vec::new();

    let soil_type = if draft.soil_type.is_empty() {
        errors.push(FieldError::new("soilType", "must not be empty"));
        None
    } else {
        let parsed = SoilType::parse(&draft.soil_type);
        if parsed.is_none() {
            errors.push(FieldError::new(
                "soilType",
                format!("unknown soil type '{}'", draft.soil_type),
            ));
        }
        parsed
    };

    check_range("pH", &draft.ph, &mut errors);
    check_range("moisture", &draft.moisture, &mut errors);
    check_range("nitrogen", &draft.nitrogen, &mut errors);
    check_range("phosphorus", &draft.phosphorus, &mut errors);
    check_range("potassium", &draft.potassium, &mut errors);

    if draft.crop_suggestion.trim().is_empty() {
        errors.push(FieldError::new("cropSuggestion", "must not be empty"));
    }
    if draft.fertilizer_suggestion.trim().is_empty() {
        errors.push(FieldError::new("fertilizerSuggestion", "must not be empty"));
    }

    match (soil_type, errors.is_empty()) {
        (Some(soil_type), true) => Ok(soil_type),
        _ => Err(errors),
    }
}

fn check_range(field: &str, range: &Range, errors: &mut Vec<FieldError>) {
    if !range.min.is_finite() || !range.max.is_finite() {
        errors.push(FieldError::new(field, "bounds must be finite numbers"));
    } else if range.min > range.max {
        errors.push(FieldError::new(
            field,
            format!("min {} exceeds max {}", range.min, range.max),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> SoilTestInput {
        SoilTestInput {
            soil_type: "loamy".to_string(),
            ph: 6.5,
            moisture: 40.0,
            nitrogen: 25.0,
            phosphorus: 25.0,
            potassium: 25.0,
        }
    }

    fn valid_draft() -> RuleDraft {
        RuleDraft {
            soil_type: "loamy".to_string(),
            ph: Range::new(5.0, 7.0),
            moisture: Range::new(30.0, 50.0),
            nitrogen: Range::new(20.0, 30.0),
            phosphorus: Range::new(20.0, 30.0),
            potassium: Range::new(20.0, 30.0),
            crop_suggestion: "Wheat".to_string(),
            fertilizer_suggestion: "Urea".to_string(),
            irrigation_recommendation: None,
        }
    }

    #[test]
    fn valid_reading_passes() {
        let reading = validate_reading(&valid_input()).unwrap();
        assert_eq!(reading.soil_type, SoilType::Loamy);
        assert_eq!(reading.ph, 6.5);
    }

    #[test]
    fn unknown_soil_type_rejected() {
        let mut input = valid_input();
        input.soil_type = "Loamy".to_string(); // wrong case
        let errors = validate_reading(&input).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "soilType"));
    }

    #[test]
    fn out_of_range_ph_rejected() {
        let mut input = valid_input();
        input.ph = 14.5;
        let errors = validate_reading(&input).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "pH"));
    }

    #[test]
    fn all_failures_reported_together() {
        let mut input = valid_input();
        input.soil_type = "mud".to_string();
        input.ph = -1.0;
        input.moisture = -5.0;
        let errors = validate_reading(&input).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn nan_parameters_rejected() {
        let mut input = valid_input();
        input.nitrogen = f64::NAN;
        let errors = validate_reading(&input).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "nitrogen"));
    }

    #[test]
    fn valid_draft_passes() {
        assert_eq!(validate_rule_draft(&valid_draft()).unwrap(), SoilType::Loamy);
    }

    #[test]
    fn inverted_range_rejected() {
        let mut draft = valid_draft();
        draft.ph = Range::new(8.0, 5.0);
        let errors = validate_rule_draft(&draft).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "pH"));
    }

    #[test]
    fn empty_suggestions_rejected() {
        let mut draft = valid_draft();
        draft.crop_suggestion = "  ".to_string();
        draft.fertilizer_suggestion = String::new();
        let errors = validate_rule_draft(&draft).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "cropSuggestion"));
        assert!(errors.iter().any(|e| e.field == "fertilizerSuggestion"));
    }

    #[test]
    fn empty_soil_type_reported_once() {
        let mut draft = valid_draft();
        draft.soil_type = String::new();
        let errors = validate_rule_draft(&draft).unwrap_err();
        let soil_errors: Vec<_> = errors.iter().filter(|e| e.field == "soilType").collect();
        assert_eq!(soil_errors.len(), 1);
    }
}
