//! Report rendering. The in-tree renderer emits a plain-text artifact and a
//! `text:` reference; swapping in a real PDF pipeline means implementing
//! `ReportRenderer` against it.

use crate::ports::{ReportRenderer, Result};
use crate::types::{Recommendation, SoilTest};

#[derive(Default)]
pub struct TextReportRenderer;

impl ReportRenderer for TextReportRenderer {
    fn render(&self, test: &SoilTest, rec: &Recommendation) -> Result<String> {
        let body = format!(
            "Soil Test Report\n\
             ----------------\n\
             Soil Type: {}\n\
             pH: {}\n\
             Moisture: {}\n\
             Nitrogen: {}\n\
             Phosphorus: {}\n\
             Potassium: {}\n\
             \n\
             Recommendation\n\
             Crop: {}\n\
             Fertilizer: {}\n\
             Irrigation: {}\n",
            test.reading.soil_type,
            test.reading.ph,
            test.reading.moisture,
            test.reading.nitrogen,
            test.reading.phosphorus,
            test.reading.potassium,
            rec.crop_suggestion,
            rec.fertilizer_suggestion,
            rec.irrigation_recommendation.as_deref().unwrap_or("N/A"),
        );
        Ok(format!("text:{};report-for={}", body.len(), test.test_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SoilReading, SoilType};
    use uuid::Uuid;

    #[test]
    fn renders_a_reference_tied_to_the_test() {
        let test = SoilTest::new(
            Uuid::new_v4(),
            SoilReading {
                soil_type: SoilType::Loamy,
                ph: 6.5,
                moisture: 40.0,
                nitrogen: 25.0,
                phosphorus: 25.0,
                potassium: 25.0,
            },
        );
        let rec = Recommendation::from_rule(
            test.test_id,
            &crate::types::SoilRule {
                rule_id: Uuid::new_v4(),
                soil_type: SoilType::Loamy,
                ranges: crate::types::ParamRanges::snapshot(&test.reading),
                crop_suggestion: "Wheat".into(),
                fertilizer_suggestion: "Urea".into(),
                irrigation_recommendation: None,
                status: crate::types::RuleStatus::Approved,
                created_by: None,
                reviewed_by: None,
                updated_on: chrono::Utc::now(),
            },
        );
        let url = TextReportRenderer.render(&test, &rec).unwrap();
        assert!(url.contains(&test.test_id.to_string()));
    }
}
