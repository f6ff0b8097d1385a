//! モデル応答パーサー
//!
//! 応答テキストから ```json フェンスを外してJSONを取り出し、
//! 植物情報・植物名・健康診断をパースする。

use crate::error::{Error, GatewayError, Result};
use crate::prompts::UNKNOWN_SENTINEL;
use crate::types::{HealthAssessment, HealthReport, PlantDetails, PlantInfo};
use serde_json::Value;

/// 特定結果として受け付ける最大文字数（これを超えたら説明文とみなす）
const MAX_PLANT_NAME_CHARS: usize = 80;

const NOT_FOUND_MESSAGE: &str =
    "Information for this plant could not be found or it might be fictional.";
const DEGRADED_NOT_FOUND_MESSAGE: &str = "Failed to parse detailed plant information. \
The plant might be obscure or the data format was unexpected.";
const UNSURE_MESSAGE: &str = "Could not identify the plant. The model was unsure.";
const UNCLEAR_MESSAGE: &str = "Identification response was unclear or empty.";
const DEFAULT_CANNOT_ASSESS_REASON: &str = "The health of this plant could not be assessed from the image.";

/// 応答からJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ``` / ```json フェンスで囲まれたブロック
/// 2. 最初の `{` から最後の `}` まで
/// 3. エラー
///
/// # Examples
/// ```
/// use plant_explorer_common::extract_json;
///
/// let response = "```json\n{\"commonName\": \"Fern\"}\n```";
/// assert_eq!(extract_json(response).unwrap(), "{\"commonName\": \"Fern\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    let trimmed = response.trim();

    if let Some(start_marker) = trimmed.find("```") {
        let mut start = start_marker + 3;
        if trimmed[start..].starts_with("json") {
            start += 4;
        }
        if let Some(end_offset) = trimmed[start..].find("```") {
            let body = trimmed[start..start + end_offset].trim();
            if !body.is_empty() {
                return Ok(body);
            }
        }
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                return Ok(&trimmed[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 植物情報の応答をパース
///
/// パースに失敗しても応答が「見つからない」旨を含んでいれば、
/// 最小限の NotFound を返す。
pub fn parse_plant_info(response: &str, plant_name: &str) -> std::result::Result<PlantInfo, GatewayError> {
    match parse_plant_info_strict(response, plant_name) {
        Ok(info) => Ok(info),
        Err(_) if response.contains("isFictionalOrNotFound") => Ok(PlantInfo::NotFound {
            name: plant_name.to_string(),
            message: DEGRADED_NOT_FOUND_MESSAGE.to_string(),
        }),
        Err(e) => Err(GatewayError::Parse(format!(
            "Failed to parse plant information ({}). Gemini raw response: {}",
            e, response
        ))),
    }
}

fn parse_plant_info_strict(response: &str, plant_name: &str) -> Result<PlantInfo> {
    let value: Value = serde_json::from_str(extract_json(response)?)?;
    let Some(map) = value.as_object() else {
        return Err(Error::Parse("JSON object not found".into()));
    };

    if map.get("isFictionalOrNotFound").and_then(Value::as_bool) == Some(true) {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(NOT_FOUND_MESSAGE);
        let name = map
            .get("commonName")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(plant_name);
        return Ok(PlantInfo::NotFound {
            name: name.to_string(),
            message: message.to_string(),
        });
    }

    let mut details: PlantDetails = serde_json::from_value(value)?;
    if details.common_name.trim().is_empty() {
        details.common_name = plant_name.to_string();
    }
    details.fun_facts.truncate(3);
    Ok(PlantInfo::Found(details))
}

/// 植物特定の応答をパース
///
/// "Unknown" 応答と、空・曖昧な応答は別のメッセージで区別する。
pub fn parse_identification(response: &str) -> std::result::Result<String, GatewayError> {
    let first_line = response
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let name = first_line
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '*' | '`' | '.' | '!'))
        .trim();

    if name.eq_ignore_ascii_case(UNKNOWN_SENTINEL) {
        return Err(GatewayError::Unidentified(UNSURE_MESSAGE.to_string()));
    }
    if name.is_empty() || name.chars().count() > MAX_PLANT_NAME_CHARS {
        return Err(GatewayError::Unidentified(UNCLEAR_MESSAGE.to_string()));
    }
    Ok(name.to_string())
}

/// 健康診断の応答をパース
pub fn parse_health_assessment(
    response: &str,
    plant_name: &str,
) -> std::result::Result<HealthAssessment, GatewayError> {
    parse_health_strict(response, plant_name).map_err(|e| {
        GatewayError::Parse(format!("Failed to parse health assessment ({}). Gemini raw response: {}", e, response))
    })
}

fn parse_health_strict(response: &str, plant_name: &str) -> Result<HealthAssessment> {
    let value: Value = serde_json::from_str(extract_json(response)?)?;
    let Some(map) = value.as_object() else {
        return Err(Error::Parse("JSON object not found".into()));
    };

    if map.get("cannotAssess").and_then(Value::as_bool) == Some(true) {
        let reason = map
            .get("reason")
            .and_then(Value::as_str)
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(DEFAULT_CANNOT_ASSESS_REASON);
        return Ok(HealthAssessment::CannotAssess {
            reason: reason.to_string(),
        });
    }

    let mut report: HealthReport = serde_json::from_value(value)?;
    if report.plant_name.trim().is_empty() {
        report.plant_name = plant_name.to_string();
    }
    Ok(HealthAssessment::Assessed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Likelihood, OverallHealth, Priority, Urgency};

    // =============================================
    // extract_json テスト
    // =============================================

    #[test]
    fn test_extract_json_with_json_fence() {
        let response = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json(response).unwrap(), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_with_bare_fence() {
        let response = "```\n{\"key\": 1}\n```";
        assert_eq!(extract_json(response).unwrap(), r#"{"key": 1}"#);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = r#"Sure! Here it is: {"key": {"nested": true}} Hope this helps."#;
        assert_eq!(extract_json(response).unwrap(), r#"{"key": {"nested": true}}"#);
    }

    #[test]
    fn test_extract_json_error() {
        let result = extract_json("No JSON here, just plain text.");
        assert!(matches!(result, Err(Error::Parse(_))));
        assert!(extract_json("").is_err());
    }

    // =============================================
    // parse_plant_info テスト
    // =============================================

    #[test]
    fn test_parse_plant_info_found() {
        let response = r#"```json
{
  "commonName": "Swiss Cheese Plant",
  "scientificName": "Monstera deliciosa",
  "description": "A tropical climber.",
  "careInstructions": {"sunlight": "Bright indirect", "water": "Weekly", "soil": "Chunky aroid mix"},
  "funFacts": ["a", "b", "c", "d"]
}
```"#;
        let info = parse_plant_info(response, "Monstera").unwrap();
        let PlantInfo::Found(details) = info else {
            panic!("Expected Found");
        };
        assert_eq!(details.common_name, "Swiss Cheese Plant");
        assert_eq!(details.scientific_name, "Monstera deliciosa");
        assert_eq!(details.care_instructions.soil, "Chunky aroid mix");
        assert_eq!(details.fun_facts.len(), 3);
    }

    #[test]
    fn test_parse_plant_info_fills_missing_common_name() {
        let response = r#"{"scientificName": "Ficus lyrata", "careInstructions": {}}"#;
        let info = parse_plant_info(response, "Fiddle Leaf Fig").unwrap();
        assert_eq!(info.display_name(), "Fiddle Leaf Fig");
    }

    #[test]
    fn test_parse_plant_info_not_found_variant() {
        let response = r#"{"isFictionalOrNotFound": true, "message": "No such plant."}"#;
        let info = parse_plant_info(response, "Moonpetal").unwrap();
        assert_eq!(
            info,
            PlantInfo::NotFound {
                name: "Moonpetal".to_string(),
                message: "No such plant.".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_plant_info_degraded_recovery() {
        // シングルクォートのJSONはパースできないが、not-found の手掛かりがある
        let response = "{ 'isFictionalOrNotFound': true, 'message': 'nope' }";
        let info = parse_plant_info(response, "Moonpetal").unwrap();
        match info {
            PlantInfo::NotFound { name, message } => {
                assert_eq!(name, "Moonpetal");
                assert!(message.contains("Failed to parse"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plant_info_malformed_is_error() {
        let err = parse_plant_info("I cannot help with that.", "Rose").unwrap_err();
        let GatewayError::Parse(message) = err else {
            panic!("Expected Parse error");
        };
        assert!(message.contains("I cannot help with that."));
    }

    // =============================================
    // parse_identification テスト
    // =============================================

    #[test]
    fn test_parse_identification_name() {
        assert_eq!(parse_identification("  Snake Plant\n").unwrap(), "Snake Plant");
        assert_eq!(parse_identification("\"Peace Lily.\"").unwrap(), "Peace Lily");
    }

    #[test]
    fn test_parse_identification_unknown_sentinel() {
        let err = parse_identification("unknown.").unwrap_err();
        assert_eq!(err, GatewayError::Unidentified(UNSURE_MESSAGE.to_string()));
    }

    #[test]
    fn test_parse_identification_empty_or_rambling() {
        let err = parse_identification("   ").unwrap_err();
        assert_eq!(err, GatewayError::Unidentified(UNCLEAR_MESSAGE.to_string()));

        let rambling = "This image appears to show several different plants, possibly a fern and a succulent, in a pot";
        assert!(matches!(parse_identification(rambling), Err(GatewayError::Unidentified(_))));
    }

    // =============================================
    // parse_health_assessment テスト
    // =============================================

    #[test]
    fn test_parse_health_assessment_full() {
        let response = r#"{
  "plantName": "Pothos",
  "overallHealth": "fair",
  "healthScore": 6,
  "visibleSymptoms": ["Yellowing lower leaves"],
  "possibleIssues": [{"issue": "Overwatering", "likelihood": "High", "description": "Soggy soil"}],
  "treatmentRecommendations": [{"action": "Let soil dry", "priority": "Soon", "description": "Skip a watering"}],
  "preventiveCare": {"watering": "When top inch is dry", "lighting": "Medium indirect", "environment": "Avoid drafts"},
  "urgency": "Attention Needed"
}"#;
        let assessment = parse_health_assessment(response, "Pothos").unwrap();
        let report = assessment.report().expect("Expected report");
        assert_eq!(report.overall_health, OverallHealth::Fair);
        assert_eq!(report.health_score, 6);
        assert_eq!(report.possible_issues[0].likelihood, Likelihood::High);
        assert_eq!(report.treatment_recommendations[0].priority, Priority::Soon);
        assert_eq!(report.urgency, Urgency::AttentionNeeded);
        assert_eq!(report.additional_notes, None);
    }

    #[test]
    fn test_parse_health_assessment_cannot_assess() {
        let response = r#"{"cannotAssess": true, "reason": "The photo is too blurry."}"#;
        let assessment = parse_health_assessment(response, "Pothos").unwrap();
        assert_eq!(
            assessment,
            HealthAssessment::CannotAssess {
                reason: "The photo is too blurry.".to_string()
            }
        );
        assert!(assessment.report().is_none());
    }

    #[test]
    fn test_parse_health_assessment_missing_fields_is_error() {
        let response = r#"{"overallHealth": "Healthy"}"#;
        assert!(matches!(
            parse_health_assessment(response, "Pothos"),
            Err(GatewayError::Parse(_))
        ));
    }
}
