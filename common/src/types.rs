//! 植物情報・健康診断の型定義
//!
//! モデル応答(JSON)のキー名は camelCase。
//! - PlantDetails / PlantInfo / InfoPayload: 植物情報
//! - HealthReport / HealthAssessment: 健康診断

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// 育て方
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CareInstructions {
    pub sunlight: String,
    pub water: String,
    pub soil: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fertilizer: Option<String>,
}

/// 植物の詳細情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlantDetails {
    pub common_name: String,
    pub scientific_name: String,
    pub description: String,
    pub care_instructions: CareInstructions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth_habit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blooming_season: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fun_facts: Vec<String>,
}

/// 植物情報の取得結果
///
/// 架空・情報不足の植物はエラーではなくデータとして表現する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlantInfo {
    Found(PlantDetails),
    NotFound { name: String, message: String },
}

impl PlantInfo {
    pub fn is_found(&self) -> bool {
        matches!(self, PlantInfo::Found(_))
    }

    /// 表示名（見つかった場合は一般名）
    pub fn display_name(&self) -> &str {
        match self {
            PlantInfo::Found(details) => &details.common_name,
            PlantInfo::NotFound { name, .. } => name,
        }
    }
}

/// 出典（検索グラウンディング）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub uri: String,
    pub title: String,
}

/// 植物情報リクエストの成功結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoPayload {
    pub info: PlantInfo,
    #[serde(default)]
    pub attributions: Vec<Attribution>,
}

/// 大文字小文字を区別せずに文字列と相互変換できる列挙型を定義する
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(normalized))
                    .ok_or_else(|| format!("Unknown {}: {}", stringify!($name), s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

label_enum!(
    /// 全体的な健康状態
    OverallHealth {
        Healthy => "Healthy",
        Fair => "Fair",
        Poor => "Poor",
        Critical => "Critical",
    }
);

label_enum!(
    /// 問題の可能性
    Likelihood {
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
);

label_enum!(
    /// 対処の優先度
    Priority {
        Immediate => "Immediate",
        Soon => "Soon",
        Monitor => "Monitor",
    }
);

label_enum!(
    /// 緊急度
    Urgency {
        Emergency => "Emergency",
        AttentionNeeded => "Attention Needed",
        RoutineCare => "Routine Care",
        LooksGood => "Looks Good",
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PossibleIssue {
    pub issue: String,
    pub likelihood: Likelihood,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentRecommendation {
    pub action: String,
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
}

/// 予防ケア
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreventiveCare {
    pub watering: String,
    pub lighting: String,
    pub environment: String,
}

/// 健康診断レポート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    #[serde(default)]
    pub plant_name: String,
    pub overall_health: OverallHealth,
    #[serde(deserialize_with = "deserialize_health_score")]
    pub health_score: u8,
    #[serde(default)]
    pub visible_symptoms: Vec<String>,
    #[serde(default)]
    pub possible_issues: Vec<PossibleIssue>,
    #[serde(default)]
    pub treatment_recommendations: Vec<TreatmentRecommendation>,
    #[serde(default)]
    pub preventive_care: PreventiveCare,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// 健康診断の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HealthAssessment {
    Assessed(HealthReport),
    CannotAssess { reason: String },
}

impl HealthAssessment {
    pub fn report(&self) -> Option<&HealthReport> {
        match self {
            HealthAssessment::Assessed(report) => Some(report),
            HealthAssessment::CannotAssess { .. } => None,
        }
    }
}

pub const MIN_HEALTH_SCORE: u8 = 1;
pub const MAX_HEALTH_SCORE: u8 = 10;

/// スコアは数値・文字列どちらでも受け付け、1〜10に丸める
fn deserialize_health_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    let raw = match &value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches("/10").trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| serde::de::Error::custom(format!("invalid healthScore: {}", value)))?;

    Ok(raw
        .round()
        .clamp(MIN_HEALTH_SCORE as f64, MAX_HEALTH_SCORE as f64) as u8)
}
