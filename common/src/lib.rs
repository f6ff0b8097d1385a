//! Plant Explorer Common Library
//!
//! CLIと将来のフロントエンドで共有される型とユーティリティ
//! （I/Oは持たない）

pub mod data_url;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod types;

pub use error::{Error, GatewayError, Result};
pub use parser::{extract_json, parse_health_assessment, parse_identification, parse_plant_info};
pub use prompts::{build_health_prompt, build_plant_info_prompt, PLANT_IDENTIFICATION_PROMPT, UNKNOWN_SENTINEL};
pub use types::{
    Attribution, CareInstructions, HealthAssessment, HealthReport, InfoPayload, Likelihood,
    OverallHealth, PlantDetails, PlantInfo, PossibleIssue, PreventiveCare, Priority,
    TreatmentRecommendation, Urgency,
};
