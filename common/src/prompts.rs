//! プロンプト生成モジュール
//!
//! - build_plant_info_prompt: 植物名からの情報取得用
//! - PLANT_IDENTIFICATION_PROMPT: 画像からの植物特定用
//! - build_health_prompt: 画像からの健康診断用

/// 画像から植物を特定できなかった場合にモデルが返す語
pub const UNKNOWN_SENTINEL: &str = "Unknown";

/// 植物情報プロンプト生成
///
/// 架空・情報不足の場合は `isFictionalOrNotFound` を返させる。
pub fn build_plant_info_prompt(plant_name: &str) -> String {
    format!(
        r#"You are a botanical expert. Provide detailed information about the plant named '{plant_name}'.
Respond strictly in JSON format. The JSON object should have the following keys:
'commonName' (string, if available, otherwise use the input plant name),
'scientificName' (string),
'description' (string, at least 50 words),
'careInstructions' (object with keys: 'sunlight' (string), 'water' (string), 'soil' (string), 'fertilizer' (string, optional, provide general advice if specific is not available)),
'origin' (string, optional),
'growthHabit' (string, optional),
'bloomingSeason' (string, optional),
'funFacts' (array of strings, optional, max 3 facts).
If the plant is fictional, or you cannot find sufficient reliable information, respond with JSON:
{{ "isFictionalOrNotFound": true, "message": "Information for this plant could not be found or it might be fictional." }}.
Do not include any introductory or concluding remarks outside the JSON structure.
Be concise and factual. For care instructions, provide practical advice."#
    )
}

/// 植物特定プロンプト（名前のみを返させる）
pub const PLANT_IDENTIFICATION_PROMPT: &str = "Analyze the provided image and identify the primary plant visible. \
Respond with only the common name of the plant. If you are unsure, cannot identify a plant, \
or if the image does not clearly show a plant, respond with the single word: Unknown. \
Do not include any other text or explanations.";

/// 健康診断プロンプト生成
pub fn build_health_prompt(plant_name: &str) -> String {
    format!(
        r#"You are a plant pathologist. The attached photo shows a plant identified as '{plant_name}'.
Assess its health based only on what is visible. Respond strictly in JSON with these keys:
"plantName" (string),
"overallHealth" (one of "Healthy", "Fair", "Poor", "Critical"),
"healthScore" (integer from 1 to 10, 10 is perfectly healthy),
"visibleSymptoms" (array of strings, empty if none),
"possibleIssues" (array of objects with "issue" (string), "likelihood" (one of "High", "Medium", "Low"), "description" (string)),
"treatmentRecommendations" (array of objects with "action" (string), "priority" (one of "Immediate", "Soon", "Monitor"), "description" (string)),
"preventiveCare" (object with "watering", "lighting", "environment" strings),
"urgency" (one of "Emergency", "Attention Needed", "Routine Care", "Looks Good"),
"additionalNotes" (string, optional).
If the image does not show a plant clearly enough to assess, respond with:
{{ "cannotAssess": true, "reason": "<why the assessment is not possible>" }}.
Do not include any text outside the JSON structure."#
    )
}
