//! 端末向けの表示整形
//!
//! 植物情報カード・健康診断カード・履歴一覧を文字列にする。

use crate::coordinator::{PlantSession, Slot};
use crate::history::{HistoryItem, SearchKind};
use chrono::{DateTime, Local};
use plant_explorer_common::{
    Attribution, HealthAssessment, HealthReport, InfoPayload, PlantDetails, PlantInfo,
};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────";

/// 植物情報カード
pub fn render_info(payload: &InfoPayload) -> String {
    let mut out = String::new();
    match &payload.info {
        PlantInfo::Found(details) => write_details(&mut out, details),
        PlantInfo::NotFound { name, message } => {
            let _ = writeln!(out, "🔍 「{}」の情報が見つかりませんでした", name);
            let _ = writeln!(out, "{}", message);
        }
    }
    write_attributions(&mut out, &payload.attributions);
    out
}

fn write_details(out: &mut String, details: &PlantDetails) {
    let _ = writeln!(out, "🌿 {}", details.common_name);
    if !details.scientific_name.is_empty() {
        let _ = writeln!(out, "   {}", details.scientific_name);
    }
    let _ = writeln!(out, "{}", RULE);
    if !details.description.is_empty() {
        let _ = writeln!(out, "{}\n", details.description);
    }

    let care = &details.care_instructions;
    let _ = writeln!(out, "育て方:");
    write_field(out, "日当たり", &care.sunlight);
    write_field(out, "水やり", &care.water);
    write_field(out, "用土", &care.soil);
    if let Some(fertilizer) = &care.fertilizer {
        write_field(out, "肥料", fertilizer);
    }

    let extras = [
        ("原産地", &details.origin),
        ("生育型", &details.growth_habit),
        ("開花期", &details.blooming_season),
    ];
    if extras.iter().any(|(_, v)| v.is_some()) {
        let _ = writeln!(out);
        for (label, value) in extras {
            if let Some(value) = value {
                let _ = writeln!(out, "{}: {}", label, value);
            }
        }
    }

    if !details.fun_facts.is_empty() {
        let _ = writeln!(out, "\n豆知識:");
        for fact in &details.fun_facts {
            let _ = writeln!(out, "  • {}", fact);
        }
    }
}

fn write_field(out: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "  {}: {}", label, value);
    }
}

fn write_attributions(out: &mut String, attributions: &[Attribution]) {
    if attributions.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n出典:");
    for source in attributions {
        let _ = writeln!(out, "  - {} <{}>", source.title, source.uri);
    }
}

/// 健康診断カード
pub fn render_health(assessment: &HealthAssessment) -> String {
    match assessment {
        HealthAssessment::Assessed(report) => render_report(report),
        HealthAssessment::CannotAssess { reason } => {
            format!("⚠ この写真では健康状態を判断できません\n{}\n", reason)
        }
    }
}

fn render_report(report: &HealthReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🩺 {} の健康診断", report.plant_name);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "状態: {}  スコア: {}/10  緊急度: {}",
        report.overall_health, report.health_score, report.urgency
    );

    if !report.visible_symptoms.is_empty() {
        let _ = writeln!(out, "\n見られる症状:");
        for symptom in &report.visible_symptoms {
            let _ = writeln!(out, "  • {}", symptom);
        }
    }

    if !report.possible_issues.is_empty() {
        let _ = writeln!(out, "\n考えられる原因:");
        for issue in &report.possible_issues {
            let _ = writeln!(out, "  • {} [{}]", issue.issue, issue.likelihood);
            if !issue.description.is_empty() {
                let _ = writeln!(out, "    {}", issue.description);
            }
        }
    }

    if !report.treatment_recommendations.is_empty() {
        let _ = writeln!(out, "\n対処:");
        for treatment in &report.treatment_recommendations {
            let _ = writeln!(out, "  • {} [{}]", treatment.action, treatment.priority);
            if !treatment.description.is_empty() {
                let _ = writeln!(out, "    {}", treatment.description);
            }
        }
    }

    let care = &report.preventive_care;
    if !(care.watering.is_empty() && care.lighting.is_empty() && care.environment.is_empty()) {
        let _ = writeln!(out, "\n予防:");
        write_field(&mut out, "水やり", &care.watering);
        write_field(&mut out, "光", &care.lighting);
        write_field(&mut out, "環境", &care.environment);
    }

    if let Some(notes) = &report.additional_notes {
        let _ = writeln!(out, "\n備考: {}", notes);
    }
    out
}

/// チャネルの状態に応じた表示
pub fn render_slot<T>(slot: &Slot<T>, render: impl Fn(&T) -> String) -> String {
    match slot {
        Slot::Empty => "（未取得）\n".to_string(),
        Slot::Loading(_) => "読み込み中...\n".to_string(),
        Slot::Ready(value) => render(value),
        Slot::Failed(message) => format!("✗ {}\n", message),
    }
}

/// 選択画面の見出し
pub fn render_choice(session: &PlantSession) -> String {
    let status = |loading: bool, ready: bool| match (loading, ready) {
        (true, _) => "読み込み中",
        (_, true) => "取得済み",
        _ => "未取得",
    };
    let mut out = format!("✔ 植物を特定しました: {}\n", session.plant_name);
    let _ = writeln!(
        out,
        "  植物情報: {} / 健康診断: {}",
        status(session.info.is_loading(), session.info.ready().is_some()),
        status(session.health.is_loading(), session.health.ready().is_some()),
    );
    out
}

/// 履歴一覧
pub fn render_history(items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return "履歴はありません\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let kind = match item.search_type {
            SearchKind::Text => "🔤",
            SearchKind::Image => "📷",
        };
        let _ = writeln!(
            out,
            "{} {}  {}  [{}]",
            kind,
            format_relative(item.timestamp, Local::now()),
            item.plant_name,
            item.id
        );
    }
    out
}

/// 経過時間で表示を変える（1時間未満・24時間未満・48時間未満・それ以前は日付）
fn format_relative(millis: i64, now: DateTime<Local>) -> String {
    let Some(then) = DateTime::from_timestamp_millis(millis) else {
        return "-".to_string();
    };
    let then = then.with_timezone(&Local);
    let hours = now.signed_duration_since(then).num_hours();
    match hours {
        i64::MIN..=0 => "たった今".to_string(),
        1..=23 => format!("{}時間前", hours),
        24..=47 => "昨日".to_string(),
        _ => then.format("%Y/%m/%d").to_string(),
    }
}
