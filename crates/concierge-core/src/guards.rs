//! Post-hoc content guards.
//!
//! Narrow substring heuristics for two observed failure classes: invented
//! periodic wage figures and silently omitted chart payloads. Each predicate
//! stands alone so its hit rate can be tuned without touching the retry loop.

use concierge_types::{
    event::GuardKind,
    session::{Turn, TurnRole},
};

pub const CHART_OPEN: &str = "<CHART_CONFIG>";
pub const CHART_CLOSE: &str = "</CHART_CONFIG>";

const WAGE_KEYWORDS: &[&str] = &[
    "wage", "salary", "pay", "rate", "per hour", "/hr", "hourly", "weekly", "per week",
];

const PERIODIC_MARKERS: &[&str] = &["per week", "/week", "weekly"];

const CHART_KEYWORDS: &[&str] = &[
    "chart", "graph", "plot", "visualize", "visualisation", "visualization", "pie", "bar", "line",
];

/// Short follow-ups that mean "render the chart you just described"
const SHOW_ME_FOLLOWUPS: &[&str] = &["show me", "show", "display it", "render it"];

/// Lowercased text of the most recent user turn, or empty.
pub fn last_user_text(history: &[Turn]) -> String {
    history
        .iter()
        .rev()
        .find(|t| t.role == TurnRole::User)
        .map(|t| t.content.to_lowercase())
        .unwrap_or_default()
}

pub fn looks_like_wage_question(history: &[Turn]) -> bool {
    let last = last_user_text(history);
    WAGE_KEYWORDS.iter().any(|k| last.contains(k))
}

/// A periodic wage figure that does not credit a tool as its source.
pub fn contains_weekly_salary_hallucination(answer: &str) -> bool {
    let answer = answer.to_lowercase();
    PERIODIC_MARKERS.iter().any(|m| answer.contains(m)) && !answer.contains("tool")
}

pub fn looks_like_chart_request(history: &[Turn]) -> bool {
    let last = last_user_text(history);

    if SHOW_ME_FOLLOWUPS.contains(&last.trim()) {
        let chart_earlier = history
            .iter()
            .rev()
            .skip_while(|t| t.role != TurnRole::User)
            .skip(1)
            .filter(|t| t.role == TurnRole::Assistant)
            .any(|t| {
                let text = t.content.to_lowercase();
                text.contains("chart") || text.contains("graph") || text.contains("<chart_config>")
            });
        if chart_earlier {
            return true;
        }
    }

    CHART_KEYWORDS.iter().any(|k| last.contains(k))
}

/// Both chart delimiters are present.
pub fn has_chart_config(answer: &str) -> bool {
    answer.contains(CHART_OPEN) && answer.contains(CHART_CLOSE)
}

/// First guard the candidate answer violates, if any. Wage is checked before chart.
pub fn violated_guard(history: &[Turn], answer: &str) -> Option<GuardKind> {
    if looks_like_wage_question(history) && contains_weekly_salary_hallucination(answer) {
        return Some(GuardKind::WageHallucination);
    }
    if looks_like_chart_request(history) && !has_chart_config(answer) {
        return Some(GuardKind::MissingChart);
    }
    None
}

/// Corrective system instruction appended after a guard trips.
pub fn correction_for(guard: GuardKind) -> &'static str {
    match guard {
        GuardKind::WageHallucination => {
            "Your previous answer invented weekly salary. Not allowed.\n\
             Retry: fetch wage_setting/hourly_rate via team.searchMembers and team.getWageSetting.\n\
             Return $/hr (amount/100). If missing, say not available."
        }
        GuardKind::MissingChart => {
            "The user asked for a chart. You MUST include a valid Chart.js JSON config wrapped in \
             <CHART_CONFIG>...</CHART_CONFIG>. Do NOT say you can't display charts. Retry now."
        }
    }
}
