use std::borrow::Cow;

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::scoring::{display_value, Pick, RowId, ScoredRow};
use super::views::numeric_score;

/// Shown wherever a value is unknown.
pub const PLACEHOLDER: &str = "—";

const SLATE_SKILL_PREVIEW: usize = 6;

/// Open a pick against the scored rows, synthesizing a minimal row when scoring never saw
/// the candidate. Never fails.
pub fn resolve_pick<'a>(pick: &Pick, rows: &'a [ScoredRow]) -> Cow<'a, ScoredRow> {
    match rows.iter().find(|row| row.email.eq_ignore_ascii_case(&pick.email)) {
        Some(row) => Cow::Borrowed(row),
        None => Cow::Owned(ScoredRow {
            id: RowId::pick(&pick.email),
            email: pick.email.clone(),
            name: pick.name.clone(),
            scores: pick.scores.clone(),
            factors: Map::new(),
            raw: json!({
                "location": pick
                    .location
                    .as_deref()
                    .filter(|location| !location.is_empty())
                    .unwrap_or(PLACEHOLDER),
            }),
        }),
    }
}

/// Everything the detail dialog renders for one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub id: RowId,
    pub name: Option<String>,
    pub email: String,
    /// Every role, highest score first.
    pub roles: Vec<RoleScoreEntry>,
    pub factors: Map<String, Value>,
    pub location: String,
    pub salary_expectation: String,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<DegreeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleScoreEntry {
    pub role: String,
    pub score: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceEntry {
    pub title: String,
    pub company: Option<String>,
    pub period: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeEntry {
    pub title: String,
    pub school: Option<String>,
    pub ranking: Option<&'static str>,
}

impl DetailView {
    pub fn from_row(row: &ScoredRow) -> Self {
        let mut roles: Vec<(RoleScoreEntry, f64)> = row
            .scores
            .iter()
            .map(|(role, score)| {
                let rank = numeric_score(score).unwrap_or(0.0);
                (
                    RoleScoreEntry {
                        role: role.clone(),
                        score: score.clone(),
                    },
                    rank,
                )
            })
            .collect();
        roles.sort_by(|a, b| b.1.total_cmp(&a.1));

        let education = row
            .raw
            .get("education")
            .and_then(|education| education.get("degrees"))
            .and_then(Value::as_array)
            .map(|degrees| degrees.iter().map(degree_entry).collect())
            .unwrap_or_default();

        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            roles: roles.into_iter().map(|(entry, _)| entry).collect(),
            factors: row.factors.clone(),
            location: non_empty(row.raw_str("location")).unwrap_or(PLACEHOLDER).to_string(),
            salary_expectation: row
                .salary_expectation()
                .filter(|salary| !salary.is_empty())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            skills: row.skills(),
            experience: row
                .raw_array("work_experiences")
                .iter()
                .map(experience_entry)
                .collect(),
            education,
        }
    }
}

fn experience_entry(entry: &Value) -> ExperienceEntry {
    let text = |key: &str| non_empty(entry.get(key).and_then(Value::as_str)).map(str::to_string);
    let start = text("startDate");
    let end = text("endDate");
    let period = if start.is_some() || end.is_some() {
        Some(format!(
            "{} — {}",
            start.as_deref().unwrap_or("?"),
            end.as_deref().unwrap_or("Present")
        ))
    } else {
        None
    };

    ExperienceEntry {
        title: text("roleName").unwrap_or_else(|| "Role".to_string()),
        company: text("companyName"),
        period,
        description: text("description"),
    }
}

fn degree_entry(entry: &Value) -> DegreeEntry {
    let text = |key: &str| non_empty(entry.get(key).and_then(Value::as_str)).map(str::to_string);
    let flag = |key: &str| entry.get(key).and_then(Value::as_bool).unwrap_or(false);

    let degree = text("degree").unwrap_or_else(|| "Degree".to_string());
    let title = match text("field") {
        Some(field) => format!("{degree} in {field}"),
        None => degree,
    };
    let ranking = if flag("isTop25") {
        Some("Top 25")
    } else if flag("isTop50") {
        Some("Top 50")
    } else {
        None
    };

    DegreeEntry {
        title,
        school: text("school"),
        ranking,
    }
}

/// Compact card for one slate pick, enriched from the matching scored row when present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlateCard {
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub role_score: Option<Value>,
    pub location: String,
    pub salary_expectation: String,
    pub skills: Vec<String>,
    pub more_skills: usize,
}

impl SlateCard {
    pub fn new(pick: &Pick, rows: &[ScoredRow]) -> Self {
        let matched = rows
            .iter()
            .find(|row| row.email.eq_ignore_ascii_case(&pick.email));

        let role_score = pick
            .scores
            .get(&pick.role)
            .or_else(|| matched.and_then(|row| row.scores.get(&pick.role)))
            .cloned();

        let location = non_empty(pick.location.as_deref())
            .or_else(|| matched.and_then(|row| non_empty(row.raw_str("location"))))
            .unwrap_or(PLACEHOLDER)
            .to_string();

        let salary_expectation = matched
            .and_then(ScoredRow::salary_expectation)
            .filter(|salary| !salary.is_empty())
            .unwrap_or_else(|| PLACEHOLDER.to_string());

        let all_skills = matched.map(ScoredRow::skills).unwrap_or_default();
        let more_skills = all_skills.len().saturating_sub(SLATE_SKILL_PREVIEW);
        let skills = all_skills.into_iter().take(SLATE_SKILL_PREVIEW).collect();

        Self {
            email: pick.email.clone(),
            name: pick.name.clone(),
            role: pick.role.clone(),
            role_score,
            location,
            salary_expectation,
            skills,
            more_skills,
        }
    }

    /// Chip text such as `Engineer • 7`.
    pub fn role_label(&self) -> String {
        match self.role_score.as_ref().and_then(display_value) {
            Some(score) => format!("{} • {}", self.role, score),
            None => self.role.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored_row() -> ScoredRow {
        ScoredRow {
            id: RowId("ada@example.com-0".to_string()),
            email: "ada@example.com".to_string(),
            name: Some("Ada".to_string()),
            scores: json!({ "Engineer": 6, "Lead": 9 })
                .as_object()
                .cloned()
                .expect("object"),
            factors: json!({ "Lead": { "mentoring": "yes" } })
                .as_object()
                .cloned()
                .expect("object"),
            raw: json!({
                "location": "Oslo",
                "skills": ["Rust", "Go", "SQL", "K8s", "AWS", "gRPC", "Kafka", "Terraform"],
                "work_experiences": [
                    { "roleName": "Staff Engineer", "companyName": "Acme", "startDate": "2020" },
                    { "description": "Contracting" }
                ],
                "education": { "degrees": [
                    { "degree": "MSc", "field": "CS", "school": "NTNU", "isTop50": true },
                    { "school": "Bootcamp" }
                ]},
                "annual_salary_expectation": { "full-time": "$150,000" }
            }),
        }
    }

    fn pick(email: &str, location: Option<&str>) -> Pick {
        Pick {
            email: email.to_string(),
            name: Some("X".to_string()),
            role: "Engineer".to_string(),
            scores: json!({ "Engineer": 7 }).as_object().cloned().expect("object"),
            location: location.map(str::to_string),
        }
    }

    #[test]
    fn pick_with_matching_row_resolves_to_that_row() {
        let rows = vec![scored_row()];
        let resolved = resolve_pick(&pick("ada@example.com", None), &rows);
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert_eq!(resolved.id.as_str(), "ada@example.com-0");
        assert!(!resolved.factors.is_empty());
    }

    #[test]
    fn pick_email_matches_rows_regardless_of_case() {
        let rows = vec![scored_row()];
        let shouted = pick("Ada@Example.COM", None);

        let resolved = resolve_pick(&shouted, &rows);
        assert!(matches!(resolved, Cow::Borrowed(_)));
        assert_eq!(resolved.id.as_str(), "ada@example.com-0");

        let card = SlateCard::new(&shouted, &rows);
        assert_eq!(card.location, "Oslo");
        assert_eq!(card.salary_expectation, "$150,000");
        assert_eq!(card.skills.len(), 6);
    }

    #[test]
    fn unknown_pick_synthesizes_a_minimal_row() {
        let resolved = resolve_pick(&pick("x@y.com", None), &[]);
        assert_eq!(resolved.id.as_str(), "x@y.com-pick");
        assert_eq!(resolved.scores.get("Engineer"), Some(&json!(7)));
        assert!(resolved.factors.is_empty());
        assert_eq!(resolved.raw_str("location"), Some(PLACEHOLDER));

        let located = resolve_pick(&pick("x@y.com", Some("Remote")), &[]);
        assert_eq!(located.raw_str("location"), Some("Remote"));
    }

    #[test]
    fn synthesized_row_opens_a_detail_view() {
        let resolved = resolve_pick(&pick("x@y.com", None), &[]);
        let view = DetailView::from_row(&resolved);
        assert_eq!(view.location, PLACEHOLDER);
        assert_eq!(view.salary_expectation, PLACEHOLDER);
        assert!(view.skills.is_empty());
        assert_eq!(view.roles.len(), 1);
    }

    #[test]
    fn detail_view_orders_roles_and_fills_placeholders() {
        let view = DetailView::from_row(&scored_row());

        assert_eq!(view.roles[0].role, "Lead");
        assert_eq!(view.roles[1].role, "Engineer");
        assert_eq!(view.salary_expectation, "$150,000");
        assert_eq!(view.experience[0].title, "Staff Engineer");
        assert_eq!(view.experience[0].company.as_deref(), Some("Acme"));
        assert_eq!(view.experience[0].period.as_deref(), Some("2020 — Present"));
        assert_eq!(view.experience[1].title, "Role");
        assert_eq!(view.experience[1].period, None);
        assert_eq!(view.education[0].title, "MSc in CS");
        assert_eq!(view.education[0].ranking, Some("Top 50"));
        assert_eq!(view.education[1].title, "Degree");
    }

    #[test]
    fn detail_roles_rank_numeric_strings_by_value() {
        let mut row = scored_row();
        row.scores = json!({ "Engineer": 6, "Lead": " 9 ", "Ops": "n/a", "Support": 7.5 })
            .as_object()
            .cloned()
            .expect("object");

        let view = DetailView::from_row(&row);
        let order: Vec<&str> = view.roles.iter().map(|entry| entry.role.as_str()).collect();
        assert_eq!(order, ["Lead", "Support", "Engineer", "Ops"]);
        assert_eq!(view.roles[0].score, json!(" 9 "));
    }

    #[test]
    fn slate_card_prefers_pick_data_then_scored_row() {
        let rows = vec![scored_row()];
        let mut lead_pick = pick("ada@example.com", None);
        lead_pick.role = "Lead".to_string();
        lead_pick.scores = Map::new();

        let card = SlateCard::new(&lead_pick, &rows);
        assert_eq!(card.role_score, Some(json!(9)));
        assert_eq!(card.role_label(), "Lead • 9");
        assert_eq!(card.location, "Oslo");
        assert_eq!(card.salary_expectation, "$150,000");
        assert_eq!(card.skills.len(), 6);
        assert_eq!(card.more_skills, 2);
    }

    #[test]
    fn slate_card_without_match_uses_placeholders() {
        let card = SlateCard::new(&pick("x@y.com", None), &[]);
        assert_eq!(card.role_label(), "Engineer • 7");
        assert_eq!(card.location, PLACEHOLDER);
        assert_eq!(card.salary_expectation, PLACEHOLDER);
        assert!(card.skills.is_empty());
        assert_eq!(card.more_skills, 0);
    }
}
