use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::candidate::Candidate;
use super::remote::RemoteCallError;

/// Session-unique row identifier (`email-index` for scored rows, `email-pick` for fallbacks).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub String);

impl RowId {
    pub fn scored(email: &str, position: usize) -> Self {
        Self(format!("{email}-{position}"))
    }

    pub fn pick(email: &str) -> Self {
        Self(format!("{email}-pick"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the scorer's response, before the session assigns identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scores: Map<String, Value>,
    #[serde(default)]
    pub factors: Map<String, Value>,
}

/// A scored candidate as held by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRow {
    pub id: RowId,
    pub email: String,
    pub name: Option<String>,
    /// Role name to score, in the order the scorer reported them.
    pub scores: Map<String, Value>,
    /// Role name to an object of explanatory factors.
    pub factors: Map<String, Value>,
    /// The uploaded candidate payload.
    pub raw: Value,
}

impl ScoredRow {
    /// Factors explaining `role`; empty when the scorer omitted them.
    pub fn factors_for(&self, role: &str) -> Map<String, Value> {
        self.factors
            .get(role)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn raw_str(&self, field: &str) -> Option<&str> {
        self.raw.get(field).and_then(Value::as_str)
    }

    pub fn raw_array(&self, field: &str) -> &[Value] {
        self.raw
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `annual_salary_expectation["full-time"]` rendered as text, if present.
    pub fn salary_expectation(&self) -> Option<String> {
        self.raw
            .get("annual_salary_expectation")
            .and_then(|salary| salary.get("full-time"))
            .and_then(display_value)
    }

    pub fn skills(&self) -> Vec<String> {
        self.raw_array("skills")
            .iter()
            .filter_map(display_value)
            .collect()
    }
}

/// One slate entry returned by the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub scores: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlateResponse {
    #[serde(default)]
    pub picks: Vec<Pick>,
}

/// Attach identity and the uploaded payload to each scorer response entry.
///
/// The scorer must answer 1:1 and in input order; anything else is a contract violation
/// because ids and raw payloads are assigned by position.
pub(crate) fn assemble_rows(
    candidates: &[Candidate],
    response: Vec<ScoredCandidate>,
) -> Result<Vec<ScoredRow>, RemoteCallError> {
    if response.len() != candidates.len() {
        return Err(RemoteCallError::ContractViolation(format!(
            "scorer returned {} rows for {} candidates",
            response.len(),
            candidates.len()
        )));
    }

    response
        .into_iter()
        .zip(candidates)
        .enumerate()
        .map(|(position, (scored, candidate))| {
            if !scored.email.eq_ignore_ascii_case(&candidate.email) {
                return Err(RemoteCallError::ContractViolation(format!(
                    "row {position} is for {} but candidate {position} is {}",
                    scored.email, candidate.email
                )));
            }

            let raw = serde_json::to_value(candidate).map_err(RemoteCallError::Decode)?;
            Ok(ScoredRow {
                id: RowId::scored(&candidate.email, position),
                email: candidate.email.clone(),
                name: scored.name.or_else(|| candidate.name.clone()),
                scores: scored.scores,
                factors: scored.factors,
                raw,
            })
        })
        .collect()
}

/// Text form of a free-form scalar; `None` for null and structured values.
pub(crate) fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
