use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$"
    )
    .expect("email pattern compiles");
}

/// Normalized candidate record accepted into a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_salary_expectation: Option<Value>,
}

/// One employment entry. Only `roleName` is typed; everything else is carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkExperience {
    #[serde(rename = "roleName", default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Reason a single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldIssue {
    #[error("is required")]
    Missing,
    #[error("is not a valid email address ('{0}')")]
    InvalidEmail(String),
    #[error("must be {expected}")]
    WrongType { expected: &'static str },
}

/// Upload rejection. Any failure rejects the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("upload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("upload must be a JSON array of candidate records")]
    NotAnArray,
    #[error("record {index} must be a JSON object")]
    NotAnObject { index: usize },
    #[error("record {index}: field `{field}` {issue}")]
    Field {
        index: usize,
        field: String,
        issue: FieldIssue,
    },
}

impl ValidationError {
    fn field(index: usize, field: impl Into<String>, issue: FieldIssue) -> Self {
        Self::Field {
            index,
            field: field.into(),
            issue,
        }
    }
}

/// Decode an uploaded document and validate every record in it.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<Candidate>, ValidationError> {
    let document: Value = serde_json::from_slice(bytes)?;
    match document {
        Value::Array(records) => validate_batch(&records),
        _ => Err(ValidationError::NotAnArray),
    }
}

/// Validate an untrusted batch, failing fast on the first bad record.
pub fn validate_batch(records: &[Value]) -> Result<Vec<Candidate>, ValidationError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| validate_record(index, record))
        .collect()
}

fn validate_record(index: usize, record: &Value) -> Result<Candidate, ValidationError> {
    let object = record
        .as_object()
        .ok_or(ValidationError::NotAnObject { index })?;

    let email = match object.get("email") {
        None | Some(Value::Null) => {
            return Err(ValidationError::field(index, "email", FieldIssue::Missing))
        }
        Some(Value::String(email)) => email.trim().to_string(),
        Some(_) => {
            return Err(ValidationError::field(
                index,
                "email",
                FieldIssue::WrongType { expected: "a string" },
            ))
        }
    };
    if !is_valid_email(&email) {
        return Err(ValidationError::field(
            index,
            "email",
            FieldIssue::InvalidEmail(email),
        ));
    }

    let name = match object.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => {
            return Err(ValidationError::field(
                index,
                "name",
                FieldIssue::WrongType {
                    expected: "a string or null",
                },
            ))
        }
    };

    let location = match object.get("location") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(location)) => location.clone(),
        Some(_) => {
            return Err(ValidationError::field(
                index,
                "location",
                FieldIssue::WrongType { expected: "a string" },
            ))
        }
    };

    let skills = match object.get("skills") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(position, item)| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ValidationError::field(
                        index,
                        format!("skills[{position}]"),
                        FieldIssue::WrongType { expected: "a string" },
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::field(
                index,
                "skills",
                FieldIssue::WrongType {
                    expected: "an array of strings",
                },
            ))
        }
    };

    let work_experiences = match object.get("work_experiences") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(position, item)| work_experience(index, position, item))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ValidationError::field(
                index,
                "work_experiences",
                FieldIssue::WrongType {
                    expected: "an array of objects",
                },
            ))
        }
    };

    Ok(Candidate {
        name,
        email,
        location,
        skills,
        work_experiences,
        education: passthrough(object.get("education")),
        annual_salary_expectation: passthrough(object.get("annual_salary_expectation")),
    })
}

fn work_experience(
    index: usize,
    position: usize,
    item: &Value,
) -> Result<WorkExperience, ValidationError> {
    let mut details = item.as_object().cloned().ok_or_else(|| {
        ValidationError::field(
            index,
            format!("work_experiences[{position}]"),
            FieldIssue::WrongType {
                expected: "an object",
            },
        )
    })?;

    let role_name = match details.remove("roleName") {
        None | Some(Value::Null) => None,
        Some(Value::String(role)) => Some(role),
        Some(_) => {
            return Err(ValidationError::field(
                index,
                format!("work_experiences[{position}].roleName"),
                FieldIssue::WrongType { expected: "a string" },
            ))
        }
    };

    Ok(WorkExperience { role_name, details })
}

fn passthrough(value: Option<&Value>) -> Option<Value> {
    value.filter(|value| !value.is_null()).cloned()
}

fn is_valid_email(candidate: &str) -> bool {
    !candidate.starts_with('.') && !candidate.contains("..") && EMAIL_PATTERN.is_match(candidate)
}
