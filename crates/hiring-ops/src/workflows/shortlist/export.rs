use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::scoring::{display_value, ScoredRow};
use super::views::top_role_and_score;

const SHEET_NAME: &str = "Shortlist";

const COLUMNS: [&str; 8] = [
    "Name",
    "Email",
    "Location",
    "Top Role",
    "Top Score",
    "Skills",
    "Experience Count",
    "Salary Expectation",
];

/// One flattened line of the shortlist report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShortlistRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Top Role")]
    pub top_role: String,
    #[serde(rename = "Top Score")]
    pub top_score: ReportScore,
    #[serde(rename = "Skills")]
    pub skills: String,
    #[serde(rename = "Experience Count")]
    pub experience_count: usize,
    #[serde(rename = "Salary Expectation")]
    pub salary_expectation: String,
}

/// Top score cell: numbers stay numeric, anything else is written as text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportScore {
    Number(Number),
    Text(String),
}

impl From<&Value> for ReportScore {
    fn from(value: &Value) -> Self {
        match value {
            Value::Number(number) => Self::Number(number.clone()),
            other => Self::Text(display_value(other).unwrap_or_default()),
        }
    }
}

impl ShortlistRecord {
    pub fn from_row(row: &ScoredRow) -> Self {
        let top = top_role_and_score(row);
        Self {
            name: row.name.clone().unwrap_or_default(),
            email: row.email.clone(),
            location: row.raw_str("location").unwrap_or_default().to_string(),
            top_score: ReportScore::from(&top.score),
            top_role: top.role,
            skills: row.skills().join(", "),
            experience_count: row.raw_array("work_experiences").len(),
            salary_expectation: row.salary_expectation().unwrap_or_default(),
        }
    }
}

/// Flatten rows into report records, keeping their order.
pub fn flatten_rows(rows: &[ScoredRow]) -> Vec<ShortlistRecord> {
    rows.iter().map(ShortlistRecord::from_row).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Xlsx => "shortlist.xlsx",
            Self::Csv => "shortlist.csv",
        }
    }

    pub fn content_type(self) -> String {
        mime_guess::from_path(self.file_name())
            .first_or_octet_stream()
            .to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to build xlsx workbook: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("failed to write csv report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report: {0}")]
    Io(#[from] std::io::Error),
}

/// Encoded report ready to hand to a download or a file.
#[derive(Debug, Clone)]
pub struct ShortlistExport {
    pub format: ExportFormat,
    pub file_name: &'static str,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ShortlistExport {
    pub fn encode(records: &[ShortlistRecord], format: ExportFormat) -> Result<Self, ExportError> {
        let bytes = match format {
            ExportFormat::Xlsx => encode_xlsx(records)?,
            ExportFormat::Csv => encode_csv(records)?,
        };

        Ok(Self {
            format,
            file_name: format.file_name(),
            content_type: format.content_type(),
            bytes,
        })
    }
}

fn encode_xlsx(records: &[ShortlistRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (column, title) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, column as u16, *title, &header_format)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        worksheet.write_string(row, 0, &record.name)?;
        worksheet.write_string(row, 1, &record.email)?;
        worksheet.write_string(row, 2, &record.location)?;
        worksheet.write_string(row, 3, &record.top_role)?;
        match &record.top_score {
            ReportScore::Number(number) => {
                worksheet.write_number(row, 4, number.as_f64().unwrap_or(0.0))?;
            }
            ReportScore::Text(text) => {
                worksheet.write_string(row, 4, text)?;
            }
        }
        worksheet.write_string(row, 5, &record.skills)?;
        worksheet.write_number(row, 6, record.experience_count as f64)?;
        worksheet.write_string(row, 7, &record.salary_expectation)?;
    }

    worksheet.autofit();
    Ok(workbook.save_to_buffer()?)
}

fn encode_csv(records: &[ShortlistRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|err| ExportError::Io(err.into_error()))
}
