use hiring_ops::config::{AppConfig, ConfigError};
use hiring_ops::error::AppError;
use hiring_ops::workflows::shortlist::{ExportFormat, HttpCandidateApi, ShortlistService};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Session service backed by the remote scoring API for both scoring and slate selection.
pub(crate) type HttpShortlistService = ShortlistService<HttpCandidateApi, HttpCandidateApi>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load configuration, applying a command-line scoring API override when given.
pub(crate) fn load_config(scoring_url: Option<String>) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = scoring_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidScoringUrl(url).into());
        }
        config.scoring.base_url = url.trim_end_matches('/').to_string();
    }
    Ok(config)
}

pub(crate) fn http_service(config: &AppConfig) -> Result<HttpShortlistService, AppError> {
    let api = Arc::new(HttpCandidateApi::from_config(&config.scoring)?);
    Ok(ShortlistService::new(api.clone(), api).with_export_format(config.export.format))
}

pub(crate) fn parse_export_format(raw: &str) -> Result<ExportFormat, String> {
    ExportFormat::parse(raw).ok_or_else(|| format!("unsupported export format '{raw}' (xlsx, csv)"))
}
