use crate::infra::{http_service, load_config, parse_export_format};
use clap::Args;
use hiring_ops::error::AppError;
use hiring_ops::workflows::shortlist::{
    ExportFormat, RowId, RowView, SessionSnapshot, SlateCard, SortDirection,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct RankArgs {
    /// JSON file holding an array of candidate records
    pub(crate) file: PathBuf,
    /// Shortlist the top N ranked candidates and export them
    #[arg(long)]
    pub(crate) top: Option<usize>,
    /// Export format for the shortlist (xlsx or csv). Defaults to APP_EXPORT_FORMAT.
    #[arg(long, value_parser = parse_export_format)]
    pub(crate) format: Option<ExportFormat>,
    /// Where to write the export. Defaults to the report file name in the working directory.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Rank lowest scores first
    #[arg(long)]
    pub(crate) ascending: bool,
    /// Override the configured scoring API base URL
    #[arg(long)]
    pub(crate) scoring_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct SlateArgs {
    /// JSON file holding an array of candidate records
    pub(crate) file: PathBuf,
    /// Score the batch first so the cards can show salary and skills
    #[arg(long)]
    pub(crate) with_scores: bool,
    /// Override the configured scoring API base URL
    #[arg(long)]
    pub(crate) scoring_url: Option<String>,
}

pub(crate) async fn run_rank(args: RankArgs) -> Result<(), AppError> {
    let RankArgs {
        file,
        top,
        format,
        output,
        ascending,
        scoring_url,
    } = args;

    let config = load_config(scoring_url)?;
    let service = http_service(&config)?;

    let bytes = std::fs::read(&file)?;
    service.upload(&bytes, display_name(&file))?;
    service.score().await?;
    let direction = if ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let snapshot = service.sort(Some(direction));
    render_ranking(&snapshot);

    let Some(top) = top else {
        return Ok(());
    };
    let chosen: Vec<RowId> = snapshot
        .rows
        .iter()
        .take(top)
        .map(|row| row.id.clone())
        .collect();
    if chosen.is_empty() {
        println!("\nNothing to shortlist");
        return Ok(());
    }
    for id in &chosen {
        service.toggle_selection(id)?;
    }
    let shortlisted = service.shortlist()?;
    println!("\nShortlisted {} of {} candidates", shortlisted.rows.len(), snapshot.rows.len());

    let export = service.export(format)?;
    let path = output.unwrap_or_else(|| PathBuf::from(export.file_name));
    std::fs::write(&path, &export.bytes)?;
    println!(
        "Exported {} rows to {} ({})",
        shortlisted.rows.len(),
        path.display(),
        export.content_type
    );

    Ok(())
}

pub(crate) async fn run_slate(args: SlateArgs) -> Result<(), AppError> {
    let SlateArgs {
        file,
        with_scores,
        scoring_url,
    } = args;

    let config = load_config(scoring_url)?;
    let service = http_service(&config)?;

    let bytes = std::fs::read(&file)?;
    service.upload(&bytes, display_name(&file))?;
    if with_scores {
        service.score().await?;
    }
    let snapshot = service.select().await?;
    render_slate(&snapshot);

    Ok(())
}

fn display_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn render_ranking(snapshot: &SessionSnapshot) {
    println!(
        "Ranked {} candidates from {} ({})",
        snapshot.rows.len(),
        snapshot.file_name.as_deref().unwrap_or("upload"),
        snapshot.sort_label
    );
    println!(
        "\n{:>3}  {:<24} {:<32} {:<20} {:>6}",
        "#", "Name", "Email", "Top role", "Score"
    );
    for (rank, row) in snapshot.rows.iter().enumerate() {
        println!("{}", ranking_line(rank + 1, row));
    }
}

fn ranking_line(rank: usize, row: &RowView) -> String {
    format!(
        "{:>3}  {:<24} {:<32} {:<20} {:>6}",
        rank,
        row.name.as_deref().unwrap_or("—"),
        row.email,
        row.top_role,
        score_text(&row.top_score)
    )
}

fn render_slate(snapshot: &SessionSnapshot) {
    if snapshot.slate.is_empty() {
        println!("The selector returned no picks");
        return;
    }

    println!(
        "Slate of {} picks from {}",
        snapshot.slate.len(),
        snapshot.file_name.as_deref().unwrap_or("upload")
    );
    for card in &snapshot.slate {
        println!();
        for line in card_lines(card) {
            println!("{line}");
        }
    }
}

fn card_lines(card: &SlateCard) -> Vec<String> {
    let mut lines = vec![
        format!(
            "- {} <{}>",
            card.name.as_deref().unwrap_or("Unnamed candidate"),
            card.email
        ),
        format!("  {}", card.role_label()),
        format!(
            "  Location: {}  Salary: {}",
            card.location, card.salary_expectation
        ),
    ];
    if !card.skills.is_empty() {
        let mut skills = card.skills.join(", ");
        if card.more_skills > 0 {
            skills.push_str(&format!(" (+{} more)", card.more_skills));
        }
        lines.push(format!("  Skills: {skills}"));
    }
    lines
}

fn score_text(score: &Value) -> String {
    match score {
        Value::Null => "—".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
