use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use super::detail::DetailView;
use super::export::{ExportError, ExportFormat, ShortlistExport};
use super::remote::{CandidateScorer, SlateSelector};
use super::scoring::RowId;
use super::session::{FlightClaim, SessionError, SessionSnapshot, ShortlistSession};
use super::views::SortDirection;

/// Service composing the session state machine with the remote scorer and selector.
///
/// The session lock is only held while a transition is applied; remote calls run unlocked
/// and are reconciled through their flight tickets.
pub struct ShortlistService<S, P> {
    session: Mutex<ShortlistSession>,
    scorer: Arc<S>,
    selector: Arc<P>,
    export_format: ExportFormat,
}

impl<S, P> ShortlistService<S, P>
where
    S: CandidateScorer + 'static,
    P: SlateSelector + 'static,
{
    pub fn new(scorer: Arc<S>, selector: Arc<P>) -> Self {
        Self {
            session: Mutex::new(ShortlistSession::new()),
            scorer,
            selector,
            export_format: ExportFormat::default(),
        }
    }

    pub fn with_export_format(mut self, format: ExportFormat) -> Self {
        self.export_format = format;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ShortlistSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn upload(
        &self,
        bytes: &[u8],
        file_name: Option<String>,
    ) -> Result<SessionSnapshot, ShortlistServiceError> {
        let mut session = self.lock();
        session.upload(bytes, file_name)?;
        Ok(session.snapshot())
    }

    /// Score every loaded candidate and replace the result rows.
    ///
    /// Dropping the returned future before the scorer answers releases the score slot.
    pub async fn score(&self) -> Result<SessionSnapshot, ShortlistServiceError> {
        let ticket = self.lock().begin_score()?;
        let guard = FlightGuard::new(&self.session, ticket.claim());
        let response = self.scorer.score(ticket.candidates()).await;
        guard.disarm();

        let mut session = self.lock();
        session.complete_score(ticket, response)?;
        Ok(session.snapshot())
    }

    /// Ask for a slate over every loaded candidate.
    pub async fn select(&self) -> Result<SessionSnapshot, ShortlistServiceError> {
        let ticket = self.lock().begin_select()?;
        let guard = FlightGuard::new(&self.session, ticket.claim());
        let response = self.selector.select(ticket.candidates()).await;
        guard.disarm();

        let mut session = self.lock();
        session.complete_select(ticket, response)?;
        Ok(session.snapshot())
    }

    pub fn toggle_selection(&self, id: &RowId) -> Result<SessionSnapshot, ShortlistServiceError> {
        let mut session = self.lock();
        session.toggle_selection(id)?;
        Ok(session.snapshot())
    }

    pub fn toggle_select_all(&self) -> Result<SessionSnapshot, ShortlistServiceError> {
        let mut session = self.lock();
        session.toggle_select_all()?;
        Ok(session.snapshot())
    }

    /// Set the sort direction, or flip it when none is given.
    pub fn sort(&self, direction: Option<SortDirection>) -> SessionSnapshot {
        let mut session = self.lock();
        match direction {
            Some(direction) => session.set_sort(direction),
            None => {
                session.toggle_sort();
            }
        }
        session.snapshot()
    }

    pub fn shortlist(&self) -> Result<SessionSnapshot, ShortlistServiceError> {
        let mut session = self.lock();
        session.shortlist()?;
        Ok(session.snapshot())
    }

    /// Encode the shortlisted rows; `format` falls back to the configured default.
    pub fn export(
        &self,
        format: Option<ExportFormat>,
    ) -> Result<ShortlistExport, ShortlistServiceError> {
        let records = self.lock().export_records()?;
        let export = ShortlistExport::encode(&records, format.unwrap_or(self.export_format))?;
        info!(
            rows = records.len(),
            file = export.file_name,
            bytes = export.bytes.len(),
            "shortlist exported"
        );
        Ok(export)
    }

    pub fn row_detail(&self, id: &RowId) -> Option<DetailView> {
        self.lock().row(id).map(DetailView::from_row)
    }

    pub fn pick_detail(&self, email: &str) -> Option<DetailView> {
        self.lock()
            .pick_detail(email)
            .map(|row| DetailView::from_row(&row))
    }
}

/// Hands a claimed slot back to the session unless the remote call ran to completion.
struct FlightGuard<'a> {
    session: &'a Mutex<ShortlistSession>,
    claim: Option<FlightClaim>,
}

impl<'a> FlightGuard<'a> {
    fn new(session: &'a Mutex<ShortlistSession>, claim: FlightClaim) -> Self {
        Self {
            session,
            claim: Some(claim),
        }
    }

    fn disarm(mut self) {
        self.claim = None;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(claim) = self.claim.take() {
            self.session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .abandon(claim);
        }
    }
}

/// Error raised by the shortlist service.
#[derive(Debug, thiserror::Error)]
pub enum ShortlistServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
