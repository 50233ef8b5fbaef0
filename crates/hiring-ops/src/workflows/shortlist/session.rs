use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::candidate::{parse_upload, Candidate, ValidationError};
use super::detail::{resolve_pick, SlateCard};
use super::export::{flatten_rows, ShortlistRecord};
use super::remote::RemoteCallError;
use super::scoring::{assemble_rows, Pick, RowId, ScoredCandidate, ScoredRow, SlateResponse};
use super::views::{RowView, SelectionSet, SelectionState, SortDirection, ViewMemo};

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Empty,
    Loaded,
    Scored,
    Shortlisted,
}

impl SessionPhase {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loaded => "loaded",
            Self::Scored => "scored",
            Self::Shortlisted => "shortlisted",
        }
    }

    fn has_rows(self) -> bool {
        matches!(self, Self::Scored | Self::Shortlisted)
    }
}

/// Remote action kinds; each has a single in-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightKind {
    Score,
    Select,
}

impl fmt::Display for FlightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Score => f.write_str("score"),
            Self::Select => f.write_str("select"),
        }
    }
}

/// Claim on an in-flight remote call. Carries the candidate batch the call was issued for
/// and the upload epoch it belongs to.
#[derive(Debug)]
pub struct FlightTicket {
    kind: FlightKind,
    sequence: u64,
    epoch: u64,
    candidates: Vec<Candidate>,
}

impl FlightTicket {
    pub fn kind(&self) -> FlightKind {
        self.kind
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Slot claim to hand back through [`ShortlistSession::abandon`] if the call never completes.
    pub fn claim(&self) -> FlightClaim {
        FlightClaim {
            kind: self.kind,
            sequence: self.sequence,
        }
    }
}

/// Copyable handle on the slot a [`FlightTicket`] occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightClaim {
    kind: FlightKind,
    sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    #[error("upload candidates before requesting a {0}")]
    NoCandidates(FlightKind),
    #[error("a {0} request is already in flight")]
    InFlight(FlightKind),
    #[error("score candidates before changing the selection")]
    NotScored,
    #[error("row {0} is not part of the current results")]
    UnknownRow(RowId),
    #[error("select at least one row before shortlisting")]
    EmptySelection,
    #[error("shortlist candidates before exporting")]
    NotShortlisted,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("discarded {0} response issued before the latest upload")]
    Stale(FlightKind),
}

/// In-memory state of one operator's shortlisting session.
///
/// Every mutation goes through a transition method and either applies fully or leaves the
/// session untouched.
#[derive(Debug, Default)]
pub struct ShortlistSession {
    phase: SessionPhase,
    file_name: Option<String>,
    raw_candidates: Vec<Candidate>,
    scored_rows: Vec<ScoredRow>,
    picks: Vec<Pick>,
    selection: SelectionSet,
    shortlisted: bool,
    sort_direction: SortDirection,
    scored_at: Option<DateTime<Utc>>,
    scores_stale: bool,
    epoch: u64,
    revision: u64,
    sequence: u64,
    score_flight: Option<u64>,
    select_flight: Option<u64>,
    memo: ViewMemo,
}

impl ShortlistSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode, validate, and load an uploaded file. Rejections leave the session as it was.
    pub fn upload(&mut self, bytes: &[u8], file_name: Option<String>) -> Result<usize, SessionError> {
        let candidates = parse_upload(bytes).map_err(|err| {
            warn!(file = file_name.as_deref().unwrap_or("-"), error = %err, "upload rejected");
            err
        })?;
        Ok(self.load_candidates(candidates, file_name))
    }

    /// Replace the candidate batch and discard everything derived from the previous one.
    pub fn load_candidates(&mut self, candidates: Vec<Candidate>, file_name: Option<String>) -> usize {
        let count = candidates.len();

        self.raw_candidates = candidates;
        self.file_name = file_name;
        self.scored_rows.clear();
        self.picks.clear();
        self.selection = SelectionSet::new();
        self.shortlisted = false;
        self.scored_at = None;
        self.scores_stale = false;
        self.score_flight = None;
        self.select_flight = None;
        self.epoch += 1;
        self.revision += 1;
        self.phase = SessionPhase::Loaded;

        info!(candidates = count, epoch = self.epoch, "candidate batch loaded");
        count
    }

    pub fn begin_score(&mut self) -> Result<FlightTicket, SessionError> {
        self.begin(FlightKind::Score)
    }

    pub fn begin_select(&mut self) -> Result<FlightTicket, SessionError> {
        self.begin(FlightKind::Select)
    }

    fn begin(&mut self, kind: FlightKind) -> Result<FlightTicket, SessionError> {
        if self.raw_candidates.is_empty() {
            return Err(PreconditionError::NoCandidates(kind).into());
        }
        if self.flight_slot(kind).is_some() {
            return Err(PreconditionError::InFlight(kind).into());
        }

        self.sequence += 1;
        let sequence = self.sequence;
        *self.flight_slot(kind) = Some(sequence);

        debug!(%kind, sequence, epoch = self.epoch, "remote call started");
        Ok(FlightTicket {
            kind,
            sequence,
            epoch: self.epoch,
            candidates: self.raw_candidates.clone(),
        })
    }

    fn flight_slot(&mut self, kind: FlightKind) -> &mut Option<u64> {
        match kind {
            FlightKind::Score => &mut self.score_flight,
            FlightKind::Select => &mut self.select_flight,
        }
    }

    /// Release the ticket's slot and reject it when a newer upload superseded it.
    fn land(&mut self, ticket: &FlightTicket) -> Result<(), SessionError> {
        let slot = self.flight_slot(ticket.kind);
        if *slot == Some(ticket.sequence) {
            *slot = None;
        }

        if ticket.epoch != self.epoch {
            warn!(kind = %ticket.kind, ticket_epoch = ticket.epoch, epoch = self.epoch, "stale response discarded");
            return Err(SessionError::Stale(ticket.kind));
        }
        Ok(())
    }

    /// Give up a claim whose response will never arrive. Returns whether the slot was freed;
    /// a slot already landed or re-claimed by a newer call is left alone.
    pub fn abandon(&mut self, claim: FlightClaim) -> bool {
        let slot = self.flight_slot(claim.kind);
        if *slot != Some(claim.sequence) {
            return false;
        }
        *slot = None;
        warn!(kind = %claim.kind, sequence = claim.sequence, "remote call abandoned");
        true
    }

    /// Apply a scorer response. On failure the previous rows stay but are marked stale.
    pub fn complete_score(
        &mut self,
        ticket: FlightTicket,
        response: Result<Vec<ScoredCandidate>, RemoteCallError>,
    ) -> Result<usize, SessionError> {
        self.land(&ticket)?;

        let rows = match response.and_then(|scored| assemble_rows(&ticket.candidates, scored)) {
            Ok(rows) => rows,
            Err(err) => {
                self.scores_stale = !self.scored_rows.is_empty();
                warn!(error = %err, stale = self.scores_stale, "scoring failed");
                return Err(err.into());
            }
        };

        let count = rows.len();
        self.scored_rows = rows;
        self.selection = SelectionSet::new();
        self.shortlisted = false;
        self.scored_at = Some(Utc::now());
        self.scores_stale = false;
        self.revision += 1;
        self.phase = SessionPhase::Scored;

        info!(rows = count, "scores applied");
        Ok(count)
    }

    /// Apply a selector response, replacing the previous slate.
    pub fn complete_select(
        &mut self,
        ticket: FlightTicket,
        response: Result<SlateResponse, RemoteCallError>,
    ) -> Result<usize, SessionError> {
        self.land(&ticket)?;

        let slate = response.map_err(|err| {
            warn!(error = %err, "slate selection failed");
            err
        })?;

        self.picks = slate.picks;
        info!(picks = self.picks.len(), "slate applied");
        Ok(self.picks.len())
    }

    pub fn toggle_selection(&mut self, id: &RowId) -> Result<SelectionState, SessionError> {
        self.require_rows()?;
        if !self.scored_rows.iter().any(|row| &row.id == id) {
            return Err(PreconditionError::UnknownRow(id.clone()).into());
        }

        self.selection = self.selection.toggled(id);
        Ok(self.selection_state())
    }

    pub fn toggle_select_all(&mut self) -> Result<SelectionState, SessionError> {
        self.require_rows()?;
        self.selection = self
            .selection
            .select_all_or_none(self.scored_rows.iter().map(|row| &row.id));
        Ok(self.selection_state())
    }

    fn require_rows(&self) -> Result<(), PreconditionError> {
        if self.phase.has_rows() {
            Ok(())
        } else {
            Err(PreconditionError::NotScored)
        }
    }

    /// Keep only the selected rows. Unselected rows are dropped for good.
    pub fn shortlist(&mut self) -> Result<usize, SessionError> {
        if self.selection.effective_count(&self.scored_rows) == 0 {
            return Err(PreconditionError::EmptySelection.into());
        }

        let before = self.scored_rows.len();
        let selection = std::mem::take(&mut self.selection);
        self.scored_rows.retain(|row| selection.contains(&row.id));
        self.shortlisted = true;
        self.revision += 1;
        self.phase = SessionPhase::Shortlisted;

        info!(kept = self.scored_rows.len(), dropped = before - self.scored_rows.len(), "shortlist applied");
        Ok(self.scored_rows.len())
    }

    /// Flattened report of the shortlisted rows.
    pub fn export_records(&self) -> Result<Vec<ShortlistRecord>, SessionError> {
        if !self.shortlisted {
            return Err(PreconditionError::NotShortlisted.into());
        }
        Ok(flatten_rows(&self.scored_rows))
    }

    pub fn toggle_sort(&mut self) -> SortDirection {
        self.sort_direction = self.sort_direction.flipped();
        self.sort_direction
    }

    pub fn set_sort(&mut self, direction: SortDirection) {
        self.sort_direction = direction;
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn raw_candidates(&self) -> &[Candidate] {
        &self.raw_candidates
    }

    pub fn scored_rows(&self) -> &[ScoredRow] {
        &self.scored_rows
    }

    pub fn picks(&self) -> &[Pick] {
        &self.picks
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_state(&self) -> SelectionState {
        self.selection.state_for(&self.scored_rows)
    }

    pub fn is_shortlisted(&self) -> bool {
        self.shortlisted
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn scores_stale(&self) -> bool {
        self.scores_stale
    }

    pub fn is_in_flight(&self, kind: FlightKind) -> bool {
        match kind {
            FlightKind::Score => self.score_flight.is_some(),
            FlightKind::Select => self.select_flight.is_some(),
        }
    }

    /// Rows in display order, memoized on (rows revision, direction).
    pub fn ordered_rows(&mut self) -> Vec<&ScoredRow> {
        let order = self
            .memo
            .order(self.revision, self.sort_direction, &self.scored_rows)
            .to_vec();
        order.into_iter().map(|index| &self.scored_rows[index]).collect()
    }

    pub fn row(&self, id: &RowId) -> Option<&ScoredRow> {
        self.scored_rows.iter().find(|row| &row.id == id)
    }

    /// Detail row for the pick with `email`, if the slate contains one.
    pub fn pick_detail(&self, email: &str) -> Option<Cow<'_, ScoredRow>> {
        self.picks
            .iter()
            .find(|pick| pick.email.eq_ignore_ascii_case(email))
            .map(|pick| resolve_pick(pick, &self.scored_rows))
    }

    pub fn snapshot(&mut self) -> SessionSnapshot {
        let rows: Vec<RowView> = {
            let selection = self.selection.clone();
            self.ordered_rows()
                .into_iter()
                .map(|row| RowView::new(row, &selection))
                .collect()
        };
        let slate = self
            .picks
            .iter()
            .map(|pick| SlateCard::new(pick, &self.scored_rows))
            .collect();
        let selected = self.selection.effective_count(&self.scored_rows);

        let mut pending = Vec::new();
        if self.score_flight.is_some() {
            pending.push(FlightKind::Score);
        }
        if self.select_flight.is_some() {
            pending.push(FlightKind::Select);
        }

        SessionSnapshot {
            phase: self.phase,
            file_name: self.file_name.clone(),
            candidate_count: self.raw_candidates.len(),
            rows,
            selection: SelectionSummary {
                selected,
                total: self.scored_rows.len(),
                state: self.selection_state(),
            },
            shortlisted: self.shortlisted,
            sort_direction: self.sort_direction,
            sort_label: self.sort_direction.label(),
            slate,
            scored_at: self.scored_at,
            scores_stale: self.scores_stale,
            pending,
            actions: AvailableActions {
                score: !self.raw_candidates.is_empty() && self.score_flight.is_none(),
                select: !self.raw_candidates.is_empty() && self.select_flight.is_none(),
                shortlist: selected > 0 && !self.shortlisted,
                export: self.shortlisted,
            },
        }
    }
}

/// Read model handed to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub file_name: Option<String>,
    pub candidate_count: usize,
    pub rows: Vec<RowView>,
    pub selection: SelectionSummary,
    pub shortlisted: bool,
    pub sort_direction: SortDirection,
    pub sort_label: &'static str,
    pub slate: Vec<SlateCard>,
    pub scored_at: Option<DateTime<Utc>>,
    pub scores_stale: bool,
    pub pending: Vec<FlightKind>,
    pub actions: AvailableActions,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SelectionSummary {
    pub selected: usize,
    pub total: usize,
    pub state: SelectionState,
}

/// Which triggers the dashboard should enable.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AvailableActions {
    pub score: bool,
    pub select: bool,
    pub shortlist: bool,
    pub export: bool,
}
