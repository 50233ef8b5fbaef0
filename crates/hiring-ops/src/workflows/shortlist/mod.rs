//! Candidate shortlisting session: upload validation, remote scoring and slate selection,
//! operator selection, destructive shortlisting, and tabular export.
//!
//! [`session::ShortlistSession`] is the synchronous state machine; [`service::ShortlistService`]
//! drives it from async callers and owns the remote collaborators.

pub mod candidate;
pub mod detail;
pub mod export;
pub mod remote;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod views;

#[cfg(test)]
mod tests;

pub use candidate::{parse_upload, validate_batch, Candidate, FieldIssue, ValidationError, WorkExperience};
pub use detail::{resolve_pick, DetailView, SlateCard};
pub use export::{flatten_rows, ExportError, ExportFormat, ShortlistExport, ShortlistRecord};
pub use remote::{CandidateScorer, HttpCandidateApi, RemoteCallError, SlateSelector};
pub use router::shortlist_router;
pub use scoring::{Pick, RowId, ScoredCandidate, ScoredRow, SlateResponse};
pub use service::{ShortlistService, ShortlistServiceError};
pub use session::{
    FlightClaim, FlightKind, FlightTicket, PreconditionError, SessionError, SessionPhase,
    SessionSnapshot, ShortlistSession,
};
pub use views::{
    ordered_view, top_role_and_score, RowView, SelectionSet, SelectionState, SortDirection,
    TopRole, NO_ROLE,
};
