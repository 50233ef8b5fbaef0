use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Map, Value};

use crate::workflows::shortlist::{
    Candidate, CandidateScorer, Pick, RemoteCallError, ScoredCandidate, ShortlistService,
    ShortlistSession, SlateResponse, SlateSelector,
};

pub(super) fn candidate_record(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "location": "Berlin",
        "skills": ["Rust", "SQL"],
        "work_experiences": [{ "roleName": "Engineer", "companyName": "Acme" }],
        "annual_salary_expectation": { "full-time": "$100,000" }
    })
}

pub(super) fn roster_bytes() -> Vec<u8> {
    serde_json::to_vec(&json!([
        candidate_record("Ada", "ada@example.com"),
        candidate_record("Grace", "grace@example.com"),
        candidate_record("Linus", "linus@example.com"),
    ]))
    .expect("roster encodes")
}

pub(super) fn scores(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(role, score)| (role.to_string(), score.clone()))
        .collect()
}

/// Scores candidate `i` with `Engineer = base + i`, echoing the batch order.
pub(super) fn echo_scores(candidates: &[Candidate], base: i64) -> Vec<ScoredCandidate> {
    candidates
        .iter()
        .enumerate()
        .map(|(position, candidate)| ScoredCandidate {
            email: candidate.email.clone(),
            name: None,
            scores: scores(&[
                ("Engineer", json!(base + position as i64)),
                ("Designer", json!(1)),
            ]),
            factors: Map::new(),
        })
        .collect()
}

pub(super) fn pick(email: &str, role: &str) -> Pick {
    Pick {
        email: email.to_string(),
        name: None,
        role: role.to_string(),
        scores: scores(&[(role, json!(9))]),
        location: None,
    }
}

/// Session with the three-person roster loaded and scored (Engineer 5, 6, 7).
pub(super) fn scored_session() -> ShortlistSession {
    let mut session = ShortlistSession::new();
    session
        .upload(&roster_bytes(), Some("roster.json".to_string()))
        .expect("roster uploads");
    let ticket = session.begin_score().expect("score starts");
    let response = echo_scores(ticket.candidates(), 5);
    session
        .complete_score(ticket, Ok(response))
        .expect("scores apply");
    session
}

/// Scorer replaying scripted responses, then echoing once the script runs out.
#[derive(Default)]
pub(super) struct ScriptedScorer {
    script: Mutex<VecDeque<Result<Vec<ScoredCandidate>, RemoteCallError>>>,
    calls: Mutex<usize>,
}

impl ScriptedScorer {
    pub(super) fn then(self, response: Result<Vec<ScoredCandidate>, RemoteCallError>) -> Self {
        self.script
            .lock()
            .expect("script mutex")
            .push_back(response);
        self
    }

    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("calls mutex")
    }
}

#[async_trait]
impl CandidateScorer for ScriptedScorer {
    async fn score(&self, candidates: &[Candidate]) -> Result<Vec<ScoredCandidate>, RemoteCallError> {
        *self.calls.lock().expect("calls mutex") += 1;
        let next = self.script.lock().expect("script mutex").pop_front();
        next.unwrap_or_else(|| Ok(echo_scores(candidates, 5)))
    }
}

/// Selector picking the first two candidates of whatever batch it is sent.
#[derive(Default)]
pub(super) struct FirstTwoSelector;

#[async_trait]
impl SlateSelector for FirstTwoSelector {
    async fn select(&self, candidates: &[Candidate]) -> Result<SlateResponse, RemoteCallError> {
        Ok(SlateResponse {
            picks: candidates
                .iter()
                .take(2)
                .map(|candidate| pick(&candidate.email, "Engineer"))
                .collect(),
        })
    }
}

/// Counts a call and reports whether it is the first one.
fn first_call(calls: &Mutex<usize>) -> bool {
    let mut calls = calls.lock().expect("calls mutex");
    *calls += 1;
    *calls == 1
}

/// Scorer whose first call never answers; later calls echo the batch.
#[derive(Default)]
pub(super) struct StallOnceScorer {
    calls: Mutex<usize>,
}

impl StallOnceScorer {
    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("calls mutex")
    }
}

#[async_trait]
impl CandidateScorer for StallOnceScorer {
    async fn score(&self, candidates: &[Candidate]) -> Result<Vec<ScoredCandidate>, RemoteCallError> {
        if first_call(&self.calls) {
            std::future::pending::<()>().await;
        }
        Ok(echo_scores(candidates, 5))
    }
}

/// Selector whose first call never answers; later calls pick the first two candidates.
#[derive(Default)]
pub(super) struct StallOnceSelector {
    calls: Mutex<usize>,
}

impl StallOnceSelector {
    pub(super) fn calls(&self) -> usize {
        *self.calls.lock().expect("calls mutex")
    }
}

#[async_trait]
impl SlateSelector for StallOnceSelector {
    async fn select(&self, candidates: &[Candidate]) -> Result<SlateResponse, RemoteCallError> {
        if first_call(&self.calls) {
            std::future::pending::<()>().await;
        }
        FirstTwoSelector.select(candidates).await
    }
}

pub(super) struct DownSelector;

#[async_trait]
impl SlateSelector for DownSelector {
    async fn select(&self, _candidates: &[Candidate]) -> Result<SlateResponse, RemoteCallError> {
        Err(RemoteCallError::Status {
            status: 503,
            message: "selector offline".to_string(),
        })
    }
}

pub(super) fn build_service() -> (
    Arc<ShortlistService<ScriptedScorer, FirstTwoSelector>>,
    Arc<ScriptedScorer>,
) {
    let scorer = Arc::new(ScriptedScorer::default());
    let service = Arc::new(ShortlistService::new(
        scorer.clone(),
        Arc::new(FirstTwoSelector),
    ));
    (service, scorer)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
