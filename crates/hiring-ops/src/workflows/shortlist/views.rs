use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::scoring::{RowId, ScoredRow};

/// Role reported when a row carries no scores.
pub const NO_ROLE: &str = "—";

/// Highest-scoring role of a row. `score` keeps the scorer's value for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRole {
    pub role: String,
    pub score: Value,
}

impl TopRole {
    fn sentinel() -> Self {
        Self {
            role: NO_ROLE.to_string(),
            score: Value::from(0),
        }
    }

    /// Score used for ordering; anything non-numeric counts as zero.
    pub fn rank(&self) -> f64 {
        numeric_score(&self.score).unwrap_or(0.0)
    }
}

/// Pick the role with the maximum numeric score. Ties keep the earliest entry; entries that
/// are not numbers never beat one that is.
pub fn top_role_and_score(row: &ScoredRow) -> TopRole {
    let mut best: Option<(&String, &Value, Option<f64>)> = None;

    for (role, score) in &row.scores {
        let numeric = numeric_score(score);
        let replace = match best {
            None => true,
            Some((_, _, current)) => match (numeric, current) {
                (Some(candidate), Some(current)) => candidate > current,
                (Some(_), None) => true,
                (None, _) => false,
            },
        };
        if replace {
            best = Some((role, score, numeric));
        }
    }

    best.map(|(role, score, _)| TopRole {
        role: role.clone(),
        score: score.clone(),
    })
    .unwrap_or_else(TopRole::sentinel)
}

pub(crate) fn numeric_score(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Ascending => "Low → High",
            Self::Descending => "High → Low",
        }
    }
}

/// Positions of `rows` in display order. The sort is stable, so equal top scores keep their
/// input order in both directions.
pub fn ordered_indices(rows: &[ScoredRow], direction: SortDirection) -> Vec<usize> {
    let mut ranked: Vec<(usize, f64)> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| (index, top_role_and_score(row).rank()))
        .collect();

    match direction {
        SortDirection::Ascending => ranked.sort_by(|a, b| a.1.total_cmp(&b.1)),
        SortDirection::Descending => ranked.sort_by(|a, b| b.1.total_cmp(&a.1)),
    }

    ranked.into_iter().map(|(index, _)| index).collect()
}

pub fn ordered_view(rows: &[ScoredRow], direction: SortDirection) -> Vec<&ScoredRow> {
    ordered_indices(rows, direction)
        .into_iter()
        .map(|index| &rows[index])
        .collect()
}

/// Caches the display order until the rows or the direction change.
#[derive(Debug, Default)]
pub(crate) struct ViewMemo {
    key: Option<(u64, SortDirection)>,
    order: Vec<usize>,
}

impl ViewMemo {
    pub(crate) fn order(
        &mut self,
        revision: u64,
        direction: SortDirection,
        rows: &[ScoredRow],
    ) -> &[usize] {
        if self.key != Some((revision, direction)) {
            self.order = ordered_indices(rows, direction);
            self.key = Some((revision, direction));
        }
        &self.order
    }

    #[cfg(test)]
    pub(crate) fn is_cached_for(&self, revision: u64, direction: SortDirection) -> bool {
        self.key == Some((revision, direction))
    }
}

/// Operator-checked row ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet(BTreeSet<RowId>);

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RowId> {
        self.0.iter()
    }

    /// Add `id` if absent, remove it if present.
    pub fn toggled(&self, id: &RowId) -> Self {
        let mut next = self.0.clone();
        if !next.remove(id) {
            next.insert(id.clone());
        }
        Self(next)
    }

    /// Empty when every id is already selected, otherwise exactly `all_ids`.
    pub fn select_all_or_none<'a, I>(&self, all_ids: I) -> Self
    where
        I: IntoIterator<Item = &'a RowId>,
    {
        let all: BTreeSet<RowId> = all_ids.into_iter().cloned().collect();
        if all.iter().all(|id| self.0.contains(id)) {
            Self::default()
        } else {
            Self(all)
        }
    }

    /// Selected ids that still name a row; orphans are ignored.
    pub fn effective_count(&self, rows: &[ScoredRow]) -> usize {
        rows.iter().filter(|row| self.0.contains(&row.id)).count()
    }

    pub fn state_for(&self, rows: &[ScoredRow]) -> SelectionState {
        SelectionState::from_counts(self.effective_count(rows), rows.len())
    }
}

impl FromIterator<RowId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = RowId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    None,
    Some,
    All,
}

impl SelectionState {
    pub fn from_counts(selected: usize, total: usize) -> Self {
        if total > 0 && selected == total {
            Self::All
        } else if selected > 0 && selected < total {
            Self::Some
        } else {
            Self::None
        }
    }

    pub fn is_all_selected(self) -> bool {
        self == Self::All
    }

    pub fn is_some_selected(self) -> bool {
        self == Self::Some
    }
}

/// One table line as rendered by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: RowId,
    pub name: Option<String>,
    pub email: String,
    pub top_role: String,
    pub top_score: Value,
    pub factors: Map<String, Value>,
    pub checked: bool,
}

impl RowView {
    pub fn new(row: &ScoredRow, selection: &SelectionSet) -> Self {
        let top = top_role_and_score(row);
        Self {
            id: row.id.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            factors: row.factors_for(&top.role),
            top_role: top.role,
            top_score: top.score,
            checked: selection.contains(&row.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn row(id: &str, scores: Value) -> ScoredRow {
        ScoredRow {
            id: RowId(id.to_string()),
            email: format!("{id}@example.com"),
            name: Some(id.to_uppercase()),
            scores: scores.as_object().cloned().unwrap_or_default(),
            factors: Map::new(),
            raw: json!({}),
        }
    }

    fn ids(rows: &[&ScoredRow]) -> Vec<String> {
        rows.iter().map(|row| row.id.0.clone()).collect()
    }

    #[test]
    fn top_role_picks_the_maximum() {
        let scored = row("a", json!({ "Eng": 5, "PM": 8 }));
        let top = top_role_and_score(&scored);
        assert_eq!(top.role, "PM");
        assert_eq!(top.score, json!(8));
    }

    #[test]
    fn top_role_of_empty_scores_is_the_sentinel() {
        let top = top_role_and_score(&row("a", json!({})));
        assert_eq!(top.role, NO_ROLE);
        assert_eq!(top.score, json!(0));
        assert_eq!(top.rank(), 0.0);
    }

    #[test]
    fn top_role_ties_keep_the_first_entry() {
        let top = top_role_and_score(&row("a", json!({ "Design": 6, "Data": 6, "Ops": 2 })));
        assert_eq!(top.role, "Design");
    }

    #[test]
    fn non_numeric_scores_lose_to_numbers_and_rank_as_zero() {
        let mixed = top_role_and_score(&row("a", json!({ "Eng": "n/a", "PM": 1 })));
        assert_eq!(mixed.role, "PM");

        let text_only = top_role_and_score(&row("b", json!({ "Eng": "n/a" })));
        assert_eq!(text_only.role, "Eng");
        assert_eq!(text_only.score, json!("n/a"));
        assert_eq!(text_only.rank(), 0.0);
    }

    #[test]
    fn ordered_view_sorts_by_top_score() {
        let rows = vec![
            row("low", json!({ "Eng": 2 })),
            row("high", json!({ "Eng": 9 })),
            row("mid", json!({ "PM": 5 })),
        ];

        assert_eq!(
            ids(&ordered_view(&rows, SortDirection::Descending)),
            vec!["high", "mid", "low"]
        );
        assert_eq!(
            ids(&ordered_view(&rows, SortDirection::Ascending)),
            vec!["low", "mid", "high"]
        );
    }

    #[test]
    fn ties_keep_input_order_in_both_directions() {
        let rows = vec![
            row("first", json!({ "Eng": 4 })),
            row("top", json!({ "Eng": 7 })),
            row("second", json!({ "PM": 4 })),
            row("third", json!({ "Ops": "4" })),
        ];

        assert_eq!(
            ids(&ordered_view(&rows, SortDirection::Descending)),
            vec!["top", "first", "second", "third"]
        );
        assert_eq!(
            ids(&ordered_view(&rows, SortDirection::Ascending)),
            vec!["first", "second", "third", "top"]
        );
    }

    #[test]
    fn flipping_direction_twice_restores_the_order() {
        let rows = vec![
            row("a", json!({ "Eng": 3 })),
            row("b", json!({ "Eng": 3 })),
            row("c", json!({ "Eng": 1 })),
        ];
        let direction = SortDirection::default();
        let before = ids(&ordered_view(&rows, direction));
        let after = ids(&ordered_view(&rows, direction.flipped().flipped()));
        assert_eq!(before, after);
    }

    #[test]
    fn select_all_promotes_partial_selection() {
        let all = [RowId("a".into()), RowId("b".into()), RowId("c".into())];
        let partial = SelectionSet::new().toggled(&all[0]);

        let promoted = partial.select_all_or_none(all.iter());
        assert_eq!(promoted.len(), 3);

        let cleared = promoted.select_all_or_none(all.iter());
        assert!(cleared.is_empty());

        let from_none = SelectionSet::new().select_all_or_none(all.iter());
        assert_eq!(from_none.len(), 3);
    }

    #[test]
    fn toggle_is_symmetric() {
        let id = RowId("a".into());
        let once = SelectionSet::new().toggled(&id);
        assert!(once.contains(&id));
        assert!(!once.toggled(&id).contains(&id));
    }

    #[test]
    fn selection_state_follows_cardinality() {
        assert_eq!(SelectionState::from_counts(0, 0), SelectionState::None);
        assert_eq!(SelectionState::from_counts(0, 3), SelectionState::None);
        assert_eq!(SelectionState::from_counts(2, 3), SelectionState::Some);
        assert_eq!(SelectionState::from_counts(3, 3), SelectionState::All);
        assert!(SelectionState::All.is_all_selected());
        assert!(SelectionState::Some.is_some_selected());
    }

    #[test]
    fn orphaned_ids_do_not_count() {
        let rows = vec![row("a", json!({})), row("b", json!({}))];
        let selection: SelectionSet =
            [RowId("a".into()), RowId("gone".into())].into_iter().collect();
        assert_eq!(selection.effective_count(&rows), 1);
        assert_eq!(selection.state_for(&rows), SelectionState::Some);
    }

    #[test]
    fn row_view_uses_top_role_factors() {
        let mut scored = row("a", json!({ "Eng": 5, "PM": 8 }));
        scored.factors = json!({ "Eng": { "x": 1 } })
            .as_object()
            .cloned()
            .expect("object");

        let view = RowView::new(&scored, &SelectionSet::new());
        assert_eq!(view.top_role, "PM");
        assert!(view.factors.is_empty());
        assert!(!view.checked);
    }

    #[test]
    fn memo_recomputes_only_on_key_change() {
        let rows = vec![row("a", json!({ "Eng": 1 })), row("b", json!({ "Eng": 2 }))];
        let mut memo = ViewMemo::default();

        assert_eq!(memo.order(1, SortDirection::Descending, &rows), &[1, 0]);
        assert!(memo.is_cached_for(1, SortDirection::Descending));
        assert_eq!(memo.order(1, SortDirection::Ascending, &rows), &[0, 1]);
        assert!(!memo.is_cached_for(1, SortDirection::Descending));
    }

    proptest! {
        #[test]
        fn ordered_view_is_a_stable_sort(scores in prop::collection::vec(0u8..4, 0..24)) {
            let rows: Vec<ScoredRow> = scores
                .iter()
                .enumerate()
                .map(|(index, score)| row(&format!("r{index}"), json!({ "Eng": score })))
                .collect();

            for direction in [SortDirection::Ascending, SortDirection::Descending] {
                let order = ordered_indices(&rows, direction);
                prop_assert_eq!(order.len(), rows.len());
                for pair in order.windows(2) {
                    let (left, right) = (scores[pair[0]], scores[pair[1]]);
                    match direction {
                        SortDirection::Ascending => prop_assert!(left <= right),
                        SortDirection::Descending => prop_assert!(left >= right),
                    }
                    if left == right {
                        prop_assert!(pair[0] < pair[1]);
                    }
                }
            }
        }
    }
}
