//! Rolling form over each team's previous appearances
//!
//! Appearances live in a single arena; each team owns an ordered list of
//! arena indices. Walking that list with a sliding accumulator yields, for
//! every appearance, the aggregate of the W appearances strictly before it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use super::appearance::TeamAppearance;
use super::schema::FeatureSchema;
use crate::TeamId;

/// Fixed-capacity window over the most recent values
///
/// The sum is taken over the held values oldest first, so it matches a plain
/// sum over the same slice bit for bit.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        SlidingWindow {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Add a value, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.capacity > 0 && self.values.len() == self.capacity
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum() / self.values.len() as f64
        }
    }
}

/// Points and goals form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseForm {
    /// Sum of points over the window
    pub points: u32,
    /// Mean goals scored
    pub goals_for: f64,
    /// Mean goals conceded
    pub goals_against: f64,
}

impl BaseForm {
    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.points as f64, self.goals_for, self.goals_against]
    }
}

/// Expected-goals form (all means over the window)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedGoalsForm {
    pub xg_for: f64,
    pub xg_against: f64,
    pub perf_diff_for: f64,
    pub perf_diff_against: f64,
}

impl ExpectedGoalsForm {
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.xg_for,
            self.xg_against,
            self.perf_diff_for,
            self.perf_diff_against,
        ]
    }
}

/// Form of a team going into one appearance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub base: BaseForm,
    pub expected: Option<ExpectedGoalsForm>,
}

/// Per-statistic windows for one team
struct FormAccumulator {
    points: SlidingWindow,
    goals_for: SlidingWindow,
    goals_against: SlidingWindow,
    /// xg_for, xg_against, perf_diff_for, perf_diff_against
    expected: Option<[SlidingWindow; 4]>,
}

impl FormAccumulator {
    fn new(window: usize, schema: FeatureSchema) -> Self {
        FormAccumulator {
            points: SlidingWindow::new(window),
            goals_for: SlidingWindow::new(window),
            goals_against: SlidingWindow::new(window),
            expected: schema.is_extended().then(|| {
                [
                    SlidingWindow::new(window),
                    SlidingWindow::new(window),
                    SlidingWindow::new(window),
                    SlidingWindow::new(window),
                ]
            }),
        }
    }

    /// Aggregate of what has been pushed so far, once the window is full
    fn snapshot(&self) -> Option<FormSnapshot> {
        if !self.points.is_full() {
            return None;
        }

        let base = BaseForm {
            points: self.points.sum().round() as u32,
            goals_for: self.goals_for.mean(),
            goals_against: self.goals_against.mean(),
        };
        let expected = self.expected.as_ref().map(|[xg_for, xg_against, diff_for, diff_against]| {
            ExpectedGoalsForm {
                xg_for: xg_for.mean(),
                xg_against: xg_against.mean(),
                perf_diff_for: diff_for.mean(),
                perf_diff_against: diff_against.mean(),
            }
        });

        Some(FormSnapshot { base, expected })
    }

    fn push(&mut self, appearance: &TeamAppearance) {
        self.points.push(appearance.points as f64);
        self.goals_for.push(appearance.goals_for as f64);
        self.goals_against.push(appearance.goals_against as f64);

        if let (Some(windows), Some(xg)) = (self.expected.as_mut(), appearance.expected) {
            windows[0].push(xg.xg_for);
            windows[1].push(xg.xg_against);
            windows[2].push(xg.perf_diff_for);
            windows[3].push(xg.perf_diff_against);
        }
    }
}

/// Arena of appearances plus each team's chronological index list
pub struct AppearanceIndex {
    appearances: Vec<TeamAppearance>,
    by_team: HashMap<TeamId, Vec<usize>>,
}

impl AppearanceIndex {
    /// Group by team and order by date; same-date ties keep arena order
    pub fn build(appearances: Vec<TeamAppearance>) -> Self {
        let mut by_team: HashMap<TeamId, Vec<usize>> = HashMap::new();
        for (idx, appearance) in appearances.iter().enumerate() {
            by_team.entry(appearance.team.clone()).or_default().push(idx);
        }

        for indices in by_team.values_mut() {
            // Stable: equal dates keep their input order
            indices.sort_by_key(|&idx| appearances[idx].date);
        }

        AppearanceIndex {
            appearances,
            by_team,
        }
    }

    pub fn appearances(&self) -> &[TeamAppearance] {
        &self.appearances
    }

    /// Arena indices of a team's appearances, oldest first
    pub fn sequence(&self, team: &TeamId) -> &[usize] {
        self.by_team.get(team).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Teams in name order
    pub fn teams(&self) -> Vec<&TeamId> {
        let mut teams: Vec<_> = self.by_team.keys().collect();
        teams.sort();
        teams
    }

    /// Dates on which a team appears more than once
    pub fn same_day_appearances(&self, team: &TeamId) -> Vec<NaiveDate> {
        let dates: Vec<NaiveDate> = self
            .sequence(team)
            .iter()
            .map(|&idx| self.appearances[idx].date)
            .collect();
        let mut repeated: Vec<NaiveDate> = dates.windows(2).filter(|w| w[0] == w[1]).map(|w| w[0]).collect();
        repeated.dedup();
        repeated
    }
}

/// Form going into every appearance, aligned with the arena
///
/// Entry `i` only ever sees appearances that precede `i` in its team's
/// sequence. Teams with fewer than `window` earlier appearances get `None`.
pub fn compute_form(
    index: &AppearanceIndex,
    window: usize,
    schema: FeatureSchema,
) -> Vec<Option<FormSnapshot>> {
    let mut snapshots = vec![None; index.appearances.len()];

    for indices in index.by_team.values() {
        let mut accumulator = FormAccumulator::new(window, schema);
        for &idx in indices {
            let appearance = &index.appearances[idx];
            // Read before push: the current result never enters its own form
            snapshots[idx] = accumulator.snapshot();
            accumulator.push(appearance);
        }
    }

    let with_form = snapshots.iter().filter(|s| s.is_some()).count();
    log::debug!(
        "Rolling form: {} of {} appearances have {} prior appearances",
        with_form,
        snapshots.len(),
        window
    );

    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::appearance::expand;
    use crate::{MatchRecord, FORM_WINDOW};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    /// Team "A" plays a fresh opponent every day with the given scores
    fn run_for_a(scores: &[(u8, u8)]) -> Vec<MatchRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &(gf, ga))| MatchRecord::new(date(i as u32 + 1), "A", format!("Opp{}", i), gf, ga))
            .collect()
    }

    fn form_of_a(matches: &[MatchRecord]) -> Vec<Option<FormSnapshot>> {
        let index = AppearanceIndex::build(expand(matches, FeatureSchema::Base).unwrap());
        let snapshots = compute_form(&index, FORM_WINDOW, FeatureSchema::Base);
        index
            .sequence(&TeamId::from("A"))
            .iter()
            .map(|&idx| snapshots[idx])
            .collect()
    }

    #[test]
    fn test_sliding_window() {
        let mut window = SlidingWindow::new(3);
        assert!(window.is_empty());
        for v in [1.0, 2.0, 3.0] {
            window.push(v);
        }
        assert!(window.is_full());
        assert_eq!(window.sum(), 6.0);
        window.push(10.0);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 15.0);
        assert_eq!(window.mean(), 5.0);
    }

    #[test]
    fn test_window_mean_matches_plain_slice_mean() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin() * 2.1 + 0.13 * i as f64).collect();
        let mut window = SlidingWindow::new(FORM_WINDOW);
        for (i, &value) in values.iter().enumerate() {
            if i >= FORM_WINDOW {
                let slice = &values[i - FORM_WINDOW..i];
                let naive = slice.iter().sum::<f64>() / FORM_WINDOW as f64;
                assert_eq!(window.mean(), naive, "snapshot {}", i);
            }
            window.push(value);
        }
    }

    #[test]
    fn test_form_undefined_before_window_fills() {
        let matches = run_for_a(&[(1, 0); 7]);
        let form = form_of_a(&matches);
        assert_eq!(form.len(), 7);
        assert!(form[..FORM_WINDOW].iter().all(Option::is_none));
        assert!(form[FORM_WINDOW..].iter().all(Option::is_some));
    }

    #[test]
    fn test_window_uses_exactly_five_prior_appearances() {
        // Results: L L W W W W W, then a sixth win
        let scores = [(0, 1), (0, 1), (1, 0), (1, 0), (1, 0), (1, 0), (1, 0), (1, 0)];
        let form = form_of_a(&run_for_a(&scores));

        // Appearance 5 sees 0..5 -> 0 + 0 + 3 + 3 + 3
        assert_eq!(form[5].unwrap().base.points, 9);
        // Appearance 6 sees 1..6 -> 0 + 3 * 4
        assert_eq!(form[6].unwrap().base.points, 12);
        // Appearance 7 sees 2..7 -> 3 * 5
        assert_eq!(form[7].unwrap().base.points, 15);
    }

    #[test]
    fn test_goal_means() {
        let scores = [(1, 0), (2, 1), (3, 2), (0, 0), (4, 2), (9, 9)];
        let form = form_of_a(&run_for_a(&scores));
        let snapshot = form[5].unwrap().base;
        assert!((snapshot.goals_for - 2.0).abs() < 1e-12);
        assert!((snapshot.goals_against - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_own_result_never_leaks() {
        let mut matches = run_for_a(&[(2, 1); 8]);
        let before = form_of_a(&matches);

        // Flip appearance 6 from a win to a heavy loss
        matches[6] = MatchRecord::new(matches[6].date, "A", "Opp6", 0, 5);
        let after = form_of_a(&matches);

        assert_eq!(before[6], after[6]);
        assert_eq!(before[5], after[5]);
        assert_ne!(before[7], after[7]);
    }

    #[test]
    fn test_input_order_does_not_matter_across_dates() {
        let matches = run_for_a(&[(1, 0), (0, 0), (0, 2), (3, 1), (1, 1), (2, 0), (0, 1)]);
        let mut reversed = matches.clone();
        reversed.reverse();
        let forward: Vec<_> = form_of_a(&matches);
        let backward: Vec<_> = form_of_a(&reversed);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_same_day_tie_break_is_stable() {
        let mut matches = run_for_a(&[(1, 0); 5]);
        // Two fixtures for A on the same day: a loss listed first, then a win
        matches.push(MatchRecord::new(date(10), "A", "X", 0, 3));
        matches.push(MatchRecord::new(date(10), "A", "Y", 3, 0));

        let first = form_of_a(&matches);
        for _ in 0..5 {
            assert_eq!(form_of_a(&matches), first);
        }
        // The win listed second sees the loss listed first in its window
        assert_eq!(first[5].unwrap().base.points, 15);
        assert_eq!(first[6].unwrap().base.points, 12);

        let index = AppearanceIndex::build(expand(&matches, FeatureSchema::Base).unwrap());
        assert_eq!(index.same_day_appearances(&TeamId::from("A")), vec![date(10)]);
    }

    #[test]
    fn test_expected_goals_form_averages_differentials() {
        let matches: Vec<MatchRecord> = (0..6)
            .map(|i| {
                MatchRecord::new(date(i + 1), "A", format!("Opp{}", i), (i % 3) as u8, 1)
                    .with_expected_goals(0.5 * i as f64, 1.0)
            })
            .collect();
        let index = AppearanceIndex::build(expand(&matches, FeatureSchema::Extended).unwrap());
        let snapshots = compute_form(&index, FORM_WINDOW, FeatureSchema::Extended);
        let last = index.sequence(&TeamId::from("A"))[5];
        let xg = snapshots[last].unwrap().expected.unwrap();

        // Goals 0,1,2,0,1 and xG 0.0,0.5,1.0,1.5,2.0
        assert!((xg.xg_for - 1.0).abs() < 1e-9);
        assert!((xg.xg_against - 1.0).abs() < 1e-9);
        assert!((xg.perf_diff_for - (0.8 - 1.0)).abs() < 1e-9);
        assert!((xg.perf_diff_against - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_index_teams_in_name_order() {
        let matches = run_for_a(&[(1, 0), (1, 1)]);
        let index = AppearanceIndex::build(expand(&matches, FeatureSchema::Base).unwrap());
        let teams: Vec<&str> = index.teams().iter().map(|t| t.as_str()).collect();
        assert_eq!(teams, vec!["A", "Opp0", "Opp1"]);
        assert_eq!(index.sequence(&TeamId::from("A")).len(), 2);
        assert!(index.sequence(&TeamId::from("Nobody")).is_empty());
        assert!(index.same_day_appearances(&TeamId::from("A")).is_empty());
    }
}
