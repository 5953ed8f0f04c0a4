//! Join per-team form back onto match rows
//!
//! Home and away snapshots are keyed separately by (date, team). A key that
//! occurs twice on the same side is reported instead of fanning out rows.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::appearance::TeamAppearance;
use super::rolling::FormSnapshot;
use crate::{FootyError, MatchRecord, Result, TeamId};

/// Form for both sides of one match (None = not enough history)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchForm {
    pub home: Option<FormSnapshot>,
    pub away: Option<FormSnapshot>,
}

type SideTable<'a> = HashMap<(NaiveDate, &'a TeamId), Option<FormSnapshot>>;

fn side_table<'a>(
    appearances: &'a [TeamAppearance],
    snapshots: &[Option<FormSnapshot>],
    is_home: bool,
) -> Result<SideTable<'a>> {
    let mut table = SideTable::with_capacity(appearances.len() / 2);

    for (appearance, snapshot) in appearances.iter().zip(snapshots) {
        if appearance.is_home != is_home {
            continue;
        }
        let key = (appearance.date, &appearance.team);
        if table.insert(key, *snapshot).is_some() {
            return Err(FootyError::JoinAmbiguity {
                date: appearance.date,
                team: appearance.team.to_string(),
                side: if is_home { "home" } else { "away" }.to_string(),
            });
        }
    }

    Ok(table)
}

/// Left-join home and away form onto the match table, one entry per match
pub fn reassemble(
    matches: &[MatchRecord],
    appearances: &[TeamAppearance],
    snapshots: &[Option<FormSnapshot>],
) -> Result<Vec<MatchForm>> {
    let home = side_table(appearances, snapshots, true)?;
    let away = side_table(appearances, snapshots, false)?;

    let forms = matches
        .iter()
        .map(|record| MatchForm {
            home: home
                .get(&(record.date, &record.home_team))
                .copied()
                .flatten(),
            away: away
                .get(&(record.date, &record.away_team))
                .copied()
                .flatten(),
        })
        .collect();

    Ok(forms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::appearance::expand;
    use crate::features::rolling::{compute_form, AppearanceIndex, BaseForm};
    use crate::features::schema::FeatureSchema;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn snapshot(points: u32) -> Option<FormSnapshot> {
        Some(FormSnapshot {
            base: BaseForm {
                points,
                goals_for: 1.0,
                goals_against: 1.0,
            },
            expected: None,
        })
    }

    #[test]
    fn test_each_match_gets_its_own_sides() {
        let matches = vec![
            MatchRecord::new(date(1), "A", "B", 1, 0),
            MatchRecord::new(date(1), "C", "D", 2, 2),
        ];
        let appearances = expand(&matches, FeatureSchema::Base).unwrap();
        let snapshots = vec![snapshot(1), snapshot(2), snapshot(3), None];

        let forms = reassemble(&matches, &appearances, &snapshots).unwrap();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].home.unwrap().base.points, 1);
        assert_eq!(forms[0].away.unwrap().base.points, 2);
        assert_eq!(forms[1].home.unwrap().base.points, 3);
        assert!(forms[1].away.is_none());
    }

    #[test]
    fn test_duplicate_home_fixture_is_ambiguous() {
        let matches = vec![
            MatchRecord::new(date(2), "A", "B", 1, 0),
            MatchRecord::new(date(2), "A", "C", 0, 0),
        ];
        let appearances = expand(&matches, FeatureSchema::Base).unwrap();
        let index = AppearanceIndex::build(appearances.clone());
        let snapshots = compute_form(&index, 5, FeatureSchema::Base);

        match reassemble(&matches, &appearances, &snapshots) {
            Err(FootyError::JoinAmbiguity { date: d, team, side }) => {
                assert_eq!(d, date(2));
                assert_eq!(team, "A");
                assert_eq!(side, "home");
            }
            other => panic!("expected join ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_away_fixture_is_ambiguous() {
        let matches = vec![
            MatchRecord::new(date(3), "B", "A", 1, 0),
            MatchRecord::new(date(3), "C", "A", 0, 0),
        ];
        let appearances = expand(&matches, FeatureSchema::Base).unwrap();
        let snapshots = vec![None; appearances.len()];
        let err = reassemble(&matches, &appearances, &snapshots).unwrap_err();
        assert!(matches!(err, FootyError::JoinAmbiguity { ref side, .. } if side == "away"));
    }

    #[test]
    fn test_home_and_away_same_day_is_not_ambiguous() {
        let matches = vec![
            MatchRecord::new(date(4), "A", "B", 1, 0),
            MatchRecord::new(date(4), "C", "A", 0, 0),
        ];
        let appearances = expand(&matches, FeatureSchema::Base).unwrap();
        let snapshots = vec![None; appearances.len()];
        assert!(reassemble(&matches, &appearances, &snapshots).is_ok());
    }
}
