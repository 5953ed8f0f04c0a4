//! League standings from match results

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{MatchRecord, MatchResult, TeamId};

/// One line of a league table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl Standing {
    fn new(team: TeamId) -> Self {
        Standing {
            team,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for as i32 - self.goals_against as i32
    }

    fn record(&mut self, goals_for: u8, goals_against: u8, result: MatchResult, is_home: bool) {
        self.played += 1;
        self.goals_for += goals_for as u32;
        self.goals_against += goals_against as u32;
        let points = result.points(is_home);
        match points {
            3 => self.won += 1,
            1 => self.drawn += 1,
            _ => self.lost += 1,
        }
        self.points += points as u32;
    }
}

/// Standings ordered by points, goal difference, goals scored, then name
pub fn league_table(matches: &[MatchRecord]) -> Vec<Standing> {
    let mut table: HashMap<&TeamId, Standing> = HashMap::new();

    for m in matches {
        table
            .entry(&m.home_team)
            .or_insert_with(|| Standing::new(m.home_team.clone()))
            .record(m.home_goals, m.away_goals, m.result, true);
        table
            .entry(&m.away_team)
            .or_insert_with(|| Standing::new(m.away_team.clone()))
            .record(m.away_goals, m.home_goals, m.result, false);
    }

    let mut standings: Vec<Standing> = table.into_values().collect();
    standings.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference().cmp(&a.goal_difference()))
            .then(b.goals_for.cmp(&a.goals_for))
            .then(a.team.cmp(&b.team))
    });
    standings
}

/// Render standings as a fixed-width text table
pub fn format_table(standings: &[Standing]) -> String {
    let mut out = format!(
        "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>4} {:>4}\n",
        "#", "Team", "P", "W", "D", "L", "GF", "GA", "GD", "Pts"
    );
    for (rank, s) in standings.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:<20} {:>3} {:>3} {:>3} {:>3} {:>4} {:>4} {:>+4} {:>4}\n",
            rank + 1,
            s.team.as_str(),
            s.played,
            s.won,
            s.drawn,
            s.lost,
            s.goals_for,
            s.goals_against,
            s.goal_difference(),
            s.points
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    #[test]
    fn test_league_table_totals() {
        let matches = vec![
            MatchRecord::new(date(1), "Arsenal", "Chelsea", 2, 0),
            MatchRecord::new(date(2), "Chelsea", "Spurs", 1, 1),
            MatchRecord::new(date(3), "Spurs", "Arsenal", 3, 1),
        ];
        let table = league_table(&matches);
        assert_eq!(table.len(), 3);

        let spurs = table.iter().find(|s| s.team.as_str() == "Spurs").unwrap();
        assert_eq!((spurs.played, spurs.won, spurs.drawn, spurs.lost), (2, 1, 1, 0));
        assert_eq!(spurs.points, 4);
        assert_eq!(spurs.goal_difference(), 2);

        let chelsea = table.iter().find(|s| s.team.as_str() == "Chelsea").unwrap();
        assert_eq!(chelsea.points, 1);
        assert_eq!(chelsea.goal_difference(), -2);
    }

    #[test]
    fn test_ordering_tiebreaks() {
        // Arsenal and Spurs both on 3 points; Arsenal has the better goal difference
        let matches = vec![
            MatchRecord::new(date(1), "Arsenal", "Chelsea", 4, 0),
            MatchRecord::new(date(1), "Spurs", "Everton", 1, 0),
        ];
        let table = league_table(&matches);
        let order: Vec<&str> = table.iter().map(|s| s.team.as_str()).collect();
        assert_eq!(order, vec!["Arsenal", "Spurs", "Everton", "Chelsea"]);
    }

    #[test]
    fn test_format_table() {
        let matches = vec![MatchRecord::new(date(1), "Arsenal", "Chelsea", 2, 0)];
        let text = format_table(&league_table(&matches));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Arsenal"));
        assert!(lines[1].contains("+2"));
    }
}
