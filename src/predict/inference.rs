//! Single-fixture inference
//!
//! An upcoming fixture goes through the same pipeline as history: a
//! placeholder record is appended, features are recomputed, and the row built
//! from the placeholder is handed to the classifier. The placeholder's result
//! never reaches its own features, so its 0-0 score is irrelevant.

use chrono::{Duration, Local, NaiveDate};

use crate::data::TeamAliases;
use crate::features::{compute_features_with_schema, FeatureMatrix, FeatureSchema};
use crate::model::OutcomeClassifier;
use crate::{
    ExpectedGoals, FootyError, MatchOdds, MatchRecord, MatchResult, Prediction, PredictionConfig,
    Result, TeamId, FORM_WINDOW,
};

/// Predictor for upcoming matches
pub struct Predictor {
    model: Box<dyn OutcomeClassifier>,
    history: Vec<MatchRecord>,
    schema: FeatureSchema,
    aliases: TeamAliases,
    config: PredictionConfig,
}

impl Predictor {
    /// Fit `model` on every usable row of `history` and keep the history for inference
    pub fn fit(
        model: Box<dyn OutcomeClassifier>,
        history: Vec<MatchRecord>,
        aliases: TeamAliases,
        config: PredictionConfig,
    ) -> Result<Self> {
        let schema = FeatureSchema::detect(&history)?;
        Self::fit_with_schema(model, history, schema, aliases, config)
    }

    /// Fit under a fixed schema; `Base` ignores expected goals wherever present
    pub fn fit_with_schema(
        mut model: Box<dyn OutcomeClassifier>,
        history: Vec<MatchRecord>,
        schema: FeatureSchema,
        aliases: TeamAliases,
        config: PredictionConfig,
    ) -> Result<Self> {
        let table = compute_features_with_schema(&history, schema)?;
        let training = table.matrix(model.uses_odds());
        model.fit(&training.features, &training.labels)?;
        log::info!(
            "Fitted {} model on {} of {} matches ({} schema)",
            model.name(),
            training.len(),
            history.len(),
            schema
        );

        Ok(Predictor {
            model,
            history,
            schema,
            aliases,
            config,
        })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Predict a fixture by team name, using default odds when none are given
    pub fn predict(&self, home_team: &str, away_team: &str, odds: Option<MatchOdds>) -> Result<Prediction> {
        let home = self.resolve(home_team)?;
        let away = self.resolve(away_team)?;
        if home == away {
            return Err(FootyError::InvalidFixture(format!("{} cannot play itself", home)));
        }
        self.predict_teams(home, away, odds.unwrap_or(self.config.default_odds))
    }

    /// Predict a fixture between two canonical teams
    pub fn predict_teams(&self, home: TeamId, away: TeamId, odds: MatchOdds) -> Result<Prediction> {
        let fixture = self.placeholder(&home, &away, odds);
        let synthetic_index = self.history.len();

        let mut matches = self.history.clone();
        matches.push(fixture);
        let table = compute_features_with_schema(&matches, self.schema)?;

        let Some(row) = table.find_source(synthetic_index) else {
            return Err(self.insufficient_history(&home, &away));
        };

        let include_odds = self.model.uses_odds();
        let mut features = FeatureMatrix::new(table.feature_names(include_odds));
        let mut values = row.form.to_vec();
        if include_odds {
            values.extend([odds.home, odds.draw, odds.away]);
        }
        features.rows.push(values);

        let probabilities = self
            .model
            .predict_proba(&features)?
            .into_iter()
            .next()
            .ok_or_else(|| FootyError::Schema("classifier returned no prediction".into()))?;

        Ok(Prediction {
            home_team: home,
            away_team: away,
            outcome: probabilities.most_likely(),
            probabilities,
            odds,
        })
    }

    fn resolve(&self, name: &str) -> Result<TeamId> {
        let team = self.aliases.canonical(name);
        if self.history.iter().any(|m| m.involves(&team)) {
            Ok(team)
        } else {
            Err(FootyError::UnknownTeam(name.to_string()))
        }
    }

    /// The later of today and the day after the last known match
    fn fixture_date(&self) -> NaiveDate {
        let today = Local::now().date_naive();
        match self.history.iter().map(|m| m.date).max() {
            Some(latest) => today.max(latest + Duration::days(1)),
            None => today,
        }
    }

    fn placeholder(&self, home: &TeamId, away: &TeamId, odds: MatchOdds) -> MatchRecord {
        let mut fixture = MatchRecord::new(self.fixture_date(), home.as_str(), away.as_str(), 0, 0)
            .with_odds(odds);
        if self.schema.is_extended() {
            fixture.expected_goals = Some(ExpectedGoals {
                home: self.config.default_home_xg,
                away: self.config.default_away_xg,
            });
        }
        fixture
    }

    fn appearances(&self, team: &TeamId) -> usize {
        self.history.iter().filter(|m| m.involves(team)).count()
    }

    fn insufficient_history(&self, home: &TeamId, away: &TeamId) -> FootyError {
        let home_count = self.appearances(home);
        let away_count = self.appearances(away);
        let (team, appearances) = if home_count < FORM_WINDOW || away_count >= FORM_WINDOW {
            (home, home_count)
        } else {
            (away, away_count)
        };
        FootyError::InsufficientHistory {
            team: team.to_string(),
            appearances,
            required: FORM_WINDOW,
        }
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    let favourite = match pred.outcome {
        MatchResult::HomeWin => pred.home_team.as_str(),
        MatchResult::AwayWin => pred.away_team.as_str(),
        MatchResult::Draw => "Draw",
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  Home win:   {:>5.1}%   (odds {:.2})
│  Draw:       {:>5.1}%   (odds {:.2})
│  Away win:   {:>5.1}%   (odds {:.2})
│  Most likely: {} ({})
└─────────────────────────────────────────────────┘
"#,
        pred.home_team,
        pred.away_team,
        pred.probabilities.home_win * 100.0,
        pred.odds.home,
        pred.probabilities.draw * 100.0,
        pred.odds.draw,
        pred.probabilities.away_win * 100.0,
        pred.odds.away,
        pred.outcome,
        favourite
    )
}
