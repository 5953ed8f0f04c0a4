//! Football match prediction CLI
//!
//! Rolling-form features from historical results, baseline classifiers and
//! single-fixture predictions.

use clap::{Parser, Subcommand};
use footy::model::ModelKind;
use footy::{Config, Result};

#[derive(Parser)]
#[command(name = "footy")]
#[command(about = "Football match outcome prediction from rolling team form", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Compute the feature table and write it as CSV
    Features {
        /// Output path (defaults to data.features_path)
        #[arg(short, long)]
        output: Option<String>,
        /// Ignore expected goals even when every match has them
        #[arg(long)]
        base_only: bool,
        /// Restrict to one season code, e.g. 2324
        #[arg(long)]
        season: Option<String>,
    },
    /// Show the league table
    Table {
        /// Season code, e.g. 2324
        #[arg(long)]
        season: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Fit on older matches, score on newer ones
    Evaluate {
        /// Classifier: empirical, form or market
        #[arg(long, default_value = "market")]
        model: ModelKind,
        /// Override evaluation.train_fraction
        #[arg(long)]
        train_fraction: Option<f64>,
        /// Ignore expected goals even when some matches have them
        #[arg(long)]
        base_only: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict a match outcome
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Decimal odds for home, draw and away
        #[arg(long, num_args = 3, value_names = ["HOME", "DRAW", "AWAY"])]
        odds: Option<Vec<f64>>,
        /// Classifier: empirical, form or market
        #[arg(long, default_value = "market")]
        model: ModelKind,
        /// Ignore expected goals even when some matches have them
        #[arg(long)]
        base_only: bool,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Download configured seasons and store them
    Sync {
        /// Download again even when a season is cached
        #[arg(long)]
        refresh: bool,
        /// Expected-goals CSV to merge before storing
        #[arg(long)]
        xg: Option<String>,
    },
    /// Import a local results CSV
    Import {
        /// Results file in football-data.co.uk layout
        file: String,
        /// Season code for files without a Season column
        #[arg(long)]
        season: Option<String>,
        /// Expected-goals CSV to merge before storing
        #[arg(long)]
        xg: Option<String>,
    },
    /// Show database status
    Status,
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync { refresh, xg } => commands::data_sync(&config, refresh, xg),
            DataCommands::Import { file, season, xg } => {
                commands::data_import(&config, &file, season, xg)
            }
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features {
            output,
            base_only,
            season,
        } => commands::features(&config, output, base_only, season),
        Commands::Table { season, format } => commands::table(&config, season, format),
        Commands::Evaluate {
            model,
            train_fraction,
            base_only,
            format,
        } => commands::evaluate(&config, model, train_fraction, base_only, format),
        Commands::Predict {
            home,
            away,
            odds,
            model,
            base_only,
            format,
        } => commands::predict(&config, &home, &away, odds, model, base_only, format),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use footy::data::{self, Database, SeasonDownloader};
    use footy::features::league_table::format_table;
    use footy::features::{compute_features_with_schema, league_table, FeatureSchema};
    use footy::predict::{format_prediction, Predictor};
    use footy::{FootyError, MatchOdds, MatchRecord};

    fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value).map_err(|e| FootyError::Parse(e.to_string()))
    }

    fn load_history(config: &Config) -> Result<Vec<MatchRecord>> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;
        if matches.is_empty() {
            return Err(FootyError::Config(
                "No matches in database. Run 'footy data sync' first.".to_string(),
            ));
        }
        Ok(matches)
    }

    /// Flag a store whose expected-goals coverage no longer spans every match
    fn report_coverage(db: &Database) -> Result<()> {
        let stats = db.get_stats()?;
        if stats.expected_goals_count > 0 && stats.expected_goals_count < stats.match_count {
            log::warn!(
                "Expected goals cover {} of {} stored matches; use --base-only to evaluate or predict",
                stats.expected_goals_count,
                stats.match_count
            );
        }
        Ok(())
    }

    fn merge_xg(config: &Config, matches: Vec<MatchRecord>, xg: Option<String>) -> Result<Vec<MatchRecord>> {
        match xg {
            Some(path) => {
                let options = data::csv_options(config);
                let rows = data::load_expected_goals(&path, &options.aliases)?;
                let before = matches.len();
                let merged = data::merge_expected_goals(matches, &rows)?;
                println!(
                    "Merged expected goals: kept {} of {} matches",
                    merged.len(),
                    before
                );
                Ok(merged)
            }
            None => Ok(matches),
        }
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.cache_dir)?;
        println!("Created {} directory", config.data.cache_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to set league, seasons and team aliases", config_path);
        println!("  2. Run 'footy data sync' to fetch match results");
        println!("  3. Run 'footy evaluate' to score the baselines");
        println!("  4. Run 'footy predict \"Team A\" \"Team B\"' to make predictions");

        Ok(())
    }

    pub fn data_sync(config: &Config, refresh: bool, xg: Option<String>) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        let downloader = SeasonDownloader::new(&config.source, &config.data.cache_dir)?;

        println!(
            "Syncing {} seasons of {} from {}...",
            config.source.seasons.len(),
            config.source.league,
            config.source.base_url
        );
        let matches = downloader.fetch_all(&config.source.seasons, &data::csv_options(config), refresh);
        println!("Fetched {} matches", matches.len());

        if matches.is_empty() {
            println!("No matches found. Check the league code and season list.");
            return Ok(());
        }

        let matches = merge_xg(config, matches, xg)?;
        let count = db.upsert_matches(&matches)?;
        println!("Stored {} matches in database", count);
        report_coverage(&db)
    }

    pub fn data_import(
        config: &Config,
        file: &str,
        season: Option<String>,
        xg: Option<String>,
    ) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;
        let options = data::CsvOptions {
            season,
            ..data::csv_options(config)
        };

        println!("Importing {}...", file);
        let matches = data::load_csv(file, &options)?;
        let matches = merge_xg(config, matches, xg)?;
        let count = db.upsert_matches(&matches)?;
        println!("Stored {} matches in database", count);
        report_coverage(&db)
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Matches:  {}", stats.match_count);
        println!("  With xG:  {}", stats.expected_goals_count);
        if !stats.seasons.is_empty() {
            println!("  Seasons:  {}", stats.seasons.join(", "));
        }
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features(
        config: &Config,
        output: Option<String>,
        base_only: bool,
        season: Option<String>,
    ) -> Result<()> {
        let matches = data::filter_season(load_history(config)?, season.as_deref());
        let schema = FeatureSchema::resolve(&matches, base_only)?;
        let table = compute_features_with_schema(&matches, schema)?;

        let path = output.unwrap_or_else(|| config.data.features_path.clone());
        table.write_csv(&path)?;

        println!("Feature table ({} schema)", table.schema);
        println!("  Input matches: {}", table.input_rows);
        println!("  Feature rows:  {}", table.len());
        println!("  Dropped:       {} (fewer than {} prior appearances)", table.dropped(), footy::FORM_WINDOW);
        println!("  Written to:    {}", path);
        Ok(())
    }

    pub fn table(config: &Config, season: Option<String>, format: OutputFormat) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let matches = match season.as_deref() {
            Some(season) => db.get_season_matches(season)?,
            None => db.get_all_matches()?,
        };
        let standings = league_table(&matches);

        match format {
            OutputFormat::Table => print!("{}", format_table(&standings)),
            OutputFormat::Json => println!("{}", to_json(&standings)?),
            OutputFormat::Csv => {
                println!("rank,team,played,won,drawn,lost,goals_for,goals_against,goal_difference,points");
                for (rank, s) in standings.iter().enumerate() {
                    println!(
                        "{},{},{},{},{},{},{},{},{},{}",
                        rank + 1,
                        s.team,
                        s.played,
                        s.won,
                        s.drawn,
                        s.lost,
                        s.goals_for,
                        s.goals_against,
                        s.goal_difference(),
                        s.points
                    );
                }
            }
        }
        Ok(())
    }

    pub fn evaluate(
        config: &Config,
        kind: ModelKind,
        train_fraction: Option<f64>,
        base_only: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let matches = load_history(config)?;
        let schema = FeatureSchema::resolve(&matches, base_only)?;
        let table = compute_features_with_schema(&matches, schema)?;
        println!(
            "Built {} feature rows from {} matches ({} schema)",
            table.len(),
            table.input_rows,
            table.schema
        );

        let mut model = kind.build();
        let fraction = train_fraction.unwrap_or(config.evaluation.train_fraction);
        let report = footy::evaluation::evaluate(model.as_mut(), &table, fraction, &config.betting)?;

        match format {
            OutputFormat::Table => println!("\n{}", report),
            OutputFormat::Json => println!("{}", to_json(&report)?),
            OutputFormat::Csv => {
                println!("model,train_rows,test_rows,accuracy,log_loss,macro_f1,bets,wins,final_bankroll,roi");
                println!(
                    "{},{},{},{:.4},{:.4},{:.4},{},{},{:.2},{:.4}",
                    report.model,
                    report.train_rows,
                    report.test_rows,
                    report.classification.accuracy(),
                    report.classification.log_loss,
                    report.classification.macro_f1(),
                    report.betting.bets_placed,
                    report.betting.bets_won,
                    report.betting.final_bankroll,
                    report.betting.roi()
                );
            }
        }
        Ok(())
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        odds: Option<Vec<f64>>,
        kind: ModelKind,
        base_only: bool,
        format: OutputFormat,
    ) -> Result<()> {
        let odds = match odds.as_deref() {
            Some(&[h, d, a]) => Some(MatchOdds::new(h, d, a)),
            Some(_) => {
                return Err(FootyError::Config(
                    "--odds takes exactly three values: HOME DRAW AWAY".to_string(),
                ))
            }
            None => None,
        };

        let matches = load_history(config)?;
        let schema = FeatureSchema::resolve(&matches, base_only)?;
        let predictor = Predictor::fit_with_schema(
            kind.build(),
            matches,
            schema,
            data::csv_options(config).aliases,
            config.prediction.clone(),
        )?;
        let prediction = predictor.predict(home, away, odds)?;

        match format {
            OutputFormat::Table => print!("{}", format_prediction(&prediction)),
            OutputFormat::Json => println!("{}", to_json(&prediction)?),
            OutputFormat::Csv => {
                println!("home,away,p_home,p_draw,p_away,prediction");
                println!(
                    "{},{},{:.3},{:.3},{:.3},{}",
                    prediction.home_team,
                    prediction.away_team,
                    prediction.probabilities.home_win,
                    prediction.probabilities.draw,
                    prediction.probabilities.away_win,
                    prediction.outcome.code()
                );
            }
        }
        Ok(())
    }
}
