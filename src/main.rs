use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use student_risk_engine::config::RiskModelConfig;
use student_risk_engine::model::{trainer, ModelKind};
use student_risk_engine::models::{StudentAssessment, StudentRecord, StudentSignals};
use student_risk_engine::{db, report, risk, roster, telemetry, tips};
use student_risk_engine::{AssessRequest, EngineConfig, RiskEngine};

#[derive(Parser)]
#[command(name = "student-risk")]
#[command(about = "Emotion-aware dropout risk assessment for students", long_about = None)]
struct Cli {
    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SignalArgs {
    #[arg(long)]
    cgpa: Option<f64>,
    #[arg(long)]
    attendance: Option<f64>,
    #[arg(long)]
    fee_pending: bool,
    #[arg(long)]
    mood: Option<f64>,
    #[arg(long)]
    activities: Option<f64>,
    #[arg(long)]
    semester: Option<i64>,
    /// Journal text to classify alongside the signals
    #[arg(long)]
    text: Option<String>,
}

impl SignalArgs {
    fn into_request(self) -> AssessRequest {
        AssessRequest {
            signals: StudentSignals {
                cgpa: self.cgpa,
                attendance_percentage: self.attendance,
                fee_pending: Some(self.fee_pending),
                mood_score: self.mood,
                activities_per_week: self.activities,
                semester: self.semester,
            },
            text: self.text,
            ..AssessRequest::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify the emotion in a piece of text
    Analyze {
        #[arg(long)]
        text: String,
    },
    /// Assess one student from a JSON request or flags
    Assess {
        /// JSON request file; `-` reads stdin
        #[arg(long, conflicts_with_all = ["cgpa", "attendance", "fee_pending", "mood", "activities", "semester", "text"])]
        input: Option<PathBuf>,
        #[command(flatten)]
        signals: SignalArgs,
    },
    /// Assess and rank every student in a roster CSV
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Rank students read from Postgres
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Score {
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 7)]
        since_days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report from a roster CSV or Postgres
    #[command(group(
        ArgGroup::new("scope")
            .args(["cohort", "email"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long)]
        cohort: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value_t = 7)]
        since_days: i64,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Train the risk model and write its parameters as JSON
    Train {
        #[arg(long, default_value = "risk-model.json")]
        out: PathBuf,
        #[arg(long)]
        kind: Option<ModelKind>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show which models are loaded
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let cli = Cli::parse();
    let config = EngineConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { text } => {
            let engine = ready_engine(config).await?;
            let result = engine.analyze_text(&text)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Assess { input, signals } => {
            let request = match input {
                Some(path) => read_request(&path)?,
                None => signals.into_request(),
            };
            let engine = ready_engine(config).await?;
            let assessment = engine.assess_request(request)?;
            let tips = tips::wellness_tips(&assessment);
            let output = json!({ "assessment": assessment, "tips": tips });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Batch { csv, limit } => {
            let students = roster::load_roster(&csv)?;
            let engine = ready_engine(config).await?;
            let ranked = assess_ranked(&engine, &students)?;
            print_ranking(&ranked, limit);
        }
        Commands::Score {
            cohort,
            email,
            since_days,
            limit,
        } => {
            let pool = connect().await?;
            let since_date = risk::cutoff_date(since_days);
            let students =
                db::fetch_student_records(&pool, since_date, cohort.as_deref(), email.as_deref())
                    .await?;
            let engine = ready_engine(config).await?;
            let ranked = assess_ranked(&engine, &students)?;
            print_ranking(&ranked, limit);
        }
        Commands::Report {
            csv,
            cohort,
            email,
            since_days,
            out,
        } => {
            let since_date = risk::cutoff_date(since_days);
            let students: Vec<StudentRecord> = match csv {
                Some(path) => roster::load_roster(&path)?
                    .into_iter()
                    .filter(|student| in_scope(student, cohort.as_deref(), email.as_deref()))
                    .collect(),
                None => {
                    let pool = connect().await?;
                    db::fetch_student_records(&pool, since_date, cohort.as_deref(), email.as_deref())
                        .await?
                }
            };
            let engine = ready_engine(config).await?;
            let ranked = assess_ranked(&engine, &students)?;
            let report = report::build_report(
                cohort.as_deref().or(email.as_deref()),
                since_days,
                since_date,
                &ranked,
            );
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Train { out, kind, seed } => train(config.risk_model, &out, kind, seed)?,
        Commands::Health => {
            let engine = ready_engine(config).await?;
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }
    }

    Ok(())
}

async fn ready_engine(config: EngineConfig) -> anyhow::Result<Arc<RiskEngine>> {
    let engine = Arc::new(RiskEngine::new(config));
    Arc::clone(&engine)
        .load_in_background()
        .await
        .context("model loading task failed")?;
    Ok(engine)
}

fn train(
    mut settings: RiskModelConfig,
    out: &std::path::Path,
    kind: Option<ModelKind>,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(kind) = kind {
        settings.kind = kind;
    }
    if let Some(seed) = seed {
        settings.seed = seed;
    }
    let params = trainer::train(&settings)?;
    std::fs::write(out, params.to_json()?)
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!(
        "Trained {} on {} samples (seed {}); parameters written to {}.",
        params.classifier.kind(),
        params.trained_on,
        params.seed,
        out.display()
    );
    Ok(())
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to read student records from Postgres")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_request(path: &std::path::Path) -> anyhow::Result<AssessRequest> {
    let raw = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read request from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request {}", path.display()))?
    };
    serde_json::from_str(&raw).context("request is not a valid assessment JSON object")
}

fn in_scope(student: &StudentRecord, cohort: Option<&str>, email: Option<&str>) -> bool {
    match (cohort, email) {
        (Some(cohort), _) => student.cohort == cohort,
        (None, Some(email)) => student.email.eq_ignore_ascii_case(email),
        (None, None) => true,
    }
}

fn assess_ranked(
    engine: &RiskEngine,
    students: &[StudentRecord],
) -> anyhow::Result<Vec<StudentAssessment>> {
    Ok(risk::rank_assessments(engine.assess_students(students)?))
}

fn print_ranking(ranked: &[StudentAssessment], limit: usize) {
    if ranked.is_empty() {
        println!("No students found.");
        return;
    }

    let counts = risk::category_counts(ranked);
    println!(
        "Assessed {} students: {} high, {} moderate, {} low.",
        ranked.len(),
        counts.high,
        counts.moderate,
        counts.low
    );
    println!("Top students by risk score:");
    for entry in ranked.iter().take(limit) {
        println!(
            "- {} ({}, {}) {} risk, score {:.2}",
            entry.full_name,
            entry.email,
            entry.cohort,
            entry.assessment.category,
            entry.assessment.risk_score
        );
    }
}
