#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use std::process;

use covid_risk::features::{Answer, Conditions, Gender, Selections, Symptoms, parse_age};
use covid_risk::form::Form;
use covid_risk::handle;
use covid_risk::model::{DEFAULT_MODEL_PATH, TrainedModel};
use covid_risk::panels;
use covid_risk::render::{Assessor, render_notice};

#[derive(Args)]
pub struct ModelArgs {
    /// Path to the classifier artifact (.toml)
    #[arg(long, default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,
}

#[derive(Args)]
pub struct AssessArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Age in years; values outside 0-120 are clamped
    #[arg(long, default_value = "30", value_parser = parse_age, allow_negative_numbers = true)]
    pub age: u8,

    /// Male or Female
    #[arg(long, default_value = "male")]
    pub gender: Gender,

    /// Body temperature above 38°C (100.4°F)
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub fever: Answer,

    /// Persistent dry or wet cough
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub cough: Answer,

    /// Difficulty breathing or feeling winded
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub short_breath: Answer,

    /// Sudden loss of taste or smell
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub loss_of_taste_smell: Answer,

    /// Unusual tiredness or exhaustion
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub fatigue: Answer,

    /// Persistent or severe headache
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub headache: Answer,

    /// Pain or irritation in throat
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub sore_throat: Answer,

    /// Feeling sick or vomiting
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub nausea: Answer,

    /// Pain or pressure in chest
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub chest_pain: Answer,

    /// Type 1 or Type 2 diabetes
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub diabetes: Answer,

    /// High blood pressure
    #[arg(long, default_value = "no", value_name = "YES|NO")]
    pub hypertension: Answer,

    /// Skip the review and disclaimer panels and print only the verdict
    #[arg(long)]
    pub no_panels: bool,
}

impl AssessArgs {
    fn selections(&self) -> Selections {
        Selections {
            age: self.age,
            gender: self.gender,
            symptoms: Symptoms {
                fever: self.fever,
                cough: self.cough,
                short_breath: self.short_breath,
                loss_of_taste_smell: self.loss_of_taste_smell,
                fatigue: self.fatigue,
                headache: self.headache,
                sore_throat: self.sore_throat,
                nausea: self.nausea,
                chest_pain: self.chest_pain,
            },
            conditions: Conditions {
                diabetes: self.diabetes,
                hypertension: self.hypertension,
            },
        }
    }
}

pub fn assess(args: AssessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let selections = args.selections();
    let model_handle = handle::global(&args.model.model);
    if let Some(e) = model_handle.load_error() {
        eprintln!("{e}");
    }

    if !args.no_panels {
        println!("{}", panels::review(&selections));
    }

    let mut assessor = Assessor::new(model_handle);
    let verdict = match assessor.assess(&selections.normalize()) {
        Ok(verdict) => verdict,
        Err(e) => {
            eprint!("{}", render_notice(&e));
            process::exit(1);
        }
    };
    print!("{verdict}");

    if !args.no_panels {
        println!("\n{}", panels::DISCLAIMER);
    }
    Ok(())
}

pub fn form(args: ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model_handle = handle::global(&args.model);
    let stdin = io::stdin();
    let assessments = Form::new(
        stdin.lock(),
        io::stdout().lock(),
        model_handle,
        args.model.display().to_string(),
    )
    .run()?;
    log::info!("Form session ended after {assessments} assessment(s)");
    Ok(())
}

pub fn inspect(args: ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("Loading model from: {}", args.model.display());
    let model = TrainedModel::load(&args.model)?;

    if let Some(description) = &model.description {
        println!("Description: {description}");
    }
    println!("Family: {:?}", model.family);
    println!("Features: {}", model.feature_names.join(", "));
    println!("Intercept: {}", model.intercept);
    if model.matches_canonical_order() {
        println!("Feature order matches the assessment form.");
        Ok(())
    } else {
        Err(Box::new(io::Error::new(
            io::ErrorKind::InvalidData,
            "model feature order does not match the assessment form; predictions will be refused",
        )))
    }
}

#[derive(Parser)]
#[command(
    name = "covid-risk",
    version,
    about = "Symptom-based COVID-19 risk assessment",
    long_about = "Collects demographic, symptom and pre-existing condition answers, feeds them \
                 to a pre-trained classifier and prints a risk verdict with advice. \
                 This is not a medical diagnosis."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess risk from answers given as flags
    #[command(about = "Assess risk from answers given as flags")]
    Assess(AssessArgs),

    /// Fill in the assessment form interactively
    #[command(about = "Fill in the assessment form interactively")]
    Form(ModelArgs),

    /// Show information about the tool, emergency contacts and resources
    #[command(about = "Show about, emergency contact and resource panels")]
    About(ModelArgs),

    /// Check a classifier artifact against the form's feature order
    #[command(about = "Describe a classifier artifact")]
    Inspect(ModelArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result = match command {
        Some(Commands::Assess(args)) => assess(args),
        Some(Commands::Form(args)) => form(args),
        Some(Commands::About(args)) => {
            println!("{}", panels::sidebar(&args.model.display().to_string()));
            Ok(())
        }
        Some(Commands::Inspect(args)) => inspect(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const WEEK: u64 = 7 * DAY;
    const YEAR: u64 = 365 * DAY;

    if seconds < MINUTE {
        format!("{seconds} seconds ago")
    } else if seconds < HOUR {
        format!("{:.1} minutes ago", seconds as f64 / MINUTE as f64)
    } else if seconds < DAY {
        format!("{:.1} hours ago", seconds as f64 / HOUR as f64)
    } else if seconds < WEEK {
        format!("{:.1} days ago", seconds as f64 / DAY as f64)
    } else if seconds < YEAR {
        format!("{:.1} weeks ago", seconds as f64 / WEEK as f64)
    } else {
        format!("{:.1} years ago", seconds as f64 / YEAR as f64)
    }
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let build_timestamp: u64 = env!("COVID_RISK_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("covid-risk {version}");

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}
