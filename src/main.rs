#![deny(missing_docs)]

//! Console front end for the disease predictor.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use prognos::config::{self, AppConfig};
use prognos::dataset;
use prognos::encode::PatientInput;
use prognos::logging;
use prognos::ml::forest::TrainOptions;
use prognos::predict::Predictor;
use prognos::session::PredictionSession;
use prognos::store::{PatientDatabase, PatientRecord};

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    let config = load_config(&cli)?;

    match cli.command {
        Command::Records => {
            let db = open_database(&config)?;
            let records = db.list_all().map_err(|err| err.to_string())?;
            print_records(&records, cli.json)
        }
        Command::Predict => {
            let session = start_session(&config)?;
            let stdin = std::io::stdin();
            let mut lines = stdin.lock().lines();
            run_prediction(&session, &mut lines)
        }
        Command::Interactive => {
            let session = start_session(&config)?;
            interactive_loop(&session)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Interactive,
    Predict,
    Records,
}

#[derive(Debug, Clone)]
struct CliOptions {
    command: Command,
    config_path: Option<PathBuf>,
    dataset: Option<PathBuf>,
    database: Option<PathBuf>,
    seed: Option<u64>,
    trees: Option<usize>,
    json: bool,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut command = Command::Interactive;
    let mut config_path: Option<PathBuf> = None;
    let mut dataset: Option<PathBuf> = None;
    let mut database: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;
    let mut trees: Option<usize> = None;
    let mut json = false;

    let mut idx = 0usize;
    match args.first().map(String::as_str) {
        Some("predict") => {
            command = Command::Predict;
            idx = 1;
        }
        Some("records") => {
            command = Command::Records;
            idx = 1;
        }
        _ => {}
    }

    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--dataset" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = Some(PathBuf::from(value));
            }
            "--db" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--db requires a value".to_string())?;
                database = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--seed requires a value".to_string())?;
                seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--trees" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--trees requires a value".to_string())?;
                trees = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --trees value: {value}"))?,
                );
            }
            "--json" => {
                json = true;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        command,
        config_path,
        dataset,
        database,
        seed,
        trees,
        json,
    })
}

fn help_text() -> String {
    [
        "prognos",
        "",
        "Predicts a disease from symptom answers and keeps every prediction in SQLite.",
        "",
        "Usage:",
        "  prognos [options]             Interactive prompt session",
        "  prognos predict [options]     Answer the questions once, then exit",
        "  prognos records [options]     Print stored predictions",
        "",
        "Options:",
        "  --config <file>    Config file to load instead of the default location.",
        "  --dataset <file>   Training dataset CSV (default: from config).",
        "  --db <file>        SQLite record store (default: from config).",
        "  --seed <u64>       Training seed override.",
        "  --trees <n>        Forest size override.",
        "  --json             Emit records as JSON, one object per line (records only).",
        "  -h, --help         Show this help.",
    ]
    .join("\n")
}

/// Load the config file and fold the command line overrides into it.
fn load_config(cli: &CliOptions) -> Result<AppConfig, String> {
    let mut config = match &cli.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;

    if let Some(dataset) = &cli.dataset {
        config.dataset = dataset.clone();
    }
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(seed) = cli.seed {
        config.training.seed = seed;
    }
    if let Some(trees) = cli.trees {
        config.training.trees = trees;
    }
    Ok(config)
}

fn open_database(config: &AppConfig) -> Result<PatientDatabase, String> {
    let path = config.database_path().map_err(|err| err.to_string())?;
    PatientDatabase::open(&path).map_err(|err| err.to_string())
}

/// Train the model and open the record store. Any failure here is fatal.
fn start_session(config: &AppConfig) -> Result<PredictionSession, String> {
    let dataset = dataset::load(&config.dataset).map_err(|err| err.to_string())?;
    let options = TrainOptions {
        trees: config.training.trees,
        max_depth: config.training.max_depth,
        min_samples_leaf: config.training.min_samples_leaf,
        seed: config.training.seed,
    };
    let predictor = Predictor::fit(&dataset, &options).map_err(|err| err.to_string())?;
    let db = open_database(config)?;
    Ok(PredictionSession::new(predictor, db))
}

fn interactive_loop(session: &PredictionSession) -> Result<(), String> {
    println!("Disease Predictor System");
    println!(
        "Model ready: {} known diseases, training accuracy {:.1}%",
        session.predictor().classes().len(),
        session.predictor().training_accuracy() * 100.0
    );
    println!("Commands: predict, records, help, quit");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        flush_stdout()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.map_err(|err| format!("Could not read input: {err}"))?;
        match line.trim() {
            "" => {}
            "predict" => {
                if let Err(err) = run_prediction(session, &mut lines) {
                    println!("Prediction failed: {err}");
                }
            }
            "records" => {
                match session.records() {
                    Ok(records) => print_records(&records, false)?,
                    Err(err) => println!("Could not list records: {err}"),
                }
            }
            "help" => println!("Commands: predict, records, help, quit"),
            "quit" | "exit" => break,
            unknown => println!("Unknown command: {unknown} (try help)"),
        }
    }
    Ok(())
}

/// Walk the patient through the questions, classify, persist on success.
fn run_prediction<I>(session: &PredictionSession, lines: &mut I) -> Result<(), String>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    println!("Please answer the following questions to predict the disease:");
    let input = prompt_patient(lines)?;
    let stored = session
        .predict_and_store(&input)
        .map_err(|err| err.to_string())?;
    println!("Predicted Disease: {}", stored.prediction.disease);
    println!(
        "Confidence: {:.0}% of trees agree",
        stored.prediction.confidence * 100.0
    );
    println!("Patient data has been saved to the database.");
    Ok(())
}

fn prompt_patient<I>(lines: &mut I) -> Result<PatientInput, String>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let fever = ask(lines, "Do you have fever? (Yes/No):")?;
    let cough = ask(lines, "Do you have a cough? (Yes/No):")?;
    let fatigue = ask(lines, "Do you experience fatigue? (Yes/No):")?;
    let difficulty_breathing = ask(lines, "Do you have difficulty breathing? (Yes/No):")?;
    let age_text = ask(lines, "Please enter your age:")?;
    let age: f64 = age_text
        .parse()
        .map_err(|_| format!("Invalid age: {age_text}"))?;
    let gender = ask(lines, "Please enter your gender (Male/Female):")?;
    let blood_pressure = ask(lines, "Please enter your blood pressure level (Low/Normal/High):")?;
    let cholesterol_level = ask(lines, "Please enter your cholesterol level (Normal/High):")?;

    Ok(PatientInput {
        fever,
        cough,
        fatigue,
        difficulty_breathing,
        age,
        gender,
        blood_pressure,
        cholesterol_level,
    })
}

fn ask<I>(lines: &mut I, prompt: &str) -> Result<String, String>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    print!("{prompt} ");
    flush_stdout()?;
    match lines.next() {
        Some(Ok(line)) => Ok(line.trim().to_string()),
        Some(Err(err)) => Err(format!("Could not read input: {err}")),
        None => Err("Input stream closed".to_string()),
    }
}

fn flush_stdout() -> Result<(), String> {
    std::io::stdout()
        .flush()
        .map_err(|err| format!("Could not write to stdout: {err}"))
}

fn print_records(records: &[PatientRecord], json: bool) -> Result<(), String> {
    if json {
        for record in records {
            let line = serde_json::to_string(record).map_err(|err| err.to_string())?;
            println!("{line}");
        }
        return Ok(());
    }
    if records.is_empty() {
        println!("No records stored yet.");
        return Ok(());
    }
    println!(
        "{:>4}  {:>5}  {:>5}  {:>7}  {:>20}  {:>5}  {:>6}  {:>14}  {:>17}  {}",
        "ID",
        "Fever",
        "Cough",
        "Fatigue",
        "Difficulty Breathing",
        "Age",
        "Gender",
        "Blood Pressure",
        "Cholesterol Level",
        "Disease"
    );
    for record in records {
        println!(
            "{:>4}  {:>5}  {:>5}  {:>7}  {:>20}  {:>5}  {:>6}  {:>14}  {:>17}  {}",
            record.id,
            record.fever,
            record.cough,
            record.fatigue,
            record.difficulty_breathing,
            record.age,
            record.gender,
            record.blood_pressure,
            record.cholesterol_level,
            record.disease
        );
    }
    Ok(())
}
