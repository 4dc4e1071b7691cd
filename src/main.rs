use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::{LevelFilter, info, warn};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use agentloop::domain::{IterationRecord, Session, SessionStatus};
use agentloop::interpret::ResponseInterpreter;
use agentloop::llm::{LlmClient, OllamaClient};
use agentloop::prompt::{CodePlanner, CommandPlanner, PhasePlanner};
use agentloop::report::ReportWriter;
use agentloop::runner::IterationController;
use agentloop::validation::ActionValidator;
use agentloop::workspace::{CodeWorkspace, CommandTestRunner, TestRunner};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn rust_log_set() -> bool {
    std::env::var_os("RUST_LOG").is_some()
}

fn setup_logging() -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agentloop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("agentloop.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if !rust_log_set() {
        // narrowed by set_max_level once the config is known
        builder.filter_level(LevelFilter::Trace);
    }
    builder.target(env_logger::Target::Pipe(target)).init();
    if !rust_log_set() {
        log::set_max_level(LevelFilter::Info);
    }

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn apply_log_level(config: &Config) {
    if rust_log_set() {
        return;
    }
    if let Some(level) = &config.log_level {
        match level.parse::<LevelFilter>() {
            Ok(filter) => log::set_max_level(filter),
            Err(_) => warn!("Ignoring unknown log level '{}'", level),
        }
    }
}

fn apply_overrides(cli: &Cli, config: &mut Config) {
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }
    if let Some(max_iterations) = cli.max_iterations {
        config.iteration.max_iterations = max_iterations;
    }
}

/// Ask on stdin for a value that was not given on the command line
fn prompt_line(question: &str) -> Result<String> {
    print!("{} ", question.bold());
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;

    let answer = line.trim().to_string();
    if answer.is_empty() {
        return Err(eyre!("A value is required"));
    }
    Ok(answer)
}

async fn connect(config: &Config) -> Result<OllamaClient> {
    println!("{}", "Looking for a reasoning service...".cyan());
    let client = OllamaClient::discover(&config.llm.hosts, config.ollama())
        .await
        .context("No reasoning service reachable")?;
    println!("{} {} ({})", "Connected:".green(), client.base_url(), client.model());
    Ok(client)
}

fn print_iteration(session: &Session, record: &IterationRecord) {
    let header = format!("[{}/{}] {}", record.index + 1, session.max_iterations, record.phase);

    if let Some(error) = &record.service_error {
        println!("{} {}", header.cyan(), error.red());
        return;
    }

    println!(
        "{} proposed {}, rejected {}, executed {} ({} ok)",
        header.cyan(),
        record.proposed,
        record.rejected,
        record.executed,
        record.succeeded
    );
    if let Some(passed) = record.tests_passed {
        let verdict = if passed { "passed".green() } else { "failed".red() };
        println!("  tests {}", verdict);
    }
    if let Some(line) = record.analysis.lines().find(|l| !l.trim().is_empty()) {
        println!("  {}", line.trim().dimmed());
    }
}

fn print_status(status: SessionStatus) {
    let text = status.to_string();
    let colored = match status {
        SessionStatus::Succeeded => text.green(),
        SessionStatus::StoppedByModel | SessionStatus::Exhausted => text.yellow(),
        SessionStatus::Failed => text.red(),
        SessionStatus::Running => text.normal(),
    };
    println!("{} {}", "Session:".bold(), colored);
}

/// Write the report, then turn the controller's verdict into the exit status
fn finish(outcome: agentloop::Result<SessionStatus>, session: &Session, model: &str, config: &Config) -> Result<()> {
    let writer = ReportWriter::new(&config.report.dir).with_output_clip(config.report.output_clip);
    match writer.write(session, model) {
        Ok(path) => println!("{} {}", "Report:".cyan(), path.display()),
        Err(e) => {
            warn!("Failed to write report: {}", e);
            eprintln!("{} {}", "Failed to write report:".red(), e);
        }
    }

    let status = outcome.context("Session aborted")?;
    print_status(status);
    if status == SessionStatus::Failed {
        return Err(eyre!("Session failed"));
    }
    Ok(())
}

async fn run_session<P: PhasePlanner>(
    controller: IterationController<OllamaClient, P>,
    mut session: Session,
    model: &str,
    config: &Config,
) -> Result<()> {
    let outcome = controller.run(&mut session).await;
    finish(outcome, &session, model, config)
}

async fn handle_develop_command(task: Option<String>, config: &Config) -> Result<()> {
    let task = match task {
        Some(task) => task,
        None => prompt_line("Enter the development task:")?,
    };
    info!("Develop: {}", task);

    let client = Arc::new(connect(config).await?);
    let model = client.model().to_string();

    let workspace = CodeWorkspace::with_files(&config.code.workspace, &config.code.solution_file, &config.code.tests_file);
    let tests: Arc<dyn TestRunner> = Arc::new(CommandTestRunner::new(workspace.root(), config.test_runner()));
    let planner = CodePlanner::new(config.code.language, &config.code.solution_file, &config.code.tests_file)?;
    let interpreter = ResponseInterpreter::new(ActionValidator::new(config.validator())).with_fallback(config.fallback());

    let controller = IterationController::new(client, planner, interpreter)
        .with_config(config.controller())
        .with_code_stage(workspace, tests)
        .with_observer(print_iteration);

    let session = Session::for_code(task, config.iteration.max_iterations);
    run_session(controller, session, &model, config).await
}

async fn handle_pentest_command(target: Option<String>, port: Option<u16>, config: &Config) -> Result<()> {
    let target = match target {
        Some(target) => target,
        None => prompt_line("Enter the target host:")?,
    };
    info!("Pentest: {} (port {:?})", target, port);

    let client = Arc::new(connect(config).await?);
    let model = client.model().to_string();

    let validator = ActionValidator::new(config.validator());
    let planner = CommandPlanner::new(validator.allowed_tools().to_vec())?;
    let controller = IterationController::new(client, planner, ResponseInterpreter::new(validator))
        .with_config(config.controller())
        .with_observer(print_iteration);

    let session = Session::for_commands(target, port, config.iteration.max_iterations);
    run_session(controller, session, &model, config).await
}

async fn handle_probe_command(config: &Config) -> Result<()> {
    let client = connect(config).await?;
    let tags = client.probe().await.context("Probe failed")?;
    if tags.models.is_empty() {
        println!("{}", "No models installed".yellow());
    }
    for model in &tags.models {
        let marker = if model.name == client.model() { "*".green() } else { " ".normal() };
        println!("{} {}", marker, model.name);
    }
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
        println!(
            "  model {}, {} iterations, tools: {}",
            config.llm.model,
            config.iteration.max_iterations,
            config.command.allowed_tools.join(", ")
        );
    }

    match &cli.command {
        Commands::Develop { task } => handle_develop_command(task.clone(), config).await,
        Commands::Pentest { target, port } => handle_pentest_command(target.clone(), *port, config).await,
        Commands::Probe => handle_probe_command(config).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logging first
    setup_logging().context("Failed to setup logging")?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    apply_log_level(&config);
    apply_overrides(&cli, &mut config);

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
