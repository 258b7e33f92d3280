//! Medflow CLI - health flows from the terminal

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use medflow_core::app::App;
use medflow_core::client::{
    ChannelNotifier, FormError, InvocationStatus, Notification, SubmitOutcome, SymptomLogForm,
    TermForm, COMMON_SYMPTOMS,
};
use medflow_core::config::MedflowConfig;
use medflow_core::flows::SpeechRequest;
use medflow_core::session::{FileSessionStore, Session};
use medflow_core::speech::decode_data_uri;

const DISCLAIMER: &str = "For Informational Purposes Only: This is not a medical diagnosis. Always consult with your healthcare provider.";

#[derive(Parser)]
#[command(name = "medflow")]
#[command(about = "AI health helper: term explanations, symptom logs, narration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to medflow.toml plus MEDFLOW_* env vars)
    #[arg(long, global = true, env = "MEDFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Explain a medical term in simple language
    Explain {
        /// The term to explain
        term: String,
    },
    /// Ask about several terms, one per line
    Chat,
    /// Log symptoms and get a summary to take to your doctor
    Analyze {
        /// Symptom id (repeatable): shortness-of-breath, chest-pain, dizziness, fatigue, swelling
        #[arg(long = "symptom", short = 's')]
        symptoms: Vec<String>,
        /// Free-text notes
        #[arg(long, short = 'n', default_value = "")]
        notes: String,
    },
    /// Narrate text as audio
    Speak {
        /// Text to narrate
        text: String,
        /// Write the audio to this file
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,
    },
    /// List registered flows with their schemas
    Flows,
    /// Session management
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Version information
    Version,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Sign in
    Login {
        /// Display name
        name: String,
    },
    /// Sign out
    Logout,
    /// Show who is signed in
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("medflow {}", env!("CARGO_PKG_VERSION"));
        println!("medflow-core {}", medflow_core::VERSION);
        return Ok(());
    }

    let config = match cli.config {
        Some(ref path) => MedflowConfig::from_file(path),
        None => MedflowConfig::load(),
    }
    .context("loading configuration")?;

    let session_path = config.session.resolved_path()?;
    let session = Arc::new(
        Session::open(Arc::new(FileSessionStore::new(session_path)))
            .await
            .context("opening session")?,
    );

    let (notifier, mut notices) = ChannelNotifier::channel();
    let app = App::from_config(config, session, Arc::new(notifier)).await?;

    match cli.command {
        Commands::Explain { term } => {
            explain(&app, &term, &mut notices).await?;
        }
        Commands::Chat => chat(&app, &mut notices).await?,
        Commands::Analyze { symptoms, notes } => {
            analyze(&app, &symptoms, &notes, &mut notices).await?
        }
        Commands::Speak { text, out } => speak(&app, &text, out, &mut notices).await?,
        Commands::Flows => {
            let flows = app.flows().registry().list();
            println!("{}", serde_json::to_string_pretty(&flows)?);
        }
        Commands::Session { command } => session_command(&app, command).await?,
        Commands::Version => {}
    }

    Ok(())
}

fn print_notices(notices: &mut UnboundedReceiver<Notification>) {
    while let Ok(notice) = notices.try_recv() {
        eprintln!("{}", notice);
    }
}

/// Returns false when the submission produced no explanation
async fn explain(
    app: &App,
    term: &str,
    notices: &mut UnboundedReceiver<Notification>,
) -> Result<bool> {
    let request = match TermForm::validate(term) {
        Ok(request) => request,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(false);
        }
    };

    let outcome = app.chatbot().submit(request).await?;
    print_notices(notices);

    if let SubmitOutcome::Succeeded(id) = outcome {
        let history = app.chatbot().history();
        let history = history.read().await;
        if let Some(result) = history.get(id).and_then(|r| r.result()) {
            println!("{}", result.explanation);
            return Ok(true);
        }
    }
    Ok(false)
}

async fn chat(app: &App, notices: &mut UnboundedReceiver<Notification>) -> Result<()> {
    println!("{}", TermForm::GREETING);
    println!("(empty line or Ctrl-D to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            break;
        }
        explain(app, &line, notices).await?;
        println!();
    }
    Ok(())
}

async fn analyze(
    app: &App,
    symptoms: &[String],
    notes: &str,
    notices: &mut UnboundedReceiver<Notification>,
) -> Result<()> {
    let request = match SymptomLogForm::validate(symptoms, notes) {
        Ok(request) => request,
        Err(FormError::Rejected(notice)) => bail!("{}", notice),
        Err(FormError::Field(message)) => {
            let ids: Vec<&str> = COMMON_SYMPTOMS.iter().map(|s| s.id).collect();
            bail!("{} Known symptoms: {}", message, ids.join(", "))
        }
    };

    let outcome = app.symptom_log().submit(request).await?;
    print_notices(notices);

    let history = app.symptom_log().history();
    let history = history.read().await;
    let Some(record) = history.get(outcome.id()) else {
        return Ok(());
    };

    println!("Symptom Log");
    println!("Logged on {}", record.logged_on());
    if !record.request().symptoms.is_empty() {
        println!("Selected Symptoms: {}", record.request().symptoms.join(", "));
    }
    if !record.request().notes.is_empty() {
        println!("Your Notes: \"{}\"", record.request().notes);
    }

    if let (InvocationStatus::Succeeded, Some(analysis)) = (record.status(), record.result()) {
        println!();
        println!("{}", DISCLAIMER);
        println!();
        println!("Summary");
        println!("  {}", analysis.summary);
        if !analysis.potential_triggers.is_empty() {
            println!("Potential Triggers");
            for trigger in &analysis.potential_triggers {
                println!("  - {}", trigger);
            }
        }
        if !analysis.questions_for_doctor.is_empty() {
            println!("Questions for Your Doctor");
            for question in &analysis.questions_for_doctor {
                println!("  - {}", question);
            }
        }
    }
    Ok(())
}

async fn speak(
    app: &App,
    text: &str,
    out: Option<PathBuf>,
    notices: &mut UnboundedReceiver<Notification>,
) -> Result<()> {
    let outcome = app.narration().submit(SpeechRequest::new(text)).await?;
    print_notices(notices);

    let SubmitOutcome::Succeeded(id) = outcome else {
        return Ok(());
    };
    let history = app.narration().history();
    let history = history.read().await;
    let Some(result) = history.get(id).and_then(|r| r.result()) else {
        return Ok(());
    };

    match out {
        Some(path) => {
            let audio = decode_data_uri(&result.media)
                .context("speech provider returned a non-base64 media reference")?;
            tokio::fs::write(&path, &audio.bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} bytes of {} to {}", audio.bytes.len(), audio.mime, path.display());
        }
        None => println!("Generated audio ({} character data URI)", result.media.len()),
    }
    Ok(())
}

async fn session_command(app: &App, command: SessionCommands) -> Result<()> {
    let session = app.session();
    match command {
        SessionCommands::Login { name } => {
            let state = session.login(&name).await?;
            println!("Signed in as {}", state.display_name);
        }
        SessionCommands::Logout => {
            session.logout().await?;
            println!("Signed out");
        }
        SessionCommands::Status => match session.current().await {
            Some(state) => println!(
                "Signed in as {} since {}",
                state.display_name,
                medflow_core::client::display_timestamp(
                    &state.logged_in_at.with_timezone(&chrono::Local)
                )
            ),
            None => println!("Not signed in"),
        },
    }
    Ok(())
}
