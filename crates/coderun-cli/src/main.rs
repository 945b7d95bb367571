//! coderun CLI - Command line interface for the execution pipeline

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use coderun_core::client::Client;
use coderun_core::config::default_socket_path;
use coderun_core::language::LanguageInfo;
use coderun_core::{ExecutionConfig, ExecutionOutcome, ExecutionRequest, Executor, LanguageTable};

#[derive(Parser)]
#[command(name = "coderun")]
#[command(author, version, about = "Compile and run untrusted source code")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Submission {
    /// Language identifier, e.g. python or java
    language: String,

    /// Source file (or - for stdin)
    code: PathBuf,

    /// File fed to the program's standard input
    #[arg(long)]
    stdin_file: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run code in-process (no daemon)
    Run {
        #[command(flatten)]
        submission: Submission,

        /// Timeout in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,

        /// Memory limit in MB
        #[arg(short, long)]
        memory: Option<u64>,

        /// Maximum characters kept per output stream
        #[arg(long)]
        max_output: Option<usize>,
    },

    /// Run code through the daemon
    Exec {
        #[command(flatten)]
        submission: Submission,

        /// Socket path (defaults to CODERUN_SOCKET env var or /run/coderun/coderun.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// List supported languages
    Languages {
        /// Ask the daemon instead of the built-in table
        #[arg(short, long)]
        socket: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get daemon status
    Status {
        /// Socket path (defaults to CODERUN_SOCKET env var or /run/coderun/coderun.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },

    /// Ping the daemon
    Ping {
        /// Socket path (defaults to CODERUN_SOCKET env var or /run/coderun/coderun.sock)
        #[arg(short, long)]
        socket: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("coderun=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            submission,
            timeout_ms,
            memory,
            max_output,
        } => {
            let mut config = ExecutionConfig::default().with_env_overrides()?;
            if let Some(ms) = timeout_ms {
                config.timeout = std::time::Duration::from_millis(ms);
            }
            if let Some(mb) = memory {
                config.memory_limit = mb * 1024 * 1024;
            }
            if let Some(chars) = max_output {
                config.max_output_size = chars;
            }

            let request = submission.request()?;
            let outcome = Executor::new(config).execute(request).await;
            report(&outcome, submission.json)
        }

        Commands::Exec { submission, socket } => {
            let socket = socket.unwrap_or_else(default_socket_path);
            let request = submission.request()?;
            let outcome = connect(&socket).await?.execute(request).await?;
            report(&outcome, submission.json)
        }

        Commands::Languages { socket, json } => {
            let languages = match socket {
                Some(socket) => connect(&socket).await?.languages().await?,
                None => LanguageTable::builtin().languages(),
            };
            print_languages(&languages, json)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Status { socket } => {
            let socket = socket.unwrap_or_else(default_socket_path);
            let status = connect(&socket).await?.status().await?;
            println!(
                "capacity: {}\nactive: {}\ncompleted: {}",
                status.capacity, status.active, status.completed
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Ping { socket } => {
            let socket = socket.unwrap_or_else(default_socket_path);
            connect(&socket).await?.ping().await?;
            println!("pong");
            Ok(ExitCode::SUCCESS)
        }
    }
}

impl Submission {
    fn request(&self) -> Result<ExecutionRequest> {
        let code = read_input(&self.code)?;
        let mut request = ExecutionRequest::new(&self.language, code);
        if let Some(path) = &self.stdin_file {
            request = request.with_stdin(read_input(path)?);
        }
        Ok(request)
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("could not read standard input")?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("could not read {}", path.display()))
    }
}

async fn connect(socket: &Path) -> Result<Client> {
    Client::connect(socket)
        .await
        .with_context(|| format!("could not connect to daemon at {}", socket.display()))
}

fn report(outcome: &ExecutionOutcome, json: bool) -> Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(outcome.output.as_bytes())?;
        stdout.flush()?;

        let mut stderr = std::io::stderr().lock();
        if !outcome.error.is_empty() {
            stderr.write_all(outcome.error.as_bytes())?;
            if !outcome.error.ends_with('\n') {
                writeln!(stderr)?;
            }
        }
        writeln!(stderr, "[{} in {}ms]", outcome.status, outcome.execution_time_ms)?;
    }

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_languages(languages: &[LanguageInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(languages)?);
        return Ok(());
    }

    for lang in languages {
        println!("{:<12} {:<12} {}", lang.id, lang.name, lang.extension);
    }
    Ok(())
}
