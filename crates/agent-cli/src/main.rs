//! Command-line interface for the remote code interpreter
//!
//! # Usage
//!
//! ```bash
//! export THIRI_API_KEY="..."
//!
//! # Run a script and fetch the chart it writes
//! cargo run -p agent-cli -- run plot.py --download output.png
//!
//! # Inline code
//! cargo run -p agent-cli -- run --code 'print(1 + 1)'
//!
//! # Interactive session
//! cargo run -p agent-cli -- repl
//!
//! # Tool definitions as exposed to a model
//! cargo run -p agent-cli -- tools
//! ```

use agent_interpreter::{CodeInterpreter, InterpreterConfig};
use agent_utils::LogFormat;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "agent-cli")]
#[command(about = "Run Python in a remote sandbox", long_about = None)]
struct Args {
    /// Sandbox service base URL (overrides THIRI_API_BASE)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Seconds to wait for execution output (overrides THIRI_OUTPUT_TIMEOUT_SECS)
    #[arg(long, global = true, value_name = "SECS")]
    output_timeout: Option<u64>,

    /// Directory downloaded files are written to (overrides THIRI_DOWNLOAD_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a Python file or inline code
    Run {
        /// Python file to run
        #[arg(required_unless_present = "code", conflicts_with = "code")]
        file: Option<PathBuf>,

        /// Inline Python code
        #[arg(short, long)]
        code: Option<String>,

        /// Sandbox path to download after the run (repeatable)
        #[arg(short, long = "download", value_name = "PATH")]
        downloads: Vec<String>,
    },
    /// Interactive session; a blank line submits the buffered code
    Repl,
    /// Print the tool definitions as JSON
    Tools,
}

impl Args {
    fn config(&self) -> anyhow::Result<InterpreterConfig> {
        let mut config = InterpreterConfig::from_env()?;

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = self.output_timeout {
            config.output_timeout = Duration::from_secs(secs);
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir.clone_from(dir);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    agent_utils::init_tracing_with("warn,agent_interpreter=info", format);

    // Tool schemas are static; listing them needs no credentials.
    if matches!(args.command, Command::Tools) {
        println!("{}", tool_definitions_json()?);
        return Ok(());
    }

    let interpreter = CodeInterpreter::new(args.config()?)?;
    info!(base_url = %interpreter.client().config().base_url, "Starting agent-cli");

    match args.command {
        Command::Run {
            file,
            code,
            downloads,
        } => {
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(file)) => tokio::fs::read_to_string(&file)
                    .await
                    .with_context(|| format!("Failed to read {}", file.display()))?,
                (None, None) => anyhow::bail!("Either a file or --code is required"),
            };
            run(&interpreter, &code, &downloads).await;
        }
        Command::Repl => repl(&interpreter, BufReader::new(tokio::io::stdin())).await?,
        Command::Tools => println!("{}", tool_definitions_json()?),
    }

    Ok(())
}

fn tool_definitions_json() -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(
        &agent_interpreter::tools::definitions(),
    )?)
}

async fn run(interpreter: &CodeInterpreter, code: &str, downloads: &[String]) {
    println!("{}", interpreter.run_python_code(code).await);
    for path in downloads {
        println!("{}", interpreter.download_file_from_sandbox(path).await);
    }
}

fn print_help() {
    println!("Enter Python code; a blank line runs it.");
    println!("  /download <path>  - fetch a file from the last run");
    println!("  /artifacts        - list downloaded images");
    println!("  /history          - list remembered executions");
    println!("  /help             - show this help");
    println!("  /exit             - quit");
}

async fn print_history(interpreter: &CodeInterpreter) {
    for id in interpreter.execution_ids().await {
        if let Some(execution) = interpreter.execution(&id).await {
            println!(
                "{}  {}  {:?}",
                execution.id(),
                execution.created_at().format("%H:%M:%S"),
                execution.status()
            );
        }
    }
}

async fn repl<R>(interpreter: &CodeInterpreter, input: R) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    print_help();

    let mut lines = input.lines();
    let mut stdout = tokio::io::stdout();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { ">>> " } else { "... " };
        stdout.write_all(prompt.as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            if !buffer.is_empty() {
                println!("{}", interpreter.run_python_code(&buffer).await);
            }
            println!();
            break;
        };
        let line = line.trim_end_matches('\r');

        if buffer.is_empty() {
            match line.split_once(' ').unwrap_or((line, "")) {
                ("/exit" | "/quit", _) => break,
                ("/help", _) => {
                    print_help();
                    continue;
                }
                ("/artifacts", _) => {
                    for image in interpreter.artifacts().images() {
                        println!("{}  {}  {}", image.id, image.mime_type, image.original_prompt);
                    }
                    continue;
                }
                ("/history", _) => {
                    print_history(interpreter).await;
                    continue;
                }
                ("/download", path) if !path.trim().is_empty() => {
                    println!(
                        "{}",
                        interpreter.download_file_from_sandbox(path.trim()).await
                    );
                    continue;
                }
                ("/download", _) => {
                    println!("Usage: /download <path>");
                    continue;
                }
                ("", _) => continue,
                _ => {}
            }
        }

        if line.is_empty() {
            let code = std::mem::take(&mut buffer);
            println!("{}", interpreter.run_python_code(&code).await);
        } else {
            buffer.push_str(line);
            buffer.push('\n');
        }
    }

    Ok(())
}
