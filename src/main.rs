// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use refine_rs::adk::error::RefineError;
use refine_rs::refine::config::Settings;
use refine_rs::refine::server;
use refine_rs::refine::workflow::builder::{GraphBuilder, RunOptions};
use refine_rs::refine::workflow::state::PipelineState;

const DEFAULT_QUESTION: &str =
    "Explain the concept of iterative refinement pipelines and their benefits for AI applications";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline once and print the result
    Run {
        /// Question to refine; read from stdin when omitted
        #[arg(short, long)]
        input: Option<String>,

        /// Number of continuation passes
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Also search, review and write the report
        #[arg(short, long)]
        extended: bool,
    },
    /// Check that the model endpoint is ready
    Check,
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
}

fn read_question() -> anyhow::Result<String> {
    println!("Please enter your question:");
    print!("> ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read question from stdin")?;

    let question = line.trim();
    if question.is_empty() {
        println!("Using default question: {}", DEFAULT_QUESTION);
        Ok(DEFAULT_QUESTION.to_string())
    } else {
        Ok(question.to_string())
    }
}

fn print_report(state: &PipelineState, extended: bool) {
    let rule = "=".repeat(60);
    println!("{}", rule);
    println!("Final results:");
    println!("  Total iterations: {}", state.iteration());
    println!("  Message count: {}", state.message_count());
    println!("  Final output:\n{}", state.processed_output());
    println!();

    println!("Conversation:");
    for (i, message) in state.messages().iter().enumerate() {
        println!("  {}. [{}]:", i + 1, message.role);
        println!("{}", "-".repeat(50));
        println!("{}", message.content);
        println!("{}", "-".repeat(50));
    }

    if extended {
        println!();
        println!("Review:");
        println!("{}", rule);
        println!("{}", state.reviewed_output());
        println!("{}", rule);

        if state.document_generated() {
            println!("Document written to {}", state.document_path());
        } else {
            println!("Documentation was not written");
        }
        if state.notification_sent() {
            println!("Notification sent");
        }
    }
}

async fn execute(args: Args) -> anyhow::Result<()> {
    let settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    let builder = GraphBuilder::from_settings(settings).context("invalid adapter settings")?;

    match args.command {
        Commands::Run {
            input,
            max_iterations,
            extended,
        } => {
            let question = match input {
                Some(q) if !q.trim().is_empty() => q,
                _ => read_question()?,
            };
            let options = RunOptions {
                max_iterations,
                extended: extended.then_some(true),
            };
            let extended = extended || builder.settings().workflow.extended;

            let state = builder.run_with(&question, &options).await?;
            print_report(&state, extended);
        }
        Commands::Check => {
            builder.check_ready().await?;
            println!("Model '{}' is ready", builder.settings().model.name);
        }
        Commands::Serve { port } => {
            server::serve(port, Arc::new(builder)).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match execute(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<RefineError>() {
                Some(RefineError::Precondition(_)) => {
                    eprintln!("Model endpoint unavailable: {:#}", e)
                }
                Some(RefineError::Executor { node, .. }) => {
                    eprintln!("Pipeline aborted in node '{}': {:#}", node, e)
                }
                _ => eprintln!("Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
