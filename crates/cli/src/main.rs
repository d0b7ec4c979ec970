//! taskmill CLI - run demo tasks, workflows and processes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use taskmill_channel::{AsyncResultChannelSinkLocator, InMemoryAsyncResultChannel, ResultWaiter};
use taskmill_continuation::demo::{Chaos, ThreeStepWorkflow};
use taskmill_continuation::ContinuationFactory;
use taskmill_core::{AsyncResult, UniqueId};
use taskmill_execution::demo::register_demo_tasks;
use taskmill_execution::{ExecutionContextBuilder, RuntimeConfig, TaskClient, TaskDependencies, TaskFactory};
use taskmill_process::ProcessCommand;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskmill")]
#[command(about = "Run tasks, resumable workflows and processes", long_about = None)]
struct Cli {
    /// JSON runtime config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Square a number with the demo task
    Square {
        /// Number to square
        #[arg(allow_negative_numbers = true)]
        n: i32,
        /// Run as an async task and wait on the result channel
        #[arg(long = "async")]
        run_async: bool,
    },
    /// Run the three step workflow (square, add one, double)
    Workflow {
        /// Starting number
        #[arg(allow_negative_numbers = true)]
        start: i64,
        /// Make this step fail once before it succeeds
        #[arg(long)]
        fail_step: Option<String>,
    },
    /// Run a command under the process manager and print its output
    Exec {
        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// List registered tasks
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::from_json_file(path)?,
        None => RuntimeConfig::default(),
    };

    let channel = Arc::new(InMemoryAsyncResultChannel::new());
    let mut factory = TaskFactory::new(TaskDependencies::local(channel.clone()));
    register_demo_tasks(&mut factory)?;
    let client = TaskClient::new(Arc::new(factory));
    let ctx = ExecutionContextBuilder::from_config(&config).build();

    match cli.command {
        Commands::Square { n, run_async } => {
            if run_async {
                let channel_id = UniqueId::random(8);
                client
                    .exec_async(&ctx, "CalcSquareAsyncTask", &AsyncResultChannelSinkLocator::local(), channel_id.clone(), n)
                    .await?;
                info!("Waiting on channel {}", channel_id);

                let result = ResultWaiter::new(channel)
                    .with_interval(config.result_poll.interval())
                    .with_timeout(config.result_poll.timeout())
                    .wait_for::<i32>(&channel_id)
                    .await?;
                match result {
                    AsyncResult::Success(value) => println!("{value}"),
                    AsyncResult::Fail(message) => anyhow::bail!("task failed: {message}"),
                    AsyncResult::Timeout(message) => anyhow::bail!("task timed out: {message}"),
                }
            } else {
                let value: i32 = client.exec_blocking(&ctx, "CalcSquareTask", n).await?;
                println!("{value}");
            }
        }
        Commands::Workflow { start, fail_step } => {
            let continuations = ContinuationFactory::from_config(&config.retry);
            let continuation = continuations.get(&format!("workflow-{start}")).await;

            let mut chaos = Chaos::new();
            if let Some(step) = &fail_step {
                chaos = chaos.fail(step, 1);
            }
            let workflow = ThreeStepWorkflow::new(continuation.clone()).with_chaos(Arc::new(chaos));

            let value = workflow.run(&ctx, start).await?;
            println!("{value}");
            info!("Steps done: {:?}", continuation.done_steps().await);
        }
        Commands::Exec { command } => {
            let mut parts = command.into_iter();
            let Some(program) = parts.next() else {
                anyhow::bail!("no command given");
            };
            let processes = ctx.process_manager();
            let id = UniqueId::random(8);
            let started = processes
                .register_process(&ProcessCommand::new(program).args(parts), id.clone(), "exec")
                .await?;
            info!("Started {} as pid {:?}", started.command, started.pid);

            let exit_code = processes.wait_for_exit(&id).await?;
            let output = processes.lookup_output(&id).await?;
            print!("{}", output.stdout);
            eprint!("{}", output.stderr);
            match exit_code {
                Some(0) => {}
                Some(code) => anyhow::bail!("`{}` exited with code {code}", started.command),
                None => anyhow::bail!("`{}` was terminated by a signal", started.command),
            }
        }
        Commands::Tasks => {
            let tasks = client.factory().list();
            println!("Tasks ({})", tasks.len());
            for (name, kind) in tasks {
                println!("  {name} | {kind}");
            }
        }
    }

    Ok(())
}
