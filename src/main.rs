//! Hearthvale - entry point
//!
//! Wires the store, broadcast sink, decision source, and scheduler together,
//! then either runs headless on timers or drives the administrative console.

use clap::Parser;
use hearthvale::broadcast::{BroadcastSink, TraceSink};
use hearthvale::console::Console;
use hearthvale::core::config::EngineConfig;
use hearthvale::core::error::Result;
use hearthvale::decision::{
    DecisionError, DecisionSource, Deliberation, DeliberationContext, LlmDecisionSource,
    ScriptedPolicy, TurnDecision, TurnRequest,
};
use hearthvale::persist;
use hearthvale::scheduler::Scheduler;
use hearthvale::world::store::{SharedWorld, WorldStore};
use std::future::Future;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "hearthvale", about = "Persistent settlement simulation engine")]
struct Args {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the world seed
    #[arg(long)]
    seed: Option<u64>,

    /// Load a world snapshot instead of starting fresh
    #[arg(long)]
    load: Option<PathBuf>,

    /// Run on timers without the console, then stop
    #[arg(long)]
    headless: bool,

    /// How many world tick periods a headless run lasts
    #[arg(long, default_value_t = 20)]
    ticks: u64,
}

/// Runtime-selected decision source: the LLM service when credentials are
/// present, otherwise the scripted policy.
enum EngineSource {
    Llm(LlmDecisionSource),
    Scripted(ScriptedPolicy),
}

impl DecisionSource for EngineSource {
    fn request_turn(
        &self,
        request: TurnRequest,
    ) -> impl Future<Output = std::result::Result<TurnDecision, DecisionError>> + Send {
        async move {
            match self {
                EngineSource::Llm(source) => source.request_turn(request).await,
                EngineSource::Scripted(source) => source.request_turn(request).await,
            }
        }
    }

    fn request_deliberation(
        &self,
        context: DeliberationContext,
    ) -> impl Future<Output = std::result::Result<Deliberation, DecisionError>> + Send {
        async move {
            match self {
                EngineSource::Llm(source) => source.request_deliberation(context).await,
                EngineSource::Scripted(source) => source.request_deliberation(context).await,
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hearthvale=info")
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.world_seed = seed;
    }
    config.validate()?;

    let store = match &args.load {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading world snapshot");
            persist::load_world(path, config.clone())?
        }
        None => WorldStore::new(config.clone()),
    };
    let world = SharedWorld::new(store);
    let sink: Arc<dyn BroadcastSink> = Arc::new(TraceSink);

    let source = match LlmDecisionSource::from_env() {
        Ok(source) => {
            tracing::info!("decision service: LLM API");
            EngineSource::Llm(source)
        }
        Err(_) => {
            tracing::warn!("LLM_API_KEY not set - running with the scripted policy");
            EngineSource::Scripted(ScriptedPolicy::new())
        }
    };

    let scheduler = Scheduler::new(world, Arc::new(source), sink, config.clone());

    if args.headless {
        run_headless(scheduler, &config, args.ticks).await;
        return Ok(());
    }
    run_console(scheduler).await
}

/// Arm the timers, let the settlement run, stop gracefully.
async fn run_headless(scheduler: Scheduler<EngineSource>, config: &EngineConfig, ticks: u64) {
    tracing::info!(ticks, "starting headless run");
    let handle = scheduler.start();
    tokio::time::sleep(config.turn_period() * ticks as u32 + config.turn_period() / 2).await;
    handle.stop().await;
    tracing::info!("headless run complete");
}

/// The interactive administrative console.
async fn run_console(scheduler: Scheduler<EngineSource>) -> Result<()> {
    scheduler.ensure_population();
    let mut console = Console::new(scheduler);

    println!("\n=== HEARTHVALE ===");
    println!("A persistent settlement driven by an external decision service.");
    println!("Type 'help' for commands.\n");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let reply = console.handle(input).await;
        println!("{}", reply.text);
        if reply.quit {
            break;
        }
    }

    let population = console.scheduler().world().with(|w| w.population());
    println!(
        "Final state: {} residents, cycle {}.",
        population,
        console.scheduler().cycle()
    );
    Ok(())
}
