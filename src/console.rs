//! Administrative command surface
//!
//! A small fixed vocabulary, each command mapping to one or more core calls
//! and producing a short textual result. The console is a thin dispatch
//! layer; presentation stays out of the core.

use crate::actions::{Intent, SiteSpec};
use crate::core::types::Position;
use crate::decision::DecisionSource;
use crate::scheduler::{GoalStatus, Scheduler};
use serde_json::Value;
use std::path::PathBuf;

/// The administrative vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Status,
    Residents,
    Spawn { name: String },
    Build { kind: String },
    Gather,
    Deliberate,
    Tick,
    Run { count: u32 },
    Goals,
    Map,
    Events,
    Save { path: PathBuf },
    Help,
    Quit,
}

/// Parse one console line. `None` means an unrecognized command.
pub fn parse_command(input: &str) -> Option<AdminCommand> {
    let mut parts = input.trim().split_whitespace();
    let head = parts.next()?;
    let rest = parts.collect::<Vec<_>>().join(" ");

    match head {
        "status" | "s" => Some(AdminCommand::Status),
        "residents" | "list" => Some(AdminCommand::Residents),
        "spawn" if !rest.is_empty() => Some(AdminCommand::Spawn { name: rest }),
        "build" if !rest.is_empty() => Some(AdminCommand::Build { kind: rest }),
        "gather" => Some(AdminCommand::Gather),
        "deliberate" => Some(AdminCommand::Deliberate),
        "tick" | "t" => Some(AdminCommand::Tick),
        "run" => rest.parse().ok().map(|count| AdminCommand::Run { count }),
        "goals" => Some(AdminCommand::Goals),
        "map" => Some(AdminCommand::Map),
        "events" => Some(AdminCommand::Events),
        "save" if !rest.is_empty() => Some(AdminCommand::Save { path: rest.into() }),
        "help" | "h" => Some(AdminCommand::Help),
        "quit" | "q" => Some(AdminCommand::Quit),
        _ => None,
    }
}

/// Reply to one console command
pub struct ConsoleReply {
    pub text: String,
    pub quit: bool,
}

impl ConsoleReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quit: false,
        }
    }
}

const HELP_TEXT: &str = "\
Commands:
  status / s        - settlement summary
  residents         - list residents with positions
  spawn <name>      - add a resident
  build <kind>      - raise a structure near the origin
  gather            - rally everyone toward the origin
  deliberate        - force a deliberation cycle now
  tick / t          - advance one resident turn
  run <n>           - advance n resident turns
  goals             - list deliberation goals
  map               - render the settlement map
  events            - show recent events
  save <path>       - write a world snapshot
  quit / q          - exit";

/// Drives a scheduler from parsed admin commands
pub struct Console<D> {
    scheduler: Scheduler<D>,
}

impl<D: DecisionSource> Console<D> {
    pub fn new(scheduler: Scheduler<D>) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler<D> {
        &self.scheduler
    }

    /// Handle one console line
    pub async fn handle(&mut self, line: &str) -> ConsoleReply {
        let Some(command) = parse_command(line) else {
            return ConsoleReply::text("Unknown command. Try 'help'.");
        };

        match command {
            AdminCommand::Status => ConsoleReply::text(self.status()),
            AdminCommand::Residents => ConsoleReply::text(self.residents()),
            AdminCommand::Spawn { name } => {
                let resident = self.scheduler.spawn_resident(Some(name));
                ConsoleReply::text(format!(
                    "Spawned {} at ({:.1}, {:.1})",
                    resident.name(),
                    resident.position.x,
                    resident.position.z
                ))
            }
            AdminCommand::Build { kind } => {
                let intent = Intent::Build {
                    structure: kind,
                    site: SiteSpec::Origin,
                    params: Value::Null,
                };
                match self.scheduler.executor().execute(&intent) {
                    Ok(outcome) => ConsoleReply::text(outcome.describe()),
                    Err(e) => ConsoleReply::text(format!("Build failed: {}", e)),
                }
            }
            AdminCommand::Gather => {
                let intent = Intent::Gather {
                    site: SiteSpec::Origin,
                };
                match self.scheduler.executor().execute(&intent) {
                    Ok(outcome) => ConsoleReply::text(outcome.describe()),
                    Err(e) => ConsoleReply::text(format!("Gather failed: {}", e)),
                }
            }
            AdminCommand::Deliberate => {
                let report = self.scheduler.run_deliberation_tick().await;
                if report.merged {
                    ConsoleReply::text(format!(
                        "Deliberated: goal={}, queued={}, dispatched={}, failed={}",
                        report.new_goal.as_deref().unwrap_or("none"),
                        report.queued_actions,
                        report.dispatched,
                        report.failed
                    ))
                } else {
                    ConsoleReply::text("Deliberation skipped (service unavailable)")
                }
            }
            AdminCommand::Tick => ConsoleReply::text(self.run_ticks(1).await),
            AdminCommand::Run { count } => ConsoleReply::text(self.run_ticks(count).await),
            AdminCommand::Goals => ConsoleReply::text(self.goals()),
            AdminCommand::Map => {
                let map = self.scheduler.world().with(|w| {
                    self.scheduler
                        .spatial()
                        .render_text_map(w, &Position::ORIGIN, 8)
                });
                ConsoleReply::text(map)
            }
            AdminCommand::Events => {
                let events = self.scheduler.world().with(|w| w.recent_events(10));
                if events.is_empty() {
                    ConsoleReply::text("No events yet.")
                } else {
                    let lines: Vec<String> = events.iter().map(|e| e.describe()).collect();
                    ConsoleReply::text(lines.join("\n"))
                }
            }
            AdminCommand::Save { path } => {
                match crate::persist::save_world(&path, self.scheduler.world()) {
                    Ok(()) => ConsoleReply::text(format!("Saved to {}", path.display())),
                    Err(e) => ConsoleReply::text(format!("Save failed: {}", e)),
                }
            }
            AdminCommand::Help => ConsoleReply::text(HELP_TEXT),
            AdminCommand::Quit => ConsoleReply {
                text: "Goodbye.".into(),
                quit: true,
            },
        }
    }

    async fn run_ticks(&mut self, count: u32) -> String {
        let mut lines = Vec::new();
        for _ in 0..count {
            match self.scheduler.run_world_tick().await {
                Ok(Some(report)) => lines.push(format!(
                    "cycle {}: {} took a turn{}",
                    report.cycle,
                    report.name,
                    if report.fell_back { " (fallback)" } else { "" }
                )),
                Ok(None) => {
                    lines.push("No residents to advance.".into());
                    break;
                }
                Err(e) => {
                    lines.push(format!("Tick failed: {}", e));
                    break;
                }
            }
        }
        lines.join("\n")
    }

    fn status(&self) -> String {
        let snapshot = self.scheduler.world().with(|w| w.snapshot());
        let structures = self.scheduler.world().with(|w| w.structures().len());
        format!(
            "Cycle {} | Population {} | Structures {} | Uptime {}s",
            self.scheduler.cycle(),
            snapshot.population,
            structures,
            snapshot.world_time_secs
        )
    }

    fn residents(&self) -> String {
        let spatial = self.scheduler.spatial();
        let lines = self.scheduler.world().with(|w| {
            w.residents()
                .iter()
                .map(|r| {
                    format!(
                        "{} at {} ({:.1}, {:.1}) [{:?}]",
                        r.name(),
                        spatial.world_to_grid_ref(r.position.x, r.position.z),
                        r.position.x,
                        r.position.z,
                        r.state
                    )
                })
                .collect::<Vec<_>>()
        });
        if lines.is_empty() {
            "The settlement is empty.".into()
        } else {
            lines.join("\n")
        }
    }

    fn goals(&self) -> String {
        let goals = self.scheduler.goals();
        if goals.is_empty() {
            return "No goals yet.".into();
        }
        goals
            .iter()
            .map(|g| {
                let tag = match g.status {
                    GoalStatus::Active => "active",
                    GoalStatus::Done => "done",
                    GoalStatus::Abandoned => "abandoned",
                };
                format!("[{}] {}", tag, g.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::RecordingSink;
    use crate::core::config::EngineConfig;
    use crate::decision::ScriptedPolicy;
    use crate::world::store::{SharedWorld, WorldStore};
    use std::sync::Arc;

    fn console() -> Console<ScriptedPolicy> {
        let config = EngineConfig {
            min_population: 2,
            turn_period_ms: 50,
            decision_timeout_ms: 40,
            ..EngineConfig::default()
        };
        let world = SharedWorld::new(WorldStore::new(config.clone()));
        let scheduler = Scheduler::new(
            world,
            Arc::new(ScriptedPolicy::new()),
            Arc::new(RecordingSink::new()),
            config,
        );
        scheduler.ensure_population();
        Console::new(scheduler)
    }

    #[test]
    fn test_parse_vocabulary() {
        assert_eq!(parse_command("status"), Some(AdminCommand::Status));
        assert_eq!(
            parse_command("spawn Maren the Elder"),
            Some(AdminCommand::Spawn {
                name: "Maren the Elder".into()
            })
        );
        assert_eq!(
            parse_command("build beacon"),
            Some(AdminCommand::Build {
                kind: "beacon".into()
            })
        );
        assert_eq!(parse_command("run 5"), Some(AdminCommand::Run { count: 5 }));
        assert_eq!(parse_command("run five"), None);
        assert_eq!(parse_command("spawn"), None);
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command(""), None);
    }

    #[tokio::test]
    async fn test_status_and_residents() {
        let mut console = console();
        let status = console.handle("status").await;
        assert!(status.text.contains("Population 2"));

        let residents = console.handle("residents").await;
        assert_eq!(residents.text.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_build_and_map() {
        let mut console = console();
        let reply = console.handle("build beacon").await;
        assert!(reply.text.contains("built beacon"));

        let map = console.handle("map").await;
        assert!(map.text.contains('S'));
    }

    #[tokio::test]
    async fn test_tick_advances_cycle() {
        let mut console = console();
        console.handle("tick").await;
        console.handle("run 3").await;
        assert_eq!(console.scheduler().cycle(), 4);
    }

    #[tokio::test]
    async fn test_unknown_build_kind_reports_error() {
        let mut console = console();
        let reply = console.handle("build ziggurat").await;
        assert!(reply.text.contains("Build failed"));
    }

    #[tokio::test]
    async fn test_quit() {
        let mut console = console();
        let reply = console.handle("quit").await;
        assert!(reply.quit);
    }
}
