//! Dual-cadence orchestration
//!
//! Two independent repeating tasks share one world: the world tick advances
//! exactly one resident's turn per cycle, and the slower deliberation tick
//! produces goals, queued actions, and per-resident directives. Decision
//! calls are the only operations that suspend for real wall-clock time; every
//! one runs under a bounded timeout with a deterministic fallback, so a
//! stalled service never delays the next scheduled tick beyond one cycle.

use crate::actions::{ActionExecutor, ExecutionOutcome, Intent};
use crate::broadcast::BroadcastSink;
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::types::{now_ms, Cycle, Position, ResidentId, TimestampMs};
use crate::decision::{
    DecisionSource, Deliberation, DeliberationContext, ScriptedPolicy, TurnDecision, TurnRequest,
};
use crate::spatial::SpatialResolver;
use crate::world::store::WorldStore;
use crate::world::{Resident, ResidentProfile, ResidentState, SharedWorld};
use ahash::AHashMap;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

/// Radius of the deliberation context map, in cells
const MAP_RADIUS_CELLS: i32 = 8;

/// Memory importance assigned to a turn's compressed thought
const THOUGHT_IMPORTANCE: f32 = 0.5;

/// Names handed out when the engine itself has to populate the settlement
const FOUNDER_NAMES: &[&str] = &[
    "Maren", "Edwin", "Tilda", "Garrick", "Susa", "Orin", "Petra", "Halvard",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Active,
    Done,
    Abandoned,
}

/// A goal owned by the deliberation state
#[derive(Debug, Clone)]
pub struct Goal {
    pub description: String,
    pub created_at: TimestampMs,
    pub status: GoalStatus,
}

/// Orchestration state owned by one scheduler instance
///
/// Goals, the pending-action FIFO, the per-resident directive FIFOs, and the
/// bounded observation history. Never a process-wide singleton.
#[derive(Default)]
struct OrchestrationState {
    goals: Vec<Goal>,
    observations: VecDeque<String>,
    pending: VecDeque<Intent>,
    directives: AHashMap<ResidentId, VecDeque<String>>,
}

/// What one world tick did
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub cycle: Cycle,
    pub resident: ResidentId,
    pub name: String,
    /// True when the scripted fallback produced the turn
    pub fell_back: bool,
    pub moved: bool,
    pub spoke: bool,
}

/// What one deliberation tick did
#[derive(Debug, Default, Clone)]
pub struct DeliberationReport {
    /// False when the cycle was skipped (service failure or timeout)
    pub merged: bool,
    pub new_goal: Option<String>,
    pub queued_actions: usize,
    pub dispatched: usize,
    pub failed: usize,
}

/// The dual-cadence scheduler
pub struct Scheduler<D> {
    world: SharedWorld,
    spatial: SpatialResolver,
    executor: ActionExecutor,
    source: Arc<D>,
    fallback: ScriptedPolicy,
    sink: Arc<dyn BroadcastSink>,
    config: EngineConfig,
    state: Arc<Mutex<OrchestrationState>>,
    cycle: Cycle,
}

impl<D> Clone for Scheduler<D> {
    fn clone(&self) -> Self {
        Self {
            world: self.world.clone(),
            spatial: self.spatial,
            executor: self.executor.clone(),
            source: self.source.clone(),
            fallback: self.fallback,
            sink: self.sink.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
            cycle: self.cycle,
        }
    }
}

impl<D: DecisionSource> Scheduler<D> {
    pub fn new(
        world: SharedWorld,
        source: Arc<D>,
        sink: Arc<dyn BroadcastSink>,
        config: EngineConfig,
    ) -> Self {
        let spatial = SpatialResolver::new(config.cell_size);
        let executor = ActionExecutor::new(world.clone(), spatial, sink.clone(), config.clone());
        Self {
            world,
            spatial,
            executor,
            source,
            fallback: ScriptedPolicy::new(),
            sink,
            config,
            state: Arc::new(Mutex::new(OrchestrationState::default())),
            cycle: 0,
        }
    }

    fn state(&self) -> MutexGuard<'_, OrchestrationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle
    }

    pub fn executor(&self) -> &ActionExecutor {
        &self.executor
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn spatial(&self) -> SpatialResolver {
        self.spatial
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn goals(&self) -> Vec<Goal> {
        self.state().goals.clone()
    }

    pub fn pending_actions(&self) -> usize {
        self.state().pending.len()
    }

    /// Queue an intent for the next deliberation drain
    pub fn queue_action(&self, intent: Intent) {
        self.state().pending.push_back(intent);
    }

    /// Top the world up to the configured minimum population
    pub fn ensure_population(&self) -> usize {
        let mut added = 0;
        loop {
            let population = self.world.with(|w| w.population());
            if population >= self.config.min_population {
                break;
            }
            self.spawn_resident(None);
            added += 1;
        }
        if added > 0 {
            tracing::info!(added, "seeded settlement to minimum population");
        }
        added
    }

    /// Add a resident, log, and announce. Used by population seeding and to
    /// fulfill spawn markers from the action queue.
    pub fn spawn_resident(&self, name: Option<String>) -> Resident {
        let (resident, payload) = self.world.with(|w| {
            let name = name.unwrap_or_else(|| {
                FOUNDER_NAMES
                    .get(w.population())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| format!("Resident-{}", w.population() + 1))
            });
            let resident = w.add_resident(ResidentProfile::named(name));
            let payload = json!({
                "resident": resident.id.to_string(),
                "name": resident.name(),
                "x": resident.position.x,
                "z": resident.position.z,
            });
            w.log_event("resident_arrived", payload.clone());
            (resident, payload)
        });
        self.sink.emit("resident_arrived", payload);
        resident
    }

    // === WORLD TICK ===

    /// Run one world tick to completion: select the resident at
    /// `cycle mod population`, perceive, decide, apply, announce. The
    /// round-robin index advances only after the turn has fully completed,
    /// so turns never interleave.
    pub async fn run_world_tick(&mut self) -> Result<Option<TurnReport>> {
        let cycle = self.cycle;

        let selected = self.world.with(|w| {
            let population = w.population();
            if population == 0 {
                return None;
            }
            let roster = w.resident_ids();
            let id = roster[(cycle % population as u64) as usize];
            let resident = w.resident(id)?;
            let name = resident.name().to_string();
            let profile = resident.profile.document.clone();
            w.set_state(id, ResidentState::Acting);
            let perception = w.perception(id, self.config.perception_radius)?;
            let memories = w.recent_memories(id, self.config.memory_recall);
            Some((id, name, profile, perception, memories))
        });
        let Some((id, name, profile, mut perception, memories)) = selected else {
            return Ok(None);
        };

        perception.directive = self
            .state()
            .directives
            .get_mut(&id)
            .and_then(|queue| queue.pop_front());

        self.sink.emit(
            "turn_started",
            json!({"cycle": cycle, "resident": id.to_string(), "name": name}),
        );

        let request = TurnRequest {
            resident: id,
            name: name.clone(),
            profile,
            memories,
            perception,
            cycle,
        };
        let (decision, fell_back) = match timeout(
            self.config.decision_timeout(),
            self.source.request_turn(request),
        )
        .await
        {
            Ok(Ok(decision)) => (decision, false),
            Ok(Err(e)) => {
                tracing::warn!(resident = %name, error = %e, "decision unavailable, using scripted fallback");
                (self.fallback.turn(id, cycle), true)
            }
            Err(_) => {
                tracing::warn!(resident = %name, "decision timed out, using scripted fallback");
                (self.fallback.turn(id, cycle), true)
            }
        };

        let emits = self.world.with(|w| apply_turn(w, id, &name, &decision));
        for (event, payload) in emits {
            self.sink.emit(&event, payload);
        }

        self.sink.emit(
            "turn_ended",
            json!({"cycle": cycle, "resident": id.to_string(), "name": name, "fallback": fell_back}),
        );

        let report = TurnReport {
            cycle,
            resident: id,
            name,
            fell_back,
            moved: decision.movement.is_some(),
            spoke: decision.speech.is_some(),
        };
        self.cycle += 1;
        Ok(Some(report))
    }

    // === DELIBERATION TICK ===

    /// Settlement summary for the deliberation request
    pub fn build_deliberation_context(&self) -> DeliberationContext {
        let (population, resident_refs, map, conversation) = self.world.with(|w| {
            let population = w.population();
            let resident_refs = w
                .residents()
                .iter()
                .map(|r| {
                    (
                        r.name().to_string(),
                        self.spatial.world_to_grid_ref(r.position.x, r.position.z),
                    )
                })
                .collect::<Vec<_>>();
            let map = self
                .spatial
                .render_text_map(w, &Position::ORIGIN, MAP_RADIUS_CELLS);

            let mut conversation: Vec<String> = w
                .recent_events(50)
                .into_iter()
                .filter(|e| e.kind == "resident_spoke")
                .take(self.config.conversation_recall)
                .filter_map(|e| {
                    let name = e.payload.get("name")?.as_str()?.to_string();
                    let speech = e.payload.get("speech")?.as_str()?.to_string();
                    Some(format!("{}: {}", name, speech))
                })
                .collect();
            conversation.reverse();

            (population, resident_refs, map, conversation)
        });

        let state = self.state();
        DeliberationContext {
            population,
            resident_refs,
            map,
            goals: state
                .goals
                .iter()
                .filter(|g| g.status == GoalStatus::Active)
                .map(|g| g.description.clone())
                .collect(),
            observations: state.observations.iter().cloned().collect(),
            conversation,
        }
    }

    /// Run one deliberation tick: request, merge (or skip on failure), then
    /// drain the pending-action queue completely.
    pub async fn run_deliberation_tick(&mut self) -> DeliberationReport {
        let context = self.build_deliberation_context();
        let mut report = DeliberationReport::default();

        match timeout(
            self.config.decision_timeout(),
            self.source.request_deliberation(context),
        )
        .await
        {
            Ok(Ok(deliberation)) => self.merge_deliberation(deliberation, &mut report),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "deliberation unavailable, skipping cycle")
            }
            Err(_) => tracing::warn!("deliberation timed out, skipping cycle"),
        }

        loop {
            let next = self.state().pending.pop_front();
            let Some(intent) = next else { break };

            match self.executor.execute(&intent) {
                Ok(ExecutionOutcome::SpawnRequested { name }) => {
                    let resident = self.spawn_resident(name);
                    report.dispatched += 1;
                    tracing::info!(name = resident.name(), "fulfilled spawn request");
                }
                Ok(outcome) => {
                    report.dispatched += 1;
                    tracing::info!(
                        action = intent.label(),
                        outcome = %outcome.describe(),
                        "dispatched queued action"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(action = intent.label(), error = %e, "queued action failed");
                }
            }
        }

        report
    }

    fn merge_deliberation(&self, deliberation: Deliberation, report: &mut DeliberationReport) {
        let directive_target = deliberation.resident_instruction.as_ref().and_then(|i| {
            self.world
                .with(|w| w.resident_by_name(&i.target).map(|r| r.id))
        });

        let mut state = self.state();

        if let Some(goal) = deliberation.new_goal {
            report.new_goal = Some(goal.clone());
            state.goals.push(Goal {
                description: goal,
                created_at: now_ms(),
                status: GoalStatus::Active,
            });
        }

        if let Some(observation) = deliberation.observation {
            state.observations.push_back(observation);
            while state.observations.len() > self.config.observation_cap {
                state.observations.pop_front();
            }
        }

        report.queued_actions = deliberation.actions.len();
        state.pending.extend(deliberation.actions);

        if let Some(instruction) = deliberation.resident_instruction {
            match directive_target {
                Some(id) => state
                    .directives
                    .entry(id)
                    .or_default()
                    .push_back(instruction.directive),
                None => {
                    tracing::warn!(resident = %instruction.target, "dropping directive for unknown resident")
                }
            }
        }

        report.merged = true;
    }

    // === LIFECYCLE ===

    /// Seed the population, then arm both timers. The returned handle stops
    /// them gracefully.
    pub fn start(self) -> SchedulerHandle
    where
        D: 'static,
    {
        self.ensure_population();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let grace = self.config.shutdown_grace();
        let turn_period = self.config.turn_period();
        let deliberation_period = self.config.deliberation_period();

        let mut world_half = self.clone();
        let mut world_shutdown = shutdown_rx.clone();
        let world_loop = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + turn_period, turn_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = world_half.run_world_tick().await {
                            tracing::warn!(error = %e, "world tick failed, skipping cycle");
                        }
                    }
                    _ = world_shutdown.changed() => break,
                }
            }
            tracing::info!("world tick loop stopped");
        });

        let mut deliberation_half = self;
        let mut deliberation_shutdown = shutdown_rx;
        let deliberation_loop = tokio::spawn(async move {
            let mut ticker = interval_at(
                Instant::now() + deliberation_period,
                deliberation_period,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = deliberation_half.run_deliberation_tick().await;
                        tracing::debug!(
                            merged = report.merged,
                            dispatched = report.dispatched,
                            failed = report.failed,
                            "deliberation cycle complete"
                        );
                    }
                    _ = deliberation_shutdown.changed() => break,
                }
            }
            tracing::info!("deliberation loop stopped");
        });

        SchedulerHandle {
            shutdown: shutdown_tx,
            world_loop,
            deliberation_loop,
            grace,
        }
    }
}

/// Applies a turn decision under the store lock; returns the announcements
/// to emit after the commit.
fn apply_turn(
    w: &mut WorldStore,
    id: ResidentId,
    name: &str,
    decision: &TurnDecision,
) -> Vec<(String, serde_json::Value)> {
    let mut emits = Vec::new();

    if let Some(movement) = &decision.movement {
        if let Some(position) = w.move_resident(id, movement.direction, movement.distance) {
            let payload = json!({
                "resident": id.to_string(),
                "name": name,
                "x": position.x,
                "z": position.z,
            });
            w.log_event("resident_moved", payload.clone());
            emits.push(("resident_moved".to_string(), payload));
        }
    }

    if let Some(speech) = &decision.speech {
        let payload = json!({"resident": id.to_string(), "name": name, "speech": speech});
        w.log_event("resident_spoke", payload.clone());
        emits.push(("resident_spoke".to_string(), payload));
    }

    if let Some(action) = &decision.action {
        let payload = json!({"resident": id.to_string(), "name": name, "activity": action});
        w.log_event("resident_acted", payload.clone());
        emits.push(("resident_acted".to_string(), payload));
    }

    if let Some(thought) = &decision.thought {
        w.add_memory(id, compress_thought(thought), THOUGHT_IMPORTANCE);
    }

    w.set_state(id, ResidentState::Idle);
    emits
}

/// Compress a thought for storage: trimmed, capped at a fixed length
fn compress_thought(thought: &str) -> String {
    const MAX_CHARS: usize = 240;
    let trimmed = thought.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut compressed: String = trimmed.chars().take(MAX_CHARS).collect();
    compressed.truncate(compressed.trim_end().len());
    compressed.push_str("...");
    compressed
}

/// Stops the scheduler loops: no new cycles are accepted, in-flight work may
/// finish, and anything still running past the grace period is abandoned.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    world_loop: JoinHandle<()>,
    deliberation_loop: JoinHandle<()>,
    grace: Duration,
}

impl SchedulerHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for handle in [self.world_loop, self.deliberation_loop] {
            let abort = handle.abort_handle();
            if timeout(self.grace, handle).await.is_err() {
                tracing::warn!("scheduler loop exceeded shutdown grace, aborting");
                abort.abort();
            }
        }
    }
}
