//! Action execution - validates and applies intents against the world
//!
//! Every successful mutating path commits to the event log and then calls
//! the broadcast sink, in that order, before returning. A failed validation
//! short-circuits before either is touched, so observers never see an
//! announcement without a corresponding log entry already committed.

use crate::actions::intent::{Destination, Intent, SiteSpec};
use crate::broadcast::BroadcastSink;
use crate::core::config::EngineConfig;
use crate::core::error::{HearthError, Result};
use crate::core::types::{Position, ResidentId, StructureId};
use crate::spatial::{SpaceRequest, SpatialResolver};
use crate::world::store::{SharedWorld, WorldStore};
use crate::world::structure;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// What a successfully executed intent produced
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Built {
        structure: StructureId,
        kind: String,
        position: Position,
        grid_ref: String,
    },
    Instructed {
        resident: ResidentId,
        name: String,
    },
    Gathered {
        moved: usize,
        x: f32,
        z: f32,
    },
    Announced {
        message: String,
    },
    /// No mutation performed; the caller fulfills this through the
    /// entity-generation collaborator.
    SpawnRequested {
        name: Option<String>,
    },
    Moved {
        resident: ResidentId,
        name: String,
        position: Position,
    },
}

impl ExecutionOutcome {
    /// One-line rendering for dispatch logs and the console
    pub fn describe(&self) -> String {
        match self {
            ExecutionOutcome::Built {
                kind, grid_ref, ..
            } => format!("built {} at {}", kind, grid_ref),
            ExecutionOutcome::Instructed { name, .. } => format!("instructed {}", name),
            ExecutionOutcome::Gathered { moved, x, z } => {
                format!("gathered {} residents toward ({:.0}, {:.0})", moved, x, z)
            }
            ExecutionOutcome::Announced { .. } => "announced".to_string(),
            ExecutionOutcome::SpawnRequested { name } => format!(
                "spawn requested ({})",
                name.as_deref().unwrap_or("unnamed")
            ),
            ExecutionOutcome::Moved { name, position, .. } => format!(
                "moved {} to ({:.1}, {:.1})",
                name, position.x, position.z
            ),
        }
    }
}

/// Validates and applies named intents by combining spatial resolution with
/// store mutation, then announcing the result.
#[derive(Clone)]
pub struct ActionExecutor {
    world: SharedWorld,
    spatial: SpatialResolver,
    sink: Arc<dyn BroadcastSink>,
    config: EngineConfig,
}

impl ActionExecutor {
    pub fn new(
        world: SharedWorld,
        spatial: SpatialResolver,
        sink: Arc<dyn BroadcastSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            world,
            spatial,
            sink,
            config,
        }
    }

    pub fn execute(&self, intent: &Intent) -> Result<ExecutionOutcome> {
        match intent {
            Intent::Build {
                structure,
                site,
                params,
            } => self.execute_build(structure, site, params),
            Intent::Instruct { target, directive } => self.execute_instruct(target, directive),
            Intent::Gather { site } => self.execute_gather(site),
            Intent::Announce { message } => self.execute_announce(message),
            Intent::Spawn { name } => Ok(ExecutionOutcome::SpawnRequested { name: name.clone() }),
            Intent::MoveResident {
                target,
                destination,
            } => self.execute_move(target, destination),
        }
    }

    fn execute_build(
        &self,
        kind: &str,
        site: &SiteSpec,
        params: &Value,
    ) -> Result<ExecutionOutcome> {
        let template = structure::template(kind)
            .ok_or_else(|| HearthError::UnknownStructureKind(kind.to_string()))?;

        let (outcome, payload) = self.world.with(|w| -> Result<(ExecutionOutcome, Value)> {
            let (ax, az) = resolve_site(w, &self.spatial, site)?;

            let (position, grid_ref) = match site {
                // Explicit coordinates are validated in place.
                SiteSpec::At { .. } | SiteSpec::GridRef { .. } => {
                    if !self
                        .spatial
                        .validate_placement(w, ax, az, template.footprint)
                    {
                        return Err(HearthError::PlacementOccupied);
                    }
                    (
                        Position::ground(ax, az),
                        self.spatial.world_to_grid_ref(ax, az),
                    )
                }
                // Loose anchors get the spiral search.
                SiteSpec::Near { .. } | SiteSpec::Origin => self
                    .spatial
                    .find_empty_space(
                        w,
                        SpaceRequest {
                            near: (ax, az),
                            size: template.footprint,
                            min_distance: 0.0,
                            max_distance: self.config.placement_search_max,
                        },
                    )
                    .ok_or(HearthError::NoSpaceFound)?,
            };

            let id = w.add_structure(
                template.kind,
                position.x,
                position.y,
                position.z,
                params.clone(),
                None,
            );
            let payload = json!({
                "structure": id.to_string(),
                "structure_kind": template.kind,
                "effect": template.effect,
                "x": position.x,
                "z": position.z,
                "grid_ref": grid_ref,
            });
            w.log_event("structure_built", payload.clone());

            Ok((
                ExecutionOutcome::Built {
                    structure: id,
                    kind: template.kind.to_string(),
                    position,
                    grid_ref,
                },
                payload,
            ))
        })?;

        self.sink.emit("structure_built", payload);
        Ok(outcome)
    }

    fn execute_instruct(&self, target: &str, directive: &str) -> Result<ExecutionOutcome> {
        let (outcome, payload) = self.world.with(|w| -> Result<(ExecutionOutcome, Value)> {
            let (id, name) = resolve_resident(w, target)?;
            let payload = json!({
                "resident": id.to_string(),
                "name": name,
                "directive": directive,
            });
            w.log_event("directive_issued", payload.clone());
            Ok((ExecutionOutcome::Instructed { resident: id, name }, payload))
        })?;

        self.sink.emit("directive_issued", payload);
        Ok(outcome)
    }

    /// Rally everyone toward a point, one bounded step each. A single call
    /// never completes a long-distance gather; convergence takes repeated
    /// invocations.
    fn execute_gather(&self, site: &SiteSpec) -> Result<ExecutionOutcome> {
        let (outcome, aggregate, moves) = self.world.with(|w| -> Result<(ExecutionOutcome, Value, Vec<Value>)> {
            let (gx, gz) = resolve_site(w, &self.spatial, site)?;
            let target = Position::ground(gx, gz);

            let mut moves: Vec<Value> = Vec::new();
            for id in w.resident_ids() {
                let estimate = match w.resident(id) {
                    Some(r) => {
                        let est = self.spatial.estimate_path(&r.position, &target);
                        Some((est, r.name().to_string()))
                    }
                    None => None,
                };
                let Some((est, name)) = estimate else { continue };
                if est.distance <= 0.0 {
                    continue;
                }

                let step = est.distance.min(self.config.gather_step);
                if let Some(pos) = w.move_resident(id, est.direction, step) {
                    moves.push(json!({
                        "resident": id.to_string(),
                        "name": name,
                        "x": pos.x,
                        "z": pos.z,
                    }));
                }
            }

            let aggregate = json!({"x": gx, "z": gz, "moved": moves.len()});
            w.log_event("gather_called", aggregate.clone());

            Ok((
                ExecutionOutcome::Gathered {
                    moved: moves.len(),
                    x: gx,
                    z: gz,
                },
                aggregate,
                moves,
            ))
        })?;

        self.sink.emit("gather_called", aggregate);
        for payload in moves {
            self.sink.emit("resident_moved", payload);
        }
        Ok(outcome)
    }

    fn execute_announce(&self, message: &str) -> Result<ExecutionOutcome> {
        if message.trim().is_empty() {
            return Err(HearthError::EmptyMessage);
        }

        let payload = self.world.with(|w| {
            let payload = json!({"message": message});
            w.log_event("announcement", payload.clone());
            payload
        });

        self.sink.emit("announcement", payload);
        Ok(ExecutionOutcome::Announced {
            message: message.to_string(),
        })
    }

    fn execute_move(&self, target: &str, destination: &Destination) -> Result<ExecutionOutcome> {
        let (outcome, payload) = self.world.with(|w| -> Result<(ExecutionOutcome, Value)> {
            let (id, name) = resolve_resident(w, target)?;

            let position = match destination {
                Destination::Step {
                    direction,
                    distance,
                } => w.move_resident(id, *direction, *distance),
                Destination::Toward { x, z, max_step } => {
                    let estimate = w
                        .resident(id)
                        .map(|r| self.spatial.estimate_path(&r.position, &Position::ground(*x, *z)));
                    match estimate {
                        Some(est) if est.distance > 0.0 => {
                            w.move_resident(id, est.direction, est.distance.min(*max_step))
                        }
                        Some(_) => w.resident(id).map(|r| r.position),
                        None => None,
                    }
                }
            }
            .ok_or(HearthError::MoveFailed(id))?;

            let payload = json!({
                "resident": id.to_string(),
                "name": name,
                "x": position.x,
                "z": position.z,
            });
            w.log_event("resident_moved", payload.clone());

            Ok((
                ExecutionOutcome::Moved {
                    resident: id,
                    name,
                    position,
                },
                payload,
            ))
        })?;

        self.sink.emit("resident_moved", payload);
        Ok(outcome)
    }
}

/// Resolve a site spec to a ground point. `Near` falls back to the world
/// origin when nothing matches.
fn resolve_site(
    w: &WorldStore,
    spatial: &SpatialResolver,
    site: &SiteSpec,
) -> Result<(f32, f32)> {
    match site {
        SiteSpec::Origin => Ok((0.0, 0.0)),
        SiteSpec::At { x, z } => Ok((*x, *z)),
        SiteSpec::GridRef { label } => spatial
            .grid_ref_to_world(label)
            .ok_or_else(|| HearthError::InvalidGridRef(label.clone())),
        SiteSpec::Near { name } => {
            if let Some(r) = w.resident_by_name(name) {
                Ok((r.position.x, r.position.z))
            } else if let Some(s) = w.structure_by_kind(name) {
                Ok((s.position.x, s.position.z))
            } else {
                Ok((0.0, 0.0))
            }
        }
    }
}

/// Resolve a resident by id string or fuzzy name match
fn resolve_resident(w: &WorldStore, target: &str) -> Result<(ResidentId, String)> {
    if let Ok(uuid) = Uuid::parse_str(target.trim()) {
        if let Some(r) = w.resident(ResidentId(uuid)) {
            return Ok((r.id, r.name().to_string()));
        }
    }
    w.resident_by_name(target)
        .map(|r| (r.id, r.name().to_string()))
        .ok_or_else(|| HearthError::ResidentNotFound(target.to_string()))
}
