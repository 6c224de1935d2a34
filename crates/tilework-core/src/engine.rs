//! Simulation engine - main entry point for running the simulation

use crate::components::*;
use crate::config::SimConfig;
use crate::error::EngineError;
use crate::jobs::{Job, JobBoard, JobId};
use crate::states::{AgentCtx, Brain, StateKind};
use crate::systems::*;
use crate::world::TileWorld;
use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tilework_logic::grid::TilePos;

/// Main simulation engine
pub struct SimulationEngine {
    /// ECS world containing all agents
    pub world: World,
    /// Tiles, furniture and floor inventory
    tiles: TileWorld,
    /// Every live job, and the queue of pending ones
    jobs: JobBoard,
    rng: StdRng,
    config: SimConfig,
    /// Simulation time in seconds since start
    sim_time: f64,

    // Update timing
    last_reachability_check: f64,
}

impl SimulationEngine {
    /// Create a simulation over `tiles`. The config is used as given.
    pub fn new(config: SimConfig, tiles: TileWorld) -> Self {
        Self {
            world: World::new(),
            tiles,
            jobs: JobBoard::new(&config),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sim_time: 0.0,
            last_reachability_check: 0.0,
        }
    }

    /// Validate `config` first, then create the simulation.
    pub fn with_config(config: SimConfig, tiles: TileWorld) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::new(config, tiles))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tiles(&self) -> &TileWorld {
        &self.tiles
    }

    /// Mutable tile access. Graph patching and job re-evaluation happen
    /// on the next [`update`](Self::update).
    pub fn tiles_mut(&mut self) -> &mut TileWorld {
        &mut self.tiles
    }

    pub fn jobs(&self) -> &JobBoard {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// Subscribe to every job handed to the queue.
    pub fn on_job_created(&mut self, f: impl FnMut(&Job) + 'static) {
        self.jobs.on_job_created(f);
    }

    // ── Agents ─────────────────────────────────────────────────────────

    pub fn spawn_agent(&mut self, name: impl Into<String>, tile: TilePos) -> Entity {
        let agent = Agent::new(name, tile, self.config.agent_speed);
        log::info!("spawned {} at {}", agent.name, tile);
        self.world.spawn((agent, Brain::new()))
    }

    pub fn spawn_agent_with_needs(
        &mut self,
        name: impl Into<String>,
        tile: TilePos,
        needs: Needs,
    ) -> Entity {
        let entity = self.spawn_agent(name, tile);
        // The entity was just spawned, so this cannot fail
        let _ = self.world.insert_one(entity, needs);
        entity
    }

    pub fn agent(&self, entity: Entity) -> Option<hecs::Ref<'_, Agent>> {
        self.world.get::<&Agent>(entity).ok()
    }

    pub fn brain(&self, entity: Entity) -> Option<hecs::Ref<'_, Brain>> {
        self.world.get::<&Brain>(entity).ok()
    }

    pub fn needs(&self, entity: Entity) -> Option<hecs::Ref<'_, Needs>> {
        self.world.get::<&Needs>(entity).ok()
    }

    /// Agent entities in update order.
    pub fn agents(&self) -> Vec<Entity> {
        let mut agents: Vec<Entity> = self
            .world
            .query::<(&Agent, &Brain)>()
            .iter()
            .map(|(e, _)| e)
            .collect();
        agents.sort_by_key(|e| e.to_bits());
        agents
    }

    pub fn agent_count(&self) -> usize {
        self.world.query::<&Agent>().iter().count()
    }

    /// Run `f` with the agent's context and brain borrowed together.
    fn with_agent<R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut AgentCtx, &mut Brain) -> R,
    ) -> Result<R, EngineError> {
        let (agent, brain) = self
            .world
            .query_one_mut::<(&mut Agent, &mut Brain)>(entity)
            .map_err(|_| EngineError::NoSuchAgent(entity))?;
        let mut ctx = AgentCtx {
            entity,
            agent,
            world: &mut self.tiles,
            jobs: &mut self.jobs,
            rng: &mut self.rng,
            config: &self.config,
        };
        Ok(f(&mut ctx, brain))
    }

    /// Interrupt the agent and start `kind` immediately.
    pub fn set_agent_state(&mut self, entity: Entity, kind: StateKind) -> Result<(), EngineError> {
        self.with_agent(entity, |ctx, brain| brain.set_state(ctx, kind))
    }

    /// Start `kind` once the agent's current chain finishes.
    pub fn queue_agent_state(&mut self, entity: Entity, kind: StateKind) -> Result<(), EngineError> {
        let mut brain = self
            .world
            .get::<&mut Brain>(entity)
            .map_err(|_| EngineError::NoSuchAgent(entity))?;
        brain.queue_state(kind);
        Ok(())
    }

    /// Tear down the agent's state chain. It picks new work next tick.
    pub fn interrupt_agent(&mut self, entity: Entity) -> Result<(), EngineError> {
        self.with_agent(entity, |ctx, brain| brain.interrupt(ctx))
    }

    // ── Jobs ───────────────────────────────────────────────────────────

    /// Put a job on the board and queue it.
    pub fn post_job(&mut self, job: Job) -> JobId {
        let id = self.jobs.post(job, &self.tiles);
        log::debug!("posted {}", id);
        id
    }

    /// Hand a job straight to `entity`, bypassing the shared queue.
    ///
    /// It starts once the agent's current chain finishes. If the agent is
    /// pre-empted first, the job goes back through the queue.
    pub fn assign_job(&mut self, entity: Entity, job: Job) -> Result<JobId, EngineError> {
        let id = self.jobs.post_unqueued(job);
        if let Err(e) = self.queue_agent_state(entity, StateKind::job(id)) {
            self.jobs.cancel(id, &mut self.tiles);
            return Err(e);
        }
        Ok(id)
    }

    /// Cancel a job and interrupt whoever was working it.
    pub fn cancel_job(&mut self, id: JobId) -> Result<(), EngineError> {
        if !self.jobs.cancel(id, &mut self.tiles) {
            return Err(EngineError::NoSuchJob(id));
        }
        let workers: Vec<Entity> = self
            .world
            .query::<&Brain>()
            .iter()
            .filter(|(_, brain)| brain.current_job() == Some(id))
            .map(|(e, _)| e)
            .collect();
        for entity in workers {
            self.interrupt_agent(entity)?;
        }
        Ok(())
    }

    /// Have `entity` drop what it is doing and work `id` now.
    pub fn prioritize_job(&mut self, entity: Entity, id: JobId) -> Result<(), EngineError> {
        let job = self.jobs.get(id).ok_or(EngineError::NoSuchJob(id))?;
        let me = agent_id(entity);
        if job.worker().is_some_and(|w| w != me) {
            return Err(EngineError::JobTaken(id));
        }
        self.set_agent_state(entity, StateKind::job(id))
    }

    // ── Tick ───────────────────────────────────────────────────────────

    /// Advance the simulation by `delta_seconds`.
    pub fn update(&mut self, delta_seconds: f32) {
        self.sim_time += f64::from(delta_seconds);

        // Inventory placed or freed up may unblock parked jobs
        for kind in self.tiles.drain_freed() {
            self.jobs.reevaluate_waiting(&kind, &self.tiles);
        }

        // Reachability: immediately on walkability changes, periodically otherwise
        let recheck = f64::from(self.config.reachability_recheck_secs);
        if self.tiles.take_walkability_changed() {
            self.jobs.clear_cant_reach();
            self.jobs.reevaluate_unreachable(&self.tiles);
            self.last_reachability_check = self.sim_time;
        } else if self.sim_time - self.last_reachability_check >= recheck {
            self.jobs.reevaluate_unreachable(&self.tiles);
            self.last_reachability_check = self.sim_time;
        }

        // Needs
        needs_system(&mut self.world, delta_seconds * self.config.need_hours_per_second);
        let urgent = assign_need_jobs(
            &mut self.world,
            &mut self.tiles,
            &mut self.jobs,
            self.config.need_threshold,
        );
        for (entity, id) in urgent {
            let started = self.with_agent(entity, |ctx, brain| {
                for dropped in brain.clear_queue() {
                    if let StateKind::Job(state) = dropped {
                        ctx.jobs.hand_back(state.job(), ctx.world);
                    }
                }
                brain.set_state(ctx, StateKind::job(id));
            });
            if let Err(e) = started {
                log::error!("critical need job {id}: {e}");
            }
        }

        // Agents, in entity order
        for entity in self.agents() {
            let stepped = self.with_agent(entity, |ctx, brain| {
                if !brain.has_state() {
                    let kind = choose_state(ctx, brain);
                    brain.set_state(ctx, kind);
                }
                brain.update(ctx, delta_seconds);
            });
            if let Err(e) = stepped {
                log::error!("agent update failed: {e}");
            }
        }

        let finished = self.jobs.take_finished();
        apply_finished_need_jobs(&mut self.world, &finished);
    }

    /// Get current simulation time in seconds
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }
}
