//! Per-agent state machine.
//!
//! Each agent's [`Brain`] holds at most one live [`State`]. A state may own
//! a `next` continuation: when it finishes, control returns to that state.
//! States never touch the brain directly. `update` returns a [`Transition`]
//! and the brain applies it:
//!
//! - `Push(s)` makes `s` live with the current state as its continuation
//!   (e.g. a Job state delegating to Haul, Haul delegating to Move).
//! - `Finished` exits the current state and resumes its continuation, or
//!   leaves the agent with no state ("assign me a job").
//! - `Interrupt` tears the whole chain down, continuation first.

mod dump;
mod haul;
mod idle;
mod job;
mod movement;

pub use dump::DumpState;
pub use haul::{HaulAction, HaulState};
pub use idle::IdleState;
pub use job::JobState;
pub use movement::MoveState;

use crate::components::{agent_id, Agent};
use crate::config::SimConfig;
use crate::jobs::{JobBoard, JobId};
use crate::world::TileWorld;
use hecs::Entity;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use tilework_logic::inventory::ClaimantId;
use tilework_logic::pathfinding::{Goal, Route};

/// Everything a state may read or mutate during one call.
pub struct AgentCtx<'a> {
    pub entity: Entity,
    pub agent: &'a mut Agent,
    pub world: &'a mut TileWorld,
    pub jobs: &'a mut JobBoard,
    pub rng: &'a mut StdRng,
    pub config: &'a SimConfig,
}

impl AgentCtx<'_> {
    pub fn agent_id(&self) -> ClaimantId {
        agent_id(self.entity)
    }
}

/// What the brain should do after a state's update.
#[derive(Debug)]
pub enum Transition {
    Continue,
    Push(StateKind),
    Finished,
    Interrupt,
}

/// The concrete behaviours.
#[derive(Debug, Clone)]
pub enum StateKind {
    Idle(IdleState),
    Job(JobState),
    Haul(HaulState),
    Dump(DumpState),
    Move(MoveState),
}

impl StateKind {
    pub fn idle() -> Self {
        StateKind::Idle(IdleState::default())
    }

    pub fn job(id: JobId) -> Self {
        StateKind::Job(JobState::new(id))
    }

    pub fn haul(id: JobId) -> Self {
        StateKind::Haul(HaulState::new(id))
    }

    pub fn dump() -> Self {
        StateKind::Dump(DumpState)
    }

    pub fn move_along(route: Route, arrival: Goal) -> Self {
        StateKind::Move(MoveState::new(route, arrival))
    }

    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Idle(_) => "Idle",
            StateKind::Job(_) => "Job",
            StateKind::Haul(_) => "Haul",
            StateKind::Dump(_) => "Dump",
            StateKind::Move(_) => "Move",
        }
    }

    fn enter(&mut self, ctx: &mut AgentCtx) {
        match self {
            StateKind::Idle(s) => s.enter(ctx),
            StateKind::Job(s) => s.enter(ctx),
            StateKind::Haul(_) | StateKind::Dump(_) | StateKind::Move(_) => {}
        }
    }

    fn update(&mut self, ctx: &mut AgentCtx, dt: f32) -> Transition {
        match self {
            StateKind::Idle(s) => s.update(dt),
            StateKind::Job(s) => s.update(ctx, dt),
            StateKind::Haul(s) => s.update(ctx),
            StateKind::Dump(s) => s.update(ctx),
            StateKind::Move(s) => s.update(ctx, dt),
        }
    }

    fn interrupt(&mut self, ctx: &mut AgentCtx) {
        match self {
            StateKind::Job(s) => s.interrupt(ctx),
            StateKind::Haul(s) => s.interrupt(ctx),
            StateKind::Move(s) => s.interrupt(ctx),
            StateKind::Idle(_) | StateKind::Dump(_) => {}
        }
    }
}

/// A state plus the state to resume when it finishes.
#[derive(Debug, Clone)]
pub struct State {
    kind: StateKind,
    next: Option<Box<State>>,
}

impl State {
    pub fn new(kind: StateKind) -> Self {
        Self { kind, next: None }
    }

    pub fn with_next(kind: StateKind, next: State) -> Self {
        Self {
            kind,
            next: Some(Box::new(next)),
        }
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn next(&self) -> Option<&State> {
        self.next.as_deref()
    }

    /// Interrupt the continuation first, drop it, then clean up this state.
    pub fn interrupt(&mut self, ctx: &mut AgentCtx) {
        if let Some(mut next) = self.next.take() {
            next.interrupt(ctx);
        }
        log::debug!("{} {}: interrupt", ctx.agent.name, self.name());
        self.kind.interrupt(ctx);
    }
}

/// The state chain of one agent, plus states waiting to start.
#[derive(Debug, Default)]
pub struct Brain {
    state: Option<State>,
    queued: VecDeque<StateKind>,
}

impl Brain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&State> {
        self.state.as_ref()
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.state.as_ref().map(State::name)
    }

    pub fn has_state(&self) -> bool {
        self.state.is_some()
    }

    /// Names along the chain, live state first.
    pub fn chain(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let mut cursor = self.state.as_ref();
        while let Some(state) = cursor {
            names.push(state.name());
            cursor = state.next();
        }
        names
    }

    /// Job the chain is working on, if any.
    pub fn current_job(&self) -> Option<JobId> {
        let mut cursor = self.state.as_ref();
        while let Some(state) = cursor {
            if let StateKind::Job(job) = state.kind() {
                return Some(job.job());
            }
            cursor = state.next();
        }
        None
    }

    /// Interrupt whatever is running and start `kind`.
    pub fn set_state(&mut self, ctx: &mut AgentCtx, kind: StateKind) {
        self.start(ctx, State::new(kind));
    }

    /// Make a prepared chain live, replacing (and interrupting) the old one.
    pub fn start(&mut self, ctx: &mut AgentCtx, mut state: State) {
        self.interrupt(ctx);
        log::debug!("{}: start {}", ctx.agent.name, state.name());
        state.kind.enter(ctx);
        self.state = Some(state);
    }

    /// Tear down the whole chain. The agent is left with no state.
    pub fn interrupt(&mut self, ctx: &mut AgentCtx) {
        if let Some(mut state) = self.state.take() {
            state.interrupt(ctx);
        }
    }

    /// Queue a state to start once the agent has nothing to do.
    pub fn queue_state(&mut self, kind: StateKind) {
        self.queued.push_back(kind);
    }

    /// Drop every queued state, returning them.
    pub fn clear_queue(&mut self) -> Vec<StateKind> {
        self.queued.drain(..).collect()
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn pop_queued(&mut self) -> Option<StateKind> {
        self.queued.pop_front()
    }

    /// Step the live state once and apply its transition.
    pub fn update(&mut self, ctx: &mut AgentCtx, dt: f32) {
        let Some(mut state) = self.state.take() else {
            return;
        };
        match state.kind.update(ctx, dt) {
            Transition::Continue => self.state = Some(state),
            Transition::Push(kind) => {
                log::debug!(
                    "{} {}: push {}",
                    ctx.agent.name,
                    state.name(),
                    kind.name()
                );
                let mut pushed = State::with_next(kind, state);
                pushed.kind.enter(ctx);
                self.state = Some(pushed);
            }
            Transition::Finished => {
                log::debug!("{} {}: finished", ctx.agent.name, state.name());
                self.state = state.next.take().map(|next| *next);
            }
            Transition::Interrupt => state.interrupt(ctx),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;
    use crate::jobs::{Job, JobPriority};
    use tilework_logic::grid::TilePos;
    use tilework_logic::inventory::Inventory;

    #[test]
    fn test_finished_leaf_leaves_no_state() {
        let mut h = Harness::new(3, 3, TilePos::new(0, 0));
        let mut brain = Brain::new();
        brain.set_state(&mut h.ctx(), StateKind::idle());
        assert_eq!(brain.current_name(), Some("Idle"));

        for _ in 0..200 {
            brain.update(&mut h.ctx(), 0.1);
        }
        assert!(!brain.has_state());
    }

    #[test]
    fn test_interrupt_tears_down_job_and_move() {
        let mut h = Harness::new(6, 6, TilePos::new(0, 0));
        let me = h.id();
        let material = TilePos::new(4, 4);
        h.tiles.place_inventory(material, Inventory::new("Steel", 5, 50));
        let id = h.jobs.post(Job::new(JobPriority::High).at(TilePos::new(5, 0)), &h.tiles);
        assert_eq!(h.jobs.take_job_for(me, None, &h.tiles), Some(id));
        h.tiles.claim_inventory(material, me, 5);

        let route = h
            .tiles
            .path_to_tile(TilePos::new(0, 0), material, false)
            .unwrap();
        let chain = State::with_next(
            StateKind::job(id),
            State::new(StateKind::move_along(route, Goal::Tile(material))),
        );
        let mut brain = Brain::new();
        brain.start(&mut h.ctx(), chain);
        assert_eq!(brain.chain(), vec!["Job", "Move"]);
        assert_eq!(h.jobs.get(id).and_then(Job::worker), Some(me));

        brain.interrupt(&mut h.ctx());
        assert!(!brain.has_state());
        // Move released its claim, Job went back to the queue unworked
        assert_eq!(h.tiles.inventory_at(material).map(|i| i.claimed()), Some(0));
        assert!(h.jobs.queue().contains(id));
        assert_eq!(h.jobs.queue().priority_of(id), Some(JobPriority::High));
        assert!(!h.jobs.get(id).is_some_and(Job::is_being_worked));
    }

    #[test]
    fn test_interrupting_a_state_clears_its_continuation() {
        let mut h = Harness::new(3, 3, TilePos::new(0, 0));
        let mut state = State::with_next(StateKind::idle(), State::new(StateKind::dump()));
        state.interrupt(&mut h.ctx());
        assert!(state.next().is_none());
    }

    #[test]
    fn test_push_and_resume() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        h.agent.carried = Some(Inventory::new("Wood", 2, 50));
        // Occupy the start tile so the dump has to walk
        h.tiles.place_inventory(TilePos::new(0, 0), Inventory::new("Steel", 1, 50));

        let mut brain = Brain::new();
        brain.set_state(&mut h.ctx(), StateKind::dump());
        brain.update(&mut h.ctx(), 0.0);
        assert_eq!(brain.chain(), vec!["Move", "Dump"]);

        for _ in 0..100 {
            brain.update(&mut h.ctx(), 0.05);
            if !brain.has_state() {
                break;
            }
        }
        assert!(!brain.has_state());
        assert!(h.agent.carried.is_none());
        assert_ne!(h.agent.tile, TilePos::new(0, 0));
        assert_eq!(h.tiles.inventory_at(h.agent.tile).map(|i| i.stack_size), Some(2));
    }

    #[test]
    fn test_queue_state_fifo() {
        let mut brain = Brain::new();
        brain.queue_state(StateKind::idle());
        brain.queue_state(StateKind::dump());
        assert_eq!(brain.queued_len(), 2);
        assert_eq!(brain.pop_queued().map(|s| s.name()), Some("Idle"));
        let dropped: Vec<_> = brain.clear_queue().iter().map(StateKind::name).collect();
        assert_eq!(dropped, vec!["Dump"]);
        assert!(brain.pop_queued().is_none());
    }
}
