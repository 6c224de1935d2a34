use super::{AgentCtx, Transition};
use std::collections::VecDeque;
use tilework_logic::grid::TilePos;
use tilework_logic::pathfinding::{Goal, Route};

/// Walk a precomputed route one tile at a time.
///
/// Finishes when the arrival goal is met or the route runs out. If the next
/// tile has become impassable the state finishes early so the state that
/// issued the move can plan again.
#[derive(Debug, Clone)]
pub struct MoveState {
    route: VecDeque<TilePos>,
    arrival: Goal,
    destination: Option<TilePos>,
    next: Option<TilePos>,
    progress: f32,
    step_length: f32,
}

impl MoveState {
    pub fn new(route: Route, arrival: Goal) -> Self {
        let destination = route.destination();
        Self {
            route: route.tiles.into(),
            arrival,
            destination,
            next: None,
            progress: 0.0,
            step_length: 1.0,
        }
    }

    pub fn destination(&self) -> Option<TilePos> {
        self.destination
    }

    pub fn remaining(&self) -> usize {
        self.route.len() + usize::from(self.next.is_some())
    }

    fn advance(&mut self, ctx: &mut AgentCtx) -> bool {
        match self.route.pop_front() {
            Some(next) => {
                self.next = Some(next);
                self.step_length = ctx.agent.tile.step_length(next).max(1.0);
                ctx.agent.next_tile = Some(next);
                true
            }
            None => false,
        }
    }

    fn blocked(&mut self, ctx: &mut AgentCtx) -> Transition {
        log::debug!("{}: next tile blocked, stopping", ctx.agent.name);
        self.release_claim(ctx);
        ctx.agent.stop_walking();
        Transition::Finished
    }

    fn release_claim(&self, ctx: &mut AgentCtx) {
        if let Some(dest) = self.destination {
            let me = ctx.agent_id();
            ctx.world.release_claim(dest, me);
        }
    }

    pub(super) fn update(&mut self, ctx: &mut AgentCtx, dt: f32) -> Transition {
        if self.next.is_none() {
            // The route usually starts with the tile we stand on
            while self.route.front() == Some(&ctx.agent.tile) {
                self.route.pop_front();
            }
            if self.arrival.is_met(ctx.world.grid(), ctx.agent.tile) || !self.advance(ctx) {
                ctx.agent.stop_walking();
                return Transition::Finished;
            }
        }
        let Some(next) = self.next else {
            return Transition::Finished;
        };
        if !ctx.world.is_walkable(next) {
            return self.blocked(ctx);
        }

        let cost = ctx.world.movement_cost(next);
        self.progress += ctx.agent.speed / cost * dt / self.step_length;

        if self.progress >= 1.0 {
            let overshoot = (self.progress - 1.0).clamp(0.0, 1.0);
            ctx.agent.tile = next;
            self.progress = 0.0;

            if self.arrival.is_met(ctx.world.grid(), next) || !self.advance(ctx) {
                ctx.agent.stop_walking();
                return Transition::Finished;
            }
            if let Some(upcoming) = self.next {
                if !ctx.world.is_walkable(upcoming) {
                    return self.blocked(ctx);
                }
            }
            self.progress = overshoot;
        }

        ctx.agent.move_progress = self.progress;
        Transition::Continue
    }

    pub(super) fn interrupt(&mut self, ctx: &mut AgentCtx) {
        self.release_claim(ctx);
        ctx.agent.stop_walking();
    }
}
