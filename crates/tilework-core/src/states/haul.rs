use super::{AgentCtx, StateKind, Transition};
use crate::components::Agent;
use crate::jobs::{Job, JobId};
use crate::world::TileWorld;
use tilework_logic::grid::TilePos;
use tilework_logic::inventory::ClaimantId;
use tilework_logic::pathfinding::Goal;

/// What a hauler does next. Recomputed every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaulAction {
    /// Carrying something the job does not want.
    DumpMaterial,
    /// Go looking for material.
    FindMaterial,
    /// Material the job wants is right here.
    PickupMaterial,
    /// Carrying enough, walk to the job site.
    DeliverMaterial,
    /// At the job site with material in hand.
    DropOffMaterial,
}

/// Fetch materials for a job and bring them to its site.
#[derive(Debug, Clone)]
pub struct HaulState {
    job: JobId,
    no_more_material: bool,
    /// Stack claimed by the last find, until picked up or given up on.
    claimed: Option<TilePos>,
}

/// How much of the stack under the agent it should pick up for `job`.
fn pickup_amount(job: &Job, world: &TileWorld, agent: &Agent, me: ClaimantId) -> u32 {
    let Some(tile) = world.tile_at(agent.tile) else {
        return 0;
    };
    let Some(inv) = tile.inventory.as_ref() else {
        return 0;
    };
    if inv.locked || (tile.is_storage() && !job.can_take_from_stockpile) {
        return 0;
    }
    let mut amount = job
        .amount_desired(&inv.kind)
        .saturating_sub(agent.carried_amount())
        .min(inv.available_to(me));
    if let Some(carried) = &agent.carried {
        if carried.kind != inv.kind {
            return 0;
        }
        amount = amount.min(carried.space());
    }
    amount
}

impl HaulAction {
    /// Decide the next step from the job, the tile underfoot and what is carried.
    pub fn next(
        job: &Job,
        world: &TileWorld,
        agent: &Agent,
        me: ClaimantId,
        no_more_material: bool,
    ) -> HaulAction {
        let at_site = job.is_at_site(agent.tile);
        let go_deliver = if at_site {
            HaulAction::DropOffMaterial
        } else {
            HaulAction::DeliverMaterial
        };
        let go_fetch = if pickup_amount(job, world, agent, me) > 0 {
            HaulAction::PickupMaterial
        } else {
            HaulAction::FindMaterial
        };

        match &agent.carried {
            Some(_) if no_more_material => go_deliver,
            Some(carried) if job.amount_desired(&carried.kind) == 0 => HaulAction::DumpMaterial,
            None => go_fetch,
            Some(carried) => {
                let wanted = job.amount_desired(&carried.kind);
                if wanted <= carried.stack_size || carried.space() == 0 {
                    go_deliver
                } else {
                    go_fetch
                }
            }
        }
    }
}

impl HaulState {
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            no_more_material: false,
            claimed: None,
        }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// Give up on this trip. The job state above notices and abandons the job.
    fn cant_reach(&self, ctx: &mut AgentCtx) -> Transition {
        let me = ctx.agent_id();
        ctx.jobs.record_cant_reach(self.job, me);
        Transition::Finished
    }

    /// Drop the claim from the last find unless it is being picked up now.
    fn settle_claim(&mut self, ctx: &mut AgentCtx, action: HaulAction) {
        let Some(pos) = self.claimed.take() else {
            return;
        };
        if action == HaulAction::PickupMaterial && pos == ctx.agent.tile {
            // take_inventory releases it
            return;
        }
        let me = ctx.agent_id();
        if ctx.world.release_claim(pos, me) {
            log::debug!("{}: unused claim on {pos} released", ctx.agent.name);
        }
    }

    pub(super) fn interrupt(&mut self, ctx: &mut AgentCtx) {
        if let Some(pos) = self.claimed.take() {
            let me = ctx.agent_id();
            ctx.world.release_claim(pos, me);
        }
    }

    pub(super) fn update(&mut self, ctx: &mut AgentCtx) -> Transition {
        let me = ctx.agent_id();
        let Some(job) = ctx.jobs.get(self.job) else {
            self.interrupt(ctx);
            return Transition::Finished;
        };
        let action = HaulAction::next(job, ctx.world, ctx.agent, me, self.no_more_material);
        log::debug!("{} Haul: next action {:?}", ctx.agent.name, action);
        self.settle_claim(ctx, action);
        let Some(job) = ctx.jobs.get(self.job) else {
            return Transition::Finished;
        };

        match action {
            HaulAction::DumpMaterial => Transition::Push(StateKind::dump()),

            HaulAction::FindMaterial => {
                let kinds = match ctx.agent.carried_kind() {
                    Some(kind) => vec![kind.to_string()],
                    None => job.desired_kinds(),
                };
                let route = ctx.world.path_to_closest_inventory(
                    &kinds,
                    ctx.agent.tile,
                    job.can_take_from_stockpile,
                );
                let found = route.and_then(|r| r.destination().map(|d| (r, d)));
                match found {
                    Some((route, dest)) => {
                        let kind = ctx.world.inventory_at(dest).map(|i| i.kind.clone());
                        let want = kind
                            .map(|k| job.amount_desired(&k).saturating_sub(ctx.agent.carried_amount()))
                            .unwrap_or(0);
                        if ctx.world.claim_inventory(dest, me, want) > 0 {
                            self.claimed = Some(dest);
                        }
                        Transition::Push(StateKind::move_along(route, Goal::Tile(dest)))
                    }
                    None if ctx.agent.carried.is_none() => {
                        log::debug!("{}: nothing to haul for {}", ctx.agent.name, self.job);
                        self.cant_reach(ctx)
                    }
                    None => {
                        self.no_more_material = true;
                        Transition::Continue
                    }
                }
            }

            HaulAction::PickupMaterial => {
                let amount = pickup_amount(job, ctx.world, ctx.agent, me);
                let here = ctx.agent.tile;
                if let Some(inv) = ctx.world.take_inventory(here, amount, Some(me)) {
                    log::debug!("{}: picked up {} {}", ctx.agent.name, inv.stack_size, inv.kind);
                    if let Some(rest) = ctx.agent.pick_up(inv) {
                        if let Some(lost) = ctx.world.place_inventory(here, rest) {
                            log::warn!("{}: dropped {} {}", ctx.agent.name, lost.stack_size, lost.kind);
                        }
                    }
                }
                Transition::Continue
            }

            HaulAction::DeliverMaterial => {
                let route = job
                    .site_goal()
                    .and_then(|goal| ctx.world.find_path(ctx.agent.tile, &goal).map(|r| (r, goal)));
                match route {
                    Some((route, goal)) => Transition::Push(StateKind::move_along(route, goal)),
                    None => self.cant_reach(ctx),
                }
            }

            HaulAction::DropOffMaterial => {
                if let Some(carried) = ctx.agent.carried.take() {
                    log::debug!(
                        "{}: delivering {} {}",
                        ctx.agent.name,
                        carried.stack_size,
                        carried.kind
                    );
                    ctx.agent.carried = ctx.jobs.deliver(self.job, carried);
                }
                // Let the job notice its materials arrived
                ctx.jobs.work(self.job, 0.0);
                Transition::Finished
            }
        }
    }
}
