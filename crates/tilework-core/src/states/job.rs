use super::{AgentCtx, StateKind, Transition};
use crate::jobs::{JobId, WorkProgress};

/// Work one job from start to finish.
///
/// Resolves the site, pushes Haul until the materials are in, pushes Move
/// to get to the site and then works the timer down. Any failure abandons
/// the job, which drops it a priority tier.
#[derive(Debug, Clone)]
pub struct JobState {
    job: JobId,
}

impl JobState {
    pub fn new(job: JobId) -> Self {
        Self { job }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub(super) fn enter(&mut self, ctx: &mut AgentCtx) {
        let me = ctx.agent_id();
        if !ctx.jobs.claim_for(self.job, me) {
            log::warn!("{}: {} is taken or gone", ctx.agent.name, self.job);
        }
    }

    pub(super) fn interrupt(&mut self, ctx: &mut AgentCtx) {
        let me = ctx.agent_id();
        ctx.jobs.release(self.job, me, ctx.world);
    }

    fn abandon(&self, ctx: &mut AgentCtx, reason: &str) -> Transition {
        log::debug!("{}: abandoning {} ({reason})", ctx.agent.name, self.job);
        let me = ctx.agent_id();
        ctx.jobs.abandon(self.job, me, ctx.world);
        Transition::Finished
    }

    /// Hand over whatever the job wants from the carried stack.
    fn drop_off(&self, ctx: &mut AgentCtx) {
        let wanted = ctx
            .agent
            .carried_kind()
            .zip(ctx.jobs.get(self.job))
            .is_some_and(|(kind, job)| job.amount_desired(kind) > 0);
        if !wanted {
            return;
        }
        if let Some(carried) = ctx.agent.carried.take() {
            ctx.agent.carried = ctx.jobs.deliver(self.job, carried);
        }
    }

    pub(super) fn update(&mut self, ctx: &mut AgentCtx, dt: f32) -> Transition {
        let me = ctx.agent_id();
        let Some(job) = ctx.jobs.get(self.job) else {
            // Stopped elsewhere (completed by a haul drop-off, or cancelled)
            return Transition::Finished;
        };
        if job.cant_reach(me) {
            return self.abandon(ctx, "can't reach");
        }

        if job.site.is_none() {
            let site = match job.site_furniture.clone() {
                Some(kind) => {
                    // With `adjacent` the route ends beside the furniture
                    let found = ctx
                        .world
                        .path_to_furniture(ctx.agent.tile, &kind, job.adjacent)
                        .and_then(|route| route.destination())
                        .and_then(|end| ctx.world.furniture_near(end, &kind));
                    match found {
                        Some(site) => site,
                        None => {
                            ctx.jobs.record_cant_reach(self.job, me);
                            return self.abandon(ctx, "no furniture to work at");
                        }
                    }
                }
                None => ctx.agent.tile,
            };
            if let Some(job) = ctx.jobs.get_mut(self.job) {
                job.site = Some(site);
            }
            return Transition::Continue;
        }

        let at_site = job.is_at_site(ctx.agent.tile);
        if !job.material_needs_met() {
            let carried_kind = ctx.agent.carried_kind();
            if carried_kind.is_some_and(|k| job.amount_desired(k) == 0) {
                return Transition::Push(StateKind::dump());
            }
            if carried_kind.is_some() && at_site {
                self.drop_off(ctx);
                return Transition::Continue;
            }
            if !job.materials_available(ctx.world, ctx.agent.carried.as_ref()) {
                return self.abandon(ctx, "materials unavailable");
            }
            return Transition::Push(StateKind::haul(self.job));
        }

        if !at_site {
            let route = job
                .site_goal()
                .and_then(|goal| ctx.world.find_path(ctx.agent.tile, &goal).map(|r| (r, goal)));
            return match route {
                Some((route, goal)) => Transition::Push(StateKind::move_along(route, goal)),
                None => {
                    ctx.jobs.record_cant_reach(self.job, me);
                    self.abandon(ctx, "no path to site")
                }
            };
        }

        self.drop_off(ctx);
        match ctx.jobs.work(self.job, dt) {
            Some(WorkProgress::InProgress | WorkProgress::Repeated) => Transition::Continue,
            Some(WorkProgress::Completed) | None => Transition::Finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{Job, JobPriority};
    use crate::states::test_support::Harness;
    use crate::states::Brain;
    use tilework_logic::grid::{Furniture, TilePos};
    use tilework_logic::inventory::Inventory;

    fn run_brain(h: &mut Harness, brain: &mut Brain, dt: f32, max_ticks: usize) {
        for _ in 0..max_ticks {
            if !brain.has_state() {
                return;
            }
            brain.update(&mut h.ctx(), dt);
        }
    }

    #[test]
    fn test_missing_site_defaults_to_current_tile() {
        let mut h = Harness::new(3, 3, TilePos::new(1, 2));
        let id = h.jobs.post_unqueued(Job::new(JobPriority::Low));
        let mut state = JobState::new(id);
        state.enter(&mut h.ctx());
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Continue));
        assert_eq!(h.jobs.get(id).and_then(|j| j.site), Some(TilePos::new(1, 2)));
    }

    #[test]
    fn test_site_resolved_from_furniture() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        h.tiles.place_furniture(TilePos::new(3, 3), Furniture::new("Bed", 1.0));
        let id = h.jobs.post_unqueued(Job::new(JobPriority::High).at_furniture("Bed"));
        let mut state = JobState::new(id);
        state.update(&mut h.ctx(), 0.1);
        assert_eq!(h.jobs.get(id).and_then(|j| j.site), Some(TilePos::new(3, 3)));
    }

    #[test]
    fn test_missing_furniture_abandons() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let id = h.jobs.post(Job::new(JobPriority::High).at_furniture("Bed"), &h.tiles);
        let me = h.id();
        assert_eq!(h.jobs.take_job_for(me, None, &h.tiles), None);

        // Hand it over anyway, as a prioritised job would be
        let mut state = JobState::new(id);
        state.enter(&mut h.ctx());
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Finished));
        let job = h.jobs.get(id).unwrap();
        assert_eq!(job.priority, JobPriority::Medium);
        assert!(!job.is_being_worked());
        assert!(job.cant_reach(me));
    }

    #[test]
    fn test_walled_in_furniture_not_retaken() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let forge = TilePos::new(3, 3);
        h.tiles.place_furniture(forge, Furniture::new("Forge", 1.0));
        let ring = h.tiles.grid().neighbors(forge, true);
        for n in ring {
            h.tiles.place_furniture(n, Furniture::wall("Wall"));
        }
        let id = h.jobs.post(Job::new(JobPriority::High).at_furniture("Forge"), &h.tiles);
        let me = h.id();
        assert_eq!(h.jobs.take_job_for(me, None, &h.tiles), Some(id));

        let mut state = JobState::new(id);
        state.enter(&mut h.ctx());
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Finished));
        assert_eq!(h.jobs.get(id).map(|j| j.priority), Some(JobPriority::Medium));
        assert_eq!(h.jobs.take_job_for(me, None, &h.tiles), None);
        assert_eq!(h.jobs.get(id).map(|j| j.priority), Some(JobPriority::Medium));
    }

    #[test]
    fn test_impassable_furniture_worked_from_beside_it() {
        let mut h = Harness::new(8, 8, TilePos::new(0, 0));
        let stove = TilePos::new(5, 5);
        h.tiles.place_furniture(stove, Furniture::wall("Stove"));
        let id = h.jobs.post_unqueued(
            Job::new(JobPriority::High)
                .at_furniture("Stove")
                .adjacent()
                .with_work_time(0.5),
        );

        let mut brain = Brain::new();
        brain.set_state(&mut h.ctx(), StateKind::job(id));
        brain.update(&mut h.ctx(), 0.1);
        assert_eq!(h.jobs.get(id).and_then(|j| j.site), Some(stove));

        run_brain(&mut h, &mut brain, 0.1, 300);
        assert!(h.agent.tile.is_adjacent(stove));
        assert!(!h.jobs.contains(id));
    }

    #[test]
    fn test_walks_to_site_and_works() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let site = TilePos::new(4, 0);
        let id = h
            .jobs
            .post_unqueued(Job::new(JobPriority::High).at(site).with_work_time(0.5));

        let mut brain = Brain::new();
        brain.set_state(&mut h.ctx(), StateKind::job(id));
        brain.update(&mut h.ctx(), 0.1);
        assert_eq!(brain.chain(), vec!["Move", "Job"]);

        run_brain(&mut h, &mut brain, 0.1, 200);
        assert_eq!(h.agent.tile, site);
        assert!(!h.jobs.contains(id));
    }

    #[test]
    fn test_adjacent_job_worked_from_neighbour() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let site = TilePos::new(3, 0);
        h.tiles.place_furniture(site, Furniture::wall("Wall"));
        let id = h
            .jobs
            .post_unqueued(Job::new(JobPriority::High).at(site).adjacent().with_work_time(0.2));

        let mut brain = Brain::new();
        brain.set_state(&mut h.ctx(), StateKind::job(id));
        run_brain(&mut h, &mut brain, 0.1, 200);
        assert!(h.agent.tile.is_adjacent(site));
        assert!(!h.jobs.contains(id));
    }

    #[test]
    fn test_unwanted_cargo_pushes_dump() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let mut job = Job::new(JobPriority::High).at(TilePos::new(4, 4));
        job.request("Steel", 1, 1);
        let id = h.jobs.post_unqueued(job);
        h.tiles.place_inventory(TilePos::new(2, 2), Inventory::new("Steel", 1, 50));
        h.agent.carried = Some(Inventory::new("Wood", 1, 50));

        let mut state = JobState::new(id);
        assert!(matches!(
            state.update(&mut h.ctx(), 0.1),
            Transition::Push(StateKind::Dump(_))
        ));
    }

    #[test]
    fn test_unsourceable_materials_abandon() {
        let mut h = Harness::new(5, 5, TilePos::new(0, 0));
        let mut job = Job::new(JobPriority::Medium).at(TilePos::new(4, 4));
        job.request("Gold", 1, 1);
        let id = h.jobs.post_unqueued(job);

        let mut state = JobState::new(id);
        state.enter(&mut h.ctx());
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Finished));
        // Dropped to Low and parked until Gold shows up
        assert_eq!(h.jobs.get(id).map(|j| j.priority), Some(JobPriority::Low));
        assert_eq!(h.jobs.queue().waiting_count(), 1);
    }

    #[test]
    fn test_walled_off_site_records_cant_reach() {
        let mut h = Harness::new(5, 1, TilePos::new(0, 0));
        h.tiles.place_furniture(TilePos::new(2, 0), Furniture::wall("Wall"));
        let id = h.jobs.post_unqueued(Job::new(JobPriority::High).at(TilePos::new(4, 0)));
        let me = h.id();

        let mut state = JobState::new(id);
        state.enter(&mut h.ctx());
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Finished));
        let job = h.jobs.get(id).unwrap();
        assert!(job.cant_reach(me));
        assert_eq!(job.priority, JobPriority::Medium);
    }

    #[test]
    fn test_carried_material_dropped_at_site() {
        let site = TilePos::new(2, 2);
        let mut h = Harness::new(5, 5, site);
        let mut job = Job::new(JobPriority::High).at(site).with_work_time(1.0);
        job.request("Steel", 3, 3);
        let id = h.jobs.post_unqueued(job);
        h.agent.carried = Some(Inventory::new("Steel", 4, 50));

        let mut state = JobState::new(id);
        assert!(matches!(state.update(&mut h.ctx(), 0.1), Transition::Continue));
        assert_eq!(h.jobs.get(id).map(|j| j.held_amount("Steel")), Some(3));
        assert_eq!(h.agent.carried_amount(), 1);
    }
}
