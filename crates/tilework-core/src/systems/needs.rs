//! Needs system - grows needs over time and hands out need jobs

use crate::components::{Agent, Needs};
use crate::jobs::{Job, JobBoard, JobId, JobOutcome, JobPriority};
use crate::states::{Brain, StateKind};
use crate::world::TileWorld;
use hecs::{Entity, World};

/// Critical needs are worked on the spot, this many times slower.
const CRITICAL_TIME_FACTOR: f32 = 10.0;

/// Grow needs over time (needs increase toward 1.0)
pub fn needs_system(world: &mut World, delta_hours: f32) {
    for (_, needs) in world.query_mut::<&mut Needs>() {
        needs.decay(delta_hours);
    }
}

/// Create need jobs for agents whose needs crossed `threshold`.
///
/// A normal need job targets the restoring furniture and is queued on the
/// agent's brain, to start once the agent is free. A need that hits 1.0 and
/// allows it gets an on-the-spot job instead; those are returned so the
/// caller can interrupt the agent and start them right away.
pub fn assign_need_jobs(
    world: &mut World,
    tiles: &mut TileWorld,
    jobs: &mut JobBoard,
    threshold: f32,
) -> Vec<(Entity, JobId)> {
    let mut urgent = Vec::new();

    for (entity, (agent, needs, brain)) in world.query_mut::<(&Agent, &mut Needs, &mut Brain)>() {
        let critical = needs
            .needs
            .iter()
            .position(|n| n.is_critical() && n.complete_on_critical && !n.pending_critical);
        if let Some(i) = critical {
            let need = &mut needs.needs[i];
            if let Some(old) = need.pending_job.take() {
                jobs.cancel(old, tiles);
            }
            let job = Job::new(JobPriority::High)
                .named(format!("{} (critical)", need.name))
                .at(agent.tile)
                .with_work_time(need.restore_time * CRITICAL_TIME_FACTOR)
                .need();
            let id = jobs.post_unqueued(job);
            log::info!("{}: {} is critical, restoring on the spot", agent.name, need.name);
            need.pending_job = Some(id);
            need.pending_critical = true;
            urgent.push((entity, id));
            continue;
        }

        let restorable = |n: &crate::components::Need| {
            n.restore_furniture
                .as_deref()
                .is_some_and(|kind| tiles.furniture_count(kind) > 0)
        };
        let Some(i) = needs.most_urgent(threshold, restorable) else {
            continue;
        };
        let need = &mut needs.needs[i];
        let Some(kind) = need.restore_furniture.clone() else {
            continue;
        };
        let job = Job::new(JobPriority::High)
            .named(need.name.clone())
            .at_furniture(kind)
            .with_work_time(need.restore_time)
            .need();
        let id = jobs.post_unqueued(job);
        log::debug!("{}: queued {} for {}", agent.name, id, need.name);
        need.pending_job = Some(id);
        brain.queue_state(StateKind::job(id));
    }

    urgent
}

/// Settle needs whose jobs stopped. Completed jobs restore the need.
pub fn apply_finished_need_jobs(world: &mut World, finished: &[(JobId, JobOutcome)]) {
    if finished.is_empty() {
        return;
    }
    for (_, needs) in world.query_mut::<&mut Needs>() {
        for &(id, outcome) in finished {
            let Some(need) = needs.find_pending_mut(id) else {
                continue;
            };
            if outcome == JobOutcome::Completed {
                need.restore(need.pending_critical);
            }
            need.pending_job = None;
            need.pending_critical = false;
        }
    }
}
