//! The job arena plus its queue.
//!
//! Every live job is owned here. Completion and cancellation remove the job
//! from the arena after firing its callbacks, and are recorded so systems
//! can react on the next tick.

use super::job::{Job, JobId, JobOutcome, WorkProgress};
use super::queue::{JobQueue, Placement};
use crate::config::SimConfig;
use crate::world::TileWorld;
use std::collections::HashMap;
use tilework_logic::inventory::{ClaimantId, Inventory};

/// Owns all live jobs and the queue of pending ones.
#[derive(Debug)]
pub struct JobBoard {
    jobs: HashMap<JobId, Job>,
    queue: JobQueue,
    next_id: u64,
    finished: Vec<(JobId, JobOutcome)>,
    max_stack_size: u32,
    spill_radius: i32,
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

impl JobBoard {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            jobs: HashMap::new(),
            queue: JobQueue::new(),
            next_id: 1,
            finished: Vec::new(),
            max_stack_size: config.max_stack_size,
            spill_radius: config.spill_radius,
        }
    }

    fn insert(&mut self, mut job: Job) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        job.id = id;
        self.jobs.insert(id, job);
        id
    }

    /// Add a job and queue it (or park it, see [`JobQueue::enqueue_checked`]).
    pub fn post(&mut self, job: Job, world: &TileWorld) -> JobId {
        let id = self.insert(job);
        if let Some(job) = self.jobs.get(&id) {
            self.queue.enqueue_checked(job, world);
        }
        id
    }

    /// Add a job without queuing it. Used for jobs handed straight to an agent.
    pub fn post_unqueued(&mut self, job: Job) -> JobId {
        self.insert(job)
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.jobs.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut JobQueue {
        &mut self.queue
    }

    /// Subscribe to every enqueue.
    pub fn on_job_created(&mut self, f: impl FnMut(&Job) + 'static) {
        self.queue.subscribe(f);
    }

    /// Take the first queued job `agent` could work, see [`JobQueue::get_job`].
    pub fn take_job_for(
        &mut self,
        agent: ClaimantId,
        carried: Option<&Inventory>,
        world: &TileWorld,
    ) -> Option<JobId> {
        self.queue.get_job(&self.jobs, agent, carried, world)
    }

    /// Pull a job out of the queue for a specific agent.
    pub fn claim_for(&mut self, id: JobId, agent: ClaimantId) -> bool {
        let Some(job) = self.jobs.get_mut(&id) else {
            return false;
        };
        if job.worker.is_some_and(|w| w != agent) {
            return false;
        }
        self.queue.remove(id);
        job.worker = Some(agent);
        true
    }

    /// Hand materials to a job. Returns what it did not want.
    pub fn deliver(&mut self, id: JobId, inv: Inventory) -> Option<Inventory> {
        match self.jobs.get_mut(&id) {
            Some(job) => job.deliver(inv),
            None => Some(inv),
        }
    }

    /// Work a job for `dt` seconds, finishing it if that completes it.
    pub fn work(&mut self, id: JobId, dt: f32) -> Option<WorkProgress> {
        let job = self.jobs.get_mut(&id)?;
        let progress = job.do_work(dt);
        match progress {
            WorkProgress::InProgress => {}
            WorkProgress::Repeated => {
                log::info!("{} '{}' completed a cycle", id, job.name);
                job.fire_completed();
            }
            WorkProgress::Completed => {
                if let Some(mut job) = self.jobs.remove(&id) {
                    log::info!("{} '{}' completed", id, job.name);
                    self.queue.remove(id);
                    job.fire_completed();
                    job.fire_stopped(JobOutcome::Completed);
                    self.finished.push((id, JobOutcome::Completed));
                }
            }
        }
        Some(progress)
    }

    /// Cancel a job: fire its stopped callbacks and spill delivered materials.
    ///
    /// Completion callbacks are never fired. Returns false for unknown ids.
    pub fn cancel(&mut self, id: JobId, world: &mut TileWorld) -> bool {
        let Some(mut job) = self.jobs.remove(&id) else {
            return false;
        };
        self.queue.remove(id);
        log::info!("{} '{}' cancelled", id, job.name);
        job.fire_stopped(JobOutcome::Cancelled);

        if let Some(site) = job.site {
            for (kind, amount) in std::mem::take(&mut job.held) {
                if amount == 0 {
                    continue;
                }
                let inv = Inventory::new(kind, amount, self.max_stack_size);
                world.place_inventory_around(site, inv, self.spill_radius);
            }
        }
        self.finished.push((id, JobOutcome::Cancelled));
        true
    }

    /// Give up on a job after a failure.
    ///
    /// A need job is cancelled. Anything else drops one priority tier and
    /// goes back through triage.
    pub fn abandon(&mut self, id: JobId, agent: ClaimantId, world: &mut TileWorld) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.worker == Some(agent) {
            job.worker = None;
        }
        if job.is_need {
            log::warn!("{} '{}' abandoned, cancelling need job", id, job.name);
            self.cancel(id, world);
            return;
        }
        job.priority = job.priority.lower();
        log::warn!("{} '{}' abandoned, requeued as {:?}", id, job.name, job.priority);
        if let Some(job) = self.jobs.get(&id) {
            self.queue.enqueue_checked(job, world);
        }
    }

    /// Put a job back after its worker was interrupted. Priority is kept.
    pub fn release(&mut self, id: JobId, agent: ClaimantId, world: &mut TileWorld) {
        let Some(job) = self.jobs.get_mut(&id) else {
            return;
        };
        if job.worker != Some(agent) {
            return;
        }
        job.worker = None;
        if job.is_need {
            self.cancel(id, world);
            return;
        }
        log::debug!("{} released by interrupted worker", id);
        if let Some(job) = self.jobs.get(&id) {
            self.queue.enqueue_checked(job, world);
        }
    }

    /// Return a job that was handed to an agent but never started.
    ///
    /// Need jobs are cancelled, anything else goes back through triage.
    pub fn hand_back(&mut self, id: JobId, world: &mut TileWorld) {
        let Some(job) = self.jobs.get(&id) else {
            return;
        };
        if job.is_need {
            self.cancel(id, world);
        } else if job.worker.is_none() {
            log::debug!("{} handed back unstarted", id);
            self.queue.enqueue_checked(job, world);
        }
    }

    pub fn record_cant_reach(&mut self, id: JobId, agent: ClaimantId) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.cant_reach.insert(agent);
        }
    }

    /// Forget every can't-reach record. Walkability changed, so they may be wrong.
    pub fn clear_cant_reach(&mut self) {
        for job in self.jobs.values_mut() {
            job.cant_reach.clear();
        }
    }

    pub fn reevaluate_waiting(&mut self, kind: &str, world: &TileWorld) {
        self.queue.reevaluate_waiting(kind, &self.jobs, world);
    }

    pub fn reevaluate_unreachable(&mut self, world: &TileWorld) {
        self.queue.reevaluate_unreachable(&self.jobs, world);
    }

    /// Re-triage a job that is already on the board.
    pub fn requeue(&mut self, id: JobId, world: &TileWorld) -> Option<Placement> {
        let job = self.jobs.get(&id)?;
        Some(self.queue.enqueue_checked(job, world))
    }

    /// Jobs stopped since the last call.
    pub fn take_finished(&mut self) -> Vec<(JobId, JobOutcome)> {
        std::mem::take(&mut self.finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobPriority;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tilework_logic::grid::TilePos;

    #[test]
    fn test_complete_fires_completed_then_stopped() {
        let world = TileWorld::new(4, 4);
        let mut board = JobBoard::default();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut job = Job::new(JobPriority::High).at(TilePos::new(1, 1)).with_work_time(1.0);
        let l = Rc::clone(&log);
        job.on_completed(move |_| l.borrow_mut().push("completed"));
        let l = Rc::clone(&log);
        job.on_stopped(move |_, outcome| l.borrow_mut().push(match outcome {
            JobOutcome::Completed => "stopped:completed",
            JobOutcome::Cancelled => "stopped:cancelled",
        }));

        let id = board.post(job, &world);
        assert_eq!(board.work(id, 0.5), Some(WorkProgress::InProgress));
        assert_eq!(board.work(id, 0.5), Some(WorkProgress::Completed));
        assert!(!board.contains(id));
        assert!(!board.queue().contains(id));
        assert_eq!(*log.borrow(), vec!["completed", "stopped:completed"]);
        assert_eq!(board.take_finished(), vec![(id, JobOutcome::Completed)]);
    }

    #[test]
    fn test_cancel_never_fires_completed_and_spills_materials() {
        let mut world = TileWorld::new(4, 4);
        let mut board = JobBoard::default();
        let completed = Rc::new(RefCell::new(0));

        let site = TilePos::new(2, 2);
        let mut job = Job::new(JobPriority::High).at(site);
        job.request("Steel", 5, 5);
        let c = Rc::clone(&completed);
        job.on_completed(move |_| *c.borrow_mut() += 1);
        let id = board.post_unqueued(job);
        board.deliver(id, Inventory::new("Steel", 3, 50));

        assert!(board.cancel(id, &mut world));
        assert!(!board.cancel(id, &mut world));
        assert_eq!(*completed.borrow(), 0);
        assert_eq!(world.inventory_at(site).map(|i| i.stack_size), Some(3));
    }

    #[test]
    fn test_abandon_drops_one_tier() {
        let mut world = TileWorld::new(4, 4);
        let mut board = JobBoard::default();
        let id = board.post(Job::new(JobPriority::High).at(TilePos::new(1, 1)), &world);

        let taken = board.take_job_for(9, None, &world);
        assert_eq!(taken, Some(id));
        assert!(board.claim_for(id, 9));

        board.abandon(id, 9, &mut world);
        let job = board.get(id).unwrap();
        assert_eq!(job.priority, JobPriority::Medium);
        assert!(!job.is_being_worked());
        assert_eq!(board.queue().priority_of(id), Some(JobPriority::Medium));
    }

    #[test]
    fn test_abandoned_need_job_is_cancelled() {
        let mut world = TileWorld::new(4, 4);
        let mut board = JobBoard::default();
        let id = board.post_unqueued(Job::new(JobPriority::High).at(TilePos::new(1, 1)).need());
        board.claim_for(id, 3);

        board.abandon(id, 3, &mut world);
        assert!(!board.contains(id));
        assert_eq!(board.take_finished(), vec![(id, JobOutcome::Cancelled)]);
    }

    #[test]
    fn test_release_keeps_priority() {
        let mut world = TileWorld::new(4, 4);
        let mut board = JobBoard::default();
        let id = board.post(Job::new(JobPriority::High).at(TilePos::new(1, 1)), &world);
        board.take_job_for(1, None, &world);
        board.claim_for(id, 1);

        // Someone else cannot release it
        board.release(id, 2, &mut world);
        assert!(!board.queue().contains(id));

        board.release(id, 1, &mut world);
        assert_eq!(board.queue().priority_of(id), Some(JobPriority::High));
    }

    #[test]
    fn test_repeating_job_stays_on_board() {
        let world = TileWorld::new(2, 2);
        let mut board = JobBoard::default();
        let id = board.post(Job::new(JobPriority::Low).with_work_time(1.0).repeating(), &world);
        assert_eq!(board.work(id, 1.0), Some(WorkProgress::Repeated));
        assert!(board.contains(id));
        assert!(board.take_finished().is_empty());
    }
}
