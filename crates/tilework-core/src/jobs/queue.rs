//! Priority-tiered job queue with parking lists.
//!
//! Jobs are held by id in three FIFO tiers. [`JobQueue::enqueue_checked`]
//! triages a job before queuing it: jobs whose materials cannot be sourced
//! are parked by the missing item type, jobs whose site cannot be stood on
//! are parked as unreachable. Parked jobs come back through
//! [`JobQueue::reevaluate_waiting`] and [`JobQueue::reevaluate_unreachable`].

use super::job::{Job, JobId, JobPriority};
use crate::world::TileWorld;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tilework_logic::inventory::{ClaimantId, Inventory};

/// Waiting-list key for jobs that accept any of their materials.
pub const ANY_KIND: &str = "*";

/// Where [`JobQueue::enqueue_checked`] put a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Queued(JobPriority),
    WaitingFor(String),
    Unreachable,
}

pub type JobCreatedCallback = Box<dyn FnMut(&Job)>;

/// Pending jobs, by priority tier.
#[derive(Default)]
pub struct JobQueue {
    tiers: [VecDeque<JobId>; 3],
    waiting: BTreeMap<String, Vec<JobId>>,
    unreachable: VecDeque<JobId>,
    subscribers: Vec<JobCreatedCallback>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("tiers", &self.tiers)
            .field("waiting", &self.waiting)
            .field("unreachable", &self.unreachable)
            .finish_non_exhaustive()
    }
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with every job passed to `enqueue` or `enqueue_checked`.
    pub fn subscribe(&mut self, f: impl FnMut(&Job) + 'static) {
        self.subscribers.push(Box::new(f));
    }

    fn notify(&mut self, job: &Job) {
        for cb in &mut self.subscribers {
            cb(job);
        }
    }

    /// Append to the job's tier with no triage.
    pub fn enqueue(&mut self, job: &Job) {
        self.remove(job.id());
        self.tiers[job.priority.tier()].push_back(job.id());
        log::debug!("enqueue {} ({:?})", job.id(), job.priority);
        self.notify(job);
    }

    /// Queue the job if it is workable, otherwise park it.
    pub fn enqueue_checked(&mut self, job: &Job, world: &TileWorld) -> Placement {
        self.remove(job.id());
        let missing = if job.requested.is_empty() {
            None
        } else {
            job.first_missing_kind(world, None)
        };
        let placement = if let Some(missing) = missing {
            log::debug!("{} waiting for {missing}", job.id());
            self.waiting.entry(missing.clone()).or_default().push(job.id());
            Placement::WaitingFor(missing)
        } else if !job.is_site_reachable(world) {
            log::debug!("{} can't be reached", job.id());
            self.unreachable.push_back(job.id());
            Placement::Unreachable
        } else {
            self.tiers[job.priority.tier()].push_back(job.id());
            log::debug!("enqueue {} ({:?})", job.id(), job.priority);
            Placement::Queued(job.priority)
        };
        self.notify(job);
        placement
    }

    /// Pop from the highest non-empty tier.
    pub fn dequeue(&mut self) -> Option<JobId> {
        self.tiers.iter_mut().find_map(VecDeque::pop_front)
    }

    /// Take the first queued job `agent` could work right now.
    ///
    /// Jobs that fail triage on the way are moved to the parking lists.
    /// Jobs the agent already failed to reach are skipped but stay queued.
    pub fn get_job(
        &mut self,
        jobs: &HashMap<JobId, Job>,
        agent: ClaimantId,
        carried: Option<&Inventory>,
        world: &TileWorld,
    ) -> Option<JobId> {
        for tier in 0..self.tiers.len() {
            let mut i = 0;
            while i < self.tiers[tier].len() {
                let id = self.tiers[tier][i];
                let Some(job) = jobs.get(&id) else {
                    self.tiers[tier].remove(i);
                    continue;
                };
                if job.cant_reach(agent) || job.is_being_worked() {
                    i += 1;
                    continue;
                }
                if let Some(missing) = job.first_missing_kind(world, carried) {
                    log::debug!("{id} failed material check, parking on {missing}");
                    self.tiers[tier].remove(i);
                    self.waiting.entry(missing).or_default().push(id);
                    continue;
                }
                if !job.is_site_reachable(world) {
                    self.tiers[tier].remove(i);
                    self.unreachable.push_back(id);
                    continue;
                }
                self.tiers[tier].remove(i);
                return Some(id);
            }
        }
        None
    }

    /// Drop a job from every list. Returns whether it was anywhere.
    pub fn remove(&mut self, id: JobId) -> bool {
        let mut found = false;
        for tier in &mut self.tiers {
            let before = tier.len();
            tier.retain(|&j| j != id);
            found |= tier.len() != before;
        }
        for list in self.waiting.values_mut() {
            let before = list.len();
            list.retain(|&j| j != id);
            found |= list.len() != before;
        }
        let before = self.unreachable.len();
        self.unreachable.retain(|&j| j != id);
        found |= self.unreachable.len() != before;
        found
    }

    /// Whether the job sits in a tier (not parked).
    pub fn contains(&self, id: JobId) -> bool {
        self.tiers.iter().any(|t| t.contains(&id))
    }

    pub fn is_parked(&self, id: JobId) -> bool {
        self.unreachable.contains(&id) || self.waiting.values().any(|l| l.contains(&id))
    }

    pub fn priority_of(&self, id: JobId) -> Option<JobPriority> {
        JobPriority::ALL
            .into_iter()
            .find(|p| self.tiers[p.tier()].contains(&id))
    }

    /// Queued jobs in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = JobId> + '_ {
        self.tiers.iter().flat_map(|t| t.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    pub fn unreachable_count(&self) -> usize {
        self.unreachable.len()
    }

    /// Re-triage jobs waiting on `kind`, and those accepting any kind.
    pub fn reevaluate_waiting(
        &mut self,
        kind: &str,
        jobs: &HashMap<JobId, Job>,
        world: &TileWorld,
    ) {
        let mut ids = self.waiting.remove(kind).unwrap_or_default();
        if kind != ANY_KIND {
            ids.extend(self.waiting.remove(ANY_KIND).unwrap_or_default());
        }
        if !ids.is_empty() {
            log::debug!("new {kind}: re-checking {} waiting jobs", ids.len());
        }
        for id in ids {
            if let Some(job) = jobs.get(&id) {
                self.enqueue_checked(job, world);
            }
        }
    }

    /// Re-triage every job parked as unreachable.
    pub fn reevaluate_unreachable(&mut self, jobs: &HashMap<JobId, Job>, world: &TileWorld) {
        let ids: Vec<JobId> = self.unreachable.drain(..).collect();
        if !ids.is_empty() {
            log::debug!("re-checking reachability of {} jobs", ids.len());
        }
        for id in ids {
            if let Some(job) = jobs.get(&id) {
                self.enqueue_checked(job, world);
            }
        }
    }
}
