//! A single unit of work: where, what materials, how long, who cares.

use crate::world::TileWorld;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tilework_logic::grid::TilePos;
use tilework_logic::inventory::{ClaimantId, Inventory};
use tilework_logic::pathfinding::Goal;

/// Handle to a job on the [`JobBoard`](super::JobBoard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Priority tier. Declaration order is dequeue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobPriority {
    High,
    Medium,
    Low,
}

impl JobPriority {
    pub const ALL: [JobPriority; 3] = [JobPriority::High, JobPriority::Medium, JobPriority::Low];

    /// One tier down. Low stays Low.
    pub fn lower(self) -> Self {
        match self {
            JobPriority::High => JobPriority::Medium,
            JobPriority::Medium | JobPriority::Low => JobPriority::Low,
        }
    }

    pub(crate) fn tier(self) -> usize {
        self as usize
    }
}

/// How a job stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Completed,
    Cancelled,
}

/// Result of one work tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkProgress {
    /// Not done yet, or still waiting on materials.
    InProgress,
    /// Done. The job stops.
    Completed,
    /// Done, and the timer was reset for another cycle.
    Repeated,
}

/// A material requirement: at least `min`, at most `max` units of `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedItem {
    pub kind: String,
    pub min: u32,
    pub max: u32,
}

pub type CompletedCallback = Box<dyn FnMut(&Job)>;
pub type StoppedCallback = Box<dyn FnMut(&Job, JobOutcome)>;

/// A unit of work.
pub struct Job {
    pub(crate) id: JobId,
    pub name: String,
    /// Where the work happens. `None` until resolved from `site_furniture`.
    pub site: Option<TilePos>,
    /// Resolve the site to the nearest furniture of this kind.
    pub site_furniture: Option<String>,
    /// Work from the site or any of its 8 neighbours.
    pub adjacent: bool,
    pub requested: BTreeMap<String, RequestedItem>,
    /// Materials delivered so far, by kind.
    pub held: BTreeMap<String, u32>,
    pub priority: JobPriority,
    /// Restores an agent need. Cancelled rather than re-queued on failure.
    pub is_need: bool,
    pub can_take_from_stockpile: bool,
    /// Workable as soon as any requested material is held.
    pub accepts_any: bool,
    /// Start over after completing instead of stopping.
    pub repeats: bool,
    pub time_required: f32,
    /// Seconds of work left.
    pub work_left: f32,
    pub(crate) worker: Option<ClaimantId>,
    pub(crate) cant_reach: BTreeSet<ClaimantId>,
    on_completed: Vec<CompletedCallback>,
    on_stopped: Vec<StoppedCallback>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("site", &self.site)
            .field("priority", &self.priority)
            .field("held", &self.held)
            .field("work_left", &self.work_left)
            .field("worker", &self.worker)
            .finish_non_exhaustive()
    }
}

impl Job {
    pub fn new(priority: JobPriority) -> Self {
        Self {
            id: JobId(0),
            name: "Job".into(),
            site: None,
            site_furniture: None,
            adjacent: false,
            requested: BTreeMap::new(),
            held: BTreeMap::new(),
            priority,
            is_need: false,
            can_take_from_stockpile: false,
            accepts_any: false,
            repeats: false,
            time_required: 0.0,
            work_left: 0.0,
            worker: None,
            cant_reach: BTreeSet::new(),
            on_completed: Vec::new(),
            on_stopped: Vec::new(),
        }
    }

    // ── Builders ───────────────────────────────────────────────────────

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn at(mut self, site: TilePos) -> Self {
        self.site = Some(site);
        self
    }

    pub fn at_furniture(mut self, kind: impl Into<String>) -> Self {
        self.site_furniture = Some(kind.into());
        self
    }

    pub fn adjacent(mut self) -> Self {
        self.adjacent = true;
        self
    }

    pub fn with_work_time(mut self, seconds: f32) -> Self {
        self.time_required = seconds;
        self.work_left = seconds;
        self
    }

    pub fn need(mut self) -> Self {
        self.is_need = true;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeats = true;
        self
    }

    pub fn from_stockpile(mut self) -> Self {
        self.can_take_from_stockpile = true;
        self
    }

    pub fn accepting_any(mut self) -> Self {
        self.accepts_any = true;
        self
    }

    /// Require between `min` and `max` units of `kind`.
    pub fn request(&mut self, kind: impl Into<String>, min: u32, max: u32) -> &mut Self {
        let kind = kind.into();
        self.requested.insert(
            kind.clone(),
            RequestedItem {
                kind,
                min,
                max: max.max(min),
            },
        );
        self
    }

    pub fn on_completed(&mut self, f: impl FnMut(&Job) + 'static) -> &mut Self {
        self.on_completed.push(Box::new(f));
        self
    }

    pub fn on_stopped(&mut self, f: impl FnMut(&Job, JobOutcome) + 'static) -> &mut Self {
        self.on_stopped.push(Box::new(f));
        self
    }

    // ── State ──────────────────────────────────────────────────────────

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn worker(&self) -> Option<ClaimantId> {
        self.worker
    }

    pub fn is_being_worked(&self) -> bool {
        self.worker.is_some()
    }

    pub fn cant_reach(&self, agent: ClaimantId) -> bool {
        self.cant_reach.contains(&agent)
    }

    pub fn held_amount(&self, kind: &str) -> u32 {
        self.held.get(kind).copied().unwrap_or(0)
    }

    /// How many more units of `kind` this job would accept.
    pub fn amount_desired(&self, kind: &str) -> u32 {
        self.requested
            .get(kind)
            .map_or(0, |item| item.max.saturating_sub(self.held_amount(kind)))
    }

    /// Kinds the job still wants, in name order.
    pub fn desired_kinds(&self) -> Vec<String> {
        self.requested
            .keys()
            .filter(|k| self.amount_desired(k) > 0)
            .cloned()
            .collect()
    }

    pub fn material_needs_met(&self) -> bool {
        if self.accepts_any && self.held.values().any(|&n| n > 0) {
            return true;
        }
        self.requested
            .values()
            .all(|item| self.held_amount(&item.kind) >= item.min)
    }

    /// Whether the materials still missing can be sourced somewhere.
    ///
    /// Counts what `carried` already holds.
    pub fn materials_available(&self, world: &TileWorld, carried: Option<&Inventory>) -> bool {
        self.first_missing_kind(world, carried).is_none()
    }

    /// The kind to wait on when materials cannot be sourced.
    ///
    /// `"*"` for jobs that accept any material.
    pub fn first_missing_kind(
        &self,
        world: &TileWorld,
        carried: Option<&Inventory>,
    ) -> Option<String> {
        if self.material_needs_met() {
            return None;
        }
        let sourceable = |kind: &str| {
            carried.is_some_and(|c| c.kind == kind && !c.is_empty())
                || world.has_inventory_of_kind(kind, self.can_take_from_stockpile)
        };
        if self.accepts_any {
            let any = self
                .requested
                .keys()
                .any(|k| self.amount_desired(k) > 0 && sourceable(k));
            return (!any).then(|| super::ANY_KIND.to_string());
        }
        self.requested
            .values()
            .filter(|item| self.held_amount(&item.kind) < item.min)
            .find(|item| !sourceable(&item.kind))
            .map(|item| item.kind.clone())
    }

    /// Take what the job wants from `inv`. Returns the rest.
    pub fn deliver(&mut self, mut inv: Inventory) -> Option<Inventory> {
        let wanted = self.amount_desired(&inv.kind);
        if wanted == 0 {
            return Some(inv);
        }
        let taken = inv.split(wanted);
        *self.held.entry(taken.kind).or_insert(0) += taken.stack_size;
        (!inv.is_empty()).then_some(inv)
    }

    /// Goal for "standing at the job site".
    pub fn site_goal(&self) -> Option<Goal> {
        self.site.map(|site| {
            if self.adjacent {
                Goal::Adjacent(site)
            } else {
                Goal::Tile(site)
            }
        })
    }

    pub fn is_at_site(&self, pos: TilePos) -> bool {
        match self.site {
            Some(site) if self.adjacent => pos == site || pos.is_adjacent(site),
            Some(site) => pos == site,
            None => false,
        }
    }

    /// Whether an agent could stand at the site at all.
    ///
    /// Says nothing about whether a particular agent can walk there.
    pub fn is_site_reachable(&self, world: &TileWorld) -> bool {
        let grid = world.grid();
        match (self.site, &self.site_furniture) {
            (Some(site), _) if self.adjacent => {
                grid.is_walkable(site)
                    || grid
                        .neighbors(site, true)
                        .into_iter()
                        .any(|n| grid.is_walkable(n))
            }
            (Some(site), _) => {
                let neighbors = grid.neighbors(site, true);
                grid.is_walkable(site)
                    && (neighbors.is_empty() || grid.is_reachable_from_any_neighbor(site))
            }
            (None, Some(kind)) => world.furniture_count(kind) > 0,
            (None, None) => true,
        }
    }

    /// Apply `dt` seconds of work.
    ///
    /// No progress is made until the material needs are met.
    pub fn do_work(&mut self, dt: f32) -> WorkProgress {
        if !self.material_needs_met() {
            return WorkProgress::InProgress;
        }
        self.work_left -= dt;
        if self.work_left > 0.0 {
            return WorkProgress::InProgress;
        }
        if self.repeats {
            self.work_left += self.time_required.max(f32::EPSILON);
            WorkProgress::Repeated
        } else {
            WorkProgress::Completed
        }
    }

    pub(crate) fn fire_completed(&mut self) {
        let mut callbacks = std::mem::take(&mut self.on_completed);
        for cb in &mut callbacks {
            cb(self);
        }
        callbacks.append(&mut self.on_completed);
        self.on_completed = callbacks;
    }

    pub(crate) fn fire_stopped(&mut self, outcome: JobOutcome) {
        let mut callbacks = std::mem::take(&mut self.on_stopped);
        for cb in &mut callbacks {
            cb(self, outcome);
        }
        callbacks.append(&mut self.on_stopped);
        self.on_stopped = callbacks;
    }
}
