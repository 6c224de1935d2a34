//! Agent needs that grow over time and are restored by need jobs.

use crate::jobs::JobId;
use serde::{Deserialize, Serialize};

/// One need, e.g. sleep or food.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Need {
    pub name: String,
    /// 0.0 (satisfied) to 1.0 (critical)
    pub amount: f32,
    /// Increase per sim hour
    pub growth_per_hour: f32,
    /// Furniture kind that restores this need, if any
    pub restore_furniture: Option<String>,
    /// Seconds of work at the restoring furniture
    pub restore_time: f32,
    /// Amount removed by a normal need job
    pub restore_amount: f32,
    /// At 1.0, drop everything and restore on the spot
    pub complete_on_critical: bool,
    /// Need job currently in flight for this need
    #[serde(skip)]
    pub pending_job: Option<JobId>,
    #[serde(skip)]
    pub pending_critical: bool,
}

impl Need {
    pub fn new(name: impl Into<String>, growth_per_hour: f32) -> Self {
        Self {
            name: name.into(),
            amount: 0.0,
            growth_per_hour,
            restore_furniture: None,
            restore_time: 1.0,
            restore_amount: 1.0,
            complete_on_critical: false,
            pending_job: None,
            pending_critical: false,
        }
    }

    pub fn restored_at(mut self, furniture: impl Into<String>, time: f32) -> Self {
        self.restore_furniture = Some(furniture.into());
        self.restore_time = time;
        self
    }

    pub fn critical_fallback(mut self) -> Self {
        self.complete_on_critical = true;
        self
    }

    pub fn grow(&mut self, hours: f32) {
        self.amount = (self.amount + self.growth_per_hour * hours).clamp(0.0, 1.0);
    }

    /// Apply a completed need job. A critical on-the-spot job only restores a quarter.
    pub fn restore(&mut self, critical: bool) {
        let amount = if critical {
            self.restore_amount / 4.0
        } else {
            self.restore_amount
        };
        self.amount = (self.amount - amount).clamp(0.0, 1.0);
    }

    pub fn is_critical(&self) -> bool {
        self.amount >= 1.0
    }
}

/// All needs of one agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Needs {
    pub needs: Vec<Need>,
}

impl Needs {
    pub fn new(needs: Vec<Need>) -> Self {
        Self { needs }
    }

    /// Apply growth over time
    pub fn decay(&mut self, hours: f32) {
        for need in &mut self.needs {
            need.grow(hours);
        }
    }

    /// Index of the most pressing need above `threshold` that has no job yet
    /// and passes `can_restore`.
    pub fn most_urgent(&self, threshold: f32, can_restore: impl Fn(&Need) -> bool) -> Option<usize> {
        self.needs
            .iter()
            .enumerate()
            .filter(|(_, n)| n.pending_job.is_none() && n.amount >= threshold && can_restore(n))
            .max_by(|a, b| a.1.amount.total_cmp(&b.1.amount))
            .map(|(i, _)| i)
    }

    pub fn find_pending_mut(&mut self, job: JobId) -> Option<&mut Need> {
        self.needs.iter_mut().find(|n| n.pending_job == Some(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_clamps_at_one() {
        let mut need = Need::new("Sleep", 0.25);
        need.grow(8.0);
        assert!(need.is_critical());
        assert_eq!(need.amount, 1.0);
    }

    #[test]
    fn test_critical_restore_is_a_quarter() {
        let mut need = Need::new("Food", 1.0);
        need.amount = 1.0;
        need.restore(true);
        assert!((need.amount - 0.75).abs() < 1e-6);
        need.restore(false);
        assert_eq!(need.amount, 0.0);
    }

    #[test]
    fn test_most_urgent_skips_pending() {
        let mut needs = Needs::new(vec![Need::new("Sleep", 0.0), Need::new("Food", 0.0)]);
        needs.needs[0].amount = 0.9;
        needs.needs[1].amount = 0.85;
        assert_eq!(needs.most_urgent(0.8, |_| true), Some(0));
        assert_eq!(needs.most_urgent(0.8, |n| n.name == "Food"), Some(1));

        needs.needs[0].pending_job = Some(JobId(1));
        assert_eq!(needs.most_urgent(0.8, |_| true), Some(1));
        assert_eq!(needs.most_urgent(0.95, |_| true), None);
    }
}
