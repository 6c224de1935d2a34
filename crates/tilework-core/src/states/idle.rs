use super::{AgentCtx, Transition};
use rand::Rng;

/// Stand around for a random while, then ask for work again.
#[derive(Debug, Clone, Default)]
pub struct IdleState {
    duration: f32,
    elapsed: f32,
}

impl IdleState {
    pub(super) fn enter(&mut self, ctx: &mut AgentCtx) {
        let (min, max) = (ctx.config.idle_time_min, ctx.config.idle_time_max);
        self.duration = if max > min {
            ctx.rng.gen_range(min..=max)
        } else {
            min
        };
        self.elapsed = 0.0;
    }

    pub(super) fn update(&mut self, dt: f32) -> Transition {
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            Transition::Finished
        } else {
            Transition::Continue
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}
