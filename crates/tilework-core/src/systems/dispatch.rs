//! Dispatch system - gives agents with no state something to do

use crate::states::{AgentCtx, Brain, StateKind};

/// Pick the next state for an agent whose chain has run out.
///
/// Queued states come first, then the first job off the queue this agent
/// could work. An agent with nothing to do but something in hand dumps it,
/// otherwise it idles.
pub fn choose_state(ctx: &mut AgentCtx, brain: &mut Brain) -> StateKind {
    if let Some(kind) = brain.pop_queued() {
        return kind;
    }
    let me = ctx.agent_id();
    if let Some(id) = ctx.jobs.take_job_for(me, ctx.agent.carried.as_ref(), ctx.world) {
        log::debug!("{}: took {}", ctx.agent.name, id);
        return StateKind::job(id);
    }
    if ctx.agent.carried.is_some() {
        return StateKind::dump();
    }
    StateKind::idle()
}
