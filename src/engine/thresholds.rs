//! Dynamic thresholds sized from the workspace itself.
//!
//! `limit = max(20, floor(base × min(agents × 0.3, 2.0) × min(goals × 0.2, 1.5)))`

/// Lower bound for the pending-task limit regardless of workspace size.
pub const MIN_TASK_LIMIT: u32 = 20;

// Multipliers are held in tenths so the floor is exact.
const AGENT_TENTHS_PER_AGENT: u64 = 3;
const AGENT_TENTHS_CAP: u64 = 20;
const GOAL_TENTHS_PER_GOAL: u64 = 2;
const GOAL_TENTHS_CAP: u64 = 15;

/// Maximum number of pending tasks a workspace can carry before it counts
/// as overloaded.
pub fn pending_task_limit(base_limit: u32, agent_count: usize, active_goal_count: usize) -> u32 {
    let agent_tenths = (agent_count as u64)
        .saturating_mul(AGENT_TENTHS_PER_AGENT)
        .min(AGENT_TENTHS_CAP);
    let goal_tenths = (active_goal_count as u64)
        .saturating_mul(GOAL_TENTHS_PER_GOAL)
        .min(GOAL_TENTHS_CAP);

    let scaled = u64::from(base_limit) * agent_tenths * goal_tenths / 100;
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX);
    scaled.max(MIN_TASK_LIMIT)
}
