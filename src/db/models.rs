mod activity_log;
mod agent;
mod goal;
mod task;
mod workspace;

pub use activity_log::*;
pub use agent::*;
pub use goal::*;
pub use task::*;
pub use workspace::*;
