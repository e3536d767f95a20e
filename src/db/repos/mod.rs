pub mod agents;
pub mod goals;
pub mod logs;
pub mod tasks;
pub mod workspaces;
