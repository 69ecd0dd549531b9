pub mod payload;
pub mod policy;
pub mod signature;
pub mod twitch;
