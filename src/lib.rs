pub mod chart;
pub mod config;
pub mod messages;
pub mod notifier;
pub mod outage;
pub mod ping;
pub mod report;
pub mod scheduler;
pub mod storage;
pub mod types;
