pub mod config;
pub mod metrics;
pub mod server;
pub mod updater;
pub mod vip;

pub use config::Config;
pub use metrics::{MasterGauge, Metrics};
pub use updater::{Outcome, Updater};
pub use vip::{detect, InterfaceSource, SystemInterfaces};
