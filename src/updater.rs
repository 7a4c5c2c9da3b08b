//! Periodic VIP check feeding the `is_master` gauge.

use crate::config::Config;
use crate::metrics::MasterGauge;
use crate::vip::{detect, InterfaceSource};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Result of a single update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No VIP configured; nothing was checked.
    Disabled,
    /// Detection succeeded and the gauge now reflects it.
    Updated(bool),
    /// Detection failed; the gauge keeps its previous value.
    Failed,
}

pub struct Updater {
    config: Config,
    gauge: MasterGauge,
    source: Arc<dyn InterfaceSource>,
}

impl Updater {
    pub fn new(config: Config, gauge: MasterGauge, source: Arc<dyn InterfaceSource>) -> Self {
        Self {
            config,
            gauge,
            source,
        }
    }

    /// Check for the VIP once and publish the answer.
    pub async fn update_once(&self) -> Outcome {
        if !self.config.detection_enabled() {
            return Outcome::Disabled;
        }

        let source = Arc::clone(&self.source);
        let vip = self.config.vip.clone();
        let result = tokio::task::spawn_blocking(move || detect(source.as_ref(), &vip)).await;

        match result {
            Ok(Ok(present)) => {
                self.publish(present);
                Outcome::Updated(present)
            }
            Ok(Err(e)) => {
                error!("VIP detection failed: {}", e);
                Outcome::Failed
            }
            Err(e) => {
                error!("VIP detection task failed: {}", e);
                Outcome::Failed
            }
        }
    }

    fn publish(&self, present: bool) {
        let was_master = self.gauge.is_master();
        self.gauge.set_master(present);
        if present && !was_master {
            info!("VIP {} acquired, now master", self.config.vip);
        } else if !present && was_master {
            info!("VIP {} released, now backup", self.config.vip);
        } else {
            debug!("VIP {} present: {}", self.config.vip, present);
        }
    }

    /// Run until `shutdown` flips to `true`.
    ///
    /// The first check happens immediately; later ones follow the configured
    /// interval. A tick that comes due while a check is still running is
    /// skipped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if !self.config.detection_enabled() {
            info!("No VIP configured, detection disabled");
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    self.update_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("VIP updater stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use crate::vip::{DetectError, InterfaceAddr, NetInterface};
    use std::io;
    use std::time::Duration;

    struct Eth0(&'static str);

    impl InterfaceSource for Eth0 {
        fn interfaces(&self) -> Result<Vec<NetInterface>, DetectError> {
            Ok(vec![NetInterface {
                name: "eth0".to_string(),
                up: true,
                loopback: false,
                addrs: vec![InterfaceAddr::Net {
                    ip: self.0.parse().unwrap(),
                    prefix_len: 24,
                }],
            }])
        }
    }

    struct Broken;

    impl InterfaceSource for Broken {
        fn interfaces(&self) -> Result<Vec<NetInterface>, DetectError> {
            Err(DetectError::Enumerate(io::Error::new(
                io::ErrorKind::Other,
                "netlink unavailable",
            )))
        }
    }

    fn config(vip: &str) -> Config {
        Config {
            interval: Duration::from_secs(2),
            vip: vip.to_string(),
        }
    }

    #[tokio::test]
    async fn test_update_once_sets_gauge() {
        let metrics = Metrics::new().unwrap();
        let updater = Updater::new(config("10.0.0.5"), metrics.master(), Arc::new(Eth0("10.0.0.5")));

        assert_eq!(updater.update_once().await, Outcome::Updated(true));
        assert_eq!(metrics.master().value(), 1);
    }

    #[tokio::test]
    async fn test_update_once_disabled_without_vip() {
        let metrics = Metrics::new().unwrap();
        let updater = Updater::new(config(""), metrics.master(), Arc::new(Eth0("10.0.0.5")));

        assert_eq!(updater.update_once().await, Outcome::Disabled);
        assert_eq!(metrics.master().value(), 0);
    }

    #[tokio::test]
    async fn test_update_once_failure_keeps_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.master().set_master(true);
        let updater = Updater::new(config("10.0.0.5"), metrics.master(), Arc::new(Broken));

        assert_eq!(updater.update_once().await, Outcome::Failed);
        assert_eq!(metrics.master().value(), 1);
    }
}
