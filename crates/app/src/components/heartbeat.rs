//! Heartbeat — periodically publishes the agent's uptime.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use edgewire_domain::destination::Destination;
use edgewire_domain::error::ConfigError;
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;
use edgewire_domain::time::Instant;
use edgewire_domain::value::Value;

use crate::router::Router;
use crate::sampler::monotonic_now;

#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    pub name: DeviceName,
    pub interval: Duration,
    /// Receives the uptime in milliseconds.
    pub millis: Option<Destination>,
    /// Receives the uptime as `[D:]HH:MM:SS`.
    pub text: Option<Destination>,
}

pub struct Heartbeat {
    config: HeartbeatConfig,
    router: Arc<Router>,
    started: Instant,
}

impl Heartbeat {
    /// # Errors
    ///
    /// Fails when a destination names an unknown connection or the interval
    /// is zero.
    pub fn new(config: HeartbeatConfig, router: Arc<Router>) -> Result<Self, ConfigError> {
        if config.interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "interval",
                reason: "interval must be positive".to_string(),
            });
        }
        router.validate(config.millis.iter().chain(config.text.iter()))?;
        Ok(Self {
            config,
            router,
            started: monotonic_now(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &DeviceName {
        &self.config.name
    }

    /// Publish once per interval until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                tick = ticker.tick() => {
                    let uptime = tick.into_std().saturating_duration_since(self.started);
                    self.publish(uptime);
                }
            }
        }
        tracing::debug!(sensor = %self.config.name, "heartbeat stopped");
    }

    fn publish(&self, uptime: Duration) {
        if let Some(destination) = &self.config.millis {
            #[allow(clippy::cast_precision_loss)]
            let millis = Value::Number(uptime.as_millis() as f64);
            self.router.publish(
                destination,
                Message::new(millis, destination.connection.clone()),
            );
        }
        if let Some(destination) = &self.config.text {
            self.router.publish(
                destination,
                Message::new(format_uptime(uptime), destination.connection.clone()),
            );
        }
    }
}

/// Render an uptime as `HH:MM:SS`, prefixed with `D:` once it exceeds a day.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}:{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{collect, local, local_router};

    use super::*;

    #[test]
    fn should_format_uptime_under_a_day() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_uptime(Duration::from_secs(3723)), "01:02:03");
    }

    #[test]
    fn should_prefix_days_when_uptime_exceeds_a_day() {
        assert_eq!(format_uptime(Duration::from_secs(90_061)), "1:01:01:01");
    }

    #[test]
    fn should_reject_zero_interval() {
        let config = HeartbeatConfig {
            name: DeviceName::new("heartbeat"),
            interval: Duration::ZERO,
            millis: None,
            text: None,
        };
        assert!(matches!(
            Heartbeat::new(config, local_router()),
            Err(ConfigError::Invalid { field: "interval", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_uptime_every_interval() {
        let router = local_router();
        let millis = collect(&router, &local("uptime_ms"));
        let text = collect(&router, &local("uptime"));
        let heartbeat = Heartbeat::new(
            HeartbeatConfig {
                name: DeviceName::new("heartbeat"),
                interval: Duration::from_secs(60),
                millis: Some(local("uptime_ms")),
                text: Some(local("uptime")),
            },
            Arc::clone(&router),
        )
        .unwrap();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(heartbeat.run(shutdown));

        tokio::time::sleep(Duration::from_secs(61)).await;
        stop.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(
            *millis.lock().unwrap(),
            vec![Value::Number(0.0), Value::Number(60_000.0)]
        );
        assert_eq!(
            *text.lock().unwrap(),
            vec![Value::from("00:00:00"), Value::from("00:01:00")]
        );
    }
}
