//! GPIO sensor — sampler, debounce classifier and publisher for one input pin.
//!
//! The worker owns its [`DebounceClassifier`] exclusively, so no lock guards
//! the debounce state. Classified events are published to the destinations
//! configured for their [`EventKind`]: steady states as the configured
//! [`StateValues`], gestures as a datetime literal (which any actuator reads
//! as a toggle).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_stream::StreamExt;

use edgewire_domain::destination::Destination;
use edgewire_domain::error::{EdgeError, HardwareError};
use edgewire_domain::event::{Event, EventKind, PinSample};
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;
use edgewire_domain::time::{self, Instant};
use edgewire_domain::value::Value;

use crate::debounce::{ClassifierConfig, DebounceClassifier, Emitted};
use crate::ports::{GpioBackend, Pull};
use crate::router::Router;
use crate::sampler::{PinSampler, SampleStream, monotonic_now};

/// Values published for the LOW and HIGH steady states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateValues {
    pub low: String,
    pub high: String,
}

impl Default for StateValues {
    fn default() -> Self {
        Self {
            low: "CLOSED".to_string(),
            high: "OPEN".to_string(),
        }
    }
}

impl StateValues {
    #[must_use]
    pub fn for_level(&self, level: bool) -> &str {
        if level { &self.high } else { &self.low }
    }
}

/// Retry schedule for edge registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    /// Consecutive failures logged as warnings before escalating to errors.
    pub escalate_after: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            escalate_after: 3,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based): doubles each time,
    /// capped at `max`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Health of a sensor's pin access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorHealth {
    /// No sample received yet.
    Starting,
    Healthy,
    Failing {
        consecutive: u32,
        error: HardwareError,
    },
}

#[derive(Debug, Clone)]
pub struct GpioSensorConfig {
    pub name: DeviceName,
    pub pin: u8,
    pub pull: Pull,
    pub sampler: PinSampler,
    pub classifier: ClassifierConfig,
    pub values: StateValues,
    pub outputs: HashMap<EventKind, Vec<Destination>>,
    pub backoff: Backoff,
}

impl GpioSensorConfig {
    /// Pull-up press sensor with default thresholds. Steady states are
    /// reported when polling.
    #[must_use]
    pub fn new(name: impl Into<DeviceName>, pin: u8, sampler: PinSampler) -> Self {
        Self {
            name: name.into(),
            pin,
            pull: Pull::Up,
            sampler,
            classifier: ClassifierConfig {
                report_steady: sampler.is_polling(),
                ..ClassifierConfig::default()
            },
            values: StateValues::default(),
            outputs: HashMap::new(),
            backoff: Backoff::default(),
        }
    }

    /// Add an output destination for one event kind.
    #[must_use]
    pub fn with_output(mut self, kind: EventKind, destination: Destination) -> Self {
        self.outputs.entry(kind).or_default().push(destination);
        self
    }
}

enum Exit {
    Shutdown,
    Restart,
}

/// Worker for one GPIO input.
pub struct GpioSensor<B: ?Sized> {
    config: GpioSensorConfig,
    backend: Arc<B>,
    router: Arc<Router>,
    health: watch::Sender<SensorHealth>,
}

impl<B> GpioSensor<B>
where
    B: GpioBackend + ?Sized + 'static,
{
    /// Validate the outputs and claim the pin.
    ///
    /// # Errors
    ///
    /// Fails when an output names an unknown connection or the pin cannot be
    /// configured as an input.
    pub fn new(
        config: GpioSensorConfig,
        backend: Arc<B>,
        router: Arc<Router>,
    ) -> Result<Self, EdgeError> {
        router.validate(config.outputs.values().flatten())?;
        backend.setup_input(config.pin, config.pull)?;
        let (health, _) = watch::channel(SensorHealth::Starting);
        Ok(Self {
            config,
            backend,
            router,
            health,
        })
    }

    #[must_use]
    pub fn name(&self) -> &DeviceName {
        &self.config.name
    }

    /// Observe the health of this sensor.
    #[must_use]
    pub fn health(&self) -> watch::Receiver<SensorHealth> {
        self.health.subscribe()
    }

    /// Sample, classify and publish until `shutdown` flips to `true` or its
    /// sender is dropped. A transition still inside its debounce window at
    /// shutdown is abandoned.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let pin = self.config.pin;
        tracing::info!(sensor = %self.config.name, pin, "sensor started");

        let mut attempt = 0u32;
        while !*shutdown.borrow() {
            match self.config.sampler.samples(&self.backend, pin) {
                Ok(stream) => {
                    attempt = 0;
                    match self.drive(stream, &mut shutdown).await {
                        Exit::Shutdown => break,
                        Exit::Restart => {
                            tracing::warn!(sensor = %self.config.name, pin, "sample stream ended, restarting");
                        }
                    }
                }
                Err(err) => {
                    attempt += 1;
                    self.record_failure(err, attempt);
                    let delay = self.config.backoff.delay(attempt);
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        if !self.config.sampler.is_polling() {
            self.backend.clear_edge(pin);
        }
        tracing::info!(sensor = %self.config.name, pin, "sensor stopped");
    }

    async fn drive(&self, mut stream: SampleStream, shutdown: &mut watch::Receiver<bool>) -> Exit {
        let mut classifier = None;
        if !self.config.sampler.is_polling() {
            // Edges only report changes; seed with the current level.
            match self.backend.read_pin(self.config.pin) {
                Ok(level) => {
                    self.mark_healthy();
                    self.observe(&mut classifier, PinSample::new(level, monotonic_now()));
                }
                Err(err) => self.record_failure(err, 1),
            }
        }

        let mut read_failures = 0u32;
        loop {
            let deadline = classifier.as_ref().and_then(DebounceClassifier::deadline);
            tokio::select! {
                biased;
                _ = shutdown.changed() => return Exit::Shutdown,
                () = sleep_until(deadline) => {
                    if let Some(classifier) = classifier.as_mut() {
                        let emitted = classifier.settle(monotonic_now());
                        self.dispatch(emitted);
                    }
                }
                next = stream.next() => match next {
                    Some(Ok(sample)) => {
                        read_failures = 0;
                        self.mark_healthy();
                        self.observe(&mut classifier, sample);
                    }
                    Some(Err(err)) => {
                        read_failures += 1;
                        self.record_failure(err, read_failures);
                    }
                    None => return Exit::Restart,
                },
            }
        }
    }

    fn observe(&self, classifier: &mut Option<DebounceClassifier>, sample: PinSample) {
        let classifier = classifier
            .get_or_insert_with(|| DebounceClassifier::new(self.config.classifier.clone(), sample));
        let emitted = classifier.observe(sample);
        self.dispatch(emitted);
    }

    fn dispatch(&self, emitted: Emitted) {
        for event in emitted {
            let value = match event {
                Event::SteadyState(level) => Value::from(self.config.values.for_level(level)),
                Event::ShortPress(_) | Event::LongPress(_) | Event::Toggle(_) => {
                    Value::Text(time::to_literal(time::now()))
                }
            };
            let kind = event.kind();
            tracing::debug!(sensor = %self.config.name, %kind, %value, "classified");

            let Some(destinations) = self.config.outputs.get(&kind) else {
                continue;
            };
            for destination in destinations {
                let message = Message::new(value.clone(), destination.connection.clone());
                self.router.publish(destination, message);
            }
        }
    }

    fn mark_healthy(&self) {
        let recovered = self.health.send_if_modified(|health| match health {
            SensorHealth::Healthy => false,
            _ => {
                *health = SensorHealth::Healthy;
                true
            }
        });
        if recovered {
            tracing::debug!(sensor = %self.config.name, "sensor healthy");
        }
    }

    fn record_failure(&self, error: HardwareError, consecutive: u32) {
        if consecutive <= self.config.backoff.escalate_after {
            tracing::warn!(sensor = %self.config.name, %error, consecutive, "pin access failed");
        } else {
            tracing::error!(sensor = %self.config.name, %error, consecutive, "pin access keeps failing");
        }
        self.health.send_replace(SensorHealth::Failing {
            consecutive,
            error,
        });
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use edgewire_domain::time::is_datetime_literal;

    use crate::debounce::{EdgeDetection, Gesture};
    use crate::testing::{FakeGpio, collect, local, local_router};

    use super::*;

    fn polling_doorbell() -> GpioSensorConfig {
        let mut config = GpioSensorConfig::new(
            "doorbell",
            17,
            PinSampler::Poll {
                interval: Duration::from_millis(100),
            },
        )
        .with_output(EventKind::State, local("door_state"))
        .with_output(EventKind::ShortPress, local("bell"))
        .with_output(EventKind::LongPress, local("bell_long"));
        config.pull = Pull::Down;
        config.classifier.pressed_level = true;
        config.classifier.long_press = Some(Duration::from_millis(1200));
        config
    }

    fn texts(values: &[Value]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn should_double_backoff_up_to_max() {
        let backoff = Backoff {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(10),
            escalate_after: 3,
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(2));
        assert_eq!(backoff.delay(4), Duration::from_secs(8));
        assert_eq!(backoff.delay(5), Duration::from_secs(10));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(10));
    }

    #[test]
    fn should_reject_output_on_unknown_connection() {
        let config = polling_doorbell().with_output(
            EventKind::Toggle,
            Destination::new("mqtt", "doorbell/toggle"),
        );
        let result = GpioSensor::new(config, Arc::new(FakeGpio::default()), local_router());
        assert!(matches!(result, Err(EdgeError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_state_and_short_press_when_polling() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let states = collect(&router, &local("door_state"));
        let presses = collect(&router, &local("bell"));
        let long_presses = collect(&router, &local("bell_long"));
        let sensor = GpioSensor::new(polling_doorbell(), Arc::clone(&gpio), router).unwrap();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        tokio::time::sleep(Duration::from_millis(150)).await;
        gpio.set(17, true);
        tokio::time::sleep(Duration::from_millis(300)).await;
        gpio.set(17, false);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            texts(&states.lock().unwrap()),
            vec!["CLOSED", "OPEN", "CLOSED"]
        );
        let presses = presses.lock().unwrap().clone();
        assert_eq!(presses.len(), 1);
        assert!(is_datetime_literal(&presses[0].to_string()));
        assert!(long_presses.lock().unwrap().is_empty());

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_long_press_when_held() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let presses = collect(&router, &local("bell"));
        let long_presses = collect(&router, &local("bell_long"));
        let sensor = GpioSensor::new(polling_doorbell(), Arc::clone(&gpio), router).unwrap();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        tokio::time::sleep(Duration::from_millis(150)).await;
        gpio.set(17, true);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        gpio.set(17, false);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(presses.lock().unwrap().is_empty());
        assert_eq!(long_presses.lock().unwrap().len(), 1);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_settle_toggle_after_last_edge() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let toggles = collect(&router, &local("light_switch"));
        let mut config = GpioSensorConfig::new(
            "switch",
            22,
            PinSampler::Interrupt { capacity: 8 },
        )
        .with_output(EventKind::Toggle, local("light_switch"));
        config.classifier.short_press = Duration::from_millis(20);
        config.classifier.gesture = Gesture::Toggle(EdgeDetection::Both);
        let sensor = GpioSensor::new(config, Arc::clone(&gpio), router).unwrap();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(gpio.has_edge(22));

        // A bouncing edge: only the final level counts.
        gpio.set(22, false);
        tokio::time::sleep(Duration::from_millis(3)).await;
        gpio.set(22, true);
        tokio::time::sleep(Duration::from_millis(3)).await;
        gpio.set(22, false);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(toggles.lock().unwrap().len(), 1);

        stop.send(true).unwrap();
        handle.await.unwrap();
        assert!(!gpio.has_edge(22));
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_edge_registration_with_backoff() {
        let gpio = Arc::new(FakeGpio::default());
        gpio.refuse_edges(2);
        let config = GpioSensorConfig::new("switch", 22, PinSampler::Interrupt { capacity: 8 });
        let sensor = GpioSensor::new(config, Arc::clone(&gpio), local_router()).unwrap();
        let health = sensor.health();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(matches!(
            *health.borrow(),
            SensorHealth::Failing { consecutive: 1, .. }
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(matches!(
            *health.borrow(),
            SensorHealth::Failing { consecutive: 2, .. }
        ));
        assert!(!gpio.has_edge(22));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*health.borrow(), SensorHealth::Healthy);
        assert!(gpio.has_edge(22));

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_recover_health_after_read_failures() {
        let gpio = Arc::new(FakeGpio::default());
        let sensor = GpioSensor::new(polling_doorbell(), Arc::clone(&gpio), local_router()).unwrap();
        let health = sensor.health();
        gpio.fail_reads(true);
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(matches!(
            *health.borrow(),
            SensorHealth::Failing { consecutive: 3, .. }
        ));

        gpio.fail_reads(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*health.borrow(), SensorHealth::Healthy);

        stop.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn should_abandon_pending_transition_on_shutdown() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let presses = collect(&router, &local("bell"));
        let long_presses = collect(&router, &local("bell_long"));
        let mut config = polling_doorbell();
        config.classifier.short_press = Duration::from_millis(200);
        let sensor = GpioSensor::new(config, Arc::clone(&gpio), router).unwrap();
        let (stop, shutdown) = watch::channel(false);
        let handle = tokio::spawn(sensor.run(shutdown));

        // Press sampled at 200ms and confirmed at 400ms.
        tokio::time::sleep(Duration::from_millis(150)).await;
        gpio.set(17, true);
        tokio::time::sleep(Duration::from_millis(300)).await;
        // Release sampled at 500ms; its window stays open until 700ms.
        gpio.set(17, false);
        tokio::time::sleep(Duration::from_millis(60)).await;
        stop.send(true).unwrap();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(presses.lock().unwrap().is_empty());
        assert!(long_presses.lock().unwrap().is_empty());
    }
}
