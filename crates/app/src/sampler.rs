//! Pin samplers — turn a GPIO pin into a stream of [`PinSample`]s.
//!
//! Two strategies exist. Polling reads the pin on a fixed interval. Interrupt
//! mode registers an edge callback with the backend; the callback pushes into
//! a bounded channel drained by the owning worker, so backend threads never
//! wait on the classifier.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::{IntervalStream, ReceiverStream};
use tokio_stream::{Stream, StreamExt};

use edgewire_domain::error::HardwareError;
use edgewire_domain::event::PinSample;
use edgewire_domain::time::Instant;

use crate::ports::GpioBackend;

/// Default capacity of the interrupt channel.
pub const DEFAULT_EDGE_CAPACITY: usize = 64;

/// Samples of one pin. Polling yields read failures inline; the interrupt
/// stream only ends when its callback is cleared.
pub type SampleStream = Pin<Box<dyn Stream<Item = Result<PinSample, HardwareError>> + Send>>;

/// Sampling strategy of a GPIO sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSampler {
    /// Read the pin every `interval`.
    Poll { interval: Duration },
    /// Receive a sample on each level change.
    Interrupt { capacity: usize },
}

impl PinSampler {
    /// Start sampling `pin`.
    ///
    /// # Errors
    ///
    /// Interrupt mode fails when the backend refuses the edge registration.
    pub fn samples<B>(&self, backend: &Arc<B>, pin: u8) -> Result<SampleStream, HardwareError>
    where
        B: GpioBackend + ?Sized + 'static,
    {
        match *self {
            Self::Poll { interval } => Ok(Box::pin(poll(Arc::clone(backend), pin, interval))),
            Self::Interrupt { capacity } => {
                let stream = interrupt(backend.as_ref(), pin, capacity)?;
                Ok(Box::pin(stream.map(Ok)))
            }
        }
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Poll { .. })
    }
}

/// Current monotonic time, following tokio's clock so paused-time tests see
/// consistent instants.
#[must_use]
pub fn monotonic_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Read `pin` every `interval`. The first read happens immediately.
pub fn poll<B>(
    backend: Arc<B>,
    pin: u8,
    interval: Duration,
) -> impl Stream<Item = Result<PinSample, HardwareError>> + Send
where
    B: GpioBackend + ?Sized + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    IntervalStream::new(ticker).map(move |tick| {
        backend
            .read_pin(pin)
            .map(|level| PinSample::new(level, tick.into_std()))
    })
}

/// Register an edge callback on `pin` feeding a channel of `capacity`.
///
/// When the channel is full the sample is dropped with a warning; the next
/// edge carries the fresh level anyway.
///
/// # Errors
///
/// Returns the backend's error when edge detection cannot be registered.
pub fn interrupt<B>(
    backend: &B,
    pin: u8,
    capacity: usize,
) -> Result<ReceiverStream<PinSample>, HardwareError>
where
    B: GpioBackend + ?Sized,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    backend.on_edge(
        pin,
        Box::new(move |level| {
            if let Err(err) = tx.try_send(PinSample::new(level, monotonic_now())) {
                tracing::warn!(pin, %err, "edge sample dropped");
            }
        }),
    )?;
    Ok(ReceiverStream::new(rx))
}
