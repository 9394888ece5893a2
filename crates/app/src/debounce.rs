//! Debounce and press classification for one input pin.
//!
//! A [`DebounceClassifier`] consumes raw [`PinSample`]s and turns them into
//! [`Event`]s. A level change is only believed once the new level has been
//! observed continuously for the debounce window (the short-press threshold);
//! anything briefer is contact bounce and is discarded.
//!
//! In [`Gesture::Press`] mode the classifier measures how long the pin stayed
//! pressed and emits [`Event::ShortPress`] or [`Event::LongPress`] on release.
//! In [`Gesture::Toggle`] mode every confirmed edge is an [`Event::Toggle`].
//! Independently, `report_steady` emits [`Event::SteadyState`] whenever the
//! debounced level differs from the last one reported.
//!
//! The classifier is a pure state machine: it owns no timer. Callers that
//! sample on edges rather than on an interval must call
//! [`settle`](DebounceClassifier::settle) once [`deadline`](DebounceClassifier::deadline)
//! passes, otherwise a final edge is only confirmed by the next sample.

use std::time::Duration;

use edgewire_domain::event::{Event, PinSample};
use edgewire_domain::time::Instant;

use crate::ports::Pull;

/// Default short-press threshold, which doubles as the debounce window.
pub const DEFAULT_SHORT_PRESS: Duration = Duration::from_millis(2);

/// Which confirmed edges produce a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDetection {
    Rising,
    Falling,
    #[default]
    Both,
}

impl EdgeDetection {
    fn accepts(self, new_level: bool) -> bool {
        match self {
            Self::Rising => new_level,
            Self::Falling => !new_level,
            Self::Both => true,
        }
    }
}

/// What a confirmed transition means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Measure press duration, emit on release.
    Press,
    /// Emit one toggle per confirmed edge.
    Toggle(EdgeDetection),
}

/// Tuning of one classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Level read while the button is held.
    pub pressed_level: bool,
    /// Debounce window and minimum press duration.
    pub short_press: Duration,
    /// Presses lasting at least this long are long presses.
    pub long_press: Option<Duration>,
    /// A press held longer than this is abandoned and never reported.
    pub max_press: Option<Duration>,
    pub gesture: Gesture,
    /// Emit [`Event::SteadyState`] on debounced level changes.
    pub report_steady: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pressed_level: false,
            short_press: DEFAULT_SHORT_PRESS,
            long_press: None,
            max_press: None,
            gesture: Gesture::Press,
            report_steady: false,
        }
    }
}

/// Pressed level implied by the bias resistor, unless set explicitly.
///
/// With a pull-up the pin idles HIGH so a press reads LOW; otherwise a press
/// reads HIGH.
#[must_use]
pub fn pressed_level(pull: Pull, explicit: Option<bool>) -> bool {
    explicit.unwrap_or(!pull.idle_level())
}

/// Debounced phase of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pressed,
}

/// Confirmed state of a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceState {
    pub stable_phase: Phase,
    /// When `stable_phase` was last confirmed. Changes only on confirmed
    /// transitions.
    pub phase_started_at: Instant,
    /// When a steady state was last reported, if ever.
    pub last_reported_at: Option<Instant>,
}

/// Events produced by a single observation: at most one steady-state report
/// and at most one gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Emitted {
    pub steady: Option<Event>,
    pub gesture: Option<Event>,
}

impl Emitted {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steady.is_none() && self.gesture.is_none()
    }
}

impl IntoIterator for Emitted {
    type Item = Event;
    type IntoIter = std::iter::Flatten<std::array::IntoIter<Option<Event>, 2>>;

    fn into_iter(self) -> Self::IntoIter {
        [self.steady, self.gesture].into_iter().flatten()
    }
}

/// Per-pin debounce state machine.
#[derive(Debug, Clone)]
pub struct DebounceClassifier {
    config: ClassifierConfig,
    state: DebounceState,
    /// First observation of a level differing from the stable one.
    candidate: Option<Instant>,
    reported_level: Option<bool>,
    /// The current press will not be reported.
    abandoned: bool,
}

impl DebounceClassifier {
    /// Start from the pin's current level.
    ///
    /// A pin already pressed at startup has no known press start, so that
    /// press is never reported.
    #[must_use]
    pub fn new(config: ClassifierConfig, initial: PinSample) -> Self {
        let pressed = initial.level == config.pressed_level;
        Self {
            state: DebounceState {
                stable_phase: if pressed { Phase::Pressed } else { Phase::Idle },
                phase_started_at: initial.at,
                last_reported_at: None,
            },
            candidate: None,
            reported_level: None,
            abandoned: pressed,
            config,
        }
    }

    #[must_use]
    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Level implied by the confirmed phase.
    #[must_use]
    pub fn stable_level(&self) -> bool {
        match self.state.stable_phase {
            Phase::Pressed => self.config.pressed_level,
            Phase::Idle => !self.config.pressed_level,
        }
    }

    /// When the pending transition, if any, becomes confirmable.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.candidate.map(|since| since + self.config.short_press)
    }

    /// Feed one raw sample.
    pub fn observe(&mut self, sample: PinSample) -> Emitted {
        self.expire_long_hold(sample.at);

        let mut emitted = Emitted::default();
        if sample.level == self.stable_level() {
            if self.candidate.take().is_some() {
                tracing::trace!(level = sample.level, "bounce discarded");
            }
        } else {
            let since = *self.candidate.get_or_insert(sample.at);
            if sample.at.saturating_duration_since(since) >= self.config.short_press {
                self.candidate = None;
                emitted.gesture = self.confirm(sample.level, sample.at);
            }
        }

        if self.config.report_steady {
            let level = self.stable_level();
            if self.reported_level != Some(level) {
                self.reported_level = Some(level);
                self.state.last_reported_at = Some(sample.at);
                emitted.steady = Some(Event::SteadyState(level));
            }
        }
        emitted
    }

    /// Treat `now` as a sample repeating the level last seen.
    ///
    /// Edge-driven callers use this when the [`deadline`](Self::deadline)
    /// elapses without a further edge.
    pub fn settle(&mut self, now: Instant) -> Emitted {
        match self.candidate {
            Some(_) => {
                let level = !self.stable_level();
                self.observe(PinSample::new(level, now))
            }
            None => {
                self.expire_long_hold(now);
                Emitted::default()
            }
        }
    }

    fn confirm(&mut self, level: bool, now: Instant) -> Option<Event> {
        let entering_pressed = level == self.config.pressed_level;
        let pressed_since = self.state.phase_started_at;
        self.state.stable_phase = if entering_pressed {
            Phase::Pressed
        } else {
            Phase::Idle
        };
        self.state.phase_started_at = now;

        match self.config.gesture {
            Gesture::Toggle(edges) => {
                self.abandoned = false;
                edges.accepts(level).then_some(Event::Toggle(now))
            }
            Gesture::Press if entering_pressed => {
                self.abandoned = false;
                None
            }
            Gesture::Press => {
                if std::mem::take(&mut self.abandoned) {
                    return None;
                }
                self.classify(now.saturating_duration_since(pressed_since), now)
            }
        }
    }

    fn classify(&self, duration: Duration, now: Instant) -> Option<Event> {
        if duration < self.config.short_press {
            tracing::trace!(?duration, "press shorter than threshold ignored");
            None
        } else if self.config.long_press.is_some_and(|long| duration >= long) {
            Some(Event::LongPress(now))
        } else {
            Some(Event::ShortPress(now))
        }
    }

    fn expire_long_hold(&mut self, now: Instant) {
        let Some(max) = self.config.max_press else {
            return;
        };
        if self.config.gesture == Gesture::Press
            && self.state.stable_phase == Phase::Pressed
            && !self.abandoned
            && now.saturating_duration_since(self.state.phase_started_at) > max
        {
            tracing::debug!(?max, "press held too long, abandoning");
            self.abandoned = true;
        }
    }
}
