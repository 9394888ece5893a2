//! `[[devices]]` entries.
//!
//! Each entry is a table tagged with `kind`. Entries are parsed one by one so
//! a broken device can be reported and skipped without rejecting the file.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use edgewire_app::components::{
    GpioActuatorConfig, GpioSensorConfig, HeartbeatConfig, LogicOrConfig, PwmActuatorConfig,
    StateValues, ValueTransformerConfig,
};
use edgewire_app::debounce::{self, ClassifierConfig, EdgeDetection, Gesture};
use edgewire_app::ports::Pull;
use edgewire_app::sampler::{DEFAULT_EDGE_CAPACITY, PinSampler};
use edgewire_domain::destination::Destination;
use edgewire_domain::error::ConfigError;
use edgewire_domain::event::EventKind;
use edgewire_domain::id::DeviceName;
use edgewire_domain::rule::ThresholdRule;
use edgewire_domain::value::Value;

/// One configured device.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceConfig {
    GpioSensor(GpioSensorSection),
    Heartbeat(HeartbeatSection),
    GpioActuator(GpioActuatorSection),
    PwmActuator(PwmActuatorSection),
    Threshold(ThresholdSection),
    LogicOr(LogicOrSection),
}

impl DeviceConfig {
    /// Parse one `[[devices]]` table.
    ///
    /// # Errors
    ///
    /// Returns the TOML error when `kind` is unknown or a field is malformed.
    pub fn parse(table: toml::Table) -> Result<Self, toml::de::Error> {
        toml::Value::Table(table).try_into()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::GpioSensor(section) => &section.name,
            Self::Heartbeat(section) => &section.name,
            Self::GpioActuator(section) => &section.name,
            Self::PwmActuator(section) => &section.name,
            Self::Threshold(section) => &section.name,
            Self::LogicOr(section) => &section.name,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullSetting {
    #[default]
    Up,
    Down,
    Off,
}

impl From<PullSetting> for Pull {
    fn from(setting: PullSetting) -> Self {
        match setting {
            PullSetting::Up => Self::Up,
            PullSetting::Down => Self::Down,
            PullSetting::Off => Self::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LevelSetting {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingSetting {
    #[default]
    Poll,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeSetting {
    Rising,
    Falling,
    Both,
}

impl From<EdgeSetting> for EdgeDetection {
    fn from(setting: EdgeSetting) -> Self {
        match setting {
            EdgeSetting::Rising => Self::Rising,
            EdgeSetting::Falling => Self::Falling,
            EdgeSetting::Both => Self::Both,
        }
    }
}

/// Output destinations of a sensor, per event kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SensorOutputs {
    pub state: Vec<String>,
    pub short_press: Vec<String>,
    pub long_press: Vec<String>,
    pub toggle: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpioSensorSection {
    pub name: String,
    pub pin: u8,
    #[serde(default)]
    pub pull: PullSetting,
    /// Level read while pressed; derived from `pull` when absent.
    pub pressed_level: Option<LevelSetting>,
    #[serde(default)]
    pub sampling: SamplingSetting,
    /// Polling interval in seconds.
    #[serde(default = "default_poll")]
    pub poll: f64,
    #[serde(default = "default_short_press")]
    pub short_press: f64,
    pub long_press: Option<f64>,
    pub max_press: Option<f64>,
    /// Report every confirmed edge as a toggle instead of measuring presses.
    pub toggle: Option<EdgeSetting>,
    /// Publish steady states; defaults to on when polling.
    pub report_state: Option<bool>,
    /// Published for LOW and HIGH.
    pub values: Option<[String; 2]>,
    #[serde(default)]
    pub outputs: SensorOutputs,
}

fn default_poll() -> f64 {
    0.1
}

fn default_short_press() -> f64 {
    debounce::DEFAULT_SHORT_PRESS.as_secs_f64()
}

impl GpioSensorSection {
    /// # Errors
    ///
    /// Fails on a negative duration or an unparsable destination.
    pub fn to_config(&self) -> Result<GpioSensorConfig, ConfigError> {
        let sampler = match self.sampling {
            SamplingSetting::Poll => PinSampler::Poll {
                interval: positive_secs("poll", self.poll)?,
            },
            SamplingSetting::Interrupt => PinSampler::Interrupt {
                capacity: DEFAULT_EDGE_CAPACITY,
            },
        };
        let pull = Pull::from(self.pull);
        let classifier = ClassifierConfig {
            pressed_level: debounce::pressed_level(
                pull,
                self.pressed_level.map(|level| level == LevelSetting::High),
            ),
            short_press: secs("short_press", self.short_press)?,
            long_press: self
                .long_press
                .map(|value| secs("long_press", value))
                .transpose()?,
            max_press: self
                .max_press
                .map(|value| secs("max_press", value))
                .transpose()?,
            gesture: self
                .toggle
                .map_or(Gesture::Press, |edge| Gesture::Toggle(edge.into())),
            report_steady: self.report_state.unwrap_or(sampler.is_polling()),
        };

        let mut outputs = HashMap::new();
        for (kind, raw) in [
            (EventKind::State, &self.outputs.state),
            (EventKind::ShortPress, &self.outputs.short_press),
            (EventKind::LongPress, &self.outputs.long_press),
            (EventKind::Toggle, &self.outputs.toggle),
        ] {
            if !raw.is_empty() {
                outputs.insert(kind, destinations(raw)?);
            }
        }

        Ok(GpioSensorConfig {
            pull,
            classifier,
            outputs,
            values: self.values.clone().map_or_else(StateValues::default, |[low, high]| {
                StateValues { low, high }
            }),
            ..GpioSensorConfig::new(self.name.as_str(), self.pin, sampler)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSection {
    pub name: String,
    /// Publishing interval in seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval: f64,
    pub millis: Option<String>,
    pub text: Option<String>,
}

fn default_heartbeat_interval() -> f64 {
    60.0
}

impl HeartbeatSection {
    /// # Errors
    ///
    /// Fails on a non-positive interval or an unparsable destination.
    pub fn to_config(&self) -> Result<HeartbeatConfig, ConfigError> {
        Ok(HeartbeatConfig {
            name: DeviceName::new(&self.name),
            interval: positive_secs("interval", self.interval)?,
            millis: optional_destination(self.millis.as_deref())?,
            text: optional_destination(self.text.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GpioActuatorSection {
    pub name: String,
    pub pin: u8,
    pub command: String,
    #[serde(default)]
    pub initial: bool,
    #[serde(default)]
    pub invert: bool,
    #[serde(default)]
    pub simulate_button: bool,
    pub pulse: Option<f64>,
    pub toggle_debounce: Option<f64>,
    pub echo: Option<String>,
}

impl GpioActuatorSection {
    /// # Errors
    ///
    /// Fails on a negative duration or an unparsable destination.
    pub fn to_config(&self) -> Result<GpioActuatorConfig, ConfigError> {
        let defaults =
            GpioActuatorConfig::new(self.name.as_str(), self.pin, Destination::from_str(&self.command)?);
        Ok(GpioActuatorConfig {
            initial: self.initial,
            invert: self.invert,
            simulate_button: self.simulate_button,
            pulse: self
                .pulse
                .map_or(Ok(defaults.pulse), |value| positive_secs("pulse", value))?,
            toggle_debounce: self
                .toggle_debounce
                .map_or(Ok(defaults.toggle_debounce), |value| {
                    secs("toggle_debounce", value)
                })?,
            echo: optional_destination(self.echo.as_deref())?,
            ..defaults
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PwmActuatorSection {
    pub name: String,
    pub pin: u8,
    pub command: String,
    #[serde(default)]
    pub initial_duty: u8,
    pub echo: Option<String>,
}

impl PwmActuatorSection {
    /// # Errors
    ///
    /// Fails on a duty above 100 or an unparsable destination.
    pub fn to_config(&self) -> Result<PwmActuatorConfig, ConfigError> {
        if self.initial_duty > 100 {
            return Err(ConfigError::Invalid {
                field: "initial_duty",
                reason: format!("{} is above 100", self.initial_duty),
            });
        }
        Ok(PwmActuatorConfig {
            name: DeviceName::new(&self.name),
            pin: self.pin,
            command: Destination::from_str(&self.command)?,
            initial_duty: self.initial_duty,
            echo: optional_destination(self.echo.as_deref())?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdSection {
    pub name: String,
    pub input: String,
    pub on_eq: Option<Value>,
    pub on_gt: Option<Value>,
    pub on_lt: Option<Value>,
    #[serde(default)]
    pub outputs: Vec<String>,
}

impl ThresholdSection {
    /// # Errors
    ///
    /// Fails when the rule candidates select nothing usable or a destination
    /// is unparsable.
    pub fn to_config(&self) -> Result<ValueTransformerConfig, ConfigError> {
        Ok(ValueTransformerConfig {
            name: DeviceName::new(&self.name),
            input: Destination::from_str(&self.input)?,
            rule: ThresholdRule::select(
                self.on_eq.clone(),
                self.on_gt.clone(),
                self.on_lt.clone(),
            )?,
            outputs: destinations(&self.outputs)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogicOrSection {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub enable: Option<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Published for OFF and ON.
    pub values: Option<[String; 2]>,
}

impl LogicOrSection {
    /// # Errors
    ///
    /// Fails on an unparsable destination.
    pub fn to_config(&self) -> Result<LogicOrConfig, ConfigError> {
        let defaults = LogicOrConfig::new(self.name.as_str());
        Ok(LogicOrConfig {
            inputs: destinations(&self.inputs)?,
            enable: optional_destination(self.enable.as_deref())?,
            outputs: destinations(&self.outputs)?,
            values: self.values.clone().unwrap_or(defaults.values.clone()),
            ..defaults
        })
    }
}

fn destinations(raw: &[String]) -> Result<Vec<Destination>, ConfigError> {
    raw.iter().map(|s| Destination::from_str(s)).collect()
}

fn optional_destination(raw: Option<&str>) -> Result<Option<Destination>, ConfigError> {
    raw.map(Destination::from_str).transpose()
}

fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|err| ConfigError::Invalid {
        field,
        reason: err.to_string(),
    })
}

fn positive_secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    let duration = secs(field, value)?;
    if duration.is_zero() {
        return Err(ConfigError::Invalid {
            field,
            reason: "must be positive".to_string(),
        });
    }
    Ok(duration)
}
