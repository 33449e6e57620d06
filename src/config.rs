//! Configuration loading and management
//!
//! Timing and actuator angles are fixed at compile time. Deployment details
//! (device paths, pins, notifier endpoints) come from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Servo angle holding the latch closed
pub const LOCKED_ANGLE: u16 = 85;
/// Servo angle holding the latch open
pub const UNLOCKED_ANGLE: u16 = 175;
/// How long the door stays unlocked once nobody is passing through
pub const UNLOCK_DURATION: Duration = Duration::from_secs(10);
/// Minimum time spent Locked before an RFID unlock is broadcast
pub const NOTIFY_INTERVAL: Duration = Duration::from_secs(300);
/// Per-call wait handed to the RFID reader
pub const RFID_POLL_TIMEOUT: Duration = Duration::from_millis(250);
/// Cadence of key-slot sensor reads
pub const SENSOR_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Cadence of door sensor reads while Unlocked
pub const UNLOCKED_TICK: Duration = Duration::from_secs(1);

const DEFAULT_ANNOUNCE_URL: &str =
    "http://localhost:8091/google-home-notifier?text=http%3A%2F%2F192.168.100.105%2Fkenchi.mp3";
const DEFAULT_LINE_MESSAGE: &str = "ただいま帰ったでござる。";

/// Timing and positions used by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorSettings {
    pub locked_angle: u16,
    pub unlocked_angle: u16,
    pub unlock_duration: Duration,
    pub notify_interval: Duration,
    pub rfid_poll_timeout: Duration,
    pub sensor_poll_interval: Duration,
    pub unlocked_tick: Duration,
}

impl Default for DoorSettings {
    fn default() -> Self {
        Self {
            locked_angle: LOCKED_ANGLE,
            unlocked_angle: UNLOCKED_ANGLE,
            unlock_duration: UNLOCK_DURATION,
            notify_interval: NOTIFY_INTERVAL,
            rfid_poll_timeout: RFID_POLL_TIMEOUT,
            sensor_poll_interval: SENSOR_POLL_INTERVAL,
            unlocked_tick: UNLOCKED_TICK,
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Allow-list of RFID identifiers, one per line
    pub credentials_path: PathBuf,

    /// Serial device the RFID reader writes identifiers to
    pub rfid_device: PathBuf,

    pub rfid_baud_rate: u32,

    /// BCM pin of the key-slot contact
    pub key_slot_pin: u8,

    /// BCM pin of the door contact
    pub door_pin: u8,

    /// BCM pin of the "unlocked" indicator LED
    pub led_pin: u8,

    /// Hardware PWM channel driving the latch servo (0 or 1)
    pub pwm_channel: u8,

    /// LINE Messaging API channel token; broadcasts fail when absent
    pub line_token: Option<String>,

    /// Text broadcast after an RFID unlock
    pub line_message: String,

    /// URL fetched to make the Google Home speak
    pub announce_url: String,

    pub settings: DoorSettings,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Ok(Self {
            credentials_path: env_or("AUTOLOCK_CREDENTIALS", "key.txt").into(),
            rfid_device: env_or("AUTOLOCK_RFID_DEVICE", "/dev/ttyUSB0").into(),
            rfid_baud_rate: env_parse("AUTOLOCK_RFID_BAUD", 9600)?,
            key_slot_pin: env_parse("AUTOLOCK_KEY_SLOT_PIN", 26)?,
            door_pin: env_parse("AUTOLOCK_DOOR_PIN", 2)?,
            led_pin: env_parse("AUTOLOCK_LED_PIN", 17)?,
            pwm_channel: env_parse("AUTOLOCK_PWM_CHANNEL", 0)?,
            line_token: std::env::var("AUTOLOCK_LINE_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
            line_message: env_or("AUTOLOCK_LINE_MESSAGE", DEFAULT_LINE_MESSAGE),
            announce_url: env_or("AUTOLOCK_ANNOUNCE_URL", DEFAULT_ANNOUNCE_URL),
            settings: DoorSettings::default(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T>(key: &str, raw: Option<&str>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
