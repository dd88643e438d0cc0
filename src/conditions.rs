//! Device-health preconditions the upload worker checks before every tick.
//!
//! Loosely shaped like `download::robots::RobotsCache::check_allowed`'s
//! gate-check call, but deliberately does *not* cache a result across
//! calls: the robots cache's 24h TTL is the wrong model here, since battery
//! and connectivity can change between any two ticks and must be
//! re-evaluated fresh every time.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

/// Read-only access to the current time, the third narrow provider
/// capability alongside [`BatteryStatusProvider`] and [`NetworkInfoProvider`]
/// (`SPEC_FULL.md` §6/§9). `FilesOrchestrator` reads file age through this
/// instead of calling `SystemTime::now()` directly, so tests can drive a
/// fake clock instead of sleeping on the wall clock.
pub trait DateProvider: Send + Sync {
    /// Current time, milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// Default [`DateProvider`] backed by the OS wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemDateProvider;

impl DateProvider for SystemDateProvider {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A single reason uploads are currently blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    /// Device is unplugged and below the configured battery threshold.
    Battery {
        /// Battery level as a percentage, `0..=100`.
        level: u8,
        /// Human-readable power state (`"unplugged"`, `"charging"`, ...).
        state: String,
    },
    /// OS-level low-power mode is engaged.
    LowPowerModeOn,
    /// The network is currently unreachable.
    NetworkReachability {
        /// Description of the current reachability state.
        description: String,
    },
}

/// Battery charge state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Plugged in and charging.
    Charging,
    /// Plugged in, battery full.
    Full,
    /// Running on battery.
    Unplugged,
}

/// Read-only access to the device's battery status.
#[async_trait]
pub trait BatteryStatusProvider: Send + Sync {
    /// Returns the current battery level (0-100) and power state.
    async fn status(&self) -> (u8, PowerState);
    /// Returns whether OS-level low-power mode is currently engaged.
    async fn low_power_mode_on(&self) -> bool;
}

/// Read-only access to network reachability.
#[async_trait]
pub trait NetworkInfoProvider: Send + Sync {
    /// Returns `true` if the network is currently reachable.
    async fn is_reachable(&self) -> bool;
}

/// Minimum battery percentage below which uploads are blocked while
/// unplugged.
const LOW_BATTERY_THRESHOLD: u8 = 10;

/// Evaluates upload preconditions against live providers, with no cached
/// state carried between calls.
pub struct UploadConditions {
    battery: Box<dyn BatteryStatusProvider>,
    network: Box<dyn NetworkInfoProvider>,
}

impl UploadConditions {
    /// Creates an `UploadConditions` gate backed by the given providers.
    #[must_use]
    pub fn new(
        battery: Box<dyn BatteryStatusProvider>,
        network: Box<dyn NetworkInfoProvider>,
    ) -> Self {
        Self { battery, network }
    }

    /// Returns every currently-violated precondition. An empty result is
    /// necessary, but not sufficient, for an upload to proceed — the
    /// worker must also find a batch available.
    pub async fn blockers(&self) -> Vec<Blocker> {
        let mut blockers = Vec::new();

        let (level, state) = self.battery.status().await;
        if state == PowerState::Unplugged && level <= LOW_BATTERY_THRESHOLD {
            blockers.push(Blocker::Battery {
                level,
                state: "unplugged".to_string(),
            });
        }

        if self.battery.low_power_mode_on().await && state != PowerState::Full {
            blockers.push(Blocker::LowPowerModeOn);
        }

        if !self.network.is_reachable().await {
            blockers.push(Blocker::NetworkReachability {
                description: "unreachable".to_string(),
            });
        }

        blockers
    }
}
