use crate::api;
use crate::model::{Api, TelemetryRecord};
use crate::registry::{DeviceRegistry, DeviceSpec};
use crate::variables::{format_value, is_empty, Variable, VariableTable};
use serde_json::Value;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

pub const SERVER_UP: &str = "Solax Cloud Server Up";
pub const SERVER_DOWN: &str = "Solax Cloud Server Down";
pub const INVERTER_ONLINE: &str = "Solax Inverter Online";
pub const INVERTER_OFFLINE: &str = "Solax Inverter Offline";

/// Outcome of one poll of the cloud.
#[derive(Debug)]
pub enum Cycle {
    Success(Vec<TelemetryRecord>),
    Failure(api::Error),
}

impl Cycle {
    pub fn succeeded(&self) -> bool {
        matches!(self, Cycle::Success(_))
    }
}

/// Status level and text to show for `variable`, or `None` when the device must be left alone
/// this cycle.
///
/// `raw` is the last reported value of the variable and `online` the inverter state derived from
/// `enableFlag`. An offline inverter shows every reading as `"0"`.
pub fn display_value(
    variable: Variable,
    raw: Option<&Value>,
    succeeded: bool,
    online: bool,
) -> Option<(u8, String)> {
    match variable {
        Variable::ServerStatus if succeeded => Some((1, SERVER_UP.to_string())),
        Variable::ServerStatus => Some((0, SERVER_DOWN.to_string())),
        Variable::EnableFlag => match raw.map(format_value).as_deref() {
            Some("0") => Some((0, INVERTER_OFFLINE.to_string())),
            _ => Some((1, INVERTER_ONLINE.to_string())),
        },
        _ if !succeeded => None,
        _ if !online => Some((0, "0".to_string())),
        _ => raw.map(|value| (0, format_value(value))),
    }
}

/// Polls the cloud on a fixed interval and mirrors the telemetry onto host devices.
pub struct Poller<R> {
    api: Api,
    registry: R,
    variables: VariableTable,
    interval: Duration,
    next_poll: Option<Instant>,
}

impl<R: DeviceRegistry> Poller<R> {
    pub fn new(api: Api, registry: R, interval: Duration) -> Self {
        Poller {
            api,
            registry,
            variables: VariableTable::default(),
            interval,
            next_poll: None,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Register the server status device. It starts grey until the first poll.
    pub async fn on_start(&mut self) {
        log::debug!("onStart called");

        if let Err(e) = self.registry.refresh().await {
            log::error!("Unable to read devices from host: {}", e);
        }

        let slot = Variable::ServerStatus.slot();
        if self.registry.ready() && !self.registry.contains(slot) {
            let spec = DeviceSpec::from(Variable::ServerStatus);
            let created = match self.registry.create(&spec).await {
                Ok(()) => self.registry.update(slot, 0, "").await,
                Err(e) => Err(e),
            };
            if let Err(e) = created {
                log::error!("Failed to create device unit {} due to {}", slot, e);
            }
        }

        if log::log_enabled!(log::Level::Debug) {
            self.dump_devices();
        }
    }

    pub fn on_stop(&mut self) {
        log::debug!("onStop called");
    }

    /// Poll the cloud when the interval has elapsed. Returns the cycle outcome, or `None` when it
    /// is not yet time to poll.
    pub async fn on_heartbeat(&mut self, now: Instant) -> Option<bool> {
        if matches!(self.next_poll, Some(next_poll) if now < next_poll) {
            return None;
        }
        self.next_poll = Some(now + self.interval);

        if let Err(e) = self.registry.refresh().await {
            log::warn!("Unable to refresh devices from host: {}", e);
        }

        let cycle = match api::fetch_telemetry(&self.api).await {
            Ok(records) => Cycle::Success(records),
            Err(e) => {
                log::error!(
                    "Cannot communicate with Solax Server at {} due to {}",
                    self.api.api_url,
                    e
                );
                Cycle::Failure(e)
            }
        };

        self.apply(&cycle).await;
        Some(cycle.succeeded())
    }

    /// Store the reported values and push the changed ones to their devices.
    pub async fn apply(&mut self, cycle: &Cycle) {
        let records = match cycle {
            Cycle::Success(records) => records,
            Cycle::Failure(_) => {
                self.update_device(Variable::ServerStatus, false).await;
                return;
            }
        };

        let mut reported = BTreeSet::new();
        for record in records {
            for (key, value) in record {
                if let Some(variable) = Variable::from_telemetry_key(key) {
                    log::debug!("Variable {} = {}", variable.label(), value);
                    self.variables.set(variable, value.clone());

                    if !is_empty(value) {
                        reported.insert(variable);
                    }
                }
            }
        }

        self.update_device(Variable::ServerStatus, true).await;
        for variable in reported {
            self.update_device(variable, true).await;
        }
    }

    /// Write the display value of `variable` to its device, creating the device first if the
    /// host does not know it. A freshly created device gets its value on the next cycle.
    ///
    /// Nothing is touched until the registry has read the host's devices at least once.
    async fn update_device(&mut self, variable: Variable, succeeded: bool) {
        let slot = variable.slot();

        if !self.registry.ready() {
            log::warn!("Devices not read from host yet, skipping unit {}", slot);
            return;
        }

        if !self.registry.contains(slot) {
            let spec = DeviceSpec::from(variable);
            match self.registry.create(&spec).await {
                Ok(()) => log::info!("Created device {} in unit {}", spec.name, slot),
                Err(e) => log::error!("Failed to create device unit {} due to {}", slot, e),
            }
            return;
        }

        let (n_value, s_value) = match display_value(
            variable,
            self.variables.get(variable),
            succeeded,
            self.variables.inverter_online(),
        ) {
            Some(display) => display,
            None => return,
        };

        if self.registry.s_value(slot).as_deref() == Some(s_value.as_str()) {
            return;
        }

        if let Err(e) = self.registry.update(slot, n_value, &s_value).await {
            log::error!("Failed to update device unit {} due to {}", slot, e);
        }
    }

    fn dump_devices(&self) {
        let devices = self.registry.devices();
        log::debug!("Device count: {}", devices.len());
        for device in devices {
            log::debug!(
                "Device unit {}: id '{}', name '{}', sValue '{}'",
                device.slot,
                device.id,
                device.name,
                device.s_value.unwrap_or_default()
            );
        }
    }
}
