use lazy_static::lazy_static;
use num_derive::FromPrimitive;
use serde_json::Value;

use std::collections::HashMap;

/// Host device slot ("unit") under which a variable is displayed.
pub type Slot = u8;

/// Telemetry variables mirrored onto host devices.
///
/// The discriminant is the device slot, so slots are unique and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive)]
pub enum Variable {
    ServerStatus = 1,
    EnableFlag = 2,
    Pv1Voltage = 3,
    Pv1Current = 4,
    PowerDc1 = 5,
    Temperature = 6,
    GridPower = 7,
    FeedInPower = 8,
    Pv2Voltage = 9,
    Pv2Current = 10,
    PowerDc2 = 11,
    Vac1 = 12,
    Iac1 = 13,
    Fac1 = 14,
}

/// How the host device gets created the first time a variable is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Generic host type name ("Alert", "Custom")
    Named(&'static str),
    Typed { device_type: u8, subtype: u8 },
}

#[derive(Debug)]
pub struct Descriptor {
    /// Field name in the cloud telemetry record
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    /// Whether the created device is marked as used in the host
    pub used: bool,
    pub device_type: DeviceType,
}

const ALERT: DeviceType = DeviceType::Named("Alert");
const VOLTAGE: DeviceType = DeviceType::Typed {
    device_type: 243,
    subtype: 8,
};
const CURRENT: DeviceType = DeviceType::Typed {
    device_type: 243,
    subtype: 23,
};
const USAGE: DeviceType = DeviceType::Typed {
    device_type: 248,
    subtype: 1,
};
const TEMPERATURE: DeviceType = DeviceType::Typed {
    device_type: 80,
    subtype: 5,
};

/* Indexed by `slot - 1` */
static DESCRIPTORS: [Descriptor; 14] = [
    Descriptor {
        key: "server.status",
        label: "Server Status",
        unit: "",
        used: true,
        device_type: ALERT,
    },
    Descriptor {
        key: "enableFlag",
        label: "Inverter Status",
        unit: "",
        used: true,
        device_type: ALERT,
    },
    Descriptor {
        key: "pv1Voltage",
        label: "PV1 Voltage",
        unit: "V",
        used: true,
        device_type: VOLTAGE,
    },
    Descriptor {
        key: "pv1Current",
        label: "PV1 Amperage",
        unit: "A",
        used: true,
        device_type: CURRENT,
    },
    Descriptor {
        key: "powerdc1",
        label: "PV1 Power",
        unit: "W",
        used: true,
        device_type: USAGE,
    },
    Descriptor {
        key: "temperature",
        label: "Inverter Temperature",
        unit: "C",
        used: true,
        device_type: TEMPERATURE,
    },
    Descriptor {
        key: "gridPower",
        label: "Inverter Power",
        unit: "W",
        used: true,
        device_type: USAGE,
    },
    Descriptor {
        key: "feedinPower",
        label: "Grid Power",
        unit: "W",
        used: true,
        device_type: USAGE,
    },
    Descriptor {
        key: "pv2Voltage",
        label: "PV2 Voltage",
        unit: "V",
        used: false,
        device_type: VOLTAGE,
    },
    Descriptor {
        key: "pv2Current",
        label: "PV2 Amperage",
        unit: "A",
        used: false,
        device_type: CURRENT,
    },
    Descriptor {
        key: "powerdc2",
        label: "PV2 Power",
        unit: "W",
        used: false,
        device_type: USAGE,
    },
    Descriptor {
        key: "vac1",
        label: "Inverter Voltage",
        unit: "V",
        used: false,
        device_type: VOLTAGE,
    },
    Descriptor {
        key: "iac1",
        label: "Inverter Amperage",
        unit: "A",
        used: false,
        device_type: CURRENT,
    },
    Descriptor {
        key: "fac1",
        label: "Inverter Frequency",
        unit: "Hz",
        used: false,
        device_type: DeviceType::Named("Custom"),
    },
];

lazy_static! {
    static ref BY_KEY: HashMap<&'static str, Variable> = Variable::ALL
        .iter()
        .map(|variable| (variable.key(), *variable))
        .collect();
}

impl Variable {
    pub const ALL: [Variable; 14] = [
        Variable::ServerStatus,
        Variable::EnableFlag,
        Variable::Pv1Voltage,
        Variable::Pv1Current,
        Variable::PowerDc1,
        Variable::Temperature,
        Variable::GridPower,
        Variable::FeedInPower,
        Variable::Pv2Voltage,
        Variable::Pv2Current,
        Variable::PowerDc2,
        Variable::Vac1,
        Variable::Iac1,
        Variable::Fac1,
    ];

    pub fn slot(self) -> Slot {
        self as Slot
    }

    pub fn from_slot(slot: Slot) -> Option<Variable> {
        num::FromPrimitive::from_u8(slot)
    }

    /// Resolve a field of the cloud telemetry record. `server.status` is synthesized locally and
    /// never accepted from the remote side.
    pub fn from_telemetry_key(key: &str) -> Option<Variable> {
        BY_KEY
            .get(key)
            .copied()
            .filter(|variable| *variable != Variable::ServerStatus)
    }

    pub fn descriptor(self) -> &'static Descriptor {
        &DESCRIPTORS[self as usize - 1]
    }

    pub fn key(self) -> &'static str {
        self.descriptor().key
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }
}

/// Format a raw telemetry value the way it is shown on a device.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.to_owned(),
        other => other.to_string(),
    }
}

/// Values the cloud reports for fields it has no data for.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Last raw value seen for every variable.
#[derive(Debug, Default)]
pub struct VariableTable {
    values: HashMap<Variable, Value>,
}

impl VariableTable {
    pub fn get(&self, variable: Variable) -> Option<&Value> {
        self.values.get(&variable)
    }

    pub fn set(&mut self, variable: Variable, value: Value) {
        self.values.insert(variable, value);
    }

    /// The inverter counts as online unless `enableFlag` was last reported as `"0"`.
    pub fn inverter_online(&self) -> bool {
        self.get(Variable::EnableFlag)
            .map(|flag| format_value(flag) != "0")
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn descriptors_follow_slots() {
        for variable in Variable::ALL.iter() {
            assert_eq!(Some(*variable), Variable::from_slot(variable.slot()));
            assert_eq!(
                Some(*variable),
                BY_KEY.get(variable.key()).copied(),
                "{} is indexed under its own key",
                variable.label()
            );
        }

        let slots: HashSet<Slot> = Variable::ALL.iter().map(|v| v.slot()).collect();
        assert_eq!(Variable::ALL.len(), slots.len());
        assert_eq!(None, Variable::from_slot(0));
        assert_eq!(None, Variable::from_slot(15));
    }

    #[test]
    fn telemetry_keys() {
        assert_eq!(
            Some(Variable::Pv1Voltage),
            Variable::from_telemetry_key("pv1Voltage")
        );
        assert_eq!(
            Some(Variable::EnableFlag),
            Variable::from_telemetry_key("enableFlag")
        );
        assert_eq!(None, Variable::from_telemetry_key("server.status"));
        assert_eq!(None, Variable::from_telemetry_key("inverterSN"));
        assert_eq!(None, Variable::from_telemetry_key("PV1Voltage"));
    }

    #[test]
    fn value_formatting() {
        assert_eq!("230.4", format_value(&json!(230.4)));
        assert_eq!("12", format_value(&json!(12)));
        assert_eq!("1", format_value(&json!("1")));
        assert_eq!("", format_value(&Value::Null));

        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!("")));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!("0")));
    }

    #[test]
    fn inverter_online_flag() {
        let mut table = VariableTable::default();
        assert!(table.inverter_online());

        table.set(Variable::EnableFlag, json!("0"));
        assert!(!table.inverter_online());

        table.set(Variable::EnableFlag, json!(0));
        assert!(!table.inverter_online());

        table.set(Variable::EnableFlag, json!("1"));
        assert!(table.inverter_online());
    }
}
