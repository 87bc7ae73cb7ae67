use super::{DeviceInfo, DeviceRegistry, DeviceSpec, Error};
use crate::variables::{DeviceType, Slot, Variable};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use std::collections::HashMap;
use std::time::Duration;

const JSON_ENDPOINT: &str = "/json.htm";

#[derive(Deserialize)]
struct Device {
    idx: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "HardwareID")]
    hardware_id: u32,
    #[serde(rename = "Data")]
    data: Option<String>,
}

#[derive(Deserialize)]
struct DeviceList {
    #[serde(default)]
    result: Vec<Device>,
}

#[derive(Debug, Clone)]
struct Known {
    idx: String,
    name: String,
    s_value: Option<String>,
}

/// Resolve generic type names to Domoticz type/subtype ids.
fn type_ids(device_type: DeviceType) -> Result<(u8, u8), Error> {
    match device_type {
        DeviceType::Typed {
            device_type,
            subtype,
        } => Ok((device_type, subtype)),
        DeviceType::Named("Alert") => Ok((243, 22)),
        DeviceType::Named("Custom") => Ok((243, 31)),
        DeviceType::Named(other) => Err(Error::Rejected(format!(
            "unsupported device type name {}",
            other
        ))),
    }
}

fn idx_of(value: &Value) -> Option<String> {
    match value.get("idx")? {
        Value::String(s) => Some(s.to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Devices of one Dummy hardware in Domoticz, driven through its JSON API. A device belongs to a
/// slot when its name is the label of the slot's variable.
pub struct DomoticzRegistry {
    base_url: String,
    hardware_idx: u32,
    client: reqwest::Client,
    devices: HashMap<Slot, Known>,
    synced: bool,
}

impl DomoticzRegistry {
    pub fn new(
        base_url: impl Into<String>,
        hardware_idx: u32,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(DomoticzRegistry {
            base_url: base_url.into(),
            hardware_idx,
            client,
            devices: HashMap::new(),
            synced: false,
        })
    }

    async fn command(&self, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = format!("{}{}", self.base_url, JSON_ENDPOINT);

        let response_text = self
            .client
            .get(url)
            .query(&[("type", "command")])
            .query(params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::Transport(e.to_string()))?
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        log::trace!("params: {:?}, response_text: {}", params, response_text);

        let value = serde_json::from_str::<Value>(&response_text)
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", e, response_text)))?;

        match value.get("status").and_then(Value::as_str) {
            Some("OK") => Ok(value),
            _ => Err(Error::Rejected(
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string()),
            )),
        }
    }
}

#[async_trait]
impl DeviceRegistry for DomoticzRegistry {
    fn ready(&self) -> bool {
        self.synced
    }

    fn contains(&self, slot: Slot) -> bool {
        self.devices.contains_key(&slot)
    }

    fn s_value(&self, slot: Slot) -> Option<String> {
        self.devices.get(&slot).and_then(|known| known.s_value.clone())
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<DeviceInfo> = self
            .devices
            .iter()
            .map(|(slot, known)| DeviceInfo {
                slot: *slot,
                id: known.idx.to_owned(),
                name: known.name.to_owned(),
                s_value: known.s_value.clone(),
            })
            .collect();
        devices.sort_by_key(|device| device.slot);
        devices
    }

    async fn refresh(&mut self) -> Result<(), Error> {
        let value = self
            .command(&[
                ("param", "getdevices".to_string()),
                ("filter", "all".to_string()),
                ("used", "all".to_string()),
            ])
            .await?;

        let listing = serde_json::from_value::<DeviceList>(value)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let mut devices = HashMap::new();
        for device in listing
            .result
            .into_iter()
            .filter(|device| device.hardware_id == self.hardware_idx)
        {
            let variable = match Variable::ALL.iter().find(|v| v.label() == device.name) {
                Some(variable) => variable,
                None => continue,
            };
            let slot = variable.slot();

            /* Keep the value we wrote ourselves, the listing only has the formatted `Data` */
            let s_value = match self.devices.get(&slot) {
                Some(known) if known.idx == device.idx => known.s_value.clone(),
                _ => device.data,
            };

            devices.insert(
                slot,
                Known {
                    idx: device.idx,
                    name: device.name,
                    s_value,
                },
            );
        }

        log::debug!(
            "{} devices found on hardware {}",
            devices.len(),
            self.hardware_idx
        );
        self.devices = devices;
        self.synced = true;
        Ok(())
    }

    async fn create(&mut self, spec: &DeviceSpec) -> Result<(), Error> {
        let (device_type, subtype) = type_ids(spec.device_type)?;

        let mut params = vec![
            ("param", "createdevice".to_string()),
            ("idx", self.hardware_idx.to_string()),
            ("sensorname", spec.name.to_string()),
            ("devicetype", device_type.to_string()),
            ("devicesubtype", subtype.to_string()),
        ];
        if let Some(options) = &spec.options {
            params.push(("sensoroptions", options.to_owned()));
        }

        let value = self.command(&params).await?;
        let idx = idx_of(&value)
            .ok_or_else(|| Error::InvalidResponse(format!("no idx in {}", value)))?;

        self.command(&[
            ("param", "setused".to_string()),
            ("idx", idx.to_owned()),
            ("used", spec.used.to_string()),
            ("customimage", spec.image.to_string()),
        ])
        .await?;

        self.devices.insert(
            spec.slot,
            Known {
                idx,
                name: spec.name.to_string(),
                s_value: Some(String::new()),
            },
        );
        Ok(())
    }

    async fn update(&mut self, slot: Slot, n_value: u8, s_value: &str) -> Result<(), Error> {
        let idx = self
            .devices
            .get(&slot)
            .map(|known| known.idx.to_owned())
            .ok_or(Error::UnknownSlot(slot))?;

        self.command(&[
            ("param", "udevice".to_string()),
            ("idx", idx),
            ("nvalue", n_value.to_string()),
            ("svalue", s_value.to_string()),
        ])
        .await?;

        if let Some(known) = self.devices.get_mut(&slot) {
            known.s_value = Some(s_value.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn registry(url: String) -> DomoticzRegistry {
        DomoticzRegistry::new(url, 3, Duration::from_secs(5)).unwrap()
    }

    fn param(key: &str, value: &str) -> Matcher {
        Matcher::UrlEncoded(key.into(), value.into())
    }

    #[tokio::test]
    async fn refresh_maps_devices_by_label() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", JSON_ENDPOINT)
            .match_query(Matcher::AllOf(vec![
                param("type", "command"),
                param("param", "getdevices"),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "status": "OK",
                    "result": [
                        {"idx": "21", "Name": "Server Status", "HardwareID": 3, "Data": "Solax Cloud Server Up"},
                        {"idx": "22", "Name": "PV1 Voltage", "HardwareID": 3, "Data": "230.4 V"},
                        {"idx": "23", "Name": "PV1 Voltage", "HardwareID": 4, "Data": "1.0 V"},
                        {"idx": "24", "Name": "Kitchen Light", "HardwareID": 3, "Data": "On"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut registry = registry(server.url());
        assert!(!registry.ready());
        registry.refresh().await.unwrap();

        assert!(registry.ready());
        assert!(registry.contains(Variable::ServerStatus.slot()));
        assert!(registry.contains(Variable::Pv1Voltage.slot()));
        assert!(!registry.contains(Variable::EnableFlag.slot()));
        assert_eq!(
            Some("Solax Cloud Server Up".to_string()),
            registry.s_value(Variable::ServerStatus.slot())
        );
        let ids: Vec<String> = registry.devices().into_iter().map(|d| d.id).collect();
        assert_eq!(vec!["21".to_string(), "22".to_string()], ids);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_then_update() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("GET", JSON_ENDPOINT)
            .match_query(Matcher::AllOf(vec![
                param("param", "createdevice"),
                param("idx", "3"),
                param("sensorname", "Inverter Frequency"),
                param("devicetype", "243"),
                param("devicesubtype", "31"),
                param("sensoroptions", "1;Hz"),
            ]))
            .with_status(200)
            .with_body(json!({"status": "OK", "idx": "40"}).to_string())
            .create_async()
            .await;
        let set_used = server
            .mock("GET", JSON_ENDPOINT)
            .match_query(Matcher::AllOf(vec![
                param("param", "setused"),
                param("idx", "40"),
                param("used", "false"),
                param("customimage", "17"),
            ]))
            .with_status(200)
            .with_body(json!({"status": "OK"}).to_string())
            .create_async()
            .await;
        let update = server
            .mock("GET", JSON_ENDPOINT)
            .match_query(Matcher::AllOf(vec![
                param("param", "udevice"),
                param("idx", "40"),
                param("nvalue", "0"),
                param("svalue", "50.01"),
            ]))
            .with_status(200)
            .with_body(json!({"status": "OK"}).to_string())
            .create_async()
            .await;

        let mut registry = registry(server.url());
        let slot = Variable::Fac1.slot();
        registry
            .create(&DeviceSpec::from(Variable::Fac1))
            .await
            .unwrap();
        assert!(registry.contains(slot));

        registry.update(slot, 0, "50.01").await.unwrap();
        assert_eq!(Some("50.01".to_string()), registry.s_value(slot));

        create.assert_async().await;
        set_used.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn update_unknown_slot() {
        let server = Server::new_async().await;
        let mut registry = registry(server.url());

        assert!(matches!(
            registry.update(5, 0, "1").await,
            Err(Error::UnknownSlot(5))
        ));
    }

    #[tokio::test]
    async fn rejected_command() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", JSON_ENDPOINT)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"status": "ERR", "message": "No hardware"}).to_string())
            .create_async()
            .await;

        let mut registry = registry(server.url());
        match registry.refresh().await {
            Err(Error::Rejected(message)) => assert_eq!("No hardware", message),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!registry.ready());
    }
}
