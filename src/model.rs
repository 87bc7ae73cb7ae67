use serde_json::{Map, Value};

/// Flat field name → value record reported for one inverter.
pub type TelemetryRecord = Map<String, Value>;

#[derive(Debug, Clone)]
pub struct Api {
    pub api_url: String,
    pub username: String,
    pub password: String,
    pub client: reqwest::Client,
}

#[derive(Debug)]
pub struct LoggedInApi {
    pub api_url: String,
    pub token_id: String,
    pub user_id: String,
    pub client: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
}

/// Base URL of the cloud proxy, e.g. `http://www.solaxcloud.com:6080`.
pub fn api_url(address: &str, port: u16) -> String {
    format!("http://{}:{}", address, port)
}
