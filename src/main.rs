use config::Config;
use solaxcloud_rs::registry::DomoticzRegistry;
use solaxcloud_rs::{api, model, Poller};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

const ADDRESS: &str = "www.solaxcloud.com";
const PORT: i64 = 6080;
const DOMOTICZ_URL: &str = "http://localhost:8080";

#[derive(Clone, serde::Deserialize)]
pub struct SolaxConfig {
    username: String,
    password: String,
    address: String,
    port: u16,
    /// Seconds between two polls of the cloud
    interval: u64,
    /// Seconds between two heartbeats
    heartbeat: u64,
    timeout: u64,
    debug: bool,
    domoticz_url: String,
    hardware_idx: u32,
}

pub fn read_settings() -> Result<SolaxConfig, config::ConfigError> {
    let mut settings = Config::default();
    settings
        .set_default("address", ADDRESS)?
        .set_default("port", PORT)?
        .set_default("interval", 300_i64)?
        .set_default("heartbeat", 10_i64)?
        .set_default("timeout", 30_i64)?
        .set_default("debug", false)?
        .set_default("domoticz_url", DOMOTICZ_URL)?
        .merge(config::Environment::with_prefix("SOLAX"))?;

    settings.try_into()
}

fn init_logger(debug: bool) {
    let filter = if debug {
        "info,solaxcloud_rs=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn dump_config(settings: &SolaxConfig) {
    log::debug!("'username': '{}'", settings.username);
    log::debug!("'password': '********'");
    log::debug!("'address': '{}'", settings.address);
    log::debug!("'port': '{}'", settings.port);
    log::debug!("'interval': '{}'", settings.interval);
    log::debug!("'heartbeat': '{}'", settings.heartbeat);
    log::debug!("'timeout': '{}'", settings.timeout);
    log::debug!("'domoticz_url': '{}'", settings.domoticz_url);
    log::debug!("'hardware_idx': '{}'", settings.hardware_idx);
}

#[tokio::main]
async fn main() {
    let settings = match read_settings() {
        Ok(settings) => settings,
        Err(e) => {
            env_logger::init();
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logger(settings.debug);
    dump_config(&settings);

    let timeout = Duration::from_secs(settings.timeout);
    let api = match api::api(
        model::api_url(&settings.address, settings.port),
        settings.username.to_owned(),
        settings.password.to_owned(),
        timeout,
    ) {
        Ok(api) => api,
        Err(e) => {
            log::error!("Unable to set up Solax Cloud client: {}", e);
            std::process::exit(1);
        }
    };
    let registry =
        match DomoticzRegistry::new(settings.domoticz_url.to_owned(), settings.hardware_idx, timeout)
        {
            Ok(registry) => registry,
            Err(e) => {
                log::error!("Unable to set up Domoticz client: {}", e);
                std::process::exit(1);
            }
        };

    let mut poller = Poller::new(api, registry, Duration::from_secs(settings.interval));
    poller.on_start().await;

    let mut heartbeat = tokio::time::interval(Duration::from_secs(settings.heartbeat));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                poller.on_heartbeat(Instant::now()).await;
            }
            _ = &mut shutdown => {
                log::info!("Shutting down");
                break;
            }
        }
    }

    poller.on_stop();
}
