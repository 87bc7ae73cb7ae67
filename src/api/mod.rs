pub mod endpoint;
pub mod error;
pub mod response;

use crate::model;
pub use error::Error;
use response::login::Login;
use response::my_site::MySite;
use response::InverterInfo;
use serde_json::Value;

use std::time::Duration;

/// Build a cloud client for `api_url` (see `model::api_url`).
pub fn api(
    api_url: String,
    username: String,
    password: String,
    timeout: Duration,
) -> Result<model::Api, Error> {
    let client = reqwest::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::InternalError(e.to_string()))?;

    Ok(model::Api {
        api_url,
        username,
        password,
        client,
    })
}

/// Map Non-200 API response to Error. The URL is dropped, the login query carries the password.
fn map_api_err(error: reqwest::Error) -> Error {
    let error = error.without_url();
    match error.status() {
        Some(http::StatusCode::TOO_MANY_REQUESTS) => Error::RateExceeded(error.to_string()),
        Some(http::StatusCode::UNAUTHORIZED) | Some(http::StatusCode::FORBIDDEN) => {
            Error::LoginError(error.to_string())
        }
        Some(status) if status.is_client_error() => Error::Refused(error.to_string()),
        _ => Error::ApiError(error.to_string()),
    }
}

/// Process value of valid HTTP response (2xx) to identify API-level error indicated with
/// `"success": false`. A missing `success` is taken as success, the old proxy does not always
/// send it.
fn map_response_status(value: Value) -> Result<Value, Error> {
    let success = value
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(true);

    if success {
        Ok(value)
    } else {
        match value.get("exception").and_then(Value::as_str) {
            Some(exception) => Err(Error::Refused(exception.to_string())),
            None => Err(Error::Refused(value.to_string())),
        }
    }
}

async fn post(request: reqwest::RequestBuilder) -> Result<Value, Error> {
    let response_text = request
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(map_api_err)?
        .text()
        .await
        .map_err(|e| {
            Error::ApiError(format!(
                "Error reading API response: {}",
                e.without_url()
            ))
        })?;

    log::trace!("response_text: {}", response_text);

    serde_json::from_str::<Value>(&response_text)
        .map_err(|e| Error::InvalidResponse(response_text, e.to_string()))
        .and_then(map_response_status)
}

pub async fn login(api: &model::Api) -> Result<model::LoggedInApi, Error> {
    let url = format!("{}{}", api.api_url, endpoint::LOGIN);
    let query = [
        ("password", api.password.as_str()),
        ("userName", api.username.as_str()),
        ("userType", endpoint::USER_TYPE),
    ];

    /* Transport failures stay `ApiError`, only answers refusing the credentials are login errors */
    let value = match post(api.client.post(url).query(&query)).await {
        Err(Error::Refused(s)) => Err(Error::LoginError(s)),
        other => other,
    }?;

    serde_json::from_value::<Login>(value)
        .or(Err(Error::UnexpectedApiResponse))
        .map(|response| model::LoggedInApi {
            api_url: api.api_url.to_owned(),
            token_id: response.result.token_id.0,
            user_id: response.result.user_id.0,
            client: api.client.clone(),
        })
}

/// Resolve the site of the logged in account. Accounts with several sites are served by the
/// first one listed.
pub async fn my_site(api: &model::LoggedInApi) -> Result<model::Site, Error> {
    let url = format!("{}{}", api.api_url, endpoint::MY_SITE);
    let form = [
        ("tokenId", api.token_id.as_str()),
        ("userId", api.user_id.as_str()),
    ];

    post(api.client.post(url).form(&form))
        .await
        .map(serde_json::from_value::<MySite>)?
        .or(Err(Error::UnexpectedApiResponse))?
        .result
        .into_iter()
        .next()
        .map(|site| model::Site { id: site.site_id.0 })
        .ok_or(Error::NoSite)
}

/// Read the telemetry records of every inverter on `site`.
pub async fn inverter_info(
    api: &model::LoggedInApi,
    site: &model::Site,
) -> Result<Vec<model::TelemetryRecord>, Error> {
    let url = format!("{}{}", api.api_url, endpoint::INVERTER_INFO);
    let query = [
        ("siteId", site.id.as_str()),
        ("tokenId", api.token_id.as_str()),
    ];

    post(api.client.post(url).query(&query))
        .await
        .map(serde_json::from_value::<InverterInfo>)?
        .or(Err(Error::UnexpectedApiResponse))
        .map(|response| response.result)
}

/// Full poll sequence: login, first site, inverter info.
pub async fn fetch_telemetry(api: &model::Api) -> Result<Vec<model::TelemetryRecord>, Error> {
    let logged_in_api = login(api).await?;
    let site = my_site(&logged_in_api).await?;
    log::debug!("Reading inverters of site {}", site.id);
    inverter_info(&logged_in_api, &site).await
}
