use serde::Deserialize;
use serde_json::Value;

/// Identifier the cloud sends either as a JSON string or as a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Id(pub String);

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match Value::deserialize(d)? {
            Value::String(s) if !s.is_empty() => Ok(Id(s)),
            Value::Number(n) => Ok(Id(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected string or numeric id, got {}",
                other
            ))),
        }
    }
}

pub mod login {
    use super::Id;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Result {
        pub token_id: Id,
        pub user_id: Id,
    }

    #[derive(Deserialize)]
    pub struct Login {
        pub result: Result,
    }
}

pub mod my_site {
    use super::Id;
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Site {
        pub site_id: Id,
    }

    #[derive(Deserialize)]
    pub struct MySite {
        pub result: Vec<Site>,
    }
}

#[derive(Deserialize)]
pub struct InverterInfo {
    pub result: Vec<crate::model::TelemetryRecord>,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn read_resource(filename: &str) -> String {
        let mut d = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        d.push(format!("resources/test/{}", filename));
        fs::read_to_string(d.as_path()).unwrap()
    }

    #[test]
    fn login() {
        let input = read_resource("login.json");
        let output: login::Login = serde_json::from_str(&input).unwrap();
        assert_eq!(Id("a1b2c3d4e5".to_string()), output.result.token_id);
        assert_eq!(Id("60412".to_string()), output.result.user_id);
    }

    #[test]
    fn my_site() {
        let input = read_resource("mySite.json");
        let output: my_site::MySite = serde_json::from_str(&input).unwrap();
        assert_eq!(2, output.result.len());
        assert_eq!(Id("12345".to_string()), output.result[0].site_id);
    }

    #[test]
    fn inverter_info() {
        let input = read_resource("getInverterInfo.json");
        let output: InverterInfo = serde_json::from_str(&input).unwrap();
        let record = &output.result[0];
        assert_eq!(Some(&Value::from(230.4)), record.get("pv1Voltage"));
        assert_eq!(Some(&Value::from("1")), record.get("enableFlag"));
    }

    #[test]
    #[should_panic]
    fn login_without_token() {
        let input = r#"{"exception":"Query success!","result":{"userId":60412},"success":true}"#;
        let _output: login::Login = serde_json::from_str(input).unwrap();
    }

    #[test]
    #[should_panic]
    fn empty_id() {
        let _id: Id = serde_json::from_str(r#""""#).unwrap();
    }

    #[test]
    #[should_panic]
    fn inverter_info_invalid_json() {
        let input = read_resource("invalid_json.json");
        let _output: InverterInfo = serde_json::from_str(&input).unwrap();
    }
}
