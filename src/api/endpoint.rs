pub type Endpoint = str;

pub const LOGIN: &Endpoint = "/proxy//login/login";
pub const MY_SITE: &Endpoint = "/proxy//mysite/mySite";
pub const INVERTER_INFO: &Endpoint = "/proxy//mysite/getInverterInfo";

/* Account type sent with every login */
pub const USER_TYPE: &str = "5";
