use crate::form_core::ValidationMode;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Social {
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub facebook: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PhNumber {
    #[serde(default)]
    pub number: String,
}

/// Everything the channel form holds. Field names follow the wire shape
/// (`phoneNumbers`, `phNumbers`) so paths used for registration match.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormValues {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub social: Social,
    // Always two slots; there is no resize path.
    #[serde(default = "two_phone_numbers")]
    pub phone_numbers: [String; 2],
    #[serde(default)]
    pub ph_numbers: Vec<PhNumber>,
    #[serde(default)]
    pub age: Option<f64>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
}

fn two_phone_numbers() -> [String; 2] {
    [String::new(), String::new()]
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            username: String::new(),
            email: String::new(),
            channel: String::new(),
            social: Social::default(),
            phone_numbers: two_phone_numbers(),
            ph_numbers: Vec::new(),
            age: None,
            dob: None,
        }
    }
}

/// Record returned by the users endpoint. Only `email` is consumed.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserData {
    pub email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FormConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_user_id")]
    pub user_id: u64,
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub mode: ValidationMode,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            api_base: default_api_base(),
            user_id: default_user_id(),
            request_timeout_ms: default_timeout_ms(),
            mode: ValidationMode::default(),
        }
    }
}

fn default_title() -> String {
    "YouTube Form".to_string()
}

fn default_api_base() -> String {
    "https://jsonplaceholder.typicode.com".to_string()
}

fn default_user_id() -> u64 {
    1
}

fn default_timeout_ms() -> u64 {
    5000
}
