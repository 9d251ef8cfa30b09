use crate::form_core::{
    Check, Coerce, Disabled, FormController, NamedCheck, Required, Rules, SetValueOptions,
};
use crate::model::{FormValues, PhNumber, Social, UserData};
use crate::services::value_source::ValueSource;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const USERNAME: &str = "username";
pub const EMAIL: &str = "email";
pub const CHANNEL: &str = "channel";
pub const TWITTER: &str = "social.twitter";
pub const FACEBOOK: &str = "social.facebook";
pub const PH_NUMBERS: &str = "phNumbers";
pub const AGE: &str = "age";
pub const DOB: &str = "dob";

const EMAIL_PATTERN: &str =
    r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*$";

/// One entry of the on-screen layout, top to bottom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutItem {
    Field {
        path: &'static str,
        label: &'static str,
    },
    Array {
        path: &'static str,
        item_key: &'static str,
        label: &'static str,
    },
}

pub fn layout() -> Vec<LayoutItem> {
    use LayoutItem::*;
    vec![
        Field { path: USERNAME, label: "Username" },
        Field { path: EMAIL, label: "E-mail" },
        Field { path: CHANNEL, label: "Channel" },
        Field { path: TWITTER, label: "Twitter" },
        Field { path: FACEBOOK, label: "Facebook" },
        Field { path: "phoneNumbers.0", label: "Primary phone number" },
        Field { path: "phoneNumbers.1", label: "Secondary phone number" },
        Array { path: PH_NUMBERS, item_key: "number", label: "List of phone numbers" },
        Field { path: AGE, label: "Age" },
        Field { path: DOB, label: "Date of birth" },
    ]
}

/// Bind every field of the channel form with its rules.
pub fn register_fields(ctl: &mut FormController, source: Arc<dyn ValueSource>) {
    ctl.register(USERNAME, Rules::new().required(Required::message("Username is required")));
    ctl.register(EMAIL, email_rules(source));
    ctl.register(CHANNEL, Rules::new().required(Required::message("Channel is required")));
    ctl.register(
        TWITTER,
        Rules::new()
            .disabled(Disabled::when(|all| {
                all.get(CHANNEL)
                    .and_then(|v| v.as_str())
                    .map(|s| s.is_empty())
                    .unwrap_or(true)
            }))
            .required(Required::message("Enter twitter profile")),
    );
    ctl.register(FACEBOOK, Rules::new());
    ctl.register("phoneNumbers.0", Rules::new());
    ctl.register("phoneNumbers.1", Rules::new());
    ctl.register_array(PH_NUMBERS, "number", Rules::new());
    ctl.register(
        AGE,
        Rules::new()
            .value_as(Coerce::Number)
            .required(Required::message("Age is required")),
    );
    ctl.register(
        DOB,
        Rules::new()
            .value_as(Coerce::Date)
            .required(Required::message("Date of birth is required")),
    );
}

fn email_rules(source: Arc<dyn ValueSource>) -> Rules {
    Rules::new()
        .pattern(EMAIL_PATTERN, "Invalid email format")
        .check(NamedCheck::sync("notAdmin", |v| {
            Check::ensure(v.as_str() != Some("admin@example.com"), "Enter a different email address")
        }))
        .check(NamedCheck::sync("notBlackListed", |v| {
            let s = v.as_str().unwrap_or("");
            Check::ensure(!s.ends_with("baddomain.com"), "This domain is not supported")
        }))
        .check(NamedCheck::deferred("emailAvailable", move |v| {
            let email = v.as_str().unwrap_or("").trim();
            if email.is_empty() {
                return Check::Pass;
            }
            match source.email_taken(email) {
                Ok(true) => Check::Fail("Email already exists".to_string()),
                Ok(false) => Check::Pass,
                Err(e) => Check::Skipped(format!("{e:#}")),
            }
        }))
}

pub fn default_values(user: &UserData, today: NaiveDate) -> FormValues {
    FormValues {
        username: "Batman".to_string(),
        email: user.email.clone(),
        channel: String::new(),
        social: Social::default(),
        phone_numbers: [String::new(), String::new()],
        ph_numbers: vec![PhNumber::default()],
        age: Some(0.0),
        dob: Some(today),
    }
}

/// Seeds used when the user record cannot be fetched.
pub fn fallback_values(today: NaiveDate) -> FormValues {
    default_values(&UserData::default(), today)
}

/// The default-value provider: fetch the user record and fill the seeds.
pub fn load_default_values(source: &dyn ValueSource, user_id: u64) -> Result<FormValues> {
    let user = source
        .fetch_user(user_id)
        .with_context(|| format!("loading default values for user {user_id}"))?;
    Ok(default_values(&user, today()))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn blank_ph_number() -> JsonValue {
    json!({ "number": "" })
}

/// The first dynamic row has no remove control.
pub fn remove_allowed(index: usize) -> bool {
    index > 0
}

/// Empty the username as if the user did it: dirty, touched and validated.
pub fn force_clear_username(ctl: &mut FormController) -> bool {
    ctl.set_value(
        USERNAME,
        JsonValue::String(String::new()),
        SetValueOptions {
            should_dirty: true,
            should_touch: true,
            should_validate: true,
        },
    )
}

pub fn on_submit(values: &FormValues) -> String {
    let body = serde_json::to_string(values).unwrap_or_else(|e| format!("<{e}>"));
    format!("Form submitted {body}")
}

pub fn on_error(errors: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = errors.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("Form errors {{{}}}", parts.join(", "))
}
