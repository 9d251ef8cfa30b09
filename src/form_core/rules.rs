use chrono::NaiveDate;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_REQUIRED_MESSAGE: &str = "This field is required";

/// Result of one named check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Check {
    Pass,
    Fail(String),
    // Could not be decided (e.g. network error); counts as a pass, the note is reported.
    Skipped(String),
}

impl Check {
    /// `Pass` when `ok`, otherwise fail with `message`.
    pub fn ensure(ok: bool, message: impl Into<String>) -> Self {
        if ok {
            Check::Pass
        } else {
            Check::Fail(message.into())
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckMode {
    Sync,
    // Runs off the UI thread (may block on I/O).
    Async,
}

pub type CheckFn = Arc<dyn Fn(&JsonValue) -> Check + Send + Sync>;

#[derive(Clone)]
pub struct NamedCheck {
    pub name: String,
    pub mode: CheckMode,
    pub check: CheckFn,
}

impl NamedCheck {
    pub fn sync(
        name: impl Into<String>,
        f: impl Fn(&JsonValue) -> Check + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            mode: CheckMode::Sync,
            check: Arc::new(f),
        }
    }

    pub fn deferred(
        name: impl Into<String>,
        f: impl Fn(&JsonValue) -> Check + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            mode: CheckMode::Async,
            check: Arc::new(f),
        }
    }
}

impl fmt::Debug for NamedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedCheck")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

pub type DisabledFn = Arc<dyn Fn(&JsonValue) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub enum Disabled {
    #[default]
    Never,
    Always,
    // Evaluated against the whole value tree.
    When(DisabledFn),
}

impl Disabled {
    pub fn when(f: impl Fn(&JsonValue) -> bool + Send + Sync + 'static) -> Self {
        Disabled::When(Arc::new(f))
    }

    pub fn is_disabled(&self, all: &JsonValue) -> bool {
        match self {
            Disabled::Never => false,
            Disabled::Always => true,
            Disabled::When(f) => f(all),
        }
    }
}

impl fmt::Debug for Disabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disabled::Never => write!(f, "Never"),
            Disabled::Always => write!(f, "Always"),
            Disabled::When(_) => write!(f, "When(..)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Required {
    pub message: String,
}

impl Required {
    pub fn flag() -> Self {
        Self {
            message: DEFAULT_REQUIRED_MESSAGE.to_string(),
        }
    }
    pub fn message(m: impl Into<String>) -> Self {
        Self { message: m.into() }
    }
}

#[derive(Clone, Debug)]
pub struct Pattern {
    pub regex: Regex,
    pub message: String,
}

/// How raw input text is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Coerce {
    #[default]
    Text,
    Number,
    Date,
}

impl Coerce {
    pub fn apply(&self, raw: &str) -> JsonValue {
        let t = raw.trim();
        match self {
            Coerce::Text => JsonValue::String(raw.to_string()),
            Coerce::Number => t
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Coerce::Date => NaiveDate::parse_from_str(t, "%Y-%m-%d")
                .map(|d| JsonValue::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(JsonValue::Null),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Rules {
    pub disabled: Disabled,
    pub required: Option<Required>,
    pub pattern: Option<Pattern>,
    pub validate: Vec<NamedCheck>,
    pub value_as: Coerce,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled(mut self, d: Disabled) -> Self {
        self.disabled = d;
        self
    }

    pub fn required(mut self, r: Required) -> Self {
        self.required = Some(r);
        self
    }

    /// Panics on an invalid regex; patterns are compile-time literals.
    pub fn pattern(mut self, re: &str, message: impl Into<String>) -> Self {
        self.pattern = Some(Pattern {
            regex: Regex::new(re).expect("invalid field pattern"),
            message: message.into(),
        });
        self
    }

    pub fn check(mut self, c: NamedCheck) -> Self {
        self.validate.push(c);
        self
    }

    pub fn value_as(mut self, c: Coerce) -> Self {
        self.value_as = c;
        self
    }

    pub fn has_deferred(&self) -> bool {
        self.validate.iter().any(|c| c.mode == CheckMode::Async)
    }

    /// Evaluate the rule chain: required, pattern, then named checks in order.
    /// Returns the first failure message.
    pub fn evaluate(&self, value: &JsonValue) -> Option<String> {
        self.evaluate_with_notes(value).0
    }

    /// Like `evaluate`, also returning notes of checks that were skipped.
    pub fn evaluate_with_notes(&self, value: &JsonValue) -> (Option<String>, Vec<String>) {
        let mut notes = Vec::new();
        if let Some(msg) = self.base_failure(value) {
            return (Some(msg), notes);
        }
        for c in &self.validate {
            match (c.check)(value) {
                Check::Pass => {}
                Check::Fail(msg) => return (Some(msg), notes),
                Check::Skipped(note) => notes.push(format!("{}: {}", c.name, note)),
            }
        }
        (None, notes)
    }

    /// Evaluate everything up to the first deferred check.
    pub fn evaluate_prefix(&self, value: &JsonValue) -> Prefix {
        if let Some(msg) = self.base_failure(value) {
            return Prefix::Failed(msg);
        }
        for c in &self.validate {
            if c.mode == CheckMode::Async {
                return Prefix::Deferred;
            }
            if let Check::Fail(msg) = (c.check)(value) {
                return Prefix::Failed(msg);
            }
        }
        Prefix::Passed
    }

    fn base_failure(&self, value: &JsonValue) -> Option<String> {
        if let Some(req) = &self.required {
            if is_empty(value) {
                return Some(req.message.clone());
            }
        }
        if let Some(p) = &self.pattern {
            if let Some(s) = value.as_str() {
                let st = s.trim();
                if !st.is_empty() && !p.regex.is_match(st) {
                    return Some(p.message.clone());
                }
            }
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    Failed(String),
    Passed,
    // A deferred check must run before the field's result is known.
    Deferred,
}

pub fn is_empty(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_wins_over_later_rules() {
        let r = Rules::new()
            .required(Required::message("Username is required"))
            .check(NamedCheck::sync("never", |_| Check::Fail("nope".into())));
        assert_eq!(r.evaluate(&json!("")).as_deref(), Some("Username is required"));
        assert_eq!(r.evaluate(&json!("  ")).as_deref(), Some("Username is required"));
        assert_eq!(r.evaluate(&json!("bruce")).as_deref(), Some("nope"));
    }

    #[test]
    fn pattern_only_checked_when_non_empty() {
        let r = Rules::new().pattern(r"^\d+$", "digits only");
        assert_eq!(r.evaluate(&json!("")), None);
        assert_eq!(r.evaluate(&json!("12a")).as_deref(), Some("digits only"));
        assert_eq!(r.evaluate(&json!("12")), None);
    }

    #[test]
    fn named_checks_run_in_declaration_order() {
        let r = Rules::new()
            .check(NamedCheck::sync("first", |v| {
                Check::ensure(v != &json!("a"), "first failed")
            }))
            .check(NamedCheck::sync("second", |_| Check::Fail("second failed".into())));
        assert_eq!(r.evaluate(&json!("a")).as_deref(), Some("first failed"));
        assert_eq!(r.evaluate(&json!("b")).as_deref(), Some("second failed"));
    }

    #[test]
    fn prefix_stops_at_first_deferred_check() {
        let r = Rules::new()
            .check(NamedCheck::sync("local", |v| {
                Check::ensure(v != &json!("bad"), "local failed")
            }))
            .check(NamedCheck::deferred("remote", |_| Check::Fail("taken".into())))
            .check(NamedCheck::sync("after", |_| Check::Fail("after failed".into())));
        assert!(r.has_deferred());
        assert_eq!(r.evaluate_prefix(&json!("bad")), Prefix::Failed("local failed".into()));
        // the later sync failure must not win over the deferred one
        assert_eq!(r.evaluate_prefix(&json!("ok")), Prefix::Deferred);
        assert_eq!(r.evaluate(&json!("ok")).as_deref(), Some("taken"));
        assert_eq!(Rules::new().evaluate_prefix(&json!("")), Prefix::Passed);
    }

    #[test]
    fn skipped_check_counts_as_pass_with_note() {
        let r = Rules::new()
            .check(NamedCheck::deferred("remote", |_| Check::Skipped("offline".into())))
            .check(NamedCheck::sync("last", |v| Check::ensure(v != &json!("x"), "last failed")));
        assert_eq!(r.evaluate_with_notes(&json!("ok")), (None, vec!["remote: offline".to_string()]));
        assert_eq!(r.evaluate(&json!("x")).as_deref(), Some("last failed"));
    }

    #[test]
    fn coerce_number_and_date() {
        assert_eq!(Coerce::Number.apply("42"), json!(42.0));
        assert_eq!(Coerce::Number.apply("4x"), JsonValue::Null);
        assert_eq!(Coerce::Date.apply("2024-02-29"), json!("2024-02-29"));
        assert_eq!(Coerce::Date.apply("2023-02-29"), JsonValue::Null);
        assert_eq!(Coerce::Text.apply(" a "), json!(" a "));
    }
}
