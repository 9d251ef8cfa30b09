use super::*;
use crate::form_core::{LoadState, SubmitStep};
use crate::model::FormConfig;
use crate::services::value_source::{StaticSource, ValueSource};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

fn state_with(source: StaticSource) -> AppState {
    let source: Arc<dyn ValueSource> = Arc::new(source);
    AppState::new(FormConfig::default(), source)
}

fn seeds(email: &str) -> FormValues {
    let user = crate::model::UserData {
        email: email.into(),
    };
    channel_form::default_values(&user, NaiveDate::from_ymd_opt(2024, 5, 4).unwrap())
}

fn loaded(st: &mut AppState, email: &str) {
    let generation = st.form.ctl.generation();
    let _ = update(
        st,
        AppMsg::DefaultsLoaded {
            generation,
            outcome: Ok(seeds(email)),
        },
    );
}

// Fill the remaining required fields and start a submit round.
fn submit_pending(st: &mut AppState) -> Vec<FieldCheck> {
    st.form.ctl.handle_input("channel", "Gotham");
    st.form.ctl.handle_input("social.twitter", "@batman");
    assert_eq!(st.form.ctl.handle_submit(), SubmitStep::Pending);
    st.form.ctl.take_checks()
}

fn toast(effects: &[Effect]) -> Option<(&str, ToastLevel)> {
    effects.iter().find_map(|e| match e {
        Effect::ShowToast { text, level, .. } => Some((text.as_str(), *level)),
        _ => None,
    })
}

fn logs(effects: &[Effect]) -> Vec<&str> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Log(l) => Some(l.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn defaults_loaded_resolves_the_form() {
    let mut st = state_with(StaticSource::default());
    loaded(&mut st, "bruce@wayne.com");
    assert!(st.form.ctl.is_ready());
    assert_eq!(st.form.ctl.get_value("email"), Some(json!("bruce@wayne.com")));
    assert!(st
        .debug_log
        .back()
        .unwrap()
        .starts_with("default values loaded"));
}

#[test]
fn stale_defaults_are_ignored() {
    let mut st = state_with(StaticSource::default());
    let effects = update(
        &mut st,
        AppMsg::DefaultsLoaded {
            generation: 99,
            outcome: Ok(seeds("late@example.com")),
        },
    );
    assert!(effects.is_empty());
    assert!(!st.form.ctl.is_ready());
    assert!(st.debug_log.back().unwrap().contains("stale"));
}

#[test]
fn failed_defaults_fall_back_with_toast() {
    let mut st = state_with(StaticSource::default());
    let generation = st.form.ctl.generation();
    let effects = update(
        &mut st,
        AppMsg::DefaultsLoaded {
            generation,
            outcome: Err("connection refused".into()),
        },
    );
    assert_eq!(
        st.form.ctl.load_state(),
        &LoadState::Failed("connection refused".into())
    );
    assert_eq!(st.form.ctl.get_value("email"), Some(json!("")));
    assert_eq!(st.form.ctl.get_value("username"), Some(json!("Batman")));
    let (text, level) = toast(&effects).expect("toast");
    assert_eq!(level, ToastLevel::Error);
    assert!(text.contains("connection refused"));
}

#[test]
fn check_done_completes_a_valid_submit() {
    let mut st = state_with(StaticSource::default());
    loaded(&mut st, "bruce@wayne.com");
    let checks = submit_pending(&mut st);
    assert_eq!(checks.len(), 1);
    let effects = update(&mut st, AppMsg::CheckDone(checks[0].run()));

    assert!(logs(&effects)[0].starts_with("Form submitted {"));
    assert_eq!(toast(&effects), Some(("Form submitted", ToastLevel::Success)));
    assert!(effects.iter().any(
        |e| matches!(e, Effect::LoadDefaults { opts } if *opts == ResetOptions::after_submit())
    ));
    let fs = st.form.ctl.form_state();
    assert_eq!(fs.submit_count, 1);
    assert!(fs.is_submit_successful);
}

#[test]
fn taken_email_makes_submit_invalid() {
    let mut st = state_with(StaticSource {
        taken: vec!["Bruce@Wayne.com".into()],
        ..Default::default()
    });
    loaded(&mut st, "bruce@wayne.com");
    let checks = submit_pending(&mut st);
    let effects = update(&mut st, AppMsg::CheckDone(checks[0].run()));

    assert_eq!(logs(&effects), vec!["Form errors {email: Email already exists}"]);
    assert_eq!(
        toast(&effects),
        Some(("1 field needs attention", ToastLevel::Error))
    );
    assert!(!effects
        .iter()
        .any(|e| matches!(e, Effect::LoadDefaults { .. })));
    assert_eq!(st.form.ctl.error("email"), Some("Email already exists"));
}

#[test]
fn unreachable_lookup_is_logged_and_passes() {
    let mut st = state_with(StaticSource {
        fail: Some("network down".into()),
        ..Default::default()
    });
    loaded(&mut st, "bruce@wayne.com");
    let checks = submit_pending(&mut st);
    let effects = update(&mut st, AppMsg::CheckDone(checks[0].run()));

    assert!(st
        .debug_log
        .iter()
        .any(|l| l == "check skipped on email: emailAvailable: network down"));
    assert_eq!(toast(&effects), Some(("Form submitted", ToastLevel::Success)));
}

#[test]
fn outcome_effects_pluralize() {
    let mut errors = std::collections::BTreeMap::new();
    errors.insert("username".to_string(), "Username is required".to_string());
    errors.insert("channel".to_string(), "Channel is required".to_string());
    let effects = outcome_effects(&SubmitOutcome::Invalid(errors));
    assert_eq!(
        toast(&effects),
        Some(("2 fields need attention", ToastLevel::Error))
    );
}

#[test]
fn watched_line_is_kept_and_logged() {
    let mut st = state_with(StaticSource::default());
    let effects = update(&mut st, AppMsg::Watched("Input channel = \"x\"".into()));
    assert!(effects.is_empty());
    assert_eq!(st.last_watch.as_deref(), Some("Input channel = \"x\""));
    assert_eq!(
        st.debug_log.back().map(|s| s.as_str()),
        Some("watch: Input channel = \"x\"")
    );
}
