use crate::channel_form;
use crate::form_core::{CheckResult, FieldCheck, ResetOptions, SubmitOutcome};
use crate::model::FormValues;
use crate::ui::{AppState, ToastLevel};

pub enum AppMsg {
    DefaultsLoaded {
        generation: u64,
        outcome: Result<FormValues, String>,
    },
    CheckDone(CheckResult),
    // One watch delivery, already formatted.
    Watched(String),
}

pub enum Effect {
    // Re-resolve defaults, then reset with these options.
    LoadDefaults {
        opts: ResetOptions,
    },
    RunChecks(Vec<FieldCheck>),
    Log(String),
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        DefaultsLoaded {
            generation,
            outcome,
        } => {
            let opts = state.reload_opts;
            match outcome {
                Ok(values) => {
                    if state.form.ctl.resolve_defaults(generation, values, opts) {
                        state.dbg(format!("default values loaded (generation {generation})"));
                    } else {
                        state.dbg(format!("stale default values ignored (generation {generation})"));
                    }
                }
                Err(e) => {
                    let fallback = channel_form::fallback_values(channel_form::today());
                    if state.form.ctl.fail_defaults(generation, e.clone(), fallback, opts) {
                        state.dbg(format!("default values failed: {e}"));
                        effects.push(Effect::ShowToast {
                            text: format!("Could not load defaults: {e}"),
                            level: ToastLevel::Error,
                            seconds: 5,
                        });
                    } else {
                        state.dbg(format!("stale default failure ignored: {e}"));
                    }
                }
            }
            state.form.sync_selection();
        }
        CheckDone(result) => {
            for note in &result.notes {
                state.dbg(format!("check skipped on {}: {note}", result.path));
            }
            if let Some(outcome) = state.form.ctl.apply_check(result) {
                effects.extend(outcome_effects(&outcome));
            }
            let more = state.form.ctl.take_checks();
            if !more.is_empty() {
                effects.push(Effect::RunChecks(more));
            }
        }
        Watched(line) => {
            state.dbg(format!("watch: {line}"));
            state.last_watch = Some(line);
        }
    }
    effects
}

/// What follows a completed submit round: the submit handlers' log line, a
/// toast and, after a valid submit, a reset to freshly loaded defaults.
pub fn outcome_effects(outcome: &SubmitOutcome) -> Vec<Effect> {
    match outcome {
        SubmitOutcome::Valid(values) => vec![
            Effect::Log(channel_form::on_submit(values)),
            Effect::ShowToast {
                text: "Form submitted".into(),
                level: ToastLevel::Success,
                seconds: 3,
            },
            Effect::LoadDefaults {
                opts: ResetOptions::after_submit(),
            },
        ],
        SubmitOutcome::Invalid(errors) => {
            let text = match errors.len() {
                1 => "1 field needs attention".to_string(),
                n => format!("{n} fields need attention"),
            };
            vec![
                Effect::Log(channel_form::on_error(errors)),
                Effect::ShowToast {
                    text,
                    level: ToastLevel::Error,
                    seconds: 3,
                },
            ]
        }
    }
}

#[cfg(test)]
mod tests;
