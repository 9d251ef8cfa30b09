pub mod controller;
pub mod field_array;
pub mod path;
pub mod rules;
pub mod watch;

use serde::Deserialize;

pub use controller::{
    CheckResult, FieldBinding, FieldCheck, FieldState, FormController, FormStateView, LoadState,
    ResetOptions, SetValueOptions, SubmitOutcome, SubmitStep,
};
pub use field_array::{ArrayEntry, EntryId};
pub use rules::{Check, Coerce, Disabled, NamedCheck, Required, Rules};
pub use watch::{ChangeKind, Subscription, WatchEvent, WatchFilter};

/// When field validation runs before the first submit. After a submit,
/// changed fields are always re-validated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationMode {
    #[default]
    OnSubmit,
    OnBlur,
    OnChange,
    OnTouched,
    All,
}

impl ValidationMode {
    pub fn label(&self) -> &'static str {
        match self {
            ValidationMode::OnSubmit => "onSubmit",
            ValidationMode::OnBlur => "onBlur",
            ValidationMode::OnChange => "onChange",
            ValidationMode::OnTouched => "onTouched",
            ValidationMode::All => "all",
        }
    }
}
