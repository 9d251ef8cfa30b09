use super::field_array::{ArrayEntry, EntryId, FieldArray};
use super::path;
use super::rules::{Prefix, Rules};
use super::watch::{ChangeKind, Subscription, WatchEvent, WatchFilter, WatchHub};
use super::ValidationMode;
use crate::model::FormValues;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    // Defaults not resolved yet; reads return the placeholder (`None`).
    Pending,
    Ready,
    // Resolved with fallback values after the provider failed.
    Failed(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetValueOptions {
    pub should_dirty: bool,
    pub should_touch: bool,
    pub should_validate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResetOptions {
    pub keep_submit_count: bool,
    pub keep_submit_successful: bool,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            keep_submit_count: true,
            keep_submit_successful: false,
        }
    }
}

impl ResetOptions {
    /// Clears every counter, including the submit count.
    pub fn full() -> Self {
        Self {
            keep_submit_count: false,
            keep_submit_successful: false,
        }
    }

    pub fn after_submit() -> Self {
        Self {
            keep_submit_count: true,
            keep_submit_successful: true,
        }
    }
}

/// Returned by `register`; the presentation binds rows through it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldBinding {
    pub name: String,
}

struct Registration {
    path: String,
    rules: Rules,
    // Some(..) for dynamic arrays: `rules` then apply to `path.<i>.<item_key>`.
    array: Option<FieldArray>,
}

/// One field validation that has to run off the UI thread.
#[derive(Clone, Debug)]
pub struct FieldCheck {
    pub path: String,
    pub value: JsonValue,
    pub ticket: u64,
    pub generation: u64,
    rules: Rules,
}

impl FieldCheck {
    pub fn run(&self) -> CheckResult {
        let (error, notes) = self.rules.evaluate_with_notes(&self.value);
        CheckResult {
            path: self.path.clone(),
            ticket: self.ticket,
            generation: self.generation,
            error,
            notes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub path: String,
    pub ticket: u64,
    pub generation: u64,
    pub error: Option<String>,
    // Skipped checks, for the log.
    pub notes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    Valid(FormValues),
    Invalid(BTreeMap<String, String>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitStep {
    // Not ready, or a round is already in flight.
    Busy,
    // Waiting on deferred checks; the outcome arrives through `apply_check`.
    Pending,
    Done(SubmitOutcome),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldState {
    pub invalid: bool,
    pub is_dirty: bool,
    pub is_touched: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormStateView {
    pub errors: BTreeMap<String, String>,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub is_submitting: bool,
    pub is_submitted: bool,
    pub is_submit_successful: bool,
    pub submit_count: u32,
    pub is_loading: bool,
    pub is_validating: bool,
}

pub struct FormController {
    mode: ValidationMode,
    load: LoadState,
    values: JsonValue,
    defaults: JsonValue,
    fields: Vec<Registration>,
    errors: BTreeMap<String, String>,
    dirty: BTreeSet<String>,
    touched: BTreeSet<String>,
    submitting: bool,
    submitted: bool,
    submit_successful: bool,
    submit_count: u32,
    revision: u64,
    generation: u64,
    next_ticket: u64,
    tickets: HashMap<String, u64>,
    round: Option<HashSet<String>>,
    outcome: Option<SubmitOutcome>,
    outbox: Vec<FieldCheck>,
    hub: WatchHub,
}

impl FormController {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            load: LoadState::Pending,
            values: JsonValue::Null,
            defaults: JsonValue::Null,
            fields: Vec::new(),
            errors: BTreeMap::new(),
            dirty: BTreeSet::new(),
            touched: BTreeSet::new(),
            submitting: false,
            submitted: false,
            submit_successful: false,
            submit_count: 0,
            revision: 0,
            generation: 0,
            next_ticket: 0,
            tickets: HashMap::new(),
            round: None,
            outcome: None,
            outbox: Vec::new(),
            hub: WatchHub::default(),
        }
    }

    // ---- registration -------------------------------------------------------

    pub fn register(&mut self, name: &str, rules: Rules) -> FieldBinding {
        let norm = path::normalize(name);
        if let Some(reg) = self
            .fields
            .iter_mut()
            .find(|r| r.path == norm && r.array.is_none())
        {
            reg.rules = rules;
        } else {
            self.fields.push(Registration {
                path: norm.clone(),
                rules,
                array: None,
            });
        }
        FieldBinding { name: norm }
    }

    pub fn register_array(&mut self, name: &str, item_key: &str, rules: Rules) -> FieldBinding {
        let norm = path::normalize(name);
        let len = self.array_len(&norm);
        let mut fa = FieldArray::new(item_key);
        fa.regenerate(len);
        if let Some(reg) = self
            .fields
            .iter_mut()
            .find(|r| r.path == norm && r.array.is_some())
        {
            reg.rules = rules;
            reg.array = Some(fa);
        } else {
            self.fields.push(Registration {
                path: norm.clone(),
                rules,
                array: Some(fa),
            });
        }
        FieldBinding { name: norm }
    }

    fn rules_for(&self, norm: &str) -> Option<&Rules> {
        for reg in &self.fields {
            match &reg.array {
                None if reg.path == norm => return Some(&reg.rules),
                None => {}
                Some(fa) => {
                    let Some(rest) = norm.strip_prefix(&format!("{}.", reg.path)) else {
                        continue;
                    };
                    let mut it = rest.splitn(2, '.');
                    if let (Some(idx), Some(key)) = (it.next(), it.next()) {
                        let in_range = idx.parse::<usize>().map(|i| i < fa.len()).unwrap_or(false);
                        if in_range && key == fa.item_key {
                            return Some(&reg.rules);
                        }
                    }
                }
            }
        }
        None
    }

    /// Every concrete registered path in registration order, array items expanded.
    pub fn field_paths(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for reg in &self.fields {
            match &reg.array {
                None => out.push(reg.path.clone()),
                Some(fa) => {
                    for i in 0..fa.len() {
                        out.push(path::join(&reg.path, i, &fa.item_key));
                    }
                }
            }
        }
        out
    }

    fn array_len(&self, norm: &str) -> usize {
        path::get(&self.values, norm)
            .and_then(|v| v.as_array())
            .map(|a| a.len())
            .unwrap_or(0)
    }

    fn sync_array_ids(&mut self) {
        for reg in self.fields.iter_mut() {
            if let Some(fa) = &mut reg.array {
                let len = path::get(&self.values, &reg.path)
                    .and_then(|v| v.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                fa.resize(len);
            }
        }
    }

    // ---- reads ---------------------------------------------------------------

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_ready(&self) -> bool {
        !matches!(self.load, LoadState::Pending)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn values_json(&self) -> Option<&JsonValue> {
        if self.is_ready() {
            Some(&self.values)
        } else {
            None
        }
    }

    /// Current value at `name`. `None` while defaults are pending.
    pub fn get_value(&self, name: &str) -> Option<JsonValue> {
        self.values_json().and_then(|v| path::get(v, name)).cloned()
    }

    pub fn get_values(&self) -> Option<FormValues> {
        if !self.is_ready() {
            return None;
        }
        self.typed_values().ok()
    }

    fn typed_values(&self) -> Result<FormValues, String> {
        serde_json::from_value::<FormValues>(self.values.clone()).map_err(|e| format!("{e}"))
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(&path::normalize(name)).map(|s| s.as_str())
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        let norm = path::normalize(name);
        self.rules_for(&norm)
            .map(|r| r.disabled.is_disabled(&self.values))
            .unwrap_or(false)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.rules_for(&path::normalize(name))
            .map(|r| r.required.is_some())
            .unwrap_or(false)
    }

    #[allow(dead_code)]
    pub fn field_state(&self, name: &str) -> FieldState {
        let norm = path::normalize(name);
        let error = self.errors.get(&norm).cloned();
        FieldState {
            invalid: error.is_some(),
            is_dirty: self.dirty.iter().any(|d| path::overlaps(d, &norm)),
            is_touched: self.touched.contains(&norm),
            error,
        }
    }

    pub fn form_state(&self) -> FormStateView {
        FormStateView {
            errors: self.errors.clone(),
            is_dirty: !self.dirty.is_empty(),
            is_valid: self.errors.is_empty(),
            is_submitting: self.submitting,
            is_submitted: self.submitted,
            is_submit_successful: self.submit_successful,
            submit_count: self.submit_count,
            is_loading: !self.is_ready(),
            is_validating: !self.tickets.is_empty(),
        }
    }

    /// Entries of a dynamic array, keyed by stable identity.
    pub fn fields(&self, name: &str) -> Vec<ArrayEntry> {
        let norm = path::normalize(name);
        let Some(fa) = self
            .fields
            .iter()
            .find(|r| r.path == norm)
            .and_then(|r| r.array.as_ref())
        else {
            return Vec::new();
        };
        let items = self
            .values_json()
            .and_then(|v| path::get(v, &norm))
            .and_then(|v| v.as_array());
        fa.ids()
            .iter()
            .enumerate()
            .map(|(index, id)| ArrayEntry {
                id: *id,
                index,
                value: items
                    .and_then(|a| a.get(index))
                    .cloned()
                    .unwrap_or(JsonValue::Null),
            })
            .collect()
    }

    pub fn watch(
        &self,
        filter: WatchFilter,
        callback: impl FnMut(&JsonValue, &WatchEvent) + 'static,
    ) -> Subscription {
        self.hub.subscribe(filter, callback)
    }

    // ---- writes --------------------------------------------------------------

    fn bump(&mut self) {
        self.revision += 1;
    }

    fn notify(&self, name: Option<String>, kind: ChangeKind) {
        self.hub.notify(&self.values, &WatchEvent { name, kind });
    }

    fn refresh_dirty(&mut self, norm: &str) {
        let cur = path::get(&self.values, norm);
        let def = path::get(&self.defaults, norm);
        if cur != def {
            self.dirty.insert(norm.to_string());
        } else {
            self.dirty.remove(norm);
        }
    }

    fn prune_disabled_errors(&mut self) {
        let disabled: Vec<String> = self
            .errors
            .keys()
            .filter(|k| self.is_disabled(k))
            .cloned()
            .collect();
        for k in disabled {
            self.errors.remove(&k);
            self.tickets.remove(&k);
            self.resolve_pending(&k);
        }
    }

    fn revalidate_on_change(&self, norm: &str) -> bool {
        if self.submitted {
            return true;
        }
        match self.mode {
            ValidationMode::OnChange | ValidationMode::All => true,
            ValidationMode::OnTouched => self.touched.contains(norm),
            ValidationMode::OnSubmit | ValidationMode::OnBlur => false,
        }
    }

    /// User typing into a bound row. Raw text is coerced per the field rules.
    pub fn handle_input(&mut self, name: &str, raw: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        let norm = path::normalize(name);
        let Some(rules) = self.rules_for(&norm) else {
            return false;
        };
        if rules.disabled.is_disabled(&self.values) {
            return false;
        }
        let value = rules.value_as.apply(raw);
        if !path::set(&mut self.values, &norm, value) {
            return false;
        }
        self.refresh_dirty(&norm);
        self.prune_disabled_errors();
        self.notify(Some(norm.clone()), ChangeKind::Input);
        if self.revalidate_on_change(&norm) {
            self.validate_path(&norm);
        }
        self.bump();
        true
    }

    pub fn handle_blur(&mut self, name: &str) -> bool {
        if !self.is_ready() {
            return false;
        }
        let norm = path::normalize(name);
        self.touched.insert(norm.clone());
        if matches!(
            self.mode,
            ValidationMode::OnBlur | ValidationMode::OnTouched | ValidationMode::All
        ) {
            self.validate_path(&norm);
        }
        self.bump();
        true
    }

    /// Imperative write. Validates only `name`, and only with `should_validate`.
    pub fn set_value(&mut self, name: &str, value: JsonValue, opts: SetValueOptions) -> bool {
        if !self.is_ready() {
            return false;
        }
        let norm = path::normalize(name);
        if !path::set(&mut self.values, &norm, value) {
            return false;
        }
        self.sync_array_ids();
        if opts.should_dirty {
            self.refresh_dirty(&norm);
        }
        if opts.should_touch {
            self.touched.insert(norm.clone());
        }
        self.prune_disabled_errors();
        self.notify(Some(norm.clone()), ChangeKind::SetValue);
        if opts.should_validate {
            self.validate_path(&norm);
        }
        self.bump();
        true
    }

    /// Validate one field, or all fields when `name` is `None`.
    #[allow(dead_code)]
    pub fn trigger(&mut self, name: Option<&str>) {
        if !self.is_ready() {
            return;
        }
        match name {
            Some(n) => self.validate_path(&path::normalize(n)),
            None => {
                for p in self.field_paths() {
                    self.validate_path(&p);
                }
            }
        }
        self.bump();
    }

    #[allow(dead_code)]
    pub fn clear_errors(&mut self, name: Option<&str>) {
        match name {
            Some(n) => {
                let norm = path::normalize(n);
                self.errors.retain(|k, _| !path::overlaps(k, &norm));
            }
            None => self.errors.clear(),
        }
        self.bump();
    }

    #[allow(dead_code)]
    pub fn set_error(&mut self, name: &str, message: impl Into<String>) {
        self.errors.insert(path::normalize(name), message.into());
        self.bump();
    }

    fn validate_path(&mut self, norm: &str) {
        let Some(rules) = self.rules_for(norm).cloned() else {
            return;
        };
        if rules.disabled.is_disabled(&self.values) {
            self.errors.remove(norm);
            self.tickets.remove(norm);
            self.resolve_pending(norm);
            return;
        }
        let value = path::get(&self.values, norm)
            .cloned()
            .unwrap_or(JsonValue::Null);
        match rules.evaluate_prefix(&value) {
            Prefix::Failed(msg) => {
                self.errors.insert(norm.to_string(), msg);
                self.tickets.remove(norm);
                self.resolve_pending(norm);
            }
            Prefix::Passed => {
                self.errors.remove(norm);
                self.tickets.remove(norm);
                self.resolve_pending(norm);
            }
            Prefix::Deferred => self.enqueue(norm, value, rules),
        }
    }

    fn enqueue(&mut self, norm: &str, value: JsonValue, rules: Rules) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.tickets.insert(norm.to_string(), ticket);
        self.outbox.retain(|c| c.path != norm);
        self.outbox.push(FieldCheck {
            path: norm.to_string(),
            value,
            ticket,
            generation: self.generation,
            rules,
        });
    }

    /// Deferred checks queued since the last call. The caller runs them and
    /// feeds each result back through `apply_check`.
    pub fn take_checks(&mut self) -> Vec<FieldCheck> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply a deferred result. Stale results are dropped. Returns the submit
    /// outcome when this result completed the submit round.
    pub fn apply_check(&mut self, result: CheckResult) -> Option<SubmitOutcome> {
        if result.generation != self.generation
            || self.tickets.get(&result.path) != Some(&result.ticket)
        {
            return None;
        }
        self.tickets.remove(&result.path);
        match result.error {
            Some(msg) if !self.is_disabled(&result.path) => {
                self.errors.insert(result.path.clone(), msg);
            }
            _ => {
                self.errors.remove(&result.path);
            }
        }
        self.resolve_pending(&result.path);
        self.bump();
        self.outcome.take()
    }

    /// Run queued checks inline until none are left.
    pub fn settle(&mut self) -> Option<SubmitOutcome> {
        let mut outcome: Option<SubmitOutcome> = None;
        loop {
            let checks = self.take_checks();
            if checks.is_empty() {
                break;
            }
            for c in checks {
                if let Some(o) = self.apply_check(c.run()) {
                    outcome = Some(o);
                }
            }
        }
        outcome
    }

    /// Outcome of a round completed by something other than `apply_check`
    /// (for example an input that made a pending field fail synchronously).
    pub fn take_outcome(&mut self) -> Option<SubmitOutcome> {
        self.outcome.take()
    }

    // ---- submit --------------------------------------------------------------

    pub fn handle_submit(&mut self) -> SubmitStep {
        if !self.is_ready() || self.round.is_some() {
            return SubmitStep::Busy;
        }
        self.submitting = true;
        self.round = Some(HashSet::new());
        let paths = self.field_paths();
        self.errors.retain(|k, _| paths.contains(k));
        for p in &paths {
            self.validate_path(p);
            if self.tickets.contains_key(p) {
                if let Some(round) = &mut self.round {
                    round.insert(p.clone());
                }
            }
        }
        if self.round.as_ref().map(|r| r.is_empty()).unwrap_or(false) {
            self.finish_round();
        }
        self.bump();
        match self.outcome.take() {
            Some(o) => SubmitStep::Done(o),
            None => SubmitStep::Pending,
        }
    }

    /// Blocking submit: runs deferred checks inline, then calls exactly one
    /// of the handlers.
    #[allow(dead_code)]
    pub fn submit_with(
        &mut self,
        on_valid: impl FnOnce(&FormValues),
        on_invalid: impl FnOnce(&BTreeMap<String, String>),
    ) -> bool {
        let outcome = match self.handle_submit() {
            SubmitStep::Busy => return false,
            SubmitStep::Done(o) => Some(o),
            SubmitStep::Pending => self.settle(),
        };
        match outcome {
            Some(SubmitOutcome::Valid(v)) => {
                on_valid(&v);
                true
            }
            Some(SubmitOutcome::Invalid(e)) => {
                on_invalid(&e);
                true
            }
            None => false,
        }
    }

    fn resolve_pending(&mut self, norm: &str) {
        let done = match &mut self.round {
            Some(round) => round.remove(norm) && round.is_empty(),
            None => false,
        };
        if done {
            self.finish_round();
        }
    }

    fn finish_round(&mut self) {
        self.round = None;
        self.submitting = false;
        self.submitted = true;
        self.submit_count += 1;
        let outcome = if self.errors.is_empty() {
            match self.typed_values() {
                Ok(v) => {
                    self.submit_successful = true;
                    SubmitOutcome::Valid(v)
                }
                Err(e) => {
                    self.errors.insert("root".to_string(), e);
                    self.submit_successful = false;
                    SubmitOutcome::Invalid(self.errors.clone())
                }
            }
        } else {
            self.submit_successful = false;
            SubmitOutcome::Invalid(self.errors.clone())
        };
        self.outcome = Some(outcome);
    }

    // ---- field arrays --------------------------------------------------------

    fn array_index(&self, norm: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|r| r.path == norm && r.array.is_some())
    }

    pub fn append(&mut self, name: &str, record: JsonValue) -> Option<EntryId> {
        if !self.is_ready() {
            return None;
        }
        let norm = path::normalize(name);
        let idx = self.array_index(&norm)?;
        let pushed = if let Some(JsonValue::Array(a)) = path::get_mut(&mut self.values, &norm) {
            a.push(record.clone());
            true
        } else {
            false
        };
        if !pushed && !path::set(&mut self.values, &norm, JsonValue::Array(vec![record])) {
            return None;
        }
        let fa = self.fields[idx].array.as_mut()?;
        if !pushed {
            fa.regenerate(0);
        }
        let id = fa.append();
        self.after_array_change(&norm, ChangeKind::ArrayAppend);
        Some(id)
    }

    /// Remove the entry at `index`; out of range is a no-op.
    pub fn remove(&mut self, name: &str, index: usize) -> Option<EntryId> {
        if !self.is_ready() {
            return None;
        }
        let norm = path::normalize(name);
        let idx = self.array_index(&norm)?;
        if index >= self.array_len(&norm) {
            return None;
        }
        if let Some(JsonValue::Array(a)) = path::get_mut(&mut self.values, &norm) {
            a.remove(index);
        }
        let id = self.fields[idx].array.as_mut()?.remove(index);
        self.after_array_change(&norm, ChangeKind::ArrayRemove);
        id
    }

    fn after_array_change(&mut self, norm: &str, kind: ChangeKind) {
        // Item paths shifted: anything keyed by index under the array is stale.
        self.errors.retain(|k, _| !path::is_under(k, norm));
        self.tickets.retain(|k, _| !path::is_under(k, norm));
        self.outbox.retain(|c| !path::is_under(&c.path, norm));
        let pending: Vec<String> = self
            .round
            .as_ref()
            .map(|r| r.iter().filter(|p| path::is_under(p, norm)).cloned().collect())
            .unwrap_or_default();
        for p in pending {
            self.resolve_pending(&p);
        }
        self.dirty.retain(|k| !path::is_under(k, norm));
        self.refresh_dirty(norm);
        if self.submitted {
            let items: Vec<String> = self
                .field_paths()
                .into_iter()
                .filter(|p| path::is_under(p, norm))
                .collect();
            for p in items {
                self.validate_path(&p);
            }
        }
        self.notify(Some(norm.to_string()), kind);
        self.bump();
    }

    // ---- reset / defaults ----------------------------------------------------

    /// Restore values. `Some(values)` also become the new defaults; `None`
    /// reuses the last resolved defaults.
    pub fn reset(&mut self, values: Option<FormValues>, opts: ResetOptions) {
        match values {
            Some(v) => {
                if let Ok(j) = serde_json::to_value(v) {
                    self.defaults = j;
                }
                if matches!(self.load, LoadState::Pending) {
                    self.load = LoadState::Ready;
                }
            }
            None if !self.is_ready() => return,
            None => {}
        }
        self.values = self.defaults.clone();
        for reg in self.fields.iter_mut() {
            if let Some(fa) = &mut reg.array {
                let len = path::get(&self.values, &reg.path)
                    .and_then(|v| v.as_array())
                    .map(|a| a.len())
                    .unwrap_or(0);
                fa.regenerate(len);
            }
        }
        self.errors.clear();
        self.dirty.clear();
        self.touched.clear();
        self.submitted = false;
        self.submitting = false;
        self.round = None;
        self.outcome = None;
        self.outbox.clear();
        self.tickets.clear();
        self.generation += 1;
        if !opts.keep_submit_count {
            self.submit_count = 0;
        }
        if !opts.keep_submit_successful {
            self.submit_successful = false;
        }
        self.notify(None, ChangeKind::Reset);
        self.bump();
    }

    /// Enter the pending state while defaults are fetched again. Returns the
    /// generation the answer must carry. An open submit round is closed as a
    /// failed attempt.
    pub fn begin_reload(&mut self) -> u64 {
        if self.round.is_some() {
            self.submitted = true;
            self.submit_count += 1;
            self.submit_successful = false;
        }
        self.load = LoadState::Pending;
        self.generation += 1;
        self.outbox.clear();
        self.tickets.clear();
        self.round = None;
        self.outcome = None;
        self.submitting = false;
        self.bump();
        self.generation
    }

    pub fn resolve_defaults(
        &mut self,
        generation: u64,
        values: FormValues,
        opts: ResetOptions,
    ) -> bool {
        if self.is_ready() || generation != self.generation {
            return false;
        }
        self.reset(Some(values), opts);
        self.load = LoadState::Ready;
        true
    }

    pub fn fail_defaults(
        &mut self,
        generation: u64,
        message: impl Into<String>,
        fallback: FormValues,
        opts: ResetOptions,
    ) -> bool {
        if self.is_ready() || generation != self.generation {
            return false;
        }
        self.reset(Some(fallback), opts);
        self.load = LoadState::Failed(message.into());
        true
    }
}
