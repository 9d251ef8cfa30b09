use crate::app::{outcome_effects, Effect};
use crate::channel_form;
use crate::form_core::{FormController, ResetOptions, SubmitStep};
use crate::widgets::form::{build_rows, can_submit, display_value, draw_form, Action, FormView, Row, RowKey};
use crossterm::event::KeyCode;
use ratatui::prelude::*;

pub struct FormWidget {
    pub ctl: FormController,
    pub view: FormView,
    pub rows: Vec<Row>,
    // Draws since mount.
    pub renders: u64,
    selected_key: Option<RowKey>,
}

impl FormWidget {
    pub fn new(title: impl Into<String>, ctl: FormController) -> Self {
        let rows = build_rows(&ctl);
        let selected_key = rows.first().map(|r| r.key());
        Self {
            ctl,
            view: FormView {
                title: title.into(),
                ..Default::default()
            },
            rows,
            renders: 0,
            selected_key,
        }
    }

    /// Rebuild rows and keep the cursor on the same row identity. When that
    /// row is gone the cursor stays at the same position.
    pub fn sync_selection(&mut self) {
        self.rows = build_rows(&self.ctl);
        let found = self
            .selected_key
            .as_ref()
            .and_then(|k| self.rows.iter().position(|r| &r.key() == k));
        let idx = found.unwrap_or_else(|| self.view.selected.min(self.rows.len().saturating_sub(1)));
        self.select(idx);
    }

    fn select(&mut self, idx: usize) {
        self.view.selected = idx;
        self.selected_key = self.rows.get(idx).map(|r| r.key());
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.view.selected)
    }

    pub fn submit(&mut self) -> Vec<Effect> {
        let mut effects: Vec<Effect> = Vec::new();
        if !can_submit(&self.ctl.form_state()) {
            self.view.message = Some("Submit is unavailable: form unchanged, invalid or busy".into());
            return effects;
        }
        match self.ctl.handle_submit() {
            SubmitStep::Busy => self.view.message = Some("Submit already in progress".into()),
            SubmitStep::Pending => self.view.message = Some("Validating…".into()),
            SubmitStep::Done(outcome) => {
                self.view.message = None;
                effects.extend(outcome_effects(&outcome));
            }
        }
        effects
    }

    // Collect work queued by the last controller call.
    fn after_op(&mut self, effects: &mut Vec<Effect>) {
        let checks = self.ctl.take_checks();
        if !checks.is_empty() {
            effects.push(Effect::RunChecks(checks));
        }
        if let Some(outcome) = self.ctl.take_outcome() {
            self.view.message = None;
            effects.extend(outcome_effects(&outcome));
        }
        self.sync_selection();
    }

    fn begin_edit(&mut self, path: &str, label: String) {
        if !self.ctl.is_ready() {
            self.view.message = Some("Default values are still loading".into());
            return;
        }
        if self.ctl.is_disabled(path) {
            self.view.message = Some(format!("{label} is disabled"));
            return;
        }
        self.view.buffer = display_value(self.ctl.get_value(path).as_ref());
        self.view.editing = true;
        self.view.message = None;
    }

    fn end_edit(&mut self) {
        self.view.editing = false;
        if let Some(path) = self.selected_row().and_then(|r| r.path()).map(|p| p.to_string()) {
            self.ctl.handle_blur(&path);
        }
    }

    fn activate(&mut self, effects: &mut Vec<Effect>) {
        let Some(row) = self.selected_row().cloned() else {
            return;
        };
        match row {
            Row::Field { path, label } => self.begin_edit(&path, label.to_string()),
            Row::Item { path, index, .. } => self.begin_edit(&path, format!("#{}", index + 1)),
            Row::Add { array, .. } => {
                if let Some(id) = self.ctl.append(array, channel_form::blank_ph_number()) {
                    effects.push(Effect::Log(format!("appended {array} entry {id}")));
                }
            }
            Row::Action(Action::Submit) => effects.extend(self.submit()),
            Row::Action(Action::GetValues) => match self.ctl.get_values() {
                Some(v) => {
                    let body = serde_json::to_string(&v).unwrap_or_else(|e| format!("<{e}>"));
                    effects.push(Effect::Log(format!("Get values {body}")));
                }
                None => self.view.message = Some("Default values are still loading".into()),
            },
            Row::Action(Action::SetValue) => {
                if channel_form::force_clear_username(&mut self.ctl) {
                    effects.push(Effect::Log("username cleared".into()));
                }
            }
            Row::Action(Action::Reset) => {
                if self.ctl.form_state().is_submitting {
                    self.view.message = Some("Reset is unavailable while submitting".into());
                    return;
                }
                effects.push(Effect::Log("reset requested".into()));
                effects.push(Effect::LoadDefaults {
                    opts: ResetOptions::default(),
                });
            }
        }
    }

    fn remove_selected(&mut self, effects: &mut Vec<Effect>) {
        if let Some(Row::Item { array, index, .. }) = self.selected_row().cloned() {
            if !channel_form::remove_allowed(index) {
                self.view.message = Some("The first phone number cannot be removed".into());
                return;
            }
            if let Some(id) = self.ctl.remove(array, index) {
                effects.push(Effect::Log(format!("removed {array} entry {id}")));
            }
        }
    }
}

impl crate::widgets::Widget for FormWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        self.renders += 1;
        let cursor_on = tick % 2 == 0;
        draw_form(f, area, &self.ctl, &self.rows, &self.view, focused, cursor_on);
    }

    fn on_key(&mut self, key: KeyCode) -> Vec<Effect> {
        let mut effects: Vec<Effect> = Vec::new();
        if self.view.editing {
            let path = self
                .selected_row()
                .and_then(|r| r.path())
                .map(|p| p.to_string());
            match key {
                KeyCode::Char(c) => {
                    self.view.buffer.push(c);
                    if let Some(p) = &path {
                        self.ctl.handle_input(p, &self.view.buffer);
                    }
                }
                KeyCode::Backspace => {
                    self.view.buffer.pop();
                    if let Some(p) = &path {
                        self.ctl.handle_input(p, &self.view.buffer);
                    }
                }
                KeyCode::Enter | KeyCode::Esc => self.end_edit(),
                _ => {}
            }
        } else {
            match key {
                KeyCode::Up => {
                    if self.view.selected > 0 {
                        self.select(self.view.selected - 1);
                    }
                }
                KeyCode::Down => {
                    if self.view.selected + 1 < self.rows.len() {
                        self.select(self.view.selected + 1);
                    }
                }
                KeyCode::Enter => self.activate(&mut effects),
                KeyCode::Char('d') => self.remove_selected(&mut effects),
                KeyCode::Char('s') => effects.extend(self.submit()),
                _ => {}
            }
        }
        self.after_op(&mut effects);
        effects
    }
}
