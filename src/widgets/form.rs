use crate::channel_form::{self, LayoutItem};
use crate::form_core::{path, EntryId, FormController, FormStateView, LoadState};
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use serde_json::Value as JsonValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Submit,
    GetValues,
    SetValue,
    Reset,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Submit,
        Action::GetValues,
        Action::SetValue,
        Action::Reset,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Action::Submit => "[ Submit ]",
            Action::GetValues => "Get values",
            Action::SetValue => "Set value",
            Action::Reset => "Reset",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Row {
    Field {
        path: String,
        label: &'static str,
    },
    Item {
        array: &'static str,
        group: &'static str,
        path: String,
        id: EntryId,
        index: usize,
    },
    Add {
        array: &'static str,
        group: &'static str,
    },
    Action(Action),
}

/// Identity of a row across rebuilds. Dynamic rows are keyed by entry, not
/// by position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowKey {
    Path(String),
    Entry(EntryId),
    Add(&'static str),
    Action(Action),
}

impl Row {
    pub fn key(&self) -> RowKey {
        match self {
            Row::Field { path, .. } => RowKey::Path(path.clone()),
            Row::Item { id, .. } => RowKey::Entry(*id),
            Row::Add { array, .. } => RowKey::Add(array),
            Row::Action(a) => RowKey::Action(*a),
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Row::Field { path, .. } | Row::Item { path, .. } => Some(path),
            _ => None,
        }
    }

    fn group(&self) -> Option<&'static str> {
        match self {
            Row::Item { group, .. } | Row::Add { group, .. } => Some(group),
            _ => None,
        }
    }
}

pub fn build_rows(ctl: &FormController) -> Vec<Row> {
    let mut rows: Vec<Row> = Vec::new();
    for item in channel_form::layout() {
        match item {
            LayoutItem::Field { path, label } => rows.push(Row::Field {
                path: path.to_string(),
                label,
            }),
            LayoutItem::Array {
                path: array,
                item_key,
                label,
            } => {
                for e in ctl.fields(array) {
                    rows.push(Row::Item {
                        array,
                        group: label,
                        path: path::join(array, e.index, item_key),
                        id: e.id,
                        index: e.index,
                    });
                }
                rows.push(Row::Add {
                    array,
                    group: label,
                });
            }
        }
    }
    rows.extend(Action::ALL.iter().map(|a| Row::Action(*a)));
    rows
}

#[derive(Clone, Debug, Default)]
pub struct FormView {
    pub title: String,
    pub selected: usize,
    pub editing: bool,
    // Raw text of the row being edited.
    pub buffer: String,
    pub message: Option<String>,
}

pub fn can_submit(st: &FormStateView) -> bool {
    st.is_dirty && st.is_valid && !st.is_submitting && !st.is_loading
}

/// Text shown for a stored value. `None` (defaults pending) shows a placeholder.
pub fn display_value(v: Option<&JsonValue>) -> String {
    match v {
        None => "…".to_string(),
        Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(JsonValue::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

fn row_label(row: &Row) -> String {
    match row {
        Row::Field { label, .. } => label.to_string(),
        Row::Item { index, .. } => format!("#{}", index + 1),
        Row::Add { .. } => "+ Add phone number".to_string(),
        Row::Action(a) => a.label().to_string(),
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    ctl: &FormController,
    rows: &[Row],
    view: &FormView,
    highlight: bool,
    cursor_on: bool,
) {
    let mut lines: Vec<Line> = Vec::new();
    match ctl.load_state() {
        LoadState::Pending => lines.push(Line::from(Span::styled(
            "Loading default values…",
            crate::theme::text_muted(),
        ))),
        LoadState::Failed(msg) => lines.push(Line::from(Span::styled(
            format!("! Could not load defaults ({msg}); using fallback values"),
            crate::theme::text_error(),
        ))),
        LoadState::Ready => {}
    }
    let st = ctl.form_state();
    let mut last_group: Option<&'static str> = None;
    let mut actions: Vec<Span> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let selected = i == view.selected;
        if let Some(g) = row.group() {
            if last_group != Some(g) {
                lines.push(Line::from(Span::styled(
                    format!("-- {g} --"),
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD),
                )));
                last_group = Some(g);
            }
        }
        let sel = if selected { '›' } else { ' ' };
        match row {
            Row::Field { path, .. } | Row::Item { path, .. } => {
                let disabled = ctl.is_disabled(path);
                let req = if ctl.is_required(path) && !disabled {
                    " *"
                } else {
                    ""
                };
                let mut val = if view.editing && selected {
                    view.buffer.clone()
                } else {
                    display_value(ctl.get_value(path).as_ref())
                };
                if view.editing && selected && cursor_on {
                    val.push('▏');
                }
                let value_style = if disabled {
                    crate::theme::text_muted()
                } else if selected {
                    if view.editing {
                        crate::theme::text_editing_bold()
                    } else {
                        crate::theme::text_active_bold()
                    }
                } else {
                    Style::default()
                };
                let label_style = if disabled {
                    crate::theme::text_muted()
                } else {
                    Style::default()
                };
                let mut spans = vec![
                    Span::styled(format!("{sel} {}{req}: ", row_label(row)), label_style),
                    Span::styled(val, value_style),
                ];
                if disabled {
                    spans.push(Span::styled(" (disabled)", crate::theme::text_muted()));
                }
                if let Row::Item { index, .. } = row {
                    if channel_form::remove_allowed(*index) {
                        spans.push(Span::styled("  [d] remove", crate::theme::text_muted()));
                    }
                }
                lines.push(Line::from(spans));
                if let Some(err) = ctl.error(path) {
                    lines.push(Line::from(Span::styled(
                        format!("  ! {err}"),
                        crate::theme::text_error(),
                    )));
                }
            }
            Row::Add { .. } => {
                let style = if selected {
                    crate::theme::list_cursor_style()
                } else {
                    Style::default().fg(crate::theme::ACTIVE)
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} ")),
                    Span::styled(row_label(row), style),
                ]));
            }
            Row::Action(a) => {
                let enabled = match a {
                    Action::Submit => can_submit(&st),
                    Action::Reset => !st.is_loading && !st.is_submitting,
                    _ => !st.is_loading,
                };
                let style = match (selected, enabled) {
                    (true, true) => crate::theme::list_cursor_style(),
                    (true, false) => Style::default()
                        .fg(crate::theme::MUTED)
                        .bg(crate::theme::ACCENT),
                    (false, true) if *a == Action::Submit => crate::theme::text_active_bold(),
                    (false, true) => Style::default().fg(crate::theme::ACTIVE),
                    (false, false) => crate::theme::text_muted(),
                };
                actions.push(Span::styled(format!("  {}", row_label(row)), style));
            }
        }
    }
    if !actions.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(actions));
    }
    if let Some(msg) = &view.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    let title = if view.editing {
        format!("{} (editing)", view.title)
    } else {
        view.title.clone()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}
