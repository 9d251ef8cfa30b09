use crate::form_core::LoadState;
use crate::ui::AppState;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

const LOG_TAIL: usize = 6;

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Read-only view of the controller: flags, errors, values and the log tail.
pub fn draw_devtool(f: &mut Frame, area: Rect, state: &AppState) {
    let ctl = &state.form.ctl;
    let st = ctl.form_state();
    let load = match ctl.load_state() {
        LoadState::Pending => "pending".to_string(),
        LoadState::Ready => "ready".to_string(),
        LoadState::Failed(e) => format!("failed ({e})"),
    };
    let mut lines: Vec<Line> = vec![
        Line::from(format!("mode: {}  defaults: {load}", ctl.mode().label())),
        Line::from(format!(
            "revision: {}  renders: {}  submit count: {}",
            ctl.revision(),
            state.form.renders,
            st.submit_count
        )),
        Line::from(format!(
            "dirty: {}  valid: {}  validating: {}",
            yes_no(st.is_dirty),
            yes_no(st.is_valid),
            yes_no(st.is_validating)
        )),
        Line::from(format!(
            "submitting: {}  submitted: {}  successful: {}",
            yes_no(st.is_submitting),
            yes_no(st.is_submitted),
            yes_no(st.is_submit_successful)
        )),
        heading("errors"),
    ];
    if st.errors.is_empty() {
        lines.push(Line::from(Span::styled("  (none)", crate::theme::text_muted())));
    }
    for (k, v) in &st.errors {
        lines.push(Line::from(Span::styled(
            format!("  {k}: {v}"),
            crate::theme::text_error(),
        )));
    }
    lines.push(heading("watch"));
    lines.push(Line::from(format!(
        "  {}",
        state.last_watch.as_deref().unwrap_or("(nothing yet)")
    )));
    lines.push(heading("values"));
    match ctl.values_json() {
        Some(v) => {
            let pretty = serde_json::to_string_pretty(v).unwrap_or_else(|e| format!("<{e}>"));
            lines.extend(pretty.lines().map(|l| Line::from(l.to_string())));
        }
        None => lines.push(Line::from(Span::styled("  …", crate::theme::text_muted()))),
    }
    lines.push(heading("log"));
    let start = state.debug_log.len().saturating_sub(LOG_TAIL);
    for s in state.debug_log.iter().skip(start) {
        lines.push(Line::from(Span::styled(
            s.clone(),
            Style::default().fg(Color::Gray),
        )));
    }
    let p = Paragraph::new(lines)
        .block(panel_block("DevTool", false))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_form;
    use crate::form_core::ResetOptions;
    use crate::model::FormConfig;
    use crate::services::value_source::{StaticSource, ValueSource};
    use ratatui::backend::TestBackend;
    use std::sync::Arc;

    fn screen(state: &AppState) -> String {
        let backend = TestBackend::new(70, 60);
        let mut terminal = Terminal::new(backend).unwrap();
        let _ = terminal.draw(|f| {
            let area = f.area();
            draw_devtool(f, area, state);
        });
        let buf = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn shows_pending_then_values_and_errors() {
        let source: Arc<dyn ValueSource> = Arc::new(StaticSource::with_email("bruce@wayne.com"));
        let mut state = AppState::new(FormConfig::default(), source.clone());
        let out = screen(&state);
        assert!(out.contains("defaults: pending"));
        assert!(out.contains("(nothing yet)"));

        let values = channel_form::load_default_values(source.as_ref(), 1).unwrap();
        let g = state.form.ctl.generation();
        state.form.ctl.resolve_defaults(g, values, ResetOptions::default());
        channel_form::force_clear_username(&mut state.form.ctl);
        state.dbg("hello from the log");
        state.last_watch = Some("username changed".into());

        let out = screen(&state);
        assert!(out.contains("defaults: ready"));
        assert!(out.contains("submit count: 0"));
        assert!(out.contains("dirty: yes  valid: no"));
        assert!(out.contains("username: Username is required"));
        assert!(out.contains("\"email\": \"bruce@wayne.com\""));
        assert!(out.contains("username changed"));
        assert!(out.contains("hello from the log"));
    }
}
