use crate::app::{update, AppMsg, Effect};
use crate::form_core::{path, FormController, ResetOptions, Subscription, WatchFilter};
use crate::model::FormConfig;
use crate::services::value_source::{
    spawn_check, spawn_load_defaults, HttpValueSource, SourceMsg, StaticSource, ValueSource,
};
use crate::widgets::devtool::draw_devtool;
use crate::widgets::form_widget::FormWidget;
use crate::widgets::status_bar::draw_footer;
use crate::widgets::Widget;
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

const HELP: &str = "↑/↓ move  Enter edit/activate  d remove  s submit  F12 devtool  Ctrl+C copy  q quit";

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::LoadDefaults { opts } => {
                state.reload_opts = opts;
                let generation = state.form.ctl.begin_reload();
                state.form.sync_selection();
                state.dbg(format!(
                    "load defaults for user {} (generation {generation})",
                    state.config.user_id
                ));
                spawn_load_defaults(
                    generation,
                    state.config.user_id,
                    state.source.clone(),
                    state.tx.clone(),
                );
            }
            Effect::RunChecks(checks) => {
                for check in checks {
                    state.dbg(format!("check {} (ticket {})", check.path, check.ticket));
                    spawn_check(check, state.tx.clone());
                }
            }
            Effect::Log(line) => state.dbg(line),
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}

pub struct AppState {
    pub(crate) config: FormConfig,
    pub(crate) theme: crate::theme::Theme,
    pub(crate) form: FormWidget,
    source: Arc<dyn ValueSource>,
    pub(crate) tick: u64,
    pub(crate) show_devtool: bool,
    pub(crate) toast: Option<Toast>,
    // Options for the reset that follows the pending default load.
    pub(crate) reload_opts: ResetOptions,
    pub(crate) last_watch: Option<String>,
    // Debug log (rendered in the DevTool pane and the bottom strip)
    pub(crate) debug_log: VecDeque<String>,
    watch_feed: Rc<RefCell<VecDeque<String>>>,
    watch_sub: Option<Subscription>,
    tx: Sender<SourceMsg>,
    rx: Receiver<SourceMsg>,
}

impl AppState {
    pub fn new(config: FormConfig, source: Arc<dyn ValueSource>) -> Self {
        let mut ctl = FormController::new(config.mode);
        crate::channel_form::register_fields(&mut ctl, source.clone());
        let form = FormWidget::new(config.title.clone(), ctl);
        let (tx, rx) = mpsc::channel::<SourceMsg>();
        Self {
            config,
            theme: crate::theme::Theme::dark(),
            form,
            source,
            tick: 0,
            show_devtool: true,
            toast: None,
            reload_opts: ResetOptions::full(),
            last_watch: None,
            debug_log: VecDeque::new(),
            watch_feed: Rc::new(RefCell::new(VecDeque::new())),
            watch_sub: None,
            tx,
            rx,
        }
    }

    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }

    /// Subscribe to value changes and request the first defaults.
    pub fn mount(&mut self) {
        let feed = self.watch_feed.clone();
        let sub = self.form.ctl.watch(WatchFilter::All, move |values, ev| {
            let line = match &ev.name {
                Some(name) => {
                    let v = path::get(values, name)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "null".to_string());
                    format!("{:?} {name} = {v}", ev.kind)
                }
                None => format!("{:?} (all fields)", ev.kind),
            };
            feed.borrow_mut().push_back(line);
        });
        self.watch_sub = Some(sub);
        self.dbg(format!("mounted {} ({})", self.config.title, self.form.ctl.mode().label()));
        run_effects(
            self,
            vec![Effect::LoadDefaults {
                opts: ResetOptions::full(),
            }],
        );
    }

    pub fn unmount(&mut self) {
        if let Some(sub) = self.watch_sub.take() {
            sub.unsubscribe();
            self.dbg("watch subscription released");
        }
    }

    /// Apply everything that arrived since the last call: worker results and
    /// watch deliveries. Returns how many messages were handled.
    pub fn pump(&mut self) -> usize {
        let mut msgs: Vec<AppMsg> = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            msgs.push(match msg {
                SourceMsg::Defaults {
                    generation,
                    outcome,
                } => AppMsg::DefaultsLoaded {
                    generation,
                    outcome,
                },
                SourceMsg::Check(result) => AppMsg::CheckDone(result),
            });
        }
        let mut handled = 0;
        for msg in msgs {
            let effects = update(self, msg);
            run_effects(self, effects);
            handled += 1;
        }
        // Deliveries caused by the messages above are picked up here.
        let watched: Vec<String> = self.watch_feed.borrow_mut().drain(..).collect();
        for line in watched {
            let effects = update(self, AppMsg::Watched(line));
            run_effects(self, effects);
            handled += 1;
        }
        handled
    }

    fn copy_values(&mut self) {
        let Some(values) = self.form.ctl.get_values() else {
            return;
        };
        let content = match serde_json::to_string_pretty(&values) {
            Ok(s) => s,
            Err(e) => {
                self.dbg(format!("copy failed: {e}"));
                return;
            }
        };
        if let Ok(mut clipboard) = arboard::Clipboard::new() {
            let _ = clipboard.set_text(&content);
            run_effects(
                self,
                vec![Effect::ShowToast {
                    text: "Copied values to clipboard".into(),
                    level: ToastLevel::Info,
                    seconds: 2,
                }],
            );
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug)]
pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

fn make_source(config: &FormConfig) -> Result<Arc<dyn ValueSource>> {
    if env_flag("CHANNEL_FORM_OFFLINE") {
        return Ok(Arc::new(StaticSource::with_email("Sincere@april.biz")));
    }
    let http = HttpValueSource::new(config).context("building HTTP value source")?;
    Ok(Arc::new(http))
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let source = make_source(&cfg)?;
    let mut state = AppState::new(cfg, source);
    // Headless smoke mode
    let headless = env_flag("CHANNEL_FORM_HEADLESS");
    let headless_ticks: u64 = std::env::var("CHANNEL_FORM_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let headless_summary = env_flag("CHANNEL_FORM_SMOKE_SUMMARY");
    if headless {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        let tick_rate = Duration::from_millis(200);
        let mut last_tick = Instant::now();
        let mut messages = 0usize;
        state.mount();
        for _ in 0..headless_ticks {
            terminal.draw(|f| ui(f, &mut state))?;
            messages += state.pump();
            if last_tick.elapsed() >= tick_rate {
                state.tick = state.tick.wrapping_add(1);
                last_tick = Instant::now();
            }
            std::thread::sleep(tick_rate);
        }
        state.unmount();
        if headless_summary {
            let st = state.form.ctl.form_state();
            let defaults = match state.form.ctl.load_state() {
                crate::form_core::LoadState::Pending => "pending",
                crate::form_core::LoadState::Ready => "ready",
                crate::form_core::LoadState::Failed(_) => "failed",
            };
            let summary = serde_json::json!({
                "ok": defaults == "ready",
                "defaults": defaults,
                "messages": messages,
                "revision": state.form.ctl.revision(),
                "renders": state.form.renders,
                "errors": st.errors.len(),
                "submit_count": st.submit_count,
                "values": state.form.ctl.get_values(),
            });
            println!("{summary}");
        }
        return Ok(());
    }
    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    state.mount();
    let res = loop {
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let editing = state.form.view.editing;
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        state.copy_values();
                    }
                    KeyCode::Char('q') if !editing => break Ok(()),
                    KeyCode::F(12) => {
                        state.show_devtool = !state.show_devtool;
                    }
                    code => {
                        let effs = state.form.on_key(code);
                        run_effects(&mut state, effs);
                    }
                }
            }
        }
        state.pump();
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    state.unmount();
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    res
}

fn load_config() -> Result<FormConfig> {
    // 1) Explicit file
    if let Ok(p) = std::env::var("CHANNEL_FORM_CONFIG") {
        let p = PathBuf::from(p);
        return read_config(&p);
    }
    // 2) ./channel-form.yaml
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let p = cwd.join("channel-form.yaml");
    if p.exists() {
        return read_config(&p);
    }
    Ok(FormConfig::default())
}

fn read_config(p: &Path) -> Result<FormConfig> {
    let s = fs::read_to_string(p).with_context(|| format!("reading {p:?}"))?;
    let cfg: FormConfig = serde_yaml::from_str(&s).with_context(|| format!("parsing {p:?}"))?;
    Ok(cfg)
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
    let screen = f.area();
    f.render_widget(Block::default().style(state.theme.base_style()), screen);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(screen);
    let main = rows[0];
    if state.show_devtool {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main);
        let tick = state.tick;
        state.form.render(f, cols[0], true, tick);
        draw_devtool(f, cols[1], state);
    } else {
        let tick = state.tick;
        state.form.render(f, main, true, tick);
    }
    draw_debug(f, rows[1], state);
    draw_footer(f, rows[2], state, HELP);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height.saturating_sub(1) as usize;
    let total = state.debug_log.len();
    let start = total.saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn offline_state() -> AppState {
        AppState::new(
            FormConfig::default(),
            Arc::new(StaticSource::with_email("bruce@wayne.com")),
        )
    }

    // Workers answer on other threads; wait until something arrives.
    fn pump_until(state: &mut AppState, mut done: impl FnMut(&AppState) -> bool) {
        for _ in 0..200 {
            state.pump();
            if done(state) {
                return;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        panic!("condition not reached");
    }

    #[test]
    fn mount_loads_defaults_and_reports_watch() {
        let mut state = offline_state();
        state.mount();
        assert!(!state.form.ctl.is_ready());
        pump_until(&mut state, |s| s.form.ctl.is_ready());
        assert_eq!(
            state.form.ctl.get_value("email"),
            Some(serde_json::json!("bruce@wayne.com"))
        );
        assert_eq!(state.last_watch.as_deref(), Some("Reset (all fields)"));
        assert!(state
            .debug_log
            .iter()
            .any(|l| l.starts_with("default values loaded")));
    }

    #[test]
    fn unmount_stops_watch_deliveries() {
        let mut state = offline_state();
        state.mount();
        pump_until(&mut state, |s| s.form.ctl.is_ready());
        state.unmount();
        state.last_watch = None;
        state.form.ctl.handle_input("channel", "Gotham");
        state.pump();
        assert!(state.last_watch.is_none());
    }

    #[test]
    fn typing_is_delivered_to_watch() {
        let mut state = offline_state();
        state.mount();
        pump_until(&mut state, |s| s.form.ctl.is_ready());
        state.form.ctl.handle_input("channel", "Gotham");
        state.pump();
        assert_eq!(
            state.last_watch.as_deref(),
            Some("Input channel = \"Gotham\"")
        );
    }

    #[test]
    fn valid_submit_reloads_defaults_and_keeps_the_count() {
        let mut state = offline_state();
        state.mount();
        pump_until(&mut state, |s| s.form.ctl.is_ready());
        state.form.ctl.handle_input("channel", "Gotham");
        state.form.ctl.handle_input("social.twitter", "@batman");
        let effects = state.form.submit();
        assert!(effects.iter().any(|e| matches!(e, Effect::RunChecks(_))));
        run_effects(&mut state, effects);

        // the email check answers, then the after-submit reload resolves
        pump_until(&mut state, |s| {
            s.form.ctl.form_state().submit_count == 1 && s.form.ctl.is_ready()
        });
        let fs = state.form.ctl.form_state();
        assert!(fs.is_submit_successful);
        assert!(!fs.is_submitted);
        assert!(!fs.is_dirty);
        assert_eq!(
            state.form.ctl.get_value("channel"),
            Some(serde_json::json!(""))
        );
        assert_eq!(
            state.form.ctl.get_value("email"),
            Some(serde_json::json!("bruce@wayne.com"))
        );
        assert!(state
            .debug_log
            .iter()
            .any(|l| l.starts_with("Form submitted {")));
        assert_eq!(
            state.toast.as_ref().map(|t| t.text.as_str()),
            Some("Form submitted")
        );
    }

    #[test]
    fn toast_expires_after_its_ticks() {
        let mut state = offline_state();
        run_effects(
            &mut state,
            vec![Effect::ShowToast {
                text: "hi".into(),
                level: ToastLevel::Info,
                seconds: 1,
            }],
        );
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        assert!(state.toast.is_some());
        state.tick = 5;
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        assert!(state.toast.is_none());
    }

    #[test]
    fn layout_renders_form_devtool_and_footer() {
        let mut state = offline_state();
        let backend = TestBackend::new(160, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        let buf = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        assert!(out.contains("YouTube Form"));
        assert!(out.contains("DevTool"));
        assert!(out.contains("Debug"));
        assert!(out.contains("q quit"));
        assert_eq!(state.form.renders, 1);

        state.show_devtool = false;
        terminal.draw(|f| ui(f, &mut state)).unwrap();
        let buf = terminal.backend().buffer().clone();
        let top: String = (0..buf.area.width).map(|x| buf[(x, 0)].symbol()).collect();
        assert!(!top.contains("DevTool"));
    }

    #[test]
    fn config_parses_yaml_file() {
        let dir = std::env::temp_dir().join(format!("channel-form-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let p = dir.join("channel-form.yaml");
        fs::write(&p, "title: Demo\nuser_id: 3\nmode: onBlur\n").unwrap();
        let cfg = read_config(&p).unwrap();
        assert_eq!(cfg.title, "Demo");
        assert_eq!(cfg.user_id, 3);
        assert_eq!(cfg.mode, crate::form_core::ValidationMode::OnBlur);
        let _ = fs::remove_dir_all(&dir);
    }
}
