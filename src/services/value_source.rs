use crate::form_core::{CheckResult, FieldCheck};
use crate::channel_form;
use crate::model::{FormConfig, FormValues, UserData};
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Remote collaborator behind the form: the default user record and the
/// email uniqueness lookup.
pub trait ValueSource: Send + Sync {
    fn fetch_user(&self, id: u64) -> Result<UserData>;
    fn email_taken(&self, email: &str) -> Result<bool>;
}

pub struct HttpValueSource {
    base: String,
    client: reqwest::blocking::Client,
}

impl HttpValueSource {
    pub fn new(cfg: &FormConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base: cfg.api_base.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl ValueSource for HttpValueSource {
    fn fetch_user(&self, id: u64) -> Result<UserData> {
        let url = format!("{}/users/{}", self.base, id);
        let resp = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", resp.status()));
        }
        resp.json::<UserData>()
            .with_context(|| format!("decoding user record from {url}"))
    }

    fn email_taken(&self, email: &str) -> Result<bool> {
        let key = email.trim().to_string();
        if let Some(hit) = cached_lookup(&key) {
            return Ok(hit);
        }
        let url = format!("{}/users", self.base);
        let resp = self
            .client
            .get(&url)
            .query(&[("email", key.as_str())])
            .send()
            .with_context(|| format!("GET {url}?email="))?;
        if !resp.status().is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", resp.status()));
        }
        let users: Vec<serde_json::Value> = resp
            .json()
            .with_context(|| format!("decoding user list from {url}"))?;
        let taken = !users.is_empty();
        store_lookup(key, taken);
        Ok(taken)
    }
}

// Uniqueness answers keyed by the trimmed email exactly as queried.
static LOOKUP_CACHE: OnceLock<Mutex<HashMap<String, (Instant, bool)>>> = OnceLock::new();

fn lookup_cache() -> &'static Mutex<HashMap<String, (Instant, bool)>> {
    LOOKUP_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn lookup_ttl() -> Option<Duration> {
    match std::env::var("CHANNEL_FORM_LOOKUP_TTL_SEC")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
    {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(Duration::from_secs(30)),
    }
}

fn cached_lookup(key: &str) -> Option<bool> {
    let ttl = lookup_ttl()?;
    let map = lookup_cache().lock().ok()?;
    match map.get(key) {
        Some((ts, taken)) if ts.elapsed() <= ttl => Some(*taken),
        _ => None,
    }
}

fn store_lookup(key: String, taken: bool) {
    if lookup_ttl().is_none() {
        return;
    }
    if let Ok(mut map) = lookup_cache().lock() {
        map.insert(key, (Instant::now(), taken));
    }
}

pub enum SourceMsg {
    Defaults {
        generation: u64,
        outcome: Result<FormValues, String>,
    },
    Check(CheckResult),
}

pub fn spawn_load_defaults(
    generation: u64,
    user_id: u64,
    source: Arc<dyn ValueSource>,
    tx: Sender<SourceMsg>,
) {
    thread::spawn(move || {
        let outcome = channel_form::load_default_values(source.as_ref(), user_id)
            .map_err(|e| format!("{e:#}"));
        let _ = tx.send(SourceMsg::Defaults {
            generation,
            outcome,
        });
    });
}

pub fn spawn_check(check: FieldCheck, tx: Sender<SourceMsg>) {
    thread::spawn(move || {
        let _ = tx.send(SourceMsg::Check(check.run()));
    });
}

/// In-memory source for tests and offline runs.
#[derive(Default)]
pub struct StaticSource {
    pub user: Option<UserData>,
    pub taken: Vec<String>,
    // When set, every call fails with this message.
    pub fail: Option<String>,
}

impl StaticSource {
    pub fn with_email(email: &str) -> Self {
        Self {
            user: Some(UserData {
                email: email.to_string(),
            }),
            ..Default::default()
        }
    }
}

impl ValueSource for StaticSource {
    fn fetch_user(&self, id: u64) -> Result<UserData> {
        if let Some(msg) = &self.fail {
            return Err(anyhow!("{msg}"));
        }
        self.user
            .clone()
            .ok_or_else(|| anyhow!("user {id} not found"))
    }

    fn email_taken(&self, email: &str) -> Result<bool> {
        if let Some(msg) = &self.fail {
            return Err(anyhow!("{msg}"));
        }
        Ok(self.taken.iter().any(|t| t.eq_ignore_ascii_case(email.trim())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn defaults_worker_reports_through_channel() {
        let (tx, rx) = mpsc::channel();
        let src: Arc<dyn ValueSource> = Arc::new(StaticSource::with_email("a@b.io"));
        spawn_load_defaults(3, 1, src, tx);
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(SourceMsg::Defaults {
                generation,
                outcome,
            }) => {
                assert_eq!(generation, 3);
                let values = outcome.expect("defaults");
                assert_eq!(values.email, "a@b.io");
                assert_eq!(values.username, "Batman");
            }
            _ => panic!("expected defaults message"),
        }
    }

    #[test]
    fn failing_source_yields_string_error() {
        let (tx, rx) = mpsc::channel();
        let src: Arc<dyn ValueSource> = Arc::new(StaticSource {
            fail: Some("connection refused".into()),
            ..Default::default()
        });
        spawn_load_defaults(1, 1, src, tx);
        match rx.recv_timeout(Duration::from_secs(5)) {
            Ok(SourceMsg::Defaults { outcome, .. }) => {
                let err = outcome.expect_err("should fail");
                assert!(err.contains("connection refused"));
            }
            _ => panic!("expected defaults message"),
        }
    }

    #[test]
    fn static_source_matches_case_insensitively() {
        let src = StaticSource {
            taken: vec!["Sincere@april.biz".into()],
            ..Default::default()
        };
        assert!(src.email_taken("sincere@april.biz").unwrap());
        assert!(!src.email_taken("free@april.biz").unwrap());
    }

    // Answers `[{"id":1}]` only when the query carries `taken` verbatim.
    fn serve_users(taken: &'static str, requests: usize) -> String {
        use std::io::{BufRead, BufReader, Write};
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let body = if request_line.contains(&format!("email={taken} ")) {
                    r#"[{"id":1}]"#
                } else {
                    "[]"
                };
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(resp.as_bytes()).unwrap();
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn lookup_cache_does_not_fold_case() {
        let api_base = serve_users("Mixed%40Case.io", 3);
        let src = HttpValueSource::new(&FormConfig {
            api_base,
            ..Default::default()
        })
        .unwrap();
        assert!(!src.email_taken("mixed@case.io").unwrap());
        assert!(src.email_taken("Mixed@Case.io").unwrap());
        // surrounding whitespace is not part of the query
        assert!(src.email_taken("  Mixed@Case.io ").unwrap());
    }

    #[test]
    fn lookup_cache_round_trip() {
        store_lookup("cached@example.com".into(), true);
        if lookup_ttl().is_some() {
            assert_eq!(cached_lookup("cached@example.com"), Some(true));
        }
        assert_eq!(cached_lookup("never-stored@example.com"), None);
    }
}
