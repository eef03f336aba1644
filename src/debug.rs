use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct DebugLogger {
    inner: Arc<Mutex<DebugState>>,
}

struct DebugState {
    writer: BufWriter<File>,
    counters: BTreeMap<String, u64>,
}

impl std::fmt::Debug for DebugLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugLogger").finish_non_exhaustive()
    }
}

pub(crate) enum EventValue<'a> {
    Str(&'a str),
    Num(f64),
    Int(u64),
    Bool(bool),
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(DebugState {
                writer: BufWriter::new(file),
                counters: BTreeMap::new(),
            })),
        })
    }

    pub fn log_json(&self, json: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub(crate) fn event(&self, kind: &str, fields: &[(&str, EventValue<'_>)]) {
        let mut line = Map::new();
        line.insert("type".to_string(), Value::from(kind));
        for (key, value) in fields {
            let value = match value {
                EventValue::Str(s) => Value::from(*s),
                // Four decimals keep scale and point values readable.
                EventValue::Num(n) => Number::from_f64((n * 10_000.0).round() / 10_000.0)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                EventValue::Int(n) => Value::from(*n),
                EventValue::Bool(b) => Value::Bool(*b),
            };
            line.insert((*key).to_string(), value);
        }
        self.log_json(&Value::Object(line).to_string());
    }

    pub fn increment(&self, key: &str, amount: u64) {
        if let Ok(mut state) = self.inner.lock() {
            let entry = state.counters.entry(key.to_string()).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
    }

    pub fn emit_summary(&self, context: &str) {
        if let Ok(mut state) = self.inner.lock() {
            let counters = std::mem::take(&mut state.counters);
            let json = json!({
                "type": "debug.summary",
                "context": context,
                "counts": counters,
            });
            let _ = writeln!(state.writer, "{json}");
        }
    }

    pub fn flush(&self) {
        if let Ok(mut state) = self.inner.lock() {
            let _ = state.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_log_path(tag: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("fundform_{tag}_{}_{}.jsonl", std::process::id(), nanos))
    }

    #[test]
    fn events_are_valid_json_lines() {
        let path = temp_log_path("debug_events");
        let logger = DebugLogger::new(&path).expect("logger");
        logger.event(
            "layout.scale",
            &[
                ("scale", EventValue::Num(0.875)),
                ("pages", EventValue::Int(1)),
                ("logo", EventValue::Bool(false)),
                ("company", EventValue::Str("Acme \"Capital\"")),
            ],
        );
        logger.increment("fallback", 2);
        logger.emit_summary("test");
        logger.flush();

        let text = std::fs::read_to_string(&path).expect("read log");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(first["type"], "layout.scale");
        assert_eq!(first["company"], "Acme \"Capital\"");
        assert_eq!(first["pages"], 1);
        let summary: serde_json::Value = serde_json::from_str(lines[1]).expect("json");
        assert_eq!(summary["counts"]["fallback"], 2);
    }

    #[test]
    fn control_characters_and_non_finite_numbers_stay_valid_json() {
        let path = temp_log_path("debug_escape");
        let logger = DebugLogger::new(&path).expect("logger");
        logger.event(
            "fill.error",
            &[
                ("message", EventValue::Str("a\u{1}b\ttab")),
                ("scale", EventValue::Num(f64::NAN)),
            ],
        );
        logger.flush();

        let text = std::fs::read_to_string(&path).expect("read log");
        let line: serde_json::Value = serde_json::from_str(text.trim()).expect("json");
        assert_eq!(line["message"], "a\u{1}b\ttab");
        assert!(line["scale"].is_null());
        assert!(text.contains("\\u0001"));
    }
}
