use chrono::{DateTime, TimeZone, Utc};
use crossterm::style::Stylize;
use serde_json::{Map, Value};
use std::fmt::Write;

use pylog_types::PinoLevel;

use crate::options::RenderOptions;

/// Label used for numeric levels outside the pino table
const USER_LEVEL_LABEL: &str = "USERLVL";

/// Metadata keys folded into the `(name/pid on hostname)` segment
const NAME_KEY: &str = "name";
const PID_KEY: &str = "pid";
const HOSTNAME_KEY: &str = "hostname";

/// Formats one JSON log record per line
#[derive(Clone, Debug)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render a single line (without its `\n`) into `out`.
    ///
    /// Returns false when the record was suppressed by `minimum_level`.
    pub fn render_line(&self, line: &[u8], out: &mut Vec<u8>) -> bool {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        match parse_record(line) {
            Some(record) => match self.format_record(&record) {
                Some(text) => {
                    out.extend_from_slice(text.as_bytes());
                    true
                }
                None => false,
            },
            None => {
                out.extend_from_slice(line);
                out.extend_from_slice(self.options.eol().as_bytes());
                true
            }
        }
    }

    /// Format a parsed record, terminator included
    pub fn format_record(&self, record: &Map<String, Value>) -> Option<String> {
        let opts = &self.options;
        let level = record.get(&opts.level_key);

        if let (Some(min), Some(value)) = (opts.minimum_level, level.and_then(level_value)) {
            if value < min {
                return None;
            }
        }

        let message_key = std::iter::once(&opts.message_key)
            .chain(opts.message_key_fallbacks.iter())
            .find(|k| record.contains_key(k.as_str()));

        let mut segments = Vec::new();
        let time = record
            .get(&opts.timestamp_key)
            .map(|v| format!("[{}]", self.format_time(v)));
        let level = level.map(|v| self.format_level(v));
        if opts.level_first {
            segments.extend(level);
            segments.extend(time);
        } else {
            segments.extend(time);
            segments.extend(level);
        }
        segments.extend(self.format_metadata(record));

        let mut line = segments.join(" ");
        if let Some(value) = message_key.and_then(|k| record.get(k.as_str())) {
            let message = self.format_message(value);
            if line.is_empty() {
                line = message;
            } else {
                let _ = write!(line, ": {message}");
            }
        }

        let consumed = |key: &str| {
            key == opts.level_key
                || key == opts.timestamp_key
                || Some(key) == message_key.map(String::as_str)
                || matches!(key, NAME_KEY | PID_KEY | HOSTNAME_KEY)
                || opts.is_ignored(key)
        };
        let rest: Vec<(&String, &Value)> = if opts.hide_object {
            Vec::new()
        } else {
            record.iter().filter(|(k, _)| !consumed(k.as_str())).collect()
        };

        let eol = opts.eol();
        if opts.single_line {
            if !rest.is_empty() {
                let inline: Map<String, Value> = rest
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                let _ = write!(line, " {}", Value::Object(inline));
            }
            line.push_str(eol);
            return Some(line);
        }

        line.push_str(eol);
        for (key, value) in rest {
            let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            let body = body.replace('\n', &format!("{eol}    "));
            let _ = write!(line, "    {key}: {body}{eol}");
        }
        Some(line)
    }

    fn format_level(&self, value: &Value) -> String {
        let (label, color) = match value {
            Value::Number(n) => match n.as_u64().and_then(PinoLevel::from_value) {
                Some(level) => (level.label().to_string(), Some(level.color())),
                None => (USER_LEVEL_LABEL.to_string(), None),
            },
            Value::String(s) => (s.clone(), PinoLevel::parse(s).map(|l| l.color())),
            other => (other.to_string(), None),
        };

        match (self.options.colorize, color) {
            (true, Some(color)) => label.with(color).to_string(),
            _ => label,
        }
    }

    fn format_time(&self, value: &Value) -> String {
        let raw = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let Some(format) = &self.options.translate_time else {
            return raw;
        };

        let timestamp: Option<DateTime<Utc>> = match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| ts.with_timezone(&Utc)),
            _ => None,
        };

        let Some(ts) = timestamp else {
            return raw;
        };

        // Invalid user formats surface as a write error rather than a panic
        let mut out = String::new();
        if write!(out, "{}", ts.format(format)).is_ok() {
            out
        } else {
            raw
        }
    }

    fn format_metadata(&self, record: &Map<String, Value>) -> Option<String> {
        let field = |key: &str| {
            if self.options.is_ignored(key) {
                return None;
            }
            record.get(key).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        };
        let name = field(NAME_KEY);
        let pid = field(PID_KEY);
        let hostname = field(HOSTNAME_KEY);

        if name.is_none() && pid.is_none() && hostname.is_none() {
            return None;
        }

        let mut meta = String::from("(");
        match (name, pid) {
            (Some(name), Some(pid)) => {
                let _ = write!(meta, "{name}/{pid}");
            }
            (Some(only), None) | (None, Some(only)) => meta.push_str(&only),
            (None, None) => {}
        }
        if let Some(hostname) = hostname {
            if meta.len() > 1 {
                meta.push(' ');
            }
            let _ = write!(meta, "on {hostname}");
        }
        meta.push(')');
        Some(meta)
    }

    fn format_message(&self, value: &Value) -> String {
        let message = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.options.colorize {
            message.cyan().to_string()
        } else {
            message
        }
    }
}

/// Numeric severity of a level value, accepting pino names as well
fn level_value(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => PinoLevel::parse(s).map(|l| l.value()),
        _ => None,
    }
}

/// Parse a line as a JSON object; anything else is echoed by the caller
fn parse_record(line: &[u8]) -> Option<Map<String, Value>> {
    let trimmed = line.trim_ascii();
    if !trimmed.starts_with(b"{") {
        return None;
    }
    match serde_json::from_slice::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(options: RenderOptions, line: &str) -> String {
        let mut out = Vec::new();
        Renderer::new(options).render_line(line.as_bytes(), &mut out);
        String::from_utf8(out).unwrap()
    }

    fn plain(line: &str) -> String {
        render(RenderOptions::default(), line)
    }

    #[test]
    fn test_render_basic_record() {
        let out = plain(r#"{"level":30,"time":1700000000000,"msg":"hello"}"#);
        assert_eq!(out, "[1700000000000] INFO: hello\n");
    }

    #[test]
    fn test_render_translated_time() {
        let options = RenderOptions {
            translate_time: Some(crate::DEFAULT_TIME_FORMAT.to_string()),
            ..Default::default()
        };
        let out = render(options, r#"{"level":50,"time":1700000000123,"msg":"boom"}"#);
        assert_eq!(out, "[22:13:20.123] ERROR: boom\n");
    }

    #[test]
    fn test_invalid_time_format_falls_back_to_raw() {
        let options = RenderOptions {
            translate_time: Some("%".to_string()),
            ..Default::default()
        };
        let out = render(options, r#"{"level":30,"time":5,"msg":"m"}"#);
        assert_eq!(out, "[5] INFO: m\n");
    }

    #[test]
    fn test_render_level_first() {
        let options = RenderOptions {
            level_first: true,
            ..Default::default()
        };
        let out = render(options, r#"{"level":40,"time":"t","msg":"careful"}"#);
        assert_eq!(out, "WARN [t]: careful\n");
    }

    #[test]
    fn test_missing_level_uses_fallback_presentation() {
        let out = plain(r#"{"levelname":"CUSTOM","message":"custom level"}"#);
        assert_eq!(out, "custom level\n    levelname: \"CUSTOM\"\n");
    }

    #[test]
    fn test_unknown_numeric_level() {
        let out = plain(r#"{"level":35,"msg":"m"}"#);
        assert_eq!(out, "USERLVL: m\n");
    }

    #[test]
    fn test_message_falls_back_to_python_key() {
        let out = plain(r#"{"level":20,"message":"from python"}"#);
        assert_eq!(out, "DEBUG: from python\n");
    }

    #[test]
    fn test_metadata_segment() {
        let options = RenderOptions {
            ignore: Vec::new(),
            ..Default::default()
        };
        let out = render(
            options,
            r#"{"level":30,"name":"app.db","pid":42,"hostname":"box","msg":"up"}"#,
        );
        assert_eq!(out, "INFO (app.db/42 on box): up\n");

        // pid and hostname are ignored by default
        let out = plain(r#"{"level":30,"name":"app.db","pid":42,"hostname":"box","msg":"up"}"#);
        assert_eq!(out, "INFO (app.db): up\n");
    }

    #[test]
    fn test_extra_fields_are_listed() {
        let out = plain(r#"{"level":30,"msg":"m","user":"bob","ctx":{"a":1}}"#);
        assert_eq!(
            out,
            "INFO: m\n    user: \"bob\"\n    ctx: {\n      \"a\": 1\n    }\n"
        );
    }

    #[test]
    fn test_single_line_and_hide_object() {
        let options = RenderOptions {
            single_line: true,
            ..Default::default()
        };
        let out = render(options, r#"{"level":30,"msg":"m","user":"bob","n":1}"#);
        assert_eq!(out, "INFO: m {\"user\":\"bob\",\"n\":1}\n");

        let options = RenderOptions {
            hide_object: true,
            ..Default::default()
        };
        let out = render(options, r#"{"level":30,"msg":"m","user":"bob"}"#);
        assert_eq!(out, "INFO: m\n");
    }

    #[test]
    fn test_ignore_keys() {
        let options = RenderOptions {
            ignore: vec!["secret".to_string()],
            ..Default::default()
        };
        let out = render(options, r#"{"level":30,"msg":"m","secret":"x"}"#);
        assert_eq!(out, "INFO: m\n");
    }

    #[test]
    fn test_minimum_level_suppresses_records() {
        let options = RenderOptions {
            minimum_level: Some(40),
            ..Default::default()
        };
        let renderer = Renderer::new(options);
        let mut out = Vec::new();
        assert!(!renderer.render_line(br#"{"level":30,"msg":"quiet"}"#, &mut out));
        assert!(renderer.render_line(br#"{"level":50,"msg":"loud"}"#, &mut out));
        // Records without a level are never filtered
        assert!(renderer.render_line(br#"{"msg":"no level"}"#, &mut out));
        assert_eq!(String::from_utf8(out).unwrap(), "ERROR: loud\nno level\n");
    }

    #[test]
    fn test_non_json_lines_are_echoed() {
        assert_eq!(plain("Traceback (most recent call last):"), "Traceback (most recent call last):\n");
        assert_eq!(plain("[1, 2, 3]"), "[1, 2, 3]\n");
        assert_eq!(plain("{not json"), "{not json\n");
        assert_eq!(plain(""), "\n");

        let mut out = Vec::new();
        Renderer::new(RenderOptions::default()).render_line(b"\xff\xfe raw", &mut out);
        assert_eq!(out, b"\xff\xfe raw\n");
    }

    #[test]
    fn test_crlf_terminator() {
        let options = RenderOptions {
            crlf: true,
            ..Default::default()
        };
        assert_eq!(render(options.clone(), "{\"level\":30,\"msg\":\"m\"}\r"), "INFO: m\r\n");
        assert_eq!(render(options, "plain"), "plain\r\n");
    }

    #[test]
    fn test_colorize_wraps_level_and_message() {
        let options = RenderOptions {
            colorize: true,
            ..Default::default()
        };
        let out = render(options, r#"{"level":50,"msg":"boom"}"#);
        assert!(out.contains("\x1b["));
        assert!(out.contains("ERROR"));
        assert!(out.contains("boom"));
        assert!(out.ends_with('\n'));
    }
}
