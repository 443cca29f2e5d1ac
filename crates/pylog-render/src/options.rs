use chrono::format::{Item, StrftimeItems};

/// Time format used when translation is requested without an explicit format
pub const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Rendering options, mirroring the pino-pretty flags that matter for
/// normalized Python logs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit ANSI colors
    pub colorize: bool,

    /// Terminate lines with `\r\n`
    pub crlf: bool,

    /// Print the level before the timestamp
    pub level_first: bool,

    /// Key holding the message
    pub message_key: String,

    /// Keys tried in order when `message_key` is absent
    pub message_key_fallbacks: Vec<String>,

    /// Key holding the numeric level
    pub level_key: String,

    /// Key holding the timestamp
    pub timestamp_key: String,

    /// strftime format for epoch-millisecond timestamps (None prints them raw)
    pub translate_time: Option<String>,

    /// Keys never printed
    pub ignore: Vec<String>,

    /// Drop all remaining fields
    pub hide_object: bool,

    /// Print remaining fields inline as compact JSON
    pub single_line: bool,

    /// Suppress records whose numeric level is below this
    pub minimum_level: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            colorize: false,
            crlf: false,
            level_first: false,
            message_key: "msg".to_string(),
            message_key_fallbacks: vec!["message".to_string()],
            level_key: "level".to_string(),
            timestamp_key: "time".to_string(),
            translate_time: None,
            ignore: vec!["pid".to_string(), "hostname".to_string()],
            hide_object: false,
            single_line: false,
            minimum_level: None,
        }
    }
}

impl RenderOptions {
    /// Line terminator
    pub fn eol(&self) -> &'static str {
        if self.crlf { "\r\n" } else { "\n" }
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignore.iter().any(|k| k == key)
    }
}

/// Split a comma-separated key list, dropping blanks
pub fn parse_key_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Check a strftime format before it reaches the renderer
pub fn is_valid_time_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}
