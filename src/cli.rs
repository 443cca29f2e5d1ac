use clap::Parser;
use std::path::PathBuf;

use pylog_render::DEFAULT_TIME_FORMAT;

/// pylog-pretty - Pretty-print Python JSON logs through a pino-style renderer
#[derive(Parser, Debug, Default)]
#[command(name = "pylog-pretty")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Emit normalized JSON lines instead of rendering them
    #[arg(long)]
    pub raw: bool,

    /// Rewrite only the first levelname field in each chunk read
    #[arg(long)]
    pub first_match_only: bool,

    /// Bytes of a split levelname field held between reads (0 disables)
    #[arg(long, value_name = "BYTES")]
    pub carry_limit: Option<usize>,

    /// Bytes read from stdin at a time
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Force colored output
    #[arg(short = 'c', long, overrides_with = "no_colorize")]
    pub colorize: bool,

    /// Disable colored output
    #[arg(long, overrides_with = "colorize")]
    pub no_colorize: bool,

    /// Terminate lines with CRLF
    #[arg(short = 'f', long)]
    pub crlf: bool,

    /// Print the level before the timestamp
    #[arg(short = 'l', long)]
    pub level_first: bool,

    /// Hide records below this level (name or number)
    #[arg(short = 'L', long, value_name = "LEVEL")]
    pub minimum_level: Option<String>,

    /// Key holding the log message
    #[arg(short = 'm', long, value_name = "KEY")]
    pub message_key: Option<String>,

    /// Key holding the numeric level
    #[arg(long, value_name = "KEY")]
    pub level_key: Option<String>,

    /// Key holding the timestamp
    #[arg(short = 'a', long, value_name = "KEY")]
    pub timestamp_key: Option<String>,

    /// Translate epoch-millisecond timestamps, optionally with a strftime format
    #[arg(
        short = 't',
        long,
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_TIME_FORMAT
    )]
    pub translate_time: Option<String>,

    /// Comma-separated keys to leave out
    #[arg(short = 'i', long, value_name = "KEYS")]
    pub ignore: Option<String>,

    /// Hide all fields other than time, level and message
    #[arg(short = 'H', long)]
    pub hide_object: bool,

    /// Print remaining fields on the same line
    #[arg(short = 'S', long)]
    pub single_line: bool,

    /// Config file to use instead of discovering one
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
