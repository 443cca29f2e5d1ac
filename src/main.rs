mod cli;
mod config;

use std::io::IsTerminal;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use pylog_normalize::{LevelMapping, LevelNormalizer, Pipeline, pump};
use pylog_render::{LineRenderer, Renderer};

use crate::cli::Args;
use crate::config::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    // A pending stdin read would otherwise keep runtime shutdown waiting
    std::process::exit(code);
}

async fn run(args: Args) -> Result<()> {
    let (file, path) = config::load(&args)?;
    let settings = Settings::resolve(&args, file, std::io::stdout().is_terminal())
        .with_context(|| match &path {
            Some(path) => format!("invalid settings in {}", path.display()),
            None => "invalid settings".to_string(),
        })?;

    let cancel = CancellationToken::new();
    watch_interrupts(cancel.clone());

    let mut pipeline = Pipeline::new().stage(LevelNormalizer::new(
        LevelMapping::python(),
        settings.normalizer,
    ));
    if !settings.raw {
        pipeline = pipeline.stage(LineRenderer::new(Renderer::new(settings.render)));
    }

    match pump(
        tokio::io::stdin(),
        tokio::io::stdout(),
        pipeline,
        settings.pump,
        cancel,
    )
    .await
    {
        Ok(stats) => {
            tracing::debug!(
                chunks = stats.chunks_in,
                bytes_in = stats.bytes_in,
                bytes_out = stats.bytes_out,
                cancelled = stats.cancelled,
                "stream closed"
            );
            Ok(())
        }
        Err(e) if e.is_broken_pipe() => {
            tracing::debug!("downstream closed");
            Ok(())
        }
        Err(e) => Err(e).context("log stream failed"),
    }
}

/// Stop reading on Ctrl+C unless stdin is a pipe.
///
/// With a pipe the producer receives the same SIGINT and closing its end
/// flushes us naturally, so the signal is only absorbed. A second interrupt
/// exits at once, since a stalled stdout can keep the flush from finishing.
fn watch_interrupts(cancel: CancellationToken) {
    let absorb = absorbs_interrupts(std::io::stdin().is_terminal(), stdin_is_file());
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if absorb {
                tracing::debug!("ignoring interrupt while upstream is still writing");
                continue;
            }
            if cancel.is_cancelled() {
                tracing::debug!("interrupted again, exiting");
                std::process::exit(130);
            }
            tracing::debug!("interrupted, flushing");
            cancel.cancel();
        }
    });
}

/// Interrupts are absorbed only when stdin is neither a terminal nor a file
fn absorbs_interrupts(stdin_is_terminal: bool, stdin_is_file: bool) -> bool {
    !stdin_is_terminal && !stdin_is_file
}

#[cfg(unix)]
fn stdin_is_file() -> bool {
    std::fs::metadata("/dev/stdin")
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn stdin_is_file() -> bool {
    false
}
