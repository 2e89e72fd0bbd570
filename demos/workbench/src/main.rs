//! Workbench Example
//!
//! A desktop-style host shell built on the Ensemble engine. Three plugins
//! come up in whatever order the linker put them in the catalog, and the
//! dependency broadcast wires them together anyway.
//!
//! # Plugin Graph
//!
//! ```text
//! menu-bar ──requires──> transcoder ──requires──> status-bar
//!                            │
//!                            └──optional──> metadata-editor (not linked)
//! ```
//!
//! The menu bar only enables its Convert entry once the transcoder is
//! available, and the transcoder only reports progress while the status
//! bar is up. Nobody sorts anything; the engine's catch-up pass delivers
//! every notification exactly once regardless of activation order.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package ensemble-workbench
//! cargo run --package ensemble-workbench -- --config ./ensemble.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use ensemble::prelude::*;
use ensemble_plugin_transcoder::Transcoder;

// ============================================================================
// Host Plugins
// ============================================================================

/// Renders the single status line of the shell window.
struct StatusBar {
    message: String,
}

impl StatusBar {
    fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        info!(status = %self.message, "Status line updated");
    }
}

impl Plugin for StatusBar {
    fn name(&self) -> &'static str {
        "status-bar"
    }
}

register_plugin!(STATUS_BAR, "status-bar", |_ctx| {
    PluginCell::new(StatusBar {
        message: String::from("ready"),
    })
});

/// Top menu, with entries gated on what is actually running.
struct MenuBar {
    convert_enabled: bool,
}

impl Plugin for MenuBar {
    fn name(&self) -> &'static str {
        "menu-bar"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["transcoder"]
    }

    fn listeners(bindings: &mut Listeners<Self>) {
        bindings.on_available("transcoder", |menu| {
            menu.convert_enabled = true;
            info!("Convert menu entry enabled");
        });
        bindings.on_shutdown("transcoder", |menu| {
            menu.convert_enabled = false;
            info!("Convert menu entry disabled");
        });
    }
}

register_plugin!(MENU_BAR, "menu-bar", |_ctx| {
    PluginCell::new(MenuBar {
        convert_enabled: false,
    })
});

// ============================================================================
// Shell Observer
// ============================================================================

/// Bridges engine lifecycle events into the shell's log.
struct ShellObserver;

impl HostObserver for ShellObserver {
    fn plugin_ready(&self, name: &str) {
        info!(plugin = name, "Shell: plugin ready");
    }

    fn shutdown_complete(&self) {
        info!("Shell: all plugins stopped, closing window");
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Parser)]
#[command(name = "ensemble-workbench")]
#[command(about = "Desktop-style host shell for the Ensemble plugin engine")]
struct Cli {
    /// Path to an ensemble.toml configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = Runtime::builder().observer(Arc::new(ShellObserver));
    if let Some(path) = cli.config {
        builder = builder.config_file(path);
    }
    let runtime = builder.build()?;

    let report = runtime.load_plugins();
    for (name, e) in &report.failures {
        error!("Plugin {name} failed to load: {e}");
    }

    let manager = runtime.manager();

    // Drive the transcoder the way a toolbar button would.
    manager.with_plugin("transcoder", |plugin| {
        if let Some(transcoder) = plugin.downcast_mut::<Transcoder>() {
            transcoder.enqueue("samples/intro.flac");
            transcoder.enqueue("samples/outro.wav");
            while let Some(output) = transcoder.convert_next() {
                info!(output = %output.display(), "Workbench: track converted");
            }
        }
    });

    manager.with_plugin("status-bar", |plugin| {
        if let Some(status) = plugin.downcast_mut::<StatusBar>() {
            status.set_message("conversion complete");
        }
    });

    runtime.shutdown();
    Ok(())
}
