//! Audio-transcoding plugin for Ensemble.
//!
//! Queues audio files and rewrites them into Ogg at a configured bitrate.
//! The plugin requires the host's `"status-bar"` plugin for progress
//! reporting and optionally cooperates with a `"metadata-editor"` plugin
//! when one is linked in.
//!
//! Listener bindings keep the transcoder honest about what is actually
//! running: conversion progress is only announced while the status bar is
//! available, whichever order the two plugins came up in.
//!
//! Configure it via `ensemble.toml`:
//!
//! ```toml
//! [plugins.config.transcoder]
//! bitrate = 256
//! output_dir = "converted"
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use serde::Deserialize;
use tracing::{debug, info, warn};

use ensemble::{
    BoxError, Listeners, Plugin, PluginCell, PluginManager, PrepareContext, register_plugin,
};

/// Settings read from the `[plugins.config.transcoder]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// Target bitrate in kbit/s.
    pub bitrate: u32,
    /// Directory converted files are written to.
    pub output_dir: PathBuf,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            bitrate: 192,
            output_dir: PathBuf::from("converted"),
        }
    }
}

/// The transcoding plugin.
pub struct Transcoder {
    /// Weak handle back to the host, used to probe optional dependencies.
    host: Weak<PluginManager>,
    config: TranscoderConfig,
    queue: Vec<PathBuf>,
    /// Tracks whether the status bar is currently available.
    status_online: bool,
}

impl Transcoder {
    pub fn new(host: Weak<PluginManager>) -> Self {
        Self {
            host,
            config: TranscoderConfig::default(),
            queue: Vec::new(),
            status_online: false,
        }
    }

    /// Adds a file to the conversion queue.
    pub fn enqueue(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "Track queued for conversion");
        self.queue.push(path);
    }

    /// Number of tracks waiting for conversion.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Effective settings after `prepare`.
    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Converts the oldest queued track and returns the output path.
    pub fn convert_next(&mut self) -> Option<PathBuf> {
        if self.queue.is_empty() {
            return None;
        }
        let input = self.queue.remove(0);
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        let output = self.config.output_dir.join(stem).with_extension("ogg");

        info!(
            input = %input.display(),
            output = %output.display(),
            bitrate = self.config.bitrate,
            reported = self.status_online,
            "Converted track"
        );

        if let Some(manager) = self.host.upgrade()
            && manager.is_available("metadata-editor")
        {
            debug!(input = %input.display(), "Metadata editor online, tags carried over");
        }

        Some(output)
    }
}

impl Plugin for Transcoder {
    fn name(&self) -> &'static str {
        "transcoder"
    }

    fn requires(&self) -> &'static [&'static str] {
        &["status-bar"]
    }

    fn optional(&self) -> &'static [&'static str] {
        &["metadata-editor"]
    }

    fn listeners(bindings: &mut Listeners<Self>) {
        bindings.on_available("status-bar", |plugin| {
            plugin.status_online = true;
            info!("Status bar online, conversion progress will be reported");
        });
        bindings.on_shutdown("status-bar", |plugin| {
            plugin.status_online = false;
            info!("Status bar gone, conversion continues unreported");
        });
        bindings.on_any_available(|_plugin, name| {
            debug!(dependency = name, "Transcoder dependency came up");
        });
    }

    fn prepare(&mut self, ctx: &PrepareContext) -> Result<(), BoxError> {
        self.config = ctx.get_config()?;
        info!(
            bitrate = self.config.bitrate,
            output_dir = %self.config.output_dir.display(),
            "Transcoder prepared"
        );
        Ok(())
    }

    fn teardown(&mut self) {
        if !self.queue.is_empty() {
            warn!(
                pending = self.queue.len(),
                "Transcoder shutting down with tracks still queued"
            );
        }
    }
}

register_plugin!(TRANSCODER, "transcoder", |ctx| {
    PluginCell::new(Transcoder::new(Arc::downgrade(ctx.manager())))
});

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use serde_json::json;

    struct StatusBar;

    impl Plugin for StatusBar {
        fn name(&self) -> &'static str {
            "status-bar"
        }
    }

    fn status_flag(manager: &PluginManager) -> Option<bool> {
        manager
            .with_plugin("transcoder", |plugin| {
                plugin
                    .downcast_ref::<Transcoder>()
                    .map(|t| t.status_online)
            })
            .flatten()
    }

    #[test]
    fn config_defaults_are_usable() {
        let config = TranscoderConfig::default();
        assert_eq!(config.bitrate, 192);
        assert_eq!(config.output_dir, PathBuf::from("converted"));
    }

    #[test]
    fn prepare_reads_the_transcoder_section() {
        let mut configs = HashMap::new();
        configs.insert("transcoder".to_string(), json!({ "bitrate": 320 }));
        let manager = PluginManager::new(configs);

        manager.install(Transcoder::new(Weak::new())).unwrap();
        manager.activate("transcoder").unwrap();

        let bitrate = manager
            .with_plugin("transcoder", |plugin| {
                plugin
                    .downcast_ref::<Transcoder>()
                    .map(|t| t.config.bitrate)
            })
            .flatten();
        assert_eq!(bitrate, Some(320));
    }

    #[test]
    fn status_bar_availability_flips_the_flag() {
        let manager = PluginManager::default();
        manager.install(Transcoder::new(Weak::new())).unwrap();
        manager.install(StatusBar).unwrap();

        manager.activate("transcoder").unwrap();
        assert_eq!(status_flag(&manager), Some(false));

        manager.activate("status-bar").unwrap();
        assert_eq!(status_flag(&manager), Some(true));

        manager.shutdown("status-bar");
        assert_eq!(status_flag(&manager), Some(false));
    }

    #[test]
    fn conversion_walks_the_queue_in_order() {
        let mut transcoder = Transcoder::new(Weak::new());
        transcoder.enqueue("albums/first.flac");
        transcoder.enqueue("albums/second.wav");

        assert_eq!(
            transcoder.convert_next(),
            Some(PathBuf::from("converted/first.ogg"))
        );
        assert_eq!(
            transcoder.convert_next(),
            Some(PathBuf::from("converted/second.ogg"))
        );
        assert_eq!(transcoder.convert_next(), None);
    }
}
