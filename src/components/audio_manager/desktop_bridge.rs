//! Desktop webview audio: a hidden `<audio>` element inside the webview,
//! driven from Rust through `document::eval`.

use crate::session::LoadToken;
use dioxus::prelude::*;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use tracing::warn;

const AUDIO_BRIDGE_JS: &str = r#"
(() => {
  if (window.__podsearchAudioBridge) {
    return true;
  }

  const audio = document.createElement("audio");
  audio.id = "podsearch-audio-desktop";
  audio.preload = "metadata";
  audio.style.display = "none";
  document.body.appendChild(audio);

  // Seeks issued before metadata wait for it
  let pendingSeek = null;
  audio.addEventListener("loadedmetadata", () => {
    if (pendingSeek !== null) {
      audio.currentTime = pendingSeek;
      pendingSeek = null;
    }
  });

  window.__podsearchAudioBridge = {
    apply(cmd) {
      switch (cmd && cmd.type) {
        case "load":
          pendingSeek = null;
          audio.src = cmd.src;
          audio.load();
          break;
        case "play":
          audio.play().catch(() => {});
          break;
        case "pause":
          audio.pause();
          break;
        case "seek":
          if (audio.readyState >= 1) {
            audio.currentTime = cmd.position;
          } else {
            pendingSeek = cmd.position;
          }
          break;
      }
    },
    snapshot() {
      return {
        current_time: Number.isFinite(audio.currentTime) ? audio.currentTime : 0,
        duration: Number.isFinite(audio.duration) ? audio.duration : 0,
      };
    },
  };
  return true;
})();
"#;

/// Commands understood by the page-side bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum BridgeCommand<'a> {
    Load { src: &'a str },
    Play,
    Pause,
    Seek { position: f64 },
}

/// Element state as last reported by the bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub(super) struct BridgeSnapshot {
    #[serde(default)]
    pub current_time: f64,
    #[serde(default)]
    pub duration: f64,
}

impl BridgeSnapshot {
    pub fn known_duration(&self) -> Option<f64> {
        (self.duration.is_finite() && self.duration > 0.0).then_some(self.duration)
    }
}

thread_local! {
    static LAST_SNAPSHOT: Cell<BridgeSnapshot> = Cell::new(BridgeSnapshot::default());
    static BOUND_TOKEN: Cell<Option<LoadToken>> = const { Cell::new(None) };
}

pub(super) fn last_snapshot() -> BridgeSnapshot {
    LAST_SNAPSHOT.with(Cell::get)
}

pub(super) fn record_snapshot(snapshot: BridgeSnapshot) {
    LAST_SNAPSHOT.with(|last| last.set(snapshot));
}

/// Makes `token` the load whose events are polled; older polls stop.
pub(super) fn bind(token: LoadToken) {
    BOUND_TOKEN.with(|bound| bound.set(Some(token)));
}

pub(super) fn is_bound(token: LoadToken) -> bool {
    BOUND_TOKEN.with(|bound| bound.get() == Some(token))
}

pub(super) fn send(command: &BridgeCommand<'_>) {
    let payload = match serde_json::to_string(command) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, ?command, "audio command not encoded");
            return;
        }
    };
    let _ = document::eval(AUDIO_BRIDGE_JS);
    let script = format!(
        r#"(function () {{
            const bridge = window.__podsearchAudioBridge;
            if (!bridge) return false;
            bridge.apply({payload});
            return true;
        }})();"#
    );
    let _ = document::eval(&script);
}

pub(super) async fn poll_snapshot() -> Option<BridgeSnapshot> {
    let _ = document::eval(AUDIO_BRIDGE_JS);
    let eval = document::eval(
        r#"const bridge = window.__podsearchAudioBridge;
        return bridge ? bridge.snapshot() : { current_time: 0, duration: 0 };"#,
    );
    eval.join::<BridgeSnapshot>().await.ok()
}

/// Turns successive snapshots into the media events of one load.
#[derive(Debug)]
pub(super) struct MediaEvents {
    metadata_sent: bool,
    last_emit: f64,
}

/// Time updates closer together than this are dropped (~5fps).
const TIME_UPDATE_STEP: f64 = 0.2;

#[derive(Debug, Default, PartialEq)]
pub(super) struct PolledEvents {
    pub metadata: Option<f64>,
    pub time: Option<f64>,
}

impl MediaEvents {
    pub fn new() -> Self {
        Self {
            metadata_sent: false,
            last_emit: -1.0,
        }
    }

    pub fn next(&mut self, snapshot: BridgeSnapshot) -> PolledEvents {
        let mut events = PolledEvents::default();
        if !self.metadata_sent {
            if let Some(duration) = snapshot.known_duration() {
                self.metadata_sent = true;
                events.metadata = Some(duration);
            }
        }
        if (snapshot.current_time - self.last_emit).abs() >= TIME_UPDATE_STEP {
            self.last_emit = snapshot.current_time;
            events.time = Some(snapshot.current_time);
        }
        events
    }
}
