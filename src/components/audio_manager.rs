//! Audio Manager - binds the playback session to the page's audio element
//! and runs the snapshot ticker outside of the component render cycle.

use crate::api::MediaItem;
use crate::session::{LoadToken, MediaPlayback, PlaybackSession, SnapshotTicker};
use dioxus::core::Task;
use dioxus::prelude::*;
use std::time::Duration;
use tracing::warn;

#[cfg(not(target_arch = "wasm32"))]
mod desktop_bridge;
#[cfg(not(target_arch = "wasm32"))]
use desktop_bridge::{BridgeCommand, MediaEvents};

#[cfg(target_arch = "wasm32")]
use dioxus::core::{Runtime, RuntimeGuard};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast};
#[cfg(target_arch = "wasm32")]
use web_sys::{window, HtmlAudioElement};

pub type Session = PlaybackSession<PageMedia, PageTicker>;

/// Initialize the global audio element once.
#[cfg(target_arch = "wasm32")]
pub fn get_or_create_audio_element() -> Option<HtmlAudioElement> {
    let document = window()?.document()?;

    if let Some(existing) = document.get_element_by_id("podsearch-audio") {
        return existing.dyn_into::<HtmlAudioElement>().ok();
    }

    let audio: HtmlAudioElement = document.create_element("audio").ok()?.dyn_into().ok()?;
    audio.set_id("podsearch-audio");
    // Keep preload light so we stream instead of buffering entire files
    audio.set_attribute("preload", "metadata").ok()?;
    document.body()?.append_child(&audio).ok()?;

    Some(audio)
}

/// The page's `<audio>` element.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct PageMedia;

#[cfg(target_arch = "wasm32")]
impl MediaPlayback for PageMedia {
    fn set_source(&mut self, url: &str) {
        if let Some(audio) = get_or_create_audio_element() {
            audio.set_src(url);
        }
    }

    fn play(&mut self) {
        let Some(audio) = get_or_create_audio_element() else {
            return;
        };
        if let Ok(promise) = audio.play() {
            wasm_bindgen_futures::spawn_local(async move {
                if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    warn!(error = ?err, "audio element refused to play");
                }
            });
        }
    }

    fn pause(&mut self) {
        if let Some(audio) = get_or_create_audio_element() {
            let _ = audio.pause();
        }
    }

    fn current_time(&self) -> f64 {
        get_or_create_audio_element()
            .map(|audio| audio.current_time())
            .unwrap_or(0.0)
    }

    fn set_current_time(&mut self, seconds: f64) {
        if let Some(audio) = get_or_create_audio_element() {
            audio.set_current_time(seconds);
        }
    }

    fn duration(&self) -> Option<f64> {
        get_or_create_audio_element()
            .map(|audio| audio.duration())
            .filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// The desktop webview's hidden `<audio>` element. Commands go out through
/// `document::eval`; position and duration come from the last polled
/// snapshot.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
pub struct PageMedia;

#[cfg(not(target_arch = "wasm32"))]
impl MediaPlayback for PageMedia {
    fn set_source(&mut self, url: &str) {
        desktop_bridge::record_snapshot(Default::default());
        desktop_bridge::send(&BridgeCommand::Load { src: url });
    }

    fn play(&mut self) {
        desktop_bridge::send(&BridgeCommand::Play);
    }

    fn pause(&mut self) {
        desktop_bridge::send(&BridgeCommand::Pause);
    }

    fn current_time(&self) -> f64 {
        desktop_bridge::last_snapshot().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        let mut snapshot = desktop_bridge::last_snapshot();
        snapshot.current_time = seconds;
        desktop_bridge::record_snapshot(snapshot);
        desktop_bridge::send(&BridgeCommand::Seek { position: seconds });
    }

    fn duration(&self) -> Option<f64> {
        desktop_bridge::last_snapshot().known_duration()
    }
}

/// Routes media events for `token` into the session. Installing handlers
/// replaces those of the previous load.
#[cfg(target_arch = "wasm32")]
pub fn bind_media_events(token: LoadToken, session: Signal<Session>) {
    let Some(audio) = get_or_create_audio_element() else {
        return;
    };
    let runtime = Runtime::current();

    let metadata_runtime = runtime.clone();
    let mut metadata_session = session;
    let metadata_closure = Closure::wrap(Box::new(move || {
        let _guard = RuntimeGuard::new(metadata_runtime.clone());
        if let Some(audio) = get_or_create_audio_element() {
            metadata_session
                .write()
                .metadata_ready(token, audio.duration());
        }
    }) as Box<dyn FnMut()>);
    audio.set_onloadedmetadata(Some(metadata_closure.as_ref().unchecked_ref()));
    metadata_closure.forget();

    let time_runtime = runtime.clone();
    let mut time_session = session;
    // Throttle updates to ~5fps to avoid excessive re-renders
    let mut last_emit = -1.0f64;
    let time_closure = Closure::wrap(Box::new(move || {
        let _guard = RuntimeGuard::new(time_runtime.clone());
        if let Some(audio) = get_or_create_audio_element() {
            let time = audio.current_time();
            if (time - last_emit).abs() >= 0.2 {
                last_emit = time;
                time_session.write().time_update(token, time);
            }
        }
    }) as Box<dyn FnMut()>);
    audio.set_ontimeupdate(Some(time_closure.as_ref().unchecked_ref()));
    time_closure.forget();
}

#[cfg(not(target_arch = "wasm32"))]
const MEDIA_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Polls the webview element for `token` until a newer load is bound.
#[cfg(not(target_arch = "wasm32"))]
pub fn bind_media_events(token: LoadToken, session: Signal<Session>) {
    desktop_bridge::bind(token);
    let mut session = session;
    spawn(async move {
        let mut events = MediaEvents::new();
        while desktop_bridge::is_bound(token) {
            snapshot_delay(MEDIA_POLL_INTERVAL).await;
            let Some(snapshot) = desktop_bridge::poll_snapshot().await else {
                continue;
            };
            if !desktop_bridge::is_bound(token) {
                break;
            }
            desktop_bridge::record_snapshot(snapshot);

            let polled = events.next(snapshot);
            if let Some(duration) = polled.metadata {
                if !session.write().metadata_ready(token, duration) {
                    break;
                }
            }
            if let Some(time) = polled.time {
                if !session.write().time_update(token, time) {
                    break;
                }
            }
        }
    });
}

/// Loads `item` into the session and starts listening for its media events.
pub fn play_episode(mut session: Signal<Session>, item: &MediaItem) {
    let loaded = session.write().load(item);
    match loaded {
        Ok(token) => bind_media_events(token, session),
        Err(err) => warn!(error = %err, "cannot play episode"),
    }
}

/// Snapshot ticker: `start`/`stop` publish the desired interval, and
/// [`use_snapshot_pump`] owns the task that actually ticks.
pub struct PageTicker {
    interval: Signal<Option<Duration>>,
}

impl PageTicker {
    pub fn new(interval: Signal<Option<Duration>>) -> Self {
        Self { interval }
    }
}

impl SnapshotTicker for PageTicker {
    fn start(&mut self, interval: Duration) {
        self.interval.set(Some(interval));
    }

    fn stop(&mut self) {
        // Also runs while the shell is being dropped
        if let Ok(mut interval) = self.interval.try_write() {
            *interval = None;
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
async fn snapshot_delay(interval: Duration) {
    tokio::time::sleep(interval).await;
}

#[cfg(target_arch = "wasm32")]
async fn snapshot_delay(interval: Duration) {
    gloo_timers::future::TimeoutFuture::new(interval.as_millis() as u32).await;
}

/// Runs the snapshot task while the ticker is started.
pub fn use_snapshot_pump(interval: Signal<Option<Duration>>, session: Signal<Session>) {
    let mut task = use_signal(|| None::<Task>);
    use_effect(move || {
        let requested = interval();
        if let Some(running) = task.write().take() {
            running.cancel();
        }
        let Some(every) = requested else {
            return;
        };
        let mut session = session;
        let spawned = spawn(async move {
            loop {
                snapshot_delay(every).await;
                session.write().snapshot_tick();
            }
        });
        task.set(Some(spawned));
    });
}

/// Current viewport width, when there is a viewport to measure.
#[cfg(target_arch = "wasm32")]
pub fn viewport_width() -> Option<f64> {
    window()?.inner_width().ok()?.as_f64()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn viewport_width() -> Option<f64> {
    None
}
