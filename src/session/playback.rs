//! The "now playing" transport.
//!
//! `PlaybackSession` drives an opaque media capability and keeps the display
//! state (title, date, elapsed/duration, progress) the player renders. While
//! playing, a snapshot of that state is written to the durable store on
//! every ticker tick; on startup the last snapshot is adopted in a paused
//! state without starting playback.

use crate::api::MediaItem;
use crate::db::{DurableStore, PLAYER_STATE_KEY};
use crate::session::format::{format_time, published_display};
use crate::session::settings::SessionSettings;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Host media element (an `<audio>` element in the browser).
pub trait MediaPlayback {
    fn set_source(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    /// `None` until the source's metadata is known.
    fn duration(&self) -> Option<f64>;
}

/// Periodic task delivering [`PlaybackSession::snapshot_tick`] calls.
pub trait SnapshotTicker {
    fn start(&mut self, interval: Duration);
    fn stop(&mut self);
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("\"{title}\" has no audio enclosure")]
    NoEnclosure { title: String },
}

/// Identifies one `load`/`restore`; media events carrying an older token
/// belong to an abandoned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LoadToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Empty,
    Loading,
    Ready,
    Playing,
    Paused,
}

/// What the transport button offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAffordance {
    Play,
    Pause,
}

impl TransportAffordance {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Pause => "Pause",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "datePublished")]
    pub published_at_display: String,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub current_time: f64,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub duration: f64,
    #[serde(default, alias = "image")]
    pub image_url: String,
    #[serde(default, alias = "src")]
    pub source_url: String,
}

/// Unknown durations were stored as `null`.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|s| s.is_finite() && *s >= 0.0)
        .unwrap_or(0.0))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub title: String,
    pub published_at_display: String,
    pub image_url: String,
    pub source_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOutcome {
    pub token: LoadToken,
    /// Small-viewport devices switch straight to the player view.
    pub show_player: bool,
}

pub struct PlaybackSession<M, T> {
    media: M,
    ticker: T,
    store: DurableStore,
    state: TransportState,
    now_playing: Option<NowPlaying>,
    elapsed: f64,
    duration: Option<f64>,
    token: LoadToken,
    loading: bool,
    autoplay_pending: bool,
    ticker_running: bool,
    settings: SessionSettings,
}

impl<M: MediaPlayback, T: SnapshotTicker> PlaybackSession<M, T> {
    pub fn new(media: M, ticker: T, store: DurableStore, settings: &SessionSettings) -> Self {
        Self {
            media,
            ticker,
            store,
            state: TransportState::Empty,
            now_playing: None,
            elapsed: 0.0,
            duration: None,
            token: LoadToken::default(),
            loading: false,
            autoplay_pending: false,
            ticker_running: false,
            settings: settings.clone(),
        }
    }

    /// Adopts the last persisted snapshot, paused. Playback is never started
    /// here. The snapshot's duration is shown until the reloaded source
    /// reports its own; it is never written to the media element.
    pub fn restore(&mut self, viewport_width: Option<f64>) -> Option<RestoreOutcome> {
        let snapshot: PlaybackSnapshot = self.store.read(PLAYER_STATE_KEY)?;
        let token = self.next_token();

        if !snapshot.source_url.is_empty() {
            self.media.set_source(&snapshot.source_url);
        }
        self.media.set_current_time(snapshot.current_time);
        self.elapsed = snapshot.current_time;
        self.duration = (snapshot.duration > 0.0).then_some(snapshot.duration);
        self.loading = false;
        self.autoplay_pending = false;
        self.state = TransportState::Paused;

        info!(title = %snapshot.title, position = snapshot.current_time, "restored playback");
        self.now_playing = Some(NowPlaying {
            title: snapshot.title,
            published_at_display: snapshot.published_at_display,
            image_url: snapshot.image_url,
            source_url: snapshot.source_url,
        });

        Some(RestoreOutcome {
            token,
            show_player: viewport_width.is_some_and(|w| self.settings.is_small_viewport(w)),
        })
    }

    /// Loads `episode`, abandoning whatever was loaded before.
    pub fn load(&mut self, episode: &MediaItem) -> Result<LoadToken, PlaybackError> {
        let source = episode
            .enclosure_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| PlaybackError::NoEnclosure {
                title: episode.title.clone(),
            })?
            .to_string();

        let token = self.next_token();
        self.elapsed = 0.0;
        self.duration = None;
        self.media.set_source(&source);
        self.media.set_current_time(0.0);
        self.loading = true;
        self.autoplay_pending = self.settings.autoplay_on_load;
        self.state = TransportState::Loading;

        info!(title = %episode.title, "loading episode");
        self.now_playing = Some(NowPlaying {
            title: episode.title.clone(),
            published_at_display: published_display(episode.published_at),
            image_url: episode
                .display_image()
                .unwrap_or(self.settings.fallback_image.as_str())
                .to_string(),
            source_url: source,
        });
        Ok(token)
    }

    /// Media reported its metadata (the duration is known).
    pub fn metadata_ready(&mut self, token: LoadToken, duration: f64) -> bool {
        if !self.is_current(token) {
            return false;
        }
        if duration.is_finite() && duration > 0.0 {
            self.duration = Some(duration);
        }
        self.loading = false;

        let state = self.state;
        match state {
            TransportState::Loading if self.autoplay_pending => self.start_playback(),
            TransportState::Loading => self.state = TransportState::Ready,
            // A restored source: its position only sticks once metadata is in.
            TransportState::Paused => self.media.set_current_time(self.elapsed),
            _ => {}
        }
        self.autoplay_pending = false;
        true
    }

    pub fn time_update(&mut self, token: LoadToken, current_time: f64) -> bool {
        if !self.is_current(token) {
            return false;
        }
        if current_time.is_finite() {
            self.elapsed = current_time.max(0.0);
        }
        if let Some(duration) = self.media.duration().filter(|d| d.is_finite() && *d > 0.0) {
            self.duration = Some(duration);
        }
        true
    }

    pub fn play(&mut self) -> bool {
        match self.state {
            TransportState::Paused | TransportState::Ready => {
                self.start_playback();
                true
            }
            _ => false,
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.media.pause();
        self.state = TransportState::Paused;
        true
    }

    pub fn toggle(&mut self) -> bool {
        if self.state == TransportState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) -> bool {
        let Some(duration) = self.known_duration() else {
            return false;
        };
        if fraction.is_nan() {
            return false;
        }
        self.set_position(fraction.clamp(0.0, 1.0) * duration);
        true
    }

    /// Click at `offset_x` on a progress track `width` pixels wide.
    pub fn seek_from_click(&mut self, offset_x: f64, width: f64) -> bool {
        if !(width > 0.0) {
            return false;
        }
        self.seek_to_fraction(offset_x / width)
    }

    pub fn skip(&mut self, delta_seconds: f64) -> bool {
        let Some(duration) = self.known_duration() else {
            return false;
        };
        let target = (self.media.current_time() + delta_seconds).clamp(0.0, duration);
        self.set_position(target);
        true
    }

    /// Current snapshot, only while playing.
    pub fn snapshot(&self) -> Option<PlaybackSnapshot> {
        if self.state != TransportState::Playing {
            return None;
        }
        let now = self.now_playing.as_ref()?;
        Some(PlaybackSnapshot {
            title: now.title.clone(),
            published_at_display: now.published_at_display.clone(),
            current_time: self.media.current_time(),
            duration: self.duration.unwrap_or(0.0),
            image_url: now.image_url.clone(),
            source_url: now.source_url.clone(),
        })
    }

    /// Persists the snapshot if playing; returns whether one was written.
    pub fn snapshot_tick(&mut self) -> bool {
        let Some(snapshot) = self.snapshot() else {
            return false;
        };
        match self.store.write(PLAYER_STATE_KEY, &snapshot) {
            Ok(()) => {
                trace!(position = snapshot.current_time, "playback snapshot written");
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to persist playback snapshot");
                false
            }
        }
    }

    /// Stops the snapshot ticker; call when the session goes away.
    pub fn teardown(&mut self) {
        if self.ticker_running {
            self.ticker.stop();
            self.ticker_running = false;
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn now_playing(&self) -> Option<&NowPlaying> {
        self.now_playing.as_ref()
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn elapsed_text(&self) -> String {
        format_time(self.elapsed)
    }

    pub fn duration_text(&self) -> String {
        format_time(self.duration.unwrap_or(0.0))
    }

    pub fn progress_percent(&self) -> f64 {
        match self.known_duration() {
            Some(duration) => (self.elapsed / duration * 100.0).clamp(0.0, 100.0),
            None => 0.0,
        }
    }

    /// The progress bar shows its loading style until metadata arrives.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn affordance(&self) -> TransportAffordance {
        if self.state == TransportState::Playing {
            TransportAffordance::Pause
        } else {
            TransportAffordance::Play
        }
    }

    #[cfg(test)]
    pub fn media(&self) -> &M {
        &self.media
    }

    #[cfg(test)]
    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    fn next_token(&mut self) -> LoadToken {
        self.token = LoadToken(self.token.0 + 1);
        self.token
    }

    fn is_current(&self, token: LoadToken) -> bool {
        if token != self.token {
            debug!(?token, current = ?self.token, "dropping stale media event");
            return false;
        }
        true
    }

    fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }

    fn set_position(&mut self, seconds: f64) {
        self.media.set_current_time(seconds);
        self.elapsed = seconds;
    }

    fn start_playback(&mut self) {
        self.media.play();
        self.state = TransportState::Playing;
        if !self.ticker_running {
            self.ticker.start(self.settings.snapshot_interval());
            self.ticker_running = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeMedia {
        src: Option<String>,
        current_time: f64,
        duration: Option<f64>,
        play_calls: usize,
        pause_calls: usize,
    }

    impl MediaPlayback for FakeMedia {
        fn set_source(&mut self, url: &str) {
            self.src = Some(url.to_string());
            self.duration = None;
        }

        fn play(&mut self) {
            self.play_calls += 1;
        }

        fn pause(&mut self) {
            self.pause_calls += 1;
        }

        fn current_time(&self) -> f64 {
            self.current_time
        }

        fn set_current_time(&mut self, seconds: f64) {
            self.current_time = seconds;
        }

        fn duration(&self) -> Option<f64> {
            self.duration
        }
    }

    #[derive(Default)]
    struct ManualTicker {
        starts: Vec<Duration>,
        stops: usize,
    }

    impl SnapshotTicker for ManualTicker {
        fn start(&mut self, interval: Duration) {
            self.starts.push(interval);
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    type TestSession = PlaybackSession<FakeMedia, ManualTicker>;

    fn session(store: &DurableStore) -> TestSession {
        PlaybackSession::new(
            FakeMedia::default(),
            ManualTicker::default(),
            store.clone(),
            &SessionSettings::default(),
        )
    }

    fn episode(title: &str) -> MediaItem {
        MediaItem {
            id: title.to_lowercase(),
            title: title.to_string(),
            image_url: Some(format!("https://img.example/{title}.jpg")),
            published_at: Some(1_700_000_000),
            enclosure_url: Some(format!("https://cdn.example/{title}.mp3")),
            ..MediaItem::default()
        }
    }

    fn playing(store: &DurableStore, duration: f64) -> (TestSession, LoadToken) {
        let mut session = session(store);
        let token = session.load(&episode("Pilot")).unwrap();
        session.metadata_ready(token, duration);
        (session, token)
    }

    #[test]
    fn load_enters_loading_and_metadata_starts_playback() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        let token = session.load(&episode("Pilot")).unwrap();

        assert_eq!(session.state(), TransportState::Loading);
        assert!(session.is_loading());
        assert_eq!(session.elapsed_text(), "0:00");
        assert_eq!(session.media().src.as_deref(), Some("https://cdn.example/Pilot.mp3"));
        let now = session.now_playing().unwrap();
        assert_eq!(now.published_at_display, "11/14/2023");

        assert!(session.metadata_ready(token, 1800.0));
        assert_eq!(session.state(), TransportState::Playing);
        assert!(!session.is_loading());
        assert_eq!(session.duration_text(), "30:00");
        assert_eq!(session.media().play_calls, 1);
        assert_eq!(session.affordance(), TransportAffordance::Pause);
    }

    #[test]
    fn metadata_without_autoplay_leaves_session_ready() {
        let store = DurableStore::in_memory();
        let settings = SessionSettings {
            autoplay_on_load: false,
            ..SessionSettings::default()
        };
        let mut session = PlaybackSession::new(
            FakeMedia::default(),
            ManualTicker::default(),
            store,
            &settings,
        );
        let token = session.load(&episode("Pilot")).unwrap();
        session.metadata_ready(token, 60.0);
        assert_eq!(session.state(), TransportState::Ready);
        assert_eq!(session.media().play_calls, 0);
        assert!(session.play());
        assert_eq!(session.state(), TransportState::Playing);
    }

    #[test]
    fn episode_without_enclosure_is_rejected() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        let mut item = episode("Pilot");
        item.enclosure_url = Some("  ".to_string());
        assert!(matches!(
            session.load(&item),
            Err(PlaybackError::NoEnclosure { .. })
        ));
        assert_eq!(session.state(), TransportState::Empty);
    }

    #[test]
    fn stale_events_are_ignored_after_a_new_load() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        let first = session.load(&episode("First")).unwrap();
        let second = session.load(&episode("Second")).unwrap();

        assert!(!session.metadata_ready(first, 99.0));
        assert!(!session.time_update(first, 42.0));
        assert_eq!(session.state(), TransportState::Loading);
        assert_eq!(session.duration(), None);

        assert!(session.metadata_ready(second, 120.0));
        assert_eq!(session.now_playing().unwrap().title, "Second");
    }

    #[test]
    fn invalid_transitions_are_no_ops() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        assert!(!session.pause());
        assert!(!session.play());
        assert!(!session.skip(30.0));
        assert!(!session.seek_to_fraction(0.5));
        assert_eq!(session.state(), TransportState::Empty);
        assert_eq!(session.media().pause_calls, 0);

        session.load(&episode("Pilot")).unwrap();
        assert!(!session.play());
        assert!(!session.pause());
    }

    #[test]
    fn pause_and_toggle() {
        let store = DurableStore::in_memory();
        let (mut session, _) = playing(&store, 100.0);
        assert!(session.pause());
        assert_eq!(session.state(), TransportState::Paused);
        assert_eq!(session.affordance().label(), "Play");
        assert!(session.toggle());
        assert_eq!(session.state(), TransportState::Playing);
        assert!(session.toggle());
        assert_eq!(session.media().pause_calls, 2);
    }

    #[test]
    fn skip_clamps_to_track_bounds() {
        let store = DurableStore::in_memory();
        let (mut session, _) = playing(&store, 100.0);

        session.seek_to_fraction(0.1);
        assert!(session.skip(-15.0));
        assert_eq!(session.media().current_time, 0.0);

        session.seek_to_fraction(0.95);
        assert!(session.skip(30.0));
        assert_eq!(session.media().current_time, 100.0);
        assert_eq!(session.elapsed(), 100.0);
    }

    #[test]
    fn progress_track_clicks_seek_proportionally() {
        let store = DurableStore::in_memory();
        let (mut session, token) = playing(&store, 200.0);

        assert!(session.seek_from_click(50.0, 400.0));
        assert_eq!(session.media().current_time, 25.0);
        assert!(!session.seek_from_click(10.0, 0.0));

        session.time_update(token, 50.0);
        assert_eq!(session.progress_percent(), 25.0);
        assert_eq!(session.elapsed_text(), "0:50");
    }

    #[test]
    fn snapshots_are_written_only_while_playing() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        let token = session.load(&episode("Pilot")).unwrap();
        assert!(!session.snapshot_tick());
        assert!(store.read::<PlaybackSnapshot>(PLAYER_STATE_KEY).is_none());

        session.metadata_ready(token, 3600.0);
        session.seek_to_fraction(0.5);
        assert!(session.snapshot_tick());
        let saved: PlaybackSnapshot = store.read(PLAYER_STATE_KEY).unwrap();
        assert_eq!(saved.title, "Pilot");
        assert_eq!(saved.current_time, 1800.0);
        assert_eq!(saved.duration, 3600.0);
        assert_eq!(saved.source_url, "https://cdn.example/Pilot.mp3");

        session.pause();
        session.seek_to_fraction(0.75);
        assert!(!session.snapshot_tick());
        let saved: PlaybackSnapshot = store.read(PLAYER_STATE_KEY).unwrap();
        assert_eq!(saved.current_time, 1800.0);
    }

    #[test]
    fn ticker_starts_on_first_play_and_stops_on_teardown() {
        let store = DurableStore::in_memory();
        let (mut session, _) = playing(&store, 100.0);
        session.pause();
        session.play();
        let token = session.load(&episode("Next")).unwrap();
        session.metadata_ready(token, 50.0);
        assert_eq!(session.ticker().starts, vec![Duration::from_secs(5)]);

        session.teardown();
        session.teardown();
        assert_eq!(session.ticker().stops, 1);
    }

    #[test]
    fn restores_snapshot_paused_without_playing() {
        let store = DurableStore::in_memory();
        let snapshot = PlaybackSnapshot {
            title: "Episode 3".to_string(),
            published_at_display: "11/14/2023".to_string(),
            current_time: 754.0,
            duration: 3600.0,
            image_url: "https://img.example/3.jpg".to_string(),
            source_url: "https://cdn.example/3.mp3".to_string(),
        };
        store.write(PLAYER_STATE_KEY, &snapshot).unwrap();

        let mut session = session(&store);
        let outcome = session.restore(Some(800.0)).unwrap();
        assert!(outcome.show_player);
        assert_eq!(session.state(), TransportState::Paused);
        assert_eq!(session.now_playing().unwrap().title, "Episode 3");
        assert_eq!(session.now_playing().unwrap().published_at_display, "11/14/2023");
        assert_eq!(session.elapsed_text(), "12:34");
        assert_eq!(session.duration_text(), "1:00:00");
        assert_eq!(session.progress_percent(), 754.0 / 3600.0 * 100.0);
        assert_eq!(session.media().src.as_deref(), Some("https://cdn.example/3.mp3"));

        // the reloaded source reports its own duration; still no autoplay
        session.metadata_ready(outcome.token, 3601.0);
        assert_eq!(session.state(), TransportState::Paused);
        assert_eq!(session.duration(), Some(3601.0));
        assert_eq!(session.media().current_time, 754.0);
        assert_eq!(session.media().play_calls, 0);
        assert!(!session.snapshot_tick());
    }

    #[test]
    fn restore_on_wide_viewport_stays_on_current_view() {
        let store = DurableStore::in_memory();
        store
            .write(
                PLAYER_STATE_KEY,
                &serde_json::json!({"title": "T", "currentTime": 1, "duration": 2}),
            )
            .unwrap();
        let mut session = session(&store);
        assert!(!session.restore(Some(1440.0)).unwrap().show_player);

        let mut session = self::session(&store);
        assert!(!session.restore(None).unwrap().show_player);
    }

    #[test]
    fn restore_uses_the_configured_small_viewport_width() {
        let store = DurableStore::in_memory();
        store
            .write(
                PLAYER_STATE_KEY,
                &serde_json::json!({"title": "T", "currentTime": 1, "duration": 2}),
            )
            .unwrap();
        let settings = SessionSettings {
            small_viewport_max_width: 600.0,
            ..SessionSettings::default()
        };
        let restore_at = |width: f64| {
            let mut session = PlaybackSession::new(
                FakeMedia::default(),
                ManualTicker::default(),
                store.clone(),
                &settings,
            );
            session.restore(Some(width)).unwrap().show_player
        };
        assert!(restore_at(599.0));
        assert!(!restore_at(600.0));
        assert!(!restore_at(800.0));
    }

    #[test]
    fn nothing_to_restore_leaves_session_empty() {
        let store = DurableStore::in_memory();
        let mut session = session(&store);
        assert_eq!(session.restore(Some(500.0)), None);
        assert_eq!(session.state(), TransportState::Empty);
    }

    #[test]
    fn snapshot_accepts_legacy_field_names() {
        let json = r#"{"title": "Old", "datePublished": "1/2/2020", "currentTime": 12.5,
                       "duration": null, "image": "i.png", "src": "a.mp3"}"#;
        let snapshot: PlaybackSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.published_at_display, "1/2/2020");
        assert_eq!(snapshot.duration, 0.0);
        assert_eq!(snapshot.image_url, "i.png");
        assert_eq!(snapshot.source_url, "a.mp3");
    }
}
