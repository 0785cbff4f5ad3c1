//! Progressive card image loading.
//!
//! A render pass loads the first `eager_limit` card images right away and
//! reports "content ready" once every one of them has resolved. Images past
//! the limit have their URL stashed and their source cleared; they are
//! handed to the viewport watcher only after the eager phase completes, and
//! each one is activated the first time it becomes visible.
//!
//! Broken images never surface as errors: they are swapped for the fallback
//! asset, and failures of the fallback itself are ignored.

use tracing::{debug, trace};

/// Image element of a rendered card.
pub trait CardImage {
    fn active_src(&self) -> Option<&str>;
    fn set_src(&mut self, url: &str);
    fn clear_src(&mut self);
    fn stash_src(&mut self, url: String);
    fn stashed_src(&self) -> Option<&str>;
}

/// Viewport-intersection capability. Visibility is reported back through
/// [`ImageLoadScheduler::entered_viewport`].
pub trait ViewportWatcher {
    fn observe(&mut self, targets: &[ImageKey]);
    fn unobserve(&mut self, target: ImageKey);
    /// Drops every observation of the previous pass.
    fn disconnect(&mut self);
}

/// Identifies one card image within one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pub pass: u64,
    pub index: usize,
}

impl ImageKey {
    pub fn dom_id(&self) -> String {
        format!("card-img-{}-{}", self.pass, self.index)
    }

    pub fn from_dom_id(id: &str) -> Option<Self> {
        let rest = id.strip_prefix("card-img-")?;
        let (pass, index) = rest.split_once('-')?;
        Some(Self {
            pass: pass.parse().ok()?,
            index: index.parse().ok()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStatus {
    /// Eager image waiting for its load or error event.
    Pending,
    /// Past the eager limit, waiting to become visible.
    Deferred,
    /// Deferred image whose real URL is now active.
    Activated,
    Loaded,
    FellBack,
}

impl ImageStatus {
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Loaded | Self::FellBack)
    }
}

/// Fired once per pass, when the last eager image resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentReady {
    pub pass: u64,
    pub deferred: usize,
}

/// Plain card image model for hosts that render from state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageSlot {
    pub src: Option<String>,
    pub stashed: Option<String>,
}

impl ImageSlot {
    pub fn new(src: Option<&str>) -> Self {
        Self {
            src: src.map(str::to_string),
            stashed: None,
        }
    }
}

impl CardImage for ImageSlot {
    fn active_src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
    }

    fn clear_src(&mut self) {
        self.src = None;
    }

    fn stash_src(&mut self, url: String) {
        self.stashed = Some(url);
    }

    fn stashed_src(&self) -> Option<&str> {
        self.stashed.as_deref()
    }
}

pub struct ImageLoadScheduler<I, W> {
    fallback: String,
    watcher: W,
    pass: u64,
    cards: Vec<I>,
    status: Vec<ImageStatus>,
    pending: usize,
    ready: bool,
}

impl<I: CardImage, W: ViewportWatcher> ImageLoadScheduler<I, W> {
    pub fn new(fallback: impl Into<String>, watcher: W) -> Self {
        Self {
            fallback: fallback.into(),
            watcher,
            pass: 0,
            cards: Vec::new(),
            status: Vec::new(),
            pending: 0,
            ready: false,
        }
    }

    /// Starts a new render pass over `cards`.
    ///
    /// Returns the "content ready" signal right away when no eager image is
    /// left waiting, which includes `eager_limit == 0` and an empty list.
    pub fn schedule(&mut self, cards: Vec<I>, eager_limit: usize) -> Option<ContentReady> {
        self.watcher.disconnect();
        self.pass += 1;
        self.cards = cards;
        self.status = vec![ImageStatus::Deferred; self.cards.len()];
        self.pending = 0;
        self.ready = false;

        let eager_len = eager_limit.min(self.cards.len());
        for card in self.cards.iter_mut().skip(eager_len) {
            if let Some(url) = card.active_src().filter(|u| !u.is_empty()).map(str::to_string) {
                card.stash_src(url);
            }
            card.clear_src();
        }

        for index in 0..eager_len {
            let has_src = self.cards[index]
                .active_src()
                .is_some_and(|url| !url.is_empty());
            if has_src {
                self.status[index] = ImageStatus::Pending;
                self.pending += 1;
            } else {
                self.fall_back(index);
            }
        }

        debug!(
            pass = self.pass,
            eager = eager_len,
            deferred = self.cards.len() - eager_len,
            "scheduled card images"
        );

        if self.pending == 0 {
            Some(self.complete_eager_phase())
        } else {
            None
        }
    }

    pub fn image_loaded(&mut self, key: ImageKey) -> Option<ContentReady> {
        let index = self.current_index(key)?;
        match self.status[index] {
            ImageStatus::Pending => {
                self.status[index] = ImageStatus::Loaded;
                self.settle_eager()
            }
            ImageStatus::Activated => {
                self.status[index] = ImageStatus::Loaded;
                self.watcher.unobserve(key);
                None
            }
            _ => None,
        }
    }

    pub fn image_failed(&mut self, key: ImageKey) -> Option<ContentReady> {
        let index = self.current_index(key)?;
        match self.status[index] {
            ImageStatus::Pending => {
                self.fall_back(index);
                self.settle_eager()
            }
            ImageStatus::Activated => {
                self.fall_back(index);
                self.watcher.unobserve(key);
                None
            }
            // The fallback asset failing is not a second failure.
            _ => None,
        }
    }

    /// Activates a deferred image the first time it becomes visible.
    pub fn entered_viewport(&mut self, key: ImageKey) {
        if !self.ready {
            return;
        }
        let Some(index) = self.current_index(key) else {
            return;
        };
        if self.status[index] != ImageStatus::Deferred {
            return;
        }

        match self.cards[index].stashed_src().map(str::to_string) {
            Some(url) => {
                trace!(pass = key.pass, index, "activating deferred image");
                self.cards[index].set_src(&url);
                self.status[index] = ImageStatus::Activated;
            }
            None => {
                self.fall_back(index);
                self.watcher.unobserve(key);
            }
        }
    }

    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn key(&self, index: usize) -> ImageKey {
        ImageKey {
            pass: self.pass,
            index,
        }
    }

    pub fn cards(&self) -> &[I] {
        &self.cards
    }

    pub fn status(&self, index: usize) -> Option<ImageStatus> {
        self.status.get(index).copied()
    }

    #[cfg(test)]
    pub fn is_content_ready(&self) -> bool {
        self.ready
    }

    #[cfg(test)]
    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn watcher_mut(&mut self) -> &mut W {
        &mut self.watcher
    }

    fn current_index(&self, key: ImageKey) -> Option<usize> {
        if key.pass != self.pass || key.index >= self.cards.len() {
            trace!(?key, pass = self.pass, "ignoring image event from another pass");
            return None;
        }
        Some(key.index)
    }

    fn fall_back(&mut self, index: usize) {
        debug!(pass = self.pass, index, "card image replaced by fallback");
        let fallback = self.fallback.clone();
        self.cards[index].set_src(&fallback);
        self.status[index] = ImageStatus::FellBack;
    }

    fn settle_eager(&mut self) -> Option<ContentReady> {
        self.pending = self.pending.saturating_sub(1);
        if self.pending == 0 && !self.ready {
            Some(self.complete_eager_phase())
        } else {
            None
        }
    }

    fn complete_eager_phase(&mut self) -> ContentReady {
        self.ready = true;
        let deferred: Vec<ImageKey> = self
            .status
            .iter()
            .enumerate()
            .filter(|(_, status)| **status == ImageStatus::Deferred)
            .map(|(index, _)| self.key(index))
            .collect();
        if !deferred.is_empty() {
            self.watcher.observe(&deferred);
        }
        ContentReady {
            pass: self.pass,
            deferred: deferred.len(),
        }
    }
}
