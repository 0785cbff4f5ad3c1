use crate::session::{ImageKey, ImageLoadScheduler, ImageSlot, ImageStatus, ViewportWatcher};
use dioxus::prelude::*;

#[cfg(target_arch = "wasm32")]
use dioxus::core::{Runtime, RuntimeGuard};
#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use tracing::debug;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast};
#[cfg(target_arch = "wasm32")]
use web_sys::{window, IntersectionObserver, IntersectionObserverEntry};

pub type CardScheduler = ImageLoadScheduler<ImageSlot, PageViewportWatcher>;

/// Card images waiting for their `<img>` element to render.
#[derive(Debug, Default)]
struct PendingTargets {
    keys: Vec<ImageKey>,
}

impl PendingTargets {
    fn queue(&mut self, targets: &[ImageKey]) {
        for key in targets {
            if !self.keys.contains(key) {
                self.keys.push(*key);
            }
        }
    }

    fn forget(&mut self, key: ImageKey) {
        self.keys.retain(|queued| *queued != key);
    }

    fn clear(&mut self) {
        self.keys.clear();
    }

    /// Offers each queued key to `attach` and keeps the ones it refused.
    fn attach_with(&mut self, mut attach: impl FnMut(ImageKey) -> bool) -> usize {
        let before = self.keys.len();
        self.keys.retain(|key| !attach(*key));
        before - self.keys.len()
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

#[cfg(target_arch = "wasm32")]
type IntersectionCallback = Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>;

/// Reports card images entering the viewport into `visible`.
///
/// `observe` runs while the scheduler is being updated, before the new cards
/// exist in the DOM, so targets are queued and attached by
/// [`PageViewportWatcher::attach_pending`] once the grid has rendered.
#[cfg(target_arch = "wasm32")]
pub struct PageViewportWatcher {
    visible: Signal<Vec<ImageKey>>,
    attach_requests: Signal<u64>,
    pending: PendingTargets,
    runtime: Rc<Runtime>,
    observer: Option<IntersectionObserver>,
    _callback: Option<IntersectionCallback>,
}

#[cfg(target_arch = "wasm32")]
impl PageViewportWatcher {
    pub fn new(visible: Signal<Vec<ImageKey>>, attach_requests: Signal<u64>) -> Self {
        Self {
            visible,
            attach_requests,
            pending: PendingTargets::default(),
            runtime: Runtime::current(),
            observer: None,
            _callback: None,
        }
    }

    fn observer(&mut self) -> Option<IntersectionObserver> {
        if self.observer.is_none() {
            let mut visible = self.visible;
            let runtime = self.runtime.clone();
            let callback = Closure::wrap(Box::new(
                move |entries: js_sys::Array, _observer: IntersectionObserver| {
                    let _guard = RuntimeGuard::new(runtime.clone());
                    let keys: Vec<ImageKey> = entries
                        .iter()
                        .filter_map(|entry| entry.dyn_into::<IntersectionObserverEntry>().ok())
                        .filter(|entry| entry.is_intersecting())
                        .filter_map(|entry| ImageKey::from_dom_id(&entry.target().id()))
                        .collect();
                    if !keys.is_empty() {
                        visible.write().extend(keys);
                    }
                },
            )
                as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);
            let observer = IntersectionObserver::new(callback.as_ref().unchecked_ref()).ok()?;
            self.observer = Some(observer);
            self._callback = Some(callback);
        }
        self.observer.clone()
    }

    /// Starts observing every queued card whose element is now in the DOM.
    pub fn attach_pending(&mut self) {
        let Some(observer) = self.observer() else {
            return;
        };
        let Some(document) = window().and_then(|w| w.document()) else {
            return;
        };
        self.pending
            .attach_with(|key| match document.get_element_by_id(&key.dom_id()) {
                Some(element) => {
                    observer.observe(&element);
                    true
                }
                None => false,
            });
        if self.pending.len() > 0 {
            debug!(waiting = self.pending.len(), "card images not rendered yet");
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl ViewportWatcher for PageViewportWatcher {
    fn observe(&mut self, targets: &[ImageKey]) {
        self.pending.queue(targets);
        *self.attach_requests.write() += 1;
    }

    fn unobserve(&mut self, target: ImageKey) {
        self.pending.forget(target);
        let (Some(observer), Some(document)) =
            (self.observer.as_ref(), window().and_then(|w| w.document()))
        else {
            return;
        };
        if let Some(element) = document.get_element_by_id(&target.dom_id()) {
            observer.unobserve(&element);
        }
    }

    fn disconnect(&mut self) {
        self.pending.clear();
        if let Some(observer) = self.observer.as_ref() {
            observer.disconnect();
        }
    }
}

/// Desktop webviews render the whole list up front, so every deferred
/// image counts as visible once its card has rendered.
#[cfg(not(target_arch = "wasm32"))]
pub struct PageViewportWatcher {
    visible: Signal<Vec<ImageKey>>,
    attach_requests: Signal<u64>,
    pending: PendingTargets,
}

#[cfg(not(target_arch = "wasm32"))]
impl PageViewportWatcher {
    pub fn new(visible: Signal<Vec<ImageKey>>, attach_requests: Signal<u64>) -> Self {
        Self {
            visible,
            attach_requests,
            pending: PendingTargets::default(),
        }
    }

    pub fn attach_pending(&mut self) {
        let mut released = Vec::with_capacity(self.pending.len());
        self.pending.attach_with(|key| {
            released.push(key);
            true
        });
        if !released.is_empty() {
            self.visible.write().extend(released);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl ViewportWatcher for PageViewportWatcher {
    fn observe(&mut self, targets: &[ImageKey]) {
        self.pending.queue(targets);
        *self.attach_requests.write() += 1;
    }

    fn unobserve(&mut self, target: ImageKey) {
        self.pending.forget(target);
    }

    fn disconnect(&mut self) {
        self.pending.clear();
    }
}

/// Creates the card scheduler for a view and feeds viewport entries into it.
pub fn use_card_scheduler(fallback: String) -> Signal<CardScheduler> {
    let mut visible = use_signal(Vec::<ImageKey>::new);
    let attach_requests = use_signal(|| 0u64);
    let mut images = use_signal(move || {
        ImageLoadScheduler::new(fallback, PageViewportWatcher::new(visible, attach_requests))
    });

    // Effects run after the grid has rendered, so the card elements exist
    use_effect(move || {
        if attach_requests() == 0 {
            return;
        }
        images.write().watcher_mut().attach_pending();
    });

    use_effect(move || {
        if visible.read().is_empty() {
            return;
        }
        let keys = std::mem::take(&mut *visible.write());
        let mut scheduler = images.write();
        for key in keys {
            scheduler.entered_viewport(key);
        }
    });

    images
}

/// Card artwork driven by the scheduler; clears `loading` when the eager
/// phase completes.
#[component]
pub fn CardArt(
    images: Signal<CardScheduler>,
    index: usize,
    alt: String,
    loading: Signal<bool>,
) -> Element {
    let (key, src, resolved) = {
        let scheduler = images.read();
        let src = scheduler
            .cards()
            .get(index)
            .and_then(|card| card.src.clone());
        let resolved = scheduler
            .status(index)
            .is_some_and(ImageStatus::is_resolved);
        (scheduler.key(index), src, resolved)
    };
    let class = if resolved {
        "card-image rounded-lg transition-opacity opacity-100"
    } else {
        "card-image rounded-lg transition-opacity opacity-0"
    };

    rsx! {
        img {
            id: key.dom_id(),
            class: "{class}",
            alt: "{alt}",
            src,
            onload: move |_| {
                let mut images = images;
                let mut loading = loading;
                if images.write().image_loaded(key).is_some() {
                    loading.set(false);
                }
            },
            onerror: move |_| {
                let mut images = images;
                let mut loading = loading;
                if images.write().image_failed(key).is_some() {
                    loading.set(false);
                }
            },
        }
    }
}
