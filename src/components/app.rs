use crate::components::views::{ListenView, SearchView};
use crate::components::{
    bind_media_events, use_snapshot_pump, view_label, viewport_width, AppView, Icon, PageMedia,
    PageTicker, Session, ViewRouter,
};
use crate::db::open_default_store;
use crate::session::{load_settings, PlaybackSession, QueueStore, SearchHistoryStore};
use dioxus::prelude::*;
use std::time::Duration;
use tracing::info;

const DEFAULT_COVER: Asset = asset!("/assets/default-podcast.svg");

#[component]
pub fn AppShell() -> Element {
    let store = use_hook(open_default_store);
    let settings = use_signal({
        let store = store.clone();
        move || {
            let mut settings = load_settings(&store);
            if settings.fallback_image.trim().is_empty() {
                settings.fallback_image = DEFAULT_COVER.to_string();
            }
            settings
        }
    });
    let queue = use_signal({
        let store = store.clone();
        move || QueueStore::load(store)
    });
    let history = use_signal({
        let store = store.clone();
        move || SearchHistoryStore::load(store)
    });
    let ticker_interval = use_signal(|| None::<Duration>);
    let mut session: Signal<Session> = use_signal({
        let store = store.clone();
        move || {
            PlaybackSession::new(
                PageMedia::default(),
                PageTicker::new(ticker_interval),
                store,
                &*settings.peek(),
            )
        }
    });
    let current_view = use_signal(AppView::default);
    let router = ViewRouter::new(current_view);

    // Provide state via context
    use_context_provider(|| settings);
    use_context_provider(|| queue);
    use_context_provider(|| history);
    use_context_provider(|| session);
    use_context_provider(|| router);

    use_snapshot_pump(ticker_interval, session);

    // Adopt the persisted session once, paused
    use_effect(move || {
        let restored = session.write().restore(viewport_width());
        if let Some(outcome) = restored {
            info!(show_player = outcome.show_player, "resuming previous session");
            bind_media_events(outcome.token, session);
            router.apply_restore(&outcome);
        }
    });

    use_drop(move || {
        if let Ok(mut session) = session.try_write() {
            session.teardown();
        }
    });

    let view = router.current();
    let (search_class, listen_class) = match view {
        AppView::Search => ("page-shell", "hidden"),
        AppView::Listen => ("hidden", "page-shell"),
    };

    rsx! {
        div { class: "min-h-screen flex flex-col bg-zinc-950 text-zinc-100",
            header { class: "mobile-safe-top border-b border-zinc-800/60 bg-zinc-950/80 backdrop-blur-xl",
                div { class: "flex items-center justify-between px-4 py-3",
                    div { class: "flex flex-col",
                        span { class: "text-xs uppercase tracking-widest text-zinc-500",
                            "PodSearch"
                        }
                        span { class: "text-sm font-semibold text-white", "{view_label(&view)}" }
                    }
                    nav { class: "flex items-center gap-1",
                        NavItem {
                            icon: "search",
                            label: "Search",
                            active: view == AppView::Search,
                            onclick: move |_| router.navigate_to(AppView::Search),
                        }
                        NavItem {
                            icon: "headphones",
                            label: "Listen",
                            active: view == AppView::Listen,
                            onclick: move |_| router.navigate_to(AppView::Listen),
                        }
                    }
                }
            }

            // Both views stay mounted; switching only toggles visibility
            main { class: "flex-1 overflow-y-auto main-scroll",
                div { class: "{search_class}", SearchView {} }
                div { class: "{listen_class}", ListenView {} }
            }
        }
    }
}

#[component]
fn NavItem(icon: String, label: String, active: bool, onclick: EventHandler<MouseEvent>) -> Element {
    let class = if active {
        "flex items-center gap-2 px-3 py-2 rounded-lg bg-emerald-500/10 text-emerald-400"
    } else {
        "flex items-center gap-2 px-3 py-2 rounded-lg text-zinc-400 hover:text-white hover:bg-zinc-800/50 transition-colors"
    };

    rsx! {
        button { class: "{class}", onclick: move |evt| onclick.call(evt),
            Icon { name: icon.clone(), class: "w-4 h-4".to_string() }
            span { class: "text-sm font-medium", "{label}" }
        }
    }
}
