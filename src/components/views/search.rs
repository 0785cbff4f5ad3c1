use crate::api::*;
use crate::components::{play_episode, use_card_scheduler, CardArt, CardScheduler, Icon, Session};
use crate::session::{
    published_display, EnqueueOutcome, ImageSlot, QueueStore, SearchHistoryStore,
    SessionSettings,
};
use dioxus::prelude::*;
use tracing::warn;

const EMPTY_QUERY_MESSAGE: &str = "Please enter a podcast title.";
const NO_PODCASTS_MESSAGE: &str = "No podcasts found.";
const NO_EPISODES_MESSAGE: &str = "No episodes found.";

#[derive(Clone, Copy, PartialEq)]
enum Listing {
    Podcasts,
    Episodes,
}

/// Signals behind the result grid.
#[derive(Clone, Copy)]
struct ResultsPane {
    images: Signal<CardScheduler>,
    cards: Signal<Vec<MediaItem>>,
    listing: Signal<Listing>,
    loading: Signal<bool>,
    message: Signal<Option<String>>,
    generation: Signal<u64>,
}

impl ResultsPane {
    /// Starts a request and returns its generation.
    fn begin(mut self) -> u64 {
        self.message.set(None);
        self.loading.set(true);
        self.generation
            .with_mut(|value| *value = value.saturating_add(1));
        *self.generation.peek()
    }

    fn is_current(&self, generation: u64) -> bool {
        *self.generation.peek() == generation
    }

    fn show(mut self, items: Vec<MediaItem>, listing: Listing, eager_limit: usize) {
        self.listing.set(listing);
        if items.is_empty() {
            self.cards.set(Vec::new());
            self.loading.set(false);
            self.message.set(Some(
                match listing {
                    Listing::Podcasts => NO_PODCASTS_MESSAGE,
                    Listing::Episodes => NO_EPISODES_MESSAGE,
                }
                .to_string(),
            ));
            return;
        }

        let slots = items
            .iter()
            .map(|item| ImageSlot::new(item.display_image()))
            .collect();
        // Image targets are attached once the new cards have rendered
        self.cards.set(items);
        let ready = self.images.write().schedule(slots, eager_limit);
        if ready.is_some() {
            self.loading.set(false);
        }
    }

    fn fail(mut self, message: String) {
        self.cards.set(Vec::new());
        self.loading.set(false);
        self.message.set(Some(message));
    }
}

#[component]
pub fn SearchView() -> Element {
    let settings = use_context::<Signal<SessionSettings>>();
    let mut history = use_context::<Signal<SearchHistoryStore>>();
    let mut queue = use_context::<Signal<QueueStore>>();
    let session = use_context::<Signal<Session>>();

    let mut search_query = use_signal(String::new);
    let mut notice = use_signal(|| None::<String>);
    let loading = use_signal(|| false);
    let images = use_card_scheduler(settings.peek().fallback_image.clone());
    let pane = ResultsPane {
        images,
        cards: use_signal(Vec::<MediaItem>::new),
        listing: use_signal(|| Listing::Podcasts),
        loading,
        message: use_signal(|| None::<String>),
        generation: use_signal(|| 0u64),
    };

    let mut run_search = move |raw: String| {
        let query = raw.trim().to_string();
        if query.is_empty() {
            pane.fail(EMPTY_QUERY_MESSAGE.to_string());
            return;
        }
        if let Err(err) = history.write().append(&query) {
            warn!(error = %err, "search history not saved");
        }

        let generation = pane.begin();
        let (client, eager_limit) = {
            let settings = settings.peek();
            (PodcastClient::new(&settings.api_base), settings.eager_image_limit)
        };
        spawn(async move {
            let result = client.search(&query).await;
            if !pane.is_current(generation) {
                return;
            }
            match result {
                Ok(feeds) => pane.show(podcast_cards(&feeds), Listing::Podcasts, eager_limit),
                Err(err) => pane.fail(format!("Error: {err}")),
            }
        });
    };

    let open_podcast = move |podcast: MediaItem| {
        let generation = pane.begin();
        let (client, eager_limit) = {
            let settings = settings.peek();
            (PodcastClient::new(&settings.api_base), settings.eager_image_limit)
        };
        spawn(async move {
            let max = podcast.episode_count.unwrap_or_default();
            let result = client.episodes(&podcast.id, max).await;
            if !pane.is_current(generation) {
                return;
            }
            match result {
                Ok(items) => pane.show(episode_cards(&items), Listing::Episodes, eager_limit),
                Err(err) => pane.fail(format!("Error: {err}")),
            }
        });
    };

    let mut add_to_queue = move |episode: MediaItem| {
        let title = episode.title.clone();
        match queue.write().enqueue(episode) {
            Ok(EnqueueOutcome::Queued) => notice.set(Some(format!("Added \"{title}\" to the queue"))),
            Ok(EnqueueOutcome::AlreadyQueued) => {
                notice.set(Some(format!("\"{title}\" is already in the queue")))
            }
            Err(err) => {
                warn!(error = %err, "queue not saved");
                notice.set(Some("Could not save the queue".to_string()));
            }
        }
    };

    let history_entries = history.read().entries().to_vec();
    let cards = (pane.cards)();
    let listing = (pane.listing)();
    let message = (pane.message)();
    let is_loading = loading();
    let grid_class = if is_loading {
        "hidden"
    } else {
        "grid grid-cols-2 sm:grid-cols-3 lg:grid-cols-4 xl:grid-cols-5 gap-4"
    };

    rsx! {
        div { class: "space-y-8",
            header { class: "page-header gap-4",
                h1 { class: "page-title", "Search" }

                div { class: "flex flex-col sm:flex-row gap-3 max-w-3xl",
                    div { class: "relative flex-1",
                        Icon {
                            name: "search".to_string(),
                            class: "absolute left-4 top-1/2 -translate-y-1/2 w-5 h-5 text-zinc-400".to_string(),
                        }
                        input {
                            class: "w-full pl-12 pr-4 py-4 bg-zinc-800/50 border border-zinc-700/50 rounded-xl text-white placeholder:text-zinc-500 focus:outline-none focus:border-emerald-500/50 focus:ring-2 focus:ring-emerald-500/20",
                            placeholder: "Search podcasts...",
                            value: search_query,
                            onfocus: move |_| search_query.set(String::new()),
                            oninput: move |evt| search_query.set(evt.value()),
                            onkeydown: move |evt: KeyboardEvent| {
                                if evt.key() == Key::Enter {
                                    run_search(search_query());
                                }
                            },
                        }
                    }
                    button {
                        class: "px-5 py-3 rounded-xl bg-emerald-500 hover:bg-emerald-400 text-white font-medium transition-colors",
                        onclick: move |_| run_search(search_query()),
                        "Search"
                    }
                }

                div { class: "flex items-center gap-3 max-w-3xl",
                    select {
                        class: "flex-1 px-3 py-2 bg-zinc-800/50 border border-zinc-700/50 rounded-lg text-zinc-200",
                        value: "",
                        onchange: move |evt| {
                            let query = evt.value();
                            if !query.is_empty() {
                                search_query.set(query.clone());
                                run_search(query);
                            }
                        },
                        option { value: "", "Previous searches" }
                        for entry in history_entries {
                            option { key: "{entry}", value: "{entry}", "{entry}" }
                        }
                    }
                    button {
                        class: "flex items-center gap-2 px-3 py-2 rounded-lg text-zinc-400 hover:text-white hover:bg-zinc-800/60 transition-colors",
                        onclick: move |_| {
                            if let Err(err) = history.write().reset_all() {
                                warn!(error = %err, "search history not cleared");
                                notice.set(Some("Could not clear previous searches".to_string()));
                            }
                            search_query.set(String::new());
                        },
                        Icon {
                            name: "trash".to_string(),
                            class: "w-4 h-4".to_string(),
                        }
                        "Reset"
                    }
                }
            }

            if let Some(text) = notice() {
                p { class: "text-sm text-emerald-400", "{text}" }
            }

            if is_loading {
                div { class: "flex items-center justify-center py-12",
                    Icon {
                        name: "loader".to_string(),
                        class: "w-8 h-8 text-emerald-400".to_string(),
                    }
                }
            }

            if let Some(text) = message {
                p { class: "text-center text-zinc-400 py-8", "{text}" }
            }

            div { class: "{grid_class}",
                for (index, item) in cards.into_iter().enumerate() {
                    ResultCard {
                        key: "{images.peek().pass()}-{index}",
                        images,
                        index,
                        item: item.clone(),
                        loading,
                        listing_episodes: listing == Listing::Episodes,
                        on_open: {
                            let item = item.clone();
                            move |_| open_podcast(item.clone())
                        },
                        on_play: {
                            let item = item.clone();
                            move |_| play_episode(session, &item)
                        },
                        on_queue: {
                            let item = item.clone();
                            move |_| add_to_queue(item.clone())
                        },
                    }
                }
            }
        }
    }
}

#[component]
fn ResultCard(
    images: Signal<CardScheduler>,
    index: usize,
    item: MediaItem,
    loading: Signal<bool>,
    listing_episodes: bool,
    on_open: EventHandler<MouseEvent>,
    on_play: EventHandler<MouseEvent>,
    on_queue: EventHandler<MouseEvent>,
) -> Element {
    let published = published_display(item.published_at);

    rsx! {
        div { class: "group flex flex-col gap-2 p-3 rounded-xl bg-zinc-900/60 border border-zinc-800/60 hover:border-zinc-700 transition-colors",
            div {
                class: if listing_episodes { "" } else { "cursor-pointer" },
                onclick: move |evt| {
                    if !listing_episodes {
                        on_open.call(evt);
                    }
                },
                CardArt {
                    images,
                    index,
                    alt: item.title.clone(),
                    loading,
                }
            }
            h3 { class: "text-sm font-semibold text-white line-clamp-2", "{item.title}" }
            if listing_episodes {
                p { class: "text-xs text-zinc-500", "{published}" }
                div { class: "flex gap-2",
                    button {
                        class: "flex-1 flex items-center justify-center gap-1 px-2 py-1.5 rounded-lg bg-emerald-500/90 hover:bg-emerald-400 text-white text-xs",
                        onclick: move |evt| on_play.call(evt),
                        Icon {
                            name: "play".to_string(),
                            class: "w-3 h-3".to_string(),
                        }
                        "Play"
                    }
                    button {
                        class: "flex-1 flex items-center justify-center gap-1 px-2 py-1.5 rounded-lg bg-zinc-800 hover:bg-zinc-700 text-zinc-200 text-xs",
                        onclick: move |evt| on_queue.call(evt),
                        Icon {
                            name: "queue".to_string(),
                            class: "w-3 h-3".to_string(),
                        }
                        "Queue"
                    }
                }
            } else {
                p { class: "text-xs text-zinc-500 line-clamp-3", "{item.description}" }
            }
        }
    }
}
