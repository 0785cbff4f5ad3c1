use crate::api::MediaItem;
use crate::components::{play_episode, AppView, Icon, Player, Session, ViewRouter};
use crate::session::{published_display, QueueStore};
use dioxus::prelude::*;
use tracing::warn;

#[component]
pub fn ListenView() -> Element {
    rsx! {
        div { class: "space-y-8",
            header { class: "page-header gap-4",
                h1 { class: "page-title", "Now Playing" }
            }
            Player {}
            QueueList {}
        }
    }
}

#[component]
fn QueueList() -> Element {
    let mut queue = use_context::<Signal<QueueStore>>();
    let session = use_context::<Signal<Session>>();
    let router = use_context::<ViewRouter>();

    // Re-read the stored queue when the view mounts
    use_effect(move || {
        queue.write().reload();
    });

    let entries: Vec<MediaItem> = queue.read().list().to_vec();

    rsx! {
        section { class: "space-y-4",
            div { class: "page-header page-header--split",
                div {
                    h2 { class: "text-lg font-semibold text-white", "Queue" }
                    p { class: "page-subtitle", "{entries.len()} episodes" }
                }
            }

            if entries.is_empty() {
                div { class: "flex flex-col items-center justify-center py-12",
                    Icon {
                        name: "queue".to_string(),
                        class: "w-12 h-12 text-zinc-600 mb-4".to_string(),
                    }
                    p { class: "text-zinc-400", "Your queue is empty" }
                    button {
                        class: "mt-3 text-sm text-emerald-400 hover:text-emerald-300",
                        onclick: move |_| router.navigate_to(AppView::Search),
                        "Find episodes to add"
                    }
                }
            } else {
                div { class: "bg-zinc-800/30 rounded-2xl border border-zinc-700/30 divide-y divide-zinc-800/60 overflow-hidden",
                    for (index, episode) in entries.into_iter().enumerate() {
                        div {
                            key: "{index}-{episode.id}",
                            class: "flex items-center gap-4 p-4 group",
                            div { class: "flex-1 min-w-0",
                                p { class: "font-medium text-white truncate", "{episode.title}" }
                                p { class: "text-xs text-zinc-500", "{published_display(episode.published_at)}" }
                            }
                            button {
                                class: "p-2 rounded-lg text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                                aria_label: "Play",
                                onclick: {
                                    let episode = episode.clone();
                                    move |_| play_episode(session, &episode)
                                },
                                Icon {
                                    name: "play".to_string(),
                                    class: "w-4 h-4".to_string(),
                                }
                            }
                            button {
                                class: "p-2 rounded-lg text-zinc-400 hover:text-red-400 hover:bg-zinc-800/60 transition-colors",
                                aria_label: "Remove from queue",
                                onclick: {
                                    let episode = episode.clone();
                                    move |_| {
                                        if let Err(err) = queue.write().dequeue(&episode) {
                                            warn!(error = %err, "queue not saved");
                                        }
                                    }
                                },
                                Icon {
                                    name: "x".to_string(),
                                    class: "w-4 h-4".to_string(),
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
