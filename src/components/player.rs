use crate::components::{Icon, Session};
use crate::session::SessionSettings;
use dioxus::prelude::*;
use std::rc::Rc;

#[component]
pub fn Player() -> Element {
    let mut session = use_context::<Signal<Session>>();
    let settings = use_context::<Signal<SessionSettings>>();
    let mut track = use_signal(|| None::<Rc<MountedData>>);

    let (now_playing, elapsed, duration, percent, loading, affordance) = {
        let view = session.read();
        (
            view.now_playing().cloned(),
            view.elapsed_text(),
            view.duration_text(),
            view.progress_percent(),
            view.is_loading(),
            view.affordance(),
        )
    };
    let (skip_back, skip_forward) = {
        let settings = settings.read();
        (settings.skip_back_secs, settings.skip_forward_secs)
    };

    let Some(now_playing) = now_playing else {
        return rsx! {
            div { class: "flex flex-col items-center justify-center gap-3 py-16 text-zinc-500",
                Icon {
                    name: "headphones".to_string(),
                    class: "w-10 h-10".to_string(),
                }
                p { "Nothing playing yet. Pick an episode from search or the queue." }
            }
        };
    };

    let on_track_click = move |evt: MouseEvent| {
        let offset_x = evt.element_coordinates().x;
        let Some(track) = track() else {
            return;
        };
        spawn(async move {
            if let Ok(rect) = track.get_client_rect().await {
                session.write().seek_from_click(offset_x, rect.width());
            }
        });
    };

    let fill_class = if loading {
        "h-full bg-emerald-500/60 animate-pulse"
    } else {
        "h-full bg-emerald-500"
    };

    rsx! {
        div { class: "flex flex-col items-center gap-6 p-6 rounded-2xl bg-zinc-900/60 border border-zinc-800/60",
            img {
                class: "w-48 h-48 sm:w-64 sm:h-64 object-cover rounded-xl shadow-lg",
                src: "{now_playing.image_url}",
                alt: "{now_playing.title}",
            }
            div { class: "text-center space-y-1",
                h2 { class: "text-lg font-semibold text-white", "{now_playing.title}" }
                p { class: "text-sm text-zinc-500", "{now_playing.published_at_display}" }
            }

            div { class: "w-full space-y-2",
                div {
                    class: "w-full h-2 rounded-full bg-zinc-800 overflow-hidden cursor-pointer",
                    onmounted: move |evt| track.set(Some(evt.data())),
                    onclick: on_track_click,
                    div { class: "{fill_class}", style: "width: {percent}%" }
                }
                div { class: "flex justify-between text-xs text-zinc-400",
                    span { "{elapsed}" }
                    span { "{duration}" }
                }
            }

            div { class: "flex items-center gap-6",
                button {
                    class: "p-3 rounded-full text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                    aria_label: "Back {skip_back} seconds",
                    onclick: move |_| {
                        session.write().skip(-skip_back);
                    },
                    Icon {
                        name: "skip-back".to_string(),
                        class: "w-6 h-6".to_string(),
                    }
                }
                button {
                    class: "p-4 rounded-full bg-emerald-500 hover:bg-emerald-400 text-white transition-colors",
                    aria_label: affordance.label(),
                    onclick: move |_| {
                        session.write().toggle();
                    },
                    Icon {
                        name: affordance.icon().to_string(),
                        class: "w-6 h-6".to_string(),
                    }
                }
                button {
                    class: "p-3 rounded-full text-zinc-300 hover:text-white hover:bg-zinc-800/60 transition-colors",
                    aria_label: "Forward {skip_forward} seconds",
                    onclick: move |_| {
                        session.write().skip(skip_forward);
                    },
                    Icon {
                        name: "skip-forward".to_string(),
                        class: "w-6 h-6".to_string(),
                    }
                }
            }
        }
    }
}
