use dioxus::prelude::*;

mod api;
mod components;
mod db;
mod session;

use components::AppShell;

const APP_CSS: Asset = asset!("/assets/styling/app.css");

fn main() {
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        // Theme color for mobile browsers
        document::Meta { name: "theme-color", content: "#10b981" }
        document::Meta { name: "mobile-web-app-capable", content: "yes" }
        document::Meta { name: "apple-mobile-web-app-title", content: "PodSearch" }

        // Generated from tailwind.css by the dx CLI
        document::Stylesheet { href: "/assets/tailwind.css" }
        document::Stylesheet { href: APP_CSS }

        AppShell {}
    }
}
