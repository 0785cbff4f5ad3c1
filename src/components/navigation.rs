use dioxus::prelude::*;

use crate::components::app_view::{view_after_restore, AppView};
use crate::session::RestoreOutcome;

/// Switches between the search and listen views.
#[derive(Clone, Copy, PartialEq)]
pub struct ViewRouter {
    current_view: Signal<AppView>,
}

impl ViewRouter {
    pub fn new(current_view: Signal<AppView>) -> Self {
        Self { current_view }
    }

    pub fn current(&self) -> AppView {
        (self.current_view)()
    }

    pub fn navigate_to(&self, target: AppView) {
        let mut current_view = self.current_view;
        if *current_view.peek() == target {
            return;
        }
        current_view.set(target);
    }

    pub fn apply_restore(&self, outcome: &RestoreOutcome) {
        let current = *self.current_view.peek();
        self.navigate_to(view_after_restore(current, outcome.show_player));
    }
}
