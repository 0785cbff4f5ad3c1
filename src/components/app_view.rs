//! Defines the shared application view state.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AppView {
    #[default]
    Search,
    Listen,
}

pub fn view_label(view: &AppView) -> &'static str {
    match view {
        AppView::Search => "Search",
        AppView::Listen => "Listen",
    }
}

/// View to show once a persisted session has been restored. Small
/// viewports jump straight to the player; otherwise the current view stays.
pub fn view_after_restore(current: AppView, show_player: bool) -> AppView {
    if show_player {
        AppView::Listen
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_on_small_viewport_opens_player() {
        assert_eq!(view_after_restore(AppView::Search, true), AppView::Listen);
        assert_eq!(view_after_restore(AppView::Search, false), AppView::Search);
        assert_eq!(view_after_restore(AppView::Listen, false), AppView::Listen);
    }

    #[test]
    fn labels() {
        assert_eq!(view_label(&AppView::default()), "Search");
        assert_eq!(view_label(&AppView::Listen), "Listen");
    }
}
