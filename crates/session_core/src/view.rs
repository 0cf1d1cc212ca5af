use shared::domain::Theme;

/// Panel toggles that live beside the conversation and never affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub map_visible: bool,
    pub theme: Theme,
}

impl ViewState {
    pub fn toggle_map(&mut self) -> bool {
        self.map_visible = !self.map_visible;
        self.map_visible
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}
