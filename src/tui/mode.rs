use crate::shared::ParamPage;

// state local to the tui; the knob keys resolve against the current page
#[derive(Clone, Debug)]
pub struct TuiState {
    pub param_page: ParamPage,
    pub show_help: bool,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            param_page: ParamPage::Transport,
            show_help: false,
        }
    }
}
