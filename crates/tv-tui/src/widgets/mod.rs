pub mod filter_input;
pub mod pane_chrome;
pub mod toast;
