pub mod channel_list;
pub mod player_pane;
