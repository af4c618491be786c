pub mod catalog;
pub mod config_store;
pub mod credentials;
pub mod error;
pub mod generator;
pub mod idea_store;
pub mod main_ui_html;
pub mod path_utils;
pub mod phase_timer;
pub mod prompt;
pub mod provider;
pub mod selector;
pub mod server;
pub mod supabase_store;
pub mod timer_driver;

pub const RECENT_IDEAS_LIMIT: usize = 8;
pub const CYCLE_SECONDS: u32 = 60;
