pub mod commands;
pub mod credentials;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod identity;
pub mod paths;
pub mod profiles;
pub mod select;
pub mod settings;
pub mod state;
pub mod switch;
pub mod ui;

pub use error::{Step, SwitchError, SwitchResult};
pub use profiles::{Profile, list_profiles};
pub use switch::{CommitMode, SwitchOptions, SwitchReport, switch_to, switch_with};

#[cfg(test)]
pub mod test_utils;
