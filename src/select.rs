//! Interactive profile selection.

use anyhow::{Context, Result};
use inquire::{InquireError, Select};
use tracing::debug;

use crate::error::SwitchError;

/// Picks one entry from an ordered list, or reports that nothing was chosen
pub trait Selector {
    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>>;
}

/// Fuzzy-filtering terminal picker
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzySelector {
    pub page_size: Option<usize>,
}

impl Selector for FuzzySelector {
    fn select(&self, prompt: &str, items: &[String]) -> Result<Option<usize>> {
        if items.is_empty() {
            return Ok(None);
        }

        let mut select = Select::new(prompt, items.to_vec())
            .with_help_message("Type to filter, Enter to switch, Esc to cancel");
        if let Some(size) = self.page_size {
            select = select.with_page_size(size);
        }

        match select.raw_prompt() {
            Ok(choice) => Ok(Some(choice.index)),
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
            Err(e) => Err(e).context("Profile selection failed"),
        }
    }
}

/// Ask `selector` for one of `profiles`, failing with `SelectionCancelled` on no choice
pub fn select_profile<S: Selector + ?Sized>(selector: &S, profiles: &[String]) -> Result<String> {
    let choice = selector.select("Switch AWS configuration to:", profiles)?;
    match choice.and_then(|i| profiles.get(i)) {
        Some(name) => {
            debug!(profile = %name, "profile selected");
            Ok(name.clone())
        }
        None => Err(SwitchError::SelectionCancelled.into()),
    }
}
