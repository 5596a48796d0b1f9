use console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::{Result, ValidationError};

const GO_BACK: &str = "← Go back";
const CANCEL: &str = "✕ Cancel";

/// Outcome of a prompt that offers navigation. Back and cancel are control
/// flow, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nav<T> {
    Proceed(T),
    Back,
    Cancel,
}

/// A navigation condition with the value stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    Back,
    Cancel,
}

impl<T> Nav<T> {
    pub fn into_result(self) -> std::result::Result<T, Halt> {
        match self {
            Nav::Proceed(v) => Ok(v),
            Nav::Back => Err(Halt::Back),
            Nav::Cancel => Err(Halt::Cancel),
        }
    }
}

impl<T> From<Halt> for Nav<T> {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Back => Nav::Back,
            Halt::Cancel => Nav::Cancel,
        }
    }
}

/// Unwrap `Nav::Proceed`, or return the back/cancel condition from the
/// enclosing function as `Ok(halt.into())`.
macro_rules! proceed {
    ($nav:expr) => {
        match $nav.into_result() {
            Ok(value) => value,
            Err(halt) => return Ok(halt.into()),
        }
    };
}
pub(crate) use proceed;

pub type Validator<'a> = &'a dyn Fn(&str) -> std::result::Result<(), ValidationError>;

/// Accepts anything.
pub fn any_text(_: &str) -> std::result::Result<(), ValidationError> {
    Ok(())
}

/// Every interactive question the tool asks goes through here.
pub trait Prompter {
    /// Plain single choice.
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize>;

    /// Single choice with "go back" and "cancel" appended.
    fn select_nav(&mut self, prompt: &str, items: &[String]) -> Result<Nav<usize>>;

    /// Free text. Invalid input is rejected and asked again.
    fn input(&mut self, prompt: &str, default: Option<&str>, validate: Validator) -> Result<String>;

    /// Free text pre-filled with `initial`; may be left empty.
    fn edit_text(&mut self, prompt: &str, initial: &str, validate: Validator) -> Result<String>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Yes / no with a cancel option.
    fn confirm_nav(&mut self, prompt: &str, default: bool) -> Result<Nav<bool>>;

    fn wait_for_key(&mut self) -> Result<()>;
}

/// Terminal prompts via dialoguer.
#[derive(Default)]
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for DialoguerPrompter {
    fn select(&mut self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        let idx = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default.min(items.len().saturating_sub(1)))
            .max_length(items.len().max(10))
            .interact()?;
        Ok(idx)
    }

    fn select_nav(&mut self, prompt: &str, items: &[String]) -> Result<Nav<usize>> {
        let mut all: Vec<String> = items.to_vec();
        all.push(GO_BACK.to_string());
        all.push(CANCEL.to_string());

        let idx = self.select(prompt, &all, 0)?;
        Ok(match idx.checked_sub(items.len()) {
            None => Nav::Proceed(idx),
            Some(0) => Nav::Back,
            Some(_) => Nav::Cancel,
        })
    }

    fn input(&mut self, prompt: &str, default: Option<&str>, validate: Validator) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }
        let value = input
            .validate_with(|s: &String| validate(s.trim()))
            .interact_text()?;
        Ok(value.trim().to_string())
    }

    fn edit_text(&mut self, prompt: &str, initial: &str, validate: Validator) -> Result<String> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .with_initial_text(initial)
            .allow_empty(true)
            .validate_with(|s: &String| validate(s.trim()))
            .interact_text()?;
        Ok(value.trim().to_string())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(answer)
    }

    fn confirm_nav(&mut self, prompt: &str, default: bool) -> Result<Nav<bool>> {
        let (first, second) = if default { ("Yes", "No") } else { ("No", "Yes") };
        let items = vec![first.to_string(), second.to_string(), CANCEL.to_string()];
        Ok(match self.select(prompt, &items, 0)? {
            0 => Nav::Proceed(default),
            1 => Nav::Proceed(!default),
            _ => Nav::Cancel,
        })
    }

    fn wait_for_key(&mut self) -> Result<()> {
        println!();
        println!("Press any key to continue...");
        Term::stdout().read_key()?;
        Ok(())
    }
}
