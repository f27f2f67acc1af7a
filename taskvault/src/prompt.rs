//! Masked password entry.

use async_trait::async_trait;
use dialoguer::Password;

use crate::error::{Error, Result};

/// Where sign-in and sign-up get the password from.
#[async_trait]
pub trait PasswordPrompt: Send + Sync {
    async fn password(&self, email: &str) -> Result<String>;
}

/// Reads the password from the terminal with echo turned off.
pub struct TerminalPrompt;

#[async_trait]
impl PasswordPrompt for TerminalPrompt {
    async fn password(&self, email: &str) -> Result<String> {
        let prompt = format!("Password for {}", email);
        tokio::task::spawn_blocking(move || Password::new().with_prompt(prompt).interact())
            .await
            .map_err(|e| Error::Terminal(e.to_string()))?
            .map_err(|e| Error::Terminal(e.to_string()))
    }
}
