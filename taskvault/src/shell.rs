//! Interactive terminal session.
//!
//! Shows the auth screen while no identity is known and the dashboard once
//! one is, switching on identity-change notifications.

use std::io::Write;

use futures_util::StreamExt;
use taskvault_common::IdentityChange;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::dashboard::Dashboard;
use crate::error::{Error, Result};
use crate::prompt::PasswordPrompt;
use crate::render;
use crate::state::AppState;

const AUTH_HELP: &str = "commands: signin <email> | signup <email> | quit";
const DASHBOARD_HELP: &str =
    "commands: add <title> | toggle <n> | rm <n> | list | signout | quit";

enum Flow {
    Continue,
    Quit,
}

struct Shell<'a, W: Write> {
    state: &'a AppState,
    prompt: &'a dyn PasswordPrompt,
    out: &'a mut W,
    dashboard: Option<Dashboard>,
}

/// Run the interactive session until `quit` or end of input.
///
/// Passwords are never read from `input`; `signin` and `signup` ask `prompt`.
pub async fn run<R, W>(
    state: &AppState,
    input: R,
    out: &mut W,
    prompt: &dyn PasswordPrompt,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let initial = state.session.resolve().await;
    // Dropped on return, which ends the subscription.
    let mut changes = state.session.changes();
    let mut lines = input.split(b'\n');

    let mut shell = Shell {
        state,
        prompt,
        out,
        dashboard: None,
    };
    match initial {
        Some(_) => shell.mount().await?,
        None => shell.show_auth()?,
    }

    loop {
        tokio::select! {
            biased;
            Some(change) = changes.next() => shell.on_identity_change(change).await?,
            segment = lines.next_segment() => {
                let segment = segment.map_err(|e| Error::Terminal(e.to_string()))?;
                let Some(bytes) = segment else { break };
                let line = String::from_utf8_lossy(&bytes);
                if let Flow::Quit = shell.handle(line.trim()).await? {
                    break;
                }
            }
        }
    }

    Ok(())
}

impl<W: Write> Shell<'_, W> {
    async fn handle(&mut self, line: &str) -> Result<Flow> {
        if line.is_empty() {
            return Ok(Flow::Continue);
        }
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        if command == "quit" || command == "exit" {
            return Ok(Flow::Quit);
        }

        let outcome = if self.dashboard.is_some() {
            self.dashboard_command(command, rest).await
        } else {
            self.auth_command(command, rest).await
        };

        if let Err(e) = outcome {
            self.notify_error(&e)?;
        }
        Ok(Flow::Continue)
    }

    async fn auth_command(&mut self, command: &str, rest: &str) -> Result<()> {
        match command {
            "signin" => {
                let email = email_arg(command, rest)?;
                let password = self.prompt.password(email).await?;
                self.state.session.sign_in(email, &password).await?;
            }
            "signup" => {
                let email = email_arg(command, rest)?;
                let password = self.prompt.password(email).await?;
                let sign_up = self.state.session.sign_up(email, &password).await?;
                if sign_up.session.is_none() {
                    self.print("Check your email for confirmation (if enabled).")?;
                }
            }
            "help" => self.print(AUTH_HELP)?,
            other => self.print(&format!("unknown command: {}\n{}", other, AUTH_HELP))?,
        }
        Ok(())
    }

    async fn dashboard_command(&mut self, command: &str, rest: &str) -> Result<()> {
        let Some(dashboard) = self.dashboard.as_mut() else {
            return Err(Error::NotSignedIn);
        };

        match command {
            "add" => {
                dashboard.set_title(rest);
                if dashboard.add_task().await? {
                    self.print_tasks()?;
                }
            }
            "toggle" => {
                let task = dashboard.tasks()[position(rest, dashboard.tasks().len())?].clone();
                dashboard.toggle_done(&task).await?;
                self.print_tasks()?;
            }
            "rm" | "delete" => {
                let task_id = dashboard.tasks()[position(rest, dashboard.tasks().len())?].id;
                dashboard.remove_task(task_id).await?;
                self.print_tasks()?;
            }
            "list" => {
                dashboard.load_tasks().await?;
                self.print_tasks()?;
            }
            "signout" => dashboard.sign_out().await,
            "help" => self.print(DASHBOARD_HELP)?,
            other => self.print(&format!("unknown command: {}\n{}", other, DASHBOARD_HELP))?,
        }
        Ok(())
    }

    async fn on_identity_change(&mut self, change: IdentityChange) -> Result<()> {
        tracing::debug!(event = %change.kind, "Shell saw identity change");
        let mounted = self.dashboard.as_ref().map(|d| d.identity().id);
        match (change.identity, mounted) {
            (Some(identity), Some(id)) if identity.id == id => Ok(()),
            (Some(_), _) => self.mount().await,
            (None, Some(_)) => {
                self.dashboard = None;
                self.print("Signed out.")?;
                self.show_auth()
            }
            (None, None) => Ok(()),
        }
    }

    async fn mount(&mut self) -> Result<()> {
        let mounted =
            Dashboard::for_current_identity(self.state.session.clone(), self.state.tables.clone())
                .await;
        let mut dashboard = match mounted {
            Ok(dashboard) => dashboard,
            Err(e) => return self.notify_error(&e),
        };
        let loaded = dashboard.mount().await;
        self.dashboard = Some(dashboard);

        if let Err(e) = loaded {
            self.notify_error(&e)?;
        }
        if let Some(dashboard) = &self.dashboard {
            let welcome = render::welcome(dashboard.identity(), dashboard.profile());
            self.print(&welcome)?;
        }
        self.print_tasks()?;
        self.print(DASHBOARD_HELP)
    }

    fn show_auth(&mut self) -> Result<()> {
        self.print("TaskVault - Login")?;
        self.print(AUTH_HELP)
    }

    fn print_tasks(&mut self) -> Result<()> {
        let listing = match &self.dashboard {
            Some(dashboard) => render::task_list(dashboard.tasks()),
            None => return Ok(()),
        };
        self.print(&listing)
    }

    fn notify_error(&mut self, error: &Error) -> Result<()> {
        tracing::debug!("Command failed: {}", error);
        self.print(&format!("error: {}", error))
    }

    fn print(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "{}", text).map_err(|e| Error::Terminal(e.to_string()))
    }
}

/// The single email argument of `signin`/`signup`. Anything after it is
/// refused so a password typed on the line is not sent anywhere.
fn email_arg<'a>(command: &str, rest: &'a str) -> Result<&'a str> {
    let mut parts = rest.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(email), None) => Ok(email),
        _ => Err(Error::Terminal(format!("usage: {} <email>", command))),
    }
}

/// Zero-based index of a 1-based row number.
fn position(arg: &str, len: usize) -> Result<usize> {
    match arg.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n - 1),
        _ => Err(Error::backend(format!("no task at row '{}'", arg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds() {
        assert_eq!(position("1", 3).unwrap(), 0);
        assert_eq!(position("3", 3).unwrap(), 2);
        assert!(position("0", 3).is_err());
        assert!(position("4", 3).is_err());
        assert!(position("x", 3).is_err());
    }

    #[test]
    fn test_email_arg_refuses_extra_words() {
        assert_eq!(email_arg("signin", "a@x.com").unwrap(), "a@x.com");
        assert!(email_arg("signin", "").is_err());

        let err = email_arg("signin", "a@x.com pw123456").unwrap_err();
        assert_eq!(err.to_string(), "Terminal error: usage: signin <email>");
    }
}
