use taskvault::error::{Error, Result};
use taskvault::{render, shell, AppState, Dashboard, PasswordPrompt, TerminalPrompt};
use tokio::io::BufReader;
use uuid::Uuid;

use crate::cli::Commands;

pub(crate) async fn run(command: Commands, state: &AppState) -> Result<()> {
    match command {
        Commands::SignUp { email, password } => {
            state.session.resolve().await;
            let password = password_or_prompt(&email, password).await?;
            let sign_up = state.session.sign_up(&email, &password).await?;
            if sign_up.session.is_some() {
                println!("Signed up and signed in as {}", email);
            } else {
                println!("Check your email for confirmation (if enabled).");
            }
        }
        Commands::SignIn { email, password } => {
            state.session.resolve().await;
            let password = password_or_prompt(&email, password).await?;
            let identity = state.session.sign_in(&email, &password).await?;
            println!(
                "Signed in as {}",
                identity.email.as_deref().unwrap_or(&email)
            );
        }
        Commands::SignOut => {
            state.session.resolve().await;
            state.session.sign_out().await;
            println!("Signed out.");
        }
        Commands::Whoami => match state.session.resolve().await {
            Some(identity) => println!(
                "{} ({})",
                identity.email.as_deref().unwrap_or("-"),
                identity.id
            ),
            None => println!("Not signed in."),
        },
        Commands::Profile => {
            let mut dashboard = dashboard(state).await?;
            dashboard.load_profile().await?;
            println!(
                "{}",
                render::welcome(dashboard.identity(), dashboard.profile())
            );
            if let Some(full_name) = dashboard
                .profile()
                .and_then(|p| p.full_name.as_deref())
                .filter(|n| !n.is_empty())
            {
                println!("Full name: {}", full_name);
            }
        }
        Commands::List => {
            let mut dashboard = dashboard(state).await?;
            dashboard.load_tasks().await?;
            println!("{}", render::task_table(dashboard.tasks()));
        }
        Commands::Add { title } => {
            let mut dashboard = dashboard(state).await?;
            dashboard.set_title(title.join(" "));
            if !dashboard.add_task().await? {
                println!("Nothing to add.");
                return Ok(());
            }
            println!("{}", render::task_table(dashboard.tasks()));
        }
        Commands::Toggle { id } => {
            let mut dashboard = dashboard(state).await?;
            dashboard.load_tasks().await?;
            let task = find_task(&dashboard, id)?;
            dashboard.toggle_done(&task).await?;
            println!("{}", render::task_table(dashboard.tasks()));
        }
        Commands::Rm { id } => {
            let mut dashboard = dashboard(state).await?;
            dashboard.remove_task(id).await?;
            println!("{}", render::task_table(dashboard.tasks()));
        }
        Commands::Shell => {
            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            shell::run(state, stdin, &mut stdout, &TerminalPrompt).await?;
        }
    }
    Ok(())
}

async fn dashboard(state: &AppState) -> Result<Dashboard> {
    state.session.resolve().await;
    Dashboard::for_current_identity(state.session.clone(), state.tables.clone()).await
}

fn find_task(dashboard: &Dashboard, id: Uuid) -> Result<taskvault_common::Task> {
    dashboard
        .tasks()
        .iter()
        .find(|t| t.id == id)
        .cloned()
        .ok_or_else(|| Error::backend(format!("Task {} not found", id)))
}

async fn password_or_prompt(email: &str, password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => TerminalPrompt.password(email).await,
    }
}
