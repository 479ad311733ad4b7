use std::io::Write;

use clap::Subcommand;
use serde_json::json;

use crate::cli::output::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::client::backend::LoginData;
use crate::shell::Shell;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Login to the backend")]
    Login {
        #[arg(help = "Username")]
        username: String,
        #[arg(long, help = "Password (will prompt if not provided)")]
        password: Option<String>,
    },

    #[command(about = "Logout from the backend")]
    Logout,

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Fetch and show current user information")]
    Whoami,
}

pub async fn handle(shell: &Shell, cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password()?,
            };

            let data = LoginData {
                username: username.clone(),
                password,
                ..LoginData::default()
            };

            match shell.login(&data).await {
                Ok(nav) => {
                    let landed = nav
                        .route()
                        .map(|r| r.full_path.clone())
                        .unwrap_or_else(|| "(blocked)".to_string());
                    output_success(
                        output_format,
                        &format!("Logged in as '{}'", username),
                        Some(json!({ "landed_on": landed })),
                    )
                }
                Err(e) => output_error(output_format, &e.to_string(), Some("LOGIN_FAILED")),
            }
        }
        AuthCommands::Logout => {
            shell.logout().await;
            output_success(output_format, "Logged out", None)
        }
        AuthCommands::Status => {
            let logged_in = shell.auth().is_login();
            let username = shell
                .auth()
                .user_info()
                .and_then(|u| u.username)
                .unwrap_or_else(|| "-".to_string());

            output_success(
                output_format,
                if logged_in {
                    "Session active"
                } else {
                    "Not logged in"
                },
                Some(json!({ "logged_in": logged_in, "username": username })),
            )
        }
        AuthCommands::Whoami => {
            if !shell.auth().is_login() {
                return output_error(output_format, "Not logged in", Some("NO_SESSION"));
            }

            match shell.auth().update_info().await {
                Ok(user) => output_success(
                    output_format,
                    &format!("Current user: {}", user.username.as_deref().unwrap_or("-")),
                    Some(json!({ "user": user })),
                ),
                Err(e) => output_error(output_format, &e.to_string(), Some("IDENTITY_FAILED")),
            }
        }
    }
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}
