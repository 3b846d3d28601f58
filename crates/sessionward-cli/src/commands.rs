//! Command handlers. Each runs after the session has been initialized.

use std::io::{self, Write};

use anyhow::{Context, Result};
use sessionward_core::{
    ApiClient, LoginRequest, ProtectedGate, RegisterRequest, SessionManager, TokenStore,
};

use crate::cli::Command;

/// Env var consulted before prompting for a password
const PASSWORD_ENV: &str = "SESSIONWARD_PASSWORD";

pub async fn run(
    manager: &SessionManager<ApiClient>,
    gate: &ProtectedGate,
    command: Command,
) -> Result<()> {
    match command {
        Command::Status => status(manager),
        Command::Whoami => {
            match manager.session().current_user() {
                Some(user) => println!("{} <{}> (id {})", user.display_name(), user.email, user.id),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Login { email } => {
            let password = read_password("Password: ")?;
            let user = manager.login(&LoginRequest::new(email, password)).await?;
            println!("Signed in as {}", user.display_name());
            Ok(())
        }
        Command::Register { email, name } => {
            let password = read_password("Choose a password: ")?;
            let user = manager
                .register(&RegisterRequest::new(email, password, name))
                .await?;
            println!(
                "Account created for {}. Check your inbox to verify it, then log in.",
                user.email
            );
            Ok(())
        }
        Command::Logout => {
            manager.logout().await;
            println!("Signed out");
            Ok(())
        }
        Command::ForgotPassword { email } => {
            manager.forgot_password(&email).await?;
            println!("If {} has an account, a reset link is on its way", email);
            Ok(())
        }
        Command::ResetPassword { token } => {
            let password = read_password("New password: ")?;
            manager.reset_password(&token, &password).await?;
            println!("Password updated. Log in with the new password.");
            Ok(())
        }
        Command::VerifyEmail { token } => {
            manager.verify_email(&token).await?;
            println!("Email verified");
            Ok(())
        }
        Command::ResendVerification { email } => {
            manager.resend_verification_email(&email).await?;
            println!("Verification email sent to {}", email);
            Ok(())
        }
        Command::Gate => {
            let state = manager.session().snapshot();
            let view = gate.render(
                &state,
                || "pending".to_string(),
                || "protected content".to_string(),
                |to| format!("redirect to {}", to),
            );
            println!("{}", view);
            Ok(())
        }
    }
}

fn status(manager: &SessionManager<ApiClient>) -> Result<()> {
    let state = manager.session().snapshot();
    println!("status: {}", state.status());

    if let Some(user) = state.current_user() {
        println!("user:   {} <{}>", user.display_name(), user.email);
    }
    if let Some(err) = state.error() {
        println!("error:  {}", err.message);
    }

    match manager.session().tokens().access_token() {
        Some(token) => match TokenStore::expires_at(&token) {
            Some(expiry) if TokenStore::is_expired(&token) => {
                println!("token:  expired at {}", expiry.format("%Y-%m-%d %H:%M:%S UTC"))
            }
            Some(expiry) => println!("token:  expires {}", expiry.format("%Y-%m-%d %H:%M:%S UTC")),
            None => println!("token:  stored (expiry unreadable)"),
        },
        None => println!("token:  none"),
    }
    io::stdout().flush()?;
    Ok(())
}

fn read_password(prompt: &str) -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password(prompt).context("Failed to read password")
}
