use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sessionward", version, about = "Manage an Auth API session from the terminal")]
pub struct Cli {
    /// Auth API base URL (overrides config and SESSIONWARD_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Token storage: memory, file or keyring
    #[arg(long, global = true)]
    pub storage: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show session status and token expiry
    Status,
    /// Sign in (password from SESSIONWARD_PASSWORD or prompted)
    Login {
        #[arg(long)]
        email: String,
    },
    /// Create an account; it must be verified before first login
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Sign out and clear stored tokens
    Logout,
    /// Print the signed-in user
    Whoami,
    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// Set a new password with a reset token
    ResetPassword {
        #[arg(long)]
        token: String,
    },
    /// Confirm an email address with a verification token
    VerifyEmail {
        #[arg(long)]
        token: String,
    },
    /// Send the verification email again
    ResendVerification {
        #[arg(long)]
        email: String,
    },
    /// Show what a protected page would render right now
    Gate,
}
