use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "keystone", version, about = "Inspect console session tokens and evaluate access")]
pub struct Cli {
    /// Token store file (defaults to KEYSTONE_TOKEN_FILE or the user data dir)
    #[arg(long, global = true, env = "KEYSTONE_TOKEN_FILE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the version
    Version,

    /// Decode a token and print its subject, expiry and claims as JSON
    Decode {
        token: String,
    },

    /// Evaluate an access query; exits 0 when allowed, 3 when denied
    Check(CheckArgs),

    /// Store an access/refresh token pair
    Login {
        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: Option<String>,
    },

    /// Remove stored tokens
    Logout,

    /// Refresh the stored access token if it is expired or about to expire
    Refresh,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Evaluate against this token instead of the stored one
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub permission: Option<String>,

    #[arg(long)]
    pub role: Option<String>,

    #[arg(long = "permissions", num_args = 1.., value_name = "PERMISSION")]
    pub permissions: Vec<String>,

    #[arg(long = "roles", num_args = 1.., value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Any list entry suffices instead of all of them
    #[arg(long)]
    pub any: bool,

    /// Evaluate a menu entry guarded by this permission instead
    #[arg(long, conflicts_with_all = ["permission", "role", "permissions", "roles", "any"])]
    pub menu_perms: Option<String>,
}
