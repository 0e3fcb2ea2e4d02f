//! CLI argument definitions for the MyCloud binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// MyCloud file storage client
#[derive(Parser, Debug)]
#[command(name = "mycloud")]
#[command(about = "MyCloud: command-line client for the MyCloud file storage service")]
#[command(version)]
pub struct Cli {
    /// Base URL of the MyCloud API
    #[arg(
        long,
        global = true,
        default_value = "http://localhost:8000/api",
        env = "MYCLOUD_API_URL"
    )]
    pub api_url: String,

    /// File the session is persisted in between invocations
    #[arg(
        long,
        global = true,
        default_value = "mycloud-session.json",
        env = "MYCLOUD_STATE_FILE"
    )]
    pub state_file: PathBuf,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30, env = "MYCLOUD_TIMEOUT")]
    pub timeout: u64,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login(LoginArgs),
    /// Create an account
    Register(RegisterArgs),
    /// End the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show the stored session and its expiry
    Status,
    /// Manage your files
    #[command(subcommand)]
    Files(FilesCommand),
    /// Administer users (staff only)
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Check that the API is reachable
    Health,
}

/// Arguments for the login command
#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    pub username: String,

    #[arg(long, env = "MYCLOUD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for the register command
#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    pub username: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub full_name: String,

    #[arg(long, env = "MYCLOUD_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand, Debug)]
pub enum FilesCommand {
    /// List your files
    List,
    /// Upload a file
    Upload {
        path: PathBuf,
        /// Comment stored with the file
        #[arg(long, default_value = "")]
        comment: String,
        /// Name to store the file under; defaults to the local file name
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a file
    Download {
        id: u64,
        /// Where to write the file; defaults to its stored name
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rename a file
    Rename { id: u64, name: String },
    /// Replace a file's comment
    Comment { id: u64, comment: String },
    /// Delete a file
    Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// List all users
    Users,
    /// List a user's files
    Files { user_id: u64 },
    /// Grant admin rights
    Grant { user_id: u64 },
    /// Revoke admin rights
    Revoke { user_id: u64 },
    /// Reactivate an account
    Activate { user_id: u64 },
    /// Deactivate an account
    Deactivate { user_id: u64 },
    /// Delete a user and their files
    Delete { user_id: u64 },
}
