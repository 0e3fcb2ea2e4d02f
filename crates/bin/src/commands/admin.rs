//! Admin commands. The signed-in user must be staff.

use mycloud::{Client, UserRecord};
use serde_json::json;

use super::{CommandResult, files::print_files, require_session};
use crate::{
    cli::AdminCommand,
    output::{OutputFormat, format_size, print_json, print_table},
};

pub async fn run(client: &Client, command: AdminCommand, format: OutputFormat) -> CommandResult {
    let me = require_session(client).await?;
    if !me.is_admin() {
        return Err(format!("{} is not an administrator", me.username).into());
    }

    let users = client.users();
    match command {
        AdminCommand::Users => {
            let list = users.list().await?;
            print_users(&list, format)
        }
        AdminCommand::Files { user_id } => {
            let files = users.files_of(user_id).await?;
            print_files(client, &files, format)
        }
        AdminCommand::Grant { user_id } => {
            users.set_admin(user_id, true).await?;
            done(format, &format!("User {user_id} is now an administrator"), user_id)
        }
        AdminCommand::Revoke { user_id } => {
            users.set_admin(user_id, false).await?;
            done(format, &format!("User {user_id} is no longer an administrator"), user_id)
        }
        AdminCommand::Activate { user_id } => {
            users.set_active(user_id, true).await?;
            done(format, &format!("User {user_id} activated"), user_id)
        }
        AdminCommand::Deactivate { user_id } => {
            if user_id == me.id {
                return Err("refusing to deactivate your own account".into());
            }
            users.set_active(user_id, false).await?;
            done(format, &format!("User {user_id} deactivated"), user_id)
        }
        AdminCommand::Delete { user_id } => {
            if user_id == me.id {
                return Err("refusing to delete your own account".into());
            }
            users.delete(user_id).await?;
            done(format, &format!("User {user_id} deleted"), user_id)
        }
    }
}

fn done(format: OutputFormat, message: &str, user_id: u64) -> CommandResult {
    match format {
        OutputFormat::Human => println!("{message}"),
        OutputFormat::Json => print_json(&json!({ "ok": true, "user_id": user_id }))?,
    }
    Ok(())
}

fn print_users(users: &[UserRecord], format: OutputFormat) -> CommandResult {
    match format {
        OutputFormat::Human => {
            let yes_no = |flag: bool| (if flag { "yes" } else { "no" }).to_string();
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| {
                    vec![
                        u.id.to_string(),
                        u.username.clone(),
                        u.email.clone(),
                        yes_no(u.is_staff),
                        u.is_active.map_or_else(|| "-".to_string(), yes_no),
                        u.file_count.map_or_else(|| "-".to_string(), |c| c.to_string()),
                        u.total_size.map_or_else(|| "-".to_string(), format_size),
                    ]
                })
                .collect();
            print_table(
                &["ID", "USERNAME", "EMAIL", "ADMIN", "ACTIVE", "FILES", "SIZE"],
                &rows,
                "No users.",
            );
        }
        OutputFormat::Json => print_json(users)?,
    }
    Ok(())
}
