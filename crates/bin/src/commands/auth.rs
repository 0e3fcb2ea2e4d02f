//! Session commands: login, register, logout, whoami and status.

use mycloud::{
    Client, Credentials, Registration, UserProfile, clock::format_millis, session::Registered,
};
use serde_json::json;

use super::{CommandResult, require_session};
use crate::{
    cli::{LoginArgs, RegisterArgs},
    output::{OutputFormat, format_epoch_ms, print_json},
};

fn describe(user: &UserProfile) -> String {
    format!(
        "{} <{}> [{}]",
        user.full_name(),
        user.email,
        user.role_display()
    )
}

pub async fn login(client: &Client, args: &LoginArgs, format: OutputFormat) -> CommandResult {
    let credentials = Credentials::new(args.username.as_str(), args.password.as_str());
    let session = client.session().login(&credentials).await?;

    match format {
        OutputFormat::Human => match &session.user {
            Some(user) => println!("Logged in as {}", describe(user)),
            None => println!("Logged in as {}", args.username),
        },
        OutputFormat::Json => print_json(&json!({
            "status": session.status,
            "user": session.user,
            "expires_at_ms": session.expiry_epoch_ms,
        }))?,
    }
    Ok(())
}

pub async fn register(client: &Client, args: &RegisterArgs, format: OutputFormat) -> CommandResult {
    let registration = Registration {
        username: args.username.clone(),
        full_name: args.full_name.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
        password_confirm: args.password.clone(),
    };

    match client.session().register(&registration).await? {
        Registered::LoggedIn(session) => match format {
            OutputFormat::Human => {
                println!("Account created for {}; you are logged in", args.username)
            }
            OutputFormat::Json => print_json(&json!({
                "created": true,
                "logged_in": true,
                "user": session.user,
            }))?,
        },
        Registered::AccountCreated => match format {
            OutputFormat::Human => println!(
                "Account created for {0}; log in with `mycloud login {0}`",
                args.username
            ),
            OutputFormat::Json => print_json(&json!({ "created": true, "logged_in": false }))?,
        },
    }
    Ok(())
}

pub async fn logout(client: &Client, format: OutputFormat) -> CommandResult {
    client.logout().await;
    match format {
        OutputFormat::Human => println!("Logged out"),
        OutputFormat::Json => print_json(&json!({ "status": client.session().status() }))?,
    }
    Ok(())
}

pub async fn whoami(client: &Client, format: OutputFormat) -> CommandResult {
    require_session(client).await?;
    let user = client.session().fetch_profile().await?;

    match format {
        OutputFormat::Human => {
            println!("{} ({})", user.username, user.initials());
            println!("Name:     {}", user.full_name());
            println!("Email:    {}", user.email);
            println!("Role:     {}", user.role_display());
            println!("User ID:  {}", user.id);
        }
        OutputFormat::Json => print_json(&user)?,
    }
    Ok(())
}

pub async fn status(client: &Client, format: OutputFormat) -> CommandResult {
    let session = client.session().check_auth_status().await;
    let expires = session.expiry_epoch_ms.map(format_epoch_ms);

    match format {
        OutputFormat::Human => {
            println!("Status:   {}", session.status);
            if let Some(user) = &session.user {
                println!("User:     {}", describe(user));
            }
            if session.is_authenticated() {
                println!(
                    "Expires:  {}",
                    expires.as_deref().unwrap_or("unknown")
                );
            }
            if let Some(error) = &session.error {
                println!("Error:    {error}");
            }
        }
        OutputFormat::Json => print_json(&json!({
            "status": session.status,
            "user": session.user,
            "expires_at_ms": session.expiry_epoch_ms,
            "expires_at": session.expiry_epoch_ms.map(format_millis),
            "error": session.error,
        }))?,
    }
    Ok(())
}
