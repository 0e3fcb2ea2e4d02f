//! Health check command: checks the API without credentials.

use mycloud::Client;

use super::CommandResult;
use crate::output::{OutputFormat, print_json};

pub async fn run(client: &Client, format: OutputFormat) -> CommandResult {
    match client.health().await {
        Ok(body) => {
            match format {
                OutputFormat::Human => println!("healthy: {body}"),
                OutputFormat::Json => print_json(&body)?,
            }
            Ok(())
        }
        Err(e) if e.is_network_error() => {
            Err(format!("unhealthy: could not reach {}: {e}", client.config().base_url()).into())
        }
        Err(e) => Err(format!("unhealthy: {e}").into()),
    }
}
