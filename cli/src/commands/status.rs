// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `clearance status`: is a server answering at --host/--port?

use anyhow::Result;
use colored::Colorize;

use crate::server::ClearanceClient;

pub async fn execute(client: &ClearanceClient) -> Result<()> {
    match client.health().await {
        Ok(body) => {
            let status = body["status"].as_str().unwrap_or("unknown");
            println!(
                "{} {} ({})",
                "●".green(),
                format!("Server running at {}", client.base_url()).bold(),
                status
            );
            Ok(())
        }
        Err(e) => {
            println!(
                "{} {}",
                "●".red(),
                format!("No server at {}", client.base_url()).bold()
            );
            println!("  {}", e.to_string().dimmed());
            std::process::exit(1);
        }
    }
}
