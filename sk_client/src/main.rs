//! A console client for the Schafkopf server.
//!
//! The client logs in over HTTP when no token is given, opens a WebSocket
//! session for one room and keeps the local game view in sync with it.

use anyhow::{Context, Result};
use pico_args::Arguments;
use schafkopf::SortMode;
use sk_client::{
    ClientConfig, SyncClient, WsConnector, api_client::ApiClient, console::Console, logging,
};
use std::{
    io::{self, Write},
    sync::Arc,
};

const HELP: &str = "\
Play Schafkopf on a remote server

USAGE:
  sk_client [OPTIONS]

OPTIONS:
  --server URL          Server URL  [default: http://localhost:8000]
  --room ID             Room to join  [env: SK_ROOM]
  --token TOKEN         Access token  [env: SK_TOKEN]
  --username NAME       Username for login when no token is given
  --password PASS       Password for login
  --sort MODE           Hand order: suit, rank, trump or custom  [default: suit]

FLAGS:
  -h, --help            Print help information
";

struct Args {
    config: ClientConfig,
    username: Option<String>,
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let mut config = ClientConfig::from_env();
    if let Some(server_url) = pargs.opt_value_from_str("--server")? {
        config.server_url = server_url;
    }
    if let Some(room_id) = pargs.opt_value_from_str("--room")? {
        config.room_id = Some(room_id);
    }
    if let Some(token) = pargs.opt_value_from_str("--token")? {
        config.token = Some(token);
    }
    if let Some(sort_mode) = pargs.opt_value_from_str::<_, SortMode>("--sort")? {
        config.sort_mode = sort_mode;
    }

    let args = Args {
        config,
        username: pargs.opt_value_from_str("--username")?,
        password: pargs.opt_value_from_str("--password")?,
    };

    logging::init();
    args.config.validate()?;

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let Args {
        mut config,
        username,
        password,
    } = args;

    let api_client = match config.token.clone() {
        Some(token) => ApiClient::with_token(&config.server_url, token),
        None => {
            let username = match username {
                Some(u) => u,
                None => prompt("Username: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => prompt("Password: ")?,
            };

            let mut api_client = ApiClient::new(&config.server_url);
            println!("Logging in as {username}...");
            let token = api_client
                .login(&username, &password)
                .await
                .context("Failed to log in")?;
            config.token = Some(token);
            println!("Login successful!");
            api_client
        }
    };

    match api_client.current_user().await {
        Ok(user) => {
            tracing::info!(user = %user.username, id = user.id, "Authenticated");
            config.user_id.get_or_insert(user.username);
        }
        Err(e) => tracing::warn!("Could not look up current user: {e:#}"),
    }

    let room_id = match config.room_id.clone() {
        Some(room_id) => room_id,
        None => prompt("Room: ")?,
    };

    let sort_mode = config.sort_mode;
    let token = config.token.clone();
    let user_id = config.user_id.clone();

    let mut client = SyncClient::new(Arc::new(WsConnector), config);
    client
        .open(&room_id, token.as_deref(), user_id.as_deref())
        .context("Failed to open game")?;
    println!("Connecting to room {room_id}...");

    Console::new(client, sort_mode).run().await?;

    println!("\nLeft room {room_id}.");
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
