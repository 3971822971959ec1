//! hubqueue CLI: run the server or inspect and administer the system.

use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use hubqueue::config::Config;
use hubqueue::db::Db;
use hubqueue::fanout::Broadcaster;
use hubqueue::filestore::WebDav;
use hubqueue::model::item::{Item, ItemId};
use hubqueue::model::settings::SettingsUpdate;
use hubqueue::model::user::{Identity, Role};
use hubqueue::queue::{ClaimPolicy, Queue};
use hubqueue::server::{self, AppState};
use hubqueue::system::{Refresher, System, SystemContext};
use hubqueue::telemetry::{TelemetryConfig, init_telemetry};
use tracing::info;

#[derive(Parser)]
#[command(name = "hubqueue", about = "Collaborative image-processing task queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Show maintenance mode and the self-destruct countdown
    Status,
    /// List active items, or completed ones with --history
    Items {
        #[arg(long)]
        history: bool,
    },
    /// Delete an item from the queue or history
    Delete {
        /// Item ID (full UUID)
        id: String,
    },
    /// Show or change system settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List users or change a role
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Set {
        /// Turn maintenance mode on or off
        #[arg(long)]
        maintenance: Option<bool>,
        /// Days of inactivity before self-destruct
        #[arg(long)]
        days: Option<i64>,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    List,
    SetRole {
        username: String,
        /// admin, trusted, user or banned
        role: Role,
    },
}

type Services = (Queue<Db, Broadcaster>, System<Db, Broadcaster>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Command::Serve => cmd_serve(config).await,
        command => {
            let db = Arc::new(Db::connect(config.expose_database_url()).await?);
            db.migrate().await?;
            // Nothing subscribes here; clients of a running server catch up on
            // their next poll or context refresh.
            let events = Broadcaster::default();
            let services: Services = (
                Queue::new(
                    Arc::clone(&db),
                    events.clone(),
                    ClaimPolicy::from_strict(config.strict_claims),
                ),
                System::new(db, events),
            );
            run_command(command, services).await
        }
    }
}

async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let _guard = init_telemetry(TelemetryConfig::from_config(&config))?;

    let db = Arc::new(Db::connect(config.expose_database_url()).await?);
    db.migrate().await?;
    db.health_check().await?;

    let files = WebDav::new(config.require_webdav()?);
    let events = Broadcaster::default();
    let context = Arc::new(SystemContext::load(db.as_ref()).await?);

    let state = Arc::new(AppState::new(
        Arc::clone(&db),
        files,
        Arc::clone(&context),
        events.clone(),
        ClaimPolicy::from_strict(config.strict_claims),
    ));

    let refresher = Refresher::new(db, context, events, config.refresh_interval);
    let background = refresher.clone();
    let task = tokio::spawn(async move { background.run().await });

    info!(
        strict_claims = config.strict_claims,
        refresh_secs = config.refresh_interval.as_secs(),
        "starting hubqueue"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let served = server::serve(listener, state, server::shutdown_signal()).await;

    refresher.shutdown();
    task.await?;
    served?;
    Ok(())
}

async fn run_command(command: Command, (queue, system): Services) -> anyhow::Result<()> {
    let operator = Identity::operator();

    match command {
        Command::Serve => anyhow::bail!("serve is not an operator command"),
        Command::Status => {
            let report = system.status(Utc::now()).await?;
            let countdown = report.countdown;
            println!(
                "Maintenance:     {}",
                if report.is_maintenance { "on" } else { "off" }
            );
            println!("Threshold:       {} day(s)", report.self_destruct_days);
            match countdown.last_activity {
                Some(at) => println!("Last activity:   {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("Last activity:   never"),
            }
            if countdown.destructed {
                println!("Self-destruct:   TRIGGERED");
            } else {
                println!(
                    "Self-destruct:   {} remaining ({:.1}% elapsed, {:?})",
                    countdown.remaining, countdown.progress, countdown.urgency
                );
            }
        }
        Command::Items { history } => {
            let snapshot = queue.snapshot().await?;
            let items = if history {
                snapshot.history
            } else {
                snapshot.images
            };
            print_items(&items, history);
        }
        Command::Delete { id } => {
            let id: ItemId = id.parse()?;
            if queue.delete(&operator, id).await? {
                println!("Deleted {id}");
            } else {
                println!("No item {id}");
            }
        }
        Command::Settings { action } => match action {
            SettingsAction::Show => {
                let settings = system.settings().await?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
            SettingsAction::Set { maintenance, days } => {
                let update = SettingsUpdate {
                    is_maintenance: maintenance,
                    self_destruct_days: days,
                };
                let settings = system.update_settings(&operator, update).await?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
            }
        },
        Command::Users { action } => match action {
            UsersAction::List => {
                let users = system.users(&operator).await?;
                if users.is_empty() {
                    println!("No users registered.");
                }
                for user in users {
                    println!("{:<24}  {}", user.username, user.role);
                }
            }
            UsersAction::SetRole { username, role } => {
                system.set_role(&operator, &username, role).await?;
                println!("{username} is now {role}");
            }
        },
    }
    Ok(())
}

fn print_items(items: &[Item], history: bool) {
    if items.is_empty() {
        println!("No items.");
        return;
    }

    if history {
        println!(
            "{:<36}  {:<24}  {:<12}  {:<12}  COMPLETED",
            "ID", "NAME", "UPLOADER", "COMPLETED BY"
        );
    } else {
        println!(
            "{:<36}  {:<24}  {:<12}  {:<12}  {:<12}  CREATED",
            "ID", "NAME", "STATUS", "UPLOADER", "CLAIMED BY"
        );
    }
    println!("{}", "-".repeat(120));

    for item in items {
        let name: String = item.name.chars().take(24).collect();
        if history {
            let (by, at) = item
                .completion
                .as_ref()
                .map(|c| (c.by.as_str(), c.at.format("%Y-%m-%d %H:%M").to_string()))
                .unwrap_or(("-", "-".to_string()));
            println!(
                "{:<36}  {:<24}  {:<12}  {:<12}  {}",
                item.id, name, item.uploaded_by, by, at
            );
        } else {
            println!(
                "{:<36}  {:<24}  {:<12}  {:<12}  {:<12}  {}",
                item.id,
                name,
                item.status,
                item.uploaded_by,
                item.claimant().unwrap_or("-"),
                item.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }

    println!("\n{} item(s)", items.len());
}
