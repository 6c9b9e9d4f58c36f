use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{ApiClient, AuthStore, CsrfCookieCredentials, EventFilter, PunishmentsStore};
use shared::domain::{EventId, UserId};
use shared::protocol::PunishmentEvent;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "http://localhost:8000")]
    server_url: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    password: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List users, optionally filtered by a search term.
    Users {
        #[arg(long, default_value = "")]
        q: String,
        #[arg(long)]
        include_me: bool,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show a single user.
    User { user_id: i64 },
    /// List pending and confirmed punishment events.
    Punishments {
        #[arg(long)]
        target_id: Option<i64>,
        #[arg(long, default_value_t = 10)]
        confirmed_limit: u32,
    },
    /// Hand out a punishment.
    Give {
        target_id: i64,
        amount: i32,
        #[arg(long, default_value = "")]
        reason: String,
    },
    /// Confirm a pending punishment event.
    Confirm { event_id: i64 },
    /// Undo a pending punishment event.
    Undo { event_id: i64 },
    /// Record punishments as taken, bypassing the confirm workflow.
    Take { target_id: i64, amount: i32 },
    /// Punishment totals, overall or for one user.
    Stats {
        #[arg(long)]
        target_id: Option<i64>,
    },
    /// Hand out a fikapinne.
    FikaGive { target_id: i64 },
    /// Strike taken fikapinnar (the server only accepts 3 or 5).
    FikaTake { target_id: i64, amount: i32 },
    /// Fikapinne totals, overall or for one user.
    FikaStats {
        #[arg(long)]
        target_id: Option<i64>,
    },
}

fn print_event(event: &PunishmentEvent) {
    let confirmer = event
        .confirmer
        .as_ref()
        .map(|user| user.username.as_str())
        .unwrap_or("-");
    println!(
        "  #{} {} -> {} x{} ({:?}, confirmer: {confirmer}) {}",
        event.id.0, event.initiator.username, event.target.username, event.amount, event.stage,
        event.reason,
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let cli = Cli::parse();

    let api = Arc::new(ApiClient::new(
        cli.server_url,
        Arc::new(CsrfCookieCredentials::new()),
    )?);
    let auth = AuthStore::new(Arc::clone(&api));
    auth.login(&cli.username, &cli.password).await?;
    if auth.must_reset_password().await {
        println!("note: the server wants this account's password changed");
    }

    match cli.command {
        Command::Users {
            q,
            include_me,
            limit,
        } => {
            for user in api.list_users(&q, !include_me, limit).await? {
                println!("#{} {} ({:?})", user.id.0, user.username, user.tier);
            }
        }
        Command::User { user_id } => {
            let user = api.get_user(UserId(user_id)).await?;
            println!("#{} {} ({:?})", user.id.0, user.username, user.tier);
            if let Some(avatar_url) = user.avatar_url {
                println!("avatar: {avatar_url}");
            }
        }
        Command::Punishments {
            target_id,
            confirmed_limit,
        } => {
            let store = PunishmentsStore::new(Arc::clone(&api));
            let filter = EventFilter {
                target_id: target_id.map(UserId),
                limit: None,
            };
            store.fetch_all(&filter, Some(confirmed_limit)).await;

            let snapshot = store.snapshot().await;
            if let Some(error) = snapshot.error {
                anyhow::bail!(error);
            }
            println!("pending ({}):", snapshot.pending.len());
            for event in &snapshot.pending {
                print_event(event);
            }
            println!("confirmed ({}):", snapshot.confirmed.len());
            for event in &snapshot.confirmed {
                print_event(event);
            }
        }
        Command::Give {
            target_id,
            amount,
            reason,
        } => {
            let store = PunishmentsStore::new(Arc::clone(&api));
            let created = store.create_event(UserId(target_id), amount, &reason).await?;
            println!("created event_id={}", created.id.0);
        }
        Command::Confirm { event_id } => {
            let store = PunishmentsStore::new(Arc::clone(&api));
            let updated = store.confirm_event(EventId(event_id)).await?;
            println!(
                "confirmed event_id={} at {:?}",
                updated.id.0, updated.confirmed_at
            );
        }
        Command::Undo { event_id } => {
            let store = PunishmentsStore::new(Arc::clone(&api));
            store.delete_event(EventId(event_id)).await?;
            println!("undid event_id={event_id}");
        }
        Command::Take { target_id, amount } => {
            let store = PunishmentsStore::new(Arc::clone(&api));
            let taken = store.take_event(UserId(target_id), amount).await?;
            println!("recorded take_event_id={}", taken.id.0);
        }
        Command::Stats { target_id } => {
            let stats = api.punishment_stats(target_id.map(UserId)).await?;
            println!(
                "total={} this_week={}",
                stats.total_amount, stats.week_amount
            );
        }
        Command::FikaGive { target_id } => {
            api.give_fikapinne(UserId(target_id)).await?;
            println!("gave one fikapinne to user_id={target_id}");
        }
        Command::FikaTake { target_id, amount } => {
            api.take_fikapinnar(UserId(target_id), amount).await?;
            println!("struck {amount} fikapinnar for user_id={target_id}");
        }
        Command::FikaStats { target_id } => {
            let stats = api.fikapinne_stats(target_id.map(UserId)).await?;
            println!(
                "total={} this_month={}",
                stats.total_amount, stats.month_amount
            );
        }
    }

    Ok(())
}
