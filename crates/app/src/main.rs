//! Shutterclub - weekly photo challenges for small groups
//!
//! Command-line front end over the group store.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Duration;
use clap::{Parser, Subcommand};
use shutterclub_app::{
    AppConfig, GroupService, InviteSender, LoggingMailer, LoggingScheduler, RandomTokenGenerator,
    Result, SystemClock, TracingDispatcher, UuidGenerator,
};
use shutterclub_core::{Database, Entity, MembershipRole};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "shutterclub", version, about = "Weekly photo challenges for small groups")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a group with the configured photo limits
    CreateGroup { slug: String },
    /// Add a user to a group
    AddMember {
        group: String,
        user: Uuid,
        #[arg(long)]
        owner: bool,
    },
    /// Issue an invite on behalf of an owner membership
    Invite {
        group: String,
        inviter: Uuid,
        email: String,
        /// Validity in hours (defaults to the configured value)
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Redeem an invite token for a user
    Accept { group: String, token: String, user: Uuid },
    /// Print a group snapshot as JSON
    Show { group: String },
    /// Print the events a group has raised
    Events { group: String },
    /// List stored groups
    List,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let database = Database::open(config.database_path()?)?;
    let service = Arc::new(GroupService::new(
        database,
        Arc::new(SystemClock),
        Arc::new(UuidGenerator),
        Arc::new(TracingDispatcher),
    ));

    match cli.command {
        Command::CreateGroup { slug } => {
            let id = service.create_group(&slug, Some(config.photo_limits()?))?;
            println!("{id}");
        }
        Command::AddMember { group, user, owner } => {
            let group_id = resolve(&service, &group)?;
            let role = if owner {
                MembershipRole::Owner
            } else {
                MembershipRole::Member
            };
            let membership = service.add_member(group_id, user, role)?;
            println!("{membership}");
        }
        Command::Invite {
            group,
            inviter,
            email,
            hours,
        } => {
            let group_id = resolve(&service, &group)?;
            let sender = InviteSender::new(
                service.clone(),
                Arc::new(RandomTokenGenerator::new(config.invites.token_length)),
                Arc::new(LoggingMailer),
                Arc::new(LoggingScheduler::new(config.reminder_lead())),
                config.invite_validity(),
            );
            let valid_for = hours.map(|h| Duration::hours(i64::from(h)));
            let issued = sender.send_invite(group_id, inviter, &email, valid_for)?;
            println!("{} {} expires {}", issued.invite_id, issued.token, issued.expires_at);
        }
        Command::Accept { group, token, user } => {
            let group_id = resolve(&service, &group)?;
            let membership = service.accept_invite(group_id, &token, user)?;
            println!("{membership}");
        }
        Command::Show { group } => {
            let group = service.repository().find_group(&group)?;
            let json = serde_json::to_string_pretty(&group).map_err(shutterclub_core::Error::from)?;
            println!("{json}");
        }
        Command::Events { group } => {
            let group_id = resolve(&service, &group)?;
            for stored in service.repository().events_for_group(group_id)? {
                println!(
                    "{:>6} v{:<4} {:<16} {}",
                    stored.sequence,
                    stored.group_version,
                    stored.event.name(),
                    stored.event.occurred_on()
                );
            }
        }
        Command::List => {
            for summary in service.repository().list_groups()? {
                println!(
                    "{} {:<24} v{} {}",
                    summary.id, summary.slug, summary.version, summary.updated_at
                );
            }
        }
    }
    Ok(())
}

fn resolve(service: &GroupService<Database>, id_or_slug: &str) -> Result<Uuid> {
    Ok(service.repository().find_group(id_or_slug)?.id())
}
