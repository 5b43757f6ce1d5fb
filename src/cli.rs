//! Console front end. Each subcommand is one dashboard interaction.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::api::{ClinicApi, HttpClinicApi};
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::models::{
    Appointment, AppointmentStatus, ChatDisplayStatus, ChatQuery, DEFAULT_CLINIC, NewAppointment,
    Query, QueryStatus, StatusDomain,
};
use crate::notifications::{Badge, CollectionKind, Notification};
use crate::session;
use crate::stats::{ProgressStats, format_currency};
use crate::storage::LocalStorage;
use crate::store::appointments::filter_by_status;
use crate::store::sort_newest_first;
use crate::whatsapp;

#[derive(Parser, Debug)]
#[command(
    name = "dental-admin",
    version,
    about = "Admin console for clinic appointments, patient queries and chat requests"
)]
pub struct Cli {
    /// Backend base URL (overrides API_BASE_URL)
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Session(SessionCommand),
    #[command(flatten)]
    Dashboard(DashboardCommand),
}

/// Commands that work without a stored session.
#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Sign in and remember the session locally
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DENTAL_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the local session
    Logout,
}

/// Commands that require a signed-in admin.
#[derive(Subcommand, Debug)]
pub enum DashboardCommand {
    /// Show the signed-in admin
    Whoami,
    #[command(subcommand)]
    Appointments(AppointmentCommand),
    #[command(subcommand)]
    Queries(QueryCommand),
    #[command(subcommand)]
    Chats(ChatCommand),
    /// Unseen pending records across all collections
    Notifications(NotificationArgs),
    /// Appointment counts, earnings and success rate
    Stats,
    /// Poll every collection until Ctrl-C, reporting badge changes
    Watch,
}

#[derive(Subcommand, Debug)]
pub enum AppointmentCommand {
    List {
        #[arg(long)]
        status: Option<AppointmentStatus>,
    },
    Create(CreateAppointmentArgs),
    SetStatus {
        id: String,
        status: AppointmentStatus,
        /// Amount charged, normally given when completing
        #[arg(long)]
        amount: Option<f64>,
    },
    Delete {
        id: String,
    },
    /// Print a WhatsApp link for the patient
    Whatsapp {
        id: String,
        /// Generic follow-up instead of the confirmation message
        #[arg(long)]
        follow_up: bool,
    },
}

#[derive(Args, Debug)]
pub struct CreateAppointmentArgs {
    #[arg(long, default_value = DEFAULT_CLINIC)]
    pub clinic: String,
    #[arg(long)]
    pub service: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: String,
    /// e.g. "10:00 AM"
    #[arg(long)]
    pub time: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, default_value = "")]
    pub message: String,
}

impl From<CreateAppointmentArgs> for NewAppointment {
    fn from(a: CreateAppointmentArgs) -> Self {
        NewAppointment {
            clinic: a.clinic,
            service: a.service,
            date: a.date,
            time: a.time,
            name: a.name,
            phone: a.phone,
            message: a.message,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum QueryCommand {
    List {
        #[arg(long)]
        status: Option<QueryStatus>,
    },
    SetStatus {
        id: String,
        status: QueryStatus,
    },
    Delete {
        id: String,
    },
    /// Print a WhatsApp acknowledgement link
    Reply {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChatCommand {
    List,
    SetStatus {
        id: String,
        /// pending or completed
        status: ChatDisplayStatus,
    },
}

#[derive(Args, Debug)]
pub struct NotificationArgs {
    /// Mark every pending record as seen
    #[arg(long)]
    pub mark_all: bool,

    #[command(subcommand)]
    pub action: Option<NotificationAction>,
}

#[derive(Subcommand, Debug)]
pub enum NotificationAction {
    /// Mark one record as seen
    Seen { kind: CollectionKind, id: String },
}

pub async fn run(cli: Cli, mut cfg: Config) -> anyhow::Result<()> {
    if let Some(url) = cli.api_base_url {
        cfg.api_base_url = url.trim_end_matches('/').to_string();
    }

    let storage = LocalStorage::open(&cfg.state_dir)
        .with_context(|| format!("opening state directory {}", cfg.state_dir.display()))?;
    let api: Arc<dyn ClinicApi> =
        Arc::new(HttpClinicApi::new(&cfg.api_base_url, cfg.request_timeout)?);

    match cli.command {
        Command::Session(cmd) => run_session(api, storage, cmd).await,
        Command::Dashboard(cmd) => run_dashboard(api, storage, &cfg, cmd).await,
    }
}

async fn run_session(
    api: Arc<dyn ClinicApi>,
    storage: LocalStorage,
    cmd: SessionCommand,
) -> anyhow::Result<()> {
    match cmd {
        SessionCommand::Login { email, password } => {
            let s = session::login(api.as_ref(), &storage, &email, &password).await?;
            println!("Logged in as {}", s.admin.display_name());
        }
        SessionCommand::Logout => {
            session::logout(&storage)?;
            println!("Logged out");
        }
    }
    Ok(())
}

async fn run_dashboard(
    api: Arc<dyn ClinicApi>,
    storage: LocalStorage,
    cfg: &Config,
    cmd: DashboardCommand,
) -> anyhow::Result<()> {
    let current = session::require(&storage)?;
    let dashboard = Dashboard::new(api, storage)?;

    match cmd {
        DashboardCommand::Whoami => {
            let admin = &current.admin;
            println!("{}", admin.display_name());
            if let Some(email) = &admin.email {
                println!("email: {email}");
            }
            if let Some(role) = &admin.role {
                println!("role:  {role}");
            }
        }
        DashboardCommand::Appointments(cmd) => appointments(&dashboard, cmd).await?,
        DashboardCommand::Queries(cmd) => queries(&dashboard, cmd).await?,
        DashboardCommand::Chats(cmd) => chats(&dashboard, cmd).await?,
        DashboardCommand::Notifications(args) => notifications(&dashboard, args).await?,
        DashboardCommand::Stats => {
            dashboard.appointments.fetch_all().await?;
            print!("{}", render_stats(&dashboard.stats().await));
        }
        DashboardCommand::Watch => watch(&dashboard, cfg.poll_interval).await?,
    }
    Ok(())
}

async fn appointments(dash: &Dashboard, cmd: AppointmentCommand) -> anyhow::Result<()> {
    let store = &dash.appointments;
    match cmd {
        AppointmentCommand::List { status } => {
            store.fetch_all().await?;
            let items = filter_by_status(&store.snapshot().await.items, status);
            if items.is_empty() {
                println!("No appointments");
            }
            for a in &items {
                println!("{}", render_appointment(a));
            }
        }
        AppointmentCommand::Create(args) => {
            let created = store.create(&args.into()).await?;
            println!("Created appointment {} for {}", created.id, created.name);
        }
        AppointmentCommand::SetStatus { id, status, amount } => {
            store.update_status(&id, status, amount).await?;
            println!("Appointment {id} is now {status}");
        }
        AppointmentCommand::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted appointment {id}");
        }
        AppointmentCommand::Whatsapp { id, follow_up } => {
            store.fetch_all().await?;
            let Some(a) = store.find(&id).await else {
                bail!("appointment {id} not found");
            };
            let message = if follow_up {
                whatsapp::appointment_follow_up(&a)
            } else {
                whatsapp::appointment_confirmation(&a)
            };
            println!("{}", whatsapp::whatsapp_url(&a.phone, &message));
        }
    }
    Ok(())
}

async fn queries(dash: &Dashboard, cmd: QueryCommand) -> anyhow::Result<()> {
    let store = &dash.queries;
    match cmd {
        QueryCommand::List { status } => {
            store.fetch_all().await?;
            let mut items: Vec<Query> = store
                .snapshot()
                .await
                .items
                .into_iter()
                .filter(|q| status.is_none_or(|s| q.status == s))
                .collect();
            sort_newest_first(&mut items);

            let counts = store.counts().await;
            println!(
                "pending {} | answered {} | closed {}",
                counts.pending, counts.answered, counts.closed
            );
            for q in &items {
                println!("{}", render_query(q));
            }
        }
        QueryCommand::SetStatus { id, status } => {
            store.update_status(&id, status).await?;
            println!("Query {id} is now {status}");
        }
        QueryCommand::Delete { id } => {
            store.delete(&id).await?;
            println!("Deleted query {id}");
        }
        QueryCommand::Reply { id } => {
            store.fetch_all().await?;
            let Some(q) = store.find(&id).await else {
                bail!("query {id} not found");
            };
            let message = whatsapp::query_acknowledgement(&q);
            println!("{}", whatsapp::whatsapp_url(&q.phone, &message));
        }
    }
    Ok(())
}

async fn chats(dash: &Dashboard, cmd: ChatCommand) -> anyhow::Result<()> {
    let store = &dash.chats;
    match cmd {
        ChatCommand::List => {
            store.fetch_all().await?;
            let snap = store.snapshot().await;
            println!("{} pending", store.pending_count().await);
            for c in snap.newest_first() {
                println!("{}", render_chat(&c));
            }
        }
        ChatCommand::SetStatus { id, status } => {
            let shown = store.update_status(&id, status).await?;
            println!("Chat {id} is now {shown}");
        }
    }
    Ok(())
}

async fn notifications(dash: &Dashboard, args: NotificationArgs) -> anyhow::Result<()> {
    if let Some(NotificationAction::Seen { kind, id }) = args.action {
        if dash.mark_seen(kind, &id).await? {
            println!("Marked {kind} {id} as seen");
        } else {
            println!("{kind} {id} was already seen");
        }
        return Ok(());
    }

    if let Err(e) = dash.refresh_all().await {
        warn!("some collections could not be refreshed: {e}");
    }

    if args.mark_all {
        let marked = dash.mark_everything_seen().await?;
        println!("Marked {marked} records as seen");
        return Ok(());
    }

    let now = Utc::now();
    println!("{}", render_badge(&dash.badge().await));
    for n in dash.notifications().await {
        println!("{}", render_notification(&n, now));
    }
    Ok(())
}

async fn watch(dash: &Dashboard, period: Duration) -> anyhow::Result<()> {
    let poller = dash.start_polling(period);
    info!(period_secs = poller.period().as_secs(), "watching for new records");

    let mut ticker = tokio::time::interval(period);
    let mut last: Option<Badge> = None;
    let result = loop {
        tokio::select! {
            _ = ticker.tick() => {
                let badge = dash.badge().await;
                if last != Some(badge) {
                    println!("{}", render_badge(&badge));
                    last = Some(badge);
                }
            }
            res = tokio::signal::ctrl_c() => break res,
        }
    };

    poller.shutdown().await;
    result.context("waiting for Ctrl-C")?;
    Ok(())
}

/* -------------------------
   Rendering
--------------------------*/

fn render_amount(amount: Option<f64>) -> String {
    amount.map(format_currency).unwrap_or_else(|| "-".to_string())
}

pub fn render_appointment(a: &Appointment) -> String {
    format!(
        "{}  {} {:<8}  {:<20}  {:<18}  {:<9}  {}",
        a.id,
        a.date,
        a.time,
        a.name,
        a.service,
        a.status.as_str(),
        render_amount(a.amount)
    )
}

pub fn render_query(q: &Query) -> String {
    format!(
        "{}  {:<20}  {:<14}  {:<20}  {:<8}  {}",
        q.id,
        q.name,
        q.phone,
        q.department_label(),
        q.status.as_str(),
        q.message
    )
}

pub fn render_chat(c: &ChatQuery) -> String {
    let created = c
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {:<20}  {:<14}  {:<9}  {}",
        c.id,
        c.name,
        c.phone,
        c.display_status().as_str(),
        created
    )
}

pub fn render_badge(b: &Badge) -> String {
    format!(
        "{} new (appointments {}, queries {}, chats {})",
        b.total(),
        b.appointments,
        b.queries,
        b.chats
    )
}

pub fn render_notification(n: &Notification, now: chrono::DateTime<Utc>) -> String {
    format!(
        "[{}] {}  {} - {} ({})",
        n.kind,
        n.id,
        n.name,
        n.subject,
        n.time_label(now)
    )
}

pub fn render_stats(s: &ProgressStats) -> String {
    format!(
        "Total appointments: {}\n\
         Pending:            {}\n\
         Completed:          {}\n\
         Rejected:           {}\n\
         Earnings:           {}\n\
         Losses:             {}\n\
         Success rate:       {:.1}%\n",
        s.total,
        s.pending,
        s.completed,
        s.rejected,
        format_currency(s.earnings),
        format_currency(s.losses),
        s.success_rate()
    )
}
