//! services/client/src/bin/attendance.rs

use attendance_core::domain::{
    ApprovalDecision, AttendanceAction, Attachment, GeoPoint, LeaveKind, LeaveRequest,
    PositionSample, RecapFilter, Registration, Session,
};
use attendance_core::ports::{AdminBackend, AttendanceBackend};
use attendance_core::range_gate::evaluate;
use bytes::Bytes;
use chrono::{Datelike, Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_lib::{
    adapters::{FileCamera, HttpBackend, ReplayLocationSensor, SystemClock},
    config::Config,
    error::ClientError,
    flow::{FlowOutcome, FlowRunner},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Geofenced attendance client")]
struct Cli {
    /// Session token returned by `login`.
    #[arg(long, env = "ATTENDANCE_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and print the session token.
    Login { email: String, password: String },
    /// Create an account; it stays inactive until an admin activates it.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        job_title: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        branch: u64,
        #[arg(long)]
        password: String,
    },
    /// List the office branches.
    Branches,
    /// Show today's attendance and what to do next.
    Status,
    CheckIn(AttendArgs),
    CheckOut(AttendArgs),
    /// Monthly attendance history and statistics.
    History(PeriodArgs),
    /// Submit a leave request.
    Leave {
        #[arg(long, value_enum)]
        kind: LeaveKindArg,
        /// Date in YYYY-MM-DD.
        #[arg(long)]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        attachment: Option<PathBuf>,
    },
    /// Distance from a position to the configured site, without submitting.
    Distance {
        #[command(flatten)]
        position: PositionArgs,
        #[arg(long, value_enum, default_value = "check-in")]
        action: ActionArg,
    },
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    PendingUsers,
    Activate {
        user_id: u64,
        #[arg(long)]
        admin: bool,
    },
    EarlyDepartures,
    Approve { request_id: u64 },
    Reject { request_id: u64 },
    Recap {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Download the monthly spreadsheet.
    Export {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct PositionArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
    #[arg(long, default_value_t = 10.0)]
    accuracy: f64,
}

#[derive(Args, Debug)]
struct AttendArgs {
    #[command(flatten)]
    position: PositionArgs,
    /// Selfie image file.
    #[arg(long)]
    photo: PathBuf,
    /// Reason for a late check-in or an early check-out.
    #[arg(long, default_value = "")]
    reason: String,
}

#[derive(Args, Debug)]
struct PeriodArgs {
    #[arg(long)]
    month: Option<u32>,
    #[arg(long)]
    year: Option<i32>,
}

impl PeriodArgs {
    fn resolve(&self) -> (u32, i32) {
        let today = Local::now().date_naive();
        (
            self.month.unwrap_or_else(|| today.month()),
            self.year.unwrap_or_else(|| today.year()),
        )
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LeaveKindArg {
    Sick,
    Permission,
    Duty,
}

impl From<LeaveKindArg> for LeaveKind {
    fn from(kind: LeaveKindArg) -> Self {
        match kind {
            LeaveKindArg::Sick => LeaveKind::Sick,
            LeaveKindArg::Permission => LeaveKind::Permission,
            LeaveKindArg::Duty => LeaveKind::Duty,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    CheckIn,
    CheckOut,
}

impl From<ActionArg> for AttendanceAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::CheckIn => AttendanceAction::CheckIn,
            ActionArg::CheckOut => AttendanceAction::CheckOut,
        }
    }
}

fn sample(position: &PositionArgs) -> Result<PositionSample, ClientError> {
    Ok(PositionSample {
        point: GeoPoint::new(position.lat, position.lng)?,
        accuracy_meters: position.accuracy,
        captured_at: Utc::now(),
    })
}

fn session(token: Option<String>) -> Result<Session, ClientError> {
    token
        .filter(|t| !t.trim().is_empty())
        .map(Session::new)
        .ok_or_else(|| {
            ClientError::Internal("Not logged in: pass --token or set ATTENDANCE_TOKEN".to_string())
        })
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Backend at {}", config.api_base_url);

    // --- 2. Initialize the Backend Adapter ---
    let backend = Arc::new(HttpBackend::new(
        config.api_base_url.clone(),
        config.request_timeout,
    )?);

    // --- 3. Dispatch ---
    match cli.command {
        Command::Login { email, password } => {
            let session = backend.login(&email, &password).await?;
            if let Some(user) = &session.user {
                info!("Logged in as {} ({:?})", user.name, user.role);
            }
            println!("{}", session.token);
        }
        Command::Register {
            email,
            name,
            job_title,
            phone,
            branch,
            password,
        } => {
            let registration = Registration {
                email,
                name,
                job_title,
                phone,
                branch_id: branch,
                password,
            };
            backend.register(&registration).await?;
            println!("Registered. Wait for an administrator to activate the account.");
        }
        Command::Branches => {
            for branch in backend.list_branches().await? {
                match branch.location {
                    Some(point) => println!("{}\t{}\t{}", branch.id, branch.name, point),
                    None => println!("{}\t{}", branch.id, branch.name),
                }
            }
        }
        Command::Status => {
            let session = session(cli.token)?;
            let status = backend.today_status(&session).await?;
            if let Some(record) = &status.record {
                let fmt = |t: Option<chrono::NaiveTime>| {
                    t.map(|t| t.format("%H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string())
                };
                println!(
                    "In: {}  Out: {}  Status: {:?}",
                    fmt(record.check_in),
                    fmt(record.check_out),
                    record.status
                );
            }
            println!("Next: {:?}", status.next_action());
        }
        Command::CheckIn(args) => {
            attend(&config, backend, cli.token, AttendanceAction::CheckIn, args).await?
        }
        Command::CheckOut(args) => {
            attend(&config, backend, cli.token, AttendanceAction::CheckOut, args).await?
        }
        Command::History(period) => {
            let session = session(cli.token)?;
            let (month, year) = period.resolve();
            let history = backend.history(&session, month, year).await?;
            for record in &history.records {
                let date = record
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{:?}", date, record.status);
            }
            let stats = history.stats;
            println!(
                "Present: {}  On time: {}  Late: {}  Leave: {}  Absent: {}",
                stats.present(),
                stats.on_time,
                stats.late,
                stats.leave,
                stats.absent
            );
        }
        Command::Leave {
            kind,
            date,
            description,
            attachment,
        } => {
            let session = session(cli.token)?;
            let attachment = match attachment {
                Some(path) => Some(read_attachment(path).await?),
                None => None,
            };
            let request = LeaveRequest::new(Some(kind.into()), date, description, attachment)?;
            backend.submit_leave(&session, &request).await?;
            println!("Leave request submitted.");
        }
        Command::Distance { position, action } => {
            let site = config.default_site(action.into());
            let result = evaluate(&sample(&position)?, &site);
            println!(
                "{}m from {} ({})",
                result.display_meters(),
                site.name,
                if result.within_range {
                    "in range"
                } else {
                    "out of range"
                }
            );
        }
        Command::Admin(command) => admin(backend.as_ref(), session(cli.token)?, command).await?,
    }

    Ok(())
}

async fn attend(
    config: &Arc<Config>,
    backend: Arc<HttpBackend>,
    token: Option<String>,
    action: AttendanceAction,
    args: AttendArgs,
) -> Result<(), ClientError> {
    let session = session(token)?;
    let runner = FlowRunner {
        config: config.clone(),
        backend,
        sensor: Arc::new(ReplayLocationSensor::single(sample(&args.position)?)),
        camera: Arc::new(FileCamera::new(args.photo)),
        clock: Arc::new(SystemClock),
    };

    match runner.run(&session, action, &args.reason).await? {
        FlowOutcome::Submitted(receipt) => println!(
            "{}",
            receipt
                .message
                .unwrap_or_else(|| "Attendance recorded.".to_string())
        ),
        FlowOutcome::OutOfRange(result) => println!(
            "You are {}m from the office, outside the allowed area.",
            result.display_meters()
        ),
        FlowOutcome::NotAvailable(next) => {
            println!("Not available right now. Next step today: {:?}.", next)
        }
    }
    Ok(())
}

async fn admin(
    backend: &HttpBackend,
    session: Session,
    command: AdminCommand,
) -> Result<(), ClientError> {
    match command {
        AdminCommand::PendingUsers => {
            for user in backend.pending_users(&session).await? {
                println!("{}\t{}\t{}", user.id, user.name, user.email);
            }
        }
        AdminCommand::Activate { user_id, admin } => {
            backend.activate_user(&session, user_id, admin).await?;
            println!("User {} activated.", user_id);
        }
        AdminCommand::EarlyDepartures => {
            for request in backend.pending_early_departures(&session).await? {
                let name = request
                    .employee
                    .map(|e| e.name)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}",
                    request.id,
                    name,
                    request.reason.unwrap_or_default()
                );
            }
        }
        AdminCommand::Approve { request_id } => {
            backend
                .decide_early_departure(&session, request_id, ApprovalDecision::Approve)
                .await?;
            println!("Request {} approved.", request_id);
        }
        AdminCommand::Reject { request_id } => {
            backend
                .decide_early_departure(&session, request_id, ApprovalDecision::Reject)
                .await?;
            println!("Request {} rejected.", request_id);
        }
        AdminCommand::Recap {
            period,
            status,
            date,
        } => {
            let (month, year) = period.resolve();
            let filter = RecapFilter {
                month,
                year,
                status,
                date,
            };
            for record in backend.recap(&session, &filter).await? {
                let name = record
                    .employee
                    .map(|e| e.name)
                    .unwrap_or_else(|| "-".to_string());
                let date = record
                    .date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{:?}", date, name, record.status);
            }
        }
        AdminCommand::Export { period, output } => {
            let (month, year) = period.resolve();
            let bytes = backend.export_recap(&session, month, year).await?;
            tokio::fs::write(&output, &bytes).await?;
            println!("Wrote {} bytes to {}", bytes.len(), output.display());
        }
    }
    Ok(())
}

async fn read_attachment(path: PathBuf) -> Result<Attachment, ClientError> {
    let data = tokio::fs::read(&path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let content_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        _ => "image/jpeg",
    };
    Ok(Attachment {
        file_name,
        content_type: content_type.to_string(),
        data: Bytes::from(data),
    })
}
