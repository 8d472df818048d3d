mod cli;
mod completions;
mod ui;

use std::io::Write;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};

use cli::{Cli, Commands, ExamSubcommands, FocusSubcommands, StorageMode, SubjectSubcommands};
use scorepad::analytics::{ChartPoint, FocusAnalytics, Range};
use scorepad::app::{AppError, LocalDashboard, ScoreBook};
use scorepad::config::DashboardConfig;
use scorepad::focus_log::FocusLog;
use scorepad::ids::{display_id, resolve_token};
use scorepad::logging;
use scorepad::remote::RemoteDashboard;
use scorepad::selectors::DashboardView;
use scorepad::store::{KeyValueStore, SqliteBackend, SqliteKvStore};
use scorepad::timer::{FocusTimer, SessionMode};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Wall-clock "now" in the machine's offset; UTC when the offset is unknown.
fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn run() -> Result<(), AppError> {
    use clap::Parser;

    let cli = Cli::parse();
    if let Err(err) = logging::init_tracing(cli.quiet, cli.verbose) {
        eprintln!("warning: {err}");
    }

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell);
    }

    let config = DashboardConfig::load(cli.config.as_deref())?;
    let user = cli
        .user
        .clone()
        .unwrap_or_else(|| config.default_user.clone());
    debug!(db = %cli.db, mode = ?cli.mode, user = %user, "starting");

    match cli.command {
        Commands::Focus(args) => {
            let backend = SqliteBackend::open(&cli.db)?;
            let mut log = FocusLog::new(backend, user, config.retention_days);
            run_focus_command(args.command, &mut log, &config)
        }
        Commands::Show(args) => {
            let session = Session::open(&cli.db, cli.mode, &config, &user)?;
            let view = DashboardView::from_state(session.book.state());
            if args.json {
                print_json(&view)
            } else {
                ui::print_dashboard(&view);
                Ok(())
            }
        }
        Commands::Subject(args) => {
            let mut session = Session::open(&cli.db, cli.mode, &config, &user)?;
            run_subject_command(args.command, &mut session)?;
            session.finish()
        }
        Commands::Exam(args) => {
            let mut session = Session::open(&cli.db, cli.mode, &config, &user)?;
            run_exam_command(args.command, &mut session)?;
            session.finish()
        }
        Commands::Completions(_) => Ok(()),
    }
}

/// One command's view of the score book, whichever variant backs it.
struct Session {
    book: Box<dyn ScoreBook>,
    /// Row storage has no notion of an active subject, so the host remembers
    /// the selection per user in the key-value table.
    active_pref: Option<(SqliteKvStore, String)>,
}

impl Session {
    fn open(
        db: &str,
        mode: StorageMode,
        config: &DashboardConfig,
        user: &str,
    ) -> Result<Self, AppError> {
        match mode {
            StorageMode::Local => {
                let store = SqliteKvStore::open(db)?;
                let dashboard = LocalDashboard::open(store, config.storage_key.as_str())?;
                Ok(Self {
                    book: Box::new(dashboard),
                    active_pref: None,
                })
            }
            StorageMode::Remote => {
                let mut dashboard = RemoteDashboard::open(SqliteBackend::open(db)?, user)?;
                let prefs = SqliteKvStore::open(db)?;
                let key = format!("{}:active:{}", config.storage_key, user);
                if let Some(Value::String(active)) = prefs.get(&key)? {
                    if dashboard.state().subject(&active).is_some() {
                        dashboard.select_subject(&active)?;
                    }
                }
                Ok(Self {
                    book: Box::new(dashboard),
                    active_pref: Some((prefs, key)),
                })
            }
        }
    }

    fn subject_id(&self, token: &str) -> Result<String, AppError> {
        let ids = self.book.state().subjects.iter().map(|s| s.id.as_str());
        resolve_token(ids, token)
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidArgument(format!("no subject matches '{token}'")))
    }

    fn exam_id(&self, token: &str) -> Result<String, AppError> {
        let ids = self.book.state().active_exams().iter().map(|e| e.id.as_str());
        resolve_token(ids, token)
            .map(str::to_string)
            .ok_or_else(|| AppError::InvalidArgument(format!("no exam matches '{token}'")))
    }

    fn subject_name(&self, subject_id: &str) -> String {
        self.book
            .state()
            .subject(subject_id)
            .map(|subject| subject.name.clone())
            .unwrap_or_default()
    }

    fn finish(&mut self) -> Result<(), AppError> {
        if let Some((prefs, key)) = &mut self.active_pref {
            let active = Value::String(self.book.state().active_subject_id.clone());
            prefs.set(key, &active)?;
        }
        Ok(())
    }
}

fn run_subject_command(command: SubjectSubcommands, session: &mut Session) -> Result<(), AppError> {
    match command {
        SubjectSubcommands::Add { name } => {
            let id = session.book.add_subject(&name)?;
            println!("added subject {} ({})", name.trim(), display_id(&id));
        }
        SubjectSubcommands::Rm { id } => {
            let id = session.subject_id(&id)?;
            let name = session.subject_name(&id);
            session.book.delete_subject(&id)?;
            println!("removed subject {name}");
        }
        SubjectSubcommands::Use { id } => {
            let id = session.subject_id(&id)?;
            session.book.select_subject(&id)?;
            println!("active subject: {}", session.subject_name(&id));
        }
        SubjectSubcommands::Ls { json } => {
            let view = DashboardView::from_state(session.book.state());
            if json {
                print_json(&view.subjects)?;
            } else {
                ui::print_subjects(&view);
            }
        }
    }
    Ok(())
}

fn run_exam_command(command: ExamSubcommands, session: &mut Session) -> Result<(), AppError> {
    match command {
        ExamSubcommands::Add(fields) => {
            session.book.add_exam(&fields.to_form())?;
            if let Some(exam) = session.book.state().active_exams().first() {
                println!("added exam {} ({})", exam.paper, display_id(&exam.id));
            }
        }
        ExamSubcommands::Update { id, fields } => {
            let id = session.exam_id(&id)?;
            session.book.update_exam(&id, &fields.to_form())?;
            println!("updated exam {}", display_id(&id));
        }
        ExamSubcommands::Rm { id } => {
            let id = session.exam_id(&id)?;
            session.book.delete_exam(&id)?;
            println!("removed exam {}", display_id(&id));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct FocusStatsJson<'a> {
    range: &'static str,
    series: Vec<ChartPoint>,
    #[serde(flatten)]
    analytics: &'a FocusAnalytics,
}

fn run_focus_command(
    command: FocusSubcommands,
    log: &mut FocusLog<SqliteBackend>,
    config: &DashboardConfig,
) -> Result<(), AppError> {
    match command {
        FocusSubcommands::Log { minutes } => {
            let now = local_now();
            if log.record(i64::from(minutes) * 60, now, now)? {
                println!("logged {minutes}m of focus");
            } else {
                println!("nothing to log");
            }
        }
        FocusSubcommands::Stats { range, json } => {
            let now = local_now();
            log.load(now)?;
            let analytics = log.analytics(now);
            let range = Range::from(range);
            if json {
                print_json(&FocusStatsJson {
                    range: range.as_str(),
                    series: analytics.series(range),
                    analytics: &analytics,
                })?;
            } else {
                ui::print_focus_stats(&analytics, range);
            }
        }
        FocusSubcommands::Run { sessions } => run_timer(log, config, sessions)?,
    }
    Ok(())
}

/// Drives the timer with one tick per second until `sessions` focus intervals
/// have been recorded. Each new interval starts automatically.
fn run_timer(
    log: &mut FocusLog<SqliteBackend>,
    config: &DashboardConfig,
    sessions: u32,
) -> Result<(), AppError> {
    let mut timer = FocusTimer::new(config.session_durations());
    let mut completed = 0;
    let mut stdout = std::io::stdout();
    timer.start();

    while completed < sessions {
        print!(
            "\r{}  ",
            ui::timer_status(timer.mode(), timer.seconds_left(), timer.session())
        );
        stdout.flush()?;
        thread::sleep(Duration::from_secs(1));

        let Some(transition) = timer.tick() else {
            continue;
        };
        if let Some(completion) = transition.completion {
            log.record_completion(&completion, local_now())?;
            completed += 1;
            info!(
                session = completion.session,
                seconds = completion.duration_secs,
                "focus session recorded"
            );
        }
        if transition.to == SessionMode::Break && completed < sessions {
            println!("\rfocus done, take a break");
        }
        timer.start();
    }
    println!("\rrecorded {completed} focus session(s)");
    Ok(())
}
