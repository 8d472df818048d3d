use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use scorepad::analytics::Range;
use scorepad::payload::ExamForm;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "scorepad")]
#[command(bin_name = "scorepad")]
#[command(version)]
#[command(about = "Track exam-paper scores and focus sessions")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        global = true,
        env = "SCOREPAD_DB_PATH",
        default_value = "scorepad.sqlite",
        help = "Path to the SQLite database."
    )]
    pub db: String,

    #[arg(
        short = 'm',
        long,
        global = true,
        env = "SCOREPAD_MODE",
        value_enum,
        default_value_t = StorageMode::Local,
        help = "Keep scores in one local blob or in per-user rows."
    )]
    pub mode: StorageMode,

    #[arg(
        short = 'u',
        long,
        global = true,
        env = "SCOREPAD_USER",
        help = "User id for row storage and focus history (defaults to config)."
    )]
    pub user: Option<String>,

    #[arg(
        short = 'c',
        long,
        global = true,
        env = "SCOREPAD_CONFIG",
        help = "TOML file overriding the built-in settings."
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long, global = true, help = "Log debug output to stderr.")]
    pub verbose: bool,

    #[arg(short = 'q', long, global = true, help = "Only log errors.")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageMode {
    Local,
    Remote,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Show the active subject with its exams and insights.")]
    Show(ShowArgs),
    #[command(about = "Manage subjects.")]
    Subject(SubjectArgs),
    #[command(about = "Record, edit, and remove exam papers.")]
    Exam(ExamArgs),
    #[command(about = "Log and review focus sessions.")]
    Focus(FocusArgs),
    #[command(about = "Print a shell completion script.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(long, help = "Render as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct SubjectArgs {
    #[command(subcommand)]
    pub command: SubjectSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum SubjectSubcommands {
    #[command(about = "Add a subject and make it active.")]
    Add {
        #[arg(help = "Subject name.")]
        name: String,
    },
    #[command(about = "Remove a subject and its exams.")]
    Rm {
        #[arg(help = "Subject id or unique id prefix.")]
        id: String,
    },
    #[command(about = "Make a subject active.")]
    Use {
        #[arg(help = "Subject id or unique id prefix.")]
        id: String,
    },
    #[command(about = "List subjects.")]
    Ls {
        #[arg(long, help = "Render as JSON.")]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct ExamArgs {
    #[command(subcommand)]
    pub command: ExamSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ExamSubcommands {
    #[command(about = "Add an exam to the active subject.")]
    Add(ExamFields),
    #[command(about = "Replace an exam's fields.")]
    Update {
        #[arg(help = "Exam id or unique id prefix.")]
        id: String,
        #[command(flatten)]
        fields: ExamFields,
    },
    #[command(about = "Remove an exam from the active subject.")]
    Rm {
        #[arg(help = "Exam id or unique id prefix.")]
        id: String,
    },
}

/// Raw form values; parsing and clamping happen in the payload builder.
#[derive(Debug, Clone, Args)]
pub struct ExamFields {
    #[arg(long, help = "Paper name, e.g. \"2023 P1\".")]
    pub paper: String,

    #[arg(long, default_value = "", allow_hyphen_values = true, help = "MCQ score.")]
    pub mcq: String,

    #[arg(long, default_value = "", allow_hyphen_values = true, help = "Essay score.")]
    pub essay: String,

    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Explicit total; defaults to mcq + essay. Ignored in remote mode."
    )]
    pub total: Option<String>,

    #[arg(long, default_value = "", allow_hyphen_values = true, help = "Completion percentage.")]
    pub completion: String,
}

impl ExamFields {
    pub fn to_form(&self) -> ExamForm {
        ExamForm {
            paper: self.paper.clone(),
            mcq: self.mcq.clone(),
            essay: self.essay.clone(),
            total: self.total.clone(),
            completion: self.completion.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct FocusArgs {
    #[command(subcommand)]
    pub command: FocusSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum FocusSubcommands {
    #[command(about = "Record a finished focus session.")]
    Log {
        #[arg(help = "Session length in minutes.")]
        minutes: u32,
    },
    #[command(about = "Show focus totals and breakdowns.")]
    Stats {
        #[arg(long, value_enum, default_value_t = RangeArg::Day, help = "Chart window.")]
        range: RangeArg,
        #[arg(long, help = "Render as JSON.")]
        json: bool,
    },
    #[command(about = "Run the focus/break timer in this terminal.")]
    Run {
        #[arg(long, default_value_t = 1, help = "Focus sessions to complete before exiting.")]
        sessions: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RangeArg {
    Day,
    Week,
    Month,
}

impl From<RangeArg> for Range {
    fn from(value: RangeArg) -> Self {
        match value {
            RangeArg::Day => Range::Day,
            RangeArg::Week => Range::Week,
            RangeArg::Month => Range::Month,
        }
    }
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum, help = "Shell to generate for.")]
    pub shell: Shell,
}
