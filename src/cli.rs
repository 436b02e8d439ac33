use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use crate::model::{Difficulty, EventStatus, QuestionStatus};

#[derive(Parser, Debug)]
#[command(
    name = "trivia-import",
    version,
    about = "Quiz archive import, difficulty classification and round composition tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sanitize archive files and append them to the staging table.
    Import(ImportArgs),
    /// Resolve categories and normalize staged records into trivia questions.
    Transform(TransformArgs),
    Event(EventArgs),
    Round(RoundArgs),
    Slot(SlotArgs),
    UserQuestion(UserQuestionArgs),
    /// Print the normalized questions of a round.
    View(ViewArgs),
    Status(StatusArgs),
    /// Audit the database against the composition invariants.
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".cache/trivia")]
    pub cache_root: PathBuf,

    #[arg(long, env = "TRIVIA_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl StoreArgs {
    pub fn manifest_dir(&self) -> PathBuf {
        self.cache_root.join("manifests")
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("trivia.sqlite"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Tab-separated archive files, loaded one transaction per file.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    #[arg(long, default_value = "default")]
    pub scope: String,

    #[arg(long, default_value_t = 6)]
    pub header_lines: usize,

    #[arg(long, value_enum, default_value_t = SourceEncoding::Utf8)]
    pub source_encoding: SourceEncoding,

    #[arg(long)]
    pub cleaned_dir: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

impl SourceEncoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TransformArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value = "default")]
    pub scope: String,

    #[arg(long, default_value_t = false)]
    pub keep_staging: bool,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub action: EventAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EventAction {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        creator: i64,
        #[arg(long)]
        event_date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Status {
        #[arg(long)]
        id: i64,
        #[arg(long, value_enum)]
        to: EventStatus,
    },
    /// Mark an event deleted without touching its status.
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// Remove an event together with its rounds and slots.
    Purge {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RoundArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub action: RoundAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RoundAction {
    Create {
        #[arg(long)]
        event: i64,
        #[arg(long)]
        number: Option<i64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        category: Option<i64>,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SlotArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub action: SlotAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SlotAction {
    #[command(group(ArgGroup::new("source").required(true).args(["preset", "user"])))]
    Add {
        #[arg(long)]
        round: i64,
        #[arg(long)]
        number: i64,
        #[arg(long)]
        preset: Option<i64>,
        #[arg(long)]
        user: Option<i64>,
    },
    #[command(group(ArgGroup::new("source").required(true).args(["preset", "user"])))]
    Replace {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        preset: Option<i64>,
        #[arg(long)]
        user: Option<i64>,
    },
    Remove {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UserQuestionArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub action: UserQuestionAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum UserQuestionAction {
    Create {
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
        #[arg(long, value_enum)]
        difficulty: Difficulty,
        #[arg(long)]
        category: Option<i64>,
        #[arg(long)]
        creator: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    Moderate {
        #[arg(long)]
        id: i64,
        #[arg(long, value_enum)]
        status: QuestionStatus,
    },
    /// Hard-delete a question that no round slot references.
    Purge {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub round: i64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub report_path: Option<PathBuf>,
}
