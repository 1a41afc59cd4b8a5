use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::{
    data_dir::DataDir,
    error::Result,
    lexical::MatchMode,
    retriever::{BackendPreference, RetrieverOptions},
    skills::SkillSet,
};

#[derive(Debug, Parser)]
#[command(
    name = "folio",
    about = "Match job skills against your portfolio and return evidence links"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Portfolio CSV with Techstack and Links columns
    #[arg(long, global = true)]
    pub catalogue: Option<PathBuf>,

    /// Directory of the persistent semantic index
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Override the ColBERT model ID or local model path
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Which retrieval backend to use
    #[arg(long, value_enum, default_value_t = BackendArg::Auto, global = true)]
    pub backend: BackendArg,

    /// Only return links whose tech stack overlaps the skills (lexical)
    #[arg(long, global = true)]
    pub strict: bool,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolve retriever options from flags, environment and defaults.
    pub fn retriever_options(&self) -> Result<RetrieverOptions> {
        let data_dir = DataDir::resolve(self.data_dir.as_deref())?;

        Ok(RetrieverOptions {
            catalogue_path: data_dir.catalogue_path(self.catalogue.as_deref()),
            store_dir: data_dir.store_dir(self.store.as_deref()),
            model_id: self.model.clone(),
            backend: self.backend.into(),
            mode: if self.strict {
                MatchMode::StrictOverlap
            } else {
                MatchMode::BestAvailable
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Semantic index when available, lexical matcher otherwise
    Auto,
    /// Lexical matcher only
    Lexical,
}

impl From<BackendArg> for BackendPreference {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => BackendPreference::Auto,
            BackendArg::Lexical => BackendPreference::Lexical,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Find evidence links for a set of skills
    Query(QueryArgs),
    /// Populate the semantic index if it is empty
    Index,
    /// Clear the semantic index and rebuild it from the catalogue
    Reindex,
    /// Show which backend is active and how many entries it holds
    Status(StatusArgs),
    /// Find evidence links for every job in an extraction JSON file
    Jobs(JobsArgs),
    /// Start MCP server for AI agent integration
    Mcp,
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Query --

#[derive(Debug, Parser)]
pub struct QueryArgs {
    /// Skills: one comma-separated string, or several separate skills
    #[arg(required = true)]
    pub skills: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Also print the lexical score of every catalogue row
    #[arg(long)]
    pub explain: bool,
}

impl QueryArgs {
    /// A single argument is split on commas; several are taken as a list.
    pub fn skill_set(&self) -> SkillSet {
        match self.skills.as_slice() {
            [single] => SkillSet::parse(single),
            many => SkillSet::from_terms(many),
        }
    }
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Jobs --

#[derive(Debug, Parser)]
pub struct JobsArgs {
    /// JSON file with one extracted job object or an array of them
    pub file: PathBuf,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "folio",
            &mut std::io::stdout(),
        );
    }
}
