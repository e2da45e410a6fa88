//! CLI command definitions.

use clap::{Args, Parser, Subcommand};
use lumiere::{LumiereResult, RunConfig, load_topic_list};
use std::path::PathBuf;

/// Lumiere - generate narrated lecture videos from topics
#[derive(Parser, Debug)]
#[command(name = "lumiere")]
#[command(about = "Generate narrated lecture videos from topics", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file to layer over the bundled defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate lecture videos
    Run(RunArgs),

    /// Score finished lecture videos
    Evaluate(EvaluateArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Where topics come from.
#[derive(Args, Debug, Clone)]
pub struct TopicArgs {
    /// A single topic, e.g. "Binary search"
    #[arg(long, conflicts_with = "topics_file", required_unless_present = "topics_file")]
    pub topic: Option<String>,

    /// JSON file holding an array of topic strings
    #[arg(long)]
    pub topics_file: Option<PathBuf>,

    /// Only take the first N topics
    #[arg(long)]
    pub max_topics: Option<usize>,
}

impl TopicArgs {
    /// Topic descriptions in the order given.
    pub fn descriptions(&self) -> LumiereResult<Vec<String>> {
        match (&self.topic, &self.topics_file) {
            (Some(topic), _) => Ok(vec![topic.trim().to_string()]),
            (None, Some(path)) => load_topic_list(path),
            (None, None) => Ok(Vec::new()),
        }
    }
}

/// Budget overrides for one run.
#[derive(Args, Debug, Clone, Default)]
pub struct BudgetArgs {
    /// Code versions a section may try
    #[arg(long)]
    pub max_regenerate_tries: Option<u32>,

    /// Repairs per code version
    #[arg(long)]
    pub max_fix_bug_tries: Option<u32>,

    /// Revision attempts per critique round
    #[arg(long)]
    pub max_feedback_gen_code_tries: Option<u32>,

    /// Repairs per revision attempt
    #[arg(long)]
    pub max_mllm_fix_bugs_tries: Option<u32>,

    /// Critique rounds per section
    #[arg(long)]
    pub feedback_rounds: Option<u32>,

    /// Output token cap for code requests
    #[arg(long)]
    pub max_code_tokens: Option<u32>,
}

impl BudgetArgs {
    /// Overlay the given overrides on `config`.
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(v) = self.max_regenerate_tries {
            config = config.with_max_regenerate_tries(v);
        }
        if let Some(v) = self.max_fix_bug_tries {
            config = config.with_max_fix_bug_tries(v);
        }
        if let Some(v) = self.max_feedback_gen_code_tries {
            config = config.with_max_feedback_gen_code_tries(v);
        }
        if let Some(v) = self.max_mllm_fix_bugs_tries {
            config = config.with_max_mllm_fix_bugs_tries(v);
        }
        if let Some(v) = self.feedback_rounds {
            config = config.with_feedback_rounds(v);
        }
        if let Some(v) = self.max_code_tokens {
            config = config.with_max_code_tokens(v);
        }
        config
    }
}

/// Arguments of `lumiere run`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Topics to generate
    #[command(flatten)]
    pub topics: TopicArgs,

    /// Output directory (defaults to pipeline.output_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Skip the critique loop
    #[arg(long)]
    pub no_feedback: bool,

    /// Run topic batches in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Topics per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Batches running at once
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Budget overrides
    #[command(flatten)]
    pub budgets: BudgetArgs,
}

/// Arguments of `lumiere evaluate`
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Topics whose videos to score
    #[command(flatten)]
    pub topics: TopicArgs,

    /// Directory holding the generated videos (defaults to pipeline.output_dir)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Videos scored at once
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Write the markdown report here instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,
}
