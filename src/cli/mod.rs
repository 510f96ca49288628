use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "linearday",
    about = "Personal time-tracking journal with AI day summaries"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log an activity. Defaults to the previous full hour of today.
    Add {
        /// Activity description
        #[arg(required = true, num_args = 1..)]
        description: Vec<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long, default_value = "Work")]
        category: String,
    },
    /// Show the timeline for a day
    List {
        #[arg(long)]
        date: Option<String>,
        /// Days to move from the date, e.g. -1 for the day before
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        offset: i64,
    },
    /// Change the times, description or category of an entry
    Update {
        id: i64,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete an entry. Deleting a missing id does nothing
    Delete {
        id: i64,
    },
    /// Show or set daily and weekly goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Generate an AI summary of a day
    Summary {
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the local JSON API
    Serve,
    /// Read or change config.json values
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// AI provider utilities
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    /// Check config, database and AI setup
    Doctor,
}

#[derive(Debug, Subcommand)]
pub enum GoalCommands {
    /// Show or set the goal for a day
    Daily {
        goal: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Show or set the goal for the week containing a day
    Weekly {
        goal: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Set a value, e.g. `config set ai.model gemini-2.5-flash`
    Set { key: String, value: String },
    /// Print a value. The API key is masked
    Get { key: String },
}

#[derive(Debug, Subcommand)]
pub enum AiCommands {
    /// Send a short request and report any error
    Test {
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}
