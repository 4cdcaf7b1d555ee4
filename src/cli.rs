use clap::{Args, Parser, Subcommand};

use go_indeps::frontend::go::LoadConfig;

#[derive(Debug, Parser)]
#[command(name = "go-indeps")]
#[command(about = "Map the internal dependencies of a Go package's declarations.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Which files of the package directory to load.
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Package directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub dir: String,

    /// Also load the package's own _test.go files
    #[arg(long)]
    pub include_tests: bool,

    /// Also load files excluded with a `//go:build ignore` constraint
    #[arg(long)]
    pub build_ignored: bool,
}

impl From<&LoadArgs> for LoadConfig {
    fn from(args: &LoadArgs) -> Self {
        LoadConfig {
            include_tests: args.include_tests,
            build_ignored: args.build_ignored,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the declaration dependency graph (Graphviz DOT by default)
    Graph {
        #[command(flatten)]
        load: LoadArgs,

        /// Drop declarations with no dependencies and no dependents
        #[arg(long)]
        prune: bool,
    },

    /// Declaration and edge counts summary
    Stats {
        #[command(flatten)]
        load: LoadArgs,
    },
}
