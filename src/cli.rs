// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
pub struct BaseOptions {
    /// Path to `base-config.json`
    ///
    /// If unset, `/etc/laniakea/base-config.json` is tried first, then a
    /// `data/base-config.json` directory beside the executable.
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Force download of files even if a cached copy looks current.
    #[clap(long)]
    pub force_download: bool,
    /// Force processing even where an engine would otherwise skip.
    #[clap(short, long = "force")]
    pub force_processing: bool,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Parser)]
pub struct LaniakeaOptions {
    #[clap(flatten)]
    pub base_options: BaseOptions,
    #[clap(subcommand)]
    pub command: LaniakeaCommands,
}

#[derive(Debug, Subcommand)]
pub enum LaniakeaCommands {
    /// Synchronize packages from an upstream suite
    Synchrotron(SynchrotronOptions),
    /// Run a migration ("britney") pass
    Spears(SpearsOptions),
    /// Run installability/build-dependency checks
    Debcheck(DebcheckOptions),
    /// Inspect or manage the job queue
    Jobs(JobsOptions),
}

#[derive(Debug, Parser)]
pub struct SynchrotronOptions {
    #[clap(subcommand)]
    pub command: SynchrotronCommands,
}

#[derive(Debug, Subcommand)]
pub enum SynchrotronCommands {
    /// Synchronize specific packages by name
    SyncPackages {
        /// Target suite name
        #[clap(long)]
        target: String,
        /// Archive component, e.g. "main"
        #[clap(long, default_value = "main")]
        component: String,
        /// Package names to synchronize
        names: Vec<String>,
    },
    /// Reconcile an entire target suite against its source
    AutoSync {
        /// Target suite name
        #[clap(long)]
        target: String,
        /// Archive component, e.g. "main"
        #[clap(long, default_value = "main")]
        component: String,
        /// Skip cruft removal
        #[clap(long)]
        no_remove_cruft: bool,
    },
}

#[derive(Debug, Parser)]
pub struct SpearsOptions {
    #[clap(subcommand)]
    pub command: SpearsCommands,
}

#[derive(Debug, Subcommand)]
pub enum SpearsCommands {
    /// Regenerate a migration's britney configuration
    UpdateConfig {
        /// Source suites, joined with '+' if there are several
        #[clap(long)]
        sources: String,
        /// Target suite
        #[clap(long)]
        target: String,
    },
    /// Run a configured migration end to end
    RunMigration {
        /// Source suites, joined with '+' if there are several
        #[clap(long)]
        sources: String,
        /// Target suite
        #[clap(long)]
        target: String,
    },
}

#[derive(Debug, Parser)]
pub struct DebcheckOptions {
    /// Suite to check
    pub suite: String,
    /// Parent suite name, if this suite overlays one
    #[clap(long)]
    pub parent: Option<String>,
    /// Only run the build-dependency check, skipping installability
    #[clap(long)]
    pub build_dep_only: bool,
}

#[derive(Debug, Parser)]
pub struct JobsOptions {
    #[clap(subcommand)]
    pub command: JobsCommands,
}

#[derive(Debug, Subcommand)]
pub enum JobsCommands {
    /// List jobs not yet in a terminal status
    ListPending {
        /// Restrict to a single module
        #[clap(long)]
        module: Option<String>,
    },
    /// Record a worker's liveness ping
    Ping {
        /// Worker uuid
        worker: uuid::Uuid,
    },
}
