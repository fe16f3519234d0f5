// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

mod cli;
mod config;
mod debcheck;
mod error;
mod jobs;
mod repository;
mod signed_file;
mod spears;
mod store;
mod synchrotron;
mod tools;

use cli::{
    BaseOptions, DebcheckOptions, JobsCommands, JobsOptions, LaniakeaCommands, LaniakeaOptions,
    SpearsCommands, SpearsOptions, SynchrotronCommands, SynchrotronOptions,
};
use error::LaniakeaError;
use repository::{RepoLocation, Repository};
use store::Store;

/// Build a [Repository] handle for a [laniakea_core::synchrotron::SyncSource],
/// trusting its `InRelease` only if keyrings are configured for it.
fn source_repository(
    base: &BaseOptions,
    config: &laniakea_core::config::BaseConfig,
    source: &laniakea_core::synchrotron::SyncSource,
    source_name: &str,
    keyring_names: &[String],
) -> Repository {
    let location = if source.repo_url.contains("://") {
        RepoLocation::Remote { url: source.repo_url.clone(), cache_dir: config.cache_location.clone().into() }
    } else {
        RepoLocation::Local(PathBuf::from(&source.repo_url))
    };
    let keyrings: Vec<PathBuf> = keyring_names
        .iter()
        .map(|name| Path::new(&config.synchrotron.source_keyring_dir).join(name))
        .collect();
    let trusted = keyrings.is_empty();
    Repository::new(source_name.to_string(), location, trusted, keyrings, base.force_download)
}

async fn run_synchrotron(base: &BaseOptions, opts: SynchrotronOptions, config: &laniakea_core::config::BaseConfig) -> Result<()> {
    let location = match (&config.archive.path, &config.archive.url) {
        (Some(path), _) => RepoLocation::Local(path.into()),
        (None, Some(url)) => RepoLocation::Remote { url: url.clone(), cache_dir: config.cache_location.clone().into() },
        (None, None) => return Err(LaniakeaError::Config("no archive location configured".to_string()).into()),
    };
    let mut target_repo = Repository::new("archive", location, true, Vec::new(), base.force_download);
    let store = Store::connect(&config.database).await?;

    let sync_config = synchrotron::store::load_config(&store).await?;
    let distro_tag = synchrotron::store::load_distro_tag(&store).await?;
    let blacklist = synchrotron::store::load_blacklist(&store).await?;
    let mut source_repo = source_repository(
        base,
        config,
        &sync_config.source,
        &sync_config.source_name,
        &sync_config.source_keyrings,
    );
    let architectures = vec!["amd64".to_string()];
    let source_suite = sync_config.source.default_suite.clone();

    match opts.command {
        SynchrotronCommands::SyncPackages { target, component, names } => {
            let sources = source_repo.source_packages(&source_suite, &component).await?;
            let target_sources = target_repo.source_packages(&target, &component).await?;
            let targets = repository::newest_per_name(&target_sources, |p| p.name.as_ref(), |p| &p.version);

            let source_binaries = source_repo.binary_packages_by_arch(&source_suite, &component, &architectures).await?;
            let target_binaries = target_repo.binary_packages_by_arch(&target, &component, &architectures).await?;

            let engine = synchrotron::Synchrotron::new(sync_config.source_name.clone(), target, distro_tag, blacklist);
            let ok = engine
                .sync_packages(
                    &component,
                    &architectures,
                    &sources,
                    &targets,
                    &source_binaries,
                    &target_binaries,
                    &names,
                    base.force_processing,
                )
                .await?;
            if !ok {
                error!("synchrotron: sync_packages failed");
            }
        }
        SynchrotronCommands::AutoSync { target, component, no_remove_cruft } => {
            let sources = source_repo.source_packages(&source_suite, &component).await?;
            let target_sources = target_repo.source_packages(&target, &component).await?;
            let newest_targets = repository::newest_per_name(&target_sources, |p| p.name.as_ref(), |p| &p.version);
            let targets = newest_targets
                .into_iter()
                .map(|(name, package)| {
                    let is_native = package.version.is_native();
                    (name, (package.version, is_native))
                })
                .collect();

            let source_binaries = source_repo.binary_packages_by_arch(&source_suite, &component, &architectures).await?;
            let target_binaries = target_repo.binary_packages_by_arch(&target, &component, &architectures).await?;

            let engine = synchrotron::Synchrotron::new(sync_config.source_name.clone(), target, distro_tag, blacklist);
            let (ok, issues) = engine
                .auto_sync(&component, &architectures, &sources, &targets, &source_binaries, &target_binaries, !no_remove_cruft)
                .await?;
            if !ok {
                error!("synchrotron: auto_sync failed");
            }
            for issue in &issues {
                log::warn!("{:?}: {} ({})", issue.kind, issue.package_name, issue.details);
                synchrotron::store::record_issue(&store, issue).await?;
            }
        }
    }
    Ok(())
}

async fn run_spears(_base: &BaseOptions, opts: SpearsOptions, config: &laniakea_core::config::BaseConfig) -> Result<()> {
    let archive_root = config.archive.path.clone().unwrap_or_default();
    let engine = spears::SpearsEngine::new(config.workspace.clone().into(), archive_root.into());

    match opts.command {
        SpearsCommands::UpdateConfig { sources, target } => {
            let entry = laniakea_core::spears::SpearsConfigEntry {
                source_suites: sources.split('+').map(str::to_string).collect(),
                target_suite: target,
                delays: Default::default(),
                hints: Vec::new(),
            };
            engine.update_config(&entry).await?;
        }
        SpearsCommands::RunMigration { sources, target } => {
            let store = Store::connect(&config.database).await?;
            let entry = laniakea_core::spears::SpearsConfigEntry {
                source_suites: sources.split('+').map(str::to_string).collect(),
                target_suite: target.clone(),
                delays: Default::default(),
                hints: Vec::new(),
            };
            let migration_id = entry.migration_id();
            let (ok, excuses) = engine
                .run_migration(&[entry], &sources, &target, &["main".to_string()], &["amd64".to_string()], &Default::default())
                .await?;
            if !ok {
                error!("spears: migration {sources} -> {target} failed");
            }
            log::info!("spears: {} excuse(s) recorded", excuses.len());
            spears::store::replace_excuses(&store, &migration_id, &excuses).await?;
        }
    }
    Ok(())
}

async fn run_debcheck(_base: &BaseOptions, opts: DebcheckOptions, config: &laniakea_core::config::BaseConfig) -> Result<()> {
    let archive_root = config.archive.path.clone().unwrap_or_default();
    let suite = laniakea_core::archive::Suite {
        name: opts.suite.clone(),
        repo: "archive".to_string(),
        architectures: vec![laniakea_core::architectures::Architecture::new("amd64")?],
        components: vec![laniakea_core::archive::Component::new("main")],
        base_suite_name: opts.parent.clone(),
    };

    let store = Store::connect(&config.database).await?;

    let dep_issues = debcheck::get_dep_check_issues(&archive_root, &suite, None).await?;
    log::info!("debcheck: {} installability issue(s)", dep_issues.len());
    debcheck::store::replace_issues(&store, &suite.name, laniakea_core::debcheck::PackageKind::Binary, &dep_issues).await?;

    if !opts.build_dep_only {
        let build_issues = debcheck::get_build_dep_check_issues(&archive_root, &suite, None).await?;
        log::info!("debcheck: {} build-dependency issue(s)", build_issues.len());
        debcheck::store::replace_issues(&store, &suite.name, laniakea_core::debcheck::PackageKind::Source, &build_issues).await?;
    }
    Ok(())
}

async fn run_jobs(opts: JobsOptions, config: &laniakea_core::config::BaseConfig) -> Result<()> {
    let store = Store::connect(&config.database).await?;

    match opts.command {
        JobsCommands::ListPending { module } => {
            let pending = jobs::pending_jobs(&store, module.as_deref()).await?;
            for job in pending {
                println!("{} {:?} {} {}", job.uuid, job.status, job.module, job.trigger);
            }
        }
        JobsCommands::Ping { worker } => {
            jobs::update_worker_ping(&store, worker).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = LaniakeaOptions::parse();
    stderrlog::new()
        .module(module_path!())
        .verbosity(opts.base_options.verbose.log_level_filter())
        .init()
        .context("failed to initialize logging")?;

    let base_config = config::load_base_config(opts.base_options.config.as_ref())?;

    let result = match opts.command {
        LaniakeaCommands::Synchrotron(sync_opts) => run_synchrotron(&opts.base_options, sync_opts, &base_config).await,
        LaniakeaCommands::Spears(spears_opts) => run_spears(&opts.base_options, spears_opts, &base_config).await,
        LaniakeaCommands::Debcheck(debcheck_opts) => run_debcheck(&opts.base_options, debcheck_opts, &base_config).await,
        LaniakeaCommands::Jobs(jobs_opts) => run_jobs(jobs_opts, &base_config).await,
    };

    if let Err(err) = &result {
        error!("{err:#}");
        if let Some(laniakea_err) = err.downcast_ref::<LaniakeaError>() {
            std::process::exit(laniakea_err.exit_code());
        }
        std::process::exit(2);
    }
    Ok(())
}
