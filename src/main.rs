//! `vss2git` entry point: parses the CLI surface, wires a
//! [`vss2git::dump::DumpDirectorySource`] and a real `git` subprocess into
//! the [`vss2git::engine::Engine`], and reports a human-readable summary.
//!
//! `--extract-file` is the one flag that bypasses the engine entirely: it
//! fetches a single file's bytes at a single revision and writes them to
//! disk, useful for debugging content-id mismatches without running a whole
//! conversion.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vss2git::authors::AuthorsMap;
use vss2git::cli::Cli;
use vss2git::config::ConfigModel;
use vss2git::context::RunContext;
use vss2git::dump::DumpDirectorySource;
use vss2git::engine::Engine;
use vss2git::errors::GitError;
use vss2git::gitio::GitSubprocess;
use vss2git::revision::VssSource;
use vss2git::sha1map::Sha1Map;

/// Bounded parallelism for the content pipeline's hash worker pool
/// (default of 8).
const DEFAULT_CONTENT_WORKERS: usize = 8;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let ctx = match cli.into_run_context() {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("vss2git: {err}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&ctx);

    match run(&ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("vss2git: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Builds a reproducible logging filter from `--verbose`/`--quiet` rather
/// than `RUST_LOG`, so behavior doesn't depend on the caller's environment.
/// When `--log <file>` is set, output is written to that file instead of
/// stderr, with ANSI color codes disabled.
fn init_logging(ctx: &RunContext) {
    let mut directives = vec!["vss2git=info".to_owned()];
    if ctx.quiet {
        directives = vec!["vss2git=warn".to_owned()];
    } else {
        if ctx.verbose.dump {
            directives.push("vss2git::dump=debug".to_owned());
        }
        if ctx.verbose.revs {
            directives.push("vss2git::revision=debug".to_owned());
        }
        if ctx.verbose.commits {
            directives.push("vss2git::engine=debug".to_owned());
        }
        if ctx.verbose.format_verbose {
            directives.push("vss2git::content=trace".to_owned());
        } else if ctx.verbose.format {
            directives.push("vss2git::content=debug".to_owned());
        }
    }

    let filter = directives
        .into_iter()
        .fold(EnvFilter::new(""), |filter, directive| filter.add_directive(directive.parse().unwrap()));

    let subscriber = tracing_subscriber::fmt().with_target(false).without_time().with_env_filter(filter);

    let init_result = match &ctx.log {
        Some(path) => match std::fs::File::create(path) {
            Ok(file) => subscriber
                .with_ansi(false)
                .with_writer(move || file.try_clone().expect("clone log file handle"))
                .try_init(),
            Err(err) => {
                eprintln!("vss2git: cannot open log file {path:?} ({err}); logging to stderr instead");
                subscriber.try_init()
            }
        },
        None => subscriber.try_init(),
    };
    let _ = init_result;
}

fn run(ctx: &RunContext) -> Result<(), GitError> {
    if let Some((path, rev, dest)) = &ctx.extract_file {
        return extract_file(ctx, path, *rev, dest);
    }

    let config_bytes = ctx.config_path.as_deref().map(std::fs::read).transpose().map_err(|e| {
        GitError::ConfigError(format!("cannot read config {:?}: {e}", ctx.config_path))
    })?;
    let config = ConfigModel::load(config_bytes.as_deref(), ctx)?;

    let authors = match &ctx.authors_map {
        Some(path) => AuthorsMap::load(path)?,
        None => AuthorsMap::default(),
    };

    let sha1_map = ctx.sha1_map.as_deref().map(Sha1Map::load).transpose()?;

    vss2git::gitio::subprocess::discover_git_dir(&ctx.target_repository).map_err(|e| {
        GitError::GitWriteError(format!(
            "{:?} is not a git repository ({e}); initialize it with `git init` first",
            ctx.target_repository
        ))
    })?;
    let writer = std::sync::Arc::new(GitSubprocess::new(ctx.target_repository.clone()));

    let mut source = DumpDirectorySource::open(&ctx.dump_directory)?;

    let mut engine = Engine::new(&config, ctx, &authors, writer.clone(), DEFAULT_CONTENT_WORKERS, sha1_map);
    let run_summary = engine.run(&mut source as &mut dyn VssSource)?;

    if let Some(path) = &ctx.make_authors_map {
        AuthorsMap::write_template(path, &run_summary.distinct_authors)?;
        info!("wrote authors-map template to {path:?}");
    }

    let summary = engine.finish(writer.as_ref())?;
    info!(
        "wrote {} commit(s), {} tag(s), pruned {} ref(s)",
        summary.commits_written, summary.tags_written, summary.refs_pruned
    );
    Ok(())
}

/// `--extract-file <vss-path>,r<rev> <dest>`: fetches one
/// file's bytes at one revision via the dump source's `fetch` call, bypassing
/// the mapper, branch state machine, and content pipeline entirely.
fn extract_file(ctx: &RunContext, path: &str, rev: u64, dest: &std::path::Path) -> Result<(), GitError> {
    let mut source = DumpDirectorySource::open(&ctx.dump_directory)?;
    let mut content_id = None;
    while let Some(revision) = source.next_revision()? {
        if revision.number > rev {
            break;
        }
        for op in &revision.operations {
            match op {
                vss2git::revision::ChangeOp::AddFile { path: p, content_id: id }
                | vss2git::revision::ChangeOp::ModifyFile { path: p, content_id: id }
                    if p == path =>
                {
                    content_id = Some(id.clone());
                }
                _ => {}
            }
        }
    }
    let content_id = content_id
        .ok_or_else(|| GitError::ParserError(format!("no AddFile/ModifyFile for {path} at or before r{rev}")))?;
    let bytes = source.fetch(&content_id)?;
    std::fs::write(dest, bytes).map_err(|e| GitError::CustomError(format!("cannot write {dest:?}: {e}")))
}
