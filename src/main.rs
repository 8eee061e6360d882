//! commitsmith - CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commitsmith::config::{
    CommitMode, default_config_path, init_user_config, load_repo_config, load_user_config,
};
use commitsmith::context::{build_for_files, build_request, repo_relative_paths};
use commitsmith::error::ContextError;
use commitsmith::git::{GitCli, check_git_installed};
use commitsmith::llm::new_provider;
use commitsmith::plan::{
    CommitPlan, ExecutedCommit, Executor, filter_sensitive_files, is_sensitive, reverse,
    validate_plan,
};

/// Split uncommitted changes into Conventional Commits planned by an LLM.
#[derive(Parser, Debug)]
#[command(name = "commitsmith")]
#[command(about = "Split uncommitted changes into Conventional Commits planned by an LLM")]
#[command(version)]
struct Cli {
    /// Only consider staged changes
    #[arg(long, conflicts_with = "paths")]
    staged: bool,

    /// Plan and print the commits without creating them
    #[arg(long)]
    dry_run: bool,

    /// Undo the last N commits, keeping their changes unstaged (default 1)
    #[arg(
        long,
        value_name = "N",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "1"
    )]
    reverse: Option<usize>,

    /// Allow --reverse on commits that are already pushed
    #[arg(long, requires = "reverse")]
    force: bool,

    /// Override the configured provider for this run
    #[arg(long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Grouping strategy (overrides COMMIT_DEFAULT_MODE)
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Write a template user config and exit
    #[arg(long, exclusive = true)]
    init: bool,

    /// Show scope resolution and the plan before committing
    #[arg(short, long)]
    verbose: bool,

    /// Restrict planning to these files or directories
    paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Smart,
    Single,
}

impl From<ModeArg> for CommitMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Smart => CommitMode::Smart,
            ModeArg::Single => CommitMode::Single,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_no_changes(&e) => {
            println!("Nothing to commit. Working tree is clean.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout carries only plan output.
fn init_tracing(verbose: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(log_filter(verbose, rust_log.as_deref()))
        .try_init();
}

/// `RUST_LOG` replaces the warn default when set; `--verbose` adds debug
/// output for this crate on top of either.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let filter = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    if verbose {
        match "commitsmith=debug".parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    } else {
        filter
    }
}

fn is_no_changes(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ContextError>(),
        Some(ContextError::NoChanges)
    )
}

async fn run(cli: Cli) -> Result<()> {
    if cli.init {
        let path = default_config_path()?;
        init_user_config(&path)?;
        println!("Wrote config template to {}", path.display());
        println!("Fill in your provider credentials, then run commitsmith again.");
        return Ok(());
    }

    // Step 1: Locate the repository
    check_git_installed()?;
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let gateway = GitCli::open(&cwd)?;

    if let Some(count) = cli.reverse {
        reverse(&gateway, count, cli.force)?;
        println!("✓ Reversed {} commit(s). Changes are now unstaged.", count);
        return Ok(());
    }

    // Step 2: Load configuration
    let user_config = load_user_config(&default_config_path()?, cli.provider.as_deref())?;
    let repo_config = load_repo_config(gateway.root())?;
    let mode = cli.mode.map_or(user_config.default_mode, CommitMode::from);
    let dry_run = cli.dry_run || user_config.dry_run;

    // Step 3: Snapshot the changes
    let request = if cli.paths.is_empty() {
        build_request(&gateway, cli.staged, &repo_config, mode)?
    } else {
        let paths = repo_relative_paths(gateway.root(), &cwd, &cli.paths);
        build_for_files(&gateway, &paths, &repo_config, mode)?
    };

    if cli.verbose {
        eprintln!("Scopes:");
        for file in &request.files {
            let scope = if file.scope.is_empty() { "-" } else { &file.scope };
            eprintln!("  {} -> {}", file.path, scope);
        }
    }

    // Step 4: Ask the provider for a plan
    let provider = new_provider(&user_config)?;
    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    println!(
        "Planning {} file(s) with {} ({}, {} mode)...",
        request.files.len(),
        provider.name(),
        provider.model(),
        mode.as_str()
    );

    let mut plan = provider
        .analyze(&cancel, &request)
        .await
        .context("Failed to plan commits")?;

    // Step 5: Validate, then drop sensitive files
    let working_set = request.paths();
    let report = validate_plan(&plan, &repo_config, &working_set, mode);
    if !report.valid {
        bail!("{}", report);
    }

    let mut excluded = filter_sensitive_files(&mut plan);
    for path in working_set.iter().filter(|p| is_sensitive(p)) {
        if !excluded.contains(path) {
            excluded.push(path.clone());
        }
    }
    for path in &excluded {
        println!("⚠ Excluded sensitive file: {}", path);
    }

    if plan.commits.is_empty() {
        println!("Nothing left to commit after excluding sensitive files.");
        return Ok(());
    }

    if cli.verbose {
        print_plan_preview(&plan);
    }

    // Step 6: Record the commits
    let executor = Executor::new(&gateway, dry_run)
        .with_rename_sources(request.rename_sources())
        .with_cancellation(cancel);

    let executed = match executor.run(&plan, |current, total, commit| {
        if !dry_run {
            println!("[{}/{}] {}", current, total, commit.subject());
        }
    }) {
        Ok(executed) => executed,
        Err(e) => {
            if !e.executed().is_empty() {
                println!("Created before the failure:");
                print_summary(e.executed(), false);
            }
            return Err(e.into());
        }
    };

    if dry_run {
        println!("\n--- Dry Run: {} commit(s) planned ---\n", executed.len());
        print_summary(&executed, true);
    } else {
        println!("\n✓ Created {} commit(s)", executed.len());
        print_summary(&executed, false);
    }

    Ok(())
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            token.cancel();
        }
    });
}

fn print_plan_preview(plan: &CommitPlan) {
    eprintln!("Plan:");
    for (i, commit) in plan.commits.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, commit.subject());
        for file in &commit.files {
            eprintln!("       {}", file);
        }
    }
}

fn print_summary(executed: &[ExecutedCommit], dry_run: bool) {
    for done in executed {
        if dry_run {
            println!("{}", done.commit.subject());
            for file in &done.commit.files {
                println!("    {}", file);
            }
            if let Some(body) = done.commit.body.as_deref().filter(|b| !b.trim().is_empty()) {
                println!();
                for line in body.lines() {
                    println!("    {}", line);
                }
            }
            println!();
        } else {
            println!("{} {}", done.short_hash(), done.commit.subject());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_warn() {
        assert_eq!(log_filter(false, None).to_string(), "warn");
        assert_eq!(log_filter(false, Some("  ")).to_string(), "warn");
    }

    #[test]
    fn test_log_filter_keeps_rust_log_level() {
        let filter = log_filter(false, Some("debug")).to_string();
        assert_eq!(filter, "debug");
        assert!(!filter.contains("warn"));
    }

    #[test]
    fn test_log_filter_verbose_adds_crate_debug() {
        let filter = log_filter(true, None).to_string();
        assert!(filter.contains("commitsmith=debug"));
        assert!(filter.contains("warn"));

        let filter = log_filter(true, Some("info")).to_string();
        assert!(filter.contains("commitsmith=debug"));
        assert!(filter.contains("info"));
        assert!(!filter.contains("warn"));
    }

    #[test]
    fn test_cli_reverse_defaults_to_one() {
        let cli = Cli::try_parse_from(["commitsmith", "--reverse"]).unwrap();
        assert_eq!(cli.reverse, Some(1));
    }

    #[test]
    fn test_cli_reverse_with_count() {
        let cli = Cli::try_parse_from(["commitsmith", "--reverse=3", "--force"]).unwrap();
        assert_eq!(cli.reverse, Some(3));
        assert!(cli.force);
    }

    #[test]
    fn test_cli_reverse_does_not_swallow_paths() {
        let cli = Cli::try_parse_from(["commitsmith", "--reverse", "src/"]).unwrap();
        assert_eq!(cli.reverse, Some(1));
        assert_eq!(cli.paths, vec!["src/"]);
    }

    #[test]
    fn test_cli_force_requires_reverse() {
        assert!(Cli::try_parse_from(["commitsmith", "--force"]).is_err());
    }

    #[test]
    fn test_cli_mode_and_paths() {
        let cli =
            Cli::try_parse_from(["commitsmith", "--mode", "single", "-v", "src/a.rs", "docs"])
                .unwrap();
        assert!(matches!(cli.mode, Some(ModeArg::Single)));
        assert!(cli.verbose);
        assert_eq!(cli.paths, vec!["src/a.rs", "docs"]);
    }

    #[test]
    fn test_cli_init_is_exclusive() {
        assert!(Cli::try_parse_from(["commitsmith", "--init", "--dry-run"]).is_err());
    }

    #[test]
    fn test_no_changes_detected_through_context() {
        let err = anyhow::Error::from(ContextError::NoChanges).context("while planning");
        assert!(is_no_changes(&err));
        assert!(!is_no_changes(&anyhow::anyhow!("other")));
    }
}
