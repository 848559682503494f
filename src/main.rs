use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use jira_test_reporter_lib::{
    init_logging, run, settings::validate_project_key, BuildResults, JobSettings,
    PipelineOptions, RetryPolicy, RunRequest, SettingsManager,
};
use log::{error, info};

#[derive(Parser, Debug)]
#[command(name = "jira-test-reporter", version, about = "File Jira issues for failing tests")]
struct Cli {
    /// Build results JSON exported by the build system
    #[arg(long, value_name = "FILE")]
    results: PathBuf,

    /// Jira project key issues are filed in
    #[arg(long, env = "JIRA_PROJECT")]
    project: String,

    /// Component attached to every issue
    #[arg(long, default_value = "")]
    component: String,

    /// File an issue for every failure, not only new ones
    #[arg(long)]
    create_all: bool,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[arg(long, env = "JIRA_URL")]
    server: Option<String>,

    #[arg(long, env = "JIRA_USER")]
    username: Option<String>,

    #[arg(long, env = "JIRA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long)]
    debug: bool,

    #[arg(long)]
    verbose: bool,

    /// Maximum concurrent submissions (1 to 8)
    #[arg(
        long,
        default_value_t = jira_test_reporter_lib::pipeline::DEFAULT_CONCURRENCY as u8,
        value_parser = clap::value_parser!(u8).range(1..=8)
    )]
    concurrency: u8,

    /// Stop starting new submissions after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,

    /// Extra attempts for transient network failures
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Persist server, credential and debug overrides to the settings file
    #[arg(long)]
    save_settings: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let manager = match &cli.settings {
        Some(path) => SettingsManager::with_path(path.clone()),
        None => match SettingsManager::new() {
            Ok(manager) => manager,
            Err(err) => {
                eprintln!("{}", err);
                return ExitCode::FAILURE;
            }
        },
    };

    let mut settings = manager.load();
    if let Some(server) = &cli.server {
        settings.server_address = server.clone();
    }
    if let Some(username) = &cli.username {
        settings.username = username.clone();
    }
    if let Some(password) = &cli.password {
        settings.password = password.clone();
    }
    settings.debug |= cli.debug;
    settings.verbose_debug |= cli.verbose;
    init_logging(&settings);

    if cli.save_settings {
        match manager.save(&settings) {
            Ok(()) => info!("Saved settings to {}", manager.path().display()),
            Err(err) => error!("Could not save settings: {}", err),
        }
    }

    if let Err(message) = validate_project_key(&cli.project) {
        error!("{}", message);
        return ExitCode::FAILURE;
    }

    let results = match BuildResults::load(&cli.results).await {
        Ok(results) => results,
        Err(err) => {
            error!("Could not read {}: {}", cli.results.display(), err);
            return ExitCode::FAILURE;
        }
    };

    let mut options = PipelineOptions::default()
        .with_concurrency(usize::from(cli.concurrency))
        .with_request_timeout(settings.request_timeout())
        .with_retry(RetryPolicy::exponential(
            cli.retries.saturating_add(1),
            Duration::from_millis(jira_test_reporter_lib::retry::DEFAULT_BASE_DELAY_MS),
        ));
    if let Some(secs) = cli.deadline_secs {
        options = options.with_deadline(Duration::from_secs(secs));
    }

    let request = RunRequest {
        results,
        job: JobSettings {
            project_key: cli.project,
            component: cli.component,
            create_all: cli.create_all,
        },
        settings,
        options,
    };

    match run(request).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
