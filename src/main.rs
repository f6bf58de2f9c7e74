use anyhow::{bail, Result};
use campusmate::backend::{AssistantBackend, BackendError, HttpBackend};
use campusmate::config::Config;
use campusmate::console;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// campusmate - chat with your campus course assistant from the terminal.
#[derive(Parser, Debug)]
#[command(name = "campusmate")]
#[command(version)]
#[command(about = "Terminal chat client for your campus course assistant.", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat,
    /// List your active courses
    Courses,
    /// Check that the backend is reachable
    Doctor,
    /// Ask the backend process to shut down
    Shutdown {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the active configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging - respects RUST_LOG env var, defaults to INFO.
    // Logs go to stderr so they never interleave with chat output.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::load_or_init()?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => console::run(&config).await,
        Commands::Courses => list_courses(&config).await,
        Commands::Doctor => doctor(&config).await,
        Commands::Shutdown { yes } => shutdown(&config, yes).await,
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("# {}", config.config_path.display());
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn backend_for(config: &Config) -> Result<HttpBackend> {
    Ok(HttpBackend::new(
        &config.backend_url,
        config.request_timeout(),
    )?)
}

async fn list_courses(config: &Config) -> Result<()> {
    let backend = backend_for(config)?;
    match backend.fetch_courses().await {
        Ok(courses) if courses.is_empty() => println!("No courses found"),
        Ok(courses) => {
            for (i, course) in courses.iter().enumerate() {
                println!("{:>3}. {}", i + 1, course.name);
            }
        }
        Err(BackendError::Application(message)) => bail!("backend error: {message}"),
        Err(error) => bail!("could not load courses: {error}"),
    }
    Ok(())
}

async fn doctor(config: &Config) -> Result<()> {
    let backend = backend_for(config)?;
    if backend.health_check().await {
        println!("✅ backend reachable at {}", config.backend_url);
        Ok(())
    } else {
        println!("❌ backend not reachable at {}", config.backend_url);
        println!("   Check that the assistant is running, or set backend_url in config.toml");
        bail!("health check failed");
    }
}

async fn shutdown(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = tokio::task::spawn_blocking(|| {
            dialoguer::Confirm::new()
                .with_prompt("Shut down the assistant backend?")
                .default(false)
                .interact()
        })
        .await??;
        if !confirmed {
            return Ok(());
        }
    }

    let backend = backend_for(config)?;
    match backend.request_shutdown().await {
        Ok(()) => {
            println!("Shutdown successful.");
            Ok(())
        }
        Err(error) => bail!("failed to shut down the backend: {error}"),
    }
}
