use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use std::net::SocketAddr;
use teller_cli::client;
use teller_cli::config::{self, AppConfig, ConfigManager, KNOWN_KEYS};
use teller_cli::error::{CliError, CliResult, ErrorContext};
use teller_cli::terminal;
use teller_core::protocol::ProtocolError;
use teller_core::{
    ClientConfig, ClientSession, DatagramTransport, Server, ServerConfig, UdpTransport,
};

#[derive(Parser)]
#[command(name = "teller")]
#[command(author, version, about = "teller - at-most-once account operations over UDP", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the account server until Ctrl-C
    Server {
        /// Address to listen on
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Start a client session; menus on a terminal, `<code> [amount]` lines otherwise.
    ///
    /// Request ids restart at 0 in every session and the server remembers the
    /// ids it has seen, so a server serves one client session per run.
    /// Restart the server before starting another session.
    Client {
        /// Server address
        #[arg(short, long, value_name = "ADDR")]
        server: Option<SocketAddr>,

        /// Local address to send from
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Interactive setup for the server address and timeouts
    Init {
        /// Reconfigure even if already set up
        #[arg(short, long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., client.server)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., client.response_timeout_ms)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if !terminal::supports_ansi() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli.command).await {
        eprint!("{}", e.format_for_user(cli.debug));
        std::process::exit(e.exit_code() as i32);
    }
}

fn init_logging(cli: &Cli) {
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Warn)
            .filter_module("teller_core", log::LevelFilter::Debug)
            .filter_module("teller_cli", log::LevelFilter::Debug)
            .filter_module("teller", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        // The server narrates what it executes; the client stays quiet
        let default_filter = match cli.command {
            Commands::Server { .. } => "info",
            _ => "warn",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .init();
    }
}

async fn run(command: Commands) -> CliResult<()> {
    match command {
        Commands::Server { bind } => {
            let mut config = load_config()?;
            config.apply_cli_overrides(None, None, bind);
            server_command(config.server).await
        }
        Commands::Client { server, bind } => {
            let mut config = load_config()?;
            config.apply_cli_overrides(server, bind, None);
            client_command(config.client).await
        }
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    }
}

fn load_config() -> CliResult<AppConfig> {
    config::get_config().map_err(|e| {
        CliError::general(&format!("{e:#}"))
            .with_suggestion("Check the file shown by 'teller config path'")
    })
}

async fn bind(addr: SocketAddr) -> CliResult<UdpTransport> {
    UdpTransport::bind(addr).await.map_err(|e| match e {
        ProtocolError::Io(io) => CliError::from_io_error(io, &addr.to_string()),
        other => CliError::general(&other.to_string()),
    })
}

async fn server_command(config: ServerConfig) -> CliResult<()> {
    let transport = bind(config.bind).await?;
    let mut server = Server::new(transport);
    eprintln!(
        "{} {}",
        "Server listening on".bold().green(),
        server.local_addr()?
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
            }
        })
        .await?;

    let session = server.session();
    let stats = session.stats();
    eprintln!();
    eprintln!("{}", "Summary:".bold().green());
    eprintln!("Final balance: {}", session.balance());
    eprintln!("Requests executed: {}", stats.executed);
    eprintln!("Replies resent: {}", stats.replayed);
    eprintln!("Duplicates dropped: {}", stats.duplicates_dropped);
    eprintln!("Acknowledgements: {}", stats.acknowledgements);
    Ok(())
}

async fn open_session(config: &ClientConfig) -> CliResult<ClientSession<UdpTransport>> {
    let transport = bind(config.bind).await?;
    log::debug!(
        "Client bound to {}, server {}",
        transport.local_addr()?,
        config.server
    );
    Ok(ClientSession::new(
        transport,
        config.server,
        config.retry_policy(),
    ))
}

async fn client_command(config: ClientConfig) -> CliResult<()> {
    let mut session = open_session(&config).await?;

    let summary = if terminal::can_prompt() {
        eprintln!(
            "{} {}",
            "Connected to".bold().cyan(),
            config.server.to_string().cyan()
        );
        client::run_interactive(&mut session).await?
    } else {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        client::run_script(&mut session, stdin, &mut std::io::stdout()).await?
    };

    log::debug!("Session finished: {summary:?}, {:?}", session.stats());
    Ok(())
}

fn config_command(command: ConfigCommand) -> CliResult<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Init { force } => {
            if !terminal::can_prompt() {
                return Err(CliError::misuse("config init needs an interactive terminal")
                    .with_suggestion("Use 'teller config set <key> <value>' instead"));
            }
            config::interactive_init(&mut manager, force)?;
        }
        ConfigCommand::Get { key } => {
            let value = manager.get(&key)?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            let mut current_section = "";
            for (key, value) in &items {
                let (section, field) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if section != current_section {
                    if !current_section.is_empty() {
                        println!();
                    }
                    println!("[{}]", section.yellow());
                    current_section = section;
                }
                let description = KNOWN_KEYS
                    .iter()
                    .find(|(known, _)| known == key)
                    .map(|(_, description)| format!("  # {description}").dimmed().to_string())
                    .unwrap_or_default();
                println!("  {} = {}{}", field.cyan(), value, description);
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
