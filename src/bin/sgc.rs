//! Guide Client CLI
//!
//! Command-line and interactive interface to a MEM-GR server.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use guideclient::config::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_MS};
use guideclient::{ClientConfig, GuideClient, IndexSpecifier, RemovalOutcome};
use tracing_subscriber::{fmt, EnvFilter};

/// Guide Client
#[derive(Parser, Debug)]
#[command(name = "sgc")]
#[command(about = "Guide client for the MEM-GR measurement queue")]
#[command(version)]
struct Args {
    /// Server endpoint
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enter interactive mode (after running the command, if any)
    #[arg(short, long)]
    interactive: bool,

    /// Measurement files to add before anything else runs
    configs: Vec<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Args {
    /// Interactive when asked, or when there is nothing else to do
    fn wants_shell(&self) -> bool {
        self.interactive || (self.command.is_none() && self.configs.is_empty())
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Query the server identity
    Idn,

    /// Add measurements from JSON files
    Add {
        /// Measurement files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Remove measurements by index or slice (e.g. 0 -1 1:3 ::2)
    ///
    /// With no index the server applies its default removal policy.
    Rmv {
        /// Index specifiers
        #[arg(allow_hyphen_values = true)]
        specs: Vec<IndexSpecifier>,
    },

    /// Print the queue contents
    Que {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the queue length
    Len,

    /// Query the fetch counter, or set it when given an integer
    Fch {
        /// New counter value
        #[arg(allow_hyphen_values = true)]
        value: Option<String>,
    },
}

/// One line of interactive input
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Subcommand, Debug)]
enum ShellCommand {
    #[command(flatten)]
    Op(Commands),

    /// Connect to an endpoint (defaults to the current one)
    Connect { endpoint: Option<String> },

    /// Leave interactive mode
    Exit,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    tracing::debug!("Guide client v{}", guideclient::VERSION);

    let config = match ClientConfig::builder()
        .endpoint(&args.endpoint)
        .timeout_ms(args.timeout_ms)
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    let mut client = GuideClient::with_config(config);
    let interactive = args.wants_shell();

    // First connection is automatic; reconnects are manual
    if let Err(e) = client.connect(None) {
        tracing::error!("{}", e);
        if !interactive {
            std::process::exit(1);
        }
    }

    if !args.configs.is_empty() {
        if let Err(e) = run(&mut client, Commands::Add { files: args.configs }) {
            tracing::error!("{}", e);
            if !interactive {
                std::process::exit(1);
            }
        }
    }

    if let Some(command) = args.command {
        if let Err(e) = run(&mut client, command) {
            tracing::error!("{}", e);
            if !interactive {
                std::process::exit(1);
            }
        }
    }

    if interactive {
        if let Err(e) = shell(&mut client) {
            tracing::error!("Shell error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Execute one command, printing its result to stdout
fn run(client: &mut GuideClient, command: Commands) -> guideclient::Result<()> {
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Idn => {
            writeln!(stdout, "{}", client.identify()?.join(" "))?;
        }
        Commands::Add { files } => {
            for file in files {
                let reply = client.add_from_file(&file)?;
                writeln!(stdout, "{}: {}", file.display(), reply.join(" "))?;
            }
        }
        Commands::Rmv { specs } => match client.remove(&specs)? {
            RemovalOutcome::EmptyQueue => {
                writeln!(stdout, "Measurement queue is empty; nothing removed.")?;
            }
            RemovalOutcome::NothingResolved { errors } => {
                for error in errors {
                    eprintln!("{}", error);
                }
                writeln!(stdout, "Nothing removed.")?;
            }
            RemovalOutcome::Removed { reply, errors, .. } => {
                for error in errors {
                    eprintln!("{}", error);
                }
                writeln!(stdout, "Removed: {}", reply.join(" "))?;
            }
        },
        Commands::Que { output } => {
            let count = match output {
                Some(path) => client.dump_queue(&mut File::create(path)?)?,
                None => client.dump_queue(&mut stdout)?,
            };
            tracing::debug!("Dumped {} queued measurements", count);
        }
        Commands::Len => {
            writeln!(stdout, "{}", client.queue_len()?)?;
        }
        Commands::Fch { value } => {
            writeln!(stdout, "{}", client.fetch(value.as_deref())?)?;
        }
    }

    Ok(())
}

/// Interactive read-eval loop
fn shell(client: &mut GuideClient) -> io::Result<()> {
    println!("Measurement client interactive mode.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("[sgc] ");
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => break,
        };

        // Empty lines do nothing
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let command = match ShellLine::try_parse_from(words) {
            Ok(parsed) => parsed.command,
            Err(e) => {
                let _ = e.print();
                continue;
            }
        };

        let result = match command {
            ShellCommand::Exit => break,
            ShellCommand::Connect { endpoint } => client.connect(endpoint.as_deref()),
            ShellCommand::Op(command) => run(client, command),
        };

        if let Err(e) = result {
            eprintln!("Error: {}", e);
            if !client.is_connected() {
                eprintln!("Connection closed; use `connect` to reconnect to {}", client.endpoint());
            }
        }
    }

    Ok(())
}
