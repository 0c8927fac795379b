//! `taskit` — the peripheral CLI surface (`spec.md` §6 "CLI surface"): a
//! `build_backend`-style launcher that starts a bare backend (admin tasks
//! only — application tasks are registered in library code, not here) and
//! the port-range expansion utility (`examples/original_source/daemonizing/port_expander.py`).

use clap::{Parser, Subcommand};

use taskit_backend::Backend;
use taskit_core::config::BackendConfig;
use taskit_core::portrange::expand_host_lines;
use taskit_core::task::DEFAULT_PORT;
use taskit_core::{Level, Logger};

#[derive(Parser)]
#[command(name = "taskit", version, about = "TaskIt backend launcher and port-range utility")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a bare backend (admin tasks only) on `host`/`port`.
    Serve {
        #[arg(default_value = "0.0.0.0")]
        host: String,
        #[arg(default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, default_value_t = 2048)]
        data_size: usize,
    },
    /// Expand a port specifier (`n`, `n,m,...`, or `lo-hi`) into `host:port` lines.
    ExpandPorts {
        host: String,
        ports: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { host, port, data_size } => {
            let logger = Logger::terminal(Level::Info);
            let backend = Backend::new(BackendConfig {
                host,
                port,
                data_size,
                end_resp_secs: 0.5,
            })
            .with_logger(logger);

            if let Err(e) = backend.run() {
                eprintln!("backend exited with an error: {e}");
                std::process::exit(1);
            }
        }
        Command::ExpandPorts { host, ports } => match expand_host_lines(&host, &ports) {
            Ok(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        },
    }
}
