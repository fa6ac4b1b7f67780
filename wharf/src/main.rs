mod net;

use clap::{Parser, Subcommand};

use wharf_core::config::WharfConfig;
use wharf_core::logging::init_logging;
use wharf_core::route::Router;

const DEFAULT_CONFIG: &str = "config/wharf.toml";

#[derive(Parser, Debug)]
#[command(name = "wharf", version, about = "wharf: HTTP origin server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server (default)
    Run {
        /// Path to the wharf config file
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: String,
    },

    /// Validate a config file and print the routing table
    Check {
        #[arg(long, default_value = DEFAULT_CONFIG)]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Check { config }) => {
            let cfg = WharfConfig::from_file(&config)?;
            let router = Router::new(&cfg.servers);
            print_routes(&cfg, &router);
        }

        Some(Command::Run { config }) => {
            init_logging();
            let cfg = WharfConfig::from_file(&config)?;
            let router = Router::new(&cfg.servers);
            net::serve(cfg, router).await?;
        }

        None => {
            init_logging();
            let cfg = WharfConfig::from_file(DEFAULT_CONFIG)?;
            let router = Router::new(&cfg.servers);
            net::serve(cfg, router).await?;
        }
    }

    Ok(())
}

fn print_routes(cfg: &WharfConfig, router: &Router) {
    println!("explicit routes:");
    for (server_id, method, path) in router.routes() {
        let name = cfg
            .servers
            .get(server_id)
            .map(|s| s.name.as_str())
            .unwrap_or("?");
        println!("  [{name}] {method} {path}");
    }

    println!("locations:");
    for server in &cfg.servers {
        for location in &server.locations {
            println!(
                "  [{}] {} ({})",
                server.name,
                location.path,
                location.methods.join(", ")
            );
        }
    }
}
