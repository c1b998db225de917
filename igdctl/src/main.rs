//! `igdctl` : contrôle en ligne de commande d'une passerelle UPnP IGD.

use std::env;
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use igdcontrol::{IgdError, MappingProtocol, UpnpGateway};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Usage: igdctl <command> [arguments]

Commands:
  discover                           list UPnP devices answering the SSDP search
  external-ip                        print the gateway's external IPv4 address
  list                               list the gateway's port mappings
  add <port> <proto> [description]   open <port> towards this host
  get <port> <proto>                 show the mapping of <port>
  delete <port> <proto>              remove the mapping of <port>

<proto> is one of UDP, TCP or BOTH.

Environment:
  RUST_LOG                 tracing filter, overrides host.logger.min_level
  IGDCTL_CONFIG            configuration directory
  IGDCTL_CONFIG__<PATH>    override a configuration key (e.g. IGDCTL_CONFIG__DISCOVERY__TIMEOUT_MS)";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Discover,
    ExternalIp,
    List,
    Add {
        port: u16,
        protocol: MappingProtocol,
        description: Option<String>,
    },
    Get {
        port: u16,
        protocol: MappingProtocol,
    },
    Delete {
        port: u16,
        protocol: MappingProtocol,
    },
    Help,
}

fn parse_port(value: Option<&String>) -> Result<u16> {
    let value = value.ok_or_else(|| anyhow!("missing <port>"))?;
    value
        .parse::<u16>()
        .with_context(|| format!("invalid port '{}'", value))
}

fn parse_protocol(value: Option<&String>) -> Result<MappingProtocol> {
    let value = value.ok_or_else(|| anyhow!("missing <proto>"))?;
    value.parse::<MappingProtocol>().map_err(|e| anyhow!(e))
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };
    let rest = &args[1..];

    let parsed = match command.as_str() {
        "discover" => Command::Discover,
        "external-ip" => Command::ExternalIp,
        "list" => Command::List,
        "add" => Command::Add {
            port: parse_port(rest.first())?,
            protocol: parse_protocol(rest.get(1))?,
            description: (rest.len() > 2).then(|| rest[2..].join(" ")),
        },
        "get" => Command::Get {
            port: parse_port(rest.first())?,
            protocol: parse_protocol(rest.get(1))?,
        },
        "delete" => Command::Delete {
            port: parse_port(rest.first())?,
            protocol: parse_protocol(rest.get(1))?,
        },
        "help" | "-h" | "--help" => Command::Help,
        other => bail!("unknown command '{}'", other),
    };
    Ok(parsed)
}

fn init_tracing(config: &igdconfig::Config) {
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "info".to_string())
        .to_ascii_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let enabled = config.get_log_enable_console().unwrap_or(true);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(if enabled { env_filter } else { EnvFilter::new("off") })
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_entry<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) {
    for (key, value) in entries {
        println!("  {}: {}", key, value);
    }
}

async fn run(command: Command, gateway: &UpnpGateway) -> Result<()> {
    match command {
        Command::Help => println!("{}", USAGE),
        Command::Discover => {
            let devices = gateway.discoverer().discover().await;
            println!("{} device(s) found", devices.len());
            for device in devices.iter() {
                println!(
                    "- {} ({})",
                    device.registry_key(),
                    device.server_name().unwrap_or("unknown server")
                );
            }
        }
        Command::ExternalIp => match gateway.get_external_ip().await? {
            Some(ip) => println!("{}", ip),
            None => bail!("no external IP address available"),
        },
        Command::List => {
            let entries = gateway.list_port_mappings().await?;
            println!("{} port mapping(s)", entries.len());
            for (index, entry) in entries.iter().enumerate() {
                println!("[{}]", index);
                print_entry(entry.iter());
            }
        }
        Command::Add {
            port,
            protocol,
            description,
        } => {
            let result = gateway
                .add_port_mapping(port, protocol, None, description.as_deref())
                .await?;
            if !result.success {
                bail!("no gateway exposing WANIPConnection was found");
            }
            println!("{} {} mapped", protocol, port);
        }
        Command::Get { port, protocol } => {
            let result = gateway.get_port_mapping(port, protocol, None).await?;
            if result.success {
                println!("{} {}", protocol, port);
                print_entry(result.response_data.iter());
            } else {
                println!("no mapping for {} {}", protocol, port);
            }
        }
        Command::Delete { port, protocol } => {
            let result = gateway.delete_port_mapping(port, protocol, None).await?;
            if result.success {
                println!("{} {} removed", protocol, port);
            } else {
                println!("no mapping for {} {}", protocol, port);
            }
        }
    }
    Ok(())
}

/// Code de sortie : le code UPnP d'une faute remontée, sinon 1.
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<IgdError>()
        .and_then(IgdError::upnp_code)
        .filter(|code| *code > 0)
        .unwrap_or(1)
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("igdctl: {}\n\n{}", e, USAGE);
            process::exit(2);
        }
    };

    let outcome = async {
        let config = igdconfig::get_config()?;
        init_tracing(&config);
        info!(config_dir = %config.directory(), "🚀 igdctl starting");

        let gateway = UpnpGateway::from_config(&config)?;
        debug!("Running {:?}", command);
        run(command, &gateway).await
    }
    .await;

    if let Err(e) = outcome {
        eprintln!("igdctl: {:#}", e);
        process::exit(exit_code(&e));
    }
}
