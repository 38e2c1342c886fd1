use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xlate_core::Translator;
use xlate_model::{Address, Command as ModelCommand, Resource, Response};

mod profile;

use profile::Profile;

fn profile_arg() -> Arg {
    Arg::new("profile")
        .long("profile")
        .short('p')
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Translation profile (TOML)")
}

fn input_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .default_value("-")
        .value_parser(clap::value_parser!(PathBuf))
        .help(help)
}

fn cli() -> Command {
    Command::new("xlate")
        .version(xlate_core::VERSION)
        .about("Translate management model artifacts for older peers")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Log resolution decisions (-vv for every node)"),
        )
        .subcommand(
            Command::new("tree")
                .about("Translate a resource tree")
                .arg(profile_arg())
                .arg(input_arg("input", "Resource tree as JSON, '-' for stdin"))
                .arg(
                    Arg::new("subtree")
                        .long("subtree")
                        .help("Translate only the subtree at this address"),
                ),
        )
        .subcommand(
            Command::new("command")
                .about("Translate a command")
                .arg(profile_arg())
                .arg(input_arg("input", "Command as JSON, '-' for stdin"))
                .arg(
                    Arg::new("model")
                        .long("model")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Resource tree commands may inspect"),
                ),
        )
        .subcommand(
            Command::new("respond")
                .about("Map a peer's raw response back to the sender's view")
                .arg(profile_arg())
                .arg(input_arg("input", "Original command as JSON"))
                .arg(
                    Arg::new("response")
                        .long("response")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Raw response from the peer as JSON"),
                )
                .arg(
                    Arg::new("model")
                        .long("model")
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("Resource tree commands may inspect"),
                ),
        )
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "xlate_core=debug,info",
        _ => "xlate_core=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let mut text = String::new();
    if path == Path::new("-") {
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
    } else {
        text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    }
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn translator(args: &ArgMatches) -> Result<Translator> {
    let path = args
        .get_one::<PathBuf>("profile")
        .context("missing --profile")?;
    let target = Profile::load(path)?.target()?;
    let mut translator = Translator::new(Arc::new(target));
    if let Some(model) = args.try_get_one::<PathBuf>("model").ok().flatten() {
        translator = translator.with_source(read_json::<Resource>(model)?);
    }
    Ok(translator)
}

fn input(args: &ArgMatches, name: &str) -> Result<PathBuf> {
    args.get_one::<PathBuf>(name)
        .cloned()
        .with_context(|| format!("missing --{name}"))
}

fn print(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("tree", args)) => {
            let source: Resource = read_json(&input(args, "input")?)?;
            let translator = translator(args)?.with_source(source);
            match args.get_one::<String>("subtree") {
                Some(address) => {
                    let address: Address = address.parse().context("invalid --subtree address")?;
                    match translator.transform_subtree(&address)? {
                        Some(tree) => print(&tree),
                        None => anyhow::bail!("no resource at {address}"),
                    }
                }
                None => print(&translator.transform_tree()?),
            }
        }
        Some(("command", args)) => {
            let command: ModelCommand = read_json(&input(args, "input")?)?;
            let transformed = translator(args)?.transform_command(&command)?;
            match transformed.command() {
                Some(outgoing) => print(outgoing),
                None => {
                    tracing::info!("{} at {} is discarded for this peer", command.name(), command.address());
                    println!("null");
                    Ok(())
                }
            }
        }
        Some(("respond", args)) => {
            let command: ModelCommand = read_json(&input(args, "input")?)?;
            let response_path = input(args, "response")?;
            let raw: Response = read_json(&response_path)?;
            let answer = translator(args)?.round_trip(&command, |_| raw)?;
            print(&answer)
        }
        Some((other, _)) => anyhow::bail!("unknown subcommand {other}"),
        None => anyhow::bail!("no subcommand given"),
    }
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    if let Err(err) = run(&matches) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
