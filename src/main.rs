mod camera;
mod card;
mod cli;
mod config;
mod host;
mod paths;
mod recording;
mod snapshot;
mod theme;
mod throttle;
mod timer;
mod tui;
mod view;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{CardArgs, CheckArgs, Cli, Command};
use std::fs::OpenOptions;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        None | Some(Command::Tui) => {
            tui::run_tui(&cli.card).await?;
        }
        Some(Command::Check(args)) => {
            run_check(&cli.card, &args)?;
        }
    }

    Ok(())
}

// The TUI owns the terminal, so log records go to a file in the data dir.
fn init_logging() {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    let log_file = paths::log_path().and_then(|path| {
        paths::ensure_parent_dir(&path)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed opening log file at {}", path.display()))
    });
    match log_file {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(err) => {
            eprintln!("Warning: logging disabled ({err:#}).");
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    let _ = builder.try_init();
}

fn run_check(card_args: &CardArgs, args: &CheckArgs) -> Result<()> {
    let card_config = config::load_config(&card_args.config)?;
    let states = match &card_args.states {
        Some(path) => host::load_states(path)?,
        None => host::HostStates::default(),
    };
    let states = Arc::new(states);

    let now = timer::now_millis();
    let mut card = card::SurveillanceCard::new(tui::capabilities_from_args(card_args));
    card.set_host_states(states.clone(), now);
    card.set_config(card_config, now)
        .with_context(|| format!("invalid card config at {}", card_args.config.display()))?;
    card.set_host_states(states, now);

    if args.json {
        println!("{}", serde_json::to_string_pretty(card.cameras().as_ref())?);
        return Ok(());
    }

    match snapshot::manifest_path().and_then(|path| snapshot::load_snapshots(&path)) {
        Ok(requests) => println!("{} snapshot request(s) in manifest.", requests.len()),
        Err(err) => log::warn!("could not read snapshot manifest: {err:#}"),
    }

    if card.cameras().is_empty() {
        println!("No cameras configured.");
        return Ok(());
    }

    println!(
        "{:<3}  {:<32}  {:<9}  {:<7}  NAME",
        "SEL", "ENTITY", "AVAILABLE", "MOTION"
    );
    for camera in card.cameras().iter() {
        let selected = card.selected_entity() == Some(camera.entity.as_str());
        println!(
            "{:<3}  {:<32}  {:<9}  {:<7}  {}",
            if selected { "*" } else { "" },
            camera.entity,
            if camera.is_available() { "yes" } else { "no" },
            if camera.has_motion { "on" } else { "off" },
            camera.display_name()
        );
    }
    Ok(())
}
