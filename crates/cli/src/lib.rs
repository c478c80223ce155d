pub mod commands;

use brewline_core::{AutoStrategy, OverrideType, SettingsUpdate};
use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::track::TrackArgs;

#[derive(Debug, Parser)]
#[command(
    name = "brewline",
    about = "Brewline operator CLI",
    long_about = "Operate the Brewline storefront suggestion engine: migrations, demo data, \
                  suggestion lookups and admin curation.",
    after_help = "Examples:\n  brewline seed\n  brewline suggest --viewer user-ana\n  \
                  brewline defaults set croissant cold-brew chai-latte\n  \
                  brewline settings set --strategy orderHistory"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo cafe catalog, order history and default suggestions")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Resolve up to three suggestions for a viewer (guest when omitted)")]
    Suggest {
        #[arg(long, help = "User id of the viewer")]
        viewer: Option<String>,
    },
    #[command(about = "Record a storefront search in the viewer's search history")]
    Track {
        #[arg(long, help = "User id that performed the search")]
        user: Option<String>,
        #[arg(long, help = "Search text as typed")]
        query: String,
        #[arg(long = "tag", help = "Tag filter applied to the search (repeatable)")]
        tags: Vec<String>,
        #[arg(long, help = "Product opened from the results")]
        product: Option<String>,
    },
    #[command(about = "Remove expired search history entries")]
    PurgeHistory,
    #[command(subcommand, about = "Show or replace the curated default suggestions")]
    Defaults(DefaultsCommand),
    #[command(subcommand, about = "Manage per-user suggestion overrides")]
    Override(OverrideCommand),
    #[command(subcommand, about = "Show or update automatic suggestion settings")]
    Settings(SettingsCommand),
}

#[derive(Debug, Subcommand)]
enum DefaultsCommand {
    Show,
    Set {
        #[arg(required = true, help = "Product ids in display order (at least three distinct)")]
        product_ids: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum OverrideCommand {
    List,
    Set {
        #[arg(long)]
        user: String,
        #[arg(long = "type", default_value = "manual", help = "manual or auto")]
        override_type: OverrideType,
        #[arg(required = true, help = "Product ids in display order (at least three distinct)")]
        product_ids: Vec<String>,
    },
    Clear {
        #[arg(long)]
        user: String,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        #[arg(long)]
        auto_enabled: Option<bool>,
        #[arg(long, help = "orderHistory, searchHistory, related or hybrid")]
        strategy: Option<AutoStrategy>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Suggest { viewer } => commands::suggest::run(viewer),
        Command::Track { user, query, tags, product } => {
            commands::track::run(TrackArgs { user, query, tags, product })
        }
        Command::PurgeHistory => commands::purge::run(),
        Command::Defaults(DefaultsCommand::Show) => commands::defaults::show(),
        Command::Defaults(DefaultsCommand::Set { product_ids }) => {
            commands::defaults::set(product_ids)
        }
        Command::Override(OverrideCommand::List) => commands::overrides::list(),
        Command::Override(OverrideCommand::Set { user, override_type, product_ids }) => {
            commands::overrides::set(user, product_ids, override_type)
        }
        Command::Override(OverrideCommand::Clear { user }) => commands::overrides::clear(user),
        Command::Settings(SettingsCommand::Show) => commands::settings::show(),
        Command::Settings(SettingsCommand::Set { auto_enabled, strategy }) => {
            commands::settings::set(SettingsUpdate { auto_enabled, auto_strategy: strategy })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
