mod cli;

use mq_core::config::Config;
use mq_core::events::EventBus;
use mq_core::{ItemId, LibraryIndex};
use mq_db::pool::open_pool;
use mq_db::SqliteLibrary;
use mq_library::{collapse_collections, CollectionManager, NextUpQuery, NextUpService};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, CollectionAction, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "marquee=debug,mq_library=debug,mq_db=debug,mq_core=debug".to_string()
        } else {
            "marquee=info,mq_library=warn,mq_db=warn,mq_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::NextUp {
            user,
            series,
            parent,
            rewatch,
            disable_first_episode,
            start,
            limit,
            count,
            json,
        } => {
            let config = Config::load_or_default(cli.config.as_deref());
            let mut query = NextUpQuery::new(user)
                .rewatching(rewatch)
                .disable_first_episode(disable_first_episode)
                .start_index(start)
                .limit(config.next_up.effective_limit(limit));
            if let Some(series) = series {
                query = query.series(series);
            }
            if let Some(parent) = parent {
                query = query.parent(parent);
            }
            if let Some(cutoff) = config.next_up.date_cutoff(chrono::Utc::now()) {
                query = query.cutoff(cutoff);
            }
            if count {
                query = query.with_total_count();
            }
            next_up(&config, &query, json)
        }
        Commands::Collapse { user, items, json } => {
            let config = Config::load_or_default(cli.config.as_deref());
            collapse(&config, user, &items, json)
        }
        Commands::Collection { events, action } => {
            let config = Config::load_or_default(cli.config.as_deref());
            edit_collection(&config, action, events)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("marquee {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_library(config: &Config) -> Result<SqliteLibrary> {
    tracing::debug!("Opening database at {}", config.database.path.display());
    Ok(SqliteLibrary::new(open_pool(&config.database)?))
}

fn next_up(config: &Config, query: &NextUpQuery, json: bool) -> Result<()> {
    let library = open_library(config)?;
    let service = NextUpService::new(
        &library,
        &library,
        config.library.display_specials_within_seasons,
    );
    let result = service.resolve_next_up(query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.items.is_empty() {
        println!("Nothing up next.");
    }
    for episode in &result.items {
        println!("{}  {}", episode.id, episode.name);
    }
    if let Some(total) = result.total_record_count {
        println!("Total: {}", total);
    }
    Ok(())
}

fn collapse(config: &Config, user: mq_core::UserId, ids: &[ItemId], json: bool) -> Result<()> {
    let library = open_library(config)?;

    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        match library.get_item(*id)? {
            Some(item) => items.push(item),
            None => anyhow::bail!("Item does not exist: {}", id),
        }
    }

    let collapsed = collapse_collections(&library, items, user)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&collapsed)?);
    } else {
        for item in &collapsed {
            println!("{}  {}  {}", item.id, item.kind, item.name);
        }
    }
    Ok(())
}

fn edit_collection(config: &Config, action: CollectionAction, print_events: bool) -> Result<()> {
    let library = open_library(config)?;
    let bus = EventBus::default();
    let mut rx = bus.subscribe();
    let manager = CollectionManager::new(&library, &library, &bus);

    match action {
        CollectionAction::Create {
            name,
            parent,
            items,
        } => {
            let collection = manager.create_collection(&name, parent, &items)?;
            println!("{}", collection.id());
            tracing::info!(
                "Created box set {} with {} items",
                collection.item.name,
                collection.linked_children.len()
            );
        }
        CollectionAction::Add { collection, items } => {
            let added = manager.add_to_collection(collection, &items)?;
            println!("Added {} of {} items", added.len(), items.len());
        }
        CollectionAction::Remove { collection, items } => {
            let removed = manager.remove_from_collection(collection, &items)?;
            println!("Removed {} of {} items", removed.len(), items.len());
        }
    }

    while let Ok(event) = rx.try_recv() {
        let line = serde_json::to_string(&event)?;
        if print_events {
            println!("{}", line);
        } else {
            tracing::debug!("Published {}", line);
        }
    }
    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .map_err(|e| anyhow::anyhow!("Cannot read {:?}: {}", p, e))?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!(
        "  Specials within seasons: {}",
        config.library.display_specials_within_seasons
    );
    println!(
        "  Next-up page size: {} (max {})",
        config.next_up.default_limit, config.next_up.max_limit
    );
    match config.next_up.max_age_days {
        Some(days) => println!("  Next-up max age: {} days", days),
        None => println!("  Next-up max age: unlimited"),
    }
    println!("  Database: {}", config.database.path.display());

    let warnings = config.validate();
    for warning in &warnings {
        println!("⚠ {}", warning);
    }
    Ok(())
}
