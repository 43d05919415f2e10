use anyhow::{anyhow, bail, Context, Result};
use prep_schedule::catalog::{load_catalog, search_catalog, PrepItem};
use prep_schedule::cli::{parse_args, Command};
use prep_schedule::config::SchedulerConfig;
use prep_schedule::editor::{render_text, EditorSettings};
use prep_schedule::layout::{request_schedule, LlmLayoutStrategy};
use prep_schedule::persistence::{AutoSaver, JsonFileStore, SaveStatus, ScheduleStore};
use prep_schedule::schedule::ClockTime;
use prep_schedule::session::{GenerationOutcome, NoticeKind, PrepSession};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn open_session(config: &SchedulerConfig, owner: &str, catalog: Vec<PrepItem>, store: Arc<JsonFileStore>) -> Result<PrepSession> {
    let settings = EditorSettings {
        snap_minutes: config.snap_minutes,
        drag_threshold_px: config.drag_threshold_px,
    };
    let autosaver = AutoSaver::spawn(store, config.autosave_debounce());
    Ok(PrepSession::new(owner, catalog, config.window()?, settings)
        .with_notice_lifetime(config.notice_lifetime())
        .with_autosaver(autosaver))
}

fn print_notices(session: &PrepSession) {
    for notice in session.notices(Instant::now()) {
        match notice.kind {
            NoticeKind::Error => eprintln!("error: {}", notice.text),
            NoticeKind::Warning => eprintln!("warning: {}", notice.text),
            NoticeKind::Info => println!("{}", notice.text),
        }
    }
}

/// Wait for the pending write and report how it went.
async fn finish_saving(session: &mut PrepSession) -> Result<()> {
    match session.close().await {
        SaveStatus::Failed { message } => Err(anyhow!("Error saving schedule: {}", message)),
        SaveStatus::Saved { at } => {
            println!("Schedule saved at {}", at.format("%H:%M:%S"));
            Ok(())
        }
        _ => Ok(()),
    }
}

fn print_recipe_detail(item: &PrepItem) {
    println!("\n{} ({})", item.name, item.id);
    let Some(recipe) = &item.recipe else {
        println!("No recipe yet");
        return;
    };
    println!(
        "Prep {} min, cook {} min, methods: {}",
        recipe.prep_time_minutes,
        recipe.cook_time_minutes,
        recipe.cooking_methods.join(", ")
    );
    if !recipe.ingredients.is_empty() {
        println!("Ingredients:");
        for ingredient in &recipe.ingredients {
            println!("  - {}", ingredient);
        }
    }
    let steps = recipe.procedure_steps();
    if !steps.is_empty() {
        println!("Procedure:");
        for (n, step) in steps.iter().enumerate() {
            println!("  {}. {}", n + 1, step);
        }
    }
}

fn read_catalog(path: &Path) -> Result<Vec<PrepItem>> {
    let catalog = load_catalog(path)?;
    info!(items = catalog.len(), "catalog loaded");
    Ok(catalog)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let config = SchedulerConfig::load(cli.config.as_deref())?;
    let store = Arc::new(JsonFileStore::new(config.store_dir()?));
    info!(dir = ?store.dir(), "using schedule store");

    match cli.command {
        Command::Generate { catalog, items } => {
            let mut session = open_session(&config, &cli.owner, read_catalog(&catalog)?, store)?;
            for item in &items {
                session.add_to_prep_list(item)?;
            }
            let ticket = session.begin_generation()?;
            println!("Generating a schedule for {} item(s)...", ticket.requests.len());
            let strategy = LlmLayoutStrategy::from_config(&config);
            let result = request_schedule(&strategy, &ticket.requests, &ticket.window).await;
            let outcome = session.complete_generation(ticket, result);
            print_notices(&session);
            if outcome == GenerationOutcome::Failed {
                bail!("No schedule was generated");
            }
            print!("{}", render_text(session.editor(), 66));
            finish_saving(&mut session).await?;
        }
        Command::Show { catalog, width, item } => {
            let mut session = open_session(&config, &cli.owner, read_catalog(&catalog)?, store.clone())?;
            let restored = session.restore(store.as_ref()).await;
            print_notices(&session);
            if restored == 0 && session.schedule().is_empty() {
                println!("No saved schedule for '{}'", cli.owner);
                return Ok(());
            }
            print!("{}", render_text(session.editor(), width));
            match item {
                Some(item_id) => {
                    if !session.select_item(&item_id) {
                        bail!("'{}' is not on the saved prep list", item_id);
                    }
                    if let Some(selected) = session.selected_item() {
                        print_recipe_detail(selected);
                    }
                }
                None => {
                    for item in session.prep_list() {
                        if let Some(recipe) = &item.recipe {
                            println!(
                                "- {} ({}): prep {} min, cook {} min",
                                item.name, item.id, recipe.prep_time_minutes, recipe.cook_time_minutes
                            );
                        }
                    }
                }
            }
        }
        Command::Move { catalog, task, to } => {
            let start: ClockTime = to.parse().with_context(|| format!("Invalid start time '{}'", to))?;
            let mut session = open_session(&config, &cli.owner, read_catalog(&catalog)?, store.clone())?;
            session.restore(store.as_ref()).await;
            let moved = session
                .move_task(&task, start)
                .ok_or_else(|| anyhow!("No scheduled task '{}'", task))?;
            println!("{} now runs {}-{}", moved.display_name(), moved.start_time(), moved.end_time());
            print!("{}", render_text(session.editor(), 66));
            finish_saving(&mut session).await?;
        }
        Command::Clear => {
            if store.delete(&cli.owner).await? {
                println!("Cleared the saved schedule for '{}'", cli.owner);
            } else {
                println!("No saved schedule for '{}'", cli.owner);
            }
        }
        Command::Search { catalog, term } => {
            let catalog = read_catalog(&catalog)?;
            for item in search_catalog(&catalog, &term) {
                let minutes = item
                    .recipe
                    .as_ref()
                    .and_then(|r| r.total_minutes())
                    .map(|minutes| format!("{} min", minutes))
                    .unwrap_or_else(|| "no recipe".to_string());
                println!("{}\t{}\t{}", item.id, item.name, minutes);
            }
        }
    }
    Ok(())
}
