use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use habitkeeper::cli::{
    CategoryCommands, Cli, Commands, ConfigCommands, TrackerArgs, TrackerCommands,
    TrackerUpdateArgs,
};
use habitkeeper::config::Config;
use habitkeeper::db::Database;
use habitkeeper::filter::{PINNED_SECTION, TrackerFilter};
use habitkeeper::model::day::{format_schedule, parse_schedule};
use habitkeeper::model::{DATE_FORMAT, DEFAULT_COLOR, DEFAULT_EMOJI, Day, Tracker};
use habitkeeper::report;
use habitkeeper::service::{Dashboard, TrackerService, ViewOptions, ViewQuery};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Category { command } => handle_category_command(command),
        Commands::Tracker { command } => handle_tracker_command(command),
        Commands::Done { tracker, date } => handle_done(&tracker, date),
        Commands::Undo { tracker, date } => handle_undo(&tracker, date),
        Commands::List {
            date,
            filter,
            search,
            json,
        } => handle_list(date, filter, search, json),
        Commands::Stats { save } => handle_stats(save),
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
    }
}

fn handle_category_command(command: CategoryCommands) -> Result<()> {
    let mut service = open_service()?;

    match command {
        CategoryCommands::Add { name } => {
            service.add_category(&name)?;
            println!("Category added: {}", name.trim());
        }
        CategoryCommands::List => {
            let book = service.book();
            if book.categories().is_empty() {
                println!("No categories yet. Add one with `HabitKeeper category add <name>`.");
            }
            book.categories().iter().for_each(|category| {
                println!("{} ({} trackers)", category.name, category.tracker_ids.len());
            });
        }
    }

    Ok(())
}

fn handle_tracker_command(command: TrackerCommands) -> Result<()> {
    let mut service = open_service()?;

    match command {
        TrackerCommands::Add(args) => add_tracker(&mut service, args),
        TrackerCommands::Update { tracker, fields } => {
            update_tracker(&mut service, &tracker, fields)
        }
        TrackerCommands::Delete { tracker } => {
            let id = service.book().resolve(&tracker)?.id;
            let removed = service.delete_tracker(id)?;
            println!("Tracker deleted: {}", removed.label());
            Ok(())
        }
        TrackerCommands::Pin { tracker } => {
            let tracker = service.book().resolve(&tracker)?.clone();
            let pinned = service.toggle_pin(tracker.id)?;
            println!(
                "Tracker {}: {}",
                if pinned { "pinned" } else { "unpinned" },
                tracker.label()
            );
            Ok(())
        }
    }
}

fn add_tracker(service: &mut TrackerService, args: TrackerArgs) -> Result<()> {
    let tracker = Tracker::new(
        &args.name,
        args.color.as_deref().unwrap_or(DEFAULT_COLOR),
        args.emoji.as_deref().unwrap_or(DEFAULT_EMOJI),
        parse_schedule(&args.days)?,
    )?;
    let id = tracker.id;
    let summary = format!(
        "{} {} [{}]",
        tracker.emoji,
        tracker.name,
        format_schedule(&tracker.schedule)
    );

    service.add_tracker(tracker, &args.category)?;
    println!("Tracker added: {summary} id={}", id.short());

    Ok(())
}

fn update_tracker(
    service: &mut TrackerService,
    reference: &str,
    fields: TrackerUpdateArgs,
) -> Result<()> {
    let current = service.book().resolve(reference)?.clone();
    let schedule = fields
        .days
        .as_deref()
        .map(parse_schedule)
        .transpose()?
        .unwrap_or_else(|| current.schedule.clone());

    let updated = Tracker::with_id(
        current.id,
        fields.name.as_deref().unwrap_or(&current.name),
        fields.color.as_deref().unwrap_or(&current.color),
        fields.emoji.as_deref().unwrap_or(&current.emoji),
        schedule,
    )?;

    service.update_tracker(updated, fields.category.as_deref())?;
    println!("Tracker updated: {}", current.id.short());

    Ok(())
}

fn handle_done(reference: &str, date: Option<String>) -> Result<()> {
    let mut service = open_service()?;
    let target_date = parse_optional_date(date)?;
    let tracker = service.book().resolve(reference)?.clone();

    if service.complete(tracker.id, target_date, today())? {
        println!(
            "{} {} completed on {target_date} ({} total)",
            tracker.emoji,
            tracker.name,
            report::format_days(service.completion_count(tracker.id))
        );
    } else {
        println!("{} was already completed on {target_date}", tracker.name);
    }

    Ok(())
}

fn handle_undo(reference: &str, date: Option<String>) -> Result<()> {
    let mut service = open_service()?;
    let target_date = parse_optional_date(date)?;
    let tracker = service.book().resolve(reference)?.clone();

    if service.uncomplete(tracker.id, target_date)? {
        println!("{} unmarked on {target_date}", tracker.name);
    } else {
        println!("{} was not completed on {target_date}", tracker.name);
    }

    Ok(())
}

fn handle_list(
    date: Option<String>,
    filter: TrackerFilter,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let service = open_service()?;
    let query = ViewQuery {
        date: parse_optional_date(date)?,
        today: today(),
        filter,
        search,
    };
    let dashboard = service.dashboard(&query);

    if json {
        let content =
            serde_json::to_string_pretty(&dashboard).context("Failed to serialize tracker list")?;
        println!("{content}");
        return Ok(());
    }

    print_dashboard(&service, &dashboard, filter);
    Ok(())
}

fn print_dashboard(service: &TrackerService, dashboard: &Dashboard<'_>, filter: TrackerFilter) {
    println!(
        "Trackers for {} ({}) [filter: {filter}]",
        dashboard.date.format(DATE_FORMAT),
        Day::of(dashboard.date)
    );

    if service.tracker_count() == 0 {
        println!("- No trackers yet. Add one with `HabitKeeper tracker add`.");
        return;
    }
    if dashboard.sections.is_empty() {
        println!("- Nothing found");
        return;
    }

    let pinned = dashboard
        .sections
        .first()
        .filter(|section| section.name == PINNED_SECTION);

    dashboard.sections.iter().for_each(|section| {
        println!("\n## {}", section.name);
        section.trackers.iter().for_each(|tracker| {
            let mark = if service.is_completed(tracker.id, dashboard.date) {
                "[x]"
            } else {
                "[ ]"
            };
            let pin = if pinned.is_some_and(|section| section.contains(tracker.id)) {
                " *"
            } else {
                ""
            };
            println!(
                "{mark}{pin} {} {} - {} [{}] {} id={}",
                tracker.emoji,
                tracker.name,
                report::format_days(service.completion_count(tracker.id)),
                format_schedule(&tracker.schedule),
                tracker.color,
                tracker.id.short()
            );
        });
    });
}

fn handle_stats(save: bool) -> Result<()> {
    let config = Config::load_or_default()?;
    let service = open_service_with(&config)?;
    let stats = service.stats();

    let report = report::build_stats_report(today(), service.book(), service.records(), stats);
    print!("{}", report::render_markdown(&report));

    if save {
        let saved = report::save_report_files(&report, &config.report_dir)?;
        println!("\nReport saved");
        println!("- Markdown: {}", saved.markdown_path.display());
        println!("- JSON: {}", saved.json_path.display());
    }

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_or_default()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load_or_default()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = Config::load_or_default()?;
    let service = open_service_with(&config)?;

    println!("HabitKeeper status");
    println!("- config: {}", Config::config_path().display());
    println!("- db_path: {}", config.db_path.display());
    println!("- categories: {}", service.book().categories().len());
    println!("- trackers: {}", service.tracker_count());
    println!("- completions: {}", service.records().len());
    println!("- search_scope: {}", config.search_scope);
    println!("- ideal_day_rule: {}", config.ideal_day_rule);
    println!(
        "- last_completed_on: {}",
        service
            .database()
            .latest_record_date()?
            .map(|date| date.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn open_service() -> Result<TrackerService> {
    let config = Config::load_or_default()?;
    open_service_with(&config)
}

fn open_service_with(config: &Config) -> Result<TrackerService> {
    let database = Database::open(&config.db_path)?;
    TrackerService::new(
        database,
        ViewOptions {
            search_scope: config.search_scope,
            ideal_day_rule: config.ideal_day_rule,
        },
    )
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, DATE_FORMAT)
                .with_context(|| format!("Invalid date format: {date}. Example: 2024-01-01"))
        })
        .transpose()?
        .map_or_else(|| Ok(today()), Ok)
}

