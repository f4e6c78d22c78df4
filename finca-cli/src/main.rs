mod cli;
mod display;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use finca_core::kv::infer_backend_type;
use finca_core::relations::{CROP_FARM, PLOT_FARM};
use finca_core::{
    apply_farm_rename, create_backend, dangling_crop_plots, dangling_references, get_config_path,
    request_password_reset, AppConfig, CollectionEditor, CollectionStore, Crop, CropForm, Farm,
    KeyValueStore, LoadStatus, Plot, Record, Role, Session, SessionClient, User, Variety,
};

use crate::cli::{
    Cli, Command, ConfigCommand, CropCommand, FarmArgs, PlotCommand, RecordCommand, RoleArgs,
    UserArgs, VarietyArgs,
};
use crate::display::{print_table, Listing};
use crate::prompts::FormMode;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Determine which config file to use
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => get_config_path()?,
    };
    let mut config = AppConfig::load_or_default(&config_path)?;
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }

    match cli.command {
        Command::Farm(cmd) => handle_farm_command(cmd, &open_store(&config)?, &config).await?,
        Command::Plot(cmd) => handle_plot_command(cmd, &open_store(&config)?).await?,
        Command::Crop(cmd) => handle_crop_command(cmd, &open_store(&config)?).await?,
        Command::Variety(cmd) => handle_variety_command(cmd, &open_store(&config)?).await?,
        Command::User(cmd) => handle_user_command(cmd, &open_store(&config)?).await?,
        Command::Role(cmd) => handle_role_command(cmd, &open_store(&config)?).await?,
        Command::Login {
            email,
            remember,
            forget,
        } => {
            let choice = match (remember, forget) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let session = open_session(&config)?;
            login(&session, email, choice).await?;
        }
        Command::Logout => {
            open_session(&config)?.logout().await?;
            println!("{}", "Logged out.".green());
        }
        Command::Recover { email } => recover(&open_store(&config)?, &email).await?,
        Command::Check => check(&open_store(&config)?).await?,
        Command::Config(cmd) => handle_config_command(&cmd, &config, &config_path)?,
    }

    Ok(())
}

fn open_backend(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>> {
    create_backend(&config.data_path, config.backend)
        .with_context(|| format!("Failed to open data store at {:?}", config.data_path))
}

fn open_store(config: &AppConfig) -> Result<CollectionStore> {
    Ok(CollectionStore::new(open_backend(config)?))
}

fn open_session(config: &AppConfig) -> Result<Session> {
    let client = SessionClient::from_config(config).context("Failed to build HTTP client")?;
    Ok(Session::new(open_backend(config)?, client))
}

/// Opens an editor on `R`, refusing to continue when the stored collection
/// could not be read. A value that did not parse is reported and replaced.
async fn open_editor<R: Record>(store: &CollectionStore) -> Result<CollectionEditor<R>> {
    let (editor, status) = CollectionEditor::<R>::open(store.clone()).await;
    let unreadable = status.is_unreadable();
    match status {
        LoadStatus::Recovered(err) if unreadable => {
            let context = format!("Could not read {}; nothing was changed", R::COLLECTION);
            Err(anyhow::Error::new(err).context(context))
        }
        LoadStatus::Recovered(err) => {
            let warning = format!(
                "Stored {} were unusable ({}); starting empty.",
                R::COLLECTION,
                err
            );
            println!("{}", warning.yellow());
            Ok(editor)
        }
        LoadStatus::Loaded | LoadStatus::Empty => Ok(editor),
    }
}

async fn add_record<R, F>(store: &CollectionStore, fill: F) -> Result<()>
where
    R: Record,
    F: FnOnce(&[R]) -> Result<R>,
{
    let mut editor = open_editor::<R>(store).await?;
    let record = fill(editor.records())?;
    let index = editor.submit(record).await?;

    let added = editor
        .get(index)
        .map(|r| r.display_name())
        .unwrap_or_default();
    println!(
        "{}",
        format!("Added '{}' to {} at index {}.", added, R::COLLECTION, index).green()
    );
    Ok(())
}

/// Runs `fill` on the record at `index` and saves the result.
/// Returns the record before and after the edit.
async fn edit_record<R, F>(store: &CollectionStore, index: usize, fill: F) -> Result<(R, R)>
where
    R: Record,
    F: FnOnce(&R, &[R]) -> Result<R>,
{
    let mut editor = open_editor::<R>(store).await?;
    let current = editor.begin_edit(index)?.clone();
    let updated = fill(&current, editor.records())?;
    editor.submit(updated.clone()).await?;

    println!(
        "{}",
        format!(
            "Updated {} #{} ('{}').",
            R::COLLECTION,
            index,
            updated.display_name()
        )
        .green()
    );
    Ok((current, updated))
}

async fn delete_record<R: Record>(store: &CollectionStore, index: usize, yes: bool) -> Result<()> {
    let mut editor = open_editor::<R>(store).await?;
    let record = editor.get(index).with_context(|| {
        format!(
            "No record at index {} ({} {} stored)",
            index,
            editor.len(),
            R::COLLECTION
        )
    })?;

    println!(
        "{}",
        format!("{} #{} to delete:", R::COLLECTION, index).yellow()
    );
    println!("  {}", record.display_name());

    // Confirm deletion unless --yes flag is used
    if !prompts::confirm_delete("this record", yes)? {
        println!("{}", "Deletion cancelled.".yellow());
        return Ok(());
    }

    let removed = editor.delete(index).await?;
    println!(
        "{}",
        format!("Deleted '{}' from {}.", removed.display_name(), R::COLLECTION).green()
    );
    Ok(())
}

async fn list_records<R: Listing>(store: &CollectionStore) -> Result<()> {
    let records = store.load_or_empty::<R>().await.records;
    print_table(records.iter().enumerate());
    Ok(())
}

async fn handle_farm_command(
    cmd: RecordCommand<FarmArgs>,
    store: &CollectionStore,
    config: &AppConfig,
) -> Result<()> {
    match cmd {
        RecordCommand::Add { fields } => {
            add_record::<Farm, _>(store, |_| {
                prompts::prompt_farm(&fields, &Farm::default(), FormMode::add())
            })
            .await
        }
        RecordCommand::List => list_records::<Farm>(store).await,
        RecordCommand::Edit { index, fields } => {
            let mode = FormMode::edit(prompts::farm_args_given(&fields));
            let (before, after) = edit_record(store, index, |current: &Farm, _| {
                prompts::prompt_farm(&fields, current, mode)
            })
            .await?;

            if before.name != after.name {
                rename_farm_references(store, config, &before.name, &after.name).await?;
            }
            Ok(())
        }
        RecordCommand::Del { index, yes } => delete_record::<Farm>(store, index, yes).await,
    }
}

/// Plots and crops keep the old farm name unless cascading is switched on
async fn rename_farm_references(
    store: &CollectionStore,
    config: &AppConfig,
    old: &str,
    new: &str,
) -> Result<()> {
    let rename = apply_farm_rename(store, old, new, config.cascade_renames).await?;
    if rename.affected == 0 {
        return Ok(());
    }

    if rename.cascaded {
        println!(
            "{}",
            format!(
                "Moved {} plot(s) and crop(s) from '{}' to '{}'.",
                rename.affected, old, new
            )
            .green()
        );
    } else {
        println!(
            "{}",
            format!(
                "{} plot(s) and crop(s) still refer to '{}'.",
                rename.affected, old
            )
            .yellow()
        );
        println!("Set `cascade_renames: true` in the config to update them on rename.");
    }
    Ok(())
}

async fn handle_plot_command(cmd: PlotCommand, store: &CollectionStore) -> Result<()> {
    match cmd {
        PlotCommand::Add { fields } => {
            let farms = store.load_or_empty::<Farm>().await.records;
            add_record::<Plot, _>(store, |_| {
                prompts::prompt_plot(&fields, &Plot::default(), &farms, FormMode::add())
            })
            .await
        }
        PlotCommand::List { farm } => {
            let plots = store.load_or_empty::<Plot>().await.records;
            print_table(
                plots
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| farm.as_deref().is_none_or(|f| p.farm == f)),
            );
            Ok(())
        }
        PlotCommand::Edit { index, fields } => {
            let farms = store.load_or_empty::<Farm>().await.records;
            let mode = FormMode::edit(prompts::plot_args_given(&fields));
            edit_record(store, index, |current: &Plot, _| {
                prompts::prompt_plot(&fields, current, &farms, mode)
            })
            .await?;
            Ok(())
        }
        PlotCommand::Del { index, yes } => delete_record::<Plot>(store, index, yes).await,
    }
}

async fn handle_crop_command(cmd: CropCommand, store: &CollectionStore) -> Result<()> {
    match cmd {
        CropCommand::Add { fields } => {
            let farms = store.load_or_empty::<Farm>().await.records;
            let plots = store.load_or_empty::<Plot>().await.records;
            add_record::<Crop, _>(store, |_| {
                prompts::prompt_crop(&fields, CropForm::new(), &farms, &plots, FormMode::add())
            })
            .await
        }
        CropCommand::List { farm, plot } => {
            let crops = store.load_or_empty::<Crop>().await.records;
            print_table(crops.iter().enumerate().filter(|(_, c)| {
                farm.as_deref().is_none_or(|f| c.farm == f)
                    && plot.as_deref().is_none_or(|p| c.plot == p)
            }));
            Ok(())
        }
        CropCommand::Edit { index, fields } => {
            let farms = store.load_or_empty::<Farm>().await.records;
            let plots = store.load_or_empty::<Plot>().await.records;
            let mode = FormMode::edit(prompts::crop_args_given(&fields));
            edit_record(store, index, |current: &Crop, _| {
                prompts::prompt_crop(&fields, CropForm::from_crop(current), &farms, &plots, mode)
            })
            .await?;
            Ok(())
        }
        CropCommand::Del { index, yes } => delete_record::<Crop>(store, index, yes).await,
    }
}

async fn handle_variety_command(
    cmd: RecordCommand<VarietyArgs>,
    store: &CollectionStore,
) -> Result<()> {
    match cmd {
        RecordCommand::Add { fields } => {
            add_record::<Variety, _>(store, |_| {
                prompts::prompt_variety(&fields, &Variety::default(), FormMode::add())
            })
            .await
        }
        RecordCommand::List => list_records::<Variety>(store).await,
        RecordCommand::Edit { index, fields } => {
            let mode = FormMode::edit(prompts::variety_args_given(&fields));
            edit_record(store, index, |current: &Variety, _| {
                prompts::prompt_variety(&fields, current, mode)
            })
            .await?;
            Ok(())
        }
        RecordCommand::Del { index, yes } => delete_record::<Variety>(store, index, yes).await,
    }
}

async fn handle_user_command(cmd: RecordCommand<UserArgs>, store: &CollectionStore) -> Result<()> {
    match cmd {
        RecordCommand::Add { fields } => {
            add_record::<User, _>(store, |_| {
                prompts::prompt_user(&fields, &User::default(), FormMode::add())
            })
            .await
        }
        RecordCommand::List => list_records::<User>(store).await,
        RecordCommand::Edit { index, fields } => {
            let mode = FormMode::edit(prompts::user_args_given(&fields));
            edit_record(store, index, |current: &User, _| {
                prompts::prompt_user(&fields, current, mode)
            })
            .await?;
            Ok(())
        }
        RecordCommand::Del { index, yes } => delete_record::<User>(store, index, yes).await,
    }
}

async fn handle_role_command(cmd: RecordCommand<RoleArgs>, store: &CollectionStore) -> Result<()> {
    match cmd {
        RecordCommand::Add { fields } => {
            add_record(store, |existing: &[Role]| {
                let form = prompts::prompt_role(&fields, &Role::default(), FormMode::add())?;
                Ok(form.build(existing, None)?)
            })
            .await
        }
        RecordCommand::List => list_records::<Role>(store).await,
        RecordCommand::Edit { index, fields } => {
            let mode = FormMode::edit(prompts::role_args_given(&fields));
            edit_record(store, index, |current: &Role, existing| {
                let form = prompts::prompt_role(&fields, current, mode)?;
                // The name is regenerated, so the role may change its number
                Ok(form.build(existing, Some(index))?)
            })
            .await?;
            Ok(())
        }
        RecordCommand::Del { index, yes } => delete_record::<Role>(store, index, yes).await,
    }
}

async fn login(session: &Session, email: Option<String>, choice: Option<bool>) -> Result<()> {
    let remembered = session.remembered_email().await?;
    let email = match email {
        Some(email) => email,
        None => prompts::prompt_email(remembered.as_deref())?,
    };
    let password = prompts::prompt_password()?;
    let remember = session.should_remember(choice).await?;

    let client = session.client().await?;
    println!("Logging in at {}", client.base_url());
    session.login(&email, &password, remember).await?;

    println!("{}", format!("Logged in as {}.", email).green());
    match (remember, remembered) {
        (true, _) => println!("Email remembered for the next login."),
        (false, Some(_)) => println!("Remembered email forgotten."),
        (false, None) => {}
    }
    Ok(())
}

async fn recover(store: &CollectionStore, email: &str) -> Result<()> {
    let users = store.load::<User>().await?;
    let ticket = request_password_reset(&users, email)?;

    println!("{}", "Password reset requested.".green());
    println!("Email: {}", ticket.email);
    println!("Reset token: {}", ticket.token.bold());
    Ok(())
}

async fn check(store: &CollectionStore) -> Result<()> {
    let farms = store.load::<Farm>().await?;
    let plots = store.load::<Plot>().await?;
    let crops = store.load::<Crop>().await?;

    let mut problems = 0;

    for i in dangling_references(&plots, &PLOT_FARM, &farms) {
        problems += 1;
        println!(
            "{} plot #{} '{}' refers to missing farm '{}'",
            "!".red(),
            i,
            plots[i].name,
            plots[i].farm
        );
    }

    for i in dangling_references(&crops, &CROP_FARM, &farms) {
        problems += 1;
        println!(
            "{} crop #{} ({}) refers to missing farm '{}'",
            "!".red(),
            i,
            crops[i].rice_type,
            crops[i].farm
        );
    }

    for i in dangling_crop_plots(&crops, &plots) {
        problems += 1;
        println!(
            "{} crop #{} ({}) refers to missing plot '{}' on farm '{}'",
            "!".red(),
            i,
            crops[i].rice_type,
            crops[i].plot,
            crops[i].farm
        );
    }

    if problems == 0 {
        println!("{}", "All references resolve.".green());
    } else {
        println!(
            "{}",
            format!("{} dangling reference(s).", problems).yellow()
        );
    }
    Ok(())
}

fn handle_config_command(cmd: &ConfigCommand, config: &AppConfig, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommand::Init => {
            if path.exists() {
                println!(
                    "{}",
                    format!("Config already exists at {}", path.display()).yellow()
                );
            } else {
                AppConfig::create_default(path)?;
                println!(
                    "{}",
                    format!("Created config at {}", path.display()).green()
                );
            }
        }
        ConfigCommand::Show => {
            println!("{} {}", "Config file:".bold(), path.display());
            if !path.exists() {
                println!("{}", "(not created yet, showing defaults)".yellow());
            }
            let backend = config
                .backend
                .unwrap_or_else(|| infer_backend_type(&config.data_path));
            println!("{} {}", "Backend:".bold(), backend);
            println!();
            print!("{}", serde_yaml::to_string(config)?);
        }
    }
    Ok(())
}
