//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `formbind_core` linkage.
//! - Walk one record through load, edit, save, external refresh and delete
//!   against an in-memory SQLite store, printing each outcome.
//!
//! Usage: `formbind_cli [--log-dir <absolute dir>] [--level <level>]`

use clap::Parser;
use formbind_core::db::open_db_in_memory;
use formbind_core::{
    init_logging, BindingController, ConfirmResponse, DataRecord, Field, FieldValue, FormField,
    FormPanel, Record, RecordStore, ScriptedDialogs, SqliteRecordStore, StoreHandle,
};
use futures::executor::block_on;
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::rc::Rc;

#[derive(Parser)]
#[command(name = "formbind_cli", version, about = "formbind smoke and demo runner")]
struct Cli {
    /// Absolute directory for rolling log files; logging stays off without it
    #[arg(long)]
    log_dir: Option<String>,
    /// Log level passed to the logger spec
    #[arg(long, default_value = "info")]
    level: String,
}

fn main() -> ExitCode {
    let args = Cli::parse();

    println!("formbind_core ping={}", formbind_core::ping());
    println!("formbind_core version={}", formbind_core::core_version());

    if let Some(log_dir) = args.log_dir.as_deref() {
        if let Err(err) = init_logging(&args.level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    }

    match run_demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo() -> Result<(), Box<dyn Error>> {
    let conn = Rc::new(open_db_in_memory()?);
    let store = SqliteRecordStore::new(Rc::clone(&conn)).into_handle();

    let record = DataRecord::new(["title", "body", "revision"]).into_handle();
    record.set("title", FieldValue::from("Groceries"));
    record.set("body", FieldValue::from("milk, eggs"));
    store.add(record.clone());
    block_on(Rc::clone(&store).sync())?;

    let panel = FormPanel::new()
        .with_field(FormField::text("title").required())
        .with_field(FormField::text("body"))
        .with_field(FormField::display("revision"))
        .into_handle();
    let dialogs = Rc::new(ScriptedDialogs::answering(ConfirmResponse::Yes));
    let controller = BindingController::builder(panel.clone(), dialogs.clone()).build()?;
    controller.on_save_success(|record| {
        info!(
            "event=demo_save_success module=cli record_id={}",
            record.map_or_else(|| "-".to_string(), |record| record.id().to_string())
        );
    });

    controller.load(record.clone(), Some(store.clone() as StoreHandle))?;
    print_form("loaded", &panel);

    if let Some(body) = panel.field("body") {
        body.set_value(FieldValue::from("milk, eggs, bread"));
    }
    let outcome = block_on(controller.on_save_click())?;
    println!("save outcome={outcome:?}");
    print_form("saved", &panel);

    if let Some(title) = panel.field("title") {
        title.set_value(FieldValue::from("Groceries (draft)"));
    }
    record.set("body", FieldValue::from("milk"));
    block_on(Rc::clone(&store).sync())?;
    print_form("refreshed with local title edit", &panel);

    let outcome = block_on(controller.on_delete_click())?;
    println!("delete outcome={outcome:?} remaining={}", store.len());
    Ok(())
}

fn print_form(label: &str, panel: &FormPanel) {
    let render = |name: &str| {
        panel
            .field(name)
            .map_or(FieldValue::Null, |field| field.value())
    };
    println!(
        "[{label}] title={:?} body={:?} revision={:?} dirty={}",
        render("title"),
        render("body"),
        render("revision"),
        panel
            .field("title")
            .is_some_and(|field| field.is_dirty())
    );
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn level_defaults_to_info_without_log_dir() {
        let cli = Cli::try_parse_from(["formbind_cli"]).unwrap();
        assert_eq!(cli.level, "info");
        assert!(cli.log_dir.is_none());
    }

    #[test]
    fn log_flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "formbind_cli",
            "--log-dir",
            "/tmp/formbind-logs",
            "--level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_dir.as_deref(), Some("/tmp/formbind-logs"));
        assert_eq!(cli.level, "debug");
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(Cli::try_parse_from(["formbind_cli", "--verbose"]).is_err());
    }
}
