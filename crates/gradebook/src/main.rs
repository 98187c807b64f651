//! `gradebook` - CLI for the gradebook web application
//!
//! Runs the HTTP server and offers a few maintenance commands against the
//! configured database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use gradebook::cli::{Cli, Command, ConfigCommand, ListCommand, OutputFormat, ServeCommand};
use gradebook::{init_logging, web, Config, RecordService, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Serve(serve_cmd) => handle_serve(config, &serve_cmd),
        Command::InitDb => handle_init_db(&config),
        Command::Students(list_cmd) => handle_students(&config, &list_cmd),
        Command::Grades(list_cmd) => handle_grades(&config, &list_cmd),
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
    }
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    if let Some(bind) = &cmd.bind {
        config.server.bind_address.clone_from(bind);
        config.validate()?;
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(web::run(&config))?;
    Ok(())
}

fn open_records(config: &Config) -> anyhow::Result<RecordService> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open database {}", path.display()))?;
    Ok(RecordService::new(storage))
}

fn handle_init_db(config: &Config) -> anyhow::Result<()> {
    let records = open_records(config)?;
    let storage = records.storage();
    storage.initialize_schema()?;

    println!("Database:  {}", storage.path().display());
    println!("Students:  {}", storage.count_students()?);
    println!("Grades:    {}", storage.count_grades()?);
    Ok(())
}

fn handle_students(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let students = open_records(config)?.list_students()?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&students)?),
        OutputFormat::Table => {
            println!("{:>5}  {:<30}  {:<15}  Email", "ID", "Name", "Registration");
            for s in &students {
                println!(
                    "{:>5}  {:<30}  {:<15}  {}",
                    s.id,
                    s.name,
                    s.registration_number,
                    s.email.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn handle_grades(config: &Config, cmd: &ListCommand) -> anyhow::Result<()> {
    let grades = open_records(config)?.list_grades()?;

    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&grades)?),
        OutputFormat::Table => {
            println!("{:>5}  {:<30}  {:<20}  Score", "ID", "Student", "Subject");
            for g in &grades {
                println!(
                    "{:>5}  {:<30}  {:<20}  {}",
                    g.id, g.student_name, g.subject, g.score
                );
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                let mut shown = config.clone();
                shown.auth.password = "***".to_string();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Auth]");
                println!("  Username:           {}", config.auth.username);
                println!("  Password:           ***");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Server]");
                println!("  Bind address:       {}", config.server.bind_address);
                println!("  Session cookie:     {}", config.server.session_cookie);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
