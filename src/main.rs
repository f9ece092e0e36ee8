use clap::{Arg, Command};
use contact_form::config::{load_config, Config};
use contact_form::{RawSubmission, SubmissionHandler};
use log::LevelFilter;
use std::collections::BTreeMap;
use std::io::Read;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("contact-form")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate, spam-check and deliver contact form submissions")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path (YAML, or TOML with a .toml extension)")
                .default_value("/etc/contact-form.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Test configuration validity")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("submit")
                .long("submit")
                .value_name("FILE")
                .help("Process a JSON object of form fields ('-' reads stdin) and print the outcome")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        generate_default_config(generate_path);
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("/etc/contact-form.yaml");

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e:#}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        test_config(&config);
        return;
    }

    if let Some(submission_path) = matches.get_one::<String>("submit") {
        if let Err(e) = submit_file(config, submission_path).await {
            eprintln!("Error processing submission: {e:#}");
            process::exit(1);
        }
        return;
    }

    eprintln!("Nothing to do. Use --submit FILE to process a submission, or --help.");
    process::exit(2);
}

fn generate_default_config(path: &str) {
    let config = Config::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the recipient and sender addresses before use.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}

fn test_config(config: &Config) {
    println!("Testing configuration...");
    match config.validate() {
        Ok(()) => {
            println!("  Recipient: {}", config.to);
            if !config.cc.is_empty() {
                println!("  Cc: {}", config.cc);
            }
            if !config.bcc.is_empty() {
                println!("  Bcc: {}", config.bcc);
            }
            println!("  Sender: {}", config.from);
            println!("  Subject: {}", config.subject);
            println!("  Spam policy: {:?}", config.spam_policy);
            match &config.audit_log {
                Some(path) => println!("  Audit log: {path}"),
                None => println!("  Audit log: disabled"),
            }
            println!("Configuration is valid");
        }
        Err(e) => {
            eprintln!("Configuration is invalid: {e:#}");
            process::exit(1);
        }
    }
}

async fn submit_file(config: Config, path: &str) -> anyhow::Result<()> {
    let content = if path == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        std::fs::read_to_string(path)?
    };

    let pairs: BTreeMap<String, String> = serde_json::from_str(&content)?;
    let raw = (!pairs.is_empty()).then(|| RawSubmission::from_pairs(pairs));

    let handler = SubmissionHandler::from_config(config)?;
    let outcome = handler.handle(raw.as_ref()).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if let Some(notice) = outcome.notice() {
        log::info!("{notice}");
    }
    Ok(())
}
