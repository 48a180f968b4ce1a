use std::process;

use clap::Parser;
use log::{error, info};
use serde_json::json;
use subst_core::SubstitutionEngine;
use subst_engine::DockerCli;
use subst_persistence::{build_pool, PgPackageStore};
use substflow_rust::cli::{exit_code, Cli, Command, SubstituteArgs, EXIT_FAILURE, EXIT_OK, EXIT_USAGE};
use substflow_rust::AppConfig;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
                             .with_writer(std::io::stderr)
                             .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Command::Substitute(args) => substitute(args).await,
    };
    process::exit(code);
}

async fn substitute(args: SubstituteArgs) -> i32 {
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[substflow] configuration error: {e}");
            return EXIT_USAGE;
        }
    };
    let db = match config.require_database() {
        Ok(db) => db.clone(),
        Err(e) => {
            eprintln!("[substflow] {e}");
            return EXIT_USAGE;
        }
    };
    // El pool corre migraciones y es bloqueante.
    let pool = match tokio::task::spawn_blocking(move || build_pool(&db.url, db.min_connections, db.max_connections)).await {
        Ok(Ok(pool)) => pool,
        Ok(Err(e)) => {
            eprintln!("[substflow] pool error: {e}");
            return EXIT_FAILURE;
        }
        Err(e) => {
            eprintln!("[substflow] pool task failed: {e}");
            return EXIT_FAILURE;
        }
    };

    let store = PgPackageStore::from_pool(pool);
    let docker = DockerCli::new(&config.docker_bin);
    let mut engine = SubstitutionEngine::new(config.pipeline_config(), store, docker);

    let outcome = match engine.substitute(args.to_draft(), &args.user, args.id.clone()).await {
        Ok(o) => o,
        Err(e) => {
            error!("substitution failed ({}): {e}", e.status_code());
            eprintln!("[substflow] {e}");
            return exit_code(&e);
        }
    };
    info!("created compendium {}", outcome.id);

    let mut report = json!({ "outcome": outcome });
    if args.run {
        match engine.run_substituted(&outcome).await {
            Ok(run) => report["run"] = json!(run),
            Err(e) => {
                eprintln!("[substflow] {e}");
                print_json(&report);
                return exit_code(&e);
            }
        }
    }
    print_json(&report);
    EXIT_OK
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("[substflow] could not serialize output: {e}"),
    }
}
