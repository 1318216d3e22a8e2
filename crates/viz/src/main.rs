//! Factory line viewer
//!
//! Run with: cargo run -p viz
//!
//! Examples:
//!   cargo run -p viz -- --auto-start --workers 2
//!   cargo run -p viz -- --passive --server http://10.0.0.5:8000
//!   cargo run -p viz -- --headless --fast-forward --seed 7

use bevy::prelude::*;
use clap::Parser;
use std::process::ExitCode;

use viz::cli::Args;
use viz::runner::{RunnerConfig, Session};
use viz::{headless, FactoryVizPlugin};

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match args.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.headless {
        headless::init_logging();
        return match headless::run(&settings, args.fast_forward) {
            Ok(summary) => match serde_json::to_string_pretty(&summary) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("error: {}", e);
                    ExitCode::FAILURE
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "headless run failed");
                ExitCode::FAILURE
            }
        };
    }

    let session = match Session::connect(&settings) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    App::new()
        .insert_resource(RunnerConfig {
            settings,
            auto_start: args.auto_start,
            passive: args.passive,
        })
        .insert_resource(session)
        .add_plugins(FactoryVizPlugin)
        .run();

    ExitCode::SUCCESS
}
