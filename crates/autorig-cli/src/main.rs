//! Autorig CLI - Command-line interface for procedural character rigs
//!
//! This binary provides commands for writing the humanoid template,
//! populating it into a rig, cleaning a rig back to its template, exporting
//! host manifests and evaluating poses.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use autorig_cli::commands;

/// Autorig - Procedural Character Rig Builder
#[derive(Parser)]
#[command(name = "autorig")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the built-in humanoid template
    Template {
        /// Output template JSON file
        #[arg(short, long)]
        out: String,
    },

    /// Instantiate a template and run the assembly pipeline
    Populate {
        /// Template JSON file
        #[arg(short, long)]
        template: String,

        /// Rig config JSON file (default: built-in config)
        #[arg(short, long)]
        config: Option<String>,

        /// Output rig JSON file
        #[arg(short, long)]
        out: String,

        /// Print the stage report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Clean a populated rig back to its template state
    Clean {
        /// Rig JSON file
        #[arg(short, long)]
        rig: String,

        /// Output rig JSON file
        #[arg(short, long)]
        out: String,
    },

    /// Export host-facing records with data paths
    Manifest {
        /// Rig JSON file
        #[arg(short, long)]
        rig: String,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Evaluate drivers and constraints and print channel values
    Eval {
        /// Rig JSON file
        #[arg(short, long)]
        rig: String,

        /// Set a switch property, e.g. fk_ik_left_arm=1
        #[arg(long = "set", value_name = "PROP=VALUE")]
        sets: Vec<String>,

        /// Key a pose channel, e.g. toe_left_roll_HDL.rot_x=0.5
        #[arg(long = "pose", value_name = "BONE.CHANNEL=VALUE")]
        poses: Vec<String>,

        /// Bones to print (default: every result bone)
        #[arg(short, long = "bone", value_name = "NAME")]
        bones: Vec<String>,

        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },
}

fn setup_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let result = match cli.command {
        Commands::Template { out } => commands::template::run(&out),
        Commands::Populate {
            template,
            config,
            out,
            json,
        } => commands::populate::run(&template, config.as_deref(), &out, json),
        Commands::Clean { rig, out } => commands::clean::run(&rig, &out),
        Commands::Manifest { rig, out } => commands::manifest::run(&rig, out.as_deref()),
        Commands::Eval {
            rig,
            sets,
            poses,
            bones,
            json,
        } => commands::eval::run(&rig, &sets, &poses, &bones, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
