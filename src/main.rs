// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Mass Assignment Radar - Standalone CLI
 * Imports a wire-format request, runs one scan against the live target
 * and prints the result envelope as JSON
 *
 * (c) 2026 Bountyy Oy
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use mass_radar::http_client::LiveStore;
use mass_radar::rpc::{CreateFindingsRequest, RadarApi};
use mass_radar::sink::MemorySink;
use mass_radar::store::RawRequestInput;
use mass_radar::types::{Envelope, ScanConfig, ValueModes, VerificationConfig};

/// Mass Assignment Radar - JSON API mass-assignment scanner
#[derive(Parser)]
#[command(name = "massradar")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version = "0.4.0")]
#[command(about = "Mutation-based mass-assignment scanner for JSON APIs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a stored request for mass-assignment defects
    Scan {
        /// Wire-format HTTP request file
        #[arg(short, long)]
        request: PathBuf,

        /// Target host the raw request is sent to
        #[arg(long)]
        host: String,

        /// Target port
        #[arg(long, default_value = "443")]
        port: u32,

        /// Use TLS when the request target is relative
        #[arg(long, default_value = "true")]
        tls: bool,

        /// Maximum mutations to send (1-256)
        #[arg(long, default_value = "32")]
        max_mutations: u32,

        /// Skip the built-in candidate field list
        #[arg(long)]
        no_builtin_fields: bool,

        /// Extra candidate field (repeatable; dotted paths allowed)
        #[arg(short = 'f', long = "field")]
        fields: Vec<String>,

        /// Extra candidate value (repeatable; parsed like config values)
        #[arg(long = "value")]
        values: Vec<String>,

        /// Also overwrite fields already present in the body
        #[arg(long)]
        mutate_existing: bool,

        /// Inject the number 1
        #[arg(long)]
        number_one: bool,

        /// Increment existing numeric values
        #[arg(long)]
        plus_one: bool,

        /// Decrement existing numeric values
        #[arg(long)]
        minus_one: bool,

        /// Replay the baseline after each reflection to confirm persistence
        #[arg(long)]
        confirm_persistence: bool,

        /// Delay before the persistence replay, in milliseconds
        #[arg(long, default_value = "0")]
        persistence_delay_ms: i64,

        /// Follow-up verification URL (path or absolute)
        #[arg(long)]
        verify_url: Option<String>,

        /// Follow-up verification method
        #[arg(long, default_value = "GET")]
        verify_method: String,

        /// Delay before each follow-up request, in milliseconds
        #[arg(long, default_value = "0")]
        verify_delay_ms: i64,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Deliver findings to an in-memory sink and print the records
        #[arg(long)]
        report: bool,
    },

    /// Print the stored-request preview for a wire-format request file
    Preview {
        /// Wire-format HTTP request file
        #[arg(short, long)]
        request: PathBuf,

        #[arg(long)]
        host: String,

        #[arg(long, default_value = "443")]
        port: u32,

        #[arg(long, default_value = "true")]
        tls: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("massradar")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan {
            request,
            host,
            port,
            tls,
            max_mutations,
            no_builtin_fields,
            fields,
            values,
            mutate_existing,
            number_one,
            plus_one,
            minus_one,
            confirm_persistence,
            persistence_delay_ms,
            verify_url,
            verify_method,
            verify_delay_ms,
            timeout,
            report,
        } => {
            let raw = std::fs::read_to_string(&request)
                .with_context(|| format!("failed to read {}", request.display()))?;

            let store = Arc::new(LiveStore::new(timeout)?);
            let sink = Arc::new(MemorySink::new());
            let api = RadarApi::new(store, sink.clone());

            let saved = match api
                .save_request_from_raw(RawRequestInput {
                    host,
                    port,
                    is_tls: tls,
                    raw,
                })
                .await
            {
                Envelope::Ok { value } => value,
                Envelope::Error { error } => anyhow::bail!("{}", error),
            };
            info!("imported baseline request {} as {}", saved.url, saved.id);

            let verification = match verify_url {
                Some(url) => VerificationConfig::FollowUp {
                    url,
                    method: verify_method,
                    body: String::new(),
                    delay_ms: verify_delay_ms,
                },
                None => VerificationConfig::Disabled,
            };

            let config = ScanConfig {
                max_mutations,
                include_built_in_candidates: !no_builtin_fields,
                candidate_fields: fields,
                custom_values: values,
                mutate_existing_fields: mutate_existing,
                value_modes: ValueModes {
                    boolean_true: true,
                    string_admin: true,
                    number_one,
                    number_plus_one: plus_one,
                    number_minus_one: minus_one,
                },
                confirm_persistence,
                persistence_delay_ms,
                verification,
            };

            let result = api.run_scan(&saved.id, config).await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if report {
                if let Envelope::Ok { value } = &result {
                    if !value.findings.is_empty() {
                        let delivered = api
                            .create_findings(CreateFindingsRequest {
                                request_id: value.request_id.clone(),
                                findings: value.findings.clone(),
                            })
                            .await;
                        println!("{}", serde_json::to_string_pretty(&delivered)?);
                        println!("{}", serde_json::to_string_pretty(&sink.records())?);
                    }
                }
            }

            if result.error().is_some() {
                std::process::exit(1);
            }
        }

        Commands::Preview {
            request,
            host,
            port,
            tls,
        } => {
            let raw = std::fs::read_to_string(&request)
                .with_context(|| format!("failed to read {}", request.display()))?;

            let store = Arc::new(LiveStore::new(30)?);
            let sink = Arc::new(MemorySink::new());
            let api = RadarApi::new(store, sink);

            let saved = match api
                .save_request_from_raw(RawRequestInput {
                    host,
                    port,
                    is_tls: tls,
                    raw,
                })
                .await
            {
                Envelope::Ok { value } => value,
                Envelope::Error { error } => anyhow::bail!("{}", error),
            };

            match api.get_request_preview(&saved.id).await {
                Envelope::Ok { value } => {
                    println!("{}", value.request_text);
                    if let Some(response_text) = value.response_text {
                        println!("---");
                        println!("{}", response_text);
                    }
                }
                Envelope::Error { error } => anyhow::bail!("{}", error),
            }
        }
    }

    Ok(())
}
