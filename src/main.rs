//! Manual smoke-test harness for the container-metadata resolution core.
//!
//! Resolves a single container id against a live runtime socket and prints
//! the resulting descriptor. Not part of the library; useful for checking a
//! `docker_socket_path`/`api_version` combination against a real daemon.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use tracing::info;

use container_meta_resolver::{ContainerDescriptor, ContainerManager, MetadataResolver, ResolverConfig, ThreadInfo};

#[derive(Parser)]
#[command(name = "container-meta-resolver")]
#[command(about = "Resolve one container id against a runtime socket and print the descriptor")]
#[command(version)]
struct Cli {
    /// Container id as seen by the runtime (or the OS-reported id to resolve)
    container_id: String,

    /// Path to the runtime's UNIX domain socket
    #[arg(long, env = "CMR_DOCKER_SOCKET", default_value = "/var/run/docker.sock")]
    socket: String,

    /// Socket connect/read timeout, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    timeout_ms: u64,

    /// Skip the image-info sub-fetch
    #[arg(long)]
    no_image_info: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

/// Bare in-memory manager: enough to observe what the resolver publishes.
#[derive(Default)]
struct InMemoryManager {
    containers: Mutex<HashMap<String, ContainerDescriptor>>,
}

impl ContainerManager for InMemoryManager {
    fn get_container(&self, id: &str) -> Option<ContainerDescriptor> {
        self.containers.lock().get(id).cloned()
    }

    fn add_container(&self, descriptor: ContainerDescriptor, _thread_info: &ThreadInfo) {
        self.containers.lock().insert(descriptor.id.clone(), descriptor);
    }

    fn notify_new_container(&self, descriptor: ContainerDescriptor) {
        info!(id = %descriptor.id, image = %descriptor.image, "container descriptor complete");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("container_meta_resolver={}", log_level).into()),
        )
        .init();

    let config = ResolverConfig {
        query_image_info: !cli.no_image_info,
        docker_socket_path: cli.socket.clone(),
        socket_timeout_ms: cli.timeout_ms,
        ..ResolverConfig::default()
    };

    let manager = Arc::new(InMemoryManager::default());
    let dispatcher = MetadataResolver::new(&config, manager.clone());

    let thread_info = ThreadInfo { container_id: Some(cli.container_id.clone()), name_hint: None };

    info!(socket = %config.docker_socket_path, id = %cli.container_id, "resolving");
    let mut complete = dispatcher.resolve(&thread_info, true);

    // lookup() never blocks the caller (max_wait_ms stays 0 on the dispatch
    // path); give the background worker a short window to land the result
    // before printing, since this is a one-shot CLI rather than a long-lived
    // agent loop.
    let deadline = Instant::now() + Duration::from_millis(cli.timeout_ms + 500);
    while !complete && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(25));
        complete = manager.get_container(&cli.container_id).map(|d| d.metadata_complete).unwrap_or(false);
    }

    let descriptor = manager.get_container(&cli.container_id);
    let resolved_at = chrono::Local::now();
    match descriptor {
        Some(d) => {
            println!("resolved at {}", resolved_at.to_rfc3339());
            println!("{}", serde_json::to_string_pretty(&d)?);
        }
        None => println!("no descriptor recorded for {}", cli.container_id),
    }

    if !complete {
        std::process::exit(1);
    }
    Ok(())
}
