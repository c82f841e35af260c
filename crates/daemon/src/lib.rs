//! # WebExplorer Daemon Library
//!
//! This crate provides the daemon (server) functionality for WebExplorer,
//! giving a browser read-only access to the host filesystem over HTTP.
//!
//! ## Overview
//!
//! The daemon runs on the machine whose files are being browsed. It provides:
//!
//! - **Directory Listing**: One JSON entry per child with size, type and extension
//! - **Volume Discovery**: Mounted roots and removable media
//! - **Content Delivery**: Whole-file downloads and byte-range streaming for media players
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   Daemon Orchestrator                    │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │              HTTP Router (axum)                    │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐    │
//! │  │  Directory   │  │    Volume    │  │     File     │    │
//! │  │   Browser    │  │    Source    │  │   Transfer   │    │
//! │  └──────────────┘  └──────────────┘  └──────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::{Config, DaemonOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!
//!     let orchestrator = DaemonOrchestrator::new(config)?;
//!     orchestrator.start().await?;
//!
//!     // Serve until told to stop...
//!
//!     orchestrator.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Listing, volume discovery, range resolution and streaming
//! - [`router`]: HTTP routes
//! - [`orchestrator`]: Server lifecycle

pub mod config;
pub mod files;
pub mod orchestrator;
pub mod router;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::{Config, ConfigError, EnvOverride};

// Re-export files types for convenience
pub use files::{
    ByteRange, DirectoryBrowser, FileStream, FileTransfer, MountDirVolumes, TransferError,
    VolumeSource,
};

// Re-export router types for convenience
pub use router::{build_router, AppState, RouteFailure, RouterError};

// Re-export orchestrator types for convenience
pub use orchestrator::{DaemonOrchestrator, OrchestratorEvent, OrchestratorState};
