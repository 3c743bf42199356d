//! FleetView Deterministic Simulation Testing (DST) Harness
//!
//! This crate provides a controlled simulation environment where the
//! tracking engine runs deterministically against simulated collaborators.
//!
//! # Core Principle: Virtual Time
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Tokio's paused clock advances only when every task is idle
//! - **Routing**: Great-circle routes with injectable outages, empty answers and flakiness
//! - **Randomness**: All entropy derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ current-thread runtime, paused clock (virtual time)   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                                                             │
//! │  SimClient ──request──► TrackingCoordinator ◄── SimRouting  │
//! │      ▲                        │                             │
//! │      │                   tickers (1/driver)                 │
//! │      │                        ▼                             │
//! │      └──────────────── LocalTransport (topics)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use fleetview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 8)
//!     .with_duration(30.0)
//!     .run(ScenarioId::StopRace);
//! assert!(result.passed);
//! ```

mod client;
mod context;
mod routing;
mod runner;
mod world;
pub mod scenarios;

pub use client::SimClient;
pub use context::SimContext;
pub use routing::{RoutingFault, SimRoutingEngine};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use world::{driver_name, SimConfig, SimCoordinator, SimWorld, Trip};
