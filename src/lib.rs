//! Strategic decision engine for computer-controlled nations in a
//! territory-conquest game.
//!
//! A [`FakeHuman`] is ticked once per game tick. On its own cadence it
//! consults four advisors (diplomacy, economy, strategic, military) and
//! submits their executions through an [`ExecutionSink`]. The game itself is
//! only seen through [`GameView`]; [`sim::GridWorld`] is a small reference
//! implementation used by the tests and the `fakehuman-sim` binary.

pub mod advisor;
pub mod config;
pub mod coordinator;
pub mod csv_export;
pub mod error;
pub mod game;
pub mod rng;
pub mod sampler;
pub mod sim;
pub mod targeting;

pub use advisor::{Advisor, AdvisorKind, Priority, Recommendation};
pub use config::AiConfig;
pub use coordinator::{FakeHuman, Phase, TickReport};
pub use error::{AiError, Result};
pub use game::{Execution, ExecutionSink, GameView, Nation, Owner, PlayerId, TileRef, UnitType};
pub use rng::PseudoRandom;
