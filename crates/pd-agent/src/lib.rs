//! `pd-agent` — one runnable parcel-delivery agent.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`builder`]   | `AgentBuilder` — wires world, comm, recovery, scheduler   |
//! | [`runtime`]   | `Agent` — sensing callbacks and the run loop              |
//! | [`env`]       | `GridEnv` — in-process environment implementing `Connector` |
//! | [`observer`]  | `TracingObserver` — forwards observer hooks to `tracing`  |
//! | [`error`]     | `AgentError`, `AgentResult<T>`                            |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let env = GridEnv::from_rows(&["D....."], GameConfig::default())?;
//! env.place_agent(AgentId(1), Position::new(5, 0))?;
//! let agent = Arc::new(
//!     AgentBuilder::new(AgentId(1), env.map())
//!         .position(Position::new(5, 0))
//!         .build(env.connector(AgentId(1)))?,
//! );
//! tokio::spawn(env.clone().pump(agent.clone(), shutdown.clone()));
//! agent.run(shutdown).await?;
//! ```

pub mod builder;
pub mod env;
pub mod error;
pub mod observer;
pub mod runtime;


pub use builder::AgentBuilder;
pub use env::{EnvConnector, GridEnv, Sensing};
pub use error::{AgentError, AgentResult};
pub use observer::TracingObserver;
pub use runtime::Agent;
