//! Decision-network core library.
//!
//! Exact inference over discrete Bayesian networks, extended with decision
//! and utility nodes:
//! - [`factor`]: dense factor tables and their algebra
//! - [`model`]: validated network construction
//! - [`inference`]: variable elimination with pluggable orderings
//! - [`decision`]: Maximum Expected Utility action selection
//! - [`error`], [`exit_codes`], [`logging`], [`config`]: ambient plumbing
//!
//! The `dn` binary in `main.rs` drives all of this from the command line.
//!
//! ```
//! use dn_core::inference::{Evidence, VariableElimination};
//! use dn_core::model::NetworkBuilder;
//!
//! let mut b = NetworkBuilder::new();
//! b.add_variable("Rain", &["no", "yes"], &[] as &[&str]).unwrap();
//! b.add_variable("Wet", &["no", "yes"], &["Rain"]).unwrap();
//! b.set_cpt("Rain", &[0.8, 0.2]).unwrap();
//! b.set_cpt("Wet", &[0.9, 0.1, 0.1, 0.9]).unwrap();
//! let net = b.build().unwrap();
//!
//! let engine = VariableElimination::new(&net);
//! let post = engine.infer("Rain", &Evidence::new().with("Wet", "yes")).unwrap();
//! assert!(post.probability("Rain", "yes").unwrap() > 0.2);
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod exit_codes;
pub mod factor;
pub mod inference;
pub mod logging;
pub mod model;
pub mod output;

pub use config::EngineConfig;
pub use decision::{DecisionError, DecisionEvaluator, DecisionResult};
pub use error::{Error, ErrorCategory, ErrorReport, Result};
pub use factor::{Factor, FactorError, VarId};
pub use inference::{Evidence, InferenceError, Posterior, VariableElimination};
pub use model::{ModelError, Network, NetworkBuilder};
