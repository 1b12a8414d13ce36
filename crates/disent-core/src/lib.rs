#![deny(missing_docs)]
#![doc = "Core types for the disent workspace: Gaussian posteriors, the shared error taxonomy and deterministic randomness."]

pub mod errors;
pub mod float_serde;
pub mod posterior;
pub mod provenance;
pub mod rng;

pub use errors::{DisentError, ErrorInfo};
pub use posterior::{matrix_from_rows, matrix_to_rows, GaussianPosterior, PosteriorRows};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
