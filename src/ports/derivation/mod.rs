mod deriver;

pub use deriver::{DeriveError, DerivedArtifact, Deriver, StyleRegistry};
