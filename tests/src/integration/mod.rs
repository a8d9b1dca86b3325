//! End-to-end scenarios.

mod documents;
mod identities;
mod pipeline;
