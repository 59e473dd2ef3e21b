//! Shared test infrastructure.

pub mod mocks;

pub use mocks::MockController;
