//! 수집 모듈.

pub mod reconcile;

pub use reconcile::{open_store, Reconciler};
