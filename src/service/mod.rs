//! Service layer: relay orchestration.
//!
//! [`RelayService`] authorizes sessions, fans chat and status messages out
//! through the [`crate::domain::GroupRegistry`] and records each of them on
//! the [`crate::domain::EventBus`].

pub mod relay_service;

pub use relay_service::RelayService;
