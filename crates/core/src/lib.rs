//! Core business logic for Roster.
//!
//! This crate contains the seat billing engine with ZERO web or database
//! dependencies. Domain types, validation rules, calendar and proration
//! arithmetic, and the storage traits implemented by `roster-db` live here.
//!
//! # Modules
//!
//! - `seats` - Seat plans, upgrades, scheduled downgrades and cycle rollover

pub mod seats;
