//! Domain layer - Core carving logic
//!
//! This module contains the core domain entities, repository traits,
//! format parsers and domain services.

pub mod entities;
pub mod formats;
pub mod repositories;
pub mod services;
