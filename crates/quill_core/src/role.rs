//! Roles a text generator can be asked to play.

use serde::{Deserialize, Serialize};

/// Every capability the engine may request from a text generator.
///
/// Roles are resolved against a registry at construction time; a role with no
/// registered handler is reported explicitly rather than looked up by string.
///
/// # Examples
///
/// ```
/// use quill_core::Role;
/// use std::str::FromStr;
///
/// assert_eq!(Role::FactChecker.to_string(), "fact_checker");
/// assert_eq!(Role::from_str("writer").unwrap(), Role::Writer);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Produces story prose and revisions
    Writer,
    /// Analyzes the idea and makes structural decisions
    Planner,
    /// Judges overall quality
    Editor,
    /// Checks facts and internal logic
    FactChecker,
    /// Reviews dialogue quality
    DialogueSpecialist,
    /// Reviews setting and sensory description
    EnvironmentSpecialist,
    /// Reviews pacing and narrative rhythm
    RhythmSpecialist,
    /// Extracts and archives story elements
    Archivist,
}
