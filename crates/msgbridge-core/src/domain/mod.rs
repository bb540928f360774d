//! Domain value types shared by every message schema.
//!
//! This module contains plain data with no I/O and no wire knowledge.  The
//! codec in [`crate::protocol::codec`] knows how to put these types on the
//! wire; the types themselves only know how to be compared and printed.
//!
//! # Why keep geometry apart from the codec? (for beginners)
//!
//! Messages such as "an object moved" carry positions and rotations.  The
//! same three-float position appears in many message schemas, so it is
//! defined once here and every schema reuses it.  Keeping it free of codec
//! code means application threads can pass positions around without pulling
//! in any protocol machinery.

/// Positions, directions, and rotations carried by world messages.
pub mod geometry;

/// Object identifiers.
pub type Oid = i64;
