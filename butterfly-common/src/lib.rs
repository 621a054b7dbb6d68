//! Common types for the butterfly-osm import toolkit

pub mod element;
pub mod error;

pub use element::{Element, ElementRef, EntityKind, Member, MemberKind, Node, Tags, Way};
pub use error::{Error, Result};
