//! Resolution of element references against the caches
//!
//! Resolution is all-or-nothing: one missing reference fails the whole
//! element and nothing partially resolved is left behind.

use butterfly_common::{Member, MemberKind, Result, Way};

use crate::cache::{CoordsCache, WaysCache};

/// Fills in node coordinates for a way's references.
pub trait CoordinateResolver: Send + Sync {
    /// Populate `way.nodes` in `way.refs` order, or fail without touching it.
    fn fill_way(&self, way: &mut Way) -> Result<()>;
}

impl CoordinateResolver for CoordsCache {
    fn fill_way(&self, way: &mut Way) -> Result<()> {
        let mut nodes = Vec::with_capacity(way.refs.len());
        for &node_id in &way.refs {
            nodes.push(self.get(node_id)?);
        }
        way.nodes = nodes;
        Ok(())
    }
}

impl WaysCache {
    /// Attach the cached way to every way member. Non-way members are left
    /// as they are.
    pub fn fill_members(&self, members: &mut [Member]) -> Result<()> {
        let mut resolved = Vec::new();
        for (idx, member) in members.iter().enumerate() {
            if member.kind != MemberKind::Way {
                continue;
            }
            resolved.push((idx, self.get(member.id)?));
        }
        for (idx, way) in resolved {
            members[idx].way = Some(way);
        }
        Ok(())
    }
}
