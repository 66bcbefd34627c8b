//! Lazy, thread-safe member-range resolution (ECMA-335's "list-owning" row
//! columns: `Field`, `MethodList`, `ParamList`, and the two map tables).
//!
//! A [`MemberRangeResolver`] is configured once with a target table and
//! populated on first use by walking every row of an owning table in RID
//! order, pairing each owner with the half-open run its row's "first of
//! run" column opens (closed by the next owner's column, or by the target
//! table's row count for the last owner). The result is cached as two maps:
//! owner RID -> range (forward) and member RID -> owner RID (inverse).

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::tables::TableId;
use crate::token::MetadataRange;

/// The populated forward/inverse maps for one owning relation.
#[derive(Debug)]
struct RangeMaps {
    forward: HashMap<u32, MetadataRange>,
    inverse: HashMap<u32, u32>,
}

/// Resolves an owning relation (e.g. TypeDef -> Field) lazily and caches it
/// for the lifetime of the [`crate::module::Module`] that owns it.
#[derive(Debug, Default)]
pub struct MemberRangeResolver {
    target: TableId,
    maps: OnceLock<RangeMaps>,
}

impl MemberRangeResolver {
    #[must_use]
    pub fn new(target: TableId) -> Self {
        Self {
            target,
            maps: OnceLock::new(),
        }
    }

    fn maps(&self, build: impl FnOnce() -> RangeMaps) -> &RangeMaps {
        self.maps.get_or_init(build)
    }

    /// The range owned by `owner_rid`, or an empty range if it owns nothing
    /// (including if `owner_rid` is nil or unknown).
    pub fn range_for_owner(&self, owner_rid: u32, build: impl FnOnce() -> RangeBuild) -> MetadataRange {
        let target = self.target;
        self.maps(|| run_build(target, build()))
            .forward
            .get(&owner_rid)
            .copied()
            .unwrap_or(MetadataRange::empty(target, 0))
    }

    /// The owner of `member_rid`, if any row in the target table claims it.
    pub fn owner_of(&self, member_rid: u32, build: impl FnOnce() -> RangeBuild) -> Option<u32> {
        let target = self.target;
        self.maps(|| run_build(target, build()))
            .inverse
            .get(&member_rid)
            .copied()
    }
}

/// Everything [`MemberRangeResolver`] needs to walk an owning table once:
/// how many owner rows there are, how many rows the target table has, the
/// first-of-run column for owner `k` (1-based), and the owner RID for owner
/// row `k` (identity for TypeDef/MethodDef, `row.parent` for the two map
/// tables).
pub struct RangeBuild {
    pub owner_count: u32,
    pub target_count: u32,
    pub start_of: Box<dyn Fn(u32) -> u32>,
    pub owner_of_row: Box<dyn Fn(u32) -> u32>,
}

fn run_build(target: TableId, build: RangeBuild) -> RangeMaps {
    let mut forward = HashMap::new();
    let mut inverse = HashMap::new();

    for k in 1..=build.owner_count {
        let start = (build.start_of)(k);
        let end = if k == build.owner_count {
            build.target_count + 1
        } else {
            (build.start_of)(k + 1)
        };

        let range = if start > build.target_count + 1 {
            MetadataRange::empty(target, start.min(build.target_count + 1))
        } else {
            MetadataRange::new(target, start, end)
        };

        let owner_rid = (build.owner_of_row)(k);
        for token in range.iter() {
            inverse.insert(token.rid(), owner_rid);
        }
        forward.insert(owner_rid, range);
    }

    RangeMaps { forward, inverse }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(starts: &'static [u32], target_count: u32, owners: &'static [u32]) -> RangeBuild {
        RangeBuild {
            owner_count: starts.len() as u32,
            target_count,
            start_of: Box::new(move |k| starts[(k - 1) as usize]),
            owner_of_row: Box::new(move |k| owners[(k - 1) as usize]),
        }
    }

    #[test]
    fn forward_map_covers_every_owner_disjointly() {
        let resolver = MemberRangeResolver::new(TableId::Field);
        let r1 = resolver.range_for_owner(1, || build(&[1, 1, 5], 6, &[1, 2, 3]));
        assert_eq!(r1, MetadataRange::new(TableId::Field, 1, 1));
        let r2 = resolver.owner_of(1, || build(&[1, 1, 5], 6, &[1, 2, 3]));
        // cached after first build call; inverse agrees with forward.
        assert_eq!(r2, Some(2));
        let r3 = resolver.range_for_owner(3, || build(&[1, 1, 5], 6, &[1, 2, 3]));
        assert_eq!(r3, MetadataRange::new(TableId::Field, 5, 7));
    }

    #[test]
    fn identity_owner_relation_round_trips() {
        let resolver = MemberRangeResolver::new(TableId::MethodDef);
        let range = resolver.range_for_owner(2, || build(&[1, 3, 3], 5, &[1, 2, 3]));
        assert_eq!(range, MetadataRange::new(TableId::MethodDef, 3, 3));
        assert_eq!(resolver.owner_of(4, || build(&[1, 3, 3], 5, &[1, 2, 3])), Some(3));
    }

    #[test]
    fn unknown_owner_yields_empty_range() {
        let resolver = MemberRangeResolver::new(TableId::Param);
        let range = resolver.range_for_owner(999, || build(&[1, 1], 2, &[1, 2]));
        assert!(range.is_empty());
    }

    #[test]
    fn parent_indirection_relation_maps_by_parent_rid() {
        // PropertyMap rows 1,2 with parent TypeDef rids 7 and 3; property
        // lists [1, 4] over a 5-row Property table.
        let resolver = MemberRangeResolver::new(TableId::Property);
        let owned_by_7 = resolver.range_for_owner(7, || build(&[1, 4], 5, &[7, 3]));
        assert_eq!(owned_by_7, MetadataRange::new(TableId::Property, 1, 4));
        let owned_by_3 = resolver.range_for_owner(3, || build(&[1, 4], 5, &[7, 3]));
        assert_eq!(owned_by_3, MetadataRange::new(TableId::Property, 4, 6));
    }
}
