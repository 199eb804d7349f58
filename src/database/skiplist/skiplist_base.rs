use std::fmt::Debug;

use slotmap::{new_key_type, SlotMap};

use super::{safety::check, LexRange, ScoreRange, SkipListStatistics, ValidationError};

/// Maximum number of levels of a node.
pub const SKIPLIST_MAXLEVEL: usize = 32;

/// Probability of a node reaching the next level, as a fraction of 0xFFFF.
const P_THRESHOLD: u32 = (0.25 * 0xFFFF as f64) as u32;
const MASK: u32 = 0xFFFF;

new_key_type! {
    /// Handle of a node; valid until the node is deleted.
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, Default)]
struct Level {
    forward: Option<NodeId>,
    /// Number of level-0 steps this link jumps over.
    span: u64,
}

/// Skip-list node holding one (score, member) pair.
#[derive(Debug, Clone)]
pub struct Node<M> {
    member: M,
    score: f64,
    backward: Option<NodeId>,
    levels: Vec<Level>,
}

/// Ordered set of (score, member) pairs with rank support, as used by sorted
/// sets.
///
/// Ordering is by score, ties broken by member. Every level link carries the
/// number of nodes it skips, so the rank of a node is the sum of spans on
/// the search path. Nodes live in an arena; links are arena handles and the
/// header is stored separately, so a position is written `Option<NodeId>`
/// with `None` meaning the header.
#[derive(Debug, Clone)]
pub struct SkipList<M> {
    nodes: SlotMap<NodeId, Node<M>>,
    header: [Level; SKIPLIST_MAXLEVEL],
    tail: Option<NodeId>,
    length: usize,
    level: usize,
    rng: fastrand::Rng,
}

/// Forward iterator over `(&member, score)`.
pub struct SkipListIter<'a, M> {
    list: &'a SkipList<M>,
    current: Option<NodeId>,
}

/// Backward iterator over `(&member, score)`, following backward links.
pub struct ReverseIter<'a, M> {
    list: &'a SkipList<M>,
    current: Option<NodeId>,
}

////////////////////////////////////////////////////////////////////////////////
// Inherent methods
////////////////////////////////////////////////////////////////////////////////

impl<M> Node<M> {
    pub fn member(&self) -> &M {
        &self.member
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Number of levels of this node.
    pub fn level(&self) -> usize {
        self.levels.len()
    }
}

impl<M> SkipList<M>
where
    M: Ord + Debug,
{
    pub fn new() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }

    /// Creates a list drawing node levels from `rng`, for reproducible
    /// layouts.
    pub fn with_rng(rng: fastrand::Rng) -> Self {
        SkipList {
            nodes: SlotMap::with_key(),
            header: [Level::default(); SKIPLIST_MAXLEVEL],
            tail: None,
            length: 0,
            level: 1,
            rng,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Highest level currently in use.
    #[inline]
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn node(
        &self,
        id: NodeId,
    ) -> Option<&Node<M>> {
        self.nodes.get(id)
    }

    /// Member and score of a node.
    pub fn get(
        &self,
        id: NodeId,
    ) -> Option<(&M, f64)> {
        self.nodes.get(id).map(|n| (&n.member, n.score))
    }

    /// First node in order.
    pub fn first(&self) -> Option<NodeId> {
        self.header[0].forward
    }

    /// Last node in order.
    pub fn last(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn next(
        &self,
        id: NodeId,
    ) -> Option<NodeId> {
        self.nodes.get(id)?.levels[0].forward
    }

    pub fn prev(
        &self,
        id: NodeId,
    ) -> Option<NodeId> {
        self.nodes.get(id)?.backward
    }

    pub fn iter(&self) -> SkipListIter<'_, M> {
        SkipListIter {
            list: self,
            current: self.first(),
        }
    }

    pub fn iter_rev(&self) -> ReverseIter<'_, M> {
        ReverseIter {
            list: self,
            current: self.tail,
        }
    }

    /// Iterates forward starting at `id`.
    pub fn iter_from(
        &self,
        id: Option<NodeId>,
    ) -> SkipListIter<'_, M> {
        SkipListIter {
            list: self,
            current: id,
        }
    }

    /// Iterates backward starting at `id`.
    pub fn iter_rev_from(
        &self,
        id: Option<NodeId>,
    ) -> ReverseIter<'_, M> {
        ReverseIter {
            list: self,
            current: id,
        }
    }

    /// Inserts a pair that must not already be present.
    pub fn insert(
        &mut self,
        score: f64,
        member: M,
    ) -> NodeId {
        debug_assert!(!score.is_nan(), "skip list score must not be NaN");

        let mut update: [Option<NodeId>; SKIPLIST_MAXLEVEL] = [None; SKIPLIST_MAXLEVEL];
        let mut rank = [0u64; SKIPLIST_MAXLEVEL];
        let mut x: Option<NodeId> = None;

        for i in (0..self.level).rev() {
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            while let Some(next) = self.link(x, i).forward {
                let n = &self.nodes[next];
                if n.score < score || (n.score == score && n.member < member) {
                    rank[i] += self.link(x, i).span;
                    x = Some(next);
                } else {
                    break;
                }
            }
            update[i] = x;
        }

        let level = self.random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.header[i].span = self.length as u64;
            }
            self.level = level;
        }

        let id = self.nodes.insert(Node {
            member,
            score,
            backward: update[0],
            levels: vec![Level::default(); level],
        });

        for i in 0..level {
            let prev = *self.link(update[i], i);
            let node = &mut self.nodes[id];
            node.levels[i].forward = prev.forward;
            node.levels[i].span = prev.span - (rank[0] - rank[i]);

            let prev_link = self.link_mut(update[i], i);
            prev_link.forward = Some(id);
            prev_link.span = (rank[0] - rank[i]) + 1;
        }

        // Levels above the new node now jump over one more node.
        for i in level..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        match self.nodes[id].levels[0].forward {
            Some(next) => self.nodes[next].backward = Some(id),
            None => self.tail = Some(id),
        }
        self.length += 1;
        id
    }

    /// Removes the pair if present.
    pub fn delete(
        &mut self,
        score: f64,
        member: &M,
    ) -> bool {
        self.remove(score, member).is_some()
    }

    /// Removes the pair and returns its member.
    pub fn remove(
        &mut self,
        score: f64,
        member: &M,
    ) -> Option<M> {
        let update = self.find_update(score, member);
        let x = self.link(update[0], 0).forward?;
        let node = &self.nodes[x];
        if node.score == score && node.member == *member {
            self.delete_node(x, &update);
            return self.nodes.remove(x).map(|n| n.member);
        }
        None
    }

    /// Moves `member` from `cur_score` to `new_score`. Returns the node's
    /// handle, which changes if the node had to be reinserted, or `None` if
    /// the pair was not found.
    pub fn update_score(
        &mut self,
        cur_score: f64,
        member: &M,
        new_score: f64,
    ) -> Option<NodeId> {
        let update = self.find_update(cur_score, member);
        let x = self.link(update[0], 0).forward?;
        {
            let node = &self.nodes[x];
            if node.score != cur_score || node.member != *member {
                return None;
            }
        }

        // Still between the same neighbours: update in place.
        let node = &self.nodes[x];
        let prev_ok = node
            .backward
            .map_or(true, |p| self.nodes[p].score < new_score);
        let next_ok = node.levels[0]
            .forward
            .map_or(true, |n| self.nodes[n].score > new_score);
        if prev_ok && next_ok {
            self.nodes[x].score = new_score;
            return Some(x);
        }

        self.delete_node(x, &update);
        let node = self.nodes.remove(x)?;
        Some(self.insert(new_score, node.member))
    }

    /// 1-based rank of the pair, `None` if absent.
    pub fn rank_of(
        &self,
        score: f64,
        member: &M,
    ) -> Option<u64> {
        let mut rank = 0u64;
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let n = &self.nodes[next];
                if n.score < score || (n.score == score && n.member <= *member) {
                    rank += self.link(x, i).span;
                    x = Some(next);
                } else {
                    break;
                }
            }
            if let Some(id) = x {
                let n = &self.nodes[id];
                if n.score == score && n.member == *member {
                    return Some(rank);
                }
            }
        }
        None
    }

    /// Node at 1-based `rank`.
    pub fn by_rank(
        &self,
        rank: u64,
    ) -> Option<NodeId> {
        if rank == 0 {
            return None;
        }
        let mut traversed = 0u64;
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let span = self.link(x, i).span;
                if traversed + span > rank {
                    break;
                }
                traversed += span;
                x = Some(next);
            }
            if traversed == rank {
                return x;
            }
        }
        None
    }

    ////////////////////////////////////////////////////////////////////////////
    // Score ranges
    ////////////////////////////////////////////////////////////////////////////

    /// Whether `range` overlaps the span from the lowest to the highest
    /// score. A `true` answer does not guarantee a node inside it: the
    /// range may sit in a gap between two neighbours.
    pub fn is_in_range(
        &self,
        range: &ScoreRange,
    ) -> bool {
        if range.is_empty() {
            return false;
        }
        match (self.tail, self.header[0].forward) {
            (Some(tail), Some(first)) => {
                range.value_gte_min(self.nodes[tail].score)
                    && range.value_lte_max(self.nodes[first].score)
            }
            _ => false,
        }
    }

    /// First node whose score is inside `range`.
    pub fn first_in_range(
        &self,
        range: &ScoreRange,
    ) -> Option<NodeId> {
        if !self.is_in_range(range) {
            return None;
        }
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if range.value_gte_min(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
        }
        let x = self.link(x, 0).forward?;
        range.value_lte_max(self.nodes[x].score).then_some(x)
    }

    /// Last node whose score is inside `range`.
    pub fn last_in_range(
        &self,
        range: &ScoreRange,
    ) -> Option<NodeId> {
        if !self.is_in_range(range) {
            return None;
        }
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !range.value_lte_max(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
        }
        let x = x?;
        range.value_gte_min(self.nodes[x].score).then_some(x)
    }

    /// Removes every node inside `range`, returning the removed pairs in
    /// order.
    pub fn delete_range_by_score(
        &mut self,
        range: &ScoreRange,
    ) -> Vec<(M, f64)> {
        let mut update: [Option<NodeId>; SKIPLIST_MAXLEVEL] = [None; SKIPLIST_MAXLEVEL];
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if range.value_gte_min(self.nodes[next].score) {
                    break;
                }
                x = Some(next);
            }
            update[i] = x;
        }

        let mut removed = Vec::new();
        let mut cur = self.link(x, 0).forward;
        while let Some(id) = cur {
            if !range.value_lte_max(self.nodes[id].score) {
                break;
            }
            cur = self.nodes[id].levels[0].forward;
            self.delete_node(id, &update);
            if let Some(n) = self.nodes.remove(id) {
                removed.push((n.member, n.score));
            }
        }
        removed
    }

    /// Removes nodes with 1-based rank in `start..=end`.
    pub fn delete_range_by_rank(
        &mut self,
        start: u64,
        end: u64,
    ) -> Vec<(M, f64)> {
        let mut update: [Option<NodeId>; SKIPLIST_MAXLEVEL] = [None; SKIPLIST_MAXLEVEL];
        let mut traversed = 0u64;
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let span = self.link(x, i).span;
                if traversed + span >= start {
                    break;
                }
                traversed += span;
                x = Some(next);
            }
            update[i] = x;
        }

        traversed += 1;
        let mut removed = Vec::new();
        let mut cur = self.link(x, 0).forward;
        while let Some(id) = cur {
            if traversed > end {
                break;
            }
            cur = self.nodes[id].levels[0].forward;
            self.delete_node(id, &update);
            if let Some(n) = self.nodes.remove(id) {
                removed.push((n.member, n.score));
            }
            traversed += 1;
        }
        removed
    }

    /// Removes every node and resets the list.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.header = [Level::default(); SKIPLIST_MAXLEVEL];
        self.tail = None;
        self.length = 0;
        self.level = 1;
    }

    ////////////////////////////////////////////////////////////////////////////
    // Diagnostics
    ////////////////////////////////////////////////////////////////////////////

    /// Checks ordering, spans, backward links, tail and length.
    pub fn validate_invariants(&self) -> Result<(), ValidationError> {
        // Position (1-based rank) of every node reachable at level 0.
        let mut rank_of = slotmap::SecondaryMap::new();
        let mut prev: Option<NodeId> = None;
        let mut count = 0usize;
        let mut cur = self.header[0].forward;

        while let Some(id) = cur {
            let node = &self.nodes[id];
            check((1..=SKIPLIST_MAXLEVEL).contains(&node.levels.len()), || {
                ValidationError::InvalidLevel {
                    node_level: node.levels.len(),
                    max_level: SKIPLIST_MAXLEVEL,
                }
            })?;
            check(node.backward == prev, || {
                ValidationError::BrokenBackwardLink(format!(
                    "{:?} does not point at its predecessor",
                    node.member
                ))
            })?;
            if let Some(p) = prev {
                let pn = &self.nodes[p];
                check(
                    pn.score < node.score || (pn.score == node.score && pn.member < node.member),
                    || {
                        ValidationError::OutOfOrder(format!(
                            "({}, {:?}) >= ({}, {:?})",
                            pn.score, pn.member, node.score, node.member
                        ))
                    },
                )?;
            }
            count += 1;
            rank_of.insert(id, count as u64);
            prev = Some(id);
            cur = node.levels[0].forward;
            // A cycle would otherwise loop forever.
            check(count <= self.nodes.len(), || ValidationError::LengthMismatch {
                expected: self.length,
                actual: count,
            })?;
        }

        check(count == self.length && count == self.nodes.len(), || {
            ValidationError::LengthMismatch {
                expected: self.length,
                actual: count,
            }
        })?;
        check(self.tail == prev, || ValidationError::InvalidTail)?;

        // Links to a real node must jump exactly the rank difference.
        for level in 0..self.level {
            let mut x: Option<NodeId> = None;
            let mut pos = 0u64;
            while let Some(next) = self.link(x, level).forward {
                let target = rank_of.get(next).copied().unwrap_or(0);
                let expected = target.saturating_sub(pos);
                let actual = self.link(x, level).span;
                check(target > pos && actual == expected, || {
                    ValidationError::SpanMismatch {
                        level,
                        expected,
                        actual,
                    }
                })?;
                pos = target;
                x = Some(next);
            }
        }
        Ok(())
    }

    /// Level distribution of the nodes.
    pub fn statistics(&self) -> SkipListStatistics {
        SkipListStatistics::from_heights(
            self.nodes.values().map(|n| n.levels.len()),
            SKIPLIST_MAXLEVEL,
            self.level,
        )
    }

    ////////////////////////////////////////////////////////////////////////////
    // Internals
    ////////////////////////////////////////////////////////////////////////////

    fn random_level(&mut self) -> usize {
        let mut level = 1;
        while level < SKIPLIST_MAXLEVEL && (self.rng.u32(..) & MASK) < P_THRESHOLD {
            level += 1;
        }
        level
    }

    /// Level `i` link of a position; `None` is the header.
    #[inline]
    fn link(
        &self,
        x: Option<NodeId>,
        i: usize,
    ) -> &Level {
        match x {
            Some(id) => &self.nodes[id].levels[i],
            None => &self.header[i],
        }
    }

    #[inline]
    fn link_mut(
        &mut self,
        x: Option<NodeId>,
        i: usize,
    ) -> &mut Level {
        match x {
            Some(id) => &mut self.nodes[id].levels[i],
            None => &mut self.header[i],
        }
    }

    /// Rightmost position on each level strictly before (score, member).
    fn find_update(
        &self,
        score: f64,
        member: &M,
    ) -> [Option<NodeId>; SKIPLIST_MAXLEVEL] {
        let mut update = [None; SKIPLIST_MAXLEVEL];
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                let n = &self.nodes[next];
                if n.score < score || (n.score == score && n.member < *member) {
                    x = Some(next);
                } else {
                    break;
                }
            }
            update[i] = x;
        }
        update
    }

    /// Unlinks `id` given its predecessors on every level. The node stays in
    /// the arena; the caller removes it.
    fn delete_node(
        &mut self,
        id: NodeId,
        update: &[Option<NodeId>; SKIPLIST_MAXLEVEL],
    ) {
        for i in 0..self.level {
            let (fwd, span) = match self.nodes[id].levels.get(i) {
                Some(l) => (l.forward, l.span),
                None => (None, 0),
            };
            let link = self.link_mut(update[i], i);
            if link.forward == Some(id) {
                link.span = link.span + span - 1;
                link.forward = fwd;
            } else {
                link.span -= 1;
            }
        }

        let (next, back) = {
            let n = &self.nodes[id];
            (n.levels[0].forward, n.backward)
        };
        match next {
            Some(next) => self.nodes[next].backward = back,
            None => self.tail = back,
        }
        while self.level > 1 && self.header[self.level - 1].forward.is_none() {
            self.level -= 1;
        }
        self.length -= 1;
    }
}

impl<M> SkipList<M>
where
    M: Ord + Debug + AsRef<[u8]>,
{
    /// Whether `range` overlaps the span from the first to the last member,
    /// which may still leave it empty. Meaningful only when every node has
    /// the same score.
    pub fn is_in_lex_range(
        &self,
        range: &LexRange,
    ) -> bool {
        if range.is_empty() {
            return false;
        }
        match (self.tail, self.header[0].forward) {
            (Some(tail), Some(first)) => {
                range.value_gte_min(self.nodes[tail].member.as_ref())
                    && range.value_lte_max(self.nodes[first].member.as_ref())
            }
            _ => false,
        }
    }

    pub fn first_in_lex_range(
        &self,
        range: &LexRange,
    ) -> Option<NodeId> {
        if !self.is_in_lex_range(range) {
            return None;
        }
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if range.value_gte_min(self.nodes[next].member.as_ref()) {
                    break;
                }
                x = Some(next);
            }
        }
        let x = self.link(x, 0).forward?;
        range
            .value_lte_max(self.nodes[x].member.as_ref())
            .then_some(x)
    }

    pub fn last_in_lex_range(
        &self,
        range: &LexRange,
    ) -> Option<NodeId> {
        if !self.is_in_lex_range(range) {
            return None;
        }
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !range.value_lte_max(self.nodes[next].member.as_ref()) {
                    break;
                }
                x = Some(next);
            }
        }
        let x = x?;
        range
            .value_gte_min(self.nodes[x].member.as_ref())
            .then_some(x)
    }

    /// Removes every member inside `range`.
    pub fn delete_range_by_lex(
        &mut self,
        range: &LexRange,
    ) -> Vec<(M, f64)> {
        let mut update: [Option<NodeId>; SKIPLIST_MAXLEVEL] = [None; SKIPLIST_MAXLEVEL];
        let mut x: Option<NodeId> = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if range.value_gte_min(self.nodes[next].member.as_ref()) {
                    break;
                }
                x = Some(next);
            }
            update[i] = x;
        }

        let mut removed = Vec::new();
        let mut cur = self.link(x, 0).forward;
        while let Some(id) = cur {
            if !range.value_lte_max(self.nodes[id].member.as_ref()) {
                break;
            }
            cur = self.nodes[id].levels[0].forward;
            self.delete_node(id, &update);
            if let Some(n) = self.nodes.remove(id) {
                removed.push((n.member, n.score));
            }
        }
        removed
    }
}

////////////////////////////////////////////////////////////////////////////////
// Trait impls
////////////////////////////////////////////////////////////////////////////////

impl<M> Default for SkipList<M>
where
    M: Ord + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, M> IntoIterator for &'a SkipList<M>
where
    M: Ord + Debug,
{
    type Item = (&'a M, f64);
    type IntoIter = SkipListIter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, M> Iterator for SkipListIter<'a, M> {
    type Item = (&'a M, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.current?];
        self.current = node.levels[0].forward;
        Some((&node.member, node.score))
    }
}

impl<'a, M> Iterator for ReverseIter<'a, M> {
    type Item = (&'a M, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.current?];
        self.current = node.backward;
        Some((&node.member, node.score))
    }
}

impl<M> PartialEq for SkipList<M>
where
    M: Ord + Debug,
{
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn make_list(data: &[(f64, &'static str)]) -> SkipList<&'static str> {
        let mut sl = SkipList::with_rng(fastrand::Rng::with_seed(7));
        for &(score, member) in data {
            sl.insert(score, member);
        }
        sl
    }

    fn members(sl: &SkipList<&'static str>) -> Vec<&'static str> {
        sl.iter().map(|(m, _)| *m).collect()
    }

    #[test]
    fn test_new_and_basic_properties() {
        let sl: SkipList<&str> = SkipList::new();
        assert_eq!(sl.len(), 0);
        assert!(sl.is_empty());
        assert!(sl.first().is_none());
        assert!(sl.last().is_none());
        sl.validate_invariants().unwrap();
    }

    /// Ties on score are ordered by member.
    #[test]
    fn test_order_by_score_then_member() {
        let sl = make_list(&[(2.0, "b"), (1.0, "z"), (2.0, "a"), (0.5, "q")]);
        assert_eq!(members(&sl), vec!["q", "z", "a", "b"]);
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_rank_scenario() {
        let sl = make_list(&[(1.0, "x"), (1.0, "y"), (2.0, "z")]);
        assert_eq!(sl.rank_of(1.0, &"y"), Some(2));
        assert_eq!(sl.rank_of(1.0, &"x"), Some(1));
        assert_eq!(sl.rank_of(2.0, &"z"), Some(3));
        assert_eq!(sl.rank_of(2.0, &"y"), None);

        let first = sl.first_in_range(&ScoreRange::inclusive(1.5, f64::INFINITY));
        assert_eq!(sl.get(first.unwrap()), Some((&"z", 2.0)));
    }

    #[test]
    fn test_by_rank_matches_iteration() {
        let mut sl = SkipList::with_rng(fastrand::Rng::with_seed(1));
        for i in 0..500u32 {
            sl.insert((i % 37) as f64, format!("m{i:03}"));
        }
        sl.validate_invariants().unwrap();
        let ordered: Vec<_> = sl.iter().map(|(m, s)| (m.clone(), s)).collect();
        for (i, (m, s)) in ordered.iter().enumerate() {
            let id = sl.by_rank(i as u64 + 1).unwrap();
            assert_eq!(sl.get(id), Some((m, *s)));
            assert_eq!(sl.rank_of(*s, m), Some(i as u64 + 1));
        }
        assert!(sl.by_rank(0).is_none());
        assert!(sl.by_rank(501).is_none());
    }

    #[test]
    fn test_delete_keeps_invariants() {
        let mut sl = make_list(&[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d")]);
        assert!(sl.delete(2.0, &"b"));
        assert!(!sl.delete(2.0, &"b"));
        assert!(!sl.delete(3.0, &"a"));
        sl.validate_invariants().unwrap();
        assert_eq!(members(&sl), vec!["a", "c", "d"]);

        assert!(sl.delete(4.0, &"d"));
        assert_eq!(sl.get(sl.last().unwrap()), Some((&"c", 3.0)));
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_backward_traversal() {
        let sl = make_list(&[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
        let rev: Vec<_> = sl.iter_rev().map(|(m, _)| *m).collect();
        assert_eq!(rev, vec!["c", "b", "a"]);
        let last = sl.last().unwrap();
        let mid = sl.prev(last).unwrap();
        assert_eq!(sl.next(mid), Some(last));
    }

    #[test]
    fn test_ranges_and_exclusive_bounds() {
        let sl = make_list(&[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d")]);
        let r = ScoreRange::parse(b"(1", b"(4").unwrap();
        assert_eq!(sl.get(sl.first_in_range(&r).unwrap()).unwrap().0, &"b");
        assert_eq!(sl.get(sl.last_in_range(&r).unwrap()).unwrap().0, &"c");

        let none = ScoreRange::inclusive(4.5, 10.0);
        assert!(!sl.is_in_range(&none));
        assert!(sl.first_in_range(&none).is_none());
        assert!(sl.last_in_range(&ScoreRange::inclusive(-5.0, 0.5)).is_none());

        // Overlaps the score span but falls between two nodes.
        let gap = ScoreRange::inclusive(2.25, 2.75);
        assert!(sl.is_in_range(&gap));
        assert!(sl.first_in_range(&gap).is_none());
        assert!(sl.last_in_range(&gap).is_none());
    }

    #[test]
    fn test_update_score_in_place_and_moving() {
        let mut sl = make_list(&[(1.0, "a"), (2.0, "b"), (3.0, "c")]);
        let b = sl.rank_of(2.0, &"b").and_then(|r| sl.by_rank(r)).unwrap();
        assert_eq!(sl.update_score(2.0, &"b", 2.5), Some(b));
        assert_eq!(members(&sl), vec!["a", "b", "c"]);

        sl.update_score(2.5, &"b", 10.0).unwrap();
        assert_eq!(members(&sl), vec!["a", "c", "b"]);
        assert!(sl.update_score(1.0, &"zzz", 3.0).is_none());
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_delete_range_by_score_and_rank() {
        let mut sl = make_list(&[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d"), (5.0, "e")]);
        let removed = sl.delete_range_by_score(&ScoreRange::inclusive(2.0, 3.0));
        assert_eq!(removed, vec![("b", 2.0), ("c", 3.0)]);
        sl.validate_invariants().unwrap();

        let removed = sl.delete_range_by_rank(2, 3);
        assert_eq!(removed, vec![("d", 4.0), ("e", 5.0)]);
        assert_eq!(members(&sl), vec!["a"]);
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_lex_ranges() {
        let mut sl = SkipList::with_rng(fastrand::Rng::with_seed(5));
        for m in ["apple", "banana", "cherry", "date"] {
            sl.insert(0.0, m.to_string());
        }
        let r = LexRange::parse(b"[b", b"(d").unwrap();
        assert_eq!(sl.get(sl.first_in_lex_range(&r).unwrap()).unwrap().0, "banana");
        assert_eq!(sl.get(sl.last_in_lex_range(&r).unwrap()).unwrap().0, "cherry");

        let removed = sl.delete_range_by_lex(&r);
        assert_eq!(removed.len(), 2);
        assert_eq!(sl.len(), 2);
        // "apple" and "date" still bracket the range, with nothing inside.
        assert!(sl.is_in_lex_range(&r));
        assert!(sl.first_in_lex_range(&r).is_none());
        assert!(sl.last_in_lex_range(&r).is_none());
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_clear_resets() {
        let mut sl = make_list(&[(1.0, "a"), (2.0, "b")]);
        sl.clear();
        assert!(sl.is_empty());
        assert_eq!(sl.level(), 1);
        sl.insert(3.0, "c");
        assert_eq!(members(&sl), vec!["c"]);
        sl.validate_invariants().unwrap();
    }

    #[test]
    fn test_statistics_counts_nodes() {
        let mut sl = SkipList::with_rng(fastrand::Rng::with_seed(11));
        for i in 0..1000 {
            sl.insert(i as f64, i);
        }
        let stats = sl.statistics();
        assert_eq!(stats.node_count, 1000);
        assert!(stats.level_distribution[0] > 500);
        assert!(stats.average_level >= 1.0);
    }
}
