//! Region quad-tree over render bounds, for pointer hit-testing
//!
//! The index holds one entry per hit-testable node with valid render
//! bounds. Its bounding box is the root's current arranged rect; when that
//! rect changes the whole tree is rebuilt from the entry registry, while
//! individual moves are incremental (remove-then-reinsert, or a no-op when
//! the bounds did not change).

use rustc_hash::FxHashMap;

use trellis_core::VisualId;
use trellis_geometry::Rect;

const NODE_CAPACITY: usize = 8;
const MAX_DEPTH: u8 = 8;

pub struct SpatialIndex {
    bounds: Rect,
    root: QuadNode,
    entries: FxHashMap<VisualId, Rect>,
}

impl SpatialIndex {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            root: QuadNode::new(bounds, 0),
            entries: FxHashMap::default(),
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, node: VisualId) -> bool {
        self.entries.contains_key(&node)
    }

    /// Re-bounds the tree (root arranged rect changed) and reinserts every
    /// live entry.
    pub fn set_bounds(&mut self, bounds: Rect) {
        if bounds == self.bounds {
            return;
        }
        self.bounds = bounds;
        self.root = QuadNode::new(bounds, 0);
        for (node, rect) in &self.entries {
            self.root.insert(*node, *rect);
        }
    }

    /// Inserts or updates a node's bounds. Unchanged bounds are a no-op;
    /// empty bounds remove the entry.
    pub fn move_entry(&mut self, node: VisualId, new_bounds: Rect) {
        if new_bounds.is_empty() {
            self.remove(node);
            return;
        }
        match self.entries.get(&node) {
            Some(existing) if *existing == new_bounds => return,
            Some(existing) => {
                let old = *existing;
                self.root.remove(node, old);
            }
            None => {}
        }
        self.entries.insert(node, new_bounds);
        self.root.insert(node, new_bounds);
    }

    pub fn remove(&mut self, node: VisualId) {
        if let Some(rect) = self.entries.remove(&node) {
            self.root.remove(node, rect);
        }
    }

    /// All nodes whose bounds intersect the probe rect, in no particular
    /// order; hit-test consumers sort with the tree's paint comparator.
    pub fn query_intersecting(&self, rect: Rect) -> Vec<VisualId> {
        let mut out = Vec::new();
        self.root.query(rect, &mut out);
        out
    }
}

struct QuadNode {
    bounds: Rect,
    depth: u8,
    items: Vec<(VisualId, Rect)>,
    children: Option<Box<[QuadNode; 4]>>,
}

impl QuadNode {
    fn new(bounds: Rect, depth: u8) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn quadrants(bounds: Rect) -> [Rect; 4] {
        let half_w = bounds.width / 2.0;
        let half_h = bounds.height / 2.0;
        [
            Rect::new(bounds.x, bounds.y, half_w, half_h),
            Rect::new(bounds.x + half_w, bounds.y, half_w, half_h),
            Rect::new(bounds.x, bounds.y + half_h, half_w, half_h),
            Rect::new(bounds.x + half_w, bounds.y + half_h, half_w, half_h),
        ]
    }

    /// Index of the single child quadrant fully containing the rect.
    fn child_index(&self, rect: Rect) -> Option<usize> {
        let children = self.children.as_ref()?;
        children
            .iter()
            .position(|child| contains_rect(child.bounds, rect))
    }

    fn insert(&mut self, node: VisualId, rect: Rect) {
        let index = self.child_index(rect);
        if let (Some(index), Some(children)) = (index, self.children.as_mut()) {
            children[index].insert(node, rect);
            return;
        }
        self.items.push((node, rect));
        if self.children.is_none()
            && self.items.len() > NODE_CAPACITY
            && self.depth < MAX_DEPTH
        {
            self.split();
        }
    }

    fn split(&mut self) {
        let quadrants = Self::quadrants(self.bounds);
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            QuadNode::new(quadrants[0], depth),
            QuadNode::new(quadrants[1], depth),
            QuadNode::new(quadrants[2], depth),
            QuadNode::new(quadrants[3], depth),
        ]));
        // Straddling items stay at this node.
        let items = std::mem::take(&mut self.items);
        for (node, rect) in items {
            let index = self.child_index(rect);
            if let (Some(index), Some(children)) = (index, self.children.as_mut()) {
                children[index].insert(node, rect);
            } else {
                self.items.push((node, rect));
            }
        }
    }

    fn remove(&mut self, node: VisualId, rect: Rect) -> bool {
        if let Some(index) = self.items.iter().position(|(id, _)| *id == node) {
            self.items.swap_remove(index);
            return true;
        }
        let index = self.child_index(rect);
        if let (Some(index), Some(children)) = (index, self.children.as_mut()) {
            return children[index].remove(node, rect);
        }
        false
    }

    fn query(&self, rect: Rect, out: &mut Vec<VisualId>) {
        if !self.bounds.intersects(&rect) && self.depth > 0 {
            return;
        }
        for (node, item_rect) in &self.items {
            if item_rect.intersects(&rect) {
                out.push(*node);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects(&rect) {
                    child.query(rect, out);
                }
            }
        }
    }
}

fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x >= outer.x
        && inner.y >= outer.y
        && inner.right() <= outer.right()
        && inner.bottom() <= outer.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> VisualId {
        VisualId::from_raw(raw)
    }

    #[test]
    fn query_finds_intersecting_entries_only() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        index.move_entry(id(1), Rect::new(0.0, 0.0, 10.0, 10.0));
        index.move_entry(id(2), Rect::new(50.0, 50.0, 10.0, 10.0));

        let hits = index.query_intersecting(Rect::new(5.0, 5.0, 1.0, 1.0));
        assert_eq!(hits, vec![id(1)]);
    }

    #[test]
    fn move_with_same_bounds_is_a_noop() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let rect = Rect::new(10.0, 10.0, 5.0, 5.0);
        index.move_entry(id(1), rect);
        index.move_entry(id(1), rect);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.query_intersecting(Rect::new(10.0, 10.0, 1.0, 1.0)),
            vec![id(1)]
        );
    }

    #[test]
    fn moving_relocates_the_entry() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        index.move_entry(id(1), Rect::new(0.0, 0.0, 5.0, 5.0));
        index.move_entry(id(1), Rect::new(80.0, 80.0, 5.0, 5.0));

        assert!(index
            .query_intersecting(Rect::new(0.0, 0.0, 10.0, 10.0))
            .is_empty());
        assert_eq!(
            index.query_intersecting(Rect::new(80.0, 80.0, 1.0, 1.0)),
            vec![id(1)]
        );
    }

    #[test]
    fn empty_bounds_remove_the_entry() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        index.move_entry(id(1), Rect::new(0.0, 0.0, 5.0, 5.0));
        index.move_entry(id(1), Rect::ZERO);
        assert!(index.is_empty());
    }

    #[test]
    fn survives_capacity_splits() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 256.0, 256.0));
        for i in 0..64 {
            let x = (i % 8) as f32 * 32.0;
            let y = (i / 8) as f32 * 32.0;
            index.move_entry(id(i + 1), Rect::new(x + 1.0, y + 1.0, 4.0, 4.0));
        }
        assert_eq!(index.len(), 64);
        let hits = index.query_intersecting(Rect::new(0.0, 0.0, 40.0, 40.0));
        assert!(hits.contains(&id(1)));
        assert!(hits.contains(&id(2)));
        assert!(hits.contains(&id(9)));
        assert!(!hits.contains(&id(64)));
    }

    #[test]
    fn rebuild_on_bounds_change_keeps_entries() {
        let mut index = SpatialIndex::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        index.move_entry(id(1), Rect::new(10.0, 10.0, 5.0, 5.0));
        index.set_bounds(Rect::new(0.0, 0.0, 500.0, 500.0));
        assert_eq!(
            index.query_intersecting(Rect::new(10.0, 10.0, 1.0, 1.0)),
            vec![id(1)]
        );
    }
}
