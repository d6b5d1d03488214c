//! An arena of bounding boxes with index-based range queries.
//!
//! Entries are referenced by plain indices, so consumers (cut buckets,
//! placed-node lookup) never hold back-references into the structure.
//! Queries run against a sorted index built once after bulk insertion:
//! binary search on min-x plus a prefix-maximum bound on max-x keeps range
//! scans close to the matching entries.

use geometry::rect::Rect;

/// An index into a [`RectArena`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub usize);

#[derive(Debug, Clone)]
struct Entry {
    rect: Rect,
    alive: bool,
}

/// An arena of rectangles supporting removal and range queries.
#[derive(Debug, Clone, Default)]
pub struct RectArena {
    entries: Vec<Entry>,
    /// Entry indices sorted by ascending min-x. Valid when `sorted` is set.
    order: Vec<usize>,
    /// `prefix_max_right[i]` = max right() over `order[..=i]`.
    prefix_max_right: Vec<i64>,
    sorted: bool,
}

impl RectArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rectangle, returning its id. Invalidates the query index.
    pub fn insert(&mut self, rect: Rect) -> EntryId {
        self.sorted = false;
        self.entries.push(Entry { rect, alive: true });
        EntryId(self.entries.len() - 1)
    }

    /// Removes an entry. The id must have been returned by [`Self::insert`].
    pub fn remove(&mut self, id: EntryId) {
        self.entries[id.0].alive = false;
    }

    /// The rectangle for an entry, if still present.
    pub fn get(&self, id: EntryId) -> Option<Rect> {
        let e = &self.entries[id.0];
        e.alive.then_some(e.rect)
    }

    /// The number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.alive).count()
    }

    /// Whether the arena has no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the query index. Call once after bulk insertion.
    pub fn build_index(&mut self) {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| (self.entries[i].rect.left(), i));
        let mut prefix = Vec::with_capacity(order.len());
        let mut max_right = i64::MIN;
        for &i in &order {
            max_right = max_right.max(self.entries[i].rect.right());
            prefix.push(max_right);
        }
        self.order = order;
        self.prefix_max_right = prefix;
        self.sorted = true;
    }

    /// All live entries whose rectangle touches `region` (shared edges
    /// count), in ascending id order.
    ///
    /// # Panics
    ///
    /// Panics if the query index has not been built since the last insert.
    pub fn query(&self, region: Rect) -> Vec<EntryId> {
        assert!(self.sorted, "RectArena::build_index must be called first");
        // Upper bound: first order position with left > region.right.
        let ub = self
            .order
            .partition_point(|&i| self.entries[i].rect.left() <= region.right());
        let mut out = Vec::new();
        for pos in (0..ub).rev() {
            // Everything at or before `pos` ends left of the region: done.
            if self.prefix_max_right[pos] < region.left() {
                break;
            }
            let i = self.order[pos];
            let e = &self.entries[i];
            if e.alive && e.rect.touches(region) {
                out.push(EntryId(i));
            }
        }
        out.sort();
        out
    }

    /// Iterates over all live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, Rect)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.alive)
            .map(|(i, e)| (EntryId(i), e.rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_queries() {
        let mut arena = RectArena::new();
        let a = arena.insert(Rect::from_sides(0, 0, 10, 10));
        let b = arena.insert(Rect::from_sides(20, 0, 30, 10));
        let c = arena.insert(Rect::from_sides(5, 20, 15, 30));
        arena.build_index();

        assert_eq!(arena.query(Rect::from_sides(-5, -5, 12, 5)), vec![a]);
        assert_eq!(arena.query(Rect::from_sides(8, 5, 25, 25)), vec![a, b, c]);
        // Edge contact counts as touching.
        assert_eq!(arena.query(Rect::from_sides(10, 10, 12, 12)), vec![a]);
        assert!(arena.query(Rect::from_sides(40, 40, 50, 50)).is_empty());
    }

    #[test]
    fn removal_tombstones() {
        let mut arena = RectArena::new();
        let a = arena.insert(Rect::from_sides(0, 0, 10, 10));
        let b = arena.insert(Rect::from_sides(5, 5, 15, 15));
        arena.build_index();
        arena.remove(a);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.query(Rect::from_sides(0, 0, 20, 20)), vec![b]);
    }
}
