//! Live text positions that follow edits.
//!
//! Positions live in a slot arena owned by the [`PositionRegistry`]. A
//! [`TextPosition`] is a counted handle to one slot: cloning it adds a
//! reference, dropping the last one releases the slot and bumps its
//! generation. The registry itself holds no references, so it never keeps a
//! position alive. A [`PositionId`] names a slot and generation without
//! holding a reference, which gives O(1) liveness checks.
//!
//! # Design
//!
//! - Slots store offset, bias, generation and a reference count
//! - Free-list for O(1) slot reuse after a sweep
//! - `order` keeps live slot indices sorted by `(offset, bias)` with
//!   `Backward < Forward`, so canonical lookup is a binary search and every
//!   shift touches one contiguous suffix of `order`
//! - Released slots stay in `order` until the next sweep, which runs before
//!   each insert or remove pass

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Which side of an insertion point a position sticks to.
///
/// Variant order matters: `Backward` sorts before `Forward` at equal offsets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bias {
    /// Stays with the preceding text: an insertion at the position's offset
    /// lands after it.
    #[default]
    Backward,
    /// Sticks to the following text: an insertion at the position's offset
    /// pushes it forward.
    Forward,
}

/// Weak name of a position slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PositionId {
    index: usize,
    generation: u32,
}

impl PositionId {
    /// Slot index in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.index
    }

    /// Generation the slot had when this id was issued.
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    offset: usize,
    bias: Bias,
    generation: u32,
    refs: u32,
}

impl Slot {
    fn key(&self) -> (usize, Bias) {
        (self.offset, self.bias)
    }

    fn is_live(&self) -> bool {
        self.refs > 0
    }
}

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Slot>,
    free_list: Vec<usize>,
    order: Vec<usize>,
    released: usize,
}

impl Arena {
    fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    fn slot_mut(&mut self, index: usize) -> &mut Slot {
        &mut self.slots[index]
    }

    fn live_slot(&self, id: PositionId) -> Option<&Slot> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.is_live() && slot.generation == id.generation)
    }

    /// First index in `order` whose key is not less than `key`.
    fn lower_bound(&self, key: (usize, Bias)) -> usize {
        self.order
            .partition_point(|&index| self.slot(index).key() < key)
    }

    fn incref(&mut self, index: usize) {
        let slot = self.slot_mut(index);
        slot.refs = slot.refs.saturating_add(1);
    }

    fn decref(&mut self, id: PositionId) {
        let Some(slot) = self.slots.get_mut(id.index) else {
            return;
        };
        if slot.generation != id.generation || slot.refs == 0 {
            return;
        }
        slot.refs -= 1;
        if slot.refs == 0 {
            slot.generation = slot.generation.wrapping_add(1);
            self.released += 1;
        }
    }

    fn alloc(&mut self, offset: usize, bias: Bias) -> usize {
        if let Some(index) = self.free_list.pop() {
            let slot = self.slot_mut(index);
            slot.offset = offset;
            slot.bias = bias;
            slot.refs = 1;
            return index;
        }
        self.slots.push(Slot {
            offset,
            bias,
            generation: 0,
            refs: 1,
        });
        self.slots.len() - 1
    }

    fn sweep(&mut self) -> usize {
        if self.released == 0 {
            return 0;
        }
        let slots = &self.slots;
        let free_list = &mut self.free_list;
        self.order.retain(|&index| {
            let live = slots[index].is_live();
            if !live {
                free_list.push(index);
            }
            live
        });
        std::mem::take(&mut self.released)
    }

    fn sort_range(&mut self, lo: usize, hi: usize) {
        let slots = &self.slots;
        self.order[lo..hi].sort_by_key(|&index| slots[index].key());
    }
}

/// Registry of live positions for one document.
///
/// Outside the crate the registry is read-only: positions are created through
/// [`Document::create_position`](crate::Document::create_position) and move
/// only when the document's text changes.
///
/// Cloning a registry yields another handle to the same arena.
#[derive(Clone, Default)]
pub struct PositionRegistry {
    arena: Rc<RefCell<Arena>>,
}

/// Original offset of a position caught in a removed range, kept so undo can
/// put it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedPosition {
    pub id: PositionId,
    pub offset: usize,
}

impl PositionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Get or create the position at `(offset, bias)`.
    ///
    /// Positions are canonical: while a live position with the same offset
    /// and bias exists, this returns another handle to it.
    #[must_use]
    pub(crate) fn create(&self, offset: usize, bias: Bias) -> TextPosition {
        let mut arena = self.arena.borrow_mut();
        let key = (offset, bias);
        let lo = arena.lower_bound(key);
        let existing = arena.order[lo..]
            .iter()
            .copied()
            .take_while(|&index| arena.slot(index).key() == key)
            .find(|&index| arena.slot(index).is_live());

        let index = if let Some(index) = existing {
            arena.incref(index);
            index
        } else {
            let index = arena.alloc(offset, bias);
            arena.order.insert(lo, index);
            index
        };

        let id = PositionId {
            index,
            generation: arena.slot(index).generation,
        };
        drop(arena);
        TextPosition {
            id,
            arena: Rc::clone(&self.arena),
        }
    }

    /// Shift positions for `length` chars inserted at `offset`.
    ///
    /// Positions past `offset`, and `Forward` positions exactly at it, move
    /// by `length`. `Backward` positions at `offset` stay.
    pub(crate) fn insert_at(&self, offset: usize, length: usize) {
        if length == 0 {
            return;
        }
        let mut arena = self.arena.borrow_mut();
        arena.sweep();
        let lo = arena.lower_bound((offset, Bias::Forward));
        let Arena { slots, order, .. } = &mut *arena;
        for &index in &order[lo..] {
            slots[index].offset += length;
        }
    }

    /// Shift positions for `length` chars removed at `offset`.
    ///
    /// Positions inside the range collapse to `offset`; positions at or past
    /// its end move left by `length`. Returns the original offsets of every
    /// position in `offset..=offset + length`.
    ///
    /// Collapsed positions are not merged. Two handles may end up sharing one
    /// `(offset, bias)` key, each keeping its own identity so undo can move it
    /// back; [`create`](Self::create) then returns the first of them.
    pub(crate) fn remove_at(&self, offset: usize, length: usize) -> Vec<RecordedPosition> {
        if length == 0 {
            return Vec::new();
        }
        let end = offset + length;
        let mut arena = self.arena.borrow_mut();
        arena.sweep();
        let lo = arena.lower_bound((offset, Bias::Backward));

        let mut recorded = Vec::new();
        let Arena { slots, order, .. } = &mut *arena;
        let mut collapsed_end = lo;
        for (i, &index) in order.iter().enumerate().skip(lo) {
            let slot = &mut slots[index];
            if slot.offset <= end {
                recorded.push(RecordedPosition {
                    id: PositionId {
                        index,
                        generation: slot.generation,
                    },
                    offset: slot.offset,
                });
                slot.offset = offset;
                collapsed_end = i + 1;
            } else {
                slot.offset -= length;
            }
        }
        // Everything collapsed onto `offset` must be re-ordered by bias.
        arena.sort_range(lo, collapsed_end);
        recorded
    }

    /// Move recorded positions back after `offset..offset + length` was re-inserted.
    ///
    /// Dead positions are skipped. Offsets are clamped to the re-inserted
    /// range so the registry stays sorted.
    pub(crate) fn restore(&self, offset: usize, length: usize, recorded: &[RecordedPosition]) {
        if recorded.is_empty() {
            return;
        }
        let end = offset + length;
        let mut arena = self.arena.borrow_mut();
        let lo = arena.lower_bound((offset, Bias::Backward));
        let hi = arena.lower_bound((end + 1, Bias::Backward));
        for record in recorded {
            if arena.live_slot(record.id).is_none() {
                continue;
            }
            let slot = arena.slot_mut(record.id.index);
            if slot.offset < offset || slot.offset > end {
                continue;
            }
            slot.offset = record.offset.clamp(offset, end);
        }
        arena.sort_range(lo, hi);
    }

    /// Drop released slots from the ordering. Returns how many were pruned.
    #[cfg(test)]
    fn sweep(&self) -> usize {
        self.arena.borrow_mut().sweep()
    }

    /// Offset of a live position.
    #[must_use]
    pub fn offset_of(&self, id: PositionId) -> Option<usize> {
        self.arena.borrow().live_slot(id).map(|slot| slot.offset)
    }

    /// True while some handle still holds the position.
    #[must_use]
    pub fn is_alive(&self, id: PositionId) -> bool {
        self.arena.borrow().live_slot(id).is_some()
    }

    /// Number of live positions.
    #[must_use]
    pub fn len(&self) -> usize {
        let arena = self.arena.borrow();
        arena.order.len() - arena.released
    }

    /// Check if no positions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live `(offset, bias)` pairs in registry order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(usize, Bias)> {
        let arena = self.arena.borrow();
        arena
            .order
            .iter()
            .map(|&index| arena.slot(index))
            .filter(|slot| slot.is_live())
            .map(Slot::key)
            .collect()
    }
}

impl fmt::Debug for PositionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionRegistry")
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

/// Counted handle to a live position.
///
/// Equality is identity: two handles are equal when they name the same slot.
pub struct TextPosition {
    id: PositionId,
    arena: Rc<RefCell<Arena>>,
}

impl TextPosition {
    /// Current offset.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.arena.borrow().slot(self.id.index).offset
    }

    /// Bias the position was created with.
    #[must_use]
    pub fn bias(&self) -> Bias {
        self.arena.borrow().slot(self.id.index).bias
    }

    /// Weak id of this position.
    #[must_use]
    pub fn id(&self) -> PositionId {
        self.id
    }
}

impl Clone for TextPosition {
    fn clone(&self) -> Self {
        self.arena.borrow_mut().incref(self.id.index);
        Self {
            id: self.id,
            arena: Rc::clone(&self.arena),
        }
    }
}

impl Drop for TextPosition {
    fn drop(&mut self) {
        if let Ok(mut arena) = self.arena.try_borrow_mut() {
            arena.decref(self.id);
        } else {
            debug_assert!(false, "text position dropped while registry is borrowed");
        }
    }
}

impl PartialEq for TextPosition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.arena, &other.arena)
    }
}

impl Eq for TextPosition {}

impl fmt::Debug for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextPosition")
            .field("offset", &self.offset())
            .field("bias", &self.bias())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sorted(registry: &PositionRegistry) -> bool {
        registry.snapshot().windows(2).all(|w| w[0] <= w[1])
    }

    #[test]
    fn test_create_is_canonical() {
        let registry = PositionRegistry::new();
        let a = registry.create(5, Bias::Forward);
        let b = registry.create(5, Bias::Forward);
        let c = registry.create(5, Bias::Backward);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_insert_shift_bias() {
        let registry = PositionRegistry::new();
        let before = registry.create(2, Bias::Forward);
        let back = registry.create(5, Bias::Backward);
        let fwd = registry.create(5, Bias::Forward);
        let after = registry.create(9, Bias::Backward);

        registry.insert_at(5, 3);
        assert_eq!(before.offset(), 2);
        assert_eq!(back.offset(), 5);
        assert_eq!(fwd.offset(), 8);
        assert_eq!(after.offset(), 12);
        assert!(is_sorted(&registry));
    }

    #[test]
    fn test_remove_collapses_and_shifts() {
        let registry = PositionRegistry::new();
        let before = registry.create(1, Bias::Backward);
        let start = registry.create(2, Bias::Forward);
        let inside = registry.create(4, Bias::Backward);
        let at_end = registry.create(6, Bias::Backward);
        let after = registry.create(10, Bias::Forward);

        let recorded = registry.remove_at(2, 4);
        assert_eq!(before.offset(), 1);
        assert_eq!(start.offset(), 2);
        assert_eq!(inside.offset(), 2);
        assert_eq!(at_end.offset(), 2);
        assert_eq!(after.offset(), 6);
        assert!(is_sorted(&registry));

        let offsets: Vec<usize> = recorded.iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![2, 4, 6]);
    }

    #[test]
    fn test_collapsed_positions_keep_identity() {
        let registry = PositionRegistry::new();
        let a = registry.create(2, Bias::Backward);
        let b = registry.create(4, Bias::Backward);
        let recorded = registry.remove_at(1, 4);
        assert_eq!(a.offset(), 1);
        assert_eq!(b.offset(), 1);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.snapshot(),
            vec![(1, Bias::Backward), (1, Bias::Backward)]
        );

        // Lookup lands on one of the duplicates instead of allocating a third.
        let c = registry.create(1, Bias::Backward);
        assert!(c == a || c == b);
        assert_eq!(registry.len(), 2);

        registry.insert_at(1, 4);
        registry.restore(1, 4, &recorded);
        assert_eq!(a.offset(), 2);
        assert_eq!(b.offset(), 4);
        assert!(is_sorted(&registry));
    }

    #[test]
    fn test_restore_after_reinsert() {
        let registry = PositionRegistry::new();
        let inside = registry.create(4, Bias::Backward);
        let at_end = registry.create(6, Bias::Backward);
        let recorded = registry.remove_at(2, 4);

        registry.insert_at(2, 4);
        assert_eq!(inside.offset(), 2);
        registry.restore(2, 4, &recorded);
        assert_eq!(inside.offset(), 4);
        assert_eq!(at_end.offset(), 6);
        assert!(is_sorted(&registry));
    }

    #[test]
    fn test_dropped_positions_are_pruned() {
        let registry = PositionRegistry::new();
        let kept = registry.create(3, Bias::Backward);
        let dropped = registry.create(7, Bias::Backward);
        let id = dropped.id();
        assert!(registry.is_alive(id));

        drop(dropped);
        assert!(!registry.is_alive(id));
        assert_eq!(registry.offset_of(id), None);
        assert_eq!(registry.len(), 1);

        registry.insert_at(0, 1);
        assert_eq!(kept.offset(), 4);
        assert_eq!(registry.snapshot(), vec![(4, Bias::Backward)]);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let registry = PositionRegistry::new();
        let first = registry.create(1, Bias::Forward);
        let old_id = first.id();
        drop(first);
        assert_eq!(registry.sweep(), 1);

        let second = registry.create(9, Bias::Forward);
        assert_eq!(second.id().index(), old_id.index());
        assert_ne!(second.id().generation(), old_id.generation());
        assert!(!registry.is_alive(old_id));
        assert_eq!(registry.offset_of(second.id()), Some(9));
    }

    #[test]
    fn test_clone_keeps_position_alive() {
        let registry = PositionRegistry::new();
        let pos = registry.create(4, Bias::Forward);
        let copy = pos.clone();
        let id = pos.id();
        drop(pos);
        assert!(registry.is_alive(id));
        drop(copy);
        assert!(!registry.is_alive(id));
    }

    #[test]
    fn test_create_after_release_allocates_fresh() {
        let registry = PositionRegistry::new();
        let first = registry.create(2, Bias::Backward);
        let id = first.id();
        drop(first);
        // The released slot is still in the ordering until the next sweep.
        let second = registry.create(2, Bias::Backward);
        assert_ne!(second.id(), id);
        assert_eq!(registry.len(), 1);
    }
}
