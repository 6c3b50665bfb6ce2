use std::mem;

use tracing::debug;

use crate::{Compaction, Error, Result, Slot, SlotToken, Tracked};

/// The backing storage of a container, mapping logical positions to physical slots.
///
/// Every slot is either occupied or vacated, so `live + tombstones == slots.len()` holds at all
/// times. The logical sequence is the occupied slots in physical order. An occupied slot may
/// briefly refer to an element that has already been released if the release notification has
/// not reached this table yet; such slots still count as live until the notification arrives.
#[derive(Debug)]
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,

    live: usize,
    tombstones: usize,

    next_token: u64,

    compaction: Compaction,
}

impl<T> SlotTable<T> {
    pub(crate) fn with_capacity(capacity: usize, compaction: Compaction) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
            tombstones: 0,
            next_token: 0,
            compaction,
        }
    }

    /// The logical length of the sequence.
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn tombstones(&self) -> usize {
        self.tombstones
    }

    fn issue_token(&mut self) -> SlotToken {
        let token = SlotToken::new(self.next_token);

        self.next_token = self
            .next_token
            .checked_add(1)
            .expect("a container cannot issue more than u64::MAX slot tokens in its lifetime");

        token
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::IndexOutOfRange {
            index,
            len: self.live,
        }
    }

    /// Finds the physical position of the `index`-th occupied slot.
    fn physical_index(&self, index: usize) -> Result<usize> {
        if index >= self.live {
            return Err(self.out_of_range(index));
        }

        if self.tombstones == 0 {
            return Ok(index);
        }

        let physical = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_occupied())
            .nth(index)
            .map(|(physical, _)| physical)
            .expect("live count matches the number of occupied slots, so the index must resolve");

        Ok(physical)
    }

    /// Finds the physical and logical position of the slot registered with `token`.
    ///
    /// This is a linear scan. Positions move on every insert, remove and eager shift, so there
    /// is no stable token to position mapping to keep.
    fn position_of(&self, token: SlotToken) -> Option<(usize, usize)> {
        let mut logical: usize = 0;

        for (physical, slot) in self.slots.iter().enumerate() {
            match slot.token() {
                Some(candidate) if candidate == token => return Some((physical, logical)),
                Some(_) => {
                    logical = logical
                        .checked_add(1)
                        .expect("logical index is bounded by the slot count");
                }
                None => {}
            }
        }

        None
    }

    pub(crate) fn get(&self, index: usize) -> Result<Option<Tracked<T>>> {
        let physical = self.physical_index(index)?;

        Ok(self.slots.get(physical).and_then(Slot::upgrade))
    }

    /// Appends an element and returns the token its release watcher must be registered with.
    pub(crate) fn push(&mut self, item: &Tracked<T>) -> SlotToken {
        let token = self.issue_token();

        self.slots.push(Slot::occupied(token, item));
        self.increment_live();

        token
    }

    pub(crate) fn insert(&mut self, index: usize, item: &Tracked<T>) -> Result<SlotToken> {
        let physical = if index == self.live {
            self.slots.len()
        } else {
            self.physical_index(index)?
        };

        let token = self.issue_token();

        self.slots.insert(physical, Slot::occupied(token, item));
        self.increment_live();

        Ok(token)
    }

    /// Removes the slot at a logical position and returns it so the caller can deregister it.
    pub(crate) fn remove(&mut self, index: usize) -> Result<Slot<T>> {
        let physical = self.physical_index(index)?;

        let removed = self.slots.remove(physical);
        self.decrement_live();

        Ok(removed)
    }

    /// Overwrites the slot at a logical position, returning the new token and the previous slot.
    pub(crate) fn replace(
        &mut self,
        index: usize,
        item: &Tracked<T>,
    ) -> Result<(SlotToken, Slot<T>)> {
        let physical = self.physical_index(index)?;

        let token = self.issue_token();

        let slot = self
            .slots
            .get_mut(physical)
            .expect("physical index was resolved from the slot list");

        let previous = mem::replace(slot, Slot::occupied(token, item));

        Ok((token, previous))
    }

    /// Vacates the slot registered with `token` and returns the logical index it occupied.
    ///
    /// Under eager compaction the slot is removed right away unless `may_shift` is false, in
    /// which case it becomes a tombstone that the next mutating operation removes. Returns `None`
    /// if no slot carries the token, which happens when the slot was removed or replaced by the
    /// owner before the release notification was processed.
    pub(crate) fn reclaim(&mut self, token: SlotToken, may_shift: bool) -> Option<usize> {
        let (physical, logical) = self.position_of(token)?;

        if self.compaction == Compaction::Eager && may_shift {
            self.slots.remove(physical);
        } else {
            let slot = self
                .slots
                .get_mut(physical)
                .expect("physical index was resolved from the slot list");

            *slot = Slot::Vacated;

            self.tombstones = self
                .tombstones
                .checked_add(1)
                .expect("tombstone count is bounded by the slot count");
        }

        self.decrement_live();

        Some(logical)
    }

    /// Physically removes all vacated slots, returning how many were removed.
    pub(crate) fn compact(&mut self) -> usize {
        let removed = self.tombstones;

        if removed == 0 {
            return 0;
        }

        self.slots.retain(Slot::is_occupied);
        self.tombstones = 0;

        debug!(removed, remaining = self.slots.len(), "compacted vacated slots");

        removed
    }

    /// Runs a compaction pass if the compaction mode calls for one before the next mutation.
    ///
    /// Eager mode only accumulates tombstones while an enumeration is in progress, so it removes
    /// them at the first opportunity. Lazy mode waits until at least half the slots are vacated.
    pub(crate) fn compact_if_due(&mut self) {
        let due = match self.compaction {
            Compaction::Eager => self.tombstones > 0,
            Compaction::Lazy => self.tombstones > 0 && self.tombstones >= self.live,
        };

        if due {
            self.compact();
        }
    }

    /// Finds the first live element at or after physical position `cursor`.
    ///
    /// Returns the element together with the physical position to resume from.
    pub(crate) fn next_live(&self, cursor: usize) -> Option<(Tracked<T>, usize)> {
        self.slots
            .iter()
            .enumerate()
            .skip(cursor)
            .find_map(|(physical, slot)| {
                slot.upgrade().map(|item| {
                    let resume = physical
                        .checked_add(1)
                        .expect("physical index is bounded by the slot count");
                    (item, resume)
                })
            })
    }

    /// The number of physical slots at or after `cursor`, an upper bound on what remains.
    #[cfg_attr(test, mutants::skip)] // Any larger upper bound is still a correct size hint.
    pub(crate) fn remaining_from(&self, cursor: usize) -> usize {
        self.slots.len().saturating_sub(cursor)
    }

    /// Empties the table, handing back the slots so the caller can deregister them.
    pub(crate) fn take_all(&mut self) -> Vec<Slot<T>> {
        self.live = 0;
        self.tombstones = 0;

        mem::take(&mut self.slots)
    }

    fn increment_live(&mut self) {
        self.live = self
            .live
            .checked_add(1)
            .expect("live count is bounded by the slot count");
    }

    fn decrement_live(&mut self) {
        self.live = self
            .live
            .checked_sub(1)
            .expect("a slot was just vacated, so there must have been a live slot");
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::indexing_slicing,
        reason = "we do not need to worry about these things when writing test code"
    )]

    use super::*;

    fn values<T: Copy>(table: &SlotTable<T>) -> Vec<T> {
        let mut result = Vec::new();
        let mut cursor = 0;

        while let Some((item, resume)) = table.next_live(cursor) {
            result.push(*item);
            cursor = resume;
        }

        result
    }

    fn filled(
        compaction: Compaction,
        owners: &[Tracked<u32>],
    ) -> (SlotTable<u32>, Vec<SlotToken>) {
        let mut table = SlotTable::with_capacity(owners.len(), compaction);
        let tokens = owners.iter().map(|owner| table.push(owner)).collect();
        (table, tokens)
    }

    fn owners(values: &[u32]) -> Vec<Tracked<u32>> {
        values.iter().copied().map(Tracked::new).collect()
    }

    #[test]
    fn push_assigns_distinct_tokens() {
        let owners = owners(&[1, 2, 3]);
        let (table, tokens) = filled(Compaction::Eager, &owners);

        assert_eq!(tokens, vec![SlotToken::new(0), SlotToken::new(1), SlotToken::new(2)]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.slot_count(), 3);
        assert_eq!(values(&table), vec![1, 2, 3]);
    }

    #[test]
    fn eager_reclaim_shifts_survivors() {
        let owners = owners(&[1, 2, 3]);
        let (mut table, tokens) = filled(Compaction::Eager, &owners);

        assert_eq!(table.reclaim(tokens[1], true), Some(1));

        assert_eq!(table.len(), 2);
        assert_eq!(table.slot_count(), 2);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(table.get(1).unwrap().as_deref(), Some(&3));
    }

    #[test]
    fn eager_reclaim_without_shift_leaves_tombstone() {
        let owners = owners(&[1, 2, 3]);
        let (mut table, tokens) = filled(Compaction::Eager, &owners);

        assert_eq!(table.reclaim(tokens[0], false), Some(0));

        assert_eq!(table.len(), 2);
        assert_eq!(table.slot_count(), 3);
        assert_eq!(table.tombstones(), 1);

        table.compact_if_due();

        assert_eq!(table.slot_count(), 2);
        assert_eq!(values(&table), vec![2, 3]);
    }

    #[test]
    fn lazy_reclaim_leaves_tombstone_and_skips_it() {
        let owners = owners(&[1, 2, 3, 4]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);

        assert_eq!(table.reclaim(tokens[1], true), Some(1));

        assert_eq!(table.len(), 3);
        assert_eq!(table.slot_count(), 4);
        assert_eq!(table.get(1).unwrap().as_deref(), Some(&3));
        assert_eq!(values(&table), vec![1, 3, 4]);
    }

    #[test]
    fn reclaim_reports_logical_index_past_tombstones() {
        let owners = owners(&[1, 2, 3, 4]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);

        assert_eq!(table.reclaim(tokens[0], true), Some(0));

        // Element 3 sits at physical 2 but logical 1 now.
        assert_eq!(table.reclaim(tokens[2], true), Some(1));
    }

    #[test]
    fn reclaim_unknown_token_is_ignored() {
        let owners = owners(&[1, 2]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);

        assert_eq!(table.reclaim(tokens[0], true), Some(0));
        assert_eq!(table.reclaim(tokens[0], true), None);
        assert_eq!(table.reclaim(SlotToken::new(999), true), None);

        assert_eq!(table.len(), 1);
        assert_eq!(table.tombstones(), 1);
    }

    #[test]
    fn lazy_compaction_waits_for_half_vacated() {
        let owners = owners(&[1, 2, 3, 4]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);

        table.reclaim(tokens[0], true);
        table.compact_if_due();
        assert_eq!(table.slot_count(), 4);

        table.reclaim(tokens[1], true);
        table.compact_if_due();
        assert_eq!(table.slot_count(), 2);
        assert_eq!(table.tombstones(), 0);
        assert_eq!(values(&table), vec![3, 4]);
    }

    #[test]
    fn explicit_compact_reports_removed() {
        let owners = owners(&[1, 2, 3]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);

        assert_eq!(table.compact(), 0);

        table.reclaim(tokens[2], true);

        assert_eq!(table.compact(), 1);
        assert_eq!(table.slot_count(), 2);
    }

    #[test]
    fn insert_resolves_logical_position_past_tombstones() {
        let owners = owners(&[1, 2, 3]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);
        table.reclaim(tokens[0], true);

        let newcomer = Tracked::new(10);
        table.insert(1, &newcomer).unwrap();

        assert_eq!(values(&table), vec![2, 10, 3]);

        let tail = Tracked::new(20);
        table.insert(3, &tail).unwrap();

        assert_eq!(values(&table), vec![2, 10, 3, 20]);
    }

    #[test]
    fn insert_past_end_fails_without_change() {
        let owners = owners(&[1]);
        let (mut table, _) = filled(Compaction::Eager, &owners);

        let newcomer = Tracked::new(10);
        let result = table.insert(2, &newcomer);

        assert_eq!(result, Err(Error::IndexOutOfRange { index: 2, len: 1 }));
        assert_eq!(values(&table), vec![1]);
    }

    #[test]
    fn remove_and_replace_use_logical_positions() {
        let owners = owners(&[1, 2, 3, 4]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);
        table.reclaim(tokens[1], true);

        let removed = table.remove(1).unwrap();
        assert_eq!(removed.token(), Some(tokens[2]));
        assert_eq!(values(&table), vec![1, 4]);

        let replacement = Tracked::new(40);
        let (_, previous) = table.replace(1, &replacement).unwrap();
        assert_eq!(previous.token(), Some(tokens[3]));
        assert_eq!(values(&table), vec![1, 40]);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn out_of_range_access_fails() {
        let owners = owners(&[1, 2]);
        let (mut table, _) = filled(Compaction::Eager, &owners);

        assert_eq!(table.get(2), Err(Error::IndexOutOfRange { index: 2, len: 2 }));
        assert!(table.remove(5).is_err());

        let replacement = Tracked::new(0);
        assert!(table.replace(2, &replacement).is_err());

        assert_eq!(table.len(), 2);
    }

    #[test]
    fn get_of_released_but_unreclaimed_slot_is_absent() {
        let mut owners = owners(&[1, 2]);
        let (table, _) = filled(Compaction::Eager, &owners);

        owners.remove(0);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Ok(None));
        assert_eq!(table.get(1).unwrap().as_deref(), Some(&2));
    }

    #[test]
    fn take_all_resets_counts() {
        let owners = owners(&[1, 2, 3]);
        let (mut table, tokens) = filled(Compaction::Lazy, &owners);
        table.reclaim(tokens[0], true);

        let slots = table.take_all();

        assert_eq!(slots.len(), 3);
        assert_eq!(table.len(), 0);
        assert_eq!(table.slot_count(), 0);
        assert_eq!(table.tombstones(), 0);
    }
}
