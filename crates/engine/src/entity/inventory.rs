use std::sync::Arc;

use crate::registry::Item;

pub const HOTBAR_SLOTS: usize = 9;
pub const INVENTORY_SLOTS: usize = 36;

/// An item and a count in `1..=max_stack`. A stack that reaches zero is
/// dropped by its owner; [`ItemStack::shrink`] reports that.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemStack {
    item: Arc<Item>,
    count: u32,
}

impl ItemStack {
    /// `None` for a zero count. Counts above the item's max stack are capped.
    pub fn new(item: Arc<Item>, count: u32) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let count = count.min(item.max_stack());
        Some(Self { item, count })
    }

    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.item.max_stack()
    }

    /// Add up to `amount`; returns what did not fit.
    pub fn grow(&mut self, amount: u32) -> u32 {
        let room = self.item.max_stack() - self.count;
        let added = amount.min(room);
        self.count += added;
        amount - added
    }

    /// Remove up to `amount`. True if the stack is now empty.
    pub fn shrink(&mut self, amount: u32) -> bool {
        self.count = self.count.saturating_sub(amount);
        self.count == 0
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Fixed slot array; the first [`HOTBAR_SLOTS`] slots form the hotbar.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    slots: Vec<Option<ItemStack>>,
    selected: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self {
            slots: vec![None; INVENTORY_SLOTS],
            selected: 0,
        }
    }

    pub fn selected_slot(&self) -> usize {
        self.selected
    }

    /// Select a hotbar slot. Out-of-range slots are ignored.
    pub fn select(&mut self, slot: usize) -> bool {
        if slot < HOTBAR_SLOTS {
            self.selected = slot;
            true
        } else {
            false
        }
    }

    pub fn slot(&self, index: usize) -> Option<&ItemStack> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn set_slot(&mut self, index: usize, stack: Option<ItemStack>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = stack;
        }
    }

    pub fn selected_stack(&self) -> Option<&ItemStack> {
        self.slot(self.selected)
    }

    /// Take one item from the selected slot, clearing the slot when it runs out.
    pub fn take_selected(&mut self) -> Option<Arc<Item>> {
        let slot = self.slots.get_mut(self.selected)?;
        let stack = slot.as_mut()?;
        let item = Arc::clone(stack.item());
        if stack.shrink(1) {
            *slot = None;
        }
        Some(item)
    }

    /// Merge into matching stacks first, then fill empty slots. Returns the
    /// count that did not fit.
    pub fn insert(&mut self, item: &Arc<Item>, mut count: u32) -> u32 {
        for stack in self.slots.iter_mut().flatten() {
            if count == 0 {
                return 0;
            }
            if stack.item().id() == item.id() {
                count = stack.grow(count);
            }
        }
        for slot in self.slots.iter_mut().filter(|s| s.is_none()) {
            if count == 0 {
                break;
            }
            let put = count.min(item.max_stack());
            *slot = ItemStack::new(Arc::clone(item), put);
            count -= put;
        }
        count
    }

    pub fn slots(&self) -> &[Option<ItemStack>] {
        &self.slots
    }
}
