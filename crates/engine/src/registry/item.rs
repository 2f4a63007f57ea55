use super::name::RegName;

/// Default stack size for items that do not override it.
pub const DEFAULT_MAX_STACK: u32 = 64;

/// An immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: u32,
    name: RegName,
    max_stack: u32,
    /// The block this item places, if any.
    block: Option<RegName>,
}

impl Item {
    pub(crate) fn new(id: u32, name: RegName, max_stack: u32, block: Option<RegName>) -> Self {
        Self {
            id,
            name,
            max_stack: max_stack.max(1),
            block,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &RegName {
        &self.name
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn block(&self) -> Option<&RegName> {
        self.block.as_ref()
    }
}

/// Registration request for an item; the registry assigns the numeric id.
#[derive(Debug, Clone)]
pub struct ItemDef {
    pub name: RegName,
    pub max_stack: u32,
    pub block: Option<RegName>,
}

impl ItemDef {
    pub fn new(name: RegName) -> Self {
        Self {
            name,
            max_stack: DEFAULT_MAX_STACK,
            block: None,
        }
    }

    pub fn max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn places(mut self, block: RegName) -> Self {
        self.block = Some(block);
        self
    }
}
