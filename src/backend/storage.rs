use hashbrown::HashMap;

use crate::backend::CodegenError;

/// One storage location is one machine word.
pub const WORD_SIZE: usize = 8;

/// Minimum stack alignment of the generated program's frame.
pub const STACK_ALIGNMENT: usize = 16;

/// How a target stores named variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    /// One word-sized slot per variable inside the entry frame
    StackSlots,
    /// One zero-initialized global label per variable
    GlobalLabels,
}

/// An abstract address holding one variable's value for the duration of a
/// compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Index of a word-sized stack slot
    Slot(u32),
    /// Index of a named global (rendered as `var_N`)
    Global(u32),
}

/// Assigns a unique storage location to each distinct variable name. Once
/// allocated, a location is never reassigned or freed.
#[derive(Debug)]
pub struct StorageAllocator {
    mode: StorageMode,
    locations: HashMap<String, Location>,
    /// Names in order of first assignment, for deterministic emission
    insertion_order: Vec<String>,
}

impl StorageAllocator {
    pub fn new(mode: StorageMode) -> Self {
        Self {
            mode,
            locations: HashMap::new(),
            insertion_order: Vec::new(),
        }
    }

    /// Returns the existing location for `name`, or creates and records the
    /// next free one.
    pub fn allocate(&mut self, name: &str) -> Location {
        if let Some(&location) = self.locations.get(name) {
            return location;
        }

        let index = self.insertion_order.len() as u32;
        let location = match self.mode {
            StorageMode::StackSlots => Location::Slot(index),
            StorageMode::GlobalLabels => Location::Global(index),
        };

        self.locations.insert(name.to_owned(), location);
        self.insertion_order.push(name.to_owned());

        location
    }

    /// Reading a name that was never assigned is a fatal error.
    pub fn lookup(&self, name: &str) -> Result<Location, CodegenError> {
        self.locations
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::UndefinedVariable {
                name: name.to_owned(),
            })
    }

    pub fn variable_count(&self) -> u32 {
        self.insertion_order.len() as u32
    }

    /// Variables with their locations, in order of first assignment.
    pub fn variables(&self) -> impl Iterator<Item = (&str, Location)> {
        self.insertion_order
            .iter()
            .map(|name| (name.as_str(), self.locations[name]))
    }
}

pub fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassignment_reuses_the_existing_location() {
        let mut allocator = StorageAllocator::new(StorageMode::StackSlots);

        let first = allocator.allocate("x");
        let second = allocator.allocate("y");
        let again = allocator.allocate("x");

        assert_eq!(first, Location::Slot(0));
        assert_eq!(second, Location::Slot(1));
        assert_eq!(again, first);
        assert_eq!(allocator.variable_count(), 2);
    }

    #[test]
    fn lookup_of_unassigned_name_fails() {
        let allocator = StorageAllocator::new(StorageMode::GlobalLabels);

        assert!(matches!(
            allocator.lookup("ghost"),
            Err(CodegenError::UndefinedVariable { name }) if name == "ghost"
        ));
    }

    #[test]
    fn global_mode_hands_out_global_labels_in_assignment_order() {
        let mut allocator = StorageAllocator::new(StorageMode::GlobalLabels);

        allocator.allocate("b");
        allocator.allocate("a");
        allocator.allocate("b");

        let variables: Vec<_> = allocator.variables().collect();
        assert_eq!(
            variables,
            vec![("b", Location::Global(0)), ("a", Location::Global(1))]
        );
    }

    #[test]
    fn align_to_rounds_up() {
        assert_eq!(align_to(0, 16), 0);
        assert_eq!(align_to(8, 16), 16);
        assert_eq!(align_to(16, 16), 16);
        assert_eq!(align_to(24, 16), 32);
    }
}
