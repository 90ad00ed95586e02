use fixedbitset::FixedBitSet;

use crate::inst::InstId;

/// Transient per-pass instruction tag. Allocated from the graph at pass
/// start, owned by the pass object and dropped on every exit path, so a tag
/// never leaks into the next pass run.
pub struct InstMarker {
    bits: FixedBitSet,
}

impl InstMarker {
    pub(crate) fn new(capacity: usize) -> InstMarker {
        InstMarker {
            bits: FixedBitSet::with_capacity(capacity),
        }
    }

    pub fn mark(&mut self, inst: InstId) {
        self.bits.insert(inst.index());
    }

    pub fn unmark(&mut self, inst: InstId) {
        self.bits.set(inst.index(), false);
    }

    pub fn is_marked(&self, inst: InstId) -> bool {
        self.bits.contains(inst.index())
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }
}
