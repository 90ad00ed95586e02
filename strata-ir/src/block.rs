use id_arena::Id;

use crate::inst::InstId;

pub type BlockId = Id<BasicBlock>;

/// Ordered container of instructions. Phi instructions form a distinguished
/// prefix sequence; block-order traversal visits phis first, then the rest.
/// Blocks reference their neighbors by id, the graph owns the storage.
pub struct BasicBlock {
    pub(crate) id: u32,
    pub(crate) preds: Vec<BlockId>,
    pub(crate) succs: Vec<BlockId>,
    pub(crate) phis: Vec<InstId>,
    pub(crate) insts: Vec<InstId>,
    pub(crate) loop_header: bool,
    pub(crate) try_region: bool,
    pub(crate) catch: bool,
}

impl BasicBlock {
    pub(crate) fn new(id: u32) -> BasicBlock {
        BasicBlock {
            id,
            preds: Vec::new(),
            succs: Vec::new(),
            phis: Vec::new(),
            insts: Vec::new(),
            loop_header: false,
            try_region: false,
            catch: false,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn preds(&self) -> &[BlockId] {
        &self.preds
    }

    pub fn succs(&self) -> &[BlockId] {
        &self.succs
    }

    pub fn successor(&self, index: usize) -> BlockId {
        self.succs[index]
    }

    /// Non-phi instructions in block order.
    pub fn insts(&self) -> &[InstId] {
        &self.insts
    }

    /// Phi instructions in block order.
    pub fn phi_insts(&self) -> &[InstId] {
        &self.phis
    }

    /// All instructions: phis first, then the rest.
    pub fn all_insts(&self) -> impl Iterator<Item = InstId> + '_ {
        self.phis.iter().copied().chain(self.insts.iter().copied())
    }

    pub fn first_inst(&self) -> Option<InstId> {
        self.phis.first().or_else(|| self.insts.first()).copied()
    }

    /// A block is empty when it holds no non-phi instructions.
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn has_phi(&self) -> bool {
        !self.phis.is_empty()
    }

    pub fn is_loop_header(&self) -> bool {
        self.loop_header
    }

    pub fn set_loop_header(&mut self, value: bool) {
        self.loop_header = value;
    }

    pub fn is_try_region(&self) -> bool {
        self.try_region
    }

    pub fn set_try_region(&mut self, value: bool) {
        self.try_region = value;
    }

    pub fn is_catch(&self) -> bool {
        self.catch
    }

    pub fn set_catch(&mut self, value: bool) {
        self.catch = value;
    }
}
