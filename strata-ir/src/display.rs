use std::fmt;

use crate::graph::Graph;
use crate::inst::{InstId, Register, ACC_REG, INVALID_REG};
use crate::opcode::Opcode;
use crate::ty::Type;

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == INVALID_REG {
            write!(f, "-")
        } else if *self == ACC_REG {
            write!(f, "acc")
        } else {
            write!(f, "r{}", self.0)
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub fn display_inst(graph: &Graph, inst_id: InstId) -> String {
    let inst = graph.inst(inst_id);
    let mut repr = format!("{}. {} {}", inst.id(), inst.ty(), inst.opcode());

    let mut first = true;
    for input in inst.inputs() {
        if first {
            repr.push_str(" v");
            first = false;
        } else {
            repr.push_str(", v");
        }
        repr.push_str(&graph.inst(input).id().to_string());
    }

    repr.push_str(&format!(" -> {}", inst.dst_reg()));
    repr
}

/// Textual listing of the whole graph in reverse postorder, for logs and
/// failing-test output.
pub fn dump(graph: &Graph) -> String {
    let mut repr = String::new();

    for block_id in graph.blocks_rpo() {
        let block = graph.block(block_id);
        repr.push_str(&format!("BB{}:", block.id()));

        if !block.preds().is_empty() {
            repr.push_str(" preds:");
            for &pred in block.preds() {
                repr.push_str(&format!(" BB{}", graph.block(pred).id()));
            }
        }
        repr.push('\n');

        for inst in block.all_insts() {
            repr.push_str("  ");
            repr.push_str(&display_inst(graph, inst));
            repr.push('\n');
        }
    }

    repr
}
