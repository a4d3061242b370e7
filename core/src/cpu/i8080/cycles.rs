//! Approximate per-opcode cycle costs (SPEC_FULL.md §4.2): not
//! load-bearing for correctness, only for real-time pacing (§4.9).

use super::decode::Kind;
use super::registers::SEL_M;

/// Cycle cost of `kind`. `taken` only matters for the conditional
/// call/return/jump families, where the reference gives a 1-or-3/5 range.
pub fn cycles(kind: &Kind, taken: bool) -> u32 {
    match *kind {
        Kind::Nop => 1,
        Kind::AluReg { src, .. } => {
            if src == SEL_M {
                2
            } else {
                1
            }
        }
        Kind::AluImm { .. } => 2,
        Kind::Mov { dst, src } => {
            if dst == SEL_M || src == SEL_M {
                2
            } else {
                1
            }
        }
        Kind::MviImm { dst, .. } => {
            if dst == SEL_M {
                3
            } else {
                2
            }
        }
        Kind::IncDecReg { sel, .. } => {
            if sel == SEL_M {
                3
            } else {
                1
            }
        }
        Kind::IncDecPair { .. } => 1,
        Kind::Dad { .. } => 2,
        Kind::Lxi { .. } => 3,
        Kind::Ldax { .. } | Kind::Stax { .. } => 2,
        Kind::Push { .. } | Kind::Pop { .. } => 3,
        Kind::Rst { .. } => 3,
        Kind::Jmp { .. } | Kind::Jcc { .. } => 3,
        Kind::Call { .. } | Kind::Ccc { .. } => {
            if taken {
                5
            } else {
                3
            }
        }
        Kind::Ret => 3,
        Kind::Rcc { .. } => {
            if taken {
                3
            } else {
                1
            }
        }
        Kind::Lda { .. } | Kind::Sta { .. } => 4,
        Kind::Lhld { .. } | Kind::Shld { .. } => 5,
        Kind::Xchg => 1,
        Kind::Xthl => 5,
        Kind::Sphl => 1,
        Kind::Pchl => 1,
        Kind::Rlc | Kind::Rrc | Kind::Ral | Kind::Rar => 1,
        Kind::Daa => 1,
        Kind::Cma | Kind::Stc | Kind::Cmc => 1,
        Kind::Di | Kind::Ei => 1,
        Kind::Hlt => 1,
        Kind::In { .. } | Kind::Out { .. } => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::decode::AluOp;

    #[test]
    fn memory_operands_cost_more_than_register_operands() {
        let reg = Kind::AluReg { op: AluOp::Add, src: 0 };
        let mem = Kind::AluReg { op: AluOp::Add, src: SEL_M };
        assert!(cycles(&mem, false) > cycles(&reg, false));
    }

    #[test]
    fn taken_branches_cost_more() {
        let call = Kind::Call { addr: 0 };
        assert!(cycles(&call, true) > cycles(&call, false));
    }
}
