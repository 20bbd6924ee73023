use super::bv::BitVector;
use super::config::{PathSelection, SolverConfig};
use super::node::{NodeId, NodeTable};
use super::rng::{pick_rand, pick_with_prob};
use rand::Rng;
use std::cmp::Ordering;

/// Dynamic state of Cond path selection: the const-branch flip probability
/// is adjusted every `flip_cond_const_npathsel` hits, bouncing between the
/// per-mille rails.
pub struct FlipCondState {
    pub prob: u32,
    pub nflips: u32,
    pub delta: i32,
}

impl FlipCondState {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            prob: config.prob_flip_cond_const,
            nflips: 0,
            delta: 100,
        }
    }
}

/// If exactly one child is a constant, the other child is the only one that
/// can change.
fn select_non_const(nodes: &NodeTable, id: NodeId) -> Option<usize> {
    let node = nodes.get(id);
    for (i, &child) in node.children.iter().enumerate() {
        if nodes.is_const_edge(child) {
            return Some(if i == 0 { 1 } else { 0 });
        }
    }
    None
}

fn select_random<R: Rng>(rng: &mut R, arity: usize) -> usize {
    pick_rand(rng, 0, arity as u32 - 1) as usize
}

pub(crate) fn select_path_add<R: Rng>(
    nodes: &NodeTable,
    _config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    _bvadd: &BitVector,
    _bve: &[BitVector],
) -> usize {
    select_non_const(nodes, id).unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_and<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvand: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Random {
        return select_random(rng, 2);
    }
    if bvand.width() == 1 {
        // choose the 0-branch if exactly one branch is 0
        for (i, e) in bve.iter().enumerate() {
            if e.is_zero() {
                eidx = if eidx.is_none() { Some(i) } else { None };
            }
        }
    } else {
        // all bits set in bvand must be set in both inputs; a single input
        // violating this is the only one that can fix it
        for (i, e) in bve.iter().enumerate() {
            if bvand.and(e) != *bvand {
                eidx = if eidx.is_none() { Some(i) } else { None };
            }
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_eq<R: Rng>(
    nodes: &NodeTable,
    _config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    _bveq: &BitVector,
    _bve: &[BitVector],
) -> usize {
    select_non_const(nodes, id).unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_ult<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvult: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Essential && bvult.is_true() {
        // 1...1 < e[1] is unsatisfiable in e[1]; e[0] < 0 in e[0]
        if bve[0].is_ones() {
            eidx = Some(0);
        }
        if bve[1].is_zero() {
            eidx = if eidx.is_none() { Some(1) } else { None };
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_shl<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvshl: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    if config.path_sel == PathSelection::Essential {
        let shift = bve[1].to_u64();
        // the shift amount and the number of zero LSBs in bvshl must match
        for i in 0..shift.min(bvshl.width() as u64) {
            if bvshl.get_bit(i as u32) {
                return 1;
            }
        }
        // bve[0] and bvshl must match except for the bits shifted out
        let mut eidx: Option<usize> = None;
        let w = bvshl.width() as u64;
        for i in 0..w.saturating_sub(shift) {
            if bve[0].get_bit(i as u32) != bvshl.get_bit((shift + i) as u32) {
                eidx = if eidx.is_none() { Some(0) } else { None };
                break;
            }
        }
        if let Some(eidx) = eidx {
            return eidx;
        }
    }
    select_random(rng, 2)
}

pub(crate) fn select_path_lshr<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvlshr: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    if config.path_sel == PathSelection::Essential {
        let shift = bve[1].to_u64();
        let w = bvlshr.width();
        // the shift amount and the number of zero MSBs in bvlshr must match
        for i in 0..shift.min(w as u64) {
            if bvlshr.get_bit(w - 1 - i as u32) {
                return 1;
            }
        }
        let mut eidx: Option<usize> = None;
        for i in 0..(w as u64).saturating_sub(shift) {
            if bve[0].get_bit(w - 1 - i as u32) != bvlshr.get_bit(w - 1 - (shift + i) as u32) {
                eidx = if eidx.is_none() { Some(0) } else { None };
                break;
            }
        }
        if let Some(eidx) = eidx {
            return eidx;
        }
    }
    select_random(rng, 2)
}

pub(crate) fn select_path_mul<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvmul: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Essential {
        let iszero0 = bve[0].is_zero();
        let iszero1 = bve[1].is_zero();
        let lsb0 = bve[0].is_odd();
        let lsb1 = bve[1].is_odd();
        if (iszero0 || iszero1) && !bvmul.is_zero() {
            // a zero operand cannot produce a non-zero product
            if iszero0 {
                eidx = Some(0);
            }
            if iszero1 {
                eidx = if eidx.is_none() { Some(1) } else { None };
            }
        } else if bvmul.is_odd() && (!lsb0 || !lsb1) {
            // an odd product needs two odd operands
            if !lsb0 {
                eidx = Some(0);
            }
            if !lsb1 {
                eidx = if eidx.is_none() { Some(1) } else { None };
            }
        } else {
            let ctz = bvmul.num_trailing_zeros();
            if ctz < bve[0].num_trailing_zeros() {
                eidx = Some(0);
            }
            if ctz < bve[1].num_trailing_zeros() {
                eidx = if eidx.is_none() { Some(1) } else { None };
            }
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_udiv<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvudiv: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Essential {
        let bvmax = BitVector::ones(bve[0].width());
        if *bvudiv == bvmax {
            // x / 0 and 1...1 / {0,1} are the only ways to reach 1...1
            eidx = Some(1);
        } else {
            if bvudiv.is_zero() && bve[0] == bvmax {
                eidx = Some(0);
            } else if bve[0].ult(bvudiv) {
                eidx = Some(0);
            } else {
                let up = bve[0].udiv(bvudiv);
                let lo = bve[0].udiv(&bvudiv.inc()).inc();
                if lo.compare(&up) == Ordering::Greater {
                    eidx = Some(0);
                }
            }
            if bve[1].is_zero() || bve[1].umul_overflow(bvudiv) {
                eidx = if eidx.is_none() { Some(1) } else { None };
            }
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_urem<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvurem: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Essential {
        let bvmax = BitVector::ones(bve[0].width());
        let sub = bve[0].sub(bvurem);
        if *bvurem == bvmax {
            // 1...1 is only reachable as 1...1 % 0
            if !bve[1].is_zero() {
                eidx = Some(1);
            }
            if bve[0] != bvmax {
                eidx = if eidx.is_none() { Some(0) } else { None };
            }
        } else if !bvurem.is_zero() && bve[1].is_one() {
            eidx = Some(1);
        } else if !bve[1].is_zero() && bve[1].compare(bvurem) != Ordering::Greater {
            eidx = if eidx.is_none() { Some(1) } else { None };
        } else if bve[0].ult(bvurem)
            || (bve[0].compare(bvurem) == Ordering::Greater
                && (sub.compare(bvurem) != Ordering::Greater || bve[0].dec() == *bvurem))
        {
            eidx = Some(0);
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_concat<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    id: NodeId,
    bvconcat: &BitVector,
    bve: &[BitVector],
) -> usize {
    if let Some(eidx) = select_non_const(nodes, id) {
        return eidx;
    }
    let mut eidx: Option<usize> = None;
    if config.path_sel == PathSelection::Essential {
        let w = bvconcat.width();
        let hi = bvconcat.slice(w - 1, w - bve[0].width());
        if hi != bve[0] {
            eidx = Some(0);
        }
        let lo = bvconcat.slice(bve[1].width() - 1, 0);
        if lo != bve[1] {
            eidx = if eidx.is_none() { Some(1) } else { None };
        }
    }
    eidx.unwrap_or_else(|| select_random(rng, 2))
}

pub(crate) fn select_path_slice(_nodes: &NodeTable) -> usize {
    0
}

/// Cond selection: either assume the condition fixed and descend into the
/// enabled branch, or flip the condition, preferring a flip when the enabled
/// branch is a constant (which could never be repaired).
pub(crate) fn select_path_cond<R: Rng>(
    nodes: &NodeTable,
    config: &SolverConfig,
    rng: &mut R,
    state: &mut FlipCondState,
    id: NodeId,
    bve0: &BitVector,
) -> usize {
    let node = nodes.get(id);
    if nodes.is_const_edge(node.children[0]) {
        return if nodes.const_value(node.children[0]).is_true() {
            1
        } else {
            2
        };
    }
    let e1const = nodes.is_const_edge(node.children[1]);
    let e2const = nodes.is_const_edge(node.children[2]);
    if ((e1const && bve0.is_true()) || (e2const && bve0.is_false()))
        && pick_with_prob(rng, state.prob)
    {
        state.nflips += 1;
        if state.nflips == config.flip_cond_const_npathsel {
            state.nflips = 0;
            state.delta = if state.prob == 0 {
                100
            } else if state.prob == 1000 {
                -100
            } else {
                state.delta
            };
            state.prob = (state.prob as i32 + state.delta).clamp(0, 1000) as u32;
        }
        0
    } else if pick_with_prob(rng, config.prob_flip_cond) {
        0
    } else if bve0.is_true() {
        1
    } else {
        2
    }
}
