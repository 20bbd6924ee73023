use super::bv::BitVector;
use super::cons_value as cons;
use super::node::{NodeId, NodeKind};
use super::prop_engine::PropCtx;
use super::rng::{pick_rand, pick_with_prob};
use std::cmp::Ordering;

/// Inverse values: for operator output `bvop` and fixed operand `bve`,
/// compute an operand value for side `eidx` that makes the operator produce
/// `bvop` exactly. On a conflict the functions fall back to a consistent
/// value (recoverable), or return `None` when the fixed operand is a
/// constant and `no_move_on_conflict` is set (non-recoverable). Conflicts
/// are reported through counters, never by unwinding.

type ConsFn = fn(&mut PropCtx, NodeId, &BitVector, &BitVector, usize) -> BitVector;

fn on_conflict(
    ctx: &mut PropCtx,
    id: NodeId,
    bvop: &BitVector,
    bve: &BitVector,
    eidx: usize,
    cons_fn: ConsFn,
) -> Option<BitVector> {
    let fixed = ctx.nodes.get(id).children[if eidx == 1 { 0 } else { 1 }];
    if ctx.config.no_move_on_conflict && ctx.nodes.is_const_edge(fixed) {
        ctx.stats.non_rec_conf += 1;
        None
    } else {
        ctx.stats.rec_conf += 1;
        Some(cons_fn(ctx, id, bvop, bve, eidx))
    }
}

/// res + bve = bvadd is uniquely solvable: res = bvadd - bve.
pub(crate) fn inv_add(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvadd: &BitVector,
    bve: &BitVector,
    _eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("add");
    let res = bvadd.sub(bve);
    debug_assert_eq!(res.add(bve), *bvadd);
    Some(res)
}

/// res & bve = bvand: bits set in bvand must be set in bve (else conflict)
/// and in res; bits cleared in bvand but set in bve must be cleared in res;
/// bits cleared in bve are free.
pub(crate) fn inv_and(
    ctx: &mut PropCtx,
    id: NodeId,
    bvand: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("and");
    let child = ctx.nodes.get(id).children[eidx];
    let mut res = ctx.model.get_bv(ctx.nodes, ctx.sorts, child);
    let keep_dc = pick_with_prob(ctx.rng, ctx.config.prob_and_flip);
    let mut dcbits = Vec::new();
    for i in 0..bvand.width() {
        let bitand = bvand.get_bit(i);
        let bite = bve.get_bit(i);
        if bitand && !bite {
            return on_conflict(ctx, id, bvand, bve, eidx, cons::cons_and);
        }
        if bitand {
            res.set_bit(i, true);
        } else if bite {
            res.set_bit(i, false);
        } else if keep_dc {
            dcbits.push(i);
        } else {
            res.set_bit(i, pick_rand(ctx.rng, 0, 1) == 1);
        }
    }
    if keep_dc && !dcbits.is_empty() {
        let at = pick_rand(ctx.rng, 0, dcbits.len() as u32 - 1) as usize;
        res.flip_bit(dcbits[at]);
    }
    debug_assert_eq!(res.and(bve), *bvand);
    Some(res)
}

pub(crate) fn inv_eq(
    ctx: &mut PropCtx,
    id: NodeId,
    bveq: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("eq");
    if bveq.is_zero() {
        // res != bve
        let w = bve.width();
        if pick_with_prob(ctx.rng, ctx.config.prob_eq_flip) {
            let child = ctx.nodes.get(id).children[eidx];
            for _ in 0..w {
                let mut res = ctx.model.get_bv(ctx.nodes, ctx.sorts, child);
                res.flip_bit(pick_rand(ctx.rng, 0, w - 1));
                if res != *bve {
                    return Some(res);
                }
            }
        }
        loop {
            let res = BitVector::new_random(ctx.rng, w);
            if res != *bve {
                return Some(res);
            }
        }
    }
    Some(bve.clone())
}

pub(crate) fn inv_ult(
    ctx: &mut PropCtx,
    id: NodeId,
    bvult: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("ult");
    let bw = bve.width();
    let isult = !bvult.is_zero();
    let zero = BitVector::zero(bw);
    let bvmax = BitVector::ones(bw);
    let res = if eidx == 1 {
        if *bve == bvmax && isult {
            // 1...1 < res has no solution
            return on_conflict(ctx, id, bvult, bve, eidx, cons::cons_ult);
        } else if !isult {
            BitVector::new_random_range(ctx.rng, bw, &zero, bve)
        } else {
            let lo = bve.inc();
            BitVector::new_random_range(ctx.rng, bw, &lo, &bvmax)
        }
    } else if bve.is_zero() && isult {
        // res < 0 has no solution
        return on_conflict(ctx, id, bvult, bve, eidx, cons::cons_ult);
    } else if !isult {
        BitVector::new_random_range(ctx.rng, bw, bve, &bvmax)
    } else {
        let hi = bve.dec();
        BitVector::new_random_range(ctx.rng, bw, &zero, &hi)
    };
    Some(res)
}

pub(crate) fn inv_shl(
    ctx: &mut PropCtx,
    id: NodeId,
    bvshl: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("shl");
    let bw = bvshl.width();
    if eidx == 1 {
        // bve << res = bvshl: the possible shift is determined by the gap in
        // trailing zeros
        let sbw = bw.trailing_zeros();
        if bve.is_zero() && bvshl.is_zero() {
            return Some(BitVector::new_random(ctx.rng, sbw));
        }
        let ctz_bve = bve.num_trailing_zeros();
        let ctz_bvshl = bvshl.num_trailing_zeros();
        if ctz_bve > ctz_bvshl {
            return on_conflict(ctx, id, bvshl, bve, eidx, cons::cons_shl);
        }
        let shift = ctz_bvshl - ctz_bve;
        if shift > bw - 1 {
            return on_conflict(ctx, id, bvshl, bve, eidx, cons::cons_shl);
        }
        if bvshl.is_zero() {
            // any shift that pushes all of bve out
            let lo = BitVector::from_u64(shift as u64, sbw);
            let hi = BitVector::ones(sbw);
            return Some(BitVector::new_random_range(ctx.rng, sbw, &lo, &hi));
        }
        for i in 0..bw - shift {
            if bve.get_bit(i) != bvshl.get_bit(shift + i) {
                return on_conflict(ctx, id, bvshl, bve, eidx, cons::cons_shl);
            }
        }
        Some(BitVector::from_u64(shift as u64, sbw))
    } else {
        // res << bve = bvshl: res = bvshl >> bve with the vacated high bits
        // chosen randomly
        let shift = bve.to_u64();
        if (bvshl.num_trailing_zeros() as u64) < shift {
            return on_conflict(ctx, id, bvshl, bve, eidx, cons::cons_shl);
        }
        let mut res = bvshl.lshr(bve);
        for i in 0..shift as u32 {
            res.set_bit(bw - 1 - i, pick_rand(ctx.rng, 0, 1) == 1);
        }
        Some(res)
    }
}

pub(crate) fn inv_lshr(
    ctx: &mut PropCtx,
    id: NodeId,
    bvlshr: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("lshr");
    let bw = bvlshr.width();
    if eidx == 1 {
        let sbw = bw.trailing_zeros();
        if bve.is_zero() && bvlshr.is_zero() {
            return Some(BitVector::new_random(ctx.rng, sbw));
        }
        let clz_bve = bve.num_leading_zeros();
        let clz_bvlshr = bvlshr.num_leading_zeros();
        if clz_bve > clz_bvlshr {
            return on_conflict(ctx, id, bvlshr, bve, eidx, cons::cons_lshr);
        }
        let shift = clz_bvlshr - clz_bve;
        if shift > bw - 1 {
            return on_conflict(ctx, id, bvlshr, bve, eidx, cons::cons_lshr);
        }
        if bvlshr.is_zero() {
            let lo = BitVector::from_u64(shift as u64, sbw);
            let hi = BitVector::ones(sbw);
            return Some(BitVector::new_random_range(ctx.rng, sbw, &lo, &hi));
        }
        for i in 0..bw - shift {
            if bve.get_bit(bw - 1 - i) != bvlshr.get_bit(bw - 1 - (shift + i)) {
                return on_conflict(ctx, id, bvlshr, bve, eidx, cons::cons_lshr);
            }
        }
        Some(BitVector::from_u64(shift as u64, sbw))
    } else {
        // res >> bve = bvlshr: res = bvlshr << bve with the vacated low bits
        // chosen randomly
        let shift = bve.to_u64();
        if (bvlshr.num_leading_zeros() as u64) < shift {
            return on_conflict(ctx, id, bvlshr, bve, eidx, cons::cons_lshr);
        }
        let mut res = bvlshr.shl(bve);
        for i in 0..shift as u32 {
            res.set_bit(i, pick_rand(ctx.rng, 0, 1) == 1);
        }
        Some(res)
    }
}

/// bve * res = bvmul: odd bve has the unique solution bvmul * bve^-1; an
/// even bve = 2^n * m requires at least n trailing zeros in bvmul, and the
/// top n bits of the solution are free.
pub(crate) fn inv_mul(
    ctx: &mut PropCtx,
    id: NodeId,
    bvmul: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("mul");
    let bw = bvmul.width();
    if bve.is_zero() {
        if bvmul.is_zero() {
            return Some(BitVector::new_random(ctx.rng, bw));
        }
        return on_conflict(ctx, id, bvmul, bve, eidx, cons::cons_mul);
    }
    if bvmul.is_odd() && !bve.is_odd() {
        return on_conflict(ctx, id, bvmul, bve, eidx, cons::cons_mul);
    }
    if bve.is_odd() {
        let res = bve.mod_inverse().mul(bvmul);
        debug_assert_eq!(res.mul(bve), *bvmul);
        return Some(res);
    }
    let n = bve.power_of_two();
    if n >= 0 {
        let n = n as u32;
        if bvmul.num_trailing_zeros() < n {
            return on_conflict(ctx, id, bvmul, bve, eidx, cons::cons_mul);
        }
        let mut res = bvmul.slice(bw - 1, n).uext(n);
        for i in 0..n {
            res.set_bit(bw - 1 - i, pick_rand(ctx.rng, 0, 1) == 1);
        }
        debug_assert_eq!(res.mul(bve), *bvmul);
        return Some(res);
    }
    // bve = 2^j * m with m odd
    let j = bve.num_trailing_zeros();
    if bvmul.num_trailing_zeros() < j {
        return on_conflict(ctx, id, bvmul, bve, eidx, cons::cons_mul);
    }
    let shifted = bvmul.slice(bw - 1, j).uext(j);
    let m = bve.slice(bw - 1, j).uext(j);
    let mut res = shifted.mul(&m.mod_inverse());
    for i in 0..j {
        res.set_bit(bw - 1 - i, pick_rand(ctx.rng, 0, 1) == 1);
    }
    debug_assert_eq!(res.mul(bve), *bvmul);
    Some(res)
}

pub(crate) fn inv_udiv(
    ctx: &mut PropCtx,
    id: NodeId,
    bvudiv: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("udiv");
    let bw = bve.width();
    let one = BitVector::one(bw);
    let bvmax = BitVector::ones(bw);
    if eidx == 1 {
        // bve / res = bvudiv
        let res = if *bvudiv == bvmax {
            if *bve == bvmax && pick_with_prob(ctx.rng, 500) {
                // 1...1 / 1 = 1...1
                one
            } else {
                // x / 0 = 1...1
                BitVector::zero(bw)
            }
        } else if bvudiv.is_zero() {
            if bve.is_zero() {
                BitVector::new_random_range(ctx.rng, bw, &one, &bvmax)
            } else if *bve != bvmax {
                let lo = bve.inc();
                BitVector::new_random_range(ctx.rng, bw, &lo, &bvmax)
            } else {
                return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
            }
        } else if bve.ult(bvudiv) {
            return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
        } else if bve.urem(bvudiv).is_zero() && pick_with_prob(ctx.rng, 500) {
            bve.udiv(bvudiv)
        } else {
            // all divisors yielding bvudiv lie in
            // [bve / (bvudiv + 1) + 1, bve / bvudiv]
            let up = bve.udiv(bvudiv);
            let lo = bve.udiv(&bvudiv.inc()).inc();
            if lo.compare(&up) == Ordering::Greater {
                return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
            }
            BitVector::new_random_range(ctx.rng, bw, &lo, &up)
        };
        Some(res)
    } else {
        // res / bve = bvudiv
        let res = if *bvudiv == bvmax {
            if *bve == one {
                bvmax
            } else if bve.is_zero() {
                BitVector::new_random(ctx.rng, bw)
            } else {
                return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
            }
        } else if bve.is_zero() {
            return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
        } else if bve.umul_overflow(bvudiv) {
            return on_conflict(ctx, id, bvudiv, bve, eidx, cons::cons_udiv);
        } else if pick_with_prob(ctx.rng, 500) {
            bve.mul(bvudiv)
        } else {
            // all dividends yielding bvudiv lie in
            // [bve * bvudiv, bve * (bvudiv + 1) - 1]
            let lo = bve.mul(bvudiv);
            let next = bvudiv.inc();
            let up = if bve.umul_overflow(&next) {
                bvmax.clone()
            } else {
                bve.mul(&next).dec()
            };
            BitVector::new_random_range(ctx.rng, bw, &lo, &up)
        };
        Some(res)
    }
}

pub(crate) fn inv_urem(
    ctx: &mut PropCtx,
    id: NodeId,
    bvurem: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("urem");
    let bw = bvurem.width();
    let one = BitVector::one(bw);
    let bvmax = BitVector::ones(bw);
    if eidx == 1 {
        // bve % res = bvurem
        if *bvurem == bvmax {
            // only 1...1 % 0 = 1...1
            if *bve != bvmax {
                return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
            }
            return Some(BitVector::zero(bw));
        }
        match bve.compare(bvurem) {
            Ordering::Equal => {
                // either res = 0 (x % 0 = x) or any res > bvurem
                if pick_with_prob(ctx.rng, 250) {
                    Some(BitVector::zero(bw))
                } else {
                    let lo = bvurem.inc();
                    Some(BitVector::new_random_range(ctx.rng, bw, &lo, &bvmax))
                }
            }
            Ordering::Greater => {
                if !bvurem.is_zero() && bve.dec() == *bvurem {
                    // bve % res = bve - 1 is impossible for bvurem > 0
                    return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
                }
                let sub = bve.sub(bvurem);
                if sub.compare(bvurem) != Ordering::Greater {
                    return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
                }
                if pick_with_prob(ctx.rng, 500) {
                    return Some(sub);
                }
                // res = (bve - bvurem) / n for some n with res > bvurem
                let up = if bvurem.is_zero() {
                    bve.clone()
                } else {
                    let q = sub.udiv(bvurem);
                    if sub.urem(bvurem).is_zero() {
                        q.dec()
                    } else {
                        q
                    }
                };
                if up.is_zero() {
                    return Some(sub);
                }
                let mut n = BitVector::new_random_range(ctx.rng, bw, &one, &up);
                let mut cnt = 0;
                while !sub.urem(&n).is_zero() && cnt < bw {
                    n = BitVector::new_random_range(ctx.rng, bw, &one, &up);
                    cnt += 1;
                }
                if sub.urem(&n).is_zero() {
                    Some(sub.udiv(&n))
                } else {
                    Some(sub)
                }
            }
            Ordering::Less => on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem),
        }
    } else {
        // res % bve = bvurem
        if bve.is_zero() {
            return Some(bvurem.clone());
        }
        if !bvurem.is_zero() && bve.is_one() {
            return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
        }
        if *bvurem == bvmax {
            // would need bve = 0, handled above
            return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
        }
        if bve.compare(bvurem) != Ordering::Greater {
            return on_conflict(ctx, id, bvurem, bve, eidx, cons::cons_urem);
        }
        if pick_with_prob(ctx.rng, 500) {
            return Some(bvurem.clone());
        }
        // res = bve * n + bvurem without overflow
        if bvmax.sub(bve).ult(bvurem) {
            // even n = 1 overflows
            return Some(bvurem.clone());
        }
        let mut n = BitVector::new_random_range(ctx.rng, bw, &one, &bvmax);
        while bve.umul_overflow(&n) {
            let hi = n.dec();
            n = BitVector::new_random_range(ctx.rng, bw, &one, &hi);
        }
        let mut mul = bve.mul(&n);
        if bvmax.sub(&mul).ult(bvurem) {
            let hi = n.dec();
            n = BitVector::new_random_range(ctx.rng, bw, &one, &hi);
            mul = bve.mul(&n);
        }
        let res = mul.add(bvurem);
        debug_assert_eq!(res.urem(bve), *bvurem);
        Some(res)
    }
}

pub(crate) fn inv_concat(
    ctx: &mut PropCtx,
    id: NodeId,
    bvconcat: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> Option<BitVector> {
    ctx.stats.bump_inv("concat");
    let w = bvconcat.width();
    if eidx == 1 {
        // bve o res = bvconcat
        let hi = bvconcat.slice(w - 1, w - bve.width());
        if hi != *bve {
            return on_conflict(ctx, id, bvconcat, bve, eidx, cons::cons_concat);
        }
        Some(bvconcat.slice(w - bve.width() - 1, 0))
    } else {
        // res o bve = bvconcat
        let lo = bvconcat.slice(bve.width() - 1, 0);
        if lo != *bve {
            return on_conflict(ctx, id, bvconcat, bve, eidx, cons::cons_concat);
        }
        Some(bvconcat.slice(w - 1, bve.width()))
    }
}

/// Slice inversion: the projected bits are pinned; the remaining bits keep
/// their previous value with probability `prob_slice_keep_dc` or are drawn
/// randomly, with at most one additional flip under `prob_slice_flip`.
/// Never conflicts, so it doubles as the consistent value.
pub(crate) fn slice_value(
    ctx: &mut PropCtx,
    id: NodeId,
    bvslice: &BitVector,
    bve: &BitVector,
) -> BitVector {
    let node = ctx.nodes.get(id);
    let (upper, lower) = match node.kind {
        NodeKind::Slice { upper, lower } => (upper, lower),
        _ => unreachable!("slice_value on non-slice node"),
    };
    let w = bve.width();
    let bflip = pick_with_prob(ctx.rng, ctx.config.prob_slice_flip);
    let bkeep = bflip || pick_with_prob(ctx.rng, ctx.config.prob_slice_keep_dc);

    let mut res = BitVector::zero(w);
    for i in 0..lower {
        let bit = if bkeep {
            bve.get_bit(i)
        } else {
            pick_rand(ctx.rng, 0, 1) == 1
        };
        res.set_bit(i, bit);
    }
    for i in lower..=upper {
        res.set_bit(i, bvslice.get_bit(i - lower));
    }
    for i in upper + 1..w {
        let bit = if bkeep {
            bve.get_bit(i)
        } else {
            pick_rand(ctx.rng, 0, 1) == 1
        };
        res.set_bit(i, bit);
    }

    if bflip {
        let can_lower = lower > 0;
        let can_upper = upper + 1 < w;
        match (can_lower, can_upper) {
            (true, true) => {
                let at = if pick_with_prob(ctx.rng, 500) {
                    pick_rand(ctx.rng, upper + 1, w - 1)
                } else {
                    pick_rand(ctx.rng, 0, lower - 1)
                };
                res.flip_bit(at);
            }
            (false, true) => res.flip_bit(pick_rand(ctx.rng, upper + 1, w - 1)),
            (true, false) => res.flip_bit(pick_rand(ctx.rng, 0, lower - 1)),
            (false, false) => {}
        }
    }
    debug_assert_eq!(res.slice(upper, lower), *bvslice);
    res
}

pub(crate) fn inv_slice(
    ctx: &mut PropCtx,
    id: NodeId,
    bvslice: &BitVector,
    bve: &BitVector,
) -> Option<BitVector> {
    ctx.stats.bump_inv("slice");
    Some(slice_value(ctx, id, bvslice, bve))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::config::SolverConfig;
    use crate::solver::model::Model;
    use crate::solver::node::NodeTable;
    use crate::solver::prop_engine::PropStats;
    use crate::solver::sorts::SortTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fix {
        nodes: NodeTable,
        sorts: SortTable,
        model: Model,
        config: SolverConfig,
        rng: StdRng,
        stats: PropStats,
    }

    impl Fix {
        fn new(seed: u64) -> Self {
            Self {
                nodes: NodeTable::new(),
                sorts: SortTable::new(),
                model: Model::new(),
                config: SolverConfig::default(),
                rng: StdRng::seed_from_u64(seed),
                stats: PropStats::default(),
            }
        }

        fn node2(&mut self, kind: NodeKind, w0: u32, w1: u32) -> NodeId {
            let s0 = self.sorts.bitvec(w0);
            let s1 = self.sorts.bitvec(w1);
            let a = self.nodes.mk_var(&self.sorts, s0, None).unwrap();
            let b = self.nodes.mk_var(&self.sorts, s1, None).unwrap();
            self.nodes
                .create(&mut self.sorts, kind, vec![a, b], false)
                .unwrap()
                .id
        }

        fn ctx(&mut self) -> PropCtx<'_> {
            PropCtx {
                nodes: &self.nodes,
                sorts: &self.sorts,
                model: &mut self.model,
                config: &self.config,
                rng: &mut self.rng,
                stats: &mut self.stats,
            }
        }
    }

    type InvFn = fn(&mut PropCtx, NodeId, &BitVector, &BitVector, usize) -> Option<BitVector>;

    /// Whenever an inverse function succeeds without falling back to a
    /// consistent value, applying the operator must reproduce the target
    /// exactly.
    fn check_inverse(
        kind: NodeKind,
        inv_fn: InvFn,
        apply: fn(&BitVector, &BitVector) -> BitVector,
        op_width: u32,
        rhs_width: u32,
        out_width: u32,
    ) {
        let mut fix = Fix::new(0xbeef);
        let id = fix.node2(kind.clone(), op_width, rhs_width);
        for _ in 0..200 {
            let bvop = BitVector::new_random(&mut fix.rng, out_width);
            for eidx in [0usize, 1] {
                let bve_width = if eidx == 1 { op_width } else { rhs_width };
                let bve = BitVector::new_random(&mut fix.rng, bve_width);
                let before = fix.stats.rec_conf;
                let res = {
                    let mut ctx = fix.ctx();
                    inv_fn(&mut ctx, id, &bvop, &bve, eidx)
                };
                let res = res.expect("recoverable fallback expected under defaults");
                if fix.stats.rec_conf == before {
                    let out = if eidx == 1 {
                        apply(&bve, &res)
                    } else {
                        apply(&res, &bve)
                    };
                    assert_eq!(
                        out, bvop,
                        "{:?} side {}: {} o {} != {}",
                        kind, eidx, res, bve, bvop
                    );
                }
            }
        }
    }

    #[test]
    fn inverse_add() {
        check_inverse(NodeKind::Add, inv_add, |a, b| a.add(b), 8, 8, 8);
    }

    #[test]
    fn inverse_and() {
        check_inverse(NodeKind::And, inv_and, |a, b| a.and(b), 8, 8, 8);
    }

    #[test]
    fn inverse_eq() {
        check_inverse(
            NodeKind::Eq,
            inv_eq,
            |a, b| BitVector::from_u64((a == b) as u64, 1),
            8,
            8,
            1,
        );
    }

    #[test]
    fn inverse_ult() {
        check_inverse(
            NodeKind::Ult,
            inv_ult,
            |a, b| BitVector::from_u64(a.ult(b) as u64, 1),
            8,
            8,
            1,
        );
    }

    #[test]
    fn inverse_shl() {
        check_inverse(NodeKind::Shl, inv_shl, |a, b| a.shl(b), 8, 3, 8);
    }

    #[test]
    fn inverse_lshr() {
        check_inverse(NodeKind::Lshr, inv_lshr, |a, b| a.lshr(b), 8, 3, 8);
    }

    #[test]
    fn inverse_mul() {
        check_inverse(NodeKind::Mul, inv_mul, |a, b| a.mul(b), 8, 8, 8);
    }

    #[test]
    fn inverse_udiv() {
        check_inverse(NodeKind::Udiv, inv_udiv, |a, b| a.udiv(b), 8, 8, 8);
    }

    #[test]
    fn inverse_urem() {
        check_inverse(NodeKind::Urem, inv_urem, |a, b| a.urem(b), 8, 8, 8);
    }

    #[test]
    fn inverse_concat() {
        check_inverse(NodeKind::Concat, inv_concat, |a, b| a.concat(b), 4, 4, 8);
    }

    #[test]
    fn inverse_mul_odd_is_unique() {
        let mut fix = Fix::new(7);
        let id = fix.node2(NodeKind::Mul, 8, 8);
        let bvop = BitVector::from_u64(21, 8);
        let bve = BitVector::from_u64(3, 8);
        let res = {
            let mut ctx = fix.ctx();
            inv_mul(&mut ctx, id, &bvop, &bve, 1).unwrap()
        };
        assert_eq!(res.to_u64(), 7);
        assert_eq!(fix.stats.rec_conf, 0);
    }

    #[test]
    fn inverse_slice_pins_projected_bits() {
        let mut fix = Fix::new(3);
        let s8 = fix.sorts.bitvec(8);
        let x = fix.nodes.mk_var(&fix.sorts, s8, None).unwrap();
        let slice = fix
            .nodes
            .create(
                &mut fix.sorts,
                NodeKind::Slice { upper: 5, lower: 2 },
                vec![x],
                false,
            )
            .unwrap();
        for _ in 0..50 {
            let bvslice = BitVector::new_random(&mut fix.rng, 4);
            let bve = BitVector::new_random(&mut fix.rng, 8);
            let res = {
                let mut ctx = fix.ctx();
                inv_slice(&mut ctx, slice.id, &bvslice, &bve).unwrap()
            };
            assert_eq!(res.slice(5, 2), bvslice);
        }
    }

    #[test]
    fn and_conflict_is_recoverable_by_default() {
        let mut fix = Fix::new(11);
        let id = fix.node2(NodeKind::And, 8, 8);
        // bvand demands a bit that bve cannot provide
        let bvand = BitVector::from_u64(0b1000, 8);
        let bve = BitVector::from_u64(0b0111, 8);
        let res = {
            let mut ctx = fix.ctx();
            inv_and(&mut ctx, id, &bvand, &bve, 1)
        };
        assert!(res.is_some());
        assert_eq!(fix.stats.rec_conf, 1);
        assert_eq!(fix.stats.non_rec_conf, 0);
    }

    #[test]
    fn conflict_against_constant_is_non_recoverable() {
        let mut fix = Fix::new(12);
        fix.config.no_move_on_conflict = true;
        let s8 = fix.sorts.bitvec(8);
        let c = fix
            .nodes
            .mk_const(&mut fix.sorts, BitVector::from_u64(0b0110, 8));
        let x = fix.nodes.mk_var(&fix.sorts, s8, None).unwrap();
        let id = fix
            .nodes
            .create(&mut fix.sorts, NodeKind::And, vec![c, x], false)
            .unwrap()
            .id;
        let bvand = BitVector::from_u64(0b1000, 8);
        let bve = fix.nodes.const_value(c);
        let res = {
            let mut ctx = fix.ctx();
            inv_and(&mut ctx, id, &bvand, &bve, 1)
        };
        assert!(res.is_none());
        assert_eq!(fix.stats.non_rec_conf, 1);
    }
}
