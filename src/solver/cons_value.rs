use super::bv::BitVector;
use super::node::NodeId;
use super::prop_engine::PropCtx;
use super::rng::{pick_rand, pick_with_prob};

/// Consistent values: for a target output `bvop`, produce an operand value
/// that is plausible for the operator without requiring solvability against
/// the fixed operand. Used as a stochastic alternative to inverse values and
/// as the recovery value on recoverable conflicts.

pub(crate) fn cons_add(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvadd: &BitVector,
    _bve: &BitVector,
    _eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("add");
    BitVector::new_random(ctx.rng, bvadd.width())
}

/// All bits set in `bvand` must be set; the rest are free. With probability
/// `prob_and_flip` the free bits keep their current value except for one
/// randomly flipped bit.
pub(crate) fn cons_and(
    ctx: &mut PropCtx,
    id: NodeId,
    bvand: &BitVector,
    _bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("and");
    let child = ctx.nodes.get(id).children[eidx];
    let mut res = ctx.model.get_bv(ctx.nodes, ctx.sorts, child);
    let keep_dc = pick_with_prob(ctx.rng, ctx.config.prob_and_flip);
    let mut dcbits = Vec::new();
    for i in 0..bvand.width() {
        if bvand.get_bit(i) {
            res.set_bit(i, true);
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
    res
}

pub(crate) fn cons_eq(
    ctx: &mut PropCtx,
    id: NodeId,
    _bveq: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("eq");
    if pick_with_prob(ctx.rng, ctx.config.prob_eq_flip) {
        let child = ctx.nodes.get(id).children[eidx];
        let mut res = ctx.model.get_bv(ctx.nodes, ctx.sorts, child);
        let bit = pick_rand(ctx.rng, 0, res.width() - 1);
        res.flip_bit(bit);
        res
    } else {
        BitVector::new_random(ctx.rng, bve.width())
    }
}

pub(crate) fn cons_ult(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvult: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("ult");
    let bw = bve.width();
    let isult = !bvult.is_zero();
    let bvmax = BitVector::ones(bw);
    if eidx == 1 && isult {
        // bve < res = 1 -> res > 0
        let one = BitVector::one(bw);
        BitVector::new_random_range(ctx.rng, bw, &one, &bvmax)
    } else if eidx == 0 && isult {
        // res < bve = 1 -> 0 <= res < 1...1
        let zero = BitVector::zero(bw);
        BitVector::new_random_range(ctx.rng, bw, &zero, &bvmax.dec())
    } else {
        BitVector::new_random(ctx.rng, bw)
    }
}

pub(crate) fn cons_shl(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvshl: &BitVector,
    _bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("shl");
    let bw = bvshl.width();
    let sbw = bw.trailing_zeros();
    let ctz = bvshl.num_trailing_zeros();
    let hi = if ctz == bw { ctz - 1 } else { ctz };
    let from = BitVector::zero(sbw);
    let to = BitVector::from_u64(hi as u64, sbw);
    let shift = BitVector::new_random_range(ctx.rng, sbw, &from, &to);
    if eidx == 1 {
        shift
    } else {
        let s = shift.to_u64() as u32;
        let mut res = bvshl.lshr(&shift);
        for i in 0..s {
            res.set_bit(bw - 1 - i, pick_rand(ctx.rng, 0, 1) == 1);
        }
        res
    }
}

pub(crate) fn cons_lshr(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvlshr: &BitVector,
    _bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("lshr");
    let bw = bvlshr.width();
    let sbw = bw.trailing_zeros();
    let clz = bvlshr.num_leading_zeros();
    let hi = if clz == bw { clz - 1 } else { clz };
    let from = BitVector::zero(sbw);
    let to = BitVector::from_u64(hi as u64, sbw);
    let shift = BitVector::new_random_range(ctx.rng, sbw, &from, &to);
    if eidx == 1 {
        shift
    } else {
        let s = shift.to_u64() as u32;
        let mut res = bvlshr.shl(&shift);
        for i in 0..s {
            res.set_bit(i, pick_rand(ctx.rng, 0, 1) == 1);
        }
        res
    }
}

pub(crate) fn cons_mul(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvmul: &BitVector,
    _bve: &BitVector,
    _eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("mul");
    let bw = bvmul.width();
    let mut res = BitVector::new_random(ctx.rng, bw);
    if !bvmul.is_zero() {
        if res.is_zero() {
            res = BitVector::new_random(ctx.rng, bw);
        }
        if bvmul.is_odd() {
            // an odd product needs an odd operand
            res.set_bit(0, true);
        } else {
            let ctz_bvmul = bvmul.num_trailing_zeros();
            if pick_with_prob(ctx.rng, 100) {
                // 2^n with n <= ctz(bvmul)
                res = BitVector::zero(bw);
                res.set_bit(pick_rand(ctx.rng, 0, ctz_bvmul - 1), true);
            } else if pick_with_prob(ctx.rng, 100) {
                // bvmul shifted right by up to ctz(bvmul)
                let r = pick_rand(ctx.rng, 0, ctz_bvmul);
                res = if r > 0 {
                    bvmul.slice(bw - 1, r).uext(r)
                } else {
                    bvmul.clone()
                };
            } else if res.num_trailing_zeros() > ctz_bvmul {
                res.set_bit(pick_rand(ctx.rng, 0, ctz_bvmul - 1), true);
            }
        }
    }
    res
}

pub(crate) fn cons_udiv(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvudiv: &BitVector,
    _bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("udiv");
    let bw = bvudiv.width();
    let zero = BitVector::zero(bw);
    let one = BitVector::one(bw);
    let bvmax = BitVector::ones(bw);
    if eidx == 1 {
        // bvudiv = 1...1: only x / 0 and 1...1 / 1 reach it
        if *bvudiv == bvmax {
            BitVector::from_u64(pick_rand(ctx.rng, 0, 1) as u64, bw)
        } else {
            let mut res = BitVector::new_random_range(ctx.rng, bw, &one, &bvmax);
            while res.umul_overflow(bvudiv) {
                let hi = res.dec();
                res = BitVector::new_random_range(ctx.rng, bw, &one, &hi);
            }
            res
        }
    } else if bvudiv.is_zero() {
        BitVector::new_random_range(ctx.rng, bw, &zero, &bvmax.dec())
    } else if *bvudiv == bvmax {
        BitVector::new_random(ctx.rng, bw)
    } else {
        // pick a divisor that cannot overflow, then synthesize the dividend
        let mut divisor = BitVector::new_random_range(ctx.rng, bw, &one, &bvmax);
        while divisor.umul_overflow(bvudiv) {
            let hi = divisor.dec();
            divisor = BitVector::new_random_range(ctx.rng, bw, &one, &hi);
        }
        divisor.mul(bvudiv)
    }
}

pub(crate) fn cons_urem(
    ctx: &mut PropCtx,
    _id: NodeId,
    bvurem: &BitVector,
    _bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("urem");
    let bw = bvurem.width();
    let bvmax = BitVector::ones(bw);
    if eidx == 1 {
        if *bvurem == bvmax {
            // x % 0 = 1...1
            BitVector::zero(bw)
        } else {
            let lo = bvurem.inc();
            BitVector::new_random_range(ctx.rng, bw, &lo, &bvmax)
        }
    } else if *bvurem == bvmax {
        bvmax
    } else {
        BitVector::new_random_range(ctx.rng, bw, bvurem, &bvmax)
    }
}

pub(crate) fn cons_concat(
    ctx: &mut PropCtx,
    id: NodeId,
    bvconcat: &BitVector,
    bve: &BitVector,
    eidx: usize,
) -> BitVector {
    ctx.stats.bump_cons("concat");
    let other = if eidx == 1 { 0 } else { 1 };
    let other_const = ctx.nodes.is_const_edge(ctx.nodes.get(id).children[other]);
    if other_const && pick_with_prob(ctx.rng, ctx.config.prob_concat_flip) {
        // slice out of the current assignment and flip at most one bit
        let bvcur = ctx
            .model
            .get_bv(ctx.nodes, ctx.sorts, super::node::Edge::regular(id));
        let mut res = if eidx == 1 {
            bvcur.slice(bvconcat.width() - bve.width() - 1, 0)
        } else {
            bvcur.slice(bvconcat.width() - 1, bve.width())
        };
        let r = pick_rand(ctx.rng, 0, res.width());
        if r > 0 {
            res.flip_bit(r - 1);
        }
        res
    } else if eidx == 1 {
        bvconcat.slice(bvconcat.width() - bve.width() - 1, 0)
    } else {
        bvconcat.slice(bvconcat.width() - 1, bve.width())
    }
}

pub(crate) fn cons_slice(ctx: &mut PropCtx, id: NodeId, bvslice: &BitVector, bve: &BitVector) -> BitVector {
    ctx.stats.bump_cons("slice");
    super::inv_value::slice_value(ctx, id, bvslice, bve)
}
