use super::bv::BitVector;
use super::model::Model;
use super::node::{Edge, NodeId, NodeKind, NodeTable};
use super::sorts::SortTable;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Same weighting constant as Z3's local-search score (c1).
pub const SCORE_CFACT: f64 = 0.5;

/// Per-edge closeness-to-satisfied scores in [0.0, 1.0], keyed by signed
/// node reference (both polarities of every Boolean node are scored).
pub type ScoreMap = HashMap<i64, f64>;

/// Minimum number of bits to flip in `a` (clearing set bits, MSB first)
/// until `a < b`. Not necessarily the true minimum, but monotone in the
/// distance; matches the reference measure.
fn min_flip(a: &BitVector, b: &BitVector) -> u32 {
    if b.is_zero() {
        return a.hamming_distance(b);
    }
    let mut tmp = a.clone();
    let mut res = 0;
    for j in (0..tmp.width()).rev() {
        if !tmp.get_bit(j) {
            continue;
        }
        res += 1;
        tmp.set_bit(j, false);
        if tmp.compare(b) == Ordering::Less {
            break;
        }
    }
    res
}

/// Minimum number of bits to set in `a` (MSB first) until `a >= b`.
fn min_flip_inv(a: &BitVector, b: &BitVector) -> u32 {
    let mut tmp = a.clone();
    let mut res = 0;
    for j in (0..tmp.width()).rev() {
        if tmp.get_bit(j) {
            continue;
        }
        res += 1;
        tmp.set_bit(j, true);
        if tmp.compare(b) != Ordering::Less {
            break;
        }
    }
    res
}

/// Score of a single Boolean edge, assuming its children's scores (for And)
/// are already present in `score`.
///
/// ```text
/// s(v)            = A(v)                              for 1-bit variables
/// s(e0 /\ e1)     = (s(e0) + s(e1)) / 2
/// s(-(e0 /\ e1))  = max(s(-e0), s(-e1))
/// s(e0 = e1)      = 1.0 if equal, else c1 * (1 - h(e0,e1)/bw)
/// s(e0 != e1)     = 0.0 if equal else 1.0
/// s(e0 < e1)      = 1.0 if less, else c1 * (1 - minflip(e0,e1)/bw)
/// ```
pub fn compute_score_node(
    nodes: &NodeTable,
    sorts: &SortTable,
    model: &mut Model,
    score: &ScoreMap,
    edge: Edge,
) -> f64 {
    debug_assert_eq!(nodes.width(sorts, edge.id), 1);

    let node = nodes.get(edge.id);
    let res = match node.kind {
        NodeKind::And => {
            let e0 = node.children[0];
            let e1 = node.children[1];
            if edge.inverted {
                // an inverted And is an Or over the inverted children
                let s0 = score[&e0.not().signed()];
                let s1 = score[&e1.not().signed()];
                s0.max(s1)
            } else {
                let s0 = score[&e0.signed()];
                let s1 = score[&e1.signed()];
                let avg = (s0 + s1) / 2.0;
                // (0.999.. + 1.0) / 2 can round to 1.0; take the minimum then
                if avg == 1.0 && (s0 < 1.0 || s1 < 1.0) {
                    s0.min(s1)
                } else {
                    avg
                }
            }
        }
        NodeKind::Eq => {
            let (e0, e1) = (node.children[0], node.children[1]);
            let bv0 = model.get_bv(nodes, sorts, e0);
            let bv1 = model.get_bv(nodes, sorts, e1);
            if edge.inverted {
                if bv0 == bv1 {
                    0.0
                } else {
                    1.0
                }
            } else if bv0 == bv1 {
                1.0
            } else {
                SCORE_CFACT * (1.0 - bv0.hamming_distance(&bv1) as f64 / bv0.width() as f64)
            }
        }
        NodeKind::Ult => {
            let (e0, e1) = (node.children[0], node.children[1]);
            let bv0 = model.get_bv(nodes, sorts, e0);
            let bv1 = model.get_bv(nodes, sorts, e1);
            if edge.inverted {
                if !bv0.ult(&bv1) {
                    1.0
                } else {
                    SCORE_CFACT * (1.0 - min_flip_inv(&bv0, &bv1) as f64 / bv0.width() as f64)
                }
            } else if bv0.ult(&bv1) {
                1.0
            } else {
                SCORE_CFACT * (1.0 - min_flip(&bv0, &bv1) as f64 / bv0.width() as f64)
            }
        }
        _ => {
            if model.get_bv(nodes, sorts, edge).is_true() {
                1.0
            } else {
                0.0
            }
        }
    };
    debug_assert!((0.0..=1.0).contains(&res));
    res
}

/// Computes scores bottom-up for every Boolean node in the cone of the given
/// roots, both polarities, memoized in `score`.
pub fn compute_scores(
    nodes: &NodeTable,
    sorts: &SortTable,
    model: &mut Model,
    score: &mut ScoreMap,
    roots: &[Edge],
) {
    let mut mark: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<(NodeId, bool)> = roots.iter().map(|r| (nodes.chase(*r).id, false)).collect();
    while let Some((id, processed)) = stack.pop() {
        if processed {
            if sorts.width(nodes.get(id).sort) != Some(1) {
                continue;
            }
            let plain = Edge::regular(id);
            if !score.contains_key(&plain.signed()) {
                let s = compute_score_node(nodes, sorts, model, score, plain);
                score.insert(plain.signed(), s);
            }
            if !score.contains_key(&plain.not().signed()) {
                let s = compute_score_node(nodes, sorts, model, score, plain.not());
                score.insert(plain.not().signed(), s);
            }
            continue;
        }
        if !mark.insert(id) {
            continue;
        }
        stack.push((id, true));
        for &child in &nodes.get(id).children {
            stack.push((nodes.chase(child).id, false));
        }
    }
}

/// Refreshes the scores of Boolean nodes after a cone update. `ids` must be
/// in ascending (topological) order; nodes never reached from a root have no
/// score entry and are skipped.
pub fn update_scores<I: IntoIterator<Item = NodeId>>(
    nodes: &NodeTable,
    sorts: &SortTable,
    model: &mut Model,
    score: &mut ScoreMap,
    ids: I,
) {
    for id in ids {
        if sorts.width(nodes.get(id).sort) != Some(1) {
            continue;
        }
        let plain = Edge::regular(id);
        if !score.contains_key(&plain.signed()) {
            continue;
        }
        let s = compute_score_node(nodes, sorts, model, score, plain);
        score.insert(plain.signed(), s);
        let s = compute_score_node(nodes, sorts, model, score, plain.not());
        score.insert(plain.not().signed(), s);
    }
}
