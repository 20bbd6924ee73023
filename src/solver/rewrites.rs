use super::bv::BitVector;
use super::config::SolverConfig;
use super::node::{Edge, NodeId, NodeKind, NodeTable};
use super::sorts::SortTable;
use anyhow::Result;
use std::collections::HashMap;

/// Memoized results of `simplify`, owned by the solver. Entries keep the
/// nodes the simplifier introduced referenced for the solver's lifetime.
pub type SimpCache = HashMap<NodeId, Edge>;

/// The simplifier contract: returns a node equivalent under the theory,
/// following proxies, idempotent. Level 0 chases proxies only, level 1 adds
/// bottom-up constant folding, level 2 adds local rewrite rules.
pub fn simplify(
    nodes: &mut NodeTable,
    sorts: &mut SortTable,
    config: &SolverConfig,
    cache: &mut SimpCache,
    edge: Edge,
) -> Result<Edge> {
    let edge = nodes.chase(edge);
    if config.rewrite_level == 0 {
        return Ok(edge);
    }
    let res = simp_node(nodes, sorts, config, cache, edge.id)?;
    Ok(if edge.inverted { res.not() } else { res })
}

fn simp_node(
    nodes: &mut NodeTable,
    sorts: &mut SortTable,
    config: &SolverConfig,
    cache: &mut SimpCache,
    id: NodeId,
) -> Result<Edge> {
    if let Some(&e) = cache.get(&id) {
        return Ok(nodes.chase(e));
    }
    let node = nodes.get(id);
    let kind = node.kind.clone();
    if matches!(
        kind,
        NodeKind::Const | NodeKind::Var | NodeKind::Uf | NodeKind::Param
    ) {
        return Ok(Edge::regular(id));
    }
    let children = node.children.clone();

    let mut new_children = Vec::with_capacity(children.len());
    let mut changed = false;
    for &child in &children {
        let sc = simp_node(nodes, sorts, config, cache, child.id)?;
        let sc = if child.inverted { sc.not() } else { sc };
        changed |= sc != child;
        new_children.push(sc);
    }

    let result = rebuild(nodes, sorts, config, id, kind, new_children, changed)?;
    let result = nodes.chase(result);

    // retire the replaced node through a forwarding proxy when nothing else
    // points at it; connected parents keep their own shape
    if result != Edge::regular(id)
        && nodes.is_live(id)
        && nodes.get(id).parents.is_empty()
        && nodes.get(id).kind != NodeKind::Proxy
    {
        nodes.set_to_proxy(id, result);
    }
    cache.insert(id, result);
    Ok(result)
}

fn rebuild(
    nodes: &mut NodeTable,
    sorts: &mut SortTable,
    config: &SolverConfig,
    id: NodeId,
    kind: NodeKind,
    children: Vec<Edge>,
    changed: bool,
) -> Result<Edge> {
    if config.rewrite_level >= 2 {
        if let Some(e) = local_rules(nodes, sorts, &kind, &children) {
            return Ok(e);
        }
    }
    if let Some(v) = fold_const(nodes, &kind, &children) {
        return Ok(nodes.mk_const(sorts, v));
    }
    if !changed {
        return Ok(Edge::regular(id));
    }
    nodes.create(sorts, kind, children, config.sort_exp)
}

/// Local rules: unit/zero elements, idempotence,
/// complements, branch selection. Only rules whose result is strictly
/// smaller than the input are used, which keeps simplification idempotent.
fn local_rules(
    nodes: &mut NodeTable,
    sorts: &mut SortTable,
    kind: &NodeKind,
    children: &[Edge],
) -> Option<Edge> {
    match kind {
        NodeKind::Eq => {
            let (a, b) = (children[0], children[1]);
            if a == b {
                // x = x -> true
                return Some(nodes.mk_const(sorts, BitVector::one(1)));
            }
            if a.id == b.id && a.inverted != b.inverted {
                // x = ~x -> false
                return Some(nodes.mk_const(sorts, BitVector::zero(1)));
            }
            None
        }
        NodeKind::And => {
            let (a, b) = (children[0], children[1]);
            if a == b {
                return Some(a);
            }
            if a.id == b.id && a.inverted != b.inverted {
                let w = sorts.width(nodes.get(a.id).sort)?;
                return Some(nodes.mk_const(sorts, BitVector::zero(w)));
            }
            for (i, &e) in children.iter().enumerate() {
                if nodes.is_const_edge(e) {
                    let v = nodes.const_value(e);
                    if v.is_zero() {
                        return Some(e);
                    }
                    if v.is_ones() {
                        return Some(children[1 - i]);
                    }
                }
            }
            None
        }
        NodeKind::Add => {
            for (i, &e) in children.iter().enumerate() {
                if nodes.is_const_edge(e) && nodes.const_value(e).is_zero() {
                    return Some(children[1 - i]);
                }
            }
            None
        }
        NodeKind::Mul => {
            for (i, &e) in children.iter().enumerate() {
                if nodes.is_const_edge(e) {
                    let v = nodes.const_value(e);
                    if v.is_one() {
                        return Some(children[1 - i]);
                    }
                    if v.is_zero() {
                        return Some(e);
                    }
                }
            }
            None
        }
        NodeKind::Udiv => {
            if nodes.is_const_edge(children[1]) && nodes.const_value(children[1]).is_one() {
                return Some(children[0]);
            }
            None
        }
        NodeKind::Urem => {
            if nodes.is_const_edge(children[1]) && nodes.const_value(children[1]).is_one() {
                let w = sorts.width(nodes.get(children[0].id).sort)?;
                return Some(nodes.mk_const(sorts, BitVector::zero(w)));
            }
            None
        }
        NodeKind::Ult => {
            let (a, b) = (children[0], children[1]);
            if a == b {
                // x < x -> false
                return Some(nodes.mk_const(sorts, BitVector::zero(1)));
            }
            if nodes.is_const_edge(b) && nodes.const_value(b).is_zero() {
                return Some(nodes.mk_const(sorts, BitVector::zero(1)));
            }
            if nodes.is_const_edge(a) && nodes.const_value(a).is_ones() {
                return Some(nodes.mk_const(sorts, BitVector::zero(1)));
            }
            None
        }
        NodeKind::Cond => {
            if nodes.is_const_edge(children[0]) {
                let c = nodes.const_value(children[0]);
                return Some(if c.is_true() {
                    children[1]
                } else {
                    children[2]
                });
            }
            if children[1] == children[2] {
                return Some(children[1]);
            }
            None
        }
        NodeKind::Slice { upper, lower } => {
            let w = sorts.width(nodes.get(children[0].id).sort)?;
            if *lower == 0 && *upper == w - 1 {
                return Some(children[0]);
            }
            None
        }
        _ => None,
    }
}

/// Constant folding: all-constant operands collapse to a fresh constant.
fn fold_const(nodes: &NodeTable, kind: &NodeKind, children: &[Edge]) -> Option<BitVector> {
    if !children.iter().all(|&c| nodes.is_const_edge(c)) {
        return None;
    }
    let v: Vec<BitVector> = children.iter().map(|&c| nodes.const_value(c)).collect();
    Some(match kind {
        NodeKind::And => v[0].and(&v[1]),
        NodeKind::Add => v[0].add(&v[1]),
        NodeKind::Mul => v[0].mul(&v[1]),
        NodeKind::Udiv => v[0].udiv(&v[1]),
        NodeKind::Urem => v[0].urem(&v[1]),
        NodeKind::Shl => v[0].shl(&v[1]),
        NodeKind::Lshr => v[0].lshr(&v[1]),
        NodeKind::Concat => v[0].concat(&v[1]),
        NodeKind::Eq => BitVector::from_u64((v[0] == v[1]) as u64, 1),
        NodeKind::Ult => BitVector::from_u64(v[0].ult(&v[1]) as u64, 1),
        NodeKind::Slice { upper, lower } => v[0].slice(*upper, *lower),
        NodeKind::Cond => {
            if v[0].is_true() {
                v[1].clone()
            } else {
                v[2].clone()
            }
        }
        _ => return None,
    })
}
