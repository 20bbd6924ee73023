use super::bv::BitVector;
use super::config::SolverConfig;
use super::cons_value as cons;
use super::inv_value as inv;
use super::model::Model;
use super::node::{Edge, NodeId, NodeKind, NodeTable};
use super::path_sel::{self, FlipCondState};
use super::rng::{pick_rand, pick_with_prob};
use super::score::{self, ScoreMap};
use super::sorts::SortTable;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

/// Counters kept across a single `check_sat` call.
#[derive(Debug, Default, Clone)]
pub struct PropStats {
    /// Performed moves (accepted variable updates).
    pub moves: u64,
    /// Individual propagation steps over all descents.
    pub props: u64,
    /// Recoverable conflicts (fell back to a consistent value).
    pub rec_conf: u64,
    /// Non-recoverable conflicts (descent aborted at a constant).
    pub non_rec_conf: u64,
    /// Restarts with a fresh random assignment.
    pub restarts: u64,
    /// Nodes re-evaluated by cone updates.
    pub updates: u64,
    pub inv_calls: HashMap<&'static str, u64>,
    pub cons_calls: HashMap<&'static str, u64>,
}

impl PropStats {
    pub(crate) fn bump_inv(&mut self, op: &'static str) {
        *self.inv_calls.entry(op).or_insert(0) += 1;
    }

    pub(crate) fn bump_cons(&mut self, op: &'static str) {
        *self.cons_calls.entry(op).or_insert(0) += 1;
    }
}

/// Borrowed solver state threaded through path selection and the
/// inverse/consistent value functions.
pub(crate) struct PropCtx<'a> {
    pub nodes: &'a NodeTable,
    pub sorts: &'a SortTable,
    pub model: &'a mut Model,
    pub config: &'a SolverConfig,
    pub rng: &'a mut StdRng,
    pub stats: &'a mut PropStats,
}

enum Descent {
    Move { input: NodeId, value: BitVector },
    Conflict,
    Aborted,
}

/// Walks from a violated root down to a variable, choosing at each node
/// which child to repair and what value it should take. No DAG nodes are
/// allocated; each step moves strictly closer to a leaf.
fn select_move_prop(
    ctx: &mut PropCtx,
    flip_cond: &mut FlipCondState,
    terminate: &mut dyn FnMut() -> bool,
    root: Edge,
) -> (Descent, u64) {
    let mut cur = root;
    let mut bvcur = BitVector::one(1);
    let mut nprops = 0u64;

    loop {
        if terminate() {
            return (Descent::Aborted, nprops);
        }
        let (kind, children) = {
            let node = ctx.nodes.get(cur.id);
            (node.kind.clone(), node.children.clone())
        };
        if kind == NodeKind::Var {
            let value = if cur.inverted { bvcur.not() } else { bvcur };
            return (
                Descent::Move {
                    input: cur.id,
                    value,
                },
                nprops,
            );
        }
        if kind == NodeKind::Const {
            // the constant disagrees with the required target
            return (Descent::Conflict, nprops);
        }

        nprops += 1;
        if cur.inverted {
            bvcur = bvcur.not();
        }
        let bve: Vec<BitVector> = children
            .iter()
            .map(|&c| ctx.model.get_bv(ctx.nodes, ctx.sorts, c))
            .collect();
        let nconst = children
            .iter()
            .filter(|&&c| ctx.nodes.is_const_edge(c))
            .count();
        if nconst > children.len() - 1 {
            return (Descent::Conflict, nprops);
        }

        trace!(node = cur.id.0, want = %bvcur, "propagate");

        // inverse value with probability use_inv, else consistent value
        let use_inv = pick_with_prob(ctx.rng, ctx.config.prob_use_inv);

        let (eidx, bvenew) = match kind {
            NodeKind::Add => {
                let eidx =
                    path_sel::select_path_add(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_add(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_add(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::And => {
                let eidx =
                    path_sel::select_path_and(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_and(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_and(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Eq => {
                let eidx =
                    path_sel::select_path_eq(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_eq(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_eq(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Ult => {
                let eidx =
                    path_sel::select_path_ult(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_ult(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_ult(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Shl => {
                let eidx =
                    path_sel::select_path_shl(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_shl(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_shl(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Lshr => {
                let eidx = path_sel::select_path_lshr(
                    ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve,
                );
                let v = if use_inv {
                    inv::inv_lshr(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_lshr(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Mul => {
                let eidx =
                    path_sel::select_path_mul(ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve);
                let v = if use_inv {
                    inv::inv_mul(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_mul(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Udiv => {
                let eidx = path_sel::select_path_udiv(
                    ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve,
                );
                let v = if use_inv {
                    inv::inv_udiv(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_udiv(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Urem => {
                let eidx = path_sel::select_path_urem(
                    ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve,
                );
                let v = if use_inv {
                    inv::inv_urem(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_urem(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Concat => {
                let eidx = path_sel::select_path_concat(
                    ctx.nodes, ctx.config, ctx.rng, cur.id, &bvcur, &bve,
                );
                let v = if use_inv {
                    inv::inv_concat(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx)
                } else {
                    Some(cons::cons_concat(ctx, cur.id, &bvcur, &bve[1 - eidx], eidx))
                };
                (eidx, v)
            }
            NodeKind::Slice { .. } => {
                let v = if use_inv {
                    inv::inv_slice(ctx, cur.id, &bvcur, &bve[0])
                } else {
                    Some(cons::cons_slice(ctx, cur.id, &bvcur, &bve[0]))
                };
                (0, v)
            }
            NodeKind::Cond => {
                let eidx = path_sel::select_path_cond(
                    ctx.nodes, ctx.config, ctx.rng, flip_cond, cur.id, &bve[0],
                );
                // flipping the condition propagates its complement; otherwise
                // the current target continues into the enabled branch
                let v = if eidx == 0 {
                    bve[0].not()
                } else {
                    bvcur.clone()
                };
                (eidx, Some(v))
            }
            _ => return (Descent::Conflict, nprops),
        };

        match bvenew {
            None => return (Descent::Conflict, nprops),
            Some(v) => {
                cur = children[eidx];
                bvcur = v;
            }
        }
    }
}

/// The propagation engine handles the quantifier-free bit-vector fragment;
/// formulas with function applications or lambdas belong to the other
/// engine.
fn fragment_supported(nodes: &NodeTable, roots: &[Edge]) -> bool {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = roots.iter().map(|r| nodes.chase(*r).id).collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let node = nodes.get(id);
        match node.kind {
            NodeKind::Apply
            | NodeKind::Lambda
            | NodeKind::FunEq
            | NodeKind::Uf
            | NodeKind::Param
            | NodeKind::Args => return false,
            _ => {}
        }
        for &child in &node.children {
            stack.push(nodes.chase(child).id);
        }
    }
    true
}

fn compute_violated(
    nodes: &NodeTable,
    sorts: &SortTable,
    model: &mut Model,
    roots: &[Edge],
) -> Vec<Edge> {
    roots
        .iter()
        .filter(|&&r| model.get_bv(nodes, sorts, r).is_false())
        .copied()
        .collect()
}

/// The solve loop: repeatedly pick a violated root, propagate a new value
/// down to a variable, write it through and repair the cone, until every
/// root is satisfied or the budget/termination hook gives out.
#[allow(clippy::too_many_arguments)]
pub(crate) fn check(
    nodes: &NodeTable,
    sorts: &SortTable,
    model: &mut Model,
    score_map: &mut ScoreMap,
    config: &SolverConfig,
    rng: &mut StdRng,
    stats: &mut PropStats,
    roots: &[Edge],
    terminate: &mut dyn FnMut() -> bool,
) -> SatResult {
    if !fragment_supported(nodes, roots) {
        debug!("formula outside the QF_BV fragment, giving up");
        return SatResult::Unknown;
    }

    let mut flip_cond = FlipCondState::new(config);
    model.init(nodes, sorts, false, rng);
    score_map.clear();
    score::compute_scores(nodes, sorts, model, score_map, roots);
    let mut violated = compute_violated(nodes, sorts, model, roots);
    debug!(
        roots = roots.len(),
        violated = violated.len(),
        "propagation engine start"
    );

    loop {
        if violated.is_empty() {
            debug!(moves = stats.moves, props = stats.props, "sat");
            return SatResult::Sat;
        }
        if terminate() {
            debug!("terminated by hook");
            return SatResult::Unknown;
        }
        if config.max_moves > 0 && stats.moves + stats.restarts >= config.max_moves {
            debug!(moves = stats.moves, "move budget exhausted");
            return SatResult::Unknown;
        }

        let root = violated[pick_rand(rng, 0, violated.len() as u32 - 1) as usize];
        let (descent, nprops) = {
            let mut ctx = PropCtx {
                nodes,
                sorts,
                model,
                config,
                rng,
                stats,
            };
            select_move_prop(&mut ctx, &mut flip_cond, terminate, root)
        };
        stats.props += nprops;

        match descent {
            Descent::Aborted => {
                debug!("terminated by hook during descent");
                return SatResult::Unknown;
            }
            Descent::Conflict => {
                // restart from a fresh random assignment
                stats.restarts += 1;
                trace!(restarts = stats.restarts, "descent aborted, restarting");
                model.init(nodes, sorts, true, rng);
                score_map.clear();
                score::compute_scores(nodes, sorts, model, score_map, roots);
                violated = compute_violated(nodes, sorts, model, roots);
            }
            Descent::Move { input, value } => {
                trace!(input = input.0, value = %value, "move");
                stats.moves += 1;
                let mut exps = HashMap::new();
                exps.insert(input, value);
                let cone = model.update_cone(nodes, sorts, &exps);
                stats.updates += cone.len() as u64;
                score::update_scores(
                    nodes,
                    sorts,
                    model,
                    score_map,
                    exps.keys().copied().chain(cone.iter().copied()),
                );
                violated = compute_violated(nodes, sorts, model, roots);
            }
        }
    }
}
