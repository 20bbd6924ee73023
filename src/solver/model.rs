use super::bv::BitVector;
use super::node::{Edge, NodeId, NodeKind, NodeTable};
use super::sorts::SortTable;
use std::collections::{HashMap, HashSet};

/// The current assignment: memoized bit-vector values keyed by signed node
/// reference (negative keys hold the complement of the node's value), plus
/// the finite tabulation of function/array symbols probed during solving.
pub struct Model {
    bv: HashMap<i64, BitVector>,
    fun: HashMap<NodeId, HashMap<Vec<BitVector>, BitVector>>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            bv: HashMap::new(),
            fun: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.bv.clear();
        self.fun.clear();
    }

    pub fn contains(&self, edge: Edge) -> bool {
        self.bv.contains_key(&edge.signed())
    }

    /// Installs a value for an input node at both polarities.
    pub fn install(&mut self, id: NodeId, value: BitVector) {
        self.bv.insert(-(id.0 as i64), value.not());
        self.bv.insert(id.0 as i64, value);
    }

    /// Cached entries of a function symbol's tabulation.
    pub fn fun_entries(&self, id: NodeId) -> Option<&HashMap<Vec<BitVector>, BitVector>> {
        self.fun.get(&id)
    }

    /// Assignment of the node behind `edge`, following proxies; computed
    /// bottom-up and memoized on first request.
    pub fn get_bv(&mut self, nodes: &NodeTable, sorts: &SortTable, edge: Edge) -> BitVector {
        let edge = nodes.chase(edge);
        if let Some(v) = self.bv.get(&edge.signed()) {
            return v.clone();
        }
        let value = self.eval_node(nodes, sorts, edge.id);
        self.bv.insert(-(edge.id.0 as i64), value.not());
        self.bv.insert(edge.id.0 as i64, value);
        self.bv[&edge.signed()].clone()
    }

    /// Evaluates a node's operator over its children's assignments. Children
    /// are resolved through `get_bv`, so anything below is memoized.
    fn eval_node(&mut self, nodes: &NodeTable, sorts: &SortTable, id: NodeId) -> BitVector {
        let node = nodes.get(id);
        let kind = node.kind.clone();
        let children = node.children.clone();
        match kind {
            NodeKind::Const => node.value.clone().expect("constant without value"),
            // inputs not installed by the driver default to zero
            NodeKind::Var | NodeKind::Param => BitVector::zero(nodes.width(sorts, id)),
            NodeKind::Slice { upper, lower } => {
                self.get_bv(nodes, sorts, children[0]).slice(upper, lower)
            }
            NodeKind::And => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.and(&b)
            }
            NodeKind::Eq => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                BitVector::from_u64((a == b) as u64, 1)
            }
            NodeKind::FunEq => {
                let a = nodes.chase(children[0]);
                let b = nodes.chase(children[1]);
                BitVector::from_u64((a == b) as u64, 1)
            }
            NodeKind::Ult => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                BitVector::from_u64(a.ult(&b) as u64, 1)
            }
            NodeKind::Add => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.add(&b)
            }
            NodeKind::Mul => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.mul(&b)
            }
            NodeKind::Shl => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.shl(&b)
            }
            NodeKind::Lshr => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.lshr(&b)
            }
            NodeKind::Udiv => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.udiv(&b)
            }
            NodeKind::Urem => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.urem(&b)
            }
            NodeKind::Concat => {
                let a = self.get_bv(nodes, sorts, children[0]);
                let b = self.get_bv(nodes, sorts, children[1]);
                a.concat(&b)
            }
            NodeKind::Cond => {
                let c = self.get_bv(nodes, sorts, children[0]);
                if c.is_true() {
                    self.get_bv(nodes, sorts, children[1])
                } else {
                    self.get_bv(nodes, sorts, children[2])
                }
            }
            NodeKind::Apply => {
                let fun = nodes.chase(children[0]);
                let args_node = nodes.get(nodes.chase(children[1]).id);
                let args: Vec<BitVector> = args_node
                    .children
                    .clone()
                    .into_iter()
                    .map(|a| self.get_bv(nodes, sorts, a))
                    .collect();
                let width = nodes.width(sorts, id);
                let table = self.fun.entry(fun.id).or_default();
                table
                    .entry(args)
                    .or_insert_with(|| BitVector::zero(width))
                    .clone()
            }
            NodeKind::Uf | NodeKind::Args | NodeKind::Lambda | NodeKind::Proxy => {
                panic!("node {} ({:?}) has no bit-vector value", id.0, kind)
            }
        }
    }

    /// Installs the initial assignment for all inputs: zero by default, or
    /// uniformly random values when `randomize` is set (engine restarts).
    pub fn init<R: rand::Rng>(
        &mut self,
        nodes: &NodeTable,
        sorts: &SortTable,
        randomize: bool,
        rng: &mut R,
    ) {
        self.clear();
        for id in nodes.inputs().collect::<Vec<_>>() {
            if nodes.get(id).kind != NodeKind::Var {
                continue;
            }
            let width = nodes.width(sorts, id);
            let value = if randomize {
                BitVector::new_random(rng, width)
            } else {
                BitVector::zero(width)
            };
            self.install(id, value);
        }
    }

    /// Cone-of-influence update: given new values for a set of
    /// variables, recompute every ancestor's assignment in ascending id
    /// order (creation order is topological). Returns the sorted cone so the
    /// caller can refresh scores over it.
    pub fn update_cone(
        &mut self,
        nodes: &NodeTable,
        sorts: &SortTable,
        exps: &HashMap<NodeId, BitVector>,
    ) -> Vec<NodeId> {
        debug_assert!(exps.keys().all(|&id| nodes.get(id).is_var()));

        // collect all ancestors of the changed variables
        let mut cone: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<NodeId> = exps.keys().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if !exps.contains_key(&id) {
                cone.push(id);
            }
            for &(parent, _) in &nodes.get(id).parents {
                stack.push(parent);
            }
        }

        for (&id, value) in exps {
            self.install(id, value.clone());
        }

        cone.sort_unstable();

        for &id in &cone {
            // Args/Lambda ancestors carry no bit-vector value of their own
            if sorts.width(nodes.get(id).sort).is_none() {
                continue;
            }
            let value = self.eval_node(nodes, sorts, id);
            self.bv.insert(-(id.0 as i64), value.not());
            self.bv.insert(id.0 as i64, value);
        }
        cone
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}
