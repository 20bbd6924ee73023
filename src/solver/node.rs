use super::bv::BitVector;
use super::sorts::{Sort, SortId, SortTable};
use anyhow::{bail, Result};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

/// Node identifier. Ids start at 1, are assigned in creation order and are
/// never reused, so ascending id is a topological order of the DAG.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A tagged edge: a node reference plus a 1-bit inversion flag. An inverted
/// edge denotes the bitwise complement of the node it points to. `Not` is
/// never materialized as a node; it lives entirely in this flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub id: NodeId,
    pub inverted: bool,
}

impl Edge {
    pub fn regular(id: NodeId) -> Self {
        Self {
            id,
            inverted: false,
        }
    }

    /// Inversion is an involution on edges: `e.not().not() == e`.
    pub fn not(self) -> Self {
        Self {
            id: self.id,
            inverted: !self.inverted,
        }
    }

    /// Signed reference: positive for plain edges, negative for inverted
    /// ones. Used as the key of the model and score maps.
    pub fn signed(self) -> i64 {
        if self.inverted {
            -(self.id.0 as i64)
        } else {
            self.id.0 as i64
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Const,
    Var,
    Uf,
    Param,
    Args,
    Slice { upper: u32, lower: u32 },
    And,
    Eq,
    FunEq,
    Ult,
    Add,
    Mul,
    Shl,
    Lshr,
    Udiv,
    Urem,
    Concat,
    Apply,
    Lambda,
    Cond,
    Proxy,
}

impl NodeKind {
    /// Leaves are identified by id, not merged structurally.
    fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeKind::Const | NodeKind::Var | NodeKind::Uf | NodeKind::Param
        )
    }

    fn is_commutative(&self) -> bool {
        matches!(
            self,
            NodeKind::And | NodeKind::Eq | NodeKind::Add | NodeKind::Mul
        )
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NodeFlags {
    pub parameterized: bool,
    pub lambda_below: bool,
    pub apply_below: bool,
    pub constraint: bool,
}

pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub sort: SortId,
    pub children: Vec<Edge>,
    /// Incoming edges as (parent id, child position) pairs. Every outgoing
    /// edge of a live node appears in exactly one such list.
    pub parents: Vec<(NodeId, u8)>,
    /// Internal references: edges from other nodes (and the proxy link).
    refs: u32,
    /// External references: handles held by the API user.
    ext_refs: u32,
    pub flags: NodeFlags,
    /// Constant payload; the stored value always has LSB 0.
    pub value: Option<BitVector>,
    pub symbol: Option<String>,
    /// Proxy forwarding edge, chased transitively by all lookups.
    pub simplified: Option<Edge>,
    /// For `Param` nodes: the lambda that binds this parameter.
    pub binder: Option<NodeId>,
}

impl Node {
    pub fn arity(&self) -> usize {
        self.children.len()
    }

    pub fn is_const(&self) -> bool {
        self.kind == NodeKind::Const
    }

    pub fn is_var(&self) -> bool {
        self.kind == NodeKind::Var
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct UniqueKey {
    kind: NodeKind,
    children: Vec<Edge>,
}

/// The expression DAG: an id-addressed arena of hash-consed nodes together
/// with the unique, input, lambda and parameter lookup tables. Released
/// nodes leave a tombstone so ids stay stable.
pub struct NodeTable {
    nodes: Vec<Option<Node>>,
    unique: HashMap<UniqueKey, NodeId>,
    /// Lambda nodes with their cached body-traversal hash.
    lambdas: HashMap<NodeId, u64>,
    lambda_unique: HashMap<u64, Vec<NodeId>>,
    /// Free variables and uninterpreted function symbols.
    inputs: HashSet<NodeId>,
    /// Function-equality nodes (consumed by the bit-blasting collaborator).
    feqs: HashSet<NodeId>,
    /// For each non-lambda parameterized node, its free parameter ids.
    parameterized: HashMap<NodeId, BTreeSet<NodeId>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self {
            nodes: vec![None],
            unique: HashMap::new(),
            lambdas: HashMap::new(),
            lambda_unique: HashMap::new(),
            inputs: HashSet::new(),
            feqs: HashSet::new(),
            parameterized: HashMap::new(),
        }
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.nodes[id.0 as usize]
            .as_ref()
            .unwrap_or_else(|| panic!("access to released node {}", id.0))
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id.0 as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("access to released node {}", id.0))
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.nodes[id.0 as usize].is_some()
    }

    /// Number of live nodes in the unique table (hash-consed nodes only).
    pub fn unique_len(&self) -> usize {
        self.unique.len() + self.lambdas.len()
    }

    pub fn num_live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.iter().copied()
    }

    pub fn num_feqs(&self) -> usize {
        self.feqs.len()
    }

    /// Free parameters of a parameterized node, if any.
    pub fn free_params(&self, id: NodeId) -> Option<&BTreeSet<NodeId>> {
        self.parameterized.get(&id)
    }

    pub fn width(&self, sorts: &SortTable, id: NodeId) -> u32 {
        sorts
            .width(self.get(id).sort)
            .unwrap_or_else(|| panic!("node {} has no bit width", id.0))
    }

    /// Follows proxy forwarding edges transitively, folding inversions.
    pub fn chase(&self, edge: Edge) -> Edge {
        let mut cur = edge;
        while let Some(target) = self.get(cur.id).simplified {
            cur = Edge {
                id: target.id,
                inverted: cur.inverted ^ target.inverted,
            };
        }
        cur
    }

    /// Constant value denoted by an edge to a `Const` node, with the edge
    /// inversion applied.
    pub fn const_value(&self, edge: Edge) -> BitVector {
        let node = self.get(edge.id);
        let value = node
            .value
            .as_ref()
            .unwrap_or_else(|| panic!("node {} is not a constant", edge.id.0));
        if edge.inverted {
            value.not()
        } else {
            value.clone()
        }
    }

    pub fn is_const_edge(&self, edge: Edge) -> bool {
        self.get(edge.id).is_const()
    }

    fn alloc(&mut self, kind: NodeKind, sort: SortId, children: Vec<Edge>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let mut flags = NodeFlags::default();
        let mut free_params = BTreeSet::new();
        for (pos, &child) in children.iter().enumerate() {
            let c = self.get_mut(child.id);
            c.parents.push((id, pos as u8));
            c.refs = c
                .refs
                .checked_add(1)
                .unwrap_or_else(|| panic!("reference counter overflow on node {}", child.id.0));
            let c = self.get(child.id);
            flags.lambda_below |= c.flags.lambda_below || c.kind == NodeKind::Lambda;
            flags.apply_below |= c.flags.apply_below || c.kind == NodeKind::Apply;
            if c.kind == NodeKind::Param {
                free_params.insert(child.id);
            }
            if let Some(ps) = self.parameterized.get(&child.id) {
                free_params.extend(ps.iter().copied());
            }
        }
        if kind == NodeKind::Lambda {
            // the lambda binds its own parameter
            free_params.remove(&children[0].id);
        }
        flags.parameterized = kind == NodeKind::Param || !free_params.is_empty();
        if flags.parameterized && kind != NodeKind::Lambda && kind != NodeKind::Param {
            self.parameterized.insert(id, free_params);
        }
        self.nodes.push(Some(Node {
            id,
            kind,
            sort,
            children,
            parents: Vec::new(),
            refs: 0,
            ext_refs: 1,
            flags,
            value: None,
            symbol: None,
            simplified: None,
            binder: None,
        }));
        id
    }

    /// Constants are stored with LSB 0; an odd value is complemented and the
    /// returned edge inverted, so inversion is absorbed at construction.
    pub fn mk_const(&mut self, sorts: &mut SortTable, value: BitVector) -> Edge {
        let inverted = value.is_odd();
        let stored = if inverted { value.not() } else { value };
        let sort = sorts.bitvec(stored.width());
        let id = self.alloc(NodeKind::Const, sort, Vec::new());
        self.get_mut(id).value = Some(stored);
        Edge { id, inverted }
    }

    pub fn mk_var(&mut self, sorts: &SortTable, sort: SortId, symbol: Option<String>) -> Result<Edge> {
        if sorts.width(sort).is_none() {
            bail!("variable must have Bool or BitVec sort");
        }
        let id = self.alloc(NodeKind::Var, sort, Vec::new());
        self.get_mut(id).symbol = symbol;
        self.inputs.insert(id);
        Ok(Edge::regular(id))
    }

    pub fn mk_uf(&mut self, sorts: &SortTable, sort: SortId, symbol: Option<String>) -> Result<Edge> {
        if !sorts.is_fun(sort) && !sorts.is_array(sort) {
            bail!("uninterpreted symbol must have Fun or Array sort");
        }
        let id = self.alloc(NodeKind::Uf, sort, Vec::new());
        self.get_mut(id).symbol = symbol;
        self.inputs.insert(id);
        Ok(Edge::regular(id))
    }

    pub fn mk_param(
        &mut self,
        sorts: &SortTable,
        sort: SortId,
        symbol: Option<String>,
    ) -> Result<Edge> {
        if sorts.width(sort).is_none() {
            bail!("parameter must have Bool or BitVec sort");
        }
        let id = self.alloc(NodeKind::Param, sort, Vec::new());
        self.get_mut(id).symbol = symbol;
        Ok(Edge::regular(id))
    }

    /// Creates (or looks up) the unique node for an operator application.
    /// Children are simplified through proxies first; commutative operators
    /// are normalized by sorting children when `sort_exp` is on.
    pub fn create(
        &mut self,
        sorts: &mut SortTable,
        kind: NodeKind,
        children: Vec<Edge>,
        sort_exp: bool,
    ) -> Result<Edge> {
        assert!(!kind.is_leaf(), "leaf nodes have dedicated constructors");
        let mut children: Vec<Edge> = children.into_iter().map(|e| self.chase(e)).collect();

        // Eq(not a, not b) is the same equation as Eq(a, b)
        if kind == NodeKind::Eq && children.iter().all(|e| e.inverted) {
            for e in &mut children {
                *e = e.not();
            }
        }
        if kind.is_commutative() && sort_exp {
            children.sort_by_key(|e| (e.id, e.inverted));
        }

        let sort = self.infer_sort(sorts, &kind, &children)?;

        if kind == NodeKind::Lambda {
            return Ok(self.create_lambda(sort, children));
        }

        let key = UniqueKey {
            kind: kind.clone(),
            children: children.clone(),
        };
        if let Some(&id) = self.unique.get(&key) {
            let node = self.get_mut(id);
            node.ext_refs = node
                .ext_refs
                .checked_add(1)
                .unwrap_or_else(|| panic!("reference counter overflow on node {}", id.0));
            return Ok(Edge::regular(id));
        }
        let id = self.alloc(kind.clone(), sort, children);
        self.unique.insert(key, id);
        if kind == NodeKind::FunEq {
            self.feqs.insert(id);
        }
        Ok(Edge::regular(id))
    }

    fn create_lambda(&mut self, sort: SortId, children: Vec<Edge>) -> Edge {
        let hash = self.lambda_hash(&children);
        let candidates: Vec<NodeId> = self
            .lambda_unique
            .get(&hash)
            .cloned()
            .unwrap_or_default();
        for cand in candidates {
            let cand_children = self.get(cand).children.clone();
            if self.alpha_eq_children(&cand_children, &children) {
                let node = self.get_mut(cand);
                node.ext_refs = node
                    .ext_refs
                    .checked_add(1)
                    .unwrap_or_else(|| panic!("reference counter overflow on node {}", cand.0));
                return Edge::regular(cand);
            }
        }
        let id = self.alloc(NodeKind::Lambda, sort, children);
        let param = self.get(id).children[0].id;
        self.get_mut(param).binder = Some(id);
        self.lambdas.insert(id, hash);
        self.lambda_unique.entry(hash).or_default().push(id);
        Edge::regular(id)
    }

    /// Hash of a lambda's shape with its own parameter canonicalized to its
    /// binding position, so that alpha-equivalent lambdas collide. Computed
    /// once at creation and cached in the lambda table.
    fn lambda_hash(&self, children: &[Edge]) -> u64 {
        let mut canon: HashMap<NodeId, u64> = HashMap::new();
        canon.insert(children[0].id, 0);
        let mut memo: HashMap<NodeId, u64> = HashMap::new();
        let body = self.shape_hash(children[1], &mut canon, &mut memo);
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        children[1].inverted.hash(&mut hasher);
        hasher.finish()
    }

    fn shape_hash(
        &self,
        edge: Edge,
        canon: &mut HashMap<NodeId, u64>,
        memo: &mut HashMap<NodeId, u64>,
    ) -> u64 {
        let node = self.get(edge.id);
        let base = if let Some(&h) = memo.get(&edge.id) {
            h
        } else {
            let mut hasher = DefaultHasher::new();
            std::mem::discriminant(&node.kind).hash(&mut hasher);
            match &node.kind {
                NodeKind::Slice { upper, lower } => {
                    upper.hash(&mut hasher);
                    lower.hash(&mut hasher);
                }
                NodeKind::Const => node.value.as_ref().hash(&mut hasher),
                NodeKind::Param => {
                    // inner parameters are canonicalized by first occurrence
                    let next = canon.len() as u64;
                    let c = *canon.entry(edge.id).or_insert(next);
                    c.hash(&mut hasher);
                }
                NodeKind::Var | NodeKind::Uf => node.id.hash(&mut hasher),
                _ => {}
            }
            for &child in &node.children {
                self.shape_hash(child, canon, memo).hash(&mut hasher);
                child.inverted.hash(&mut hasher);
            }
            let h = hasher.finish();
            memo.insert(edge.id, h);
            h
        };
        // inversion of the edge itself is hashed by the parent
        base
    }

    fn alpha_eq_children(&self, a: &[Edge], b: &[Edge]) -> bool {
        let mut map: HashMap<NodeId, NodeId> = HashMap::new();
        map.insert(a[0].id, b[0].id);
        self.alpha_eq(a[1], b[1], &mut map)
    }

    /// Structural equality of two bodies up to a parameter correspondence.
    fn alpha_eq(&self, a: Edge, b: Edge, map: &mut HashMap<NodeId, NodeId>) -> bool {
        if a.inverted != b.inverted {
            return false;
        }
        if a.id == b.id {
            return true;
        }
        let na = self.get(a.id);
        let nb = self.get(b.id);
        if std::mem::discriminant(&na.kind) != std::mem::discriminant(&nb.kind) {
            return false;
        }
        match (&na.kind, &nb.kind) {
            (NodeKind::Param, NodeKind::Param) => map.get(&a.id) == Some(&b.id),
            (
                NodeKind::Slice {
                    upper: ua,
                    lower: la,
                },
                NodeKind::Slice {
                    upper: ub,
                    lower: lb,
                },
            ) if (ua, la) != (ub, lb) => false,
            (NodeKind::Const, NodeKind::Const) => na.value == nb.value,
            (NodeKind::Lambda, NodeKind::Lambda) => {
                map.insert(na.children[0].id, nb.children[0].id);
                self.alpha_eq(na.children[1], nb.children[1], map)
            }
            _ => {
                if na.arity() != nb.arity() {
                    return false;
                }
                na.children
                    .clone()
                    .iter()
                    .zip(nb.children.clone().iter())
                    .all(|(&ca, &cb)| self.alpha_eq(ca, cb, map))
            }
        }
    }

    fn infer_sort(
        &self,
        sorts: &mut SortTable,
        kind: &NodeKind,
        children: &[Edge],
    ) -> Result<SortId> {
        let arity = children.len();
        let child_sort = |i: usize| self.get(children[i].id).sort;
        let child_width = |i: usize| sorts.width(child_sort(i));

        let require_arity = |n: usize| -> Result<()> {
            if arity != n {
                bail!("{:?} expects {} children, got {}", kind, n, arity);
            }
            Ok(())
        };
        let require_same_width = |i: usize, j: usize| -> Result<u32> {
            match (child_width(i), child_width(j)) {
                (Some(a), Some(b)) if a == b => Ok(a),
                (Some(a), Some(b)) => {
                    bail!("{:?}: child {} has width {}, child {} has width {}", kind, i, a, j, b)
                }
                _ => bail!("{:?}: children must have bit-vector sorts", kind),
            }
        };

        match kind {
            NodeKind::And | NodeKind::Add | NodeKind::Mul | NodeKind::Udiv | NodeKind::Urem => {
                require_arity(2)?;
                require_same_width(0, 1)?;
                Ok(child_sort(0))
            }
            NodeKind::Shl | NodeKind::Lshr => {
                require_arity(2)?;
                let w = child_width(0)
                    .ok_or_else(|| anyhow::anyhow!("{:?}: child 0 must be a bit-vector", kind))?;
                let sw = child_width(1)
                    .ok_or_else(|| anyhow::anyhow!("{:?}: child 1 must be a bit-vector", kind))?;
                if w.count_ones() != 1 {
                    bail!("{:?}: operand width {} is not a power of two", kind, w);
                }
                if sw != w.trailing_zeros() {
                    bail!(
                        "{:?}: shift amount has width {}, expected log2({}) = {}",
                        kind,
                        sw,
                        w,
                        w.trailing_zeros()
                    );
                }
                Ok(child_sort(0))
            }
            NodeKind::Eq => {
                require_arity(2)?;
                require_same_width(0, 1)?;
                Ok(sorts.bool_sort())
            }
            NodeKind::Ult => {
                require_arity(2)?;
                require_same_width(0, 1)?;
                Ok(sorts.bool_sort())
            }
            NodeKind::FunEq => {
                require_arity(2)?;
                if children.iter().any(|e| e.inverted) {
                    bail!("FunEq children cannot be inverted");
                }
                if child_sort(0) != child_sort(1) || !sorts.is_fun(child_sort(0)) {
                    bail!("FunEq expects two children of the same Fun sort");
                }
                Ok(sorts.bool_sort())
            }
            NodeKind::Concat => {
                require_arity(2)?;
                match (child_width(0), child_width(1)) {
                    (Some(a), Some(b)) => Ok(sorts.bitvec(a + b)),
                    _ => bail!("Concat children must have bit-vector sorts"),
                }
            }
            NodeKind::Slice { upper, lower } => {
                require_arity(1)?;
                let w = child_width(0)
                    .ok_or_else(|| anyhow::anyhow!("Slice child must be a bit-vector"))?;
                if upper < lower || *upper >= w {
                    bail!("Slice [{}:{}] out of bounds for width {}", upper, lower, w);
                }
                Ok(sorts.bitvec(upper - lower + 1))
            }
            NodeKind::Cond => {
                require_arity(3)?;
                if child_width(0) != Some(1) {
                    bail!("Cond condition must be Bool or a 1-bit vector");
                }
                if child_sort(1) != child_sort(2) {
                    bail!("Cond branches have different sorts");
                }
                Ok(child_sort(1))
            }
            NodeKind::Args => {
                if arity == 0 || arity > 3 {
                    bail!("Args expects 1 to 3 children, got {}", arity);
                }
                let elems = (0..arity).map(child_sort).collect();
                Ok(sorts.tuple(elems))
            }
            NodeKind::Apply => {
                require_arity(2)?;
                let f = child_sort(0);
                let (domain, codomain) = match sorts.get(f) {
                    Sort::Fun { domain, codomain } => (*domain, *codomain),
                    _ => bail!("Apply: child 0 must have Fun sort"),
                };
                if self.get(children[1].id).kind != NodeKind::Args {
                    bail!("Apply: child 1 must be an Args node");
                }
                if child_sort(1) != domain {
                    bail!("Apply: argument tuple sort does not match function domain");
                }
                Ok(codomain)
            }
            NodeKind::Lambda => {
                require_arity(2)?;
                if self.get(children[0].id).kind != NodeKind::Param {
                    bail!("Lambda: child 0 must be a Param node");
                }
                // domain is the product of param sorts along the curried chain
                let mut params = vec![child_sort(0)];
                let mut codomain = child_sort(1);
                if self.get(children[1].id).kind == NodeKind::Lambda {
                    if let Sort::Fun {
                        domain,
                        codomain: inner,
                    } = sorts.get(codomain)
                    {
                        let (domain, inner) = (*domain, *inner);
                        if let Sort::Tuple(inner_params) = sorts.get(domain) {
                            params.extend(inner_params.iter().copied());
                        }
                        codomain = inner;
                    }
                }
                let domain = sorts.tuple(params);
                Ok(sorts.fun(domain, codomain))
            }
            NodeKind::Proxy | NodeKind::Const | NodeKind::Var | NodeKind::Uf | NodeKind::Param => {
                bail!("{:?} cannot be created through the operator path", kind)
            }
        }
    }

    /// Takes an additional external reference on the node behind `edge`.
    pub fn copy(&mut self, edge: Edge) -> Edge {
        let node = self.get_mut(edge.id);
        node.ext_refs = node
            .ext_refs
            .checked_add(1)
            .unwrap_or_else(|| panic!("reference counter overflow on node {}", edge.id.0));
        edge
    }

    /// Drops an external reference; frees the node (and recursively its
    /// children) once no references remain.
    pub fn release(&mut self, edge: Edge) {
        let node = self.get_mut(edge.id);
        assert!(node.ext_refs > 0, "release without matching reference");
        node.ext_refs -= 1;
        if node.ext_refs == 0 && node.refs == 0 {
            self.recursively_free(edge.id);
        }
    }

    /// Erase, disconnect and tombstone nodes whose reference counts reached
    /// zero, cascading into children.
    fn recursively_free(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let free = {
                let node = self.get(id);
                node.refs == 0 && node.ext_refs == 0
            };
            if !free {
                continue;
            }
            let node = self.nodes[id.0 as usize]
                .take()
                .expect("double free of node");
            // erase from lookup tables
            match node.kind {
                NodeKind::Lambda => {
                    if let Some(hash) = self.lambdas.remove(&id) {
                        if let Some(bucket) = self.lambda_unique.get_mut(&hash) {
                            bucket.retain(|&n| n != id);
                        }
                    }
                }
                NodeKind::Proxy | NodeKind::Const => {}
                NodeKind::Var | NodeKind::Uf => {
                    self.inputs.remove(&id);
                }
                NodeKind::Param => {}
                _ => {
                    self.unique.remove(&UniqueKey {
                        kind: node.kind.clone(),
                        children: node.children.clone(),
                    });
                    self.feqs.remove(&id);
                }
            }
            self.parameterized.remove(&id);
            // disconnect from children
            for (pos, &child) in node.children.iter().enumerate() {
                let c = self.get_mut(child.id);
                if let Some(at) = c
                    .parents
                    .iter()
                    .position(|&(p, cp)| p == id && cp as usize == pos)
                {
                    c.parents.swap_remove(at);
                }
                assert!(c.refs > 0);
                c.refs -= 1;
                if c.refs == 0 && c.ext_refs == 0 {
                    stack.push(child.id);
                }
            }
            if let Some(target) = node.simplified {
                let t = self.get_mut(target.id);
                assert!(t.refs > 0);
                t.refs -= 1;
                if t.refs == 0 && t.ext_refs == 0 {
                    stack.push(target.id);
                }
            }
        }
    }

    /// Rewrites a node into a forwarding proxy for `target`. The node is
    /// erased from the unique table and disconnected from its children; all
    /// future lookups through it chase the forwarding edge.
    pub fn set_to_proxy(&mut self, id: NodeId, target: Edge) {
        let target = self.chase(target);
        assert!(target.id != id, "proxy cycle");
        let (old_kind, old_children) = {
            let node = self.get(id);
            (node.kind.clone(), node.children.clone())
        };
        assert!(old_kind != NodeKind::Proxy, "node is already a proxy");
        // erase
        match old_kind {
            NodeKind::Lambda => {
                if let Some(hash) = self.lambdas.remove(&id) {
                    if let Some(bucket) = self.lambda_unique.get_mut(&hash) {
                        bucket.retain(|&n| n != id);
                    }
                }
            }
            NodeKind::Const | NodeKind::Var | NodeKind::Uf | NodeKind::Param => {}
            _ => {
                self.unique.remove(&UniqueKey {
                    kind: old_kind.clone(),
                    children: old_children.clone(),
                });
                self.feqs.remove(&id);
            }
        }
        // disconnect children
        for (pos, &child) in old_children.iter().enumerate() {
            let c = self.get_mut(child.id);
            if let Some(at) = c
                .parents
                .iter()
                .position(|&(p, cp)| p == id && cp as usize == pos)
            {
                c.parents.swap_remove(at);
            }
            assert!(c.refs > 0);
            c.refs -= 1;
            if c.refs == 0 && c.ext_refs == 0 {
                self.recursively_free(child.id);
            }
        }
        // the proxy link holds an internal reference on its target
        let t = self.get_mut(target.id);
        t.refs = t
            .refs
            .checked_add(1)
            .unwrap_or_else(|| panic!("reference counter overflow on node {}", target.id.0));
        let node = self.get_mut(id);
        node.kind = NodeKind::Proxy;
        node.children = Vec::new();
        node.value = None;
        node.simplified = Some(target);
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}
