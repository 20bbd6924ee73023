use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

pub mod bv;
pub mod config;
pub mod cons_value;
pub mod inv_value;
pub mod model;
pub mod node;
pub mod path_sel;
pub mod prop_engine;
pub mod rewrites;
mod rng;
pub mod score;
pub mod sorts;
pub mod symbol_table;

pub use config::{Engine, OptionKey, PathSelection, SolverConfig};
pub use prop_engine::{PropStats, SatResult};

use bv::BitVector;
use model::Model;
use node::{Edge, NodeKind, NodeTable};
use rewrites::SimpCache;
use score::ScoreMap;
use sorts::SortId;
use sorts::SortTable;
use symbol_table::SymbolTable;

/// A solver instance. Owns the expression DAG, the sort and symbol tables,
/// the current model, the scores and the random state; nothing is shared
/// between instances and no operation may be called concurrently on one.
pub struct Solver {
    config: SolverConfig,
    sorts: SortTable,
    nodes: NodeTable,
    symbols: SymbolTable,
    model: Model,
    score: ScoreMap,
    simp_cache: SimpCache,
    roots: Vec<Edge>,
    /// Set when the simplifier reduced an asserted root to false.
    inconsistent: bool,
    rng: StdRng,
    stats: PropStats,
    terminate: Option<Box<dyn FnMut() -> bool>>,
    last_result: Option<SatResult>,
}

impl Solver {
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    pub fn with_config(config: SolverConfig) -> Self {
        let seed = config.seed as u64;
        Self {
            config,
            sorts: SortTable::new(),
            nodes: NodeTable::new(),
            symbols: SymbolTable::new(),
            model: Model::new(),
            score: ScoreMap::new(),
            simp_cache: SimpCache::new(),
            roots: Vec::new(),
            inconsistent: false,
            rng: StdRng::seed_from_u64(seed),
            stats: PropStats::default(),
            last_result: None,
            terminate: None,
        }
    }

    pub fn set_option(&mut self, opt: OptionKey) -> Result<()> {
        self.config.set(opt)?;
        if let OptionKey::Seed(seed) = opt {
            self.rng = StdRng::seed_from_u64(seed as u64);
        }
        Ok(())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn stats(&self) -> &PropStats {
        &self.stats
    }

    /// Installs the cooperative termination hook, polled once per move and
    /// at every descent step.
    pub fn set_termination_hook<F: FnMut() -> bool + 'static>(&mut self, hook: F) {
        self.terminate = Some(Box::new(hook));
    }

    // ---- sorts ----------------------------------------------------------

    pub fn bool_sort(&mut self) -> SortId {
        self.sorts.bool_sort()
    }

    pub fn bv_sort(&mut self, width: u32) -> SortId {
        self.sorts.bitvec(width)
    }

    pub fn fun_sort(&mut self, domain: &[SortId], codomain: SortId) -> SortId {
        let dom = self.sorts.tuple(domain.to_vec());
        self.sorts.fun(dom, codomain)
    }

    pub fn array_sort(&mut self, index: SortId, element: SortId) -> SortId {
        self.sorts.array(index, element)
    }

    // ---- node constructors ----------------------------------------------

    pub fn mk_const(&mut self, value: BitVector) -> Edge {
        self.nodes.mk_const(&mut self.sorts, value)
    }

    pub fn mk_const_u64(&mut self, value: u64, width: u32) -> Edge {
        self.mk_const(BitVector::from_u64(value, width))
    }

    pub fn mk_true(&mut self) -> Edge {
        self.mk_const(BitVector::one(1))
    }

    pub fn mk_false(&mut self) -> Edge {
        self.mk_const(BitVector::zero(1))
    }

    pub fn mk_var(&mut self, sort: SortId, symbol: Option<&str>) -> Result<Edge> {
        if let Some(name) = symbol {
            if self.symbols.contains(name) {
                bail!("symbol {} is already defined", name);
            }
        }
        let edge = self
            .nodes
            .mk_var(&self.sorts, sort, symbol.map(str::to_owned))?;
        if let Some(name) = symbol {
            self.nodes.copy(edge);
            self.symbols.insert(name.to_owned(), edge)?;
        }
        Ok(edge)
    }

    pub fn mk_uf(&mut self, sort: SortId, symbol: Option<&str>) -> Result<Edge> {
        if let Some(name) = symbol {
            if self.symbols.contains(name) {
                bail!("symbol {} is already defined", name);
            }
        }
        let edge = self
            .nodes
            .mk_uf(&self.sorts, sort, symbol.map(str::to_owned))?;
        if let Some(name) = symbol {
            self.nodes.copy(edge);
            self.symbols.insert(name.to_owned(), edge)?;
        }
        Ok(edge)
    }

    pub fn mk_param(&mut self, sort: SortId, symbol: Option<&str>) -> Result<Edge> {
        self.nodes
            .mk_param(&self.sorts, sort, symbol.map(str::to_owned))
    }

    fn binary(&mut self, kind: NodeKind, a: Edge, b: Edge) -> Result<Edge> {
        self.nodes
            .create(&mut self.sorts, kind, vec![a, b], self.config.sort_exp)
    }

    /// Negation is free: it flips the inversion bit of the edge.
    pub fn mk_not(&self, a: Edge) -> Edge {
        a.not()
    }

    pub fn mk_and(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::And, a, b)
    }

    /// Or is the inverted And of the inverted operands; no Or node exists.
    pub fn mk_or(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        Ok(self.mk_and(a.not(), b.not())?.not())
    }

    /// Dispatches to FunEq for function-sorted operands.
    pub fn mk_eq(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        let kind = if self.sorts.is_fun(self.nodes.get(a.id).sort) {
            NodeKind::FunEq
        } else {
            NodeKind::Eq
        };
        self.binary(kind, a, b)
    }

    pub fn mk_ult(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Ult, a, b)
    }

    pub fn mk_add(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Add, a, b)
    }

    pub fn mk_mul(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Mul, a, b)
    }

    pub fn mk_shl(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Shl, a, b)
    }

    pub fn mk_lshr(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Lshr, a, b)
    }

    pub fn mk_udiv(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Udiv, a, b)
    }

    pub fn mk_urem(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Urem, a, b)
    }

    pub fn mk_concat(&mut self, a: Edge, b: Edge) -> Result<Edge> {
        self.binary(NodeKind::Concat, a, b)
    }

    pub fn mk_slice(&mut self, a: Edge, upper: u32, lower: u32) -> Result<Edge> {
        self.nodes.create(
            &mut self.sorts,
            NodeKind::Slice { upper, lower },
            vec![a],
            self.config.sort_exp,
        )
    }

    pub fn mk_cond(&mut self, c: Edge, t: Edge, e: Edge) -> Result<Edge> {
        self.nodes.create(
            &mut self.sorts,
            NodeKind::Cond,
            vec![c, t, e],
            self.config.sort_exp,
        )
    }

    pub fn mk_apply(&mut self, fun: Edge, args: &[Edge]) -> Result<Edge> {
        let args_node = self.nodes.create(
            &mut self.sorts,
            NodeKind::Args,
            args.to_vec(),
            self.config.sort_exp,
        )?;
        self.binary(NodeKind::Apply, fun, args_node)
    }

    pub fn mk_lambda(&mut self, param: Edge, body: Edge) -> Result<Edge> {
        self.binary(NodeKind::Lambda, param, body)
    }

    pub fn copy(&mut self, edge: Edge) -> Edge {
        self.nodes.copy(edge)
    }

    pub fn release(&mut self, edge: Edge) {
        self.nodes.release(edge)
    }

    pub fn sort_of(&self, edge: Edge) -> SortId {
        self.nodes.get(edge.id).sort
    }

    // ---- solving --------------------------------------------------------

    /// Asserts a Boolean formula. The simplifier runs first; a root that
    /// folds to true is discharged, one that folds to false marks the
    /// instance unsatisfiable.
    pub fn assert_formula(&mut self, edge: Edge) -> Result<()> {
        if self.sorts.width(self.nodes.get(edge.id).sort) != Some(1) {
            bail!("assert requires a Bool formula");
        }
        let root = rewrites::simplify(
            &mut self.nodes,
            &mut self.sorts,
            &self.config,
            &mut self.simp_cache,
            edge,
        )?;
        if self.nodes.is_const_edge(root) {
            if self.nodes.const_value(root).is_false() {
                debug!("assertion simplified to false");
                self.inconsistent = true;
            }
            return Ok(());
        }
        self.nodes.copy(root);
        self.nodes.get_mut(root.id).flags.constraint = true;
        self.roots.push(root);
        self.last_result = None;
        Ok(())
    }

    pub fn check_sat(&mut self) -> SatResult {
        self.stats = PropStats::default();
        let result = if self.inconsistent {
            SatResult::Unsat
        } else if self.roots.is_empty() {
            SatResult::Sat
        } else {
            match self.config.engine {
                Engine::BitBlast => {
                    debug!("no bit-blasting back-end available");
                    SatResult::Unknown
                }
                Engine::Prop | Engine::Sls => {
                    let mut default_hook = || false;
                    let hook: &mut dyn FnMut() -> bool = match &mut self.terminate {
                        Some(f) => f.as_mut(),
                        None => &mut default_hook,
                    };
                    prop_engine::check(
                        &self.nodes,
                        &self.sorts,
                        &mut self.model,
                        &mut self.score,
                        &self.config,
                        &mut self.rng,
                        &mut self.stats,
                        &self.roots,
                        hook,
                    )
                }
            }
        };
        self.last_result = Some(result);
        result
    }

    /// Concrete value of a node under the current model; valid only after a
    /// `Sat` result.
    pub fn get_value(&mut self, edge: Edge) -> Result<BitVector> {
        if self.last_result != Some(SatResult::Sat) {
            bail!("get_value requires a preceding sat result");
        }
        Ok(self.model.get_bv(&self.nodes, &self.sorts, edge))
    }

    pub fn lookup_symbol(&self, name: &str) -> Option<Edge> {
        self.symbols.find(name)
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
