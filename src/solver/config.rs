use anyhow::{bail, Result};

/// Solving engine selection. The propagation loop backs both `Prop` and
/// `Sls`; `BitBlast` is provided by an external collaborator and is not
/// available in this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Engine {
    Prop,
    Sls,
    BitBlast,
}

/// Child-selection heuristic of the propagation engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSelection {
    Essential,
    Random,
}

/// Configuration options for the solver. Probability options are per-mille
/// values in [0, 1000].
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub engine: Engine,

    /// Seed of the per-solver random number generator.
    pub seed: u32,

    pub path_sel: PathSelection,

    /// Probability of choosing an inverse value over a consistent value.
    pub prob_use_inv: u32,

    /// Probability of flipping one don't-care bit in And inverse/consistent
    /// values instead of randomizing all of them.
    pub prob_and_flip: u32,

    /// Probability of flipping one bit of the current assignment for Eq
    /// disequality values.
    pub prob_eq_flip: u32,

    /// Probability of slicing the Concat consistent value out of the current
    /// assignment (with one bit flipped) when the other operand is constant.
    pub prob_concat_flip: u32,

    /// Probability of flipping one don't-care bit in Slice inverse values.
    pub prob_slice_flip: u32,

    /// Probability of keeping the previous value of Slice don't-care bits.
    pub prob_slice_keep_dc: u32,

    /// Probability of propagating into a Cond condition instead of the
    /// enabled branch.
    pub prob_flip_cond: u32,

    /// Probability of flipping the condition when a Cond branch is constant;
    /// adapted dynamically during solving.
    pub prob_flip_cond_const: u32,

    /// Number of const-branch condition flips after which the dynamic
    /// probability above is adjusted.
    pub flip_cond_const_npathsel: u32,

    /// If set, conflicts against constant operands abort the descent instead
    /// of falling back to consistent values.
    pub no_move_on_conflict: bool,

    /// Sort children of commutative operators by id at construction.
    pub sort_exp: bool,

    /// 0 = proxy chasing only, 1 = constant folding, 2+ = local rules.
    pub rewrite_level: u32,

    /// Move budget for check_sat; 0 means unlimited.
    pub max_moves: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Prop,
            seed: 0,
            path_sel: PathSelection::Essential,
            prob_use_inv: 990,
            prob_and_flip: 0,
            prob_eq_flip: 0,
            prob_concat_flip: 0,
            prob_slice_flip: 0,
            prob_slice_keep_dc: 500,
            prob_flip_cond: 100,
            prob_flip_cond_const: 100,
            flip_cond_const_npathsel: 500,
            no_move_on_conflict: false,
            sort_exp: true,
            rewrite_level: 2,
            max_moves: 0,
        }
    }
}

/// Option keys with their values, consumed by `Solver::set_option`.
#[derive(Clone, Copy, Debug)]
pub enum OptionKey {
    Engine(Engine),
    Seed(u32),
    PropPathSel(PathSelection),
    PropProbUseInv(u32),
    PropProbAndFlip(u32),
    PropProbEqFlip(u32),
    PropProbConcFlip(u32),
    PropProbSliceFlip(u32),
    PropProbSliceKeepDc(u32),
    PropProbFlipCond(u32),
    PropProbFlipCondConst(u32),
    PropFlipCondConstNpathsel(u32),
    PropNoMoveOnConflict(bool),
    SortExp(bool),
    RewriteLevel(u32),
    MaxMoves(u64),
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, opt: OptionKey) -> Result<()> {
        fn per_mille(name: &str, v: u32) -> Result<u32> {
            if v > 1000 {
                bail!("option {} out of range: {} (expected 0..=1000)", name, v);
            }
            Ok(v)
        }
        match opt {
            OptionKey::Engine(e) => self.engine = e,
            OptionKey::Seed(s) => self.seed = s,
            OptionKey::PropPathSel(p) => self.path_sel = p,
            OptionKey::PropProbUseInv(v) => self.prob_use_inv = per_mille("PROP_PROB_USE_INV", v)?,
            OptionKey::PropProbAndFlip(v) => {
                self.prob_and_flip = per_mille("PROP_PROB_AND_FLIP", v)?
            }
            OptionKey::PropProbEqFlip(v) => self.prob_eq_flip = per_mille("PROP_PROB_EQ_FLIP", v)?,
            OptionKey::PropProbConcFlip(v) => {
                self.prob_concat_flip = per_mille("PROP_PROB_CONC_FLIP", v)?
            }
            OptionKey::PropProbSliceFlip(v) => {
                self.prob_slice_flip = per_mille("PROP_PROB_SLICE_FLIP", v)?
            }
            OptionKey::PropProbSliceKeepDc(v) => {
                self.prob_slice_keep_dc = per_mille("PROP_PROB_SLICE_KEEP_DC", v)?
            }
            OptionKey::PropProbFlipCond(v) => {
                self.prob_flip_cond = per_mille("PROP_PROB_FLIP_COND", v)?
            }
            OptionKey::PropProbFlipCondConst(v) => {
                self.prob_flip_cond_const = per_mille("PROP_PROB_FLIP_COND_CONST", v)?
            }
            OptionKey::PropFlipCondConstNpathsel(v) => {
                if v == 0 {
                    bail!("option PROP_FLIP_COND_CONST_NPATHSEL must be positive");
                }
                self.flip_cond_const_npathsel = v;
            }
            OptionKey::PropNoMoveOnConflict(b) => self.no_move_on_conflict = b,
            OptionKey::SortExp(b) => self.sort_exp = b,
            OptionKey::RewriteLevel(v) => {
                if v > 3 {
                    bail!("option REWRITE_LEVEL out of range: {} (expected 0..=3)", v);
                }
                self.rewrite_level = v;
            }
            OptionKey::MaxMoves(v) => self.max_moves = v,
        }
        Ok(())
    }
}
