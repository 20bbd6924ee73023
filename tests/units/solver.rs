use propsmt::{BitVector, OptionKey, SatResult, Solver, SolverConfig};

fn solver_with_seed(seed: u32) -> Solver {
    let mut config = SolverConfig::default();
    config.seed = seed;
    config.max_moves = 10_000;
    Solver::with_config(config)
}

#[test]
fn test_trivial_sat() {
    let mut s = solver_with_seed(0);
    let b = s.bool_sort();
    let x = s.mk_var(b, Some("x")).unwrap();
    let y = s.mk_var(b, Some("y")).unwrap();
    let conj = s.mk_and(x, s.mk_not(y)).unwrap();
    s.assert_formula(conj).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert!(s.get_value(x).unwrap().is_true());
    assert!(s.get_value(y).unwrap().is_false());
}

#[test]
fn test_constant_propagation() {
    let mut s = solver_with_seed(1);
    let bv4 = s.bv_sort(4);
    let x = s.mk_var(bv4, Some("x")).unwrap();
    let c9 = s.mk_const_u64(0b1001, 4);
    let c3 = s.mk_const_u64(0b0011, 4);
    let sum = s.mk_add(x, c9).unwrap();
    let eq = s.mk_eq(sum, c3).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert_eq!(s.get_value(x).unwrap().to_u64(), 0b1010);
}

#[test]
fn test_unsat_via_simplifier() {
    let mut s = Solver::new();
    let bv1 = s.bv_sort(1);
    let x = s.mk_var(bv1, Some("x")).unwrap();
    let refl = s.mk_eq(x, x).unwrap();
    s.assert_formula(refl).unwrap();
    let contra = s.mk_eq(x, s.mk_not(x)).unwrap();
    s.assert_formula(contra).unwrap();
    assert_eq!(s.check_sat(), SatResult::Unsat);
}

#[test]
fn test_propagation_mul_odd() {
    for seed in [0u32, 1, 7, 42, 99] {
        let mut s = solver_with_seed(seed);
        let bv8 = s.bv_sort(8);
        let x = s.mk_var(bv8, Some("x")).unwrap();
        let c3 = s.mk_const_u64(3, 8);
        let c21 = s.mk_const_u64(21, 8);
        let prod = s.mk_mul(x, c3).unwrap();
        let eq = s.mk_eq(prod, c21).unwrap();
        s.assert_formula(eq).unwrap();
        assert_eq!(s.check_sat(), SatResult::Sat, "seed {}", seed);
        // 3 is odd, so the solution is unique
        assert_eq!(s.get_value(x).unwrap().to_u64(), 7, "seed {}", seed);
        assert!(s.stats().moves <= 100, "seed {}: {}", seed, s.stats().moves);
    }
}

#[test]
fn test_propagation_mul_even() {
    for seed in [0u32, 3, 11, 57] {
        let mut s = solver_with_seed(seed);
        let bv8 = s.bv_sort(8);
        let x = s.mk_var(bv8, Some("x")).unwrap();
        let c4 = s.mk_const_u64(4, 8);
        let c12 = s.mk_const_u64(12, 8);
        let prod = s.mk_mul(x, c4).unwrap();
        let eq = s.mk_eq(prod, c12).unwrap();
        s.assert_formula(eq).unwrap();
        assert_eq!(s.check_sat(), SatResult::Sat, "seed {}", seed);
        // the two free high bits admit exactly four solutions
        let v = s.get_value(x).unwrap().to_u64();
        assert!([3, 67, 131, 195].contains(&v), "seed {}: x = {}", seed, v);
    }
}

#[test]
fn test_div_rem_identity_tautology() {
    let mut s = solver_with_seed(5);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let y = s.mk_var(bv8, Some("y")).unwrap();
    let q = s.mk_udiv(x, y).unwrap();
    let qy = s.mk_mul(q, y).unwrap();
    let r = s.mk_urem(x, y).unwrap();
    let sum = s.mk_add(qy, r).unwrap();
    let eq = s.mk_eq(sum, x).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
}

#[test]
fn test_ult_range() {
    for seed in [2u32, 13, 77] {
        let mut s = solver_with_seed(seed);
        let bv4 = s.bv_sort(4);
        let x = s.mk_var(bv4, Some("x")).unwrap();
        let c2 = s.mk_const_u64(2, 4);
        let c5 = s.mk_const_u64(5, 4);
        let hi = s.mk_ult(x, c5).unwrap();
        let lo = s.mk_ult(c2, x).unwrap();
        s.assert_formula(hi).unwrap();
        s.assert_formula(lo).unwrap();
        assert_eq!(s.check_sat(), SatResult::Sat, "seed {}", seed);
        let v = s.get_value(x).unwrap().to_u64();
        assert!(v == 3 || v == 4, "seed {}: x = {}", seed, v);
    }
}

#[test]
fn test_concat_decomposition() {
    let mut s = solver_with_seed(9);
    let bv4 = s.bv_sort(4);
    let a = s.mk_var(bv4, Some("a")).unwrap();
    let b = s.mk_var(bv4, Some("b")).unwrap();
    let cat = s.mk_concat(a, b).unwrap();
    let target = s.mk_const_u64(0xAB, 8);
    let eq = s.mk_eq(cat, target).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert_eq!(s.get_value(a).unwrap().to_u64(), 0xA);
    assert_eq!(s.get_value(b).unwrap().to_u64(), 0xB);
}

#[test]
fn test_slice_constraint() {
    let mut s = solver_with_seed(21);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let sl = s.mk_slice(x, 5, 2).unwrap();
    let target = s.mk_const_u64(0b1001, 4);
    let eq = s.mk_eq(sl, target).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    let v = s.get_value(x).unwrap();
    assert_eq!(v.slice(5, 2).to_u64(), 0b1001);
}

#[test]
fn test_shl_constraint() {
    let mut s = solver_with_seed(17);
    let bv8 = s.bv_sort(8);
    let bv3 = s.bv_sort(3);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let amount = s.mk_var(bv3, Some("sh")).unwrap();
    let shifted = s.mk_shl(x, amount).unwrap();
    let target = s.mk_const_u64(0b10100, 8);
    let eq = s.mk_eq(shifted, target).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    let xv = s.get_value(x).unwrap();
    let av = s.get_value(amount).unwrap();
    assert_eq!(xv.shl(&av).to_u64(), 0b10100);
}

#[test]
fn test_udiv_constraint() {
    let mut s = solver_with_seed(33);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let c3 = s.mk_const_u64(3, 8);
    let c5 = s.mk_const_u64(5, 8);
    let q = s.mk_udiv(x, c3).unwrap();
    let eq = s.mk_eq(q, c5).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    let v = s.get_value(x).unwrap().to_u64();
    assert!((15..=17).contains(&v), "x = {}", v);
}

#[test]
fn test_urem_constraint() {
    let mut s = solver_with_seed(4);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let c5 = s.mk_const_u64(5, 8);
    let c3 = s.mk_const_u64(3, 8);
    let r = s.mk_urem(x, c5).unwrap();
    let eq = s.mk_eq(r, c3).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert_eq!(s.get_value(x).unwrap().to_u64() % 5, 3);
}

#[test]
fn test_cond_flip() {
    let mut s = solver_with_seed(6);
    let bv8 = s.bv_sort(8);
    let b = s.bool_sort();
    let c = s.mk_var(b, Some("c")).unwrap();
    let t = s.mk_const_u64(10, 8);
    let e = s.mk_const_u64(20, 8);
    let ite = s.mk_cond(c, t, e).unwrap();
    let target = s.mk_const_u64(20, 8);
    let eq = s.mk_eq(ite, target).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert!(s.get_value(c).unwrap().is_false());
}

#[test]
fn test_budget_exhaustion_returns_unknown() {
    let mut s = Solver::new();
    s.set_option(OptionKey::MaxMoves(500)).unwrap();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    // x & 0x0f can never contain bit 4
    let mask = s.mk_const_u64(0x0f, 8);
    let c = s.mk_const_u64(0x10, 8);
    let conj = s.mk_and(x, mask).unwrap();
    let eq = s.mk_eq(conj, c).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Unknown);
}

#[test]
fn test_termination_hook() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let mask = s.mk_const_u64(0x0f, 8);
    let c = s.mk_const_u64(0x10, 8);
    let conj = s.mk_and(x, mask).unwrap();
    let eq = s.mk_eq(conj, c).unwrap();
    s.assert_formula(eq).unwrap();
    let mut polls = 0u32;
    s.set_termination_hook(move || {
        polls += 1;
        polls > 20
    });
    assert_eq!(s.check_sat(), SatResult::Unknown);
}

#[test]
fn test_get_value_requires_sat() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    assert!(s.get_value(x).is_err());
}

#[test]
fn test_option_ranges() {
    let mut s = Solver::new();
    assert!(s.set_option(OptionKey::PropProbUseInv(500)).is_ok());
    assert!(s.set_option(OptionKey::PropProbUseInv(2000)).is_err());
    assert!(s.set_option(OptionKey::RewriteLevel(4)).is_err());
}

#[test]
fn test_uf_formula_returns_unknown() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let fsort = s.fun_sort(&[bv8], bv8);
    let f = s.mk_uf(fsort, Some("f")).unwrap();
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let app = s.mk_apply(f, &[x]).unwrap();
    let c = s.mk_const_u64(3, 8);
    let eq = s.mk_eq(app, c).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Unknown);
}

#[test]
fn test_bitblast_engine_unavailable() {
    let mut s = Solver::new();
    s.set_option(OptionKey::Engine(propsmt::Engine::BitBlast))
        .unwrap();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let c = s.mk_const_u64(1, 8);
    let eq = s.mk_eq(x, c).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Unknown);
}

#[test]
fn test_nested_boolean_structure() {
    for seed in [8u32, 19, 101] {
        let mut s = solver_with_seed(seed);
        let bv8 = s.bv_sort(8);
        let x = s.mk_var(bv8, Some("x")).unwrap();
        let y = s.mk_var(bv8, Some("y")).unwrap();
        let c7 = s.mk_const_u64(7, 8);
        let c9 = s.mk_const_u64(9, 8);
        let sum = s.mk_add(x, y).unwrap();
        let eq1 = s.mk_eq(sum, c9).unwrap();
        let eq2 = s.mk_ult(x, c7).unwrap();
        let conj = s.mk_and(eq1, eq2).unwrap();
        s.assert_formula(conj).unwrap();
        assert_eq!(s.check_sat(), SatResult::Sat, "seed {}", seed);
        let xv = s.get_value(x).unwrap().to_u64();
        let yv = s.get_value(y).unwrap().to_u64();
        assert_eq!((xv + yv) % 256, 9, "seed {}", seed);
        assert!(xv < 7, "seed {}", seed);
    }
}

#[test]
fn test_model_sound_after_solving() {
    let mut s = solver_with_seed(14);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let y = s.mk_var(bv8, Some("y")).unwrap();
    let prod = s.mk_mul(x, y).unwrap();
    let c = s.mk_const_u64(20, 8);
    let eq = s.mk_eq(prod, c).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    let xv = s.get_value(x).unwrap();
    let yv = s.get_value(y).unwrap();
    assert_eq!(xv.mul(&yv).to_u64(), 20);
    assert!(s.get_value(eq).unwrap().is_true());
}

#[test]
fn test_or_via_inverted_and() {
    let mut s = solver_with_seed(25);
    let b = s.bool_sort();
    let x = s.mk_var(b, Some("x")).unwrap();
    let y = s.mk_var(b, Some("y")).unwrap();
    let disj = s.mk_or(x, y).unwrap();
    let ny = s.mk_not(y);
    s.assert_formula(disj).unwrap();
    s.assert_formula(ny).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    assert!(s.get_value(x).unwrap().is_true());
    assert!(s.get_value(y).unwrap().is_false());
}

#[test]
fn test_stats_progress() {
    let mut s = solver_with_seed(31);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let c3 = s.mk_const_u64(3, 8);
    let c21 = s.mk_const_u64(21, 8);
    let prod = s.mk_mul(x, c3).unwrap();
    let eq = s.mk_eq(prod, c21).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), SatResult::Sat);
    let stats = s.stats();
    assert!(stats.moves >= 1);
    assert!(stats.props >= stats.moves);
}
