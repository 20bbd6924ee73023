use propsmt::solver::node::NodeKind;
use propsmt::{BitVector, Solver};

#[test]
fn test_hash_consing_idempotence() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let y = s.mk_var(bv8, Some("y")).unwrap();
    let a = s.mk_add(x, y).unwrap();
    let b = s.mk_add(x, y).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_commutative_normalization() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, None).unwrap();
    let y = s.mk_var(bv8, None).unwrap();
    assert_eq!(s.mk_and(x, y).unwrap(), s.mk_and(y, x).unwrap());
    assert_eq!(s.mk_add(x, y).unwrap(), s.mk_add(y, x).unwrap());
    assert_eq!(s.mk_mul(x, y).unwrap(), s.mk_mul(y, x).unwrap());
    assert_eq!(s.mk_eq(x, y).unwrap(), s.mk_eq(y, x).unwrap());
}

#[test]
fn test_inversion_folding() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, None).unwrap();
    // double negation is the identity on edges, no node is allocated
    assert_eq!(s.mk_not(s.mk_not(x)), x);
    // negating a constant denotes the complementary constant
    let c = s.mk_const_u64(0b0101, 4);
    let nc = s.mk_not(c);
    assert_ne!(c, nc);
    let t = s.mk_true();
    s.assert_formula(t).unwrap();
    assert_eq!(s.check_sat(), propsmt::SatResult::Sat);
    assert_eq!(s.get_value(nc).unwrap().to_u64(), 0b1010);
}

#[test]
fn test_sort_stability() {
    let mut s = Solver::new();
    let bv4 = s.bv_sort(4);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv4, None).unwrap();
    let y = s.mk_var(bv8, None).unwrap();
    let cat = s.mk_concat(x, y).unwrap();
    assert_eq!(s.sort_of(cat), s.bv_sort(12));
    let sl = s.mk_slice(y, 6, 2).unwrap();
    assert_eq!(s.sort_of(sl), s.bv_sort(5));
    let eq = s.mk_eq(x, x).unwrap();
    assert_eq!(s.sort_of(eq), s.bool_sort());
}

#[test]
fn test_sort_errors_name_the_problem() {
    let mut s = Solver::new();
    let bv4 = s.bv_sort(4);
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv4, None).unwrap();
    let y = s.mk_var(bv8, None).unwrap();
    assert!(s.mk_add(x, y).is_err());
    assert!(s.mk_eq(x, y).is_err());
    // shift amount must have width log2(w)
    assert!(s.mk_shl(y, y).is_err());
    let bv3 = s.bv_sort(3);
    let amount = s.mk_var(bv3, None).unwrap();
    assert!(s.mk_shl(y, amount).is_ok());
    // non-power-of-two operand width cannot be shifted
    let bv5 = s.bv_sort(5);
    let z = s.mk_var(bv5, None).unwrap();
    let a5 = s.mk_var(bv5, None).unwrap();
    assert!(s.mk_shl(z, a5).is_err());
}

#[test]
fn test_refcount_balance() {
    use propsmt::solver::node::NodeTable;
    use propsmt::solver::sorts::SortTable;
    let mut nodes = NodeTable::new();
    let mut sorts = SortTable::new();
    let bv8 = sorts.bitvec(8);
    let x = nodes.mk_var(&sorts, bv8, None).unwrap();
    let y = nodes.mk_var(&sorts, bv8, None).unwrap();
    let before = nodes.unique_len();
    let live_before = nodes.num_live_nodes();
    let a = nodes
        .create(&mut sorts, NodeKind::Add, vec![x, y], true)
        .unwrap();
    let b = nodes
        .create(&mut sorts, NodeKind::Ult, vec![a, y], true)
        .unwrap();
    let c = nodes
        .create(&mut sorts, NodeKind::Ult, vec![a, y], true)
        .unwrap();
    assert_eq!(b, c);
    nodes.release(c);
    nodes.release(b);
    nodes.release(a);
    assert_eq!(nodes.unique_len(), before);
    assert_eq!(nodes.num_live_nodes(), live_before);
}

#[test]
fn test_proxy_transparency() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("x")).unwrap();
    let zero = s.mk_const_u64(0, 8);
    let sum = s.mk_add(x, zero).unwrap();
    let c = s.mk_const_u64(5, 8);
    let eq = s.mk_eq(sum, c).unwrap();
    s.assert_formula(eq).unwrap();
    assert_eq!(s.check_sat(), propsmt::SatResult::Sat);
    // x + 0 simplifies to x, so the model value must flow through
    assert_eq!(s.get_value(x).unwrap().to_u64(), 5);
    assert!(s.get_value(eq).unwrap().is_true());
}

#[test]
fn test_cond_sort_inference() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let b = s.bool_sort();
    let c = s.mk_var(b, None).unwrap();
    let t = s.mk_var(bv8, None).unwrap();
    let e = s.mk_var(bv8, None).unwrap();
    let ite = s.mk_cond(c, t, e).unwrap();
    assert_eq!(s.sort_of(ite), bv8);
    let bv4 = s.bv_sort(4);
    let bad = s.mk_var(bv4, None).unwrap();
    assert!(s.mk_cond(c, t, bad).is_err());
}

#[test]
fn test_symbol_lookup() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let x = s.mk_var(bv8, Some("input0")).unwrap();
    assert_eq!(s.lookup_symbol("input0"), Some(x));
    assert!(s.lookup_symbol("nope").is_none());
    // duplicate names are rejected
    assert!(s.mk_var(bv8, Some("input0")).is_err());
}

#[test]
fn test_lambda_sort_and_apply() {
    let mut s = Solver::new();
    let bv8 = s.bv_sort(8);
    let p = s.mk_param(bv8, Some("p")).unwrap();
    let one = s.mk_const_u64(1, 8);
    let body = s.mk_add(p, one).unwrap();
    let lam = s.mk_lambda(p, body).unwrap();
    let fsort = s.fun_sort(&[bv8], bv8);
    assert_eq!(s.sort_of(lam), fsort);
    let x = s.mk_var(bv8, None).unwrap();
    let app = s.mk_apply(lam, &[x]).unwrap();
    assert_eq!(s.sort_of(app), bv8);
}
