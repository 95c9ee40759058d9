//! Integration tests for the sequence engine.

#![cfg(feature = "gradcheck")]

mod common;

use common::{basic_seq, basic_seq_vars, init_logger, random_var, rng, seq_from_vars, vec64};
use vecdiff::gradcheck::{ResChecker, SeqChecker};
use vecdiff::seq::{self, Batch, const_seq_list, expand_batch, reduce_batch, separate_seqs};
use vecdiff::{Var, Vector, ops};

/// Five sequences of 2-vectors with lengths 3, 0, 2, 1 and 4.
fn literal_seqs() -> Vec<Vec<Vector<f64>>> {
    vec![
        vec![vec64(&[1.0, 2.0]), vec64(&[-2.0, 1.0]), vec64(&[2.0, -1.0])],
        vec![],
        vec![vec64(&[1.0, 2.0]), vec64(&[0.0, 5.0])],
        vec![vec64(&[9.0, 1.0])],
        vec![
            vec64(&[1.0, 2.0]),
            vec64(&[-2.0, 1.0]),
            vec64(&[2.0, -1.0]),
            vec64(&[-9.0, 0.0]),
        ],
    ]
}

#[test]
fn test_res_seq_identity() {
    init_logger();
    let mut rng = rng(40);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = SeqChecker::new(|| basic_seq(&vars), vars.clone());
    checker.full_check().unwrap();
}

#[test]
fn test_expand_reduce_round_trip() {
    let mut rng = rng(41);
    let packed: Var<f64> = random_var(&mut rng, 6);
    let b = Batch::new(packed.value(), vec![true, false, true, false]).unwrap();
    let supersets = [
        [true, false, true, false],
        [true, true, true, false],
        [true, false, true, true],
        [true, true, true, true],
    ];
    for p in supersets {
        let expanded = expand_batch(&b, &p).unwrap();
        assert_eq!(expanded.present, p.to_vec());
        assert_eq!(expanded.packed.len(), 3 * p.iter().filter(|&&x| x).count());
        let back = reduce_batch(&expanded, &b.present).unwrap();
        assert_eq!(back.packed, b.packed);
        assert_eq!(back.present, b.present);
    }
}

#[test]
fn test_reduce() {
    init_logger();
    let mut rng = rng(42);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = SeqChecker::new(
        || seq::reduce(&basic_seq(&vars)?, &[true, false, true, false]),
        vars.clone(),
    );
    checker.full_check().unwrap();

    let reduced = seq::reduce(&basic_seq(&vars).unwrap(), &[false, true, false, true]).unwrap();
    assert_eq!(reduced.len(), 2);
    assert_eq!(reduced.output()[1].present, vec![false, true, false, false]);
}

#[test]
fn test_reverse_self_inverse() {
    let seqs: Vec<Vec<Vector<f64>>> = vec![
        vec![vec64(&[1.0, -1.0]), vec64(&[2.0, -2.0]), vec64(&[3.0, -3.0])],
        vec![],
        vec![vec64(&[4.0, -4.0]), vec64(&[5.0, -5.0])],
        vec![vec64(&[6.0, -6.0])],
    ];
    let s = const_seq_list(&seqs).unwrap();
    let once = seq::reverse(&s);
    let reversed = separate_seqs(once.output());
    assert_eq!(reversed[0][0], vec64(&[3.0, -3.0]));
    assert!(reversed[1].is_empty());
    assert_eq!(reversed[2][1], vec64(&[4.0, -4.0]));

    let twice = seq::reverse(&once);
    assert_eq!(twice.output(), s.output());
    assert_eq!(separate_seqs(twice.output()), seqs);
}

#[test]
fn test_reverse_gradients() {
    init_logger();
    let mut rng = rng(43);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = SeqChecker::new(|| Ok(seq::reverse(&basic_seq(&vars)?)), vars.clone());
    checker.full_check().unwrap();
}

#[test]
fn test_tail_output() {
    let s = const_seq_list(&literal_seqs()).unwrap();
    let tail = seq::tail(&s).unwrap();
    assert_eq!(
        tail.output().as_slice(),
        &[2.0, -1.0, 0.0, 5.0, 9.0, 1.0, -9.0, 0.0]
    );
}

#[test]
fn test_tail_gradients() {
    init_logger();
    let presence = [
        [true, false, true, true],
        [true, false, true, false],
        [true, false, true, false],
        [true, false, true, false],
        [false, false, true, false],
        [false, false, true, false],
    ];
    let mut rng = rng(44);
    let vars: Vec<Var<f64>> = [18, 12, 12, 12, 6, 6]
        .into_iter()
        .map(|n| random_var(&mut rng, n))
        .collect();
    let checker = ResChecker::new(|| seq::tail(&seq_from_vars(&vars, &presence)?), vars.clone());
    checker.full_check().unwrap();
}

#[test]
fn test_sum_each_output() {
    let s = const_seq_list(&literal_seqs()).unwrap();
    let sums = seq::sum_each(&s).unwrap();
    assert_eq!(
        sums.output().as_slice(),
        &[1.0, 2.0, 1.0, 7.0, 9.0, 1.0, -8.0, 2.0]
    );
    let total = seq::sum(&s).unwrap();
    assert_eq!(total.output().as_slice(), &[3.0, 12.0]);
}

#[test]
fn test_sum_gradients() {
    init_logger();
    let mut rng = rng(45);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = ResChecker::new(|| seq::sum(&basic_seq(&vars)?), vars.clone());
    checker.full_check().unwrap();
    let checker = ResChecker::new(|| seq::sum_each(&basic_seq(&vars)?), vars.clone());
    checker.full_check().unwrap();
}

#[test]
fn test_sum_each_f32() {
    init_logger();
    let mut rng = rng(46);
    let vars = basic_seq_vars::<f32>(&mut rng);
    let checker = ResChecker::new(|| seq::sum_each(&basic_seq(&vars)?), vars.clone());
    checker.full_check().unwrap();
}

#[test]
fn test_map() {
    init_logger();
    let mut rng = rng(47);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let bias: Var<f64> = random_var(&mut rng, 6);
    let mut all = vars.clone();
    all.push(bias.clone());
    let checker = SeqChecker::new(
        || {
            seq::map(&basic_seq(&vars)?, |r, n| {
                let scaled = ops::scale(r, n as f64);
                ops::add_repeated(&ops::tanh(&scaled), &bias.to_res())
            })
        },
        all,
    );
    checker.full_check().unwrap();
}

#[test]
fn test_map_n() {
    init_logger();
    let mut rng = rng(48);
    let vars1 = basic_seq_vars::<f64>(&mut rng);
    let vars2 = basic_seq_vars::<f64>(&mut rng);
    let all: Vec<Var<f64>> = vars1.iter().chain(&vars2).cloned().collect();
    let checker = SeqChecker::new(
        || {
            let s1 = basic_seq(&vars1)?;
            let s2 = basic_seq(&vars2)?;
            seq::map_n(&[s1, s2], |rs, _| ops::mul(&rs[0], &ops::sin(&rs[1])))
        },
        all,
    );
    checker.full_check().unwrap();
}

#[test]
fn test_pool() {
    init_logger();
    let mut rng = rng(49);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = SeqChecker::new(
        || {
            let input = seq::map(&basic_seq(&vars)?, |r, _| Ok(ops::tanh(r)))?;
            seq::pool(&input, |p| {
                seq::map_n(&[p.clone(), p.clone()], |rs, _| {
                    ops::mul(&rs[0], &ops::exp(&rs[1]))
                })
            })
        },
        vars.clone(),
    );
    checker.full_check().unwrap();
}

#[test]
fn test_pool_to_vec() {
    init_logger();
    let mut rng = rng(50);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let checker = ResChecker::new(
        || {
            let input = seq::reverse(&basic_seq(&vars)?);
            seq::pool_to_vec(&input, |p| {
                let squares = seq::map(p, |r, _| Ok(ops::square(r)))?;
                let total = seq::sum(&squares)?;
                ops::add_repeated(&seq::tail(p)?, &total)
            })
        },
        vars.clone(),
    );
    checker.full_check().unwrap();
}

#[test]
fn test_pool_from_vec() {
    init_logger();
    let mut rng = rng(51);
    let vars = basic_seq_vars::<f64>(&mut rng);
    let v: Var<f64> = random_var(&mut rng, 6);
    let mut all = vars.clone();
    all.push(v.clone());
    let checker = SeqChecker::new(
        || {
            let s = basic_seq(&vars)?;
            seq::pool_from_vec(&ops::tanh(&v.to_res()), |p| {
                seq::map(&s, |x, _| ops::scale_add_repeated(x, p, p))
            })
        },
        all,
    );
    checker.full_check().unwrap();
}

#[test]
fn test_separate_round_trip() {
    let seqs = literal_seqs();
    let s = const_seq_list(&seqs).unwrap();
    assert_eq!(s.num_slots(), 5);
    assert_eq!(s.len(), 4);
    assert_eq!(separate_seqs(s.output()), seqs);
}
