//! Matrix products, with and without transposes, checked against
//! reference values and finite differences.

#![cfg(feature = "gradcheck")]

mod common;

use approx::assert_relative_eq;
use common::{init_logger, random_var, rng};
use vecdiff::gradcheck::ResChecker;
use vecdiff::ops::{self, Matrix, MatrixBatch};
use vecdiff::{Var, Vector};

const MAT_2X3: [f64; 6] = [
    0.437363817383076, 0.403871997911220, -1.049530750558118,
    -0.331470568323395, 0.116345399360686, 0.511644461073244,
];

const MAT_3X4: [f64; 12] = [
    0.3562578410664004, 0.7578617982451722, -0.1913118498264184, 1.8452133159741528,
    -0.8814597466441325, 0.9602627040929411, -0.0130910013786673, 0.0322210430457061,
    0.3242423917388176, -1.2307395594558537, -0.1558666924323481, 0.4826032047570410,
];

const MAT_2X4: [f64; 8] = [
    1.852319956790981, 1.385962232018235, -0.849984774797785, -0.583428448655087,
    -1.646747420778373, -1.196860898000198, 0.787446463442505, -1.774956170059281,
];

struct Case {
    trans1: bool,
    trans2: bool,
    left: (&'static [f64], usize, usize),
    right: (&'static [f64], usize, usize),
    rows: usize,
    cols: usize,
    expected: &'static [f64],
}

const CASES: [Case; 4] = [
    Case {
        trans1: false,
        trans2: false,
        left: (&MAT_2X3, 2, 3),
        right: (&MAT_3X4, 3, 4),
        rows: 2,
        cols: 4,
        expected: &[
            -0.5404849803784302, 2.0109835595282268, 0.0746269168633727, 0.3135358130797813,
            -0.0547459515133194, -0.7691878117953630, -0.0178571600432873, -0.3609638797927409,
        ],
    },
    Case {
        trans1: false,
        trans2: true,
        left: (&MAT_3X4, 3, 4),
        right: (&MAT_2X4, 2, 4),
        rows: 3,
        cols: 2,
        expected: &[
            0.7963335554421418, -4.9195424331402533,
            -0.3095291604278108, 0.2347412800711330,
            -1.2542380174029129, -0.0402574796664327,
        ],
    },
    Case {
        trans1: true,
        trans2: false,
        left: (&MAT_2X3, 2, 3),
        right: (&MAT_2X4, 2, 4),
        rows: 3,
        cols: 4,
        expected: &[
            1.355986030767449, 1.002893894608438, -0.632767912584587, 0.333175236964991,
            0.556508675403358, 0.420502076517676, -0.251669275927321, -0.442138397649835,
            -2.786615951152524, -2.066977230752253, 1.294977780068564, -0.295820395444677,
        ],
    },
    Case {
        trans1: true,
        trans2: true,
        left: (&MAT_3X4, 3, 4),
        right: (&MAT_2X3, 2, 3),
        rows: 4,
        cols: 2,
        expected: &[
            -0.5404849803784301, -0.0547459515133194,
            2.0109835595282268, -0.7691878117953630,
            0.0746269168633727, -0.0178571600432873,
            0.3135358130797812, -0.3609638797927409,
        ],
    },
];

fn matrix(v: &Var<f64>, rows: usize, cols: usize) -> Result<Matrix<f64>, vecdiff::DiffError> {
    Matrix::new(v.to_res(), rows, cols)
}

#[test]
fn test_mat_mul_reference_outputs() {
    for case in &CASES {
        let (ld, lr, lc) = case.left;
        let (rd, rr, rc) = case.right;
        let left = Var::new(Vector::from_f64s(ld));
        let right = Var::new(Vector::from_f64s(rd));
        let product = ops::mat_mul(
            case.trans1,
            case.trans2,
            &matrix(&left, lr, lc).unwrap(),
            &matrix(&right, rr, rc).unwrap(),
        )
        .unwrap();
        assert_eq!((product.rows, product.cols), (case.rows, case.cols));
        let out = product.data.output();
        assert_eq!(out.len(), case.expected.len());
        for (a, b) in out.as_slice().iter().zip(case.expected) {
            assert_relative_eq!(*a, *b, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_mat_mul_gradients() {
    init_logger();
    for case in &CASES {
        let (ld, lr, lc) = case.left;
        let (rd, rr, rc) = case.right;
        let left = Var::new(Vector::from_f64s(ld));
        let right = Var::new(Vector::from_f64s(rd));
        let checker = ResChecker::new(
            || {
                let p = ops::mat_mul(
                    case.trans1,
                    case.trans2,
                    &matrix(&left, lr, lc)?,
                    &matrix(&right, rr, rc)?,
                )?;
                Ok(p.data)
            },
            vec![left.clone(), right.clone()],
        );
        checker.full_check().unwrap();
    }
}

#[test]
fn test_mat_mul_of_composites() {
    init_logger();
    let mut rng = rng(30);
    let a: Var<f64> = random_var(&mut rng, 6);
    let b: Var<f64> = random_var(&mut rng, 12);
    let checker = ResChecker::new(
        || {
            let m1 = Matrix::new(ops::tanh(&a.to_res()), 3, 2)?;
            let m2 = Matrix::new(ops::sin(&b.to_res()), 4, 3)?;
            Ok(ops::mat_mul(true, true, &m1, &m2)?.data)
        },
        vec![a.clone(), b.clone()],
    );
    checker.full_check().unwrap();
}

#[test]
fn test_batched_mat_mul() {
    init_logger();
    let mut rng = rng(31);
    let a: Var<f64> = random_var(&mut rng, 3 * 2 * 3);
    let b: Var<f64> = random_var(&mut rng, 3 * 3 * 4);
    for (t1, t2) in [(false, false), (true, false), (false, true), (true, true)] {
        let checker = ResChecker::new(
            || {
                let (ar, ac) = if t1 { (3, 2) } else { (2, 3) };
                let (br, bc) = if t2 { (4, 3) } else { (3, 4) };
                let m1 = MatrixBatch::new(a.to_res(), 3, ar, ac)?;
                let m2 = MatrixBatch::new(b.to_res(), 3, br, bc)?;
                Ok(ops::batched_mat_mul(t1, t2, &m1, &m2)?.data)
            },
            vec![a.clone(), b.clone()],
        );
        checker.full_check().unwrap();
    }
}

#[test]
fn test_sums_and_transpose() {
    init_logger();
    let mut rng = rng(32);
    let v: Var<f64> = random_var(&mut rng, 12);

    let checker = ResChecker::new(|| Ok(ops::sum_rows(&matrix(&v, 3, 4)?)), vec![v.clone()]);
    checker.full_check().unwrap();

    let checker = ResChecker::new(|| Ok(ops::sum_cols(&matrix(&v, 3, 4)?)), vec![v.clone()]);
    checker.full_check().unwrap();

    let checker = ResChecker::new(
        || {
            let t = ops::transpose(&Matrix::new(ops::exp(&v.to_res()), 3, 4)?);
            assert_eq!((t.rows, t.cols), (4, 3));
            Ok(t.data)
        },
        vec![v.clone()],
    );
    checker.full_check().unwrap();
}
