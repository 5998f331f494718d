use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use repgrid_measures::{
    bias, pvaff, variability, BasicOptions, Construct, Element, Grid, IndexError, Scale,
};

fn grid(min: f64, max: f64, rows: &[Vec<f64>]) -> Grid {
    Grid::from_rows(
        Scale::new(min, max).unwrap(),
        (0..rows.len())
            .map(|i| Construct::new(format!("left {i}"), format!("right {i}")))
            .collect(),
        (0..rows[0].len())
            .map(|j| Element::new(format!("element {j}")))
            .collect(),
        rows,
    )
    .unwrap()
}

fn random_rows(rng: &mut StdRng, constructs: usize, elements: usize, max: u32) -> Vec<Vec<f64>> {
    (0..constructs)
        .map(|_| {
            (0..elements)
                .map(|_| rng.gen_range(1..=max) as f64)
                .collect()
        })
        .collect()
}

fn unrounded() -> BasicOptions {
    BasicOptions {
        digits: None,
        ..BasicOptions::default()
    }
}

#[test]
fn bias_and_variability_are_non_negative() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..25 {
        let g = grid(1.0, 5.0, &random_rows(&mut rng, 4, 6, 5));
        assert!(bias(&g, &unrounded()).unwrap() >= 0.0);
        assert!(variability(&g, &unrounded()).unwrap() >= 0.0);
    }
}

#[test]
fn bias_and_variability_are_invariant_under_affine_rescaling() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..25 {
        let rows = random_rows(&mut rng, 5, 7, 5);
        let stretched: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| r.iter().map(|v| 2.0 * v - 1.0).collect())
            .collect();
        let g = grid(1.0, 5.0, &rows);
        let h = grid(1.0, 9.0, &stretched);
        let b = bias(&g, &unrounded()).unwrap();
        let b2 = bias(&h, &unrounded()).unwrap();
        assert!((b - b2).abs() < 1e-9, "bias {b} vs {b2}");
        let v = variability(&g, &unrounded()).unwrap();
        let v2 = variability(&h, &unrounded()).unwrap();
        assert!((v - v2).abs() < 1e-9, "variability {v} vs {v2}");
    }
}

#[test]
fn default_options_round_to_two_digits() {
    let g = grid(1.0, 7.0, &[vec![1.0, 2.0, 6.0], vec![3.0, 7.0, 5.0]]);
    let rounded = bias(&g, &BasicOptions::default()).unwrap();
    assert_eq!(rounded, (rounded * 100.0).round() / 100.0);
}

#[test]
fn basic_indices_need_two_constructs() {
    let g = grid(1.0, 5.0, &[vec![1.0, 2.0, 3.0]]);
    assert!(matches!(
        bias(&g, &unrounded()),
        Err(IndexError::InsufficientData { required: 2, found: 1, .. })
    ));
}

#[test]
fn pvaff_stays_between_one_over_n_and_one() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut checked = 0;
    for _ in 0..40 {
        let g = grid(1.0, 7.0, &random_rows(&mut rng, 5, 8, 7));
        let value = pvaff(&g).unwrap();
        if value.is_nan() {
            continue;
        }
        assert!(value >= 1.0 / 5.0 - 1e-9 && value <= 1.0 + 1e-9, "pvaff {value}");
        checked += 1;
    }
    assert!(checked > 0);
}

#[test]
fn pvaff_of_a_single_construct_is_one() {
    let g = grid(1.0, 5.0, &[vec![1.0, 3.0, 5.0, 2.0]]);
    assert!((pvaff(&g).unwrap() - 1.0).abs() < 1e-12);
}
