use numerair::solver::{
    Bisection, Brent, FalsePosition, Newton, NewtonSafe, Objective, Ridder, Secant, Solver1D,
    WithDerivative,
};

fn cubic(x: f64) -> f64 {
    x * x * x - x - 2.0
}

const ROOT: f64 = 1.521379706804568;

#[test]
fn brent_on_the_reference_cubic() {
    let solver = Brent::default();
    let x = solver
        .solve_bracketed(&Objective(cubic), 1e-8, 1.5, 1.0, 2.0)
        .unwrap();
    assert!((x - ROOT).abs() < 1e-8, "root {x}");
    assert!(cubic(x).abs() < 1e-7);
}

#[test]
fn every_variant_honours_the_contract() {
    // f continuous with f(a)·f(b) ≤ 0 ⇒ the root is found inside [a, b]
    // with |f(x*)| small.
    let solvers: Vec<(&str, Box<dyn Solver1D>)> = vec![
        ("brent", Box::new(Brent::default())),
        ("bisection", Box::new(Bisection::default())),
        ("ridder", Box::new(Ridder::default())),
        ("secant", Box::new(Secant::default())),
        ("false position", Box::new(FalsePosition::default())),
    ];
    let cases: Vec<(fn(f64) -> f64, f64, f64)> = vec![
        (cubic, 1.0, 2.0),
        (|x| x.sin() - 0.5, 0.0, 1.5),
        (|x| x.exp() - 2.0, 0.0, 2.0),
    ];
    for (name, solver) in &solvers {
        for &(f, a, b) in &cases {
            let guess = 0.5 * (a + b);
            let x = solver
                .solve_bracketed(&Objective(f), 1e-9, guess, a, b)
                .unwrap_or_else(|e| panic!("{name} failed: {e}"));
            assert!(x >= a && x <= b, "{name} left the bracket: {x}");
            assert!(f(x).abs() < 1e-7, "{name} returned f({x}) = {}", f(x));
        }
    }
}

#[test]
fn newton_variants_with_analytic_derivative() {
    let f = WithDerivative {
        f: cubic,
        df: |x: f64| 3.0 * x * x - 1.0,
    };
    let newton = Newton::default().solve(&f, 1e-12, 1.3, 0.4).unwrap();
    assert!((newton - ROOT).abs() < 1e-10);
    let safe = NewtonSafe::default()
        .solve_bracketed(&f, 1e-12, 1.5, 1.0, 2.0)
        .unwrap();
    assert!((safe - ROOT).abs() < 1e-10);
}

#[test]
fn bracketing_expands_from_a_distant_guess() {
    let solver = Brent::default();
    let x = solver.solve(&Objective(cubic), 1e-10, -3.0, 0.25).unwrap();
    assert!((x - ROOT).abs() < 1e-9);
}

#[test]
fn exhausted_budget_reports_the_algorithm_and_the_cap() {
    let solver = Brent::default();
    let err = solver
        .solve(&Objective(|x: f64| 1.0 + x * x), 1e-10, 0.0, 0.01)
        .unwrap_err()
        .to_string();
    assert!(
        err.contains("Brent: maximum number of function evaluations (100) exceeded"),
        "unexpected message: {err}"
    );
}
