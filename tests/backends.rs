use approx::assert_relative_eq;
use radau::prelude::*;

mod common;
use common::*;

fn configs() -> Vec<Config> {
    let base = || Config::builder().rtol(1e-6).atol(1e-10).nmax(10_000);
    vec![
        base().backend("dense").build().unwrap(),
        base().backend("sparse").build().unwrap(),
        base()
            .backend("sparse")
            .parallel(ParallelContext::new(2).unwrap())
            .build()
            .unwrap(),
    ]
}

#[test]
fn robertson_agrees_across_backends() {
    let reference = [0.7158270687, 9.185534764e-6, 0.2841637457];
    for conf in configs() {
        let kind = conf.ls_kind();
        let mut solver = Solver::new(conf, 3, &Robertson).unwrap();
        let mut y = vec![1.0, 0.0, 0.0];
        solver.solve(&mut y, 0.0, 40.0).unwrap();

        assert_relative_eq!(y[0], reference[0], max_relative = 1e-4);
        assert_relative_eq!(y[1], reference[1], max_relative = 1e-3);
        assert_relative_eq!(y[2], reference[2], max_relative = 1e-4);
        assert_relative_eq!(y.iter().sum::<Float>(), 1.0, epsilon = 1e-9);

        let stat = solver.stat();
        assert_eq!(stat.ls_kind, kind.name());
        assert_stat_invariants(stat);
    }
}

#[test]
fn heat_equation_decays_at_the_lowest_mode_rate() {
    let problem = Heat { n: 40 };
    let xf = 0.1;
    let decay = (problem.lambda() * xf).exp();
    let mut finals = Vec::new();
    for conf in configs() {
        let mut solver = Solver::new(conf, problem.n, &problem).unwrap();
        let mut y = problem.initial();
        solver.solve(&mut y, 0.0, xf).unwrap();
        for (yi, y0) in y.iter().zip(problem.initial()) {
            assert!((yi - y0 * decay).abs() < 1e-5);
        }
        assert_stat_invariants(solver.stat());
        finals.push(y);
    }
    for y in &finals[1..] {
        for (a, b) in y.iter().zip(&finals[0]) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}

#[test]
fn parallel_context_is_shared_between_solvers() {
    let ctx = ParallelContext::new(3).unwrap();
    let problem = Heat { n: 12 };
    let mut results = Vec::new();
    for _ in 0..2 {
        let conf = Config::builder()
            .backend("sparse")
            .parallel(ctx.clone())
            .build()
            .unwrap();
        let mut solver = Solver::new(conf, problem.n, &problem).unwrap();
        let mut y = problem.initial();
        solver.solve(&mut y, 0.0, 0.05).unwrap();
        results.push((y, solver.stat().clone()));
    }
    assert_eq!(results[0], results[1]);
}
