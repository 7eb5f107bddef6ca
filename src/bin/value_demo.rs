use markov_value::mdp::{
    collapse, cross_check, exact_evaluate, history, simulate, EvaluationConfig,
    MarkovDecisionProcess, MarkovRewardProcess, Policy, PolicyWalk, RewardWalk, SimulationConfig,
    AGREEMENT_TOLERANCE,
};
use ndarray::array;

fn main() -> markov_value::Result<()> {
    let states = ["Home", "Work", "Gym", "Bar"];

    println!("== Markov reward process");
    let mrp = MarkovRewardProcess::new(
        states,
        array![
            [0.10, 0.60, 0.20, 0.10],
            [0.20, 0.60, 0.10, 0.10],
            [0.30, 0.50, 0.10, 0.10],
            [0.40, 0.40, 0.05, 0.15],
        ],
        array![1.0, 5.0, 3.0, 0.0],
        0.9,
    )?;
    report(&mrp)?;

    let trajectory = simulate(
        &RewardWalk::new(&mrp)?,
        &SimulationConfig {
            start_state: 0,
            steps: 10,
            seed: 42,
        },
    )?;
    println!("\nSample trajectory:\n{}", trajectory.render(mrp.states()));

    println!("\nValue estimates by iteration:");
    for (k, v) in history(&mrp, 30).iter().enumerate().step_by(5) {
        println!("  k={:2} {:?}", k, v.to_vec());
    }

    println!("\n== Markov decision process under a 70/30 policy");
    let mdp = MarkovDecisionProcess::new(
        states,
        ["Primary", "Alternate"],
        array![
            [[0.05, 0.80, 0.10, 0.05], [0.60, 0.00, 0.00, 0.40]],
            [[0.10, 0.70, 0.15, 0.05], [0.60, 0.00, 0.20, 0.20]],
            [[0.05, 0.30, 0.50, 0.15], [0.60, 0.10, 0.00, 0.30]],
            [[0.40, 0.10, 0.00, 0.50], [0.80, 0.10, 0.00, 0.10]],
        ],
        array![1.0, 5.0, 3.0, 0.0],
        0.9,
    )?;
    let policy = Policy::from_row(mdp.num_states(), &[0.7, 0.3])?;
    report(&collapse(&mdp, &policy)?)?;

    let trajectory = simulate(
        &PolicyWalk::new(&mdp, &policy)?,
        &SimulationConfig {
            start_state: 0,
            steps: 10,
            seed: 1,
        },
    )?;
    println!(
        "\nSample trajectory following the policy:\n{}",
        trajectory.render(mdp.states())
    );

    Ok(())
}

fn report(mrp: &MarkovRewardProcess) -> markov_value::Result<()> {
    let exact = exact_evaluate(mrp)?;
    println!("Exact state values:");
    for (label, v) in mrp.states().iter().zip(exact.iter()) {
        println!("  V({}) = {:0.3}", label, v);
    }
    let evaluation = cross_check(mrp, &EvaluationConfig::default(), AGREEMENT_TOLERANCE)?;
    println!(
        "Iterative evaluation converged after {} iterations",
        evaluation.iterations
    );
    Ok(())
}
