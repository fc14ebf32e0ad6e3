use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod evaluator;
pub mod solver;
pub mod token;

pub use evaluator::{evaluate, Value};
pub use solver::{
    get_first_solution, solve, solve_with_config, SolverConfig, SolverResult,
    DEFAULT_MAX_SOLUTIONS,
};
pub use token::{format_expression, tokenize, Expression, ExpressionError, Operator, Token};

pub const LARGE_NUMBERS: [i64; 4] = [25, 50, 75, 100];
pub const SMALL_NUMBERS: [i64; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
pub const NUMBER_COUNT: usize = 6;
pub const DEFAULT_LARGE_COUNT: usize = 2;
pub const MIN_TARGET: i64 = 101;
pub const MAX_TARGET: i64 = 999;
pub const MAX_GENERATION_ATTEMPTS: usize = 50;

/// Board used when no solvable board turns up; 25 × 5 + 2 = 127.
pub const FALLBACK_NUMBERS: [i64; NUMBER_COUNT] = [25, 50, 2, 3, 4, 5];
pub const FALLBACK_TARGET: i64 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
    pub numbers: Vec<i64>,
    pub target: i64,
    pub solution: Option<Expression>,
    /// Boards drawn, including the accepted one.
    pub attempts: usize,
    pub fallback: bool,
}

impl Puzzle {
    pub fn new(
        numbers: Vec<i64>,
        target: i64,
        solution: Option<Expression>,
        attempts: usize,
    ) -> Self {
        Self {
            numbers,
            target,
            solution,
            attempts,
            fallback: false,
        }
    }
}

/// Draws a six-number board: `large_count` numbers from the large pool and the
/// rest from the small pool, both with replacement.
pub fn generate_numbers<R: Rng + ?Sized>(rng: &mut R, large_count: usize) -> Vec<i64> {
    let large_count = large_count.min(NUMBER_COUNT);
    (0..NUMBER_COUNT)
        .map(|i| {
            let pool: &[i64] = if i < large_count {
                &LARGE_NUMBERS
            } else {
                &SMALL_NUMBERS
            };
            pool[rng.random_range(0..pool.len())]
        })
        .collect()
}

/// Generates a random target value in the range MIN_TARGET..=MAX_TARGET.
pub fn generate_target<R: Rng + ?Sized>(rng: &mut R) -> i64 {
    rng.random_range(MIN_TARGET..=MAX_TARGET)
}

/// Draws boards until the solver can reach the target, giving up after
/// `MAX_GENERATION_ATTEMPTS` draws and returning the fallback board.
pub fn generate_puzzle_with<R: Rng + ?Sized>(rng: &mut R, large_count: usize) -> Puzzle {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let numbers = generate_numbers(rng, large_count);
        let target = generate_target(rng);

        match get_first_solution(&numbers, target) {
            Some(solution) => {
                debug!(
                    "Generated solvable puzzle on attempt {}: {:?} -> {}",
                    attempt, numbers, target
                );
                return Puzzle::new(numbers, target, Some(solution), attempt);
            }
            None => debug!(
                "Rejecting unsolvable puzzle (attempt {}): {:?} -> {}",
                attempt, numbers, target
            ),
        }
    }

    debug!(
        "Could not find solvable puzzle after {} attempts, using fallback",
        MAX_GENERATION_ATTEMPTS
    );
    let numbers = FALLBACK_NUMBERS.to_vec();
    let solution = get_first_solution(&numbers, FALLBACK_TARGET);
    Puzzle {
        fallback: true,
        ..Puzzle::new(numbers, FALLBACK_TARGET, solution, MAX_GENERATION_ATTEMPTS)
    }
}

/// Generates a solvable puzzle using the thread-local random number generator.
pub fn generate_puzzle(large_count: usize) -> Puzzle {
    generate_puzzle_with(&mut rand::rng(), large_count)
}
