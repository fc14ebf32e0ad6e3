use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{info, warn};

use std::time::Instant;

use countdown::{
    evaluate, generate_puzzle, solve_with_config, tokenize, Expression, Puzzle, SolverConfig,
    DEFAULT_LARGE_COUNT, DEFAULT_MAX_SOLUTIONS,
};

//
// Command-line definitions
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Log level.
    #[arg(short, long, value_enum, global = true, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find expressions over the given numbers that hit the target.
    Solve {
        /// Numbers available on the board.
        #[arg(required = true)]
        numbers: Vec<i64>,

        /// Target value.
        #[arg(short, long)]
        target: i64,

        /// Stop after this many solutions.
        #[arg(long, default_value_t = DEFAULT_MAX_SOLUTIONS)]
        max_solutions: usize,

        /// Nodes to visit before giving up.
        #[arg(long, default_value_t = SolverConfig::default().max_attempts)]
        max_attempts: u64,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Evaluate an expression such as "(25 + 50) × 3".
    Eval {
        /// Expression text; `*`, `x` and `/` may stand in for `×` and `÷`.
        expression: String,
    },

    /// Generate solvable puzzles.
    Generate {
        /// Number of puzzles to generate.
        #[arg(long, default_value = "1")]
        count: usize,

        /// How many numbers come from the large pool.
        #[arg(long, default_value_t = DEFAULT_LARGE_COUNT)]
        large: usize,

        /// Print one JSON object per line.
        #[arg(long)]
        json: bool,
    },
}

/// Initialize logging based on the provided log level.
fn init_logging(log_level: LogLevel) {
    env_logger::Builder::from_default_env()
        .filter_level(log_level.to_level_filter())
        .init();
}

//
// Subcommand runners
//

fn run_solve(
    numbers: &[i64],
    target: i64,
    max_solutions: usize,
    max_attempts: u64,
    json: bool,
) -> Result<()> {
    let config = SolverConfig {
        max_attempts,
        ..SolverConfig::default()
    };
    let result = solve_with_config(numbers, target, max_solutions, &config);

    if json {
        let json = serde_json::to_string(&result).context("Failed to serialize result")?;
        println!("{}", json);
    } else {
        println!("{}", result);
    }

    if result.solutions_found == 0 {
        warn!("No solution found for {} with {:?}", target, numbers);
    }
    Ok(())
}

fn run_eval(text: &str) -> Result<()> {
    let tokens = tokenize(text).with_context(|| format!("Invalid expression: {}", text))?;

    if let Err(e) = Expression::try_from(tokens.clone()) {
        warn!("Evaluating a malformed expression: {}", e);
    }

    println!("{}", evaluate(&tokens));
    Ok(())
}

fn print_puzzle(puzzle: &Puzzle) {
    println!("Numbers: {}", puzzle.numbers.iter().join(" "));
    println!("Target:  {}", puzzle.target);
    match &puzzle.solution {
        Some(solution) => println!("Example: {}", solution),
        None => println!("Example: unknown"),
    }
}

fn run_generate(count: usize, large: usize, json: bool) -> Result<()> {
    let pb = if count > 1 {
        let pb = ProgressBar::new(count as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {wide_msg}")
                .context("Invalid progress bar template")?
                .progress_chars("##-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut fallbacks = 0;
    for _ in 0..count {
        let puzzle = generate_puzzle(large);
        if puzzle.fallback {
            fallbacks += 1;
        }

        if json {
            let line = serde_json::to_string(&puzzle).context("Failed to serialize puzzle")?;
            pb.suspend(|| println!("{}", line));
        } else {
            pb.suspend(|| print_puzzle(&puzzle));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if fallbacks > 0 {
        warn!("{} of {} puzzles used the fallback board", fallbacks, count);
    }
    Ok(())
}

//
// Main
//
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level);

    let start_time = Instant::now();
    match args.command {
        Command::Solve {
            numbers,
            target,
            max_solutions,
            max_attempts,
            json,
        } => run_solve(&numbers, target, max_solutions, max_attempts, json)?,
        Command::Eval { expression } => run_eval(&expression)?,
        Command::Generate { count, large, json } => run_generate(count, large, json)?,
    }
    info!("Finished in {:?}", start_time.elapsed());

    Ok(())
}
