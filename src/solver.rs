use log::{debug, info};
use serde::Serialize;
use std::fmt;

use crate::evaluator::Value;
use crate::token::{Expression, Operator, Token};

pub const DEFAULT_MAX_SOLUTIONS: usize = 10;

/// Bounds on the search. Past any of these the search gives up silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    /// Nodes visited before the search stops descending.
    pub max_attempts: u64,
    /// Expressions this long are never extended.
    pub max_expression_length: usize,
    /// Parentheses are only tried on expressions shorter than this.
    pub max_paren_length: usize,
    /// Operators and parentheses are skipped once this many number children exist.
    pub child_guard: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 200_000,
            max_expression_length: 11,
            max_paren_length: 7,
            child_guard: 10,
        }
    }
}

/// Outcome of one search. An empty solution list is a normal result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverResult {
    pub target: i64,
    /// Solutions in discovery order.
    pub solutions: Vec<Expression>,
    pub total_attempts: u64,
    pub solutions_found: usize,
}

impl fmt::Display for SolverResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for solution in &self.solutions {
            writeln!(f, "{} = {}", solution, self.target)?;
        }
        write!(
            f,
            "{} solution(s) found in {} attempts",
            self.solutions_found, self.total_attempts
        )
    }
}

/// A point in the search tree. Each node owns its own copies of the parent state.
#[derive(Debug)]
struct SearchNode {
    expression: Expression,
    used: Vec<i64>,
    /// One slot per input number, so duplicates are tracked separately.
    available: Vec<i64>,
    /// Cached value, present only for complete expressions.
    value: Option<Value>,
}

impl SearchNode {
    fn root(numbers: &[i64]) -> Self {
        Self::new(Expression::new(), Vec::new(), numbers.to_vec())
    }

    fn new(expression: Expression, used: Vec<i64>, available: Vec<i64>) -> Self {
        let value = expression.is_complete().then(|| expression.evaluate());
        Self {
            expression,
            used,
            available,
            value,
        }
    }

    /// Child consuming the number in slot `index`.
    fn with_number(&self, index: usize) -> Option<SearchNode> {
        let number = *self.available.get(index)?;
        let expression = self.expression.with_token(Token::Number(number))?;

        let mut used = self.used.clone();
        used.push(number);
        let mut available = self.available.clone();
        available.remove(index);

        Some(SearchNode::new(expression, used, available))
    }

    fn with_operator(&self, op: Operator) -> Option<SearchNode> {
        let expression = self.expression.with_token(Token::Operator(op))?;
        Some(SearchNode::new(
            expression,
            self.used.clone(),
            self.available.clone(),
        ))
    }

    /// Expands this node. Numbers come before operators and operators before
    /// parentheses, so shorter solutions are discovered first.
    fn children(&self, config: &SolverConfig) -> Vec<SearchNode> {
        if self.expression.len() >= config.max_expression_length {
            return Vec::new();
        }

        let mut children: Vec<SearchNode> = (0..self.available.len())
            .filter_map(|index| self.with_number(index))
            .collect();

        if children.len() < config.child_guard {
            children.extend(
                Operator::ARITHMETIC
                    .iter()
                    .filter_map(|&op| self.with_operator(op)),
            );

            if self.expression.len() < config.max_paren_length {
                children.extend(
                    [Operator::OpenParen, Operator::CloseParen]
                        .iter()
                        .filter_map(|&op| self.with_operator(op)),
                );
            }
        }

        children
    }
}

/// Accumulator scoped to a single `solve` call.
struct SearchContext<'a> {
    target: i64,
    max_solutions: usize,
    config: &'a SolverConfig,
    solutions: Vec<Expression>,
    attempts: u64,
}

impl SearchContext<'_> {
    fn exhausted(&self) -> bool {
        self.solutions.len() >= self.max_solutions || self.attempts > self.config.max_attempts
    }

    fn explore(&mut self, node: &SearchNode) {
        self.attempts += 1;

        if self.exhausted() {
            return;
        }

        if node.value.is_some_and(|value| value == self.target) {
            debug!("Found solution: {}", node.expression);
            self.solutions.push(node.expression.clone());
        }

        // A complete node can still be extended into further solutions.
        for child in node.children(self.config) {
            self.explore(&child);
            if self.solutions.len() >= self.max_solutions {
                break;
            }
        }
    }
}

/// Searches for up to `max_solutions` expressions over `numbers` that evaluate
/// to `target`, using the default search bounds.
pub fn solve(numbers: &[i64], target: i64, max_solutions: usize) -> SolverResult {
    solve_with_config(numbers, target, max_solutions, &SolverConfig::default())
}

/// Depth-first search over token sequences built from `numbers`.
///
/// Each number slot is used at most once. The search stops once
/// `max_solutions` solutions are collected or the attempt budget in `config`
/// is spent, so the result is never guaranteed to be exhaustive.
pub fn solve_with_config(
    numbers: &[i64],
    target: i64,
    max_solutions: usize,
    config: &SolverConfig,
) -> SolverResult {
    let mut context = SearchContext {
        target,
        max_solutions,
        config,
        solutions: Vec::new(),
        attempts: 0,
    };

    context.explore(&SearchNode::root(numbers));

    info!(
        "Search for {} with {:?}: {} solution(s) in {} attempts",
        target,
        numbers,
        context.solutions.len(),
        context.attempts
    );

    SolverResult {
        target,
        solutions_found: context.solutions.len(),
        solutions: context.solutions,
        total_attempts: context.attempts,
    }
}

/// Existence check: the first solution found, if any.
pub fn get_first_solution(numbers: &[i64], target: i64) -> Option<Expression> {
    solve(numbers, target, 1).solutions.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::format_expression;

    fn formatted(result: &SolverResult) -> Vec<String> {
        result
            .solutions
            .iter()
            .map(|solution| format_expression(solution.tokens()))
            .collect()
    }

    /// Checks the textual shape of a solution: no consecutive, leading or
    /// trailing operator symbols.
    fn assert_well_formed(solution: &str) {
        let words: Vec<&str> = solution.split(' ').collect();
        let is_operator = |w: &str| matches!(w, "+" | "-" | "×" | "÷");
        assert!(
            !words.first().is_some_and(|w| is_operator(w)),
            "Leading operator in {}",
            solution
        );
        assert!(
            !words.last().is_some_and(|w| is_operator(w)),
            "Trailing operator in {}",
            solution
        );
        assert!(
            !words
                .windows(2)
                .any(|pair| is_operator(pair[0]) && is_operator(pair[1])),
            "Consecutive operators in {}",
            solution
        );
    }

    fn assert_uses_available_numbers(numbers: &[i64], solution: &Expression) {
        let mut remaining = numbers.to_vec();
        for n in solution.numbers() {
            let position = remaining.iter().position(|&x| x == n);
            assert!(
                position.is_some(),
                "{} uses {} more often than {:?} allows",
                solution,
                n,
                numbers
            );
            if let Some(position) = position {
                remaining.remove(position);
            }
        }
    }

    #[test]
    fn test_result_structure() {
        let result = solve(&[1, 2], 3, DEFAULT_MAX_SOLUTIONS);
        assert_eq!(result.target, 3);
        assert_eq!(result.solutions_found, result.solutions.len());
        assert!(result.total_attempts > 0);
    }

    #[test]
    fn test_impossible_target() {
        let result = solve(&[1, 2], 100, DEFAULT_MAX_SOLUTIONS);
        assert_eq!(result.solutions_found, 0);
        assert!(result.solutions.is_empty());
        assert!(result.total_attempts > 0);
        assert_eq!(get_first_solution(&[1, 2], 100), None);
    }

    #[test]
    fn test_simple_addition() {
        let result = solve(&[2, 3], 5, DEFAULT_MAX_SOLUTIONS);
        assert!(result.solutions_found > 0);
        assert_eq!(formatted(&result)[0], "2 + 3");

        let first = get_first_solution(&[2, 3], 5).map(|s| s.to_string());
        assert_eq!(first.as_deref(), Some("2 + 3"));
    }

    #[test]
    fn test_single_number_solution_first() {
        let first = get_first_solution(&[7, 3, 1], 7).map(|s| s.to_string());
        assert_eq!(first.as_deref(), Some("7"));
    }

    #[test]
    fn test_multiple_solutions() {
        let result = solve(&[1, 2, 3], 3, 10);
        assert!(result.solutions_found > 1);
        let solutions = formatted(&result);
        assert!(solutions.contains(&"3".to_string()), "{:?}", solutions);
        assert!(solutions
            .iter()
            .any(|s| s.contains("1 + 2") || s.contains("2 + 1")));
    }

    #[test]
    fn test_each_operation() {
        let cases = [
            (vec![5, 2], 3, "5 - 2"),
            (vec![2, 3], 6, "2 × 3"),
            (vec![6, 2], 3, "6 ÷ 2"),
        ];
        for (numbers, target, expected) in cases {
            let result = solve(&numbers, target, DEFAULT_MAX_SOLUTIONS);
            assert!(
                formatted(&result).contains(&expected.to_string()),
                "Expected {} among {:?}",
                expected,
                formatted(&result)
            );
        }
    }

    #[test]
    fn test_parenthesized_solution() {
        let result = solve(&[1, 2, 3], 9, 20);
        assert!(formatted(&result)
            .iter()
            .any(|s| s.contains('(') && s.contains(')') && s.contains('×')));
    }

    #[test]
    fn test_duplicate_numbers() {
        let result = solve(&[2, 2, 2], 6, DEFAULT_MAX_SOLUTIONS);
        assert!(result.solutions_found > 0);
        assert!(formatted(&result).contains(&"2 + 2 + 2".to_string()));
        for solution in &result.solutions {
            assert_uses_available_numbers(&[2, 2, 2], solution);
        }
    }

    #[test]
    fn test_max_solutions_respected() {
        let result = solve(&[1, 2, 3, 4], 5, 2);
        assert!(result.solutions.len() <= 2);
        assert!(result.solutions_found <= 2);

        let result = solve(&[1, 2, 3], 3, 0);
        assert_eq!(result.solutions_found, 0);
    }

    #[test]
    fn test_single_number_puzzle() {
        let result = solve(&[42], 42, DEFAULT_MAX_SOLUTIONS);
        assert_eq!(result.solutions_found, 1);
        assert_eq!(formatted(&result), vec!["42"]);
    }

    #[test]
    fn test_empty_numbers() {
        let result = solve(&[], 5, DEFAULT_MAX_SOLUTIONS);
        assert_eq!(result.solutions_found, 0);
        assert!(result.solutions.is_empty());
        assert!(result.total_attempts > 0);
    }

    #[test]
    fn test_zero_target() {
        let result = solve(&[4, 4], 0, DEFAULT_MAX_SOLUTIONS);
        assert!(formatted(&result).contains(&"4 - 4".to_string()));
    }

    #[test]
    fn test_attempt_limit() {
        // Pending siblings on the unwinding path are still counted once each.
        let result = solve(&[1, 2, 3, 4, 5, 6], 999, 1);
        assert!(result.total_attempts <= 200_100);

        let config = SolverConfig {
            max_attempts: 50,
            ..SolverConfig::default()
        };
        let result = solve_with_config(&[1, 2, 3, 4, 5, 6], 999, 1, &config);
        assert!(result.total_attempts > 50);
        assert!(result.total_attempts <= 150);
        assert_eq!(result.solutions_found, 0);
    }

    #[test]
    fn test_solutions_are_well_formed() {
        let cases: Vec<(Vec<i64>, i64, usize)> = vec![
            (vec![10, 5, 2], 7, 10),
            (vec![1, 2, 3], 9, 20),
            (vec![2, 4, 6, 8], 14, 10),
            (vec![25, 50, 4], 104, 5),
            (vec![1, 2, 3, 4, 5], 10, 5),
        ];
        for (numbers, target, max_solutions) in cases {
            let result = solve(&numbers, target, max_solutions);
            for solution in &result.solutions {
                assert!(solution.is_complete());
                assert_eq!(solution.evaluate(), target, "{}", solution);
                assert_well_formed(&solution.to_string());
                assert_uses_available_numbers(&numbers, solution);
            }
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let first = solve(&[25, 50, 4, 7, 2], 314, 5);
        let second = solve(&[25, 50, 4, 7, 2], 314, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_typical_countdown_puzzles() {
        let result = solve(&[2, 4, 6, 8], 14, 10);
        assert!(result.solutions_found > 0);

        let result = solve(&[25, 50, 4], 104, 5);
        assert!(result.total_attempts < 50_000);

        let result = solve(&[1, 2, 3, 4, 5], 10, 5);
        assert!(result.solutions_found > 0);
    }

    #[test]
    fn test_six_number_search_is_fast() {
        // Unsolvable within the budget, so the whole attempt cap is spent.
        let start = std::time::Instant::now();
        let result = solve(&[25, 50, 75, 100, 3, 6], 952, 5);
        let elapsed = start.elapsed();
        println!("Six-number search took: {:?}", elapsed);
        assert!(result.total_attempts > 200_000);
        assert!(
            elapsed < std::time::Duration::from_secs(5),
            "Search took {:?}",
            elapsed
        );
    }

    #[test]
    fn test_hard_puzzle_does_not_crash() {
        let result = solve(&[25, 50, 75, 100, 3, 6], 952, 5);
        assert!(result.total_attempts > 0);

        let result = solve(&[1, 2, 3, 4, 5, 6], 100, 50);
        assert!(result.total_attempts > 100);
    }

    #[test]
    fn test_division_by_zero_never_matches() {
        // 5 ÷ 0 is infinite; only finite candidates can equal the target.
        let result = solve(&[5, 0], 5, 50);
        for solution in &result.solutions {
            assert_eq!(solution.evaluate(), 5);
        }
        assert!(formatted(&result).contains(&"5".to_string()));
    }

    #[test]
    fn test_display() {
        let result = solve(&[2, 3], 5, 1);
        assert_eq!(
            result.to_string(),
            format!("2 + 3 = 5\n1 solution(s) found in {} attempts", result.total_attempts)
        );
    }

    #[test]
    fn test_children_order() {
        let root = SearchNode::root(&[3, 4]);
        let children = root.children(&SolverConfig::default());
        let rendered: Vec<String> = children.iter().map(|c| c.expression.to_string()).collect();
        assert_eq!(rendered, vec!["3", "4", "("]);

        let three = &children[0];
        assert_eq!(three.used, vec![3]);
        assert_eq!(three.available, vec![4]);
        assert_eq!(three.value, Some(Value::Integer(3)));

        let rendered: Vec<String> = three
            .children(&SolverConfig::default())
            .iter()
            .map(|c| c.expression.to_string())
            .collect();
        assert_eq!(rendered, vec!["3 +", "3 -", "3 ×", "3 ÷"]);
    }

    #[test]
    fn test_length_cap_stops_expansion() {
        let config = SolverConfig {
            max_expression_length: 1,
            ..SolverConfig::default()
        };
        let root = SearchNode::root(&[1, 2]);
        let child = root.with_number(0);
        assert!(child.is_some_and(|c| c.children(&config).is_empty()));
    }
}
