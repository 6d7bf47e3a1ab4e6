//! Exit challenges: friction between "stop the session" and the session
//! actually stopping.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_PHRASE: &str = "I want to stop focusing";
pub const COUNTDOWN_CONFIRMATIONS: u32 = 3;

const OPERAND_RANGE: (i32, i32) = (10, 50);
const OPERATOR_RANGE: (i32, i32) = (0, 2);

/// Which challenge `initiate` sets up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChallengeType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "phrase")]
    TypePhrase,
    #[serde(rename = "math")]
    MathProblem,
    #[serde(rename = "countdown")]
    Countdown,
}

impl ChallengeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::None => "none",
            ChallengeType::TypePhrase => "phrase",
            ChallengeType::MathProblem => "math",
            ChallengeType::Countdown => "countdown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "0" => Some(ChallengeType::None),
            "phrase" | "1" => Some(ChallengeType::TypePhrase),
            "math" | "2" => Some(ChallengeType::MathProblem),
            "countdown" | "3" => Some(ChallengeType::Countdown),
            _ => None,
        }
    }

    /// Static guidance shown after a wrong answer.
    pub fn hint(&self) -> &'static str {
        match self {
            ChallengeType::None => "",
            ChallengeType::TypePhrase => "Hint: Type the exact phrase shown (case-insensitive)",
            ChallengeType::MathProblem => "Hint: Calculate the answer and submit just the number",
            ChallengeType::Countdown => "Hint: Keep typing 'yes' to confirm",
        }
    }
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of the integers used to build math problems.
pub trait NumberSource: Send {
    /// Uniform integer in `low..=high`.
    fn next_in(&mut self, low: i32, high: i32) -> i32;
}

/// Default number source backed by a PCG generator.
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: Mcg128Xsl64,
}

impl RandomSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mcg128Xsl64::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mcg128Xsl64::seed_from_u64(seed),
        }
    }
}

impl NumberSource for RandomSource {
    fn next_in(&mut self, low: i32, high: i32) -> i32 {
        self.rng.gen_range(low..=high)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    fn from_index(index: i32) -> Self {
        match index {
            1 => Operator::Subtract,
            2 => Operator::Multiply,
            _ => Operator::Add,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
        }
    }
}

/// A generated arithmetic problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathProblem {
    pub left: i32,
    pub right: i32,
    pub symbol: &'static str,
    pub answer: i32,
}

impl MathProblem {
    /// Draws the left operand, the right operand, then the operator.
    ///
    /// Subtraction orders the operands so the result is never negative;
    /// multiplication folds both operands into 2..=14.
    pub fn generate(source: &mut dyn NumberSource) -> Self {
        let mut left = source.next_in(OPERAND_RANGE.0, OPERAND_RANGE.1);
        let mut right = source.next_in(OPERAND_RANGE.0, OPERAND_RANGE.1);
        let op = Operator::from_index(source.next_in(OPERATOR_RANGE.0, OPERATOR_RANGE.1));

        let answer = match op {
            Operator::Add => left + right,
            Operator::Subtract => {
                if left < right {
                    std::mem::swap(&mut left, &mut right);
                }
                left - right
            }
            Operator::Multiply => {
                left = left.rem_euclid(13) + 2;
                right = right.rem_euclid(13) + 2;
                left * right
            }
        };

        Self {
            left,
            right,
            symbol: op.symbol(),
            answer,
        }
    }
}

impl fmt::Display for MathProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} = ?", self.left, self.symbol, self.right)
    }
}

#[derive(Debug)]
struct ChallengeState {
    kind: ChallengeType,
    phrase: String,
    active: bool,
    expected: String,
    prompt: String,
    remaining: u32,
}

impl ChallengeState {
    fn countdown_prompt(&self) -> String {
        if self.remaining >= COUNTDOWN_CONFIRMATIONS {
            format!(
                "Are you SURE you want to stop? ({} confirmations needed)",
                self.remaining
            )
        } else {
            format!("Still sure? ({} more confirmations needed)", self.remaining)
        }
    }
}

/// Issues and validates exit challenges.
///
/// All operations are synchronous and safe to call from any thread.
pub struct ChallengeEngine {
    state: Mutex<ChallengeState>,
    source: Mutex<Box<dyn NumberSource>>,
}

impl ChallengeEngine {
    pub fn new() -> Self {
        Self::with_source(Box::new(RandomSource::from_entropy()))
    }

    pub fn with_source(source: Box<dyn NumberSource>) -> Self {
        Self {
            state: Mutex::new(ChallengeState {
                kind: ChallengeType::None,
                phrase: DEFAULT_PHRASE.to_string(),
                active: false,
                expected: String::new(),
                prompt: String::new(),
                remaining: COUNTDOWN_CONFIRMATIONS,
            }),
            source: Mutex::new(source),
        }
    }

    /// Set the challenge type. A blank phrase keeps the default sentence.
    pub fn configure(&self, kind: ChallengeType, phrase: &str) {
        let mut state = self.lock();
        state.kind = kind;
        state.phrase = if phrase.trim().is_empty() {
            DEFAULT_PHRASE.to_string()
        } else {
            phrase.to_string()
        };
        debug!(kind = %kind, "challenge configured");
    }

    /// Start a challenge and return its prompt.
    ///
    /// `ChallengeType::None` leaves the engine inactive and returns "".
    pub fn initiate(&self) -> String {
        let mut state = self.lock();
        state.remaining = COUNTDOWN_CONFIRMATIONS;
        state.active = true;

        match state.kind {
            ChallengeType::None => {
                state.active = false;
                state.prompt.clear();
                return String::new();
            }
            ChallengeType::TypePhrase => {
                state.expected = normalize_answer(&state.phrase);
                state.prompt = format!("To stop the session, type: \"{}\"", state.phrase);
            }
            ChallengeType::MathProblem => {
                let problem = {
                    let mut source = self.source.lock().unwrap_or_else(PoisonError::into_inner);
                    MathProblem::generate(source.as_mut())
                };
                state.expected = problem.answer.to_string();
                state.prompt = problem.to_string();
            }
            ChallengeType::Countdown => {
                state.expected.clear();
                state.prompt = state.countdown_prompt();
            }
        }

        info!(kind = %state.kind, "challenge initiated");
        state.prompt.clone()
    }

    /// Check an answer against the active challenge.
    ///
    /// Returns true when there is nothing left to pass. A countdown
    /// acknowledgment that does not finish the countdown returns false and
    /// updates the prompt.
    pub fn validate_answer(&self, answer: &str) -> bool {
        let mut state = self.lock();
        if !state.active {
            return true;
        }

        let answer = normalize_answer(answer);
        match state.kind {
            ChallengeType::None => {
                state.active = false;
                true
            }
            ChallengeType::TypePhrase | ChallengeType::MathProblem => {
                if answer == state.expected {
                    state.active = false;
                    info!(kind = %state.kind, "challenge passed");
                    true
                } else {
                    debug!(kind = %state.kind, "challenge answer rejected");
                    false
                }
            }
            ChallengeType::Countdown => {
                if answer != "yes" && answer != "y" {
                    debug!("countdown answer was not a confirmation");
                    return false;
                }
                state.remaining = state.remaining.saturating_sub(1);
                if state.remaining == 0 {
                    state.active = false;
                    info!("countdown challenge passed");
                    return true;
                }
                state.prompt = state.countdown_prompt();
                debug!(remaining = state.remaining, "countdown confirmation accepted");
                false
            }
        }
    }

    /// Abort any challenge in progress.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.active = false;
        state.remaining = COUNTDOWN_CONFIRMATIONS;
        debug!("challenge cancelled");
    }

    pub fn hint(&self) -> &'static str {
        self.lock().kind.hint()
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn is_enabled(&self) -> bool {
        self.lock().kind != ChallengeType::None
    }

    pub fn challenge_type(&self) -> ChallengeType {
        self.lock().kind
    }

    pub fn phrase(&self) -> String {
        self.lock().phrase.clone()
    }

    pub fn remaining_confirmations(&self) -> u32 {
        self.lock().remaining
    }

    /// Prompt of the active challenge, empty when none is active.
    pub fn prompt(&self) -> String {
        let state = self.lock();
        if state.active {
            state.prompt.clone()
        } else {
            String::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChallengeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ChallengeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChallengeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ChallengeEngine")
            .field("kind", &state.kind)
            .field("active", &state.active)
            .field("remaining", &state.remaining)
            .finish()
    }
}

/// Lower-case and drop every whitespace character.
pub fn normalize_answer(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<i32>);

    impl Scripted {
        fn boxed(values: &[i32]) -> Box<dyn NumberSource> {
            Box::new(Scripted(values.iter().copied().collect()))
        }
    }

    impl NumberSource for Scripted {
        fn next_in(&mut self, low: i32, _high: i32) -> i32 {
            self.0.pop_front().unwrap_or(low)
        }
    }

    #[test]
    fn none_is_frictionless() {
        let engine = ChallengeEngine::new();
        assert_eq!(engine.initiate(), "");
        assert!(!engine.is_active());
        assert!(!engine.is_enabled());
        assert!(engine.validate_answer("anything"));
        assert_eq!(engine.hint(), "");
    }

    #[test]
    fn phrase_ignores_case_and_whitespace() {
        let engine = ChallengeEngine::new();
        engine.configure(ChallengeType::TypePhrase, "I want to stop focusing");

        let prompt = engine.initiate();
        assert_eq!(prompt, "To stop the session, type: \"I want to stop focusing\"");
        assert!(engine.is_active());

        assert!(!engine.validate_answer("I want to keep focusing"));
        assert!(engine.is_active());
        assert_eq!(engine.prompt(), prompt);

        assert!(engine.validate_answer("I WANT TO STOP FOCUSING"));
        assert!(!engine.is_active());
    }

    #[test]
    fn blank_phrase_falls_back_to_default() {
        let engine = ChallengeEngine::new();
        engine.configure(ChallengeType::TypePhrase, "  ");
        assert_eq!(engine.phrase(), DEFAULT_PHRASE);
        engine.initiate();
        assert!(engine.validate_answer("iwanttostopfocusing"));
    }

    #[test]
    fn countdown_needs_three_confirmations() {
        let engine = ChallengeEngine::new();
        engine.configure(ChallengeType::Countdown, "");

        let prompt = engine.initiate();
        assert!(prompt.contains("3 confirmations needed"));
        assert_eq!(engine.remaining_confirmations(), 3);

        assert!(!engine.validate_answer("no"));
        assert_eq!(engine.remaining_confirmations(), 3);

        assert!(!engine.validate_answer("yes"));
        assert_eq!(engine.remaining_confirmations(), 2);
        assert_eq!(engine.prompt(), "Still sure? (2 more confirmations needed)");

        assert!(!engine.validate_answer(" Y "));
        assert_eq!(engine.remaining_confirmations(), 1);

        assert!(engine.validate_answer("yes"));
        assert!(!engine.is_active());
    }

    #[test]
    fn cancel_resets_progress() {
        let engine = ChallengeEngine::new();
        engine.configure(ChallengeType::Countdown, "");
        engine.initiate();
        engine.validate_answer("yes");
        engine.cancel();
        assert!(!engine.is_active());
        assert_eq!(engine.remaining_confirmations(), 3);
        assert_eq!(engine.prompt(), "");
        assert!(engine.validate_answer("whatever"));
    }

    #[test]
    fn math_subtraction_from_scripted_source() {
        let engine = ChallengeEngine::with_source(Scripted::boxed(&[20, 7, 1]));
        engine.configure(ChallengeType::MathProblem, "");

        assert_eq!(engine.initiate(), "20 - 7 = ?");
        assert!(!engine.validate_answer("12"));
        assert!(!engine.validate_answer("thirteen"));
        assert!(engine.validate_answer(" 13 "));
    }

    #[test]
    fn math_subtraction_never_negative() {
        let engine = ChallengeEngine::with_source(Scripted::boxed(&[12, 45, 1]));
        engine.configure(ChallengeType::MathProblem, "");
        assert_eq!(engine.initiate(), "45 - 12 = ?");
        assert!(engine.validate_answer("33"));
    }

    #[test]
    fn math_multiplication_uses_small_operands() {
        let engine = ChallengeEngine::with_source(Scripted::boxed(&[50, 10, 2]));
        engine.configure(ChallengeType::MathProblem, "");
        // 50 % 13 + 2 = 13, 10 % 13 + 2 = 12
        assert_eq!(engine.initiate(), "13 × 12 = ?");
        assert!(engine.validate_answer("156"));
    }

    #[test]
    fn seeded_problems_stay_in_range() {
        let mut source = RandomSource::seeded(42);
        for _ in 0..200 {
            let problem = MathProblem::generate(&mut source);
            match problem.symbol {
                "+" => {
                    assert!((20..=100).contains(&problem.answer));
                }
                "-" => {
                    assert!(problem.left >= problem.right);
                    assert!(problem.answer >= 0);
                }
                _ => {
                    assert!((2..=14).contains(&problem.left));
                    assert!((2..=14).contains(&problem.right));
                }
            }
        }
    }

    #[test]
    fn challenge_type_parses_names_and_indices() {
        assert_eq!(ChallengeType::parse("Math"), Some(ChallengeType::MathProblem));
        assert_eq!(ChallengeType::parse("3"), Some(ChallengeType::Countdown));
        assert_eq!(ChallengeType::parse("riddle"), None);
        let json = serde_json::to_string(&ChallengeType::TypePhrase).unwrap();
        assert_eq!(json, "\"phrase\"");
    }

    #[test]
    fn normalize_strips_all_whitespace() {
        assert_eq!(normalize_answer(" I Want\tTo\nStop "), "iwanttostop");
    }
}
