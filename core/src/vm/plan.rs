use std::fmt;

use hashbrown::{HashMap, HashSet};

use super::{EvalError, Step};

/// A compiled expression: a flat step sequence plus its stack requirement.
///
/// Plans are immutable once built and can be evaluated concurrently, each
/// evaluation using its own [`EvaluationState`](super::EvaluationState).
#[derive(Clone)]
pub struct ExecutionPlan {
    steps: Vec<Step>,
    max_stack_size: usize,
}

static_assertions::assert_impl_all!(ExecutionPlan: Send, Sync);

impl ExecutionPlan {
    /// Builds a plan from hand-written steps.
    ///
    /// Every jump must land inside the plan or exactly at its end. The
    /// stack limit is the step count, which bounds any well-formed plan.
    pub fn from_steps(steps: Vec<Step>) -> Result<Self, EvalError> {
        if let Some((pc, target)) = find_invalid_jump(&steps) {
            return Err(EvalError::InvalidJumpTarget { pc, target });
        }
        let max_stack_size = steps.len();
        Ok(Self {
            steps,
            max_stack_size,
        })
    }

    /// Used by the compiler, which already tracks stack depth and jumps.
    pub(crate) fn new_unchecked(steps: Vec<Step>, max_stack_size: usize) -> Self {
        Self {
            steps,
            max_stack_size,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }
}

/// The first `(pc, target)` whose target lies past the end of `steps`.
pub(crate) fn find_invalid_jump(steps: &[Step]) -> Option<(usize, usize)> {
    steps.iter().enumerate().find_map(|(pc, step)| match step.jump_target() {
        Some(target) if target > steps.len() => Some((pc, target)),
        _ => None,
    })
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ExecutionPlan {{")?;
        writeln!(f, "  max_stack_size: {}", self.max_stack_size)?;

        // Assign label numbers to targets (sorted for deterministic output)
        let targets: HashSet<usize> = self.steps.iter().filter_map(Step::jump_target).collect();
        let mut sorted_targets: Vec<_> = targets.into_iter().collect();
        sorted_targets.sort_unstable();
        let label_map: HashMap<usize, usize> = sorted_targets
            .into_iter()
            .enumerate()
            .map(|(i, addr)| (addr, i))
            .collect();

        writeln!(f, "  steps:")?;
        for (addr, step) in self.steps.iter().enumerate() {
            let label_prefix = label_map
                .get(&addr)
                .map(|l| format!("L{l}:"))
                .unwrap_or_default();
            let marker = if step.comes_from_ast { ' ' } else { '*' };
            match step.jump_target() {
                Some(target) => {
                    let target_label = label_map
                        .get(&target)
                        .map(|l| format!("L{l}"))
                        .unwrap_or_else(|| format!("@{target}"));
                    writeln!(
                        f,
                        "    {:4} {:>4} {}#{:<3} {:?} (to {})",
                        addr, label_prefix, marker, step.id, step.kind, target_label
                    )?;
                }
                None => writeln!(
                    f,
                    "    {:4} {:>4} {}#{:<3} {:?}",
                    addr, label_prefix, marker, step.id, step.kind
                )?,
            }
        }
        if let Some(l) = label_map.get(&self.steps.len()) {
            writeln!(f, "    {:4} {:>4}  <end>", self.steps.len(), format!("L{l}:"))?;
        }

        write!(f, "}}")
    }
}
