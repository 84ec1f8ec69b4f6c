//! Plans: ordered `(position, action)` steps.
//!
//! Element 0 is always where the agent stands, with [`Action::None`].  Element
//! `i > 0` carries the action that takes the agent from element `i - 1` into
//! element `i`.  A plan of length ≤ 1 is *trivial*: there is nothing to do.

use std::fmt;

use pd_core::{Direction, Position};

/// One atomic action.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Wait,
    None,
    /// Never emitted by the pathfinder; recovery patches and pickup plans
    /// splice it in.
    PickUp,
    /// Only emitted by recovery patches.
    PutDown,
}

impl Action {
    pub fn from_direction(dir: Direction) -> Self {
        match dir {
            Direction::Up => Action::Up,
            Direction::Down => Action::Down,
            Direction::Left => Action::Left,
            Direction::Right => Action::Right,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Action::Up => Some(Direction::Up),
            Action::Down => Some(Direction::Down),
            Action::Left => Some(Direction::Left),
            Action::Right => Some(Direction::Right),
            _ => None,
        }
    }

    #[inline]
    pub fn is_move(self) -> bool {
        self.direction().is_some()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Wait => "wait",
            Action::None => "none",
            Action::PickUp => "pickup",
            Action::PutDown => "putdown",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Step {
    pub position: Position,
    pub action:   Action,
}

impl Step {
    pub fn new(position: Position, action: Action) -> Self {
        Self { position, action }
    }
}

/// A path as produced by the pathfinder or a recovery patch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    /// The empty plan.  Recovery returns it to mean "replan".
    pub fn empty() -> Self {
        Self::default()
    }

    /// A plan that stays on `pos`.
    pub fn stay(pos: Position) -> Self {
        Self { steps: vec![Step::new(pos, Action::None)] }
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Build a plan from consecutive positions; repeated positions become
    /// waits.  Non-adjacent jumps are not representable and truncate the plan.
    pub fn from_positions(positions: &[Position]) -> Self {
        let Some(&first) = positions.first() else { return Self::empty() };
        let mut steps = vec![Step::new(first, Action::None)];
        for pair in positions.windows(2) {
            let action = if pair[0] == pair[1] {
                Action::Wait
            } else {
                match pair[0].direction_to(pair[1]) {
                    Some(dir) => Action::from_direction(dir),
                    None => break,
                }
            };
            steps.push(Step::new(pair[1], action));
        }
        Self { steps }
    }

    /// `[current] ++ rest`: resume `rest` from where we stand now.
    pub fn resume_from(current: Position, rest: &[Step]) -> Self {
        let mut steps = Vec::with_capacity(rest.len() + 1);
        steps.push(Step::new(current, Action::None));
        steps.extend_from_slice(rest);
        Self { steps }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Nothing to execute.
    #[inline]
    pub fn is_trivial(&self) -> bool {
        self.steps.len() <= 1
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, i: usize) -> Option<&Step> {
        self.steps.get(i)
    }

    pub fn start(&self) -> Option<Position> {
        self.steps.first().map(|s| s.position)
    }

    pub fn end(&self) -> Option<Position> {
        self.steps.last().map(|s| s.position)
    }

    /// Steps from `i` to the end (empty past the end).
    pub fn tail(&self, i: usize) -> &[Step] {
        self.steps.get(i..).unwrap_or(&[])
    }

    pub fn positions(&self) -> Vec<Position> {
        self.steps.iter().map(|s| s.position).collect()
    }

    /// Number of move actions.
    pub fn move_count(&self) -> usize {
        self.steps.iter().filter(|s| s.action.is_move()).count()
    }

    // ── Splicing ──────────────────────────────────────────────────────────

    /// Append `rest`.  A leading `none` step in `rest` is skipped.
    pub fn then(mut self, rest: &[Step]) -> Self {
        let rest = match rest.first() {
            Some(s) if s.action == Action::None => &rest[1..],
            _ => rest,
        };
        self.steps.extend_from_slice(rest);
        self
    }

    /// Append one action at the current end position.
    pub fn then_action(mut self, action: Action) -> Self {
        if let Some(pos) = self.end() {
            self.steps.push(Step::new(pos, action));
        }
        self
    }

    /// Append a move in `dir`.
    pub fn then_move(mut self, dir: Direction) -> Self {
        if let Some(pos) = self.end() {
            self.steps.push(Step::new(pos.step(dir), Action::from_direction(dir)));
        }
        self
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}:{}", s.action, s.position)?;
        }
        Ok(())
    }
}
