//! Sweep phases and the resumable `(phase, row)` cursor.

/// One of the seven per-sweep phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Rainfall.
    Increment,
    /// Outflow flux calculation and scaling.
    Fluxes,
    /// Water height update from net flux.
    Field,
    /// Velocity, transport capacity, dissolution and deposition.
    Erode,
    /// Semi-Lagrangian sediment advection.
    Transport,
    /// Water evaporation.
    Evaporate,
    /// Vertex height publication to the collaborator.
    Publish,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 7] = [
        Phase::Increment,
        Phase::Fluxes,
        Phase::Field,
        Phase::Erode,
        Phase::Transport,
        Phase::Evaporate,
        Phase::Publish,
    ];

    /// Returns the name of the phase.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Increment => "increment",
            Phase::Fluxes => "fluxes",
            Phase::Field => "field",
            Phase::Erode => "erode",
            Phase::Transport => "transport",
            Phase::Evaporate => "evaporate",
            Phase::Publish => "publish",
        }
    }

    /// Position in the sweep, 0-based.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The following phase, or `None` after `Publish`.
    pub fn next(&self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }
}

/// Where the next call to `advance_row` will resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SweepCursor {
    pub phase: Phase,
    pub row: usize,
}

impl Default for SweepCursor {
    fn default() -> Self {
        Self {
            phase: Phase::Increment,
            row: 0,
        }
    }
}

/// What happened when the cursor moved past a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorStep {
    /// Still inside the same phase.
    Row,
    /// The given phase finished its last row.
    PhaseDone(Phase),
    /// `Publish` finished; the cursor wrapped to the start of a new sweep.
    SweepDone,
}

impl SweepCursor {
    /// Moves past the current row of a grid with `rows` rows.
    pub(crate) fn advance(&mut self, rows: usize) -> CursorStep {
        self.row += 1;
        if self.row < rows {
            return CursorStep::Row;
        }

        self.row = 0;
        let finished = self.phase;
        match finished.next() {
            Some(next) => {
                self.phase = next;
                CursorStep::PhaseDone(finished)
            }
            None => {
                self.phase = Phase::Increment;
                CursorStep::SweepDone
            }
        }
    }

    /// True at the first row of a phase.
    pub fn at_phase_start(&self) -> bool {
        self.row == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        for (i, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
        assert_eq!(Phase::Increment.next(), Some(Phase::Fluxes));
        assert_eq!(Phase::Evaporate.next(), Some(Phase::Publish));
        assert_eq!(Phase::Publish.next(), None);
        assert_eq!(Phase::Erode.name(), "erode");
    }

    #[test]
    fn test_cursor_walks_full_sweep() {
        let rows = 3;
        let mut cursor = SweepCursor::default();
        let mut phase_ends = Vec::new();
        let mut steps = 0;

        loop {
            steps += 1;
            match cursor.advance(rows) {
                CursorStep::Row => {}
                CursorStep::PhaseDone(p) => phase_ends.push(p),
                CursorStep::SweepDone => break,
            }
        }

        assert_eq!(steps, rows * Phase::ALL.len());
        assert_eq!(phase_ends, Phase::ALL[..6].to_vec());
        assert_eq!(cursor, SweepCursor::default());
    }

    #[test]
    fn test_single_row_grid() {
        let mut cursor = SweepCursor::default();
        assert_eq!(cursor.advance(1), CursorStep::PhaseDone(Phase::Increment));
        assert_eq!(cursor.phase, Phase::Fluxes);
        assert!(cursor.at_phase_start());
    }
}
