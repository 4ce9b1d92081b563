//! Step counters of one integrator

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Integration statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Accepted steps
    pub step_count: u64,
    /// Steps spent on time synchronisation
    pub step_count_tsyn: u64,
    /// Steps rejected by the energy error check
    pub break_error_count: u64,
    /// Interrupts returned to the caller
    pub interrupt_count: u64,
    /// Changes of the step size
    pub ds_modify_count: u64,
}

impl Profile {
    /// Reset all counters.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Total steps including rejected ones.
    #[must_use]
    pub const fn step_count_total(&self) -> u64 {
        self.step_count + self.break_error_count
    }

    /// Print column titles.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column_title<W: Write>(w: &mut W, width: usize) -> Result<()> {
        for title in ["NStep", "NStep_tsyn", "NBreak", "NInterrupt", "Nds_mod"] {
            write!(w, "{title:>width$}")?;
        }
        Ok(())
    }

    /// Print one row of counters.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn print_column<W: Write>(&self, w: &mut W, width: usize) -> Result<()> {
        for value in [
            self.step_count,
            self.step_count_tsyn,
            self.break_error_count,
            self.interrupt_count,
            self.ds_modify_count,
        ] {
            write!(w, "{value:>width$}")?;
        }
        Ok(())
    }
}
