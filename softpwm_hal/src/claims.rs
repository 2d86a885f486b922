//! Transactional line acquisition.
//!
//! [`LineClaims`] claims an ordered list of lines and either hands back
//! every handle or, on the first failure, releases exactly the lines it had
//! already claimed (newest first) before returning the error. No partial
//! ownership survives a failed acquisition, whichever way the function is
//! left.

use softpwm_common::error::HalError;
use softpwm_common::line::{Direction, LineDriver, LineHandle, LineId};
use tracing::warn;

/// Handles claimed so far; released on drop unless committed.
pub struct LineClaims<'a> {
    driver: &'a dyn LineDriver,
    handles: Vec<LineHandle>,
}

impl<'a> LineClaims<'a> {
    /// Claim every line in `lines`, in order, with the same direction.
    ///
    /// # Errors
    /// Returns the driver's error for the first line that cannot be
    /// claimed, after releasing all earlier claims.
    pub fn acquire(
        driver: &'a dyn LineDriver,
        lines: &[LineId],
        direction: Direction,
    ) -> Result<Vec<LineHandle>, HalError> {
        let mut claims = Self {
            driver,
            handles: Vec::with_capacity(lines.len()),
        };
        for &line in lines {
            let handle = driver.claim(line, direction).inspect_err(|e| {
                if !claims.handles.is_empty() {
                    warn!(
                        "Claim of line {} failed ({}), rolling back {} earlier claims",
                        line,
                        e,
                        claims.handles.len()
                    );
                }
            })?;
            claims.handles.push(handle);
        }
        Ok(claims.commit())
    }

    fn commit(mut self) -> Vec<LineHandle> {
        std::mem::take(&mut self.handles)
    }
}

impl Drop for LineClaims<'_> {
    fn drop(&mut self) {
        while let Some(handle) = self.handles.pop() {
            self.driver.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use softpwm_common::line::Level;

    const OUT: Direction = Direction::Output {
        initial: Level::Low,
    };

    #[test]
    fn all_lines_claimed_in_order() {
        let driver = SimulationDriver::new();
        let handles = LineClaims::acquire(&driver, &[4, 2, 9], OUT).unwrap();
        let lines: Vec<LineId> = handles.iter().map(LineHandle::line).collect();
        assert_eq!(lines, vec![4, 2, 9]);
        assert_eq!(driver.claimed_lines(), vec![2, 4, 9]);
    }

    #[test]
    fn failure_releases_earlier_claims() {
        let driver = SimulationDriver::new();
        driver.fail_claims_on(9);

        let err = LineClaims::acquire(&driver, &[4, 2, 9, 11], OUT).unwrap_err();
        assert!(matches!(err, HalError::Resource(_)));
        assert!(driver.claimed_lines().is_empty());
    }

    #[test]
    fn duplicate_line_in_list_fails_atomically() {
        let driver = SimulationDriver::new();
        assert!(LineClaims::acquire(&driver, &[3, 5, 3], OUT).is_err());
        assert!(driver.claimed_lines().is_empty());
    }

    #[test]
    fn pre_owned_lines_are_untouched() {
        let driver = SimulationDriver::new();
        let outside = driver.claim(5, Direction::Input).unwrap();

        assert!(LineClaims::acquire(&driver, &[1, 5], OUT).is_err());
        assert_eq!(driver.claimed_lines(), vec![5]);
        driver.release(outside);
    }
}
