//! Cooperative slot reservation bookkeeping for the RNG bank.
//!
//! A plain `Vec<bool>` indexed by slot id is enough since slots are
//! densely numbered from construction; the discipline — occupy before
//! use, free after — is a cooperative contract, not an enforced lock.

use crate::error::{Result, SmcError};

#[derive(Debug, Clone)]
pub struct SlotTable {
    occupied: Vec<bool>,
}

impl SlotTable {
    pub fn new(slot_count: usize) -> Self {
        SlotTable {
            occupied: vec![false; slot_count],
        }
    }

    pub fn slot_count(&self) -> usize {
        self.occupied.len()
    }

    fn check_range(&self, n: usize) -> Result<()> {
        if n >= self.occupied.len() {
            return Err(SmcError::SlotUnavailable(n));
        }
        Ok(())
    }

    pub fn is_slot_free(&self, n: usize) -> Result<bool> {
        self.check_range(n)?;
        Ok(!self.occupied[n])
    }

    pub fn occupy_slot(&mut self, n: usize) -> Result<()> {
        self.check_range(n)?;
        if self.occupied[n] {
            return Err(SmcError::SlotBusy(n));
        }
        self.occupied[n] = true;
        Ok(())
    }

    pub fn free_slot(&mut self, n: usize) -> Result<()> {
        self.check_range(n)?;
        self.occupied[n] = false;
        Ok(())
    }

    pub fn suggest_empty_slot(&self) -> Result<usize> {
        self.occupied
            .iter()
            .position(|&busy| !busy)
            .ok_or(SmcError::SlotUnavailable(self.occupied.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_occupy_fails() {
        let mut slots = SlotTable::new(4);
        slots.occupy_slot(0).unwrap();
        assert!(matches!(
            slots.occupy_slot(0),
            Err(SmcError::SlotBusy(0))
        ));
    }

    #[test]
    fn free_then_reoccupy_succeeds() {
        let mut slots = SlotTable::new(2);
        slots.occupy_slot(1).unwrap();
        slots.free_slot(1).unwrap();
        assert!(slots.occupy_slot(1).is_ok());
    }

    #[test]
    fn suggest_empty_skips_occupied() {
        let mut slots = SlotTable::new(3);
        slots.occupy_slot(0).unwrap();
        assert_eq!(slots.suggest_empty_slot().unwrap(), 1);
    }

    #[test]
    fn out_of_range_slot_errors() {
        let slots = SlotTable::new(2);
        assert!(matches!(
            slots.is_slot_free(5),
            Err(SmcError::SlotUnavailable(5))
        ));
    }
}
