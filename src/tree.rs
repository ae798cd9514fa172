//! Rank and parent selection shared by all three node roles (§4.4). The
//! root never needs a special case: its `rank = 0` makes `cand < rank`
//! false for every candidate (the smallest possible `cand` is 1, since
//! `UNJOINED` HELLOs are filtered before reaching here), so it never adopts
//! a parent by construction.

use crate::config::{ENERGY_TIEBREAK_MARGIN, UNJOINED};

#[derive(Debug, Clone)]
pub struct TreeState {
    pub rank: u16,
    pub parent: Option<u8>,
    pub parent_energy: f64,
}

impl TreeState {
    pub fn root() -> Self {
        TreeState { rank: 0, parent: None, parent_energy: 0.0 }
    }

    pub fn unjoined() -> Self {
        TreeState { rank: UNJOINED, parent: None, parent_energy: 0.0 }
    }

    /// Applies the rank-update rule of §4.4 to a HELLO from `src` carrying
    /// `recv_rank` and, on the energised dialect, `recv_energy`. Returns
    /// `true` if rank or parent changed.
    pub fn on_hello(&mut self, src: u8, recv_rank: u16, recv_energy: Option<f64>) -> bool {
        if recv_rank == UNJOINED {
            return false;
        }
        let cand = recv_rank + 1;

        if cand < self.rank {
            self.rank = cand;
            self.parent = Some(src);
            self.parent_energy = recv_energy.unwrap_or(0.0);
            return true;
        }

        if cand == self.rank && self.parent != Some(src) {
            if let Some(recv_energy) = recv_energy {
                if recv_energy > self.parent_energy + ENERGY_TIEBREAK_MARGIN {
                    self.parent = Some(src);
                    self.parent_energy = recv_energy;
                    return true;
                }
            }
            return false;
        }

        if self.parent == Some(src) {
            if let Some(recv_energy) = recv_energy {
                self.parent_energy = recv_energy;
            }
        }
        false
    }

    pub fn is_joined(&self) -> bool {
        self.rank != UNJOINED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_rank_is_adopted() {
        let mut t = TreeState::unjoined();
        assert!(t.on_hello(1, 0, None));
        assert_eq!(t.rank, 1);
        assert_eq!(t.parent, Some(1));
    }

    #[test]
    fn root_never_adopts_a_parent() {
        let mut t = TreeState::root();
        assert!(!t.on_hello(5, 10, Some(90.0)));
        assert_eq!(t.rank, 0);
        assert_eq!(t.parent, None);
    }

    #[test]
    fn unjoined_hello_is_ignored() {
        let mut t = TreeState::unjoined();
        assert!(!t.on_hello(2, UNJOINED, None));
        assert_eq!(t.rank, UNJOINED);
    }

    #[test]
    fn equal_rank_tiebreak_needs_30_point_margin() {
        let mut t = TreeState { rank: 2, parent: Some(10), parent_energy: 40.0 };
        assert!(!t.on_hello(20, 1, Some(65.0)));
        assert_eq!(t.parent, Some(10));
        assert!(t.on_hello(20, 1, Some(80.0)));
        assert_eq!(t.parent, Some(20));
        assert_eq!(t.parent_energy, 80.0);
    }

    #[test]
    fn equal_rank_without_energy_never_switches() {
        let mut t = TreeState { rank: 2, parent: Some(10), parent_energy: 40.0 };
        assert!(!t.on_hello(20, 1, None));
        assert_eq!(t.parent, Some(10));
    }

    #[test]
    fn current_parent_refreshes_energy_without_changing_rank() {
        let mut t = TreeState { rank: 2, parent: Some(10), parent_energy: 40.0 };
        assert!(!t.on_hello(10, 1, Some(55.0)));
        assert_eq!(t.rank, 2);
        assert_eq!(t.parent_energy, 55.0);
    }

    #[test]
    fn worse_rank_is_ignored() {
        let mut t = TreeState { rank: 2, parent: Some(10), parent_energy: 40.0 };
        assert!(!t.on_hello(30, 5, Some(99.0)));
        assert_eq!(t.rank, 2);
        assert_eq!(t.parent, Some(10));
    }
}
