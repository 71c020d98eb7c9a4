//! Points and leaderboard standings derived from the running totals.
//!
//! Ranks are never maintained incrementally: every recompute orders the full set of
//! totals through [`rank_of`]. Ties on `total_raised` go to the lower intern id (the
//! earlier registration), so ranks always form a permutation of `1..=n`.

use serde::Serialize;

use super::domain::{Amount, InternId};
use super::repository::{LedgerStore, RepositoryError};
use super::service::FundraisingError;

/// One point per whole ten dollars raised.
pub const CENTS_PER_POINT: i64 = 1_000;

/// Position of one intern on the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub intern_id: InternId,
    pub rank: u32,
    pub total_raised: Amount,
}

pub fn points_for(total_raised: Amount) -> i64 {
    if total_raised.cents() <= 0 {
        0
    } else {
        total_raised.cents() / CENTS_PER_POINT
    }
}

/// Orders totals descending, ties by intern id ascending, and assigns 1-based ranks.
pub fn rank_of(totals: &[(InternId, Amount)]) -> Vec<Standing> {
    let mut ordered = totals.to_vec();
    ordered.sort_by(|(left_id, left_total), (right_id, right_total)| {
        right_total.cmp(left_total).then(left_id.cmp(right_id))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, (intern_id, total_raised))| Standing {
            intern_id,
            rank: index as u32 + 1,
            total_raised,
        })
        .collect()
}

fn snapshot(store: &dyn LedgerStore) -> Result<Vec<(InternId, Amount)>, RepositoryError> {
    Ok(store
        .interns()?
        .into_iter()
        .map(|intern| (intern.id, intern.total_raised))
        .collect())
}

/// Persists `floor(total_raised / 10)` for the intern and returns it.
pub fn recompute_points(
    store: &mut dyn LedgerStore,
    intern_id: InternId,
) -> Result<i64, FundraisingError> {
    let intern = store
        .intern(intern_id)?
        .ok_or_else(|| FundraisingError::intern_not_found(intern_id))?;
    let points = points_for(intern.total_raised);
    store.set_points(intern_id, points)?;
    Ok(points)
}

/// Single-intern mode: scans the full ordering and persists only this intern's rank.
pub fn recompute_rank(
    store: &mut dyn LedgerStore,
    intern_id: InternId,
) -> Result<u32, FundraisingError> {
    let standings = rank_of(&snapshot(store)?);
    let standing = standings
        .iter()
        .find(|standing| standing.intern_id == intern_id)
        .ok_or_else(|| FundraisingError::intern_not_found(intern_id))?;

    store.set_rank(intern_id, standing.rank)?;
    Ok(standing.rank)
}

/// All-intern mode used by the leaderboard: persists every rank in one pass.
pub fn recompute_ranks(store: &mut dyn LedgerStore) -> Result<Vec<Standing>, FundraisingError> {
    let standings = rank_of(&snapshot(store)?);
    for standing in &standings {
        store.set_rank(standing.intern_id, standing.rank)?;
    }
    Ok(standings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(dollars: &[i64]) -> Vec<(InternId, Amount)> {
        dollars
            .iter()
            .enumerate()
            .map(|(index, dollars)| (InternId(index as i64 + 1), Amount::from_dollars(*dollars)))
            .collect()
    }

    #[test]
    fn points_floor_to_whole_tens() {
        assert_eq!(points_for(Amount::ZERO), 0);
        assert_eq!(points_for(Amount::from_cents(999)), 0);
        assert_eq!(points_for(Amount::from_dollars(10)), 1);
        assert_eq!(points_for(Amount::from_dollars(50)), 5);
        assert_eq!(points_for(Amount::from_cents(10_999)), 10);
        assert_eq!(points_for(Amount::from_dollars(110)), 11);
        assert_eq!(points_for(Amount::from_cents(-5_000)), 0);
    }

    #[test]
    fn ties_resolve_to_the_earlier_intern() {
        let standings = rank_of(&totals(&[300, 300, 200, 100, 0]));
        let ranks: Vec<(i64, u32)> = standings
            .iter()
            .map(|standing| (standing.intern_id.0, standing.rank))
            .collect();
        assert_eq!(ranks, vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)]);
    }

    #[test]
    fn ranks_follow_descending_totals_regardless_of_input_order() {
        let input = vec![
            (InternId(7), Amount::from_dollars(15)),
            (InternId(2), Amount::from_dollars(400)),
            (InternId(9), Amount::from_dollars(400)),
            (InternId(4), Amount::ZERO),
            (InternId(1), Amount::from_dollars(90)),
        ];
        let standings = rank_of(&input);

        let order: Vec<i64> = standings.iter().map(|standing| standing.intern_id.0).collect();
        assert_eq!(order, vec![2, 9, 1, 7, 4]);

        let mut ranks: Vec<u32> = standings.iter().map(|standing| standing.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);

        for pair in standings.windows(2) {
            assert!(pair[0].total_raised >= pair[1].total_raised);
        }
    }

    #[test]
    fn empty_leaderboard_has_no_standings() {
        assert!(rank_of(&[]).is_empty());
    }
}
