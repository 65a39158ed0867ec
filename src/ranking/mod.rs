//! World leaderboards
//!
//! Rankings are recomputed from scratch every turn. Order is descending by
//! the metric with ties broken by ascending nation id, so the same world
//! always produces the same board.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::NationId;
use crate::nation::{NationState, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankMetric {
    Gdp,
    Military,
}

impl RankMetric {
    pub fn value(self, nation: &NationState) -> f64 {
        match self {
            RankMetric::Gdp => nation.gdp,
            RankMetric::Military => nation.military_strength,
        }
    }
}

/// One row of a leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    /// 1-based
    pub rank: usize,
    pub nation: NationId,
    pub name: String,
    pub value: f64,
}

/// Rank `nations` by `metric`, keeping at most `limit` rows
pub fn rank_by<'a>(
    nations: impl IntoIterator<Item = &'a NationState>,
    metric: RankMetric,
    limit: usize,
) -> Vec<RankEntry> {
    let mut rows: Vec<&NationState> = nations.into_iter().collect();
    rows.sort_by_key(|n| (Reverse(OrderedFloat(metric.value(n))), n.id.clone()));

    rows.into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, n)| RankEntry {
            rank: i + 1,
            nation: n.id.clone(),
            name: n.name.clone(),
            value: metric.value(n),
        })
        .collect()
}

/// Top `n` nations by GDP
pub fn top_economies(world: &World, n: usize) -> Vec<RankEntry> {
    rank_by(world.nations.values(), RankMetric::Gdp, n)
}

/// Top `n` nations by military strength
pub fn top_militaries(world: &World, n: usize) -> Vec<RankEntry> {
    rank_by(world.nations.values(), RankMetric::Military, n)
}

/// A nation and its regional neighbours, ranked by GDP
pub fn regional_ranking(world: &World, nation: &NationId) -> Result<Vec<RankEntry>> {
    regional_ranking_by(world, nation, RankMetric::Gdp)
}

pub fn regional_ranking_by(
    world: &World,
    nation: &NationId,
    metric: RankMetric,
) -> Result<Vec<RankEntry>> {
    let home = world.nation(nation)?;
    let region = std::iter::once(home).chain(
        home.neighbors
            .iter()
            .filter_map(|id| world.nations.get(id)),
    );
    Ok(rank_by(region, metric, usize::MAX))
}

/// Every board for one turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboards {
    pub economies: Vec<RankEntry>,
    pub militaries: Vec<RankEntry>,
    /// Per nation, its regional GDP ranking
    pub regional: BTreeMap<NationId, Vec<RankEntry>>,
}

impl Leaderboards {
    pub fn compute(world: &World, size: usize) -> Self {
        let regional = world
            .nations
            .keys()
            .filter_map(|id| {
                regional_ranking(world, id)
                    .ok()
                    .map(|board| (id.clone(), board))
            })
            .collect();

        Self {
            economies: top_economies(world, size),
            militaries: top_militaries(world, size),
            regional,
        }
    }

    /// Global rank of a nation, if it made the board
    pub fn rank_of(&self, nation: &NationId, metric: RankMetric) -> Option<usize> {
        let board = match metric {
            RankMetric::Gdp => &self.economies,
            RankMetric::Military => &self.militaries,
        };
        board.iter().find(|e| &e.nation == nation).map(|e| e.rank)
    }
}
