pub mod diplomacy;
pub mod economy;
pub mod military;
pub mod strategic;

pub use diplomacy::DiplomacyAdvisor;
pub use economy::EconomyAdvisor;
pub use military::MilitaryAdvisor;
pub use strategic::StrategicAdvisor;

use crate::config::AiConfig;
use crate::error::Result;
use crate::game::{Execution, GameView, Gold, PlayerId, Tick, UnitType};
use crate::rng::PseudoRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

impl Priority {
    pub fn name(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisorKind {
    Diplomacy,
    Economy,
    Strategic,
    Military,
}

impl AdvisorKind {
    pub fn name(self) -> &'static str {
        match self {
            AdvisorKind::Diplomacy => "diplomacy",
            AdvisorKind::Economy => "economy",
            AdvisorKind::Strategic => "strategic",
            AdvisorKind::Military => "military",
        }
    }
}

/// A proposed bundle of executions.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub advisor: AdvisorKind,
    pub executions: Vec<Execution>,
    pub score: f64,
    pub priority: Priority,
    pub reason: String,
}

impl Recommendation {
    pub fn new(
        advisor: AdvisorKind,
        executions: Vec<Execution>,
        score: f64,
        priority: Priority,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            advisor,
            executions,
            score,
            priority,
            reason: reason.into(),
        }
    }

    pub fn single(
        advisor: AdvisorKind,
        execution: Execution,
        score: f64,
        priority: Priority,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(advisor, vec![execution], score, priority, reason)
    }

    /// Gold the engine will charge for these executions.
    pub fn gold_cost<G: GameView>(&self, game: &G, player: PlayerId) -> Gold {
        self.executions
            .iter()
            .map(|e| match *e {
                Execution::Construct { unit_type, .. } => game.unit_cost(player, unit_type),
                Execution::Strike { weapon, .. } => game.unit_cost(player, weapon),
                _ => 0,
            })
            .fold(0, Gold::saturating_add)
    }
}

/// Per-agent aggressiveness, fixed at creation. Fractions in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratios {
    /// Troop fill needed before picking a fight.
    pub trigger: f64,
    /// Share of max troops kept home when attacking a player.
    pub reserve: f64,
    /// Share of max troops kept home when expanding.
    pub expand: f64,
}

/// Gold left for discretionary spending once the reserve is set aside.
pub fn spendable_gold(gold: Gold, reserve: Gold) -> Gold {
    gold.saturating_sub(reserve)
}

/// Everything an advisor sees for one decision.
pub struct AdvisorContext<'a, G: GameView> {
    pub game: &'a G,
    pub player: PlayerId,
    pub rng: &'a mut PseudoRandom,
    pub config: &'a AiConfig,
    pub ratios: Ratios,
    /// Gold held back for strategic strikes.
    pub reserve: Gold,
    /// Gold already promised to earlier recommendations this tick.
    pub committed: Gold,
    pub silo_urgent: bool,
}

impl<'a, G: GameView> AdvisorContext<'a, G> {
    pub fn tick(&self) -> Tick {
        self.game.ticks()
    }

    /// Treasury minus what this tick already spent.
    pub fn gold(&self) -> Gold {
        self.game
            .gold(self.player)
            .saturating_sub(self.committed)
    }

    pub fn spendable_gold(&self) -> Gold {
        spendable_gold(self.gold(), self.reserve)
    }

    pub fn commit(&mut self, amount: Gold) {
        self.committed = self.committed.saturating_add(amount);
    }

    pub fn cost(&self, unit_type: UnitType) -> Gold {
        self.game.unit_cost(self.player, unit_type)
    }
}

pub trait Advisor<G: GameView> {
    fn kind(&self) -> AdvisorKind;

    /// At most one recommendation per call. `Ok(None)` means nothing worth
    /// doing this tick.
    fn recommend(&mut self, ctx: &mut AdvisorContext<'_, G>) -> Result<Option<Recommendation>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub const NEUTRAL_RATIOS: Ratios = Ratios {
        trigger: 0.7,
        reserve: 0.4,
        expand: 0.2,
    };

    pub fn context<'a, G: GameView>(
        game: &'a G,
        player: PlayerId,
        rng: &'a mut PseudoRandom,
        config: &'a AiConfig,
    ) -> AdvisorContext<'a, G> {
        AdvisorContext {
            game,
            player,
            rng,
            config,
            ratios: NEUTRAL_RATIOS,
            reserve: 0,
            committed: 0,
            silo_urgent: false,
        }
    }
}
