use crate::error::{AiError, Result};
use crate::game::{Gold, Tick, UnitType};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub cadence: CadenceConfig,
    pub diplomacy: DiplomacyConfig,
    pub economy: EconomyConfig,
    pub strategic: StrategicConfig,
    pub military: MilitaryConfig,
    pub targeting: TargetingConfig,
}

/// Activation cadence and the per-agent aggressiveness ratios, all drawn
/// once per agent from these ranges. Ratios are in percent, `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub attack_rate_min: u32,
    pub attack_rate_max: u32,
    pub trigger_ratio_min: u32,
    pub trigger_ratio_max: u32,
    pub reserve_ratio_min: u32,
    pub reserve_ratio_max: u32,
    pub expand_ratio_min: u32,
    pub expand_ratio_max: u32,
    pub spawn_search_delta: i32,
    pub spawn_attempts: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            attack_rate_min: 40,
            attack_rate_max: 80,
            trigger_ratio_min: 60,
            trigger_ratio_max: 90,
            reserve_ratio_min: 30,
            reserve_ratio_max: 60,
            expand_ratio_min: 15,
            expand_ratio_max: 25,
            spawn_search_delta: 25,
            spawn_attempts: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// Relation delta applied while an opponent embargoes us.
    pub embargo_malus: i32,
    /// 1-in-N chance per tick of proposing an alliance to a neighbor.
    pub alliance_proposal_odds: u32,
    /// An ally owning this many times our territory is a betrayal candidate.
    pub betrayal_share_factor: f64,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            embargo_malus: -20,
            alliance_proposal_odds: 20,
            betrayal_share_factor: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub build_plan: Vec<UnitType>,
    pub placement_samples: usize,
    pub warship_odds: u32,
    pub warship_search_radius: i32,
    pub warship_search_attempts: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            build_plan: vec![
                UnitType::City,
                UnitType::Port,
                UnitType::Warship,
                UnitType::Factory,
                UnitType::DefensePost,
                UnitType::SamLauncher,
                UnitType::MissileSilo,
            ],
            placement_samples: 20,
            warship_odds: 2,
            warship_search_radius: 250,
            warship_search_attempts: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteamrollMetric {
    KeyStructures,
    CitiesOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategicConfig {
    pub cooldown_ticks: Tick,
    /// 1-in-N chance of hesitating on an otherwise eligible tick.
    pub hesitation_odds: u32,
    pub target_cache_ticks: Tick,
    pub team_victory_share: f64,
    pub individual_victory_share: f64,
    pub steamroll_metric: SteamrollMetric,
    pub steamroll_gap: f64,
    pub steamroll_floor: usize,
    /// How long a MIRV impact area is avoided when aiming the next one.
    pub strike_memory_ticks: Tick,
    /// Past this tick a silo-less agent treats silos as urgent.
    pub silo_urgency_tick: Tick,
    pub reserve_floor: Gold,
    pub reserve_top_weight: f64,
    pub reserve_average_weight: f64,
    pub reserve_max_multiplier: f64,
    pub reserve_safety_margin: Gold,
    pub reserve_hard_cap: Gold,
}

impl Default for StrategicConfig {
    fn default() -> Self {
        Self {
            cooldown_ticks: 600,
            hesitation_odds: 7,
            target_cache_ticks: 20,
            team_victory_share: 0.80,
            individual_victory_share: 0.65,
            steamroll_metric: SteamrollMetric::KeyStructures,
            steamroll_gap: 1.5,
            steamroll_floor: 10,
            strike_memory_ticks: 3_000,
            silo_urgency_tick: 6_000,
            reserve_floor: 1_000_000,
            reserve_top_weight: 0.6,
            reserve_average_weight: 0.4,
            reserve_max_multiplier: 1.4,
            reserve_safety_margin: 10_000_000,
            reserve_hard_cap: 60_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilitaryConfig {
    pub enemy_memory_ticks: Tick,
    /// 1-in-N random boat when no land frontier exists.
    pub landlocked_boat_odds: u32,
    /// 1-in-N random boat otherwise.
    pub boat_odds: u32,
    pub boat_troop_divisor: u64,
    pub boat_search_radius: i32,
    pub boat_search_attempts: u32,
    /// A neighbor is "weak" when its troops times this ratio are below ours.
    pub strength_ratio: f64,
}

impl Default for MilitaryConfig {
    fn default() -> Self {
        Self {
            enemy_memory_ticks: 100,
            landlocked_boat_odds: 10,
            boat_odds: 20,
            boat_troop_divisor: 5,
            boat_search_radius: 150,
            boat_search_attempts: 500,
            strength_ratio: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    pub territory_samples: usize,
    pub strike_memory_ticks: Tick,
    pub value_radius: u32,
    pub sam_radius: u32,
    pub atom_damage_radius: u32,
    pub hydrogen_damage_radius: u32,
    pub mirv_damage_radius: u32,
    pub city_value: f64,
    pub missile_silo_value: f64,
    pub port_value: f64,
    pub defense_post_value: f64,
    pub sam_penalty: f64,
    pub silo_distance_weight: f64,
    pub recent_strike_penalty: f64,
    /// Candidates must score strictly above this.
    pub min_strike_score: f64,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            territory_samples: 10,
            strike_memory_ticks: 500,
            value_radius: 25,
            sam_radius: 50,
            atom_damage_radius: 15,
            hydrogen_damage_radius: 60,
            mirv_damage_radius: 25,
            city_value: 25_000.0,
            missile_silo_value: 50_000.0,
            port_value: 10_000.0,
            defense_post_value: 5_000.0,
            sam_penalty: 50_000.0,
            silo_distance_weight: 30.0,
            recent_strike_penalty: 1_000_000.0,
            min_strike_score: 0.0,
        }
    }
}

impl TargetingConfig {
    pub fn structure_value(&self, unit_type: UnitType) -> f64 {
        match unit_type {
            UnitType::City => self.city_value,
            UnitType::MissileSilo => self.missile_silo_value,
            UnitType::Port => self.port_value,
            UnitType::DefensePost => self.defense_post_value,
            _ => 0.0,
        }
    }

    pub fn damage_radius(&self, weapon: UnitType) -> u32 {
        match weapon {
            UnitType::HydrogenBomb => self.hydrogen_damage_radius,
            UnitType::Mirv => self.mirv_damage_radius,
            _ => self.atom_damage_radius,
        }
    }
}

impl AiConfig {
    /// Load a JSON config; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AiConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.cadence;
        check_range("cadence.attack_rate", c.attack_rate_min, c.attack_rate_max)?;
        if c.attack_rate_min == 0 {
            return Err(invalid("cadence.attack_rate_min", "must be at least 1"));
        }
        check_range("cadence.trigger_ratio", c.trigger_ratio_min, c.trigger_ratio_max)?;
        check_range("cadence.reserve_ratio", c.reserve_ratio_min, c.reserve_ratio_max)?;
        check_range("cadence.expand_ratio", c.expand_ratio_min, c.expand_ratio_max)?;

        if self.economy.build_plan.is_empty() {
            return Err(invalid("economy.build_plan", "must not be empty"));
        }

        let s = &self.strategic;
        for (field, share) in [
            ("strategic.team_victory_share", s.team_victory_share),
            ("strategic.individual_victory_share", s.individual_victory_share),
        ] {
            if !(share > 0.0 && share <= 1.0) {
                return Err(invalid(field, format!("{share} is outside (0, 1]")));
            }
        }
        if s.steamroll_gap < 1.0 {
            return Err(invalid("strategic.steamroll_gap", "must be at least 1.0"));
        }
        if s.reserve_max_multiplier < 1.0 {
            return Err(invalid(
                "strategic.reserve_max_multiplier",
                "must be at least 1.0",
            ));
        }
        if s.reserve_hard_cap < s.reserve_floor {
            return Err(invalid(
                "strategic.reserve_hard_cap",
                "must not be below reserve_floor",
            ));
        }
        if self.military.boat_troop_divisor == 0 {
            return Err(invalid("military.boat_troop_divisor", "must be non-zero"));
        }
        Ok(())
    }
}

fn check_range(field: &'static str, min: u32, max: u32) -> Result<()> {
    if min >= max {
        return Err(invalid(field, format!("empty range [{min}, {max})")));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> AiError {
    AiError::InvalidConfig {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AiConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AiConfig =
            serde_json::from_str(r#"{ "strategic": { "hesitation_odds": 0 } }"#).unwrap();
        assert_eq!(config.strategic.hesitation_odds, 0);
        assert_eq!(config.strategic.cooldown_ticks, 600);
        assert_eq!(config.cadence, CadenceConfig::default());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = AiConfig::default();
        config.cadence.attack_rate_min = 90;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            AiError::InvalidConfig { field: "cadence.attack_rate", .. }
        ));
    }

    #[test]
    fn test_rejects_cap_below_floor() {
        let mut config = AiConfig::default();
        config.strategic.reserve_hard_cap = 10;
        assert!(config.validate().is_err());
    }
}
