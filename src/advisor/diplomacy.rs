use super::{Advisor, AdvisorContext, AdvisorKind, Priority, Recommendation};
use crate::error::Result;
use crate::game::{Execution, GameView, PlayerId, Relation};
use crate::rng::PseudoRandom;
use rustc_hash::FxHashSet;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct DiplomacyAdvisor {
    /// Players whose embargo against us has already cost them relation.
    penalized: FxHashSet<PlayerId>,
}

impl DiplomacyAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_penalized(&self, other: PlayerId) -> bool {
        self.penalized.contains(&other)
    }

    /// Charge `malus` once when someone starts embargoing us and give it
    /// back once when they stop.
    pub fn update_relations_from_embargoes<G: GameView>(
        &mut self,
        game: &G,
        me: PlayerId,
        malus: i32,
    ) -> Vec<Execution> {
        self.penalized.retain(|&p| game.is_alive(p));

        let mut executions = Vec::new();
        for other in game.players() {
            if other == me {
                continue;
            }
            let embargoed = game.has_embargo_against(other, me);
            if embargoed && self.penalized.insert(other) {
                executions.push(Execution::UpdateRelation { other, delta: malus });
            } else if !embargoed && self.penalized.remove(&other) {
                executions.push(Execution::UpdateRelation {
                    other,
                    delta: -malus,
                });
            }
        }
        executions
    }

    /// Embargo hostile players, lift embargoes once relations recover to
    /// neutral. Distrustful leaves the current state alone.
    pub fn enforce_hostile_embargoes<G: GameView>(&self, game: &G, me: PlayerId) -> Vec<Execution> {
        let mut executions = Vec::new();
        for other in game.players() {
            if other == me {
                continue;
            }
            let relation = game.relation(me, other);
            let embargoing = game.has_embargo_against(me, other);
            if relation <= Relation::Hostile && !embargoing && !game.is_friendly(me, other) {
                executions.push(Execution::Embargo { other });
            } else if relation >= Relation::Neutral && embargoing {
                executions.push(Execution::StopEmbargo { other });
            }
        }
        executions
    }

    /// Accept requests from players we don't dislike or embargo.
    pub fn answer_alliance_requests<G: GameView>(&self, game: &G, me: PlayerId) -> Vec<Execution> {
        game.incoming_alliance_requests(me)
            .into_iter()
            .map(|requestor| {
                let accept = game.relation(me, requestor) >= Relation::Neutral
                    && !game.has_embargo_against(me, requestor);
                Execution::AllianceReply { requestor, accept }
            })
            .collect()
    }

    pub fn propose_alliance<G: GameView>(
        &self,
        game: &G,
        rng: &mut PseudoRandom,
        me: PlayerId,
        odds: u32,
    ) -> Option<Execution> {
        if !rng.chance(odds) {
            return None;
        }
        let candidates: Vec<PlayerId> = game
            .neighbor_players(me)
            .into_iter()
            .filter(|&p| {
                game.can_send_alliance_request(me, p) && game.relation(me, p) >= Relation::Neutral
            })
            .collect();
        rng.rand_element(&candidates)
            .map(|&recipient| Execution::AllianceRequest { recipient })
    }

    /// Allies large enough that the alliance mostly benefits them.
    pub fn betrayal_candidates<G: GameView>(
        &self,
        game: &G,
        me: PlayerId,
        share_factor: f64,
    ) -> Vec<PlayerId> {
        let mine = game.tiles_owned(me) as f64;
        game.players()
            .into_iter()
            .filter(|&p| p != me && game.is_allied_with(me, p))
            .filter(|&p| game.tiles_owned(p) as f64 > mine * share_factor)
            .collect()
    }

    /// Never breaks an alliance for now.
    pub fn decide_betrayal<G: GameView>(
        &self,
        _game: &G,
        _me: PlayerId,
        _candidates: &[PlayerId],
    ) -> Option<Execution> {
        None
    }
}

impl<G: GameView> Advisor<G> for DiplomacyAdvisor {
    fn kind(&self) -> AdvisorKind {
        AdvisorKind::Diplomacy
    }

    fn recommend(&mut self, ctx: &mut AdvisorContext<'_, G>) -> Result<Option<Recommendation>> {
        let config = ctx.config;
        let cfg = &config.diplomacy;
        let (game, me) = (ctx.game, ctx.player);

        let mut executions = self.update_relations_from_embargoes(game, me, cfg.embargo_malus);
        let relation_updates = executions.len();
        executions.extend(self.enforce_hostile_embargoes(game, me));
        let embargo_changes = executions.len() - relation_updates;
        executions.extend(self.answer_alliance_requests(game, me));

        let candidates = self.betrayal_candidates(game, me, cfg.betrayal_share_factor);
        if !candidates.is_empty() {
            debug!(player = %me, candidates = candidates.len(), "betrayal candidates");
        }
        executions.extend(self.decide_betrayal(game, me, &candidates));
        executions.extend(self.propose_alliance(game, ctx.rng, me, cfg.alliance_proposal_odds));

        if executions.is_empty() {
            return Ok(None);
        }
        let reason = format!(
            "{} relation update(s), {} embargo change(s), {} other",
            relation_updates,
            embargo_changes,
            executions.len() - relation_updates - embargo_changes
        );
        Ok(Some(Recommendation::new(
            AdvisorKind::Diplomacy,
            executions.clone(),
            executions.len() as f64,
            Priority::Normal,
            reason,
        )))
    }
}
