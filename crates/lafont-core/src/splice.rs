// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rewrite splice: replace a matched pair with a template subgraph.
//!
//! Splicing runs in two phases. Planning reads the network, validates the
//! template against the matched agents and builds every agent and connection
//! the rewrite will create. Applying performs the mutations and cannot fail,
//! so a rejected template leaves the network untouched.
use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::agent::Agent;
use crate::connection::{Connection, ConnectionKey};
use crate::ident::AgentId;
use crate::network::{Network, NetworkError};
use crate::port::PortRef;
use crate::reduce::RewriteInstance;
use crate::rule::Rule;
use crate::template::{MatchedSide, RewriteTemplate, TemplateError, TemplateId, TemplatePort};

/// Everything a splice will do, computed before any mutation.
#[derive(Debug)]
struct SplicePlan {
    agents: Vec<Agent>,
    links: Vec<Connection>,
    drops: Vec<ConnectionKey>,
    redirects: Vec<(Connection, PortRef, PortRef)>,
    consumed: [AgentId; 2],
}

impl Network {
    pub(crate) fn splice(
        &mut self,
        rule: &Rule,
        template: &RewriteTemplate,
        inst: &RewriteInstance,
    ) -> Result<(), NetworkError> {
        let plan = self
            .plan_splice(template, inst)
            .map_err(|source| NetworkError::Template {
                rule: rule.name().to_owned(),
                source,
            })?;
        self.apply_splice(plan);
        Ok(())
    }

    fn plan_splice(
        &self,
        template: &RewriteTemplate,
        inst: &RewriteInstance,
    ) -> Result<SplicePlan, TemplateError> {
        template.validate()?;
        let matched = [
            (MatchedSide::Left, self.agent(inst.left)),
            (MatchedSide::Right, self.agent(inst.right)),
        ];
        for (side, agent) in &matched {
            let Some(agent) = agent else { continue };
            if let Some(port) = template
                .port_map(*side)
                .keys()
                .find(|p| !agent.has_port(p))
            {
                return Err(TemplateError::UnknownMatchedPort {
                    side: *side,
                    agent: agent.name().to_owned(),
                    port: port.clone(),
                });
            }
        }

        let created = template.instantiate()?;
        let ids: BTreeMap<TemplateId, AgentId> =
            created.iter().map(|(tid, agent)| (tid.clone(), agent.id())).collect();
        let resolve = |tp: &TemplatePort| -> Result<PortRef, TemplateError> {
            ids.get(&tp.template)
                .map(|id| PortRef::new(*id, tp.port.clone()))
                .ok_or_else(|| TemplateError::UnresolvedTemplateReference(tp.template.clone()))
        };

        let mut plan = SplicePlan {
            agents: created.into_iter().map(|(_, agent)| agent).collect(),
            links: Vec::new(),
            drops: Vec::new(),
            redirects: Vec::new(),
            consumed: [inst.left, inst.right],
        };
        for link in &template.links {
            plan.links
                .push(Connection::new(resolve(&link.a)?, resolve(&link.b)?, link.name.clone()));
        }
        let mut seen: BTreeSet<ConnectionKey> = BTreeSet::new();
        for (side, agent) in matched {
            let Some(agent) = agent else { continue };
            let other = match side {
                MatchedSide::Left => inst.right,
                MatchedSide::Right => inst.left,
            };
            let map = template.port_map(side);
            for (port, entry) in map {
                let here = agent.port_ref(port);
                let Some(conn) = self.connection_at(&here) else {
                    continue;
                };
                if !seen.insert(conn.key().clone()) {
                    continue;
                }
                let Some(far) = conn.far_end(&here) else {
                    continue;
                };
                if far.agent == other {
                    plan.drops.push(conn.key().clone());
                    continue;
                }
                let Some(target) = entry else {
                    plan.drops.push(conn.key().clone());
                    continue;
                };
                if far.agent == agent.id() {
                    // loop between two ports of one matched agent
                    plan.drops.push(conn.key().clone());
                    if let Some(Some(far_target)) = map.get(&far.port) {
                        plan.links.push(Connection::new(
                            resolve(target)?,
                            resolve(far_target)?,
                            Some(conn.name().to_owned()),
                        ));
                    }
                    continue;
                }
                plan.redirects.push((conn.clone(), here, resolve(target)?));
            }
        }
        Ok(plan)
    }

    fn apply_splice(&mut self, plan: SplicePlan) {
        for agent in plan.agents {
            self.insert_agent(agent);
        }
        for link in plan.links {
            self.insert_connection(link);
        }
        for key in &plan.drops {
            self.take_connection(key);
        }
        for (old, here, target) in plan.redirects {
            if self.take_connection(old.key()).is_some() {
                trace!(from = %here, to = %target, "redirect");
                self.insert_connection(old.rewired(&here, target));
            }
        }
        for id in plan.consumed {
            self.detach_agent(id);
        }
    }
}
