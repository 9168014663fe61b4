//! # Agent Registry
//!
//! The immutable catalog of marketing personas and the fixed order in which
//! a global command walks them. Built once at startup and shared by `Arc`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::prompts;

/// Identity of a registered agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentId {
    Strategist,
    Copywriter,
    FunnelExpert,
    SocialMediaConsultant,
    LeadMagnetCreator,
    VideoScripter,
    EmailEditor,
}

impl AgentId {
    /// Stable wire name, matching the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strategist => "STRATEGIST",
            Self::Copywriter => "COPYWRITER",
            Self::FunnelExpert => "FUNNEL_EXPERT",
            Self::SocialMediaConsultant => "SOCIAL_MEDIA_CONSULTANT",
            Self::LeadMagnetCreator => "LEAD_MAGNET_CREATOR",
            Self::VideoScripter => "VIDEO_SCRIPTER",
            Self::EmailEditor => "EMAIL_EDITOR",
        }
    }

    /// Every agent id, in registration order
    pub fn all() -> [AgentId; 7] {
        [
            Self::Strategist,
            Self::Copywriter,
            Self::FunnelExpert,
            Self::SocialMediaConsultant,
            Self::LeadMagnetCreator,
            Self::VideoScripter,
            Self::EmailEditor,
        ]
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown agent id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown agent id: {0}")]
pub struct UnknownAgentId(pub String);

impl FromStr for AgentId {
    type Err = UnknownAgentId;

    /// Accepts the wire name in any case, with `-` or `_` separators
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        AgentId::all()
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| UnknownAgentId(s.to_string()))
    }
}

/// A persona definition
#[derive(Debug, Clone, Serialize)]
pub struct AgentProfile {
    pub id: AgentId,
    pub name: &'static str,
    pub description: &'static str,
    /// Sent as the system instruction for every generation call
    pub system_instruction: &'static str,
    /// Display color hint for front-ends
    pub color: &'static str,
}

/// The agent catalog plus the default orchestration order
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    profiles: Vec<AgentProfile>,
    order: Vec<AgentId>,
}

impl Default for AgentRegistry {
    /// The built-in marketing team.
    ///
    /// Funnel Expert and Video Scripter are available for chat and
    /// regeneration but are not part of the automatic sequence.
    fn default() -> Self {
        Self::new(
            default_profiles(),
            vec![
                AgentId::Strategist,
                AgentId::Copywriter,
                AgentId::SocialMediaConsultant,
                AgentId::EmailEditor,
                AgentId::LeadMagnetCreator,
            ],
        )
    }
}

impl AgentRegistry {
    /// Build a registry from explicit profiles and order.
    ///
    /// The order may name ids without a profile; orchestration skips them.
    pub fn new(profiles: Vec<AgentProfile>, order: Vec<AgentId>) -> Self {
        Self { profiles, order }
    }

    /// Look up a registered agent
    pub fn lookup(&self, id: AgentId) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// All registered profiles in display order
    pub fn agents(&self) -> &[AgentProfile] {
        &self.profiles
    }

    /// All registered ids in display order
    pub fn all_agent_ids(&self) -> Vec<AgentId> {
        self.profiles.iter().map(|p| p.id).collect()
    }

    /// The fixed sequence used by a global command
    pub fn orchestration_order(&self) -> &[AgentId] {
        &self.order
    }

    /// Index of an agent within the orchestration order
    pub fn position(&self, id: AgentId) -> Option<usize> {
        self.order.iter().position(|o| *o == id)
    }

    /// Agent name, or a fallback for ids without a profile
    pub fn display_name<'a>(&'a self, id: AgentId, fallback: &'a str) -> &'a str {
        self.lookup(id).map(|p| p.name).unwrap_or(fallback)
    }
}

fn default_profiles() -> Vec<AgentProfile> {
    vec![
        AgentProfile {
            id: AgentId::Strategist,
            name: "Campaign Strategist",
            description: "Develops comprehensive marketing strategies.",
            system_instruction: prompts::STRATEGIST.trim_end(),
            color: "bg-blue-600",
        },
        AgentProfile {
            id: AgentId::Copywriter,
            name: "Ad Copywriter",
            description: "Crafts compelling ad copy and marketing texts.",
            system_instruction: prompts::COPYWRITER.trim_end(),
            color: "bg-purple-600",
        },
        AgentProfile {
            id: AgentId::FunnelExpert,
            name: "Sales Funnel Expert",
            description: "Designs and optimizes sales funnels.",
            system_instruction: prompts::FUNNEL_EXPERT.trim_end(),
            color: "bg-green-600",
        },
        AgentProfile {
            id: AgentId::SocialMediaConsultant,
            name: "Social Media Consultant",
            description: "Advises on social media strategy and content.",
            system_instruction: prompts::SOCIAL_MEDIA_CONSULTANT.trim_end(),
            color: "bg-pink-600",
        },
        AgentProfile {
            id: AgentId::LeadMagnetCreator,
            name: "eBook & Lead Magnet Creator",
            description: "Generates ideas and outlines for lead magnets.",
            system_instruction: prompts::LEAD_MAGNET_CREATOR.trim_end(),
            color: "bg-yellow-500",
        },
        AgentProfile {
            id: AgentId::VideoScripter,
            name: "Short Video Scripter",
            description: "Writes scripts for short-form videos.",
            system_instruction: prompts::VIDEO_SCRIPTER.trim_end(),
            color: "bg-red-600",
        },
        AgentProfile {
            id: AgentId::EmailEditor,
            name: "Email Sequence Editor",
            description: "Drafts and refines email marketing sequences.",
            system_instruction: prompts::EMAIL_EDITOR.trim_end(),
            color: "bg-teal-600",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_id_is_registered() {
        let registry = AgentRegistry::default();
        for id in AgentId::all() {
            assert!(registry.lookup(id).is_some(), "{} missing", id);
        }
        assert_eq!(registry.all_agent_ids(), AgentId::all().to_vec());
    }

    #[test]
    fn test_orchestration_order_excludes_specialists() {
        let registry = AgentRegistry::default();
        let order = registry.orchestration_order();
        assert_eq!(order.len(), 5);
        assert_eq!(order[0], AgentId::Strategist);
        assert!(!order.contains(&AgentId::FunnelExpert));
        assert!(!order.contains(&AgentId::VideoScripter));
        assert_eq!(registry.position(AgentId::EmailEditor), Some(3));
        assert_eq!(registry.position(AgentId::VideoScripter), None);
    }

    #[test]
    fn test_agent_id_parsing() {
        assert_eq!("STRATEGIST".parse::<AgentId>(), Ok(AgentId::Strategist));
        assert_eq!(
            "social-media-consultant".parse::<AgentId>(),
            Ok(AgentId::SocialMediaConsultant)
        );
        assert!("growth_hacker".parse::<AgentId>().is_err());
    }

    #[test]
    fn test_agent_id_serialization() {
        let json = serde_json::to_string(&AgentId::LeadMagnetCreator).unwrap();
        assert_eq!(json, "\"LEAD_MAGNET_CREATOR\"");
    }

    #[test]
    fn test_instructions_are_trimmed() {
        let registry = AgentRegistry::default();
        let strategist = registry.lookup(AgentId::Strategist).unwrap();
        assert!(!strategist.system_instruction.ends_with('\n'));
        assert!(strategist.system_instruction.ends_with("strategic insights."));
    }
}
