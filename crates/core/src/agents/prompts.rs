//! Persona instruction texts bundled at compile time.
//!
//! Each agent is conditioned with one of these as its system instruction.

/// Campaign Strategist - overall marketing strategy
pub const STRATEGIST: &str = include_str!("defaults/strategist.md");

/// Ad Copywriter - headlines, ads and landing page copy
pub const COPYWRITER: &str = include_str!("defaults/copywriter.md");

/// Sales Funnel Expert - funnel stages and conversion points
pub const FUNNEL_EXPERT: &str = include_str!("defaults/funnel_expert.md");

/// Social Media Consultant - platform strategy and post ideas
pub const SOCIAL_MEDIA_CONSULTANT: &str = include_str!("defaults/social_media_consultant.md");

/// eBook & Lead Magnet Creator - lead magnet outlines
pub const LEAD_MAGNET_CREATOR: &str = include_str!("defaults/lead_magnet_creator.md");

/// Short Video Scripter - short-form video scripts
pub const VIDEO_SCRIPTER: &str = include_str!("defaults/video_scripter.md");

/// Email Sequence Editor - welcome, nurture and sales sequences
pub const EMAIL_EDITOR: &str = include_str!("defaults/email_editor.md");

/// All persona instructions with their slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("strategist", STRATEGIST),
        ("copywriter", COPYWRITER),
        ("funnel_expert", FUNNEL_EXPERT),
        ("social_media_consultant", SOCIAL_MEDIA_CONSULTANT),
        ("lead_magnet_creator", LEAD_MAGNET_CREATOR),
        ("video_scripter", VIDEO_SCRIPTER),
        ("email_editor", EMAIL_EDITOR),
    ]
}
