//! Business categories, their default criteria text and leaderboard weights.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::ArenaError;

/// The business domain an agent is evaluated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    SalesDevelopment,
    Marketing,
    CustomerSupport,
    BusinessAnalyst,
    Recruiter,
    GeneralPurpose,
}

const SALES_DEVELOPMENT_CRITERIA: &str = "\
Evaluate SDR agent performance on:
- Conversation Quality: Natural dialogue flow, appropriate responses, understanding context
- Lead Qualification: Accurate BANT assessment, identifying decision makers, pain points
- Response Relevance: Addressing specific customer needs, staying on topic
- Follow-up Strategy: Timing, persistence, multi-channel approach
- Sales Process: Following methodology, moving leads through pipeline
- Objection Handling: Identifying and addressing concerns effectively";

const MARKETING_CRITERIA: &str = "\
Evaluate marketing agent performance on:
- Content Quality: Clarity, engagement, brand voice consistency
- Audience Targeting: Understanding demographics, personalization
- Campaign Strategy: Goal alignment, channel selection, timing
- Creativity: Unique approaches, innovative ideas
- Brand Consistency: Message alignment, visual guidelines
- Performance Analysis: Metric interpretation, optimization suggestions";

const CUSTOMER_SUPPORT_CRITERIA: &str = "\
Evaluate support agent performance on:
- Resolution Quality: Complete and accurate problem solving
- Response Time: Speed of initial and follow-up responses
- Empathy: Understanding customer frustration, appropriate tone
- Technical Accuracy: Correct solutions, product knowledge
- Process Adherence: Following support protocols
- Documentation: Ticket details, solution recording";

const BUSINESS_ANALYST_CRITERIA: &str = "\
Evaluate analyst agent performance on:
- Insight Depth: Meaningful patterns, actionable findings
- Data Coverage: Comprehensive analysis, relevant data sources
- Methodology: Appropriate analytical approaches
- Actionability: Clear recommendations, business impact
- Communication: Clear presentation of findings
- Technical Rigor: Statistical validity, data quality";

const RECRUITER_CRITERIA: &str = "\
Evaluate recruiter agent performance on:
- Candidate Matching: Skills alignment, culture fit assessment
- Communication: Clear, professional interactions
- Evaluation Quality: Thorough candidate assessment
- Process Efficiency: Time-to-fill, candidate pipeline
- Compliance: Following hiring regulations, documentation
- Candidate Experience: Professional treatment, timely updates";

const GENERAL_PURPOSE_CRITERIA: &str = "\
Evaluate general agent performance on:
- Task Completion: Meeting objectives, accuracy
- Output Quality: Thoroughness, correctness
- Efficiency: Time and resource usage
- Adaptability: Handling various tasks
- Communication: Clear interaction style
- Problem Solving: Approach to challenges";

impl AgentCategory {
    pub const ALL: [AgentCategory; 6] = [
        AgentCategory::SalesDevelopment,
        AgentCategory::Marketing,
        AgentCategory::CustomerSupport,
        AgentCategory::BusinessAnalyst,
        AgentCategory::Recruiter,
        AgentCategory::GeneralPurpose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentCategory::SalesDevelopment => "sales_development",
            AgentCategory::Marketing => "marketing",
            AgentCategory::CustomerSupport => "customer_support",
            AgentCategory::BusinessAnalyst => "business_analyst",
            AgentCategory::Recruiter => "recruiter",
            AgentCategory::GeneralPurpose => "general_purpose",
        }
    }

    /// Parse a stored label, falling back to `GeneralPurpose` for unknown ones.
    pub fn from_label_or_general(label: &str) -> Self {
        label.parse().unwrap_or(AgentCategory::GeneralPurpose)
    }

    /// Natural-language default criteria handed to the criteria parser.
    pub fn default_criteria(&self) -> &'static str {
        match self {
            AgentCategory::SalesDevelopment => SALES_DEVELOPMENT_CRITERIA,
            AgentCategory::Marketing => MARKETING_CRITERIA,
            AgentCategory::CustomerSupport => CUSTOMER_SUPPORT_CRITERIA,
            AgentCategory::BusinessAnalyst => BUSINESS_ANALYST_CRITERIA,
            AgentCategory::Recruiter => RECRUITER_CRITERIA,
            AgentCategory::GeneralPurpose => GENERAL_PURPOSE_CRITERIA,
        }
    }

    /// Default criteria, optionally extended with company-specific text.
    pub fn criteria_text(&self, custom: Option<&str>) -> String {
        match custom.map(str::trim).filter(|c| !c.is_empty()) {
            Some(custom) => merge_custom_criteria(self.default_criteria(), custom),
            None => self.default_criteria().to_string(),
        }
    }

    /// Fixed leaderboard weight table, keyed by metric name.
    pub fn leaderboard_weights(&self) -> &'static [(&'static str, f64)] {
        match self {
            AgentCategory::SalesDevelopment => &[
                ("conversation_quality", 2.0),
                ("lead_qualification", 2.0),
                ("response_relevance", 1.5),
                ("follow_up_strategy", 1.5),
            ],
            AgentCategory::Marketing => &[
                ("content_quality", 2.0),
                ("audience_targeting", 2.0),
                ("campaign_strategy", 1.5),
                ("creativity", 1.5),
            ],
            AgentCategory::CustomerSupport => &[
                ("resolution_quality", 2.0),
                ("response_time", 1.5),
                ("empathy", 2.0),
                ("accuracy", 1.5),
            ],
            AgentCategory::BusinessAnalyst => &[
                ("insight_depth", 2.0),
                ("data_coverage", 1.5),
                ("actionability", 2.0),
                ("methodology", 1.5),
            ],
            AgentCategory::Recruiter => &[
                ("candidate_matching", 2.0),
                ("communication", 1.5),
                ("evaluation_quality", 2.0),
                ("process_efficiency", 1.5),
            ],
            AgentCategory::GeneralPurpose => &[
                ("task_completion", 1.0),
                ("output_quality", 1.0),
                ("efficiency", 1.0),
                ("adaptability", 1.0),
            ],
        }
    }
}

/// Merge company-specific criteria into a default criteria text.
pub fn merge_custom_criteria(base: &str, custom: &str) -> String {
    format!(
        "Standard Evaluation Criteria:\n{}\n\nCompany-Specific Criteria:\n{}",
        base.trim(),
        custom.trim()
    )
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentCategory {
    type Err = ArenaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AgentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ArenaError::UnknownCategory(s.to_string()))
    }
}
