//! Financial-goal planning.
//!
//! Turns a sentence such as "I want to buy a car for 800000 in 2 years" into a
//! loan plan: savings projected over the horizon reduce the loan, and the plan
//! compares a standard EMI tenure against an extended one whose monthly
//! difference is invested in a mutual fund.

use crate::error::{AssistantError, Result};
use crate::llm::client::LanguageModel;
use crate::llm::prompts::{goal_entities_prompt, GOAL_ENTITIES_SYSTEM_PROMPT};
use crate::llm::types::{ChatMessage, SamplingConfig};
use crate::llm::utils::clean_json_output;
use crate::planning::calculator::{calculate_emi, future_value, mutual_fund_savings, EmiBreakdown};
use crate::planning::periods::InvestmentPeriod;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;

pub const GOAL_SAMPLING: SamplingConfig = SamplingConfig::new(150, 0.2, None);

/// Annual return assumed for the invested EMI difference.
pub const MUTUAL_FUND_RETURN_PCT: f64 = 15.0;

const GOAL_KEYWORDS: [&str; 21] = [
    "buy a car",
    "buy a home",
    "buy a bike",
    "purchase a car",
    "purchase a home",
    "purchase a bike",
    "plan to buy a car",
    "plan to buy a home",
    "plan to buy a bike",
    "intend to buy a car",
    "intend to buy a home",
    "intend to buy a bike",
    "saving for a car",
    "saving for a home",
    "saving for a bike",
    "goal to buy a car",
    "goal to buy a home",
    "goal to buy a bike",
    "want to buy a car",
    "want to buy a home",
    "want to buy a bike",
];

fn goal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:buy|purchase|plan to buy|intend to buy|saving for|goal to buy|want to buy)\s+a\s+(car|home|bike)\b",
        )
        .expect("goal regex")
    })
}

pub fn is_financial_goal_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    GOAL_KEYWORDS.iter().any(|k| lower.contains(k)) || goal_re().is_match(&lower)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Car,
    Home,
    Marriage,
    Personal,
    Other,
}

impl AssetKind {
    pub fn loan_rate_pct(self) -> f64 {
        match self {
            AssetKind::Car => 8.0,
            AssetKind::Home => 7.0,
            AssetKind::Marriage => 10.0,
            AssetKind::Personal => 12.0,
            AssetKind::Other => 7.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEntities {
    pub assets: Vec<String>,
    pub time_period: Vec<String>,
    #[serde(deserialize_with = "amounts")]
    pub total_amount: Vec<f64>,
}

// Models sometimes quote numbers or add separators.
fn amounts<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    Vec::<Amount>::deserialize(deserializer)?
        .into_iter()
        .map(|amount| match amount {
            Amount::Number(n) => Ok(n),
            Amount::Text(s) => s
                .replace(',', "")
                .trim()
                .parse::<f64>()
                .map_err(serde::de::Error::custom),
        })
        .collect()
}

impl GoalEntities {
    /// First recognised asset, in priority order car, home, marriage,
    /// personal.
    pub fn asset_kind(&self) -> AssetKind {
        let has = |name: &str| self.assets.iter().any(|a| a.trim().eq_ignore_ascii_case(name));
        [
            ("car", AssetKind::Car),
            ("home", AssetKind::Home),
            ("marriage", AssetKind::Marriage),
            ("personal", AssetKind::Personal),
        ]
        .into_iter()
        .find(|(name, _)| has(name))
        .map(|(_, kind)| kind)
        .unwrap_or(AssetKind::Other)
    }

    pub fn period(&self) -> Result<InvestmentPeriod> {
        let raw = self
            .time_period
            .first()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AssistantError::InvalidInput(
                    "Time period or total amount is missing in the input sentence.".to_string(),
                )
            })?;
        raw.parse::<InvestmentPeriod>().or_else(|e| {
            // "2years" -> "2year"
            raw.trim()
                .strip_suffix('s')
                .map(str::parse::<InvestmentPeriod>)
                .unwrap_or(Err(e))
        })
    }

    pub fn amount(&self) -> Result<f64> {
        self.total_amount
            .first()
            .copied()
            .filter(|a| *a > 0.0)
            .ok_or_else(|| {
                AssistantError::InvalidInput(
                    "Time period or total amount is missing in the input sentence.".to_string(),
                )
            })
    }
}

/// Loan tenure picked by goal size.
pub fn emi_tenure_years(amount: f64) -> u32 {
    if amount > 3_000_000.0 {
        10
    } else if amount > 2_000_000.0 {
        7
    } else if amount > 1_500_000.0 {
        5
    } else if amount > 1_000_000.0 {
        3
    } else if amount > 500_000.0 {
        2
    } else {
        1
    }
}

pub fn extended_tenure_years(years: u32) -> u32 {
    match years {
        1 => 3,
        2 => 5,
        3 | 5 => 7,
        7 => 9,
        10 => 12,
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPlan {
    pub asset: AssetKind,
    pub time_period: InvestmentPeriod,
    pub goal_amount: f64,
    pub monthly_saving: f64,
    /// Savings projected over `time_period` in the best fund for it.
    pub projected_savings: f64,
    pub loan_amount: f64,
    pub loan_rate_pct: f64,
    pub standard: EmiBreakdown,
    pub extended: EmiBreakdown,
    pub monthly_emi_difference: f64,
    /// The monthly EMI difference invested over the extended tenure.
    pub mutual_fund_savings: f64,
    /// Extended-plan total minus the mutual fund savings.
    pub net_cost: f64,
}

/// Builds a plan. `fund_return_pct` is the best fund return for the goal's
/// horizon; without one, no savings are projected.
pub fn plan_goal(
    entities: &GoalEntities,
    monthly_saving: f64,
    fund_return_pct: Option<f64>,
) -> Result<GoalPlan> {
    let time_period = entities.period()?;
    let goal_amount = entities.amount()?;
    let asset = entities.asset_kind();
    let loan_rate_pct = asset.loan_rate_pct();

    let projected_savings = match fund_return_pct {
        Some(pct) => future_value(monthly_saving, pct, time_period.years())?,
        None => 0.0,
    };
    let loan_amount = (goal_amount - projected_savings).max(0.0);

    let standard_years = emi_tenure_years(goal_amount);
    let standard = calculate_emi(loan_amount, loan_rate_pct, standard_years)?;
    let extended = calculate_emi(
        loan_amount,
        loan_rate_pct,
        extended_tenure_years(standard_years),
    )?;

    let monthly_emi_difference = (standard.emi - extended.emi).max(0.0);
    let mf_savings =
        mutual_fund_savings(monthly_emi_difference, extended.years, MUTUAL_FUND_RETURN_PCT)?;

    info!(
        "Planned {:?} goal of {:.2}: loan {:.2} over {} or {} years",
        asset, goal_amount, loan_amount, standard.years, extended.years
    );

    Ok(GoalPlan {
        asset,
        time_period,
        goal_amount,
        monthly_saving,
        projected_savings,
        loan_amount,
        loan_rate_pct,
        net_cost: extended.total_amount - mf_savings,
        standard,
        extended,
        monthly_emi_difference,
        mutual_fund_savings: mf_savings,
    })
}

pub struct GoalEntityExtractor<M> {
    model: M,
}

impl<M: LanguageModel> GoalEntityExtractor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub async fn extract(&self, sentence: &str) -> Result<GoalEntities> {
        let messages = [
            ChatMessage::system(GOAL_ENTITIES_SYSTEM_PROMPT),
            ChatMessage::user(goal_entities_prompt(sentence)),
        ];
        let raw = self.model.complete(&messages, &GOAL_SAMPLING).await?;
        debug!("Goal entities reply: {}", raw);

        serde_json::from_str(&clean_json_output(&raw)).map_err(|e| {
            AssistantError::MalformedResponse(format!(
                "Unexpected format of the response: {} ({})",
                raw.trim(),
                e
            ))
        })
    }
}
