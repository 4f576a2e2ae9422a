pub mod calculator;
pub mod goals;
pub mod periods;
pub mod report;

pub use calculator::{calculate_emi, future_value, mutual_fund_savings, EmiBreakdown};
pub use goals::{is_financial_goal_query, plan_goal, GoalEntities, GoalEntityExtractor, GoalPlan};
pub use periods::{InvestmentPeriod, DASHBOARD_PERIODS};
pub use report::{build_report, FundProjection, InvestmentReport};
