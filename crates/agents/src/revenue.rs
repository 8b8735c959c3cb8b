//! Revenue agent - picks the most profitable mining profile from live prices.

use crate::agent::{AgentProfile, TaskProcessor};
use crate::prices::{PriceFeed, PriceMap};
use async_trait::async_trait;
use luxrig_common::{now_millis, AgentCapability, LuxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

const TRACKED_ASSETS: [&str; 5] = ["bitcoin", "ethereum", "solana", "monero", "ravencoin"];
const IDLE_PROFILE: &str = "idle";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RevenueTask {
    GetStatus,
    OptimizeRevenue {
        #[serde(default)]
        config: OptimizeConfig,
    },
    StopMining,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeConfig {
    /// USD per kWh
    #[serde(default = "default_electricity_cost")]
    pub electricity_cost: f64,
}

fn default_electricity_cost() -> f64 {
    0.12
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            electricity_cost: default_electricity_cost(),
        }
    }
}

/// Estimated daily profit per mining profile, in USD.
pub type Profitability = BTreeMap<String, f64>;

/// What the agent remembers between tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueState {
    pub current_profile: String,
    pub last_check: Option<u64>,
    pub estimated_daily_revenue: f64,
    pub prices: Option<PriceMap>,
    pub profitability: Option<Profitability>,
}

impl Default for RevenueState {
    fn default() -> Self {
        Self {
            current_profile: IDLE_PROFILE.to_string(),
            last_check: None,
            estimated_daily_revenue: 0.0,
            prices: None,
            profitability: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueStatus {
    #[serde(flatten)]
    pub state: RevenueState,
    /// Prices fetched for this status call
    pub live_prices: PriceMap,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub previous_profile: String,
    pub new_profile: String,
    pub prices: PriceMap,
    pub profitability: Profitability,
    pub estimated_daily_revenue: f64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopReport {
    pub status: String,
    pub previous_profile: String,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RevenueOutput {
    Status(RevenueStatus),
    OptimizationComplete(OptimizationReport),
    Stopped(StopReport),
}

/// Revenue agent. Holds its state internally; callers share one instance by
/// passing it around rather than through a global.
pub struct RevenueAgent {
    prices: Arc<dyn PriceFeed>,
    state: RwLock<RevenueState>,
}

impl RevenueAgent {
    pub fn new(prices: Arc<dyn PriceFeed>) -> Self {
        Self {
            prices,
            state: RwLock::new(RevenueState::default()),
        }
    }

    pub async fn state(&self) -> RevenueState {
        self.state.read().await.clone()
    }

    pub async fn get_status(&self) -> Result<RevenueStatus> {
        let live_prices = self.prices.get_prices(&TRACKED_ASSETS).await?;
        Ok(RevenueStatus {
            state: self.state().await,
            live_prices,
            timestamp: now_millis(),
        })
    }

    pub async fn optimize_revenue(&self, config: &OptimizeConfig) -> Result<OptimizationReport> {
        let prices = self.prices.get_prices(&TRACKED_ASSETS).await?;
        let profitability = compute_profitability(&prices, config.electricity_cost)?;
        let (best_profile, max_profit) = best_profile(&profitability);

        let mut state = self.state.write().await;
        let previous_profile = state.current_profile.clone();
        if best_profile != previous_profile {
            info!(from = %previous_profile, to = %best_profile, "Switching mining profile");
            state.current_profile = best_profile.clone();
        }
        state.last_check = Some(now_millis());
        state.estimated_daily_revenue = max_profit;
        state.prices = Some(prices.clone());
        state.profitability = Some(profitability.clone());

        Ok(OptimizationReport {
            previous_profile,
            new_profile: best_profile,
            prices,
            profitability,
            estimated_daily_revenue: max_profit,
            timestamp: now_millis(),
        })
    }

    pub async fn stop_mining(&self) -> StopReport {
        let mut state = self.state.write().await;
        let previous_profile = std::mem::replace(&mut state.current_profile, IDLE_PROFILE.to_string());
        state.estimated_daily_revenue = 0.0;
        info!(from = %previous_profile, "Mining stopped");
        StopReport {
            status: "stopped".to_string(),
            previous_profile,
            timestamp: now_millis(),
        }
    }
}

fn usd(prices: &PriceMap, id: &str) -> Result<f64> {
    prices
        .get(id)
        .map(|q| q.usd)
        .ok_or_else(|| LuxError::Price(format!("no quote for {id}")))
}

/// Daily profit estimates from nominal hashrate and power draw per profile.
pub fn compute_profitability(prices: &PriceMap, electricity_cost: f64) -> Result<Profitability> {
    let mut profitability = Profitability::new();
    profitability.insert(IDLE_PROFILE.to_string(), 0.0);
    profitability.insert(
        "mining_eth".to_string(),
        0.005 * usd(prices, "ethereum")? - 2.5 * electricity_cost,
    );
    profitability.insert(
        "mining_rvn".to_string(),
        50.0 * usd(prices, "ravencoin")? - 2.8 * electricity_cost,
    );
    profitability.insert(
        "mining_xmr".to_string(),
        0.01 * usd(prices, "monero")? - 1.0 * electricity_cost,
    );
    Ok(profitability)
}

/// The profile with the strictly greatest positive profit, else idle.
pub fn best_profile(profitability: &Profitability) -> (String, f64) {
    let mut best = (IDLE_PROFILE.to_string(), 0.0);
    for (profile, profit) in profitability {
        if *profit > best.1 {
            best = (profile.clone(), *profit);
        }
    }
    best
}

#[async_trait]
impl TaskProcessor for RevenueAgent {
    type Task = RevenueTask;
    type Output = RevenueOutput;

    fn profile(&self) -> AgentProfile {
        AgentProfile::new(
            "revenue-agent",
            "Revenue Agent",
            "Optimizes revenue by switching mining profiles and managing yield strategies",
        )
        .with_capabilities(&[
            AgentCapability::PriceMonitoring,
            AgentCapability::MiningControl,
            AgentCapability::YieldOptimization,
        ])
    }

    async fn process_task(&self, task: &RevenueTask) -> Result<RevenueOutput> {
        match task {
            RevenueTask::GetStatus => self.get_status().await.map(RevenueOutput::Status),
            RevenueTask::OptimizeRevenue { config } => self
                .optimize_revenue(config)
                .await
                .map(RevenueOutput::OptimizationComplete),
            RevenueTask::StopMining => Ok(RevenueOutput::Stopped(self.stop_mining().await)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prices::StaticPriceFeed;
    use serde_json::json;

    fn agent() -> (Arc<StaticPriceFeed>, RevenueAgent) {
        let feed = Arc::new(StaticPriceFeed::reference());
        (feed.clone(), RevenueAgent::new(feed))
    }

    #[tokio::test]
    async fn starts_idle() {
        let (_, agent) = agent();
        let state = agent.state().await;
        assert_eq!(state.current_profile, "idle");
        assert_eq!(state.estimated_daily_revenue, 0.0);
        assert!(state.last_check.is_none());
    }

    #[tokio::test]
    async fn optimize_picks_most_profitable_profile() {
        let (_, agent) = agent();
        let report = agent.optimize_revenue(&OptimizeConfig::default()).await.unwrap();

        // 0.005 * 3500 - 2.5 * 0.12
        assert_eq!(report.new_profile, "mining_eth");
        assert!((report.estimated_daily_revenue - 17.2).abs() < 1e-9);
        assert_eq!(report.previous_profile, "idle");
        assert_eq!(report.profitability.len(), 4);
    }

    #[tokio::test]
    async fn status_reflects_last_optimization() {
        let (_, agent) = agent();
        agent.optimize_revenue(&OptimizeConfig::default()).await.unwrap();

        let status = agent.get_status().await.unwrap();
        assert_eq!(status.state.current_profile, "mining_eth");
        assert!(status.state.last_check.is_some());
        assert_eq!(status.live_prices.len(), 5);
    }

    #[tokio::test]
    async fn expensive_power_keeps_rig_idle() {
        let (_, agent) = agent();
        let report = agent
            .optimize_revenue(&OptimizeConfig {
                electricity_cost: 100.0,
            })
            .await
            .unwrap();
        assert_eq!(report.new_profile, "idle");
        assert_eq!(report.estimated_daily_revenue, 0.0);
    }

    #[tokio::test]
    async fn price_changes_move_the_profile() {
        let (feed, agent) = agent();
        agent.optimize_revenue(&OptimizeConfig::default()).await.unwrap();

        feed.set_quote("ethereum", 10.0, 0.0);
        feed.set_quote("monero", 500.0, 0.0);
        let report = agent.optimize_revenue(&OptimizeConfig::default()).await.unwrap();

        assert_eq!(report.previous_profile, "mining_eth");
        assert_eq!(report.new_profile, "mining_xmr");
    }

    #[tokio::test]
    async fn stop_mining_returns_to_idle() {
        let (_, agent) = agent();
        agent.optimize_revenue(&OptimizeConfig::default()).await.unwrap();

        let report = agent.stop_mining().await;
        assert_eq!(report.status, "stopped");
        assert_eq!(report.previous_profile, "mining_eth");
        assert_eq!(agent.state().await.current_profile, "idle");
    }

    #[tokio::test]
    async fn missing_prices_fail_the_task() {
        let agent = RevenueAgent::new(Arc::new(StaticPriceFeed::new()));
        let err = agent.process_task(&RevenueTask::GetStatus).await.unwrap_err();
        assert!(matches!(err, LuxError::Price(_)));
    }

    #[test]
    fn optimize_task_defaults_electricity_cost() {
        let task: RevenueTask =
            serde_json::from_value(json!({ "action": "optimize-revenue" })).unwrap();
        match task {
            RevenueTask::OptimizeRevenue { config } => {
                assert!((config.electricity_cost - 0.12).abs() < f64::EPSILON)
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[test]
    fn ties_keep_the_first_profile() {
        let mut profitability = Profitability::new();
        profitability.insert("idle".into(), 0.0);
        profitability.insert("mining_eth".into(), 5.0);
        profitability.insert("mining_xmr".into(), 5.0);
        assert_eq!(best_profile(&profitability).0, "mining_eth");
    }
}
