//! Aggregation engine: grouped sums and the commission rule.
//!
//! Operates on already-validated transactions and cannot fail:
//! validation caps every amount at `record::MAX_AMOUNT`, which keeps
//! each sum and product well inside `Decimal` range.
//! Groups are emitted in ascending key order; within a group amounts
//! are summed in input order, so the same batch always yields the
//! same output.

use crate::{
    record::AcceptedTransaction,
    types::{AgentId, MonthKey, RetailerId},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Threshold rule mapping an agent's total sales to a commission rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommissionPolicy {
    /// Totals at or above this earn `high_rate`.
    pub threshold: Decimal,
    pub low_rate: Decimal,
    pub high_rate: Decimal,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            threshold: Decimal::new(5000, 0),
            low_rate: Decimal::new(5, 2),
            high_rate: Decimal::new(8, 2),
        }
    }
}

impl CommissionPolicy {
    /// Rates must lie in `0..=1` with `low_rate <= high_rate`, and the
    /// threshold must not be negative.
    pub fn check(&self) -> anyhow::Result<()> {
        let unit = Decimal::ZERO..=Decimal::ONE;
        for (name, rate) in [("low_rate", self.low_rate), ("high_rate", self.high_rate)] {
            if !unit.contains(&rate) {
                anyhow::bail!("commission {name} {rate} is outside 0..=1");
            }
        }
        if self.low_rate > self.high_rate {
            anyhow::bail!(
                "commission low_rate {} exceeds high_rate {}",
                self.low_rate,
                self.high_rate
            );
        }
        if self.threshold < Decimal::ZERO {
            anyhow::bail!("commission threshold {} is negative", self.threshold);
        }
        Ok(())
    }

    pub fn rate_for(&self, total_sales: Decimal) -> Decimal {
        if total_sales >= self.threshold {
            self.high_rate
        } else {
            self.low_rate
        }
    }

    pub fn commission_for(&self, agent_id: AgentId, total_sales: Decimal) -> CommissionRecord {
        let commission_rate = self.rate_for(total_sales);
        CommissionRecord {
            agent_id,
            total_sales,
            commission_rate,
            commission_amount: total_sales * commission_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentSales {
    pub agent_id: AgentId,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetailerSales {
    pub retailer_id: RetailerId,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyTotal {
    pub month: MonthKey,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionRecord {
    pub agent_id: AgentId,
    pub total_sales: Decimal,
    pub commission_rate: Decimal,
    pub commission_amount: Decimal,
}

/// All four views of one batch, for reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub sales_by_agent: Vec<AgentSales>,
    pub sales_by_retailer: Vec<RetailerSales>,
    pub monthly_totals: Vec<MonthlyTotal>,
    pub commissions: Vec<CommissionRecord>,
}

pub struct Aggregator<'a> {
    transactions: &'a [AcceptedTransaction],
    policy: CommissionPolicy,
}

impl<'a> Aggregator<'a> {
    pub fn new(transactions: &'a [AcceptedTransaction], policy: CommissionPolicy) -> Self {
        Self { transactions, policy }
    }

    pub fn sales_by_agent(&self) -> Vec<AgentSales> {
        self.sum_by(|t| t.agent_id.clone())
            .into_iter()
            .map(|(agent_id, total_sales)| AgentSales { agent_id, total_sales })
            .collect()
    }

    pub fn sales_by_retailer(&self) -> Vec<RetailerSales> {
        self.sum_by(|t| t.retailer_id.clone())
            .into_iter()
            .map(|(retailer_id, total_sales)| RetailerSales { retailer_id, total_sales })
            .collect()
    }

    pub fn monthly_totals(&self) -> Vec<MonthlyTotal> {
        self.sum_by(|t| MonthKey::of(t.date))
            .into_iter()
            .map(|(month, total_sales)| MonthlyTotal { month, total_sales })
            .collect()
    }

    /// One record per agent; the threshold applies to the agent's summed
    /// total, never to individual transactions.
    pub fn calculate_commission(&self) -> Vec<CommissionRecord> {
        self.sales_by_agent()
            .into_iter()
            .map(|s| self.policy.commission_for(s.agent_id, s.total_sales))
            .collect()
    }

    pub fn aggregate(&self) -> Aggregation {
        Aggregation {
            sales_by_agent: self.sales_by_agent(),
            sales_by_retailer: self.sales_by_retailer(),
            monthly_totals: self.monthly_totals(),
            commissions: self.calculate_commission(),
        }
    }

    fn sum_by<K: Ord>(&self, key: impl Fn(&AcceptedTransaction) -> K) -> BTreeMap<K, Decimal> {
        let mut groups = BTreeMap::new();
        for txn in self.transactions {
            *groups.entry(key(txn)).or_insert(Decimal::ZERO) += txn.amount;
        }
        groups
    }
}
