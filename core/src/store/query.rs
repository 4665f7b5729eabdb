//! Read-only views over the persisted schema.
//!
//! These answer the questions a reporting consumer asks: an agent's
//! commission, a retailer's lifetime sales, the monthly sales report.
//! Commissions are always the latest snapshot; an empty table is a
//! valid answer.

use super::{decimal_at, PipelineStore};
use crate::{
    aggregation::{CommissionRecord, MonthlyTotal, RetailerSales},
    error::{PipelineError, PipelineResult},
    types::MonthKey,
};
use chrono::NaiveDate;
use rusqlite::params;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

impl PipelineStore {
    pub fn commission_for_agent(&self, agent_id: &str) -> PipelineResult<Option<CommissionRecord>> {
        self.commissions().find(agent_id)
    }

    pub fn all_commissions(&self) -> PipelineResult<Vec<CommissionRecord>> {
        self.commissions().all()
    }

    /// Total of every stored fact for the retailer, or `None` if it has none.
    pub fn retailer_sales(&self, retailer_id: &str) -> PipelineResult<Option<Decimal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT transaction_amount FROM transactions WHERE retailer_id = ?1 ORDER BY id ASC")?;
        let amounts = stmt
            .query_map(params![retailer_id], |row| decimal_at(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        if amounts.is_empty() {
            return Ok(None);
        }
        let mut total = Decimal::ZERO;
        for amount in amounts {
            add_to(&mut total, amount, retailer_id)?;
        }
        Ok(Some(total))
    }

    /// Every known retailer with its lifetime sales; zero when it has no facts.
    pub fn all_retailer_sales(&self) -> PipelineResult<Vec<RetailerSales>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.retailer_id, t.transaction_amount
             FROM retailers r
             LEFT JOIN transactions t ON t.retailer_id = r.retailer_id
             ORDER BY r.retailer_id ASC, t.id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let retailer_id: String = row.get(0)?;
                let amount = match row.get::<_, Option<String>>(1)? {
                    Some(_) => decimal_at(row, 1)?,
                    None => Decimal::ZERO,
                };
                Ok((retailer_id, amount))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for (retailer_id, amount) in rows {
            let total = totals.entry(retailer_id.clone()).or_insert(Decimal::ZERO);
            add_to(total, amount, &retailer_id)?;
        }
        Ok(totals
            .into_iter()
            .map(|(retailer_id, total_sales)| RetailerSales { retailer_id, total_sales })
            .collect())
    }

    /// Sales across all stored facts, grouped by month, ascending.
    pub fn monthly_report(&self) -> PipelineResult<Vec<MonthlyTotal>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, transaction_amount FROM transactions ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, NaiveDate>(0)?, decimal_at(row, 1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut months: BTreeMap<MonthKey, Decimal> = BTreeMap::new();
        for (date, amount) in rows {
            let month = MonthKey::of(date);
            add_to(months.entry(month).or_insert(Decimal::ZERO), amount, &month.to_string())?;
        }
        Ok(months
            .into_iter()
            .map(|(month, total_sales)| MonthlyTotal { month, total_sales })
            .collect())
    }
}

/// Stored rows may predate validation limits, so sums here are checked.
fn add_to(total: &mut Decimal, amount: Decimal, scope: &str) -> PipelineResult<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| PipelineError::AmountOverflow { scope: scope.to_string() })?;
    Ok(())
}
