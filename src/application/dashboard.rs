//! Admin dashboard figures. Computed live; never cached.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use time::{Date, Month, OffsetDateTime, Time};

use crate::application::repos::{DashboardRepo, DashboardTotals, RepoError, SaleRecord};

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SalesPeriod {
    #[default]
    Month,
    Week,
    Day,
}

impl FromStr for SalesPeriod {
    type Err = DashboardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "month" => Ok(Self::Month),
            "week" => Ok(Self::Week),
            "day" => Ok(Self::Day),
            _ => Err(DashboardError::BadRequest(
                "Invalid period. Must be one of: month, week, day".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    pub total_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub total_sales: Decimal,
}

impl From<DashboardTotals> for MetricsView {
    fn from(totals: DashboardTotals) -> Self {
        Self {
            total_products: totals.total_products,
            total_orders: totals.total_orders,
            pending_orders: totals.pending_orders,
            total_sales: totals.total_sales,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesBucket {
    pub label: String,
    pub total: Decimal,
}

#[derive(Clone)]
pub struct DashboardService {
    repo: Arc<dyn DashboardRepo>,
}

impl DashboardService {
    pub fn new(repo: Arc<dyn DashboardRepo>) -> Self {
        Self { repo }
    }

    pub async fn metrics(&self) -> Result<MetricsView, DashboardError> {
        Ok(self.repo.dashboard_totals().await?.into())
    }

    pub async fn sales(&self, period: Option<&str>) -> Result<Vec<SalesBucket>, DashboardError> {
        let period = match period.filter(|p| !p.trim().is_empty()) {
            Some(raw) => raw.parse()?,
            None => SalesPeriod::default(),
        };
        let now = OffsetDateTime::now_utc();
        let since = period_start(period, now.date());
        let sales = self.repo.list_sales_since(since).await?;
        Ok(bucket_sales(period, now.date(), &sales))
    }
}

fn period_start(period: SalesPeriod, today: Date) -> OffsetDateTime {
    let first = match period {
        SalesPeriod::Month => Date::from_calendar_date(today.year(), Month::January, 1),
        SalesPeriod::Week | SalesPeriod::Day => {
            Date::from_calendar_date(today.year(), today.month(), 1)
        }
    }
    .unwrap_or(today);
    first.with_time(Time::MIDNIGHT).assume_utc()
}

fn label_for(period: SalesPeriod, date: Date) -> String {
    match period {
        SalesPeriod::Month => date.month().to_string(),
        SalesPeriod::Week => format!("Week {}", date.iso_week()),
        SalesPeriod::Day => {
            let month = date.month().to_string();
            format!("{:02} {}", date.day(), &month[..3])
        }
    }
}

/// Ordered labels for the period around `today`: the twelve months of the
/// year, or the ISO weeks / days of the current month.
pub fn period_labels(period: SalesPeriod, today: Date) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    match period {
        SalesPeriod::Month => {
            let mut month = Month::January;
            for _ in 0..12 {
                labels.push(month.to_string());
                month = month.next();
            }
        }
        SalesPeriod::Week | SalesPeriod::Day => {
            let mut day = Date::from_calendar_date(today.year(), today.month(), 1).unwrap_or(today);
            while day.month() == today.month() {
                let label = label_for(period, day);
                if !labels.contains(&label) {
                    labels.push(label);
                }
                match day.next_day() {
                    Some(next) => day = next,
                    None => break,
                }
            }
        }
    }
    labels
}

pub fn bucket_sales(period: SalesPeriod, today: Date, sales: &[SaleRecord]) -> Vec<SalesBucket> {
    let mut buckets: Vec<SalesBucket> = period_labels(period, today)
        .into_iter()
        .map(|label| SalesBucket {
            label,
            total: Decimal::ZERO,
        })
        .collect();

    for sale in sales {
        let date = sale.created_at.to_offset(time::UtcOffset::UTC).date();
        if date.year() != today.year() {
            continue;
        }
        if period != SalesPeriod::Month && date.month() != today.month() {
            continue;
        }
        let label = label_for(period, date);
        if let Some(bucket) = buckets.iter_mut().find(|bucket| bucket.label == label) {
            bucket.total += sale.amount;
        }
    }
    buckets
}
