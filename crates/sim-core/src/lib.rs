#![deny(warnings)]

//! Core domain models for the land-lease marketplace backtest.
//!
//! This crate defines the serializable types shared by the projection engine,
//! the horizon builder, the preset store and the export surface, along with an
//! advisory validation helper for control surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod scenarios;

pub use scenarios::{builtin_scenarios, find_scenario};

/// Length of every simulated horizon, in months.
pub const MAX_MONTHS: usize = 60;

/// Months aggregated into one annual point.
pub const MONTHS_PER_YEAR: usize = 12;

/// Break-even value reported when cumulative profit never turns positive.
pub const NO_BREAK_EVEN: i32 = -1;

/// Convert a percentage as entered (e.g. `5.0`) into a fraction (`0.05`).
#[inline]
pub fn pct(value: f64) -> f64 {
    value / 100.0
}

/// Complete input to one simulation run.
///
/// All percentage fields are expressed as entered by a user (`5.0` = 5%) and
/// are divided by 100 by the model. Monetary fields are USD.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParameterSet {
    /// Display label; not used in computation.
    pub name: String,

    /// Users at month 0.
    pub initial_users: f64,
    /// Growth rate (% of current users per month).
    pub user_growth_rate: f64,
    /// Churn rate (% of current users per month).
    pub churn_rate: f64,
    /// Share of total users active in a month (%).
    pub monthly_active_users: f64,

    /// Premium subscription price ($/month).
    pub premium_subscription_price: f64,
    /// Share of total users holding a premium subscription (%).
    pub premium_conversion_rate: f64,

    /// Average nightly rate of a short-term booking ($).
    pub avg_nightly_rate: f64,
    /// Average nights per short-term booking.
    pub avg_booking_nights: f64,
    /// Short-term bookings per active user per month.
    pub short_term_bookings_per_mau: f64,

    /// Average monthly value of a long-term lease ($).
    pub avg_monthly_lease_value: f64,
    /// New long-term leases per active user per month.
    pub long_term_leases_per_mau: f64,

    /// Service fee charged to standard landowners (%).
    pub standard_landowner_fee: f64,
    /// Service fee charged to premium landowners (%).
    pub premium_landowner_fee: f64,
    /// Share of booking volume attributed to premium landowners (%).
    pub premium_landowner_ratio: f64,

    /// Customer acquisition cost ($ per new user).
    pub cac: f64,
    /// Fixed operating costs ($/month).
    pub fixed_costs: f64,
    /// Variable cost per total user ($/month).
    pub variable_cost_per_user: f64,

    /// Amplitude of the uniform jitter applied to the growth rate (%).
    pub market_volatility: f64,
    /// Tax rate applied to positive pre-tax profit (%).
    pub tax_rate: f64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            initial_users: 100.0,
            user_growth_rate: 5.0,
            churn_rate: 2.0,
            monthly_active_users: 80.0,
            premium_subscription_price: 9.99,
            premium_conversion_rate: 5.0,
            avg_nightly_rate: 45.0,
            avg_booking_nights: 3.0,
            short_term_bookings_per_mau: 0.15,
            avg_monthly_lease_value: 350.0,
            long_term_leases_per_mau: 0.03,
            standard_landowner_fee: 2.0,
            premium_landowner_fee: 0.49,
            premium_landowner_ratio: 10.0,
            cac: 25.0,
            fixed_costs: 2000.0,
            variable_cost_per_user: 0.5,
            market_volatility: 0.0,
            tax_rate: 21.0,
        }
    }
}

impl ParameterSet {
    /// Returns a copy carrying a different display name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Numeric fields paired with their serialized names, in declaration order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 19] {
        [
            ("initialUsers", self.initial_users),
            ("userGrowthRate", self.user_growth_rate),
            ("churnRate", self.churn_rate),
            ("monthlyActiveUsers", self.monthly_active_users),
            ("premiumSubscriptionPrice", self.premium_subscription_price),
            ("premiumConversionRate", self.premium_conversion_rate),
            ("avgNightlyRate", self.avg_nightly_rate),
            ("avgBookingNights", self.avg_booking_nights),
            ("shortTermBookingsPerMau", self.short_term_bookings_per_mau),
            ("avgMonthlyLeaseValue", self.avg_monthly_lease_value),
            ("longTermLeasesPerMau", self.long_term_leases_per_mau),
            ("standardLandownerFee", self.standard_landowner_fee),
            ("premiumLandownerFee", self.premium_landowner_fee),
            ("premiumLandownerRatio", self.premium_landowner_ratio),
            ("cac", self.cac),
            ("fixedCosts", self.fixed_costs),
            ("variableCostPerUser", self.variable_cost_per_user),
            ("marketVolatility", self.market_volatility),
            ("taxRate", self.tax_rate),
        ]
    }
}

/// One simulated month. Money fields are rounded to cents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionPoint {
    /// 1-based month index.
    pub month: u32,
    /// Total users, rounded to the nearest integer.
    pub users: i64,
    pub revenue: f64,
    pub subscription_revenue: f64,
    pub service_fee_revenue: f64,
    pub costs: f64,
    pub profit: f64,
}

/// One year of the monthly history: stocks from the last month, flows summed.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualPoint {
    /// 1-based year index.
    pub year: u32,
    /// Month index of the last point in the slice.
    pub month: u32,
    /// Users at the end of the slice.
    pub users: i64,
    pub revenue: f64,
    pub subscription_revenue: f64,
    pub service_fee_revenue: f64,
    pub costs: f64,
    pub profit: f64,
}

/// Summary analytics derived from a parameter set and its history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    /// Customer acquisition cost, taken directly from the parameters.
    pub cac: f64,
    /// Steady-state lifetime value; `+inf` when churn is not positive.
    pub ltv: f64,
    /// `ltv / cac`; `+inf` when churn or CAC is not positive.
    pub ratio: f64,
    /// Average monthly revenue per user.
    pub arpu: f64,
    /// `1 - variable cost / ARPU`.
    pub gross_margin: f64,
    /// First month with strictly positive cumulative profit.
    pub break_even_month: Option<u32>,
}

impl KpiSummary {
    /// Break-even month as a plain integer, [`NO_BREAK_EVEN`] when absent.
    pub fn break_even_sentinel(&self) -> i32 {
        self.break_even_month
            .and_then(|m| i32::try_from(m).ok())
            .unwrap_or(NO_BREAK_EVEN)
    }

    /// Human-readable break-even label ("N/A" when absent).
    pub fn break_even_label(&self) -> String {
        match self.break_even_month {
            Some(m) => format!("month {m}"),
            None => "N/A".to_string(),
        }
    }
}

/// Display granularity of a backtest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Monthly,
    Annual,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Monthly => f.write_str("monthly"),
            Granularity::Annual => f.write_str("annual"),
        }
    }
}

/// Identifier of a stored preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PresetId(pub i64);

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named parameter set persisted by a preset store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: PresetId,
    pub name: String,
    pub parameters: ParameterSet,
    pub created_at: DateTime<Utc>,
}

/// Problems a control surface may want to flag before running the model.
///
/// The projection engine itself never validates; these are advisory.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite.
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
    /// Rates, prices and counts are expected to be non-negative.
    #[error("{field} is negative ({value})")]
    Negative { field: &'static str, value: f64 },
    /// Share-of-population percentages cannot exceed 100.
    #[error("{field} exceeds 100% ({value})")]
    PercentAbove100 { field: &'static str, value: f64 },
}

/// Validate a parameter set the way the sliders of a control surface would.
///
/// Returns every problem found, in field order.
pub fn validate_parameters(params: &ParameterSet) -> Vec<ValidationError> {
    const SHARES: [&str; 3] = [
        "monthlyActiveUsers",
        "premiumConversionRate",
        "premiumLandownerRatio",
    ];
    let mut problems = Vec::new();
    for (field, value) in params.numeric_fields() {
        if !value.is_finite() {
            problems.push(ValidationError::NonFinite(field));
        } else if value < 0.0 {
            problems.push(ValidationError::Negative { field, value });
        } else if value > 100.0 && SHARES.contains(&field) {
            problems.push(ValidationError::PercentAbove100 { field, value });
        }
    }
    problems
}
