#![deny(warnings)]

//! Month-by-month projection model for the marketplace backtest.
//!
//! This crate provides:
//! - The projection step: previous month + parameters + random source -> next month
//! - The blended landowner fee rate shared with the KPI analyzer
//! - Steady-state KPIs (see [`kpi`])
//!
//! Nothing here validates its inputs. Zero or negative parameters flow through
//! the arithmetic and surface as (possibly nonsensical) outputs.

use rand::Rng;
use sim_core::{pct, ParameterSet, ProjectionPoint};
use tracing::trace;

pub mod kpi;

pub use kpi::{analyze, arpu, break_even_month, gross_margin, lifetime_value};

/// State carried from one month to the next.
///
/// `users` keeps full floating precision; only the emitted point is rounded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarryState {
    pub month: u32,
    pub users: f64,
}

impl CarryState {
    /// Implicit month-0 state for a run.
    pub fn seed(params: &ParameterSet) -> Self {
        Self {
            month: 0,
            users: params.initial_users,
        }
    }
}

/// Full-precision intermediate values of one projection step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MonthBreakdown {
    pub random_factor: f64,
    pub effective_growth_rate: f64,
    pub new_users: f64,
    pub churned_users: f64,
    pub total_users: f64,
    pub active_users: f64,
    pub premium_users: f64,
    pub gross_short_term_value: f64,
    pub gross_long_term_value: f64,
    pub service_fee_rate: f64,
    pub acquisition_costs: f64,
    pub variable_costs: f64,
    pub pre_tax_profit: f64,
    pub taxes: f64,
}

impl MonthBreakdown {
    /// Gross booking value across short stays and long-term leases.
    pub fn total_booking_value(&self) -> f64 {
        self.gross_short_term_value + self.gross_long_term_value
    }
}

/// Outcome of one projection step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthStep {
    /// Rounded point as displayed and exported.
    pub point: ProjectionPoint,
    /// Unrounded state feeding the next step.
    pub carry: CarryState,
    pub breakdown: MonthBreakdown,
}

/// Round to cents, half away from zero.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a user count to the nearest integer. Non-finite counts map to 0.
#[inline]
pub fn round_users(users: f64) -> i64 {
    if users.is_finite() {
        users.round() as i64
    } else {
        0
    }
}

/// Multiplicative growth jitter for a uniform draw `u` in `[0, 1)`.
///
/// Uniform over `[1 - v, 1 + v]` where `v` is the volatility as a fraction.
#[inline]
pub fn growth_jitter(market_volatility: f64, u: f64) -> f64 {
    1.0 + pct(market_volatility) * (u * 2.0 - 1.0)
}

/// Landowner fee rate blended linearly by the premium landowner share.
pub fn blended_fee_rate(params: &ParameterSet) -> f64 {
    let premium_ratio = pct(params.premium_landowner_ratio);
    premium_ratio * pct(params.premium_landowner_fee)
        + (1.0 - premium_ratio) * pct(params.standard_landowner_fee)
}

/// Project the month following `prev`, drawing the growth jitter from `rng`.
///
/// One uniform value is drawn per call regardless of volatility, so the
/// position in a seeded stream depends only on the month index.
pub fn project_month<R: Rng>(prev: &CarryState, params: &ParameterSet, rng: &mut R) -> MonthStep {
    let u: f64 = rng.gen();
    project_month_with_factor(prev, params, growth_jitter(params.market_volatility, u))
}

/// Deterministic projection step with an explicit jitter factor.
pub fn project_month_with_factor(
    prev: &CarryState,
    params: &ParameterSet,
    random_factor: f64,
) -> MonthStep {
    let effective_growth_rate = pct(params.user_growth_rate) * random_factor;

    let new_users = prev.users * effective_growth_rate;
    let churned_users = prev.users * pct(params.churn_rate);
    let total_users = prev.users + new_users - churned_users;
    let active_users = total_users * pct(params.monthly_active_users);

    let premium_users = total_users * pct(params.premium_conversion_rate);
    let subscription_revenue = premium_users * params.premium_subscription_price;

    let gross_short_term_value = active_users
        * params.short_term_bookings_per_mau
        * params.avg_nightly_rate
        * params.avg_booking_nights;
    let gross_long_term_value =
        active_users * params.long_term_leases_per_mau * params.avg_monthly_lease_value;

    let service_fee_rate = blended_fee_rate(params);
    let service_fee_revenue = (gross_short_term_value + gross_long_term_value) * service_fee_rate;

    let revenue = subscription_revenue + service_fee_revenue;

    let acquisition_costs = new_users * params.cac;
    let variable_costs = total_users * params.variable_cost_per_user;
    let costs = acquisition_costs + params.fixed_costs + variable_costs;

    // Losses are never tax-credited.
    let pre_tax_profit = revenue - costs;
    let taxes = if pre_tax_profit > 0.0 {
        pre_tax_profit * pct(params.tax_rate)
    } else {
        0.0
    };
    let profit = pre_tax_profit - taxes;

    let month = prev.month + 1;
    trace!(month, total_users, revenue, costs, profit, "projected month");

    MonthStep {
        point: ProjectionPoint {
            month,
            users: round_users(total_users),
            revenue: round2(revenue),
            subscription_revenue: round2(subscription_revenue),
            service_fee_revenue: round2(service_fee_revenue),
            costs: round2(costs),
            profit: round2(profit),
        },
        carry: CarryState {
            month,
            users: total_users,
        },
        breakdown: MonthBreakdown {
            random_factor,
            effective_growth_rate,
            new_users,
            churned_users,
            total_users,
            active_users,
            premium_users,
            gross_short_term_value,
            gross_long_term_value,
            service_fee_rate,
            acquisition_costs,
            variable_costs,
            pre_tax_profit,
            taxes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Parameters with round numbers: 1000 users, 10% growth, no churn or costs.
    fn simple_params() -> ParameterSet {
        ParameterSet {
            name: "simple".into(),
            initial_users: 1000.0,
            user_growth_rate: 10.0,
            churn_rate: 0.0,
            monthly_active_users: 50.0,
            premium_subscription_price: 10.0,
            premium_conversion_rate: 10.0,
            avg_nightly_rate: 100.0,
            avg_booking_nights: 2.0,
            short_term_bookings_per_mau: 0.1,
            avg_monthly_lease_value: 0.0,
            long_term_leases_per_mau: 0.0,
            standard_landowner_fee: 10.0,
            premium_landowner_fee: 10.0,
            premium_landowner_ratio: 0.0,
            cac: 0.0,
            fixed_costs: 0.0,
            variable_cost_per_user: 0.0,
            market_volatility: 0.0,
            tax_rate: 0.0,
        }
    }

    fn first_month(params: &ParameterSet) -> MonthStep {
        project_month_with_factor(&CarryState::seed(params), params, 1.0)
    }

    #[test]
    fn baseline_month_one_users() {
        let params = ParameterSet::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let step = project_month(&CarryState::seed(&params), &params, &mut rng);
        assert_eq!(step.point.month, 1);
        assert!((step.breakdown.new_users - 5.0).abs() < 1e-9);
        assert!((step.breakdown.churned_users - 2.0).abs() < 1e-9);
        assert!((step.carry.users - 103.0).abs() < 1e-9);
        assert_eq!(step.point.users, 103);
    }

    #[test]
    fn fee_blend_is_linear() {
        let params = ParameterSet {
            standard_landowner_fee: 2.0,
            premium_landowner_fee: 0.49,
            premium_landowner_ratio: 10.0,
            ..ParameterSet::default()
        };
        assert!((blended_fee_rate(&params) - 0.01849).abs() < 1e-12);
    }

    #[test]
    fn revenue_components() {
        let step = first_month(&simple_params());
        let b = step.breakdown;
        assert!((b.total_users - 1100.0).abs() < 1e-9);
        assert!((b.active_users - 550.0).abs() < 1e-9);
        assert!((b.premium_users - 110.0).abs() < 1e-9);
        assert!((b.total_booking_value() - 11_000.0).abs() < 1e-6);
        assert_eq!(step.point.subscription_revenue, 1100.0);
        assert_eq!(step.point.service_fee_revenue, 1100.0);
        assert_eq!(step.point.revenue, 2200.0);
        assert_eq!(step.point.costs, 0.0);
        assert_eq!(step.point.profit, 2200.0);
    }

    #[test]
    fn costs_include_acquisition_fixed_and_variable() {
        let params = ParameterSet {
            cac: 2.0,
            fixed_costs: 300.0,
            variable_cost_per_user: 0.5,
            ..simple_params()
        };
        let step = first_month(&params);
        // 100 new users * 2 + 300 + 1100 users * 0.5
        assert_eq!(step.point.costs, 1050.0);
        assert_eq!(step.point.profit, 1150.0);
    }

    #[test]
    fn tax_applies_to_positive_profit() {
        let params = ParameterSet {
            fixed_costs: 200.0,
            tax_rate: 20.0,
            ..simple_params()
        };
        let b = first_month(&params).breakdown;
        assert!((b.pre_tax_profit - 2000.0).abs() < 1e-6);
        assert!((b.taxes - 400.0).abs() < 1e-6);
        assert_eq!(first_month(&params).point.profit, 1600.0);
    }

    #[test]
    fn losses_are_not_taxed() {
        let params = ParameterSet {
            fixed_costs: 5000.0,
            tax_rate: 35.0,
            ..simple_params()
        };
        let step = first_month(&params);
        assert_eq!(step.breakdown.taxes, 0.0);
        assert_eq!(step.breakdown.pre_tax_profit - step.breakdown.taxes, step.breakdown.pre_tax_profit);
        assert_eq!(step.point.profit, round2(step.breakdown.pre_tax_profit));
        assert_eq!(step.point.profit, -2800.0);
    }

    #[test]
    fn users_carry_unrounded() {
        let params = ParameterSet {
            initial_users: 1.0,
            user_growth_rate: 50.0,
            ..simple_params()
        };
        let m1 = project_month_with_factor(&CarryState::seed(&params), &params, 1.0);
        assert_eq!(m1.carry.users, 1.5);
        assert_eq!(m1.point.users, 2);
        let m2 = project_month_with_factor(&m1.carry, &params, 1.0);
        assert_eq!(m2.carry.users, 2.25);
        assert_eq!(m2.point.users, 2);
        let m3 = project_month_with_factor(&m2.carry, &params, 1.0);
        assert_eq!(m3.carry.users, 3.375);
        assert_eq!(m3.point.users, 3);
        assert_eq!(m3.point.month, 3);
    }

    #[test]
    fn seeded_draws_repeat() {
        let params = ParameterSet {
            market_volatility: 30.0,
            ..ParameterSet::default()
        };
        let seed = CarryState::seed(&params);
        let a = project_month(&seed, &params, &mut ChaCha8Rng::seed_from_u64(42));
        let b = project_month(&seed, &params, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn negative_inputs_propagate() {
        let params = ParameterSet {
            initial_users: 100.0,
            user_growth_rate: -10.0,
            churn_rate: 5.0,
            premium_subscription_price: -1.0,
            ..simple_params()
        };
        let step = first_month(&params);
        assert_eq!(step.point.users, 85);
        assert!(step.point.subscription_revenue < 0.0);
    }

    #[test]
    fn rounding_is_to_cents() {
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.235_000_1), 1.24);
        assert_eq!(round2(-2.5), -2.5);
        assert_eq!(round_users(102.5), 103);
        assert_eq!(round_users(f64::NAN), 0);
    }

    proptest! {
        #[test]
        fn jitter_stays_in_band(vol in 0.0f64..100.0, u in 0.0f64..1.0) {
            let f = growth_jitter(vol, u);
            let v = vol / 100.0;
            prop_assert!(f >= 1.0 - v - 1e-12);
            prop_assert!(f <= 1.0 + v + 1e-12);
        }

        #[test]
        fn zero_volatility_ignores_draw(u in 0.0f64..1.0) {
            prop_assert_eq!(growth_jitter(0.0, u), 1.0);
        }

        #[test]
        fn profit_never_exceeds_pre_tax(fixed in 0.0f64..10_000.0, tax in 0.0f64..60.0) {
            let params = ParameterSet { fixed_costs: fixed, tax_rate: tax, ..simple_params() };
            let b = first_month(&params).breakdown;
            prop_assert!(b.taxes >= 0.0);
            prop_assert!(b.pre_tax_profit - b.taxes <= b.pre_tax_profit);
        }
    }
}
