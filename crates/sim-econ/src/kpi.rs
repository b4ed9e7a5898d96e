//! Summary analytics: CAC, LTV, LTV:CAC and break-even month.
//!
//! LTV is a steady-state approximation computed from the parameters alone, so
//! it does not see the month-to-month jitter of a generated history.

use crate::blended_fee_rate;
use sim_core::{pct, KpiSummary, ParameterSet, ProjectionPoint};

/// Average monthly revenue per user.
///
/// Subscription revenue applies to every user; marketplace fees only to the
/// active share.
pub fn arpu(params: &ParameterSet) -> f64 {
    let mau_ratio = pct(params.monthly_active_users);
    let sub_revenue_per_user =
        params.premium_subscription_price * pct(params.premium_conversion_rate);
    let gross_short_term_per_mau = params.short_term_bookings_per_mau
        * params.avg_nightly_rate
        * params.avg_booking_nights;
    let gross_long_term_per_mau = params.long_term_leases_per_mau * params.avg_monthly_lease_value;
    let fee_per_mau = (gross_short_term_per_mau + gross_long_term_per_mau) * blended_fee_rate(params);
    sub_revenue_per_user + fee_per_mau * mau_ratio
}

/// `1 - variable cost / ARPU`, with a denominator of 1 when ARPU is not positive.
pub fn gross_margin(params: &ParameterSet, arpu: f64) -> f64 {
    let denominator = if arpu > 0.0 { arpu } else { 1.0 };
    1.0 - params.variable_cost_per_user / denominator
}

/// Lifetime value per user; `+inf` when churn is not positive.
pub fn lifetime_value(params: &ParameterSet) -> f64 {
    let churn = pct(params.churn_rate);
    if churn <= 0.0 {
        return f64::INFINITY;
    }
    let arpu = arpu(params);
    arpu * gross_margin(params, arpu) / churn
}

/// First month whose cumulative profit is strictly positive.
pub fn break_even_month(history: &[ProjectionPoint]) -> Option<u32> {
    let mut cumulative = 0.0;
    for point in history {
        cumulative += point.profit;
        if cumulative > 0.0 {
            return Some(point.month);
        }
    }
    None
}

/// Compute the full KPI summary for a parameter set and its history.
pub fn analyze(params: &ParameterSet, history: &[ProjectionPoint]) -> KpiSummary {
    let arpu = arpu(params);
    let gross_margin = gross_margin(params, arpu);
    let ltv = lifetime_value(params);
    let ratio = if pct(params.churn_rate) <= 0.0 || params.cac <= 0.0 {
        f64::INFINITY
    } else {
        ltv / params.cac
    };
    KpiSummary {
        cac: params.cac,
        ltv,
        ratio,
        arpu,
        gross_margin,
        break_even_month: break_even_month(history),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn point(month: u32, profit: f64) -> ProjectionPoint {
        ProjectionPoint {
            month,
            users: 0,
            revenue: 0.0,
            subscription_revenue: 0.0,
            service_fee_revenue: 0.0,
            costs: 0.0,
            profit,
        }
    }

    fn ltv_params() -> ParameterSet {
        // ARPU = 10 * 0.5 + (1 * 100 * 1) * 0.10 * 0.5 = 5 + 5 = 10
        ParameterSet {
            premium_subscription_price: 10.0,
            premium_conversion_rate: 50.0,
            monthly_active_users: 50.0,
            short_term_bookings_per_mau: 1.0,
            avg_nightly_rate: 100.0,
            avg_booking_nights: 1.0,
            long_term_leases_per_mau: 0.0,
            standard_landowner_fee: 10.0,
            premium_landowner_fee: 10.0,
            premium_landowner_ratio: 0.0,
            variable_cost_per_user: 2.0,
            churn_rate: 4.0,
            cac: 50.0,
            ..ParameterSet::default()
        }
    }

    #[test]
    fn ltv_from_arpu_margin_and_churn() {
        let params = ltv_params();
        let k = analyze(&params, &[]);
        assert!((k.arpu - 10.0).abs() < 1e-9);
        assert!((k.gross_margin - 0.8).abs() < 1e-9);
        // 10 * 0.8 / 0.04
        assert!((k.ltv - 200.0).abs() < 1e-6);
        assert!((k.ratio - 4.0).abs() < 1e-9);
        assert_eq!(k.cac, 50.0);
    }

    #[test]
    fn zero_churn_gives_infinite_ltv_and_ratio() {
        let params = ParameterSet {
            churn_rate: 0.0,
            ..ltv_params()
        };
        let k = analyze(&params, &[]);
        assert_eq!(k.ltv, f64::INFINITY);
        assert_eq!(k.ratio, f64::INFINITY);
        assert_eq!(k.cac, 50.0);
    }

    #[test]
    fn zero_cac_gives_infinite_ratio() {
        let params = ParameterSet {
            cac: 0.0,
            ..ltv_params()
        };
        let k = analyze(&params, &[]);
        assert!(k.ltv.is_finite());
        assert_eq!(k.ratio, f64::INFINITY);
    }

    #[test]
    fn non_positive_arpu_uses_unit_denominator() {
        let params = ParameterSet {
            premium_subscription_price: 0.0,
            short_term_bookings_per_mau: 0.0,
            variable_cost_per_user: 0.25,
            ..ltv_params()
        };
        assert_eq!(arpu(&params), 0.0);
        assert_eq!(gross_margin(&params, 0.0), 0.75);
        assert_eq!(lifetime_value(&params), 0.0);
    }

    #[test]
    fn break_even_is_first_positive_cumulative_month() {
        let history = [point(1, -100.0), point(2, 60.0), point(3, 40.0), point(4, 0.01)];
        // cumulative: -100, -40, 0 (not strictly positive), 0.01
        assert_eq!(break_even_month(&history), Some(4));
    }

    #[test]
    fn break_even_absent_when_all_losses() {
        let history: Vec<_> = (1..=60).map(|m| point(m, -1.0)).collect();
        let k = analyze(&ParameterSet::default(), &history);
        assert_eq!(k.break_even_month, None);
        assert_eq!(k.break_even_sentinel(), -1);
    }

    proptest! {
        #[test]
        fn ltv_scales_inversely_with_churn(churn in 0.5f64..50.0) {
            let a = lifetime_value(&ParameterSet { churn_rate: churn, ..ltv_params() });
            let b = lifetime_value(&ParameterSet { churn_rate: churn * 2.0, ..ltv_params() });
            prop_assert!((a - 2.0 * b).abs() <= 1e-6 * a.abs().max(1.0));
        }
    }
}
