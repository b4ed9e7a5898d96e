//! Built-in reference scenarios. Static, read-only, never persisted.

use crate::ParameterSet;

/// Every built-in scenario, the default first.
pub fn builtin_scenarios() -> Vec<ParameterSet> {
    let base = ParameterSet::default();
    vec![
        base.clone(),
        ParameterSet {
            name: "Aggressive Growth".to_string(),
            initial_users: 500.0,
            user_growth_rate: 15.0,
            churn_rate: 4.0,
            cac: 40.0,
            fixed_costs: 8000.0,
            market_volatility: 20.0,
            ..base.clone()
        },
        ParameterSet {
            name: "Lean Bootstrapping".to_string(),
            initial_users: 250.0,
            user_growth_rate: 4.0,
            churn_rate: 1.0,
            cac: 5.0,
            fixed_costs: 250.0,
            variable_cost_per_user: 0.25,
            ..base.clone()
        },
        ParameterSet {
            name: "Subscription-Focused".to_string(),
            initial_users: 400.0,
            fixed_costs: 1200.0,
            premium_subscription_price: 19.99,
            premium_conversion_rate: 15.0,
            premium_landowner_ratio: 40.0,
            premium_landowner_fee: 1.0,
            ..base.clone()
        },
        ParameterSet {
            name: "Marketplace-Focused".to_string(),
            initial_users: 400.0,
            fixed_costs: 1200.0,
            premium_conversion_rate: 1.0,
            short_term_bookings_per_mau: 0.4,
            long_term_leases_per_mau: 0.08,
            standard_landowner_fee: 5.0,
            premium_landowner_fee: 2.5,
            ..base
        },
    ]
}

/// Look up a built-in scenario by name, ignoring case and surrounding space.
pub fn find_scenario(name: &str) -> Option<ParameterSet> {
    let wanted = name.trim();
    builtin_scenarios()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_default_first() {
        let all = builtin_scenarios();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], ParameterSet::default());
        let mut names: Vec<_> = all.iter().map(|s| s.name.to_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn lookup_ignores_case() {
        let s = find_scenario("  lean bootstrapping ").unwrap();
        assert_eq!(s.name, "Lean Bootstrapping");
        assert_eq!(s.fixed_costs, 250.0);
        assert!(find_scenario("Moonshot").is_none());
    }

    #[test]
    fn scenarios_pass_validation() {
        for s in builtin_scenarios() {
            assert!(crate::validate_parameters(&s).is_empty(), "{}", s.name);
        }
    }
}
