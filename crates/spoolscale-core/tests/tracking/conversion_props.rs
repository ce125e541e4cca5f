use proptest::prelude::*;
use spoolscale_core::units;

proptest! {
    #[test]
    fn length_scales_linearly_with_weight(
        weight in 1.0f64..5000.0,
        factor in 1.0f64..10.0,
        density in 0.8f64..2.0,
        diameter in prop::sample::select(vec![1.75, 2.85, 3.0]),
    ) {
        let base = units::length_for_weight(weight, density, diameter).unwrap();
        let scaled = units::length_for_weight(weight * factor, density, diameter).unwrap();
        prop_assert!((scaled - base * factor).abs() <= 1e-9 * scaled.max(1.0));
    }

    #[test]
    fn length_round_trips_through_weight(
        weight in 0.0f64..5000.0,
        density in 0.8f64..2.0,
        diameter in 1.0f64..3.5,
    ) {
        let m = units::length_for_weight(weight, density, diameter).unwrap();
        let back = units::weight_for_length(m, density, diameter).unwrap();
        prop_assert!((back - weight).abs() <= 1e-9 * weight.max(1.0));
    }

    #[test]
    fn net_weight_is_never_negative(gross in -100.0f64..2000.0, reel in 0.0f64..400.0) {
        let net = units::net_weight("P", gross, reel);
        prop_assert!(net.grams >= 0.0);
        prop_assert_eq!(net.warning.is_some(), gross < reel);
    }
}
