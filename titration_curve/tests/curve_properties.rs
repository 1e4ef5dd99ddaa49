use approx::assert_abs_diff_eq;
use titration_curve::{
    build_curve, compute_ph, compute_ph_curve, landmarks, Scenario, TitrationError,
    TitrationType, VolumeGrid,
};

const KW: f64 = 1e-14;

fn scenario(kind: TitrationType, pka: Option<f64>) -> Scenario {
    Scenario::new(kind, 0.05, 0.1, 0.1, pka).unwrap()
}

fn all_scenarios() -> Vec<Scenario> {
    vec![
        scenario(TitrationType::StrongAcidStrongBase, None),
        scenario(TitrationType::StrongBaseStrongAcid, None),
        scenario(TitrationType::WeakAcidStrongBase, Some(4.76)),
        scenario(TitrationType::WeakBaseStrongAcid, Some(9.25)),
    ]
}

/// Hydrolysis pH at equivalence, computed independently of the engine.
fn expected_equivalence_ph(s: &Scenario) -> f64 {
    let veq = s.equivalence_volume();
    let conjugate = s.moles_initial() / (s.initial_volume() + veq);
    match s.titration_type() {
        TitrationType::StrongAcidStrongBase | TitrationType::StrongBaseStrongAcid => 7.0,
        TitrationType::WeakAcidStrongBase => {
            let ka = 10f64.powf(-s.pka().unwrap());
            14.0 + ((KW / ka) * conjugate).sqrt().log10()
        }
        TitrationType::WeakBaseStrongAcid => {
            let ka = 10f64.powf(-s.pka().unwrap());
            -(ka * conjugate).sqrt().log10()
        }
    }
}

#[test]
fn equivalence_ph_matches_type() {
    for s in all_scenarios() {
        let ph = compute_ph(s.equivalence_volume(), &s).unwrap();
        assert_abs_diff_eq!(ph, expected_equivalence_ph(&s), epsilon = 1e-3);
    }
}

#[test]
fn equivalence_detected_with_uneven_concentrations() {
    // 0.1 * 0.03 / 0.07 does not land on a round volume.
    let s = Scenario::strong(TitrationType::StrongAcidStrongBase, 0.03, 0.1, 0.07).unwrap();
    let grid_volume = 0.03 * 0.1 / 0.07;
    assert_eq!(compute_ph(grid_volume, &s).unwrap(), 7.0);
}

#[test]
fn curves_are_monotone() {
    let grid = VolumeGrid::default();
    for s in all_scenarios() {
        let curve = build_curve(&s, &grid).unwrap();
        let ph = curve.ph_values();
        let rising = s.titration_type().analyte_is_acid();
        for (i, pair) in ph.windows(2).enumerate() {
            if rising {
                assert!(pair[1] >= pair[0], "{:?} fell at index {i}: {pair:?}", s);
            } else {
                assert!(pair[1] <= pair[0], "{:?} rose at index {i}: {pair:?}", s);
            }
        }
    }
}

#[test]
fn curves_are_monotone_on_fine_grid_near_equivalence() {
    let grid = VolumeGrid::new(0.0499, 0.0501, 2001).unwrap();
    for s in all_scenarios() {
        let ph = build_curve(&s, &grid).unwrap().ph_values();
        let rising = s.titration_type().analyte_is_acid();
        assert!(ph.windows(2).all(|w| if rising { w[1] >= w[0] } else { w[1] <= w[0] }));
    }
}

#[test]
fn weak_acid_and_weak_base_curves_mirror() {
    let grid = VolumeGrid::new(0.0, 0.1, 201).unwrap();
    for p in [3.0, 4.76, 6.5] {
        let acid = scenario(TitrationType::WeakAcidStrongBase, Some(p));
        let base = scenario(TitrationType::WeakBaseStrongAcid, Some(14.0 - p));
        let acid_curve = build_curve(&acid, &grid).unwrap().ph_values();
        let base_curve = build_curve(&base, &grid).unwrap().ph_values();
        for (a, b) in acid_curve.iter().zip(&base_curve) {
            assert_abs_diff_eq!(a + b, 14.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn half_equivalence_ph_is_pka() {
    for (kind, pka) in [
        (TitrationType::WeakAcidStrongBase, 3.5),
        (TitrationType::WeakAcidStrongBase, 4.76),
        (TitrationType::WeakBaseStrongAcid, 9.25),
        (TitrationType::WeakBaseStrongAcid, 10.6),
    ] {
        let s = Scenario::new(kind, 0.025, 0.2, 0.15, Some(pka)).unwrap();
        let ph = compute_ph(s.half_equivalence_volume(), &s).unwrap();
        assert_abs_diff_eq!(ph, pka, epsilon = 1e-3);
        let marks = landmarks(&s).unwrap();
        assert_eq!(marks.ph_at_half_equivalence, ph);
    }
}

#[test]
fn weak_acid_initial_ph() {
    let s = scenario(TitrationType::WeakAcidStrongBase, Some(4.0));
    assert_abs_diff_eq!(compute_ph(0.0, &s).unwrap(), 2.5, epsilon = 1e-9);
}

#[test]
fn strong_acid_end_to_end() {
    let s = scenario(TitrationType::StrongAcidStrongBase, None);
    let curve = build_curve(&s, &VolumeGrid::default()).unwrap();
    assert_eq!(curve.len(), 500);

    let first = curve.points.first().unwrap();
    assert_eq!(first.titrant_volume, 0.0);
    assert_abs_diff_eq!(first.ph, 1.0, epsilon = 1e-12);

    assert_eq!(compute_ph(0.05, &s).unwrap(), 7.0);

    let last = curve.points.last().unwrap();
    assert_abs_diff_eq!(last.titrant_volume, 0.1, epsilon = 1e-12);
    assert_abs_diff_eq!(last.ph, 14.0 + (0.005f64 / 0.15).log10(), epsilon = 1e-9);
    assert_abs_diff_eq!(last.ph, 12.52, epsilon = 1e-2);
}

#[test]
fn repeated_curves_are_identical() {
    let grid = VolumeGrid::default();
    let volumes = grid.volumes().unwrap().to_vec();
    for s in all_scenarios() {
        let first = compute_ph_curve(&volumes, &s).unwrap();
        let second = compute_ph_curve(&volumes, &s).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn invalid_scenarios_fail_fast() {
    let cases = [
        Scenario::new(TitrationType::StrongAcidStrongBase, 0.0, 0.1, 0.1, None),
        Scenario::new(TitrationType::StrongAcidStrongBase, 0.05, -0.1, 0.1, None),
        Scenario::new(TitrationType::StrongBaseStrongAcid, 0.05, 0.1, 0.0, None),
        Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, None),
        Scenario::new(TitrationType::WeakBaseStrongAcid, 0.05, 0.1, 0.1, Some(f64::INFINITY)),
        Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, Some(0.5)),
        Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, Some(13.0)),
        Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, Some(400.0)),
    ];
    for case in cases {
        assert!(matches!(case, Err(TitrationError::InvalidScenario(_))));
    }
}

#[test]
fn scenario_json_round_trip_through_validation() {
    let s = scenario(TitrationType::WeakBaseStrongAcid, Some(9.25));
    let json = serde_json::to_string(&s).unwrap();
    let back: Scenario = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}
