use approx::assert_relative_eq;
use itertools::Itertools;
use pretty_assertions::assert_eq;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rated_performance::core::catalog::MIN_AIRFLOW_PER_TON;
use rated_performance::core::coil_performance::degradation::degradation_coefficient;
use rated_performance::core::coil_performance::envelope::{
    SeasonalBinIntegrator, SeasonalDiagnostics,
};
use rated_performance::core::coil_performance::seasonal_cooling::SeasonalCoolingIntegrator;
use rated_performance::core::coil_performance::seasonal_heating::SeasonalHeatingIntegrator;
use rated_performance::core::coil_performance::sensible_heat_ratio::{
    gross_shr_from_net, max_gross_shr, MIN_GROSS_SHR,
};
use rated_performance::core::coil_performance::stages::{
    build_pending_stages, eer_from_eir, eir_from_eer,
};
use rated_performance::core::curves::{DomainPolicy, ValidRange};
use rated_performance::core::solvers::{
    solve_max_stage_efficiency, FallbackCorrelation, ITERATION_CAP, TOLERANCE,
};
use rated_performance::core::units::BTU_PER_WATT_HOUR;
use rated_performance::input::{CoilMode, EquipmentArchetype, StageEfficiencies};
use rated_performance::{
    run_derivation, Catalog, CurveError, DerivationError, PerformanceDeriver, RatedMetric,
    RatingSpec,
};
use rstest::*;

#[fixture]
fn catalog() -> Catalog {
    Catalog::default()
}

/// The seasonal rating the diagnostics of a derivation add up to
fn seasonal_metric_of(diagnostics: &SeasonalDiagnostics) -> f64 {
    let load: f64 = diagnostics
        .bins
        .iter()
        .map(|bin| bin.load * bin.fractional_hours)
        .sum();
    let energy: f64 = diagnostics
        .bins
        .iter()
        .map(|bin| (bin.energy + bin.resistance_energy) * bin.fractional_hours)
        .sum();

    BTU_PER_WATT_HOUR * load / energy
}

#[rstest]
fn eer_survives_conversion_to_eir_and_back() {
    for (eer, fan_power) in [8., 10., 11., 13.5, 16., 22.]
        .into_iter()
        .cartesian_product([0., 0.07, 0.3, 0.365, 0.5])
    {
        let eir = eir_from_eer(eer, fan_power);

        assert_relative_eq!(eer_from_eir(eir, fan_power), eer, max_relative = 1e-12);
    }
}

#[rstest]
fn derives_documented_eir_from_eer_11(catalog: Catalog) {
    let spec = RatingSpec::new(
        EquipmentArchetype::SingleStageAirConditioner,
        RatedMetric::Eer(StageEfficiencies::Single(11.)),
        0.365,
    );

    let derived = PerformanceDeriver::new(&catalog).derive(&spec).unwrap();

    assert_relative_eq!(
        derived.stages[0].rated_eir(),
        0.2558027605829456,
        max_relative = 1e-12
    );
}

#[rstest]
#[case(EquipmentArchetype::SingleStageAirConditioner, None, RatedMetric::Seer(13.), 0.365)]
#[case(EquipmentArchetype::TwoStageHeatPump, None, RatedMetric::Seer(17.), 0.3)]
#[case(EquipmentArchetype::VariableSpeedAirConditioner, Some(4), RatedMetric::Seer(19.), 0.2)]
#[case(EquipmentArchetype::MiniSplitHeatPump, Some(10), RatedMetric::Seer(20.), 0.07)]
#[case(EquipmentArchetype::SingleStageHeatPump, None, RatedMetric::Hspf(8.2), 0.365)]
#[case(EquipmentArchetype::TwoStageHeatPump, None, RatedMetric::Hspf(9.), 0.3)]
#[case(EquipmentArchetype::MiniSplitHeatPump, Some(10), RatedMetric::Hspf(10.), 0.07)]
fn reproduces_seasonal_rating_it_was_derived_from(
    catalog: Catalog,
    #[case] archetype: EquipmentArchetype,
    #[case] num_stages: Option<usize>,
    #[case] metric: RatedMetric,
    #[case] fan_power: f64,
) {
    let target = match metric {
        RatedMetric::Seer(rating) | RatedMetric::Hspf(rating) => rating,
        _ => unreachable!(),
    };
    let mut spec = RatingSpec::new(archetype, metric, fan_power);
    spec.num_stages = num_stages;

    let derived = PerformanceDeriver::new(&catalog).derive(&spec).unwrap();
    let solution = derived.solution.unwrap();

    assert!(solution.is_converged(), "{archetype} did not converge");
    assert!(solution.evaluations <= ITERATION_CAP + 1);
    assert!(
        (seasonal_metric_of(&derived.diagnostics.unwrap()) - target).abs() < TOLERANCE + 1e-9
    );
}

#[rstest]
#[case(EquipmentArchetype::SingleStageAirConditioner, 1, 0.365, 11.)]
#[case(EquipmentArchetype::TwoStageAirConditioner, 2, 0.3, 12.5)]
#[case(EquipmentArchetype::MiniSplitHeatPump, 10, 0.07, 15.)]
fn recovers_max_stage_eer_from_the_seer_it_produces(
    catalog: Catalog,
    #[case] archetype: EquipmentArchetype,
    #[case] num_stages: usize,
    #[case] fan_power: f64,
    #[case] max_stage_eer: f64,
) {
    let mode = catalog
        .archetype(archetype)
        .unwrap()
        .mode(CoilMode::Cooling)
        .unwrap();
    let stages =
        build_pending_stages(num_stages, &mode.bounds, &mode.ratios, fan_power, Some(0.73))
            .unwrap();
    let integrator = SeasonalCoolingIntegrator::new(
        &stages,
        mode,
        &catalog.bins.cooling,
        degradation_coefficient(CoilMode::Cooling, num_stages, None),
        DomainPolicy::Clamp,
    )
    .unwrap();
    let seer = integrator.integrate(max_stage_eer).seasonal_metric;

    let solution = solve_max_stage_efficiency(seer, FallbackCorrelation::EerFromSeer, |eer| {
        Ok(integrator.integrate(eer).seasonal_metric)
    })
    .unwrap();

    assert!(solution.is_converged());
    assert_relative_eq!(solution.efficiency, max_stage_eer, max_relative = 1e-3);
}

#[rstest]
fn recovers_max_stage_cop_from_the_hspf_it_produces(catalog: Catalog) {
    let mode = catalog
        .archetype(EquipmentArchetype::TwoStageHeatPump)
        .unwrap()
        .mode(CoilMode::Heating)
        .unwrap();
    let stages = build_pending_stages(2, &mode.bounds, &mode.ratios, 0.3, None).unwrap();
    let integrator = SeasonalHeatingIntegrator::new(
        &stages,
        mode,
        &catalog.bins.heating,
        catalog.bins.heating.default_lockout,
        degradation_coefficient(CoilMode::Heating, 2, None),
        DomainPolicy::Clamp,
    )
    .unwrap();
    let hspf = integrator.integrate(3.3).seasonal_metric;

    let solution = solve_max_stage_efficiency(hspf, FallbackCorrelation::CopFromHspf, |cop| {
        Ok(integrator.integrate(cop).seasonal_metric)
    })
    .unwrap();

    assert!(solution.is_converged());
    assert_relative_eq!(solution.efficiency, 3.3, max_relative = 1e-3);
}

#[rstest]
fn solved_efficiency_rises_with_rating(catalog: Catalog) {
    let deriver = PerformanceDeriver::new(&catalog);

    let seer_efficiencies = [13., 14., 15., 16., 17.].map(|seer| {
        let spec = RatingSpec::new(
            EquipmentArchetype::TwoStageAirConditioner,
            RatedMetric::Seer(seer),
            0.3,
        );
        deriver.derive(&spec).unwrap().solution.unwrap().efficiency
    });
    let hspf_efficiencies = [8., 8.5, 9., 9.5, 10.].map(|hspf| {
        let spec = RatingSpec::new(
            EquipmentArchetype::MiniSplitHeatPump,
            RatedMetric::Hspf(hspf),
            0.07,
        );
        deriver.derive(&spec).unwrap().solution.unwrap().efficiency
    });

    assert!(seer_efficiencies.iter().tuple_windows().all(|(a, b)| a < b));
    assert!(hspf_efficiencies.iter().tuple_windows().all(|(a, b)| a < b));
}

#[rstest]
fn stages_increase_in_capacity_and_airflow(catalog: Catalog) {
    let deriver = PerformanceDeriver::new(&catalog);

    for num_stages in 3..=10 {
        let spec = RatingSpec::new(
            EquipmentArchetype::VariableSpeedHeatPump,
            RatedMetric::Eer(StageEfficiencies::Single(13.)),
            0.25,
        )
        .with_stages(num_stages);

        let stages = deriver.derive(&spec).unwrap().stages;

        assert_eq!(stages.len(), num_stages);
        assert!(stages
            .iter()
            .tuple_windows()
            .all(|(lower, upper)| lower.capacity_ratio() < upper.capacity_ratio()
                && lower.airflow_per_ton() < upper.airflow_per_ton()));
    }
}

#[rstest]
fn gross_shr_stays_within_band_for_random_ratings() {
    let mut rng = Pcg64::seed_from_u64(20241019);

    for _ in 0..1000 {
        let net_shr = rng.random_range(0.05..=1.0);
        let fan_power = rng.random_range(0.0..0.8);
        let airflow_per_ton = rng.random_range(MIN_AIRFLOW_PER_TON + 1.0..550.);

        let gross_shr = gross_shr_from_net(net_shr, fan_power, airflow_per_ton).unwrap();

        assert!(gross_shr >= MIN_GROSS_SHR, "{gross_shr} below band");
        assert!(
            gross_shr <= max_gross_shr(airflow_per_ton),
            "{gross_shr} above band at {airflow_per_ton} cfm/ton"
        );
    }
}

#[rstest]
fn ten_stage_mini_split_matches_seer_20(catalog: Catalog) {
    let spec = RatingSpec::new(
        EquipmentArchetype::MiniSplitHeatPump,
        RatedMetric::Seer(20.),
        0.07,
    )
    .with_stages(10);

    let derived = PerformanceDeriver::new(&catalog).derive(&spec).unwrap();

    assert!(!derived.is_estimated());
    assert_eq!(derived.mode, CoilMode::Cooling);
    assert_eq!(derived.stages.len(), 10);
    assert!(derived
        .stages
        .iter()
        .tuple_windows()
        .all(|(lower, upper)| lower.rated_eir() < upper.rated_eir()));
    assert!(derived.stages.iter().all(|stage| stage.rated_eir() > 0.));
}

#[rstest]
fn fails_on_rating_point_outside_curve_range_when_policy_forbids_clamping(mut catalog: Catalog) {
    let entry = catalog
        .archetypes
        .get_mut(&EquipmentArchetype::SingleStageAirConditioner)
        .unwrap();
    entry.domain_policy = DomainPolicy::Fail;
    let curves = &mut entry.cooling.as_mut().unwrap().curves[0];
    curves.capacity_ft = curves
        .capacity_ft
        .clone()
        .with_ranges(ValidRange::new(50., 80.), ValidRange::new(60., 90.));
    let spec = RatingSpec::new(
        EquipmentArchetype::SingleStageAirConditioner,
        RatedMetric::Seer(14.),
        0.365,
    );

    let result = PerformanceDeriver::new(&catalog).derive(&spec);

    assert!(matches!(
        result,
        Err(DerivationError::Curve(CurveError::InvalidCurveDomain { .. }))
    ));
}

#[rstest]
fn runs_batch_from_json_in_input_order(catalog: Catalog) {
    let json = r#"[
        {"archetype": "SingleStageAirConditioner", "metric": {"Seer": 14.0}, "rated_fan_power": 0.365},
        {"archetype": "MiniSplitHeatPump", "metric": {"Hspf": 10.0}, "rated_fan_power": 0.07},
        {"archetype": "GroundSourceHeatPump", "num_stages": 2, "metric": {"Eer": 17.1}, "rated_fan_power": 0.3},
        {"archetype": "RoomAirConditioner", "metric": {"Eer": [10.7]}, "rated_fan_power": 0.0}
    ]"#;

    let derived = run_derivation(json.as_bytes(), &catalog).unwrap();

    assert_eq!(
        derived
            .iter()
            .map(|performance| (performance.archetype, performance.stages.len()))
            .collect_vec(),
        vec![
            (EquipmentArchetype::SingleStageAirConditioner, 1),
            (EquipmentArchetype::MiniSplitHeatPump, 10),
            (EquipmentArchetype::GroundSourceHeatPump, 2),
            (EquipmentArchetype::RoomAirConditioner, 1),
        ]
    );
    assert!(serde_json::to_string(&derived).is_ok());
}

#[rstest]
fn reports_which_spec_failed_in_batch(catalog: Catalog) {
    let json = r#"[
        {"archetype": "SingleStageAirConditioner", "metric": {"Seer": 14.0}, "rated_fan_power": 0.365},
        {"archetype": "RoomAirConditioner", "metric": {"Seer": 12.0}, "rated_fan_power": 0.0}
    ]"#;

    let error = run_derivation(json.as_bytes(), &catalog).unwrap_err();

    assert!(format!("{error}").contains("rating spec 1"));
}
