use glint_geom::Rgb;
use glint_grid::{Medium, NoNonSolid, TileArea, TileBuf};
use glint_lighting::{EngineMode, LightFrame, MediumDecays, PropagateParams, create_engine, propagate};
use proptest::prelude::*;

fn medium() -> impl Strategy<Value = Medium> {
    prop_oneof![
        6 => Just(Medium::Air),
        2 => Just(Medium::Solid),
        1 => Just(Medium::Water),
        1 => Just(Medium::Honey),
        1 => Just(Medium::NonSolid),
    ]
}

fn light() -> impl Strategy<Value = Rgb> {
    prop_oneof![
        8 => Just(Rgb::ZERO),
        2 => (0.0f32..1.5, 0.0f32..1.5, 0.0f32..1.5).prop_map(|(r, g, b)| Rgb::new(r, g, b)),
    ]
}

fn scene() -> impl Strategy<Value = TileBuf> {
    (1usize..=20, 1usize..=20).prop_flat_map(|(w, h)| {
        let n = w * h;
        (
            prop::collection::vec(medium(), n),
            prop::collection::vec(light(), n),
        )
            .prop_map(move |(media, lights)| {
                let mut buf = TileBuf::from_media(TileArea::new(w, h), media);
                buf.lights = lights;
                buf
            })
    })
}

fn engine_mode() -> impl Strategy<Value = EngineMode> {
    prop::sample::select(EngineMode::ALL.to_vec())
}

fn run(mode: EngineMode, scene: &TileBuf, params: &PropagateParams) -> Vec<Rgb> {
    let mut engine = create_engine(mode);
    let frame = LightFrame::new(scene.area, &scene.media, &NoNonSolid);
    propagate(engine.as_mut(), &frame, &scene.lights, params)
}

fn params(threads: usize, gi: bool, decay: f32) -> PropagateParams {
    PropagateParams {
        thread_count: threads,
        use_temporal_budgeting: false,
        simulate_global_illumination: gi,
        decays: MediumDecays::uniform(decay),
        ..PropagateParams::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    // Flood engines only ever max-blend, so no tile gets darker than its input
    #[test]
    fn flood_never_darkens(scene in scene(), gi in any::<bool>(), decay in 0.3f32..1.0) {
        for mode in [EngineMode::Flood1x, EngineMode::Flood2x, EngineMode::Flood4x] {
            let out = run(mode, &scene, &params(1, gi, decay));
            prop_assert_eq!(out.len(), scene.lights.len());
            for (a, b) in scene.lights.iter().zip(&out) {
                prop_assert!(a.r <= b.r && a.g <= b.g && a.b <= b.b);
            }
        }
    }

    // Every engine produces finite, non-negative light
    #[test]
    fn output_is_finite(scene in scene(), mode in engine_mode(), decay in 0.0f32..1.2) {
        let out = run(mode, &scene, &params(1, false, decay));
        for c in &out {
            prop_assert!(c.r.is_finite() && c.g.is_finite() && c.b.is_finite());
            prop_assert!(c.r >= 0.0 && c.g >= 0.0 && c.b >= 0.0);
        }
    }

    // Worker count never changes the result
    #[test]
    fn threads_agree(scene in scene(), mode in engine_mode(), gi in any::<bool>()) {
        let a = run(mode, &scene, &params(1, gi, 0.9));
        let b = run(mode, &scene, &params(3, gi, 0.9));
        prop_assert_eq!(a, b);
    }

    // Without any light the lightmap stays black
    #[test]
    fn no_light_no_output(mut scene in scene(), mode in engine_mode()) {
        scene.lights.fill(Rgb::ZERO);
        let out = run(mode, &scene, &params(1, true, 0.9));
        prop_assert!(out.iter().all(|&c| c == Rgb::ZERO));
    }
}

#[test]
fn settings_table_parses() {
    let text = r#"
        thread_count = 2
        simulate_global_illumination = true
        gamma = 9.0

        [decays]
        air = 0.8
        water = [0.5, 0.6, 0.7]
    "#;
    let parsed: PropagateParams = toml::from_str(text).unwrap();
    assert_eq!(parsed.thread_count, 2);
    assert!(parsed.simulate_global_illumination);
    assert_eq!(parsed.decays.air, 0.8);
    assert_eq!(parsed.decays.water, Rgb::new(0.5, 0.6, 0.7));
    assert_eq!(parsed.decays.solid, MediumDecays::default().solid);
    assert_eq!(parsed.sanitized().gamma, 2.8);
}
