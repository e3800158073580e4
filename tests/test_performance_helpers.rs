//! Slicing, granular clouds, senders and loops driven through a recording
//! runtime


use mock_runtime::MockRuntime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sardine_tools::granular::{granulate, GrainCloud};
use sardine_tools::playback::{
    ensure_player, loop_steps, start, stop, Period, PlayerStatus, Voice,
};
use sardine_tools::senders::{dirt, parse_ziff_duration, ziffers_mono};
use sardine_tools::slicer::{cut, CutOptions};
use sardine_tools::{params, SampleLengths, State, ToolsError, Value};

fn lengths() -> SampleLengths {
    let mut lengths = SampleLengths::new();
    lengths.insert("breaks:0", 2.0);
    lengths
}

#[test]
fn test_cut_four_slices_on_quarter_beats() {
    let mut rt = MockRuntime::new();
    let opts = CutOptions::slices(4).sequence("0 1 2 3").period(0.25);

    let total = cut(&mut rt, &lengths(), "breaks:0", &opts).unwrap();

    assert_eq!(rt.events.len(), 4);
    assert_eq!(rt.sleeps.len(), 4);
    assert_eq!(total, 1.0);
    let begins: Vec<f64> = rt
        .events
        .iter()
        .map(|e| e.get("begin").and_then(Value::as_f64).unwrap())
        .collect();
    assert_eq!(begins, vec![0.0, 0.25, 0.5, 0.75]);
}

#[test]
fn test_cut_reversed_sequence_with_extra_params() {
    let mut rt = MockRuntime::new();
    let opts = CutOptions::slices(4)
        .sequence("3 2 1 0")
        .period(0.5)
        .extra(params! { "orbit" => 2, "cut" => 0 });

    cut(&mut rt, &lengths(), "breaks:0", &opts).unwrap();

    let first = &rt.events[0];
    assert_eq!(first.get("begin"), Some(&Value::Float(0.75)));
    assert_eq!(first.get("end"), Some(&Value::Float(1.0)));
    assert_eq!(first.get("orbit"), Some(&Value::Int(2)));
    // Extra params override the generated ones
    assert_eq!(first.get("cut"), Some(&Value::Int(0)));
    assert_eq!(rt.slept(), 2.0);
}

#[test]
fn test_cut_keeps_sample_with_rested_notes() {
    let mut rt = MockRuntime::new();
    let opts = CutOptions::slices(2)
        .period(1.0)
        .extra(params! { "n" => "0 . 2" });

    cut(&mut rt, &lengths(), "breaks:0", &opts).unwrap();

    assert_eq!(rt.events.len(), 2);
    for event in &rt.events {
        assert_eq!(event.get("sound"), Some(&Value::from("breaks:0")));
        assert_eq!(event.get("n"), Some(&Value::from("0 . 2")));
    }
}

#[test]
fn test_granulate_keeps_sample_with_rested_notes() {
    let mut rt = MockRuntime::new();
    let mut rng = StdRng::seed_from_u64(11);
    let cloud = GrainCloud {
        density: 4.0,
        extra: params! { "n" => "0 . 1" },
        ..Default::default()
    };

    granulate(&mut rt, &mut rng, "breaks:0", &cloud);

    assert_eq!(rt.events.len(), 4);
    assert!(rt
        .events
        .iter()
        .all(|grain| grain.get("sound") == Some(&Value::from("breaks:0"))));
}

#[test]
fn test_cut_requires_known_sample() {
    let mut rt = MockRuntime::new();
    let empty = SampleLengths::new();
    let err = cut(&mut rt, &empty, "breaks:0", &CutOptions::default()).unwrap_err();
    assert!(err.to_string().contains("breaks:0"));
    assert!(rt.sleeps.is_empty());
}

#[test]
fn test_granulate_seeded_cloud() {
    let mut rt = MockRuntime::new();
    let mut rng = StdRng::seed_from_u64(2024);
    let cloud = GrainCloud {
        density: 8.0,
        duration: 1.5,
        grain_size: 0.2,
        ..Default::default()
    };

    let total = granulate(&mut rt, &mut rng, "breaks:0", &cloud);

    assert_eq!(total, 1.5);
    assert_eq!(rt.events.len(), 12);
    assert!((rt.slept() - 1.5).abs() < 1e-9);
    for grain in &rt.events {
        let begin = grain.get("begin").and_then(Value::as_f64).unwrap();
        let pan = grain.get("pan").and_then(Value::as_f64).unwrap();
        assert!((0.0..=0.8).contains(&begin));
        assert!((0.0..=1.0).contains(&pan));
    }
}

#[test]
fn test_loop_over_state_voices() {
    let mut rt = MockRuntime::new();
    let mut state = State::new();
    state.dotted("drums.kick").init(params! { "sound" => "bd", "n_steps" => 4, "p" => 0.5 });
    state.dotted("drums.hat").init(params! { "sound" => "hh", "n" => "0 . 1 ." });

    let kick = state.dotted("drums.kick");
    let n_steps = kick.get("n_steps").and_then(Value::as_f64).unwrap() as usize;
    let period = kick.get("p").map(Period::from).unwrap_or_default();
    let kick_params = kick.params(&[], None);
    let hat_params = state.dotted("drums.hat").params(&[], None);

    let mut voices = [Voice::dirt(kick_params), Voice::dirt(hat_params)];
    let total = loop_steps(&mut rt, &mut voices, n_steps, &period).unwrap();

    assert_eq!(total, 2.0);
    assert_eq!(rt.events.len(), 8);
    assert!(rt.events.iter().all(|e| !e.contains_key("n_steps") && !e.contains_key("p")));
    assert_eq!(rt.events[6].get("i"), Some(&Value::Int(3)));
    assert_eq!(
        rt.events[1].get("sound"),
        Some(&Value::from("hh ^| [hh ^| [0 . 1 .]]"))
    );
}

#[test]
fn test_loop_uses_sender_duration() {
    let mut rt = MockRuntime::new();
    rt.suggested = Some(0.25);
    let mut voices = [Voice::dirt(params! { "sound" => "bd" })];

    let total = loop_steps(&mut rt, &mut voices, 4, &Period::FromSender).unwrap();
    assert_eq!(total, 1.0);
}

#[test]
fn test_loop_without_any_duration() {
    let mut rt = MockRuntime::new();
    let mut voices = [Voice::dirt(params! { "sound" => "bd" })];
    let err = loop_steps(&mut rt, &mut voices, 1, &Period::FromSender).unwrap_err();
    assert!(matches!(err, ToolsError::MissingStepDuration(0)));
}

#[test]
fn test_ziffers_mono_sustains() {
    let mut rt = MockRuntime::new();
    ziffers_mono(&mut rt, "zd", "q 0 h. 2 s 4", 0.5, &params! { "sound" => "superpiano" });

    let (_, _, sent) = &rt.ziffers[0];
    assert_eq!(sent.get("sustain"), Some(&Value::from("0.5 1.5 0.125")));
    assert_eq!(parse_ziff_duration("h."), Some(3.0));
}

#[test]
fn test_dirt_only_rewrites_text_rests() {
    let mut rt = MockRuntime::new();
    dirt(&mut rt, &params! { "sound" => "bd", "n" => "0 1" });
    dirt(&mut rt, &params! { "sound" => "bd", "midinote" => "60 . 64" });
    assert_eq!(rt.events[0].get("sound"), Some(&Value::from("bd")));
    assert_eq!(rt.events[1].get("sound"), Some(&Value::from("bd ^| [bd ^| [60 . 64]]")));
}

#[test]
fn test_players_and_swimmers() {
    let mut rt = MockRuntime::new();
    assert_eq!(ensure_player(&mut rt, "Pa"), PlayerStatus::Created);
    assert_eq!(ensure_player(&mut rt, "Pa"), PlayerStatus::Existing);
    assert_eq!(ensure_player(&mut rt, "Pb"), PlayerStatus::Created);

    start(&mut rt, ["drums", "bass"]);
    stop(&mut rt, ["drums"]);
    assert_eq!(rt.swimming, vec!["drums", "bass"]);
    assert_eq!(rt.stopped, vec!["drums"]);
}
