//! End-to-end scenarios for the motion matching controller.

use approx::assert_relative_eq;
use motion_matching::{
    build_index, combine_heading, combine_trajectory, wrap_angle, CharacterState, Channel, ChannelKind, Clip,
    ClipLibrary, Cursor, Joint, MatchDecision, MatcherConfig, MotionMatcher, NormalizationStats, Playback,
    PlaybackState, RootMotion, SearchMode, SkeletonBinding, TrajectoryWeights, UserInput,
};
use nalgebra::Vector3;
use std::sync::Arc;

// =============================================================================
// FIXTURES
// =============================================================================

/// Clip with a root and one child joint. The root walks forward `step_cm`
/// per frame and faces `yaw` degrees; the spine bends by `bend` degrees.
fn clip(name: &str, frames: usize, step_cm: f64, yaw: f64, bend: f64) -> Clip {
    let z: Vec<f64> = (0..frames).map(|f| f as f64 * step_cm).collect();
    let root = Joint::new(
        "hips",
        vec![
            Channel::new(ChannelKind::XPosition, vec![0.0; frames]),
            Channel::new(ChannelKind::YPosition, vec![95.0; frames]),
            Channel::new(ChannelKind::ZPosition, z),
            Channel::new(ChannelKind::ZRotation, vec![0.0; frames]),
            Channel::new(ChannelKind::XRotation, vec![0.0; frames]),
            Channel::new(ChannelKind::YRotation, vec![yaw; frames]),
        ],
    );
    let spine = Joint::new(
        "spine",
        vec![
            Channel::new(ChannelKind::ZRotation, vec![0.0; frames]),
            Channel::new(ChannelKind::XRotation, vec![bend; frames]),
            Channel::new(ChannelKind::YRotation, vec![0.0; frames]),
        ],
    );
    Clip::new(name, vec![root, spine], frames, 1.0 / 30.0).unwrap()
}

fn library() -> Arc<ClipLibrary> {
    Arc::new(
        ClipLibrary::new(vec![
            clip("idle", 120, 0.0, 0.0, 0.0),
            clip("walk", 120, 5.0, 0.0, 10.0),
            clip("turn", 120, 3.0, 90.0, 20.0),
        ])
        .unwrap(),
    )
}

fn stats_text(dim: usize) -> String {
    let means = vec!["0.0"; dim].join(",");
    let stds = vec!["1.0"; dim].join(",");
    format!("Means:\n{means}\nStd_Devs:\n{stds}\nMax X and Z velocity:\n3.0,4.0\n")
}

// =============================================================================
// TRAJECTORY AND ANGLES
// =============================================================================

#[test]
fn test_far_horizon_is_user_trajectory() {
    let w = TrajectoryWeights::default();
    assert_eq!(combine_trajectory(5.0, -3.0, 60, &w).unwrap(), -3.0);
}

#[test]
fn test_heading_blend_never_crosses_180() {
    for i in 0..=100 {
        let a = f64::from(i) / 100.0;
        let w = TrajectoryWeights { near: a, mid: a };
        for h in [20, 40] {
            let heading = combine_heading(350.0, 10.0, h, &w).unwrap();
            assert!(heading >= 350.0 || heading <= 10.0 + 1e-9, "weight {a}: {heading}");
        }
    }
}

#[test]
fn test_wrap_angle_range_and_congruence() {
    for i in -2000..2000 {
        let a = f64::from(i) * 0.77;
        let w = wrap_angle(a);
        assert!(w > -180.0 && w <= 180.0, "{a} -> {w}");
        let k = (a - w) / 360.0;
        assert_relative_eq!(k, k.round(), epsilon = 1e-9);
    }
    assert_eq!(wrap_angle(180.0), 180.0);
    assert_eq!(wrap_angle(-180.0), 180.0);
}

// =============================================================================
// PLAYBACK
// =============================================================================

#[test]
fn test_playback_state_walkthrough() {
    let library = library();
    let length = 4;
    let mut playback = Playback::new(length, RootMotion::Animation, 0.01);
    assert_eq!(playback.state(), PlaybackState::Idle);

    playback.request(Cursor::new(0, 10));
    assert!(matches!(playback.state(), PlaybackState::Playing { .. }));
    playback.advance(&library).unwrap();

    playback.request(Cursor::new(1, 30));
    assert!(matches!(playback.state(), PlaybackState::Transitioning { tick: 1, .. }));

    for _ in 0..length {
        playback.advance(&library).unwrap();
    }
    assert_eq!(
        playback.state(),
        PlaybackState::Playing {
            current: Cursor::new(1, 30 + length as usize)
        }
    );
}

#[test]
fn test_transition_continuity() {
    let library = library();
    let length = 5;
    let mut playback = Playback::new(length, RootMotion::Animation, 0.01);
    playback.play(Cursor::new(1, 20));
    playback.request(Cursor::new(2, 50));

    let walk = library.get(1).unwrap();
    let turn = library.get(2).unwrap();

    // tick 1 is only a fifth of the way to the incoming clip
    let first = playback.advance(&library).unwrap().unwrap();
    let outgoing = walk.joint_rotation(0, 20);
    let incoming = turn.joint_rotation(0, 50);
    let full = outgoing.angle_to(&incoming);
    assert_relative_eq!(first.joints()[0].rotation.angle_to(&outgoing), full / 5.0, epsilon = 1e-9);

    for _ in 2..length {
        playback.advance(&library).unwrap();
    }

    // the last blended tick is exactly the incoming clip
    let last = playback.advance(&library).unwrap().unwrap();
    let frame = 50 + length as usize - 1;
    assert_eq!(last.joints()[0].rotation, turn.joint_rotation(0, frame));
    assert_eq!(last.joints()[1].rotation, turn.joint_rotation(1, frame));
    assert_relative_eq!(
        last.root_translation().unwrap(),
        turn.root_delta(frame, 0.01),
        epsilon = 1e-12
    );

    // and playback carries straight on from there
    let next = playback.advance(&library).unwrap().unwrap();
    assert_eq!(next.joints()[1].rotation, turn.joint_rotation(1, frame + 1));
}

#[test]
fn test_binding_applies_blended_pose() {
    let library = library();
    let host = [("root", 0_usize), ("hips", 1), ("spine", 2), ("head", 3)];
    let binding = SkeletonBinding::resolve(library.joint_names(), host).unwrap();

    let mut playback = Playback::new(3, RootMotion::Animation, 0.01);
    playback.play(Cursor::new(1, 5));
    let pose = playback.advance(&library).unwrap().unwrap();

    let mut handles = Vec::new();
    binding.apply(&pose, |h, _| handles.push(*h)).unwrap();
    assert_eq!(handles, [1, 2]);
}

// =============================================================================
// MATCHER
// =============================================================================

fn matcher_with_database(config: MatcherConfig, rows: [&str; 3]) -> MotionMatcher {
    let dim = config.feature_dim();
    let stats = Arc::new(NormalizationStats::parse(&stats_text(dim), dim).unwrap());
    let index = Arc::new(build_index(dim, rows).unwrap());
    MotionMatcher::new(config, library(), stats, index).unwrap()
}

fn row(value: f64, dim: usize, frame: usize) -> String {
    let mut fields = vec![format!("{value}"); dim];
    fields.push(frame.to_string());
    fields.join(",")
}

#[test]
fn test_controller_holds_idle_in_place() {
    let dim = 24;
    let idle = row(0.0, dim, 1);
    let walk = row(5.0, dim, 10);
    let turn = row(-5.0, dim, 20);
    let config = MatcherConfig::default().with_match_interval(5);
    let mut matcher = matcher_with_database(config, [idle.as_str(), walk.as_str(), turn.as_str()]);

    let mut state = CharacterState::default();
    let input = UserInput::neutral();
    let mut travelled = Vector3::zeros();

    for tick in 0..30 {
        let out = matcher.tick(&state, &input).unwrap();
        assert!(out.pose.is_some(), "tick {tick}");
        travelled += out.root_displacement;
        state.hip_position += out.root_displacement;
        if tick == 0 {
            assert_eq!(out.decision, MatchDecision::Start(Cursor::new(0, 1)));
        }
    }

    // idle clip never moves the root
    assert_eq!(travelled, Vector3::zeros());
    assert_eq!(matcher.ticks(), 30);
}

#[test]
fn test_search_modes_agree_tick_by_tick() {
    let dim = 24;
    let rows: Vec<String> = (0..3)
        .map(|c| {
            (0..40)
                .map(|f| row(((c * 40 + f) as f64 * 0.37).sin() * 2.0, dim, f + 1))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect();
    let rows = [rows[0].as_str(), rows[1].as_str(), rows[2].as_str()];

    let mut tree = matcher_with_database(MatcherConfig::default().with_match_interval(3), rows);
    let mut scan = matcher_with_database(
        MatcherConfig::default()
            .with_match_interval(3)
            .with_search_mode(SearchMode::BruteForce),
        rows,
    );

    let mut state = CharacterState::default();
    for tick in 0..60 {
        let t = f64::from(tick);
        state.left_foot = Vector3::new(-0.1, 0.1 * (t * 0.3).sin().abs(), 0.02 * t);
        state.right_foot = Vector3::new(0.1, 0.1 * (t * 0.3).cos().abs(), 0.02 * t);
        state.hip_position = Vector3::new(0.0, 0.95, 0.02 * t);
        state.hip_euler = Vector3::new(0.0, (t * 7.0) % 360.0, 0.0);
        let input = UserInput::from_stick((t * 0.1).cos(), (t * 0.1).sin());

        let a = tree.tick(&state, &input).unwrap();
        let b = scan.tick(&state, &input).unwrap();
        assert_eq!(a.decision, b.decision, "tick {tick}");
        assert_eq!(a.pose, b.pose, "tick {tick}");
    }
}

#[test]
fn test_rotation_only_clips_match_exact_vector() {
    let dim = 24;
    let single_joint = |name: &str, yaw: f64| {
        let hip = Joint::new(
            "hip",
            vec![
                Channel::new(ChannelKind::ZRotation, vec![0.0; 5]),
                Channel::new(ChannelKind::XRotation, vec![0.0; 5]),
                Channel::new(ChannelKind::YRotation, (0..5_u32).map(|f| yaw + f64::from(f)).collect()),
            ],
        );
        Clip::new(name, vec![hip], 5, 1.0 / 30.0).unwrap()
    };
    let library = Arc::new(ClipLibrary::new(vec![single_joint("A", 0.0), single_joint("B", 45.0)]).unwrap());

    let value = |clip: u32, frame: u32| f64::from(clip) + f64::from(frame) * 0.1;
    let rows = |clip: u32| -> String {
        (0..5_u32)
            .map(|f| row(value(clip, f), dim, f as usize))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let (a, b) = (rows(0), rows(1));
    let index = Arc::new(build_index(dim, [a.as_str(), b.as_str()]).unwrap());
    let stats = Arc::new(NormalizationStats::parse(&stats_text(dim), dim).unwrap());

    let query = vec![value(0, 3); dim];
    let tree = index.query(&query).unwrap();
    let scan = index.brute_force_query(&query).unwrap();
    assert_eq!((tree.clip(), tree.frame()), (0, 3));
    assert_eq!((scan.clip(), scan.frame()), (0, 3));

    let mut matcher = MotionMatcher::new(MatcherConfig::default(), Arc::clone(&library), stats, index).unwrap();
    let out = matcher
        .tick(&CharacterState::default(), &UserInput::neutral())
        .unwrap();
    assert_eq!(out.decision, MatchDecision::Start(Cursor::new(0, 0)));
    let pose = out.pose.unwrap();
    let expected = library.get(0).unwrap().joint_rotation(0, 0);
    assert_eq!(pose.get("hip").map(|j| j.rotation), Some(expected));
    assert!(pose.get("spine").is_none());
    assert_eq!(out.root_displacement, Vector3::zeros());
}

#[test]
fn test_kinematic_mode_walks_with_stick() {
    let dim = 24;
    let idle = row(0.0, dim, 1);
    let config = MatcherConfig::default().with_root_motion(RootMotion::Kinematic);
    let mut matcher = matcher_with_database(config, [idle.as_str(), idle.as_str(), idle.as_str()]);

    let forward = UserInput::from_stick(0.0, 1.0);
    let mut state = CharacterState::default();
    for _ in 0..60 {
        let out = matcher.tick(&state, &forward).unwrap();
        state.hip_position += out.root_displacement;
    }
    // two seconds of walking at up to 2 m/s
    assert!(state.hip_position.z > 2.5 && state.hip_position.z < 4.0);
    assert_relative_eq!(state.hip_position.x, 0.0, epsilon = 1e-12);
}
