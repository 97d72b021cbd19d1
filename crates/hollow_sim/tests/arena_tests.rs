//! Integration tests for hollow_sim

use hollow_ai::boss::{BossPhase, BossState};
use hollow_sim::{Arena, Scenario};

#[test]
fn test_builtin_arena_runs() {
    let mut scenario = Scenario::builtin().unwrap();
    scenario.duration = 5.0;

    let summary = Arena::new(&scenario).unwrap().run();
    assert_eq!(summary.ticks, 250);
    assert_eq!(summary.grunts.len(), scenario.enemies.len());
    assert!(summary.boss.is_some());
    assert!(summary.to_string().contains("Scenario 'arena'"));
}

#[test]
fn test_boss_is_walked_through_its_phases() {
    let scenario = Scenario::from_toml(
        r###########"
        name = "boss-only"
        duration = 12.0
        seed = 5
        map = [
            "##########",
            "#........#",
            "#........#",
            "#........#",
            "##########",
        ]

        [player]
        route = [[1.5, 1.5], [8.5, 1.5]]
        health = 1000.0

        [boss]
        position = [5.5, 3.5]
        health = 100.0
        damage_per_second = 10.0
        corners = [[1.5, 3.5], [8.5, 3.5]]
        "###########,
    )
    .unwrap();

    let mut arena = Arena::new(&scenario).unwrap();
    let mut seen = Vec::new();
    while arena.step() {
        let phase = arena.summary().boss.unwrap().phase;
        if seen.last() != Some(&phase) {
            seen.push(phase);
        }
    }

    assert_eq!(seen, vec![BossPhase::Phase1, BossPhase::Phase2, BossPhase::Phase3]);
    let boss = arena.summary().boss.unwrap();
    assert_eq!(boss.state, BossState::Dead);
    assert_eq!(boss.health_ratio, 0.0);
    assert!(arena.summary().player_alive);
}
