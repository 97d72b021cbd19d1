//! Kinematic arena
//!
//! Bodies move at a fixed speed along whatever direction their brain
//! last commanded and slide along wall cells. Walls are exposed to the
//! AI as AABB obstacles on [`LayerMask::WALLS`].

use std::fmt;

use glam::{IVec2, Vec2};
use hollow_ai::actuator::{Actuator, NoAnimation};
use hollow_ai::boss::{BossBrain, BossPhase, BossState, BossTick};
use hollow_ai::enemy::{EnemyBrain, EnemyState};
use hollow_ai::grid::{GridConfig, LayeredTiles, NavGrid, TileClassifier};
use hollow_ai::handle::EntityId;
use hollow_ai::navigation::PathService;
use hollow_ai::routine::CombatFlags;
use hollow_ai::world::{LayerMask, Obstacle, StaticWorld};
use hollow_combat::{Health, HealthEvent};

use crate::error::{Result, SimError};
use crate::scenario::{BossSpec, EnemySpec, ProjectileSpec, Scenario};

const BODY_RADIUS: f32 = 0.3;

/// Commands collected from a brain during one tick
#[derive(Debug, Clone, Default)]
pub struct BodyCommands {
    /// Last commanded movement; persists until replaced
    pub movement: Vec2,
    pub facing: Vec2,
    pub swings: u32,
    pub shots: Vec<Vec2>,
}

impl BodyCommands {
    /// Displacement for this tick; none while the brain holds the movement lock
    pub fn displacement(&self, flags: CombatFlags, speed: f32, delta_time: f32) -> Vec2 {
        if flags.movement_locked {
            return Vec2::ZERO;
        }
        self.movement * speed * delta_time
    }
}

impl Actuator for BodyCommands {
    fn move_in(&mut self, direction: Vec2) {
        self.movement = direction.clamp_length_max(1.0);
    }

    fn look_at(&mut self, position: Vec2) {
        self.facing = position;
    }

    fn attack(&mut self) {
        self.swings += 1;
    }

    fn cancel_attack(&mut self) {
        self.swings = 0;
    }

    fn fire(&mut self, direction: Vec2) {
        self.shots.push(direction);
    }
}

#[derive(Debug, Clone)]
struct Body {
    id: EntityId,
    position: Vec2,
    speed: f32,
    commands: BodyCommands,
}

impl Body {
    fn new(id: EntityId, position: Vec2, speed: f32) -> Self {
        Self {
            id,
            position,
            speed,
            commands: BodyCommands::default(),
        }
    }
}

/// Walkable cells of the map and their world mapping
struct Floor {
    tiles: LayeredTiles,
    grid: GridConfig,
}

impl Floor {
    fn cell_of(&self, position: Vec2) -> IVec2 {
        ((position - self.grid.origin) / self.grid.cell_size)
            .floor()
            .as_ivec2()
    }

    fn is_open(&self, position: Vec2) -> bool {
        self.tiles.is_walkable(self.cell_of(position))
    }

    /// Apply `step`, sliding along blocked axes
    fn advance(&self, from: Vec2, step: Vec2) -> Vec2 {
        let candidates = [
            from + step,
            from + Vec2::new(step.x, 0.0),
            from + Vec2::new(0.0, step.y),
        ];
        candidates
            .into_iter()
            .find(|p| self.is_open(*p))
            .unwrap_or(from)
    }
}

struct Player {
    body: Body,
    route: Vec<Vec2>,
    next: usize,
    health: Health,
}

struct Grunt {
    body: Body,
    brain: EnemyBrain,
    spec: EnemySpec,
    state: EnemyState,
}

struct Boss {
    body: Body,
    brain: BossBrain,
    health: Health,
    spec: BossSpec,
    state: BossState,
    phase: BossPhase,
    shots_fired: u32,
}

#[derive(Debug, Clone)]
struct Projectile {
    position: Vec2,
    velocity: Vec2,
    remaining: f32,
}

/// Boss outcome
#[derive(Debug, Clone, PartialEq)]
pub struct BossSummary {
    pub state: BossState,
    pub phase: BossPhase,
    pub health_ratio: f32,
    pub shots_fired: u32,
}

/// What happened during a run
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub scenario: String,
    pub ticks: u64,
    pub elapsed: f32,
    pub player_health: f32,
    pub player_alive: bool,
    pub hits_taken: u32,
    pub grunts: Vec<EnemyState>,
    pub boss: Option<BossSummary>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario '{}'", self.scenario)?;
        writeln!(f, "  ticks:        {} ({:.2}s)", self.ticks, self.elapsed)?;
        writeln!(
            f,
            "  player:       {:.1} hp, {} hits taken{}",
            self.player_health,
            self.hits_taken,
            if self.player_alive { "" } else { ", defeated" }
        )?;
        for (i, state) in self.grunts.iter().enumerate() {
            writeln!(f, "  grunt {}:      {:?}", i, state)?;
        }
        if let Some(boss) = &self.boss {
            writeln!(
                f,
                "  boss:         {:?} in {:?}, {:.0}% health, {} shots fired",
                boss.state,
                boss.phase,
                boss.health_ratio * 100.0,
                boss.shots_fired
            )?;
        }
        Ok(())
    }
}

/// A running scenario
pub struct Arena {
    name: String,
    world: StaticWorld,
    floor: Floor,
    player: Player,
    grunts: Vec<Grunt>,
    boss: Option<Boss>,
    projectile: ProjectileSpec,
    projectiles: Vec<Projectile>,
    delta_time: f32,
    total_ticks: u64,
    ticks: u64,
    hits_taken: u32,
}

impl Arena {
    /// Build the world, grid and brains for a scenario
    pub fn new(scenario: &Scenario) -> Result<Self> {
        let tiles = LayeredTiles::from_rows(&scenario.map);
        let grid = scenario.ai.grid.clone().with_cell_size(scenario.cell_size);
        let floor = Floor {
            tiles,
            grid: grid.clone(),
        };
        let paths = PathService::new(NavGrid::build(grid, &floor.tiles)?);

        let mut world = StaticWorld::new();
        let half = Vec2::splat(floor.grid.cell_size * 0.5);
        let blocked: Vec<IVec2> = floor
            .tiles
            .bounds()
            .cells()
            .filter(|c| !floor.tiles.is_walkable(*c))
            .collect();
        for cell in &blocked {
            let center =
                floor.grid.origin + (cell.as_vec2() + Vec2::splat(0.5)) * floor.grid.cell_size;
            world.add_obstacle(Obstacle::aabb(center, half), LayerMask::WALLS);
        }

        let mut next_index = 0u32;
        let mut spawn = |position: Vec2, what: &str| -> Result<EntityId> {
            if !floor.is_open(position) {
                return Err(SimError::scenario(format!(
                    "{} spawn {} is not on open floor",
                    what, position
                )));
            }
            let id = EntityId::from_index(next_index);
            next_index += 1;
            Ok(id)
        };

        let start = scenario.player.route[0];
        let player_id = spawn(start, "player")?;
        world.set_entity_with_radius(player_id, start, BODY_RADIUS, LayerMask::PLAYER);
        let player = Player {
            body: Body::new(player_id, start, scenario.player.speed),
            route: scenario.player.route.clone(),
            next: 1 % scenario.player.route.len(),
            health: Health::new(scenario.player.health)
                .with_invulnerability_on_hit(scenario.player.invulnerability),
        };

        let mut grunts = Vec::with_capacity(scenario.enemies.len());
        for (i, spec) in scenario.enemies.iter().enumerate() {
            let id = spawn(spec.position, "enemy")?;
            let seed = scenario.seed.wrapping_add(i as u64 + 1);
            let config = scenario.ai.enemy.clone().with_seed(seed);
            let brain = EnemyBrain::new(config, Some(id), spec.position)?
                .with_path_service(paths.clone());
            world.set_entity_with_radius(id, spec.position, BODY_RADIUS, LayerMask::ENEMIES);
            grunts.push(Grunt {
                body: Body::new(id, spec.position, spec.speed),
                brain,
                spec: spec.clone(),
                state: EnemyState::Idle,
            });
        }

        let mut projectile = ProjectileSpec::default();
        let boss = match &scenario.boss {
            Some(spec) => {
                let id = spawn(spec.position, "boss")?;
                let mut config = scenario.ai.boss.clone().with_seed(scenario.seed);
                if !spec.corners.is_empty() {
                    config = config.with_corners(spec.corners.clone());
                }
                let brain = BossBrain::new(config, Some(id), spec.position)?
                    .with_path_service(paths.clone());
                world.set_entity_with_radius(
                    id,
                    spec.position,
                    BODY_RADIUS * 2.0,
                    LayerMask::ENEMIES,
                );
                projectile = spec.projectile.clone();
                Some(Boss {
                    body: Body::new(id, spec.position, spec.speed),
                    brain,
                    health: Health::new(spec.health),
                    spec: spec.clone(),
                    state: BossState::Idle,
                    phase: BossPhase::Phase1,
                    shots_fired: 0,
                })
            }
            None => None,
        };

        log::info!(
            "Arena '{}': {} walkable cells, {} grunts{}",
            scenario.name,
            paths.node_count(),
            grunts.len(),
            if boss.is_some() { " and the boss" } else { "" }
        );

        Ok(Self {
            name: scenario.name.clone(),
            world,
            floor,
            player,
            grunts,
            boss,
            projectile,
            projectiles: Vec::new(),
            delta_time: scenario.delta_time(),
            total_ticks: scenario.total_ticks(),
            ticks: 0,
            hits_taken: 0,
        })
    }

    /// Ticks simulated so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// True once the scenario duration has elapsed
    pub fn is_finished(&self) -> bool {
        self.ticks >= self.total_ticks || !self.player.health.is_alive()
    }

    pub fn player_position(&self) -> Vec2 {
        self.player.body.position
    }

    /// Advance one fixed tick; false once the run is over
    pub fn step(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        let dt = self.delta_time;

        self.walk_player(dt);
        self.tick_grunts(dt);
        self.tick_boss(dt);
        self.move_projectiles(dt);

        for event in self.player.health.update(dt) {
            match event {
                HealthEvent::Damaged { amount, remaining } => {
                    self.hits_taken += 1;
                    log::debug!("Player hit for {:.1}, {:.1} left", amount, remaining);
                }
                HealthEvent::Died => log::info!("Player defeated at tick {}", self.ticks),
                _ => {}
            }
        }

        self.ticks += 1;
        !self.is_finished()
    }

    /// Run to completion
    pub fn run(mut self) -> Summary {
        while self.step() {}
        self.summary()
    }

    /// Snapshot of the run so far
    pub fn summary(&self) -> Summary {
        Summary {
            scenario: self.name.clone(),
            ticks: self.ticks,
            elapsed: self.ticks as f32 * self.delta_time,
            player_health: self.player.health.current,
            player_alive: self.player.health.is_alive(),
            hits_taken: self.hits_taken,
            grunts: self.grunts.iter().map(|g| g.state).collect(),
            boss: self.boss.as_ref().map(|b| BossSummary {
                state: b.state,
                phase: b.phase,
                health_ratio: b.health.ratio(),
                shots_fired: b.shots_fired,
            }),
        }
    }

    fn walk_player(&mut self, dt: f32) {
        let player = &mut self.player;
        let target = player.route[player.next];
        let offset = target - player.body.position;
        let step = player.body.speed * dt;

        if offset.length() <= step {
            player.body.position = target;
            player.next = (player.next + 1) % player.route.len();
        } else {
            let next = player.body.position + offset.normalize_or_zero() * step;
            player.body.position = self
                .floor
                .advance(player.body.position, next - player.body.position);
        }
        self.world.move_entity(player.body.id, player.body.position);
    }

    fn tick_grunts(&mut self, dt: f32) {
        let player_position = self.player.body.position;

        for (i, grunt) in self.grunts.iter_mut().enumerate() {
            let state = grunt
                .brain
                .tick(dt, grunt.body.position, &self.world, &mut grunt.body.commands);
            if state != grunt.state {
                log::info!("Grunt {}: {:?} -> {:?}", i, grunt.state, state);
                grunt.state = state;
            }

            let commands = &mut grunt.body.commands;
            for _ in 0..std::mem::take(&mut commands.swings) {
                if grunt.body.position.distance(player_position) <= grunt.spec.reach {
                    self.player.health.apply_damage(grunt.spec.damage);
                }
            }

            let step = commands.displacement(grunt.brain.flags(), grunt.body.speed, dt);
            grunt.body.position = self.floor.advance(grunt.body.position, step);
            self.world.move_entity(grunt.body.id, grunt.body.position);
        }
    }

    fn tick_boss(&mut self, dt: f32) {
        let Some(boss) = &mut self.boss else {
            return;
        };

        if boss.health.is_alive() {
            boss.health.apply_damage(boss.spec.damage_per_second * dt);
            boss.health.update(dt);
        }

        let state = boss.brain.tick(BossTick {
            delta_time: dt,
            position: boss.body.position,
            health_ratio: boss.health.ratio(),
            world: &self.world,
            actuator: &mut boss.body.commands,
            animation: &NoAnimation,
        });
        if state != boss.state {
            log::info!("Boss: {:?} -> {:?}", boss.state, state);
            boss.state = state;
        }
        if boss.brain.phase() != boss.phase {
            log::info!("Boss enters {:?}", boss.brain.phase());
            boss.phase = boss.brain.phase();
        }

        let commands = &mut boss.body.commands;
        let player_position = self.player.body.position;
        for _ in 0..std::mem::take(&mut commands.swings) {
            if boss.body.position.distance(player_position) <= boss.spec.melee_reach {
                self.player.health.apply_damage(boss.spec.melee_damage);
            }
        }
        for aim in std::mem::take(&mut commands.shots) {
            let Some(aim) = aim.try_normalize() else {
                continue;
            };
            boss.shots_fired += 1;
            self.projectiles.push(Projectile {
                position: boss.body.position + aim * BODY_RADIUS * 2.0,
                velocity: aim * self.projectile.speed,
                remaining: self.projectile.lifetime,
            });
        }

        if state == BossState::Dead {
            commands.movement = Vec2::ZERO;
        }
        let step = commands.displacement(boss.brain.flags(), boss.body.speed, dt);
        boss.body.position = self.floor.advance(boss.body.position, step);
        self.world.move_entity(boss.body.id, boss.body.position);
    }

    fn move_projectiles(&mut self, dt: f32) {
        let player_position = self.player.body.position;
        let spec = &self.projectile;
        let floor = &self.floor;
        let health = &mut self.player.health;

        self.projectiles.retain_mut(|p| {
            p.position += p.velocity * dt;
            p.remaining -= dt;
            if p.remaining <= 0.0 || !floor.is_open(p.position) {
                return false;
            }
            if p.position.distance(player_position) <= spec.radius {
                health.apply_damage(spec.damage);
                return false;
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Scenario {
        Scenario::from_toml(
            r#############"
            tick_rate = 50.0
            duration = 4.0
            seed = 3
            map = [
                "############",
                "#..........#",
                "############",
            ]
            [player]
            route = [[3.5, 1.5]]
            [[enemies]]
            position = [8.5, 1.5]
            [ai.enemy]
            attack_chance = 1.0
            "#############,
        )
        .unwrap()
    }

    #[test]
    fn test_walls_become_obstacles() {
        let arena = Arena::new(&corridor()).unwrap();
        assert!(arena.floor.is_open(Vec2::new(1.5, 1.5)));
        assert!(!arena.floor.is_open(Vec2::new(1.5, 0.5)));
        assert!(!arena.floor.is_open(Vec2::new(-3.0, 1.5)));

        let ray = hollow_ai::world::WorldQuery::raycast(
            &arena.world,
            Vec2::new(1.5, 1.5),
            Vec2::Y,
            5.0,
            LayerMask::WALLS,
        )
        .unwrap();
        assert!((ray.distance - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_sliding_along_walls() {
        let arena = Arena::new(&corridor()).unwrap();
        let moved = arena.floor.advance(Vec2::new(3.5, 1.5), Vec2::new(0.25, 0.75));
        assert_eq!(moved, Vec2::new(3.75, 1.5));
        let stuck = arena.floor.advance(Vec2::new(10.5, 1.5), Vec2::new(1.0, 1.0));
        assert_eq!(stuck, Vec2::new(10.5, 1.5));
    }

    #[test]
    fn test_grunt_closes_in_and_hits() {
        let mut arena = Arena::new(&corridor()).unwrap();
        let summary = {
            while arena.step() {}
            arena.summary()
        };

        assert_eq!(summary.ticks, 200);
        assert!(summary.hits_taken > 0);
        assert!(summary.player_health < 100.0);
        assert!(arena.grunts[0].body.position.x < 5.0);
    }

    #[test]
    fn test_bad_spawn_is_rejected() {
        let mut scenario = corridor();
        scenario.enemies[0].position = Vec2::new(0.5, 0.5);
        assert!(matches!(Arena::new(&scenario), Err(SimError::Scenario(_))));
    }

    #[test]
    fn test_commands_persist_movement() {
        let mut commands = BodyCommands::default();
        commands.move_in(Vec2::new(2.0, 0.0));
        commands.attack();
        commands.fire(Vec2::X);
        assert_eq!(commands.movement, Vec2::X);
        assert_eq!(commands.swings, 1);
        commands.cancel_attack();
        assert_eq!(commands.swings, 0);
        assert_eq!(commands.shots, vec![Vec2::X]);
    }

    #[test]
    fn test_locked_body_does_not_move() {
        let mut commands = BodyCommands::default();
        commands.move_in(Vec2::Y);

        let free = CombatFlags::default();
        assert_eq!(commands.displacement(free, 2.0, 0.5), Vec2::Y);

        let locked = CombatFlags {
            movement_locked: true,
            ..free
        };
        assert_eq!(commands.displacement(locked, 2.0, 0.5), Vec2::ZERO);
    }
}
