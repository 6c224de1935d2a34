//! Tilework Headless Simulation Harness
//!
//! Runs scripted scenarios through the real engine and checks the outcome.
//! Runs entirely in-process, no rendering.
//!
//! Usage:
//!   cargo run -p tilework-simtest
//!   cargo run -p tilework-simtest -- --verbose
//!   cargo run -p tilework-simtest -- --config sim.json

use std::cell::Cell;
use std::rc::Rc;
use tilework_core::jobs::{JobBoard, JobOutcome};
use tilework_core::prelude::*;
use tilework_logic::grid::Grid;
use tilework_logic::pathfinding::{find_path, Goal, Heuristic};
use tilework_logic::priority_queue::PriorityQueue;
use tilework_logic::tile_graph::TileGraph;
use tracing_subscriber::EnvFilter;

const DT: f32 = 1.0 / 20.0;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &[String]) -> SimConfig {
    let Some(path) = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
    else {
        return SimConfig::default();
    };
    match SimConfig::load(path) {
        Ok(config) => {
            log::info!("loaded config from {path}");
            config
        }
        Err(e) => {
            eprintln!("failed to load {path}: {e}");
            std::process::exit(2);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    init_logging(verbose);
    let config = load_config(&args);
    if verbose {
        if let Ok(json) = serde_json::to_string_pretty(&config) {
            println!("config: {json}");
        }
    }
    println!("=== Tilework Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Priority queue
    results.extend(validate_priority_queue());

    // 2. Pathfinding on synthetic grids
    results.extend(validate_pathfinding());

    // 3. Job queue tiers and parking
    results.extend(validate_job_queue(&config));

    // 4. Full haul scenario
    results.extend(validate_haul_scenario(&config));

    // 5. Cancellation and preemption
    results.extend(validate_cancellation(&config));

    // 6. Needs
    results.extend(validate_needs(&config));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn run_until(
    engine: &mut SimulationEngine,
    max_seconds: f32,
    mut done: impl FnMut(&SimulationEngine) -> bool,
) -> bool {
    let ticks = (max_seconds / DT) as usize;
    for _ in 0..ticks {
        engine.update(DT);
        if done(&*engine) {
            return true;
        }
    }
    false
}

// ── 1. Priority Queue ───────────────────────────────────────────────────

fn validate_priority_queue() -> Vec<TestResult> {
    println!("--- Priority Queue ---");
    let mut results = Vec::new();

    let mut pq = PriorityQueue::new();
    for (item, p) in [("c", 3.0), ("a", 1.0), ("b", 2.0), ("a2", 1.0)] {
        let _ = pq.enqueue(item, p);
    }
    let order: Vec<_> = std::iter::from_fn(|| pq.dequeue()).collect();
    results.push(TestResult::new(
        "pq_order",
        order == ["a", "a2", "b", "c"],
        format!("{order:?}"),
    ));

    let mut pq = PriorityQueue::new();
    let _ = pq.enqueue("x", 5.0);
    let _ = pq.enqueue("y", 4.0);
    let _ = pq.update_priority(&"x", 1.0);
    results.push(TestResult::new(
        "pq_update_priority",
        pq.dequeue() == Some("x"),
        "x lowered to 1.0 pops first",
    ));

    results.push(TestResult::new(
        "pq_duplicate_rejected",
        pq.enqueue("y", 0.0).is_err(),
        "enqueue of a present item fails",
    ));

    results
}

// ── 2. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding() -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    let grid = Grid::new(10, 10);
    let graph = TileGraph::build(&grid);
    let start = TilePos::new(0, 0);
    let goal = Goal::Tile(TilePos::new(9, 9));
    let route = find_path(&grid, &graph, start, &goal, Heuristic::for_goal(&goal));
    let steps = route.as_ref().ok().and_then(|r| r.as_ref()).map(|r| r.steps());
    results.push(TestResult::new(
        "path_open_diagonal",
        steps == Some(9),
        format!("(0,0)->(9,9) in {steps:?} steps"),
    ));

    let mut walled = Grid::new(5, 5);
    for y in 0..5 {
        walled.place_furniture(TilePos::new(2, y), Furniture::wall("Wall"));
    }
    let graph = TileGraph::build(&walled);
    let goal = Goal::Tile(TilePos::new(4, 4));
    let route = find_path(&walled, &graph, start, &goal, Heuristic::Zero);
    results.push(TestResult::new(
        "path_unreachable",
        matches!(route, Ok(None)),
        "wall splits the grid",
    ));

    let mut grid = Grid::new(4, 4);
    let stale = TileGraph::build(&grid);
    grid.place_furniture(TilePos::new(1, 1), Furniture::wall("Wall"));
    let goal = Goal::Tile(TilePos::new(3, 3));
    let route = find_path(&grid, &stale, start, &goal, Heuristic::Zero);
    results.push(TestResult::new(
        "path_stale_graph",
        route.is_err(),
        "search refuses an outdated graph",
    ));

    results
}

// ── 3. Job Queue ────────────────────────────────────────────────────────

fn validate_job_queue(config: &SimConfig) -> Vec<TestResult> {
    println!("--- Job Queue ---");
    let mut results = Vec::new();

    let tiles = TileWorld::new(6, 6);
    let mut board = JobBoard::new(config);
    let low = board.post(Job::new(JobPriority::Low).at(TilePos::new(1, 1)), &tiles);
    let high = board.post(Job::new(JobPriority::High).at(TilePos::new(2, 2)), &tiles);
    let medium = board.post(Job::new(JobPriority::Medium).at(TilePos::new(3, 3)), &tiles);

    let order: Vec<_> = std::iter::from_fn(|| board.take_job_for(1, None, &tiles)).collect();
    results.push(TestResult::new(
        "queue_tier_order",
        order == [high, medium, low],
        format!("{order:?}"),
    ));

    let mut job = Job::new(JobPriority::High).at(TilePos::new(4, 4));
    job.request("Steel", 2, 2);
    board.post(job, &tiles);
    results.push(TestResult::new(
        "queue_parks_missing_material",
        board.queue().waiting_count() == 1 && board.queue().is_empty(),
        format!("{} waiting", board.queue().waiting_count()),
    ));

    results
}

// ── 4. Haul Scenario ────────────────────────────────────────────────────

fn validate_haul_scenario(config: &SimConfig) -> Vec<TestResult> {
    println!("--- Haul Scenario ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::new(config.clone(), TileWorld::new(10, 10));
    let pile = TilePos::new(2, 2);
    engine
        .tiles_mut()
        .place_inventory(pile, Inventory::new("Steel", 5, config.max_stack_size));
    let ada = engine.spawn_agent("Ada", TilePos::new(0, 0));

    let completed = Rc::new(Cell::new(0));
    let mut job = Job::new(JobPriority::High).named("Build").at(TilePos::new(5, 5));
    job.request("Steel", 5, 5);
    let c = Rc::clone(&completed);
    job.on_completed(move |_| c.set(c.get() + 1));
    let id = engine.post_job(job);

    let mut visited_pile = false;
    let done = run_until(&mut engine, 60.0, |e| {
        visited_pile |= e.agent(ada).is_some_and(|a| a.tile == pile);
        e.job(id).is_none()
    });
    results.push(TestResult::new(
        "haul_job_completes",
        done,
        format!("finished at t={:.2}s", engine.sim_time()),
    ));
    results.push(TestResult::new("haul_visited_pile", visited_pile, "agent stood on (2, 2)"));
    results.push(TestResult::new(
        "haul_completed_once",
        completed.get() == 1,
        format!("{} completion callbacks", completed.get()),
    ));
    results.push(TestResult::new(
        "haul_hands_empty",
        engine.agent(ada).is_some_and(|a| a.carried.is_none()),
        "nothing carried afterwards",
    ));

    results
}

// ── 5. Cancellation ─────────────────────────────────────────────────────

fn validate_cancellation(config: &SimConfig) -> Vec<TestResult> {
    println!("--- Cancellation ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::new(config.clone(), TileWorld::new(10, 10));
    let ada = engine.spawn_agent("Ada", TilePos::new(0, 0));
    let outcome = Rc::new(Cell::new(None));
    let mut job = Job::new(JobPriority::High).at(TilePos::new(9, 9)).with_work_time(30.0);
    let o = Rc::clone(&outcome);
    job.on_stopped(move |_, out| o.set(Some(out)));
    let id = engine.post_job(job);

    run_until(&mut engine, 1.0, |_| false);
    let cancelled = engine.cancel_job(id).is_ok();
    results.push(TestResult::new(
        "cancel_stops_job",
        cancelled && outcome.get() == Some(JobOutcome::Cancelled),
        format!("{:?}", outcome.get()),
    ));
    results.push(TestResult::new(
        "cancel_frees_worker",
        engine.brain(ada).is_some_and(|b| !b.has_state()),
        "worker chain torn down",
    ));

    let forge = engine.post_job(Job::new(JobPriority::High).at_furniture("Forge"));
    let prioritized = engine.prioritize_job(ada, forge).is_ok();
    engine.update(DT);
    let priority = engine.job(forge).map(|j| j.priority);
    results.push(TestResult::new(
        "abandon_lowers_priority",
        prioritized && priority == Some(JobPriority::Medium),
        format!("{priority:?}"),
    ));

    results
}

// ── 6. Needs ────────────────────────────────────────────────────────────

fn validate_needs(config: &SimConfig) -> Vec<TestResult> {
    println!("--- Needs ---");
    let mut results = Vec::new();

    let mut engine = SimulationEngine::new(config.clone(), TileWorld::new(8, 8));
    let bed = TilePos::new(7, 7);
    engine.tiles_mut().place_furniture(bed, Furniture::new("Bed", 1.0));
    let mut sleep = Need::new("Sleep", 0.0).restored_at("Bed", 1.0);
    sleep.amount = 0.95;
    let ada = engine.spawn_agent_with_needs("Ada", TilePos::new(0, 0), Needs::new(vec![sleep]));

    let rested = run_until(&mut engine, 30.0, |e| {
        e.needs(ada).is_some_and(|n| n.needs[0].amount < 0.5)
    });
    results.push(TestResult::new(
        "need_restored_at_furniture",
        rested && engine.agent(ada).is_some_and(|a| a.tile == bed),
        format!("t={:.2}s", engine.sim_time()),
    ));

    let mut food = Need::new("Food", 0.0).restored_at("Table", 0.2).critical_fallback();
    food.amount = 1.0;
    let bob = engine.spawn_agent_with_needs("Bob", TilePos::new(3, 0), Needs::new(vec![food]));
    let fed = run_until(&mut engine, 10.0, |e| {
        e.needs(bob).is_some_and(|n| n.needs[0].amount < 1.0)
    });
    let amount = engine.needs(bob).map(|n| n.needs[0].amount);
    results.push(TestResult::new(
        "need_critical_on_the_spot",
        fed && engine.agent(bob).is_some_and(|a| a.tile == TilePos::new(3, 0)),
        format!("food at {amount:?}"),
    ));

    results
}
