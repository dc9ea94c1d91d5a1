//! Predicate search CLI - Run a search from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use pred_search::{
    compute::search::{StepOutcome, build_search},
    schema::{GrammarEvolutionConfig, SearchConfig, SearchStrategy},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Search a grammar for predicates that accept the example traces");
        eprintln!("and reject the counter-example traces.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to search configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: SearchConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let mut search = build_search(&config).unwrap_or_else(|e| {
        eprintln!("{}", e);
        std::process::exit(1);
    });

    println!("Predicate Search");
    println!("================");
    println!("Grammar: {}", config.problem.grammar_path.display());
    println!("Traces: {}", config.problem.traces_path.display());
    match &config.strategy {
        SearchStrategy::BruteForce(brute_force) => {
            println!("Strategy: brute force (max depth {})", brute_force.max_depth)
        }
        SearchStrategy::GrammarEvolution(evolution) => println!(
            "Strategy: grammar evolution ({} x {} generations)",
            evolution.population.size, evolution.population.max_generations
        ),
    }
    println!();

    if let Err(e) = search.initialize() {
        eprintln!("Initialization failed: {}", e);
        std::process::exit(1);
    }

    println!("Searching...");
    let start = Instant::now();
    let mut last_best = f32::NEG_INFINITY;

    while search.step() == StepOutcome::Advanced {
        if search.best_fitness() > last_best {
            last_best = search.best_fitness();
            println!(
                "  Step {}: best fitness {:.4} ({} predicates)",
                search.steps(),
                last_best,
                search.best_solutions().len()
            );
        }
    }

    let elapsed = start.elapsed();

    println!();
    println!("Best fitness: {:.4}", search.best_fitness());
    println!("Best predicates:");
    for predicate in search.best_solutions() {
        println!("  {}", predicate);
    }
    println!();
    println!(
        "Time: {:.2}s ({} steps, {:.1} steps/s)",
        elapsed.as_secs_f32(),
        search.steps(),
        search.steps() as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    );
}

fn print_example_config() {
    let brute_force = SearchConfig::default();
    let evolution = SearchConfig {
        strategy: SearchStrategy::GrammarEvolution(GrammarEvolutionConfig {
            random_seed: Some(42),
            ..Default::default()
        }),
        ..Default::default()
    };

    for (name, config) in [("Brute force", brute_force), ("Grammar evolution", evolution)] {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{} configuration (config.json):", name);
                println!("{}", json);
                println!();
            }
            Err(e) => eprintln!("Error serializing example config: {}", e),
        }
    }
}
