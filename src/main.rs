//! GNAS CLI - Run an architecture search from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use gnas::{
    compute::{
        GeneticAlgorithmSearcher, SearchSpace, SyntheticEvaluator,
        evolution::evaluate_generation_parallel, render,
    },
    schema::{DropPathControl, IndividualToken, Objective, SearchConfig},
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        std::process::exit(1);
    }

    match args[1].as_str() {
        "--example" => print_example_config(),
        "--final" => match args.get(2) {
            Some(token_path) => run_final(Path::new(token_path), args.get(3).map(Path::new)),
            None => {
                print_usage(&args[0]);
                std::process::exit(1);
            }
        },
        config_path => run_search(Path::new(config_path), args.get(2).map(PathBuf::from)),
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <config.json> [log_dir]", program);
    eprintln!("       {} --final <best_individual.json> [config.json]", program);
    eprintln!("       {} --example", program);
    eprintln!();
    eprintln!("Run a genetic architecture search against the synthetic evaluator,");
    eprintln!("or inspect a previously saved best individual.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.json  Search configuration (missing keys use defaults)");
    eprintln!("  log_dir      Output directory (default: logs/<timestamp>)");
}

fn run_search(config_path: &Path, log_dir: Option<PathBuf>) {
    println!("Loading config file: {}", config_path.display());
    let config = SearchConfig::load(config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let mut ga = GeneticAlgorithmSearcher::from_config(&config).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let log_dir = log_dir.unwrap_or_else(default_log_dir);
    fs::create_dir_all(&log_dir).unwrap_or_else(|e| {
        eprintln!("Error creating log directory: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = config.save(&log_dir) {
        eprintln!("Error saving config: {}", e);
        std::process::exit(1);
    }

    println!("GNAS Search");
    println!("===========");
    println!(
        "Space: {:?} ({} nodes, {} genes)",
        ga.search_space().space_type(),
        ga.search_space().node_count(),
        ga.search_space().gene_count()
    );
    println!(
        "Generation: {}  Population: {}  Keep: {}  Mutation p: {:.4}",
        config.generation_size,
        config.population_size,
        config.keep_size,
        ga.mutation_p()
    );
    println!("Log dir: {}", log_dir.display());
    println!();

    let objective = config.objective();
    let evaluator = SyntheticEvaluator::new(config.random_seed.unwrap_or(0), 0.01);
    let mut best: Option<f64> = None;

    for epoch in 0..config.n_epochs {
        if config.drop_path_start_epoch == Some(epoch) {
            println!("Enabling drop-path sampling bias");
            ga.search_space_mut().drop_path_mut().enable();
        }

        let start = Instant::now();
        let mut f_gen = objective.worst();
        let mut n_diff = 0;
        for _ in 0..config.generation_per_epoch {
            evaluate_generation_parallel(&mut ga, &evaluator);
            let stats = ga.update_population();
            n_diff += stats.n_diff;
            let gen_best = match objective {
                Objective::Maximize => stats.max,
                Objective::Minimize => stats.min,
            };
            f_gen = objective.best_of(f_gen, gen_best);
        }

        let f_best = ga.best_fitness().unwrap_or(f_gen);
        let improved = best.is_none_or(|b| objective.is_better(f_best, b));
        if improved {
            best = Some(f_best);
            if let Some(token) = ga.export_best() {
                save_best(&ga, &token, &log_dir);
            }
        }

        println!(
            "|Epoch: {:3}|Time: {:.3}s|Generation best: {:.4}|Best: {:.4}|N Change: {:3}|",
            epoch,
            start.elapsed().as_secs_f32(),
            f_gen,
            f_best,
            n_diff
        );
    }

    if let Err(e) = ga.history().save(log_dir.join("history.json")) {
        eprintln!("Error saving history: {}", e);
        std::process::exit(1);
    }

    println!();
    println!("Finished search");
    if let Some(ind) = ga.best_individual() {
        println!("Best fitness: {:.6}", ga.best_fitness().unwrap_or_default());
        print!("{}", render::describe(ga.search_space(), ind));
    }
}

fn save_best(ga: &GeneticAlgorithmSearcher, token: &IndividualToken, log_dir: &Path) {
    if let Err(e) = token.save(log_dir.join("best_individual.json")) {
        eprintln!("Error saving best individual: {}", e);
        std::process::exit(1);
    }
    if let Some(ind) = ga.best_individual() {
        let dot = render::to_dot(ga.search_space(), ind);
        if let Err(e) = fs::write(log_dir.join("best_graph.dot"), dot) {
            eprintln!("Error saving best graph: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_final(token_path: &Path, config_path: Option<&Path>) {
    let token = IndividualToken::load(token_path).unwrap_or_else(|e| {
        eprintln!("Error loading individual: {}", e);
        std::process::exit(1);
    });

    let space = match config_path {
        Some(path) => {
            let config = SearchConfig::load(path).unwrap_or_else(|e| {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            });
            SearchSpace::from_config(&config)
        }
        None => SearchSpace::enas_cnn(token.n_nodes, DropPathControl::default(), token.space_type),
    }
    .unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    let individual = space.decode(&token).unwrap_or_else(|e| {
        eprintln!("Invalid individual: {}", e);
        std::process::exit(1);
    });

    println!("Individual ({:?}, {} genes):", token.space_type, individual.gene_count());
    print!("{}", render::describe(&space, &individual));
    println!();
    print!("{}", render::to_dot(&space, &individual));
}

fn default_log_dir() -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from("logs").join(secs.to_string())
}

fn print_example_config() {
    let config = SearchConfig {
        random_seed: Some(0),
        ..Default::default()
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing config: {}", e),
    }
}
