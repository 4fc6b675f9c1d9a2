use mirror_swipe::config::load_config;
use mirror_swipe::error::SwipeError;
use mirror_swipe::local::simulate;
use mirror_swipe::processing::sink::ConsoleSink;
use mirror_swipe::utils::log::console_error;

const USAGE: &str = "usage: swipe simulate <config.yaml> <scene.csv> [jitter_us]\n       swipe run <config.yaml>";

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let result = if args.len() > 2 {
        match args[1].as_str() {
            "simulate" => run_simulation(&args[2..]),
            "run" => run_sensors(&args[2]),
            _ => {
                println!("Invalid argument, please use 'simulate' or 'run'\n{}", USAGE);
                return;
            }
        }
    } else {
        println!("{}", USAGE);
        return;
    };

    if let Err(e) = result {
        console_error(&e.to_string());
        std::process::exit(1);
    }
}

fn run_simulation(args: &[String]) -> Result<(), SwipeError> {
    let config = load_config(&args[0])?;
    let scene_path = args
        .get(1)
        .ok_or_else(|| SwipeError::Scene("no scene file given".to_string()))?;
    let jitter_us = match args.get(2) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| SwipeError::Config(format!("jitter_us '{}': {}", raw, e)))?,
        None => 0,
    };
    let frames = simulate::load_scene(scene_path)?;
    simulate::run(config, &frames, Box::new(ConsoleSink), jitter_us)
}

#[cfg(feature = "rpi")]
fn run_sensors(config_path: &str) -> Result<(), SwipeError> {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let config = load_config(config_path)?;
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        flag.store(false, Ordering::SeqCst);
    });
    mirror_swipe::local::run::run(config, running)
}

#[cfg(not(feature = "rpi"))]
fn run_sensors(_config_path: &str) -> Result<(), SwipeError> {
    println!("Built without GPIO support, rebuild with '--features rpi' or use 'simulate'");
    Ok(())
}
