use chrono::Local;
use colored::Colorize;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOG_DIR: &str = "logs";
const TAG: &str = "[swipe]";

/// Prints a status line to stdout, prefixed with the module tag.
pub fn console(message: &str) {
    println!("{} {}", TAG.cyan(), message);
}

/// Prints an error line to stderr, prefixed with the module tag.
pub fn console_error(message: &str) {
    eprintln!("{} {}", TAG.red().bold(), message.red());
}

fn log_path(filename: &str) -> io::Result<PathBuf> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }
    Ok(log_dir.join(filename))
}

/// Logs a message to a file with timestamp
///
/// # Arguments
///
/// * `filename` - The name of the log file (created under `logs/`)
/// * `message` - The message to log
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    let path = log_path(filename)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()?;

    Ok(())
}

/// Appends a row to a CSV file, writing the headers only when the file is new
///
/// # Arguments
///
/// * `filename` - The name of the CSV file (created under `logs/`)
/// * `headers` - Column headers
/// * `row` - Row of data to append
pub fn log_csv(filename: &str, headers: &[&str], row: &[String]) -> io::Result<()> {
    let path = log_path(filename)?;
    let file_exists = path.exists();

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !file_exists && !headers.is_empty() {
        writer.write_record(headers)?;
    }
    writer.write_record(row)?;
    writer.flush()?;

    Ok(())
}
