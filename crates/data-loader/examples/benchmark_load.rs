use data_loader::parser;
use std::path::Path;
use std::time::Instant;

fn main() {
    let movies = Path::new("data/tmdb_5000_movies.csv");
    let credits = Path::new("data/tmdb_5000_credits.csv");

    println!("Loading TMDB movie tables...\n");

    let start = Instant::now();
    let joined = parser::load_from_files(movies, credits).expect("Failed to load tables");
    let elapsed = start.elapsed();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Joined records: {}", joined.movies.len());
    println!("Dropped incomplete: {}", joined.dropped_incomplete);
    println!("Unmatched titles: {}", joined.unmatched);
    println!(
        "\nPerformance: {:.0} records/second",
        joined.movies.len() as f64 / elapsed.as_secs_f64()
    );
}
