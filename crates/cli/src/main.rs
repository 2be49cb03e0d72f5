use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{ArtifactStore, parser};
use pipeline::{ContentPipeline, PipelineConfig};
use server::{DEFAULT_LIMIT, PosterSource, Recommendation, RecommendationService, TmdbPosterClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// content-recs - Content-based movie recommender
#[derive(Parser)]
#[command(name = "content-recs")]
#[command(about = "Recommend movies similar to a title", long_about = None)]
struct Cli {
    /// Directory holding catalog.json and similarity.bin
    #[arg(short, long, default_value = "artifacts")]
    artifacts_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the catalog and similarity artifacts from the TMDB tables
    Build {
        /// Movies table (CSV)
        #[arg(long, default_value = "data/tmdb_5000_movies.csv")]
        movies: PathBuf,

        /// Credits table (CSV)
        #[arg(long, default_value = "data/tmdb_5000_credits.csv")]
        credits: PathBuf,

        /// Vocabulary size
        #[arg(long, default_value = "5000")]
        max_features: usize,

        /// Leading cast members kept per movie
        #[arg(long, default_value = "3")]
        cast_limit: usize,
    },

    /// Get movies similar to a title
    Recommend {
        /// Exact title of the movie to start from
        #[arg(long)]
        title: String,

        /// Number of recommendations to return
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,

        /// Look up poster URLs (needs TMDB_API_KEY)
        #[arg(long)]
        posters: bool,
    },

    /// Search for movies by title
    Search {
        /// Case-insensitive fragment of the title
        #[arg(long)]
        title: String,
    },

    /// Run benchmark to test query latency
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "1000")]
        requests: usize,

        /// Recommendations per request
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            movies,
            credits,
            max_features,
            cast_limit,
        } => {
            let config = PipelineConfig::new()
                .with_max_features(max_features)
                .with_cast_limit(cast_limit);
            handle_build(cli.artifacts_dir, movies, credits, config).await?
        }
        Commands::Recommend {
            title,
            limit,
            posters,
        } => handle_recommend(load_service(&cli.artifacts_dir)?, &title, limit, posters).await?,
        Commands::Search { title } => handle_search(&load_service(&cli.artifacts_dir)?, &title),
        Commands::Benchmark { requests, limit } => {
            handle_benchmark(load_service(&cli.artifacts_dir)?, requests, limit).await?
        }
    }

    Ok(())
}

fn load_service(dir: &Path) -> Result<RecommendationService> {
    let start = Instant::now();
    let service = RecommendationService::load(dir)
        .with_context(|| format!("Failed to load artifacts from {}", dir.display()))?;
    println!(
        "{} Loaded {} movies in {:?}",
        "✓".green(),
        service.len(),
        start.elapsed()
    );
    Ok(service)
}

/// Handle the 'build' command
async fn handle_build(
    artifacts_dir: PathBuf,
    movies: PathBuf,
    credits: PathBuf,
    config: PipelineConfig,
) -> Result<()> {
    let start = Instant::now();

    // The batch job is CPU-bound; keep it off the async workers
    let (joined, output) = tokio::task::spawn_blocking(move || -> Result<_> {
        let joined = parser::load_from_files(&movies, &credits)
            .context("Failed to load movie tables")?;
        let output = ContentPipeline::new(config).run(&joined.movies)?;
        Ok((joined, output))
    })
    .await
    .context("Build task panicked")??;

    ArtifactStore::new(&artifacts_dir)
        .save(&output.catalog, &output.similarity)
        .context("Failed to save artifacts")?;

    println!("{}", "Build complete:".bold().blue());
    println!("{}Movies in catalog: {}", "• ".green(), output.catalog.len());
    println!("{}Vocabulary terms: {}", "• ".green(), output.vocabulary.len());
    println!("{}Incomplete rows dropped: {}", "• ".cyan(), joined.dropped_incomplete);
    println!("{}Titles without credits: {}", "• ".cyan(), joined.unmatched);
    println!(
        "{}Absent / malformed fields: {} / {}",
        "• ".cyan(),
        output.report.absent_fields,
        output.report.malformed_fields
    );
    println!(
        "{} Wrote artifacts to {} in {:?}",
        "✓".green(),
        artifacts_dir.display(),
        start.elapsed()
    );
    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    service: RecommendationService,
    title: &str,
    limit: usize,
    posters: bool,
) -> Result<()> {
    if !posters {
        let recommendations = service.recommend(title, limit)?;
        print_recommendations(title, &recommendations, &[]);
        return Ok(());
    }

    let Some(client) = TmdbPosterClient::from_env() else {
        info!("TMDB_API_KEY is not set; showing results without posters");
        let recommendations = service.recommend(title, limit)?;
        print_recommendations(title, &recommendations, &[]);
        return Ok(());
    };

    let source: Arc<dyn PosterSource> = Arc::new(client);
    let results = service.recommend_with_posters(title, limit, source).await?;
    let (recommendations, urls): (Vec<_>, Vec<_>) = results
        .into_iter()
        .map(|r| (r.recommendation, r.poster_url))
        .unzip();
    print_recommendations(title, &recommendations, &urls);
    Ok(())
}

/// Handle the 'search' command
fn handle_search(service: &RecommendationService, title: &str) {
    let matches = service.search(title);
    println!("{}", format!("Search results for '{}':", title).bold().blue());
    if matches.is_empty() {
        println!("  (no matches)");
    }
    for entry in matches.iter().take(20) {
        println!("{}: {}", entry.id, entry.title);
    }
    if matches.len() > 20 {
        println!("  ... and {} more", matches.len() - 20);
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: RecommendationService,
    requests: usize,
    limit: usize,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }
    if service.is_empty() {
        bail!("Catalog is empty; nothing to benchmark");
    }

    // Pick random query titles from the catalog
    let titles: Vec<String> = (0..requests)
        .map(|_| {
            let index = rand::random::<u32>() as usize % service.len();
            service
                .catalog()
                .get(index)
                .map(|entry| entry.title.clone())
                .unwrap_or_default()
        })
        .collect();

    let wall = Instant::now();
    let mut handles = vec![];
    for title in titles {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let start = Instant::now();
            service.recommend(&title, limit)?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall = wall.elapsed();

    timings.sort();
    let total: Duration = timings.iter().sum();
    let percentile = |p: f64| timings[((timings.len() as f64 * p) as usize).min(timings.len() - 1)];

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {}", requests);
    println!("Wall time: {:?}", wall);
    println!("Average latency: {:?}", total / timings.len() as u32);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        requests as f64 / wall.as_secs_f64()
    );
    Ok(())
}

/// Helper function to format and print recommendations
fn print_recommendations(
    query: &str,
    recommendations: &[Recommendation],
    posters: &[Option<String>],
) {
    println!("{}", format!("Movies similar to '{}':", query).bold().blue());
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} [id {}] - Score: {:.3}",
            (rank + 1).to_string().green(),
            rec.title,
            rec.movie_id,
            rec.score
        );
        match posters.get(rank) {
            Some(Some(url)) => println!("   Poster: {}", url),
            Some(None) => println!("   Poster: {}", "not available".dimmed()),
            None => {}
        }
    }
}
