#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::too_many_lines)]

//! Benchmark driver: generate Gaussian embedding data, build one of the
//! blob-backed indexes, and time a query load against it — optionally
//! mirroring every phase on the in-memory baseline family.

use blobvec_core::{Error, HnswConfig, IvfFlatConfig, Result};
use blobvec_index::{
    HnswIndex, IvfFlatIndex, KnnIndex, MemHnswIndex, MemIvfFlatIndex, MemKnnIndex,
    MemVectorIndex, VectorIndex,
};
use blobvec_store::{BlobAdapter, Centroids, MainVectors, PageStore, VectorAdapter};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::time::Instant;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum IndexType {
    Ivfflat,
    Hnsw,
    Knn,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Vector index benchmark", long_about = None)]
struct Args {
    /// Which index to benchmark
    #[arg(long, value_enum, default_value = "ivfflat")]
    index_type: IndexType,

    /// Number of k-means centroids (ivfflat)
    #[arg(long, default_value_t = 128)]
    num_centroids: usize,

    /// Number of centroids to probe per query (ivfflat)
    #[arg(long, default_value_t = 10)]
    num_probe_centroids: usize,

    /// Upper bound on Lloyd iterations (ivfflat)
    #[arg(long, default_value_t = 10)]
    num_iterations: usize,

    /// Exploration budget while inserting (hnsw)
    #[arg(long, default_value_t = 200)]
    ef_construction: usize,

    /// Exploration budget while querying (hnsw)
    #[arg(long, default_value_t = 100)]
    ef_search: usize,

    /// Degree cap per vertex per layer (hnsw)
    #[arg(long, default_value_t = 10)]
    m_max: usize,

    /// Dimensionality of generated vectors
    #[arg(long, default_value_t = 3000)]
    vector_size: usize,

    /// How many vectors to generate
    #[arg(long, default_value_t = 1000)]
    num_vectors: usize,

    /// Standard deviation of the Gaussian data
    #[arg(long, default_value_t = 5.0)]
    std_dev: f32,

    /// Fixed seed for data generation and engine randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Also run every phase on the in-memory baseline
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    benchmark_baseline: bool,

    /// Run the query-load benchmark
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    benchmark_lookup_perf: bool,

    /// How many queries to send
    #[arg(long, default_value_t = 1000)]
    num_query_vectors: usize,

    /// How many results each query asks for
    #[arg(long, default_value_t = 10)]
    num_result_vectors: usize,
}

fn create_random_vector(rng: &mut StdRng, dist: &Normal<f32>, vector_size: usize) -> Vec<f32> {
    (0..vector_size).map(|_| dist.sample(rng)).collect()
}

fn print_timing(stage: &str, start: Instant) {
    println!("{stage} took {} ms", start.elapsed().as_millis());
}

fn run(args: &Args) -> Result<()> {
    let store = PageStore::new();
    let main_rel = VectorAdapter::create::<MainVectors>(&store);
    let centroid_rel = VectorAdapter::create::<Centroids>(&store);
    let blob = BlobAdapter::new(store.clone());

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let dist = Normal::new(0.0, args.std_dev)
        .map_err(|e| Error::Config(format!("bad std_dev: {e}")))?;

    println!("Generating benchmark data");
    println!("  vector_size: {}", args.vector_size);
    println!("  num_vectors: {}", args.num_vectors);
    println!("  std_dev: {}", args.std_dev);

    let mut embedding_vectors: Vec<Vec<f32>> = Vec::new();
    let mut query_vectors: Vec<Vec<f32>> = Vec::new();

    let data_gen_start = Instant::now();
    store.transaction(|| {
        for i in 0..args.num_vectors {
            let vector = create_random_vector(&mut rng, &dist, args.vector_size);
            let state = blob.register(bytemuck::cast_slice(&vector))?;
            main_rel.insert(i as i32, &state)?;
            if args.benchmark_baseline {
                embedding_vectors.push(vector);
            }
        }
        Ok(())
    })?;
    if args.benchmark_lookup_perf {
        for _ in 0..args.num_query_vectors {
            query_vectors.push(create_random_vector(&mut rng, &dist, args.vector_size));
        }
    }
    print_timing("Data generation", data_gen_start);

    let mut blob_index: Box<dyn VectorIndex> = match args.index_type {
        IndexType::Ivfflat => {
            println!("Building IVFFlat blob index:");
            println!("  num_centroids: {}", args.num_centroids);
            println!("  num_probe_centroids: {}", args.num_probe_centroids);
            println!("  num_iterations: {}", args.num_iterations);
            let mut config = IvfFlatConfig::new(
                args.num_centroids,
                args.num_probe_centroids,
                args.vector_size,
            );
            config.num_iterations = args.num_iterations;
            config.seed = args.seed;
            Box::new(IvfFlatIndex::new(
                main_rel.clone(),
                centroid_rel.clone(),
                blob.clone(),
                config,
            )?)
        }
        IndexType::Hnsw => {
            println!("Building HNSW blob index:");
            println!("  ef_construction: {}", args.ef_construction);
            println!("  ef_search: {}", args.ef_search);
            println!("  m_max: {}", args.m_max);
            let mut config = HnswConfig::new(
                args.ef_construction,
                args.ef_search,
                args.m_max,
                args.vector_size,
            );
            config.seed = args.seed;
            Box::new(HnswIndex::new(main_rel.clone(), blob.clone(), config)?)
        }
        IndexType::Knn => {
            println!("Building KNN blob index");
            Box::new(KnnIndex::new(main_rel.clone(), blob.clone()))
        }
    };

    let blob_build_start = Instant::now();
    store.transaction(|| blob_index.build())?;
    print_timing("Blob index build", blob_build_start);

    let base_index: Option<Box<dyn MemVectorIndex>> = if args.benchmark_baseline {
        let vectors = std::mem::take(&mut embedding_vectors);
        let mut index: Box<dyn MemVectorIndex> = match args.index_type {
            IndexType::Ivfflat => {
                let mut config = IvfFlatConfig::new(
                    args.num_centroids,
                    args.num_probe_centroids,
                    args.vector_size,
                );
                config.num_iterations = args.num_iterations;
                config.seed = args.seed;
                Box::new(MemIvfFlatIndex::new(vectors, config)?)
            }
            IndexType::Hnsw => {
                let mut config = HnswConfig::new(
                    args.ef_construction,
                    args.ef_search,
                    args.m_max,
                    args.vector_size,
                );
                config.seed = args.seed;
                Box::new(MemHnswIndex::new(vectors, config)?)
            }
            IndexType::Knn => Box::new(MemKnnIndex::new(vectors)),
        };
        let base_build_start = Instant::now();
        index.build()?;
        print_timing("Baseline index build", base_build_start);
        Some(index)
    } else {
        None
    };

    if args.benchmark_lookup_perf {
        println!("Starting lookup benchmark");
        println!("  num_query_vectors: {}", args.num_query_vectors);
        println!("  num_result_vectors: {}", args.num_result_vectors);

        let blob_lookup_start = Instant::now();
        store.transaction(|| {
            for query in &query_vectors {
                let _ = blob_index.find_n_closest(query, args.num_result_vectors)?;
            }
            Ok(())
        })?;
        print_timing("Blob index lookup", blob_lookup_start);
        println!(
            "Blob index lookup, one query: {:.3} ms",
            blob_lookup_start.elapsed().as_secs_f64() * 1000.0 / args.num_query_vectors as f64
        );

        if let Some(base_index) = &base_index {
            let base_lookup_start = Instant::now();
            for query in &query_vectors {
                let _ = base_index.find_n_closest(query, args.num_result_vectors)?;
            }
            print_timing("Baseline lookup", base_lookup_start);
            println!(
                "Baseline lookup, one query: {:.3} ms",
                base_lookup_start.elapsed().as_secs_f64() * 1000.0
                    / args.num_query_vectors as f64
            );
        }
    }

    println!(
        "Store stats: {} blobs over {} pages",
        store.blob_count(),
        store.pages_in_use()
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("benchmark failed: {err}");
        std::process::exit(1);
    }
}
