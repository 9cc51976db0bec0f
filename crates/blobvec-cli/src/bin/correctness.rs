#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

//! Correctness check: build one of the approximate blob indexes and an
//! in-memory exhaustive baseline over identical data, then report how much
//! the index's mean result distance inflates over the baseline's.

use blobvec_core::distance::distance_vec;
use blobvec_core::{Error, HnswConfig, IvfFlatConfig, Result};
use blobvec_index::distance::mean_distance_vec_blob;
use blobvec_index::{
    HnswIndex, IvfFlatIndex, MemKnnIndex, MemVectorIndex, VectorIndex,
};
use blobvec_store::{BlobAdapter, Centroids, MainVectors, PageStore, VectorAdapter};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum IndexType {
    Ivfflat,
    Hnsw,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Vector index correctness check", long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value = "ivfflat")]
    index_type: IndexType,

    #[arg(long, default_value_t = 32)]
    num_centroids: usize,

    #[arg(long, default_value_t = 4)]
    num_probe_centroids: usize,

    #[arg(long, default_value_t = 10)]
    num_iterations: usize,

    #[arg(long, default_value_t = 200)]
    ef_construction: usize,

    #[arg(long, default_value_t = 100)]
    ef_search: usize,

    #[arg(long, default_value_t = 10)]
    m_max: usize,

    #[arg(long, default_value_t = 100)]
    vector_size: usize,

    #[arg(long, default_value_t = 1000)]
    num_vectors: usize,

    #[arg(long, default_value_t = 5.0)]
    std_dev: f32,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 100)]
    num_query_vectors: usize,

    #[arg(long, default_value_t = 10)]
    num_result_vectors: usize,
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

    let mut embedding_vectors = Vec::with_capacity(args.num_vectors);
    store.transaction(|| {
        for i in 0..args.num_vectors {
            let vector: Vec<f32> = (0..args.vector_size).map(|_| dist.sample(&mut rng)).collect();
            let state = blob.register(bytemuck::cast_slice(&vector))?;
            main_rel.insert(i as i32, &state)?;
            embedding_vectors.push(vector);
        }
        Ok(())
    })?;

    let query_vectors: Vec<Vec<f32>> = (0..args.num_query_vectors)
        .map(|_| (0..args.vector_size).map(|_| dist.sample(&mut rng)).collect())
        .collect();

    let mut blob_index: Box<dyn VectorIndex> = match args.index_type {
        IndexType::Ivfflat => {
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
            let mut config = HnswConfig::new(
                args.ef_construction,
                args.ef_search,
                args.m_max,
                args.vector_size,
            );
            config.seed = args.seed;
            Box::new(HnswIndex::new(main_rel.clone(), blob.clone(), config)?)
        }
    };
    store.transaction(|| blob_index.build())?;

    let mut baseline = MemKnnIndex::new(embedding_vectors);
    baseline.build()?;

    let inflation = store.transaction(|| {
        let mut total = 0.0f32;
        for query in &query_vectors {
            let states = blob_index.find_n_closest(query, args.num_result_vectors)?;
            let index_mean = mean_distance_vec_blob(&blob, query, &states)?;

            let exact = baseline.find_n_closest(query, args.num_result_vectors)?;
            let exact_mean = if exact.is_empty() {
                0.0
            } else {
                exact.iter().map(|v| distance_vec(query, v)).sum::<f32>() / exact.len() as f32
            };

            total += index_mean - exact_mean;
        }
        Ok(total / args.num_query_vectors as f32)
    })?;

    println!(
        "Mean distance inflation over exhaustive baseline: {inflation:.4} ({} queries, top-{})",
        args.num_query_vectors, args.num_result_vectors
    );
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("correctness check failed: {err}");
        std::process::exit(1);
    }
}
