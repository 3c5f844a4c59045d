use std::io;

use clap::Parser;
use log::info;
use olive_classifier::{
    acquire::SourceImage,
    engine::SessionInfo,
    service::{labels::LabelTable, Config, ServiceBuilder, ServiceError},
    verdict::Verdict,
};

mod cli;
use cli::Args;
use thiserror::Error;

#[derive(Debug, Error)]
enum AppError {
    #[error("Could not read the label file -> {0}")]
    InvalidLabels(io::Error),
    #[error("Could not create the classifier -> {0}")]
    ServiceCreation(ServiceError),
    #[error("No input image, use --input")]
    NoInput,
    #[error("The model and the label table do not match -> {0}")]
    Configuration(ServiceError),
    #[error("Failed to analyze {0} image(s)")]
    AnalysisFailed(usize),
}

fn main() {
    if let Err(e) = exec_program() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn exec_program() -> Result<(), AppError> {
    env_logger::init();

    let args = Args::parse();

    let labels = match &args.labels {
        Some(path) => LabelTable::from_file(path).map_err(AppError::InvalidLabels)?,
        None => LabelTable::default(),
    };
    let config = Config {
        input_size: args.size,
        layout: args.layout.into(),
        interpolation: args.interpolation.into(),
        confidence: args.confidence.into(),
        num_threads: args.threads.into(),
    };

    info!("Input image path: {:?}", args.input);
    info!("Model path: {}", args.model.display());
    info!("Labels: {:?}", labels.iter().collect::<Vec<_>>());
    info!("Config: {:?}", config);

    let mut builder = ServiceBuilder::new(args.model).config(config).labels(labels);
    if let Some(cache_dir) = args.cache_dir {
        builder = builder.cache_dir(cache_dir);
    }
    let service = builder.build().map_err(AppError::ServiceCreation)?;

    info!("Service created successfully");

    if args.inspect {
        print_session(service.session());
        return Ok(());
    }
    if args.input.is_empty() {
        return Err(AppError::NoInput);
    }

    let sources = args
        .input
        .iter()
        .cloned()
        .map(SourceImage::Path)
        .collect::<Vec<_>>();
    let outcomes = service.classify_batch(&sources);

    let mut failures = 0;
    for (path, outcome) in args.input.iter().zip(outcomes) {
        println!("Image {}", path.display());
        match outcome {
            Ok(verdict) => print_verdict(&verdict, service.labels(), args.show),
            Err(e) if e.is_configuration_error() => return Err(AppError::Configuration(e)),
            Err(e) => {
                println!("  Failed to analyze image: {e}");
                failures += 1;
            }
        }
    }

    service.into_engine().close();

    if failures > 0 {
        return Err(AppError::AnalysisFailed(failures));
    }
    Ok(())
}

fn print_session(session: &SessionInfo) {
    println!("Input names: {:?}", session.input_names);
    println!("Output names: {:?}", session.output_names);
}

fn print_verdict(verdict: &Verdict, labels: &LabelTable, k: usize) {
    for line in verdict.to_string().lines() {
        println!("  {line}");
    }
    if k == 0 {
        return;
    }
    println!("  Top {} scores:", k);
    for (rank, prediction) in verdict.top_k(labels, k).iter().enumerate() {
        println!(
            "    {}. class: {}, score: {}",
            rank + 1,
            prediction.class,
            prediction.score
        );
    }
}
