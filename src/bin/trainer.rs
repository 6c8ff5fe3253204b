use anyhow::Context;
use clap::Parser;
use fire_risk::classifier::{FireClassifier, ModelKind};
use fire_risk::dataset::{load_csv, train_test_split, Dataset};
use fire_risk::forest::RandomForestClassifier;
use fire_risk::forest_trainer::{train_forest, ForestParams};
use fire_risk::linear_model::LogisticClassifier;
use fire_risk::linear_trainer::{train_logistic, LogisticParams};
use fire_risk::metrics::ClassificationReport;
use fire_risk::model_loader::{ModelManifest, MANIFEST_FILE};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Train a forest fire classifier from the fires CSV", long_about = None)]
struct Args {
    /// Forest fires dataset (CSV with a Classes column)
    #[clap(short, long)]
    csv: PathBuf,

    /// Artifact path; defaults to models/forest_fire_model.{json,safetensors}
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// random_forest or logistic
    #[clap(short, long, default_value = "random_forest")]
    model: ModelKind,

    #[clap(long, default_value_t = 100)]
    trees: usize,

    #[clap(long)]
    max_depth: Option<usize>,

    #[clap(long, default_value_t = 42)]
    seed: u64,

    /// Fraction of rows held out for evaluation
    #[clap(long, default_value_t = 0.2)]
    test_size: f64,

    #[clap(long, default_value_t = 500)]
    epochs: usize,

    #[clap(long, default_value_t = 0.5)]
    lr: f64,
}

fn default_output(kind: ModelKind) -> PathBuf {
    match kind {
        ModelKind::Logistic => PathBuf::from("models/forest_fire_model.safetensors"),
        _ => PathBuf::from("models/forest_fire_model.json"),
    }
}

fn evaluate(model: &dyn FireClassifier, test: &Dataset) -> anyhow::Result<ClassificationReport> {
    let mut predicted = Vec::with_capacity(test.len());
    for row in &test.rows {
        let p = model.predict_probability(row)?;
        predicted.push(u8::from(p >= 0.5));
    }
    Ok(ClassificationReport::from_labels(&test.labels, &predicted))
}

fn print_importances(model: &dyn FireClassifier) {
    let mut importances = model.feature_importances();
    importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    println!("Feature importances:");
    for fi in importances {
        println!("  {:<12} {:.4}", fi.name, fi.importance);
    }
}

fn print_explanation(forest: &RandomForestClassifier, row: &[f64]) -> anyhow::Result<()> {
    let breakdown = forest.explain(row)?;
    println!(
        "Explanation for the first held-out row (p = {:.3}, base = {:.3}):",
        breakdown.probability, breakdown.bias
    );
    for c in breakdown.ranked() {
        println!("  {:<12} {:+.4}", c.name, c.contribution);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if args.model == ModelKind::Static {
        anyhow::bail!("the static classifier has nothing to train");
    }

    let data = load_csv(&args.csv).with_context(|| format!("Failed to load {}", args.csv.display()))?;
    let (train_idx, test_idx) = train_test_split(data.len(), args.test_size, args.seed);
    let train = data.subset(&train_idx);
    let test = data.subset(&test_idx);
    info!("Training on {} rows, evaluating on {}", train.len(), test.len());

    let output = args.output.clone().unwrap_or_else(|| default_output(args.model));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut forest = None;
    let model: Box<dyn FireClassifier> = match args.model {
        ModelKind::Logistic => {
            let params = LogisticParams {
                epochs: args.epochs,
                learning_rate: args.lr,
            };
            let fit = train_logistic(&train, &params)?;
            info!("Final training loss {:.6}", fit.final_loss);
            LogisticClassifier::save(&output, &fit.weights, fit.bias, &fit.importances)?;
            Box::new(LogisticClassifier::from_safetensors(&output)?)
        }
        _ => {
            let params = ForestParams {
                n_estimators: args.trees,
                max_depth: args.max_depth,
                seed: args.seed,
                ..ForestParams::default()
            };
            let artifact = train_forest(&train, &params, "forest_fire_random_forest")?;
            artifact.write_to(&output)?;
            let model = RandomForestClassifier::from_artifact(artifact)?;
            forest = Some(model.clone());
            Box::new(model)
        }
    };

    if test.is_empty() {
        println!("No rows held out; skipping evaluation.");
    } else {
        let report = evaluate(model.as_ref(), &test)?;
        println!("Hold-out evaluation ({} rows):", test.len());
        print!("{report}");
    }
    print_importances(model.as_ref());
    if let (Some(forest), Some(row)) = (&forest, test.rows.first()) {
        print_explanation(forest, row)?;
    }

    let manifest_path = output.with_file_name(MANIFEST_FILE);
    ModelManifest::for_artifact(&output, args.model)?.write(&manifest_path)?;
    println!("Model saved to {}", output.display());
    println!("Manifest saved to {}", manifest_path.display());
    Ok(())
}
