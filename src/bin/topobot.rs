//! Console chat host.
//!
//! Loads the network weights, or trains and saves them when they can't be loaded,
//! then answers stdin lines. `/photo <path>` sends a picture, `/quit` leaves.

use anyhow::Context;
use env_logger::Env;
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::{
    env,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use toponet::{
    chat::{ChatSession, Incoming, Recognizer, ScriptedDialogue},
    classifier::Classifier,
    config::Config,
    dataset::{DirectorySupplier, SampleSupplier, Vectorizer},
    feedforward::{LogProgress, Net, Trainer},
};

const DEFAULT_CONFIG: &str = "topobot.json";
const PHOTO_COMMAND: &str = "/photo";
const QUIT_COMMAND: &str = "/quit";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = read_config(&config_path)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut net = Net::new(config.topology()?, &mut rng);
    net.set_parallel(config.training.parallel);
    let mut trainer = net.build_trainer(config.trainer(), rng);

    match trainer.load(&config.weights_path) {
        Ok(()) => info!("weights loaded from {}", config.weights_path.display()),
        Err(e) => {
            warn!("{}, training a new network", e);
            train(&mut trainer, &config)?;
        }
    }

    let recognizer = Recognizer::new(config.vectorizer(), config.labels());
    let mut session = ChatSession::new(ScriptedDialogue::new(config.dialogue.iter().cloned()));
    chat(&mut session, &mut trainer, &recognizer)
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        return Config::from_file(path);
    }
    warn!("no config at {}, using defaults", path.display());
    let config = Config::default();
    config.validate()?;
    Ok(config)
}

fn train(trainer: &mut Trainer<StdRng>, config: &Config) -> anyhow::Result<()> {
    let supplier = DirectorySupplier::scan(
        &config.dataset_dir,
        config.labels(),
        &config.image.extension,
        config.vectorizer(),
    )?;

    let mut samples = supplier.train_set(config.training.samples)?;
    info!(
        "training on {} sample(s) of {} class(es)",
        samples.len(),
        supplier.classes_count()
    );
    let error = trainer.train(
        &mut samples,
        config.training.epochs,
        config.training.acceptable_error,
        &mut LogProgress::default(),
    )?;
    info!("training finished: error={:.6}", error);

    let tests = supplier.test_set(config.training.test_samples)?;
    if !tests.is_empty() {
        let accuracy = trainer.test(&tests)?;
        info!(
            "accuracy on {} test sample(s): {:.1}%",
            tests.len(),
            accuracy * 100.0
        );
    }

    trainer
        .save(&config.weights_path)
        .with_context(|| format!("cannot save weights to {}", config.weights_path.display()))?;
    info!("weights saved to {}", config.weights_path.display());
    Ok(())
}

fn chat<C, V>(
    session: &mut ChatSession<ScriptedDialogue>,
    classifier: &mut C,
    recognizer: &Recognizer<V>,
) -> anyhow::Result<()>
where
    C: Classifier,
    V: Vectorizer,
{
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    writeln!(
        stdout,
        "Symbols I know: {}. Send \"{} <path>\" for a picture, \"{}\" to leave.",
        recognizer.labels(),
        PHOTO_COMMAND,
        QUIT_COMMAND
    )?;

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == QUIT_COMMAND {
            break;
        }

        let message = match line.strip_prefix(PHOTO_COMMAND) {
            Some(path) if path.starts_with(char::is_whitespace) => {
                Incoming::Image(PathBuf::from(path.trim()))
            }
            _ => Incoming::Text(line.to_owned()),
        };
        writeln!(stdout, "{}", session.reply(&message, classifier, recognizer))?;
        stdout.flush()?;
    }
    Ok(())
}
