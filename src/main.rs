use anyhow::Context;
use std::io::{BufRead, Write};
use text_classifier::{logging, ClassificationPipeline, Settings};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_env().context("reading settings")?;
    logging::init(&settings);
    tracing::info!(
        name = %settings.app_name,
        version = %settings.app_version,
        max_sequence_length = settings.max_sequence_length,
        "starting"
    );

    let pipeline = ClassificationPipeline::load(&settings).context("loading model")?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line?;
        match pipeline.predict(&line) {
            Ok(prediction) => {
                serde_json::to_writer(&mut stdout, &prediction)?;
                writeln!(stdout)?;
            }
            // already logged by the predictor
            Err(_) => continue,
        }
    }
    Ok(())
}
