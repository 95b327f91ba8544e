//! Sample Record Generator
//!
//! Writes a CSV of random raw records for exercising `fraud-score batch`.
//!
//! Usage: sample-records [output.csv|-] [count] [suspicious_rate] [unknown_region_rate]

use fraud_scoring::RawRecord;
use rand::Rng;
use std::io::Write;
use tracing::info;

/// Regions of the encoding table, plus a few it has never seen
const KNOWN_REGIONS: [&str; 3] = ["Houston", "Orlando", "Miami"];
const OTHER_REGIONS: [&str; 3] = ["Dallas", "Tampa", "Austin"];

/// Random record generator
struct RecordGenerator {
    rng: rand::rngs::ThreadRng,
    unknown_region_rate: f64,
}

impl RecordGenerator {
    fn new(unknown_region_rate: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            unknown_region_rate,
        }
    }

    /// Generate an ordinary customer record
    fn generate_typical(&mut self) -> RawRecord {
        RawRecord {
            age: self.rng.gen_range(21..70),
            gender: self.random_choice(&["Male", "Femme"]).to_string(),
            region: self.random_region(),
            salary: (self.rng.gen_range(25_000.0..120_000.0_f64) / 500.0).round() * 500.0,
            card_type: self.random_choice(&["MasterCard", "Visa"]).to_string(),
            credit_score: self.rng.gen_range(550.0..850.0_f64).round(),
            transaction_amount: (self.rng.gen_range(5.0..800.0_f64) * 100.0).round() / 100.0,
            account_age: (self.rng.gen_range(1.0..20.0_f64) * 2.0).round() / 2.0,
        }
    }

    /// Generate a record with the traits of a risky transaction
    fn generate_suspicious(&mut self) -> RawRecord {
        RawRecord {
            age: self.rng.gen_range(18..30),
            gender: self.random_choice(&["Male", "Femme"]).to_string(),
            region: self.random_region(),
            salary: (self.rng.gen_range(12_000.0..40_000.0_f64) / 500.0).round() * 500.0,
            card_type: "Visa".to_string(),
            credit_score: self.rng.gen_range(300.0..560.0_f64).round(), // Low score
            transaction_amount: (self.rng.gen_range(2_000.0..15_000.0_f64) * 100.0).round() / 100.0, // High amount
            account_age: (self.rng.gen_range(0.0..1.5_f64) * 2.0).round() / 2.0, // New account
        }
    }

    fn random_region(&mut self) -> String {
        if self.rng.gen_bool(self.unknown_region_rate) {
            self.random_choice(&OTHER_REGIONS).to_string()
        } else {
            self.random_choice(&KNOWN_REGIONS).to_string()
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_records=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let output = args.get(1).map(|s| s.as_str()).unwrap_or("-");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let suspicious_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let unknown_region_rate: f64 = args
        .get(4)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.02_f64)
        .clamp(0.0, 1.0);

    info!(
        output = %output,
        count = count,
        suspicious_rate = suspicious_rate,
        unknown_region_rate = unknown_region_rate,
        "Configuration loaded"
    );

    let sink: Box<dyn Write> = if output == "-" {
        Box::new(std::io::stdout().lock())
    } else {
        Box::new(std::fs::File::create(output)?)
    };
    let mut writer = csv::Writer::from_writer(sink);

    let mut generator = RecordGenerator::new(unknown_region_rate);
    let mut rng = rand::thread_rng();
    let mut typical_count = 0;
    let mut suspicious_count = 0;

    for _ in 0..count {
        let record = if rng.gen_bool(suspicious_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            typical_count += 1;
            generator.generate_typical()
        };
        writer.serialize(&record)?;
    }
    writer.flush()?;

    info!(
        "Completed! Wrote {} records ({} typical, {} suspicious)",
        count, typical_count, suspicious_count
    );

    Ok(())
}
