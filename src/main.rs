use clap::{Parser, Subcommand};
use lexorank::{Bucket, Key, ReorderableList};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lexorank", about = "Inspect and generate lexorank keys")]
struct Cli {
    /// Log cascade and normalization decisions
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the shortest key strictly between two keys
    Between {
        low:  Key,
        high: Key,
    },
    /// Move a key forward by a numeric distance
    After {
        key:      Key,
        distance: u64,
    },
    /// Move a key backward by a numeric distance
    Before {
        key:      Key,
        distance: u64,
    },
    /// Key at a fractional position of the keyspace (0.0 <= f < 1.0)
    At {
        fraction: f64,
        #[arg(short, long, default_value = "0", value_parser = parse_bucket)]
        bucket:   Bucket,
    },
    /// Key at a random position
    Random {
        #[arg(short, long, default_value = "0", value_parser = parse_bucket)]
        bucket: Bucket,
    },
    /// Evenly spaced keys for COUNT items
    Spread {
        count: usize,
        #[arg(short, long, default_value = "0", value_parser = parse_bucket)]
        bucket: Bucket,
    },
    /// Check that keys are valid and strictly increasing
    Check {
        #[arg(required = true, num_args = 1..)]
        keys: Vec<Key>,
    },
    /// Compute the key for a new item at POSITION among sorted KEYS
    Insert {
        position: usize,
        keys:     Vec<Key>,
        /// Print the result as JSON
        #[arg(long)]
        json:     bool,
        #[arg(short, long, default_value = "0", value_parser = parse_bucket)]
        bucket:   Bucket,
    },
}

/// Result of `insert`, including every neighbour the engine rewrote.
#[derive(Serialize)]
struct InsertReport {
    key:       Key,
    rewritten: Vec<Rewrite>,
}

#[derive(Serialize)]
struct Rewrite {
    index: usize,
    from:  Key,
    to:    Key,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {

        // ── Between ──────────────────────────────────────────────────────────
        Commands::Between { low, high } => {
            let key = low.between(&high)
                .ok_or_else(|| format!("no room between {low} and {high}; rebalance required"))?;
            println!("{key}");
        }

        // ── Offsets ──────────────────────────────────────────────────────────
        Commands::After { key, distance } => {
            let next = key.after(distance)
                .ok_or_else(|| format!("{key} + {distance} leaves the keyspace"))?;
            println!("{next}");
        }
        Commands::Before { key, distance } => {
            let next = key.before(distance)
                .ok_or_else(|| format!("{key} - {distance} leaves the keyspace"))?;
            println!("{next}");
        }

        // ── Generation ───────────────────────────────────────────────────────
        Commands::At { fraction, bucket } => {
            println!("{}", Key::at_fraction(bucket, fraction));
        }
        Commands::Random { bucket } => {
            println!("{}", Key::random(bucket));
        }
        Commands::Spread { count, bucket } => {
            let mut keys = vec![Key::bottom(bucket); count];
            ReorderableList::new(&mut keys).normalize();
            for key in keys {
                println!("{key}");
            }
        }

        // ── Check ────────────────────────────────────────────────────────────
        Commands::Check { mut keys } => {
            let list = ReorderableList::new(&mut keys);
            if !list.is_sorted() {
                return Err("keys are not strictly increasing".into());
            }
            println!("ok: {} keys", list.len());
        }

        // ── Insert ───────────────────────────────────────────────────────────
        Commands::Insert { position, keys, json, bucket } => {
            let original = keys.clone();
            let mut keys = keys;
            let mut list = ReorderableList::new(&mut keys).with_bucket(bucket);
            if !list.is_sorted() {
                return Err("keys are not strictly increasing".into());
            }
            let key = list.insert(position)?;
            let dirty: Vec<usize> = list.dirty().iter().copied().collect();

            let report = InsertReport {
                key,
                rewritten: dirty.into_iter()
                    .map(|i| Rewrite { index: i, from: original[i], to: keys[i] })
                    .collect(),
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.key);
                for r in &report.rewritten {
                    println!("  rewrote [{}] {} -> {}", r.index, r.from, r.to);
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "lexorank=debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_bucket(s: &str) -> Result<Bucket, String> {
    let value: u8 = s.parse().map_err(|e| format!("{e}"))?;
    Bucket::new(value).map_err(|e| e.to_string())
}
